//! ScaffKit Export Library
//!
//! Scene abstraction and raster export for ScaffKit drawings. The composer
//! works against the [`SceneHost`] trait, temporarily annotates the live
//! scene, rasterizes a content-only crop and restores the scene afterwards.

pub mod composer;
pub mod labels;
pub mod memory;
pub mod scene;

pub use composer::{
    ExportComposer, ExportOptions, BACKGROUND_MARGIN, CONTENT_MARGIN, GRID_LAYER_NAME,
    HANDLE_NODE_NAME, LABEL_NODE_NAME, MEMO_NODE_NAME,
};
pub use labels::{anti_panel_label, part_label, pillar_label, wrap_text, LabelPlanner};
pub use memory::MemoryScene;
pub use scene::{
    find_nodes_named, BoxFuture, DecodedImage, EncodedFormat, ExportError, ExportResult,
    NodeId, RectSpec, SceneHost, TextSpec,
};
