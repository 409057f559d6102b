//! ScaffKit Core Library
//!
//! Platform-agnostic model and logic for the ScaffKit scaffold drawing
//! engine: parts and groups, memos, bounded undo history, selection and
//! scoped bulk edits.

pub mod bulk;
pub mod drawing;
pub mod group;
pub mod history;
pub mod memo;
pub mod part;
pub mod selection;

pub use bulk::{BulkScope, BulkValues, MergeMode};
pub use drawing::{Drawing, DrawingState};
pub use group::{Group, GroupId, GroupUpdate};
pub use history::{History, MAX_HISTORY};
pub use memo::{Memo, MemoId};
pub use part::{
    AntiPanelMeta, BeamFrameMeta, BracketMeta, ClothMeta, Direction, PanelSize, Part,
    PartId, PartKind, PartMeta, PillarMeta, PillarType, SerializableColor, StairMeta,
};
pub use selection::{PartKey, Selection};
