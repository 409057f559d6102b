//! Scene host abstraction.
//!
//! The export composer never talks to a rendering backend directly; it works
//! against [`SceneHost`], an explicit handle to the live scene graph with
//! exactly the capabilities export needs. Hosts register a scene by handing
//! the composer this handle, which keeps the composer testable with an
//! in-memory scene and lets non-browser hosts run several drawings at once.

use kurbo::{Point, Rect, Size};
use scaffkit_core::SerializableColor;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future for the single async boundary in export (image decode).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Export pipeline errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("canvas has zero size")]
    EmptyCanvas,
    #[error("scene has no layers")]
    NoLayers,
    #[error("rasterization failed: {0}")]
    Rasterize(String),
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image encode failed: {0}")]
    Encode(String),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Identifier of a node in the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Encoded output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodedFormat {
    #[default]
    Png,
    Jpeg,
}

impl EncodedFormat {
    /// The MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodedFormat::Png => "image/png",
            EncodedFormat::Jpeg => "image/jpeg",
        }
    }

    /// Parse a MIME type string. Unknown types map to `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(EncodedFormat::Png),
            "image/jpeg" | "image/jpg" => Some(EncodedFormat::Jpeg),
            _ => None,
        }
    }
}

/// Decoded RGBA pixel buffer (4 bytes per pixel).
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub rgba_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Specification for an ephemeral rectangle node.
#[derive(Debug, Clone)]
pub struct RectSpec {
    pub name: String,
    pub rect: Rect,
    pub fill: SerializableColor,
}

/// Specification for an ephemeral text node.
#[derive(Debug, Clone)]
pub struct TextSpec {
    pub name: String,
    /// Top-left corner of the text block.
    pub origin: Point,
    pub content: String,
    pub font_size: f64,
    pub color: SerializableColor,
}

/// Capabilities the export composer requires from the host rendering
/// surface.
///
/// Coordinates are drawing-space units throughout; `client_rect` reports
/// them in the shared (layer-independent) coordinate space.
pub trait SceneHost {
    /// The full canvas extent.
    fn canvas_size(&self) -> Size;

    /// Top-level layers, back to front.
    fn layers(&self) -> Vec<NodeId>;

    /// Direct children of a node, back to front.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// The node's name, if it still exists.
    fn node_name(&self, node: NodeId) -> Option<String>;

    /// Read a node's visibility flag. Destroyed nodes report `false`.
    fn is_visible(&self, node: NodeId) -> bool;

    /// Set a node's visibility flag.
    fn set_visible(&mut self, node: NodeId, visible: bool);

    /// The node's bounding rectangle in the shared coordinate space, or
    /// `None` for nodes that cannot report one (pure containers).
    fn client_rect(&self, node: NodeId) -> Option<Rect>;

    /// Measure the extent of a (possibly multi-line) text at a font size.
    fn measure_text(&self, text: &str, font_size: f64) -> Size;

    /// Indexed lookup of nodes by exact name. Best-effort only: callers
    /// must union this with a recursive traversal (see
    /// [`find_nodes_named`]), never trust it alone.
    fn nodes_by_name(&self, name: &str) -> Vec<NodeId>;

    /// Create an ephemeral rectangle node under a parent.
    fn create_rect(&mut self, parent: NodeId, spec: RectSpec) -> NodeId;

    /// Create an ephemeral text node under a parent.
    fn create_text(&mut self, parent: NodeId, spec: TextSpec) -> NodeId;

    /// Destroy a node and its subtree. Destroying an already-destroyed
    /// node is a no-op.
    fn destroy_node(&mut self, node: NodeId);

    /// Force a redraw so scene changes are reflected before rasterizing.
    fn redraw(&mut self);

    /// Rasterize a rectangular region of the scene at the given pixel
    /// ratio into an encoded image.
    fn rasterize(
        &mut self,
        region: Rect,
        pixel_ratio: f64,
        format: EncodedFormat,
        quality: u8,
    ) -> ExportResult<Vec<u8>>;

    /// Decode an encoded image into an RGBA buffer. This is the single
    /// suspension point in the export pipeline.
    fn decode_image<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, ExportResult<DecodedImage>>;
}

/// Find every node with the given name.
///
/// The canonical discovery method is a recursive depth-first traversal from
/// the layers down; the host's indexed lookup is unioned in afterwards,
/// deduplicated by node identity. Indexed results are a best-effort
/// optimization and are never trusted alone.
pub fn find_nodes_named<S: SceneHost + ?Sized>(scene: &S, name: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();

    let mut stack: Vec<NodeId> = scene.layers();
    stack.reverse();
    while let Some(node) = stack.pop() {
        if scene.node_name(node).as_deref() == Some(name) && seen.insert(node) {
            found.push(node);
        }
        let mut children = scene.children(node);
        children.reverse();
        stack.extend(children);
    }

    for node in scene.nodes_by_name(name) {
        if seen.insert(node) {
            found.push(node);
        }
    }

    found
}

/// Encode an RGBA buffer to the requested format.
pub(crate) fn encode_rgba(
    image: &image::RgbaImage,
    format: EncodedFormat,
    quality: u8,
) -> ExportResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        EncodedFormat::Png => {
            image
                .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(|e| ExportError::Encode(e.to_string()))?;
        }
        EncodedFormat::Jpeg => {
            // JPEG has no alpha channel; flatten onto white first.
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut cursor = std::io::Cursor::new(&mut bytes);
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| ExportError::Encode(e.to_string()))?;
        }
    }
    Ok(bytes)
}
