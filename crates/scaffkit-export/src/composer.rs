//! Transactional export composer.
//!
//! Orchestrates a temporary mutation of the live scene (decorative layers
//! hidden, ephemeral annotation labels injected), rasterizes a content-only
//! crop, and restores the scene regardless of success or failure. The only
//! suspension point is the image decode inside optional background
//! compositing.

use crate::labels::{
    part_label, wrap_text, LabelPlanner, EMPTY_MEMO_PLACEHOLDER, LABEL_FONT_SIZE,
    LABEL_PAD_BOTTOM, LABEL_PAD_TOP, LABEL_PAD_X, MEMO_LINE_HEIGHT,
};
use crate::scene::{
    encode_rgba, find_nodes_named, EncodedFormat, ExportError, ExportResult, NodeId,
    RectSpec, SceneHost, TextSpec,
};
use kurbo::{Point, Rect, Size};
use log::{debug, warn};
use scaffkit_core::{Drawing, Memo, Part, SerializableColor};

/// Name of the grid layer in the host scene.
pub const GRID_LAYER_NAME: &str = "grid";
/// Name of transient drag-reorder handle nodes.
pub const HANDLE_NODE_NAME: &str = "drag-handle";
/// Name given to ephemeral part-label nodes.
pub const LABEL_NODE_NAME: &str = "export-label";
/// Name given to ephemeral memo nodes.
pub const MEMO_NODE_NAME: &str = "export-memo";

/// Margin added around the content bounding box, drawing-space units.
pub const CONTENT_MARGIN: f64 = 50.0;
/// Margin added around the crop when compositing onto a background.
pub const BACKGROUND_MARGIN: f64 = 100.0;

/// Options for one export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output pixel ratio (2.0 doubles the raster resolution).
    pub pixel_ratio: f64,
    /// Composite the crop centered on an opaque white background.
    pub white_background: bool,
    /// Hide the grid layer for the duration of the export.
    pub hide_grid: bool,
    /// Encoded output format.
    pub format: EncodedFormat,
    /// JPEG quality (ignored for PNG).
    pub quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: 2.0,
            white_background: false,
            hide_grid: true,
            format: EncodedFormat::Png,
            quality: 92,
        }
    }
}

impl ExportOptions {
    /// Set the output pixel ratio.
    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    /// Enable or disable white-background compositing.
    pub fn with_white_background(mut self, white_background: bool) -> Self {
        self.white_background = white_background;
        self
    }

    /// Enable or disable grid suppression.
    pub fn with_hide_grid(mut self, hide_grid: bool) -> Self {
        self.hide_grid = hide_grid;
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: EncodedFormat) -> Self {
        self.format = format;
        self
    }
}

/// Everything that must be undone after an export attempt: visibility
/// flips in application order, plus every ephemeral node created.
#[derive(Debug, Default)]
struct SceneTransaction {
    hidden: Vec<(NodeId, bool)>,
    ephemeral: Vec<NodeId>,
    restored: bool,
}

impl SceneTransaction {
    fn hide<S: SceneHost>(&mut self, scene: &mut S, node: NodeId) {
        self.hidden.push((node, scene.is_visible(node)));
        scene.set_visible(node, false);
    }

    fn track(&mut self, node: NodeId) {
        self.ephemeral.push(node);
    }

    /// Revert layer and handle visibility, destroy ephemeral nodes, then
    /// redraw. Runs on both the success and failure paths; calling it
    /// twice is a no-op so a partial first attempt cannot fail the second.
    fn restore<S: SceneHost>(&mut self, scene: &mut S) {
        if self.restored {
            return;
        }
        self.restored = true;
        for (node, visible) in self.hidden.drain(..) {
            scene.set_visible(node, visible);
        }
        for node in self.ephemeral.drain(..) {
            scene.destroy_node(node);
        }
        scene.redraw();
    }
}

/// Composes exports against an explicitly registered scene handle.
pub struct ExportComposer<'a, S: SceneHost> {
    scene: &'a mut S,
}

impl<'a, S: SceneHost> ExportComposer<'a, S> {
    /// Register a scene handle for the duration of the export. Dropping
    /// the composer releases the scene back to the host.
    pub fn new(scene: &'a mut S) -> Self {
        Self { scene }
    }

    /// Export the drawing to an encoded image.
    ///
    /// Preconditions abort before any scene mutation; mid-pipeline errors
    /// restore the scene and then surface; compositing errors degrade to
    /// the un-composited crop.
    pub async fn export(
        &mut self,
        drawing: &Drawing,
        options: &ExportOptions,
    ) -> ExportResult<Vec<u8>> {
        let canvas = self.scene.canvas_size();
        if canvas.width <= 0.0 || canvas.height <= 0.0 {
            return Err(ExportError::EmptyCanvas);
        }
        if self.scene.layers().is_empty() {
            return Err(ExportError::NoLayers);
        }

        let mut txn = SceneTransaction::default();
        let result = self.run_pipeline(drawing, options, &mut txn);
        txn.restore(self.scene);
        let crop = result?;

        if !options.white_background {
            return Ok(crop);
        }
        match self.composite_background(&crop, options).await {
            Ok(composited) => Ok(composited),
            Err(err) => {
                // A valid crop already exists; degrade instead of failing.
                warn!("background compositing failed, returning plain crop: {err}");
                Ok(crop)
            }
        }
    }

    /// Steps 1-4: suppress decorative nodes, inject labels, compute the
    /// content bounds, rasterize. Restoration is the caller's duty.
    fn run_pipeline(
        &mut self,
        drawing: &Drawing,
        options: &ExportOptions,
        txn: &mut SceneTransaction,
    ) -> ExportResult<Vec<u8>> {
        self.suppress_decorative(options, txn);
        self.inject_annotations(drawing, txn);
        let bounds = self.content_bounds();
        debug!(
            "export crop {:.0}x{:.0} at ratio {}",
            bounds.width(),
            bounds.height(),
            options.pixel_ratio
        );
        self.scene.redraw();
        self.scene
            .rasterize(bounds, options.pixel_ratio, options.format, options.quality)
    }

    /// Step 1: hide the grid layer (when requested) and any drag-handle
    /// overlay nodes, recording prior visibility.
    fn suppress_decorative(&mut self, options: &ExportOptions, txn: &mut SceneTransaction) {
        if options.hide_grid {
            for node in find_nodes_named(self.scene, GRID_LAYER_NAME) {
                txn.hide(self.scene, node);
            }
        }
        for node in find_nodes_named(self.scene, HANDLE_NODE_NAME) {
            txn.hide(self.scene, node);
        }
    }

    /// Step 2: inject ephemeral part labels (collision-avoided) and memo
    /// annotations (no collision avoidance).
    fn inject_annotations(&mut self, drawing: &Drawing, txn: &mut SceneTransaction) {
        let Some(layer) = self.annotation_layer() else {
            return;
        };

        let mut planner = LabelPlanner::new();
        let parts: Vec<&Part> = drawing
            .groups()
            .iter()
            .flat_map(|g| g.parts().iter())
            .chain(drawing.loose_parts().iter())
            .collect();
        for part in parts {
            let Some(label) = part_label(part) else {
                continue;
            };
            let text_size = self.scene.measure_text(&label, LABEL_FONT_SIZE);
            let rect = planner.place(part.position, text_size);
            txn.track(self.scene.create_rect(
                layer,
                RectSpec {
                    name: LABEL_NODE_NAME.to_string(),
                    rect,
                    fill: SerializableColor::white(),
                },
            ));
            txn.track(self.scene.create_text(
                layer,
                TextSpec {
                    name: LABEL_NODE_NAME.to_string(),
                    origin: Point::new(rect.x0 + LABEL_PAD_X, rect.y0 + LABEL_PAD_TOP),
                    content: label,
                    font_size: LABEL_FONT_SIZE,
                    color: SerializableColor::black(),
                },
            ));
        }

        for memo in drawing.memos() {
            self.inject_memo(layer, memo, txn);
        }
    }

    fn inject_memo(&mut self, layer: NodeId, memo: &Memo, txn: &mut SceneTransaction) {
        let body = if memo.text.trim().is_empty() {
            EMPTY_MEMO_PLACEHOLDER.to_string()
        } else {
            memo.text.clone()
        };
        let max_width = (memo.size.width - LABEL_PAD_X * 2.0).max(1.0);
        let lines = wrap_text(&body, max_width, |s| {
            self.scene.measure_text(s, LABEL_FONT_SIZE).width
        });
        let min_height =
            lines.len() as f64 * MEMO_LINE_HEIGHT + LABEL_PAD_TOP + LABEL_PAD_BOTTOM;
        let size = Size::new(memo.size.width, memo.size.height.max(min_height));

        txn.track(self.scene.create_rect(
            layer,
            RectSpec {
                name: MEMO_NODE_NAME.to_string(),
                rect: Rect::from_origin_size(memo.position, size),
                fill: SerializableColor::white(),
            },
        ));
        txn.track(self.scene.create_text(
            layer,
            TextSpec {
                name: MEMO_NODE_NAME.to_string(),
                origin: Point::new(
                    memo.position.x + LABEL_PAD_X,
                    memo.position.y + LABEL_PAD_TOP,
                ),
                content: lines.join("\n"),
                font_size: LABEL_FONT_SIZE,
                color: SerializableColor::black(),
            },
        ));
    }

    /// The layer ephemeral annotations attach to: the frontmost visible
    /// non-grid layer.
    fn annotation_layer(&self) -> Option<NodeId> {
        let layers = self.scene.layers();
        layers
            .iter()
            .rev()
            .find(|&&layer| {
                self.scene.is_visible(layer)
                    && self.scene.node_name(layer).as_deref() != Some(GRID_LAYER_NAME)
            })
            .or_else(|| layers.first())
            .copied()
    }

    /// Step 3: union of visible leaf rectangles across every visible
    /// non-grid layer, with a clamped margin. Falls back to the full
    /// canvas when no content reports a rectangle.
    fn content_bounds(&self) -> Rect {
        let canvas = Rect::from_origin_size(Point::ZERO, self.scene.canvas_size());
        let mut content: Option<Rect> = None;

        for layer in self.scene.layers() {
            if !self.scene.is_visible(layer) {
                continue;
            }
            if self.scene.node_name(layer).as_deref() == Some(GRID_LAYER_NAME) {
                continue;
            }
            let mut stack = self.scene.children(layer);
            while let Some(node) = stack.pop() {
                if !self.scene.is_visible(node) {
                    continue;
                }
                let children = self.scene.children(node);
                if children.is_empty() {
                    // Nodes that cannot report a rectangle are skipped.
                    if let Some(rect) = self.scene.client_rect(node) {
                        content = Some(match content {
                            Some(acc) => acc.union(rect),
                            None => rect,
                        });
                    }
                } else {
                    stack.extend(children);
                }
            }
        }

        let bounds = content.unwrap_or(canvas);
        // Margin is clamped on the origin side only; the far side may
        // extend past the canvas so edge content keeps its full margin.
        Rect::new(
            (bounds.x0 - CONTENT_MARGIN).max(canvas.x0),
            (bounds.y0 - CONTENT_MARGIN).max(canvas.y0),
            bounds.x1 + CONTENT_MARGIN,
            bounds.y1 + CONTENT_MARGIN,
        )
    }

    /// Step 6: decode the crop (the single await point), draw it centered
    /// on an opaque background with an extra margin, re-encode.
    async fn composite_background(
        &mut self,
        crop: &[u8],
        options: &ExportOptions,
    ) -> ExportResult<Vec<u8>> {
        let decoded = self.scene.decode_image(crop).await?;
        let crop_image =
            image::RgbaImage::from_raw(decoded.width, decoded.height, decoded.rgba_data)
                .ok_or_else(|| {
                    ExportError::Decode("decoded buffer has wrong length".to_string())
                })?;

        let margin = (BACKGROUND_MARGIN * options.pixel_ratio).round() as u32;
        let width = decoded.width + margin * 2;
        let height = decoded.height + margin * 2;
        let mut canvas =
            image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        image::imageops::overlay(&mut canvas, &crop_image, margin as i64, margin as i64);

        encode_rgba(&canvas, options.format, options.quality)
    }
}
