//! In-memory scene graph implementation.
//!
//! A complete [`SceneHost`] with no rendering backend, used by non-browser
//! hosts and tests. Rasterization paints visible rect and text leaves as
//! solid blocks on a white background, which is enough to verify crops,
//! layer suppression and label injection end to end.

use crate::scene::{
    encode_rgba, BoxFuture, DecodedImage, EncodedFormat, ExportError, ExportResult,
    NodeId, RectSpec, SceneHost, TextSpec,
};
use kurbo::{Point, Rect, Size};
use scaffkit_core::SerializableColor;
use std::collections::{BTreeMap, HashMap};

/// Payload of a scene node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pure container; reports no client rect of its own.
    Layer,
    Rect {
        rect: Rect,
        fill: SerializableColor,
    },
    Text {
        origin: Point,
        content: String,
        font_size: f64,
        color: SerializableColor,
    },
}

/// A node in the in-memory scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub visible: bool,
    pub kind: NodeKind,
}

/// In-memory scene for testing and headless hosts.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: BTreeMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    canvas: Size,
    next_id: u64,
    name_index: HashMap<String, Vec<NodeId>>,
    redraw_count: u64,
}

impl MemoryScene {
    /// Create a scene with the given canvas extent.
    pub fn new(canvas: Size) -> Self {
        Self {
            canvas,
            ..Self::default()
        }
    }

    /// Add a top-level layer.
    pub fn add_layer(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.alloc();
        let name = name.into();
        self.index_name(&name, id);
        self.nodes.insert(
            id,
            SceneNode {
                name,
                parent: None,
                children: Vec::new(),
                visible: true,
                kind: NodeKind::Layer,
            },
        );
        self.roots.push(id);
        id
    }

    /// Add a rectangle node under a parent.
    pub fn add_rect(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        rect: Rect,
        fill: SerializableColor,
    ) -> NodeId {
        self.attach(
            parent,
            name.into(),
            NodeKind::Rect { rect, fill },
        )
    }

    /// Add a text node under a parent.
    pub fn add_text(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        origin: Point,
        content: impl Into<String>,
        font_size: f64,
        color: SerializableColor,
    ) -> NodeId {
        self.attach(
            parent,
            name.into(),
            NodeKind::Text {
                origin,
                content: content.into(),
                font_size,
                color,
            },
        )
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Total number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// How many redraws have been forced.
    pub fn redraw_count(&self) -> u64 {
        self.redraw_count
    }

    fn alloc(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    fn index_name(&mut self, name: &str, id: NodeId) {
        self.name_index.entry(name.to_string()).or_default().push(id);
    }

    fn attach(&mut self, parent: NodeId, name: String, kind: NodeKind) -> NodeId {
        let id = self.alloc();
        self.index_name(&name, id);
        self.nodes.insert(
            id,
            SceneNode {
                name,
                parent: Some(parent),
                children: Vec::new(),
                visible: true,
                kind,
            },
        );
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// Visible leaf nodes under a node, preorder, honoring ancestor
    /// visibility.
    fn visible_leaves(&self, root: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            if node.children.is_empty() {
                if !matches!(node.kind, NodeKind::Layer) {
                    leaves.push(id);
                }
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }

    fn paint_rect(
        image: &mut image::RgbaImage,
        region: Rect,
        pixel_ratio: f64,
        rect: Rect,
        color: SerializableColor,
    ) {
        let (width, height) = image.dimensions();
        let x0 = (((rect.x0 - region.x0) * pixel_ratio).round().max(0.0)) as u32;
        let y0 = (((rect.y0 - region.y0) * pixel_ratio).round().max(0.0)) as u32;
        let x1 = ((((rect.x1 - region.x0) * pixel_ratio).round().max(0.0)) as u32).min(width);
        let y1 = ((((rect.y1 - region.y0) * pixel_ratio).round().max(0.0)) as u32).min(height);
        let pixel = image::Rgba([color.r, color.g, color.b, color.a]);
        for y in y0..y1 {
            for x in x0..x1 {
                image.put_pixel(x, y, pixel);
            }
        }
    }
}

impl SceneHost for MemoryScene {
    fn canvas_size(&self) -> Size {
        self.canvas
    }

    fn layers(&self) -> Vec<NodeId> {
        self.roots.clone()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn node_name(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).map(|n| n.name.clone())
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.nodes.get(&node).map(|n| n.visible).unwrap_or(false)
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.visible = visible;
        }
    }

    fn client_rect(&self, node: NodeId) -> Option<Rect> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Layer => None,
            NodeKind::Rect { rect, .. } => Some(*rect),
            NodeKind::Text {
                origin,
                content,
                font_size,
                ..
            } => {
                let size = self.measure_text(content, *font_size);
                Some(Rect::from_origin_size(*origin, size))
            }
        }
    }

    fn measure_text(&self, text: &str, font_size: f64) -> Size {
        // Character-count approximation: 0.6em advance, 1.2em line height.
        let max_line_len = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let line_count = text.lines().count().max(1);
        Size::new(
            max_line_len as f64 * font_size * 0.6,
            line_count as f64 * font_size * 1.2,
        )
    }

    fn nodes_by_name(&self, name: &str) -> Vec<NodeId> {
        self.name_index
            .get(name)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.nodes.contains_key(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn create_rect(&mut self, parent: NodeId, spec: RectSpec) -> NodeId {
        self.attach(
            parent,
            spec.name,
            NodeKind::Rect {
                rect: spec.rect,
                fill: spec.fill,
            },
        )
    }

    fn create_text(&mut self, parent: NodeId, spec: TextSpec) -> NodeId {
        self.attach(
            parent,
            spec.name,
            NodeKind::Text {
                origin: spec.origin,
                content: spec.content,
                font_size: spec.font_size,
                color: spec.color,
            },
        )
    }

    fn destroy_node(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(&node) else {
            return;
        };
        for child in removed.children {
            self.destroy_node(child);
        }
        if let Some(parent) = removed.parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|&c| c != node);
            }
        }
        self.roots.retain(|&r| r != node);
    }

    fn redraw(&mut self) {
        self.redraw_count += 1;
    }

    fn rasterize(
        &mut self,
        region: Rect,
        pixel_ratio: f64,
        format: EncodedFormat,
        quality: u8,
    ) -> ExportResult<Vec<u8>> {
        let width = (region.width() * pixel_ratio).round() as u32;
        let height = (region.height() * pixel_ratio).round() as u32;
        if width == 0 || height == 0 {
            return Err(ExportError::Rasterize("zero-sized region".to_string()));
        }

        let mut image =
            image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        for layer in self.roots.clone() {
            for leaf in self.visible_leaves(layer) {
                let Some(node) = self.nodes.get(&leaf) else {
                    continue;
                };
                match &node.kind {
                    NodeKind::Rect { rect, fill } => {
                        Self::paint_rect(&mut image, region, pixel_ratio, *rect, *fill);
                    }
                    NodeKind::Text {
                        origin,
                        content,
                        font_size,
                        color,
                    } => {
                        let size = self.measure_text(content, *font_size);
                        Self::paint_rect(
                            &mut image,
                            region,
                            pixel_ratio,
                            Rect::from_origin_size(*origin, size),
                            *color,
                        );
                    }
                    NodeKind::Layer => {}
                }
            }
        }

        encode_rgba(&image, format, quality)
    }

    fn decode_image<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, ExportResult<DecodedImage>> {
        Box::pin(async move {
            let decoded = image::load_from_memory(bytes)
                .map_err(|e| ExportError::Decode(e.to_string()))?;
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            Ok(DecodedImage {
                rgba_data: rgba.into_vec(),
                width,
                height,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::find_nodes_named;

    fn color() -> SerializableColor {
        SerializableColor::black()
    }

    #[test]
    fn test_node_lifecycle() {
        let mut scene = MemoryScene::new(Size::new(800.0, 600.0));
        let layer = scene.add_layer("content");
        let rect = scene.add_rect(layer, "box", Rect::new(0.0, 0.0, 10.0, 10.0), color());

        assert_eq!(scene.children(layer), vec![rect]);
        assert!(scene.is_visible(rect));

        scene.destroy_node(rect);
        assert!(scene.children(layer).is_empty());
        assert!(!scene.is_visible(rect));
        assert!(scene.nodes_by_name("box").is_empty());
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut scene = MemoryScene::new(Size::new(100.0, 100.0));
        let layer = scene.add_layer("content");
        let child = scene.add_rect(layer, "child", Rect::new(0.0, 0.0, 1.0, 1.0), color());

        scene.destroy_node(layer);
        assert_eq!(scene.node_count(), 0);
        assert!(scene.node(child).is_none());
        assert!(scene.layers().is_empty());
    }

    #[test]
    fn test_find_nodes_named_unions_nested_and_indexed() {
        let mut scene = MemoryScene::new(Size::new(100.0, 100.0));
        let layer = scene.add_layer("content");
        let inner = scene.add_rect(layer, "holder", Rect::new(0.0, 0.0, 1.0, 1.0), color());
        let a = scene.add_rect(layer, "drag-handle", Rect::new(0.0, 0.0, 1.0, 1.0), color());
        // Deeply nested node with the same name.
        let b = scene.add_rect(inner, "drag-handle", Rect::new(2.0, 2.0, 3.0, 3.0), color());

        let found = find_nodes_named(&scene, "drag-handle");
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a));
        assert!(found.contains(&b));
    }

    #[test]
    fn test_rasterize_paints_visible_rects_only() {
        let mut scene = MemoryScene::new(Size::new(100.0, 100.0));
        let layer = scene.add_layer("content");
        let shown = scene.add_rect(
            layer,
            "shown",
            Rect::new(10.0, 10.0, 20.0, 20.0),
            color(),
        );
        let hidden = scene.add_rect(
            layer,
            "hidden",
            Rect::new(50.0, 50.0, 60.0, 60.0),
            color(),
        );
        scene.set_visible(hidden, false);
        let _ = shown;

        let bytes = scene
            .rasterize(
                Rect::new(0.0, 0.0, 100.0, 100.0),
                1.0,
                EncodedFormat::Png,
                90,
            )
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();

        assert_eq!(decoded.dimensions(), (100, 100));
        assert_eq!(decoded.get_pixel(15, 15), &image::Rgba([0, 0, 0, 255]));
        assert_eq!(decoded.get_pixel(55, 55), &image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_rasterize_zero_region_fails() {
        let mut scene = MemoryScene::new(Size::new(100.0, 100.0));
        scene.add_layer("content");
        let result = scene.rasterize(Rect::ZERO, 2.0, EncodedFormat::Png, 90);
        assert!(matches!(result, Err(ExportError::Rasterize(_))));
    }

    #[test]
    fn test_decode_round_trip() {
        let mut scene = MemoryScene::new(Size::new(50.0, 50.0));
        scene.add_layer("content");
        let bytes = scene
            .rasterize(Rect::new(0.0, 0.0, 50.0, 50.0), 2.0, EncodedFormat::Png, 90)
            .unwrap();

        let decoded = pollster::block_on(scene.decode_image(&bytes)).unwrap();
        assert_eq!((decoded.width, decoded.height), (100, 100));
        assert_eq!(decoded.rgba_data.len(), 100 * 100 * 4);
    }
}
