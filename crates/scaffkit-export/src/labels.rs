//! Annotation label derivation and collision-avoiding placement.

use kurbo::{Point, Rect, Size};
use scaffkit_core::{PanelSize, Part, PartMeta, PillarType};
use std::collections::BTreeMap;

/// Label anchor offset from the part position.
pub const LABEL_OFFSET_X: f64 = 5.0;
pub const LABEL_OFFSET_Y: f64 = -30.0;

/// Backing rectangle padding around the measured text.
pub const LABEL_PAD_X: f64 = 4.0;
pub const LABEL_PAD_TOP: f64 = 2.0;
pub const LABEL_PAD_BOTTOM: f64 = 4.0;

/// Vertical gap added when a candidate collides with a placed label.
pub const COLLISION_GAP: f64 = 4.0;

/// Maximum downward shifts before a colliding position is accepted as-is.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 10;

/// Font size for part labels and memo bodies.
pub const LABEL_FONT_SIZE: f64 = 14.0;

/// Memo line height (1.2em).
pub const MEMO_LINE_HEIGHT: f64 = LABEL_FONT_SIZE * 1.2;

/// Placeholder rendered for memos with no text.
pub const EMPTY_MEMO_PLACEHOLDER: &str = "(empty)";

/// Render pillar counts as each category letter repeated by its count,
/// concatenated in category order: `{A:2, B:1}` -> `"AAB"`.
pub fn pillar_label(counts: &BTreeMap<PillarType, u32>) -> String {
    let mut label = String::new();
    for (category, &count) in counts {
        for _ in 0..count {
            label.push_str(category.letter());
        }
    }
    label
}

/// Render anti-panel counts as `"W:<n> S:<n>"`, omitting zero/absent terms.
pub fn anti_panel_label(counts: &BTreeMap<PanelSize, u32>) -> String {
    counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(size, count)| format!("{}:{}", size.letter(), count))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive the annotation label for a part. Only pillars and anti-panels
/// carry quantity labels; empty strings yield `None`.
pub fn part_label(part: &Part) -> Option<String> {
    let label = match &part.meta {
        PartMeta::Pillar(meta) => pillar_label(&meta.pillar_counts),
        PartMeta::AntiPanel(meta) => anti_panel_label(&meta.counts),
        _ => return None,
    };
    (!label.is_empty()).then_some(label)
}

/// Axis-aligned rectangle overlap test (strict on both axes).
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Places label backing rectangles, avoiding collisions with every label
/// placed earlier in the same export pass.
#[derive(Debug, Default)]
pub struct LabelPlanner {
    placed: Vec<Rect>,
}

impl LabelPlanner {
    /// Create an empty planner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the backing rectangle for a label anchored at a part
    /// position.
    ///
    /// The candidate starts at the anchor offset; on overlap with any
    /// previously placed rectangle it shifts down by its own height plus
    /// [`COLLISION_GAP`] and retries, up to [`MAX_PLACEMENT_ATTEMPTS`]
    /// times, after which the final position is accepted regardless.
    pub fn place(&mut self, anchor: Point, text_size: Size) -> Rect {
        let width = text_size.width + LABEL_PAD_X * 2.0;
        let height = text_size.height + LABEL_PAD_TOP + LABEL_PAD_BOTTOM;
        let mut origin = Point::new(anchor.x + LABEL_OFFSET_X, anchor.y + LABEL_OFFSET_Y);

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let candidate = Rect::from_origin_size(origin, Size::new(width, height));
            if !self.placed.iter().any(|placed| rects_overlap(&candidate, placed)) {
                break;
            }
            origin.y += height + COLLISION_GAP;
        }

        let rect = Rect::from_origin_size(origin, Size::new(width, height));
        self.placed.push(rect);
        rect
    }

    /// Rectangles placed so far.
    pub fn placed(&self) -> &[Rect] {
        &self.placed
    }
}

/// Greedy word wrap for memo bodies. Existing newlines are preserved;
/// a word longer than the limit gets a line of its own.
pub fn wrap_text<F>(text: &str, max_width: f64, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if current.is_empty() || measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(current);
                current = word.to_string();
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
