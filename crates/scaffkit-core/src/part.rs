//! Scaffold part definitions and per-type metadata.

use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for parts (unique within its owning group).
pub type PartId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Pillar category. Categories are ordered so that derived annotation
/// labels come out in a stable order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PillarType {
    A,
    B,
    C,
    D,
}

impl PillarType {
    /// Single-letter code used in annotation labels.
    pub fn letter(&self) -> &'static str {
        match self {
            PillarType::A => "A",
            PillarType::B => "B",
            PillarType::C => "C",
            PillarType::D => "D",
        }
    }

    /// Get all pillar categories.
    pub fn all() -> &'static [PillarType] {
        &[PillarType::A, PillarType::B, PillarType::C, PillarType::D]
    }
}

/// Anti-slip panel size category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PanelSize {
    /// Wide panel, label code "W".
    Wide,
    /// Slim panel, label code "S".
    Slim,
}

impl PanelSize {
    /// Single-letter code used in annotation labels.
    pub fn letter(&self) -> &'static str {
        match self {
            PanelSize::Wide => "W",
            PanelSize::Slim => "S",
        }
    }
}

/// Bracket orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Direction {
    /// The orientation in degrees.
    pub fn degrees(&self) -> u16 {
        match self {
            Direction::Deg0 => 0,
            Direction::Deg90 => 90,
            Direction::Deg180 => 180,
            Direction::Deg270 => 270,
        }
    }

    /// Rotate clockwise by 90 degrees.
    pub fn rotated(self) -> Self {
        match self {
            Direction::Deg0 => Direction::Deg90,
            Direction::Deg90 => Direction::Deg180,
            Direction::Deg180 => Direction::Deg270,
            Direction::Deg270 => Direction::Deg0,
        }
    }
}

/// Pillar metadata.
///
/// `pillar_counts` is the current representation (quantity per category).
/// `pillar_type` + `quantity` are the legacy single-value representation;
/// [`PartMeta::normalize`] migrates them into `pillar_counts` so the two
/// never coexist after a write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PillarMeta {
    #[serde(default)]
    pub pillar_counts: BTreeMap<PillarType, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pillar_type: Option<PillarType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// Cloth panel metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClothMeta {
    pub width: f64,
    pub height: f64,
}

/// Bracket metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BracketMeta {
    pub direction: Direction,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// Anti-slip panel metadata. `counts` holds the per-size quantities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AntiPanelMeta {
    pub levels: u32,
    pub length: f64,
    #[serde(default)]
    pub counts: BTreeMap<PanelSize, u32>,
}

/// Stair metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StairMeta {
    pub levels: u32,
}

/// Beam-frame metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeamFrameMeta {
    pub span: f64,
    pub bays: u32,
}

/// Part type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartKind {
    Pillar,
    Cloth,
    Bracket,
    AntiPanel,
    Stair,
    BeamFrame,
}

/// Per-type part metadata, tagged by part type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PartMeta {
    Pillar(PillarMeta),
    Cloth(ClothMeta),
    Bracket(BracketMeta),
    AntiPanel(AntiPanelMeta),
    Stair(StairMeta),
    BeamFrame(BeamFrameMeta),
}

impl PartMeta {
    /// Get the part type discriminant.
    pub fn kind(&self) -> PartKind {
        match self {
            PartMeta::Pillar(_) => PartKind::Pillar,
            PartMeta::Cloth(_) => PartKind::Cloth,
            PartMeta::Bracket(_) => PartKind::Bracket,
            PartMeta::AntiPanel(_) => PartKind::AntiPanel,
            PartMeta::Stair(_) => PartKind::Stair,
            PartMeta::BeamFrame(_) => PartKind::BeamFrame,
        }
    }

    /// Normalize quantity-like fields after a write.
    ///
    /// Entries with value 0 are removed rather than stored as zero, and the
    /// legacy pillar representation (`pillar_type` + `quantity`) is folded
    /// into `pillar_counts` and cleared.
    pub fn normalize(&mut self) {
        match self {
            PartMeta::Pillar(meta) => {
                if let (Some(pillar_type), Some(quantity)) =
                    (meta.pillar_type.take(), meta.quantity.take())
                {
                    if quantity > 0 {
                        *meta.pillar_counts.entry(pillar_type).or_insert(0) += quantity;
                    }
                }
                // A half-written legacy pair carries no quantity; drop it.
                meta.pillar_type = None;
                meta.quantity = None;
                meta.pillar_counts.retain(|_, count| *count > 0);
            }
            PartMeta::Bracket(meta) => {
                if meta.quantity == Some(0) {
                    meta.quantity = None;
                }
            }
            PartMeta::AntiPanel(meta) => {
                meta.counts.retain(|_, count| *count > 0);
            }
            PartMeta::Cloth(_) | PartMeta::Stair(_) | PartMeta::BeamFrame(_) => {}
        }
    }
}

/// A scaffold part placed in a drawing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Unique identifier within the owning group.
    pub id: PartId,
    /// Position in drawing-space units.
    pub position: Point,
    /// Display color.
    pub color: SerializableColor,
    /// Optional marker text shown next to the part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Type-specific metadata.
    pub meta: PartMeta,
}

impl Part {
    /// Create a new part at a position with the given metadata.
    pub fn new(position: Point, meta: PartMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            color: SerializableColor::black(),
            marker: None,
            meta,
        }
    }

    /// Get the part type discriminant.
    pub fn kind(&self) -> PartKind {
        self.meta.kind()
    }
}
