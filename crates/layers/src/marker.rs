use footprints::{Footprint, FootprintId};
use foundation::math::LonLat;
use image::Rgba;

/// Marker pinned to the sticky footprint: its temporal label plus a dismiss
/// affordance that asks for the footprint to be excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct StickyMarker {
    pub footprint: FootprintId,
    /// Centre of the footprint's first shape.
    pub anchor: LonLat,
    /// Start and end, `YYYY-MM-DD HH:MM:SS`; one line when only one is known.
    pub label: Vec<String>,
    pub color: Rgba<u8>,
}

impl StickyMarker {
    /// `None` when the footprint has no parseable shape to anchor on.
    pub fn for_footprint(footprint: &Footprint, color: Rgba<u8>) -> Option<Self> {
        Some(Self {
            footprint: footprint.id.clone(),
            anchor: footprint.marker_anchor()?,
            label: footprint.temporal_label(),
            color,
        })
    }

    /// Id carried by the dismiss affordance.
    pub fn dismiss_id(&self) -> &FootprintId {
        &self.footprint
    }
}
