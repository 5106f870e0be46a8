use footprints::{Footprint, FootprintSet};
use foundation::math::Vec2;
use image::RgbaImage;

use crate::color::decode_ordinal;

/// Ordinal painted at a tile-local pixel position, if any.
pub fn pick_index(index: &RgbaImage, local: Vec2) -> Option<usize> {
    if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
        return None;
    }
    let px = index.get_pixel_checked(local.x.floor() as u32, local.y.floor() as u32)?;
    decode_ordinal(*px)
}

/// Resolves a pick against the current set. Ordinals past the end (the set
/// shrank since the raster was drawn) resolve to nothing.
pub fn pick_footprint<'a>(
    set: &'a FootprintSet,
    index: &RgbaImage,
    local: Vec2,
) -> Option<(usize, &'a Footprint)> {
    let ordinal = pick_index(index, local)?;
    set.get(ordinal).map(|f| (ordinal, f))
}
