use image::Rgba;
use serde::Deserialize;
use streaming::ImageCacheConfig;

use crate::color::parse_color;
use crate::imagery::ImageryTemplates;

const DEFAULT_BASELINE: Rgba<u8> = Rgba([128, 128, 128, 51]);

/// Tuning for one collection's tile renderer.
///
/// Every field has a default, so a partial JSON object (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Tile edge in pixels.
    pub tile_size: u32,
    /// Extra attempts per failed imagery load.
    pub max_retries: u32,
    /// Padding around a tile, as a fraction of the tile size, used when
    /// deciding which paths overlap it.
    pub tile_pad_fraction: f64,
    pub geodetic_max_step_deg: f64,
    /// Stroke width for lines and points in the index raster.
    pub index_line_width: f64,
    pub point_radius: f64,
    pub outline_width: f64,
    pub emphasized_outline_width: f64,
    /// Width for the focused and sticky footprints.
    pub highlight_width: f64,
    pub baseline_outline: String,
    pub deemphasized_imagery_alpha: f32,
    pub templates: ImageryTemplates,
    pub image_cache: ImageCacheConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            tile_size: 512,
            max_retries: 1,
            tile_pad_fraction: 0.1,
            geodetic_max_step_deg: 2.0,
            index_line_width: 4.0,
            point_radius: 3.0,
            outline_width: 1.0,
            emphasized_outline_width: 1.5,
            highlight_width: 3.0,
            baseline_outline: "#80808033".to_string(),
            deemphasized_imagery_alpha: 0.5,
            templates: ImageryTemplates::default(),
            image_cache: ImageCacheConfig::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn baseline_color(&self) -> Rgba<u8> {
        parse_color(&self.baseline_outline).unwrap_or(DEFAULT_BASELINE)
    }
}
