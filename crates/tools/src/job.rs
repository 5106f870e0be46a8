//! One-shot jobs behind the CLI: render a single tile, or pick the footprint
//! under a coordinate.

use std::path::Path;
use std::time::Duration;

use footprints::{FootprintId, FootprintSet};
use foundation::math::{LonLat, Projection};
use image::RgbaImage;
use layers::{CollectionId, HitElement, LayerCoordinator, Notification};
use raster::{
    ImageryOptionSet, MapView, OutlineStyle, RendererConfig, ResultsUpdate, TileCoord,
    TileRenderer, TiledView, option_sets_from_tags, parse_color,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::fetch::{Completion, HttpImageLoader};

/// Parses `z/x/y`.
pub fn parse_tile(raw: &str) -> Result<TileCoord, String> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    let [z, x, y] = parts.as_slice() else {
        return Err(format!("tile must be z/x/y, got {raw:?}"));
    };
    let z: u8 = z.parse().map_err(|_| format!("bad zoom in {raw:?}"))?;
    let x: i64 = x.parse().map_err(|_| format!("bad x in {raw:?}"))?;
    let y: i64 = y.parse().map_err(|_| format!("bad y in {raw:?}"))?;
    Ok(TileCoord::new(x, y, z))
}

/// Comma-separated footprint ids; empty entries are ignored.
pub fn parse_ids(raw: Option<&str>) -> Vec<FootprintId> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(FootprintId::from)
        .collect()
}

pub fn parse_projection(raw: &str) -> Result<Projection, String> {
    Projection::from_name(raw).ok_or_else(|| format!("unknown projection {raw:?}"))
}

/// Inputs shared by every job: the granules and how to draw them.
#[derive(Debug, Clone)]
pub struct JobInput {
    pub footprints: FootprintSet,
    pub imagery: Vec<ImageryOptionSet>,
    pub projection: Projection,
    pub color: Option<String>,
    pub light_color: Option<String>,
    pub project_page: bool,
}

impl JobInput {
    pub fn load(
        granules: &Path,
        tags: Option<&Path>,
        added: Vec<FootprintId>,
        removed: Vec<FootprintId>,
    ) -> Result<Self, String> {
        let json = std::fs::read_to_string(granules)
            .map_err(|e| format!("read {}: {e}", granules.display()))?;
        let footprints = FootprintSet::from_json(&json)
            .map_err(|e| format!("parse {}: {e}", granules.display()))?
            .with_overrides(added, removed);

        let imagery = match tags {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| format!("read {}: {e}", path.display()))?;
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| format!("parse {}: {e}", path.display()))?;
                option_sets_from_tags(&value).map_err(|e| e.to_string())?
            }
            None => Vec::new(),
        };

        Ok(Self {
            footprints,
            imagery,
            projection: Projection::Geographic,
            color: None,
            light_color: None,
            project_page: false,
        })
    }

    pub fn update(&self) -> Result<ResultsUpdate, String> {
        let defaults = OutlineStyle::default();
        let color = |raw: &Option<String>, fallback| match raw {
            Some(raw) => parse_color(raw).ok_or_else(|| format!("bad colour {raw:?}")),
            None => Ok(fallback),
        };
        Ok(ResultsUpdate {
            footprints: self.footprints.clone(),
            imagery: self.imagery.clone(),
            color: color(&self.color, defaults.color)?,
            light_color: color(&self.light_color, defaults.light_color)?,
            project_page: self.project_page,
            visible: true,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderedTile {
    pub tile: TileCoord,
    pub outline: RgbaImage,
    pub index: RgbaImage,
    pub imagery: RgbaImage,
    pub imagery_complete: bool,
    pub failed_loads: u64,
}

impl RenderedTile {
    /// Writes `outline.png`, `index.png` and `imagery.png` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), String> {
        std::fs::create_dir_all(dir).map_err(|e| format!("create {}: {e}", dir.display()))?;
        for (name, img) in [
            ("outline.png", &self.outline),
            ("index.png", &self.index),
            ("imagery.png", &self.imagery),
        ] {
            let path = dir.join(name);
            img.save(&path)
                .map_err(|e| format!("write {}: {e}", path.display()))?;
        }
        Ok(())
    }
}

/// Draws one tile and waits (up to `wait` per image) for its imagery.
pub async fn render_tile(
    input: &JobInput,
    config: &RendererConfig,
    tile: TileCoord,
    client: reqwest::Client,
    wait: Duration,
) -> Result<RenderedTile, String> {
    let view = TiledView::new(input.projection, tile.z, config.tile_size);
    let rows = view.tile_rows();
    if tile.y < 0 || tile.y >= rows {
        return Err(format!("tile {tile} is outside the {rows}-row pyramid"));
    }

    let (mut loader, mut rx) = HttpImageLoader::new(client);
    let mut renderer = TileRenderer::new(1, config.clone());
    renderer.set_results(input.update()?);
    renderer.request_tile(tile);
    renderer.run_turn(&view, &mut loader);
    info!(tile = %tile, footprints = renderer.footprints().len(), loads = renderer.pending_loads(), "tile drawn");

    drain_loads(&mut renderer, &mut loader, &mut rx, wait).await;

    let entry = renderer
        .tile(&tile)
        .ok_or_else(|| format!("tile {tile} was not drawn"))?;
    let (Some(outline), Some(index), Some(imagery)) = (
        entry.outline(),
        entry.index(renderer.generation()),
        entry.imagery(),
    ) else {
        return Err(format!("tile {tile} has no rasters"));
    };
    Ok(RenderedTile {
        tile,
        outline: outline.clone(),
        index: index.clone(),
        imagery: imagery.clone(),
        imagery_complete: entry.imagery_complete(),
        failed_loads: renderer.metrics().counter("imagery_load_failed"),
    })
}

async fn drain_loads(
    renderer: &mut TileRenderer,
    loader: &mut HttpImageLoader,
    rx: &mut mpsc::UnboundedReceiver<Completion>,
    wait: Duration,
) {
    while renderer.pending_loads() > 0 {
        match tokio::time::timeout(wait, rx.recv()).await {
            Ok(Some((request, result))) => {
                renderer.on_image_loaded(request, result, loader);
            }
            Ok(None) => break,
            Err(_) => {
                warn!(pending = renderer.pending_loads(), "timed out waiting for imagery");
                break;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickReport {
    pub id: String,
    pub ordinal: usize,
    pub anchor: Option<[f64; 2]>,
    pub label: Vec<String>,
    pub recentre: bool,
}

/// Clicks `at` on a single-collection map and reports what became sticky.
pub fn pick(
    input: &JobInput,
    config: &RendererConfig,
    zoom: u8,
    at: LonLat,
) -> Result<Option<PickReport>, String> {
    let view = TiledView::new(input.projection, zoom, config.tile_size);
    let collection = CollectionId::from("cli");

    let mut coordinator = LayerCoordinator::new(config.clone());
    coordinator.add_layer(collection.clone());
    coordinator.set_focused_collection(Some(collection.clone()));
    coordinator.set_results(&collection, input.update()?);
    coordinator.click(&view, view.project(at), HitElement::Map);

    let notes = coordinator.drain_notifications();
    let recentre = notes.iter().any(|n| matches!(n, Notification::Recenter(_)));
    let Some(layer) = coordinator.layer(&collection) else {
        return Ok(None);
    };
    let Some(sticky) = layer.selection().sticky() else {
        return Ok(None);
    };
    let marker = layer.marker();
    Ok(Some(PickReport {
        id: sticky.to_string(),
        ordinal: layer.footprints().position(sticky).unwrap_or_default(),
        anchor: marker.map(|m| [m.anchor.lon_deg, m.anchor.lat_deg]),
        label: marker.map(|m| m.label.clone()).unwrap_or_default(),
        recentre,
    }))
}

#[cfg(test)]
mod tests {
    use super::{JobInput, parse_ids, parse_tile, pick, render_tile};
    use footprints::{Footprint, FootprintId, FootprintSet, Spatial};
    use foundation::math::{LonLat, Projection};
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use raster::{RendererConfig, TileCoord, decode_ordinal};
    use std::time::Duration;

    fn input(with_imagery: bool) -> JobInput {
        let footprints = FootprintSet::new(vec![
            Footprint::new("G1", Spatial::Rectangles(vec!["30 -150 60 -120".into()]))
                .with_time(Some("2020-01-01T10:00:00Z"), Some("2020-01-01T10:05:00Z")),
        ]);
        let imagery = if with_imagery {
            serde_json::from_value(serde_json::json!([{ "product": "P", "geographic": true }]))
                .unwrap()
        } else {
            Vec::new()
        };
        JobInput {
            footprints,
            imagery,
            projection: Projection::Geographic,
            color: Some("#ff0000".into()),
            light_color: None,
            project_page: false,
        }
    }

    #[test]
    fn parses_tiles_and_ids() {
        assert_eq!(parse_tile("3/4/1"), Ok(TileCoord::new(4, 1, 3)));
        assert!(parse_tile("3/4").is_err());
        assert!(parse_tile("a/b/c").is_err());
        assert_eq!(
            parse_ids(Some("a, b,,c")),
            vec![FootprintId::from("a"), FootprintId::from("b"), FootprintId::from("c")]
        );
        assert!(parse_ids(None).is_empty());
    }

    #[tokio::test]
    async fn renders_outline_index_and_file_imagery() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(256, 256, Rgba([10, 20, 30, 255]))
            .save_with_format(dir.path().join("2-0-0.png"), ImageFormat::Png)
            .unwrap();

        let mut config = RendererConfig {
            tile_size: 256,
            ..RendererConfig::default()
        };
        config.templates.best = format!("file://{}/{{z}}-{{x}}-{{y}}.png", dir.path().display());

        let tile = TileCoord::new(0, 0, 2);
        let out = render_tile(&input(true), &config, tile, reqwest::Client::new(), Duration::from_secs(5))
            .await
            .unwrap();

        // Centre of G1 at zoom 2 is world pixel (128, 128).
        assert_eq!(decode_ordinal(*out.index.get_pixel(128, 128)), Some(0));
        assert_eq!(decode_ordinal(*out.index.get_pixel(250, 250)), None);
        assert!(out.imagery_complete);
        assert_eq!(out.failed_loads, 0);
        assert_eq!(out.imagery.get_pixel(128, 128), &Rgba([10, 20, 30, 255]));
        assert!(out.outline.pixels().any(|p| *p == Rgba([255, 0, 0, 255])));

        out.save(&dir.path().join("out")).unwrap();
        assert!(dir.path().join("out/index.png").exists());
    }

    #[tokio::test]
    async fn missing_imagery_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RendererConfig {
            tile_size: 256,
            ..RendererConfig::default()
        };
        config.templates.best = format!("file://{}/missing.png", dir.path().display());

        let out = render_tile(
            &input(true),
            &config,
            TileCoord::new(0, 0, 2),
            reqwest::Client::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(out.failed_loads, 1);
        assert!(out.imagery.pixels().all(|p| p[3] == 0));
        assert_eq!(decode_ordinal(*out.index.get_pixel(128, 128)), Some(0));
    }

    #[test]
    fn pick_reports_the_sticky_footprint() {
        let config = RendererConfig::default();
        let report = pick(&input(false), &config, 3, LonLat::new(-135.0, 45.0))
            .unwrap()
            .unwrap();
        assert_eq!(report.id, "G1");
        assert_eq!(report.ordinal, 0);
        assert_eq!(report.anchor, Some([-135.0, 45.0]));
        assert_eq!(report.label, vec!["2020-01-01 10:00:00", "2020-01-01 10:05:00"]);
        assert!(!report.recentre);

        assert!(pick(&input(false), &config, 3, LonLat::new(0.0, 0.0)).unwrap().is_none());
    }
}
