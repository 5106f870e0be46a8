//! Per-collection tile renderer.
//!
//! Tile requests are deferred to the next [`TileRenderer::run_turn`] so a
//! burst of updates paints once. Each draw computes one fragment list and
//! derives all three rasters from it, then issues imagery loads for the
//! tile's groups. Loads carry the set generation they were issued under;
//! completions from an older generation are discarded.

use std::collections::BTreeMap;
use std::sync::Arc;

use footprints::{Footprint, FootprintId, FootprintSet};
use foundation::math::{Projection, Vec2};
use image::{Rgba, RgbaImage};
use runtime::{DeferredQueue, Metrics};
use streaming::{ImageCache, ImageLoader, ImageLoads, LoadError, LoadOutcome, Request};
use tracing::{debug, warn};

use crate::clipper::{Fragment, TileWindow, tile_fragments};
use crate::compositor::{OutlineStyle, TileRaster, draw_index, draw_tile};
use crate::config::RendererConfig;
use crate::imagery::{ImageryOptionSet, ImageryResolver};
use crate::path::ProjectedPath;
use crate::picking::pick_footprint;
use crate::projector::project_footprint;
use crate::view::{MapView, TileCoord};

/// Everything a layer hands the renderer when its results change.
#[derive(Debug, Clone)]
pub struct ResultsUpdate {
    pub footprints: FootprintSet,
    pub imagery: Vec<ImageryOptionSet>,
    pub color: Rgba<u8>,
    pub light_color: Rgba<u8>,
    pub project_page: bool,
    pub visible: bool,
}

impl Default for ResultsUpdate {
    fn default() -> Self {
        let style = OutlineStyle::default();
        Self {
            footprints: FootprintSet::default(),
            imagery: Vec::new(),
            color: style.color,
            light_color: style.light_color,
            project_page: false,
            visible: true,
        }
    }
}

/// Where an imagery image lands once loaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTarget {
    pub tile: TileCoord,
    pub draw: u64,
    pub group: usize,
}

#[derive(Debug, Default)]
pub struct TileEntry {
    raster: Option<(u64, TileRaster)>,
    draw: u64,
}

impl TileEntry {
    pub fn outline(&self) -> Option<&RgbaImage> {
        self.raster.as_ref().map(|(_, r)| &r.outline)
    }

    pub fn imagery(&self) -> Option<&RgbaImage> {
        self.raster.as_ref().map(|(_, r)| r.imagery.raster())
    }

    pub fn imagery_complete(&self) -> bool {
        self.raster
            .as_ref()
            .is_some_and(|(_, r)| r.imagery.is_complete())
    }

    /// Index raster drawn for `generation`, if one exists.
    pub fn index(&self, generation: u64) -> Option<&RgbaImage> {
        match &self.raster {
            Some((g, r)) if *g == generation => Some(&r.index),
            _ => None,
        }
    }

    pub fn is_drawn(&self) -> bool {
        self.raster.is_some()
    }
}

pub struct TileRenderer {
    config: RendererConfig,
    footprints: FootprintSet,
    resolver: ImageryResolver,
    style: OutlineStyle,
    visible: bool,
    focused: Option<FootprintId>,
    sticky: Option<FootprintId>,
    generation: u64,
    projected: Option<(Projection, Vec<Vec<ProjectedPath>>)>,
    tiles: BTreeMap<TileCoord, TileEntry>,
    /// Index rasters drawn only for picking, for tiles the host never
    /// requested. Never scheduled, drawn in full or fetched.
    lazy_indexes: BTreeMap<TileCoord, (u64, RgbaImage)>,
    deferred: DeferredQueue<TileCoord, ()>,
    loads: ImageLoads<LoadTarget>,
    cache: ImageCache,
    metrics: Metrics,
    next_draw: u64,
}

impl std::fmt::Debug for TileRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileRenderer")
            .field("namespace", &self.loads.namespace())
            .field("generation", &self.generation)
            .field("footprints", &self.footprints.len())
            .field("tiles", &self.tiles.len())
            .field("pending_loads", &self.loads.len())
            .finish()
    }
}

impl TileRenderer {
    /// `namespace` tags every image request this renderer issues.
    pub fn new(namespace: u16, config: RendererConfig) -> Self {
        Self {
            resolver: ImageryResolver::new(config.templates.clone(), Vec::new()),
            loads: ImageLoads::new(namespace, config.max_retries),
            cache: ImageCache::new(config.image_cache),
            config,
            footprints: FootprintSet::default(),
            style: OutlineStyle::default(),
            visible: true,
            focused: None,
            sticky: None,
            generation: 0,
            projected: None,
            tiles: BTreeMap::new(),
            lazy_indexes: BTreeMap::new(),
            deferred: DeferredQueue::new(),
            metrics: Metrics::new(),
            next_draw: 0,
        }
    }

    pub fn namespace(&self) -> u16 {
        self.loads.namespace()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn footprints(&self) -> &FootprintSet {
        &self.footprints
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn style(&self) -> &OutlineStyle {
        &self.style
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut Metrics {
        &mut self.metrics
    }

    pub fn tile(&self, tile: &TileCoord) -> Option<&TileEntry> {
        self.tiles.get(tile)
    }

    pub fn tile_coords(&self) -> Vec<TileCoord> {
        self.tiles.keys().copied().collect()
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    pub fn pending_draws(&self) -> usize {
        self.deferred.len()
    }

    /// Replaces the footprint set and style. Invisible collections keep
    /// their tiles but render an empty set.
    pub fn set_results(&mut self, update: ResultsUpdate) {
        self.visible = update.visible;
        self.footprints = if update.visible {
            update.footprints
        } else {
            FootprintSet::default()
        };
        self.resolver = ImageryResolver::new(self.config.templates.clone(), update.imagery);
        self.style.color = update.color;
        self.style.light_color = update.light_color;
        self.style.project_page = update.project_page;
        self.projected = None;
        self.bump_generation();
    }

    /// Moves a footprint to the front of the set so it draws on top.
    pub fn promote(&mut self, id: &FootprintId) -> bool {
        match self.footprints.position(id) {
            None => false,
            Some(0) => true,
            Some(pos) => {
                self.footprints.promote(id);
                if let Some((_, paths)) = &mut self.projected {
                    let moved = paths.remove(pos);
                    paths.insert(0, moved);
                }
                self.bump_generation();
                true
            }
        }
    }

    /// Sets the focused and sticky footprints. Returns whether anything
    /// changed; if so every tile is redrawn on the next turn.
    pub fn set_emphasis(&mut self, focused: Option<FootprintId>, sticky: Option<FootprintId>) -> bool {
        if self.focused == focused && self.sticky == sticky {
            return false;
        }
        self.focused = focused;
        self.sticky = sticky;
        self.refresh_emphasis();
        self.schedule_all();
        true
    }

    fn refresh_emphasis(&mut self) {
        self.style.emphasized = [&self.focused, &self.sticky]
            .into_iter()
            .flatten()
            .filter_map(|id| self.footprints.position(id))
            .collect();
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        self.refresh_emphasis();
        self.lazy_indexes.clear();
        let dropped = self.loads.cancel_before(self.generation);
        if dropped > 0 {
            debug!(dropped, generation = self.generation, "cancelled imagery loads");
        }
        self.schedule_all();
    }

    fn schedule_all(&mut self) {
        for tile in self.tiles.keys() {
            self.deferred.schedule(*tile, ());
        }
    }

    /// Marks a tile as wanted. The draw happens on the next turn.
    pub fn request_tile(&mut self, tile: TileCoord) {
        self.lazy_indexes.remove(&tile);
        self.tiles.entry(tile).or_default();
        self.deferred.schedule(tile, ());
    }

    /// The host no longer shows this tile.
    pub fn drop_tile(&mut self, tile: TileCoord) {
        self.tiles.remove(&tile);
        self.lazy_indexes.remove(&tile);
        self.deferred.cancel(&tile);
        self.loads.cancel_targets(|t| t.tile == tile);
    }

    /// Zoom or projection changed: every tile and load is void.
    pub fn invalidate_view(&mut self) {
        self.tiles.clear();
        self.lazy_indexes.clear();
        self.deferred.clear();
        self.loads.clear();
        self.projected = None;
    }

    fn ensure_projected(&mut self, projection: Projection) {
        if matches!(&self.projected, Some((p, _)) if *p == projection) {
            return;
        }
        let step = self.config.geodetic_max_step_deg;
        let paths = self
            .footprints
            .iter()
            .map(|(_, f)| project_footprint(f, projection, step))
            .collect();
        self.projected = Some((projection, paths));
    }

    fn fragments(&mut self, view: &dyn MapView, tile: TileCoord) -> Vec<Fragment> {
        self.ensure_projected(view.projection());
        let Some((_, projected)) = &self.projected else {
            return Vec::new();
        };
        let window = TileWindow::new(view, tile);
        tile_fragments(
            &self.footprints,
            projected,
            &window,
            self.config.tile_pad_fraction,
            self.style.project_page,
        )
    }

    /// Runs the deferred draws. Returns how many tiles were drawn.
    pub fn run_turn(&mut self, view: &dyn MapView, loader: &mut dyn ImageLoader) -> usize {
        let mut drawn = 0;
        for (tile, ()) in self.deferred.drain() {
            if !self.tiles.contains_key(&tile) || tile.z != view.zoom() {
                continue;
            }
            self.draw(view, tile, loader);
            drawn += 1;
        }
        drawn
    }

    fn draw(&mut self, view: &dyn MapView, tile: TileCoord, loader: &mut dyn ImageLoader) {
        let mut fragments = self.fragments(view, tile);

        if !self.resolver.is_empty() {
            let rows = view.tile_rows();
            let projection = view.projection();
            let mut urls: BTreeMap<usize, Option<String>> = BTreeMap::new();
            for fragment in &mut fragments {
                let ordinal = fragment.ordinal;
                fragment.url = urls
                    .entry(ordinal)
                    .or_insert_with(|| {
                        self.footprints
                            .get(ordinal)
                            .and_then(|f| self.resolver.tile_url(f, projection, tile, rows))
                    })
                    .clone();
            }
        }

        debug!(tile = %tile, fragments = fragments.len(), generation = self.generation, "drawing tile");
        self.metrics.inc_counter("tiles_drawn", 1);
        self.metrics
            .record_histogram("tile_fragments", fragments.len() as u64);

        let mut raster = draw_tile(&fragments, view.tile_size(), &self.style, &self.config);
        self.next_draw += 1;
        let draw = self.next_draw;

        let urls: Vec<String> = raster
            .imagery
            .groups()
            .iter()
            .map(|g| g.url.clone())
            .collect();
        for (group, url) in urls.iter().enumerate() {
            if let Some(image) = self.cache.get(url) {
                raster.imagery.resolve(group, Some(image));
            } else {
                let target = LoadTarget { tile, draw, group };
                self.loads.issue(url, self.generation, target, loader);
            }
        }

        let entry = self.tiles.entry(tile).or_default();
        entry.raster = Some((self.generation, raster));
        entry.draw = draw;
    }

    /// Feeds a completed image load back in. Returns the tiles whose imagery
    /// raster changed.
    pub fn on_image_loaded(
        &mut self,
        request: Request,
        result: Result<Vec<u8>, LoadError>,
        loader: &mut dyn ImageLoader,
    ) -> Vec<TileCoord> {
        let (image, targets) = match self.loads.complete(request, result, self.generation, loader) {
            LoadOutcome::Loaded { url, image, targets } => {
                let image = Arc::new(image);
                if let Err(e) = self.cache.insert(url, Arc::clone(&image)) {
                    debug!(error = %e, "imagery not cached");
                }
                (Some(image), targets)
            }
            LoadOutcome::Failed { url, error, targets } => {
                warn!(url = %url, error = %error, "imagery load failed, skipping");
                self.metrics.inc_counter("imagery_load_failed", 1);
                (None, targets)
            }
            LoadOutcome::Retrying { .. } => {
                self.metrics.inc_counter("imagery_load_retried", 1);
                return Vec::new();
            }
            LoadOutcome::Stale { .. } => {
                self.metrics.inc_counter("imagery_load_stale", 1);
                return Vec::new();
            }
            LoadOutcome::Unknown => return Vec::new(),
        };

        let mut changed = Vec::new();
        for target in targets {
            let Some(entry) = self.tiles.get_mut(&target.tile) else {
                continue;
            };
            if entry.draw != target.draw {
                continue;
            }
            if let Some((_, raster)) = &mut entry.raster
                && raster.imagery.resolve(target.group, image.clone()) > 0
                && !changed.contains(&target.tile)
            {
                changed.push(target.tile);
            }
        }
        changed
    }

    fn index(&self, tile: &TileCoord) -> Option<&RgbaImage> {
        let generation = self.generation;
        self.tiles
            .get(tile)
            .and_then(|e| e.index(generation))
            .or_else(|| match self.lazy_indexes.get(tile) {
                Some((g, index)) if *g == generation => Some(index),
                _ => None,
            })
    }

    fn ensure_index(&mut self, view: &dyn MapView, tile: TileCoord) {
        if self.index(&tile).is_some() {
            return;
        }
        let fragments = self.fragments(view, tile);
        let index = draw_index(&fragments, view.tile_size(), &self.config);
        self.metrics.inc_counter("index_lazy_draws", 1);
        self.lazy_indexes.insert(tile, (self.generation, index));
    }

    /// Footprint under a world pixel. Draws the tile's index raster first if
    /// it is missing or out of date.
    pub fn footprint_at(&mut self, view: &dyn MapView, pixel: Vec2) -> Option<(usize, &Footprint)> {
        if !pixel.is_finite() || self.footprints.is_empty() {
            return None;
        }
        let (tile, local) = view.tile_at(pixel);
        self.ensure_index(view, tile);
        let index = self.index(&tile)?;
        pick_footprint(&self.footprints, index, local)
    }
}
