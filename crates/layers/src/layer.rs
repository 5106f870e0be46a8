use footprints::{FootprintId, FootprintSet};
use foundation::GeoBounds;
use foundation::math::{Projection, Vec2};
use raster::{MapView, RendererConfig, ResultsUpdate, TileRenderer};
use tracing::debug;

use crate::marker::StickyMarker;
use crate::selection::{SelectionEffect, SelectionState};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionId(pub String);

impl From<&str> for CollectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One collection's footprints on the map: its tile renderer, its selection
/// and the sticky marker.
///
/// The layer keeps the result set in the order it was given. While a
/// footprint is sticky the renderer sees it moved to the front.
#[derive(Debug)]
pub struct GranuleLayer {
    collection: CollectionId,
    renderer: TileRenderer,
    selection: SelectionState,
    marker: Option<StickyMarker>,
    results: ResultsUpdate,
    z_index: i32,
}

impl GranuleLayer {
    pub fn new(collection: CollectionId, namespace: u16, config: RendererConfig) -> Self {
        Self {
            collection,
            renderer: TileRenderer::new(namespace, config),
            selection: SelectionState::new(),
            marker: None,
            results: ResultsUpdate::default(),
            z_index: 0,
        }
    }

    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    pub fn renderer(&self) -> &TileRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut TileRenderer {
        &mut self.renderer
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn marker(&self) -> Option<&StickyMarker> {
        self.marker.as_ref()
    }

    pub fn results(&self) -> &ResultsUpdate {
        &self.results
    }

    /// Footprints as given, before sticky promotion.
    pub fn footprints(&self) -> &FootprintSet {
        &self.results.footprints
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn set_z_index(&mut self, z_index: i32) {
        self.z_index = z_index;
    }

    /// Replaces the results. A sticky footprint missing from the new set is
    /// unpinned and its marker removed.
    pub fn set_results(&mut self, update: ResultsUpdate) -> Vec<SelectionEffect> {
        self.results = update;
        let mut effects = Vec::new();
        if let Some(sticky) = self.selection.sticky().cloned()
            && (!self.results.visible || self.results.footprints.position(&sticky).is_none())
        {
            debug!(collection = %self.collection, footprint = %sticky, "sticky footprint left the results");
            effects.extend(self.selection.clear_sticky());
            self.marker = None;
        }
        if let Some(focused) = self.selection.focused().cloned()
            && (!self.results.visible || self.results.footprints.position(&focused).is_none())
        {
            effects.extend(self.selection.focus(None));
        }
        self.push_results();
        effects
    }

    fn push_results(&mut self) {
        self.renderer.set_results(self.results.clone());
        if let Some(sticky) = self.selection.sticky() {
            self.renderer.promote(sticky);
        }
        self.sync_emphasis();
    }

    fn sync_emphasis(&mut self) {
        self.renderer.set_emphasis(
            self.selection.focused().cloned(),
            self.selection.sticky().cloned(),
        );
    }

    /// Footprint id under a world pixel.
    pub fn footprint_at(&mut self, view: &dyn MapView, pixel: Vec2) -> Option<FootprintId> {
        self.renderer
            .footprint_at(view, pixel)
            .map(|(_, f)| f.id.clone())
    }

    pub fn focus(&mut self, hit: Option<FootprintId>) -> Vec<SelectionEffect> {
        let effects = self.selection.focus(hit);
        self.sync_emphasis();
        effects
    }

    /// What a click at `pixel` should pin, with toggle-off applied.
    pub fn click_target(&mut self, view: &dyn MapView, pixel: Vec2) -> Option<FootprintId> {
        let hit = self.footprint_at(view, pixel);
        self.selection.click_target(hit)
    }

    /// Pins `id`, or clears the pin. Pinning moves the footprint to the front
    /// and places its marker.
    pub fn stick(
        &mut self,
        id: Option<&FootprintId>,
        viewport: &GeoBounds,
        projection: Projection,
    ) -> Vec<SelectionEffect> {
        let footprint = id.and_then(|id| self.results.footprints.find(id));
        let effects = self.selection.stick(footprint, viewport, projection);
        if effects.is_empty() {
            return effects;
        }
        self.marker = footprint.and_then(|f| StickyMarker::for_footprint(f, self.results.color));
        match self.selection.sticky().cloned() {
            Some(sticky) => {
                self.renderer.promote(&sticky);
                self.sync_emphasis();
            }
            None => self.push_results(),
        }
        effects
    }

    pub fn clear_sticky(&mut self) -> Vec<SelectionEffect> {
        let effects = self.selection.clear_sticky();
        if !effects.is_empty() {
            self.marker = None;
            self.push_results();
        }
        effects
    }

    pub fn exclude(&mut self, id: &FootprintId) -> Vec<SelectionEffect> {
        let effects = self.selection.exclude(id);
        if self.marker.as_ref().is_some_and(|m| m.footprint == *id) {
            self.marker = None;
        }
        if !effects.is_empty() {
            self.push_results();
        }
        effects
    }
}
