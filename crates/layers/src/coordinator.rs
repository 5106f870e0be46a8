//! Layer Coordinator: owns every collection's [`GranuleLayer`], routes pointer
//! input and cross-layer events, and enforces that at most one footprint is
//! sticky across all layers.
//!
//! Events travel over a typed [`EventBus`] keyed by `(scope, kind)`. Handling
//! an event may publish more; [`LayerCoordinator`] drains until the bus is
//! quiet before returning, so every public entry point leaves the layers in a
//! settled state.
//!
//! Ordering contract:
//! - Layers are visited in collection-id order.
//! - Notifications are queued in the order their effects were applied.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use footprints::{FootprintId, FootprintSet};
use foundation::GeoBounds;
use foundation::math::Vec2;
use raster::{MapView, RendererConfig, ResultsUpdate, TileCoord};
use runtime::{Delivery, EventBus, Metrics, Turn};
use streaming::{ImageLoader, LoadError, Request};
use tracing::{debug, info};

use crate::layer::{CollectionId, GranuleLayer};
use crate::selection::SelectionEffect;

/// Base z-index for granule layers.
pub const LAYER_BUFFER: i32 = 20;

pub const SELECTED_GRANULE_EVENT: &str = "Selected Granule";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Collection(CollectionId),
    Map,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    FocusChanged,
    StickyChanged,
    ExcludeRequested,
    MapClick,
    MapDrawCancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub scope: Scope,
    pub kind: EventKind,
}

impl Channel {
    pub fn collection(collection: &CollectionId, kind: EventKind) -> Self {
        Self {
            scope: Scope::Collection(collection.clone()),
            kind,
        }
    }

    pub fn map(kind: EventKind) -> Self {
        Self {
            scope: Scope::Map,
            kind,
        }
    }
}

/// What the pointer was over when the map was clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitElement {
    Map,
    /// The exclude button on a sticky marker.
    DismissAffordance(FootprintId),
    /// Any other link or button drawn inside the map.
    InMapControl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Focus(Option<FootprintId>),
    Sticky(Option<FootprintId>),
    Exclude(FootprintId),
    Click(Vec2),
    DrawCancel,
}

/// Outbound changes for the application.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    FocusedFootprint {
        collection: CollectionId,
        footprint: Option<FootprintId>,
    },
    StickyFootprint {
        collection: CollectionId,
        footprint: Option<FootprintId>,
    },
    ExcludeRequested {
        collection: CollectionId,
        footprint: FootprintId,
    },
    Recenter(GeoBounds),
}

/// Inputs that decide whether a results update changes anything.
#[derive(Debug, Clone, PartialEq)]
struct UpdateKey {
    ids: Vec<FootprintId>,
    visible: bool,
    focused: bool,
    added: Vec<FootprintId>,
    removed: Vec<FootprintId>,
}

impl UpdateKey {
    fn new(set: &FootprintSet, visible: bool, focused: bool) -> Self {
        Self {
            ids: set.ids(),
            visible,
            focused,
            added: set.added().iter().cloned().collect(),
            removed: set.removed().iter().cloned().collect(),
        }
    }
}

type LayerBus = EventBus<CollectionId, Channel, LayerEvent>;

#[derive(Debug)]
pub struct LayerCoordinator {
    config: RendererConfig,
    layers: BTreeMap<CollectionId, GranuleLayer>,
    update_keys: BTreeMap<CollectionId, UpdateKey>,
    namespaces: BTreeMap<u16, CollectionId>,
    bus: LayerBus,
    focused_collection: Option<CollectionId>,
    sticky_collection: Option<CollectionId>,
    turn: Turn,
    next_namespace: u16,
    notifications: Vec<Notification>,
    metrics: Metrics,
}

impl LayerCoordinator {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            layers: BTreeMap::new(),
            update_keys: BTreeMap::new(),
            namespaces: BTreeMap::new(),
            bus: EventBus::new(),
            focused_collection: None,
            sticky_collection: None,
            turn: Turn::default(),
            next_namespace: 1,
            notifications: Vec::new(),
            metrics: Metrics::new(),
        }
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn layer(&self, collection: &CollectionId) -> Option<&GranuleLayer> {
        self.layers.get(collection)
    }

    pub fn layer_mut(&mut self, collection: &CollectionId) -> Option<&mut GranuleLayer> {
        self.layers.get_mut(collection)
    }

    pub fn layers(&self) -> impl Iterator<Item = &GranuleLayer> {
        self.layers.values()
    }

    pub fn focused_collection(&self) -> Option<&CollectionId> {
        self.focused_collection.as_ref()
    }

    pub fn sticky_collection(&self) -> Option<&CollectionId> {
        self.sticky_collection.as_ref()
    }

    pub fn subscription_count(&self) -> usize {
        self.bus.subscription_count()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Creates the layer for `collection` if it does not exist yet.
    pub fn add_layer(&mut self, collection: CollectionId) -> &mut GranuleLayer {
        let z_index = self.z_index_for(&collection);
        match self.layers.entry(collection) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let collection = entry.key().clone();
                let namespace =
                    Self::allocate_namespace(&self.namespaces, &mut self.next_namespace);
                info!(collection = %collection, namespace, "adding granule layer");

                for kind in [EventKind::FocusChanged, EventKind::StickyChanged] {
                    self.bus
                        .subscribe(collection.clone(), Channel::collection(&collection, kind));
                }
                for kind in [
                    EventKind::ExcludeRequested,
                    EventKind::MapClick,
                    EventKind::MapDrawCancel,
                ] {
                    self.bus.subscribe(collection.clone(), Channel::map(kind));
                }
                self.namespaces.insert(namespace, collection.clone());

                let mut layer = GranuleLayer::new(collection, namespace, self.config.clone());
                layer.set_z_index(z_index);
                entry.insert(layer)
            }
        }
    }

    /// Next namespace not held by a live layer. Wraps, so at most
    /// `u16::MAX + 1` layers can be live at once.
    fn allocate_namespace(namespaces: &BTreeMap<u16, CollectionId>, next_namespace: &mut u16) -> u16 {
        while namespaces.contains_key(next_namespace) {
            *next_namespace = next_namespace.wrapping_add(1);
        }
        let namespace = *next_namespace;
        *next_namespace = next_namespace.wrapping_add(1);
        namespace
    }

    /// Tears a layer down and drops its subscriptions.
    pub fn remove_layer(&mut self, collection: &CollectionId) -> bool {
        let Some(layer) = self.layers.remove(collection) else {
            return false;
        };
        let dropped = self.bus.unsubscribe_all(collection);
        info!(collection = %collection, subscriptions = dropped, "removed granule layer");
        self.namespaces.remove(&layer.renderer().namespace());
        self.update_keys.remove(collection);
        if self.sticky_collection.as_ref() == Some(collection) {
            self.sticky_collection = None;
        }
        true
    }

    fn z_index_for(&self, collection: &CollectionId) -> i32 {
        if self.focused_collection.as_ref() == Some(collection) {
            LAYER_BUFFER + 2
        } else {
            LAYER_BUFFER + 1
        }
    }

    /// Changes which collection is focused in the application. Only the
    /// focused collection's layer reacts to clicks, and it stacks on top.
    pub fn set_focused_collection(&mut self, collection: Option<CollectionId>) {
        if self.focused_collection == collection {
            return;
        }
        self.focused_collection = collection;
        let ids: Vec<CollectionId> = self.layers.keys().cloned().collect();
        for id in ids {
            let z = self.z_index_for(&id);
            if let Some(layer) = self.layers.get_mut(&id) {
                layer.set_z_index(z);
            }
        }
    }

    /// Applies new results to a layer. Returns `false` when nothing relevant
    /// changed and the update was skipped.
    pub fn set_results(&mut self, collection: &CollectionId, update: ResultsUpdate) -> bool {
        let focused = self.focused_collection.as_ref() == Some(collection);
        let key = UpdateKey::new(&update.footprints, update.visible, focused);
        if self.update_keys.get(collection) == Some(&key) {
            debug!(collection = %collection, "results unchanged, skipping update");
            return false;
        }
        let Some(layer) = self.layers.get_mut(collection) else {
            return false;
        };
        let effects = layer.set_results(update);
        self.update_keys.insert(collection.clone(), key);
        self.apply(collection, effects);
        true
    }

    /// Pins a footprint on a layer from outside the map, e.g. from the result
    /// list. Publishes like a click would.
    pub fn stick(&mut self, view: &dyn MapView, collection: &CollectionId, footprint: Option<FootprintId>) {
        self.bus.publish(
            self.turn,
            Channel::collection(collection, EventKind::FocusChanged),
            LayerEvent::Focus(footprint.clone()),
        );
        self.bus.publish(
            self.turn,
            Channel::collection(collection, EventKind::StickyChanged),
            LayerEvent::Sticky(footprint),
        );
        self.dispatch(view);
    }

    pub fn pointer_move(&mut self, view: &dyn MapView, pixel: Vec2) {
        let mut changes = Vec::new();
        for (collection, layer) in &mut self.layers {
            let hit = layer.footprint_at(view, pixel);
            if layer.selection().focused() != hit.as_ref() {
                changes.push((collection.clone(), hit));
            }
        }
        for (collection, hit) in changes {
            self.bus.publish(
                self.turn,
                Channel::collection(&collection, EventKind::FocusChanged),
                LayerEvent::Focus(hit),
            );
        }
        self.dispatch(view);
    }

    pub fn pointer_leave(&mut self, view: &dyn MapView) {
        let focused: Vec<CollectionId> = self
            .layers
            .iter()
            .filter(|(_, l)| l.selection().focused().is_some())
            .map(|(c, _)| c.clone())
            .collect();
        for collection in focused {
            self.bus.publish(
                self.turn,
                Channel::collection(&collection, EventKind::FocusChanged),
                LayerEvent::Focus(None),
            );
        }
        self.dispatch(view);
    }

    pub fn click(&mut self, view: &dyn MapView, pixel: Vec2, hit: HitElement) {
        match hit {
            HitElement::DismissAffordance(footprint) => {
                self.bus.publish(
                    self.turn,
                    Channel::map(EventKind::ExcludeRequested),
                    LayerEvent::Exclude(footprint),
                );
            }
            HitElement::InMapControl => return,
            HitElement::Map => {
                self.bus.publish(
                    self.turn,
                    Channel::map(EventKind::MapClick),
                    LayerEvent::Click(pixel),
                );
            }
        }
        self.dispatch(view);
    }

    /// The user abandoned a spatial drawing: hover focus is dropped everywhere.
    pub fn draw_cancel(&mut self, view: &dyn MapView) {
        self.bus.publish(
            self.turn,
            Channel::map(EventKind::MapDrawCancel),
            LayerEvent::DrawCancel,
        );
        self.dispatch(view);
    }

    /// The application excluded a footprint from a collection's results.
    pub fn exclude(&mut self, collection: &CollectionId, footprint: &FootprintId) {
        if let Some(layer) = self.layers.get_mut(collection) {
            let effects = layer.exclude(footprint);
            self.apply(collection, effects);
        }
    }

    fn dispatch(&mut self, view: &dyn MapView) {
        loop {
            let deliveries = self.bus.drain();
            if deliveries.is_empty() {
                break;
            }
            for delivery in deliveries {
                self.handle(view, delivery);
            }
        }
    }

    fn handle(&mut self, view: &dyn MapView, delivery: Delivery<CollectionId, Channel, LayerEvent>) {
        let collection = delivery.subscriber;
        match delivery.event {
            LayerEvent::Focus(hit) => {
                if let Some(layer) = self.layers.get_mut(&collection) {
                    let effects = layer.focus(hit);
                    self.apply(&collection, effects);
                }
            }
            LayerEvent::Sticky(footprint) => {
                let Some(layer) = self.layers.get(&collection) else {
                    return;
                };
                if let Some(id) = &footprint {
                    if layer.footprints().position(id).is_none() {
                        debug!(collection = %collection, footprint = %id, "sticky footprint not in results");
                        return;
                    }
                    self.clear_sticky_except(&collection);
                }
                if let Some(layer) = self.layers.get_mut(&collection) {
                    let effects = layer.stick(footprint.as_ref(), &view.viewport(), view.projection());
                    self.apply(&collection, effects);
                }
            }
            LayerEvent::Exclude(footprint) => {
                let Some(layer) = self.layers.get_mut(&collection) else {
                    return;
                };
                if layer.footprints().position(&footprint).is_none() {
                    return;
                }
                let effects = layer.exclude(&footprint);
                self.notifications.push(Notification::ExcludeRequested {
                    collection: collection.clone(),
                    footprint,
                });
                self.apply(&collection, effects);
            }
            LayerEvent::Click(pixel) => {
                if self.focused_collection.as_ref() != Some(&collection) {
                    return;
                }
                let Some(layer) = self.layers.get_mut(&collection) else {
                    return;
                };
                let target = layer.click_target(view, pixel);
                self.bus.publish(
                    self.turn,
                    Channel::collection(&collection, EventKind::FocusChanged),
                    LayerEvent::Focus(target.clone()),
                );
                self.bus.publish(
                    self.turn,
                    Channel::collection(&collection, EventKind::StickyChanged),
                    LayerEvent::Sticky(target),
                );
            }
            LayerEvent::DrawCancel => {
                if let Some(layer) = self.layers.get_mut(&collection) {
                    let effects = layer.focus(None);
                    self.apply(&collection, effects);
                }
            }
        }
    }

    fn clear_sticky_except(&mut self, keep: &CollectionId) {
        let others: Vec<CollectionId> = self
            .layers
            .iter()
            .filter(|(c, l)| *c != keep && l.selection().sticky().is_some())
            .map(|(c, _)| c.clone())
            .collect();
        for collection in others {
            if let Some(layer) = self.layers.get_mut(&collection) {
                let effects = layer.clear_sticky();
                self.apply(&collection, effects);
            }
        }
    }

    fn apply(&mut self, collection: &CollectionId, effects: Vec<SelectionEffect>) {
        for effect in effects {
            match effect {
                SelectionEffect::FocusChanged(footprint) => {
                    self.notifications.push(Notification::FocusedFootprint {
                        collection: collection.clone(),
                        footprint,
                    });
                }
                SelectionEffect::StickyChanged(footprint) => {
                    if footprint.is_some() {
                        self.sticky_collection = Some(collection.clone());
                        self.metrics.record_event(SELECTED_GRANULE_EVENT);
                    } else if self.sticky_collection.as_ref() == Some(collection) {
                        self.sticky_collection = None;
                    }
                    self.notifications.push(Notification::StickyFootprint {
                        collection: collection.clone(),
                        footprint,
                    });
                }
                SelectionEffect::Recenter(bounds) => {
                    self.notifications.push(Notification::Recenter(bounds));
                }
                SelectionEffect::Redraw => self.metrics.inc_counter("selection_redraws", 1),
            }
        }
    }

    pub fn request_tile(&mut self, collection: &CollectionId, tile: TileCoord) {
        if let Some(layer) = self.layers.get_mut(collection) {
            layer.renderer_mut().request_tile(tile);
        }
    }

    /// Advances one scheduling turn and runs every layer's deferred draws.
    pub fn run_turn(&mut self, view: &dyn MapView, loader: &mut dyn ImageLoader) -> usize {
        self.turn = self.turn.next();
        self.layers
            .values_mut()
            .map(|l| l.renderer_mut().run_turn(view, loader))
            .sum()
    }

    /// Routes an image completion to the layer that issued it.
    pub fn on_image_loaded(
        &mut self,
        request: Request,
        result: Result<Vec<u8>, LoadError>,
        loader: &mut dyn ImageLoader,
    ) -> Option<(CollectionId, Vec<TileCoord>)> {
        let collection = self.namespaces.get(&request.namespace())?.clone();
        let layer = self.layers.get_mut(&collection)?;
        let tiles = layer.renderer_mut().on_image_loaded(request, result, loader);
        Some((collection, tiles))
    }

    /// View geometry changed: every layer starts over with fresh tiles.
    pub fn invalidate_view(&mut self) {
        for layer in self.layers.values_mut() {
            layer.renderer_mut().invalidate_view();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HitElement, LAYER_BUFFER, LayerCoordinator, Notification, SELECTED_GRANULE_EVENT};
    use crate::layer::CollectionId;
    use footprints::{Footprint, FootprintId, FootprintSet, Spatial};
    use foundation::math::{LonLat, Projection, Vec2};
    use pretty_assertions::assert_eq;
    use raster::{MapView, RendererConfig, ResultsUpdate, TileCoord, TiledView};
    use streaming::{ImageLoader, LoadError, Request};

    #[derive(Default)]
    struct FakeLoader {
        issued: Vec<Request>,
    }

    impl ImageLoader for FakeLoader {
        fn load(&mut self, request: Request, _url: &str) {
            self.issued.push(request);
        }
    }

    fn set(ids: &[(&str, &str)]) -> FootprintSet {
        FootprintSet::new(
            ids.iter()
                .map(|(id, b)| Footprint::new(*id, Spatial::Rectangles(vec![b.to_string()])))
                .collect(),
        )
    }

    fn results(set: FootprintSet) -> ResultsUpdate {
        ResultsUpdate {
            footprints: set,
            ..ResultsUpdate::default()
        }
    }

    fn view() -> TiledView {
        TiledView::new(Projection::Geographic, 2, 256)
    }

    fn at(view: &TiledView, lon: f64, lat: f64) -> Vec2 {
        view.project(LonLat::new(lon, lat))
    }

    fn c(id: &str) -> CollectionId {
        CollectionId::from(id)
    }

    fn fid(id: &str) -> FootprintId {
        FootprintId::from(id)
    }

    fn two_layers() -> LayerCoordinator {
        let mut coord = LayerCoordinator::new(RendererConfig::default());
        coord.add_layer(c("C1"));
        coord.add_layer(c("C2"));
        coord.set_results(&c("C1"), results(set(&[("A", "0 0 10 10")])));
        coord.set_results(&c("C2"), results(set(&[("B", "40 40 50 50")])));
        coord
    }

    #[test]
    fn sticky_is_exclusive_across_layers() {
        let view = view();
        let mut coord = two_layers();
        coord.stick(&view, &c("C1"), Some(fid("A")));
        assert_eq!(coord.sticky_collection(), Some(&c("C1")));

        coord.stick(&view, &c("C2"), Some(fid("B")));
        assert_eq!(coord.layer(&c("C1")).unwrap().selection().sticky(), None);
        assert!(coord.layer(&c("C1")).unwrap().marker().is_none());
        assert_eq!(coord.layer(&c("C2")).unwrap().selection().sticky(), Some(&fid("B")));
        assert_eq!(coord.sticky_collection(), Some(&c("C2")));
        assert_eq!(coord.metrics().events(), [SELECTED_GRANULE_EVENT, SELECTED_GRANULE_EVENT]);
    }

    #[test]
    fn unknown_sticky_id_leaves_other_layers_pinned() {
        let view = view();
        let mut coord = two_layers();
        coord.stick(&view, &c("C1"), Some(fid("A")));

        coord.stick(&view, &c("C2"), Some(fid("gone")));
        assert_eq!(coord.layer(&c("C1")).unwrap().selection().sticky(), Some(&fid("A")));
        assert!(coord.layer(&c("C1")).unwrap().marker().is_some());
        assert_eq!(coord.layer(&c("C2")).unwrap().selection().sticky(), None);
        assert_eq!(coord.sticky_collection(), Some(&c("C1")));
        assert_eq!(coord.metrics().events(), [SELECTED_GRANULE_EVENT]);
    }

    #[test]
    fn clicks_act_only_on_the_focused_collection() {
        let view = view();
        let mut coord = two_layers();
        let on_a = at(&view, 5.0, 5.0);

        coord.click(&view, on_a, HitElement::Map);
        assert_eq!(coord.layer(&c("C1")).unwrap().selection().sticky(), None);

        coord.set_focused_collection(Some(c("C1")));
        coord.click(&view, on_a, HitElement::Map);
        assert_eq!(coord.layer(&c("C1")).unwrap().selection().sticky(), Some(&fid("A")));

        // Links inside the map neither select nor clear.
        coord.click(&view, on_a, HitElement::InMapControl);
        assert_eq!(coord.layer(&c("C1")).unwrap().selection().sticky(), Some(&fid("A")));

        // Clicking the sticky footprint again toggles it off.
        coord.click(&view, on_a, HitElement::Map);
        assert_eq!(coord.layer(&c("C1")).unwrap().selection().sticky(), None);
        assert_eq!(coord.sticky_collection(), None);
    }

    #[test]
    fn hover_notifies_focus_and_leave_clears_it() {
        let view = view();
        let mut coord = two_layers();
        coord.pointer_move(&view, at(&view, 45.0, 45.0));
        coord.pointer_move(&view, at(&view, 45.0, 45.0));
        assert_eq!(
            coord.drain_notifications(),
            vec![Notification::FocusedFootprint {
                collection: c("C2"),
                footprint: Some(fid("B")),
            }]
        );

        coord.pointer_leave(&view);
        assert_eq!(coord.layer(&c("C2")).unwrap().selection().focused(), None);
        assert_eq!(coord.drain_notifications().len(), 1);
    }

    #[test]
    fn dismiss_affordance_requests_exclusion() {
        let view = view();
        let mut coord = two_layers();
        coord.stick(&view, &c("C2"), Some(fid("B")));
        coord.drain_notifications();

        coord.click(&view, Vec2::new(0.0, 0.0), HitElement::DismissAffordance(fid("B")));
        let notes = coord.drain_notifications();
        assert!(notes.contains(&Notification::ExcludeRequested {
            collection: c("C2"),
            footprint: fid("B"),
        }));
        assert_eq!(coord.layer(&c("C2")).unwrap().selection().sticky(), None);
        assert!(coord.layer(&c("C2")).unwrap().marker().is_none());
    }

    #[test]
    fn sticky_outside_viewport_recentres_once() {
        let view = view().with_viewport(foundation::GeoBounds::new(-20.0, -20.0, 20.0, 20.0));
        let mut coord = two_layers();
        coord.stick(&view, &c("C2"), Some(fid("B")));
        let recentres = coord
            .drain_notifications()
            .into_iter()
            .filter(|n| matches!(n, Notification::Recenter(_)))
            .count();
        assert_eq!(recentres, 1);
    }

    #[test]
    fn unchanged_results_are_skipped() {
        let mut coord = two_layers();
        assert!(!coord.set_results(&c("C1"), results(set(&[("A", "0 0 10 10")]))));
        assert!(coord.set_results(
            &c("C1"),
            results(set(&[("A", "0 0 10 10")]).with_overrides(vec![], vec![fid("A")]))
        ));
        coord.set_focused_collection(Some(c("C1")));
        assert!(coord.set_results(
            &c("C1"),
            results(set(&[("A", "0 0 10 10")]).with_overrides(vec![], vec![fid("A")]))
        ));
    }

    #[test]
    fn focused_collection_stacks_on_top() {
        let mut coord = two_layers();
        coord.set_focused_collection(Some(c("C2")));
        assert_eq!(coord.layer(&c("C1")).unwrap().z_index(), LAYER_BUFFER + 1);
        assert_eq!(coord.layer(&c("C2")).unwrap().z_index(), LAYER_BUFFER + 2);
    }

    #[test]
    fn namespaces_wrap_past_live_layers() {
        let mut coord = LayerCoordinator::new(RendererConfig::default());
        coord.next_namespace = u16::MAX;
        coord.add_layer(c("C1"));
        coord.add_layer(c("C2"));
        assert_eq!(coord.layer(&c("C1")).unwrap().renderer().namespace(), u16::MAX);
        assert_eq!(coord.layer(&c("C2")).unwrap().renderer().namespace(), 0);

        coord.next_namespace = u16::MAX;
        coord.add_layer(c("C3"));
        assert_eq!(coord.layer(&c("C3")).unwrap().renderer().namespace(), 1);
    }

    #[test]
    fn teardown_drops_subscriptions() {
        let mut coord = two_layers();
        assert_eq!(coord.subscription_count(), 10);
        assert!(coord.remove_layer(&c("C1")));
        assert_eq!(coord.subscription_count(), 5);
        assert!(!coord.remove_layer(&c("C1")));
    }

    #[test]
    fn draw_cancel_clears_focus() {
        let view = view();
        let mut coord = two_layers();
        coord.pointer_move(&view, at(&view, 5.0, 5.0));
        assert!(coord.layer(&c("C1")).unwrap().selection().focused().is_some());
        coord.draw_cancel(&view);
        assert!(coord.layer(&c("C1")).unwrap().selection().focused().is_none());
    }

    #[test]
    fn image_completions_route_by_namespace() {
        let view = view();
        let mut coord = LayerCoordinator::new(RendererConfig::default());
        coord.add_layer(c("C1"));
        coord.set_results(
            &c("C1"),
            ResultsUpdate {
                footprints: FootprintSet::new(vec![
                    Footprint::new("A", Spatial::Rectangles(vec!["0 0 10 10".into()]))
                        .with_time(Some("2020-01-01T00:00:00Z"), None),
                ]),
                imagery: imagery(),
                ..ResultsUpdate::default()
            },
        );
        let tile = TileCoord::new(2, 0, 2);
        coord.request_tile(&c("C1"), tile);
        let mut loader = FakeLoader::default();
        assert_eq!(coord.run_turn(&view, &mut loader), 1);
        assert_eq!(loader.issued.len(), 1);

        let req = loader.issued[0];
        let routed = coord.on_image_loaded(req, Err(LoadError::Network("down".into())), &mut loader);
        assert_eq!(routed, Some((c("C1"), vec![])));
        assert!(coord
            .on_image_loaded(Request::new(99, 0), Err(LoadError::Status(404)), &mut loader)
            .is_none());
    }

    fn imagery() -> Vec<raster::ImageryOptionSet> {
        let tags = serde_json::json!({
            "edsc.extra.serverless.gibs": {
                "data": [{ "product": "P", "geographic": true, "resolution": "1km" }]
            }
        });
        raster::option_sets_from_tags(&tags).unwrap()
    }
}
