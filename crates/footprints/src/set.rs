use std::collections::BTreeSet;

use crate::footprint::{Footprint, FootprintId};
use crate::ingest::{IngestError, parse_granules};

/// Ordered footprints for one collection plus the project overrides.
///
/// Ordering contract: a footprint's ordinal is its index in `footprints` and
/// stays fixed until the set is replaced or [`FootprintSet::promote`] runs.
/// Index rasters encode these ordinals, so any reorder must invalidate them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootprintSet {
    footprints: Vec<Footprint>,
    added: BTreeSet<FootprintId>,
    removed: BTreeSet<FootprintId>,
}

impl FootprintSet {
    pub fn new(footprints: Vec<Footprint>) -> Self {
        Self {
            footprints,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        Ok(Self::new(parse_granules(json)?))
    }

    pub fn with_overrides(
        mut self,
        added: impl IntoIterator<Item = FootprintId>,
        removed: impl IntoIterator<Item = FootprintId>,
    ) -> Self {
        self.added = added.into_iter().collect();
        self.removed = removed.into_iter().collect();
        self
    }

    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&Footprint> {
        self.footprints.get(ordinal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Footprint)> {
        self.footprints.iter().enumerate()
    }

    pub fn position(&self, id: &FootprintId) -> Option<usize> {
        self.footprints.iter().position(|f| &f.id == id)
    }

    pub fn find(&self, id: &FootprintId) -> Option<&Footprint> {
        self.footprints.iter().find(|f| &f.id == id)
    }

    pub fn ids(&self) -> Vec<FootprintId> {
        self.footprints.iter().map(|f| f.id.clone()).collect()
    }

    pub fn added(&self) -> &BTreeSet<FootprintId> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<FootprintId> {
        &self.removed
    }

    pub fn has_overrides(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Deemphasis flag for a footprint, `None` when no override is active.
    ///
    /// With `added` non-empty, everything not added is deemphasized. With
    /// `removed` non-empty, removed footprints are deemphasized. When both are
    /// set the removed rule decides.
    pub fn deemphasized(&self, id: &FootprintId) -> Option<bool> {
        let mut flag = None;
        if !self.added.is_empty() {
            flag = Some(!self.added.contains(id));
        }
        if !self.removed.is_empty() {
            flag = Some(self.removed.contains(id));
        }
        flag
    }

    /// Whether the project page should leave this footprint out entirely.
    pub fn is_excluded(&self, id: &FootprintId) -> bool {
        (!self.added.is_empty() && !self.added.contains(id))
            || (!self.removed.is_empty() && self.removed.contains(id))
    }

    /// Moves a footprint to the front so it draws first and picks first.
    /// Returns `false` when the id is unknown. Ordinals of the footprints
    /// before it shift by one.
    pub fn promote(&mut self, id: &FootprintId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if pos > 0 {
            let fp = self.footprints.remove(pos);
            self.footprints.insert(0, fp);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::FootprintSet;
    use crate::footprint::{Footprint, FootprintId, Spatial};
    use pretty_assertions::assert_eq;

    fn set_of(ids: &[&str]) -> FootprintSet {
        FootprintSet::new(
            ids.iter()
                .map(|id| Footprint::new(*id, Spatial::Points(vec!["0 0".into()])))
                .collect(),
        )
    }

    fn flags(set: &FootprintSet) -> Vec<Option<bool>> {
        set.iter().map(|(_, f)| set.deemphasized(&f.id)).collect()
    }

    #[test]
    fn no_overrides_means_no_deemphasis() {
        let set = set_of(&["id1", "id2"]);
        assert!(!set.has_overrides());
        assert_eq!(flags(&set), vec![None, None]);
        assert!(!set.is_excluded(&"id1".into()));
    }

    #[test]
    fn added_override_deemphasizes_everything_else() {
        let set = set_of(&["id1", "id2", "id3"]).with_overrides(vec!["id2".into()], vec![]);
        assert_eq!(flags(&set), vec![Some(true), Some(false), Some(true)]);
        assert!(set.is_excluded(&"id1".into()));
        assert!(!set.is_excluded(&"id2".into()));
    }

    #[test]
    fn removed_override_deemphasizes_removed_only() {
        let set = set_of(&["id1", "id2", "id3"]).with_overrides(vec![], vec!["id3".into()]);
        assert_eq!(flags(&set), vec![Some(false), Some(false), Some(true)]);
        assert!(set.is_excluded(&"id3".into()));
    }

    #[test]
    fn promote_moves_to_front_and_keeps_the_rest_in_order() {
        let mut set = set_of(&["a", "b", "c"]);
        assert!(set.promote(&FootprintId::from("c")));
        let ids: Vec<String> = set.ids().into_iter().map(|i| i.0).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(!set.promote(&"zzz".into()));
        assert_eq!(set.position(&"b".into()), Some(2));
    }

    #[test]
    fn from_json_builds_ordered_set() {
        let set = FootprintSet::from_json(r#"[{"id":"A","points":["0 0"]},{"id":"B"}]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).map(|f| f.id.as_str()), Some("B"));
        assert!(set.get(2).is_none());
    }
}
