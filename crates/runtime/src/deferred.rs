/// Coalescing queue of work deferred to the next scheduling turn.
///
/// Key properties:
/// - Each key is pending at most once; rescheduling a pending key replaces
///   its payload but keeps its original position.
/// - Draining yields keys in first-scheduled order.
/// - Cancellation does not perturb the order of remaining items.
///
/// Vec-backed: pending sets are small (visible tiles of one layer).
#[derive(Debug)]
pub struct DeferredQueue<K, T> {
    items: Vec<(K, T)>,
}

impl<K, T> Default for DeferredQueue<K, T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<K: PartialEq, T> DeferredQueue<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    /// Returns `true` if the key was newly scheduled, `false` if it coalesced
    /// into an already pending entry.
    pub fn schedule(&mut self, key: K, payload: T) -> bool {
        if let Some((_, existing)) = self.items.iter_mut().find(|(k, _)| *k == key) {
            *existing = payload;
            return false;
        }
        self.items.push((key, payload));
        true
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.items.len();
        self.items.retain(|(k, _)| k != key);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Takes every pending item, oldest first.
    pub fn drain(&mut self) -> Vec<(K, T)> {
        std::mem::take(&mut self.items)
    }
}
