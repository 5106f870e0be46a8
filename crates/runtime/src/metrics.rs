use std::collections::BTreeMap;

/// Side-channel for counters and named user-facing events.
///
/// Nothing in the rendering core reports failure through return values; it
/// records here instead and the host decides what to surface. Sorted maps keep
/// snapshots stable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    histograms: BTreeMap<&'static str, Histogram>,
    events: Vec<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: u64,
    pub max: u64,
}

impl Histogram {
    pub fn record(&mut self, value: u64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn record_histogram(&mut self, name: &'static str, value: u64) {
        self.histograms.entry(name).or_default().record(value);
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }

    /// Records a named interaction event (e.g. `"Selected Granule"`).
    pub fn record_event(&mut self, name: impl Into<String>) {
        self.events.push(name.into());
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    /// Folds another metrics set into this one, keeping event order.
    pub fn merge(&mut self, other: &Metrics) {
        for (k, v) in &other.counters {
            *self.counters.entry(*k).or_insert(0) += v;
        }
        for (k, h) in &other.histograms {
            let mine = self.histograms.entry(*k).or_default();
            mine.count += h.count;
            mine.sum += h.sum;
            mine.max = mine.max.max(h.max);
        }
        self.events.extend(other.events.iter().cloned());
    }
}
