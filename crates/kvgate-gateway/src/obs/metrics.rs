//! Metrics registry for the gateway.
//!
//! Counter, gauge and histogram families are registered by name on first use
//! and keyed by their label sets, flattened into sorted key vectors to keep
//! deterministic ordering. Everything is backed by `DashMap` + atomics: a
//! mutation is one atomic operation on one field, and rendering never blocks
//! writers for longer than a shard read lock.
//!
//! Histogram buckets are fixed in microseconds to avoid floating point math
//! on the hot path; they are rendered in seconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// `{a="x",b="y"}`, or an empty string when there are no labels at all.
fn format_labels(key: &LabelKey, le: Option<&str>) -> String {
    let mut parts: Vec<String> = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{}\"", le));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let key = label_key(labels);
        if let Some(counter) = self.map.get(&key) {
            counter.fetch_add(v, Ordering::Relaxed);
            return;
        }
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        let mut rows: Vec<(LabelKey, u64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (key, val) in rows {
            let _ = writeln!(out, "{}{} {}", name, format_labels(&key, None), val);
        }
    }
}

/// Last-write-wins gauge. Values are stored as `f64` bits.
#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl GaugeVec {
    pub fn set(&self, labels: &[(&str, &str)], v: f64) {
        let key = label_key(labels);
        if let Some(gauge) = self.map.get(&key) {
            gauge.store(v.to_bits(), Ordering::Relaxed);
            return;
        }
        let gauge = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        gauge.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> f64 {
        self.map
            .get(&label_key(labels))
            .map(|g| f64::from_bits(g.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        let mut rows: Vec<(LabelKey, f64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), f64::from_bits(r.value().load(Ordering::Relaxed))))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, val) in rows {
            let _ = writeln!(out, "{}{} {}", name, format_labels(&key, None), val);
        }
    }
}

// Fixed upper bounds in microseconds:
// 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const BUCKETS_MICROS: [u64; 12] = [
    1_000, 5_000, 10_000, 25_000, 50_000, 100_000, 250_000, 500_000, 1_000_000, 2_500_000,
    5_000_000, 10_000_000,
];

/// Per-bucket (non-cumulative) counts plus one overflow slot.
///
/// Each observation touches exactly one slot, so cumulative buckets and the
/// total count computed at render time are always mutually consistent.
struct AtomicHistogram {
    slots: [AtomicU64; BUCKETS_MICROS.len() + 1],
    sum_micros: AtomicU64,
}

impl Default for AtomicHistogram {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU64::new(0)),
            sum_micros: AtomicU64::new(0),
        }
    }
}

impl AtomicHistogram {
    fn observe(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let idx = BUCKETS_MICROS
            .iter()
            .position(|&b| micros <= b)
            .unwrap_or(BUCKETS_MICROS.len());
        self.slots[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
    }

    fn count(&self) -> u64 {
        self.slots.iter().map(|s| s.load(Ordering::Relaxed)).sum()
    }
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let key = label_key(labels);
        if let Some(hist) = self.map.get(&key) {
            hist.observe(duration);
            return;
        }
        let hist = self.map.entry(key).or_default();
        hist.observe(duration);
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count())
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        let mut keys: Vec<LabelKey> = self.map.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        for key in keys {
            let Some(hist) = self.map.get(&key) else { continue };
            let slots: Vec<u64> = hist.slots.iter().map(|s| s.load(Ordering::Relaxed)).collect();
            let sum = hist.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
            drop(hist);

            let mut cumulative = 0u64;
            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                cumulative += slots[i];
                let le = (le as f64 / 1_000_000.0).to_string();
                let _ = writeln!(out, "{}_bucket{} {}", name, format_labels(&key, Some(le.as_str())), cumulative);
            }
            let count = cumulative + slots[BUCKETS_MICROS.len()];
            let _ = writeln!(out, "{}_bucket{} {}", name, format_labels(&key, Some("+Inf")), count);
            let _ = writeln!(out, "{}_sum{} {}", name, format_labels(&key, None), sum);
            let _ = writeln!(out, "{}_count{} {}", name, format_labels(&key, None), count);
        }
    }
}

enum Family {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

impl Family {
    fn kind(&self) -> &'static str {
        match self {
            Family::Counter(_) => "counter",
            Family::Gauge(_) => "gauge",
            Family::Histogram(_) => "histogram",
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        match self {
            Family::Counter(c) => c.render(name, out),
            Family::Gauge(g) => g.render(name, out),
            Family::Histogram(h) => h.render(name, out),
        }
    }
}

/// Process-wide registry of named metric families.
///
/// Construct once at startup and share via `Arc`. The first use of a name
/// fixes its kind; a later update of the same name with a different kind is
/// dropped. Reads of unknown names return zero.
#[derive(Default)]
pub struct MetricsRegistry {
    families: DashMap<String, Family>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by 1.
    pub fn increment(&self, name: &str, labels: &[(&str, &str)]) {
        self.add(name, labels, 1);
    }

    /// Increment a counter by an arbitrary value.
    pub fn add(&self, name: &str, labels: &[(&str, &str)], v: u64) {
        self.with_family(
            name,
            || Family::Counter(CounterVec::default()),
            |fam| match fam {
                Family::Counter(c) => c.add(labels, v),
                other => kind_mismatch(name, other, "counter"),
            },
        );
    }

    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], v: f64) {
        self.with_family(
            name,
            || Family::Gauge(GaugeVec::default()),
            |fam| match fam {
                Family::Gauge(g) => g.set(labels, v),
                other => kind_mismatch(name, other, "gauge"),
            },
        );
    }

    pub fn observe_duration(&self, name: &str, labels: &[(&str, &str)], duration: Duration) {
        self.with_family(
            name,
            || Family::Histogram(HistogramVec::default()),
            |fam| match fam {
                Family::Histogram(h) => h.observe(labels, duration),
                other => kind_mismatch(name, other, "histogram"),
            },
        );
    }

    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        match self.families.get(name).as_deref() {
            Some(Family::Counter(c)) => c.get(labels),
            _ => 0,
        }
    }

    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        match self.families.get(name).as_deref() {
            Some(Family::Gauge(g)) => g.get(labels),
            _ => 0.0,
        }
    }

    pub fn histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        match self.families.get(name).as_deref() {
            Some(Family::Histogram(h)) => h.count(labels),
            _ => 0,
        }
    }

    /// Render every family in Prometheus text exposition format, names sorted.
    pub fn snapshot(&self) -> String {
        let mut names: Vec<String> = self.families.iter().map(|e| e.key().clone()).collect();
        names.sort();

        let mut out = String::new();
        for name in names {
            if let Some(fam) = self.families.get(&name) {
                fam.render(&name, &mut out);
            }
        }
        out
    }

    fn with_family(&self, name: &str, make: impl FnOnce() -> Family, f: impl FnOnce(&Family)) {
        if let Some(fam) = self.families.get(name) {
            f(fam.value());
            return;
        }
        let fam = self
            .families
            .entry(name.to_string())
            .or_insert_with(make)
            .downgrade();
        f(fam.value());
    }
}

fn kind_mismatch(name: &str, existing: &Family, wanted: &'static str) {
    tracing::debug!(metric = %name, existing = existing.kind(), wanted, "metric kind mismatch, update dropped");
}
