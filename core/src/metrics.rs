use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Egen registry for kjernen; verten kan hente tekstformatet via `gather_text`.
pub struct Metrics {
    registry: Registry,
    merge_total: IntCounter,
    merge_errors_total: IntCounter,
    reimport_tours_total: IntCounterVec,
}

impl Metrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let merge_total = IntCounter::new("tourmerge_merge_total", "Number of merge computations")?;
        let merge_errors_total =
            IntCounter::new("tourmerge_merge_errors_total", "Merge computations rejected with an error")?;
        let reimport_tours_total = IntCounterVec::new(
            Opts::new("tourmerge_reimport_tours_total", "Re-imported tours by outcome"),
            &["status"],
        )?;

        registry.register(Box::new(merge_total.clone()))?;
        registry.register(Box::new(merge_errors_total.clone()))?;
        registry.register(Box::new(reimport_tours_total.clone()))?;

        Ok(Self {
            registry,
            merge_total,
            merge_errors_total,
            reimport_tours_total,
        })
    }
}

// Navnene over er statiske og gyldige, så registreringen kan ikke feile.
static METRICS: Lazy<Metrics> = Lazy::new(|| match Metrics::new() {
    Ok(m) => m,
    Err(e) => panic!("metric registration failed: {e}"),
});

pub fn merge_total() -> &'static IntCounter {
    &METRICS.merge_total
}

pub fn merge_errors_total() -> &'static IntCounter {
    &METRICS.merge_errors_total
}

/// Teller for re-import, label = "reimported" | "skipped" | "failed" | "cancelled".
pub fn reimport_tours_total(status: &str) -> IntCounter {
    METRICS.reimport_tours_total.with_label_values(&[status])
}

/// Prometheus tekstformat for alle kjernemetrikker.
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&METRICS.registry.gather(), &mut buffer) {
        log::warn!("metrics encode failed: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
