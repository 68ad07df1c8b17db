use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the search service
#[derive(Clone)]
pub struct SearchMetrics {
    // Counters
    pub searches_total: CounterVec,
    pub search_errors: CounterVec,
    pub dac_conditions_injected: Counter,

    // Gauges
    pub metadata_generation: Gauge,

    // Histograms
    pub search_latency: HistogramVec,

    // Registry
    registry: Arc<Registry>,
}

impl SearchMetrics {
    /// Create a new SearchMetrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Counters
        let searches_total = CounterVec::new(
            Opts::new("querygate_searches_total", "Total number of searches by entity"),
            &["entity"],
        )?;
        registry.register(Box::new(searches_total.clone()))?;

        let search_errors = CounterVec::new(
            Opts::new("querygate_search_errors_total", "Total number of failed searches by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(search_errors.clone()))?;

        let dac_conditions_injected = Counter::with_opts(Opts::new(
            "querygate_dac_conditions_injected_total",
            "Total number of access-rule conditions added to searches",
        ))?;
        registry.register(Box::new(dac_conditions_injected.clone()))?;

        // Gauges
        let metadata_generation = Gauge::with_opts(Opts::new(
            "querygate_metadata_generation",
            "Generation of the metadata snapshot used by the last search",
        ))?;
        registry.register(Box::new(metadata_generation.clone()))?;

        // Histograms
        let search_latency = HistogramVec::new(
            HistogramOpts::new("querygate_search_latency_seconds", "Search latency including the backend call")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["entity"],
        )?;
        registry.register(Box::new(search_latency.clone()))?;

        Ok(Self {
            searches_total,
            search_errors,
            dac_conditions_injected,
            metadata_generation,
            search_latency,
            registry: Arc::new(registry),
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a completed search
    pub fn record_search(&self, entity: &str, generation: u64, duration_secs: f64) {
        let entity = entity.to_lowercase();
        self.searches_total.with_label_values(&[entity.as_str()]).inc();
        self.search_latency
            .with_label_values(&[entity.as_str()])
            .observe(duration_secs);
        self.metadata_generation.set(generation as f64);
    }

    /// Record a failed search
    pub fn record_search_error(&self, kind: &str) {
        self.search_errors.with_label_values(&[kind]).inc();
    }

    /// Record access-rule conditions applied to one search
    pub fn record_dac_conditions(&self, count: usize) {
        self.dac_conditions_injected.inc_by(count as f64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
