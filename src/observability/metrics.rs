use prometheus::{
    Encoder, Gauge, Histogram, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub sessions_total: IntCounterVec,
    pub positions_in_queue: IntGauge,
    pub distance_to_destination_meters: Gauge,
    pub session_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let sessions_total = IntCounterVec::new(
            Opts::new("sessions_total", "Navigation sessions by outcome"),
            &["outcome"],
        )
        .expect("valid sessions_total metric");

        let positions_in_queue =
            IntGauge::new("positions_in_queue", "Position updates waiting to be applied")
                .expect("valid positions_in_queue metric");

        let distance_to_destination_meters = Gauge::new(
            "distance_to_destination_meters",
            "Last known distance between driver and destination in meters",
        )
        .expect("valid distance_to_destination_meters metric");

        let session_duration_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "session_duration_seconds",
            "Duration of closed navigation sessions in seconds",
        ))
        .expect("valid session_duration_seconds metric");

        registry
            .register(Box::new(sessions_total.clone()))
            .expect("register sessions_total");
        registry
            .register(Box::new(positions_in_queue.clone()))
            .expect("register positions_in_queue");
        registry
            .register(Box::new(distance_to_destination_meters.clone()))
            .expect("register distance_to_destination_meters");
        registry
            .register(Box::new(session_duration_seconds.clone()))
            .expect("register session_duration_seconds");

        Self {
            registry,
            sessions_total,
            positions_in_queue,
            distance_to_destination_meters,
            session_duration_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
