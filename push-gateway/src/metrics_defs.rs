use shared::metrics_defs::{MetricDef, MetricType};

pub const NOTIFICATION_REQUESTS: MetricDef = MetricDef {
    name: "notifications.requests",
    metric_type: MetricType::Counter,
    description: "Requests to the notification endpoint. Tagged with outcome.",
};

pub const SEND_DURATION: MetricDef = MetricDef {
    name: "notifications.send.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent in the sender in seconds. Tagged with sender, outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[NOTIFICATION_REQUESTS, SEND_DURATION];
