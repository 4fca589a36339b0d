//! Metrics definitions for the upstream gateway.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UPSTREAM_REQUEST_DURATION: MetricDef = MetricDef {
    name: "upstream.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent on a single upstream call in seconds, including the body read",
};

pub const UPSTREAM_REQUEST_ERROR: MetricDef = MetricDef {
    name: "upstream.request.error",
    metric_type: MetricType::Counter,
    description: "Number of upstream calls that failed, tagged by error code",
};

pub const PREVIEW_ROWS: MetricDef = MetricDef {
    name: "preview.rows",
    metric_type: MetricType::Histogram,
    description: "Number of rows returned per preview, tagged by envelope kind",
};

pub const PREVIEW_DEGRADED: MetricDef = MetricDef {
    name: "preview.degraded",
    metric_type: MetricType::Counter,
    description: "Number of previews that returned no rows because the body was unrenderable",
};

pub const ALL_METRICS: &[MetricDef] = &[
    UPSTREAM_REQUEST_DURATION,
    UPSTREAM_REQUEST_ERROR,
    PREVIEW_ROWS,
    PREVIEW_DEGRADED,
];
