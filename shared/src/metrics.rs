use crate::metrics_defs::{MetricDef, describe_all};
use metrics_exporter_statsd::StatsdBuilder;

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("could not build statsd recorder: {0}")]
    Build(#[from] metrics_exporter_statsd::StatsdError),
    #[error("could not install metrics recorder: {0}")]
    Install(String),
}

/// Install a global StatsD recorder and register the given metric descriptions.
///
/// Without an installed recorder every metric call is a no-op, so processes
/// that do not configure statsd simply skip this.
pub fn install_statsd(
    statsd_host: &str,
    statsd_port: u16,
    prefix: &str,
    defs: &[MetricDef],
) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(statsd_host, statsd_port).build(Some(prefix))?;

    metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;
    describe_all(defs);

    tracing::info!(
        statsd_host = %statsd_host,
        statsd_port = statsd_port,
        prefix = %prefix,
        "Installed statsd metrics recorder"
    );

    Ok(())
}
