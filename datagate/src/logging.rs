use crate::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Initializes tracing output on stderr, forwarding events to Sentry when a DSN
/// is configured.
///
/// The returned guard flushes Sentry on drop and must be held until exit.
pub fn init(config: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let level = config.map_or("info", |c| c.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let sentry_guard = config
        .and_then(|c| c.sentry_dsn.as_deref())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    ..Default::default()
                },
            ))
        });

    let sentry_layer = sentry_guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter),
        )
        .with(sentry_layer);

    if subscriber.try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized");
    }

    sentry_guard
}
