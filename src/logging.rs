use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LEVEL: &str = "info";

/// Initialize logging to stderr so command output on stdout stays parseable.
///
/// `RUST_LOG` wins over `level` when it is set. Calling this more than once is
/// harmless; later calls are ignored.
pub fn init_logging(level: &str) {
    let default_filter = format!("runway={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let initialized = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init();

    if initialized.is_ok() {
        tracing::debug!("logging initialized (level={level})");
    }
}
