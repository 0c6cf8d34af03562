use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,walletlab=debug";

/// Install the global subscriber: compact output on stderr, filtered by
/// `RUST_LOG` or [`DEFAULT_FILTER`].
pub fn init_logging() -> Result<()> {
    init_logging_with(DEFAULT_FILTER)
}

/// Like [`init_logging`] with a custom fallback filter
pub fn init_logging_with(filter: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}
