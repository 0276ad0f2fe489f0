//! Tracing initialisation

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialises the global tracing subscriber
///
/// The filter falls back to `log_level` when `RUST_LOG` is unset. With
/// `json` the subscriber emits structured JSON lines for log shipping.
pub fn init_tracing(log_level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to init tracing: {}", e))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to init tracing: {}", e))?;
    }
    Ok(())
}
