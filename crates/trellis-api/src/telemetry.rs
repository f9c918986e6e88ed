//! # Telemetry
//!
//! Global `tracing` subscriber. The filter comes from `RUST_LOG` and falls
//! back to `info`.

use tracing_subscriber::EnvFilter;
use trellis_core::LogFormat;

/// Install the global subscriber. Fails if one is already installed.
pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!(e))
}
