// storefront/app/src/telemetry.rs

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`
/// level; span closings are logged with their duration.
pub fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  let result = match format {
    LogFormat::Json => builder.json().try_init(),
    LogFormat::Pretty => builder.try_init(),
  };
  if let Err(e) = result {
    eprintln!("Tracing subscriber already installed: {}", e);
  }
}
