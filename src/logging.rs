/*!
 * Logging and tracing initialization
 */

use anyhow::Context;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize structured logging for the binary
///
/// `RUST_LOG` wins when set; otherwise the whole beacon stack logs at
/// info with request tracing from tower-http.
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new("beacon=info,beacon_sentinel=info,beacon_server=info,tower_http=info")
    })
    .context("Failed to create log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
