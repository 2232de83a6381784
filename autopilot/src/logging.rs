//! Development-time tracing for the scheduler and simulator.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG` or `-v`, output
//!   to stderr. Fatal task errors land here through
//!   `io::diagnostics::TracingDiagnostics`.
//!
//! - **Transcripts (`io/transcript`)**: Product artifacts written on request by
//!   `autopilot simulate --transcript`. Unaffected by log filtering.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "autopilot=info",
        _ => "autopilot=debug",
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise each `-v` raises the crate's level.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=autopilot::scheduler=debug autopilot simulate scenario.toml
/// ```
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
