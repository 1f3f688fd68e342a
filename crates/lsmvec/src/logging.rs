//! Subscriber setup for binaries. Libraries in this workspace only emit
//! `tracing` events.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Directive used when neither an explicit filter nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "lsmvec=info";

/// Install a global `fmt` subscriber.
///
/// `filter` takes precedence over `RUST_LOG`, which takes precedence over
/// [`DEFAULT_FILTER`].
///
/// # Errors
///
/// Returns [`Error::Config`] for an unparsable filter or if a global
/// subscriber is already installed.
pub fn init(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| Error::Config(format!("invalid log filter '{directives}': {e}")))?,
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Config(format!("cannot install log subscriber: {e}")))
}
