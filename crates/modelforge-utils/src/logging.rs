//! Structured logging initialisation, shared by the server binary and
//! integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise a global `tracing` subscriber. `json` selects the production
/// (machine-readable) formatter; otherwise a human-readable formatter is
/// used, matching local-dev conventions.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}
