//! Tracing subscriber bootstrap.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global subscriber with an environment filter.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (for example the
/// configured `log.level`) is used. Returns `false` if a subscriber was
/// already installed, which makes repeated calls from tests harmless.
pub fn init_tracing(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let _ = init_tracing("info");
        assert!(!init_tracing("debug"));
    }
}
