use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}

/// Initialize structured logging.
///
/// `RUST_LOG` wins when set; otherwise the given level seeds a filter that
/// keeps this workspace at debug and everything else at the given level.
pub fn init_tracing(default_level: &str) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},jit_kitchen=debug")));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent_failure() {
        // the first call in the test binary may or may not win the global
        // subscriber slot; the second must fail cleanly rather than panic
        let _ = init_tracing("info");
        let second = init_tracing("info");
        assert!(second.is_err());
    }
}
