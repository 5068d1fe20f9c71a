//! tracing の初期化
//!
//! ログは stderr に出す。stdout は報告行（JSON lines）専用。

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber.
///
/// `filter` wins over `RUST_LOG`; both fall back to [`DEFAULT_FILTER`].
/// An invalid `filter` is logged as a warning once the subscriber is up.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_tracing(filter: Option<&str>) {
    let (env_filter, rejected) = resolve_filter(filter);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let (Some(filter), Some(err)) = (filter, rejected) {
        tracing::warn!(filter, error = %err, "ignoring invalid log filter");
    }
}

/// The filter to install, plus the parse error if `filter` was rejected.
fn resolve_filter(filter: Option<&str>) -> (EnvFilter, Option<ParseError>) {
    let (requested, rejected) = match filter.map(EnvFilter::try_new) {
        Some(Ok(f)) => (Some(f), None),
        Some(Err(err)) => (None, Some(err)),
        None => (None, None),
    };
    let env_filter = requested
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));
    (env_filter, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_filter_is_used() {
        let (filter, rejected) = resolve_filter(Some("spindle_core=debug"));
        assert!(rejected.is_none());
        assert_eq!(filter.to_string(), "spindle_core=debug");
    }

    #[test]
    fn invalid_filter_is_rejected_not_dropped() {
        let (_, rejected) = resolve_filter(Some("spindle_core=loudest"));
        assert!(rejected.is_some());
    }

    #[test]
    fn no_filter_is_not_an_error() {
        assert!(resolve_filter(None).1.is_none());
    }
}
