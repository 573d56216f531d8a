use super::*;
use crate::Error;

#[test]
fn backoff_doubles() {
    assert_eq!(exponential_backoff(1, 500, 60), Duration::from_millis(500));
    assert_eq!(exponential_backoff(2, 500, 60), Duration::from_millis(1000));
    assert_eq!(exponential_backoff(3, 500, 60), Duration::from_millis(2000));
}

#[test]
fn backoff_capped() {
    let delay = exponential_backoff(100, 1000, 5);

    assert_eq!(delay, Duration::from_secs(5));
}

#[test]
fn config_delay_uses_config() {
    let config = RetryConfig {
        max_retries: 5,
        base_backoff_ms: 10,
        max_backoff_secs: 1,
    };

    assert_eq!(config.delay(1), Duration::from_millis(10));
    assert_eq!(config.delay(4), Duration::from_millis(80));
    assert_eq!(config.delay(30), Duration::from_secs(1));
}

#[test]
fn disabled_never_retries() {
    assert_eq!(RetryConfig::disabled().max_retries, 0);
}

#[test]
fn api_errors_are_transient_by_status() {
    let api = |code| Error::Api {
        code,
        message: String::new(),
    };

    for code in [408, 429, 500, 502, 503, 504] {
        assert!(api(code).is_transient(), "{code} should be transient");
    }

    for code in [400, 401, 403, 404, 422] {
        assert!(!api(code).is_transient(), "{code} should not be transient");
    }

    assert!(!Error::EmptyResponse.is_transient());
    assert!(!Error::Config("bad".into()).is_transient());
}
