use super::*;

#[test]
fn test_config_error_display() {
    let error = ServerError::ConfigError("GITHUB_APP_ID is not set".to_string());
    assert_eq!(
        error.to_string(),
        "Configuration error: GITHUB_APP_ID is not set"
    );
}

#[test]
fn test_auth_error_display() {
    let error = ServerError::AuthError("bad private key".to_string());
    assert_eq!(error.to_string(), "Authentication error: bad private key");
}

#[test]
fn test_network_error_display() {
    let error = ServerError::NetworkError("bind failed".to_string());
    assert_eq!(error.to_string(), "Network error: bind failed");
}
