use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("engine.retries must be at least 1")]
    ZeroRetries,

    #[error("http.request_timeout_secs must be positive")]
    ZeroRequestTimeout,

    #[error("http.user_agent must not be empty")]
    EmptyUserAgent,

    #[error("Invalid proxy URL '{url}', expected an http://, https:// or socks5:// address")]
    InvalidProxyScheme { url: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.engine.retries == 0 {
        return Err(ValidationError::ZeroRetries);
    }
    if config.http.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroRequestTimeout);
    }
    if config.http.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }
    if let Some(proxy) = &config.http.proxy {
        let known_scheme = ["http://", "https://", "socks5://"]
            .iter()
            .any(|scheme| proxy.starts_with(scheme));
        if !known_scheme {
            return Err(ValidationError::InvalidProxyScheme { url: proxy.clone() });
        }
    }
    Ok(())
}
