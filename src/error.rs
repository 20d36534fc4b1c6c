//! Error types for tubegate

use thiserror::Error;

/// Main error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("credential bootstrap failed: {0}")]
    Credential(String),

    #[error("upstream API returned status {0}")]
    UpstreamStatus(u16),

    #[error("upstream payload missing {0}")]
    MalformedPayload(&'static str),

    #[error("no playable format: {0}")]
    NoPlayableFormat(String),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("client disconnected during relay")]
    ClientAbort,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl GatewayError {
    /// HTTP status the presentation boundary should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::UpstreamStatus(status) => *status,
            GatewayError::NoPlayableFormat(_) => 403,
            GatewayError::Transport(_) => 502,
            GatewayError::ClientAbort => 499,
            GatewayError::InvalidUrl(_) | GatewayError::UrlError(_) => 400,
            _ => 500,
        }
    }

    /// Check if the downstream consumer went away mid-relay.
    /// Expected traffic, never an application fault.
    pub fn is_client_abort(&self) -> bool {
        matches!(self, GatewayError::ClientAbort)
    }

    /// Check if the upstream rejected our scraped credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::UpstreamStatus(401) | GatewayError::UpstreamStatus(403)
        )
    }
}
