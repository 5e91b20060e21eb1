use thiserror::Error;

/// Everything that can end a completion stream early.
///
/// The `Display` text is shown to the user verbatim after `"Error: "`.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed stream payload: {0}")]
    Protocol(String),

    #[error("timeout")]
    Timeout,
}

impl StreamError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_user_facing() {
        assert_eq!(StreamError::Timeout.to_string(), "timeout");
        assert_eq!(
            StreamError::Api {
                status: 401,
                message: "Incorrect API key provided".to_string(),
            }
            .to_string(),
            "API error 401: Incorrect API key provided"
        );
        assert_eq!(
            StreamError::protocol("expected object").to_string(),
            "malformed stream payload: expected object"
        );
    }
}
