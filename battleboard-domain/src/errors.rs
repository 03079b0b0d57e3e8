use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("API error {url}, {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Transport failures and non-2xx answers are worth another attempt; a body
    /// that does not parse will not parse the second time either.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transport { .. } | FetchError::Status { .. })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("battle {0} already stored")]
    DuplicateBattle(i64),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_keeps_root_cause() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(FetchError::Status {
                url: "http://x/events".to_string(),
                status: 503,
                body: "busy".to_string(),
            }),
        };
        let text = err.to_string();
        assert!(text.starts_with("failed after 3 attempts"));
        assert!(text.contains("503"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_transient());
    }

    #[test]
    fn decode_is_not_transient() {
        let err = FetchError::Decode {
            url: "u".to_string(),
            message: "eof".to_string(),
        };
        assert!(!err.is_transient());
        assert!(FetchError::Transport {
            url: "u".to_string(),
            message: "reset".to_string()
        }
        .is_transient());
    }
}
