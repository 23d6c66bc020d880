// Error types for the LibreLinkUp follower client.
//
// Every failure the client can produce maps to one `ErrorKind`, so callers
// can tell "set up sharing first" apart from "the upstream changed" without
// matching on message text.

use thiserror::Error;

/// Coarse classification of an [`LluError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    Protocol,
    NoConnection,
    NoData,
    Extraction,
}

/// Client error type.
#[derive(Error, Debug)]
pub enum LluError {
    /// Connection failure, timeout or upstream 5xx.
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials rejected or login response not understood.
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Upstream left the known redirect / minimum-version paths.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The follower account has no accepted sharing connection.
    #[error("No connections shared with this follower account")]
    NoConnection,

    /// The connection exists but the sensor has not reported a measurement.
    #[error("No glucose measurement available for patient {0}")]
    NoData(String),

    /// Request succeeded but the payload did not have the expected shape.
    #[error("Unexpected payload shape: {0}")]
    Extraction(String),
}

impl LluError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LluError::Network(_) => ErrorKind::Network,
            LluError::Auth { .. } => ErrorKind::Auth,
            LluError::Protocol(_) => ErrorKind::Protocol,
            LluError::NoConnection => ErrorKind::NoConnection,
            LluError::NoData(_) => ErrorKind::NoData,
            LluError::Extraction(_) => ErrorKind::Extraction,
        }
    }

    /// Whether retrying the whole run later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::NoData)
    }
}

impl From<reqwest::Error> for LluError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LluError::Network(format!("request timed out: {}", err))
        } else {
            LluError::Network(err.to_string())
        }
    }
}

/// Result type alias using LluError.
pub type LluResult<T> = Result<T, LluError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_per_variant() {
        assert_eq!(LluError::NoConnection.kind(), ErrorKind::NoConnection);
        assert_eq!(
            LluError::Auth { status: 401, message: "nope".into() }.kind(),
            ErrorKind::Auth
        );
        assert_eq!(LluError::Extraction("x".into()).kind(), ErrorKind::Extraction);
    }

    #[test]
    fn only_network_and_missing_data_are_transient() {
        assert!(LluError::Network("timeout".into()).is_transient());
        assert!(LluError::NoData("p1".into()).is_transient());
        assert!(!LluError::Protocol("loop".into()).is_transient());
        assert!(!LluError::NoConnection.is_transient());
    }
}
