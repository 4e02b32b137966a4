//! Error types for store operations.

use std::fmt;

use thiserror::Error;

/// Symbolic remote failure codes the client recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// An action with the same name already exists.
    AlreadyExists,

    /// The group has reached its scheduled action quota.
    LimitExceeded,

    /// The group is being modified by another request.
    ResourceContention,

    /// The listing continuation token was rejected.
    InvalidPageToken,

    /// Any other remote failure.
    Unknown,
}

impl ErrorCode {
    /// Maps a remote code string to a known code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "AlreadyExists" => ErrorCode::AlreadyExists,
            "LimitExceeded" => ErrorCode::LimitExceeded,
            "ResourceContention" => ErrorCode::ResourceContention,
            "InvalidPageToken" => ErrorCode::InvalidPageToken,
            _ => ErrorCode::Unknown,
        }
    }

    /// The code string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyExists => "AlreadyExists",
            ErrorCode::LimitExceeded => "LimitExceeded",
            ErrorCode::ResourceContention => "ResourceContention",
            ErrorCode::InvalidPageToken => "InvalidPageToken",
            ErrorCode::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by a [`crate::ScheduleStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store rejected the request.
    #[error("{code}: {message}")]
    Remote {
        code: ErrorCode,
        status: Option<u16>,
        message: String,
    },

    /// The store could not be reached or returned an unreadable response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The store response could not be decoded.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),

    /// The client could not be configured.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Creates a remote error from a code and message.
    pub fn remote(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            status: None,
            message: message.into(),
        }
    }

    /// The symbolic code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Remote { code, .. } => *code,
            _ => ErrorCode::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for code in [
            ErrorCode::AlreadyExists,
            ErrorCode::LimitExceeded,
            ErrorCode::ResourceContention,
            ErrorCode::InvalidPageToken,
        ] {
            assert_eq!(ErrorCode::from_code(code.as_str()), code);
        }
    }

    #[test]
    fn test_unknown_codes_bucket() {
        assert_eq!(ErrorCode::from_code("Throttling"), ErrorCode::Unknown);
        assert_eq!(ErrorCode::from_code("alreadyexists"), ErrorCode::Unknown);
    }

    #[test]
    fn test_error_code_accessor() {
        let err = StoreError::remote(ErrorCode::ResourceContention, "busy");
        assert_eq!(err.code(), ErrorCode::ResourceContention);
        assert_eq!(err.to_string(), "ResourceContention: busy");

        let err = StoreError::InvalidResponse("truncated".to_string());
        assert_eq!(err.code(), ErrorCode::Unknown);
    }
}
