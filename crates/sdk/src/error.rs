//! SDK Error Types

use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// Daemon code for "a scan is already running"
const CONFLICT_CODE: i32 = 4002;

/// Daemon code for "scanner executable not found"
const MISSING_EXECUTABLE_CODE: i32 = 4004;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The daemon rejected the call
    #[error("Daemon error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("Malformed daemon response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Event stream closed")]
    StreamClosed,
}

impl From<jsonrpsee::core::ClientError> for SdkError {
    fn from(e: jsonrpsee::core::ClientError) -> Self {
        use jsonrpsee::core::ClientError;

        match e {
            ClientError::Call(call_err) => SdkError::Rpc {
                code: call_err.code(),
                message: call_err.message().to_string(),
            },
            ClientError::ParseError(e) => SdkError::Serialization(e),
            ClientError::RestartNeeded(_) => {
                SdkError::Connection("Connection to daemon lost".to_string())
            }
            other => SdkError::Transport(other.to_string()),
        }
    }
}

impl SdkError {
    /// Error code returned by the daemon, if this is an RPC error
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            SdkError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Another scan holds the scanner
    pub fn is_busy(&self) -> bool {
        self.rpc_code() == Some(CONFLICT_CODE)
    }

    /// The daemon could not find the scanner executable
    pub fn is_missing_scanner(&self) -> bool {
        self.rpc_code() == Some(MISSING_EXECUTABLE_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_and_missing_scanner() {
        let busy = SdkError::Rpc {
            code: 4002,
            message: "Conflict: Scan s1 is already running".to_string(),
        };
        assert!(busy.is_busy());
        assert!(!busy.is_missing_scanner());

        let missing = SdkError::Rpc {
            code: 4004,
            message: "Scanner executable not found".to_string(),
        };
        assert!(missing.is_missing_scanner());

        assert_eq!(SdkError::StreamClosed.rpc_code(), None);
        assert!(!SdkError::StreamClosed.is_busy());
    }
}
