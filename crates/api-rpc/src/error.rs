//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use discscan_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use serde_json::json;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const CONFLICT: i32 = 4002;
    pub const MISSING_EXECUTABLE: i32 = 4004;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Conflict(msg) => ErrorObjectOwned::owned(code::CONFLICT, msg, None::<()>),
        AppError::MissingExecutable(path) => ErrorObjectOwned::owned(
            code::MISSING_EXECUTABLE,
            format!("Scanner executable not found: {}", path.display()),
            Some(json!({ "path": path.display().to_string() })),
        ),
        AppError::Launch(e) => {
            ErrorObjectOwned::owned(code::SYSTEM_ERROR, e.to_string(), None::<()>)
        }
    }
}
