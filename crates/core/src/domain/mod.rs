// Domain Layer - Pure business logic and entities

pub mod error;
pub mod scan;
pub mod session;

// Re-exports
pub use error::DomainError;
pub use scan::{
    FailedItemRecord, ScanEvent, ScanNotification, ScanOutcome, ScanRequest, ScannerLayout,
};
pub use session::{ProcessState, ScanSession, SessionId, SessionPhase};
