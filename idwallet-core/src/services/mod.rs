//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod encryption;
mod fingerprint;
pub mod hashing;
pub mod logging;
pub mod migration;
pub mod pin;
pub mod session;
mod status;
pub mod step_up;

pub use encryption::EncryptionService;
pub use fingerprint::{FingerprintService, DEVICE_ID_KEY};
pub use logging::{LogEntry, LogEvent, LogQuery, LogSource, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService, Migrations};
pub use pin::{PinCheck, PinService, PinState, Registration, Restored};
pub use session::SessionMonitor;
pub use status::{StatusService, StatusSummary};
pub use step_up::{SensitiveAction, StepUpFactor, StepUpOutcome, StepUpVerifier};
