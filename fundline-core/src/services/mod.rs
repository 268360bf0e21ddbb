//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on one flow; all of them mutate the store through [`Ledger`].

pub mod credentials;
pub mod flow;
mod ledger;
pub mod logging;
pub mod migration;
mod registration;
mod session;
mod status;
mod withdrawal;

pub use flow::{FlowState, FlowTracker};
pub use ledger::{Ledger, LedgerState};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use registration::{Handoff, Registered, RegistrationService};
pub use session::SessionService;
pub use status::{SessionSummary, StatusService, StatusSummary};
pub use withdrawal::{WithdrawalReceipt, WithdrawalService};
