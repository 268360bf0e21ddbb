//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod forms;
pub mod result;
mod session;
mod transaction;

use rust_decimal::Decimal;

pub use account::{AccountId, UserAccount};
pub use forms::{RegistrationForm, WithdrawalForm};
pub use session::Session;
pub use transaction::{Transaction, TransactionId, TransactionKind, TransactionStatus};

/// Smallest amount a single withdrawal may request (USD)
pub const MINIMUM_WITHDRAWAL: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Balance credited to every new account (USD)
pub const STARTING_BALANCE: Decimal = Decimal::from_parts(145_000, 0, 0, false, 0);

/// Minimum password length, counted in characters
pub const MINIMUM_PASSWORD_LENGTH: usize = 6;
