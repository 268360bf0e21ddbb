//! Withdrawal service - debits the signed-in account and logs the request

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, PolicyViolation, Result};
use crate::domain::{Transaction, WithdrawalForm};
use crate::services::flow::FlowTracker;
use crate::services::Ledger;

/// Outcome of an accepted withdrawal request
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalReceipt {
    pub transaction: Transaction,
    /// Account balance after the amount was reserved
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

/// How long a success stays on screen before the form clears
pub const DEFAULT_RESET_HOLD: Duration = Duration::from_millis(3000);

/// Withdrawal service
pub struct WithdrawalService {
    ledger: Ledger,
    processing_delay: Duration,
    reset_hold: Duration,
}

impl WithdrawalService {
    pub fn new(ledger: Ledger, processing_delay: Duration) -> Self {
        Self {
            ledger,
            processing_delay,
            reset_hold: DEFAULT_RESET_HOLD,
        }
    }

    pub fn with_reset_hold(mut self, reset_hold: Duration) -> Self {
        self.reset_hold = reset_hold;
        self
    }

    /// Validate and apply a withdrawal for the signed-in account
    ///
    /// The amount leaves the balance at request time (reservation), the
    /// transaction is logged as pending, and the session balance is updated.
    /// All three writes commit together; any rejection writes nothing.
    pub fn request(&self, form: &WithdrawalForm) -> Result<WithdrawalReceipt> {
        let amount = form.amount()?;

        self.ledger.transact(|state| {
            let email = state
                .session()
                .map(|s| s.email.clone())
                .ok_or(Error::Unauthenticated)?;

            let account = state
                .find_account(&email)
                .ok_or_else(|| Error::not_found("account for the current session"))?;

            if amount > account.balance {
                return Err(PolicyViolation::InsufficientBalance {
                    requested: amount,
                    available: account.balance,
                }
                .into());
            }

            let mut tx = Transaction::pending_withdrawal(
                state.next_transaction_id(&mut rand::thread_rng()),
                account.email.clone(),
                account.display_name(),
                amount,
                &form.currency,
                form.method.trim(),
            );
            tx.wallet_address = form.wallet_address.clone();

            let balance = match state.find_account_mut(&email) {
                Some(account) => {
                    account.balance -= amount;
                    account.balance
                }
                None => return Err(Error::not_found("account for the current session")),
            };

            state.append_transaction(tx.clone());
            state.sync_session(&email)?;

            Ok(WithdrawalReceipt {
                transaction: tx,
                balance,
            })
        })
    }

    /// Submit a withdrawal, driving the form's flow state
    ///
    /// Rejections fail the flow immediately. Accepted requests show
    /// `Processing` for the configured delay before `Succeeded`, and the form
    /// returns to `Idle` once the success has been held for the reset hold.
    pub async fn submit(
        &self,
        form: &WithdrawalForm,
        tracker: &FlowTracker,
    ) -> Result<WithdrawalReceipt> {
        match self.request(form) {
            Ok(receipt) => {
                tracker.begin();
                tracker.succeed_after(self.processing_delay).await;
                tracker.reset_after(self.reset_hold);
                Ok(receipt)
            }
            Err(e) => {
                tracker.fail(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::MemoryStore;
    use crate::domain::{Session, TransactionKind, TransactionStatus, UserAccount};
    use crate::services::flow::FlowState;

    fn signed_in_ledger(balance: i64) -> Ledger {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        ledger
            .transact(|state| {
                let mut account = UserAccount::new("Ada Lovelace", "ada@example.com", "hash");
                account.balance = Decimal::new(balance, 0);
                state.set_session(Some(Session::for_account(&account)));
                state.insert_account(account);
                Ok(())
            })
            .unwrap();
        ledger
    }

    fn service(ledger: &Ledger) -> WithdrawalService {
        WithdrawalService::new(ledger.clone(), Duration::from_millis(1500))
    }

    #[test]
    fn test_valid_withdrawal_reserves_funds() {
        let ledger = signed_in_ledger(100);
        let receipt = service(&ledger)
            .request(&WithdrawalForm::new("50", "usd", "bitcoin").with_wallet_address("bc1qxyz"))
            .unwrap();

        assert_eq!(receipt.balance, Decimal::new(50, 0));
        assert_eq!(receipt.transaction.kind, TransactionKind::Withdrawal);
        assert_eq!(receipt.transaction.status, TransactionStatus::Pending);
        assert_eq!(receipt.transaction.user_name, "Ada Lovelace");
        assert_eq!(receipt.transaction.currency, "USD");
        assert_eq!(receipt.transaction.wallet_address.as_deref(), Some("bc1qxyz"));

        let account = ledger.find_account("ada@example.com").unwrap().unwrap();
        assert_eq!(account.balance, Decimal::new(50, 0));
        assert_eq!(ledger.transactions().unwrap(), vec![receipt.transaction]);
        assert_eq!(
            ledger.session().unwrap().unwrap().balance,
            Some(Decimal::new(50, 0))
        );
    }

    #[test]
    fn test_below_minimum_leaves_store_unchanged() {
        let ledger = signed_in_ledger(100);
        let err = service(&ledger)
            .request(&WithdrawalForm::new("49", "USD", "bitcoin"))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Policy(PolicyViolation::BelowMinimumWithdrawal { .. })
        ));
        let account = ledger.find_account("ada@example.com").unwrap().unwrap();
        assert_eq!(account.balance, Decimal::new(100, 0));
        assert!(ledger.transactions().unwrap().is_empty());
    }

    #[test]
    fn test_insufficient_balance_leaves_store_unchanged() {
        let ledger = signed_in_ledger(30);
        let err = service(&ledger)
            .request(&WithdrawalForm::new("50", "USD", "bitcoin"))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Policy(PolicyViolation::InsufficientBalance { .. })
        ));
        let account = ledger.find_account("ada@example.com").unwrap().unwrap();
        assert_eq!(account.balance, Decimal::new(30, 0));
        assert!(ledger.transactions().unwrap().is_empty());
    }

    #[test]
    fn test_whole_balance_can_be_withdrawn() {
        let ledger = signed_in_ledger(75);
        let receipt = service(&ledger)
            .request(&WithdrawalForm::new("75", "USD", "usdt"))
            .unwrap();
        assert_eq!(receipt.balance, Decimal::ZERO);
    }

    #[test]
    fn test_requires_session() {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        let err = service(&ledger)
            .request(&WithdrawalForm::new("50", "USD", "bitcoin"))
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }

    #[test]
    fn test_session_without_account_is_not_found() {
        let ledger = Ledger::new(Arc::new(MemoryStore::new()));
        ledger
            .transact(|state| {
                let ghost = UserAccount::new("Ghost", "ghost@example.com", "hash");
                state.set_session(Some(Session::for_account(&ghost)));
                Ok(())
            })
            .unwrap();

        let err = service(&ledger)
            .request(&WithdrawalForm::new("50", "USD", "bitcoin"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(ledger.transactions().unwrap().is_empty());
    }

    #[test]
    fn test_balance_is_checked_against_account_store_not_session() {
        let ledger = signed_in_ledger(100);
        // Session still says 100, the account store says 40
        ledger
            .transact(|state| {
                if let Some(account) = state.find_account_mut("ada@example.com") {
                    account.balance = Decimal::new(40, 0);
                }
                Ok(())
            })
            .unwrap();

        let err = service(&ledger)
            .request(&WithdrawalForm::new("50", "USD", "bitcoin"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Policy(PolicyViolation::InsufficientBalance { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_processes_then_succeeds() {
        let ledger = signed_in_ledger(100);
        let service = service(&ledger);
        let tracker = FlowTracker::new();

        let start = tokio::time::Instant::now();
        let receipt = service
            .submit(&WithdrawalForm::new("60", "USD", "ethereum"), &tracker)
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(tracker.state(), FlowState::Succeeded);
        assert_eq!(receipt.balance, Decimal::new(40, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_rejection_fails_without_delay() {
        let ledger = signed_in_ledger(100);
        let service = service(&ledger);
        let tracker = FlowTracker::new();

        let start = tokio::time::Instant::now();
        let result = service
            .submit(&WithdrawalForm::new("abc", "USD", "ethereum"), &tracker)
            .await;

        assert!(result.is_err());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(
            tracker.state(),
            FlowState::Failed {
                message: "Please enter a valid amount".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_clears_after_success_hold() {
        let ledger = signed_in_ledger(100);
        let service = service(&ledger);
        let tracker = FlowTracker::new();
        let mut states = tracker.subscribe();

        service
            .submit(&WithdrawalForm::new("60", "USD", "ethereum"), &tracker)
            .await
            .unwrap();
        assert_eq!(*states.borrow_and_update(), FlowState::Succeeded);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(tracker.state(), FlowState::Succeeded);

        states.changed().await.unwrap();
        assert_eq!(*states.borrow(), FlowState::Idle);
        assert_eq!(tracker.state(), FlowState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_form_is_not_cleared() {
        let ledger = signed_in_ledger(30);
        let service = service(&ledger).with_reset_hold(Duration::from_millis(10));
        let tracker = FlowTracker::new();

        let _ = service
            .submit(&WithdrawalForm::new("50", "USD", "ethereum"), &tracker)
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(matches!(tracker.state(), FlowState::Failed { .. }));
    }
}
