//! Transaction state.

use crate::error::{DocError, DocResult};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can stage changes.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

impl TransactionState {
    /// Ensures the transaction is active.
    pub(crate) fn ensure_active(self) -> DocResult<()> {
        match self {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(DocError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(DocError::invalid_operation("transaction already aborted"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_accepts_work() {
        assert!(TransactionState::Active.ensure_active().is_ok());

        let err = TransactionState::Committed.ensure_active().unwrap_err();
        assert_eq!(err.to_string(), "invalid operation: transaction already committed");

        let err = TransactionState::Aborted.ensure_active().unwrap_err();
        assert!(matches!(err, DocError::InvalidOperation { .. }));
    }
}
