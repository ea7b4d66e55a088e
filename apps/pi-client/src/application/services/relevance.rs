//! Cross-Record Relevance
//!
//! Relevance of records that only reference an account through their
//! operations: ledgers, transactions and trades. Each check fetches the
//! operations involved and applies the operation rule.

use crate::application::ports::ManagerError;
use crate::application::services::entity_manager::Managers;
use crate::domain::records::Trade;
use crate::domain::relevance::operation_is_relevant;

/// Whether any operation of ledger `sequence` concerns `account_id`.
///
/// # Errors
///
/// Returns the lookup error.
pub async fn ledger_is_relevant(
    managers: &Managers,
    sequence: u64,
    account_id: &str,
) -> Result<bool, ManagerError> {
    let operations = managers
        .operations_under(&format!("ledgers/{sequence}/operations"))
        .await?;
    Ok(operations
        .iter()
        .any(|op| operation_is_relevant(&op.read(), account_id)))
}

/// Whether any operation of transaction `hash` concerns `account_id`.
///
/// # Errors
///
/// Returns the lookup error.
pub async fn transaction_is_relevant(
    managers: &Managers,
    hash: &str,
    account_id: &str,
) -> Result<bool, ManagerError> {
    let operations = managers
        .operations_under(&format!("transactions/{hash}/operations"))
        .await?;
    Ok(operations
        .iter()
        .any(|op| operation_is_relevant(&op.read(), account_id)))
}

/// Whether the operation that produced `trade` concerns `account_id`.
///
/// # Errors
///
/// Returns the lookup error.
pub async fn trade_is_relevant(
    managers: &Managers,
    trade: &Trade,
    account_id: &str,
    force_update: bool,
) -> Result<bool, ManagerError> {
    let operation = managers
        .operations
        .fetch(trade.operation_id(), true, !force_update)
        .await?;
    let relevant = operation_is_relevant(&operation.read(), account_id);
    Ok(relevant)
}
