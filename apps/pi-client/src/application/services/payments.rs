//! Platform Payment Service
//!
//! Server-side steps of the platform payment flow: look a payment up,
//! approve it, and complete it once the user's ledger transaction is known.
//! Every response is added to the payments cache, so one payment keeps one
//! identity across the whole flow.

use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;

use crate::application::ports::{HttpMethod, ManagerError, PlatformApi, RequestError};
use crate::application::services::entity_manager::Managers;
use crate::domain::cache::Entity;
use crate::domain::records::{PlatformPayment, RecordFamily};

/// Payment flow errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The payment has no ledger transaction yet.
    #[error("payment {identifier} has no transaction to complete with")]
    MissingTransaction {
        /// Payment identifier.
        identifier: String,
    },

    /// The platform answered without a payment body.
    #[error("platform returned no payment for {identifier}")]
    EmptyResponse {
        /// Payment identifier.
        identifier: String,
    },

    /// The payment lookup failed.
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// The platform call failed.
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Payment flow on top of the payments cache.
pub struct PaymentService {
    platform: Arc<dyn PlatformApi>,
    managers: Arc<Managers>,
}

impl PaymentService {
    /// Create the service.
    #[must_use]
    pub fn new(platform: Arc<dyn PlatformApi>, managers: Arc<Managers>) -> Self {
        Self { platform, managers }
    }

    /// Get a payment, from the cache unless `force_update` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotFound`] for unknown identifiers.
    pub async fn fetch(
        &self,
        identifier: &str,
        force_update: bool,
    ) -> Result<Entity<PlatformPayment>, PaymentError> {
        Ok(self
            .managers
            .payments
            .fetch(identifier, true, !force_update)
            .await?)
    }

    /// Approve a payment.
    ///
    /// # Errors
    ///
    /// Returns the platform error.
    pub async fn approve(
        &self,
        identifier: &str,
    ) -> Result<Entity<PlatformPayment>, PaymentError> {
        tracing::info!(payment = identifier, "Approving payment");
        let route = format!("v2/payments/{identifier}/approve");
        self.post(identifier, &route, None).await
    }

    /// Complete a payment with the ledger transaction attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::MissingTransaction`] when the payment carries
    /// no transaction, or the platform error.
    pub async fn complete(
        &self,
        identifier: &str,
    ) -> Result<Entity<PlatformPayment>, PaymentError> {
        let payment = self.fetch(identifier, false).await?;
        let txid = payment.read().txid().map(str::to_string);
        let Some(txid) = txid else {
            return Err(PaymentError::MissingTransaction {
                identifier: identifier.to_string(),
            });
        };

        tracing::info!(payment = identifier, txid = %txid, "Completing payment");
        let route = format!("v2/payments/{identifier}/complete");
        self.post(identifier, &route, Some(json!({ "txid": txid }))).await
    }

    async fn post(
        &self,
        identifier: &str,
        route: &str,
        payload: Option<Value>,
    ) -> Result<Entity<PlatformPayment>, PaymentError> {
        let body = self
            .platform
            .call(HttpMethod::Post, route, payload)
            .await?
            .ok_or_else(|| PaymentError::EmptyResponse {
                identifier: identifier.to_string(),
            })?;

        let raw: PlatformPayment =
            serde_json::from_value(body).map_err(|e| ManagerError::Decode {
                family: RecordFamily::Payments,
                message: e.to_string(),
            })?;
        Ok(self.managers.payments.add(raw, true))
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("cached", &self.managers.payments.cache().len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::application::ports::LedgerApi;

    #[derive(Default)]
    struct FakePlatform {
        calls: Mutex<Vec<(HttpMethod, String, Option<Value>)>>,
        with_transaction: bool,
    }

    #[async_trait]
    impl PlatformApi for FakePlatform {
        async fn call(
            &self,
            method: HttpMethod,
            route: &str,
            payload: Option<Value>,
        ) -> Result<Option<Value>, RequestError> {
            self.calls
                .lock()
                .push((method, route.to_string(), payload));

            let mut body = json!({
                "identifier": "pay-1",
                "amount": "3.14",
                "memo": "order 7",
                "status": {
                    "developer_approved": route.ends_with("/approve") || route.ends_with("/complete"),
                    "developer_completed": route.ends_with("/complete")
                }
            });
            if self.with_transaction {
                body["transaction"] = json!({"txid": "tx-hash", "verified": true});
            }
            Ok(Some(body))
        }
    }

    struct NoLedger;

    #[async_trait]
    impl LedgerApi for NoLedger {
        async fn get(
            &self,
            _path: &str,
            _query: &[(&str, &str)],
        ) -> Result<Option<Value>, RequestError> {
            Ok(None)
        }
    }

    fn service(platform: Arc<FakePlatform>) -> PaymentService {
        let ledger: Arc<dyn LedgerApi> = Arc::new(NoLedger);
        let managers = Arc::new(Managers::new(&ledger, platform.clone()));
        PaymentService::new(platform, managers)
    }

    #[tokio::test]
    async fn approve_patches_cached_payment() {
        let platform = Arc::new(FakePlatform::default());
        let payments = service(platform.clone());

        let fetched = payments.fetch("pay-1", false).await.unwrap();
        assert!(!fetched.read().status.developer_approved);

        let approved = payments.approve("pay-1").await.unwrap();

        assert!(fetched.same_as(&approved));
        assert!(fetched.read().status.developer_approved);
        let calls = platform.calls.lock();
        assert_eq!(calls[1].0, HttpMethod::Post);
        assert_eq!(calls[1].1, "v2/payments/pay-1/approve");
    }

    #[tokio::test]
    async fn complete_requires_transaction() {
        let payments = service(Arc::new(FakePlatform::default()));

        let err = payments.complete("pay-1").await.unwrap_err();

        assert_eq!(
            err,
            PaymentError::MissingTransaction {
                identifier: "pay-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn complete_sends_txid() {
        let platform = Arc::new(FakePlatform {
            with_transaction: true,
            ..FakePlatform::default()
        });
        let payments = service(platform.clone());

        let completed = payments.complete("pay-1").await.unwrap();

        assert!(completed.read().status.developer_completed);
        let calls = platform.calls.lock();
        let (_, route, payload) = calls.last().unwrap();
        assert_eq!(route, "v2/payments/pay-1/complete");
        assert_eq!(payload.as_ref().unwrap()["txid"], "tx-hash");
    }
}
