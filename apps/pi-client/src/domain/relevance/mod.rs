//! Record Relevance
//!
//! Decides whether a ledger record concerns the configured account. Streams
//! that cannot be scoped server-side use these rules to drop unrelated
//! records before they reach a cache.
//!
//! Rules that need more records (ledgers, transactions, trades) are built on
//! [`operation_is_relevant`] by the client, which fetches the operations.

use crate::domain::records::{Account, Effect, EffectKind, Offer, Operation, OperationKind};

/// Whether an account record concerns `account_id`.
///
/// Matches the account itself, its sponsor, or any of its signers.
#[must_use]
pub fn account_is_relevant(account: &Account, account_id: &str) -> bool {
    account.account_id == account_id
        || account.sponsor.as_deref() == Some(account_id)
        || account.has_signer(account_id)
}

/// Whether an offer concerns `account_id`.
#[must_use]
pub fn offer_is_relevant(offer: &Offer, account_id: &str) -> bool {
    offer.seller == account_id
        || offer.sponsor.as_deref() == Some(account_id)
        || offer.selling.asset_issuer.as_deref() == Some(account_id)
}

/// Whether an operation concerns `account_id`.
#[must_use]
pub fn operation_is_relevant(operation: &Operation, account_id: &str) -> bool {
    if operation.source_account == account_id {
        return true;
    }

    let is = |value: &str| value == account_id;
    let is_opt = |value: Option<&str>| value == Some(account_id);

    match &operation.kind {
        OperationKind::CreateAccount(op) => is(&op.funder) || is(&op.account),
        OperationKind::Payment(op) => is(&op.from) || is(&op.to),
        OperationKind::PathPaymentStrictReceive(op) | OperationKind::PathPaymentStrictSend(op) => {
            is(&op.from) || is(&op.to)
        }
        OperationKind::SetOptions(op) => is_opt(op.signer_key.as_deref()),
        OperationKind::ChangeTrust(op) => is_opt(op.trustee.as_deref()) || is(&op.trustor),
        OperationKind::AllowTrust(op) => is(&op.trustee) || is(&op.trustor),
        OperationKind::AccountMerge(op) => is(&op.into),
        OperationKind::CreateClaimableBalance(op) => {
            op.claimants.iter().any(|c| is(&c.destination))
        }
        OperationKind::ClaimClaimableBalance(op) => is(&op.claimant),
        OperationKind::BeginSponsoringFutureReserves(op) => is(&op.sponsored_id),
        OperationKind::EndSponsoringFutureReserves(op) => is_opt(op.begin_sponsor.as_deref()),
        OperationKind::RevokeSponsorship(op) => {
            is_opt(op.account_id.as_deref())
                || is_opt(op.trustline_account_id.as_deref())
                || is_opt(op.signer_account_id.as_deref())
        }
        OperationKind::ManageSellOffer(_)
        | OperationKind::ManageBuyOffer(_)
        | OperationKind::CreatePassiveSellOffer(_)
        | OperationKind::ManageData(_)
        | OperationKind::BumpSequence(_)
        | OperationKind::Generic(_) => false,
    }
}

/// Whether an effect concerns `account_id`.
#[must_use]
pub fn effect_is_relevant(effect: &Effect, account_id: &str) -> bool {
    if effect.account == account_id {
        return true;
    }

    let is = |value: &str| value == account_id;
    let is_opt = |value: Option<&str>| value == Some(account_id);

    match &effect.kind {
        EffectKind::Trade(e) => is(&e.seller),
        EffectKind::TrustlineAuthorized(e)
        | EffectKind::TrustlineDeauthorized(e)
        | EffectKind::TrustlineAuthorizedToMaintainLiabilities(e) => is(&e.trustor),
        EffectKind::TrustlineFlagsUpdated(e) => is(&e.trustor),
        EffectKind::SignerCreated(e) | EffectKind::SignerUpdated(e) | EffectKind::SignerRemoved(e) => {
            is(&e.public_key)
        }
        EffectKind::SignerSponsorshipCreated(e) => {
            is(&e.sponsor) || is_opt(e.entry.signer.as_deref())
        }
        EffectKind::SignerSponsorshipUpdated(e) => {
            is(&e.former_sponsor) || is(&e.new_sponsor) || is_opt(e.entry.signer.as_deref())
        }
        EffectKind::SignerSponsorshipRemoved(e) => {
            is(&e.former_sponsor) || is_opt(e.entry.signer.as_deref())
        }
        EffectKind::AccountSponsorshipCreated(e)
        | EffectKind::TrustlineSponsorshipCreated(e)
        | EffectKind::DataSponsorshipCreated(e)
        | EffectKind::ClaimableBalanceSponsorshipCreated(e) => is(&e.sponsor),
        EffectKind::AccountSponsorshipUpdated(e)
        | EffectKind::TrustlineSponsorshipUpdated(e)
        | EffectKind::DataSponsorshipUpdated(e)
        | EffectKind::ClaimableBalanceSponsorshipUpdated(e) => {
            is(&e.former_sponsor) || is(&e.new_sponsor)
        }
        EffectKind::AccountSponsorshipRemoved(e)
        | EffectKind::TrustlineSponsorshipRemoved(e)
        | EffectKind::DataSponsorshipRemoved(e)
        | EffectKind::ClaimableBalanceSponsorshipRemoved(e) => is(&e.former_sponsor),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use test_case::test_case;

    use super::*;
    use crate::domain::records::{EffectRecord, OperationRecord};

    const ME: &str = "GAPP";

    fn account(value: Value) -> Account {
        serde_json::from_value(value).unwrap()
    }

    fn operation(value: Value) -> Operation {
        Operation::from_record(serde_json::from_value::<OperationRecord>(value).unwrap())
    }

    fn effect(value: Value) -> Effect {
        Effect::from_record(serde_json::from_value::<EffectRecord>(value).unwrap())
    }

    #[test]
    fn account_matches_self_sponsor_and_signer() {
        let own = account(json!({"id": ME, "account_id": ME, "sequence": "1"}));
        let sponsored = account(json!({"id": "GX", "account_id": "GX", "sequence": "1", "sponsor": ME}));
        let co_signed = account(json!({
            "id": "GY",
            "account_id": "GY",
            "sequence": "1",
            "signers": [{"key": ME, "weight": 1, "type": "ed25519_public_key"}]
        }));
        let unrelated = account(json!({"id": "GZ", "account_id": "GZ", "sequence": "1"}));

        assert!(account_is_relevant(&own, ME));
        assert!(account_is_relevant(&sponsored, ME));
        assert!(account_is_relevant(&co_signed, ME));
        assert!(!account_is_relevant(&unrelated, ME));
    }

    #[test]
    fn offer_matches_selling_issuer() {
        let offer: Offer = serde_json::from_value(json!({
            "id": 9,
            "seller": "GSELLER",
            "selling": {"asset_type": "credit_alphanum4", "asset_code": "PI", "asset_issuer": ME},
            "buying": {"asset_type": "native"},
            "amount": "1",
            "price_r": {"n": 1, "d": 1},
            "price": "1"
        }))
        .unwrap();

        assert!(offer_is_relevant(&offer, ME));
        assert!(!offer_is_relevant(&offer, "GOTHER"));
    }

    #[test_case(json!({"type": "payment", "from": "GA", "to": ME, "amount": "1", "asset_type": "native"}) ; "payment recipient")]
    #[test_case(json!({"type": "create_account", "funder": ME, "account": "GB", "starting_balance": "1"}) ; "funder")]
    #[test_case(json!({"type": "account_merge", "into": ME}) ; "merge target")]
    #[test_case(json!({"type": "claim_claimable_balance", "balance_id": "00", "claimant": ME}) ; "claimant")]
    #[test_case(json!({"type": "begin_sponsoring_future_reserves", "sponsored_id": ME}) ; "sponsored")]
    #[test_case(json!({"type": "revoke_sponsorship", "trustline_account_id": ME}) ; "revoked trustline")]
    #[test_case(json!({
        "type": "create_claimable_balance",
        "asset": "native",
        "amount": "1",
        "claimants": [{"destination": ME, "predicate": {"unconditional": true}}]
    }) ; "claimable balance destination")]
    fn operation_relevant_by_variant(mut value: Value) {
        value["id"] = json!("1");
        value["source_account"] = json!("GSOURCE");
        assert!(operation_is_relevant(&operation(value), ME));
    }

    #[test]
    fn operation_relevant_by_source() {
        let op = operation(json!({"id": "1", "type": "bump_sequence", "bump_to": "5", "source_account": ME}));
        assert!(operation_is_relevant(&op, ME));
    }

    #[test]
    fn unrelated_operation() {
        let op = operation(json!({
            "id": "1",
            "type": "payment",
            "source_account": "GA",
            "from": "GA",
            "to": "GB",
            "amount": "1",
            "asset_type": "native"
        }));
        assert!(!operation_is_relevant(&op, ME));
    }

    #[test_case(json!({"type": "trade", "seller": ME, "offer_id": 1, "bought_amount": "1", "bought_asset_type": "native", "sold_amount": "1", "sold_asset_type": "native"}) ; "trade seller")]
    #[test_case(json!({"type": "signer_created", "weight": 1, "public_key": ME}) ; "signer key")]
    #[test_case(json!({"type": "trustline_flags_updated", "trustor": ME, "asset_type": "native"}) ; "trustor")]
    #[test_case(json!({"type": "data_sponsorship_updated", "former_sponsor": "GX", "new_sponsor": ME, "data_name": "k"}) ; "new sponsor")]
    #[test_case(json!({"type": "signer_sponsorship_removed", "former_sponsor": "GX", "signer": ME}) ; "sponsored signer")]
    fn effect_relevant_by_variant(mut value: Value) {
        value["id"] = json!("0001-1");
        value["account"] = json!("GOTHER");
        assert!(effect_is_relevant(&effect(value), ME));
    }

    #[test]
    fn unrelated_effect() {
        let e = effect(json!({"id": "1-1", "type": "account_created", "account": "GX", "starting_balance": "1"}));
        assert!(!effect_is_relevant(&e, ME));
        assert!(effect_is_relevant(&e, "GX"));
    }
}
