//! Entitlement evaluator: may this member check in at this space right now?
//!
//! Pure with respect to storage. Callers apply rollover first (persisted in
//! `issue`/`redeem`, projected in `evaluate`) so a stale cycle is never honored.

use crate::catalog::get_space;
use crate::ledger::projected_subscription;
use crate::types::{EntitlementDecision, Error, Space, Subscription, SubscriptionStatus};
use soroban_sdk::{log, Address, Env};

/// Checks `sub` against `space`. Denials, in order:
/// [`Error::NoActiveSubscription`], [`Error::SpaceClosed`],
/// [`Error::QuotaExhausted`], [`Error::TierMismatch`].
pub fn check(sub: Option<&Subscription>, space: &Space) -> Result<(), Error> {
    let sub = match sub {
        Some(s) if s.status == SubscriptionStatus::Active => s,
        _ => return Err(Error::NoActiveSubscription),
    };
    if !space.open {
        return Err(Error::SpaceClosed);
    }
    if !sub.is_unlimited() && sub.days_used >= sub.included_days {
        return Err(Error::QuotaExhausted);
    }
    if !sub.tier.covers(space.tier) {
        return Err(Error::TierMismatch);
    }
    Ok(())
}

/// Advisory pre-flight used by the UI. No side effects.
///
/// Fails only when the space does not exist; every denial is returned as data.
pub fn evaluate(env: &Env, member: &Address, space_id: u32) -> Result<EntitlementDecision, Error> {
    let space = get_space(env, space_id)?;
    let now = env.ledger().timestamp();
    let sub = projected_subscription(env, member, now)?;

    let verdict = check(sub.as_ref(), &space);
    if let Err(reason) = verdict {
        log!(env, "entitlement denied", space_id, reason.to_code());
    }

    Ok(match sub {
        Some(s) => EntitlementDecision {
            allowed: verdict.is_ok(),
            reason_code: verdict.err().map(|e| e.to_code()).unwrap_or(0),
            days_used: s.days_used,
            included_days: s.included_days,
            unlimited: s.is_unlimited(),
            tier: Some(s.tier),
        },
        None => EntitlementDecision {
            allowed: false,
            reason_code: Error::NoActiveSubscription.to_code(),
            days_used: 0,
            included_days: 0,
            unlimited: false,
            tier: None,
        },
    })
}
