//! Redemption and usage accounting: validates a code presented at a venue,
//! consumes it, and charges at most one quota day per member per calendar day.
//!
//! **PRs that only change how a check-in is settled should edit this file only.**

use crate::admin::get_config;
use crate::calendar::day_index;
use crate::catalog::require_space_operator;
use crate::entitlement;
use crate::issuer::{effective, load_token, settle_token};
use crate::ledger::{commit, rollover_member};
use crate::state_machine::settled_token_error;
use crate::storage;
use crate::types::{
    CheckInRecord, CheckInToken, DataKey, Error, RedemptionResult, Space, Subscription,
    TokenRedeemedEvent, TokenStatus,
};
use soroban_sdk::{log, Address, Env, String, Symbol, Vec};

/// Check-ins kept per member in the history list.
pub const HISTORY_LIMIT: u32 = 30;

/// Attempts at the evaluate-and-commit step before a version conflict is surfaced.
const MAX_SETTLE_ATTEMPTS: u32 = 2;

/// Records one check-in on `day`. Only the first check-in of a day consumes quota.
pub fn apply_checkin(sub: &Subscription, day: u64) -> Result<(Subscription, bool), Error> {
    let mut next = sub.clone();
    let consumed = next.last_counted_day != Some(day);
    if consumed {
        next.days_used = next.days_used.checked_add(1).ok_or(Error::Overflow)?;
        next.last_counted_day = Some(day);
    }
    if !next.is_unlimited() && next.days_used > next.included_days {
        return Err(Error::QuotaExhausted);
    }
    next.checkins_this_cycle = next.checkins_this_cycle.saturating_add(1);
    next.total_checkins = next.total_checkins.saturating_add(1);
    Ok((next, consumed))
}

/// Re-evaluates entitlement against fresh ledger state and commits the usage.
fn settle_usage(
    env: &Env,
    token: &CheckInToken,
    space: &Space,
    now: u64,
    day: u64,
) -> Result<(Subscription, bool), Error> {
    let sub = rollover_member(env, &token.member, now)?;
    entitlement::check(sub.as_ref(), space)?;
    let current = sub.ok_or(Error::NoActiveSubscription)?;
    let (next, consumed) = apply_checkin(&current, day)?;
    let committed = commit(env, next, current.version)?;
    Ok((committed, consumed))
}

/// Runs `settle` again when the subscription version moved underneath it,
/// up to [`MAX_SETTLE_ATTEMPTS`] times in total. Other outcomes pass through.
pub fn retry_on_conflict<T>(
    env: &Env,
    mut settle: impl FnMut() -> Result<T, Error>,
) -> Result<T, Error> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match settle() {
            Err(Error::ConcurrentUpdateConflict) if attempt < MAX_SETTLE_ATTEMPTS => {
                log!(env, "retrying check-in settlement", attempt);
            }
            other => return other,
        }
    }
}

fn record_history(env: &Env, member: &Address, record: CheckInRecord) {
    let key = DataKey::CheckIns(member.clone());
    let mut history: Vec<CheckInRecord> = storage::read(env, &key).unwrap_or_else(|| Vec::new(env));
    history.push_back(record);
    while history.len() > HISTORY_LIMIT {
        history.pop_front();
    }
    storage::write(env, &key, &history);
}

/// Validates and consumes `token` at `space`. Every `Err` leaves the token
/// either untouched or in the terminal state the failure implies.
fn redeem_token(
    env: &Env,
    mut token: CheckInToken,
    space: &Space,
    now: u64,
) -> Result<RedemptionResult, Error> {
    if let Some(err) = settled_token_error(&token.status) {
        return Err(err);
    }
    if now > token.expires_at {
        settle_token(env, &mut token, TokenStatus::Expired)?;
        env.events().publish(
            (Symbol::new(env, "token_expired"), token.member.clone()),
            (token.space_id, token.code.clone()),
        );
        return Err(Error::CodeExpired);
    }
    if token.space_id != space.space_id {
        return Err(Error::SpaceMismatch);
    }

    let config = get_config(env)?;
    let day = day_index(now, config.day_offset_seconds);

    let settled = retry_on_conflict(env, || settle_usage(env, &token, space, now, day));
    let (sub, consumed) = match settled {
        Ok(settled) => settled,
        Err(e) if e.is_entitlement_denial() => {
            settle_token(env, &mut token, TokenStatus::Void)?;
            log!(env, "check-in denied at redemption", space.space_id, e.to_code());
            env.events().publish(
                (Symbol::new(env, "token_voided"), token.member.clone()),
                (token.space_id, token.code.clone()),
            );
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    settle_token(env, &mut token, TokenStatus::Redeemed)?;
    record_history(
        env,
        &token.member,
        CheckInRecord {
            space_id: space.space_id,
            timestamp: now,
            day,
            consumed_day: consumed,
        },
    );
    env.events().publish(
        (Symbol::new(env, "token_redeemed"), token.member.clone()),
        TokenRedeemedEvent {
            member: token.member.clone(),
            space_id: space.space_id,
            consumed_day: consumed,
            days_used: sub.days_used,
        },
    );

    Ok(RedemptionResult {
        success: true,
        error_code: 0,
        member: Some(token.member),
        remaining_days: sub.remaining_days(),
        unlimited: sub.is_unlimited(),
        consumed_today: consumed,
        days_used: sub.days_used,
    })
}

/// Venue-side redemption of `code` at `space_id` by that space's operator.
///
/// Operator and space problems are returned as `Err`. Everything about the
/// code or the member's entitlement is reported in the [`RedemptionResult`].
pub fn do_redeem(
    env: &Env,
    operator: Address,
    code: String,
    space_id: u32,
) -> Result<RedemptionResult, Error> {
    let space = require_space_operator(env, &operator, space_id)?;
    let now = env.ledger().timestamp();

    let token = match load_token(env, &code) {
        Some(t) => t,
        None => {
            log!(env, "unknown check-in code", space_id);
            return Ok(RedemptionResult::failed(Error::CodeNotFound, None));
        }
    };
    let member = token.member.clone();

    match redeem_token(env, token, &space, now) {
        Ok(result) => Ok(result),
        Err(e) => {
            env.events().publish(
                (Symbol::new(env, "redemption_rejected"), space_id),
                (code, e.to_code()),
            );
            Ok(RedemptionResult::failed(e, Some(member)))
        }
    }
}

pub fn checkin_history(env: &Env, member: Address) -> Vec<CheckInRecord> {
    storage::read(env, &DataKey::CheckIns(member)).unwrap_or_else(|| Vec::new(env))
}

/// Removes settled or lapsed tokens whose retention window has passed.
/// Codes still live, unknown, or within retention are skipped. Returns the count removed.
pub fn do_prune_tokens(env: &Env, codes: Vec<String>) -> Result<u32, Error> {
    let config = get_config(env)?;
    let now = env.ledger().timestamp();

    let mut removed = 0u32;
    for code in codes.iter() {
        let token = match load_token(env, &code) {
            Some(t) => effective(t, now),
            None => continue,
        };
        if token.status == TokenStatus::Pending {
            continue;
        }
        let purge_after = token
            .expires_at
            .saturating_add(config.token_retention_seconds);
        if now <= purge_after {
            continue;
        }

        storage::remove(env, &DataKey::Token(code.clone()));
        let pair = DataKey::PendingToken(token.member.clone(), token.space_id);
        let indexed: Option<String> = storage::read(env, &pair);
        if indexed.as_ref() == Some(&code) {
            storage::remove(env, &pair);
        }
        removed += 1;
    }

    if removed > 0 {
        env.events()
            .publish((Symbol::new(env, "tokens_pruned"),), removed);
    }
    Ok(removed)
}
