//! Subscription ledger: payment confirmations, cancellation, auto-renew and
//! cycle rollover.
//!
//! Every write goes through [`commit`], which compares the stored `version`
//! with the one the caller read and bumps it.
//!
//! **PRs that only change subscription lifecycle or rollover should edit this file only.**

use crate::admin::{get_admin, require_admin, require_payment_source};
use crate::calendar::add_months;
use crate::catalog::{get_plan, require_sellable};
use crate::state_machine::validate_status_transition;
use crate::storage;
use crate::types::{
    BatchRolloverResult, DataKey, Error, Plan, Subscription, SubscriptionCanceledEvent,
    SubscriptionCreatedEvent, SubscriptionRolledEvent, SubscriptionStatus, UsageSummary,
};
use soroban_sdk::{log, Address, Env, Symbol, Vec};

/// Most cycles a single rollover may advance (20 years of monthly cycles).
pub const MAX_ROLLOVER_STEPS: u32 = 240;

fn next_sub_id(env: &Env) -> Result<u32, Error> {
    let key = DataKey::NextSubId;
    let id: u32 = env.storage().instance().get(&key).unwrap_or(0);
    let next = id.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&key, &next);
    Ok(id)
}

pub fn get_subscription(env: &Env, subscription_id: u32) -> Result<Subscription, Error> {
    storage::read(env, &DataKey::Sub(subscription_id)).ok_or(Error::SubscriptionNotFound)
}

/// The member's most recent subscription as stored, without rollover applied.
pub fn stored_subscription(env: &Env, member: &Address) -> Option<Subscription> {
    let id: u32 = storage::read(env, &DataKey::MemberSub(member.clone()))?;
    storage::read(env, &DataKey::Sub(id))
}

/// Writes `next` if the stored record is still at `expected_version`.
///
/// Returns the committed record with its bumped version, or
/// [`Error::ConcurrentUpdateConflict`] if another write landed in between.
pub fn commit(env: &Env, mut next: Subscription, expected_version: u32) -> Result<Subscription, Error> {
    let key = DataKey::Sub(next.subscription_id);
    let stored: Subscription = storage::read(env, &key).ok_or(Error::SubscriptionNotFound)?;
    if stored.version != expected_version {
        log!(env, "subscription version moved", next.subscription_id, expected_version, stored.version);
        return Err(Error::ConcurrentUpdateConflict);
    }
    next.version = expected_version.wrapping_add(1);
    storage::write(env, &key, &next);
    Ok(next)
}

/// Applies every cycle boundary that has passed by `now`, without writing.
///
/// An ACTIVE subscription whose cycle ended renews when auto-renew is on and
/// the latest payment covers time beyond the boundary; otherwise it expires.
/// Returns the projected record and whether anything changed.
pub fn project(sub: &Subscription, now: u64) -> Result<(Subscription, bool), Error> {
    let mut next = sub.clone();
    let mut changed = false;
    let mut steps = 0u32;

    while next.status == SubscriptionStatus::Active && now >= next.cycle_end {
        if !(next.auto_renew && next.paid_until > next.cycle_end) {
            validate_status_transition(&next.status, &SubscriptionStatus::Expired)?;
            next.status = SubscriptionStatus::Expired;
            changed = true;
            break;
        }
        if steps == MAX_ROLLOVER_STEPS {
            return Err(Error::Overflow);
        }
        let index = next.cycle_index.checked_add(1).ok_or(Error::Overflow)?;
        let months_to_end = index.checked_add(1).ok_or(Error::Overflow)?;
        next.cycle_start = next.cycle_end;
        next.cycle_end = add_months(next.anchor, months_to_end).ok_or(Error::Overflow)?;
        next.cycle_index = index;
        next.days_used = 0;
        next.checkins_this_cycle = 0;
        next.last_counted_day = None;
        changed = true;
        steps += 1;
    }
    Ok((next, changed))
}

/// The member's subscription with rollover applied but not persisted.
pub fn projected_subscription(env: &Env, member: &Address, now: u64) -> Result<Option<Subscription>, Error> {
    match stored_subscription(env, member) {
        Some(stored) => Ok(Some(project(&stored, now)?.0)),
        None => Ok(None),
    }
}

/// Applies and persists rollover for `member`. Returns the current record.
pub fn rollover_member(env: &Env, member: &Address, now: u64) -> Result<Option<Subscription>, Error> {
    let stored = match stored_subscription(env, member) {
        Some(s) => s,
        None => return Ok(None),
    };
    let (next, changed) = project(&stored, now)?;
    if !changed {
        return Ok(Some(stored));
    }
    let committed = commit(env, next, stored.version)?;

    let topic = if committed.status == SubscriptionStatus::Active {
        "subscription_renewed"
    } else {
        log!(env, "subscription expired at rollover", committed.subscription_id);
        "subscription_expired"
    };
    env.events().publish(
        (Symbol::new(env, topic), committed.subscription_id),
        SubscriptionRolledEvent {
            subscription_id: committed.subscription_id,
            member: committed.member.clone(),
            status: committed.status,
            cycle_start: committed.cycle_start,
            cycle_end: committed.cycle_end,
        },
    );
    Ok(Some(committed))
}

fn create_subscription(
    env: &Env,
    member: &Address,
    plan: &Plan,
    now: u64,
    paid_until: u64,
) -> Result<u32, Error> {
    let subscription_id = next_sub_id(env)?;
    let cycle_end = add_months(now, 1).ok_or(Error::Overflow)?;
    let sub = Subscription {
        subscription_id,
        member: member.clone(),
        plan_id: plan.plan_id,
        included_days: plan.included_days,
        tier: plan.tier,
        anchor: now,
        cycle_index: 0,
        cycle_start: now,
        cycle_end,
        days_used: 0,
        last_counted_day: None,
        status: SubscriptionStatus::Active,
        auto_renew: true,
        paid_until,
        checkins_this_cycle: 0,
        total_checkins: 0,
        version: 0,
    };
    storage::write(env, &DataKey::Sub(subscription_id), &sub);
    storage::write(env, &DataKey::MemberSub(member.clone()), &subscription_id);

    env.events().publish(
        (Symbol::new(env, "subscription_created"), subscription_id),
        SubscriptionCreatedEvent {
            subscription_id,
            member: member.clone(),
            plan_id: plan.plan_id,
            cycle_end,
            paid_until,
        },
    );
    Ok(subscription_id)
}

/// Handles a confirmed payment of `plan_id` for `member`, covering time up to `paid_until`.
///
/// - No ACTIVE subscription: a new one starts now.
/// - ACTIVE on the same plan: coverage is extended and auto-renew switched back
///   on, even if the plan has since been retired.
/// - ACTIVE on another plan: the current one is canceled and a new one starts
///   now with the new plan's terms.
///
/// Returns the id of the subscription the payment was applied to.
pub fn do_confirm_payment(
    env: &Env,
    caller: Address,
    member: Address,
    plan_id: u32,
    paid_until: u64,
) -> Result<u32, Error> {
    require_payment_source(env, &caller)?;
    let now = env.ledger().timestamp();
    if paid_until <= now {
        return Err(Error::InvalidPaidUntil);
    }
    let plan = get_plan(env, plan_id)?;

    if let Some(current) = rollover_member(env, &member, now)? {
        if current.status == SubscriptionStatus::Active {
            if current.plan_id == plan_id {
                let mut extended = current.clone();
                extended.paid_until = current.paid_until.max(paid_until);
                extended.auto_renew = true;
                let extended = commit(env, extended, current.version)?;
                env.events().publish(
                    (Symbol::new(env, "payment_applied"), extended.subscription_id),
                    (member, plan_id, extended.paid_until),
                );
                return Ok(extended.subscription_id);
            }

            require_sellable(&plan)?;
            let mut replaced = current.clone();
            validate_status_transition(&replaced.status, &SubscriptionStatus::Canceled)?;
            replaced.status = SubscriptionStatus::Canceled;
            let replaced = commit(env, replaced, current.version)?;
            log!(env, "plan change replaces subscription", replaced.subscription_id, plan_id);
            env.events().publish(
                (Symbol::new(env, "subscription_canceled"), replaced.subscription_id),
                SubscriptionCanceledEvent {
                    subscription_id: replaced.subscription_id,
                    member: member.clone(),
                    authorizer: caller,
                },
            );
        }
    }

    require_sellable(&plan)?;
    create_subscription(env, &member, &plan, now, paid_until)
}

/// Cancel the member's subscription. Allowed for the member or the admin.
pub fn do_cancel_subscription(env: &Env, authorizer: Address, member: Address) -> Result<(), Error> {
    authorizer.require_auth();
    if authorizer != member && authorizer != get_admin(env)? {
        return Err(Error::Unauthorized);
    }

    let now = env.ledger().timestamp();
    let current = rollover_member(env, &member, now)?.ok_or(Error::SubscriptionNotFound)?;
    if current.status == SubscriptionStatus::Canceled {
        return Ok(());
    }
    validate_status_transition(&current.status, &SubscriptionStatus::Canceled)?;

    let mut canceled = current.clone();
    canceled.status = SubscriptionStatus::Canceled;
    let canceled = commit(env, canceled, current.version)?;

    env.events().publish(
        (Symbol::new(env, "subscription_canceled"), canceled.subscription_id),
        SubscriptionCanceledEvent {
            subscription_id: canceled.subscription_id,
            member,
            authorizer,
        },
    );
    Ok(())
}

pub fn do_set_auto_renew(env: &Env, member: Address, enabled: bool) -> Result<(), Error> {
    member.require_auth();
    let now = env.ledger().timestamp();
    let current = rollover_member(env, &member, now)?.ok_or(Error::NoActiveSubscription)?;
    if current.status != SubscriptionStatus::Active {
        return Err(Error::NoActiveSubscription);
    }
    if current.auto_renew == enabled {
        return Ok(());
    }
    let mut updated = current.clone();
    updated.auto_renew = enabled;
    let updated = commit(env, updated, current.version)?;
    env.events().publish(
        (Symbol::new(env, "auto_renew_updated"), updated.subscription_id),
        enabled,
    );
    Ok(())
}

/// Rolls over each listed member. Admin only.
///
/// Each member is processed independently; a failure is reported in its slot
/// and does not stop the batch.
pub fn do_batch_rollover(
    env: &Env,
    admin: Address,
    members: &Vec<Address>,
) -> Result<Vec<BatchRolloverResult>, Error> {
    require_admin(env, &admin)?;
    let now = env.ledger().timestamp();

    let mut results = Vec::new(env);
    for member in members.iter() {
        let res = match rollover_member(env, &member, now) {
            Ok(sub) => BatchRolloverResult {
                success: true,
                error_code: 0,
                status: sub.map(|s| s.status),
            },
            Err(e) => BatchRolloverResult {
                success: false,
                error_code: e.to_code(),
                status: None,
            },
        };
        results.push_back(res);
    }
    Ok(results)
}

pub fn usage_summary(env: &Env, member: &Address, now: u64) -> Result<UsageSummary, Error> {
    let sub = projected_subscription(env, member, now)?.ok_or(Error::SubscriptionNotFound)?;
    Ok(UsageSummary {
        subscription_id: sub.subscription_id,
        plan_id: sub.plan_id,
        status: sub.status,
        tier: sub.tier,
        days_used: sub.days_used,
        included_days: sub.included_days,
        unlimited: sub.is_unlimited(),
        remaining_days: sub.remaining_days(),
        cycle_start: sub.cycle_start,
        cycle_end: sub.cycle_end,
        auto_renew: sub.auto_renew,
        checkins_this_cycle: sub.checkins_this_cycle,
        total_checkins: sub.total_checkins,
    })
}
