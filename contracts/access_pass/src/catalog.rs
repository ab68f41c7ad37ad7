//! Plan catalog and space registry: operator-managed, read-only to the
//! entitlement flows.
//!
//! **PRs that only change how plans or spaces are defined should edit this file only.**

use crate::admin::require_admin;
use crate::storage;
use crate::types::{AccessTier, DataKey, Error, Plan, Space};
use soroban_sdk::{log, Address, Env, String, Symbol, Vec};

/// Upper bound on a single `list_*` page.
pub const MAX_PAGE_SIZE: u32 = 50;

// ── Plans ────────────────────────────────────────────────────────────────────

pub fn do_define_plan(
    env: &Env,
    admin: Address,
    plan_id: u32,
    name: String,
    monthly_price: i128,
    included_days: u32,
    tier: AccessTier,
) -> Result<(), Error> {
    require_admin(env, &admin)?;

    if monthly_price < 0 || included_days == 0 || name.len() == 0 {
        return Err(Error::InvalidInput);
    }
    let key = DataKey::Plan(plan_id);
    if storage::has(env, &key) {
        return Err(Error::PlanAlreadyExists);
    }

    let plan = Plan {
        plan_id,
        name,
        monthly_price,
        included_days,
        tier,
        active: true,
    };
    storage::write(env, &key, &plan);

    let mut ids = plan_ids(env);
    ids.push_back(plan_id);
    env.storage().instance().set(&DataKey::PlanIds, &ids);

    env.events()
        .publish((Symbol::new(env, "plan_defined"), plan_id), plan);
    Ok(())
}

/// Stops new sales of a plan. Subscriptions already sold keep their copied terms.
pub fn do_retire_plan(env: &Env, admin: Address, plan_id: u32) -> Result<(), Error> {
    require_admin(env, &admin)?;
    let mut plan = get_plan(env, plan_id)?;
    if !plan.active {
        return Ok(());
    }
    plan.active = false;
    storage::write(env, &DataKey::Plan(plan_id), &plan);
    env.events()
        .publish((Symbol::new(env, "plan_retired"), plan_id), ());
    Ok(())
}

pub fn get_plan(env: &Env, plan_id: u32) -> Result<Plan, Error> {
    storage::read(env, &DataKey::Plan(plan_id)).ok_or(Error::PlanNotFound)
}

/// Rejects new sales of a retired plan. Renewals of existing subscriptions do not go through here.
pub fn require_sellable(plan: &Plan) -> Result<(), Error> {
    if !plan.active {
        return Err(Error::PlanRetired);
    }
    Ok(())
}

fn plan_ids(env: &Env) -> Vec<u32> {
    env.storage()
        .instance()
        .get(&DataKey::PlanIds)
        .unwrap_or_else(|| Vec::new(env))
}

/// All plans in definition order, optionally including retired ones.
pub fn list_plans(env: &Env, include_retired: bool) -> Vec<Plan> {
    let mut out = Vec::new(env);
    for id in plan_ids(env).iter() {
        if let Ok(plan) = get_plan(env, id) {
            if plan.active || include_retired {
                out.push_back(plan);
            }
        }
    }
    out
}

// ── Spaces ───────────────────────────────────────────────────────────────────

fn next_space_id(env: &Env) -> Result<u32, Error> {
    let key = DataKey::NextSpaceId;
    let id: u32 = env.storage().instance().get(&key).unwrap_or(0);
    let next = id.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&key, &next);
    Ok(id)
}

pub fn do_register_space(
    env: &Env,
    admin: Address,
    name: String,
    location: String,
    city: String,
    tier: AccessTier,
    operator: Address,
) -> Result<u32, Error> {
    require_admin(env, &admin)?;
    if name.len() == 0 || location.len() == 0 {
        return Err(Error::InvalidInput);
    }

    let space_id = next_space_id(env)?;
    let space = Space {
        space_id,
        name,
        location,
        city,
        tier,
        operator,
        open: true,
    };
    storage::write(env, &DataKey::Space(space_id), &space);
    env.events()
        .publish((Symbol::new(env, "space_registered"), space_id), space);
    Ok(space_id)
}

/// Replaces a space's listing details. Takes effect for the next evaluation,
/// including redemptions of tokens already issued.
pub fn do_update_space(
    env: &Env,
    admin: Address,
    space_id: u32,
    name: String,
    location: String,
    city: String,
    tier: AccessTier,
    operator: Address,
) -> Result<(), Error> {
    require_admin(env, &admin)?;
    if name.len() == 0 || location.len() == 0 {
        return Err(Error::InvalidInput);
    }
    let mut space = get_space(env, space_id)?;
    space.name = name;
    space.location = location;
    space.city = city;
    space.tier = tier;
    space.operator = operator;
    storage::write(env, &DataKey::Space(space_id), &space);
    env.events()
        .publish((Symbol::new(env, "space_updated"), space_id), space);
    Ok(())
}

pub fn do_set_space_open(env: &Env, admin: Address, space_id: u32, open: bool) -> Result<(), Error> {
    require_admin(env, &admin)?;
    let mut space = get_space(env, space_id)?;
    space.open = open;
    storage::write(env, &DataKey::Space(space_id), &space);
    log!(env, "space open flag changed", space_id, open);
    env.events()
        .publish((Symbol::new(env, "space_updated"), space_id), space);
    Ok(())
}

pub fn get_space(env: &Env, space_id: u32) -> Result<Space, Error> {
    storage::read(env, &DataKey::Space(space_id)).ok_or(Error::SpaceNotFound)
}

/// Verify that `operator` runs `space_id` and has signed the invocation.
pub fn require_space_operator(env: &Env, operator: &Address, space_id: u32) -> Result<Space, Error> {
    let space = get_space(env, space_id)?;
    operator.require_auth();
    if operator != &space.operator {
        return Err(Error::Unauthorized);
    }
    Ok(space)
}

/// Spaces ordered by id starting at `start_id`, optionally filtered by tier.
///
/// `limit` is capped at [`MAX_PAGE_SIZE`]. Closed spaces are included so the
/// directory can show them as unavailable.
pub fn list_spaces(env: &Env, tier: Option<AccessTier>, start_id: u32, limit: u32) -> Vec<Space> {
    let mut out = Vec::new(env);
    let limit = limit.min(MAX_PAGE_SIZE);
    let next_id: u32 = env
        .storage()
        .instance()
        .get(&DataKey::NextSpaceId)
        .unwrap_or(0);

    let mut id = start_id;
    while id < next_id && out.len() < limit {
        if let Ok(space) = get_space(env, id) {
            let keep = match tier {
                Some(t) => space.tier == t,
                None => true,
            };
            if keep {
                out.push_back(space);
            }
        }
        id += 1;
    }
    out
}
