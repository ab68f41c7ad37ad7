#![no_std]

// ── Modules ──────────────────────────────────────────────────────────────────
mod admin;
mod calendar;
mod catalog;
mod entitlement;
mod issuer;
mod ledger;
mod redemption;
mod state_machine;
mod storage;
pub mod types;

// ── Re-exports (used by tests and external consumers) ────────────────────────
pub use calendar::{add_months, day_index};
pub use issuer::CODE_ALPHABET;
pub use redemption::HISTORY_LIMIT;
pub use state_machine::{validate_status_transition, validate_token_transition};
pub use types::*;

use soroban_sdk::{contract, contractimpl, Address, Env, String, Vec};

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct AccessPass;

#[contractimpl]
impl AccessPass {
    // ── Admin / Config ───────────────────────────────────────────────────

    /// Initialize the contract with its admin, the payment processor allowed
    /// to confirm payments, and the runtime config.
    pub fn init(
        env: Env,
        admin: Address,
        payment_processor: Address,
        config: Config,
    ) -> Result<(), Error> {
        admin::do_init(&env, admin, payment_processor, config)
    }

    /// Get the current admin address.
    pub fn get_admin(env: Env) -> Result<Address, Error> {
        admin::get_admin(&env)
    }

    /// Rotate admin to a new address. Only callable by current admin.
    ///
    /// Takes effect immediately and emits an `admin_rotation` event.
    pub fn rotate_admin(env: Env, current_admin: Address, new_admin: Address) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        admin::do_rotate_admin(&env, current_admin, new_admin)
    }

    pub fn get_config(env: Env) -> Result<Config, Error> {
        admin::get_config(&env)
    }

    /// Replace the runtime config. Only callable by admin.
    ///
    /// Live tokens keep the expiry they were issued with.
    pub fn set_config(env: Env, admin: Address, config: Config) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        admin::do_set_config(&env, admin, config)
    }

    pub fn get_payment_processor(env: Env) -> Result<Address, Error> {
        admin::get_payment_processor(&env)
    }

    pub fn set_payment_processor(env: Env, admin: Address, processor: Address) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        admin::do_set_payment_processor(&env, admin, processor)
    }

    // ── Plans ────────────────────────────────────────────────────────────

    /// Define a new plan. `included_days` of 999 or more means unlimited.
    pub fn define_plan(
        env: Env,
        admin: Address,
        plan_id: u32,
        name: String,
        monthly_price: i128,
        included_days: u32,
        tier: AccessTier,
    ) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        catalog::do_define_plan(&env, admin, plan_id, name, monthly_price, included_days, tier)
    }

    /// Stop selling a plan. Existing subscriptions are unaffected.
    pub fn retire_plan(env: Env, admin: Address, plan_id: u32) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        catalog::do_retire_plan(&env, admin, plan_id)
    }

    pub fn get_plan(env: Env, plan_id: u32) -> Result<Plan, Error> {
        admin::require_initialized(&env)?;
        catalog::get_plan(&env, plan_id)
    }

    pub fn list_plans(env: Env, include_retired: bool) -> Vec<Plan> {
        catalog::list_plans(&env, include_retired)
    }

    // ── Spaces ───────────────────────────────────────────────────────────

    /// Register a partner space, open for check-ins. Returns the new space id.
    pub fn register_space(
        env: Env,
        admin: Address,
        name: String,
        location: String,
        city: String,
        tier: AccessTier,
        operator: Address,
    ) -> Result<u32, Error> {
        admin::require_initialized(&env)?;
        catalog::do_register_space(&env, admin, name, location, city, tier, operator)
    }

    pub fn update_space(
        env: Env,
        admin: Address,
        space_id: u32,
        name: String,
        location: String,
        city: String,
        tier: AccessTier,
        operator: Address,
    ) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        catalog::do_update_space(&env, admin, space_id, name, location, city, tier, operator)
    }

    /// Open or close a space. Closed spaces deny issuance and redemption.
    pub fn set_space_open(env: Env, admin: Address, space_id: u32, open: bool) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        catalog::do_set_space_open(&env, admin, space_id, open)
    }

    pub fn get_space(env: Env, space_id: u32) -> Result<Space, Error> {
        admin::require_initialized(&env)?;
        catalog::get_space(&env, space_id)
    }

    /// Page through spaces by id, optionally only those of `tier`.
    pub fn list_spaces(env: Env, tier: Option<AccessTier>, start_id: u32, limit: u32) -> Vec<Space> {
        catalog::list_spaces(&env, tier, start_id, limit)
    }

    // ── Subscription ledger ──────────────────────────────────────────────

    /// Apply a confirmed payment. Callable by the payment processor or admin.
    ///
    /// Starts a subscription, extends the current one, or replaces it when
    /// `plan_id` differs. Returns the subscription id.
    pub fn confirm_payment(
        env: Env,
        caller: Address,
        member: Address,
        plan_id: u32,
        paid_until: u64,
    ) -> Result<u32, Error> {
        admin::require_initialized(&env)?;
        ledger::do_confirm_payment(&env, caller, member, plan_id, paid_until)
    }

    /// Cancel the member's subscription, effective immediately.
    /// `authorizer` must be the member or the admin.
    pub fn cancel_subscription(env: Env, authorizer: Address, member: Address) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        ledger::do_cancel_subscription(&env, authorizer, member)
    }

    pub fn set_auto_renew(env: Env, member: Address, enabled: bool) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        ledger::do_set_auto_renew(&env, member, enabled)
    }

    /// Persist rollover for one member. Anyone may call; the outcome depends
    /// only on the ledger time.
    pub fn rollover(env: Env, member: Address) -> Result<Option<Subscription>, Error> {
        admin::require_initialized(&env)?;
        ledger::rollover_member(&env, &member, env.ledger().timestamp())
    }

    /// **ADMIN ONLY**: Persist rollover for many members in one call.
    pub fn batch_rollover(
        env: Env,
        admin: Address,
        members: Vec<Address>,
    ) -> Result<Vec<BatchRolloverResult>, Error> {
        admin::require_initialized(&env)?;
        ledger::do_batch_rollover(&env, admin, &members)
    }

    /// Read a subscription by id, as stored.
    pub fn get_subscription(env: Env, subscription_id: u32) -> Result<Subscription, Error> {
        admin::require_initialized(&env)?;
        ledger::get_subscription(&env, subscription_id)
    }

    /// The member's most recent subscription with rollover applied (not persisted).
    pub fn get_member_subscription(env: Env, member: Address) -> Result<Option<Subscription>, Error> {
        admin::require_initialized(&env)?;
        ledger::projected_subscription(&env, &member, env.ledger().timestamp())
    }

    pub fn get_usage(env: Env, member: Address) -> Result<UsageSummary, Error> {
        admin::require_initialized(&env)?;
        ledger::usage_summary(&env, &member, env.ledger().timestamp())
    }

    // ── Entitlement / tokens ─────────────────────────────────────────────

    /// Advisory check: may `member` check in at `space_id` now? Never writes.
    pub fn evaluate(env: Env, member: Address, space_id: u32) -> Result<EntitlementDecision, Error> {
        admin::require_initialized(&env)?;
        entitlement::evaluate(&env, &member, space_id)
    }

    /// Issue a check-in code for `member` at `space_id`. Requires the member's auth.
    ///
    /// Any live code for the same space is voided. Quota is not touched.
    pub fn issue(env: Env, member: Address, space_id: u32) -> Result<CheckInToken, Error> {
        admin::require_initialized(&env)?;
        issuer::do_issue(&env, member, space_id)
    }

    pub fn get_token(env: Env, code: String) -> Result<CheckInToken, Error> {
        admin::require_initialized(&env)?;
        issuer::get_token(&env, code)
    }

    pub fn get_pending_token(env: Env, member: Address, space_id: u32) -> Option<CheckInToken> {
        issuer::get_pending_token(&env, member, space_id)
    }

    /// Withdraw one of the member's own live codes.
    pub fn void_token(env: Env, member: Address, code: String) -> Result<(), Error> {
        admin::require_initialized(&env)?;
        issuer::do_void_token(&env, member, code)
    }

    /// Redeem `code` at `space_id`. Requires the space operator's auth.
    ///
    /// Code and entitlement failures come back in the result with
    /// `success == false` so the resulting token state is kept.
    pub fn redeem(
        env: Env,
        operator: Address,
        code: String,
        space_id: u32,
    ) -> Result<RedemptionResult, Error> {
        admin::require_initialized(&env)?;
        redemption::do_redeem(&env, operator, code, space_id)
    }

    /// Most recent check-ins of `member`, oldest first.
    pub fn get_checkin_history(env: Env, member: Address) -> Vec<CheckInRecord> {
        redemption::checkin_history(&env, member)
    }

    /// Delete settled tokens past their retention window. Returns how many were removed.
    pub fn prune_tokens(env: Env, codes: Vec<String>) -> Result<u32, Error> {
        admin::require_initialized(&env)?;
        redemption::do_prune_tokens(&env, codes)
    }
}
