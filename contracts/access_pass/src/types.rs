//! Contract types: errors, storage keys, catalog entries, subscriptions and tokens.
//!
//! Kept in a separate module to reduce merge conflicts when editing the
//! evaluator, issuer or redemption flows.

use soroban_sdk::{contracterror, contracttype, Address, String};

/// Increment this constant whenever the on-chain storage schema changes.
///
/// ⚠️ Upgrade-sensitive: written to [`DataKey::SchemaVersion`] during `init()`.
/// Migration logic must read this value and branch on it before touching storage.
pub const STORAGE_VERSION: u32 = 1;

/// `included_days` at or above this value means the plan has no day quota.
pub const UNLIMITED_DAYS: u32 = 999;

/// Canonical storage key enum for all contract state.
///
/// ⚠️ Upgrade-sensitive: discriminant order is fixed. Never remove or reorder
/// variants, only append new ones. The integer comments are authoritative.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// Authorized admin address. Discriminant 0.
    Admin,
    /// Address allowed to deliver payment confirmations. Discriminant 1.
    PaymentProcessor,
    /// Runtime [`Config`]. Discriminant 2.
    Config,
    /// On-chain storage schema version. Discriminant 3.
    SchemaVersion,
    /// Ordered list of defined plan ids. Discriminant 4.
    PlanIds,
    /// Plan record keyed by plan id. Discriminant 5.
    Plan(u32),
    /// Auto-incrementing space id counter. Discriminant 6.
    NextSpaceId,
    /// Space record keyed by space id. Discriminant 7.
    Space(u32),
    /// Auto-incrementing subscription id counter. Discriminant 8.
    NextSubId,
    /// Subscription record keyed by subscription id. Discriminant 9.
    Sub(u32),
    /// Member → id of their most recent subscription. Discriminant 10.
    MemberSub(Address),
    /// Check-in token keyed by its code. Discriminant 11.
    Token(String),
    /// (member, space) → code of the live PENDING token. Discriminant 12.
    PendingToken(Address, u32),
    /// Member → bounded list of recent check-ins. Discriminant 13.
    CheckIns(Address),
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    Unauthorized = 3,
    /// A [`Config`] field is outside its accepted range.
    InvalidConfig = 4,
    InvalidInput = 5,
    Overflow = 6,

    PlanNotFound = 101,
    PlanAlreadyExists = 102,
    /// The plan is no longer sold. Existing subscriptions keep their terms.
    PlanRetired = 103,
    SpaceNotFound = 104,

    SubscriptionNotFound = 201,
    InvalidStatusTransition = 202,
    /// The subscription changed between read and commit. Retried once internally.
    ConcurrentUpdateConflict = 203,
    /// `paid_until` does not lie in the future.
    InvalidPaidUntil = 204,

    /// Member has no ACTIVE subscription once rollover has been applied.
    NoActiveSubscription = 1001,
    /// Every included day of the current cycle has been used.
    QuotaExhausted = 1002,
    /// A STANDARD subscription was presented at a PREMIUM space.
    TierMismatch = 1003,
    /// The space is registered but not currently accepting check-ins.
    SpaceClosed = 1004,

    CodeNotFound = 2001,
    /// The token outlived its TTL before redemption.
    CodeExpired = 2002,
    /// The token was already redeemed.
    CodeAlreadyUsed = 2003,
    /// The token was superseded, withdrawn or denied at redemption.
    CodeVoided = 2004,
    /// The token was issued for a different space.
    SpaceMismatch = 2005,
    /// No unused code could be drawn within the attempt budget.
    CodeSpaceExhausted = 2006,
}

impl Error {
    /// Returns the numeric code for this error (for result reporting).
    pub const fn to_code(self) -> u32 {
        self as u32
    }

    /// True for the denials produced by the entitlement evaluator.
    pub const fn is_entitlement_denial(self) -> bool {
        matches!(
            self,
            Error::NoActiveSubscription
                | Error::QuotaExhausted
                | Error::TierMismatch
                | Error::SpaceClosed
        )
    }
}

/// Runtime configuration. Validated by [`crate::admin::validate_config`].
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Lifetime of a freshly issued check-in token, in seconds.
    pub token_ttl_seconds: u64,
    /// Number of characters in a check-in code.
    pub code_length: u32,
    /// Offset from UTC applied before bucketing timestamps into calendar days.
    pub day_offset_seconds: i64,
    /// How long a settled or expired token is kept after `expires_at` before it may be pruned.
    pub token_retention_seconds: u64,
}

impl Config {
    pub fn default_config() -> Self {
        Config {
            token_ttl_seconds: 300,
            code_length: 8,
            day_offset_seconds: 0,
            token_retention_seconds: 86_400,
        }
    }
}

/// Which class of spaces a plan unlocks, or which class a space belongs to.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AccessTier {
    Standard = 0,
    Premium = 1,
}

impl AccessTier {
    /// PREMIUM covers both tiers; STANDARD covers STANDARD only.
    pub fn covers(self, space_tier: AccessTier) -> bool {
        match self {
            AccessTier::Premium => true,
            AccessTier::Standard => space_tier == AccessTier::Standard,
        }
    }
}

/// Catalog entry. Immutable once defined, apart from being retired.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plan {
    pub plan_id: u32,
    pub name: String,
    /// Price per month in the smallest currency unit.
    pub monthly_price: i128,
    /// Days of access per cycle; [`UNLIMITED_DAYS`] or more means unlimited.
    pub included_days: u32,
    pub tier: AccessTier,
    /// False once retired: no new sales, existing subscribers unaffected.
    pub active: bool,
}

/// Partner venue.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Space {
    pub space_id: u32,
    pub name: String,
    pub location: String,
    pub city: String,
    pub tier: AccessTier,
    /// Venue operator allowed to redeem codes issued for this space.
    pub operator: Address,
    pub open: bool,
}

/// Lifecycle state of a subscription.
///
/// - **Active**: entitles check-ins. Can transition to `Expired`, `Canceled`.
/// - **Expired**: cycle ended without renewal. Terminal.
/// - **Canceled**: ended by the member, the admin, or a plan change. Terminal.
///
/// A new purchase after a terminal state creates a new subscription row.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SubscriptionStatus {
    Active = 0,
    Expired = 1,
    Canceled = 2,
}

/// A member's subscription, carrying a copy of the plan terms it was sold with.
///
/// ⚠️ Upgrade-sensitive: field order and types are serialised as XDR by Soroban.
/// Adding fields requires a migration; removing or retyping fields is always
/// a breaking change.
///
/// `status`, `days_used` and the cycle fields change only through
/// [`crate::ledger`] (payment, rollover, cancellation) and
/// [`crate::redemption`] (usage).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subscription {
    pub subscription_id: u32,
    pub member: Address,
    pub plan_id: u32,
    /// Copied from the plan at purchase.
    pub included_days: u32,
    /// Copied from the plan at purchase.
    pub tier: AccessTier,
    /// Start of the first cycle; later cycles are whole calendar months after it.
    pub anchor: u64,
    /// Number of completed rollovers since `anchor`.
    pub cycle_index: u32,
    pub cycle_start: u64,
    /// Exclusive end of the current cycle.
    pub cycle_end: u64,
    pub days_used: u32,
    /// Calendar day (see [`crate::calendar::day_index`]) of the last redemption that consumed quota.
    pub last_counted_day: Option<u64>,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
    /// Latest coverage reported by the payment processor.
    pub paid_until: u64,
    pub checkins_this_cycle: u32,
    pub total_checkins: u32,
    /// Bumped on every committed write; guards the compare-and-swap in `ledger::commit`.
    pub version: u32,
}

impl Subscription {
    pub fn is_unlimited(&self) -> bool {
        self.included_days >= UNLIMITED_DAYS
    }

    /// Days left in the current cycle. `u32::MAX` for unlimited plans.
    pub fn remaining_days(&self) -> u32 {
        if self.is_unlimited() {
            u32::MAX
        } else {
            self.included_days.saturating_sub(self.days_used)
        }
    }
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TokenStatus {
    Pending = 0,
    Redeemed = 1,
    Expired = 2,
    Void = 3,
}

/// Short-lived, single-use proof of entitlement presented at a venue.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckInToken {
    pub code: String,
    pub member: Address,
    pub space_id: u32,
    pub issued_at: u64,
    pub expires_at: u64,
    pub status: TokenStatus,
}

/// Outcome of `evaluate`. Denials are data so the UI can render a specific message.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntitlementDecision {
    pub allowed: bool,
    /// 0 when allowed, otherwise the [`Error::to_code`] of the denial.
    pub reason_code: u32,
    pub days_used: u32,
    pub included_days: u32,
    pub unlimited: bool,
    /// Tier of the member's subscription, if any.
    pub tier: Option<AccessTier>,
}

/// Outcome of a venue-side redemption.
///
/// Failures are reported here rather than as invocation errors so the token
/// transitions they cause (to `Expired` or `Void`) are kept.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RedemptionResult {
    pub success: bool,
    /// 0 on success, otherwise the [`Error::to_code`] of the failure.
    pub error_code: u32,
    pub member: Option<Address>,
    /// Days left in the cycle after this redemption. `u32::MAX` when unlimited.
    pub remaining_days: u32,
    pub unlimited: bool,
    /// True when this redemption consumed a quota day (first check-in of the day).
    pub consumed_today: bool,
    pub days_used: u32,
}

impl RedemptionResult {
    pub fn failed(error: Error, member: Option<Address>) -> Self {
        RedemptionResult {
            success: false,
            error_code: error.to_code(),
            member,
            remaining_days: 0,
            unlimited: false,
            consumed_today: false,
            days_used: 0,
        }
    }
}

/// Usage snapshot returned by `get_usage`, with rollover applied.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UsageSummary {
    pub subscription_id: u32,
    pub plan_id: u32,
    pub status: SubscriptionStatus,
    pub tier: AccessTier,
    pub days_used: u32,
    pub included_days: u32,
    pub unlimited: bool,
    pub remaining_days: u32,
    pub cycle_start: u64,
    pub cycle_end: u64,
    pub auto_renew: bool,
    pub checkins_this_cycle: u32,
    pub total_checkins: u32,
}

/// One entry of a member's check-in history.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckInRecord {
    pub space_id: u32,
    pub timestamp: u64,
    pub day: u64,
    /// True when this check-in consumed a quota day.
    pub consumed_day: bool,
}

/// Result of rolling one member over in a batch. Used by `batch_rollover`.
#[contracttype]
#[derive(Clone, Debug)]
pub struct BatchRolloverResult {
    pub success: bool,
    /// If success is false, the error code; otherwise 0.
    pub error_code: u32,
    /// Status after rollover, when the member has a subscription.
    pub status: Option<SubscriptionStatus>,
}

// Event payloads

#[contracttype]
#[derive(Clone, Debug)]
pub struct SubscriptionCreatedEvent {
    pub subscription_id: u32,
    pub member: Address,
    pub plan_id: u32,
    pub cycle_end: u64,
    pub paid_until: u64,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct SubscriptionRolledEvent {
    pub subscription_id: u32,
    pub member: Address,
    pub status: SubscriptionStatus,
    pub cycle_start: u64,
    pub cycle_end: u64,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct SubscriptionCanceledEvent {
    pub subscription_id: u32,
    pub member: Address,
    pub authorizer: Address,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct TokenIssuedEvent {
    pub member: Address,
    pub space_id: u32,
    pub expires_at: u64,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct TokenRedeemedEvent {
    pub member: Address,
    pub space_id: u32,
    pub consumed_day: bool,
    pub days_used: u32,
}
