//! Status transition rules for subscriptions and check-in tokens.

use crate::types::{Error, SubscriptionStatus, TokenStatus};

/// Validates a subscription status transition.
///
/// | From     | To       | Allowed |
/// |----------|----------|---------|
/// | Active   | Expired  | Yes     |
/// | Active   | Canceled | Yes     |
/// | Expired  | *any*    | No      |
/// | Canceled | *any*    | No      |
/// | *any*    | Same     | Yes (idempotent) |
pub fn validate_status_transition(
    from: &SubscriptionStatus,
    to: &SubscriptionStatus,
) -> Result<(), Error> {
    if from == to {
        return Ok(());
    }
    let valid = match from {
        SubscriptionStatus::Active => matches!(
            to,
            SubscriptionStatus::Expired | SubscriptionStatus::Canceled
        ),
        SubscriptionStatus::Expired | SubscriptionStatus::Canceled => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidStatusTransition)
    }
}

/// Validates a token transition. A token leaves `Pending` exactly once and
/// never changes again.
pub fn validate_token_transition(from: &TokenStatus, to: &TokenStatus) -> Result<(), Error> {
    match (from, to) {
        (TokenStatus::Pending, TokenStatus::Redeemed)
        | (TokenStatus::Pending, TokenStatus::Expired)
        | (TokenStatus::Pending, TokenStatus::Void) => Ok(()),
        _ => Err(Error::InvalidStatusTransition),
    }
}

/// Maps a settled token status to the error a second redemption reports.
pub fn settled_token_error(status: &TokenStatus) -> Option<Error> {
    match status {
        TokenStatus::Pending => None,
        TokenStatus::Redeemed => Some(Error::CodeAlreadyUsed),
        TokenStatus::Expired => Some(Error::CodeExpired),
        TokenStatus::Void => Some(Error::CodeVoided),
    }
}
