//! Check-in token issuer: mints short-lived single-use codes for members who
//! are entitled to a space, superseding any live code for the same pair.
//!
//! Issuance never touches quota; an abandoned code costs the member nothing.
//!
//! **PRs that only change code format or issuance should edit this file only.**

use crate::admin::{get_config, MAX_CODE_LENGTH};
use crate::catalog::get_space;
use crate::entitlement;
use crate::ledger::rollover_member;
use crate::state_machine::{settled_token_error, validate_token_transition};
use crate::storage;
use crate::types::{CheckInToken, DataKey, Error, TokenIssuedEvent, TokenStatus};
use soroban_sdk::{log, Address, Env, String, Symbol};

/// Unambiguous symbols: no 0/O, 1/I/L.
pub const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Draws before giving up with [`Error::CodeSpaceExhausted`].
pub const MAX_CODE_ATTEMPTS: u32 = 8;

/// `token` as currently observable: a PENDING token past `expires_at` reads as EXPIRED.
pub fn effective(token: CheckInToken, now: u64) -> CheckInToken {
    let mut token = token;
    if token.status == TokenStatus::Pending && now > token.expires_at {
        token.status = TokenStatus::Expired;
    }
    token
}

pub fn load_token(env: &Env, code: &String) -> Option<CheckInToken> {
    storage::read(env, &DataKey::Token(code.clone()))
}

pub fn get_token(env: &Env, code: String) -> Result<CheckInToken, Error> {
    let token = load_token(env, &code).ok_or(Error::CodeNotFound)?;
    Ok(effective(token, env.ledger().timestamp()))
}

/// The live code for `(member, space_id)`, if one has not expired yet.
pub fn get_pending_token(env: &Env, member: Address, space_id: u32) -> Option<CheckInToken> {
    let code: String = storage::read(env, &DataKey::PendingToken(member, space_id))?;
    let token = effective(load_token(env, &code)?, env.ledger().timestamp());
    if token.status == TokenStatus::Pending {
        Some(token)
    } else {
        None
    }
}

/// Moves a PENDING token to `to`, clearing the pair index if it still points at it.
pub fn settle_token(env: &Env, token: &mut CheckInToken, to: TokenStatus) -> Result<(), Error> {
    validate_token_transition(&token.status, &to)?;
    token.status = to;
    storage::write(env, &DataKey::Token(token.code.clone()), &*token);

    let pair = DataKey::PendingToken(token.member.clone(), token.space_id);
    let indexed: Option<String> = storage::read(env, &pair);
    if indexed.as_ref() == Some(&token.code) {
        storage::remove(env, &pair);
    }
    Ok(())
}

/// Voids the PENDING token indexed for `(member, space_id)`, if any.
fn supersede(env: &Env, member: &Address, space_id: u32, now: u64) -> Result<(), Error> {
    let code: String = match storage::read(env, &DataKey::PendingToken(member.clone(), space_id)) {
        Some(c) => c,
        None => return Ok(()),
    };
    let mut old = match load_token(env, &code) {
        Some(t) => t,
        None => return Ok(()),
    };
    if old.status != TokenStatus::Pending {
        return Ok(());
    }
    let target = if now > old.expires_at {
        TokenStatus::Expired
    } else {
        TokenStatus::Void
    };
    settle_token(env, &mut old, target)?;
    log!(env, "superseded check-in code", space_id);
    let topic = if target == TokenStatus::Void {
        "token_voided"
    } else {
        "token_expired"
    };
    env.events()
        .publish((Symbol::new(env, topic), member.clone()), (space_id, code));
    Ok(())
}

/// Draws a code of `length` symbols from the host PRNG.
fn draw_code(env: &Env, length: u32) -> Result<String, Error> {
    let mut buf = [0u8; MAX_CODE_LENGTH as usize];
    let len = (length as usize).min(buf.len());
    let top = CODE_ALPHABET.len() as u64 - 1;
    for slot in buf.iter_mut().take(len) {
        let pick: u64 = env.prng().gen_range(0..=top);
        *slot = CODE_ALPHABET[pick as usize];
    }
    let text = core::str::from_utf8(&buf[..len]).map_err(|_| Error::InvalidInput)?;
    Ok(String::from_str(env, text))
}

/// Draws codes until one is not held by any stored token.
///
/// Settled tokens keep their code until pruned so a stale code can never
/// resolve to someone else's live token.
fn fresh_code(env: &Env, length: u32) -> Result<String, Error> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = draw_code(env, length)?;
        if !storage::has(env, &DataKey::Token(code.clone())) {
            return Ok(code);
        }
    }
    log!(env, "no free check-in code", length);
    Err(Error::CodeSpaceExhausted)
}

/// Issues a check-in code for `member` at `space_id`.
///
/// Applies rollover, re-runs the evaluator (denials propagate as-is), voids
/// any PENDING code for the same pair, then stores and returns the new token.
pub fn do_issue(env: &Env, member: Address, space_id: u32) -> Result<CheckInToken, Error> {
    member.require_auth();
    let config = get_config(env)?;
    let space = get_space(env, space_id)?;
    let now = env.ledger().timestamp();

    let sub = rollover_member(env, &member, now)?;
    entitlement::check(sub.as_ref(), &space)?;

    supersede(env, &member, space_id, now)?;

    let code = fresh_code(env, config.code_length)?;
    let expires_at = now
        .checked_add(config.token_ttl_seconds)
        .ok_or(Error::Overflow)?;
    let token = CheckInToken {
        code: code.clone(),
        member: member.clone(),
        space_id,
        issued_at: now,
        expires_at,
        status: TokenStatus::Pending,
    };
    storage::write(env, &DataKey::Token(code.clone()), &token);
    storage::write(env, &DataKey::PendingToken(member.clone(), space_id), &code);

    env.events().publish(
        (Symbol::new(env, "token_issued"), member.clone()),
        TokenIssuedEvent {
            member,
            space_id,
            expires_at,
        },
    );
    Ok(token)
}

/// Member withdraws one of their own live codes.
pub fn do_void_token(env: &Env, member: Address, code: String) -> Result<(), Error> {
    member.require_auth();
    let mut token = load_token(env, &code).ok_or(Error::CodeNotFound)?;
    if token.member != member {
        return Err(Error::Unauthorized);
    }
    let now = env.ledger().timestamp();
    if token.status == TokenStatus::Pending && now > token.expires_at {
        return Err(Error::CodeExpired);
    }
    if token.status != TokenStatus::Pending {
        return Err(settled_token_error(&token.status).unwrap_or(Error::InvalidStatusTransition));
    }
    settle_token(env, &mut token, TokenStatus::Void)?;
    env.events().publish(
        (Symbol::new(env, "token_voided"), member),
        (token.space_id, code),
    );
    Ok(())
}
