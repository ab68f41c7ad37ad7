//! Admin and config: init, config, admin rotation, payment processor.
//!
//! **PRs that only change admin or configuration behavior should edit this file only.**

use crate::storage::bump_instance;
use crate::types::{Config, DataKey, Error, STORAGE_VERSION};
use soroban_sdk::{Address, Env, Symbol};

const MIN_TOKEN_TTL: u64 = 30;
const MAX_TOKEN_TTL: u64 = 3_600;
pub const MIN_CODE_LENGTH: u32 = 6;
pub const MAX_CODE_LENGTH: u32 = 12;
const MAX_DAY_OFFSET: i64 = 14 * 3_600;

pub fn do_init(
    env: &Env,
    admin: Address,
    payment_processor: Address,
    config: Config,
) -> Result<(), Error> {
    if env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::AlreadyInitialized);
    }
    admin.require_auth();
    validate_config(&config)?;

    let storage = env.storage().instance();
    storage.set(&DataKey::Admin, &admin);
    storage.set(&DataKey::PaymentProcessor, &payment_processor);
    storage.set(&DataKey::Config, &config);
    storage.set(&DataKey::SchemaVersion, &STORAGE_VERSION);
    bump_instance(env);

    env.events().publish(
        (Symbol::new(env, "initialized"),),
        (admin, payment_processor, config),
    );
    Ok(())
}

pub fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    bump_instance(env);
    Ok(())
}

pub fn get_admin(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)
}

/// Verify that `caller` is the stored admin and has signed the invocation.
pub fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin = get_admin(env)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

pub fn do_rotate_admin(env: &Env, current_admin: Address, new_admin: Address) -> Result<(), Error> {
    require_admin(env, &current_admin)?;
    env.storage().instance().set(&DataKey::Admin, &new_admin);
    env.events().publish(
        (Symbol::new(env, "admin_rotation"), current_admin.clone()),
        (current_admin, new_admin, env.ledger().timestamp()),
    );
    Ok(())
}

pub fn get_payment_processor(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::PaymentProcessor)
        .ok_or(Error::NotInitialized)
}

pub fn do_set_payment_processor(env: &Env, admin: Address, processor: Address) -> Result<(), Error> {
    require_admin(env, &admin)?;
    env.storage()
        .instance()
        .set(&DataKey::PaymentProcessor, &processor);
    env.events()
        .publish((Symbol::new(env, "processor_updated"),), processor);
    Ok(())
}

/// Payment confirmations are accepted from the processor, or from the admin
/// when replaying a confirmation by hand.
pub fn require_payment_source(env: &Env, caller: &Address) -> Result<(), Error> {
    let processor = get_payment_processor(env)?;
    let admin = get_admin(env)?;
    caller.require_auth();
    if caller != &processor && caller != &admin {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

pub fn get_config(env: &Env) -> Result<Config, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

pub fn do_set_config(env: &Env, admin: Address, config: Config) -> Result<(), Error> {
    require_admin(env, &admin)?;
    validate_config(&config)?;
    env.storage().instance().set(&DataKey::Config, &config);
    env.events()
        .publish((Symbol::new(env, "config_updated"),), config);
    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), Error> {
    if config.token_ttl_seconds < MIN_TOKEN_TTL || config.token_ttl_seconds > MAX_TOKEN_TTL {
        return Err(Error::InvalidConfig);
    }
    if config.code_length < MIN_CODE_LENGTH || config.code_length > MAX_CODE_LENGTH {
        return Err(Error::InvalidConfig);
    }
    if config.day_offset_seconds.abs() > MAX_DAY_OFFSET {
        return Err(Error::InvalidConfig);
    }
    Ok(())
}
