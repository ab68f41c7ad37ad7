//! Persistent-entry helpers: every write bumps the entry's TTL so records
//! outlive the ledgers between a member's visits.

use core::fmt::Debug;

use soroban_sdk::{Env, IntoVal, TryFromVal, Val};

/// Persistent TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;
/// Extend once the remaining TTL drops below this (~7 days).
pub const PERSISTENT_THRESHOLD_LEDGERS: u32 = 120_960;

pub const INSTANCE_BUMP_LEDGERS: u32 = 518_400;
pub const INSTANCE_THRESHOLD_LEDGERS: u32 = 120_960;

pub fn read<K, V>(env: &Env, key: &K) -> Option<V>
where
    K: IntoVal<Env, Val>,
    V: TryFromVal<Env, Val>,
    V::Error: Debug,
{
    env.storage().persistent().get(key)
}

pub fn write<K, V>(env: &Env, key: &K, value: &V)
where
    K: IntoVal<Env, Val>,
    V: IntoVal<Env, Val>,
{
    let storage = env.storage().persistent();
    storage.set(key, value);
    storage.extend_ttl(key, PERSISTENT_THRESHOLD_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

pub fn remove<K>(env: &Env, key: &K)
where
    K: IntoVal<Env, Val>,
{
    env.storage().persistent().remove(key);
}

pub fn has<K>(env: &Env, key: &K) -> bool
where
    K: IntoVal<Env, Val>,
{
    env.storage().persistent().has(key)
}

pub fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_THRESHOLD_LEDGERS, INSTANCE_BUMP_LEDGERS);
}
