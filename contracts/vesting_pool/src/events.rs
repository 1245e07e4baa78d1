//! One event per successful mutating call, carrying enough fields to
//! reconstruct the state transition without re-querying the contract.

use soroban_sdk::{symbol_short, Address, Env};

use crate::{Config, Grant};

pub(crate) fn initialized(env: &Env, config: &Config, funding: i128) {
    env.events().publish(
        (symbol_short!("init"), config.admin.clone()),
        (config.token.clone(), config.fee_bps, funding),
    );
}

pub(crate) fn grant_created(env: &Env, recipient: &Address, grant: &Grant) {
    env.events().publish(
        (symbol_short!("created"), recipient.clone()),
        (grant.total, grant.start, grant.duration, grant.cliff),
    );
}

pub(crate) fn grant_updated(
    env: &Env,
    recipient: &Address,
    old_total: i128,
    old_claimed: i128,
    grant: &Grant,
) {
    env.events().publish(
        (symbol_short!("updated"), recipient.clone()),
        (
            old_total,
            old_claimed,
            grant.total,
            grant.start,
            grant.duration,
            grant.cliff,
        ),
    );
}

pub(crate) fn claimed(env: &Env, recipient: &Address, net: i128, fee: i128) {
    env.events()
        .publish((symbol_short!("claimed"), recipient.clone()), (net, fee));
}

pub(crate) fn grant_revoked(env: &Env, recipient: &Address, vested: i128, refunded: i128) {
    env.events().publish(
        (symbol_short!("revoked"), recipient.clone()),
        (vested, refunded),
    );
}

pub(crate) fn pause_toggled(env: &Env, paused: bool) {
    env.events().publish((symbol_short!("paused"),), paused);
}

pub(crate) fn interval_updated(env: &Env, old_interval: u64, new_interval: u64) {
    env.events()
        .publish((symbol_short!("interval"),), (old_interval, new_interval));
}

pub(crate) fn withdrawn(env: &Env, to: &Address, amount: i128) {
    env.events()
        .publish((symbol_short!("withdrawn"), to.clone()), amount);
}

pub(crate) fn rescued(env: &Env, token: &Address, to: &Address, amount: i128) {
    env.events()
        .publish((symbol_short!("rescued"), token.clone()), (to.clone(), amount));
}
