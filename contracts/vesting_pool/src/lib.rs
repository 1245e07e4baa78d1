#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, token, Address, Env, Vec,
};

mod events;
mod vesting;

/// Fee rates are expressed in basis points; 500 bps (5%) is the hard ceiling.
pub const MAX_FEE_BPS: u32 = 500;
pub const BPS_DENOMINATOR: i128 = 10_000;

/// Default vesting granularity: 30 days in seconds.
pub const DEFAULT_STREAM_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60; // 2_592_000

/// Clock-skew tolerance for a grant's start time. A start earlier than
/// `now - tolerance` is rejected as stale.
pub const START_TOLERANCE_SECS: u64 = 15;

#[contract]
pub struct VestingPool;

/// One time-released allocation. At most one active grant per recipient;
/// `active == false` means the slot is free for a new grant.
#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct Grant {
    pub total: i128,
    pub claimed: i128,
    pub start: u64,
    pub duration: u64,
    pub cliff: u64,
    pub active: bool,
}

/// Pool configuration, written once by `initialize`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct Config {
    pub admin: Address,
    pub token: Address,
    pub fee_recipient: Address,
    pub fee_bps: u32,
    pub min_duration: u64,
    pub max_duration: u64,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Config,
    /// Pool value not committed to any active grant.
    Unallocated,
    StreamInterval,
    Paused,
    /// Every recipient ever granted (for summing outstanding commitments).
    Recipients,
    Grant(Address),
}

#[contracterror]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum Error {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    InvalidAmount = 3,
    InvalidDuration = 4,
    InvalidCliff = 5,
    InvalidStart = 6,
    InvalidInterval = 7,
    InvalidFee = 8,
    GrantAlreadyExists = 9,
    NoGrantExists = 10,
    InsufficientBalance = 11,
    ContractPaused = 12,
    NothingToClaim = 13,
    MathOverflow = 14,
    TransferFailed = 15,
    /// Rescue would leave less than unallocated + outstanding funds in custody.
    RescueWouldViolateAllocated = 16,
}

fn read_config(env: &Env) -> Result<Config, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

fn require_admin_auth(env: &Env) -> Result<Config, Error> {
    let config = read_config(env)?;
    config.admin.require_auth();
    Ok(config)
}

/// Active grant for `recipient`. An inactive slot counts as no grant.
fn read_active_grant(env: &Env, recipient: &Address) -> Result<Grant, Error> {
    let grant: Grant = env
        .storage()
        .persistent()
        .get(&DataKey::Grant(recipient.clone()))
        .ok_or(Error::NoGrantExists)?;
    if !grant.active {
        return Err(Error::NoGrantExists);
    }
    Ok(grant)
}

fn write_grant(env: &Env, recipient: &Address, grant: &Grant) {
    env.storage()
        .persistent()
        .set(&DataKey::Grant(recipient.clone()), grant);
}

fn read_unallocated(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::Unallocated)
        .unwrap_or(0)
}

fn write_unallocated(env: &Env, amount: i128) {
    env.storage().instance().set(&DataKey::Unallocated, &amount);
}

fn read_stream_interval(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::StreamInterval)
        .unwrap_or(DEFAULT_STREAM_INTERVAL_SECS)
}

fn read_paused(env: &Env) -> bool {
    env.storage()
        .instance()
        .get(&DataKey::Paused)
        .unwrap_or(false)
}

fn read_recipients(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&DataKey::Recipients)
        .unwrap_or_else(|| Vec::new(env))
}

fn index_recipient(env: &Env, recipient: &Address) {
    let mut recipients = read_recipients(env);
    if !recipients.contains(recipient) {
        recipients.push_back(recipient.clone());
        env.storage()
            .instance()
            .set(&DataKey::Recipients, &recipients);
    }
}

/// Sum of (total - claimed) over all active grants: value the pool has
/// committed but not yet paid out.
fn outstanding_commitments(env: &Env) -> Result<i128, Error> {
    let mut total = 0_i128;
    for recipient in read_recipients(env).iter() {
        if let Some(grant) = env
            .storage()
            .persistent()
            .get::<_, Grant>(&DataKey::Grant(recipient))
        {
            if grant.active {
                let remaining = grant
                    .total
                    .checked_sub(grant.claimed)
                    .ok_or(Error::MathOverflow)?;
                total = total.checked_add(remaining).ok_or(Error::MathOverflow)?;
            }
        }
    }
    Ok(total)
}

/// Schedule validation shared by create and update.
fn validate_schedule(
    config: &Config,
    now: u64,
    total: i128,
    start: u64,
    duration: u64,
    cliff: u64,
) -> Result<(), Error> {
    if total <= 0 {
        return Err(Error::InvalidAmount);
    }
    if duration == 0 || duration < config.min_duration || duration > config.max_duration {
        return Err(Error::InvalidDuration);
    }
    if cliff > duration {
        return Err(Error::InvalidCliff);
    }
    if start.saturating_add(START_TOLERANCE_SECS) < now {
        return Err(Error::InvalidStart);
    }
    Ok(())
}

fn transfer_out(env: &Env, token_addr: &Address, to: &Address, amount: i128) -> Result<(), Error> {
    let client = token::Client::new(env, token_addr);
    match client.try_transfer(&env.current_contract_address(), to, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => Err(Error::TransferFailed),
    }
}

#[contractimpl]
impl VestingPool {
    /// One-time setup: records the configuration and pulls `funding` into
    /// custody via `transfer_from` (the admin must have approved this
    /// contract as spender beforehand).
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        fee_recipient: Address,
        fee_bps: u32,
        min_duration: u64,
        max_duration: u64,
        funding: i128,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        if fee_bps > MAX_FEE_BPS {
            return Err(Error::InvalidFee);
        }
        if min_duration == 0 || min_duration > max_duration {
            return Err(Error::InvalidDuration);
        }
        if funding <= 0 {
            return Err(Error::InvalidAmount);
        }

        let contract = env.current_contract_address();
        let client = token::Client::new(&env, &token);
        match client.try_transfer_from(&contract, &admin, &contract, &funding) {
            Ok(Ok(())) => {}
            _ => return Err(Error::TransferFailed),
        }

        let config = Config {
            admin,
            token,
            fee_recipient,
            fee_bps,
            min_duration,
            max_duration,
        };
        env.storage().instance().set(&DataKey::Config, &config);
        write_unallocated(&env, funding);
        env.storage()
            .instance()
            .set(&DataKey::StreamInterval, &DEFAULT_STREAM_INTERVAL_SECS);
        env.storage().instance().set(&DataKey::Paused, &false);

        events::initialized(&env, &config, funding);
        Ok(())
    }

    /// Allocate a new grant out of the unallocated pool balance.
    pub fn create_grant(
        env: Env,
        recipient: Address,
        total: i128,
        start: u64,
        duration: u64,
        cliff: u64,
    ) -> Result<(), Error> {
        let config = require_admin_auth(&env)?;
        let now = env.ledger().timestamp();
        validate_schedule(&config, now, total, start, duration, cliff)?;

        if read_active_grant(&env, &recipient).is_ok() {
            return Err(Error::GrantAlreadyExists);
        }

        let unallocated = read_unallocated(&env);
        if total > unallocated {
            return Err(Error::InsufficientBalance);
        }
        write_unallocated(&env, unallocated - total);

        let grant = Grant {
            total,
            claimed: 0,
            start,
            duration,
            cliff,
            active: true,
        };
        write_grant(&env, &recipient, &grant);
        index_recipient(&env, &recipient);

        events::grant_created(&env, &recipient, &grant);
        Ok(())
    }

    /// Replace an active grant's schedule. The old grant's unclaimed value is
    /// refunded to the pool before the new total is allocated, and `claimed`
    /// resets to 0 on the new schedule. Prior claim history is discarded; the
    /// event carries the old total and claimed so listeners can reconstruct it.
    pub fn update_grant(
        env: Env,
        recipient: Address,
        total: i128,
        start: u64,
        duration: u64,
        cliff: u64,
    ) -> Result<(), Error> {
        let config = require_admin_auth(&env)?;
        let now = env.ledger().timestamp();
        validate_schedule(&config, now, total, start, duration, cliff)?;

        let old = read_active_grant(&env, &recipient)?;

        let refund = old
            .total
            .checked_sub(old.claimed)
            .ok_or(Error::MathOverflow)?;
        let unallocated = read_unallocated(&env)
            .checked_add(refund)
            .ok_or(Error::MathOverflow)?;
        if total > unallocated {
            return Err(Error::InsufficientBalance);
        }
        write_unallocated(&env, unallocated - total);

        let grant = Grant {
            total,
            claimed: 0,
            start,
            duration,
            cliff,
            active: true,
        };
        write_grant(&env, &recipient, &grant);

        events::grant_updated(&env, &recipient, old.total, old.claimed, &grant);
        Ok(())
    }

    /// Stop further vesting for a recipient. The already-vested amount stays
    /// claimable; everything beyond it returns to the pool. The schedule is
    /// frozen so the vested amount never grows afterwards, and the slot is
    /// freed immediately when nothing is left to pay.
    pub fn revoke_grant(env: Env, recipient: Address) -> Result<(), Error> {
        require_admin_auth(&env)?;
        let mut grant = read_active_grant(&env, &recipient)?;

        let now = env.ledger().timestamp();
        let interval = read_stream_interval(&env);
        let vested = vesting::vested_amount(&grant, now, interval)?;

        // A retroactive interval change can pull the vested amount below
        // what was already paid out; never refund value that has left
        // custody.
        let frozen_total = vested.max(grant.claimed);
        let refund = grant
            .total
            .checked_sub(frozen_total)
            .ok_or(Error::MathOverflow)?;
        let unallocated = read_unallocated(&env)
            .checked_add(refund)
            .ok_or(Error::MathOverflow)?;
        write_unallocated(&env, unallocated);

        grant.total = frozen_total;
        grant.duration = now.saturating_sub(grant.start);
        grant.cliff = 0;
        if grant.claimed >= frozen_total {
            grant.active = false;
        }
        write_grant(&env, &recipient, &grant);

        events::grant_revoked(&env, &recipient, frozen_total, refund);
        Ok(())
    }

    /// Change the vesting granularity. Applies immediately to every grant's
    /// future vesting computations, including time already elapsed.
    pub fn set_stream_interval(env: Env, new_interval: u64) -> Result<(), Error> {
        require_admin_auth(&env)?;
        if new_interval == 0 {
            return Err(Error::InvalidInterval);
        }
        let old_interval = read_stream_interval(&env);
        env.storage()
            .instance()
            .set(&DataKey::StreamInterval, &new_interval);
        events::interval_updated(&env, old_interval, new_interval);
        Ok(())
    }

    /// Gate claims on or off.
    pub fn set_pause(env: Env, paused: bool) -> Result<(), Error> {
        require_admin_auth(&env)?;
        env.storage().instance().set(&DataKey::Paused, &paused);
        events::pause_toggled(&env, paused);
        Ok(())
    }

    /// Remove unallocated value from the pool, paid out to the admin.
    pub fn withdraw(env: Env, amount: i128) -> Result<(), Error> {
        let config = require_admin_auth(&env)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let unallocated = read_unallocated(&env);
        if amount > unallocated {
            return Err(Error::InsufficientBalance);
        }
        write_unallocated(&env, unallocated - amount);
        transfer_out(&env, &config.token, &config.admin, amount)?;
        events::withdrawn(&env, &config.admin, amount);
        Ok(())
    }

    /// Rescue stray tokens sent directly to the contract. For the grant token
    /// the amount left behind must still cover unallocated + outstanding.
    pub fn rescue_tokens(
        env: Env,
        token_addr: Address,
        amount: i128,
        to: Address,
    ) -> Result<(), Error> {
        let config = require_admin_auth(&env)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let contract = env.current_contract_address();
        let client = token::Client::new(&env, &token_addr);
        let balance = client.balance(&contract);

        let floor = if token_addr == config.token {
            read_unallocated(&env)
                .checked_add(outstanding_commitments(&env)?)
                .ok_or(Error::MathOverflow)?
        } else {
            0
        };
        let after_rescue = balance.checked_sub(amount).ok_or(Error::MathOverflow)?;
        if after_rescue < floor {
            return Err(Error::RescueWouldViolateAllocated);
        }

        transfer_out(&env, &token_addr, &to, amount)?;
        events::rescued(&env, &token_addr, &to, amount);
        Ok(())
    }

    /// Pay out the caller's unlocked share, net of the protocol fee.
    pub fn claim(env: Env, recipient: Address) -> Result<(), Error> {
        recipient.require_auth();
        let config = read_config(&env)?;
        if read_paused(&env) {
            return Err(Error::ContractPaused);
        }
        let mut grant = read_active_grant(&env, &recipient)?;

        let now = env.ledger().timestamp();
        let interval = read_stream_interval(&env);
        let vested = vesting::vested_amount(&grant, now, interval)?;
        let (net, fee) = vesting::claimable_split(vested, grant.claimed, config.fee_bps)?;
        if net == 0 && fee == 0 {
            return Err(Error::NothingToClaim);
        }

        // State is committed before the token calls; a transfer failure
        // rejects the whole invocation and reverts this write.
        grant.claimed = grant
            .claimed
            .checked_add(net + fee)
            .ok_or(Error::MathOverflow)?;
        if grant.claimed >= grant.total {
            grant.active = false;
        }
        write_grant(&env, &recipient, &grant);

        if fee > 0 {
            transfer_out(&env, &config.token, &config.fee_recipient, fee)?;
        }
        if net > 0 {
            transfer_out(&env, &config.token, &recipient, net)?;
        }

        events::claimed(&env, &recipient, net, fee);
        Ok(())
    }

    // Read-only surface.

    pub fn get_grant(env: Env, recipient: Address) -> Result<Grant, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Grant(recipient))
            .ok_or(Error::NoGrantExists)
    }

    pub fn vested_amount(env: Env, recipient: Address) -> Result<i128, Error> {
        let grant = Self::get_grant(env.clone(), recipient)?;
        let interval = read_stream_interval(&env);
        vesting::vested_amount(&grant, env.ledger().timestamp(), interval)
    }

    /// Claimable (net, fee) for the recipient at the current time.
    pub fn claimable_amount(env: Env, recipient: Address) -> Result<(i128, i128), Error> {
        let config = read_config(&env)?;
        let grant = Self::get_grant(env.clone(), recipient)?;
        let interval = read_stream_interval(&env);
        let vested = vesting::vested_amount(&grant, env.ledger().timestamp(), interval)?;
        vesting::claimable_split(vested, grant.claimed, config.fee_bps)
    }

    pub fn unallocated_balance(env: Env) -> Result<i128, Error> {
        read_config(&env)?;
        Ok(read_unallocated(&env))
    }

    /// Sum of (total - claimed) over all active grants.
    pub fn total_outstanding(env: Env) -> Result<i128, Error> {
        read_config(&env)?;
        outstanding_commitments(&env)
    }

    pub fn stream_interval(env: Env) -> u64 {
        read_stream_interval(&env)
    }

    pub fn is_paused(env: Env) -> bool {
        read_paused(&env)
    }

    pub fn get_config(env: Env) -> Result<Config, Error> {
        read_config(&env)
    }
}

mod test;
mod test_claim;
mod test_vesting;
