#![cfg(test)]

use super::{Error, VestingPool, VestingPoolClient, DEFAULT_STREAM_INTERVAL_SECS};
use soroban_sdk::{
    testutils::{Address as _, AuthorizedFunction, IssuerFlags, Ledger},
    token, Address, Env, InvokeError,
};

pub(crate) const DAY: u64 = 24 * 60 * 60;
pub(crate) const START_TS: u64 = 1_000;

pub(crate) fn set_timestamp(env: &Env, timestamp: u64) {
    env.ledger().with_mut(|li| {
        li.timestamp = timestamp;
    });
}

pub(crate) fn assert_contract_error<T, C>(
    result: Result<Result<T, C>, Result<Error, InvokeError>>,
    expected: Error,
) {
    assert!(matches!(result, Err(Ok(err)) if err == expected));
}

pub(crate) struct Setup {
    pub env: Env,
    pub admin: Address,
    pub fee_recipient: Address,
    pub contract_id: Address,
    pub client: VestingPoolClient<'static>,
    pub token: token::Client<'static>,
    pub token_admin: token::StellarAssetClient<'static>,
}

/// Pool funded with `funding` units of a freshly issued asset, duration
/// bounds [1 day, 4 years], claims unpaused.
pub(crate) fn setup_pool(fee_bps: u32, funding: i128) -> Setup {
    let env = Env::default();
    set_timestamp(&env, START_TS);

    let admin = Address::generate(&env);
    let fee_recipient = Address::generate(&env);

    let sac = env.register_stellar_asset_contract_v2(admin.clone());
    sac.issuer().set_flag(IssuerFlags::RevocableFlag);
    let token_addr = sac.address();
    let token = token::Client::new(&env, &token_addr);
    let token_admin = token::StellarAssetClient::new(&env, &token_addr);
    token_admin.mock_all_auths().mint(&admin, &1_000_000);

    let contract_id = env.register_contract(None, VestingPool);
    let client = VestingPoolClient::new(&env, &contract_id);

    token
        .mock_all_auths()
        .approve(&admin, &contract_id, &funding, &1_000);
    client.mock_all_auths().initialize(
        &admin,
        &token_addr,
        &fee_recipient,
        &fee_bps,
        &DAY,
        &(4 * 365 * DAY),
        &funding,
    );

    Setup {
        env,
        admin,
        fee_recipient,
        contract_id,
        client,
        token,
        token_admin,
    }
}

#[test]
fn test_initialize_funds_the_pool() {
    let s = setup_pool(250, 10_000);

    assert_eq!(s.token.balance(&s.contract_id), 10_000);
    assert_eq!(s.client.unallocated_balance(), 10_000);
    assert_eq!(s.client.total_outstanding(), 0);
    assert_eq!(s.client.stream_interval(), DEFAULT_STREAM_INTERVAL_SECS);
    assert!(!s.client.is_paused());

    let config = s.client.get_config();
    assert_eq!(config.admin, s.admin);
    assert_eq!(config.fee_bps, 250);
    assert_eq!(config.min_duration, DAY);
}

#[test]
fn test_initialize_twice_fails() {
    let s = setup_pool(0, 10_000);
    assert_contract_error(
        s.client.mock_all_auths().try_initialize(
            &s.admin,
            &s.token.address,
            &s.fee_recipient,
            &0,
            &DAY,
            &(4 * 365 * DAY),
            &1_000,
        ),
        Error::AlreadyInitialized,
    );
}

#[test]
fn test_initialize_validates_config() {
    let env = Env::default();
    let admin = Address::generate(&env);
    let fee_recipient = Address::generate(&env);
    let sac = env.register_stellar_asset_contract_v2(admin.clone());
    let token_addr = sac.address();

    let contract_id = env.register_contract(None, VestingPool);
    let client = VestingPoolClient::new(&env, &contract_id);

    // Fee above the 5% ceiling.
    assert_contract_error(
        client.mock_all_auths().try_initialize(
            &admin,
            &token_addr,
            &fee_recipient,
            &501,
            &DAY,
            &(4 * 365 * DAY),
            &1_000,
        ),
        Error::InvalidFee,
    );
    // Inverted duration bounds.
    assert_contract_error(
        client.mock_all_auths().try_initialize(
            &admin,
            &token_addr,
            &fee_recipient,
            &0,
            &(2 * DAY),
            &DAY,
            &1_000,
        ),
        Error::InvalidDuration,
    );
    // Zero funding.
    assert_contract_error(
        client.mock_all_auths().try_initialize(
            &admin,
            &token_addr,
            &fee_recipient,
            &0,
            &DAY,
            &(4 * 365 * DAY),
            &0,
        ),
        Error::InvalidAmount,
    );
}

#[test]
fn test_create_grant_requires_initialization() {
    let env = Env::default();
    let recipient = Address::generate(&env);
    let contract_id = env.register_contract(None, VestingPool);
    let client = VestingPoolClient::new(&env, &contract_id);

    assert_contract_error(
        client
            .mock_all_auths()
            .try_create_grant(&recipient, &1_000, &0, &(360 * DAY), &0),
        Error::NotInitialized,
    );
}

#[test]
fn test_create_grant_rejects_malformed_input() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let now = s.env.ledger().timestamp();

    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_create_grant(&recipient, &0, &now, &(360 * DAY), &0),
        Error::InvalidAmount,
    );
    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_create_grant(&recipient, &1_000, &now, &0, &0),
        Error::InvalidDuration,
    );
    // Below the configured minimum.
    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_create_grant(&recipient, &1_000, &now, &(DAY / 2), &0),
        Error::InvalidDuration,
    );
    // Above the configured maximum.
    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_create_grant(&recipient, &1_000, &now, &(5 * 365 * DAY), &0),
        Error::InvalidDuration,
    );
    assert_contract_error(
        s.client.mock_all_auths().try_create_grant(
            &recipient,
            &1_000,
            &now,
            &(360 * DAY),
            &(360 * DAY + 1),
        ),
        Error::InvalidCliff,
    );
    // Start more than 15 seconds in the past is stale.
    assert_contract_error(
        s.client.mock_all_auths().try_create_grant(
            &recipient,
            &1_000,
            &(now - 16),
            &(360 * DAY),
            &0,
        ),
        Error::InvalidStart,
    );
    // Exactly at the tolerance edge is accepted.
    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &(now - 15), &(360 * DAY), &0);
}

#[test]
fn test_create_grant_allocates_from_pool() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let other = Address::generate(&s.env);
    let now = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &now, &(360 * DAY), &0);
    assert_eq!(s.client.unallocated_balance(), 9_000);
    assert_eq!(s.client.total_outstanding(), 1_000);
    assert_eq!(s.client.vested_amount(&recipient), 0);

    let grant = s.client.get_grant(&recipient);
    assert_eq!(grant.total, 1_000);
    assert_eq!(grant.claimed, 0);
    assert_eq!(grant.start, now);
    assert_eq!(grant.duration, 360 * DAY);
    assert!(grant.active);

    // One active grant per recipient.
    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_create_grant(&recipient, &500, &now, &(360 * DAY), &0),
        Error::GrantAlreadyExists,
    );
    // The pool only has 9,000 left for anyone else.
    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_create_grant(&other, &9_001, &now, &(360 * DAY), &0),
        Error::InsufficientBalance,
    );
}

#[test]
fn test_create_grant_requires_admin_auth() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let now = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &now, &(360 * DAY), &0);

    let auths = s.env.auths();
    assert_eq!(auths.len(), 1);
    assert_eq!(auths[0].0, s.admin);
    assert!(matches!(
        auths[0].1.function,
        AuthorizedFunction::Contract((_, _, _))
    ));
}

#[test]
fn test_update_grant_requires_existing_grant() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let now = s.env.ledger().timestamp();

    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_update_grant(&recipient, &1_000, &now, &(360 * DAY), &0),
        Error::NoGrantExists,
    );
}

#[test]
fn test_update_grant_refunds_then_reallocates() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    // 1,000 over 300 days: 10 intervals of 100 units.
    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(300 * DAY), &0);

    set_timestamp(&s.env, start + 60 * DAY);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.client.get_grant(&recipient).claimed, 200);
    assert_eq!(s.client.unallocated_balance(), 9_000);

    // Refund of 1,000 - 200 = 800 makes 9,800 available; one more is too much.
    let now = s.env.ledger().timestamp();
    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_update_grant(&recipient, &9_801, &now, &(360 * DAY), &0),
        Error::InsufficientBalance,
    );

    s.client
        .mock_all_auths()
        .update_grant(&recipient, &9_500, &now, &(360 * DAY), &(30 * DAY));

    let grant = s.client.get_grant(&recipient);
    assert_eq!(grant.total, 9_500);
    assert_eq!(grant.claimed, 0);
    assert_eq!(grant.start, now);
    assert_eq!(grant.cliff, 30 * DAY);
    assert_eq!(s.client.unallocated_balance(), 300);

    // Custody still balances: 10,000 funded minus the 200 paid out.
    assert_eq!(s.token.balance(&s.contract_id), 9_800);
    assert_eq!(
        s.token.balance(&s.contract_id),
        s.client.unallocated_balance() + s.client.total_outstanding()
    );
}

#[test]
fn test_update_grant_validates_like_create() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let now = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &now, &(360 * DAY), &0);

    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_update_grant(&recipient, &0, &now, &(360 * DAY), &0),
        Error::InvalidAmount,
    );
    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_update_grant(&recipient, &1_000, &now, &(360 * DAY), &(361 * DAY)),
        Error::InvalidCliff,
    );
    // A rejected update leaves the grant untouched.
    let grant = s.client.get_grant(&recipient);
    assert_eq!(grant.total, 1_000);
    assert_eq!(s.client.unallocated_balance(), 9_000);
}

#[test]
fn test_withdraw_unallocated_only() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let now = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &now, &(360 * DAY), &0);

    assert_contract_error(
        s.client.mock_all_auths().try_withdraw(&0),
        Error::InvalidAmount,
    );
    assert_contract_error(
        s.client.mock_all_auths().try_withdraw(&9_001),
        Error::InsufficientBalance,
    );

    let admin_before = s.token.balance(&s.admin);
    s.client.mock_all_auths().withdraw(&4_000);
    assert_eq!(s.client.unallocated_balance(), 5_000);
    assert_eq!(s.token.balance(&s.admin), admin_before + 4_000);
    assert_eq!(s.token.balance(&s.contract_id), 6_000);
}

#[test]
fn test_set_stream_interval_reshapes_vesting() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_200, &start, &(360 * DAY), &0);

    assert_contract_error(
        s.client.mock_all_auths().try_set_stream_interval(&0),
        Error::InvalidInterval,
    );

    // Day 45 under the default 30-day interval: one completed interval.
    set_timestamp(&s.env, start + 45 * DAY);
    assert_eq!(s.client.vested_amount(&recipient), 100);

    // Switching to 45-day intervals retroactively reshapes the curve:
    // 360 / 45 = 8 intervals, one of which has completed.
    s.client.mock_all_auths().set_stream_interval(&(45 * DAY));
    assert_eq!(s.client.stream_interval(), 45 * DAY);
    assert_eq!(s.client.vested_amount(&recipient), 150);
}

#[test]
fn test_pause_gates_claims() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_200, &start, &(360 * DAY), &0);
    set_timestamp(&s.env, start + 30 * DAY);

    s.client.mock_all_auths().set_pause(&true);
    assert!(s.client.is_paused());
    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::ContractPaused,
    );

    s.client.mock_all_auths().set_pause(&false);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 100);
}

#[test]
fn test_rescue_tokens_preserves_allocated_floor() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let stray_sink = Address::generate(&s.env);
    let now = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &now, &(360 * DAY), &0);

    // 500 stray units sent straight to the contract, outside the ledger.
    s.token_admin
        .mock_all_auths()
        .mint(&s.contract_id, &500);
    assert_eq!(s.token.balance(&s.contract_id), 10_500);

    assert_contract_error(
        s.client
            .mock_all_auths()
            .try_rescue_tokens(&s.token.address, &501, &stray_sink),
        Error::RescueWouldViolateAllocated,
    );

    s.client
        .mock_all_auths()
        .rescue_tokens(&s.token.address, &500, &stray_sink);
    assert_eq!(s.token.balance(&stray_sink), 500);
    assert_eq!(
        s.token.balance(&s.contract_id),
        s.client.unallocated_balance() + s.client.total_outstanding()
    );
}
