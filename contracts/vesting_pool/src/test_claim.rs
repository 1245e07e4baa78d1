#![cfg(test)]

use super::test::{assert_contract_error, set_timestamp, setup_pool, Setup, DAY};
use super::Error;
use soroban_sdk::{testutils::Address as _, Address};

/// Custodied tokens must always equal unallocated + outstanding commitments.
fn assert_conserved(s: &Setup) {
    assert_eq!(
        s.token.balance(&s.contract_id),
        s.client.unallocated_balance() + s.client.total_outstanding()
    );
}

#[test]
fn test_claim_requires_grant() {
    let s = setup_pool(0, 10_000);
    let stranger = Address::generate(&s.env);
    assert_contract_error(
        s.client.mock_all_auths().try_claim(&stranger),
        Error::NoGrantExists,
    );
}

#[test]
fn test_claim_before_cliff_has_nothing() {
    let s = setup_pool(250, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(365 * DAY), &(90 * DAY));

    set_timestamp(&s.env, start + 89 * DAY);
    assert_eq!(s.client.claimable_amount(&recipient), (0, 0));
    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::NothingToClaim,
    );
    assert_conserved(&s);
}

#[test]
fn test_claim_splits_net_and_fee() {
    // 1,000 over 365 days, 90-day cliff, 2.5% fee.
    let s = setup_pool(250, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(365 * DAY), &(90 * DAY));

    // Day 120: 4 completed 30-day intervals out of 12 -> 333 vested.
    set_timestamp(&s.env, start + 120 * DAY);
    assert_eq!(s.client.vested_amount(&recipient), 333);
    assert_eq!(s.client.claimable_amount(&recipient), (325, 8));

    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 325);
    assert_eq!(s.token.balance(&s.fee_recipient), 8);
    assert_eq!(s.client.get_grant(&recipient).claimed, 333);
    assert_conserved(&s);

    // Nothing further vests without time passing.
    assert_eq!(s.client.claimable_amount(&recipient), (0, 0));
    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::NothingToClaim,
    );
}

#[test]
fn test_net_and_fee_sum_to_newly_vested() {
    let s = setup_pool(500, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(365 * DAY), &0);

    for days in [30_u64, 95, 200, 365] {
        set_timestamp(&s.env, start + days * DAY);
        let vested = s.client.vested_amount(&recipient);
        let claimed = s.client.get_grant(&recipient).claimed;
        let (net, fee) = s.client.claimable_amount(&recipient);
        assert_eq!(net + fee, vested - claimed);
        if net + fee > 0 {
            s.client.mock_all_auths().claim(&recipient);
            assert_eq!(s.client.get_grant(&recipient).claimed, vested);
            assert_conserved(&s);
        }
    }
}

#[test]
fn test_incremental_claims_follow_the_staircase() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    // 1,200 over 360 days: 100 per completed 30-day interval.
    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_200, &start, &(360 * DAY), &0);

    set_timestamp(&s.env, start + 30 * DAY);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 100);
    assert_conserved(&s);

    // Day 59 is still inside the second interval: no partial credit.
    set_timestamp(&s.env, start + 59 * DAY);
    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::NothingToClaim,
    );

    set_timestamp(&s.env, start + 180 * DAY);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 600);
    assert_conserved(&s);

    set_timestamp(&s.env, start + 360 * DAY);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 1_200);
    assert_conserved(&s);
}

#[test]
fn test_fully_claimed_grant_frees_the_slot() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(360 * DAY), &0);

    set_timestamp(&s.env, start + 360 * DAY);
    s.client.mock_all_auths().claim(&recipient);

    let grant = s.client.get_grant(&recipient);
    assert_eq!(grant.claimed, 1_000);
    assert!(!grant.active);
    assert_eq!(s.client.total_outstanding(), 0);
    assert_conserved(&s);

    // The slot is free for a fresh grant.
    let now = s.env.ledger().timestamp();
    s.client
        .mock_all_auths()
        .create_grant(&recipient, &500, &now, &(360 * DAY), &0);
    assert_eq!(s.client.get_grant(&recipient).total, 500);
}

#[test]
fn test_revoke_at_half_keeps_vested_claimable() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(360 * DAY), &0);

    // Day 180: 6 of 12 intervals -> 500 vested.
    set_timestamp(&s.env, start + 180 * DAY);
    s.client.mock_all_auths().revoke_grant(&recipient);

    let grant = s.client.get_grant(&recipient);
    assert!(grant.active);
    assert_eq!(grant.total, 500);
    assert_eq!(grant.cliff, 0);
    assert_eq!(s.client.unallocated_balance(), 9_500);
    assert_conserved(&s);

    // The schedule is frozen: more time never grows the vested amount.
    set_timestamp(&s.env, start + 400 * DAY);
    assert_eq!(s.client.vested_amount(&recipient), 500);

    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 500);
    assert!(!s.client.get_grant(&recipient).active);
    assert_conserved(&s);

    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::NoGrantExists,
    );
}

#[test]
fn test_revoke_before_cliff_frees_immediately() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(365 * DAY), &(90 * DAY));

    set_timestamp(&s.env, start + 30 * DAY);
    s.client.mock_all_auths().revoke_grant(&recipient);

    // Nothing had vested, so everything refunds and the slot frees at once.
    let grant = s.client.get_grant(&recipient);
    assert!(!grant.active);
    assert_eq!(grant.total, 0);
    assert_eq!(s.client.unallocated_balance(), 10_000);
    assert_conserved(&s);

    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::NoGrantExists,
    );
    assert_contract_error(
        s.client.mock_all_auths().try_revoke_grant(&recipient),
        Error::NoGrantExists,
    );
}

#[test]
fn test_revoke_after_everything_vested_was_claimed() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    // 1,000 over 300 days: 100 per interval.
    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_000, &start, &(300 * DAY), &0);

    set_timestamp(&s.env, start + 60 * DAY);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.client.get_grant(&recipient).claimed, 200);

    // Vested == claimed, so revoke deactivates on the spot.
    s.client.mock_all_auths().revoke_grant(&recipient);
    let grant = s.client.get_grant(&recipient);
    assert!(!grant.active);
    assert_eq!(grant.total, 200);
    assert_eq!(s.client.unallocated_balance(), 9_800);
    assert_conserved(&s);
}

#[test]
fn test_revoke_never_lowers_claimed() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_200, &start, &(360 * DAY), &0);

    set_timestamp(&s.env, start + 90 * DAY);
    s.client.mock_all_auths().claim(&recipient);
    let claimed_before = s.client.get_grant(&recipient).claimed;
    assert_eq!(claimed_before, 300);

    set_timestamp(&s.env, start + 180 * DAY);
    s.client.mock_all_auths().revoke_grant(&recipient);

    let grant = s.client.get_grant(&recipient);
    assert_eq!(grant.claimed, claimed_before);
    assert_eq!(grant.total, 600);
    assert_conserved(&s);

    // The vested-but-unpaid remainder is claimable exactly once more.
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 600);
    assert!(!s.client.get_grant(&recipient).active);
    assert_conserved(&s);
}

#[test]
fn test_revoke_after_interval_increase_never_refunds_paid_value() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_200, &start, &(360 * DAY), &0);

    set_timestamp(&s.env, start + 30 * DAY);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 100);

    // A 360-day interval leaves zero completed intervals, so the vested
    // view drops below what was already paid out.
    s.client.mock_all_auths().set_stream_interval(&(360 * DAY));
    assert_eq!(s.client.vested_amount(&recipient), 0);

    // Revoke may only refund value still in custody: 1,200 - 100.
    s.client.mock_all_auths().revoke_grant(&recipient);

    let grant = s.client.get_grant(&recipient);
    assert_eq!(grant.total, 100);
    assert_eq!(grant.claimed, 100);
    assert!(!grant.active);
    assert_eq!(s.client.unallocated_balance(), 9_900);
    assert_conserved(&s);

    // The ledger never claims more than the contract holds.
    s.client.mock_all_auths().withdraw(&9_900);
    assert_eq!(s.token.balance(&s.contract_id), 0);
}

#[test]
fn test_claim_rejects_when_recipient_transfer_fails() {
    let s = setup_pool(0, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_200, &start, &(360 * DAY), &0);
    set_timestamp(&s.env, start + 30 * DAY);

    // Freeze the claimant's trustline so the payout transfer fails.
    s.token_admin
        .mock_all_auths()
        .set_authorized(&recipient, &false);
    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::TransferFailed,
    );

    // The rejection leaves no partial state behind.
    assert_eq!(s.client.get_grant(&recipient).claimed, 0);
    assert_eq!(s.token.balance(&s.contract_id), 10_000);
    assert_conserved(&s);

    s.token_admin
        .mock_all_auths()
        .set_authorized(&recipient, &true);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 100);
    assert_conserved(&s);
}

#[test]
fn test_claim_rejects_when_fee_transfer_fails() {
    let s = setup_pool(250, 10_000);
    let recipient = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&recipient, &1_200, &start, &(360 * DAY), &0);
    set_timestamp(&s.env, start + 30 * DAY);

    s.token_admin
        .mock_all_auths()
        .set_authorized(&s.fee_recipient, &false);
    assert_contract_error(
        s.client.mock_all_auths().try_claim(&recipient),
        Error::TransferFailed,
    );

    // No partial payout: neither leg of the claim went through.
    assert_eq!(s.client.get_grant(&recipient).claimed, 0);
    assert_eq!(s.token.balance(&recipient), 0);
    assert_eq!(s.token.balance(&s.fee_recipient), 0);
    assert_conserved(&s);

    s.token_admin
        .mock_all_auths()
        .set_authorized(&s.fee_recipient, &true);
    s.client.mock_all_auths().claim(&recipient);
    assert_eq!(s.token.balance(&recipient), 98);
    assert_eq!(s.token.balance(&s.fee_recipient), 2);
    assert_conserved(&s);
}

#[test]
fn test_conservation_across_mixed_operations() {
    let s = setup_pool(250, 10_000);
    let alice = Address::generate(&s.env);
    let bob = Address::generate(&s.env);
    let start = s.env.ledger().timestamp();

    s.client
        .mock_all_auths()
        .create_grant(&alice, &1_200, &start, &(360 * DAY), &0);
    assert_conserved(&s);

    s.client
        .mock_all_auths()
        .create_grant(&bob, &4_000, &start, &(300 * DAY), &(60 * DAY));
    assert_conserved(&s);

    set_timestamp(&s.env, start + 90 * DAY);
    s.client.mock_all_auths().claim(&alice);
    assert_conserved(&s);
    s.client.mock_all_auths().claim(&bob);
    assert_conserved(&s);

    s.client.mock_all_auths().withdraw(&2_000);
    assert_conserved(&s);

    let now = s.env.ledger().timestamp();
    s.client
        .mock_all_auths()
        .update_grant(&bob, &2_500, &now, &(300 * DAY), &0);
    assert_conserved(&s);

    set_timestamp(&s.env, start + 200 * DAY);
    s.client.mock_all_auths().revoke_grant(&alice);
    assert_conserved(&s);

    s.client.mock_all_auths().claim(&alice);
    assert_conserved(&s);
}
