#![cfg(test)]

use super::vesting::{claimable_split, vested_amount};
use super::{Error, Grant};

const DAY: u64 = 24 * 60 * 60;
const INTERVAL: u64 = 30 * DAY;

fn grant(total: i128, start: u64, duration: u64, cliff: u64) -> Grant {
    Grant {
        total,
        claimed: 0,
        start,
        duration,
        cliff,
        active: true,
    }
}

#[test]
fn test_whole_intervals_only() {
    // 1,200 over 360 days: 12 intervals of 100.
    let g = grant(1_200, 1_000, 360 * DAY, 0);

    assert_eq!(vested_amount(&g, 1_000 + 29 * DAY, INTERVAL), Ok(0));
    assert_eq!(vested_amount(&g, 1_000 + 30 * DAY, INTERVAL), Ok(100));
    assert_eq!(vested_amount(&g, 1_000 + 59 * DAY, INTERVAL), Ok(100));
    assert_eq!(vested_amount(&g, 1_000 + 180 * DAY, INTERVAL), Ok(600));
    assert_eq!(vested_amount(&g, 1_000 + 360 * DAY, INTERVAL), Ok(1_200));
}

#[test]
fn test_inactive_or_unstarted_vests_nothing() {
    let mut g = grant(1_000, 5_000, 360 * DAY, 0);
    assert_eq!(vested_amount(&g, 4_999, INTERVAL), Ok(0));

    g.active = false;
    assert_eq!(vested_amount(&g, 5_000 + 360 * DAY, INTERVAL), Ok(0));
}

#[test]
fn test_cliff_forces_zero_then_credits_elapsed_intervals() {
    let g = grant(1_000, 0, 365 * DAY, 90 * DAY);

    assert_eq!(vested_amount(&g, 89 * DAY, INTERVAL), Ok(0));
    // At the cliff the three already-elapsed intervals count at once.
    assert_eq!(vested_amount(&g, 90 * DAY, INTERVAL), Ok(250));
    // Day 120: 4 of 12 intervals.
    assert_eq!(vested_amount(&g, 120 * DAY, INTERVAL), Ok(333));
}

#[test]
fn test_full_vest_caps_at_total() {
    let g = grant(1_000, 0, 365 * DAY, 0);
    assert_eq!(vested_amount(&g, 365 * DAY, INTERVAL), Ok(1_000));
    assert_eq!(vested_amount(&g, u64::MAX, INTERVAL), Ok(1_000));
}

#[test]
fn test_sub_interval_duration_falls_back_to_linear() {
    // 10-day duration has zero whole 30-day intervals.
    let g = grant(1_000, 0, 10 * DAY, 0);
    assert_eq!(vested_amount(&g, 0, INTERVAL), Ok(0));
    assert_eq!(vested_amount(&g, 5 * DAY, INTERVAL), Ok(500));
    assert_eq!(vested_amount(&g, 9 * DAY, INTERVAL), Ok(900));
    assert_eq!(vested_amount(&g, 10 * DAY, INTERVAL), Ok(1_000));
}

#[test]
fn test_vesting_is_monotonic_in_time() {
    let g = grant(999, 1_000, 365 * DAY, 45 * DAY);
    let mut last = 0;
    for day in 0..=400 {
        let vested = vested_amount(&g, 1_000 + day * DAY, INTERVAL).unwrap();
        assert!(vested >= last);
        assert!(vested <= g.total);
        last = vested;
    }
    assert_eq!(last, g.total);
}

#[test]
fn test_frozen_schedule_stays_frozen() {
    // Shape a revoked grant leaves behind: total frozen at the vested
    // amount, duration cut to elapsed time, cliff cleared.
    let g = grant(500, 1_000, 180 * DAY, 0);
    assert_eq!(vested_amount(&g, 1_000 + 180 * DAY, INTERVAL), Ok(500));
    assert_eq!(vested_amount(&g, 1_000 + 10_000 * DAY, INTERVAL), Ok(500));

    let zeroed = grant(0, 1_000, 0, 0);
    assert_eq!(vested_amount(&zeroed, 1_000, INTERVAL), Ok(0));
    assert_eq!(vested_amount(&zeroed, u64::MAX, INTERVAL), Ok(0));
}

#[test]
fn test_overflowing_multiplication_is_signalled() {
    let g = grant(i128::MAX, 0, 360 * DAY, 0);
    assert_eq!(
        vested_amount(&g, 60 * DAY, INTERVAL),
        Err(Error::MathOverflow)
    );
}

#[test]
fn test_claimable_split_rounds_fee_down() {
    // 333 claimable at 250 bps: fee 8, net 325.
    assert_eq!(claimable_split(333, 0, 250), Ok((325, 8)));
    // Partial prior claim: only the newly vested slice is split.
    assert_eq!(claimable_split(600, 333, 250), Ok((261, 6)));
}

#[test]
fn test_claimable_split_handles_edges() {
    assert_eq!(claimable_split(100, 100, 250), Ok((0, 0)));
    assert_eq!(claimable_split(50, 100, 250), Ok((0, 0)));
    assert_eq!(claimable_split(1_000, 0, 0), Ok((1_000, 0)));
    // Amounts too small to carry a fee still pay out whole.
    assert_eq!(claimable_split(39, 0, 250), Ok((39, 0)));
}

#[test]
fn test_claimable_split_parts_sum_to_whole() {
    for claimable in [1_i128, 7, 39, 40, 333, 10_000, 123_457] {
        for bps in [0_u32, 1, 250, 500] {
            let (net, fee) = claimable_split(claimable, 0, bps).unwrap();
            assert_eq!(net + fee, claimable);
            assert!(fee <= claimable * i128::from(bps) / 10_000);
        }
    }
}
