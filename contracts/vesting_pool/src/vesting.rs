//! Interval-based vesting math. Pure functions over a grant snapshot: no
//! storage access, deterministic for the same inputs.

use crate::{Error, Grant, BPS_DENOMINATOR};

/// Vested value of `grant` at `now`, discretized to `stream_interval`.
///
/// Vesting is a step function: only whole completed intervals count, with no
/// partial-interval credit. A grant whose duration is shorter than one
/// interval falls back to continuous linear vesting, since it would otherwise
/// never have a completed interval before its end.
pub fn vested_amount(grant: &Grant, now: u64, stream_interval: u64) -> Result<i128, Error> {
    if !grant.active || now < grant.start {
        return Ok(0);
    }
    if now < grant.start.saturating_add(grant.cliff) {
        return Ok(0);
    }

    let elapsed = now - grant.start;
    if elapsed >= grant.duration {
        return Ok(grant.total);
    }

    let total_intervals = grant.duration / stream_interval;
    if total_intervals == 0 {
        let scaled = grant
            .total
            .checked_mul(elapsed as i128)
            .ok_or(Error::MathOverflow)?;
        return Ok(scaled / grant.duration as i128);
    }

    let intervals_completed = elapsed / stream_interval;
    let scaled = grant
        .total
        .checked_mul(intervals_completed as i128)
        .ok_or(Error::MathOverflow)?;
    Ok(scaled / total_intervals as i128)
}

/// Split the claimable remainder of a grant into (net, fee).
///
/// Returns (0, 0) when nothing has newly vested. The fee is rounded down, so
/// net + fee always equals the full claimable amount.
pub fn claimable_split(vested: i128, claimed: i128, fee_bps: u32) -> Result<(i128, i128), Error> {
    if vested <= claimed {
        return Ok((0, 0));
    }
    let claimable = vested - claimed;
    let fee = claimable
        .checked_mul(i128::from(fee_bps))
        .ok_or(Error::MathOverflow)?
        / BPS_DENOMINATOR;
    Ok((claimable - fee, fee))
}
