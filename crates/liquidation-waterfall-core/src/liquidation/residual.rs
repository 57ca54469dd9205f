use log::debug;
use rust_decimal::Decimal;

use super::aggregate::Accumulators;
use super::structure::EquityStructure;
use crate::types::{Money, Shares};

#[derive(Debug, Clone)]
pub struct ResidualOutcome {
    pub accumulators: Accumulators,
    /// Amount allocated by this stage
    pub distributed: Money,
    /// Pool left over after participation caps (never reallocated)
    pub undistributed: Money,
    /// Positions whose allocation was cut by a participation cap
    pub capped_positions: usize,
}

/// Split `pool` across every share eligible for the residual layer at one
/// global per-share rate.
///
/// Common stock and participating preferred are eligible; non-participating
/// preferred receives nothing here. A participating class with a cap is
/// limited to `issue price x cap multiple x shares`, less the preference it
/// already received. Amounts trimmed by a cap are left undistributed rather
/// than reallocated to other holders.
pub fn distribute_residual(
    mut accumulators: Accumulators,
    structure: &EquityStructure,
    pool: Money,
) -> ResidualOutcome {
    let scale = structure.minor_unit_scale();

    let eligible_shares: Shares = accumulators
        .iter()
        .filter(|(k, _)| {
            structure
                .share_class(&k.share_class_id)
                .is_some_and(|c| c.is_residual_eligible())
        })
        .map(|(_, acc)| acc.share_count)
        .sum();

    if eligible_shares == 0 || pool <= Decimal::ZERO {
        debug!("residual stage skipped: {eligible_shares} eligible shares, pool {pool}");
        return ResidualOutcome {
            accumulators,
            distributed: Decimal::ZERO,
            undistributed: pool.max(Decimal::ZERO),
            capped_positions: 0,
        };
    }

    let per_share_amount = pool / Decimal::from(eligible_shares);
    let mut distributed = Decimal::ZERO;
    let mut capped_positions = 0usize;

    for (key, acc) in accumulators.iter_mut() {
        let Some(class) = structure.share_class(&key.share_class_id) else {
            continue;
        };
        if !class.is_residual_eligible() {
            continue;
        }

        let shares = Decimal::from(acc.share_count);
        let raw_amount = per_share_amount * shares;
        let amount = match class.cap_per_share(scale) {
            Some(cap_per_share) => {
                let cap = cap_per_share * shares - acc.preference_amount;
                if cap > Decimal::ZERO {
                    raw_amount.min(cap)
                } else {
                    Decimal::ZERO
                }
            }
            None => raw_amount,
        };
        if amount < raw_amount {
            capped_positions += 1;
        }

        if class.preferred {
            acc.participation_amount += amount;
        } else {
            acc.common_amount += amount;
        }
        distributed += amount;
    }

    let undistributed = (pool - distributed).max(Decimal::ZERO);
    debug!(
        "residual stage: {eligible_shares} eligible shares at {per_share_amount} per share, \
         distributed {distributed}, left {undistributed} ({capped_positions} capped)"
    );

    ResidualOutcome {
        accumulators,
        distributed,
        undistributed,
        capped_positions,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
