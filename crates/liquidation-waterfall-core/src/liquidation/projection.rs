use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::aggregate::{Accumulators, HoldingKey};
use super::structure::{EquityStructure, Investor, ShareClass};
use crate::error::CalculationError;
use crate::types::{Money, Shares};
use crate::CalculationResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Proceeds paid to one investor for one share class. All amounts are whole
/// minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub investor_id: String,
    pub share_class_id: String,
    pub investor_name: String,
    pub share_class_name: String,
    pub share_count: Shares,
    pub preference_amount: Money,
    pub participation_amount: Money,
    pub common_amount: Money,
    pub total_amount: Money,
}

/// Result of a waterfall calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallResult {
    /// Nonzero payouts, largest first
    pub payouts: Vec<Payout>,
    pub total_distributed: Money,
}

#[derive(Debug, Clone)]
pub struct Projection {
    pub result: WaterfallResult,
    /// Signed minor units moved by rounding reconciliation
    pub rounding_adjustment: Money,
}

/// Round to whole minor units, half away from zero.
pub fn round_minor_units(amount: Money) -> Money {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Turn accumulators into rounded payout rows.
///
/// Each sub-amount is rounded half-up, then single minor units are moved
/// (largest remainder first) until the rows sum to the exact distributed
/// total rounded half-up. Zero rows are dropped and the rest sorted by total,
/// descending; ties keep accumulator order.
pub fn project_payouts(
    accumulators: &Accumulators,
    structure: &EquityStructure,
) -> CalculationResult<Projection> {
    let investors: HashMap<&str, &Investor> = structure
        .investors
        .iter()
        .map(|i| (i.id.as_str(), i))
        .collect();
    let classes: HashMap<&str, &ShareClass> = structure
        .share_classes
        .iter()
        .map(|c| (c.id.as_str(), c))
        .collect();

    let exact: Vec<[Money; 3]> = accumulators
        .iter()
        .map(|(_, a)| [a.preference_amount, a.participation_amount, a.common_amount])
        .collect();
    let mut rounded: Vec<[Money; 3]> = exact.iter().map(|c| c.map(round_minor_units)).collect();
    let target = round_minor_units(exact.iter().flatten().copied().sum());
    let rounding_adjustment = reconcile_rounding(&exact, &mut rounded, target);

    let mut payouts: Vec<Payout> = Vec::with_capacity(accumulators.len());
    for ((key, acc), amounts) in accumulators.iter().zip(rounded) {
        let [preference_amount, participation_amount, common_amount] = amounts;
        let total_amount = preference_amount + participation_amount + common_amount;
        if total_amount.is_zero() {
            continue;
        }

        let investor = investors
            .get(key.investor_id.as_str())
            .ok_or_else(|| missing_reference(key, "investor", &key.investor_id))?;
        let class = classes
            .get(key.share_class_id.as_str())
            .ok_or_else(|| missing_reference(key, "share class", &key.share_class_id))?;

        payouts.push(Payout {
            investor_id: key.investor_id.clone(),
            share_class_id: key.share_class_id.clone(),
            investor_name: investor.name.clone(),
            share_class_name: class.name.clone(),
            share_count: acc.share_count,
            preference_amount,
            participation_amount,
            common_amount,
            total_amount,
        });
    }

    payouts.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    let total_distributed: Money = payouts.iter().map(|p| p.total_amount).sum();

    Ok(Projection {
        result: WaterfallResult {
            payouts,
            total_distributed,
        },
        rounding_adjustment,
    })
}

fn missing_reference(key: &HoldingKey, kind: &str, id: &str) -> CalculationError {
    CalculationError::ReferenceIntegrity {
        holding: format!("({}, {})", key.investor_id, key.share_class_id),
        missing: format!("{kind} '{id}'"),
    }
}

/// Nudge rounded cells by one minor unit each until they sum to `target`.
/// Returns the signed number of units moved.
fn reconcile_rounding(exact: &[[Money; 3]], rounded: &mut [[Money; 3]], target: Money) -> Money {
    let current: Money = rounded.iter().flatten().copied().sum();
    let diff = target - current;
    if diff.is_zero() {
        return Decimal::ZERO;
    }

    let step = if diff > Decimal::ZERO {
        Decimal::ONE
    } else {
        Decimal::NEGATIVE_ONE
    };

    // Only cells that were rounded against the direction of the shortfall
    // are candidates; the furthest from their exact value move first.
    let mut cells: Vec<(usize, usize, Money)> = exact
        .iter()
        .zip(rounded.iter())
        .enumerate()
        .flat_map(|(row, (e, r))| (0..3).map(move |col| (row, col, (e[col] - r[col]) * step)))
        .filter(|(_, _, remainder)| *remainder > Decimal::ZERO)
        .collect();
    cells.sort_by(|a, b| b.2.cmp(&a.2));

    let mut left = diff.abs();
    for (row, col, _) in cells {
        if left.is_zero() {
            break;
        }
        rounded[row][col] += step;
        left -= Decimal::ONE;
    }

    diff - left * step
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liquidation::aggregate::aggregate_holdings;
    use crate::liquidation::structure::ShareHolding;
    use rust_decimal_macros::dec;

    fn structure(investors: &[&str]) -> EquityStructure {
        EquityStructure {
            investors: investors
                .iter()
                .map(|id| Investor {
                    id: (*id).into(),
                    name: format!("Investor {}", id.to_uppercase()),
                    email: None,
                })
                .collect(),
            share_classes: vec![ShareClass {
                id: "common".into(),
                name: "Common".into(),
                original_issue_price: dec!(0.01),
                liquidation_preference_multiple: Decimal::ZERO,
                preferred: false,
                participating: false,
                participation_cap_multiple: None,
                seniority_rank: None,
            }],
            holdings: investors
                .iter()
                .map(|id| ShareHolding {
                    investor_id: (*id).into(),
                    share_class_id: "common".into(),
                    number_of_shares: 1,
                })
                .collect(),
            currency: Default::default(),
        }
    }

    fn with_common(structure: &EquityStructure, amounts: &[Money]) -> Accumulators {
        let mut acc = aggregate_holdings(&structure.holdings);
        for ((_, a), amount) in acc.iter_mut().zip(amounts) {
            a.common_amount = *amount;
        }
        acc
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_minor_units(dec!(10.5)), dec!(11));
        assert_eq!(round_minor_units(dec!(10.49)), dec!(10));
        assert_eq!(round_minor_units(dec!(2.5)), dec!(3));
    }

    #[test]
    fn test_rows_sorted_and_zero_rows_dropped() {
        let s = structure(&["a", "b", "c"]);
        let acc = with_common(&s, &[dec!(10), dec!(0), dec!(30)]);
        let projection = project_payouts(&acc, &s).unwrap();
        let ids: Vec<&str> = projection
            .result
            .payouts
            .iter()
            .map(|p| p.investor_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(projection.result.total_distributed, dec!(40));
        assert_eq!(projection.result.payouts[0].investor_name, "Investor C");
        assert_eq!(projection.result.payouts[0].share_class_name, "Common");
    }

    #[test]
    fn test_ties_keep_accumulator_order() {
        let s = structure(&["b", "a", "c"]);
        let acc = with_common(&s, &[dec!(5), dec!(5), dec!(9)]);
        let projection = project_payouts(&acc, &s).unwrap();
        let ids: Vec<&str> = projection
            .result
            .payouts
            .iter()
            .map(|p| p.investor_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_rounding_down_is_reconciled() {
        // 100 split three ways: 33.33.. each rounds to 33, one unit restored
        let s = structure(&["a", "b", "c"]);
        let third = dec!(100) / dec!(3);
        let acc = with_common(&s, &[third, third, third]);
        let projection = project_payouts(&acc, &s).unwrap();

        assert_eq!(projection.result.total_distributed, dec!(100));
        assert_eq!(projection.rounding_adjustment, dec!(1));
        let amounts: Vec<Money> = projection.result.payouts.iter().map(|p| p.total_amount).collect();
        assert_eq!(amounts, vec![dec!(34), dec!(33), dec!(33)]);
    }

    #[test]
    fn test_rounding_up_is_reconciled() {
        // 1 split two ways: both halves round up to 1, one is taken back
        let s = structure(&["a", "b"]);
        let acc = with_common(&s, &[dec!(0.5), dec!(0.5)]);
        let projection = project_payouts(&acc, &s).unwrap();

        assert_eq!(projection.result.total_distributed, dec!(1));
        assert_eq!(projection.rounding_adjustment, dec!(-1));
        assert_eq!(projection.result.payouts.len(), 1);
    }

    #[test]
    fn test_missing_investor_name_is_reference_error() {
        let mut s = structure(&["a"]);
        let acc = with_common(&s, &[dec!(10)]);
        s.investors.clear();
        assert!(matches!(
            project_payouts(&acc, &s),
            Err(CalculationError::ReferenceIntegrity { .. })
        ));
    }
}
