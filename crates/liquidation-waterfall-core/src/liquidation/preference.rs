use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::aggregate::Accumulators;
use super::structure::ShareClass;
use crate::types::Money;

// ---------------------------------------------------------------------------
// Tie-break policy
// ---------------------------------------------------------------------------

/// How preference classes sharing a seniority rank are paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityTieBreak {
    /// Same-rank classes are paid one after another, in input order.
    #[default]
    Sequential,
    /// Same-rank classes form one tier and share a shortfall in proportion
    /// to their claims.
    ProRata,
}

impl SeniorityTieBreak {
    /// Group seniority-ordered classes into the tiers that are funded
    /// together.
    fn tiers<'a>(&self, ordered: &[&'a ShareClass]) -> Vec<Vec<&'a ShareClass>> {
        match self {
            SeniorityTieBreak::Sequential => ordered.iter().map(|c| vec![*c]).collect(),
            SeniorityTieBreak::ProRata => {
                let mut tiers: Vec<Vec<&ShareClass>> = Vec::new();
                for class in ordered {
                    match tiers.last_mut() {
                        Some(tier) if tier[0].seniority() == class.seniority() => tier.push(*class),
                        _ => tiers.push(vec![*class]),
                    }
                }
                tiers
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Preference claimed and paid for one share class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPreference {
    pub share_class_id: String,
    /// Full preference owed to the class (minor units, unrounded)
    pub claim: Money,
    /// Amount actually paid out of the pool
    pub paid: Money,
}

impl ClassPreference {
    pub fn is_fully_funded(&self) -> bool {
        self.paid >= self.claim
    }
}

#[derive(Debug, Clone)]
pub struct PreferenceOutcome {
    pub accumulators: Accumulators,
    /// Pool left for the residual stage
    pub remaining_pool: Money,
    /// One entry per preference class, in payment order
    pub classes: Vec<ClassPreference>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Pay liquidation preferences out of `pool`, most senior class first.
///
/// Only classes with a positive preference multiple take part. Classes are
/// stably sorted by seniority rank (unranked last); `tie_break` decides how
/// classes of equal rank share a shortfall. Within a class, the amount paid
/// is split across holdings in proportion to their claim. Never fails: an
/// exhausted pool simply leaves later classes unpaid.
pub fn pay_preferences(
    mut accumulators: Accumulators,
    share_classes: &[ShareClass],
    minor_unit_scale: Decimal,
    pool: Money,
    tie_break: SeniorityTieBreak,
) -> PreferenceOutcome {
    let mut ordered: Vec<&ShareClass> = share_classes.iter().filter(|c| c.has_preference()).collect();
    ordered.sort_by_key(|c| c.seniority());

    let mut remaining = pool;
    let mut classes: Vec<ClassPreference> = Vec::with_capacity(ordered.len());

    for tier in tie_break.tiers(&ordered) {
        let claims: Vec<Money> = tier
            .iter()
            .map(|class| class_claim(&accumulators, class, minor_unit_scale))
            .collect();
        let tier_claim: Money = claims.iter().copied().sum();

        let amount_to_pay = if remaining > Decimal::ZERO {
            tier_claim.min(remaining)
        } else {
            Decimal::ZERO
        };
        let ratio = if tier_claim > Decimal::ZERO {
            amount_to_pay / tier_claim
        } else {
            Decimal::ZERO
        };

        for (class, claim) in tier.iter().zip(claims) {
            let per_share = class.preference_per_share(minor_unit_scale);
            if ratio > Decimal::ZERO {
                for (_, acc) in accumulators
                    .iter_mut()
                    .filter(|(k, _)| k.share_class_id == class.id)
                {
                    acc.preference_amount += per_share * Decimal::from(acc.share_count) * ratio;
                }
            }
            debug!(
                "preference class '{}' (rank {}): claim {}, paid {}",
                class.id,
                class.seniority(),
                claim,
                claim * ratio
            );
            classes.push(ClassPreference {
                share_class_id: class.id.clone(),
                claim,
                paid: claim * ratio,
            });
        }

        remaining -= amount_to_pay;
    }

    PreferenceOutcome {
        accumulators,
        remaining_pool: remaining,
        classes,
    }
}

/// Total preference owed to every holding of a class.
fn class_claim(accumulators: &Accumulators, class: &ShareClass, minor_unit_scale: Decimal) -> Money {
    let per_share = class.preference_per_share(minor_unit_scale);
    accumulators
        .iter()
        .filter(|(k, _)| k.share_class_id == class.id)
        .map(|(_, acc)| per_share * Decimal::from(acc.share_count))
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
