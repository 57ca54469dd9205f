use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use super::calculator::{run_pipeline, PipelineOutcome};
use super::preference::SeniorityTieBreak;
use super::projection::{round_minor_units, Payout, WaterfallResult};
use super::structure::EquityStructure;
use crate::types::*;
use crate::CalculationResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Input for a liquidation waterfall at a single exit value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationInput {
    /// Proceeds available for distribution, in whole minor currency units
    pub exit_amount: Money,
    /// Date of the liquidity event (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDate>,
    /// Cap table snapshot, convertibles already resolved into holdings
    pub equity_structure: EquityStructure,
    /// Payment order for preference classes sharing a seniority rank
    #[serde(default)]
    pub tie_break: SeniorityTieBreak,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Full waterfall result with class and investor roll-ups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationOutput {
    /// Per (investor, share class) payouts, largest first
    pub payouts: Vec<Payout>,
    pub total_distributed: Money,
    /// Exit proceeds not allocated to anyone
    pub undistributed: Money,
    /// One row per share class, in input order
    pub class_summaries: Vec<ClassSummary>,
    /// One row per investor receiving proceeds, largest first
    pub investor_summaries: Vec<InvestorSummary>,
}

/// Proceeds attributed to a share class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSummary {
    pub share_class_id: String,
    pub share_class_name: String,
    pub share_count: Shares,
    /// Full preference owed to the class
    pub preference_claim: Money,
    pub preference_paid: Money,
    pub participation_amount: Money,
    pub common_amount: Money,
    pub total_amount: Money,
    /// Minor units received per share
    pub payout_per_share: Money,
}

/// Proceeds attributed to an investor across every class they hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorSummary {
    pub investor_id: String,
    pub investor_name: String,
    pub share_count: Shares,
    pub total_amount: Money,
    /// Fraction of the distributed total (0.25 = 25%)
    pub proceeds_share: Rate,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Calculate a liquidation waterfall for an exit.
///
/// Pays liquidation preferences in seniority order, then splits what is left
/// pro-rata across common and participating preferred shares (subject to
/// participation caps), and reports payouts per position along with class
/// and investor roll-ups.
pub fn calculate_liquidation_waterfall(
    input: &LiquidationInput,
) -> CalculationResult<ComputationOutput<LiquidationOutput>> {
    let start = Instant::now();
    let structure = &input.equity_structure;

    let outcome = run_pipeline(input.exit_amount, structure, input.tie_break)?;

    let mut warnings = structure_warnings(structure);
    warnings.extend(outcome_warnings(structure, &outcome));

    let class_summaries = summarize_classes(structure, &outcome);
    let investor_summaries = summarize_investors(structure, &outcome.result);
    let PipelineOutcome { result, .. } = outcome;

    let output = LiquidationOutput {
        undistributed: input.exit_amount - result.total_distributed,
        total_distributed: result.total_distributed,
        payouts: result.payouts,
        class_summaries,
        investor_summaries,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liquidation Waterfall (seniority-ordered preference, pro-rata residual)",
        &serde_json::json!({
            "exit_amount": input.exit_amount.to_string(),
            "exit_date": input.exit_date.map(|d| d.to_string()),
            "currency": structure.currency,
            "tie_break": input.tie_break,
            "num_share_classes": structure.share_classes.len(),
            "num_investors": structure.investors.len(),
            "num_holdings": structure.holdings.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

fn structure_warnings(structure: &EquityStructure) -> Vec<String> {
    let mut warnings = Vec::new();

    let zero_holdings = structure
        .holdings
        .iter()
        .filter(|h| h.number_of_shares == 0)
        .count();
    if zero_holdings > 0 {
        warnings.push(format!("{zero_holdings} holding(s) with zero shares ignored"));
    }

    for class in &structure.share_classes {
        if class.participation_cap_multiple.is_some() && !class.is_participating_preferred() {
            warnings.push(format!(
                "Share class '{}' has a participation cap but is not participating preferred; cap ignored",
                class.name
            ));
        }
        if class.has_preference() && !class.preferred {
            warnings.push(format!(
                "Share class '{}' carries a liquidation preference but is not marked preferred",
                class.name
            ));
        }
    }

    warnings
}

fn outcome_warnings(structure: &EquityStructure, outcome: &PipelineOutcome) -> Vec<String> {
    let mut warnings = Vec::new();

    for pref in outcome.class_preferences.iter().filter(|p| !p.is_fully_funded()) {
        let name = structure
            .share_class(&pref.share_class_id)
            .map(|c| c.name.as_str())
            .unwrap_or(pref.share_class_id.as_str());
        let claim = round_minor_units(pref.claim);
        if pref.paid.is_zero() {
            warnings.push(format!(
                "Liquidation preference for '{name}' unfunded (claim {claim})"
            ));
        } else {
            warnings.push(format!(
                "Liquidation preference for '{name}' partially funded: {} of {claim}",
                round_minor_units(pref.paid)
            ));
        }
    }

    let left = round_minor_units(outcome.residual_undistributed);
    if left > Decimal::ZERO {
        if outcome.capped_positions > 0 {
            warnings.push(format!(
                "Participation caps left {left} undistributed; capped excess is not reallocated to other holders"
            ));
        } else {
            warnings.push(format!(
                "No shares are eligible for residual proceeds; {left} left undistributed"
            ));
        }
    }

    if !outcome.rounding_adjustment.is_zero() {
        warnings.push(format!(
            "Rounding reconciliation moved {} minor unit(s) so payouts sum to the distributed total",
            outcome.rounding_adjustment.abs()
        ));
    }

    warnings
}

// ---------------------------------------------------------------------------
// Roll-ups
// ---------------------------------------------------------------------------

fn summarize_classes(structure: &EquityStructure, outcome: &PipelineOutcome) -> Vec<ClassSummary> {
    structure
        .share_classes
        .iter()
        .map(|class| {
            let rows: Vec<&Payout> = outcome
                .result
                .payouts
                .iter()
                .filter(|p| p.share_class_id == class.id)
                .collect();
            let preference_claim = outcome
                .class_preferences
                .iter()
                .find(|p| p.share_class_id == class.id)
                .map(|p| round_minor_units(p.claim))
                .unwrap_or(Decimal::ZERO);
            let preference_paid: Money = rows.iter().map(|p| p.preference_amount).sum();
            let participation_amount: Money = rows.iter().map(|p| p.participation_amount).sum();
            let common_amount: Money = rows.iter().map(|p| p.common_amount).sum();
            let total_amount = preference_paid + participation_amount + common_amount;

            let share_count = structure.shares_in_class(&class.id);
            let payout_per_share = if share_count > 0 {
                (total_amount / Decimal::from(share_count)).round_dp(4)
            } else {
                Decimal::ZERO
            };

            ClassSummary {
                share_class_id: class.id.clone(),
                share_class_name: class.name.clone(),
                share_count,
                preference_claim,
                preference_paid,
                participation_amount,
                common_amount,
                total_amount,
                payout_per_share,
            }
        })
        .collect()
}

fn summarize_investors(structure: &EquityStructure, result: &WaterfallResult) -> Vec<InvestorSummary> {
    let mut totals: Vec<(&str, &str, Money)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for payout in &result.payouts {
        match positions.get(payout.investor_id.as_str()) {
            Some(&i) => totals[i].2 += payout.total_amount,
            None => {
                positions.insert(payout.investor_id.as_str(), totals.len());
                totals.push((
                    payout.investor_id.as_str(),
                    payout.investor_name.as_str(),
                    payout.total_amount,
                ));
            }
        }
    }

    let mut summaries: Vec<InvestorSummary> = totals
        .into_iter()
        .map(|(id, name, total_amount)| InvestorSummary {
            investor_id: id.to_string(),
            investor_name: name.to_string(),
            share_count: structure
                .holdings
                .iter()
                .filter(|h| h.investor_id == id)
                .map(|h| h.number_of_shares)
                .sum(),
            total_amount,
            proceeds_share: if result.total_distributed.is_zero() {
                Decimal::ZERO
            } else {
                (total_amount / result.total_distributed).round_dp(6)
            },
        })
        .collect();
    summaries.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    summaries
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
