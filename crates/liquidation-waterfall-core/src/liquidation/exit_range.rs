use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use super::calculator::run_pipeline;
use super::preference::SeniorityTieBreak;
use super::structure::EquityStructure;
use crate::error::CalculationError;
use crate::types::*;
use crate::CalculationResult;

/// Upper bound on the number of exit values in one analysis.
pub const MAX_EXIT_POINTS: usize = 1_000;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Evenly spaced exit values from `min` to `max` inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSweep {
    pub min: Money,
    pub max: Money,
    pub step: Money,
}

/// Input for running the waterfall across a range of exit values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRangeInput {
    pub equity_structure: EquityStructure,
    /// Explicit exit values (whole minor units), evaluated in order
    #[serde(default)]
    pub exit_amounts: Vec<Money>,
    /// Generated exit values, evaluated after `exit_amounts`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep: Option<ExitSweep>,
    #[serde(default)]
    pub tie_break: SeniorityTieBreak,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRangeOutput {
    pub points: Vec<ExitRangePoint>,
}

/// Waterfall totals at one exit value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRangePoint {
    pub exit_amount: Money,
    pub total_distributed: Money,
    pub undistributed: Money,
    /// One entry per investor, in input order (zero when unpaid)
    pub investor_totals: Vec<InvestorTotal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorTotal {
    pub investor_id: String,
    pub investor_name: String,
    pub total_amount: Money,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Generate the exit values for a sweep, always including `max`.
fn sweep_values(sweep: &ExitSweep) -> CalculationResult<Vec<Money>> {
    if sweep.step <= Decimal::ZERO {
        return Err(CalculationError::InvalidInput {
            field: "sweep.step".into(),
            reason: "Step must be positive".into(),
        });
    }
    if sweep.min > sweep.max {
        return Err(CalculationError::InvalidInput {
            field: "sweep.min".into(),
            reason: "Min must be <= max".into(),
        });
    }
    let too_many = || CalculationError::InvalidInput {
        field: "sweep.step".into(),
        reason: format!("Sweep would produce more than {MAX_EXIT_POINTS} exit values"),
    };
    let steps = sweep
        .max
        .checked_sub(sweep.min)
        .and_then(|range| range.checked_div(sweep.step))
        .ok_or_else(too_many)?;
    if steps >= Decimal::from(MAX_EXIT_POINTS) {
        return Err(too_many());
    }
    // Off-grid max is appended as one extra value
    let mut points = steps.floor() + Decimal::ONE;
    if !steps.fract().is_zero() {
        points += Decimal::ONE;
    }
    if points > Decimal::from(MAX_EXIT_POINTS) {
        return Err(too_many());
    }

    let mut values = Vec::new();
    let mut current = sweep.min;
    while current <= sweep.max && values.len() <= MAX_EXIT_POINTS {
        values.push(current);
        match current.checked_add(sweep.step) {
            Some(next) if next > current => current = next,
            _ => break,
        }
    }
    if let Some(&last) = values.last() {
        if last < sweep.max {
            values.push(sweep.max);
        }
    }
    if values.len() > MAX_EXIT_POINTS {
        return Err(too_many());
    }
    Ok(values)
}

/// Run the waterfall at every requested exit value and report how totals
/// move per investor.
pub fn analyze_exit_range(
    input: &ExitRangeInput,
) -> CalculationResult<ComputationOutput<ExitRangeOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let structure = &input.equity_structure;

    let mut exit_amounts = input.exit_amounts.clone();
    if let Some(sweep) = &input.sweep {
        exit_amounts.extend(sweep_values(sweep)?);
    }
    if exit_amounts.is_empty() {
        return Err(CalculationError::InvalidInput {
            field: "exit_amounts".into(),
            reason: "Provide at least one exit amount or a sweep".into(),
        });
    }
    if exit_amounts.len() > MAX_EXIT_POINTS {
        return Err(CalculationError::InvalidInput {
            field: "exit_amounts".into(),
            reason: format!("At most {MAX_EXIT_POINTS} exit values per analysis"),
        });
    }

    let mut points: Vec<ExitRangePoint> = Vec::with_capacity(exit_amounts.len());
    let mut capped_points = 0usize;
    for exit_amount in exit_amounts {
        let outcome = run_pipeline(exit_amount, structure, input.tie_break)?;
        if outcome.capped_positions > 0 {
            capped_points += 1;
        }

        let mut by_investor: HashMap<&str, Money> = HashMap::new();
        for payout in &outcome.result.payouts {
            *by_investor.entry(payout.investor_id.as_str()).or_default() += payout.total_amount;
        }

        points.push(ExitRangePoint {
            exit_amount,
            total_distributed: outcome.result.total_distributed,
            undistributed: exit_amount - outcome.result.total_distributed,
            investor_totals: structure
                .investors
                .iter()
                .map(|inv| InvestorTotal {
                    investor_id: inv.id.clone(),
                    investor_name: inv.name.clone(),
                    total_amount: by_investor
                        .get(inv.id.as_str())
                        .copied()
                        .unwrap_or(Decimal::ZERO),
                })
                .collect(),
        });
    }

    if capped_points > 0 {
        warnings.push(format!(
            "Participation caps bind at {capped_points} of {} exit values; capped excess is not reallocated",
            points.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liquidation Waterfall Exit Range",
        &serde_json::json!({
            "num_exit_values": points.len(),
            "currency": structure.currency,
            "tie_break": input.tie_break,
            "num_investors": structure.investors.len(),
        }),
        warnings,
        elapsed,
        ExitRangeOutput { points },
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
