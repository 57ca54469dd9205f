use log::debug;

use super::aggregate::aggregate_holdings;
use super::preference::{pay_preferences, ClassPreference, SeniorityTieBreak};
use super::projection::{project_payouts, WaterfallResult};
use super::residual::distribute_residual;
use super::structure::EquityStructure;
use super::validation::validate_inputs;
use crate::types::Money;
use crate::CalculationResult;

/// Everything the pipeline learned on the way to a result. Feeds the
/// envelope's summaries and warnings.
#[derive(Debug, Clone)]
pub(crate) struct PipelineOutcome {
    pub result: WaterfallResult,
    pub class_preferences: Vec<ClassPreference>,
    pub residual_undistributed: Money,
    pub capped_positions: usize,
    pub rounding_adjustment: Money,
}

/// Distribute `exit_amount` (whole minor currency units) across the equity
/// structure using the default sequential seniority tie-break.
pub fn calculate(exit_amount: Money, structure: &EquityStructure) -> CalculationResult<WaterfallResult> {
    calculate_with_policy(exit_amount, structure, SeniorityTieBreak::default())
}

/// As [`calculate`], with an explicit policy for same-rank preference classes.
pub fn calculate_with_policy(
    exit_amount: Money,
    structure: &EquityStructure,
    tie_break: SeniorityTieBreak,
) -> CalculationResult<WaterfallResult> {
    run_pipeline(exit_amount, structure, tie_break).map(|outcome| outcome.result)
}

pub(crate) fn run_pipeline(
    exit_amount: Money,
    structure: &EquityStructure,
    tie_break: SeniorityTieBreak,
) -> CalculationResult<PipelineOutcome> {
    validate_inputs(exit_amount, structure)?;

    let accumulators = aggregate_holdings(&structure.holdings);
    debug!(
        "aggregated {} holdings into {} positions",
        structure.holdings.len(),
        accumulators.len()
    );

    let preference = pay_preferences(
        accumulators,
        &structure.share_classes,
        structure.minor_unit_scale(),
        exit_amount,
        tie_break,
    );
    let residual = distribute_residual(preference.accumulators, structure, preference.remaining_pool);
    let projection = project_payouts(&residual.accumulators, structure)?;

    debug!(
        "waterfall of {} distributed {} across {} payouts",
        exit_amount,
        projection.result.total_distributed,
        projection.result.payouts.len()
    );

    Ok(PipelineOutcome {
        result: projection.result,
        class_preferences: preference.classes,
        residual_undistributed: residual.undistributed,
        capped_positions: residual.capped_positions,
        rounding_adjustment: projection.rounding_adjustment,
    })
}
