use clap::{Args, ValueEnum};
use log::debug;
use rust_decimal::Decimal;
use serde_json::Value;

use liquidation_waterfall_core::liquidation::exit_range::{self, ExitRangeInput, ExitSweep};
use liquidation_waterfall_core::liquidation::waterfall::{self, LiquidationInput};
use liquidation_waterfall_core::liquidation::{EquityStructure, SeniorityTieBreak};

use crate::input;

/// Payment order for preference classes sharing a seniority rank
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TieBreakArg {
    /// Pay same-rank classes one after another, in input order
    Sequential,
    /// Share a shortfall across same-rank classes by claim
    ProRata,
}

impl From<TieBreakArg> for SeniorityTieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::Sequential => SeniorityTieBreak::Sequential,
            TieBreakArg::ProRata => SeniorityTieBreak::ProRata,
        }
    }
}

/// Arguments for a single-exit liquidation waterfall
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to JSON input file (exit amount, equity structure, options)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to an equity structure JSON file, used together with --exit-amount
    #[arg(long, conflicts_with = "input")]
    pub structure: Option<String>,

    /// Exit proceeds in whole minor currency units (e.g. cents); overrides the input file
    #[arg(long)]
    pub exit_amount: Option<Decimal>,

    /// Tie-break policy for same-rank preference classes
    #[arg(long, value_enum)]
    pub tie_break: Option<TieBreakArg>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut wf_input: LiquidationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref path) = args.structure {
        let equity_structure: EquityStructure = input::file::read_json(path)?;
        let exit_amount = args
            .exit_amount
            .ok_or("--exit-amount is required with --structure")?;
        LiquidationInput {
            exit_amount,
            exit_date: None,
            equity_structure,
            tie_break: SeniorityTieBreak::default(),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json>, --structure <file.json> or stdin required for waterfall".into());
    };

    if let Some(amount) = args.exit_amount {
        wf_input.exit_amount = amount;
    }
    if let Some(tie_break) = args.tie_break {
        wf_input.tie_break = tie_break.into();
    }
    debug!(
        "waterfall: exit {} over {} holdings ({:?})",
        wf_input.exit_amount,
        wf_input.equity_structure.holdings.len(),
        wf_input.tie_break
    );

    let result = waterfall::calculate_liquidation_waterfall(&wf_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for running the waterfall across a range of exit values
#[derive(Args)]
pub struct ExitRangeArgs {
    /// Path to JSON input file (equity structure, exit values, options)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to an equity structure JSON file, used with exit value flags
    #[arg(long, conflicts_with = "input")]
    pub structure: Option<String>,

    /// Explicit exit values in minor units (comma-separated, e.g. "1000000,5000000")
    #[arg(long, value_delimiter = ',')]
    pub exit_amounts: Option<Vec<Decimal>>,

    /// Lowest exit value of a sweep
    #[arg(long, requires_all = ["max", "step"])]
    pub min: Option<Decimal>,

    /// Highest exit value of a sweep
    #[arg(long, requires_all = ["min", "step"])]
    pub max: Option<Decimal>,

    /// Increment between sweep values
    #[arg(long, requires_all = ["min", "max"])]
    pub step: Option<Decimal>,

    /// Tie-break policy for same-rank preference classes
    #[arg(long, value_enum)]
    pub tie_break: Option<TieBreakArg>,
}

pub fn run_exit_range(args: ExitRangeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut range_input: ExitRangeInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref path) = args.structure {
        ExitRangeInput {
            equity_structure: input::file::read_json(path)?,
            exit_amounts: Vec::new(),
            sweep: None,
            tie_break: SeniorityTieBreak::default(),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json>, --structure <file.json> or stdin required for exit range".into());
    };

    if let Some(amounts) = args.exit_amounts {
        range_input.exit_amounts = amounts;
    }
    if let (Some(min), Some(max), Some(step)) = (args.min, args.max, args.step) {
        range_input.sweep = Some(ExitSweep { min, max, step });
    }
    if let Some(tie_break) = args.tie_break {
        range_input.tie_break = tie_break.into();
    }

    let result = exit_range::analyze_exit_range(&range_input)?;
    Ok(serde_json::to_value(result)?)
}
