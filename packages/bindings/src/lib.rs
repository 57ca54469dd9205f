use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Liquidation waterfall
// ---------------------------------------------------------------------------

#[napi]
pub fn liquidation_waterfall(input_json: String) -> NapiResult<String> {
    let input: liquidation_waterfall_core::liquidation::waterfall::LiquidationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        liquidation_waterfall_core::liquidation::waterfall::calculate_liquidation_waterfall(&input)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn exit_range_analysis(input_json: String) -> NapiResult<String> {
    let input: liquidation_waterfall_core::liquidation::exit_range::ExitRangeInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = liquidation_waterfall_core::liquidation::exit_range::analyze_exit_range(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
