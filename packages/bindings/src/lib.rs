use napi::Result as NapiResult;
use napi_derive::napi;

use ppp_finance_core::{calculate as run_calculate, sweep as run_sweep};
use ppp_finance_core::{CalculationInput, ParameterSet, SweepInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// `{parameters, scenario?, config?}` in, computation envelope out.
#[napi]
pub fn calculate(input_json: String) -> NapiResult<String> {
    let input: CalculationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_calculate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sensitivity / scenarios / stress
// ---------------------------------------------------------------------------

#[napi]
pub fn sweep(input_json: String) -> NapiResult<String> {
    let input: SweepInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_sweep(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

#[napi]
pub fn default_parameters() -> NapiResult<String> {
    serde_json::to_string(&ParameterSet::default()).map_err(to_napi_error)
}

#[napi]
pub fn parameter_ranges() -> NapiResult<String> {
    serde_json::to_string(&ppp_finance_core::parameters::parameter_ranges()).map_err(to_napi_error)
}
