pub mod file;
pub mod stdin;

use rust_decimal::Decimal;
use serde_json::Value;

use ppp_finance_core::config::EngineConfig;
use ppp_finance_core::parameters::ParameterField;
use ppp_finance_core::ParameterSet;

/// Project inputs gathered from files, stdin and command-line overrides.
#[derive(Debug, Clone)]
pub struct ProjectRequest {
    pub parameters: ParameterSet,
    /// Scenario named inside the input document, if any
    pub scenario: Option<String>,
    pub config: EngineConfig,
}

/// Load the project from `--input`, piped stdin, or the default parameter set.
///
/// The document may be a bare parameter object or an envelope with
/// `parameters`, `scenario` and `config` keys. Parameter objects may be
/// partial: missing fields keep their default values. `--config` replaces any
/// config found in the document, and each `--set field=value` is applied last.
pub fn load_project(
    input: Option<&str>,
    config: Option<&str>,
    overrides: &[String],
) -> Result<ProjectRequest, Box<dyn std::error::Error>> {
    let document = match input {
        Some(path) => Some(file::read_json_value(path)?),
        None => stdin::read_stdin()?,
    };

    let mut request = match document {
        Some(doc) => from_document(doc)?,
        None => ProjectRequest {
            parameters: ParameterSet::default(),
            scenario: None,
            config: EngineConfig::default(),
        },
    };

    if let Some(path) = config {
        request.config = file::read_json(path)?;
    }

    for assignment in overrides {
        let (field, value) = parse_assignment(assignment)?;
        request.parameters = request.parameters.with_field(field, value)?;
    }

    tracing::debug!(
        source = input.unwrap_or("stdin/defaults"),
        overrides = overrides.len(),
        "project inputs loaded"
    );

    Ok(request)
}

fn from_document(doc: Value) -> Result<ProjectRequest, Box<dyn std::error::Error>> {
    let Value::Object(mut map) = doc else {
        return Err("Project input must be a JSON object".into());
    };

    if !map.contains_key("parameters") {
        return Ok(ProjectRequest {
            parameters: merge_with_defaults(Value::Object(map))?,
            scenario: None,
            config: EngineConfig::default(),
        });
    }

    let parameters = merge_with_defaults(map.remove("parameters").unwrap_or(Value::Null))?;
    let scenario = match map.remove("scenario") {
        Some(Value::String(name)) => Some(name),
        Some(Value::Null) | None => None,
        Some(other) => return Err(format!("'scenario' must be a string, got {}", other).into()),
    };
    let config = match map.remove("config") {
        Some(value) => serde_json::from_value(value)?,
        None => EngineConfig::default(),
    };

    Ok(ProjectRequest {
        parameters,
        scenario,
        config,
    })
}

/// Overlay the given keys on the default parameter set.
fn merge_with_defaults(partial: Value) -> Result<ParameterSet, Box<dyn std::error::Error>> {
    let mut merged = serde_json::to_value(ParameterSet::default())?;
    match (merged.as_object_mut(), partial) {
        (Some(base), Value::Object(given)) => {
            for (key, value) in given {
                if !base.contains_key(&key) {
                    return Err(format!("Unknown parameter '{}'", key).into());
                }
                base.insert(key, value);
            }
        }
        (_, Value::Null) => {}
        (_, other) => return Err(format!("'parameters' must be an object, got {}", other).into()),
    }
    Ok(serde_json::from_value(merged)?)
}

/// Parse `field=value` as given to `--set`.
pub fn parse_assignment(raw: &str) -> Result<(ParameterField, Decimal), Box<dyn std::error::Error>> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Override must be field=value, got '{}'", raw))?;
    let field: ParameterField = name.trim().parse()?;
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("Invalid value for {}: {}", field, e))?;
    Ok((field, value))
}

/// Parse a comma-separated list of decimals, e.g. "-0.1,0,0.1".
pub fn parse_decimal_list(raw: &str) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Decimal>()
                .map_err(|e| -> Box<dyn std::error::Error> {
                    format!("Invalid number '{}': {}", s, e).into()
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bare_partial_parameters_keep_defaults() {
        let request = from_document(serde_json::json!({"tax_rate": "0.25"})).unwrap();
        assert_eq!(request.parameters.tax_rate, dec!(0.25));
        assert_eq!(request.parameters.project_period, 25);
        assert_eq!(request.scenario, None);
    }

    #[test]
    fn test_envelope_document() {
        let request = from_document(serde_json::json!({
            "parameters": {"project_period": 30},
            "scenario": "Downside",
            "config": {"carryforward": "offset_profits"}
        }))
        .unwrap();
        assert_eq!(request.parameters.project_period, 30);
        assert_eq!(request.scenario.as_deref(), Some("Downside"));
        assert_ne!(request.config, EngineConfig::default());
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        assert!(from_document(serde_json::json!({"capex": "1"})).is_err());
        assert!(from_document(serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn test_parse_assignment() {
        let (field, value) = parse_assignment("debt_rate = 0.07").unwrap();
        assert_eq!(field, ParameterField::DebtRate);
        assert_eq!(value, dec!(0.07));
        assert!(parse_assignment("debt_rate").is_err());
        assert!(parse_assignment("leverage=0.5").is_err());
    }

    #[test]
    fn test_parse_decimal_list() {
        assert_eq!(
            parse_decimal_list("-0.1, 0,0.1").unwrap(),
            vec![dec!(-0.1), dec!(0), dec!(0.1)]
        );
        assert!(parse_decimal_list("a,b").is_err());
    }
}
