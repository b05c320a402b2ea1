mod graph;
mod steps;

use std::path::Path;

use thiserror::Error;

use crate::model::{Chain, Strategy};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Strategy ID is required")]
    MissingId,

    #[error("Strategy `{strategy_id}` has no steps")]
    NoSteps { strategy_id: String },

    #[error("Duplicate step ID `{step_id}`")]
    DuplicateStepId { step_id: String },

    #[error("Step `{step_id}` has an empty protocol")]
    MissingProtocol { step_id: String },

    #[error("Step `{step_id}` has an empty asset")]
    MissingAsset { step_id: String },

    #[error("Step `{step_id}` depends on unknown step `{dependency}`")]
    UnknownDependency { step_id: String, dependency: String },

    #[error("Step `{step_id}` depends on `{dependency}`, which is not declared before it")]
    DependencyOutOfOrder { step_id: String, dependency: String },

    #[error("Step dependencies contain a cycle")]
    DependencyCycle,

    #[error("Step `{step_id}` amount `{amount}` is not a positive decimal")]
    InvalidAmount { step_id: String, amount: String },

    #[error("Step `{step_id}` risk score {value} outside valid range 0.0..=10.0")]
    RiskScoreOutOfRange { step_id: String, value: f64 },

    #[error("Strategy confidence {value} outside valid range 0.0..=1.0")]
    ConfidenceOutOfRange { value: f64 },
}

/// Load and fully validate a strategy document from a JSON file.
pub fn load_and_validate(path: &Path) -> Result<Strategy, Vec<ValidationError>> {
    let contents = std::fs::read_to_string(path).map_err(|e| vec![ValidationError::Io(e)])?;
    parse_and_validate(&contents)
}

/// Parse and validate a strategy document from its JSON text.
pub fn parse_and_validate(json: &str) -> Result<Strategy, Vec<ValidationError>> {
    let strategy: Strategy =
        serde_json::from_str(json).map_err(|e| vec![ValidationError::Json(e)])?;
    validate(&strategy)?;
    Ok(strategy)
}

/// Validate a strategy document, collecting all errors.
pub fn validate(strategy: &Strategy) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if strategy.id.trim().is_empty() {
        errors.push(ValidationError::MissingId);
    }
    if strategy.steps.is_empty() {
        errors.push(ValidationError::NoSteps {
            strategy_id: strategy.id.clone(),
        });
    }
    if let Some(value) = strategy.confidence {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::ConfidenceOutOfRange { value });
        }
    }

    errors.extend(steps::check_fields(strategy));
    errors.extend(steps::check_duplicate_ids(strategy));
    errors.extend(graph::check_dependencies(strategy));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Whether `value` is a positive base-10 decimal such as `"1"` or `"0.25"`.
pub fn is_positive_decimal(value: &str) -> bool {
    let v = value.trim();
    let (int, frac) = match v.split_once('.') {
        Some((i, f)) => (i, f),
        None => (v, ""),
    };
    if int.is_empty() && frac.is_empty() {
        return false;
    }
    let digits_ok = int.chars().all(|c| c.is_ascii_digit()) && frac.chars().all(|c| c.is_ascii_digit());
    let non_zero = int.chars().chain(frac.chars()).any(|c| c != '0');
    digits_ok && non_zero
}

/// CLI entry point for the `validate` subcommand.
pub fn run(path: &Path) -> anyhow::Result<()> {
    match load_and_validate(path) {
        Ok(strategy) => {
            println!(
                "Strategy '{}' is valid. {} steps across {} chain(s).",
                strategy.id,
                strategy.steps.len(),
                strategy.chains.len()
            );
            for line in route_lines(&strategy) {
                println!("  {line}");
            }
            Ok(())
        }
        Err(errors) => {
            eprintln!("Validation failed with {} error(s):", errors.len());
            for (i, e) in errors.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, e);
            }
            std::process::exit(1);
        }
    }
}

/// One line per step: its route, flagged when it took the default route or
/// when no built-in adapter can submit it there.
pub fn route_lines(strategy: &Strategy) -> Vec<String> {
    let registry = crate::registry::AdapterRegistry::routes_only();
    strategy
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let route = registry.route_for(&step.protocol);
            let plannable = Chain::from_name(&route.chain)
                .is_some_and(|chain| crate::adapters::has_call_plan(&chain, step));
            format!(
                "{}. [{}] {} -> {}{}{}",
                i + 1,
                step.id_at(i),
                step.label(),
                route.chain,
                if route.fallback { " (default route)" } else { "" },
                if plannable { "" } else { " (no call plan; will be rejected)" },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{is_positive_decimal, parse_and_validate, route_lines};

    #[test]
    fn decimal_amounts() {
        assert!(is_positive_decimal("1"));
        assert!(is_positive_decimal("0.25"));
        assert!(is_positive_decimal(" 1000.50 "));
        assert!(is_positive_decimal(".5"));
        assert!(!is_positive_decimal("0"));
        assert!(!is_positive_decimal("0.000"));
        assert!(!is_positive_decimal("-1"));
        assert!(!is_positive_decimal("1e18"));
        assert!(!is_positive_decimal("."));
        assert!(!is_positive_decimal(""));
    }

    #[test]
    fn route_lines_flag_unplannable_steps() {
        let strategy = parse_and_validate(
            r#"{
                "id": "mixed",
                "goal": "mixed",
                "chains": ["ethereum", "near"],
                "protocols": [],
                "steps": [
                    {"action": "deposit", "protocol": "aave", "asset": "USDC", "amount": "100"},
                    {"action": "swap", "protocol": "uniswap", "asset": "USDC", "amount": "100"},
                    {"action": "stake", "protocol": "meta-pool", "asset": "NEAR", "amount": "5"},
                    {"action": "deposit", "protocol": "mystery-dex", "asset": "USDC", "amount": "1"}
                ]
            }"#,
        )
        .unwrap();
        let lines = route_lines(&strategy);
        assert!(lines[0].ends_with("-> ethereum"), "{}", lines[0]);
        assert!(lines[1].contains("no call plan"), "{}", lines[1]);
        assert!(lines[2].ends_with("-> near"), "{}", lines[2]);
        assert!(lines[3].contains("(default route)"), "{}", lines[3]);
        assert!(lines[3].contains("no call plan"), "{}", lines[3]);
    }
}
