use std::collections::HashSet;

use crate::model::Strategy;

use super::{ValidationError, is_positive_decimal};

/// Check that all step IDs are unique.
pub fn check_duplicate_ids(strategy: &Strategy) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for (i, step) in strategy.steps.iter().enumerate() {
        let id = step.id_at(i);
        if !seen.insert(id.clone()) {
            errors.push(ValidationError::DuplicateStepId { step_id: id });
        }
    }

    errors
}

/// Check per-step fields: protocol, asset, amount and risk score.
pub fn check_fields(strategy: &Strategy) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (i, step) in strategy.steps.iter().enumerate() {
        let step_id = step.id_at(i);

        if step.protocol.trim().is_empty() {
            errors.push(ValidationError::MissingProtocol {
                step_id: step_id.clone(),
            });
        }
        if step.asset.trim().is_empty() {
            errors.push(ValidationError::MissingAsset {
                step_id: step_id.clone(),
            });
        }
        if let Some(amount) = &step.amount {
            if !is_positive_decimal(amount) {
                errors.push(ValidationError::InvalidAmount {
                    step_id: step_id.clone(),
                    amount: amount.clone(),
                });
            }
        }
        if let Some(value) = step.risk_score {
            if !(0.0..=10.0).contains(&value) {
                errors.push(ValidationError::RiskScoreOutOfRange { step_id, value });
            }
        }
    }

    errors
}
