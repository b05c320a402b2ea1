use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::model::Strategy;

use super::ValidationError;

/// Check step dependencies against declaration order.
///
/// Steps run strictly in the order they are declared, so a dependency must
/// name a step that appears earlier. Cycles are reported once, separately
/// from the per-edge ordering errors.
pub fn check_dependencies(strategy: &Strategy) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut graph = DiGraph::<String, ()>::new();
    let mut index_map: HashMap<String, (NodeIndex, usize)> = HashMap::new();

    for (i, step) in strategy.steps.iter().enumerate() {
        let id = step.id_at(i);
        let idx = graph.add_node(id.clone());
        // Duplicate ids are reported by steps.rs; keep the first position.
        index_map.entry(id).or_insert((idx, i));
    }

    for (i, step) in strategy.steps.iter().enumerate() {
        let step_id = step.id_at(i);
        let Some(&(to_idx, _)) = index_map.get(&step_id) else {
            continue;
        };

        for dep in &step.dependencies {
            match index_map.get(dep) {
                None => errors.push(ValidationError::UnknownDependency {
                    step_id: step_id.clone(),
                    dependency: dep.clone(),
                }),
                Some(&(from_idx, position)) => {
                    if position >= i {
                        errors.push(ValidationError::DependencyOutOfOrder {
                            step_id: step_id.clone(),
                            dependency: dep.clone(),
                        });
                    }
                    graph.add_edge(from_idx, to_idx, ());
                }
            }
        }
    }

    if is_cyclic_directed(&graph) {
        errors.push(ValidationError::DependencyCycle);
    }

    errors
}
