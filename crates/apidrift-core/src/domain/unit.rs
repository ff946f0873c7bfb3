//! Evaluation units: one API change paired with one model.

use uuid::Uuid;

use super::api_change::ApiChange;
use super::model::Model;

/// A single (change, model) pair driven by one repair loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationUnit {
    /// Correlation id for logs. Not part of any output.
    pub id: Uuid,
    pub change: ApiChange,
    pub model: Model,
}

impl EvaluationUnit {
    pub fn new(change: ApiChange, model: Model) -> Self {
        Self {
            id: Uuid::new_v4(),
            change,
            model,
        }
    }

    /// Expand a batch into units: every change crossed with every model,
    /// change-major, in input order.
    pub fn expand(changes: &[ApiChange], models: &[Model]) -> Vec<EvaluationUnit> {
        changes
            .iter()
            .flat_map(|change| {
                models
                    .iter()
                    .map(move |model| EvaluationUnit::new(change.clone(), *model))
            })
            .collect()
    }
}
