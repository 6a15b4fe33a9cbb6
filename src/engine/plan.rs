//! Plan Computation
//!
//! The plan compares what a program declared against what the checkpoint
//! records, producing one step per resource: `Create` for new URNs, `Update`
//! when declared inputs differ from recorded inputs, `Same` when they match,
//! and `Delete` for recorded resources the program no longer declares.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::StackState;

/// Operation the engine will perform (or performed) on one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOp {
    /// Resource does not exist and will be created
    Create,
    /// Resource exists but declared inputs changed
    Update,
    /// Resource exists with identical inputs
    Same,
    /// Resource is recorded but no longer declared
    Delete,
}

impl std::fmt::Display for StepOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOp::Create => write!(f, "create"),
            StepOp::Update => write!(f, "update"),
            StepOp::Same => write!(f, "same"),
            StepOp::Delete => write!(f, "delete"),
        }
    }
}

/// One planned or executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Resource URN
    pub urn: String,
    /// Provider type token
    pub token: String,
    /// Logical resource name
    pub name: String,
    /// Operation
    pub op: StepOp,
    /// Recorded inputs before the operation, if the resource existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    /// Declared inputs, absent for deletes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

/// Decide the operation for a declared resource against the checkpoint.
pub fn classify(prior: &StackState, urn: &str, inputs: &Value) -> StepOp {
    match prior.resource(urn) {
        None => StepOp::Create,
        Some(record) if &record.inputs == inputs => StepOp::Same,
        Some(_) => StepOp::Update,
    }
}

/// Per-operation resource counts, the JSON summary printed after preview and
/// apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub create: usize,
    pub update: usize,
    pub same: usize,
    pub delete: usize,
}

impl ChangeSummary {
    /// Tally the steps of a finished plan.
    pub fn from_steps(steps: &[PlanStep]) -> Self {
        let mut summary = Self::default();
        for step in steps {
            summary.record(step.op);
        }
        summary
    }

    /// Record one operation.
    pub fn record(&mut self, op: StepOp) {
        match op {
            StepOp::Create => self.create += 1,
            StepOp::Update => self.update += 1,
            StepOp::Same => self.same += 1,
            StepOp::Delete => self.delete += 1,
        }
    }

    /// Total number of resources touched by the plan.
    pub fn total(&self) -> usize {
        self.create + self.update + self.same + self.delete
    }

    /// Whether anything would change.
    pub fn has_changes(&self) -> bool {
        self.create > 0 || self.update > 0 || self.delete > 0
    }

    /// Render as an operation -> count map, omitting zero counts, matching
    /// the shape consumers expect from a change summary.
    pub fn to_map(&self) -> IndexMap<&'static str, usize> {
        let mut map = IndexMap::new();
        for (op, count) in [
            ("create", self.create),
            ("update", self.update),
            ("same", self.same),
            ("delete", self.delete),
        ] {
            if count > 0 {
                map.insert(op, count);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::ResourceRecord;
    use chrono::Utc;
    use serde_json::json;

    fn state_with(urn: &str, inputs: Value) -> StackState {
        let mut state = StackState::new("update-management", "dev");
        state.resources.push(ResourceRecord {
            urn: urn.to_string(),
            token: "azure:network:PublicIpAddress".to_string(),
            name: "dev01".to_string(),
            physical_name: "pip-dev01".to_string(),
            id: "/subscriptions/xxx/pip-dev01".to_string(),
            parent: None,
            inputs,
            outputs: serde_json::Map::new(),
            created_at: Utc::now(),
        });
        state
    }

    #[test]
    fn test_classify_create() {
        let state = StackState::new("update-management", "dev");
        assert_eq!(
            classify(&state, "urn:updraft:dev::a", &json!({"location": "we"})),
            StepOp::Create
        );
    }

    #[test]
    fn test_classify_same_and_update() {
        let urn = "urn:updraft:dev::a";
        let state = state_with(urn, json!({"location": "we"}));

        assert_eq!(classify(&state, urn, &json!({"location": "we"})), StepOp::Same);
        assert_eq!(
            classify(&state, urn, &json!({"location": "ne"})),
            StepOp::Update
        );
    }

    #[test]
    fn test_summary_counts() {
        let steps = vec![
            PlanStep {
                urn: "a".into(),
                token: "t".into(),
                name: "a".into(),
                op: StepOp::Create,
                before: None,
                after: Some(json!({})),
            },
            PlanStep {
                urn: "b".into(),
                token: "t".into(),
                name: "b".into(),
                op: StepOp::Same,
                before: Some(json!({})),
                after: Some(json!({})),
            },
            PlanStep {
                urn: "c".into(),
                token: "t".into(),
                name: "c".into(),
                op: StepOp::Same,
                before: Some(json!({})),
                after: Some(json!({})),
            },
        ];

        let summary = ChangeSummary::from_steps(&steps);
        assert_eq!(summary.create, 1);
        assert_eq!(summary.same, 2);
        assert_eq!(summary.total(), 3);
        assert!(summary.has_changes());

        let map = summary.to_map();
        assert_eq!(map.get("create"), Some(&1));
        assert!(map.get("delete").is_none());
    }

    #[test]
    fn test_summary_no_changes() {
        let mut summary = ChangeSummary::default();
        summary.record(StepOp::Same);
        assert!(!summary.has_changes());
    }
}
