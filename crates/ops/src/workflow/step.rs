//! The unit of work inside a chain.

use async_trait::async_trait;
use ktomg_core::RunId;
use serde_json::Value;
use thiserror::Error;

use super::Record;
use super::contract::Contract;

/// What a step decided.
///
/// The engine never infers suspension from the shape of the output; the step
/// says so explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The step finished; the record must satisfy its output contract.
    Completed(Record),
    /// The step needs external input; the record describes what is needed.
    Suspended(Record),
}

/// Everything a step can see while executing.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Run being driven.
    pub run_id: RunId,
    /// Trigger data the run was created with.
    pub trigger_data: Record,
    /// Inputs projected through the step's bindings, overlaid with resume data.
    pub inputs: Record,
    /// Resume data, present only when this execution is a resume.
    pub input_data: Option<Record>,
}

impl StepContext {
    /// String field from the trigger data.
    #[must_use]
    pub fn trigger_str(&self, key: &str) -> Option<&str> {
        self.trigger_data.get(key).and_then(Value::as_str)
    }

    /// String field from the projected inputs.
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(Value::as_str)
    }

    /// Non-empty string field from the resume data.
    #[must_use]
    pub fn resume_str(&self, key: &str) -> Option<&str> {
        self.input_data
            .as_ref()
            .and_then(|data| data.get(key))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// A step's own failure; the engine marks the run `Failed` and never retries.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StepError(String);

impl StepError {
    /// Create a step error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A named unit of work with typed input and output contracts.
///
/// Implementations must be immutable once registered; per-run state lives in
/// the [`StepContext`], never in the step.
#[async_trait]
pub trait Step: Send + Sync {
    /// Identifier, unique within its chain.
    fn id(&self) -> &str;

    /// Fields the step expects in [`StepContext::inputs`].
    fn input_contract(&self) -> &Contract;

    /// Fields the step promises in a completed output.
    fn output_contract(&self) -> &Contract;

    /// Run the step once.
    async fn execute(&self, ctx: &StepContext) -> Result<Outcome, StepError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_resume_str_ignores_empty_values() {
        let ctx = StepContext {
            run_id: RunId::new(),
            trigger_data: Record::new(),
            inputs: Record::new(),
            input_data: json!({"approvedVmId": "", "note": "ok"}).as_object().cloned(),
        };
        assert_eq!(ctx.resume_str("approvedVmId"), None);
        assert_eq!(ctx.resume_str("note"), Some("ok"));
        assert_eq!(ctx.resume_str("missing"), None);
    }
}
