//! Ordered step chains and the bindings that feed each step.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ktomg_core::ChainId;

use super::contract::Contract;
use super::error::ChainError;
use super::run::RunContext;
use super::step::Step;
use super::{Record, lookup_path};

/// Where a bound input value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSource {
    /// A field of the run's trigger data.
    Trigger { path: String },
    /// A field of an earlier step's completed output.
    Step { step_id: String, path: String },
}

impl VariableSource {
    /// Bind to a trigger data field.
    #[must_use]
    pub fn trigger(path: &str) -> Self {
        Self::Trigger {
            path: path.to_string(),
        }
    }

    /// Bind to an earlier step's output field.
    #[must_use]
    pub fn step(step_id: &str, path: &str) -> Self {
        Self::Step {
            step_id: step_id.to_string(),
            path: path.to_string(),
        }
    }

    fn root_field(&self) -> &str {
        let path = match self {
            Self::Trigger { path } | Self::Step { path, .. } => path,
        };
        path.split('.').next().unwrap_or(path)
    }
}

/// Input field name to source.
pub type Bindings = BTreeMap<String, VariableSource>;

/// A step plus the bindings that project its inputs.
#[derive(Clone)]
pub struct ChainStep {
    step: Arc<dyn Step>,
    bindings: Bindings,
}

impl ChainStep {
    /// The step itself.
    #[must_use]
    pub fn step(&self) -> &dyn Step {
        self.step.as_ref()
    }

    /// Step id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.step.id()
    }

    /// Input bindings.
    #[must_use]
    pub const fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

impl std::fmt::Debug for ChainStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainStep")
            .field("id", &self.step.id())
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// A validated, immutable linear chain of steps.
#[derive(Debug)]
pub struct Chain {
    id: ChainId,
    trigger_contract: Contract,
    steps: Vec<ChainStep>,
}

impl Chain {
    /// Start building a chain.
    #[must_use]
    pub fn builder(id: impl Into<ChainId>, trigger_contract: Contract) -> ChainBuilder {
        ChainBuilder {
            id: id.into(),
            trigger_contract,
            steps: Vec::new(),
        }
    }

    /// Chain id.
    #[must_use]
    pub const fn id(&self) -> &ChainId {
        &self.id
    }

    /// Contract trigger data must satisfy.
    #[must_use]
    pub const fn trigger_contract(&self) -> &Contract {
        &self.trigger_contract
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps (never true for a committed chain).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&ChainStep> {
        self.steps.get(index)
    }

    /// Index of the step with `step_id`.
    #[must_use]
    pub fn position(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|entry| entry.id() == step_id)
    }

    /// Step ids in execution order.
    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(ChainStep::id)
    }

    /// Project the inputs of the step at `index` from the run context.
    ///
    /// Unresolvable bindings are left out; the step's input contract decides
    /// whether that is acceptable.
    pub(crate) fn project_inputs(&self, index: usize, context: &RunContext) -> Record {
        let mut inputs = Record::new();
        let Some(entry) = self.steps.get(index) else {
            return inputs;
        };

        for (target, source) in &entry.bindings {
            let value = match source {
                VariableSource::Trigger { path } => lookup_path(&context.trigger_data, path),
                VariableSource::Step { step_id, path } => context
                    .output(step_id)
                    .and_then(|output| lookup_path(output, path)),
            };
            if let Some(value) = value {
                inputs.insert(target.clone(), value.clone());
            }
        }

        inputs
    }
}

/// Builder for [`Chain`]; validation happens in [`ChainBuilder::commit`].
pub struct ChainBuilder {
    id: ChainId,
    trigger_contract: Contract,
    steps: Vec<ChainStep>,
}

impl ChainBuilder {
    /// Append a step that takes no bound inputs.
    #[must_use]
    pub fn step(self, step: impl Step + 'static) -> Self {
        self.then(step, Bindings::new())
    }

    /// Append a step whose inputs are bound from the trigger or earlier steps.
    #[must_use]
    pub fn then(mut self, step: impl Step + 'static, bindings: Bindings) -> Self {
        self.steps.push(ChainStep {
            step: Arc::new(step),
            bindings,
        });
        self
    }

    /// Validate and freeze the chain.
    ///
    /// # Errors
    ///
    /// Returns `ChainError` if the chain is empty, step ids repeat, or any
    /// binding points at a step that does not run earlier, at a field the
    /// source does not declare, or at an input the step does not declare.
    pub fn commit(self) -> Result<Chain, ChainError> {
        if self.steps.is_empty() {
            return Err(ChainError::Empty(self.id.to_string()));
        }

        let mut seen = HashSet::new();
        for entry in &self.steps {
            if !seen.insert(entry.id()) {
                return Err(ChainError::DuplicateStep(entry.id().to_string()));
            }
        }

        for (index, entry) in self.steps.iter().enumerate() {
            for (target, source) in &entry.bindings {
                if !entry.step().input_contract().has_field(target) {
                    return Err(ChainError::UnknownTarget {
                        step: entry.id().to_string(),
                        target: target.clone(),
                    });
                }

                let (source_name, contract) = match source {
                    VariableSource::Trigger { .. } => {
                        ("trigger".to_string(), &self.trigger_contract)
                    }
                    VariableSource::Step { step_id, .. } => {
                        let (position, source_entry) = self
                            .steps
                            .iter()
                            .enumerate()
                            .find(|(_, other)| other.id() == step_id)
                            .ok_or_else(|| ChainError::UnknownSource {
                                step: entry.id().to_string(),
                                target: target.clone(),
                                source_step: step_id.clone(),
                            })?;
                        if position >= index {
                            return Err(ChainError::ForwardReference {
                                step: entry.id().to_string(),
                                target: target.clone(),
                                source_step: step_id.clone(),
                            });
                        }
                        (
                            format!("step {step_id}"),
                            source_entry.step().output_contract(),
                        )
                    }
                };

                let field = source.root_field();
                if !contract.has_field(field) {
                    return Err(ChainError::UnknownField {
                        step: entry.id().to_string(),
                        target: target.clone(),
                        source_name,
                        field: field.to_string(),
                    });
                }
            }
        }

        Ok(Chain {
            id: self.id,
            trigger_contract: self.trigger_contract,
            steps: self.steps,
        })
    }
}
