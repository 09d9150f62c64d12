//! Run lifecycle: create, start, suspend, resume.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ktomg_core::{ChainId, RunId, RunStatus};
use tracing::{debug, info, instrument, warn};

use super::Record;
use super::chain::Chain;
use super::error::WorkflowError;
use super::run::{RunResult, RunState, StepRecord, Suspension};
use super::step::{Outcome, StepContext};
use super::store::RunStore;

/// Default time a run is retained after creation.
const DEFAULT_RETENTION: Duration = Duration::from_secs(86_400);

/// Owns registered chains and the runs created from them.
///
/// Cheap to clone; all clones share the same chains and run store.
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    chains: HashMap<ChainId, Arc<Chain>>,
    store: RunStore,
}

/// Builder for [`WorkflowEngine`].
pub struct WorkflowEngineBuilder {
    chains: HashMap<ChainId, Arc<Chain>>,
    retention: Duration,
}

impl WorkflowEngineBuilder {
    /// Register a committed chain under its id.
    #[must_use]
    pub fn register(mut self, chain: Chain) -> Self {
        self.chains.insert(chain.id().clone(), Arc::new(chain));
        self
    }

    /// How long runs are kept after creation.
    #[must_use]
    pub const fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> WorkflowEngine {
        WorkflowEngine {
            inner: Arc::new(EngineInner {
                chains: self.chains,
                store: RunStore::new(self.retention),
            }),
        }
    }
}

impl WorkflowEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder() -> WorkflowEngineBuilder {
        WorkflowEngineBuilder {
            chains: HashMap::new(),
            retention: DEFAULT_RETENTION,
        }
    }

    /// Look up a registered chain.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChain` if nothing is registered under `chain_id`.
    pub fn chain(&self, chain_id: &ChainId) -> Result<Arc<Chain>, WorkflowError> {
        self.inner
            .chains
            .get(chain_id)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownChain(chain_id.to_string()))
    }

    /// The run store backing this engine.
    #[must_use]
    pub fn store(&self) -> &RunStore {
        &self.inner.store
    }

    /// Create a run in the `Running` state at the first step.
    ///
    /// # Errors
    ///
    /// Returns `UnknownChain` for an unregistered chain, or `Validation` if the
    /// trigger data fails the chain's trigger contract.
    #[instrument(skip(self, trigger_data), fields(chain_id = %chain_id))]
    pub async fn create_run(
        &self,
        chain_id: &ChainId,
        trigger_data: Record,
    ) -> Result<RunState, WorkflowError> {
        let chain = self.chain(chain_id)?;
        chain
            .trigger_contract()
            .validate(&trigger_data)
            .map_err(|violation| WorkflowError::Validation {
                target: "trigger".to_string(),
                reason: violation.to_string(),
            })?;

        let run = RunState::new(chain_id.clone(), trigger_data);
        info!(run_id = %run.run_id, "Workflow run created");
        self.inner.store.insert(run.clone()).await;
        Ok(run)
    }

    /// Execute a freshly created run until it suspends, completes or fails.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun` if the run is missing or expired, `AlreadyStarted`
    /// if any step has already executed, and `Validation` or
    /// `StepExecution` if a step cannot run or fails.
    #[instrument(skip(self), fields(run_id = %run_id))]
    pub async fn start(&self, run_id: &RunId) -> Result<RunResult, WorkflowError> {
        let handle = self
            .inner
            .store
            .get(run_id)
            .await
            .ok_or(WorkflowError::UnknownRun(*run_id))?;
        let mut run = handle.lock().await;

        if run.status != RunStatus::Running || !run.context.steps.is_empty() {
            return Err(WorkflowError::AlreadyStarted {
                run_id: *run_id,
                status: run.status,
            });
        }

        let chain = self.chain(&run.chain_id)?;
        drive(&chain, &mut run, None).await
    }

    /// Resume a run suspended at `step_id` with externally supplied data.
    ///
    /// The suspended step is executed again with `resume_data` as its
    /// `input_data`, then the chain continues. The run stays locked for the
    /// whole call, so a concurrent resume of the same run waits and then sees
    /// that it is no longer suspended.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun` if the run is missing or expired,
    /// `InvalidResumeTarget` if it is not suspended at `step_id`, and
    /// `Validation` or `StepExecution` if a step cannot run or fails. A
    /// `Validation` error on the resumed step leaves the run suspended; one
    /// on a later step leaves it running at that step.
    #[instrument(skip(self, resume_data), fields(run_id = %run_id, step_id = %step_id))]
    pub async fn resume(
        &self,
        run_id: &RunId,
        step_id: &str,
        resume_data: Record,
    ) -> Result<RunResult, WorkflowError> {
        let handle = self
            .inner
            .store
            .get(run_id)
            .await
            .ok_or(WorkflowError::UnknownRun(*run_id))?;
        let mut run = handle.lock().await;

        match run.suspended_step() {
            Some(suspended) if suspended == step_id => {}
            Some(suspended) => {
                return Err(WorkflowError::InvalidResumeTarget {
                    run_id: *run_id,
                    step_id: step_id.to_string(),
                    reason: format!("run is suspended at step {suspended}"),
                });
            }
            None => {
                return Err(WorkflowError::InvalidResumeTarget {
                    run_id: *run_id,
                    step_id: step_id.to_string(),
                    reason: format!("run is {}", run.status),
                });
            }
        }

        let chain = self.chain(&run.chain_id)?;
        let suspension = run.suspension.take();
        run.status = RunStatus::Running;
        run.touch();
        info!("Resuming workflow run");

        let result = drive(&chain, &mut run, Some(resume_data)).await;

        let resumed_step_rejected = matches!(
            run.context.steps.get(step_id),
            Some(StepRecord::Suspended { .. })
        );
        if matches!(result, Err(WorkflowError::Validation { .. })) && resumed_step_rejected {
            warn!("Resume data rejected, run stays suspended");
            run.status = RunStatus::Suspended;
            run.suspension = suspension;
            run.touch();
        }

        result
    }

    /// Snapshot of a run.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRun` if the run is missing or expired.
    pub async fn run(&self, run_id: &RunId) -> Result<RunState, WorkflowError> {
        self.inner
            .store
            .snapshot(run_id)
            .await
            .ok_or(WorkflowError::UnknownRun(*run_id))
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chains: Vec<_> = self.inner.chains.keys().map(ChainId::as_str).collect();
        chains.sort_unstable();
        f.debug_struct("WorkflowEngine")
            .field("chains", &chains)
            .field("store", &self.inner.store)
            .finish()
    }
}

/// Execute steps from `run.current_step_index` until the run suspends,
/// completes or fails. `resume` is handed to the first executed step only.
async fn drive(
    chain: &Chain,
    run: &mut RunState,
    mut resume: Option<Record>,
) -> Result<RunResult, WorkflowError> {
    while let Some(entry) = chain.step(run.current_step_index) {
        let step_id = entry.id().to_string();
        let input_data = resume.take();

        let mut inputs = chain.project_inputs(run.current_step_index, &run.context);
        if let Some(data) = &input_data {
            inputs.extend(data.iter().map(|(key, value)| (key.clone(), value.clone())));
        }

        // A rejected input leaves the run where it is: no record, no status change
        if let Err(violation) = entry.step().input_contract().validate(&inputs) {
            warn!(step_id = %step_id, reason = %violation, "Step input rejected");
            return Err(WorkflowError::Validation {
                target: format!("step {step_id}"),
                reason: violation.to_string(),
            });
        }

        if let Some(data) = &input_data {
            run.context.resume_data.insert(step_id.clone(), data.clone());
        }

        let ctx = StepContext {
            run_id: run.run_id,
            trigger_data: run.context.trigger_data.clone(),
            inputs,
            input_data,
        };

        debug!(step_id = %step_id, "Executing step");
        match entry.step().execute(&ctx).await {
            Ok(Outcome::Completed(output)) => {
                if let Err(violation) = entry.step().output_contract().validate(&output) {
                    let message = format!("output rejected: {violation}");
                    fail(run, &step_id, message.clone());
                    return Err(WorkflowError::StepExecution {
                        run_id: run.run_id,
                        step_id,
                        message,
                    });
                }
                run.context
                    .steps
                    .insert(step_id, StepRecord::Completed { output });
                run.current_step_index += 1;
                run.touch();
            }
            Ok(Outcome::Suspended(payload)) => {
                info!(step_id = %step_id, "Workflow run suspended");
                run.context.steps.insert(
                    step_id.clone(),
                    StepRecord::Suspended {
                        payload: payload.clone(),
                    },
                );
                run.status = RunStatus::Suspended;
                run.suspension = Some(Suspension { step_id, payload });
                run.touch();
                return Ok(RunResult::from_state(run, None));
            }
            Err(err) => {
                let message = err.to_string();
                fail(run, &step_id, message.clone());
                return Err(WorkflowError::StepExecution {
                    run_id: run.run_id,
                    step_id,
                    message,
                });
            }
        }
    }

    run.status = RunStatus::Completed;
    run.touch();
    info!(run_id = %run.run_id, "Workflow run completed");
    Ok(RunResult::from_state(run, chain.step_ids().last()))
}

fn fail(run: &mut RunState, step_id: &str, error: String) {
    warn!(run_id = %run.run_id, step_id, error = %error, "Workflow step failed");
    run.context
        .steps
        .insert(step_id.to_string(), StepRecord::Failed { error });
    run.status = RunStatus::Failed;
    run.touch();
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::workflow::chain::{Bindings, VariableSource};
    use crate::workflow::contract::{Contract, FieldKind};
    use crate::workflow::step::{Step, StepError};

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object")
    }

    /// Copies `value` through and counts executions.
    struct Pass {
        id: &'static str,
        calls: Arc<AtomicUsize>,
        input: Contract,
        output: Contract,
    }

    impl Pass {
        fn new(id: &'static str, calls: &Arc<AtomicUsize>) -> Self {
            Self {
                id,
                calls: Arc::clone(calls),
                input: Contract::new().required("value", FieldKind::String, "value"),
                output: Contract::new().required("value", FieldKind::String, "value"),
            }
        }
    }

    #[async_trait]
    impl Step for Pass {
        fn id(&self) -> &str {
            self.id
        }

        fn input_contract(&self) -> &Contract {
            &self.input
        }

        fn output_contract(&self) -> &Contract {
            &self.output
        }

        async fn execute(&self, ctx: &StepContext) -> Result<Outcome, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Completed(ctx.inputs.clone()))
        }
    }

    /// Suspends until resumed with `approved`.
    struct Gate {
        calls: Arc<AtomicUsize>,
        input: Contract,
        output: Contract,
    }

    impl Gate {
        fn new(calls: &Arc<AtomicUsize>) -> Self {
            Self {
                calls: Arc::clone(calls),
                input: Contract::new()
                    .required("value", FieldKind::String, "value")
                    .optional("approved", FieldKind::String, "approval"),
                output: Contract::new().required("value", FieldKind::String, "value"),
            }
        }
    }

    #[async_trait]
    impl Step for Gate {
        fn id(&self) -> &str {
            "gate"
        }

        fn input_contract(&self) -> &Contract {
            &self.input
        }

        fn output_contract(&self) -> &Contract {
            &self.output
        }

        async fn execute(&self, ctx: &StepContext) -> Result<Outcome, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match ctx.resume_str("approved") {
                Some(approved) => Ok(Outcome::Completed(record(json!({"value": approved})))),
                None => Ok(Outcome::Suspended(record(json!({"message": "approve?"})))),
            }
        }
    }

    struct Broken {
        contract: Contract,
    }

    #[async_trait]
    impl Step for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        fn input_contract(&self) -> &Contract {
            &self.contract
        }

        fn output_contract(&self) -> &Contract {
            &self.contract
        }

        async fn execute(&self, _ctx: &StepContext) -> Result<Outcome, StepError> {
            Err(StepError::new("boom"))
        }
    }

    fn trigger_contract() -> Contract {
        Contract::new().required("value", FieldKind::String, "seed")
    }

    fn from_trigger() -> Bindings {
        Bindings::from([("value".to_string(), VariableSource::trigger("value"))])
    }

    fn from_step(step_id: &str) -> Bindings {
        Bindings::from([("value".to_string(), VariableSource::step(step_id, "value"))])
    }

    struct Counters {
        first: Arc<AtomicUsize>,
        gate: Arc<AtomicUsize>,
        last: Arc<AtomicUsize>,
    }

    /// Chain [first, gate, last].
    fn gated_engine() -> (WorkflowEngine, Counters) {
        let counters = Counters {
            first: Arc::new(AtomicUsize::new(0)),
            gate: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(AtomicUsize::new(0)),
        };
        let chain = Chain::builder("gated", trigger_contract())
            .then(Pass::new("first", &counters.first), from_trigger())
            .then(Gate::new(&counters.gate), from_step("first"))
            .then(Pass::new("last", &counters.last), from_step("gate"))
            .commit()
            .expect("chain");
        (WorkflowEngine::builder().register(chain).build(), counters)
    }

    async fn start_gated(engine: &WorkflowEngine) -> RunId {
        let run = engine
            .create_run(&ChainId::from("gated"), record(json!({"value": "seed"})))
            .await
            .expect("create");
        let result = engine.start(&run.run_id).await.expect("start");
        assert!(result.is_suspended());
        run.run_id
    }

    #[tokio::test]
    async fn test_chain_without_suspension_completes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = Chain::builder("linear", trigger_contract())
            .then(Pass::new("a", &calls), from_trigger())
            .then(Pass::new("b", &calls), from_step("a"))
            .then(Pass::new("c", &calls), from_step("b"))
            .commit()
            .expect("chain");
        let engine = WorkflowEngine::builder().register(chain).build();

        let run = engine
            .create_run(&ChainId::from("linear"), record(json!({"value": "x"})))
            .await
            .expect("create");
        let result = engine.start(&run.run_id).await.expect("start");

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.results.len(), 3);
        assert!(
            result
                .results
                .values()
                .all(|step| matches!(step, StepRecord::Completed { .. }))
        );
        assert_eq!(result.output, Some(record(json!({"value": "x"}))));
    }

    #[tokio::test]
    async fn test_suspend_then_resume_continues_from_suspended_step() {
        let (engine, counters) = gated_engine();
        let run_id = start_gated(&engine).await;

        let snapshot = engine.run(&run_id).await.expect("snapshot");
        assert_eq!(snapshot.status, RunStatus::Suspended);
        assert_eq!(snapshot.suspended_step(), Some("gate"));
        assert!(!snapshot.context.steps.contains_key("last"));
        assert_eq!(counters.last.load(Ordering::SeqCst), 0);

        let result = engine
            .resume(&run_id, "gate", record(json!({"approved": "yes"})))
            .await
            .expect("resume");

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.output, Some(record(json!({"value": "yes"}))));
        assert_eq!(counters.first.load(Ordering::SeqCst), 1);
        assert_eq!(counters.gate.load(Ordering::SeqCst), 2);
        assert_eq!(counters.last.load(Ordering::SeqCst), 1);

        let snapshot = engine.run(&run_id).await.expect("snapshot");
        assert_eq!(
            snapshot.context.resume_data.get("gate"),
            Some(&record(json!({"approved": "yes"})))
        );
        assert!(snapshot.suspension.is_none());
    }

    #[tokio::test]
    async fn test_second_resume_is_rejected() {
        let (engine, counters) = gated_engine();
        let run_id = start_gated(&engine).await;

        engine
            .resume(&run_id, "gate", record(json!({"approved": "yes"})))
            .await
            .expect("first resume");
        let err = engine
            .resume(&run_id, "gate", record(json!({"approved": "yes"})))
            .await
            .expect_err("second resume");

        assert!(matches!(err, WorkflowError::InvalidResumeTarget { .. }));
        assert_eq!(counters.last.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resumes_run_once() {
        let (engine, counters) = gated_engine();
        let run_id = start_gated(&engine).await;

        let data = record(json!({"approved": "yes"}));
        let (a, b) = tokio::join!(
            engine.resume(&run_id, "gate", data.clone()),
            engine.resume(&run_id, "gate", data),
        );

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        let loser = a.err().or_else(|| b.err()).expect("one resume fails");
        assert!(matches!(loser, WorkflowError::InvalidResumeTarget { .. }));
        assert_eq!(counters.last.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resume_at_wrong_step() {
        let (engine, _) = gated_engine();
        let run_id = start_gated(&engine).await;

        let err = engine
            .resume(&run_id, "last", Record::new())
            .await
            .expect_err("wrong step");
        assert!(
            matches!(err, WorkflowError::InvalidResumeTarget { ref reason, .. } if reason.contains("gate"))
        );
    }

    #[tokio::test]
    async fn test_resume_without_approval_suspends_again() {
        let (engine, counters) = gated_engine();
        let run_id = start_gated(&engine).await;

        let result = engine
            .resume(&run_id, "gate", Record::new())
            .await
            .expect("resume");

        assert!(result.is_suspended());
        assert_eq!(result.suspended_at("gate"), Some(&record(json!({"message": "approve?"}))));
        assert_eq!(counters.gate.load(Ordering::SeqCst), 2);
        assert_eq!(counters.last.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_resume_data_keeps_run_suspended() {
        let (engine, counters) = gated_engine();
        let run_id = start_gated(&engine).await;

        let err = engine
            .resume(&run_id, "gate", record(json!({"approved": 42})))
            .await
            .expect_err("invalid data");
        assert!(matches!(err, WorkflowError::Validation { .. }));
        assert_eq!(counters.gate.load(Ordering::SeqCst), 1);

        let snapshot = engine.run(&run_id).await.expect("snapshot");
        assert_eq!(snapshot.suspended_step(), Some("gate"));

        engine
            .resume(&run_id, "gate", record(json!({"approved": "ok"})))
            .await
            .expect("valid resume");
    }

    #[tokio::test]
    async fn test_create_run_errors() {
        let (engine, _) = gated_engine();

        let err = engine
            .create_run(&ChainId::from("missing"), Record::new())
            .await
            .expect_err("unknown chain");
        assert!(matches!(err, WorkflowError::UnknownChain(id) if id == "missing"));

        let err = engine
            .create_run(&ChainId::from("gated"), record(json!({"value": 1})))
            .await
            .expect_err("bad trigger");
        assert!(matches!(err, WorkflowError::Validation { ref target, .. } if target == "trigger"));
        assert!(engine.store().is_empty());
    }

    #[tokio::test]
    async fn test_step_error_fails_run() {
        let chain = Chain::builder("broken", Contract::new())
            .step(Broken {
                contract: Contract::new(),
            })
            .commit()
            .expect("chain");
        let engine = WorkflowEngine::builder().register(chain).build();

        let run = engine
            .create_run(&ChainId::from("broken"), Record::new())
            .await
            .expect("create");
        let err = engine.start(&run.run_id).await.expect_err("step fails");
        assert!(
            matches!(err, WorkflowError::StepExecution { ref step_id, ref message, .. } if step_id == "broken" && message == "boom")
        );

        let snapshot = engine.run(&run.run_id).await.expect("snapshot");
        assert_eq!(snapshot.status, RunStatus::Failed);

        let err = engine.start(&run.run_id).await.expect_err("restart");
        assert!(matches!(
            err,
            WorkflowError::AlreadyStarted {
                status: RunStatus::Failed,
                ..
            }
        ));
    }

    /// Declares `value` but never produces it.
    struct Sparse {
        input: Contract,
        output: Contract,
    }

    #[async_trait]
    impl Step for Sparse {
        fn id(&self) -> &str {
            "sparse"
        }

        fn input_contract(&self) -> &Contract {
            &self.input
        }

        fn output_contract(&self) -> &Contract {
            &self.output
        }

        async fn execute(&self, _ctx: &StepContext) -> Result<Outcome, StepError> {
            Ok(Outcome::Completed(Record::new()))
        }
    }

    #[tokio::test]
    async fn test_rejected_step_input_does_not_advance_or_fail_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = Chain::builder("sparse", Contract::new())
            .step(Sparse {
                input: Contract::new(),
                output: Contract::new().optional("value", FieldKind::String, "value"),
            })
            .then(Pass::new("last", &calls), from_step("sparse"))
            .commit()
            .expect("chain");
        let engine = WorkflowEngine::builder().register(chain).build();

        let run = engine
            .create_run(&ChainId::from("sparse"), Record::new())
            .await
            .expect("create");
        let err = engine.start(&run.run_id).await.expect_err("last rejects input");
        assert!(
            matches!(err, WorkflowError::Validation { ref target, .. } if target == "step last")
        );

        let snapshot = engine.run(&run.run_id).await.expect("snapshot");
        assert_eq!(snapshot.status, RunStatus::Running);
        assert_eq!(snapshot.current_step_index, 1);
        assert!(snapshot.context.steps.get("last").is_none());
        assert!(matches!(
            snapshot.context.steps.get("sparse"),
            Some(StepRecord::Completed { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_run_is_unknown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = Chain::builder("short", trigger_contract())
            .then(Gate::new(&calls), from_trigger())
            .commit()
            .expect("chain");
        let engine = WorkflowEngine::builder()
            .register(chain)
            .retention(Duration::from_millis(50))
            .build();

        let run = engine
            .create_run(&ChainId::from("short"), record(json!({"value": "v"})))
            .await
            .expect("create");
        engine.start(&run.run_id).await.expect("start");

        tokio::time::sleep(Duration::from_millis(200)).await;
        let err = engine
            .resume(&run.run_id, "gate", record(json!({"approved": "v"})))
            .await
            .expect_err("expired");
        assert!(matches!(err, WorkflowError::UnknownRun(_)));
    }
}
