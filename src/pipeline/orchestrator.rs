//! Async run orchestration.
//!
//! A run decodes and extracts on blocking worker tasks, then evaluates
//! compliance and prices the plan graph concurrently. The orchestrator is the
//! only writer of a run's status. Cancellation is checked between stages and
//! raced against every worker task; an abandoned task's output is dropped.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::{self, JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::report::{ReliabilityReport, RunOutcome, RunRequest, RunResult};
use super::sink::{LogProgress, ProgressSink, ResultSink};
use super::stage::{ProgressEvent, Stage};
use crate::error::{Diagnostic, Error, Result};
use crate::model::{Estimate, PlanGraph};
use crate::parser::QuantityExtractor;
use crate::pricing::{PricingEngine, RegionalFactorResolver};
use crate::rules::{ComplianceReport, RuleEngine};

/// Runs plan sets through extraction, compliance and pricing.
#[derive(Clone)]
pub struct Pipeline {
    extractor: QuantityExtractor,
    rules: RuleEngine,
    resolver: RegionalFactorResolver,
    pricing: PricingEngine,
    progress: Arc<dyn ProgressSink>,
    results: Option<Arc<dyn ResultSink>>,
}

/// A run started with [`Pipeline::spawn`].
pub struct RunHandle {
    pub run_id: Uuid,
    status: watch::Receiver<ProgressEvent>,
    cancel: CancellationToken,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Latest progress event.
    pub fn status(&self) -> ProgressEvent {
        self.status.borrow().clone()
    }

    /// A receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<ProgressEvent> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> RunOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("[{}] run task failed: {}", self.run_id, e);
                RunOutcome {
                    run_id: self.run_id,
                    status: Stage::Error,
                    stage: self.status.borrow().stage,
                    result: None,
                    plan_graph: None,
                    error: Some(Error::RunFatal(e.to_string()).to_string()),
                    diagnostics: vec![],
                    reliability: ReliabilityReport::default(),
                }
            }
        }
    }
}

/// Single writer of a run's progress.
struct Tracker {
    run_id: Uuid,
    stage: Stage,
    percent: u8,
    progress: Arc<dyn ProgressSink>,
    status: Option<watch::Sender<ProgressEvent>>,
}

impl Tracker {
    fn advance(&mut self, stage: Stage, message: impl Into<String>) {
        if let Some(percent) = stage.percent() {
            self.percent = percent;
        }
        if !stage.is_terminal() {
            self.stage = stage;
        }
        let event = ProgressEvent::new(self.run_id, stage, self.percent, message);
        self.progress.emit(&event);
        if let Some(status) = &self.status {
            status.send_replace(event);
        }
    }
}

/// Results kept when a run stops early.
#[derive(Default)]
struct Partial {
    plan_graph: Option<Arc<PlanGraph>>,
    compliance: Option<ComplianceReport>,
    estimate: Option<Estimate>,
}

impl Partial {
    fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut all = Vec::new();
        if let Some(graph) = &self.plan_graph {
            all.extend(graph.document_errors.iter().cloned());
        }
        if let Some(compliance) = &self.compliance {
            all.extend(compliance.errors.iter().cloned());
        }
        if let Some(estimate) = &self.estimate {
            all.extend(estimate.diagnostics.iter().cloned());
        }
        all
    }

    fn take_graph(&mut self) -> Option<PlanGraph> {
        self.plan_graph
            .take()
            .map(|g| Arc::try_unwrap(g).unwrap_or_else(|shared| (*shared).clone()))
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Await a worker task unless the run is cancelled first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    task: impl Future<Output = std::result::Result<T, JoinError>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        joined = task => joined.map_err(|e| Error::RunFatal(format!("worker task failed: {}", e))),
    }
}

impl Pipeline {
    /// Create a pipeline with built-in reference data that logs progress.
    pub fn new() -> Self {
        Self {
            extractor: QuantityExtractor::default(),
            rules: RuleEngine::default(),
            resolver: RegionalFactorResolver::default(),
            pricing: PricingEngine::default(),
            progress: Arc::new(LogProgress),
            results: None,
        }
    }

    pub fn with_extractor(mut self, extractor: QuantityExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_rule_engine(mut self, rules: RuleEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_resolver(mut self, resolver: RegionalFactorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_pricing_engine(mut self, pricing: PricingEngine) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Deliver completed results to a sink. Delivery failure fails the run.
    pub fn with_result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.results = Some(sink);
        self
    }

    /// Run to completion, cancellation or failure.
    pub async fn run(&self, request: RunRequest, cancel: CancellationToken) -> RunOutcome {
        self.execute(Uuid::new_v4(), request, cancel, None).await
    }

    /// Start a run on the current tokio runtime.
    pub fn spawn(&self, request: RunRequest) -> RunHandle {
        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(ProgressEvent::new(run_id, Stage::Queued, 0, "queued"));

        let pipeline = self.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move { pipeline.execute(run_id, request, token, Some(tx)).await });

        RunHandle {
            run_id,
            status: rx,
            cancel,
            join,
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        request: RunRequest,
        cancel: CancellationToken,
        status: Option<watch::Sender<ProgressEvent>>,
    ) -> RunOutcome {
        let mut tracker = Tracker {
            run_id,
            stage: Stage::Queued,
            percent: 0,
            progress: Arc::clone(&self.progress),
            status,
        };
        tracker.advance(
            Stage::Queued,
            format!("{} documents queued", request.documents.len()),
        );

        let mut partial = Partial::default();
        match self.stages(&mut tracker, request, &cancel, &mut partial).await {
            Ok(result) => {
                tracker.advance(
                    Stage::Complete,
                    format!(
                        "{} findings, {} line items, grand total {:.2}",
                        result.compliance.findings.len(),
                        result.estimate.line_items.len(),
                        result.estimate.summary.grand_total
                    ),
                );
                let mut diagnostics = result.plan_graph.document_errors.clone();
                diagnostics.extend(result.compliance.errors.iter().cloned());
                diagnostics.extend(result.estimate.diagnostics.iter().cloned());
                RunOutcome {
                    run_id,
                    status: Stage::Complete,
                    stage: tracker.stage,
                    reliability: result.reliability.clone(),
                    result: Some(result),
                    plan_graph: None,
                    error: None,
                    diagnostics,
                }
            }
            Err(e) => {
                let status = match e {
                    Error::Cancelled => Stage::Cancelled,
                    _ => Stage::Error,
                };
                tracker.advance(status, e.to_string());
                let diagnostics = partial.diagnostics();
                let reliability = ReliabilityReport::build(
                    partial.plan_graph.as_deref(),
                    partial.compliance.as_ref(),
                    partial.estimate.as_ref(),
                );
                RunOutcome {
                    run_id,
                    status,
                    stage: tracker.stage,
                    result: None,
                    plan_graph: partial.take_graph(),
                    error: Some(e.to_string()),
                    diagnostics,
                    reliability,
                }
            }
        }
    }

    async fn stages(
        &self,
        tracker: &mut Tracker,
        request: RunRequest,
        cancel: &CancellationToken,
        partial: &mut Partial,
    ) -> Result<RunResult> {
        let RunRequest {
            documents,
            jurisdiction,
            location,
            spec_tier,
        } = request;

        check_cancelled(cancel)?;
        tracker.advance(Stage::Parsing, format!("decoding {} documents", documents.len()));
        let extractor = self.extractor.clone();
        let decoded = until_cancelled(
            cancel,
            task::spawn_blocking(move || {
                let decoded = extractor.decode(&documents);
                documents
                    .into_iter()
                    .map(|d| d.name)
                    .zip(decoded)
                    .collect::<Vec<_>>()
            }),
        )
        .await?;

        check_cancelled(cancel)?;
        tracker.advance(Stage::ExtractingQuantities, "building plan graph");
        let extractor = self.extractor.clone();
        let graph = until_cancelled(cancel, task::spawn_blocking(move || extractor.build_graph(decoded))).await?;
        let graph = Arc::new(graph);
        partial.plan_graph = Some(Arc::clone(&graph));

        check_cancelled(cancel)?;
        tracker.advance(
            Stage::ComplianceChecking,
            format!("checking {} sheets against {}", graph.sheets.len(), jurisdiction),
        );
        tracker.advance(
            Stage::Pricing,
            format!("pricing {} quantities at {} tier", graph.quantities.len(), spec_tier),
        );

        let rules = self.rules.clone();
        let rules_graph = Arc::clone(&graph);
        let compliance = task::spawn_blocking(move || rules.evaluate(&rules_graph, &jurisdiction));

        let resolver = self.resolver.clone();
        let pricing = self.pricing.clone();
        let pricing_graph = Arc::clone(&graph);
        let estimate = task::spawn_blocking(move || {
            let (factor, misses) = resolver.resolve(&location);
            let mut estimate = pricing.price_graph(&pricing_graph, &factor, spec_tier);
            estimate.diagnostics.splice(0..0, misses);
            estimate
        });
        drop(graph);

        let joined = until_cancelled(cancel, async {
            Ok::<_, JoinError>(tokio::join!(compliance, estimate))
        })
        .await?;
        let (compliance, estimate) = match joined {
            (Ok(compliance), Ok(estimate)) => (compliance, estimate),
            (compliance, estimate) => {
                // Keep whichever worker finished for the error report.
                let mut failures = Vec::new();
                match compliance {
                    Ok(report) => partial.compliance = Some(report),
                    Err(e) => failures.push(format!("compliance worker failed: {}", e)),
                }
                match estimate {
                    Ok(estimate) => partial.estimate = Some(estimate),
                    Err(e) => failures.push(format!("pricing worker failed: {}", e)),
                }
                return Err(Error::RunFatal(failures.join("; ")));
            }
        };

        check_cancelled(cancel)?;
        tracker.advance(Stage::GeneratingOutputs, "assembling run result");
        let reliability =
            ReliabilityReport::build(partial.plan_graph.as_deref(), Some(&compliance), Some(&estimate));
        let result = RunResult {
            run_id: tracker.run_id,
            plan_graph: partial.take_graph().unwrap_or_default(),
            compliance,
            estimate,
            reliability,
            completed_at: Utc::now(),
        };

        if let Some(sink) = &self.results {
            if let Err(e) = sink.deliver(&result) {
                let RunResult {
                    plan_graph,
                    compliance,
                    estimate,
                    ..
                } = result;
                partial.plan_graph = Some(Arc::new(plan_graph));
                partial.compliance = Some(compliance);
                partial.estimate = Some(estimate);
                return Err(Error::RunFatal(format!("result delivery failed: {}", e)));
            }
        }
        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
