//! The deployment state machine.

use super::{DeploymentReport, DeploymentRequest, OutcomeTable};
use crate::config::DeployConfig;
use crate::core::{ResourceReference, StageAction, StageId, StageState};
use crate::descriptor::{DependencyExtractor, Descriptor};
use crate::errors::DeployflowError;
use crate::events::{DeployEvent, EventSink, NoOpEventSink};
use crate::inventory::InventoryChecker;
use crate::observability::SpanTimer;
use crate::pipeline::{plan, DeploymentPlan, PlannedStage, StageCatalog};
use crate::ports::{DeployRequest, DescriptorLoader, ResourceDeployer, ResourceInventory};
use crate::validation::{DescriptorDemand, StageValidator, ValidationResult};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Descriptors loaded for the requested stages.
#[derive(Debug, Default)]
struct LoadedDescriptors {
    by_stage: BTreeMap<StageId, Result<Vec<Descriptor>, DeployflowError>>,
    demand: DescriptorDemand,
}

impl LoadedDescriptors {
    fn failure(&self, stage: &StageId) -> Option<&DeployflowError> {
        self.by_stage.get(stage).and_then(|r| r.as_ref().err())
    }

    fn descriptors(&self, stage: &StageId) -> Vec<Descriptor> {
        match self.by_stage.get(stage) {
            Some(Ok(descriptors)) => descriptors.clone(),
            _ => Vec::new(),
        }
    }
}

/// What one invocation resolves its stages against.
struct RunScope<'a> {
    run_id: Uuid,
    plan: &'a DeploymentPlan,
    loaded: &'a LoadedDescriptors,
    request: &'a DeploymentRequest,
}

/// Runs deployment requests against a stage catalog.
///
/// Each call to [`Orchestrator::run`] owns its own plan and outcome table, so
/// one orchestrator may serve concurrent runs.
pub struct Orchestrator {
    catalog: Arc<StageCatalog>,
    config: DeployConfig,
    deployer: Arc<dyn ResourceDeployer>,
    inventory: InventoryChecker,
    loader: Arc<dyn DescriptorLoader>,
    extractor: DependencyExtractor,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.catalog.ids())
            .field("environment", &self.config.environment)
            .field("resource_group", &self.config.resource_group)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        catalog: Arc<StageCatalog>,
        config: DeployConfig,
        deployer: Arc<dyn ResourceDeployer>,
        inventory: Arc<dyn ResourceInventory>,
        loader: Arc<dyn DescriptorLoader>,
    ) -> Self {
        Self {
            catalog,
            config,
            deployer,
            inventory: InventoryChecker::new(inventory),
            loader,
            extractor: DependencyExtractor::new(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Runs a deployment request to completion.
    ///
    /// Stage failures do not make this return `Err`; they are recorded in the
    /// report and reflected in [`DeploymentReport::exit_code`].
    ///
    /// # Errors
    ///
    /// Returns configuration-time errors ([`DeployflowError::UnknownStage`],
    /// [`DeployflowError::Configuration`]) before any stage is resolved, and
    /// [`DeployflowError::Internal`] on an illegal state transition.
    pub async fn run(&self, request: &DeploymentRequest) -> Result<DeploymentReport, DeployflowError> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "deploy.run",
            %run_id,
            environment = %self.config.environment,
            resource_group = %self.config.resource_group,
        );
        self.run_inner(run_id, request).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, request: &DeploymentRequest) -> Result<DeploymentReport, DeployflowError> {
        let started_at = Utc::now();
        let timer = SpanTimer::start("deploy.run");

        let plan = plan(&request.stages, &self.catalog)?;
        self.check_carried_outcomes(request)?;
        let loaded = self.load_descriptors(request, &plan)?;

        info!(
            requested = ?plan.requested().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "Deployment plan created"
        );
        self.emit(DeployEvent::PlanCreated {
            run_id,
            stages: plan.entries().iter().map(|e| (e.stage.clone(), e.action)).collect(),
        })
        .await;

        let mut outcomes = OutcomeTable::from_plan(&plan);
        self.seed_carried_outcomes(request, &plan, &mut outcomes).await?;

        let validator = StageValidator::new(&self.catalog, &loaded.demand);
        let scope = RunScope {
            run_id,
            plan: &plan,
            loaded: &loaded,
            request,
        };
        for entry in plan.entries() {
            if outcomes.state(entry.stage.as_str()).is_some_and(|s| s.is_terminal()) {
                continue;
            }
            let span = info_span!("deploy.stage", stage = %entry.stage, action = %entry.action);
            self.resolve_stage(entry, &scope, &validator, &mut outcomes)
                .instrument(span)
                .await?;
        }

        if !outcomes.all_terminal() {
            return Err(DeployflowError::Internal(
                "deployment finished with unresolved stages".to_string(),
            ));
        }

        let report = DeploymentReport::from_outcomes(
            run_id,
            self.config.environment,
            started_at,
            timer.finish(),
            &plan,
            &outcomes,
        );

        self.emit(DeployEvent::Completed {
            run_id,
            exit_code: report.exit_code(),
            states: report.stages.iter().map(|s| (s.stage.clone(), s.state)).collect(),
        })
        .await;
        info!(
            exit_code = report.exit_code(),
            duration_ms = report.duration_ms,
            "Deployment finished"
        );

        Ok(report)
    }

    fn check_carried_outcomes(&self, request: &DeploymentRequest) -> Result<(), DeployflowError> {
        for (stage, carried) in &request.carried_outcomes {
            if !self.catalog.contains(stage.as_str()) {
                return Err(DeployflowError::UnknownStage {
                    stage: stage.clone(),
                    declared: self.catalog.ids().iter().map(ToString::to_string).collect(),
                });
            }
            if !carried.state.is_terminal() {
                return Err(DeployflowError::Configuration(format!(
                    "carried outcome for stage '{stage}' must be terminal, got {}",
                    carried.state
                )));
            }
        }
        Ok(())
    }

    async fn seed_carried_outcomes(
        &self,
        request: &DeploymentRequest,
        plan: &DeploymentPlan,
        outcomes: &mut OutcomeTable,
    ) -> Result<(), DeployflowError> {
        for entry in plan.entries() {
            let Some(carried) = request.carried_outcomes.get(&entry.stage) else {
                continue;
            };
            if entry.action.is_run() {
                warn!(
                    stage = %entry.stage,
                    state = %carried.state,
                    "Ignoring carried outcome for requested stage; it will be re-run"
                );
                continue;
            }
            if outcomes.state(entry.stage.as_str()) != Some(StageState::Pending) {
                continue;
            }
            // A carried success still has to pass the inventory check.
            if !carried.state.is_blocking() {
                debug!(stage = %entry.stage, state = %carried.state, "Carried outcome deferred until verified");
                continue;
            }

            let error = DeployflowError::PriorAttempt {
                stage: entry.stage.clone(),
                state: carried.state,
                detail: carried.detail.clone(),
            };
            outcomes.seed(&entry.stage, carried.state, Some(error))?;
            info!(stage = %entry.stage, state = %carried.state, "Seeded carried outcome");
            self.cascade(&entry.stage, carried.state, outcomes).await?;
        }
        Ok(())
    }

    fn load_descriptors(
        &self,
        request: &DeploymentRequest,
        plan: &DeploymentPlan,
    ) -> Result<LoadedDescriptors, DeployflowError> {
        let mut loaded = LoadedDescriptors::default();

        for stage in request.descriptors.keys() {
            if !self.catalog.contains(stage.as_str()) {
                return Err(DeployflowError::UnknownStage {
                    stage: stage.clone(),
                    declared: self.catalog.ids().iter().map(ToString::to_string).collect(),
                });
            }
            if !plan.is_requested(stage.as_str()) {
                warn!(stage = %stage, "Ignoring descriptors attached to a stage that is not requested");
            }
        }

        for definition in self.catalog.stages() {
            let stage = &definition.id;
            if !plan.is_requested(stage.as_str()) {
                continue;
            }

            let attached = request.descriptors.get(stage).filter(|paths| !paths.is_empty());
            if !definition.accepts_descriptors {
                if attached.is_some() {
                    warn!(stage = %stage, "Stage does not take descriptors; ignoring them");
                }
                continue;
            }

            let paths: Vec<PathBuf> = match attached {
                Some(paths) => paths.clone(),
                None => self.config.default_agent_descriptor.iter().cloned().collect(),
            };
            if paths.is_empty() {
                continue;
            }

            let result = self.load_stage_descriptors(&paths);
            if let Ok((_, refs)) = &result {
                loaded.demand.insert(stage.clone(), refs.iter().cloned());
            }
            loaded.by_stage.insert(stage.clone(), result.map(|(descriptors, _)| descriptors));
        }

        Ok(loaded)
    }

    fn load_stage_descriptors(
        &self,
        paths: &[PathBuf],
    ) -> Result<(Vec<Descriptor>, Vec<ResourceReference>), DeployflowError> {
        let mut descriptors = Vec::with_capacity(paths.len());
        let mut refs = Vec::new();

        for path in paths {
            let descriptor = self.loader.load(path)?;
            refs.extend(self.extractor.extract(&descriptor)?);
            info!(
                descriptor = %descriptor.name,
                model = %descriptor.model.id,
                tools = descriptor.tools.len(),
                "Loaded descriptor"
            );
            descriptors.push(descriptor);
        }

        Ok((descriptors, refs))
    }

    async fn resolve_stage(
        &self,
        entry: &PlannedStage,
        scope: &RunScope<'_>,
        validator: &StageValidator<'_>,
        outcomes: &mut OutcomeTable,
    ) -> Result<(), DeployflowError> {
        let stage = &entry.stage;
        let timer = SpanTimer::start(format!("deploy.stage.{stage}"));

        if let Some(err) = scope.loaded.failure(stage) {
            self.block(stage, err.clone(), outcomes).await?;
        } else {
            match validator.validate(stage, scope.plan, outcomes, &self.inventory).await {
                ValidationResult::Blocked(reason) => self.block(stage, reason, outcomes).await?,
                ValidationResult::Ready => match entry.action {
                    StageAction::SkipAssumeExisting => {
                        match scope.request.carried_outcomes.get(stage) {
                            Some(carried) => {
                                outcomes.seed(stage, carried.state, None)?;
                                info!(stage = %stage, state = %carried.state, "Carried outcome verified");
                            }
                            None => {
                                outcomes.transition(stage, StageState::Skipped, None)?;
                                info!(stage = %stage, "Stage skipped, resources already present");
                            }
                        }
                        self.emit(DeployEvent::StageSkipped { stage: stage.clone() }).await;
                    }
                    StageAction::Run => {
                        self.execute(stage, scope.run_id, scope.loaded.descriptors(stage), outcomes)
                            .await?;
                    }
                },
            }
        }

        outcomes.set_duration(stage, timer.finish())
    }

    async fn execute(
        &self,
        stage: &StageId,
        run_id: Uuid,
        descriptors: Vec<Descriptor>,
        outcomes: &mut OutcomeTable,
    ) -> Result<(), DeployflowError> {
        let definition = self
            .catalog
            .get(stage.as_str())
            .ok_or_else(|| DeployflowError::Internal(format!("stage '{stage}' missing from catalog")))?;

        outcomes.transition(stage, StageState::Running, None)?;
        let request = DeployRequest {
            stage: stage.clone(),
            deployment_name: self.config.deployment_name(stage.as_str()),
            resource_group: self.config.resource_group.clone(),
            endpoint: self.config.foundry_endpoint.clone(),
            template: definition.template.clone(),
            parameters: definition.parameters.clone(),
            descriptors,
            run_id,
        };

        info!(stage = %stage, deployment_name = %request.deployment_name, "Deploying stage");
        self.emit(DeployEvent::StageStarted {
            stage: stage.clone(),
            deployment_name: request.deployment_name.clone(),
        })
        .await;

        let timer = SpanTimer::start(request.deployment_name.clone());
        let result = self.deployer.deploy(&request).await;
        let duration_ms = timer.finish();

        match result {
            Ok(handle) => {
                outcomes.transition(stage, StageState::Succeeded, None)?;
                info!(stage = %stage, resource_id = %handle.id, duration_ms, "Stage succeeded");
                outcomes.set_handle(stage, handle)?;
                self.emit(DeployEvent::StageSucceeded {
                    stage: stage.clone(),
                    duration_ms,
                })
                .await;
            }
            Err(source) => {
                let err = DeployflowError::DeployFailed {
                    stage: stage.clone(),
                    source,
                };
                error!(stage = %stage, error = %err, duration_ms, "Stage failed");
                outcomes.transition(stage, StageState::Failed, Some(err.clone()))?;
                self.emit(DeployEvent::StageFailed {
                    stage: stage.clone(),
                    error: err,
                })
                .await;
                self.cascade(stage, StageState::Failed, outcomes).await?;
            }
        }

        Ok(())
    }

    /// Marks every pending transitive dependent of `root` as blocked.
    async fn cascade(&self, root: &StageId, state: StageState, outcomes: &mut OutcomeTable) -> Result<(), DeployflowError> {
        for dependent in self.catalog.transitive_dependents(root) {
            if outcomes.state(dependent.as_str()) != Some(StageState::Pending) {
                continue;
            }
            let reason = DeployflowError::UpstreamFailed {
                stage: dependent.clone(),
                upstream: root.clone(),
                state,
            };
            self.block(&dependent, reason, outcomes).await?;
        }
        Ok(())
    }

    async fn block(&self, stage: &StageId, reason: DeployflowError, outcomes: &mut OutcomeTable) -> Result<(), DeployflowError> {
        warn!(stage = %stage, reason = %reason, "Stage blocked");
        outcomes.transition(stage, StageState::SkippedDependencyMissing, Some(reason.clone()))?;
        self.emit(DeployEvent::StageBlocked {
            stage: stage.clone(),
            error: reason,
        })
        .await;
        Ok(())
    }

    async fn emit(&self, event: DeployEvent) {
        event.send(self.event_sink.as_ref()).await;
    }
}
