//! Batch runner: drives an ordered list of scenes through one
//! [`StageExecutor`], one scene at a time.
//!
//! A scene's failure is recorded on the scene and in the [`StageResult`];
//! it never stops the scenes after it. Cancellation is checked only between
//! scenes, so an in-flight provider call always finishes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rf_core::config::PipelineConfig;
use rf_core::{SceneId, SceneItem, ScenePatch, SceneStore, SkipReason, Stage, StageError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::context::{ProgressReport, ProgressSender};
use crate::executor::{StageExecutor, StageOutput};

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Knobs for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause after each provider call (not after skips or the last scene).
    pub inter_item_delay: Duration,
    /// Count scenes that already carry the stage output as completed without
    /// calling the provider.
    pub skip_if_done: bool,
    /// Upper bound for one provider call.
    pub call_timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            inter_item_delay: Duration::from_secs(1),
            skip_if_done: true,
            call_timeout: None,
        }
    }
}

impl From<&PipelineConfig> for BatchOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            inter_item_delay: config.inter_item_delay(),
            skip_if_done: config.skip_if_done,
            call_timeout: config.call_timeout(),
        }
    }
}

/// One failed scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub scene_id: SceneId,
    /// "Scene N".
    pub label: String,
    pub message: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.message)
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    /// Size of the scene list handed to the runner.
    pub total: usize,
    /// Scenes that carry the stage output, including skipped ones.
    pub completed: usize,
    pub failed: usize,
    /// Already done before the run; included in `completed`.
    pub skipped: usize,
    /// Lacked the inputs for this stage; neither completed nor failed.
    pub ineligible: usize,
    pub failures: Vec<StageFailure>,
    /// Scenes a provider call was made for, in order.
    pub processed: Vec<SceneId>,
    /// The run stopped early on request.
    pub cancelled: bool,
}

impl StageResult {
    /// An empty result for a run over `total` scenes.
    pub fn new(stage: Stage, total: usize) -> Self {
        Self {
            stage,
            total,
            completed: 0,
            failed: 0,
            skipped: 0,
            ineligible: 0,
            failures: Vec::new(),
            processed: Vec::new(),
            cancelled: false,
        }
    }

    /// A stage that never started because an earlier stage was cancelled.
    pub fn not_started(stage: Stage) -> Self {
        Self {
            cancelled: true,
            ..Self::new(stage, 0)
        }
    }

    /// "Scene N: message" strings, in processing order.
    pub fn errors(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    /// Fold a retry of this stage into the running totals.
    ///
    /// Scenes the retry attempted lose their previous failure entry; scenes
    /// outside the retry keep theirs.
    pub fn merge_retry(&mut self, retry: &StageResult) {
        debug_assert_eq!(self.stage, retry.stage);
        self.failures
            .retain(|f| !retry.processed.contains(&f.scene_id));
        self.failures.extend(retry.failures.iter().cloned());
        self.failed = self.failures.len();
        self.completed += retry.completed;
        self.processed.extend(retry.processed.iter().copied());
    }

    fn record_failure(&mut self, scene: &SceneItem, error: &StageError) {
        self.failed += 1;
        self.failures.push(StageFailure {
            scene_id: scene.id,
            label: scene.label(),
            message: error.to_string(),
        });
    }
}

/// What happened to one scene.
enum Outcome {
    AlreadyDone,
    Ineligible,
    /// Deleted from the store mid-run; counted as ineligible.
    Removed { after_call: bool },
    Succeeded,
    Failed(StageError),
}

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Runs scene lists through a single executor.
///
/// The loop is strictly sequential: at most one provider call is in flight
/// per runner, and scenes are processed in the order supplied.
pub struct BatchRunner {
    store: Arc<dyn SceneStore>,
    options: BatchOptions,
    progress: Arc<ProgressSender>,
    cancellation: CancellationToken,
}

impl BatchRunner {
    pub fn new(store: Arc<dyn SceneStore>, options: BatchOptions) -> Self {
        Self {
            store,
            options,
            progress: Arc::new(ProgressSender::noop()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Builder: attach a progress sender.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Run `scenes` through `executor` in order.
    ///
    /// # Errors
    ///
    /// Only store failures are returned; provider failures are recorded in
    /// the result and on the scene.
    pub async fn run(
        &self,
        scenes: &[SceneItem],
        executor: &dyn StageExecutor,
    ) -> rf_core::Result<StageResult> {
        let stage = executor.stage();
        let total = scenes.len();
        let mut result = StageResult::new(stage, total);

        tracing::info!(stage = %stage, total, "Starting batch");

        for (index, scene) in scenes.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                tracing::info!(stage = %stage, processed = index, total, "Batch cancelled");
                result.cancelled = true;
                break;
            }

            let outcome = self.process(scene, executor).await?;
            let called_provider = matches!(
                outcome,
                Outcome::Succeeded | Outcome::Failed(_) | Outcome::Removed { after_call: true }
            );
            match outcome {
                Outcome::AlreadyDone => {
                    result.completed += 1;
                    result.skipped += 1;
                }
                Outcome::Ineligible | Outcome::Removed { .. } => result.ineligible += 1,
                Outcome::Succeeded => {
                    result.completed += 1;
                    result.processed.push(scene.id);
                }
                Outcome::Failed(error) => {
                    result.record_failure(scene, &error);
                    result.processed.push(scene.id);
                }
            }

            let done = index + 1;
            self.progress.send(&ProgressReport {
                stage,
                scene_id: scene.id,
                completed: done,
                total,
                errors: result.errors(),
            });

            if called_provider && done < total {
                self.pause().await;
            }
        }

        tracing::info!(
            stage = %stage,
            completed = result.completed,
            failed = result.failed,
            skipped = result.skipped,
            ineligible = result.ineligible,
            cancelled = result.cancelled,
            "Batch finished"
        );
        Ok(result)
    }

    async fn process(
        &self,
        scene: &SceneItem,
        executor: &dyn StageExecutor,
    ) -> rf_core::Result<Outcome> {
        let stage = executor.stage();

        if self.options.skip_if_done && stage.is_done(scene) {
            tracing::debug!(scene_id = %scene.id, stage = %stage, "Already done; skipping");
            return Ok(Outcome::AlreadyDone);
        }
        if let Err(reason) = stage.check_eligible(scene) {
            log_ineligible(scene, stage, reason);
            return Ok(Outcome::Ineligible);
        }

        if !self.write(scene, ScenePatch::processing()).await? {
            return Ok(Outcome::Removed { after_call: false });
        }

        match self.call(executor, scene).await {
            Ok(output) => {
                let url = output.url().to_string();
                if !self.write(scene, output.into_patch()).await? {
                    return Ok(Outcome::Removed { after_call: true });
                }
                tracing::info!(
                    scene_id = %scene.id,
                    stage = %stage,
                    url = %url,
                    "{} completed",
                    scene.label()
                );
                Ok(Outcome::Succeeded)
            }
            Err(error) => {
                tracing::warn!(
                    scene_id = %scene.id,
                    stage = %stage,
                    kind = error.kind(),
                    error = %error,
                    "{} failed; continuing with next scene",
                    scene.label()
                );
                if !self.write(scene, ScenePatch::failed(error.to_string())).await? {
                    return Ok(Outcome::Removed { after_call: true });
                }
                Ok(Outcome::Failed(error))
            }
        }
    }

    /// Apply `patch` to `scene`. Returns `false` when the scene has been
    /// deleted from the store since the batch started.
    async fn write(&self, scene: &SceneItem, patch: ScenePatch) -> rf_core::Result<bool> {
        match self.store.apply_update(scene.id, patch).await {
            Ok(()) => Ok(true),
            Err(rf_core::Error::NotFound { .. }) => {
                tracing::warn!(
                    scene_id = %scene.id,
                    "{} was removed during the run; skipping",
                    scene.label()
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn call(
        &self,
        executor: &dyn StageExecutor,
        scene: &SceneItem,
    ) -> Result<StageOutput, StageError> {
        match self.options.call_timeout {
            Some(limit) => tokio::time::timeout(limit, executor.execute(scene))
                .await
                .unwrap_or(Err(StageError::Timeout {
                    secs: limit.as_secs_f64().ceil() as u64,
                })),
            None => executor.execute(scene).await,
        }
    }

    /// Inter-item delay, cut short by cancellation.
    async fn pause(&self) {
        let delay = self.options.inter_item_delay;
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancellation.cancelled() => {}
        }
    }
}

fn log_ineligible(scene: &SceneItem, stage: Stage, reason: SkipReason) {
    tracing::info!(
        scene_id = %scene.id,
        stage = %stage,
        reason = %reason,
        "{} is not eligible; skipping",
        scene.label()
    );
}
