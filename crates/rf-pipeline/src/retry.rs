//! Selective retry: re-run a stage for only the scenes still missing its
//! output.
//!
//! Scenes that already succeeded are never targeted, so a retry cannot
//! disturb finished work. There is no automatic retry; a failed scene stays
//! failed until the caller asks for this.

use rf_core::config::Credentials;
use rf_core::{SceneItem, ScenePatch, Stage};

use crate::coordinator::PipelineCoordinator;
use crate::runner::StageResult;

/// Scenes lacking `stage`'s output that have the inputs it needs, in order.
pub fn retry_targets(stage: Stage, scenes: &[SceneItem]) -> Vec<SceneItem> {
    scenes
        .iter()
        .filter(|s| !stage.is_done(s) && stage.is_eligible(s))
        .cloned()
        .collect()
}

impl PipelineCoordinator {
    /// Retry `stage` for every scene in the store still missing its output.
    ///
    /// Each targeted scene's error is cleared before the batch starts. The
    /// returned result covers the targets only; fold it into an earlier
    /// report with [`PipelineReport::absorb_retry`](crate::PipelineReport::absorb_retry).
    pub async fn retry_failed(
        &self,
        stage: Stage,
        credentials: &Credentials,
    ) -> rf_core::Result<StageResult> {
        let _slot = self.acquire()?;
        let executor = self.executor(stage, credentials);
        executor.validate()?;

        let scenes = self.store().get_all().await?;
        let targets = retry_targets(stage, &scenes);
        tracing::info!(stage = %stage, targets = targets.len(), "Retrying failed scenes");

        for scene in &targets {
            self.store()
                .apply_update(scene.id, ScenePatch::clear_error())
                .await?;
        }

        self.runner().run(&targets, executor.as_ref()).await
    }
}
