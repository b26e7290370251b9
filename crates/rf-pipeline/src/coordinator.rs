//! Pipeline coordinator: composes the Image, Voice and Render passes into one
//! run.
//!
//! The coordinator re-reads the scene collection from the store immediately
//! before the Voice and Render passes, so outputs written by the previous
//! pass and any edits made meanwhile by the UI are what the next pass sees.
//! Stages never overlap, and a run lock keeps a second entry point call from
//! starting while one is active.

use std::sync::Arc;

use rf_core::config::{Config, Credentials};
use rf_core::{RunId, SceneItem, SceneStore, Stage};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::context::ProgressSender;
use crate::executor::StageExecutor;
use crate::executors::{ImageExecutor, RenderExecutor, VoiceExecutor};
use crate::provider::StageProviders;
use crate::retry::retry_targets;
use crate::runner::{BatchOptions, BatchRunner, StageResult};

/// Combined outcome of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub image: StageResult,
    pub voice: StageResult,
    pub render: StageResult,
}

impl PipelineReport {
    pub fn stage(&self, stage: Stage) -> &StageResult {
        match stage {
            Stage::Image => &self.image,
            Stage::Voice => &self.voice,
            Stage::Render => &self.render,
        }
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut StageResult {
        match stage {
            Stage::Image => &mut self.image,
            Stage::Voice => &mut self.voice,
            Stage::Render => &mut self.render,
        }
    }

    /// Every stage's errors, in stage order, each prefixed with the stage.
    pub fn errors(&self) -> Vec<String> {
        Stage::ALL
            .iter()
            .flat_map(|&stage| {
                self.stage(stage)
                    .errors()
                    .into_iter()
                    .map(move |e| format!("[{stage}] {e}"))
            })
            .collect()
    }

    pub fn failed(&self) -> usize {
        Stage::ALL.iter().map(|&s| self.stage(s).failed).sum()
    }

    pub fn cancelled(&self) -> bool {
        Stage::ALL.iter().any(|&s| self.stage(s).cancelled)
    }

    pub fn is_clean(&self) -> bool {
        Stage::ALL.iter().all(|&s| self.stage(s).is_clean())
    }

    /// Fold a retry result into the matching stage.
    pub fn absorb_retry(&mut self, retry: &StageResult) {
        self.stage_mut(retry.stage).merge_retry(retry);
    }
}

/// Entry point for the presentation layer.
pub struct PipelineCoordinator {
    store: Arc<dyn SceneStore>,
    providers: StageProviders,
    config: Arc<Config>,
    runner: BatchRunner,
    run_lock: Mutex<()>,
}

impl PipelineCoordinator {
    /// Create a coordinator with batch options taken from `config.pipeline`.
    pub fn new(store: Arc<dyn SceneStore>, providers: StageProviders, config: Arc<Config>) -> Self {
        let runner = BatchRunner::new(store.clone(), BatchOptions::from(&config.pipeline));
        Self {
            store,
            providers,
            config,
            runner,
            run_lock: Mutex::new(()),
        }
    }

    /// Builder: attach a progress sender, called after every processed scene
    /// of every stage.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.runner = self.runner.with_progress(progress);
        self
    }

    /// Builder: attach a cancellation token checked between scenes.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.runner = self.runner.with_cancellation(token);
        self
    }

    pub(crate) fn store(&self) -> &dyn SceneStore {
        self.store.as_ref()
    }

    pub(crate) fn runner(&self) -> &BatchRunner {
        &self.runner
    }

    /// Build the executor for `stage` with this run's credentials.
    pub fn executor(&self, stage: Stage, credentials: &Credentials) -> Box<dyn StageExecutor> {
        match stage {
            Stage::Image => Box::new(ImageExecutor::new(
                self.providers.image.clone(),
                credentials,
                &self.config.image,
            )),
            Stage::Voice => Box::new(VoiceExecutor::new(
                self.providers.voice.clone(),
                credentials,
                &self.config.voice,
            )),
            Stage::Render => Box::new(RenderExecutor::new(
                self.providers.render.clone(),
                &self.config.render,
            )),
        }
    }

    /// Claim the single batch slot.
    pub(crate) fn acquire(&self) -> rf_core::Result<MutexGuard<'_, ()>> {
        self.run_lock.try_lock().map_err(|_| rf_core::Error::Busy)
    }

    /// Run Image, Voice and Render in order.
    ///
    /// Every stage's setup is validated before any provider call; a missing
    /// credential or voice aborts with [`rf_core::Error::Setup`]. The Image
    /// pass covers the scenes of `initial` that lack an image. Voice and
    /// Render each start from a fresh read of the store.
    pub async fn run_full(
        &self,
        initial: &[SceneItem],
        credentials: &Credentials,
    ) -> rf_core::Result<PipelineReport> {
        let _slot = self.acquire()?;
        let run_id = RunId::new();

        let executors: Vec<Box<dyn StageExecutor>> = Stage::ALL
            .iter()
            .map(|&stage| self.executor(stage, credentials))
            .collect();
        for executor in &executors {
            executor.validate()?;
        }

        tracing::info!(%run_id, scenes = initial.len(), "Starting pipeline run");

        let mut results = Vec::with_capacity(executors.len());
        for executor in &executors {
            let stage = executor.stage();
            if results.iter().any(|r: &StageResult| r.cancelled) {
                results.push(StageResult::not_started(stage));
                continue;
            }

            let targets = match stage {
                Stage::Image => retry_targets(stage, initial),
                _ => retry_targets(stage, &self.store.get_all().await?),
            };
            tracing::info!(%run_id, stage = %stage, targets = targets.len(), "Starting stage");
            results.push(self.runner.run(&targets, executor.as_ref()).await?);
        }

        let mut results = results.into_iter();
        let (Some(image), Some(voice), Some(render)) =
            (results.next(), results.next(), results.next())
        else {
            return Err(rf_core::Error::Internal("pipeline produced too few stage results".into()));
        };

        let report = PipelineReport {
            run_id,
            image,
            voice,
            render,
        };
        tracing::info!(
            %run_id,
            failed = report.failed(),
            cancelled = report.cancelled(),
            "Pipeline run finished"
        );
        Ok(report)
    }

    /// Run one stage over `scenes`.
    ///
    /// Scenes that already carry the output are skipped (when configured) and
    /// ineligible scenes are passed over without a provider call.
    pub async fn run_stage(
        &self,
        stage: Stage,
        scenes: &[SceneItem],
        credentials: &Credentials,
    ) -> rf_core::Result<StageResult> {
        let _slot = self.acquire()?;
        let executor = self.executor(stage, credentials);
        executor.validate()?;
        self.runner.run(scenes, executor.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{
        credentials, fast_config, fresh_scenes, providers, FakeImages, FakeRenders, FakeVoices,
    };
    use crate::ProgressReport;
    use rf_core::{MemorySceneStore, StageError};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct Harness {
        store: MemorySceneStore,
        images: Arc<FakeImages>,
        voices: Arc<FakeVoices>,
        renders: Arc<FakeRenders>,
    }

    impl Harness {
        fn new(scenes: Vec<SceneItem>) -> Self {
            Self::with_fakes(
                scenes,
                FakeImages::default(),
                FakeVoices::default(),
                FakeRenders::default(),
            )
        }

        fn with_fakes(
            scenes: Vec<SceneItem>,
            images: FakeImages,
            voices: FakeVoices,
            renders: FakeRenders,
        ) -> Self {
            Self {
                store: MemorySceneStore::new(scenes),
                images: Arc::new(images),
                voices: Arc::new(voices),
                renders: Arc::new(renders),
            }
        }

        fn coordinator(&self, config: Config) -> PipelineCoordinator {
            PipelineCoordinator::new(
                Arc::new(self.store.clone()),
                providers(&self.images, &self.voices, &self.renders),
                Arc::new(config),
            )
        }
    }

    #[tokio::test]
    async fn full_run_produces_every_output() {
        let scenes = fresh_scenes(3);
        let h = Harness::new(scenes.clone());

        let reports = Arc::new(StdMutex::new(Vec::<ProgressReport>::new()));
        let reports_clone = reports.clone();
        let coordinator = h
            .coordinator(fast_config())
            .with_progress(ProgressSender::new(move |r| {
                reports_clone.lock().unwrap().push(r.clone())
            }));

        let report = coordinator.run_full(&scenes, &credentials()).await.unwrap();

        for stage in Stage::ALL {
            let result = report.stage(stage);
            assert_eq!((result.completed, result.failed), (3, 0), "{stage}");
        }
        assert!(report.is_clean());
        assert!(h.store.snapshot().iter().all(|s| s.rendered && s.has_image()));

        let order: Vec<_> = reports
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.stage, r.completed))
            .collect();
        assert_eq!(
            order,
            vec![
                (Stage::Image, 1),
                (Stage::Image, 2),
                (Stage::Image, 3),
                (Stage::Voice, 1),
                (Stage::Voice, 2),
                (Stage::Voice, 3),
                (Stage::Render, 1),
                (Stage::Render, 2),
                (Stage::Render, 3),
            ]
        );
    }

    #[tokio::test]
    async fn missing_voice_aborts_before_any_call() {
        let scenes = fresh_scenes(2);
        let h = Harness::new(scenes.clone());
        let mut config = fast_config();
        config.voice.voice_id = None;

        let err = h
            .coordinator(config)
            .run_full(&scenes, &credentials())
            .await
            .unwrap_err();

        assert!(matches!(err, rf_core::Error::Setup(_)));
        assert_eq!(h.images.call_count(), 0);
        assert_eq!(h.voices.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_image_key_aborts() {
        let scenes = fresh_scenes(1);
        let h = Harness::new(scenes.clone());
        let creds = Credentials {
            image_api_key: None,
            ..credentials()
        };

        let err = h
            .coordinator(fast_config())
            .run_full(&scenes, &creds)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("image API key"));
        assert_eq!(h.images.call_count(), 0);
    }

    #[tokio::test]
    async fn render_skips_scenes_whose_image_failed() {
        let scenes = fresh_scenes(3);
        let h = Harness::with_fakes(
            scenes.clone(),
            FakeImages::default().failing("scene 2", StageError::Provider("nsfw filter".into())),
            FakeVoices::default(),
            FakeRenders::default(),
        );

        let report = h
            .coordinator(fast_config())
            .run_full(&scenes, &credentials())
            .await
            .unwrap();

        assert_eq!(report.image.failed, 1);
        assert_eq!(report.voice.completed, 3);
        assert_eq!(report.render.total, 2);
        assert_eq!(report.render.completed, 2);
        assert_eq!(h.renders.call_count(), 2);
        assert_eq!(report.errors(), vec!["[image] Scene 2: nsfw filter"]);

        let after = h.store.snapshot();
        assert!(!after[1].rendered);
        assert!(after[1].image_url.is_none());
        assert!(after[1].has_generated_audio());
    }

    #[tokio::test]
    async fn render_sees_image_uploaded_during_voice_stage() {
        let scenes = fresh_scenes(2);
        let store = MemorySceneStore::new(scenes.clone());
        let upload_target = scenes[0].id;
        let ui = store.clone();

        let voices = FakeVoices::default().with_hook(move |text| {
            if text == "scene 2" {
                let _ = ui.edit(upload_target, |s| {
                    s.image_url = Some("https://img.test/manual.png".into());
                    s.image_source = rf_core::ImageSource::Uploaded;
                });
            }
        });
        let h = Harness {
            store,
            images: Arc::new(
                FakeImages::default().failing("scene 1", StageError::Transport("reset".into())),
            ),
            voices: Arc::new(voices),
            renders: Arc::new(FakeRenders::default()),
        };

        let report = h
            .coordinator(fast_config())
            .run_full(&scenes, &credentials())
            .await
            .unwrap();

        assert_eq!(report.image.failed, 1);
        assert_eq!(report.render.completed, 2);
        assert!(h
            .renders
            .image_urls()
            .contains(&"https://img.test/manual.png".to_string()));
    }

    #[tokio::test]
    async fn cancelled_image_stage_skips_the_rest() {
        let scenes = fresh_scenes(3);
        let h = Harness::new(scenes.clone());
        let token = CancellationToken::new();
        let cancel = token.clone();
        let coordinator = h
            .coordinator(fast_config())
            .with_cancellation(token)
            .with_progress(ProgressSender::new(move |_| cancel.cancel()));

        let report = coordinator.run_full(&scenes, &credentials()).await.unwrap();

        assert!(report.cancelled());
        assert_eq!(report.image.completed, 1);
        assert_eq!(report.voice, StageResult::not_started(Stage::Voice));
        assert_eq!(h.voices.call_count(), 0);
        assert_eq!(h.renders.call_count(), 0);
    }

    #[tokio::test]
    async fn run_stage_reports_failure_per_scene() {
        let mut scenes = fresh_scenes(5);
        scenes[2].script.clear();
        let h = Harness::new(scenes.clone());

        let result = h
            .coordinator(fast_config())
            .run_stage(Stage::Image, &scenes, &credentials())
            .await
            .unwrap();

        assert_eq!((result.completed, result.failed), (4, 1));
        assert_eq!(result.errors(), vec!["Scene 3: text required"]);
        assert_eq!(h.store.snapshot()[2].error.as_deref(), Some("text required"));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_runs_are_refused() {
        let scenes = fresh_scenes(1);
        let h = Harness::with_fakes(
            scenes.clone(),
            FakeImages::default().with_delay(Duration::from_secs(5)),
            FakeVoices::default(),
            FakeRenders::default(),
        );
        let coordinator = h.coordinator(fast_config());
        let creds = credentials();

        let (first, second) = tokio::join!(
            coordinator.run_stage(Stage::Image, &scenes, &creds),
            coordinator.run_stage(Stage::Image, &scenes, &creds),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(rf_core::Error::Busy)));
        assert_eq!(h.images.call_count(), 1);
    }
}
