//! Progress reporting shared by every batch run.

use rf_core::{SceneId, Stage};
use serde::Serialize;

/// Emitted after every processed scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub stage: Stage,
    /// The scene that was just processed.
    pub scene_id: SceneId,
    /// Scenes processed so far in this run, failures included.
    pub completed: usize,
    /// Size of the scene subset being run.
    pub total: usize,
    /// One "Scene N: message" entry per failed scene, in processing order.
    pub errors: Vec<String>,
}

impl ProgressReport {
    /// Completion as a percentage (0.0 -- 100.0).
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f32 / self.total as f32) * 100.0
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }
}

/// Sender for reporting progress to the presentation layer.
pub struct ProgressSender {
    callback: Box<dyn Fn(&ProgressReport) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(&ProgressReport) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    /// Report progress.
    pub fn send(&self, report: &ProgressReport) {
        (self.callback)(report);
    }
}

impl Default for ProgressSender {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}
