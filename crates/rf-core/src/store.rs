//! The seam between the pipeline and whatever owns the scenes.
//!
//! The pipeline never keeps its own copy of the scene collection across
//! calls. It reads through [`SceneStore::get_all`] immediately before each
//! stage and writes exclusively through [`SceneStore::apply_update`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::ids::SceneId;
use crate::scene::{SceneItem, ScenePatch};

/// Read accessor plus mutation sink for the authoritative scene collection.
#[async_trait]
pub trait SceneStore: Send + Sync {
    /// Current scenes, sorted by `order`.
    async fn get_all(&self) -> Result<Vec<SceneItem>>;

    /// Apply a partial update to one scene.
    async fn apply_update(&self, id: SceneId, patch: ScenePatch) -> Result<()>;
}

/// In-process store backed by a lock-protected vector.
///
/// Clones share the same underlying collection, so a test or UI layer can
/// hold one handle while the pipeline holds another.
#[derive(Debug, Clone, Default)]
pub struct MemorySceneStore {
    scenes: Arc<RwLock<Vec<SceneItem>>>,
}

impl MemorySceneStore {
    pub fn new(scenes: Vec<SceneItem>) -> Self {
        Self {
            scenes: Arc::new(RwLock::new(scenes)),
        }
    }

    /// Copy of the current collection, sorted by `order`.
    pub fn snapshot(&self) -> Vec<SceneItem> {
        let mut scenes = self.scenes.read().clone();
        scenes.sort_by_key(|s| s.order);
        scenes
    }

    /// Look up one scene by id.
    pub fn get(&self, id: SceneId) -> Option<SceneItem> {
        self.scenes.read().iter().find(|s| s.id == id).cloned()
    }

    pub fn replace_all(&self, scenes: Vec<SceneItem>) {
        *self.scenes.write() = scenes;
    }

    /// Edit a scene in place, outside the pipeline.
    pub fn edit(&self, id: SceneId, f: impl FnOnce(&mut SceneItem)) -> Result<()> {
        let mut scenes = self.scenes.write();
        let scene = scenes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::not_found("scene", id))?;
        f(scene);
        Ok(())
    }
}

#[async_trait]
impl SceneStore for MemorySceneStore {
    async fn get_all(&self) -> Result<Vec<SceneItem>> {
        Ok(self.snapshot())
    }

    async fn apply_update(&self, id: SceneId, patch: ScenePatch) -> Result<()> {
        self.edit(id, |scene| patch.apply(scene))
    }
}
