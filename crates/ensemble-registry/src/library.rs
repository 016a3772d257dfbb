//! The set of loaded packages and the scene index over them.
//!
//! A [`Library`] is an explicit value. Nothing in the crate reaches for a
//! process-wide instance; callers that want one own it themselves.
//!
//! Scene ids are expected to be unique across packages. When two packages
//! declare the same id the first one loaded keeps it, and the later scene is
//! only reachable through its package until the first is unloaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use ensemble_core::fragment::Fragment;
use ensemble_core::tags::TagQuery;

use crate::config::RegistryConfig;
use crate::package::AnimPackage;
use crate::scene::Scene;
use crate::solver::Assignment;
use crate::RegistryError;

// ---------------------------------------------------------------------------
// Offset overrides
// ---------------------------------------------------------------------------

/// Adjusted placement offsets, keyed scene id -> stage id -> role index.
///
/// Only offsets that differ from the authored value are recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OffsetOverrides {
    pub scenes: BTreeMap<String, BTreeMap<String, BTreeMap<usize, Vec<f32>>>>,
}

impl OffsetOverrides {
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Number of role offsets recorded.
    pub fn len(&self) -> usize {
        self.scenes
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// LoadSummary
// ---------------------------------------------------------------------------

/// Outcome of [`Library::load_directory`].
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Names of the packages that loaded, in path order.
    pub loaded: Vec<String>,
    /// Files that did not load, with the reason.
    pub failed: Vec<(PathBuf, RegistryError)>,
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// Loaded packages and a by-id index of their scenes.
#[derive(Debug, Default)]
pub struct Library {
    config: RegistryConfig,
    /// In load order.
    packages: Vec<AnimPackage>,
    scenes: BTreeMap<String, Arc<Scene>>,
}

impl Library {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            packages: Vec::new(),
            scenes: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // -- loading -------------------------------------------------------------

    /// Decode and register a package from memory.
    ///
    /// A package with the name of one already loaded replaces it.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Malformed`] if decoding fails, in which case the
    /// library is unchanged. [`RegistryError::DuplicateContent`] if the bytes
    /// match a loaded package and duplicates are rejected.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<&AnimPackage, RegistryError> {
        let package = AnimPackage::from_bytes(bytes)?;
        self.insert(package)
    }

    /// Read, decode and register one package file.
    pub fn load_file(&mut self, path: &Path) -> Result<&AnimPackage, RegistryError> {
        let package = AnimPackage::from_file(path)?;
        self.insert(package)
    }

    /// Load every file in `dir` with the configured extension, in path
    /// order. A file that fails is logged and skipped.
    ///
    /// # Errors
    ///
    /// Only if the directory itself cannot be listed.
    pub fn load_directory(&mut self, dir: &Path) -> Result<LoadSummary, RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.config.package_extension));
            if matches && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut summary = LoadSummary::default();
        for path in paths {
            match self.load_file(&path) {
                Ok(package) => summary.loaded.push(package.name().to_string()),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to load package");
                    summary.failed.push((path, e));
                }
            }
        }
        info!(
            dir = %dir.display(),
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            "package directory loaded"
        );
        Ok(summary)
    }

    fn insert(&mut self, package: AnimPackage) -> Result<&AnimPackage, RegistryError> {
        if self.config.reject_duplicate_content {
            if let Some(existing) = self
                .packages
                .iter()
                .find(|p| p.fingerprint() == package.fingerprint())
            {
                warn!(
                    package = %package.name(),
                    existing = %existing.name(),
                    fingerprint = %existing.fingerprint().to_hex(),
                    "package content already loaded"
                );
                return Err(RegistryError::DuplicateContent {
                    name: existing.name().to_string(),
                    fingerprint: existing.fingerprint().to_hex().to_string(),
                });
            }
        }

        if self.unload(package.name()) {
            info!(package = %package.name(), "replacing package of the same name");
        }

        for scene in package.scenes() {
            if self.scenes.contains_key(scene.id()) {
                warn!(
                    package = %package.name(),
                    scene = %scene.id(),
                    "duplicate scene id; keeping the one loaded first"
                );
            } else {
                self.scenes.insert(scene.id().to_string(), Arc::clone(scene));
            }
        }
        info!(
            package = %package.name(),
            author = %package.author(),
            scenes = package.scenes().len(),
            "loaded package"
        );

        let index = self.packages.len();
        self.packages.push(package);
        Ok(&self.packages[index])
    }

    /// Drop a package and its scenes. Returns whether it was loaded.
    ///
    /// Scene ids it shadowed in later packages become reachable again.
    pub fn unload(&mut self, name: &str) -> bool {
        let Some(index) = self.packages.iter().position(|p| p.name() == name) else {
            return false;
        };
        let package = self.packages.remove(index);
        info!(package = %name, scenes = package.scenes().len(), "unloaded package");

        self.scenes.clear();
        for package in &self.packages {
            for scene in package.scenes() {
                self.scenes
                    .entry(scene.id().to_string())
                    .or_insert_with(|| Arc::clone(scene));
            }
        }
        true
    }

    // -- lookup --------------------------------------------------------------

    pub fn packages(&self) -> &[AnimPackage] {
        &self.packages
    }

    pub fn package(&self, name: &str) -> Option<&AnimPackage> {
        self.packages.iter().find(|p| p.name() == name)
    }

    pub fn scene(&self, id: &str) -> Option<&Arc<Scene>> {
        self.scenes.get(id)
    }

    /// Every indexed scene, by id.
    pub fn scenes(&self) -> impl Iterator<Item = &Arc<Scene>> {
        self.scenes.values()
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Enabled scenes whose tags satisfy `query`, by id.
    pub fn find_scenes(&self, query: &TagQuery) -> Vec<&Arc<Scene>> {
        self.scenes()
            .filter(|s| s.is_enabled() && s.matches_query(query))
            .collect()
    }

    /// Toggle a scene. Returns `false` for an unknown id.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        match self.scene(id) {
            Some(scene) => {
                scene.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Assign `actors` to the roles of scene `id`, using the configured
    /// fallback policy. `None` for an unknown scene too.
    pub fn assign<A: Clone>(&self, id: &str, actors: &[(A, Fragment)]) -> Option<Assignment<A>> {
        self.scene(id)?
            .assign_actors(actors, self.config.degender_fallback)
    }

    // -- offsets -------------------------------------------------------------

    /// Every scene of every package in load order, including scenes whose
    /// id is shadowed in the index.
    fn loaded_scenes(&self) -> impl Iterator<Item = &Arc<Scene>> {
        self.packages.iter().flat_map(|p| p.scenes())
    }

    /// Collect every adjusted placement offset of the loaded scenes.
    ///
    /// When two loaded scenes share an id, the one loaded first wins a
    /// conflicting entry.
    pub fn save_offsets(&self) -> OffsetOverrides {
        let mut overrides = OffsetOverrides::default();
        for scene in self.loaded_scenes() {
            for stage in scene.stages() {
                for (role, placement) in stage.placements().iter().enumerate() {
                    if placement.offset.has_changes() {
                        overrides
                            .scenes
                            .entry(scene.id().to_string())
                            .or_default()
                            .entry(stage.id().to_string())
                            .or_default()
                            .entry(role)
                            .or_insert_with(|| placement.offset.save());
                    }
                }
            }
        }
        overrides
    }

    /// Apply saved offsets to every loaded scene with a matching id.
    /// Entries naming an unknown scene, stage or role are skipped. Returns
    /// the number of role offsets applied.
    pub fn apply_offsets(&self, overrides: &OffsetOverrides) -> usize {
        let mut applied = 0;
        for (scene_id, stages) in &overrides.scenes {
            let mut found = false;
            for scene in self.loaded_scenes().filter(|s| s.id() == scene_id) {
                found = true;
                applied += Self::apply_scene_offsets(scene, stages);
            }
            if !found {
                warn!(scene = %scene_id, "offset override for unknown scene");
            }
        }
        applied
    }

    fn apply_scene_offsets(
        scene: &Scene,
        stages: &BTreeMap<String, BTreeMap<usize, Vec<f32>>>,
    ) -> usize {
        let scene_id = scene.id();
        let mut applied = 0;
        for (stage_id, roles) in stages {
            let Some(stage) = scene.stage_by_key(stage_id).filter(|_| !stage_id.is_empty()) else {
                warn!(scene = %scene_id, stage = %stage_id, "offset override for unknown stage");
                continue;
            };
            for (&role, values) in roles {
                match stage.placement(role) {
                    Some(placement) => {
                        placement.offset.load(values);
                        applied += 1;
                    }
                    None => warn!(
                        scene = %scene_id,
                        stage = %stage_id,
                        role,
                        "offset override for unknown role"
                    ),
                }
            }
        }
        applied
    }

    /// Restore every placement offset to its authored value.
    pub fn reset_offsets(&self) {
        for scene in self.loaded_scenes() {
            for stage in scene.stages() {
                for placement in stage.placements() {
                    placement.offset.reset_offset();
                }
            }
        }
    }

    pub fn save_offsets_file(&self, path: &Path) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(&self.save_offsets()).map_err(|source| {
            RegistryError::Offsets {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, json).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_offsets_file(&self, path: &Path) -> Result<usize, RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let overrides: OffsetOverrides =
            serde_json::from_str(&text).map_err(|source| RegistryError::Offsets {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.apply_offsets(&overrides))
    }
}
