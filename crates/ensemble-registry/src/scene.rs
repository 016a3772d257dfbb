//! Scenes, their stages and per-role placements.
//!
//! A [`Scene`] owns its stages in one arena. Everything else that refers to a
//! stage (the graph, the start stage, callers holding a `&Stage`) goes
//! through its [`StageIndex`]. Stage references handed to a scene are checked
//! for identity, so a stage borrowed from another scene is treated as unknown
//! rather than silently aliased by position.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use ensemble_core::fragment::Fragment;
use ensemble_core::requirement::RequirementSlot;
use ensemble_core::tags::{TagQuery, TagSet};
use ensemble_core::transform::{Coordinate, Transform};

use crate::decode::DecodeError;
use crate::graph::{NodeType, StageGraph, StageIndex};
use crate::legacy;

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Equipment a role strips when a stage starts.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StripFlags: u8 {
        const WEAPONS = 1 << 0;
        const HELMET  = 1 << 1;
        const GLOVES  = 1 << 2;
        const BOOTS   = 1 << 3;
        const ALL     = 0xFF;
    }
}

bitflags! {
    /// Furniture categories a scene can be played on.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FurnitureType: u8 {
        const BED_ROLL   = 1 << 0;
        const BED_SINGLE = 1 << 1;
        const BED_DOUBLE = 1 << 2;
        const WALL       = 1 << 3;
        const TABLE      = 1 << 4;
        const CHAIR      = 1 << 5;
        const BENCH      = 1 << 6;
        const THRONE     = 1 << 7;

        const BEDS = Self::BED_ROLL.bits() | Self::BED_SINGLE.bits() | Self::BED_DOUBLE.bits();
    }
}

/// Furniture compatibility of a scene.
#[derive(Debug, Clone, Default)]
pub struct FurnitureData {
    pub types: FurnitureType,
    /// Any bed is acceptable in addition to `types`.
    pub allow_bed: bool,
    /// Applied to the furniture's anchor before role offsets.
    pub offset: Transform,
}

// ---------------------------------------------------------------------------
// Placement / Stage
// ---------------------------------------------------------------------------

/// What one role does during one stage.
#[derive(Debug, Clone)]
pub struct Placement {
    /// Authored event name, without the package prefix.
    pub event: String,
    pub climax: bool,
    pub strips: StripFlags,
    pub offset: Transform,
}

/// One pose of a scene.
#[derive(Debug, Clone)]
pub struct Stage {
    id: String,
    index: StageIndex,
    placements: Vec<Placement>,
    fixed_length: f32,
    navtext: String,
    tags: TagSet,
}

impl Stage {
    /// A stage not yet placed in a scene. Its index is assigned by
    /// [`Scene::assemble`].
    pub fn new(
        id: String,
        placements: Vec<Placement>,
        fixed_length: f32,
        navtext: String,
        tags: TagSet,
    ) -> Self {
        Self {
            id,
            index: StageIndex(0),
            placements,
            fixed_length,
            navtext,
            tags,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> StageIndex {
        self.index
    }

    /// One placement per role, in role order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn placement(&self, role: usize) -> Option<&Placement> {
        self.placements.get(role)
    }

    /// Playback length in seconds; zero when the stage loops until advanced.
    pub fn fixed_length(&self) -> f32 {
        self.fixed_length
    }

    pub fn is_fixed_length(&self) -> bool {
        self.fixed_length > 0.0
    }

    pub fn navtext(&self) -> &str {
        &self.navtext
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn is_climax(&self) -> bool {
        self.placements.iter().any(|p| p.climax)
    }
}

/// Where and how to place one role for a stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementInstruction {
    pub role: usize,
    /// Package-unique animation event.
    pub event: String,
    pub coordinate: Coordinate,
    pub scale: f32,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Decoded, not yet validated pieces of a scene.
#[derive(Debug)]
pub(crate) struct SceneParts {
    pub id: String,
    pub name: String,
    pub author: Arc<str>,
    pub hash: Arc<str>,
    pub slots: Vec<RequirementSlot>,
    pub start: String,
    pub stages: Vec<Stage>,
    /// `(vertex, successors)` by stage id, in stream order.
    pub graph: Vec<(String, Vec<String>)>,
    pub furniture: FurnitureData,
    pub is_private: bool,
}

/// A multi-role sequence with a branching stage graph.
///
/// Read-only once built, except for the `enabled` flag and the runtime
/// adjustment of offsets, both of which are safe to change through a shared
/// reference.
#[derive(Debug)]
pub struct Scene {
    id: String,
    name: String,
    author: Arc<str>,
    hash: Arc<str>,
    slots: Vec<RequirementSlot>,
    stages: Vec<Stage>,
    graph: StageGraph,
    furniture: FurnitureData,
    tags: TagSet,
    is_private: bool,
    enabled: AtomicBool,
}

impl Scene {
    /// Validate `parts` and build the scene.
    ///
    /// # Errors
    ///
    /// Fails on a role without any sex, a duplicate stage id, a stage whose
    /// placement count differs from the role count, a missing start stage,
    /// or a graph that does not list every stage exactly once with known
    /// successors.
    pub(crate) fn assemble(parts: SceneParts) -> Result<Self, DecodeError> {
        let SceneParts {
            id,
            name,
            author,
            hash,
            slots,
            start,
            mut stages,
            graph,
            furniture,
            is_private,
        } = parts;

        if let Some(index) = slots.iter().position(|s| s.sex.is_empty()) {
            return Err(DecodeError::SlotWithoutSex { scene: id, index });
        }

        let mut tags = TagSet::new();
        for tag in legacy::gender_tags(&slots) {
            tags.add_tag(&tag);
        }

        for (i, stage) in stages.iter_mut().enumerate() {
            stage.index = StageIndex(i);
        }
        for (i, stage) in stages.iter().enumerate() {
            if stages[..i].iter().any(|s| s.id == stage.id) {
                return Err(DecodeError::DuplicateStage {
                    scene: id,
                    stage: stage.id.clone(),
                });
            }
            if stage.placements.len() != slots.len() {
                return Err(DecodeError::PlacementCountMismatch {
                    scene: id,
                    stage: stage.id.clone(),
                    expected: slots.len(),
                    actual: stage.placements.len(),
                });
            }
            tags.add_tags(&stage.tags);
        }

        let find = |key: &str| stages.iter().position(|s| s.id == key).map(StageIndex);
        let Some(root) = find(&start) else {
            return Err(DecodeError::MissingStartStage { scene: id, start });
        };

        let mut edges: Vec<Option<Vec<StageIndex>>> = vec![None; stages.len()];
        for (vertex, successors) in &graph {
            let Some(from) = find(vertex) else {
                return Err(DecodeError::UnknownVertex {
                    scene: id,
                    vertex: vertex.clone(),
                });
            };
            if edges[from.0].is_some() {
                return Err(DecodeError::DuplicateVertex {
                    scene: id,
                    vertex: vertex.clone(),
                });
            }
            let mut targets = Vec::with_capacity(successors.len());
            for edge in successors {
                match find(edge) {
                    Some(to) => targets.push(to),
                    None => {
                        return Err(DecodeError::UnknownEdge {
                            scene: id,
                            vertex: vertex.clone(),
                            edge: edge.clone(),
                        })
                    }
                }
            }
            edges[from.0] = Some(targets);
        }
        if graph.len() != stages.len() {
            return Err(DecodeError::VertexCountMismatch {
                scene: id,
                expected: stages.len(),
                actual: graph.len(),
            });
        }
        let edges = edges.into_iter().map(Option::unwrap_or_default).collect();

        Ok(Self {
            id,
            name,
            author,
            hash,
            slots,
            stages,
            graph: StageGraph::new(edges, root),
            furniture,
            tags,
            is_private,
            enabled: AtomicBool::new(true),
        })
    }

    // -- identity ------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Content hash of the owning package; prefixes every animation event.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    // -- roles ---------------------------------------------------------------

    pub fn slots(&self) -> &[RequirementSlot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn submissive_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_submissive()).count()
    }

    pub fn optional_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_optional()).count()
    }

    pub fn has_creatures(&self) -> bool {
        self.slots.iter().any(|s| !s.is_human())
    }

    /// Every acceptable fragment, per role.
    pub fn fragmentations(&self) -> Vec<Vec<Fragment>> {
        self.slots.iter().map(RequirementSlot::make_fragments).collect()
    }

    // -- stages --------------------------------------------------------------

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn start_stage(&self) -> &Stage {
        &self.stages[self.graph.root().0]
    }

    pub fn stage(&self, index: StageIndex) -> Option<&Stage> {
        self.stages.get(index.0)
    }

    /// Look a stage up by id; the empty id names the start stage.
    pub fn stage_by_key(&self, key: &str) -> Option<&Stage> {
        if key.is_empty() {
            return Some(self.start_stage());
        }
        self.stages.iter().find(|s| s.id == key)
    }

    /// Whether `stage` is one of this scene's own stages.
    pub fn contains(&self, stage: &Stage) -> bool {
        self.stages
            .get(stage.index.0)
            .is_some_and(|own| std::ptr::eq(own, stage))
    }

    fn own_index(&self, stage: &Stage) -> Option<StageIndex> {
        self.contains(stage).then_some(stage.index)
    }

    fn resolve(&self, path: Vec<StageIndex>) -> Vec<&Stage> {
        path.into_iter().map(|i| &self.stages[i.0]).collect()
    }

    /// Stages in which any role climaxes, in arena order.
    pub fn climax_stages(&self) -> Vec<&Stage> {
        self.stages.iter().filter(|s| s.is_climax()).collect()
    }

    pub fn fixed_length_stages(&self) -> Vec<&Stage> {
        self.stages.iter().filter(|s| s.is_fixed_length()).collect()
    }

    // -- graph ---------------------------------------------------------------

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// `None` for a stage of another scene.
    pub fn node_type(&self, stage: &Stage) -> Option<NodeType> {
        self.graph.node_type(self.own_index(stage)?)
    }

    pub fn linked_stage_count(&self, stage: &Stage) -> usize {
        self.own_index(stage)
            .map_or(0, |i| self.graph.out_degree(i))
    }

    pub fn nth_linked_stage(&self, stage: &Stage, n: usize) -> Option<&Stage> {
        let next = self.graph.successors(self.own_index(stage)?).get(n)?;
        self.stage(*next)
    }

    /// See [`StageGraph::longest_path`]. Empty for a foreign stage.
    pub fn longest_path(&self, src: &Stage) -> Vec<&Stage> {
        match self.own_index(src) {
            Some(i) => self.resolve(self.graph.longest_path(i)),
            None => Vec::new(),
        }
    }

    /// See [`StageGraph::shortest_path`]. Empty for a foreign stage.
    pub fn shortest_path(&self, src: &Stage) -> Vec<&Stage> {
        match self.own_index(src) {
            Some(i) => self.resolve(self.graph.shortest_path(i)),
            None => Vec::new(),
        }
    }

    /// See [`StageGraph::shortest_route`]. Empty for a foreign stage.
    pub fn shortest_route(&self, src: &Stage) -> Vec<&Stage> {
        match self.own_index(src) {
            Some(i) => self.resolve(self.graph.shortest_route(i)),
            None => Vec::new(),
        }
    }

    // -- tags / furniture ----------------------------------------------------

    /// Union of the gender tags and every stage's tags.
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Whether the scene carries every tag of `tags`.
    pub fn is_compatible_tags(&self, tags: &TagSet) -> bool {
        self.tags.has_tags(tags, true)
    }

    pub fn matches_query(&self, query: &TagQuery) -> bool {
        query.matches(&self.tags)
    }

    pub fn furniture(&self) -> &FurnitureData {
        &self.furniture
    }

    pub fn uses_furniture(&self) -> bool {
        !self.furniture.types.is_empty()
    }

    /// Whether the scene can play on `furniture`; the empty type stands for
    /// open ground.
    pub fn is_compatible_furniture(&self, furniture: FurnitureType) -> bool {
        if furniture.is_empty() {
            return !self.uses_furniture();
        }
        if self.furniture.allow_bed && FurnitureType::BEDS.contains(furniture) {
            return true;
        }
        self.furniture.types.intersects(furniture)
    }

    // -- events / placement --------------------------------------------------

    /// Package-unique event of role `n` in `stage`.
    pub fn animation_event(&self, stage: &Stage, n: usize) -> Option<String> {
        self.own_index(stage)?;
        stage
            .placements
            .get(n)
            .map(|p| format!("{}{}", self.hash, p.event))
    }

    /// Events of every role in `stage`, in role order. Empty for a stage of
    /// another scene.
    pub fn animation_events(&self, stage: &Stage) -> Vec<String> {
        if !self.contains(stage) {
            return Vec::new();
        }
        stage
            .placements
            .iter()
            .map(|p| format!("{}{}", self.hash, p.event))
            .collect()
    }

    /// Apply the furniture-level offset to `coordinate`.
    pub fn apply_scene_offset(&self, coordinate: &mut Coordinate) {
        self.furniture.offset.apply(coordinate);
    }

    /// Coordinate of role `n` in `stage`, relative to `base`.
    pub fn place_role(&self, stage: &Stage, n: usize, base: Coordinate) -> Option<Coordinate> {
        self.own_index(stage)?;
        let placement = stage.placements.get(n)?;
        let mut coordinate = base;
        placement.offset.apply(&mut coordinate);
        Some(coordinate)
    }

    /// Everything a placement layer needs to start `stage` around `base`.
    ///
    /// Empty for a stage of another scene.
    pub fn plan_stage(&self, stage: &Stage, base: Coordinate) -> Vec<PlacementInstruction> {
        if !self.contains(stage) {
            return Vec::new();
        }
        stage
            .placements
            .iter()
            .zip(&self.slots)
            .enumerate()
            .map(|(role, (placement, slot))| {
                let mut coordinate = base;
                placement.offset.apply(&mut coordinate);
                PlacementInstruction {
                    role,
                    event: format!("{}{}", self.hash, placement.event),
                    coordinate,
                    scale: slot.scale,
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
