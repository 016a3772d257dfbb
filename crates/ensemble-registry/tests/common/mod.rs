//! Shared test helpers: an in-memory package encoder.
#![allow(dead_code)]

use ensemble_core::fragment::{RaceKey, SexSet};
use ensemble_core::requirement::Extra;
use ensemble_registry::decode::{HASH_SIZE, ID_SIZE, PACKAGE_VERSION};

/// Stage id `n` in the fixed-width form, e.g. `st00003`.
pub fn stage_id(n: usize) -> String {
    format!("st{n:05}")
}

/// Scene id `n` in the fixed-width form, e.g. `sc00001`.
pub fn scene_id(n: usize) -> String {
    format!("sc{n:05}")
}

#[derive(Debug, Clone)]
pub struct SlotSpec {
    pub race: u8,
    pub sex: u8,
    pub scale: f32,
    pub extra: u8,
}

impl SlotSpec {
    pub fn new(race: RaceKey, sex: SexSet, extra: Extra) -> Self {
        Self {
            race: race.id(),
            sex: sex.bits(),
            scale: 1.0,
            extra: extra.bits(),
        }
    }

    pub fn human(sex: SexSet) -> Self {
        Self::new(RaceKey::Human, sex, Extra::empty())
    }
}

#[derive(Debug, Clone)]
pub struct PlacementSpec {
    pub event: String,
    pub climax: bool,
    pub offset: [f32; 4],
    pub strips: u8,
}

impl PlacementSpec {
    pub fn new(event: &str) -> Self {
        Self {
            event: event.to_string(),
            climax: false,
            offset: [0.0; 4],
            strips: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageSpec {
    pub id: String,
    pub placements: Vec<PlacementSpec>,
    pub fixed_length: f32,
    pub navtext: String,
    pub tags: Vec<String>,
}

impl StageSpec {
    /// A stage with one placement per role, events named `<id>_A<role>`.
    pub fn new(id: &str, roles: usize) -> Self {
        Self {
            id: id.to_string(),
            placements: (0..roles)
                .map(|r| PlacementSpec::new(&format!("{id}_A{r}")))
                .collect(),
            fixed_length: 0.0,
            navtext: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn tagged(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct SceneSpec {
    pub id: String,
    pub name: String,
    pub slots: Vec<SlotSpec>,
    pub start: String,
    pub stages: Vec<StageSpec>,
    pub graph: Vec<(String, Vec<String>)>,
    pub furniture: u8,
    pub allow_bed: bool,
    pub offset: [f32; 4],
    pub is_private: bool,
}

impl SceneSpec {
    /// `stage_count` stages chained `st00000 -> st00001 -> ...`, starting at
    /// the first.
    pub fn linear(id: &str, slots: Vec<SlotSpec>, stage_count: usize) -> Self {
        let stages: Vec<StageSpec> = (0..stage_count)
            .map(|n| StageSpec::new(&stage_id(n), slots.len()))
            .collect();
        let graph = (0..stage_count)
            .map(|n| {
                let next = if n + 1 < stage_count {
                    vec![stage_id(n + 1)]
                } else {
                    Vec::new()
                };
                (stage_id(n), next)
            })
            .collect();
        Self {
            id: id.to_string(),
            name: format!("Scene {id}"),
            slots,
            start: stage_id(0),
            stages,
            graph,
            furniture: 0,
            allow_bed: false,
            offset: [0.0; 4],
            is_private: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub version: u8,
    pub name: String,
    pub author: String,
    pub hash: String,
    pub scenes: Vec<SceneSpec>,
}

impl PackageSpec {
    pub fn new(name: &str, scenes: Vec<SceneSpec>) -> Self {
        Self {
            version: PACKAGE_VERSION,
            name: name.to_string(),
            author: "tester".to_string(),
            hash: "h4sh".to_string(),
            scenes,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Encoder::default();
        out.u8(self.version);
        out.string(&self.name);
        out.string(&self.author);
        out.fixed(&self.hash, HASH_SIZE);
        out.u64(self.scenes.len());
        for scene in &self.scenes {
            out.scene(scene);
        }
        out.0
    }
}

#[derive(Default)]
struct Encoder(Vec<u8>);

impl Encoder {
    fn u8(&mut self, v: u8) {
        self.0.push(v);
    }

    fn u64(&mut self, v: usize) {
        self.0.extend_from_slice(&(v as u64).to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn string(&mut self, s: &str) {
        self.u64(s.len());
        self.0.extend_from_slice(s.as_bytes());
    }

    fn fixed(&mut self, s: &str, width: usize) {
        assert_eq!(s.len(), width, "fixed-width field '{s}'");
        self.0.extend_from_slice(s.as_bytes());
    }

    fn offset(&mut self, offset: &[f32; 4]) {
        for v in offset {
            self.f32(*v);
        }
    }

    fn scene(&mut self, scene: &SceneSpec) {
        self.fixed(&scene.id, ID_SIZE);
        self.string(&scene.name);
        self.u64(scene.slots.len());
        for slot in &scene.slots {
            self.u8(slot.race);
            self.u8(slot.sex);
            self.f32(slot.scale);
            self.u8(slot.extra);
        }
        self.fixed(&scene.start, ID_SIZE);
        self.u64(scene.stages.len());
        for stage in &scene.stages {
            self.fixed(&stage.id, ID_SIZE);
            self.u64(stage.placements.len());
            for p in &stage.placements {
                self.string(&p.event);
                self.u8(p.climax as u8);
                self.offset(&p.offset);
                self.u8(p.strips);
            }
            self.f32(stage.fixed_length);
            self.string(&stage.navtext);
            self.u64(stage.tags.len());
            for tag in &stage.tags {
                self.string(tag);
            }
        }
        self.u64(scene.graph.len());
        for (vertex, edges) in &scene.graph {
            self.fixed(vertex, ID_SIZE);
            self.u64(edges.len());
            for edge in edges {
                self.fixed(edge, ID_SIZE);
            }
        }
        self.u8(scene.furniture);
        self.u8(scene.allow_bed as u8);
        self.offset(&scene.offset);
        self.u8(scene.is_private as u8);
    }
}
