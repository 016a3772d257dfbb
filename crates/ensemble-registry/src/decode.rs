//! Binary package decoder.
//!
//! Packages are little-endian, version-tagged byte streams. Version 1:
//!
//! ```text
//! package   := version:u8 name:str author:str hash:[u8; HASH_SIZE]
//!              scene_count:u64 scene*
//! scene     := id:[u8; ID_SIZE] name:str
//!              slot_count:u64 slot*
//!              start:[u8; ID_SIZE]
//!              stage_count:u64 stage*
//!              vertex_count:u64 vertex*
//!              furniture:u8 allow_bed:u8 offset:f32*4 is_private:u8
//! slot      := race:u8 sex:u8 scale:f32 extra:u8
//! stage     := id:[u8; ID_SIZE] placement_count:u64 placement*
//!              fixed_length:f32 navtext:str tags
//! placement := event:str climax:u8 offset:f32*4 strips:u8
//! tags      := count:u64 str*
//! vertex    := id:[u8; ID_SIZE] edge_count:u64 [u8; ID_SIZE]*
//! str       := len:u64 utf8[len]
//! ```
//!
//! Decoding is all-or-nothing: the first error aborts the package and no
//! partially built scene escapes.

use std::fmt;
use std::sync::Arc;

use ensemble_core::fragment::{RaceKey, SexSet};
use ensemble_core::requirement::{Extra, RequirementSlot};
use ensemble_core::tags::TagSet;
use ensemble_core::transform::{Offset, Transform, OFFSET_LEN};

use crate::package::AnimPackage;
use crate::scene::{FurnitureData, FurnitureType, Placement, Scene, SceneParts, Stage, StripFlags};

/// The only package layout this decoder understands.
pub const PACKAGE_VERSION: u8 = 1;
/// Width of scene and stage identifiers.
pub const ID_SIZE: usize = 7;
/// Width of the package content hash.
pub const HASH_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Best-known location inside the package when an error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeContext {
    pub scene: Option<String>,
    pub stage: Option<String>,
}

impl fmt::Display for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.scene, &self.stage) {
            (Some(scene), Some(stage)) => write!(f, " (scene '{scene}', stage '{stage}')"),
            (Some(scene), None) => write!(f, " (scene '{scene}')"),
            (None, _) => Ok(()),
        }
    }
}

/// Errors produced while decoding or validating a package.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The stream ended before a field was complete.
    #[error("unexpected end of stream reading {field} at byte {offset}: needed {needed} bytes, {remaining} remaining{context}")]
    UnexpectedEof {
        field: &'static str,
        offset: usize,
        needed: usize,
        remaining: usize,
        context: DecodeContext,
    },

    /// The version byte names a layout this decoder does not know.
    #[error("unsupported package version {version} (expected 1)")]
    UnsupportedVersion { version: u8 },

    /// A text field is not valid UTF-8.
    #[error("{field} at byte {offset} is not valid UTF-8{context}")]
    InvalidUtf8 {
        field: &'static str,
        offset: usize,
        context: DecodeContext,
    },

    /// A role declares a race byte with no known race.
    #[error("role {index} has unknown race byte {race}{context}")]
    UnknownRace {
        index: usize,
        race: u8,
        context: DecodeContext,
    },

    /// A role admits no sex at all and can never be filled.
    #[error("role {index} has no associated sex in scene '{scene}'")]
    SlotWithoutSex { scene: String, index: usize },

    /// Two stages of one scene share an identifier.
    #[error("duplicate stage '{stage}' in scene '{scene}'")]
    DuplicateStage { scene: String, stage: String },

    /// A stage's placement list does not match the scene's role count.
    #[error("stage '{stage}' in scene '{scene}' has {actual} placements but the scene has {expected} roles")]
    PlacementCountMismatch {
        scene: String,
        stage: String,
        expected: usize,
        actual: usize,
    },

    /// The start stage does not exist in the scene.
    #[error("start stage '{start}' is not found in scene '{scene}'")]
    MissingStartStage { scene: String, start: String },

    /// The graph section does not list every stage exactly once.
    #[error("invalid graph vertex count in scene '{scene}': expected {expected} but got {actual}")]
    VertexCountMismatch {
        scene: String,
        expected: usize,
        actual: usize,
    },

    /// A graph vertex names a stage that does not exist.
    #[error("invalid vertex '{vertex}' in scene '{scene}'")]
    UnknownVertex { scene: String, vertex: String },

    /// A stage appears as a graph vertex more than once.
    #[error("vertex '{vertex}' listed twice in graph of scene '{scene}'")]
    DuplicateVertex { scene: String, vertex: String },

    /// A graph edge targets a stage that does not exist.
    #[error("invalid edge '{edge}' for vertex '{vertex}' in scene '{scene}'")]
    UnknownEdge {
        scene: String,
        vertex: String,
        edge: String,
    },
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Cursor over a package byte stream.
#[derive(Debug)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    context: DecodeContext,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            context: DecodeContext::default(),
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    // -- primitives ----------------------------------------------------------

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                field,
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
                context: self.context.clone(),
            });
        }
        let bytes = self.bytes;
        let slice = &bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take_array::<1>(field)?[0])
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        Ok(self.read_u8(field)? != 0)
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take_array(field)?))
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.take_array(field)?))
    }

    /// Read a `u64` element count.
    ///
    /// A count larger than the remaining stream cannot be honoured by any
    /// well-formed package, but is not rejected here: the element reads that
    /// follow fail with the precise truncation point.
    pub fn read_count(&mut self, field: &'static str) -> Result<usize, DecodeError> {
        let count = self.read_u64(field)?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn utf8(&self, bytes: &[u8], field: &'static str, offset: usize) -> Result<String, DecodeError> {
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 {
            field,
            offset,
            context: self.context.clone(),
        })
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_count(field)?;
        let offset = self.pos;
        let bytes = self.take(len, field)?;
        self.utf8(bytes, field, offset)
    }

    /// Read a fixed-width UTF-8 identifier.
    pub fn read_fixed_string(&mut self, n: usize, field: &'static str) -> Result<String, DecodeError> {
        let offset = self.pos;
        let bytes = self.take(n, field)?;
        self.utf8(bytes, field, offset)
    }

    pub fn read_offset(&mut self, field: &'static str) -> Result<Offset, DecodeError> {
        let mut offset = [0.0; OFFSET_LEN];
        for value in &mut offset {
            *value = self.read_f32(field)?;
        }
        Ok(offset)
    }

    /// Allocation hint for `count` elements of at least `min_size` bytes,
    /// bounded by what the stream could possibly hold.
    fn capacity(&self, count: usize, min_size: usize) -> usize {
        count.min(self.remaining() / min_size.max(1))
    }

    // -- records -------------------------------------------------------------

    /// Decode a complete package.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]; no part of the package is returned on failure.
    pub fn read_package(mut self) -> Result<AnimPackage, DecodeError> {
        let version = self.read_u8("version")?;
        match version {
            1 => self.read_package_v1(),
            _ => Err(DecodeError::UnsupportedVersion { version }),
        }
    }

    fn read_package_v1(&mut self) -> Result<AnimPackage, DecodeError> {
        let name = self.read_string("package name")?;
        let author: Arc<str> = self.read_string("package author")?.into();
        let hash: Arc<str> = self.read_fixed_string(HASH_SIZE, "package hash")?.into();

        let scene_count = self.read_count("scene count")?;
        let mut scenes = Vec::with_capacity(self.capacity(scene_count, ID_SIZE));
        for _ in 0..scene_count {
            scenes.push(Arc::new(self.read_scene(&author, &hash)?));
        }
        self.context = DecodeContext::default();

        Ok(AnimPackage::new(name, author, hash, scenes))
    }

    fn read_scene(&mut self, author: &Arc<str>, hash: &Arc<str>) -> Result<Scene, DecodeError> {
        self.context = DecodeContext::default();
        let id = self.read_fixed_string(ID_SIZE, "scene id")?;
        self.context.scene = Some(id.clone());
        let name = self.read_string("scene name")?;

        let slot_count = self.read_count("role count")?;
        let mut slots = Vec::with_capacity(self.capacity(slot_count, 7));
        for index in 0..slot_count {
            slots.push(self.read_slot(index)?);
        }

        let start = self.read_fixed_string(ID_SIZE, "start stage id")?;
        let stage_count = self.read_count("stage count")?;
        let mut stages = Vec::with_capacity(self.capacity(stage_count, ID_SIZE));
        for _ in 0..stage_count {
            stages.push(self.read_stage()?);
        }
        self.context.stage = None;

        let vertex_count = self.read_count("graph vertex count")?;
        if vertex_count != stage_count {
            return Err(DecodeError::VertexCountMismatch {
                scene: id,
                expected: stage_count,
                actual: vertex_count,
            });
        }
        let mut graph = Vec::with_capacity(self.capacity(vertex_count, ID_SIZE));
        for _ in 0..vertex_count {
            let vertex = self.read_fixed_string(ID_SIZE, "graph vertex id")?;
            self.context.stage = Some(vertex.clone());
            let edge_count = self.read_count("graph edge count")?;
            let mut edges = Vec::with_capacity(self.capacity(edge_count, ID_SIZE));
            for _ in 0..edge_count {
                edges.push(self.read_fixed_string(ID_SIZE, "graph edge id")?);
            }
            graph.push((vertex, edges));
        }
        self.context.stage = None;

        let types = FurnitureType::from_bits_retain(self.read_u8("furniture types")?);
        let allow_bed = self.read_bool("allow bed")?;
        let offset = Transform::new(self.read_offset("furniture offset")?);
        let is_private = self.read_bool("is private")?;

        Scene::assemble(SceneParts {
            id,
            name,
            author: Arc::clone(author),
            hash: Arc::clone(hash),
            slots,
            start,
            stages,
            graph,
            furniture: FurnitureData {
                types,
                allow_bed,
                offset,
            },
            is_private,
        })
    }

    fn read_slot(&mut self, index: usize) -> Result<RequirementSlot, DecodeError> {
        let race_byte = self.read_u8("role race")?;
        let race = RaceKey::from_u8(race_byte).ok_or_else(|| DecodeError::UnknownRace {
            index,
            race: race_byte,
            context: self.context.clone(),
        })?;
        let sex = SexSet::from_bits_truncate(self.read_u8("role sex")?);
        let scale = self.read_f32("role scale")?;
        let extra = Extra::from_bits_retain(self.read_u8("role extra")?);
        Ok(RequirementSlot {
            race,
            sex,
            extra,
            scale,
        })
    }

    fn read_stage(&mut self) -> Result<Stage, DecodeError> {
        self.context.stage = None;
        let id = self.read_fixed_string(ID_SIZE, "stage id")?;
        self.context.stage = Some(id.clone());

        let placement_count = self.read_count("placement count")?;
        let mut placements = Vec::with_capacity(self.capacity(placement_count, 26));
        for _ in 0..placement_count {
            placements.push(self.read_placement()?);
        }

        let fixed_length = self.read_f32("fixed length")?;
        let navtext = self.read_string("navigation text")?;
        let tags = self.read_tags()?;

        Ok(Stage::new(id, placements, fixed_length, navtext, tags))
    }

    fn read_placement(&mut self) -> Result<Placement, DecodeError> {
        let event = self.read_string("animation event")?;
        let climax = self.read_bool("climax flag")?;
        let offset = Transform::new(self.read_offset("placement offset")?);
        let strips = StripFlags::from_bits_retain(self.read_u8("strip flags")?);
        Ok(Placement {
            event,
            climax,
            strips,
            offset,
        })
    }

    fn read_tags(&mut self) -> Result<TagSet, DecodeError> {
        let count = self.read_count("tag count")?;
        let mut tags = TagSet::new();
        for _ in 0..count {
            tags.add_tag(&self.read_string("tag")?);
        }
        Ok(tags)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    #[test]
    fn primitives_are_little_endian() {
        let mut buf = vec![7u8];
        buf.extend_from_slice(&0x0102_0304_0506_0708u64.to_le_bytes());
        buf.extend_from_slice(&1.5f32.to_le_bytes());
        string(&mut buf, "hi");

        let mut d = Decoder::new(&buf);
        assert_eq!(d.read_u8("a").unwrap(), 7);
        assert_eq!(d.read_u64("b").unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(d.read_f32("c").unwrap(), 1.5);
        assert_eq!(d.read_string("d").unwrap(), "hi");
        assert_eq!(d.remaining(), 0);
    }

    #[test]
    fn short_read_reports_field_and_offset() {
        let buf = [1u8, 2, 3];
        let mut d = Decoder::new(&buf);
        d.read_u8("first").unwrap();
        match d.read_u64("count") {
            Err(DecodeError::UnexpectedEof {
                field,
                offset,
                needed,
                remaining,
                ..
            }) => {
                assert_eq!(field, "count");
                assert_eq!(offset, 1);
                assert_eq!(needed, 8);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
    }

    #[test]
    fn oversized_string_length_is_truncation() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
        buf.extend_from_slice(b"abc");
        let err = Decoder::new(&buf).read_string("name").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { field: "name", .. }));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u64.to_le_bytes());
        buf.extend_from_slice(&[0xff, 0xfe]);
        let err = Decoder::new(&buf).read_string("name").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8 { offset: 8, .. }));
    }

    #[test]
    fn unknown_version_rejected() {
        let err = Decoder::new(&[2u8]).read_package().unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { version: 2 }));
        let err = Decoder::new(&[]).read_package().unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { field: "version", .. }));
    }

    #[test]
    fn context_renders_scene_and_stage() {
        let ctx = DecodeContext {
            scene: Some("abc1234".into()),
            stage: Some("st00001".into()),
        };
        assert_eq!(ctx.to_string(), " (scene 'abc1234', stage 'st00001')");
        assert_eq!(DecodeContext::default().to_string(), "");
    }

    #[test]
    fn empty_package_decodes() {
        let mut buf = vec![PACKAGE_VERSION];
        string(&mut buf, "Pack");
        string(&mut buf, "Someone");
        buf.extend_from_slice(b"h4sh");
        buf.extend_from_slice(&0u64.to_le_bytes());
        let package = Decoder::new(&buf).read_package().unwrap();
        assert_eq!(package.name(), "Pack");
        assert_eq!(package.author(), "Someone");
        assert_eq!(package.hash(), "h4sh");
        assert!(package.scenes().is_empty());
    }
}
