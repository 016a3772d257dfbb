//! Placement coordinates and role-local offsets.
//!
//! A [`Transform`] keeps two copies of an offset: the `raw` value as authored
//! in the package, and the `current` value that runtime management may
//! adjust. Offsets are role-local: applying one rotates its x/y by the
//! coordinate's heading before translating.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Components of an offset array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    /// Rotation, in degrees.
    R = 3,
}

/// Length of an offset array.
pub const OFFSET_LEN: usize = 4;

/// An offset as `[x, y, z, rotation_degrees]`.
pub type Offset = [f32; OFFSET_LEN];

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A world placement: position plus heading in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
}

impl Coordinate {
    pub fn new(x: f32, y: f32, z: f32, rotation: f32) -> Self {
        Self { x, y, z, rotation }
    }

    /// Build from a plain `[x, y, z, rotation]` slice.
    ///
    /// Returns `None` unless the slice has exactly four elements.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            &[x, y, z, rotation] => Some(Self { x, y, z, rotation }),
            _ => None,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.rotation]
    }

    pub fn distance(&self, other: &Coordinate) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// A role-local offset with runtime adjustment.
///
/// Reads take a shared lock on the current value, so placement queries on
/// many threads proceed together while an occasional adjustment waits for
/// them to drain.
#[derive(Debug)]
pub struct Transform {
    raw: Offset,
    current: RwLock<Offset>,
}

impl Transform {
    pub fn new(raw: Offset) -> Self {
        Self {
            raw,
            current: RwLock::new(raw),
        }
    }

    /// The offset as authored.
    pub fn raw_offset(&self) -> Offset {
        self.raw
    }

    /// The offset in effect.
    pub fn offset(&self) -> Offset {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current offset.
    pub fn update_offset(&self, offset: Offset) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = offset;
    }

    /// Add `delta` to one component of the current offset.
    pub fn adjust(&self, axis: Axis, delta: f32) {
        self.current.write().unwrap_or_else(PoisonError::into_inner)[axis as usize] += delta;
    }

    /// Restore the current offset to the authored value.
    pub fn reset_offset(&self) {
        self.update_offset(self.raw);
    }

    /// Whether the current offset differs from the authored one.
    pub fn has_changes(&self) -> bool {
        self.offset() != self.raw
    }

    /// Apply the current offset to `coordinate`.
    ///
    /// The x/y translation is rotated by the coordinate's heading. The offset
    /// rotation (degrees) is added to the heading only when non-zero.
    pub fn apply(&self, coordinate: &mut Coordinate) {
        let [ox, oy, oz, or] = self.offset();
        let (sin, cos) = coordinate.rotation.sin_cos();

        coordinate.x += ox * cos - oy * sin;
        coordinate.y += ox * sin + oy * cos;
        coordinate.z += oz;
        if or != 0.0 {
            coordinate.rotation += or.to_radians();
        }
    }

    /// Load the current offset from a plain array, as written by
    /// [`save`](Self::save).
    ///
    /// Copies at most four values; missing trailing components keep their
    /// present value.
    pub fn load(&self, values: &[f32]) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        for (slot, value) in current.iter_mut().zip(values) {
            *slot = *value;
        }
    }

    /// The current offset in plain array form.
    pub fn save(&self) -> Vec<f32> {
        self.offset().to_vec()
    }
}

impl Clone for Transform {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw,
            current: RwLock::new(self.offset()),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new([0.0; OFFSET_LEN])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
