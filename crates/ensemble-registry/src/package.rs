//! A decoded content package: the unit of load and unload.

use std::path::Path;
use std::sync::Arc;

use crate::decode::{DecodeError, Decoder};
use crate::scene::Scene;
use crate::RegistryError;

/// Name, author, content hash and the scenes of one package file.
#[derive(Debug)]
pub struct AnimPackage {
    name: String,
    author: Arc<str>,
    hash: Arc<str>,
    scenes: Vec<Arc<Scene>>,
    /// BLAKE3 digest of the source bytes; identical files share it.
    fingerprint: blake3::Hash,
}

impl AnimPackage {
    pub(crate) fn new(name: String, author: Arc<str>, hash: Arc<str>, scenes: Vec<Arc<Scene>>) -> Self {
        Self {
            name,
            author,
            hash,
            scenes,
            fingerprint: blake3::Hash::from([0; 32]),
        }
    }

    /// Decode a package from its complete byte image.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`]; nothing of the package survives.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut package = Decoder::new(bytes).read_package()?;
        package.fingerprint = blake3::hash(bytes);
        Ok(package)
    }

    /// Read and decode a package file.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let bytes = std::fs::read(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes).map_err(|source| RegistryError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn scenes(&self) -> &[Arc<Scene>] {
        &self.scenes
    }

    pub fn scene(&self, id: &str) -> Option<&Arc<Scene>> {
        self.scenes.iter().find(|s| s.id() == id)
    }

    pub fn fingerprint(&self) -> blake3::Hash {
        self.fingerprint
    }
}
