// Hot-swappable model handle for long-running services.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use g2p_core::{DecodeError, DecodeOptions, PhonemizationResult};
use g2p_fst::LoadError;
use tracing::info;

use crate::model::Model;

/// A [`Model`] that can be replaced while other threads decode with it.
///
/// Readers take a snapshot with [`current`](Self::current) and keep decoding
/// against it even if a reload happens meanwhile. A reload builds the new
/// model completely before swapping, so a failed load leaves the old model in
/// place.
#[derive(Debug)]
pub struct SharedModel {
    model: RwLock<Model>,
    generation: AtomicU64,
}

impl SharedModel {
    pub fn new(model: Model) -> Self {
        Self {
            model: RwLock::new(model),
            generation: AtomicU64::new(0),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Model::load(path).map(Self::new)
    }

    /// Snapshot of the model in use.
    pub fn current(&self) -> Model {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in `model`; returns the new generation number.
    pub fn replace(&self, model: Model) -> u64 {
        let mut guard = self.model.write().unwrap_or_else(PoisonError::into_inner);
        *guard = model;
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Load `path` and swap it in. On error the current model stays.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<u64, LoadError> {
        let path = path.as_ref();
        let model = Model::load(path)?;
        let generation = self.replace(model);
        info!(path = %path.display(), generation, "reloaded G2P model");
        Ok(generation)
    }

    /// Number of successful swaps since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Decode with the current snapshot.
    pub fn phonemize_word(
        &self,
        word: &str,
        options: &DecodeOptions,
    ) -> Result<Vec<PhonemizationResult>, DecodeError> {
        self.current().phonemize_word(word, options)
    }
}

impl From<Model> for SharedModel {
    fn from(model: Model) -> Self {
        Self::new(model)
    }
}
