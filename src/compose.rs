//! Pipeline: layout, then serialize, then (optionally) write to disk.
//!
//! ```ignore
//! let mut cache = FontCache::new(options.fonts.library());
//! cache.prepare(&doc);
//! let composer = Composer::new(&cache, options);
//! composer.compose_to_path(&doc, "label.lbx")?;
//! ```

use std::fs;
use std::path::Path;

use log::info;
use rayon::prelude::*;

use crate::codec::{Decoded, read_archive, write_archive};
use crate::config::ComposeOptions;
use crate::document::LabelDocument;
use crate::error::{Result, Warning};
use crate::layout::{ComputedLayout, layout};
use crate::metrics::FontCache;
use crate::text::TextCalculator;

/// A finished archive with the layout it was written from.
#[derive(Debug, Clone)]
pub struct Composed {
    pub archive: Vec<u8>,
    pub layout: ComputedLayout,
    pub warnings: Vec<Warning>,
}

/// Runs documents through layout and serialization against a shared,
/// already prepared font cache.
pub struct Composer<'c> {
    cache: &'c FontCache,
    options: ComposeOptions,
}

impl<'c> Composer<'c> {
    pub fn new(cache: &'c FontCache, options: ComposeOptions) -> Self {
        Self { cache, options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    pub fn compose(&self, doc: &LabelDocument) -> Result<Composed> {
        let calc = TextCalculator::new(self.cache, self.options.layout.clone());
        let computed = layout(doc, &calc)?;
        let archive = write_archive(doc, &computed, &self.options.codec)?;
        let warnings = computed.warnings().to_vec();
        info!(
            objects = doc.objects.len(),
            bytes = archive.len(),
            warnings = warnings.len();
            "Composed label archive"
        );
        Ok(Composed {
            archive,
            layout: computed,
            warnings,
        })
    }

    /// Compose and write to `path`. The file is not touched when composition
    /// fails.
    pub fn compose_to_path(&self, doc: &LabelDocument, path: impl AsRef<Path>) -> Result<Composed> {
        let composed = self.compose(doc)?;
        let path = path.as_ref();
        fs::write(path, &composed.archive)?;
        info!(path = path.display().to_string(); "Wrote label archive");
        Ok(composed)
    }

    /// Compose every document in parallel. Results keep input order and one
    /// failure does not stop the others.
    pub fn compose_batch(&self, docs: &[LabelDocument]) -> Vec<Result<Composed>> {
        docs.par_iter().map(|doc| self.compose(doc)).collect()
    }

    /// Read an archive from disk with this composer's codec options.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Decoded> {
        let bytes = fs::read(path)?;
        self.open_bytes(&bytes)
    }

    pub fn open_bytes(&self, bytes: &[u8]) -> Result<Decoded> {
        read_archive(bytes, &self.options.codec)
    }
}
