//! Output buffers keyed by relative path.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::writer::CSourceWriter;
use crate::error::{GenError, GenResult};

/// Every file of one run. Buffers are only ever appended to and are
/// written out together by `flush`.
#[derive(Debug, Clone)]
pub struct OutputManager {
    indent: String,
    buffers: Vec<CSourceWriter>,
    index: HashMap<String, usize>,
}

impl OutputManager {
    pub fn new(indent: &str) -> Self {
        Self {
            indent: indent.to_string(),
            buffers: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The buffer for `path`, created on first request
    pub fn create_or_get(&mut self, path: &str, is_header: bool) -> &mut CSourceWriter {
        let slot = match self.index.get(path) {
            Some(&slot) => slot,
            None => {
                debug!(path, "creating output file");
                self.buffers
                    .push(CSourceWriter::new(path, is_header, &self.indent));
                self.index.insert(path.to_string(), self.buffers.len() - 1);
                self.buffers.len() - 1
            }
        };
        &mut self.buffers[slot]
    }

    pub fn get(&self, path: &str) -> Option<&CSourceWriter> {
        self.index.get(path).map(|&slot| &self.buffers[slot])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Paths in creation order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.buffers.iter().map(CSourceWriter::path)
    }

    /// Rendered text of `path`
    pub fn render(&self, path: &str) -> Option<String> {
        self.get(path).map(CSourceWriter::render)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Write every buffer under `dir`, creating directories as needed
    pub fn flush(self, dir: &Path) -> GenResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.buffers.len());
        for buffer in &self.buffers {
            let path = dir.join(buffer.path());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| GenError::io(parent, e))?;
            }
            fs::write(&path, buffer.render()).map_err(|e| GenError::io(&path, e))?;
            debug!(path = %path.display(), "wrote output file");
            written.push(path);
        }
        Ok(written)
    }
}
