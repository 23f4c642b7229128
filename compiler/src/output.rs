use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{error::SbeError, traits::GeneratedUnit};

/// Where generated units end up.
pub trait OutputManager {
    fn write_unit(&mut self, unit: &GeneratedUnit) -> Result<(), SbeError>;
}

/// Writes one file per unit under `base/<package as directories>/`.
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectoryOutput {
    /// `package` is split on dots, so `baseline.cars` lands in
    /// `base/baseline/cars`. The directory is created on first write.
    pub fn new(base: impl AsRef<Path>, package: Option<&str>) -> Self {
        let mut dir = base.as_ref().to_path_buf();
        if let Some(package) = package {
            dir.extend(package.split('.').filter(|part| !part.is_empty()));
        }
        DirectoryOutput { dir, written: Vec::new() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl OutputManager for DirectoryOutput {
    fn write_unit(&mut self, unit: &GeneratedUnit) -> Result<(), SbeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&unit.file_name);
        fs::write(&path, &unit.contents)?;
        debug!(path = %path.display(), bytes = unit.contents.len(), "wrote unit");
        self.written.push(path);
        Ok(())
    }
}

/// Keeps units in memory, keyed by file name. Used by tests and by callers
/// that want the source text directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    pub files: BTreeMap<String, String>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.files.get(file_name).map(String::as_str)
    }
}

impl OutputManager for MemoryOutput {
    fn write_unit(&mut self, unit: &GeneratedUnit) -> Result<(), SbeError> {
        self.files.insert(unit.file_name.clone(), unit.contents.clone());
        Ok(())
    }
}
