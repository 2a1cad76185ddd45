//! Project binding and the artifacts written to the output folder.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const BATCH_EXTENSION: &str = "bat";

#[derive(Debug, Clone, Default)]
pub struct Project {
    path: Option<PathBuf>,
}

impl Project {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn bind(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    pub fn unbind(&mut self) {
        self.path = None;
    }

    pub fn filename_label(&self) -> String {
        match self.path.as_deref().and_then(|p| p.file_name()) {
            Some(name) => format!("Editing: {}", name.to_string_lossy()),
            None => "No project loaded".to_string(),
        }
    }
}

/// Base name up to the first `.`; `deploy.prod.bat` becomes `deploy`.
pub fn project_name(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let name = file_name.split('.').next().unwrap_or_default();
    if name.is_empty() {
        bail!("Cannot derive a project name from {}", path.display());
    }
    Ok(name.to_string())
}

pub fn artifact_path(output_folder: &Path, name: &str) -> PathBuf {
    output_folder.join(format!("{name}.{BATCH_EXTENSION}"))
}

/// Removes every `<name>*.bat` file directly inside `output_folder`.
pub fn delete_previous_saves(output_folder: &Path, name: &str) -> Result<usize> {
    if !output_folder.exists() {
        return Ok(0);
    }
    let suffix = format!(".{BATCH_EXTENSION}");
    let mut removed = 0;
    for entry in WalkDir::new(output_folder).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("Failed to list {}", output_folder.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if file_name.starts_with(name) && file_name.ends_with(&suffix) {
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
            tracing::debug!(path = %entry.path().display(), "removed previous save");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Writes `content` as the single artifact for `project_path` and returns where it went.
pub fn save_artifact(output_folder: &Path, project_path: &Path, content: &str) -> Result<PathBuf> {
    let name = project_name(project_path)?;
    ensure_output_folder(output_folder)?;
    delete_previous_saves(output_folder, &name)?;
    let target = artifact_path(output_folder, &name);
    fs::write(&target, content)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(target)
}

pub fn ensure_output_folder(output_folder: &Path) -> Result<()> {
    fs::create_dir_all(output_folder)
        .with_context(|| format!("Failed to create {}", output_folder.display()))
}

pub fn has_batch_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BATCH_EXTENSION))
}

/// Reads a batch file for editing; other extensions are refused.
pub fn read_project_file(path: &Path) -> Result<String> {
    if !has_batch_extension(path) {
        bail!("Not a batch file: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Turns prompt input into a new-project target. Empty input means cancel.
pub fn new_project_target(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut path = PathBuf::from(trimmed);
    if path.extension().is_none() {
        path.set_extension(BATCH_EXTENSION);
    }
    Some(path)
}
