// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Load a plan file from a given path and return the raw `RawPlanFile`.
///
/// This only performs TOML deserialization; it does **not** validate steps
/// or parse commands. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let plan: RawPlanFile = toml::from_str(&contents)?;

    Ok(plan)
}

/// Load a plan file from path, validate it, and anchor relative
/// `working_dir` / `output_file` paths at the plan file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let plan = PlanFile::try_from(raw)?;
    Ok(plan.rooted_at(&plan_root_dir(path)))
}

/// Directory that relative paths inside a plan are resolved against.
///
/// - "configs/Execkit.toml" resolves against "configs".
/// - A bare "Execkit.toml" (parent = "") resolves against the current
///   working directory.
pub fn plan_root_dir(plan_path: &Path) -> PathBuf {
    match plan_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
