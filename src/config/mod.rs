// src/config/mod.rs

//! Plan file loading and validation for execkit.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate steps and resolve them into `ExecRequest`s (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, plan_root_dir};
pub use model::{
    CommandConfig, DefaultsSection, PlanFile, PlannedStep, RawPlanFile, StepConfig,
};
