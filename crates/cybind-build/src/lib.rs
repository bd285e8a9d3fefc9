//! Configuration for the cybind binding generator.
//!
//! This crate provides the `cybind.toml` format: which headers to parse,
//! how to invoke libclang on them and which members of each struct to bind.
//!
//! # Example
//!
//! ```toml
//! # cybind.toml
//! [project]
//! name = "imgui"
//!
//! [output]
//! dir = "src/pydear"
//! module = "impl"
//!
//! [[header]]
//! path = "imgui/imgui.h"
//! excludes = ["va_list"]
//! functions = true
//!
//! [[header.wrap]]
//! name = "ImVec2"
//! fields = true
//! ```

mod config;
mod error;

pub use config::{BuildConfig, CompilerConfig, HeaderConfig, OutputConfig, ProjectConfig};
pub use error::{ConfigError, Result};
