//! Binding configuration types (cybind.toml format).

use crate::error::ConfigError;
use cybind_gen::{MethodPolicy, WrapFlags};
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Root binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Project metadata.
    pub project: ProjectConfig,

    /// Where and under which module name the artifacts are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Global compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Headers to bind, in emission order.
    #[serde(rename = "header", default)]
    pub headers: Vec<HeaderConfig>,

    /// Directory of the config file; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project name.
    pub name: String,

    /// Root for header paths (default: config file directory).
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Output layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the three artifacts.
    pub dir: PathBuf,

    /// File stem shared by `.pxd`, `.pyx` and `.pyi`.
    pub module: String,

    /// Native extension module the pyx trampolines call.
    pub native_module: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            module: "impl".to_string(),
            native_module: "_impl".to_string(),
        }
    }
}

/// Global compiler configuration passed to libclang.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerConfig {
    /// C++ standard (e.g., "c++17").
    #[serde(default)]
    pub std: Option<String>,

    /// Global include directories.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Global preprocessor definitions.
    #[serde(default)]
    pub defines: Vec<String>,

    /// Additional compiler flags.
    #[serde(default)]
    pub cflags: Vec<String>,
}

/// One header to bind.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderConfig {
    /// Header path, relative to the project root.
    pub path: PathBuf,

    /// Extra include directories for this header.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Prefix for the Python names of free functions.
    #[serde(default)]
    pub prefix: String,

    /// Type spellings whose methods and functions are skipped.
    #[serde(default)]
    pub excludes: Vec<SmolStr>,

    /// Which free functions to bind.
    #[serde(default)]
    pub functions: MethodPolicy,

    /// Per-struct member flags.
    #[serde(rename = "wrap", default)]
    pub wraps: Vec<WrapFlags>,
}

impl BuildConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse and validate configuration text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: BuildConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.headers.is_empty() {
            return Err(ConfigError::Validation("no [[header]] entries".to_string()));
        }
        if self.output.module.is_empty() {
            return Err(ConfigError::Validation("output.module is empty".to_string()));
        }
        for header in &self.headers {
            let mut seen = HashSet::new();
            for wrap in &header.wraps {
                if wrap.name.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "{}: [[header.wrap]] without a name",
                        header.path.display()
                    )));
                }
                if !seen.insert(wrap.name.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "{}: duplicate wrap entry for `{}`",
                        header.path.display(),
                        wrap.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Directory that header paths are relative to.
    pub fn root(&self) -> PathBuf {
        match &self.project.root {
            Some(root) => self.base_dir.join(root),
            None => self.base_dir.clone(),
        }
    }

    /// Absolute-or-cwd-relative path of a header.
    pub fn header_path(&self, header: &HeaderConfig) -> PathBuf {
        self.root().join(&header.path)
    }

    /// Get all include directories for a header (including global).
    pub fn get_includes(&self, header: &HeaderConfig) -> Vec<PathBuf> {
        let root = self.root();
        self.compiler
            .includes
            .iter()
            .chain(&header.includes)
            .map(|dir| root.join(dir))
            .collect()
    }

    /// Output directory resolved against the config file.
    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.output.dir)
    }

    /// libclang arguments for one header, appended after the parser's own
    /// `-x c++ -std=c++17`.
    pub fn clang_args(&self, header: &HeaderConfig) -> Vec<String> {
        let mut args: Vec<String> = self.compiler.std.iter().map(|std| format!("-std={}", std)).collect();
        args.extend(
            self.get_includes(header)
                .iter()
                .map(|dir| format!("-I{}", dir.display())),
        );
        args.extend(self.compiler.defines.iter().map(|d| format!("-D{}", d)));
        args.extend(self.compiler.cflags.iter().cloned());
        args
    }
}

impl HeaderConfig {
    /// Name used in the pxd `cdef extern from` line.
    pub fn include_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
