//! Pipeline driver: parse headers, collect entities, render and write the
//! binding artifacts.

mod collect;

pub use collect::{collect_declarations, register_types};

use cybind_build::BuildConfig;
use cybind_clang::{ClangAst, ClangParser};
use cybind_gen::{emit, Artifacts, BindingSet, Declaration, HeaderBindings, KnownTypes, MethodPolicy, TypeWrap};
use miette::{miette, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Per-header entity counts reported by `check`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSummary {
    pub path: PathBuf,
    pub structs: usize,
    pub forward_declarations: usize,
    pub functions: usize,
    pub enums: usize,
}

/// Binding generator driver.
pub struct Driver {
    args: Vec<String>,
}

impl Driver {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Extra libclang arguments for headers parsed without a config.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Load `cybind.toml`.
    pub fn load_config(&self, path: impl AsRef<Path>) -> Result<BuildConfig> {
        let path = path.as_ref();
        BuildConfig::from_file(path).map_err(|e| miette!("{}: {}", path.display(), e))
    }

    /// Parse one header with the given arguments appended to the driver's.
    pub fn parse_header(&self, path: impl AsRef<Path>, args: &[String]) -> Result<ClangAst> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(miette!("Header not found: {}", path.display()));
        }
        info!(header = %path.display(), "parsing");
        ClangParser::new()?
            .with_args(self.args.iter().chain(args).cloned())
            .parse_file(path)
    }

    /// Run the full pipeline and write the artifacts. Nothing is written
    /// unless every header parses and all three files render.
    pub fn generate(&self, config: &BuildConfig) -> Result<Vec<PathBuf>> {
        let asts = config
            .headers
            .iter()
            .map(|header| self.parse_header(config.header_path(header), &config.clang_args(header)))
            .collect::<Result<Vec<_>>>()?;

        let artifacts = self.render(config, &asts)?;
        write_artifacts(&config.output_dir(), &config.output.module, &artifacts)
    }

    /// Render the artifacts for already parsed headers, in config order.
    pub fn render(&self, config: &BuildConfig, asts: &[ClangAst]) -> Result<Artifacts> {
        let mut known = KnownTypes::new();
        let mut headers = Vec::with_capacity(asts.len());
        for (header, ast) in config.headers.iter().zip(asts) {
            let declarations = collect_declarations(ast)?;
            register_types(&mut known, &declarations);
            info!(
                header = %header.path.display(),
                declarations = declarations.len(),
                "collected"
            );

            let mut bindings = HeaderBindings::new(ast, header.include_name());
            bindings.prefix = header.prefix.clone();
            bindings.excludes = header.excludes.clone();
            bindings.functions = header.functions.clone();
            bindings.wraps = header
                .wraps
                .iter()
                .map(|wrap| (wrap.name.clone(), wrap.clone()))
                .collect();
            bindings.declarations = declarations;
            headers.push(bindings);
        }

        for header in &headers {
            for name in header.wraps.keys() {
                if !known.structs.contains(name) {
                    warn!(name = %name, header = %header.header, "wrap entry matches no struct");
                }
            }
        }

        let set = BindingSet {
            native_module: config.output.native_module.clone(),
            known,
            headers,
        };
        Ok(emit(&set)?)
    }

    /// Parse headers and count what would be bound.
    pub fn check(&self, paths: &[PathBuf]) -> Result<Vec<HeaderSummary>> {
        let mut summaries = Vec::new();
        for path in paths {
            let ast = self.parse_header(path, &[])?;
            let mut summary = HeaderSummary {
                path: path.clone(),
                ..HeaderSummary::default()
            };
            for decl in collect_declarations(&ast)? {
                match decl {
                    Declaration::Struct(s) if s.is_forward_declaration() => {
                        summary.forward_declarations += 1
                    }
                    Declaration::Struct(_) => summary.structs += 1,
                    Declaration::Function(_) => summary.functions += 1,
                    Declaration::Enum(_) => summary.enums += 1,
                }
            }
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Indented outline of the AST snapshot.
    pub fn dump_ast(&self, path: impl AsRef<Path>) -> Result<String> {
        let ast = self.parse_header(path, &[])?;
        Ok(ast.dump(ast.root()))
    }

    /// The declaration model as the emitters would see it, with every method
    /// selected.
    pub fn dump_model(&self, path: impl AsRef<Path>) -> Result<String> {
        let ast = self.parse_header(path, &[])?;
        describe_model(&ast)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

/// Text outline of the collected declarations.
pub fn describe_model(ast: &ClangAst) -> Result<String> {
    let mut out = String::new();
    for decl in collect_declarations(ast)? {
        let namespace = decl.namespace(ast);
        let scope = if namespace.is_empty() {
            String::new()
        } else {
            format!("{}::", namespace)
        };
        match &decl {
            Declaration::Struct(s) => {
                let marker = if s.is_forward_declaration() {
                    " (forward)"
                } else if s.is_template() {
                    " (template)"
                } else {
                    ""
                };
                out.push_str(&format!("struct {}{}{}\n", scope, s.name(), marker));
                for field in s.fields() {
                    out.push_str(&format!("  field {}: {}\n", field.raw_name(), describe(&field)));
                }
                for ctor in s.constructors() {
                    out.push_str(&format!("  constructor ({} params)\n", ctor.params().len()));
                }
                for method in s.methods(&[], &MethodPolicy::All) {
                    out.push_str(&format!("  method {} -> {}\n", method.name(), describe(&method.result())));
                }
            }
            Declaration::Function(f) => {
                let params: Vec<String> = f.params().iter().map(describe).collect();
                out.push_str(&format!(
                    "fn {}{}({}) -> {}\n",
                    scope,
                    f.name(),
                    params.join(", "),
                    describe(&f.result())
                ));
            }
            Declaration::Enum(e) => {
                out.push_str(&format!("enum {}{}\n", scope, e.name()));
                for constant in e.constants() {
                    out.push_str(&format!("  {} = {}\n", constant.name, constant.value));
                }
            }
        }
    }
    Ok(out)
}

/// Underlying spelling, or the written one when a typedef cannot be followed.
fn describe(tw: &TypeWrap<'_>) -> String {
    tw.underlying_spelling()
        .unwrap_or_else(|_| tw.ty().spelling.to_string())
}

/// Write `<module>.pxd`, `<module>.pyx` and `<module>.pyi` into `dir`.
pub fn write_artifacts(dir: &Path, module: &str, artifacts: &Artifacts) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| miette!("Failed to create {}: {}", dir.display(), e))?;

    let mut written = Vec::new();
    for (ext, text) in [("pxd", &artifacts.pxd), ("pyx", &artifacts.pyx), ("pyi", &artifacts.pyi)] {
        let path = dir.join(format!("{}.{}", module, ext));
        std::fs::write(&path, text)
            .map_err(|e| miette!("Failed to write {}: {}", path.display(), e))?;
        info!(path = %path.display(), "wrote");
        written.push(path);
    }
    Ok(written)
}
