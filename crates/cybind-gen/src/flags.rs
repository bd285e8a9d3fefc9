//! Per-entity member inclusion flags.

use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::BTreeSet;

/// Which methods of a struct (or which free functions of a header) to bind.
///
/// In configuration files this is either a boolean or a list of names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "PolicyRepr")]
pub enum MethodPolicy {
    All,
    #[default]
    None,
    Only(BTreeSet<SmolStr>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyRepr {
    Flag(bool),
    Names(Vec<SmolStr>),
}

impl From<PolicyRepr> for MethodPolicy {
    fn from(repr: PolicyRepr) -> Self {
        match repr {
            PolicyRepr::Flag(true) => MethodPolicy::All,
            PolicyRepr::Flag(false) => MethodPolicy::None,
            PolicyRepr::Names(names) => MethodPolicy::Only(names.into_iter().collect()),
        }
    }
}

impl MethodPolicy {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            MethodPolicy::All => true,
            MethodPolicy::None => false,
            MethodPolicy::Only(names) => names.contains(name),
        }
    }
}

/// What to emit for one struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WrapFlags {
    pub name: SmolStr,
    /// Emit the field list
    pub fields: bool,
    pub methods: MethodPolicy,
    /// Python code spliced verbatim into the generated class
    pub custom_methods: Vec<String>,
}

impl WrapFlags {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_fields(mut self) -> Self {
        self.fields = true;
        self
    }

    pub fn with_methods(mut self, methods: MethodPolicy) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_custom_method(mut self, code: impl Into<String>) -> Self {
        self.custom_methods.push(code.into());
        self
    }
}
