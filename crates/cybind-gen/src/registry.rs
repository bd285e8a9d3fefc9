//! Primitive type catalog and native → Python type classification.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

/// Semantic kind of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Signed,
    Unsigned,
    Float,
}

/// One native primitive the bindings know how to marshal.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Native spelling
    pub name: &'static str,
    /// Extra spellings funnelled into this descriptor
    pub aliases: &'static [&'static str],
    pub kind: PrimitiveKind,
    /// Size class in bits (0 for void)
    pub bits: u32,
}

impl TypeDescriptor {
    const fn new(name: &'static str, kind: PrimitiveKind, bits: u32) -> Self {
        Self {
            name,
            aliases: &[],
            kind,
            bits,
        }
    }

    pub fn matches(&self, spelling: &str) -> bool {
        self.name == spelling || self.aliases.contains(&spelling)
    }

    /// Python annotation for values of this type.
    pub fn py_typing(&self) -> &'static str {
        match self.kind {
            PrimitiveKind::Void => "None",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Signed | PrimitiveKind::Unsigned => "int",
            PrimitiveKind::Float => "float",
        }
    }

    /// ctypes type used in `_fields_`.
    pub fn ctypes_type(&self) -> &'static str {
        match (self.kind, self.bits) {
            (PrimitiveKind::Void, _) => "None",
            (PrimitiveKind::Bool, _) => "ctypes.c_bool",
            (PrimitiveKind::Unsigned, 8) => "ctypes.c_uint8",
            (PrimitiveKind::Unsigned, 16) => "ctypes.c_uint16",
            (PrimitiveKind::Unsigned, 32) => "ctypes.c_uint32",
            (PrimitiveKind::Unsigned, _) => "ctypes.c_uint64",
            (PrimitiveKind::Signed, 8) => "ctypes.c_int8",
            (PrimitiveKind::Signed, 16) => "ctypes.c_int16",
            (PrimitiveKind::Signed, 32) => "ctypes.c_int32",
            (PrimitiveKind::Signed, _) => "ctypes.c_int64",
            (PrimitiveKind::Float, 32) => "ctypes.c_float",
            (PrimitiveKind::Float, _) => "ctypes.c_double",
        }
    }
}

/// Match order matters: the first descriptor accepting a spelling wins.
static PRIMITIVES: &[TypeDescriptor] = &[
    TypeDescriptor::new("void", PrimitiveKind::Void, 0),
    TypeDescriptor::new("bool", PrimitiveKind::Bool, 8),
    TypeDescriptor::new("unsigned char", PrimitiveKind::Unsigned, 8),
    TypeDescriptor::new("unsigned short", PrimitiveKind::Unsigned, 16),
    TypeDescriptor::new("unsigned int", PrimitiveKind::Unsigned, 32),
    // The interop layer cannot tell `size_t *` from `unsigned long long *`,
    // so both spellings share one representation.
    TypeDescriptor {
        aliases: &["size_t"],
        ..TypeDescriptor::new("unsigned long long", PrimitiveKind::Unsigned, 64)
    },
    TypeDescriptor::new("char", PrimitiveKind::Signed, 8),
    TypeDescriptor::new("signed char", PrimitiveKind::Signed, 8),
    TypeDescriptor::new("short", PrimitiveKind::Signed, 16),
    TypeDescriptor::new("int", PrimitiveKind::Signed, 32),
    TypeDescriptor::new("long long", PrimitiveKind::Signed, 64),
    TypeDescriptor::new("float", PrimitiveKind::Float, 32),
    TypeDescriptor::new("double", PrimitiveKind::Float, 64),
];

/// Struct and enum names declared anywhere in the header set.
#[derive(Debug, Default, Clone)]
pub struct KnownTypes {
    pub structs: FxHashSet<SmolStr>,
    pub enums: FxHashSet<SmolStr>,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_struct(&mut self, name: impl Into<SmolStr>) {
        self.structs.insert(name.into());
    }

    pub fn add_enum(&mut self, name: impl Into<SmolStr>) {
        self.enums.insert(name.into());
    }
}

/// How one native type is represented on the Python side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostType {
    Primitive(&'static TypeDescriptor),
    Pointer(Box<HostType>),
    Reference(Box<HostType>),
    Array { element: Box<HostType>, len: u64 },
    FunctionPointer,
    Struct(SmolStr),
    Enum(SmolStr),
    /// No registry match and no known struct; rendered verbatim
    Unresolved(SmolStr),
}

impl HostType {
    /// Type expression for a ctypes `_fields_` entry.
    pub fn ctypes_type(&self) -> String {
        match self {
            HostType::Primitive(desc) => desc.ctypes_type().to_string(),
            HostType::Pointer(inner) if inner.is_char() => "ctypes.c_char_p".to_string(),
            HostType::Pointer(_) | HostType::Reference(_) | HostType::FunctionPointer => {
                "ctypes.c_void_p".to_string()
            }
            HostType::Array { element, len } => format!("{} * {}", element.ctypes_type(), len),
            HostType::Struct(name) => name.to_string(),
            HostType::Enum(_) => "ctypes.c_int32".to_string(),
            HostType::Unresolved(spelling) => spelling.to_string(),
        }
    }

    /// Python annotation for stubs and trampolines.
    pub fn py_annotation(&self) -> String {
        match self {
            HostType::Primitive(desc) => desc.py_typing().to_string(),
            HostType::Pointer(inner) if inner.is_char() => "bytes".to_string(),
            HostType::Pointer(inner) | HostType::Reference(inner) => match inner.as_ref() {
                HostType::Struct(name) => name.to_string(),
                HostType::Reference(_) | HostType::Pointer(_) => "ctypes.c_void_p".to_string(),
                other if matches!(self, HostType::Reference(_)) => other.py_annotation(),
                _ => "ctypes.c_void_p".to_string(),
            },
            HostType::Array { .. } => "ctypes.Array".to_string(),
            HostType::FunctionPointer => "ctypes.c_void_p".to_string(),
            HostType::Struct(name) | HostType::Enum(name) => name.to_string(),
            HostType::Unresolved(spelling) => spelling.to_string(),
        }
    }

    /// The first spelling that could not be classified, if any.
    pub fn unresolved(&self) -> Option<&str> {
        match self {
            HostType::Unresolved(spelling) => Some(spelling),
            HostType::Pointer(inner) | HostType::Reference(inner) => inner.unresolved(),
            HostType::Array { element, .. } => element.unresolved(),
            _ => None,
        }
    }

    fn is_char(&self) -> bool {
        matches!(self, HostType::Primitive(desc) if desc.name == "char")
    }
}

/// Ordered catalog of primitive descriptors.
#[derive(Debug, Clone, Copy)]
pub struct TypeRegistry {
    descriptors: &'static [TypeDescriptor],
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: PRIMITIVES,
        }
    }

    pub fn descriptors(&self) -> &'static [TypeDescriptor] {
        self.descriptors
    }

    /// First descriptor matching `spelling` exactly or by alias.
    pub fn lookup(&self, spelling: &str) -> Option<&'static TypeDescriptor> {
        self.descriptors.iter().find(|desc| desc.matches(spelling))
    }

    /// Classify a resolved spelling (see `TypeWrap::underlying_spelling`).
    pub fn classify(&self, spelling: &str, known: &KnownTypes) -> HostType {
        let spelling = strip_cv(spelling);

        // `void (*)(int)` from an alias, or `void (int) *` from a resolved pointee
        if spelling.contains("(*)") || spelling.trim_end_matches(['*', ' ']).ends_with(')') {
            return HostType::FunctionPointer;
        }
        if let Some(inner) = spelling.strip_suffix("&&").or_else(|| spelling.strip_suffix('&')) {
            return HostType::Reference(Box::new(self.classify(inner, known)));
        }
        if let Some(inner) = spelling.strip_suffix('*') {
            return HostType::Pointer(Box::new(self.classify(inner, known)));
        }
        if let Some((element, len)) = split_array_suffix(spelling) {
            let element = Box::new(self.classify(element, known));
            return match len {
                Some(len) => HostType::Array { element, len },
                None => HostType::Pointer(element),
            };
        }

        let bare = strip_elaboration(spelling);
        if let Some(desc) = self.lookup(bare) {
            return HostType::Primitive(desc);
        }
        let base = bare.split('<').next().unwrap_or(bare).trim();
        if known.structs.contains(base) {
            return HostType::Struct(base.into());
        }
        if known.enums.contains(bare) {
            return HostType::Enum(bare.into());
        }
        HostType::Unresolved(spelling.into())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `T [N]` (or `T[N]`, `T []`) into element spelling and size.
pub fn split_array_suffix(spelling: &str) -> Option<(&str, Option<u64>)> {
    let spelling = spelling.trim_end();
    let body = spelling.strip_suffix(']')?;
    let open = body.rfind('[')?;
    let size = &body[open + 1..];
    if !size.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((body[..open].trim_end(), size.parse().ok()))
}

/// Remove leading/trailing `const` and `volatile` qualifiers.
fn strip_cv(spelling: &str) -> &str {
    let mut current = spelling.trim();
    loop {
        let before = current;
        for qualifier in ["const", "volatile"] {
            if let Some(rest) = current.strip_prefix(qualifier) {
                if rest.starts_with(' ') {
                    current = rest.trim_start();
                }
            }
            if let Some(rest) = current.strip_suffix(qualifier) {
                if rest.ends_with([' ', '*', '&']) {
                    current = rest.trim_end();
                }
            }
        }
        if current == before {
            return current;
        }
    }
}

fn strip_elaboration(spelling: &str) -> &str {
    ["struct ", "class ", "enum ", "union "]
        .iter()
        .find_map(|prefix| spelling.strip_prefix(prefix))
        .unwrap_or(spelling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_exact_names() {
        let registry = TypeRegistry::new();
        let desc = registry.lookup("unsigned int").unwrap();
        assert_eq!(desc.bits, 32);
        assert_eq!(desc.kind, PrimitiveKind::Unsigned);
        assert_eq!(desc.ctypes_type(), "ctypes.c_uint32");
        assert!(registry.lookup("ImVec2").is_none());
    }

    #[test]
    fn test_size_t_shares_unsigned_long_long() {
        let registry = TypeRegistry::new();
        let size_t = registry.lookup("size_t").unwrap();
        let ull = registry.lookup("unsigned long long").unwrap();
        assert!(std::ptr::eq(size_t, ull));
        assert_eq!(size_t.ctypes_type(), "ctypes.c_uint64");
    }

    #[test]
    fn test_every_descriptor_finds_itself_first() {
        let registry = TypeRegistry::new();
        for desc in registry.descriptors() {
            assert!(std::ptr::eq(registry.lookup(desc.name).unwrap(), desc));
        }
    }

    #[test]
    fn test_classify_pointers_and_qualifiers() {
        let registry = TypeRegistry::new();
        let known = KnownTypes::new();

        let ty = registry.classify("const char *", &known);
        assert_eq!(ty.ctypes_type(), "ctypes.c_char_p");
        assert_eq!(ty.py_annotation(), "bytes");

        let ty = registry.classify("float **", &known);
        assert_eq!(ty.ctypes_type(), "ctypes.c_void_p");

        let ty = registry.classify("const float", &known);
        assert_eq!(ty.py_annotation(), "float");
    }

    #[test]
    fn test_classify_structs_and_enums() {
        let registry = TypeRegistry::new();
        let mut known = KnownTypes::new();
        known.add_struct("ImVec2");
        known.add_struct("ImVector");
        known.add_enum("ImGuiDir");

        assert_eq!(registry.classify("ImVec2", &known), HostType::Struct("ImVec2".into()));
        assert_eq!(
            registry.classify("const ImVec2 &", &known).py_annotation(),
            "ImVec2"
        );
        assert_eq!(
            registry.classify("ImVector<ImDrawCmd>", &known),
            HostType::Struct("ImVector".into())
        );
        assert_eq!(registry.classify("ImGuiDir", &known).ctypes_type(), "ctypes.c_int32");
    }

    #[test]
    fn test_unresolved_is_verbatim() {
        let registry = TypeRegistry::new();
        let ty = registry.classify("std::vector<int>", &KnownTypes::new());
        assert_eq!(ty.unresolved(), Some("std::vector<int>"));
        assert_eq!(ty.ctypes_type(), "std::vector<int>");
    }

    #[test]
    fn test_array_dimensions_round_trip() {
        let registry = TypeRegistry::new();
        let mut spelling = String::from("float");
        for len in [4, 3, 2] {
            spelling = format!("{} [{}]", spelling, len);
        }

        let mut unwrapped = spelling.as_str();
        let mut lens = Vec::new();
        while let Some((element, len)) = split_array_suffix(unwrapped) {
            lens.push(len.unwrap());
            unwrapped = element;
        }
        assert_eq!(unwrapped, "float");
        assert_eq!(lens, vec![2, 3, 4]);

        let ty = registry.classify(&spelling, &KnownTypes::new());
        assert_eq!(ty.ctypes_type(), "ctypes.c_float * 4 * 3 * 2");
    }
}
