//! Snapshot of a libclang `CXType`.

use smol_str::SmolStr;

/// The subset of clang type kinds the generator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// No type (namespaces, references, ...)
    Invalid,
    Void,
    Bool,
    /// Any builtin integer, including `char`
    Int,
    /// `float`, `double`, `long double`
    Float,
    Pointer,
    LValueReference,
    RValueReference,
    /// `T[N]`
    ConstantArray,
    /// `T[]`
    IncompleteArray,
    /// A typedef or `using` alias
    Typedef,
    /// struct, class or union
    Record,
    Enum,
    /// Function prototype (seen through function pointers)
    Function,
    /// Dependent template parameter
    TemplateParam,
    /// Template specializations and other types clang does not expose
    Unexposed,
    Other,
}

/// A clang type as seen at one use site.
///
/// Elaborated types are flattened at conversion time: the kind is the kind of
/// the named type while `spelling` keeps what was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClangType {
    pub kind: TypeKind,
    /// Type spelling exactly as clang prints it (e.g. `const float *`)
    pub spelling: SmolStr,
    /// Whether the type itself is const-qualified
    pub is_const: bool,
    /// Pointee for pointers and references
    pub pointee: Option<Box<ClangType>>,
    /// Element type for arrays
    pub element: Option<Box<ClangType>>,
    /// Size of a constant array
    pub array_size: Option<u64>,
}

impl ClangType {
    pub fn new(kind: TypeKind, spelling: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            is_const: false,
            pointee: None,
            element: None,
            array_size: None,
        }
    }

    /// The type of cursors that have none.
    pub fn invalid() -> Self {
        Self::new(TypeKind::Invalid, "")
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void, "void")
    }

    /// A builtin integer type such as `int` or `unsigned char`.
    pub fn int(spelling: &str) -> Self {
        Self::new(TypeKind::Int, spelling)
    }

    /// A builtin floating point type.
    pub fn float(spelling: &str) -> Self {
        Self::new(TypeKind::Float, spelling)
    }

    /// A struct/class type.
    pub fn record(name: &str) -> Self {
        Self::new(TypeKind::Record, name)
    }

    /// A use of a typedef name.
    pub fn typedef(name: &str) -> Self {
        Self::new(TypeKind::Typedef, name)
    }

    /// Const-qualify this type, spelled the way clang spells it.
    pub fn constant(mut self) -> Self {
        self.spelling = match self.kind {
            TypeKind::Pointer => format!("{}const", self.spelling).into(),
            _ => format!("const {}", self.spelling).into(),
        };
        self.is_const = true;
        self
    }

    /// Create a pointer to this type.
    pub fn ptr(self) -> Self {
        let spelling = if self.spelling.ends_with('*') {
            format!("{}*", self.spelling)
        } else {
            format!("{} *", self.spelling)
        };
        Self {
            pointee: Some(Box::new(self)),
            ..Self::new(TypeKind::Pointer, spelling)
        }
    }

    /// Create an lvalue reference to this type.
    pub fn lvalue_ref(self) -> Self {
        let spelling = format!("{} &", self.spelling);
        Self {
            pointee: Some(Box::new(self)),
            ..Self::new(TypeKind::LValueReference, spelling)
        }
    }

    /// Create a constant array `T[size]` of this type.
    ///
    /// For an element that is itself an array the new dimension goes in front
    /// of the existing ones, matching C declarator order.
    pub fn array(self, size: u64) -> Self {
        let spelling = match self.spelling.find('[') {
            Some(at) => format!("{}[{}]{}", &self.spelling[..at], size, &self.spelling[at..]),
            None => format!("{}[{}]", self.spelling, size),
        };
        Self {
            element: Some(Box::new(self)),
            array_size: Some(size),
            ..Self::new(TypeKind::ConstantArray, spelling)
        }
    }

    /// Get the pointee for a pointer or reference type.
    pub fn pointee(&self) -> Option<&ClangType> {
        self.pointee.as_deref()
    }

    /// Get the element type of an array.
    pub fn element(&self) -> Option<&ClangType> {
        self.element.as_deref()
    }

    pub fn is_pointer(&self) -> bool {
        self.kind == TypeKind::Pointer
    }
}

impl Default for ClangType {
    fn default() -> Self {
        Self::invalid()
    }
}
