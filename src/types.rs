use std::fmt;

/// A source-level type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    /// Booleans are represented as integers (1 or 0) once lowered.
    Bool,
    String,
    Array(Box<Type>),
    /// The `nothing` type. Only valid as a function return type.
    None,
}

impl Type {
    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    /// Structural compatibility. Arrays are compatible iff their element types
    /// are; every other type is only compatible with itself.
    pub fn is_compatible_with(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Array(a), Type::Array(b)) => a.is_compatible_with(b),
            (Type::Array(_), _) | (_, Type::Array(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Whether values of this type can be used as arithmetic or relational
    /// operands.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Int | Type::Bool)
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Type::None)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Bool => f.write_str("bool"),
            Type::String => f.write_str("str"),
            Type::Array(element) => write!(f, "array<{element}>"),
            Type::None => f.write_str("nothing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        let cases = [
            (Type::Int, Type::Int, true),
            (Type::Bool, Type::Bool, true),
            (Type::Int, Type::Bool, false),
            (Type::String, Type::Int, false),
            (Type::None, Type::None, true),
            (Type::array_of(Type::Int), Type::array_of(Type::Int), true),
            (Type::array_of(Type::Int), Type::array_of(Type::String), false),
            (Type::array_of(Type::Int), Type::Int, false),
            (Type::Int, Type::array_of(Type::Int), false),
            (
                Type::array_of(Type::array_of(Type::Bool)),
                Type::array_of(Type::array_of(Type::Bool)),
                true,
            ),
            (
                Type::array_of(Type::array_of(Type::Bool)),
                Type::array_of(Type::Bool),
                false,
            ),
        ];
        for (a, b, expected) in cases {
            assert_eq!(a.is_compatible_with(&b), expected, "{a} ~ {b}");
            assert_eq!(b.is_compatible_with(&a), expected, "{b} ~ {a}");
        }
    }

    #[test]
    fn test_display() {
        let ty = Type::array_of(Type::array_of(Type::String));
        assert_eq!(ty.to_string(), "array<array<str>>");
        assert_eq!(ty.element(), Some(&Type::array_of(Type::String)));
        assert_eq!(Type::None.to_string(), "nothing");
    }
}
