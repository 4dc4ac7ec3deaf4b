use apollo_compiler::ast;
use serde::Deserialize;
use serde::Serialize;

// Primitives are taken from scalars: https://spec.graphql.org/draft/#sec-Scalars
/// The declared type of a selected field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Named type {0}: an object, interface, union, enum or custom scalar
    Named(String),
    /// List type {0}
    List(Box<FieldType>),
    /// Non null type {0}
    NonNull(Box<FieldType>),
    /// String
    String,
    /// Int
    Int,
    /// Float
    Float,
    /// Id
    Id,
    /// Boolean
    Boolean,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Named(ty) => write!(f, "{ty}"),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::NonNull(ty) => write!(f, "{ty}!"),
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Id => write!(f, "ID"),
            FieldType::Boolean => write!(f, "Boolean"),
        }
    }
}

impl FieldType {
    /// Shorthand for a named type.
    pub fn named(name: impl Into<String>) -> Self {
        FieldType::Named(name.into())
    }

    /// Wraps the type in a non null type.
    pub fn non_null(self) -> Self {
        match self {
            FieldType::NonNull(_) => self,
            ty => FieldType::NonNull(Box::new(ty)),
        }
    }

    /// Wraps the type in a list type.
    pub fn list(self) -> Self {
        FieldType::List(Box::new(self))
    }

    /// return the name of the type on which selections happen
    ///
    /// Example if we get the field `list: [User!]!`, it will return "User"
    pub fn inner_type_name(&self) -> Option<&str> {
        match self {
            FieldType::Named(name) => Some(name.as_str()),
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.inner_type_name(),
            FieldType::String
            | FieldType::Int
            | FieldType::Float
            | FieldType::Id
            | FieldType::Boolean => None,
        }
    }

    pub fn is_builtin_scalar(&self) -> bool {
        match self {
            FieldType::Named(_) | FieldType::List(_) | FieldType::NonNull(_) => false,
            FieldType::String
            | FieldType::Int
            | FieldType::Float
            | FieldType::Id
            | FieldType::Boolean => true,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }

    /// The type with its outermost non null wrapper removed.
    pub fn nullable(&self) -> &FieldType {
        match self {
            FieldType::NonNull(inner) => inner,
            ty => ty,
        }
    }
}

impl From<&'_ ast::Type> for FieldType {
    fn from(ty: &'_ ast::Type) -> Self {
        fn named(name: &str) -> FieldType {
            match name {
                "String" => FieldType::String,
                "Int" => FieldType::Int,
                "Float" => FieldType::Float,
                "ID" => FieldType::Id,
                "Boolean" => FieldType::Boolean,
                _ => FieldType::Named(name.to_string()),
            }
        }

        match ty {
            ast::Type::Named(name) => named(name.as_str()),
            ast::Type::NonNullNamed(name) => FieldType::NonNull(Box::new(named(name.as_str()))),
            ast::Type::List(inner) => FieldType::List(Box::new((&**inner).into())),
            ast::Type::NonNullList(inner) => {
                FieldType::NonNull(Box::new(FieldType::List(Box::new((&**inner).into()))))
            }
        }
    }
}
