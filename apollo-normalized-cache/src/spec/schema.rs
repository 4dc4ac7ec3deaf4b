//! GraphQL schema.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use apollo_compiler::ast::OperationType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;

use crate::spec::OperationKind;
use crate::spec::SpecError;

/// The type table the executor resolves runtime typenames against.
///
/// It knows which object types implement which interfaces, which unions contain which members,
/// the values of each enum and the custom scalars. It can be built from SDL with
/// [`Schema::parse`], or by hand with [`Schema::builder`].
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(crate) object_types: HashMap<String, HashSet<String>>,
    pub(crate) interface_types: HashMap<String, HashSet<String>>,
    pub(crate) union_types: HashMap<String, HashSet<String>>,
    pub(crate) enum_types: HashMap<String, HashSet<String>>,
    pub(crate) custom_scalars: HashSet<String>,
    root_operations: HashMap<OperationKind, String>,
    definitions: Option<Arc<Valid<apollo_compiler::Schema>>>,
}

#[buildstructor::buildstructor]
impl Schema {
    /// Builds a schema type table by hand.
    ///
    /// `object_types` and `interface_types` map a type name to the interfaces it implements,
    /// `union_types` map a union to its members and `enum_types` map an enum to its values.
    #[builder(visibility = "pub")]
    fn new(
        object_types: HashMap<String, HashSet<String>>,
        interface_types: HashMap<String, HashSet<String>>,
        union_types: HashMap<String, HashSet<String>>,
        enum_types: HashMap<String, HashSet<String>>,
        custom_scalars: HashSet<String>,
        query_type: Option<String>,
        mutation_type: Option<String>,
        subscription_type: Option<String>,
    ) -> Self {
        let mut root_operations = HashMap::new();
        root_operations.insert(
            OperationKind::Query,
            query_type.unwrap_or_else(|| OperationKind::Query.default_type_name().to_string()),
        );
        root_operations.insert(
            OperationKind::Mutation,
            mutation_type
                .unwrap_or_else(|| OperationKind::Mutation.default_type_name().to_string()),
        );
        root_operations.insert(
            OperationKind::Subscription,
            subscription_type
                .unwrap_or_else(|| OperationKind::Subscription.default_type_name().to_string()),
        );
        Self {
            object_types,
            interface_types,
            union_types,
            enum_types,
            custom_scalars,
            root_operations,
            definitions: None,
        }
    }

    /// Parses and validates SDL, and extracts the type table from it.
    pub fn parse(sdl: &str) -> Result<Self, SpecError> {
        let definitions = apollo_compiler::Schema::parse_and_validate(sdl, "schema.graphql")
            .map_err(|invalid| SpecError::ValidationError(invalid.errors.to_string()))?;

        let mut schema = Schema::default();
        for (name, ty) in definitions.types.iter() {
            if ty.is_built_in() {
                continue;
            }
            match ty {
                ExtendedType::Object(object) => {
                    schema.object_types.insert(
                        name.to_string(),
                        object
                            .implements_interfaces
                            .iter()
                            .map(|i| i.name.to_string())
                            .collect(),
                    );
                }
                ExtendedType::Interface(interface) => {
                    schema.interface_types.insert(
                        name.to_string(),
                        interface
                            .implements_interfaces
                            .iter()
                            .map(|i| i.name.to_string())
                            .collect(),
                    );
                }
                ExtendedType::Union(union_type) => {
                    schema.union_types.insert(
                        name.to_string(),
                        union_type.members.iter().map(|m| m.name.to_string()).collect(),
                    );
                }
                ExtendedType::Enum(enum_type) => {
                    schema.enum_types.insert(
                        name.to_string(),
                        enum_type.values.keys().map(|v| v.to_string()).collect(),
                    );
                }
                ExtendedType::Scalar(_) => {
                    schema.custom_scalars.insert(name.to_string());
                }
                ExtendedType::InputObject(_) => {}
            }
        }

        for (kind, operation_type) in [
            (OperationKind::Query, OperationType::Query),
            (OperationKind::Mutation, OperationType::Mutation),
            (OperationKind::Subscription, OperationType::Subscription),
        ] {
            let name = definitions
                .root_operation(operation_type)
                .map(|name| name.to_string())
                .unwrap_or_else(|| kind.default_type_name().to_string());
            schema.root_operations.insert(kind, name);
        }

        tracing::debug!(
            object_types = schema.object_types.len(),
            interface_types = schema.interface_types.len(),
            union_types = schema.union_types.len(),
            "parsed schema"
        );

        schema.definitions = Some(Arc::new(definitions));
        Ok(schema)
    }

    pub(crate) fn definitions(&self) -> Option<&Valid<apollo_compiler::Schema>> {
        self.definitions.as_deref()
    }

    /// Returns `true` if `maybe_subtype` implements the interface `abstract_type`, or is a
    /// member of the union `abstract_type`.
    pub fn is_subtype(&self, abstract_type: &str, maybe_subtype: &str) -> bool {
        if let Some(members) = self.union_types.get(abstract_type) {
            return members.contains(maybe_subtype);
        }
        self.object_types
            .get(maybe_subtype)
            .or_else(|| self.interface_types.get(maybe_subtype))
            .map(|implements| implements.contains(abstract_type))
            .unwrap_or(false)
    }

    /// Returns `true` if an object of runtime type `typename` satisfies `type_condition`:
    /// it is the same type, implements it, or is a member of it.
    pub fn satisfies(&self, type_condition: &str, typename: &str) -> bool {
        type_condition == typename || self.is_subtype(type_condition, typename)
    }

    pub fn is_object_type(&self, name: &str) -> bool {
        self.object_types.contains_key(name)
    }

    pub fn is_interface(&self, name: &str) -> bool {
        self.interface_types.contains_key(name)
    }

    pub fn is_union(&self, name: &str) -> bool {
        self.union_types.contains_key(name)
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        self.is_interface(name) || self.is_union(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enum_types.contains_key(name)
    }

    pub fn is_custom_scalar(&self, name: &str) -> bool {
        self.custom_scalars.contains(name)
    }

    /// Returns `true` if `typename` is known to the schema as a composite type.
    pub fn has_type(&self, name: &str) -> bool {
        self.is_object_type(name) || self.is_abstract(name)
    }

    /// Returns `true` if `value` is a declared value of the enum `name`.
    pub fn enum_contains(&self, name: &str, value: &str) -> bool {
        self.enum_types
            .get(name)
            .map(|values| values.contains(value))
            .unwrap_or(false)
    }

    pub fn root_operation_name(&self, kind: OperationKind) -> &str {
        self.root_operations
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_type_name())
    }
}
