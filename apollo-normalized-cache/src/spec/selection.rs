use std::collections::HashMap;
use std::sync::Arc;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::executable;
use indexmap::IndexMap;
use serde::Serialize;

use crate::json_ext::Object;
use crate::spec::FieldType;
use crate::spec::InputValue;
use crate::spec::SpecError;
use crate::spec::TYPENAME;
use crate::spec::field_cache_key;

// The RECURSION_LIMIT is chosen to be:
//   < # expected to cause stack overflow &&
//   > # expected in a legitimate query
const RECURSION_LIMIT: usize = 512;

/// An ordered list of selections, scoped to the type they are selected on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSet {
    pub parent_type: String,
    pub selections: Vec<Selection>,
}

impl SelectionSet {
    pub fn new(parent_type: impl Into<String>, selections: Vec<Selection>) -> Self {
        Self {
            parent_type: parent_type.into(),
            selections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Selection {
    Field(Field),
    FragmentSpread(Arc<Fragment>),
    InlineFragment(InlineFragment),
    /// Selections included only when the `@include`/`@skip` conditions hold.
    Conditional(Conditional),
}

impl From<Field> for Selection {
    fn from(field: Field) -> Self {
        Selection::Field(field)
    }
}

impl Selection {
    /// An inline fragment applying `selections` when the object satisfies `type_condition`.
    pub fn inline_fragment(type_condition: impl Into<String>, selections: Vec<Selection>) -> Self {
        let type_condition = type_condition.into();
        Selection::InlineFragment(InlineFragment {
            selection_set: SelectionSet::new(type_condition.clone(), selections),
            type_condition: Some(type_condition),
        })
    }

    pub fn fragment_spread(fragment: Arc<Fragment>) -> Self {
        Selection::FragmentSpread(fragment)
    }

    /// Selections wrapped in `@include(if: $variable)`.
    pub fn include_if(variable: impl Into<String>, selections: Vec<Selection>) -> Self {
        Selection::Conditional(Conditional {
            include_skip: IncludeSkip {
                include: Condition::Variable(variable.into()),
                skip: Condition::No,
            },
            selections,
        })
    }

    /// Selections wrapped in `@skip(if: $variable)`.
    pub fn skip_if(variable: impl Into<String>, selections: Vec<Selection>) -> Self {
        Selection::Conditional(Conditional {
            include_skip: IncludeSkip {
                include: Condition::Yes,
                skip: Condition::Variable(variable.into()),
            },
            selections,
        })
    }

    pub(crate) fn from_executable(
        selection: &executable::Selection,
        current_type: &str,
        fragments: &mut FragmentLowering<'_>,
        mut count: usize,
    ) -> Result<Option<Self>, SpecError> {
        if count > RECURSION_LIMIT {
            tracing::error!("selection processing recursion limit({RECURSION_LIMIT}) exceeded");
            return Err(SpecError::RecursionLimitExceeded);
        }
        count += 1;

        let (include_skip, selection) = match selection {
            // Spec: https://spec.graphql.org/draft/#Field
            executable::Selection::Field(field) => {
                let include_skip = IncludeSkip::parse(&field.directives);
                if include_skip.statically_skipped() {
                    return Ok(None);
                }
                let field_type = FieldType::from(field.ty());
                let selection_set = if field.selection_set.selections.is_empty() {
                    None
                } else {
                    let parent_type = field.selection_set.ty.as_str();
                    Some(SelectionSet::new(
                        parent_type,
                        lower_selections(
                            &field.selection_set.selections,
                            parent_type,
                            fragments,
                            count,
                        )?,
                    ))
                };

                let field = Field {
                    name: field.name.to_string(),
                    alias: field.alias.as_ref().map(|alias| alias.to_string()),
                    field_type,
                    arguments: field
                        .arguments
                        .iter()
                        .map(|argument| {
                            (argument.name.to_string(), InputValue::from(&*argument.value))
                        })
                        .collect(),
                    selection_set,
                };
                (include_skip, Selection::Field(field))
            }
            // Spec: https://spec.graphql.org/draft/#InlineFragment
            executable::Selection::InlineFragment(inline_fragment) => {
                let include_skip = IncludeSkip::parse(&inline_fragment.directives);
                if include_skip.statically_skipped() {
                    return Ok(None);
                }
                let parent_type = inline_fragment
                    .type_condition
                    .as_ref()
                    .map(|name| name.as_str())
                    .unwrap_or(current_type);
                let selections = lower_selections(
                    &inline_fragment.selection_set.selections,
                    parent_type,
                    fragments,
                    count,
                )?;
                // Can be empty with a statically skipped selection set
                if selections.is_empty() {
                    return Ok(None);
                }
                let inline_fragment = InlineFragment {
                    type_condition: inline_fragment
                        .type_condition
                        .as_ref()
                        .map(|name| name.to_string()),
                    selection_set: SelectionSet::new(parent_type, selections),
                };
                (include_skip, Selection::InlineFragment(inline_fragment))
            }
            // Spec: https://spec.graphql.org/draft/#FragmentSpread
            executable::Selection::FragmentSpread(fragment_spread) => {
                let include_skip = IncludeSkip::parse(&fragment_spread.directives);
                if include_skip.statically_skipped() {
                    return Ok(None);
                }
                let fragment = fragments.lower(fragment_spread.fragment_name.as_str(), count)?;
                // Can be empty with a statically skipped selection set
                if fragment.selection_set.is_empty() {
                    return Ok(None);
                }
                (include_skip, Selection::FragmentSpread(fragment))
            }
        };

        if include_skip.is_unconditional() {
            Ok(Some(selection))
        } else {
            Ok(Some(Selection::Conditional(Conditional {
                include_skip,
                selections: vec![selection],
            })))
        }
    }
}

fn lower_selections(
    selections: &[executable::Selection],
    current_type: &str,
    fragments: &mut FragmentLowering<'_>,
    count: usize,
) -> Result<Vec<Selection>, SpecError> {
    selections
        .iter()
        .filter_map(|selection| {
            Selection::from_executable(selection, current_type, fragments, count).transpose()
        })
        .collect()
}

/// Lowers named fragments on demand so that every spread of a fragment shares one descriptor.
pub(crate) struct FragmentLowering<'a> {
    document: &'a ExecutableDocument,
    lowered: HashMap<String, Arc<Fragment>>,
}

impl<'a> FragmentLowering<'a> {
    pub(crate) fn new(document: &'a ExecutableDocument) -> Self {
        Self {
            document,
            lowered: HashMap::new(),
        }
    }

    pub(crate) fn lower(&mut self, name: &str, count: usize) -> Result<Arc<Fragment>, SpecError> {
        if let Some(fragment) = self.lowered.get(name) {
            return Ok(fragment.clone());
        }
        let document = self.document;
        let definition = document
            .fragments
            .get(name)
            .ok_or_else(|| SpecError::UnknownFragment(name.to_string()))?;
        let type_condition = definition.selection_set.ty.as_str();
        let selections = lower_selections(
            &definition.selection_set.selections,
            type_condition,
            self,
            count,
        )?;
        let fragment = Arc::new(Fragment {
            name: name.to_string(),
            type_condition: type_condition.to_string(),
            selection_set: SelectionSet::new(type_condition, selections),
        });
        self.lowered.insert(name.to_string(), fragment.clone());
        Ok(fragment)
    }

    pub(crate) fn into_fragments(self) -> HashMap<String, Arc<Fragment>> {
        self.lowered
    }
}

/// A selected field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub alias: Option<String>,
    pub field_type: FieldType,
    pub arguments: IndexMap<String, InputValue>,
    pub selection_set: Option<SelectionSet>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            field_type,
            arguments: IndexMap::new(),
            selection_set: None,
        }
    }

    /// The `__typename` meta field.
    pub fn typename() -> Self {
        Self::new(TYPENAME, FieldType::String.non_null())
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn argument(mut self, name: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Sets the child selections, scoped to the named type of the field.
    pub fn selections(mut self, selections: Vec<Selection>) -> Self {
        let parent_type = self
            .field_type
            .inner_type_name()
            .unwrap_or_default()
            .to_string();
        self.selection_set = Some(SelectionSet::new(parent_type, selections));
        self
    }

    /// The key of the field in a response: its alias if it has one, else its name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// The key of the field in a record: its name and its canonical arguments.
    pub fn cache_key(&self, variables: &Object) -> String {
        field_cache_key(&self.name, &self.arguments, variables)
    }

    pub fn is_typename(&self) -> bool {
        self.name == TYPENAME
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineFragment {
    /// `None` for an inline fragment without type condition, which always applies.
    pub type_condition: Option<String>,
    pub selection_set: SelectionSet,
}

/// A named fragment definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub name: String,
    pub type_condition: String,
    pub selection_set: SelectionSet,
}

impl Fragment {
    pub fn new(
        name: impl Into<String>,
        type_condition: impl Into<String>,
        selections: Vec<Selection>,
    ) -> Self {
        let type_condition = type_condition.into();
        Self {
            name: name.into(),
            selection_set: SelectionSet::new(type_condition.clone(), selections),
            type_condition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conditional {
    pub include_skip: IncludeSkip,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IncludeSkip {
    pub include: Condition,
    pub skip: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    Yes,
    No,
    Variable(String),
}

impl Default for IncludeSkip {
    fn default() -> Self {
        Self {
            include: Condition::Yes,
            skip: Condition::No,
        }
    }
}

impl IncludeSkip {
    pub(crate) fn parse(directives: &executable::DirectiveList) -> Self {
        let mut include = None;
        let mut skip = None;
        for directive in directives.iter() {
            if include.is_none() && directive.name == "include" {
                include = Condition::parse(directive)
            }
            if skip.is_none() && directive.name == "skip" {
                skip = Condition::parse(directive)
            }
        }
        Self {
            include: include.unwrap_or(Condition::Yes),
            skip: skip.unwrap_or(Condition::No),
        }
    }

    pub fn statically_skipped(&self) -> bool {
        matches!(self.skip, Condition::Yes) || matches!(self.include, Condition::No)
    }

    fn is_unconditional(&self) -> bool {
        matches!(self.include, Condition::Yes) && matches!(self.skip, Condition::No)
    }

    pub fn should_skip(&self, variables: &Object) -> bool {
        // An absent or non boolean variable falls back to the directive default, which keeps
        // the selection.
        self.skip.eval(variables).unwrap_or(false) || !self.include.eval(variables).unwrap_or(true)
    }
}

impl Condition {
    pub(crate) fn parse(directive: &executable::Directive) -> Option<Self> {
        let argument = directive
            .arguments
            .iter()
            .find(|argument| argument.name == "if")?;
        match argument.value.as_ref() {
            executable::Value::Boolean(true) => Some(Condition::Yes),
            executable::Value::Boolean(false) => Some(Condition::No),
            executable::Value::Variable(variable) => {
                Some(Condition::Variable(variable.as_str().to_owned()))
            }
            _ => None,
        }
    }

    pub fn eval(&self, variables: &Object) -> Option<bool> {
        match self {
            Condition::Yes => Some(true),
            Condition::No => Some(false),
            Condition::Variable(variable_name) => variables
                .get(variable_name.as_str())
                .and_then(|v| v.as_bool()),
        }
    }
}
