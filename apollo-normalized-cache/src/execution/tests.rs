use pretty_assertions::assert_eq;
use serde_json_bytes::json;

use super::*;
use crate::cache::CacheKeyInfo;
use crate::cache::QUERY_ROOT;
use crate::cache::RecordSet;
use crate::configuration::KeyFields;
use crate::json_ext::Value;
use crate::spec::Query;

const SDL: &str = r#"
    type Query {
        hero(episode: Episode): Character
        human(id: ID!): Human
        count: Int
        version: Float
        status: String!
    }
    enum Episode { NEWHOPE EMPIRE JEDI }
    interface Character {
        id: ID!
        name: String!
        friends: [Character]
        appearsIn: [Episode]
    }
    type Human implements Character {
        id: ID!
        name: String!
        friends: [Character]
        appearsIn: [Episode]
        homePlanet: String
    }
    type Droid implements Character {
        id: ID!
        name: String!
        friends: [Character]
        appearsIn: [Episode]
        primaryFunction: String
    }
"#;

fn schema() -> Schema {
    Schema::parse(SDL).unwrap()
}

fn variables(value: Value) -> Object {
    value.as_object().cloned().unwrap_or_default()
}

fn records(value: Value) -> RecordSet {
    RecordSet::from_json(&value).unwrap()
}

/// Builds and runs an execution against records.
struct ReadTest {
    query: &'static str,
    records: RecordSet,
    variables: Object,
    policy: MissingFieldPolicy,
}

#[buildstructor::buildstructor]
impl ReadTest {
    #[builder]
    fn new(
        query: &'static str,
        records: Value,
        variables: Option<Value>,
        policy: Option<MissingFieldPolicy>,
    ) -> Self {
        Self {
            query,
            records: self::records(records),
            variables: variables.map(self::variables).unwrap_or_default(),
            policy: policy.unwrap_or_default(),
        }
    }

    fn run(&self) -> ExecutionResult<Value> {
        let schema = schema();
        let query = Query::parse(self.query, &schema).unwrap();
        let operation = query.operation(None).unwrap();
        let variables = operation.variables_with_defaults(&self.variables);
        Executor::new(&self.records, &schema, &variables)
            .with_missing_nullable_fields(self.policy)
            .execute(
                &operation.selection_set,
                &RecordKey::from(QUERY_ROOT),
                &mut ResultAccumulator,
            )
    }
}

fn normalize_response(
    query: &str,
    data: Value,
    root_key: &str,
    cache_keys: &CacheKeyResolver,
) -> ExecutionResult<RecordSet> {
    normalize_response_with_variables(query, data, Object::new(), root_key, cache_keys)
}

fn normalize_response_with_variables(
    query: &str,
    data: Value,
    variables: Object,
    root_key: &str,
    cache_keys: &CacheKeyResolver,
) -> ExecutionResult<RecordSet> {
    let schema = schema();
    let query = Query::parse(query, &schema).unwrap();
    let operation = query.operation(None).unwrap();
    let variables = operation.variables_with_defaults(&variables);
    normalize(
        &operation.selection_set,
        &data,
        &variables,
        &RecordKey::from(root_key),
        &schema,
        cache_keys,
    )
}

#[test_log::test]
fn normalizes_objects_without_identity_under_their_path() {
    let query = "{ hero { name friends { name } } }";
    let normalized = normalize_response(
        query,
        json!({
            "hero": {
                "__typename": "Droid",
                "name": "R2-D2",
                "friends": [{ "__typename": "Human", "name": "Luke Skywalker" }]
            }
        }),
        "ROOT",
        &CacheKeyResolver::new(),
    );
    assert_eq!(normalized.errors, vec![]);
    let records = normalized.data.unwrap();

    assert_eq!(
        records.keys().map(RecordKey::as_str).collect::<Vec<_>>(),
        vec!["ROOT", "ROOT.hero", "ROOT.hero.friends.0"]
    );
    assert_eq!(
        records.get("ROOT").unwrap().get("hero"),
        Some(&FieldValue::reference("ROOT.hero"))
    );
    assert_eq!(
        records.get("ROOT.hero").unwrap().get("friends"),
        Some(&FieldValue::List(vec![FieldValue::reference(
            "ROOT.hero.friends.0"
        )]))
    );

    let schema = schema();
    let parsed = Query::parse(query, &schema).unwrap();
    let operation = parsed.operation(None).unwrap();
    let variables = Object::new();
    let result = Executor::new(&records, &schema, &variables).execute(
        &operation.selection_set,
        &RecordKey::from("ROOT"),
        &mut ResultAccumulator,
    );
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({
            "hero": {
                "name": "R2-D2",
                "friends": [{ "name": "Luke Skywalker" }]
            }
        })
    );
}

#[test]
fn unselected_response_fields_are_not_stored() {
    let normalized = normalize_response(
        "{ hero { name } }",
        json!({ "hero": { "name": "R2-D2", "primaryFunction": "Astromech" } }),
        QUERY_ROOT,
        &CacheKeyResolver::new(),
    );
    let records = normalized.data.unwrap();
    let hero = records.get("QUERY_ROOT.hero").unwrap();
    assert_eq!(hero.len(), 1);
    assert_eq!(hero.get("name"), Some(&FieldValue::string("R2-D2")));
}

#[test]
fn fields_with_arguments_are_stored_under_their_cache_key() {
    let normalized = normalize_response(
        r#"{ luke: human(id: "1000") { name } leia: human(id: "1003") { name } }"#,
        json!({
            "luke": { "name": "Luke Skywalker" },
            "leia": { "name": "Leia Organa" }
        }),
        QUERY_ROOT,
        &CacheKeyResolver::new(),
    );
    let records = normalized.data.unwrap();
    let root = records.get(QUERY_ROOT).unwrap();
    assert_eq!(
        root.get("human(id:1000)"),
        Some(&FieldValue::reference("QUERY_ROOT.human(id:1000)"))
    );
    assert_eq!(
        records
            .get("QUERY_ROOT.human(id:1003)")
            .unwrap()
            .get("name"),
        Some(&FieldValue::string("Leia Organa"))
    );
}

#[test]
fn cache_keys_give_objects_their_identity() {
    let cache_keys = CacheKeyResolver::new()
        .with_type("Human", KeyFields::new(["id"]))
        .with_type("Droid", KeyFields::new(["id"]).group("Character"));
    let normalized = normalize_response(
        "{ hero { __typename id name friends { __typename id name } } }",
        json!({
            "hero": {
                "__typename": "Droid",
                "id": "2001",
                "name": "R2-D2",
                "friends": [
                    { "__typename": "Human", "id": "1000", "name": "Luke Skywalker" },
                    { "__typename": "Human", "id": "1002", "name": "Han Solo" }
                ]
            }
        }),
        QUERY_ROOT,
        &cache_keys,
    );
    assert_eq!(normalized.errors, vec![]);
    let records = normalized.data.unwrap();
    assert_eq!(
        records.get(QUERY_ROOT).unwrap().get("hero"),
        Some(&FieldValue::reference("Character:2001"))
    );
    assert_eq!(
        records.get("Character:2001").unwrap().get("friends"),
        Some(&FieldValue::List(vec![
            FieldValue::reference("Human:1000"),
            FieldValue::reference("Human:1002"),
        ]))
    );
    assert!(records.contains("Human:1002"));
    assert!(!records.contains("QUERY_ROOT.hero"));
}

#[test]
fn objects_opted_out_of_identity_keep_their_path() {
    let cache_keys = CacheKeyResolver::new().with_type(
        "Droid",
        |_: &str, object: &Object| -> Option<CacheKeyInfo> {
            object
                .get("id")
                .and_then(|id| id.as_str())
                .filter(|id| *id != "anonymous")
                .map(CacheKeyInfo::new)
        },
    );
    let normalized = normalize_response(
        "{ hero { __typename id name } }",
        json!({ "hero": { "__typename": "Droid", "id": "anonymous", "name": "R2-D2" } }),
        QUERY_ROOT,
        &cache_keys,
    );
    assert!(normalized.data.unwrap().contains("QUERY_ROOT.hero"));
}

#[test]
fn empty_identities_are_rejected() {
    let cache_keys =
        CacheKeyResolver::new().with_type("Droid", |_: &str, _: &Object| -> Option<CacheKeyInfo> {
            Some(CacheKeyInfo::new(""))
        });
    let normalized = normalize_response(
        "{ hero { __typename name } }",
        json!({ "hero": { "__typename": "Droid", "name": "R2-D2" } }),
        QUERY_ROOT,
        &cache_keys,
    );
    assert_eq!(
        normalized.errors,
        vec![ExecutionError::MissingValue {
            path: Path::from("hero")
        }]
    );
    let records = normalized.data.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records.get(QUERY_ROOT).unwrap().get("hero"), None);
}

#[test]
fn errors_in_a_list_element_drop_the_whole_list() {
    let normalized = normalize_response(
        "{ hero { name friends { name } } }",
        json!({
            "hero": {
                "name": "R2-D2",
                "friends": [{ "name": "Luke Skywalker" }, { "name": null }]
            }
        }),
        QUERY_ROOT,
        &CacheKeyResolver::new(),
    );
    assert_eq!(
        normalized.errors,
        vec![ExecutionError::NullValue {
            path: Path::from("hero.friends.1.name")
        }]
    );
    let records = normalized.data.unwrap();
    let hero = records.get("QUERY_ROOT.hero").unwrap();
    assert_eq!(hero.get("name"), Some(&FieldValue::string("R2-D2")));
    assert_eq!(hero.get("friends"), None);
    assert!(!records.contains("QUERY_ROOT.hero.friends.0"));
}

#[test]
fn root_errors_keep_the_records_of_completed_fields() {
    let normalized = normalize_response(
        "{ hero { name } status }",
        json!({ "hero": { "name": "R2-D2" } }),
        QUERY_ROOT,
        &CacheKeyResolver::new(),
    );
    assert_eq!(
        normalized.errors,
        vec![ExecutionError::MissingValue {
            path: Path::from("status")
        }]
    );
    let records = normalized.data.unwrap();
    let root = records.get(QUERY_ROOT).unwrap();
    assert_eq!(root.get("hero"), Some(&FieldValue::reference("QUERY_ROOT.hero")));
    assert_eq!(root.get("status"), None);
    assert_eq!(
        records.get("QUERY_ROOT.hero").unwrap().get("name"),
        Some(&FieldValue::string("R2-D2"))
    );

    let nothing_completed = normalize_response(
        "{ status }",
        json!({}),
        QUERY_ROOT,
        &CacheKeyResolver::new(),
    );
    assert_eq!(nothing_completed.errors.len(), 1);
    assert!(nothing_completed.data.is_none());
}

#[rstest::rstest]
#[case::excluded(false, None)]
#[case::included(true, Some(FieldValue::string("R2-D2")))]
fn include_conditions_decide_what_is_normalized(
    #[case] with_name: bool,
    #[case] expected: Option<FieldValue>,
) {
    let normalized = normalize_response_with_variables(
        "query($withName: Boolean!) { hero { id name @include(if: $withName) } }",
        json!({ "hero": { "id": "2001", "name": "R2-D2" } }),
        variables(json!({ "withName": with_name })),
        QUERY_ROOT,
        &CacheKeyResolver::new(),
    );
    assert_eq!(normalized.errors, vec![]);
    let records = normalized.data.unwrap();
    let hero = records.get("QUERY_ROOT.hero").unwrap();
    assert_eq!(hero.get("id"), Some(&FieldValue::string("2001")));
    assert_eq!(hero.get("name"), expected.as_ref());
}

#[test]
fn cyclic_responses_normalize_and_read_back() {
    let query = r#"{
        hero {
            __typename id name
            friends { __typename id name friends { __typename id name } }
        }
    }"#;
    let data = json!({
        "hero": {
            "__typename": "Droid",
            "id": "2001",
            "name": "R2-D2",
            "friends": [{
                "__typename": "Human",
                "id": "1000",
                "name": "Luke Skywalker",
                "friends": [{ "__typename": "Droid", "id": "2001", "name": "R2-D2" }]
            }]
        }
    });
    let cache_keys = CacheKeyResolver::new()
        .with_type("Human", KeyFields::new(["id"]))
        .with_type("Droid", KeyFields::new(["id"]));
    let normalized = normalize_response(query, data.clone(), QUERY_ROOT, &cache_keys);
    assert_eq!(normalized.errors, vec![]);
    let records = normalized.data.unwrap();
    assert_eq!(
        records.get("Human:1000").unwrap().get("friends"),
        Some(&FieldValue::List(vec![FieldValue::reference("Droid:2001")]))
    );
    assert_eq!(
        records.get("Droid:2001").unwrap().get("friends"),
        Some(&FieldValue::List(vec![FieldValue::reference("Human:1000")]))
    );

    let schema = schema();
    let parsed = Query::parse(query, &schema).unwrap();
    let operation = parsed.operation(None).unwrap();
    let variables = Object::new();
    let result = Executor::new(&records, &schema, &variables).execute(
        &operation.selection_set,
        &RecordKey::from(QUERY_ROOT),
        &mut ResultAccumulator,
    );
    assert_eq!(result.errors, vec![]);
    assert_eq!(result.data.unwrap(), data);
}

#[test]
fn reads_through_reference_cycles_stop_with_the_selection_set() {
    let result = ReadTest::builder()
        .query("{ hero { name friends { name friends { name friends { name } } } } }")
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "Droid:2001" } },
            "Droid:2001": { "name": "R2-D2", "friends": [{ "__ref": "Human:1000" }] },
            "Human:1000": { "name": "Luke Skywalker", "friends": [{ "__ref": "Droid:2001" }] }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({
            "hero": {
                "name": "R2-D2",
                "friends": [{
                    "name": "Luke Skywalker",
                    "friends": [{
                        "name": "R2-D2",
                        "friends": [{ "name": "Luke Skywalker" }]
                    }]
                }]
            }
        })
    );
}

#[test]
fn reads_follow_references() {
    let result = ReadTest::builder()
        .query("{ hero { name friends { name } } }")
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "Droid:2001" } },
            "Droid:2001": {
                "name": "R2-D2",
                "friends": [{ "__ref": "Human:1000" }, { "__ref": "Human:1002" }]
            },
            "Human:1000": { "name": "Luke Skywalker" },
            "Human:1002": { "name": "Han Solo" }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({
            "hero": {
                "name": "R2-D2",
                "friends": [{ "name": "Luke Skywalker" }, { "name": "Han Solo" }]
            }
        })
    );
}

#[test]
fn missing_and_null_values_are_told_apart() {
    let query = "{ hero { name } }";
    let null = ReadTest::builder()
        .query(query)
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "QUERY_ROOT.hero" } },
            "QUERY_ROOT.hero": { "name": null }
        }))
        .build()
        .run();
    assert_eq!(
        null.errors,
        vec![ExecutionError::NullValue {
            path: Path::from("hero.name")
        }]
    );
    assert_eq!(null.data.unwrap(), json!({ "hero": null }));

    let missing = ReadTest::builder()
        .query(query)
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "QUERY_ROOT.hero" } },
            "QUERY_ROOT.hero": {}
        }))
        .build()
        .run();
    assert_eq!(
        missing.errors,
        vec![ExecutionError::MissingValue {
            path: Path::from("hero.name")
        }]
    );
    assert_eq!(missing.data.unwrap(), json!({ "hero": null }));
}

#[test]
fn every_failed_sibling_is_reported() {
    let result = ReadTest::builder()
        .query("{ hero { id name } }")
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "QUERY_ROOT.hero" } },
            "QUERY_ROOT.hero": {}
        }))
        .build()
        .run();
    assert_eq!(
        result.errors,
        vec![
            ExecutionError::MissingValue {
                path: Path::from("hero.name")
            },
            ExecutionError::MissingValue {
                path: Path::from("hero.id")
            },
        ]
    );
    assert_eq!(result.data.unwrap(), json!({ "hero": null }));
}

#[test]
fn explicit_nulls_on_nullable_fields_are_values() {
    let result = ReadTest::builder()
        .query("{ hero { name } count }")
        .records(json!({ "QUERY_ROOT": { "hero": null, "count": null } }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(result.data.unwrap(), json!({ "hero": null, "count": null }));
}

#[test]
fn missing_nullable_fields_follow_the_policy() {
    let strict = ReadTest::builder()
        .query("{ count version }")
        .records(json!({ "QUERY_ROOT": { "count": 3 } }))
        .build()
        .run();
    assert_eq!(
        strict.errors,
        vec![ExecutionError::MissingValue {
            path: Path::from("version")
        }]
    );
    assert_eq!(strict.data.unwrap(), json!({ "count": 3, "version": null }));

    let lenient = ReadTest::builder()
        .query("{ count version }")
        .records(json!({ "QUERY_ROOT": { "count": 3 } }))
        .policy(MissingFieldPolicy::Null)
        .build()
        .run();
    assert_eq!(lenient.errors, vec![]);
    assert_eq!(lenient.data.unwrap(), json!({ "count": 3, "version": null }));
}

#[test]
fn dangling_references_are_missing_values() {
    let result = ReadTest::builder()
        .query("{ hero { name } }")
        .records(json!({ "QUERY_ROOT": { "hero": { "__ref": "Droid:2001" } } }))
        .build()
        .run();
    assert_eq!(
        result.errors,
        vec![ExecutionError::MissingValue {
            path: Path::from("hero")
        }]
    );
    assert_eq!(result.data.unwrap(), json!({ "hero": null }));
}

#[test]
fn errors_on_the_root_fail_the_whole_read() {
    let result = ReadTest::builder()
        .query(r#"{ human(id: "1000") { id } }"#)
        .records(json!({ "OTHER_ROOT": {} }))
        .build()
        .run();
    assert_eq!(result.data, None);
    assert_eq!(
        result.errors,
        vec![ExecutionError::MissingValue {
            path: Path::empty()
        }]
    );
}

#[test]
fn scalars_of_the_wrong_type_cannot_be_converted() {
    let result = ReadTest::builder()
        .query("{ hero { name } count }")
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "QUERY_ROOT.hero" }, "count": 4294967296i64 },
            "QUERY_ROOT.hero": { "name": 3 }
        }))
        .build()
        .run();
    assert_eq!(
        result.errors,
        vec![
            ExecutionError::CouldNotConvert {
                path: Path::from("hero.name"),
                value: json!(3),
                expected_type: "String".to_string(),
            },
            ExecutionError::CouldNotConvert {
                path: Path::from("count"),
                value: json!(4294967296i64),
                expected_type: "Int".to_string(),
            },
        ]
    );
    assert_eq!(result.data.unwrap(), json!({ "hero": null, "count": null }));
}

#[test]
fn floats_accept_integers_and_ids_accept_both_forms() {
    let result = ReadTest::builder()
        .query(r#"{ version human(id: "1000") { id } }"#)
        .records(json!({
            "QUERY_ROOT": { "version": 2, "human(id:1000)": { "__ref": "Human:1000" } },
            "Human:1000": { "id": 1000 }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({ "version": 2, "human": { "id": 1000 } })
    );
}

#[test]
fn unknown_enum_values_are_passed_through() {
    let result = ReadTest::builder()
        .query("{ hero { appearsIn } }")
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "QUERY_ROOT.hero" } },
            "QUERY_ROOT.hero": { "appearsIn": ["NEWHOPE", "CLONE_WARS"] }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({ "hero": { "appearsIn": ["NEWHOPE", "CLONE_WARS"] } })
    );
}

#[rstest::rstest]
#[case::included(json!({ "withName": true }), json!({ "hero": { "id": "2001", "name": "R2-D2" } }))]
#[case::skipped(json!({ "withName": false }), json!({ "hero": { "id": "2001" } }))]
fn include_and_skip_conditions_select_fields(#[case] vars: Value, #[case] expected: Value) {
    let records = json!({
        "QUERY_ROOT": { "hero": { "__ref": "QUERY_ROOT.hero" } },
        "QUERY_ROOT.hero": { "id": "2001", "name": "R2-D2" }
    });
    let include = ReadTest::builder()
        .query("query($withName: Boolean!) { hero { id name @include(if: $withName) } }")
        .records(records.clone())
        .variables(vars.clone())
        .build()
        .run();
    assert_eq!(include.errors, vec![]);
    assert_eq!(include.data.unwrap(), expected);

    let skip_vars = json!({ "withName": !vars.get("withName").and_then(|v| v.as_bool()).unwrap() });
    let skip = ReadTest::builder()
        .query("query($withName: Boolean!) { hero { id name @skip(if: $withName) } }")
        .records(records)
        .variables(skip_vars)
        .build()
        .run();
    assert_eq!(skip.errors, vec![]);
    assert_eq!(skip.data.unwrap(), expected);
}

#[test]
fn type_conditions_select_fields_of_the_runtime_type() {
    let query = r#"{
        hero {
            name
            ... on Droid { primaryFunction }
            ... on Human { homePlanet }
        }
    }"#;
    let result = ReadTest::builder()
        .query(query)
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "Human:1000" } },
            "Human:1000": { "__typename": "Human", "name": "Luke Skywalker", "homePlanet": "Tatooine" }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({ "hero": { "name": "Luke Skywalker", "homePlanet": "Tatooine" } })
    );
}

#[test]
fn type_conditions_of_other_types_are_not_read() {
    let query = r#"{
        hero {
            name
            ... on Droid { primaryFunction }
            ... on Human { homePlanet }
        }
    }"#;
    let result = ReadTest::builder()
        .query(query)
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "Droid:2001" } },
            "Droid:2001": {
                "__typename": "Droid",
                "name": "R2-D2",
                "primaryFunction": "Astromech",
                "homePlanet": "Naboo"
            }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({ "hero": { "name": "R2-D2", "primaryFunction": "Astromech" } })
    );

    let without_human_fields = ReadTest::builder()
        .query(query)
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "Droid:2001" } },
            "Droid:2001": { "__typename": "Droid", "name": "R2-D2", "primaryFunction": "Astromech" }
        }))
        .build()
        .run();
    assert_eq!(without_human_fields.errors, vec![]);
}

#[test]
fn unknown_typenames_still_read_fields_of_the_declared_type() {
    let result = ReadTest::builder()
        .query(
            r#"{
                hero {
                    __typename
                    name
                    ... on Character { id }
                    ... on Droid { primaryFunction }
                }
            }"#,
        )
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "Wookiee:1" } },
            "Wookiee:1": { "__typename": "Wookiee", "id": "1", "name": "Chewbacca" }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({ "hero": { "__typename": "Wookiee", "name": "Chewbacca", "id": "1" } })
    );
}

#[test]
fn fragments_on_the_declared_type_apply_without_typename() {
    let result = ReadTest::builder()
        .query("{ hero { ...Names } } fragment Names on Character { name }")
        .records(json!({
            "QUERY_ROOT": { "hero": { "__ref": "QUERY_ROOT.hero" } },
            "QUERY_ROOT.hero": { "name": "R2-D2", "primaryFunction": "Astromech" }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(result.data.unwrap(), json!({ "hero": { "name": "R2-D2" } }));
}

#[test]
fn typename_of_concrete_types_is_known_without_storage() {
    let result = ReadTest::builder()
        .query(r#"{ __typename human(id: "1000") { __typename name } }"#)
        .records(json!({
            "QUERY_ROOT": { "human(id:1000)": { "__ref": "Human:1000" } },
            "Human:1000": { "name": "Luke Skywalker" }
        }))
        .build()
        .run();
    assert_eq!(result.errors, vec![]);
    assert_eq!(
        result.data.unwrap(),
        json!({
            "__typename": "Query",
            "human": { "__typename": "Human", "name": "Luke Skywalker" }
        })
    );
}

#[test]
fn dependencies_include_missing_fields() {
    let schema = schema();
    let query = Query::parse("{ hero { name friends { name } } count }", &schema).unwrap();
    let operation = query.operation(None).unwrap();
    let records = records(json!({
        "QUERY_ROOT": { "hero": { "__ref": "Droid:2001" } },
        "Droid:2001": { "name": "R2-D2", "friends": [{ "__ref": "Human:1000" }] },
        "Human:1000": {}
    }));
    let variables = Object::new();
    let mut accumulator = Zip(ResultAccumulator, DependencyTracker::new());
    let result = Executor::new(&records, &schema, &variables).execute(
        &operation.selection_set,
        &RecordKey::from(QUERY_ROOT),
        &mut accumulator,
    );

    assert_eq!(
        result.errors,
        vec![
            ExecutionError::MissingValue {
                path: Path::from("hero.friends.0.name")
            },
            ExecutionError::MissingValue {
                path: Path::from("count")
            },
        ]
    );
    let dependent_keys = accumulator
        .1
        .dependent_keys()
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    insta::assert_snapshot!(
        dependent_keys,
        @"Droid:2001.friends Droid:2001.name Human:1000.name QUERY_ROOT.count QUERY_ROOT.hero"
    );
}

#[test]
fn responses_read_back_as_they_were_written() {
    let query = r#"{
        hero(episode: JEDI) {
            __typename
            name
            friends { __typename name ... on Human { homePlanet } }
        }
    }"#;
    let data = json!({
        "hero": {
            "__typename": "Droid",
            "name": "R2-D2",
            "friends": [
                { "__typename": "Human", "name": "Luke Skywalker", "homePlanet": "Tatooine" },
                { "__typename": "Droid", "name": "C-3PO" }
            ]
        }
    });
    let normalized = normalize_response(query, data.clone(), QUERY_ROOT, &CacheKeyResolver::new());
    assert_eq!(normalized.errors, vec![]);
    let records = normalized.data.unwrap();

    let schema = schema();
    let parsed = Query::parse(query, &schema).unwrap();
    let operation = parsed.operation(None).unwrap();
    let variables = Object::new();
    let result = Executor::new(&records, &schema, &variables).execute(
        &operation.selection_set,
        &RecordKey::from(QUERY_ROOT),
        &mut ResultAccumulator,
    );
    assert_eq!(result.errors, vec![]);
    assert_eq!(result.data.unwrap(), data);
}
