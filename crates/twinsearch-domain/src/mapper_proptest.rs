//! Property-based tests for the enforced thing mapper.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    use crate::enforcer::{Policy, PolicyEnforcer, PolicyEntry};
    use crate::mapper::EnforcedThingMapper;
    use crate::pointer::JsonPointer;
    use crate::write_model::WriteModel;

    /// Strategy for arbitrary JSON trees of bounded depth.
    fn json_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z0-9 ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
            ]
        })
    }

    fn enforcer() -> PolicyEnforcer {
        PolicyEnforcer::new(
            &Policy::new(None)
                .with_entry(
                    PolicyEntry::new("owner")
                        .with_subject("user:alice")
                        .grant(JsonPointer::root(), &["READ"]),
                )
                .with_entry(
                    PolicyEntry::new("attributes")
                        .with_subject("user:bob")
                        .grant(JsonPointer::parse("/attributes").unwrap(), &["READ"]),
                ),
        )
    }

    proptest! {
        #[test]
        fn test_flattening_is_deterministic(
            attributes in json_strategy(),
            revision in 0u64..1_000,
        ) {
            let thing = json!({"thingId": "org.acme:t", "_revision": revision, "attributes": attributes});
            let mapper = EnforcedThingMapper::default();
            let first = mapper.to_write_model(&thing, &enforcer(), 1).unwrap();
            let second = mapper.to_write_model(&thing, &enforcer(), 1).unwrap();

            let (WriteModel::Upsert { document: a, .. }, WriteModel::Upsert { document: b, .. }) =
                (first, second)
            else {
                panic!("expected upserts");
            };
            prop_assert_eq!(
                serde_json::to_vec(&a).unwrap(),
                serde_json::to_vec(&b).unwrap()
            );
        }

        #[test]
        fn test_every_field_is_a_scalar_with_inherited_grants(attributes in json_strategy()) {
            let thing = json!({"thingId": "t", "_revision": 1, "attributes": attributes});
            let WriteModel::Upsert { document, .. } =
                EnforcedThingMapper::default().to_write_model(&thing, &enforcer(), 1).unwrap()
            else {
                panic!("expected upsert");
            };
            let attributes = JsonPointer::parse("/attributes").unwrap();
            for field in &document.fields {
                prop_assert!(!field.value.is_object() && !field.value.is_array());
                prop_assert!(field.grantees.contains("user:alice"));
                prop_assert_eq!(
                    field.grantees.contains("user:bob"),
                    attributes.is_prefix_of(&field.path)
                );
            }
        }
    }
}
