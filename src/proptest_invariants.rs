//! Property-based tests for identity and ordering invariants.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

use crate::path::encode_url_path;
use crate::resmap::ResMap;
use crate::resource::Resource;
use proptest::prelude::*;
use std::collections::HashSet;

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}"
}

fn kind_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("ConfigMap"), Just("Secret"), Just("Service")]
}

fn namespace_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), Just(Some("default".to_string())), Just(Some("prod".to_string()))]
}

fn resource_strategy() -> impl Strategy<Value = Resource> {
    (kind_strategy(), name_strategy(), namespace_strategy())
        .prop_map(|(kind, name, ns)| Resource::new("v1", kind, &name, ns.as_deref()))
}

proptest! {
    /// Property: appending succeeds exactly while identities stay unique,
    /// whatever order the resources arrive in
    #[test]
    fn append_rejects_exactly_repeated_ids(resources in prop::collection::vec(resource_strategy(), 0..20)) {
        let mut map = ResMap::new();
        let mut seen = HashSet::new();
        for res in resources {
            let fresh = seen.insert(res.cur_id());
            prop_assert_eq!(map.append(res).is_ok(), fresh);
        }
        prop_assert_eq!(map.len(), seen.len());
    }

    /// Property: the collection keeps insertion order
    #[test]
    fn append_preserves_order(names in prop::collection::hash_set(name_strategy(), 0..15)) {
        let names: Vec<String> = names.into_iter().collect();
        let mut map = ResMap::new();
        for name in &names {
            map.append(Resource::new("v1", "ConfigMap", name, None)).unwrap();
        }
        let got: Vec<String> = map.iter().map(|r| r.name().to_string()).collect();
        prop_assert_eq!(got, names);
    }

    /// Property: a failed append_all leaves the receiver untouched
    #[test]
    fn append_all_is_all_or_nothing(
        left in prop::collection::vec(resource_strategy(), 1..8),
        right in prop::collection::vec(resource_strategy(), 1..8),
    ) {
        let mut a = ResMap::new();
        for res in left {
            let _ = a.append(res);
        }
        let mut b = ResMap::new();
        for res in right {
            let _ = b.append(res);
        }
        let before = a.clone();
        let overlap = b.ids().iter().any(|id| a.find(id).is_some());
        let result = a.append_all(b);
        prop_assert_eq!(result.is_err(), overlap);
        if overlap {
            prop_assert_eq!(a, before);
        }
    }

    /// Property: serializing and parsing a collection yields the same ids
    /// in the same order
    #[test]
    fn yaml_stream_round_trip_is_stable(resources in prop::collection::vec(resource_strategy(), 0..10)) {
        let mut map = ResMap::new();
        for res in resources {
            let _ = map.append(res);
        }
        let yaml = map.as_yaml().unwrap();
        let parsed = ResMap::from_yaml(yaml.as_bytes()).unwrap();
        prop_assert_eq!(parsed.ids(), map.ids());
        prop_assert_eq!(parsed.as_yaml().unwrap(), yaml);
    }

    /// Property: encode_url_path never produces filesystem-unsafe characters
    #[test]
    fn encode_url_path_never_produces_unsafe_chars(input in ".*") {
        let result = encode_url_path(&input);
        let unsafe_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
        for ch in unsafe_chars {
            prop_assert!(
                !result.contains(ch),
                "encode_url_path produced unsafe character '{}' from input '{}'",
                ch,
                input
            );
        }
    }
}
