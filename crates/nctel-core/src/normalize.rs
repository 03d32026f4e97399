// ── Selector normalization ──
//
// Turns a user-supplied subtree selector into the comparison key the
// decoder matches traversal paths against.

/// Canonicalize a selector.
///
/// - namespace qualifiers are stripped from every segment
///   (`if:interfaces` → `interfaces`, `urn:ietf:...:ietf-interfaces` →
///   `ietf-interfaces`);
/// - the path is cut before the first segment carrying a `[...]` predicate,
///   so a keyed selector compares equal to its unkeyed ancestor;
/// - leading and trailing `/` are trimmed.
///
/// Pure and idempotent.
pub fn normalize(selector: &str) -> String {
    let segments: Vec<&str> = selector
        .split('/')
        .take_while(|segment| !segment.contains('['))
        .map(strip_prefix)
        .collect();

    segments.join("/").trim_matches('/').to_owned()
}

/// Drop everything up to and including the last `:` of a segment.
fn strip_prefix(segment: &str) -> &str {
    segment.rsplit_once(':').map_or(segment, |(_, name)| name)
}

/// Namespace prefix for record keys derived from a root namespace URI.
///
/// `urn:ietf:params:xml:ns:yang:ietf-interfaces` → `ietf-interfaces:`;
/// an unqualified root yields `/`.
pub fn namespace_prefix(namespace: &str) -> String {
    let name = normalize(namespace);
    if name.is_empty() {
        "/".to_owned()
    } else {
        format!("{name}:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_namespace_prefixes() {
        assert_eq!(normalize("/asdf:gh-jk/qwerty"), "gh-jk/qwerty");
        assert_eq!(
            normalize("/if:interfaces-state/if:interface"),
            "interfaces-state/interface"
        );
    }

    #[test]
    fn drops_predicates() {
        assert_eq!(normalize("/gh-jk/qwerty/bnm[uiop=zxcv]"), "gh-jk/qwerty");
        assert_eq!(
            normalize("/interfaces/interface[name='Gi0/0/1']/statistics"),
            "interfaces"
        );
    }

    #[test]
    fn trims_separators() {
        assert_eq!(normalize("interfaces/"), "interfaces");
        assert_eq!(normalize("//interfaces"), "interfaces");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "",
            "/",
            "a",
            "/asdf:gh-jk/qwerty",
            "/gh-jk/qwerty/bnm[uiop=zxcv]",
            "a//b",
            "/x:a/y:b:c/d]",
            "urn:ietf:params:xml:ns:yang:ietf-interfaces",
            "[k=v]/a",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn namespace_prefixes() {
        assert_eq!(
            namespace_prefix("urn:ietf:params:xml:ns:yang:ietf-interfaces"),
            "ietf-interfaces:"
        );
        assert_eq!(
            namespace_prefix("http://cisco.com/ns/yang/Cisco-IOS-XE-native"),
            "cisco.com/ns/yang/Cisco-IOS-XE-native:"
        );
        assert_eq!(namespace_prefix(""), "/");
    }

    mod properties {
        use proptest::prelude::*;

        use crate::normalize::normalize;

        /// Selector-shaped strings: heavy on separators, qualifiers and
        /// predicate brackets.
        fn selector_strategy() -> impl Strategy<Value = String> {
            "[a-z/:\\[\\]=' -]{0,48}"
        }

        proptest! {
            #[test]
            fn normalize_is_idempotent(input in any::<String>()) {
                let once = normalize(&input);
                prop_assert_eq!(normalize(&once), once);
            }

            #[test]
            fn normalized_selectors_are_canonical(input in selector_strategy()) {
                let once = normalize(&input);
                prop_assert!(!once.contains(':'), "qualifier left in {:?}", once);
                prop_assert!(!once.contains('['), "predicate left in {:?}", once);
                prop_assert!(!once.starts_with('/') && !once.ends_with('/'));
                prop_assert_eq!(normalize(&once), once);
            }
        }
    }
}
