// ── Payload decoding ──
//
// Walks a `PayloadTree` with an explicit stack (no recursion, so nesting
// depth is bounded by heap, not the call stack) and classifies every leaf
// as a tag or a field of the enclosing measurement.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use nctel_api::{PayloadTree, Value};

use crate::error::CoreError;
use crate::normalize::namespace_prefix;
use crate::record::{Record, RecordGrouper};
use crate::selector::SelectorRegistry;

/// Tag key every record carries, holding the originating address.
pub const SOURCE_TAG: &str = "source";

/// Decode one payload into records.
///
/// Pure: the same inputs always yield the same records in the same order.
/// On an unsupported leaf value the whole payload is rejected and no records
/// are returned.
pub fn decode(
    root: &PayloadTree,
    selectors: &SelectorRegistry,
    source: &str,
    timestamp: DateTime<Utc>,
) -> Result<Vec<Record>, CoreError> {
    if root.is_empty() {
        return Ok(Vec::new());
    }

    let mut walk = Walk::new(root, selectors, source, timestamp);
    walk.run()?;
    Ok(walk.grouper.records())
}

/// Stack frame: a node and the index of the next child to visit.
struct Frame<'a> {
    node: &'a PayloadTree,
    next: usize,
}

/// Leaf captured while walking, remembered with its full traversal path so
/// it can be discarded when the subtree that produced it is finished.
struct Captured<T> {
    scope: String,
    value: T,
}

struct Walk<'a> {
    selectors: &'a SelectorRegistry,
    source: &'a str,
    timestamp: DateTime<Utc>,
    /// `ietf-interfaces:` style prefix of the root namespace, or `/`.
    prefix: String,

    stack: Vec<Frame<'a>>,
    /// Local names from the root to the current node.
    path: Vec<&'a str>,
    /// Internal-node path that may still become the measurement.
    candidate: Vec<&'a str>,
    /// Depth at which the measurement matched; fixed once set.
    measurement_level: Option<usize>,

    tags: BTreeMap<String, Captured<String>>,
    fields: IndexMap<String, Captured<Value>>,
    grouper: RecordGrouper,
}

impl<'a> Walk<'a> {
    fn new(
        root: &'a PayloadTree,
        selectors: &'a SelectorRegistry,
        source: &'a str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            selectors,
            source,
            timestamp,
            prefix: namespace_prefix(&root.name.space),
            stack: vec![Frame {
                node: root,
                next: 0,
            }],
            path: vec![root.local_name()],
            candidate: Vec::new(),
            measurement_level: None,
            tags: BTreeMap::new(),
            fields: IndexMap::new(),
            grouper: RecordGrouper::new(),
        }
    }

    fn run(&mut self) -> Result<(), CoreError> {
        while let Some(frame) = self.stack.last_mut() {
            let node = frame.node;
            let index = frame.next;

            if node.is_leaf() {
                self.leaf(node)?;
                self.stack.pop();
                self.path.pop();
                if self.stack.is_empty() {
                    // Single-leaf payload: nothing else will flush it.
                    self.flush()?;
                }
                continue;
            }

            if let Some(child) = node.children.get(index) {
                frame.next += 1;
                if index == 0 {
                    self.enter(node.local_name());
                }
                self.path.push(child.local_name());
                self.stack.push(Frame {
                    node: child,
                    next: 0,
                });
                continue;
            }

            // All children visited.
            self.flush()?;
            let scope = format!("{}/", self.path.join("/"));
            self.tags.retain(|_, tag| !tag.scope.starts_with(&scope));
            self.fields.retain(|_, field| !field.scope.starts_with(&scope));

            self.stack.pop();
            self.path.pop();
            if self.measurement_level.is_none() {
                self.candidate.pop();
            }
        }
        Ok(())
    }

    /// Grow the candidate measurement path by one internal node.
    fn enter(&mut self, name: &'a str) {
        if self.measurement_level.is_some() {
            return;
        }
        self.candidate.push(name);
        if self.selectors.is_measurement(&self.candidate.join("/")) {
            self.measurement_level = Some(self.candidate.len());
        }
    }

    fn level(&self) -> usize {
        self.measurement_level.unwrap_or(self.candidate.len())
    }

    fn leaf(&mut self, node: &'a PayloadTree) -> Result<(), CoreError> {
        let tag_key = self.path.join("/");
        let value = node.value_or_default();

        if self.selectors.is_tag(&tag_key) {
            let text = value
                .to_tag_string()
                .ok_or_else(|| unsupported(node, &value))?
                .into_owned();
            self.tags.insert(
                format!("{}{tag_key}", self.prefix),
                Captured {
                    scope: tag_key,
                    value: text,
                },
            );
            return Ok(());
        }

        if let Value::Binary(_) = *value {
            return Err(unsupported(node, &value));
        }

        let level = self.level();
        let field_key = if self.path.len() - 1 <= level {
            node.local_name().to_owned()
        } else {
            self.path[level..].join("/")
        };
        self.fields.insert(
            field_key,
            Captured {
                scope: tag_key,
                value: value.into_owned(),
            },
        );
        Ok(())
    }

    /// Hand every field collected so far to the grouper under the current
    /// measurement and tag set.
    fn flush(&mut self) -> Result<(), CoreError> {
        if self.fields.is_empty() {
            return Ok(());
        }

        let measurement = match self.measurement_level {
            Some(level) => self.candidate[..level].join("/"),
            None => self.candidate.join("/"),
        };
        let measurement = format!("{}{measurement}", self.prefix);

        let mut tags: BTreeMap<String, String> = self
            .tags
            .iter()
            .map(|(key, tag)| (key.clone(), tag.value.clone()))
            .collect();
        tags.insert(SOURCE_TAG.to_owned(), self.source.to_owned());

        for (key, field) in &self.fields {
            self.grouper
                .add(&measurement, &tags, self.timestamp, key, field.value.clone())?;
        }
        Ok(())
    }
}

fn unsupported(node: &PayloadTree, value: &Value) -> CoreError {
    CoreError::UnsupportedValue {
        leaf: node.local_name().to_owned(),
        value_type: value.type_name(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    const IETF_IF: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";
    const SOURCE: &str = "10.0.0.1:830";

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn registry() -> SelectorRegistry {
        let mut selectors = SelectorRegistry::new();
        selectors.add_measurement("interfaces-state/interface");
        selectors.add_tag("interfaces-state/interface/name");
        selectors
    }

    fn leaf(name: &str, value: Value) -> PayloadTree {
        PayloadTree::leaf(IETF_IF, name, value)
    }

    fn text(s: &str) -> Value {
        Value::String(s.to_owned())
    }

    fn interface(name: &str, children: Vec<PayloadTree>) -> PayloadTree {
        let mut all = vec![leaf("name", text(name))];
        all.extend(children);
        PayloadTree::node(IETF_IF, "interface", all)
    }

    fn interfaces_state(interfaces: Vec<PayloadTree>) -> PayloadTree {
        PayloadTree::node(IETF_IF, "interfaces-state", interfaces)
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let records = decode(&PayloadTree::default(), &registry(), SOURCE, ts()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn decodes_interface_state() {
        let tree = interfaces_state(vec![interface(
            "GigabitEthernet1",
            vec![
                leaf("admin-status", text("up")),
                leaf("oper-status", text("up")),
                leaf("if-index", Value::Int64(1)),
                leaf("speed", Value::Int64(1_024_000_000)),
            ],
        )]);

        let records = decode(&tree, &registry(), SOURCE, ts()).unwrap();

        let expected = Record {
            measurement: "ietf-interfaces:interfaces-state/interface".into(),
            tags: BTreeMap::from([
                ("source".to_owned(), SOURCE.to_owned()),
                (
                    "ietf-interfaces:interfaces-state/interface/name".to_owned(),
                    "GigabitEthernet1".to_owned(),
                ),
            ]),
            fields: BTreeMap::from([
                ("admin-status".to_owned(), text("up")),
                ("oper-status".to_owned(), text("up")),
                ("if-index".to_owned(), Value::Int64(1)),
                ("speed".to_owned(), Value::Int64(1_024_000_000)),
            ]),
            timestamp: ts(),
        };
        assert_eq!(records, vec![expected]);
    }

    #[test]
    fn unsupported_tag_value_rejects_payload() {
        let tree = interfaces_state(vec![PayloadTree::node(
            IETF_IF,
            "interface",
            vec![
                leaf("admin-status", text("up")),
                leaf("name", Value::Binary(vec![0x01])),
            ],
        )]);

        let err = decode(&tree, &registry(), SOURCE, ts()).unwrap_err();
        assert!(matches!(
            &err,
            CoreError::UnsupportedValue { leaf, value_type: "binary" } if leaf == "name"
        ));
    }

    #[test]
    fn unsupported_field_value_rejects_payload() {
        let tree = interfaces_state(vec![
            interface("Gi1", vec![leaf("mtu", Value::Int64(1500))]),
            interface("Gi2", vec![leaf("blob", Value::Binary(vec![]))]),
        ]);

        let err = decode(&tree, &registry(), SOURCE, ts()).unwrap_err();
        assert!(err.to_string().contains("'blob'"));
    }

    #[test]
    fn repeated_elements_become_separate_records() {
        let tree = interfaces_state(vec![
            interface("Gi1", vec![leaf("mtu", Value::Int64(1500))]),
            interface("Gi2", vec![leaf("mtu", Value::Int64(9000))]),
        ]);

        let records = decode(&tree, &registry(), SOURCE, ts()).unwrap();
        assert_eq!(records.len(), 2);

        let name_tag = "ietf-interfaces:interfaces-state/interface/name";
        assert_eq!(records[0].tags[name_tag], "Gi1");
        assert_eq!(records[0].fields["mtu"], Value::Int64(1500));
        assert_eq!(records[1].tags[name_tag], "Gi2");
        assert_eq!(records[1].fields["mtu"], Value::Int64(9000));
    }

    #[test]
    fn nested_leaves_are_keyed_relative_to_measurement() {
        let tree = interfaces_state(vec![interface(
            "Gi1",
            vec![
                leaf("admin-status", text("up")),
                PayloadTree::node(
                    IETF_IF,
                    "statistics",
                    vec![
                        leaf("in-octets", Value::UInt64(10)),
                        leaf("out-octets", Value::UInt64(20)),
                    ],
                ),
            ],
        )]);

        let records = decode(&tree, &registry(), SOURCE, ts()).unwrap();
        assert_eq!(records.len(), 1);
        let fields: Vec<&str> = records[0].fields.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec!["admin-status", "statistics/in-octets", "statistics/out-octets"]
        );
    }

    #[test]
    fn repeated_nested_lists_do_not_leak_between_siblings() {
        let queue = |id: i64, drops: i64| {
            PayloadTree::node(
                IETF_IF,
                "queue",
                vec![leaf("id", Value::Int64(id)), leaf("drops", Value::Int64(drops))],
            )
        };
        let mut selectors = registry();
        selectors.add_tag("interfaces-state/interface/queue/id");

        let tree = interfaces_state(vec![interface("Gi1", vec![queue(0, 5), queue(1, 7)])]);
        let records = decode(&tree, &selectors, SOURCE, ts()).unwrap();

        let queue_tag = "ietf-interfaces:interfaces-state/interface/queue/id";
        let per_queue: Vec<(&str, &Value)> = records
            .iter()
            .filter_map(|r| Some((r.tags.get(queue_tag)?.as_str(), r.fields.get("queue/drops")?)))
            .collect();
        assert_eq!(
            per_queue,
            vec![("0", &Value::Int64(5)), ("1", &Value::Int64(7))]
        );
    }

    #[test]
    fn bool_tags_render_as_digits() {
        let mut selectors = registry();
        selectors.add_tag("interfaces-state/interface/enabled");
        let tree = interfaces_state(vec![interface(
            "Gi1",
            vec![leaf("enabled", Value::Bool(true)), leaf("mtu", Value::Int64(1500))],
        )]);

        let records = decode(&tree, &selectors, SOURCE, ts()).unwrap();
        assert_eq!(
            records[0].tags["ietf-interfaces:interfaces-state/interface/enabled"],
            "1"
        );
    }

    #[test]
    fn unqualified_root_uses_slash_prefix() {
        let mut selectors = SelectorRegistry::new();
        selectors.add_measurement("system");
        let tree = PayloadTree::node(
            "",
            "system",
            vec![PayloadTree::leaf("", "uptime", Value::UInt64(42))],
        );

        let records = decode(&tree, &selectors, SOURCE, ts()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].measurement, "/system");
        assert_eq!(records[0].fields["uptime"], Value::UInt64(42));
    }

    #[test]
    fn decoding_is_repeatable() {
        let tree = interfaces_state(vec![
            interface("Gi1", vec![leaf("mtu", Value::Int64(1500))]),
            interface("Gi2", vec![leaf("mtu", Value::Int64(9000))]),
        ]);
        let first = decode(&tree, &registry(), SOURCE, ts()).unwrap();
        let second = decode(&tree, &registry(), SOURCE, ts()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn deep_trees_do_not_overflow() {
        let mut tree = PayloadTree::leaf("", "bottom", Value::Int64(1));
        for _ in 0..5_000 {
            tree = PayloadTree::node("", "level", vec![tree]);
        }
        let records = decode(&tree, &SelectorRegistry::new(), SOURCE, ts()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["bottom"], Value::Int64(1));
    }
}
