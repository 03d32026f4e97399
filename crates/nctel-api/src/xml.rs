//! XML → [`PayloadTree`] parsing.
//!
//! Namespace-aware, non-recursive: open elements live on an explicit stack
//! so deeply nested documents cannot exhaust the call stack. Attributes are
//! ignored; leaf text is typed with [`Value::infer`].

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::Error;
use crate::payload::{PayloadTree, QualifiedName, Value};

/// Element under construction.
struct OpenElement {
    name: QualifiedName,
    text: String,
    children: Vec<PayloadTree>,
}

impl OpenElement {
    fn new(name: QualifiedName) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn finish(self) -> PayloadTree {
        // Mixed content: text next to child elements is dropped.
        let value = if self.children.is_empty() && !self.text.is_empty() {
            Some(Value::infer(&self.text))
        } else {
            None
        };
        PayloadTree {
            name: self.name,
            value,
            children: self.children,
        }
    }
}

/// Parse a document with at most one root element.
///
/// An empty document yields the empty tree.
pub fn parse(xml: &str) -> Result<PayloadTree, Error> {
    let mut roots = parse_forest(xml)?;
    match roots.len() {
        0 => Ok(PayloadTree::default()),
        1 => Ok(roots.remove(0)),
        n => Err(Error::Payload(format!("expected one root element, found {n}"))),
    }
}

/// Parse a fragment that may hold several top-level elements, such as the
/// contents of a `<data>` reply.
pub fn parse_forest(xml: &str) -> Result<Vec<PayloadTree>, Error> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut open: Vec<OpenElement> = Vec::new();
    let mut roots = Vec::new();

    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(e)) => {
                let name = qualified(&ns, e.local_name().as_ref())?;
                open.push(OpenElement::new(name));
            }
            (ns, Event::Empty(e)) => {
                let name = qualified(&ns, e.local_name().as_ref())?;
                attach(&mut open, &mut roots, OpenElement::new(name).finish());
            }
            (_, Event::Text(t)) => {
                if let Some(top) = open.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            (_, Event::CData(c)) => {
                if let Some(top) = open.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            (_, Event::End(_)) => {
                let element = open
                    .pop()
                    .ok_or_else(|| Error::Payload("unbalanced closing tag".into()))?;
                attach(&mut open, &mut roots, element.finish());
            }
            (_, Event::Eof) => break,
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(Error::Payload(format!(
            "unexpected end of document inside <{}>",
            unclosed.name.local
        )));
    }

    Ok(roots)
}

fn attach(open: &mut [OpenElement], roots: &mut Vec<PayloadTree>, node: PayloadTree) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn qualified(ns: &ResolveResult<'_>, local: &[u8]) -> Result<QualifiedName, Error> {
    let space = match ns {
        ResolveResult::Bound(ns) => String::from_utf8_lossy(ns.as_ref()).into_owned(),
        ResolveResult::Unbound => String::new(),
        ResolveResult::Unknown(prefix) => {
            return Err(Error::Payload(format!(
                "unknown namespace prefix '{}'",
                String::from_utf8_lossy(prefix)
            )));
        }
    };
    Ok(QualifiedName {
        space,
        local: String::from_utf8_lossy(local).into_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const IETF_IF: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";

    #[test]
    fn parses_namespaced_document() {
        let xml = r#"<?xml version="1.0"?>
            <interfaces-state xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">
              <interface>
                <name>GigabitEthernet1</name>
                <admin-status>up</admin-status>
                <if-index>1</if-index>
              </interface>
            </interfaces-state>"#;

        let tree = parse(xml).unwrap();
        assert_eq!(
            tree,
            PayloadTree::node(
                IETF_IF,
                "interfaces-state",
                vec![PayloadTree::node(
                    IETF_IF,
                    "interface",
                    vec![
                        PayloadTree::leaf(
                            IETF_IF,
                            "name",
                            Value::String("GigabitEthernet1".into())
                        ),
                        PayloadTree::leaf(IETF_IF, "admin-status", Value::String("up".into())),
                        PayloadTree::leaf(IETF_IF, "if-index", Value::Int64(1)),
                    ],
                )],
            )
        );
    }

    #[test]
    fn prefixed_namespaces_resolve() {
        let xml = r#"<if:interfaces xmlns:if="urn:x:if"><if:mtu>1500</if:mtu></if:interfaces>"#;
        let tree = parse(xml).unwrap();
        assert_eq!(tree.name, QualifiedName::new("urn:x:if", "interfaces"));
        assert_eq!(tree.children[0].name, QualifiedName::new("urn:x:if", "mtu"));
    }

    #[test]
    fn empty_elements_have_no_value() {
        let tree = parse("<root><enabled/></root>").unwrap();
        assert_eq!(tree.children[0].value, None);
        assert!(tree.children[0].is_leaf());
    }

    #[test]
    fn empty_document_yields_empty_tree() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("<?xml version=\"1.0\"?>").unwrap().is_empty());
    }

    #[test]
    fn forest_keeps_sibling_roots() {
        let roots = parse_forest("<a><x>1</x></a><b><y>2</y></b>").unwrap();
        assert_eq!(roots.len(), 2);
        assert!(parse("<a/><b/>").is_err());
    }

    #[test]
    fn unknown_prefix_is_rejected() {
        assert!(matches!(parse("<p:a>1</p:a>"), Err(Error::Payload(_))));
    }

    #[test]
    fn unclosed_document_is_rejected() {
        assert!(parse("<a><b>1</b>").is_err());
    }
}
