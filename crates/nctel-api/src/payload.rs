//! In-memory representation of one received payload.
//!
//! A [`PayloadTree`] is built fresh for every message (by [`crate::xml::parse`]
//! or a session implementation), consumed once by the decoder, then dropped.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

// ── QualifiedName ────────────────────────────────────────────────────

/// Namespace-qualified element name.
///
/// `space` is the namespace URI as sent on the wire
/// (e.g. `urn:ietf:params:xml:ns:yang:ietf-interfaces`), or empty when the
/// element is unqualified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub space: String,
    pub local: String,
}

impl QualifiedName {
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.space.is_empty() && self.local.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.space.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.space, self.local)
        }
    }
}

// ── Value ────────────────────────────────────────────────────────────

/// Scalar carried by a leaf.
///
/// The decoder supports the first five variants. `Binary` exists because
/// session implementations may hand over undecoded opaque content (YANG
/// `binary` leaves); the decoder rejects it rather than guessing an encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Binary(Vec<u8>),
}

impl Value {
    /// Runtime type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int64(_) => "int64",
            Self::UInt64(_) => "uint64",
            Self::Float64(_) => "float64",
            Self::Binary(_) => "binary",
        }
    }

    /// String form used when a leaf becomes a tag.
    ///
    /// Booleans render as `0`/`1`, integers in decimal, floats in the
    /// shortest form that parses back to the same value. Returns `None`
    /// for variants without a textual form.
    pub fn to_tag_string(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(s) => Some(Cow::Borrowed(s.as_str())),
            Self::Bool(b) => Some(Cow::Borrowed(if *b { "1" } else { "0" })),
            Self::Int64(v) => Some(Cow::Owned(v.to_string())),
            Self::UInt64(v) => Some(Cow::Owned(v.to_string())),
            Self::Float64(v) => Some(Cow::Owned(v.to_string())),
            Self::Binary(_) => None,
        }
    }

    /// Infer a typed value from leaf text.
    ///
    /// `true`/`false` become booleans, integral text becomes `Int64` (or
    /// `UInt64` above `i64::MAX`), finite decimal text becomes `Float64`,
    /// anything else stays a string.
    pub fn infer(text: &str) -> Self {
        match text {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(v) = text.parse::<i64>() {
            return Self::Int64(v);
        }
        if let Ok(v) = text.parse::<u64>() {
            return Self::UInt64(v);
        }
        if looks_numeric(text) {
            if let Ok(v) = text.parse::<f64>() {
                if v.is_finite() {
                    return Self::Float64(v);
                }
            }
        }
        Self::String(text.to_owned())
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::String(String::new())
    }
}

/// Guards float inference against words `f64::from_str` accepts
/// (`inf`, `NaN`, `infinity`).
fn looks_numeric(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

// ── PayloadTree ──────────────────────────────────────────────────────

/// One node of a received payload.
///
/// Internal nodes carry children and no value; leaves carry a value or
/// default to the empty string. The default tree (empty name) represents an
/// empty payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadTree {
    pub name: QualifiedName,
    pub value: Option<Value>,
    pub children: Vec<PayloadTree>,
}

impl PayloadTree {
    /// Internal node.
    pub fn node(
        space: impl Into<String>,
        local: impl Into<String>,
        children: Vec<PayloadTree>,
    ) -> Self {
        Self {
            name: QualifiedName::new(space, local),
            value: None,
            children,
        }
    }

    /// Leaf node.
    pub fn leaf(space: impl Into<String>, local: impl Into<String>, value: Value) -> Self {
        Self {
            name: QualifiedName::new(space, local),
            value: Some(value),
            children: Vec::new(),
        }
    }

    /// `true` for the empty payload (no qualified name).
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// The leaf value, or the empty-string default.
    pub fn value_or_default(&self) -> Cow<'_, Value> {
        self.value
            .as_ref()
            .map_or_else(|| Cow::Owned(Value::default()), Cow::Borrowed)
    }
}
