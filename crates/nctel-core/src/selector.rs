// ── Selector registry ──
//
// Normalized measurement and tag selectors shared by every decode call of
// one controller. Built once at start, read-only afterwards.

use std::collections::BTreeSet;

use crate::config::RequestSpec;
use crate::normalize::normalize;

/// Measurement and tag selectors, normalized.
///
/// Classification is global per controller: a tag selector registered by one
/// request applies to payloads received for every other request too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorRegistry {
    measurements: BTreeSet<String>,
    tags: BTreeSet<String>,
}

impl SelectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every request of a controller.
    pub fn from_specs<'a>(specs: impl IntoIterator<Item = &'a RequestSpec>) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec);
        }
        registry
    }

    /// Add one request's selector and tag selectors.
    ///
    /// Requests with an empty selector (the default event stream)
    /// contribute nothing.
    pub fn register(&mut self, spec: &RequestSpec) {
        if spec.selector().is_empty() {
            return;
        }
        self.add_measurement(spec.selector());
        for tag in spec.tags() {
            self.add_tag(tag);
        }
    }

    pub fn add_measurement(&mut self, selector: &str) {
        self.measurements.insert(normalize(selector));
    }

    pub fn add_tag(&mut self, selector: &str) {
        self.tags.insert(normalize(selector));
    }

    pub fn is_measurement(&self, path: &str) -> bool {
        self.measurements.contains(path)
    }

    pub fn is_tag(&self, path: &str) -> bool {
        self.tags.contains(path)
    }

    pub fn measurements(&self) -> impl Iterator<Item = &str> {
        self.measurements.iter().map(String::as_str)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}
