// Copyright 2026 The Weft Authors
// SPDX-License-Identifier: Apache-2.0

//! Mapping from compiled elements back to source spans.
//!
//! Debuggers and error reporters use the [`SourceMap`] in both
//! directions: element to span when runtime errors need a source
//! location, and byte offset to element when an editor wants to know
//! what a cursor position compiles to.

use ecow::EcoString;
use serde::{Deserialize, Serialize};

use crate::source_analysis::Span;

use super::ir::ElementId;

/// One element's origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub element: ElementId,
    /// Source span start, in bytes.
    pub start: u32,
    /// Source span end, in bytes (exclusive).
    pub end: u32,
    /// The symbol this element involves, when there is one: the variable
    /// a `Set` writes, or the passage a divert targets.
    pub symbol: Option<EcoString>,
}

impl Mapping {
    #[must_use]
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// All element origins for a story, ordered by element id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    mappings: Vec<Mapping>,
}

impl SourceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an element's origin. Elements are emitted in id order, so
    /// the vector stays sorted.
    pub fn record(&mut self, element: ElementId, span: Span, symbol: Option<EcoString>) {
        debug_assert!(
            self.mappings.last().is_none_or(|m| m.element < element),
            "mappings must be recorded in element order"
        );
        self.mappings.push(Mapping {
            element,
            start: span.start(),
            end: span.end(),
            symbol,
        });
    }

    /// Returns the source span of an element.
    #[must_use]
    pub fn span_of(&self, element: ElementId) -> Option<Span> {
        self.mappings
            .binary_search_by_key(&element, |m| m.element)
            .ok()
            .map(|i| self.mappings[i].span())
    }

    /// Returns the mapping for an element.
    #[must_use]
    pub fn mapping(&self, element: ElementId) -> Option<&Mapping> {
        self.mappings
            .binary_search_by_key(&element, |m| m.element)
            .ok()
            .map(|i| &self.mappings[i])
    }

    /// Finds the innermost element covering a byte offset.
    ///
    /// Nested elements (a choice's body, a branch arm) are recorded after
    /// their parent with narrower spans, so the last covering mapping is
    /// the tightest one.
    #[must_use]
    pub fn element_at(&self, offset: u32) -> Option<ElementId> {
        self.mappings
            .iter()
            .filter(|m| m.start <= offset && offset < m.end.max(m.start + 1))
            .next_back()
            .map(|m| m.element)
    }

    /// Iterates all mappings in element order.
    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_lookup_by_element() {
        let mut map = SourceMap::new();
        map.record(ElementId(0), Span::new(0, 10), None);
        map.record(ElementId(1), Span::new(11, 20), Some("gold".into()));
        assert_eq!(map.span_of(ElementId(1)), Some(Span::new(11, 20)));
        assert_eq!(map.span_of(ElementId(9)), None);
        assert_eq!(
            map.mapping(ElementId(1)).unwrap().symbol.as_deref(),
            Some("gold")
        );
    }

    #[test]
    fn offset_lookup_prefers_innermost() {
        let mut map = SourceMap::new();
        // A choice covering 0..30 with a nested line at 10..20.
        map.record(ElementId(0), Span::new(0, 30), None);
        map.record(ElementId(1), Span::new(10, 20), None);
        assert_eq!(map.element_at(5), Some(ElementId(0)));
        assert_eq!(map.element_at(15), Some(ElementId(1)));
        assert_eq!(map.element_at(40), None);
    }
}
