//! Page snapshots handed over by the host shell.
//!
//! The host serialises the parts of the live DOM that detection cares about
//! (elements carrying address-like attributes or classes, copy buttons with
//! their surrounding text, and the visible body text) into a `PageSnapshot`.
//! Adapters query the snapshot through `DomSelector`s instead of a CSS engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attributes probed, in order, after an element's own text.
pub const ADDRESS_ATTRIBUTES: [&str; 5] =
    ["data-mint", "data-address", "data-token", "data-contract", "data-token-address"];

/// One element captured from the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub text: String,
    /// Text content of the parent element, used for copy-button neighbourhoods.
    #[serde(default)]
    pub parent_text: Option<String>,
}

impl PageElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Default::default() }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_parent_text(mut self, text: impl Into<String>) -> Self {
        self.parent_text = Some(text.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Texts worth scanning for an address, most specific first.
    pub fn probe_texts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.text.as_str())
            .chain(ADDRESS_ATTRIBUTES.iter().filter_map(|a| self.attr(a)))
            .chain(self.attr("value"))
            .filter(|t| !t.is_empty())
    }
}

/// Declarative stand-in for the CSS selectors adapters care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomSelector {
    /// `[name]`
    Attribute(&'static str),
    /// `.name`
    Class(&'static str),
    /// `input[value*=needle]`
    InputValueContains(&'static str),
    /// `button[title*=Copy], button[aria-label*=Copy]`, scanned via parent text.
    CopyButton,
}

impl DomSelector {
    pub fn matches(&self, element: &PageElement) -> bool {
        match self {
            DomSelector::Attribute(name) => element.attributes.contains_key(*name),
            DomSelector::Class(name) => element.has_class(name),
            DomSelector::InputValueContains(needle) => {
                element.tag.eq_ignore_ascii_case("input")
                    && element.attr("value").is_some_and(|v| v.contains(needle))
            }
            DomSelector::CopyButton => {
                element.tag.eq_ignore_ascii_case("button")
                    && ["title", "aria-label"]
                        .iter()
                        .filter_map(|a| element.attr(a))
                        .any(|v| v.contains("Copy"))
            }
        }
    }

    /// Texts to scan on a matched element.
    pub fn texts<'a>(&self, element: &'a PageElement) -> Vec<&'a str> {
        match self {
            DomSelector::CopyButton => element.parent_text.as_deref().into_iter().collect(),
            _ => element.probe_texts().collect(),
        }
    }
}

/// Serialisable snapshot of the page DOM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub elements: Vec<PageElement>,
    /// `document.body.innerText`
    #[serde(default)]
    pub body_text: String,
}

impl PageSnapshot {
    pub fn new(elements: Vec<PageElement>, body_text: impl Into<String>) -> Self {
        Self { elements, body_text: body_text.into() }
    }

    /// Snapshot with visible text only.
    pub fn from_text(body_text: impl Into<String>) -> Self {
        Self::new(Vec::new(), body_text)
    }

    pub fn select<'a>(&'a self, selector: &'a DomSelector) -> impl Iterator<Item = &'a PageElement> {
        self.elements.iter().filter(move |e| selector.matches(e))
    }

    pub fn visible_text(&self) -> &str {
        &self.body_text
    }
}
