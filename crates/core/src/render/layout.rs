//! Printable layout tree.
//!
//! A [`Layout`] is the document a [`CaptureSurface`](super::CaptureSurface)
//! draws. Elements carry an optional id and classes so interactive-only
//! controls can be hidden for the capture and restored afterwards.

use serde::{Deserialize, Serialize};

/// Content of one layout element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { text: String },
    Text { text: String },
    /// Label/value pairs.
    Fields { fields: Vec<(String, String)> },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Side-by-side columns of name/amount lines.
    Columns { columns: Vec<Column> },
    Signature { label: String },
    /// Interactive control; never belongs on paper.
    Control { label: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub heading: String,
    pub lines: Vec<(String, String)>,
    /// Shown instead of `lines` when there are none.
    #[serde(default)]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Element {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    pub block: Block,
    pub visible: bool,
}

impl Element {
    pub fn new(block: Block) -> Self {
        Self {
            id: None,
            classes: Vec::new(),
            block,
            visible: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    fn matches(&self, ids: &[String], classes: &[String]) -> bool {
        self.id.as_ref().is_some_and(|id| ids.contains(id))
            || self.classes.iter().any(|c| classes.contains(c))
    }
}

/// Handle returned by [`Layout::hide`]: an element and the visibility it had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiddenElement {
    pub index: usize,
    pub was_visible: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    pub title: String,
    elements: Vec<Element>,
}

impl Layout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element_by_id(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id.as_deref() == Some(id))
    }

    /// Hide every element matching an id or a class. Elements matched by both
    /// are hidden (and later restored) once.
    pub fn hide(&mut self, ids: &[String], classes: &[String]) -> Vec<HiddenElement> {
        let mut hidden = Vec::new();
        for (index, element) in self.elements.iter_mut().enumerate() {
            if element.matches(ids, classes) {
                hidden.push(HiddenElement {
                    index,
                    was_visible: element.visible,
                });
                element.visible = false;
            }
        }
        hidden
    }

    /// Put back the visibility recorded by [`Layout::hide`].
    pub fn restore(&mut self, hidden: &[HiddenElement]) {
        for h in hidden {
            if let Some(element) = self.elements.get_mut(h.index) {
                element.visible = h.was_visible;
            }
        }
    }

    pub fn visible(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.visible)
    }
}
