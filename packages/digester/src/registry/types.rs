//! Parse-state types owned by the digester: attributes, match path and stacks.

use std::fmt;

use crate::config::PATH_SEPARATOR;
use crate::error::{DigestError, Result};
use crate::object::ObjectRef;

/// Attributes of an element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Create an empty attribute list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Get the value of the first attribute with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the element has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Tracks the slash-joined path of currently open elements.
#[derive(Debug, Clone, Default)]
pub struct MatchTracker {
    path: String,
    depth: usize,
}

impl MatchTracker {
    /// Create a tracker at document level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an element.
    pub fn push(&mut self, name: &str) {
        if !self.path.is_empty() {
            self.path.push(PATH_SEPARATOR);
        }
        self.path.push_str(name);
        self.depth += 1;
    }

    /// Leave the innermost element.
    pub fn pop(&mut self) {
        match self.path.rfind(PATH_SEPARATOR) {
            Some(slash) => self.path.truncate(slash),
            None => self.path.clear(),
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current match path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of open elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return to document level.
    pub fn clear(&mut self) {
        self.path.clear();
        self.depth = 0;
    }
}

/// LIFO of constructed objects with a sticky root.
#[derive(Debug, Clone, Default)]
pub struct ObjectStack {
    items: Vec<ObjectRef>,
    root: Option<ObjectRef>,
}

impl ObjectStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an object; the first object on an empty stack becomes the root.
    pub fn push(&mut self, object: ObjectRef) {
        if self.items.is_empty() {
            self.root = Some(object.clone());
        }
        self.items.push(object);
    }

    /// Remove and return the top object.
    pub fn pop(&mut self) -> Option<ObjectRef> {
        self.items.pop()
    }

    /// Return the `n`-th object from the top (0 is the top).
    #[must_use]
    pub fn peek(&self, n: usize) -> Option<&ObjectRef> {
        let index = self.items.len().checked_sub(n + 1)?;
        self.items.get(index)
    }

    /// Number of objects on the stack.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// The first object pushed since the stack was last empty.
    #[must_use]
    pub fn root(&self) -> Option<&ObjectRef> {
        self.root.as_ref()
    }

    /// Drop all objects. The root is kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// A raw value collected for one argument of a pending method call.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Attribute value or body text, converted when the call fires.
    Text(String),
    /// Object taken from the object stack, passed as is.
    Object(ObjectRef),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Object(object) => f.write_str(object.type_name()),
        }
    }
}

/// Fixed-size argument slots for one pending method call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamFrame {
    slots: Vec<Option<Param>>,
}

impl ParamFrame {
    /// Create a frame of `size` empty slots.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the frame has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get the value in a slot, if it was set.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Param> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Fill a slot.
    ///
    /// # Errors
    /// `Protocol` if `index` is outside the frame.
    pub fn set(&mut self, index: usize, param: Param) -> Result<()> {
        let size = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            DigestError::protocol(format!(
                "parameter index {index} out of range for a call with {size} parameters"
            ))
        })?;
        *slot = Some(param);
        Ok(())
    }

    /// Take the slots out of the frame.
    #[must_use]
    pub fn into_slots(self) -> Vec<Option<Param>> {
        self.slots
    }
}

/// LIFO of parameter frames.
#[derive(Debug, Clone, Default)]
pub struct ParamStack {
    frames: Vec<ParamFrame>,
}

impl ParamStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame of `size` empty slots.
    pub fn push(&mut self, size: usize) {
        self.frames.push(ParamFrame::new(size));
    }

    /// Return the `n`-th frame from the top for writing.
    pub fn peek(&mut self, n: usize) -> Option<&mut ParamFrame> {
        let index = self.frames.len().checked_sub(n + 1)?;
        self.frames.get_mut(index)
    }

    /// Remove and return the top frame.
    pub fn pop(&mut self) -> Option<ParamFrame> {
        self.frames.pop()
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if no call is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop all frames.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Per-element body text accumulators.
///
/// Opening an element saves the parent's partial text; closing it restores
/// that text, so nested elements never leak into their ancestors.
#[derive(Debug, Clone, Default)]
pub struct BodyTextStack {
    current: String,
    saved: Vec<String>,
}

impl BodyTextStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the current text and start an empty one.
    pub fn open(&mut self) {
        self.saved.push(std::mem::take(&mut self.current));
    }

    /// Append a chunk to the current text.
    pub fn append(&mut self, chunk: &str) {
        self.current.push_str(chunk);
    }

    /// Text collected for the innermost element so far.
    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Discard the current text and restore the parent's.
    pub fn close(&mut self) {
        self.current = self.saved.pop().unwrap_or_default();
    }

    /// Number of saved accumulators.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Drop all text.
    pub fn clear(&mut self) {
        self.current.clear();
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;

    #[test]
    fn test_attributes_keep_order() {
        let attributes: Attributes = [("b", "2"), ("a", "1")].into_iter().collect();
        let names: Vec<&str> = attributes.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(attributes.get("a"), Some("1"));
        assert_eq!(attributes.get("c"), None);
    }

    #[test]
    fn test_match_tracker() {
        let mut tracker = MatchTracker::new();
        tracker.push("config");
        tracker.push("servers");
        tracker.push("server");
        assert_eq!(tracker.path(), "config/servers/server");
        assert_eq!(tracker.depth(), 3);

        tracker.pop();
        assert_eq!(tracker.path(), "config/servers");
        tracker.pop();
        tracker.pop();
        assert_eq!(tracker.path(), "");
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_object_stack_root_is_sticky() {
        let a = ObjectRef::new(Record::new());
        let b = ObjectRef::new(Record::new());
        let mut stack = ObjectStack::new();

        stack.push(a.clone());
        stack.push(b.clone());
        assert_eq!(stack.peek(0), Some(&b));
        assert_eq!(stack.peek(1), Some(&a));
        assert_eq!(stack.peek(2), None);

        assert_eq!(stack.pop(), Some(b));
        assert_eq!(stack.count(), 1);
        assert_eq!(stack.pop(), Some(a.clone()));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.root(), Some(&a));
    }

    #[test]
    fn test_object_stack_new_root_after_drain() {
        let a = ObjectRef::new(Record::new());
        let b = ObjectRef::new(Record::new());
        let mut stack = ObjectStack::new();

        stack.push(a);
        stack.clear();
        stack.push(b.clone());
        assert_eq!(stack.root(), Some(&b));
    }

    #[test]
    fn test_param_frame_set() {
        let mut frame = ParamFrame::new(2);
        assert!(frame.get(1).is_none());

        frame.set(1, Param::Text("x".to_string())).unwrap();
        assert_eq!(frame.get(1), Some(&Param::Text("x".to_string())));
        assert!(frame.set(2, Param::Text("y".to_string())).is_err());
    }

    #[test]
    fn test_param_stack_peek() {
        let mut stack = ParamStack::new();
        stack.push(1);
        stack.push(3);

        assert_eq!(stack.peek(0).map(|f| f.len()), Some(3));
        assert_eq!(stack.peek(1).map(|f| f.len()), Some(1));
        assert!(stack.peek(2).is_none());
        assert_eq!(stack.pop().map(|f| f.len()), Some(3));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_body_text_stack_restores_parent() {
        let mut body = BodyTextStack::new();
        body.open();
        body.append("outer");
        body.open();
        body.append("inner");
        assert_eq!(body.current(), "inner");
        assert_eq!(body.depth(), 2);

        body.close();
        assert_eq!(body.current(), "outer");
        body.append("more");
        assert_eq!(body.current(), "outermore");
        body.close();
        assert_eq!(body.current(), "");
    }
}
