//! Text operations - the edit payload of a collaborative operation.
//!
//! A [`TextOperation`] walks the whole document from start to end as a
//! sequence of retain, insert and delete components. Lengths are counted in
//! Unicode scalar values, so an operation built by a client against a string
//! applies to the same string on the server regardless of byte encoding.
//!
//! On the wire an operation is a JSON array: a positive integer retains, a
//! negative integer deletes, and a string inserts.
//!
//! ```json
//! [5, " brave", -1, 5]
//! ```

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};

/// A single component of a text operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// Keep the next `n` characters
    Retain(usize),
    /// Insert text at the current position
    Insert(String),
    /// Remove the next `n` characters
    Delete(usize),
}

impl Component {
    fn len(&self) -> usize {
        match self {
            Component::Retain(n) | Component::Delete(n) => *n,
            Component::Insert(text) => text.chars().count(),
        }
    }

    /// Consume `n` characters from a retain or delete, returning the rest.
    fn consume(self, n: usize) -> Option<Self> {
        match self {
            Component::Retain(len) if len > n => Some(Component::Retain(len - n)),
            Component::Delete(len) if len > n => Some(Component::Delete(len - n)),
            Component::Insert(text) => Some(Component::Insert(text)),
            _ => None,
        }
    }
}

/// An edit covering an entire document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RawComponent>", into = "Vec<RawComponent>")]
pub struct TextOperation {
    components: Vec<Component>,
    base_len: usize,
    target_len: usize,
}

impl TextOperation {
    /// Create an empty operation (applies only to the empty document).
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `text` at char position `pos` of a document of `base_len` chars.
    pub fn insert_at(base_len: usize, pos: usize, text: &str) -> Result<Self> {
        if pos > base_len {
            return Err(Error::OutOfBounds {
                end: pos,
                len: base_len,
            });
        }
        Ok(Self::new()
            .retain(pos)
            .insert(text)
            .retain(base_len - pos))
    }

    /// Delete `len` chars starting at `pos` of a document of `base_len` chars.
    pub fn delete_at(base_len: usize, pos: usize, len: usize) -> Result<Self> {
        let end = pos.saturating_add(len);
        if end > base_len {
            return Err(Error::OutOfBounds { end, len: base_len });
        }
        Ok(Self::new()
            .retain(pos)
            .delete(len)
            .retain(base_len - end))
    }

    /// Append a retain, merging with a trailing retain.
    pub fn retain(mut self, n: usize) -> Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        self.target_len += n;
        if let Some(Component::Retain(last)) = self.components.last_mut() {
            *last += n;
        } else {
            self.components.push(Component::Retain(n));
        }
        self
    }

    /// Append an insert.
    ///
    /// An insert directly after a delete is placed before it, so that
    /// equivalent operations have a single representation.
    pub fn insert(mut self, text: &str) -> Self {
        if text.is_empty() {
            return self;
        }
        self.target_len += text.chars().count();

        match self.components.last_mut() {
            Some(Component::Insert(last)) => {
                last.push_str(text);
                return self;
            }
            Some(Component::Delete(_)) => {}
            _ => {
                self.components.push(Component::Insert(text.to_owned()));
                return self;
            }
        }

        let at = self.components.len() - 1;
        match at.checked_sub(1).and_then(|i| self.components.get_mut(i)) {
            Some(Component::Insert(prev)) => prev.push_str(text),
            _ => self.components.insert(at, Component::Insert(text.to_owned())),
        }
        self
    }

    /// Append a delete, merging with a trailing delete.
    pub fn delete(mut self, n: usize) -> Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        if let Some(Component::Delete(last)) = self.components.last_mut() {
            *last += n;
        } else {
            self.components.push(Component::Delete(n));
        }
        self
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Length of the document this operation applies to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length of the document this operation produces.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Apply the operation to a string.
    pub fn apply(&self, input: &str) -> Result<String> {
        let actual = input.chars().count();
        if actual != self.base_len {
            return Err(Error::LengthMismatch {
                expected: self.base_len,
                actual,
            });
        }

        let mut chars = input.chars();
        let mut output = String::with_capacity(input.len());
        for component in &self.components {
            match component {
                Component::Retain(n) => output.extend(chars.by_ref().take(*n)),
                Component::Insert(text) => output.push_str(text),
                Component::Delete(n) => chars.by_ref().take(*n).for_each(drop),
            }
        }
        Ok(output)
    }

    /// Transform two operations made concurrently against the same document.
    ///
    /// Returns `(a', b')` such that applying `a` then `b'` yields the same
    /// document as applying `b` then `a'`. When both insert at the same
    /// position, the text of `a` ends up first.
    pub fn transform(a: &TextOperation, b: &TextOperation) -> Result<(Self, Self)> {
        if a.base_len != b.base_len {
            return Err(Error::LengthMismatch {
                expected: a.base_len,
                actual: b.base_len,
            });
        }

        let mut a_prime = TextOperation::new();
        let mut b_prime = TextOperation::new();
        let mut iter_a = a.components.iter().cloned();
        let mut iter_b = b.components.iter().cloned();
        let mut next_a = iter_a.next();
        let mut next_b = iter_b.next();

        loop {
            match (next_a.take(), next_b.take()) {
                (None, None) => break,
                (Some(Component::Insert(text)), other) => {
                    b_prime = b_prime.retain(text.chars().count());
                    a_prime = a_prime.insert(&text);
                    next_a = iter_a.next();
                    next_b = other;
                }
                (other, Some(Component::Insert(text))) => {
                    a_prime = a_prime.retain(text.chars().count());
                    b_prime = b_prime.insert(&text);
                    next_a = other;
                    next_b = iter_b.next();
                }
                (Some(x), Some(y)) => {
                    let n = x.len().min(y.len());
                    match (&x, &y) {
                        (Component::Retain(_), Component::Retain(_)) => {
                            a_prime = a_prime.retain(n);
                            b_prime = b_prime.retain(n);
                        }
                        (Component::Delete(_), Component::Retain(_)) => {
                            a_prime = a_prime.delete(n);
                        }
                        (Component::Retain(_), Component::Delete(_)) => {
                            b_prime = b_prime.delete(n);
                        }
                        // Both removed the same span
                        _ => {}
                    }
                    next_a = x.consume(n).or_else(|| iter_a.next());
                    next_b = y.consume(n).or_else(|| iter_b.next());
                }
                (Some(_), None) | (None, Some(_)) => {
                    return Err(Error::LengthMismatch {
                        expected: a.base_len,
                        actual: b.base_len,
                    });
                }
            }
        }

        Ok((a_prime, b_prime))
    }
}

/// Apply an edit to document content.
pub fn exec(content: &str, edit: &TextOperation) -> Result<String> {
    edit.apply(content)
}

/// Wire form of a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawComponent {
    Count(i64),
    Text(String),
}

impl TryFrom<Vec<RawComponent>> for TextOperation {
    type Error = Error;

    fn try_from(raw: Vec<RawComponent>) -> Result<Self> {
        let mut op = TextOperation::new();
        for component in raw {
            op = match component {
                RawComponent::Count(0) => {
                    return Err(Error::InvalidOperation(
                        "zero-length component".to_string(),
                    ))
                }
                RawComponent::Count(n) if n > 0 => {
                    let n = wire_len(n)?;
                    grown(op.base_len, n)?;
                    grown(op.target_len, n)?;
                    op.retain(n)
                }
                RawComponent::Count(n) => {
                    let n = wire_len(n)?;
                    grown(op.base_len, n)?;
                    op.delete(n)
                }
                RawComponent::Text(text) if text.is_empty() => {
                    return Err(Error::InvalidOperation(
                        "empty insert component".to_string(),
                    ))
                }
                RawComponent::Text(text) => op.insert(&text),
            };
        }
        Ok(op)
    }
}

/// Length of a wire count, whatever its sign.
fn wire_len(n: i64) -> Result<usize> {
    usize::try_from(n.unsigned_abs()).map_err(|_| overflow())
}

/// Fail unless `len + n` is representable.
fn grown(len: usize, n: usize) -> Result<()> {
    len.checked_add(n).map(drop).ok_or_else(overflow)
}

fn overflow() -> Error {
    Error::InvalidOperation("operation length overflows".to_string())
}

impl From<TextOperation> for Vec<RawComponent> {
    fn from(op: TextOperation) -> Self {
        op.components
            .into_iter()
            .map(|component| match component {
                Component::Retain(n) => RawComponent::Count(n as i64),
                Component::Insert(text) => RawComponent::Text(text),
                Component::Delete(n) => RawComponent::Count(-(n as i64)),
            })
            .collect()
    }
}
