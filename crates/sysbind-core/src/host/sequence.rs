//! Host-side containers: the one-based sequence and the keyed table.

use rustc_hash::FxHashMap;

use super::HostValue;

/// Order-preserving, one-based sequence value.
///
/// The declared length is the number of slots. A slot holding
/// [`HostValue::Nil`] is a hole: it counts toward the length but
/// [`get`](Self::get) reports it as absent.
///
/// # Example
///
/// ```
/// use sysbind_core::{HostSequence, HostValue};
///
/// let mut seq: HostSequence = [1, 2, 3].into_iter().collect();
/// assert_eq!(seq.len(), 3);
/// assert_eq!(seq.get(1), Some(&HostValue::Int(1)));
/// assert_eq!(seq.get(0), None);
///
/// seq.set(5, HostValue::Int(5));
/// assert_eq!(seq.len(), 5);
/// assert_eq!(seq.get(4), None);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostSequence {
    slots: Vec<HostValue>,
}

impl HostSequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Declared length, holes included.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get the element at a one-based `index`.
    ///
    /// Returns `None` for index 0, indices past the end, and holes.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&HostValue> {
        let value = self.slots.get(index.checked_sub(1)?)?;
        if value.is_nil() { None } else { Some(value) }
    }

    /// Store a value at a one-based `index`, growing the sequence with holes
    /// if needed.
    ///
    /// Returns `false` (and stores nothing) for index 0.
    pub fn set(&mut self, index: usize, value: HostValue) -> bool {
        let Some(slot) = index.checked_sub(1) else {
            return false;
        };
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, HostValue::Nil);
        }
        self.slots[slot] = value;
        true
    }

    /// Append a value after the last slot.
    pub fn push(&mut self, value: impl Into<HostValue>) {
        self.slots.push(value.into());
    }

    /// Iterate over all slots in order, holes included.
    pub fn iter(&self) -> impl Iterator<Item = &HostValue> {
        self.slots.iter()
    }

    /// Get the slots as a zero-based slice.
    pub fn as_slice(&self) -> &[HostValue] {
        &self.slots
    }

    pub fn into_vec(self) -> Vec<HostValue> {
        self.slots
    }
}

impl<V: Into<HostValue>> FromIterator<V> for HostSequence {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<HostValue>> for HostSequence {
    fn from(slots: Vec<HostValue>) -> Self {
        Self { slots }
    }
}

impl IntoIterator for HostSequence {
    type Item = HostValue;
    type IntoIter = std::vec::IntoIter<HostValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

impl<'a> IntoIterator for &'a HostSequence {
    type Item = &'a HostValue;
    type IntoIter = std::slice::Iter<'a, HostValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// String-keyed table, used to pass a record by field names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostTable {
    fields: FxHashMap<String, HostValue>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HostValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HostValue)> {
        self.fields.iter()
    }
}
