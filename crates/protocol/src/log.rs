use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// The ordered sequence of envelopes produced by a recording session.
///
/// Append-only while being produced, read-only while being replayed.
/// Serializes as a plain JSON array of envelopes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandLog(Vec<Envelope>);

impl CommandLog {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, envelope: Envelope) {
        self.0.push(envelope);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Envelope> {
        self.0.get(index)
    }

    pub fn last(&self) -> Option<&Envelope> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Envelope> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<Vec<Envelope>> for CommandLog {
    fn from(envelopes: Vec<Envelope>) -> Self {
        Self(envelopes)
    }
}

impl FromIterator<Envelope> for CommandLog {
    fn from_iter<I: IntoIterator<Item = Envelope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CommandLog {
    type Item = Envelope;
    type IntoIter = std::vec::IntoIter<Envelope>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandLog {
    type Item = &'a Envelope;
    type IntoIter = std::slice::Iter<'a, Envelope>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
