//! Per-image accepted/rejected tag flags.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{PredictionResult, Rating};

/// Ordered tag → accepted flag map for one image.
///
/// Insertion order is the order tags are committed in: character tags, the
/// three ratings, general tags, then user-added tags as they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagState {
    flags: IndexMap<String, bool>,
}

impl TagState {
    /// Initial state for a fresh prediction.
    ///
    /// Every character and general tag starts accepted; of the ratings only
    /// the highest-scoring one does.
    pub fn seed(result: &PredictionResult) -> Self {
        let mut flags = IndexMap::new();
        for tag in result.character_tags.keys() {
            flags.insert(tag.clone(), true);
        }
        let top = result.rating.argmax();
        for rating in Rating::ALL {
            flags.insert(rating.tag_name().to_string(), rating == top);
        }
        for tag in result.threshold_tags.keys() {
            flags.insert(tag.clone(), true);
        }
        Self { flags }
    }

    /// Flip a tag. Returns false if the tag is unknown.
    pub fn toggle(&mut self, tag: &str) -> bool {
        match self.flags.get_mut(tag) {
            Some(flag) => {
                *flag = !*flag;
                true
            }
            None => false,
        }
    }

    /// Set a known tag. Returns false if the tag is unknown.
    pub fn set(&mut self, tag: &str, accepted: bool) -> bool {
        match self.flags.get_mut(tag) {
            Some(flag) => {
                *flag = accepted;
                true
            }
            None => false,
        }
    }

    /// Accept a tag, appending it if it is new.
    pub(crate) fn accept(&mut self, tag: &str) {
        match self.flags.get_mut(tag) {
            Some(flag) => *flag = true,
            None => {
                self.flags.insert(tag.to_string(), true);
            }
        }
    }

    /// Accept every non-rating tag.
    pub fn select_all(&mut self) {
        self.set_non_ratings(true);
    }

    /// Reject every non-rating tag.
    pub fn clear(&mut self) {
        self.set_non_ratings(false);
    }

    fn set_non_ratings(&mut self, accepted: bool) {
        for (tag, flag) in self.flags.iter_mut() {
            if Rating::from_tag_name(tag).is_none() {
                *flag = accepted;
            }
        }
    }

    pub fn is_accepted(&self, tag: &str) -> Option<bool> {
        self.flags.get(tag).copied()
    }

    /// Accepted tags in commit order.
    pub fn accepted(&self) -> impl Iterator<Item = &str> + '_ {
        self.flags
            .iter()
            .filter(|&(_, &accepted)| accepted)
            .map(|(tag, _)| tag.as_str())
    }

    /// All tags with their flags, in commit order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.flags.iter().map(|(tag, &accepted)| (tag.as_str(), accepted))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// The string persisted into image metadata.
    pub fn commit(&self) -> String {
        self.accepted().collect::<Vec<_>>().join(", ")
    }
}
