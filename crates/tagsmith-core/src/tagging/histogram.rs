//! Tag frequencies across a batch, and filtering records by tag.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::PredictionResult;

use super::ImageRecord;

/// How many retained images carry each tag by default.
///
/// Counts the default-accepted set of every result (character tags, the top
/// rating, general tags). Entries are sorted by count, highest first, with
/// ties broken by tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagFrequencyHistogram {
    entries: Vec<(String, usize)>,
}

impl TagFrequencyHistogram {
    pub fn build<'a>(results: impl IntoIterator<Item = &'a PredictionResult>) -> Self {
        let mut counts: HashMap<&'a str, usize> = HashMap::new();
        for result in results {
            for tag in result.default_accepted() {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut entries: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(tag, count)| (tag.to_string(), count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// `(tag, count)` pairs, most frequent first.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn count(&self, tag: &str) -> usize {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Indices of records whose accepted tags include every selected tag.
///
/// An empty selection matches every record.
pub fn filter_records<S: AsRef<str>>(records: &[ImageRecord], selected: &[S]) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            selected
                .iter()
                .all(|tag| record.state.is_accepted(tag.as_ref()) == Some(true))
        })
        .map(|(index, _)| index)
        .collect()
}
