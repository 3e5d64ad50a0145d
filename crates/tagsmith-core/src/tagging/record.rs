//! One retained image with its prediction and editable tag state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{PredictionResult, TagSource};

use super::{LabelVocabulary, TagState};

/// A retained image in the current batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub result: PredictionResult,
    pub state: TagState,
    /// Display text: the walk summary until changes are saved, then the committed tags.
    pub text: String,
}

impl ImageRecord {
    pub fn new(path: PathBuf, result: PredictionResult) -> Self {
        let state = TagState::seed(&result);
        let text = result.text.clone();
        Self {
            path,
            result,
            state,
            text,
        }
    }

    /// Add a tag by hand and accept it.
    ///
    /// Character labels join the character bucket, anything else the general
    /// bucket. A tag the record already knows is only re-accepted; its source
    /// is left untouched. Returns false for blank input.
    pub fn add_custom_tag(&mut self, tag: &str, vocab: &LabelVocabulary) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }

        if self.state.is_accepted(tag).is_none() {
            let bucket = if vocab.is_character(tag) {
                &mut self.result.character_tags
            } else {
                &mut self.result.threshold_tags
            };
            bucket.insert(tag.to_string(), TagSource::UserAdded);
        }
        self.state.accept(tag);
        true
    }

    /// Refresh the display text from the current accepted tags.
    pub fn save_changes(&mut self) -> &str {
        self.text = self.state.commit();
        &self.text
    }

    /// File name for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RatingScores;
    use indexmap::IndexMap;

    fn record() -> ImageRecord {
        let mut threshold_tags = IndexMap::new();
        threshold_tags.insert("smile".to_string(), TagSource::ModelDerived(0.8));
        let mut all_tags = IndexMap::new();
        all_tags.insert("smile".to_string(), 0.8);
        all_tags.insert("hat".to_string(), 0.1);
        ImageRecord::new(
            PathBuf::from("/pics/a.png"),
            PredictionResult {
                threshold_tags,
                all_tags,
                rating: RatingScores::from_slice([0.9, 0.05, 0.05]),
                character_tags: IndexMap::new(),
                text: "smile, hat".to_string(),
            },
        )
    }

    fn vocab() -> LabelVocabulary {
        LabelVocabulary::from_parts(["smile", "hat"], ["hatsune_miku"])
    }

    #[test]
    fn test_new_record_shows_walk_summary() {
        let record = record();
        assert_eq!(record.text, "smile, hat");
        assert_eq!(record.file_name(), "a.png");
    }

    #[test]
    fn test_add_custom_general_tag() {
        let mut record = record();
        assert!(record.add_custom_tag("  blue_sky ", &vocab()));
        assert_eq!(
            record.result.threshold_tags.get("blue_sky"),
            Some(&TagSource::UserAdded)
        );
        assert_eq!(record.state.is_accepted("blue_sky"), Some(true));
        assert_eq!(record.state.commit(), "rating:safe, smile, blue_sky");
    }

    #[test]
    fn test_add_custom_character_tag() {
        let mut record = record();
        assert!(record.add_custom_tag("hatsune_miku", &vocab()));
        assert_eq!(
            record.result.character_tags.get("hatsune_miku"),
            Some(&TagSource::UserAdded)
        );
        assert!(!record.result.threshold_tags.contains_key("hatsune_miku"));
    }

    #[test]
    fn test_add_existing_tag_keeps_model_score() {
        let mut record = record();
        record.state.toggle("smile");
        assert!(record.add_custom_tag("smile", &vocab()));
        assert_eq!(
            record.result.threshold_tags.get("smile"),
            Some(&TagSource::ModelDerived(0.8))
        );
        assert_eq!(record.state.is_accepted("smile"), Some(true));
    }

    #[test]
    fn test_add_blank_tag_is_rejected() {
        let mut record = record();
        assert!(!record.add_custom_tag("   ", &vocab()));
    }

    #[test]
    fn test_save_changes_updates_text() {
        let mut record = record();
        record.state.toggle("smile");
        assert_eq!(record.save_changes(), "rating:safe");
        assert_eq!(record.text, "rating:safe");
    }
}
