//! Label vocabulary loading.
//!
//! A DeepDanbooru distribution ships two plain-text files next to its weights:
//! the general labels (one per line, in classifier output order) and the
//! character labels (one per line, order irrelevant). Rating names are fixed
//! and never read from disk.

use std::collections::HashSet;
use std::path::Path;

use crate::config::ModelConfig;

/// Ordered general labels plus the character-label set.
///
/// Immutable after load; shared behind an `Arc` by the session.
#[derive(Debug, Clone, Default)]
pub struct LabelVocabulary {
    general: Vec<String>,
    characters: HashSet<String>,
}

impl LabelVocabulary {
    /// Load both label files from the model directory.
    ///
    /// A missing or unreadable file yields an empty list with a warning rather
    /// than an error; callers check [`is_empty`](Self::is_empty) before predicting.
    pub fn load(model_dir: &Path, config: &ModelConfig) -> Self {
        let general = read_label_lines(&model_dir.join(&config.general_labels_file));
        let characters: HashSet<String> =
            read_label_lines(&model_dir.join(&config.character_labels_file))
                .into_iter()
                .filter(|label| !label.is_empty())
                .collect();

        tracing::info!(
            "Loaded vocabulary: {} general labels, {} character labels",
            general.len(),
            characters.len(),
        );

        Self {
            general,
            characters,
        }
    }

    /// Build a vocabulary from in-memory labels.
    pub fn from_parts<G, C>(general: G, characters: C) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            general: general.into_iter().map(Into::into).collect(),
            characters: characters.into_iter().map(Into::into).collect(),
        }
    }

    /// General labels in classifier output order.
    pub fn general(&self) -> &[String] {
        &self.general
    }

    /// Label at a classifier output index.
    ///
    /// Blank placeholder lines hold their index but have no label.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.general
            .get(index)
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    }

    /// Number of general labels (classifier outputs minus the three ratings).
    pub fn len(&self) -> usize {
        self.general.len()
    }

    /// Whether no general labels were loaded.
    pub fn is_empty(&self) -> bool {
        self.general.is_empty()
    }

    /// Whether a label identifies a character.
    pub fn is_character(&self, label: &str) -> bool {
        self.characters.contains(label)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Labels starting with `prefix`, for tag-entry completion.
    pub fn complete<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.general
            .iter()
            .map(String::as_str)
            .filter(move |label| !label.is_empty() && label.starts_with(prefix))
    }
}

/// Read one label per line, trimming whitespace.
///
/// Interior blank lines stay as empty placeholders so every later label keeps
/// its classifier index; trailing blank lines are dropped.
fn read_label_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let mut labels: Vec<String> =
                content.lines().map(|line| line.trim().to_string()).collect();
            while labels.last().is_some_and(|line| line.is_empty()) {
                labels.pop();
            }
            labels
        }
        Err(e) => {
            tracing::warn!("Error reading labels file {:?}: {}", path, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(path: &Path, lines: &[&str]) {
        let mut f = std::fs::File::create(path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
    }

    #[test]
    fn test_load_preserves_general_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::default();
        write_lines(
            &dir.path().join(&config.general_labels_file),
            &["1girl", "solo", "  long_hair  ", "smile"],
        );
        write_lines(
            &dir.path().join(&config.character_labels_file),
            &["hatsune_miku", "kagamine_rin"],
        );

        let vocab = LabelVocabulary::load(dir.path(), &config);
        assert_eq!(vocab.general(), &["1girl", "solo", "long_hair", "smile"]);
        assert_eq!(vocab.label(2), Some("long_hair"));
        assert!(vocab.is_character("hatsune_miku"));
        assert!(!vocab.is_character("solo"));
        assert_eq!(vocab.character_count(), 2);
    }

    #[test]
    fn test_blank_line_keeps_later_indices() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::default();
        write_lines(
            &dir.path().join(&config.general_labels_file),
            &["1girl", "", "smile", "", ""],
        );

        let vocab = LabelVocabulary::load(dir.path(), &config);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.label(0), Some("1girl"));
        assert_eq!(vocab.label(1), None);
        assert_eq!(vocab.label(2), Some("smile"));
        assert_eq!(vocab.complete("").collect::<Vec<_>>(), vec!["1girl", "smile"]);
    }

    #[test]
    fn test_missing_files_yield_empty_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = LabelVocabulary::load(dir.path(), &ModelConfig::default());
        assert!(vocab.is_empty());
        assert_eq!(vocab.character_count(), 0);
    }

    #[test]
    fn test_missing_character_file_keeps_general() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig::default();
        write_lines(&dir.path().join(&config.general_labels_file), &["a", "b"]);

        let vocab = LabelVocabulary::load(dir.path(), &config);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.character_count(), 0);
    }

    #[test]
    fn test_complete_prefix() {
        let vocab = LabelVocabulary::from_parts(["long_hair", "long_sleeves", "short_hair"], [
            "hatsune_miku",
        ]);
        let matches: Vec<&str> = vocab.complete("long").collect();
        assert_eq!(matches, vec!["long_hair", "long_sleeves"]);
    }
}
