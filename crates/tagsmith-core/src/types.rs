//! Core data types for the Tagsmith prediction pipeline.
//!
//! These types represent the output of running a classifier over an image and
//! the knobs that decide which predicted labels are accepted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three fixed content ratings.
///
/// The classifier emits rating scores as the last three values of its output
/// vector, always in this order. Rating names are not read from the label file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Safe,
    Questionable,
    Explicit,
}

impl Rating {
    /// All ratings in classifier output order.
    pub const ALL: [Rating; 3] = [Rating::Safe, Rating::Questionable, Rating::Explicit];

    /// Tag name written into metadata (e.g. `rating:safe`).
    pub fn tag_name(self) -> &'static str {
        match self {
            Rating::Safe => "rating:safe",
            Rating::Questionable => "rating:questionable",
            Rating::Explicit => "rating:explicit",
        }
    }

    /// Parse a rating from its tag name.
    pub fn from_tag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.tag_name() == name)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Rating probabilities for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScores {
    pub safe: f32,
    pub questionable: f32,
    pub explicit: f32,
}

impl RatingScores {
    /// Build from the trailing three classifier outputs.
    pub fn from_slice(scores: [f32; 3]) -> Self {
        Self {
            safe: scores[0],
            questionable: scores[1],
            explicit: scores[2],
        }
    }

    /// Score for a single rating.
    pub fn get(&self, rating: Rating) -> f32 {
        match rating {
            Rating::Safe => self.safe,
            Rating::Questionable => self.questionable,
            Rating::Explicit => self.explicit,
        }
    }

    /// Ratings paired with their scores, in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (Rating, f32)> + '_ {
        Rating::ALL.into_iter().map(move |r| (r, self.get(r)))
    }

    /// The highest-scoring rating. Ties go to the earlier rating.
    pub fn argmax(&self) -> Rating {
        let mut best = Rating::Safe;
        for rating in Rating::ALL {
            if self.get(rating) > self.get(best) {
                best = rating;
            }
        }
        best
    }
}

/// Where a bucketed tag came from.
///
/// User-added tags carry no score, so they can never be mistaken for model output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    ModelDerived(f32),
    UserAdded,
}

impl TagSource {
    /// Classifier score, if the tag came from the model.
    pub fn score(&self) -> Option<f32> {
        match self {
            TagSource::ModelDerived(score) => Some(*score),
            TagSource::UserAdded => None,
        }
    }

    pub fn is_user_added(&self) -> bool {
        matches!(self, TagSource::UserAdded)
    }
}

impl fmt::Display for TagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSource::ModelDerived(score) => write!(f, "{:.2}%", score * 100.0),
            TagSource::UserAdded => f.write_str("user"),
        }
    }
}

/// A threshold expressed as an integer percentage in `1..=100`.
///
/// Zero is rejected: a 0% cutoff would accept every label in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ThresholdPercent(u8);

impl ThresholdPercent {
    pub fn new(percent: u8) -> Result<Self, String> {
        if (1..=100).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(format!("threshold must be between 1 and 100, got {percent}"))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Probability cutoff in `[0.01, 1.0]`.
    pub fn probability(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl TryFrom<u8> for ThresholdPercent {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ThresholdPercent> for u8 {
    fn from(value: ThresholdPercent) -> Self {
        value.0
    }
}

/// Probability cutoffs for the general and character buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub general: f32,
    pub character: f32,
}

impl Thresholds {
    pub fn new(general: f32, character: f32) -> Self {
        Self { general, character }
    }

    pub fn from_percent(general: ThresholdPercent, character: ThresholdPercent) -> Self {
        Self {
            general: general.probability(),
            character: character.probability(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            general: 0.5,
            character: 0.85,
        }
    }
}

/// Partitioned classifier output for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// General labels above the general threshold (never character labels)
    pub threshold_tags: IndexMap<String, TagSource>,

    /// Every label visited by the descending walk, highest score first
    pub all_tags: IndexMap<String, f32>,

    /// Rating probabilities
    pub rating: RatingScores,

    /// Character labels above the character threshold
    pub character_tags: IndexMap<String, TagSource>,

    /// `all_tags` keys joined with ", " (display summary)
    pub text: String,
}

impl PredictionResult {
    /// Tags accepted by default: character, then argmax rating, then general.
    pub fn default_accepted(&self) -> impl Iterator<Item = &str> + '_ {
        self.character_tags
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(self.rating.argmax().tag_name()))
            .chain(self.threshold_tags.keys().map(String::as_str))
    }
}

/// Counters for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchStats {
    /// Files found in the target directory
    pub discovered: usize,

    /// Files that could not be read or decoded
    pub preprocess_failed: usize,

    /// Images lost to a failed classifier call
    pub classify_failed: usize,

    /// Images where nothing passed either threshold
    pub below_threshold: usize,

    /// Images kept in the result list
    pub retained: usize,

    /// Wall-clock duration of the run in seconds
    pub total_seconds: f64,
}
