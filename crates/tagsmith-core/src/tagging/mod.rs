//! Label vocabulary and per-image tag curation.
//!
//! - **labels**: the general/character vocabularies shipped with a model
//! - **state**: which tags of an image are currently accepted
//! - **record**: a retained image with its prediction and state
//! - **histogram**: tag frequencies across a batch and tag-based filtering

pub mod histogram;
pub mod labels;
pub mod record;
pub mod state;

pub use histogram::{filter_records, TagFrequencyHistogram};
pub use labels::LabelVocabulary;
pub use record::ImageRecord;
pub use state::TagState;
