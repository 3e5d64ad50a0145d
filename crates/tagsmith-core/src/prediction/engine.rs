//! Turning classifier probabilities into bucketed tags.
//!
//! For one probability vector:
//! 1. The last three scores are the ratings, the rest align with the general labels.
//! 2. General indices are visited in descending score order (ties keep label order).
//! 3. Every visited label lands in `all_tags`; the walk stops after the first
//!    score that is below both thresholds.
//! 4. Visited character labels above the character threshold go to
//!    `character_tags`, other labels above the general threshold go to
//!    `threshold_tags`. A label lands in at most one bucket.
//! 5. If both buckets are empty there is no result.

use indexmap::IndexMap;
use ndarray::Axis;

use crate::classifier::{stack_batch, Classifier, RATING_COUNT};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::NormalizedImage;
use crate::tagging::LabelVocabulary;
use crate::types::{PredictionResult, RatingScores, TagSource, Thresholds};

/// Partition one probability vector into a prediction result.
///
/// Returns `Ok(None)` when nothing passed either threshold. A vector whose
/// length does not match the vocabulary is a precondition violation.
pub fn partition(
    probabilities: &[f32],
    vocab: &LabelVocabulary,
    thresholds: Thresholds,
) -> PipelineResult<Option<PredictionResult>> {
    let expected = vocab.len() + RATING_COUNT;
    if probabilities.len() != expected {
        return Err(PipelineError::PreconditionViolation(format!(
            "classifier returned {} scores but the vocabulary needs {} ({} labels + {} ratings)",
            probabilities.len(),
            expected,
            vocab.len(),
            RATING_COUNT
        )));
    }

    let (general, ratings) = probabilities.split_at(vocab.len());
    let rating = RatingScores::from_slice([ratings[0], ratings[1], ratings[2]]);

    // NaN scores carry no ranking and are left out of the walk
    let mut order: Vec<usize> = (0..general.len())
        .filter(|&i| !general[i].is_nan())
        .collect();
    // sort_by is stable, so equal scores keep vocabulary order
    order.sort_by(|&a, &b| general[b].total_cmp(&general[a]));

    let mut all_tags = IndexMap::new();
    let mut threshold_tags = IndexMap::new();
    let mut character_tags = IndexMap::new();

    for index in order {
        let score = general[index];
        let Some(label) = vocab.label(index) else {
            continue;
        };
        all_tags.insert(label.to_string(), score);

        if score < thresholds.general && score < thresholds.character {
            break;
        }

        if vocab.is_character(label) {
            if score > thresholds.character {
                character_tags.insert(label.to_string(), TagSource::ModelDerived(score));
            }
        } else if score > thresholds.general {
            threshold_tags.insert(label.to_string(), TagSource::ModelDerived(score));
        }
    }

    if threshold_tags.is_empty() && character_tags.is_empty() {
        return Ok(None);
    }

    let text = all_tags
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Some(PredictionResult {
        threshold_tags,
        all_tags,
        rating,
        character_tags,
        text,
    }))
}

/// Classify a single preprocessed image and partition the result.
pub fn predict(
    classifier: &dyn Classifier,
    vocab: &LabelVocabulary,
    image: &NormalizedImage,
    thresholds: Thresholds,
) -> PipelineResult<Option<PredictionResult>> {
    check_input_size(classifier, image)?;

    let batch = image.view().insert_axis(Axis(0));
    let rows = classifier.classify(batch)?;
    let [row] = <[Vec<f32>; 1]>::try_from(rows).map_err(|rows| {
        PipelineError::PreconditionViolation(format!(
            "classifier returned {} rows for a single image",
            rows.len()
        ))
    })?;

    partition(&row, vocab, thresholds)
}

/// Classify several images in one stacked classifier call.
///
/// The returned vector is aligned with `images`.
pub fn predict_batch(
    classifier: &dyn Classifier,
    vocab: &LabelVocabulary,
    images: &[&NormalizedImage],
    thresholds: Thresholds,
) -> PipelineResult<Vec<Option<PredictionResult>>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }
    for image in images {
        check_input_size(classifier, image)?;
    }

    let batch = stack_batch(images)?;
    let rows = classifier.classify(batch.view())?;
    if rows.len() != images.len() {
        return Err(PipelineError::PreconditionViolation(format!(
            "classifier returned {} rows for a batch of {}",
            rows.len(),
            images.len()
        )));
    }

    rows.iter()
        .map(|row| partition(row, vocab, thresholds))
        .collect()
}

fn check_input_size(classifier: &dyn Classifier, image: &NormalizedImage) -> PipelineResult<()> {
    let (height, width) = classifier.input_size();
    if (image.height(), image.width()) != (height as usize, width as usize) {
        return Err(PipelineError::PreconditionViolation(format!(
            "image is {}x{} but the classifier expects {}x{}",
            image.width(),
            image.height(),
            width,
            height
        )));
    }
    Ok(())
}
