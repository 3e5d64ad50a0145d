//! Image preprocessing for DeepDanbooru-style classifiers.
//!
//! The classifier expects:
//! - RGB, exactly three channels
//! - the whole image fitted inside `H×W` with its aspect ratio preserved,
//!   downsampled with an area (box-coverage) filter
//! - the remaining border filled by replicating the edge pixels, image centered
//! - values scaled to [0, 1]
//! - layout HWC, stacked into NHWC batches

use std::path::Path;

use image::DynamicImage;
use ndarray::{Array3, ArrayView3};

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::decode::ImageDecoder;
use super::validate::Validator;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// A preprocessed `H×W×3` image with values in `[0, 1]`.
///
/// The only way to obtain one is through validation, so the classifier never
/// sees raw 0–255 pixels or a wrong channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    data: Array3<f32>,
}

impl NormalizedImage {
    /// Wrap an HWC tensor, checking channel count and value range.
    pub fn new(data: Array3<f32>) -> Result<Self, PipelineError> {
        let (height, width, channels) = data.dim();
        if channels != CHANNELS {
            return Err(PipelineError::InvalidImageFormat { channels });
        }
        if height == 0 || width == 0 {
            return Err(PipelineError::PreconditionViolation(
                "image has zero width or height".to_string(),
            ));
        }
        if data.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(PipelineError::PreconditionViolation(
                "pixel values must lie in [0, 1]; preprocess the image first".to_string(),
            ));
        }
        Ok(Self { data })
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}

/// Turn a decoded image into classifier input of size `target = (height, width)`.
pub fn preprocess(
    image: &DynamicImage,
    target: (u32, u32),
) -> Result<NormalizedImage, PipelineError> {
    let rgb = image.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    if width == 0 || height == 0 {
        return Err(PipelineError::PreconditionViolation(
            "image has zero width or height".to_string(),
        ));
    }

    let raw = rgb.as_raw();
    let pixels = Array3::from_shape_fn((height, width, CHANNELS), |(y, x, c)| {
        f32::from(raw[(y * width + x) * CHANNELS + c])
    });

    let (target_h, target_w) = (target.0 as usize, target.1 as usize);
    let (fit_h, fit_w) = fitted_size(height, width, target_h, target_w);
    let resized = resize_area(&pixels, fit_h, fit_w);
    let padded = pad_edge(&resized, target_h, target_w);

    NormalizedImage::new(padded.mapv(|v| (v / 255.0).clamp(0.0, 1.0)))
}

/// Largest size with the source aspect ratio that fits inside the target.
fn fitted_size(height: usize, width: usize, target_h: usize, target_w: usize) -> (usize, usize) {
    let scale = (target_h as f64 / height as f64).min(target_w as f64 / width as f64);
    let fit = |len: usize, max: usize| ((len as f64 * scale).round() as usize).clamp(1, max);
    (fit(height, target_h), fit(width, target_w))
}

/// Per-output-index source coverage weights for a 1-D area resample.
fn area_weights(src: usize, dst: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|o| {
            let start = o as f64 * scale;
            let end = start + scale;
            let mut weights = Vec::new();
            let mut i = start.floor() as usize;
            while (i as f64) < end && i < src {
                let covered = end.min((i + 1) as f64) - start.max(i as f64);
                if covered > 0.0 {
                    weights.push((i, covered as f32));
                }
                i += 1;
            }
            let total: f32 = weights.iter().map(|(_, w)| w).sum();
            for (_, w) in &mut weights {
                *w /= total;
            }
            weights
        })
        .collect()
}

/// Separable area resample of an HWC tensor.
fn resize_area(src: &Array3<f32>, out_h: usize, out_w: usize) -> Array3<f32> {
    let (in_h, in_w, channels) = src.dim();
    if (in_h, in_w) == (out_h, out_w) {
        return src.clone();
    }

    let col_weights = area_weights(in_w, out_w);
    let horizontal = Array3::from_shape_fn((in_h, out_w, channels), |(y, x, c)| {
        col_weights[x]
            .iter()
            .map(|&(sx, w)| src[[y, sx, c]] * w)
            .sum::<f32>()
    });

    let row_weights = area_weights(in_h, out_h);
    Array3::from_shape_fn((out_h, out_w, channels), |(y, x, c)| {
        row_weights[y]
            .iter()
            .map(|&(sy, w)| horizontal[[sy, x, c]] * w)
            .sum::<f32>()
    })
}

/// Center `src` in a `target_h×target_w` canvas, filling the border with edge pixels.
fn pad_edge(src: &Array3<f32>, target_h: usize, target_w: usize) -> Array3<f32> {
    let (h, w, channels) = src.dim();
    if (h, w) == (target_h, target_w) {
        return src.clone();
    }
    let off_y = (target_h.saturating_sub(h) / 2) as isize;
    let off_x = (target_w.saturating_sub(w) / 2) as isize;
    Array3::from_shape_fn((target_h, target_w, channels), |(y, x, c)| {
        let sy = (y as isize - off_y).clamp(0, h as isize - 1) as usize;
        let sx = (x as isize - off_x).clamp(0, w as isize - 1) as usize;
        src[[sy, sx, c]]
    })
}

/// Validate, decode and preprocess image files for one classifier input size.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    validator: Validator,
    decoder: ImageDecoder,
    target: (u32, u32),
}

impl ImagePreprocessor {
    pub fn new(limits: LimitsConfig, target: (u32, u32)) -> Self {
        Self {
            validator: Validator::new(limits.clone()),
            decoder: ImageDecoder::new(limits),
            target,
        }
    }

    /// Classifier input size as `(height, width)`.
    pub fn target(&self) -> (u32, u32) {
        self.target
    }

    /// Load one file and turn it into classifier input.
    pub async fn load(&self, path: &Path) -> Result<NormalizedImage, PipelineError> {
        self.validator.validate(path)?;
        let decoded = self.decoder.decode_file(path).await?;

        let target = self.target;
        tokio::task::spawn_blocking(move || preprocess(&decoded.image, target))
            .await
            .map_err(|e| PipelineError::ImageDecode {
                path: path.to_path_buf(),
                message: format!("Task join error: {}", e),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};

    #[test]
    fn test_preprocess_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let out = preprocess(&img, (512, 512)).unwrap();
        assert_eq!((out.height(), out.width()), (512, 512));
        assert_eq!(out.view().dim().2, 3);
    }

    #[test]
    fn test_preprocess_white_is_one() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 10, Rgb([255, 255, 255])));
        let out = preprocess(&img, (16, 16)).unwrap();
        assert!(out.view().iter().all(|&v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_preprocess_forces_rgb() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([51])));
        let out = preprocess(&gray, (8, 8)).unwrap();
        assert!(out.view().iter().all(|&v| (v - 0.2).abs() < 1e-5));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        assert!(preprocess(&rgba, (4, 4)).is_ok());
    }

    #[test]
    fn test_area_downsample_averages() {
        // 2x2 checkerboard of 0 and 255 becomes a single mid-gray pixel
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        img.put_pixel(1, 1, Rgb([255, 255, 255]));
        let out = preprocess(&DynamicImage::ImageRgb8(img), (1, 1)).unwrap();
        assert!((out.view()[[0, 0, 0]] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_wide_image_is_centered_with_edge_padding() {
        // 8 wide, 4 tall: top half red, bottom half blue
        let mut img = RgbImage::new(8, 4);
        for (_, y, px) in img.enumerate_pixels_mut() {
            *px = if y < 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) };
        }
        let out = preprocess(&DynamicImage::ImageRgb8(img), (8, 8)).unwrap();
        let view = out.view();

        // Fitted to 8x4 and offset by 2 rows; border rows copy the edges
        assert_eq!(view[[0, 3, 0]], 1.0);
        assert_eq!(view[[0, 3, 2]], 0.0);
        assert_eq!(view[[7, 3, 0]], 0.0);
        assert_eq!(view[[7, 3, 2]], 1.0);
    }

    #[test]
    fn test_fitted_size_preserves_aspect() {
        assert_eq!(fitted_size(480, 640, 512, 512), (384, 512));
        assert_eq!(fitted_size(100, 100, 512, 512), (512, 512));
        assert_eq!(fitted_size(1, 10000, 512, 512), (1, 512));
    }

    #[test]
    fn test_area_weights_sum_to_one() {
        for (src, dst) in [(10, 3), (3, 10), (7, 7), (640, 512)] {
            for weights in area_weights(src, dst) {
                let total: f32 = weights.iter().map(|(_, w)| w).sum();
                assert!((total - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_normalized_image_rejects_wrong_channels() {
        let err = NormalizedImage::new(Array3::zeros((4, 4, 4))).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImageFormat { channels: 4 }));
    }

    #[test]
    fn test_normalized_image_rejects_raw_pixels() {
        let err = NormalizedImage::new(Array3::from_elem((4, 4, 3), 255.0)).unwrap_err();
        assert!(matches!(err, PipelineError::PreconditionViolation(_)));
    }

    #[tokio::test]
    async fn test_image_preprocessor_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbImage::from_pixel(20, 10, Rgb([0, 0, 0])).save(&path).unwrap();

        let preprocessor = ImagePreprocessor::new(LimitsConfig::default(), (32, 32));
        let out = preprocessor.load(&path).await.unwrap();
        assert_eq!((out.height(), out.width()), (32, 32));
    }

    #[tokio::test]
    async fn test_image_preprocessor_skips_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not jpeg").unwrap();

        let preprocessor = ImagePreprocessor::new(LimitsConfig::default(), (32, 32));
        let err = preprocessor.load(&path).await.unwrap_err();
        assert!(!err.is_programmer_error());
    }
}
