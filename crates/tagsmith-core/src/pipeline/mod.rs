//! Image loading pipeline components.
//!
//! - **discovery**: Find image files in a flat target folder
//! - **validate**: Size and magic-byte checks before decoding
//! - **decode**: Load and decode images off the async runtime, with a timeout
//! - **preprocess**: Fit, pad and normalize images into classifier input

pub mod decode;
pub mod discovery;
pub mod preprocess;
pub mod validate;

pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use preprocess::{preprocess, ImagePreprocessor, NormalizedImage};
pub use validate::Validator;
