//! Tag strings in the EXIF `ImageDescription` field.
//!
//! JPEG files carry EXIF in an APP1 segment, PNG files in an `eXIf` chunk.
//! Writing rebuilds the EXIF block with the new description and the other
//! primary-image fields that can be re-encoded, then splices it into the
//! container without touching the compressed image data.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use ::exif::experimental::Writer;
use ::exif::{Exif, Field, In, Reader, Tag, Value};

use crate::error::PipelineError;

use super::{replace_file, TagWriter};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_APP0: u8 = 0xE0;
const JPEG_APP1: u8 = 0xE1;
const JPEG_SOS: u8 = 0xDA;
const JPEG_EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Fields the EXIF writer derives from the file layout itself.
const LAYOUT_TAGS: [Tag; 10] = [
    Tag::ImageDescription,
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// Stores tags in the EXIF `ImageDescription` of JPEG and PNG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifTagWriter;

impl ExifTagWriter {
    pub fn new() -> Self {
        Self
    }
}

impl TagWriter for ExifTagWriter {
    fn write(&self, path: &Path, text: &str) -> Result<(), PipelineError> {
        let data = std::fs::read(path).map_err(|e| metadata_error(path, e))?;
        let existing = Reader::new()
            .read_from_container(&mut Cursor::new(&data))
            .ok();
        let tiff = encode_exif(existing.as_ref(), text).map_err(|e| metadata_error(path, e))?;

        let updated = if data.starts_with(&JPEG_SOI) {
            splice_jpeg(&data, &tiff)
        } else if data.starts_with(&PNG_SIGNATURE) {
            splice_png(&data, &tiff)
        } else {
            return Err(PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }
        .map_err(|message| PipelineError::Metadata {
            path: path.to_path_buf(),
            message,
        })?;

        replace_file(path, &updated)?;
        tracing::debug!("Wrote {} bytes of tags to {:?}", text.len(), path);
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Option<String>, PipelineError> {
        let file = File::open(path).map_err(|e| metadata_error(path, e))?;
        let exif = match Reader::new().read_from_container(&mut BufReader::new(file)) {
            Ok(exif) => exif,
            Err(::exif::Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(metadata_error(path, e)),
        };

        Ok(exif
            .get_field(Tag::ImageDescription, In::PRIMARY)
            .and_then(|field| match &field.value {
                Value::Ascii(parts) => parts
                    .first()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            }))
    }
}

fn metadata_error(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Metadata {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Encode a TIFF-structured EXIF block holding `text` as the description.
fn encode_exif(existing: Option<&Exif>, text: &str) -> Result<Vec<u8>, ::exif::Error> {
    let description = Field {
        tag: Tag::ImageDescription,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    };

    let mut writer = Writer::new();
    if let Some(exif) = existing {
        for field in exif.fields().filter(|f| is_reencodable(f)) {
            writer.push_field(field);
        }
    }
    writer.push_field(&description);

    let little_endian = existing.map(Exif::little_endian).unwrap_or(false);
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, little_endian)?;
    Ok(buf.into_inner())
}

fn is_reencodable(field: &Field) -> bool {
    field.ifd_num == In::PRIMARY
        && !LAYOUT_TAGS.contains(&field.tag)
        && !matches!(field.value, Value::Unknown(..))
}

/// Replace (or add) the EXIF APP1 segment of a JPEG file.
///
/// The new segment goes where the old one was, or right after the JFIF APP0
/// segment when there was none.
fn splice_jpeg(data: &[u8], tiff: &[u8]) -> Result<Vec<u8>, String> {
    let segment_len = 2 + EXIF_HEADER.len() + tiff.len();
    let segment_len = u16::try_from(segment_len)
        .map_err(|_| format!("EXIF block of {segment_len} bytes does not fit one APP1 segment"))?;

    let mut app1 = Vec::with_capacity(usize::from(segment_len) + 2);
    app1.extend_from_slice(&[0xFF, JPEG_APP1]);
    app1.extend_from_slice(&segment_len.to_be_bytes());
    app1.extend_from_slice(EXIF_HEADER);
    app1.extend_from_slice(tiff);

    let mut out = Vec::with_capacity(data.len() + app1.len());
    out.extend_from_slice(&JPEG_SOI);
    let mut pos = JPEG_SOI.len();
    let mut inserted = false;

    loop {
        if pos + 2 > data.len() {
            return Err("truncated JPEG: no image data found".to_string());
        }
        if data[pos] != 0xFF {
            return Err(format!("corrupt JPEG: expected a marker at byte {pos}"));
        }
        let marker = data[pos + 1];
        match marker {
            0xFF => {
                // fill byte
                pos += 1;
                continue;
            }
            JPEG_SOS | JPEG_EOI => {
                if !inserted {
                    out.extend_from_slice(&app1);
                }
                out.extend_from_slice(&data[pos..]);
                return Ok(out);
            }
            0x01 | 0xD0..=0xD7 => {
                out.extend_from_slice(&data[pos..pos + 2]);
                pos += 2;
                continue;
            }
            _ => {}
        }

        if pos + 4 > data.len() {
            return Err("truncated JPEG segment header".to_string());
        }
        let len = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        let end = pos + 2 + len;
        if len < 2 || end > data.len() {
            return Err(format!("corrupt JPEG segment at byte {pos}"));
        }
        let segment = &data[pos..end];
        let is_exif = marker == JPEG_APP1 && segment[4..].starts_with(EXIF_HEADER);

        if is_exif {
            if !inserted {
                out.extend_from_slice(&app1);
                inserted = true;
            }
        } else {
            if !inserted && marker != JPEG_APP0 {
                out.extend_from_slice(&app1);
                inserted = true;
            }
            out.extend_from_slice(segment);
        }
        pos = end;
    }
}

/// Replace (or add) the `eXIf` chunk of a PNG file, ahead of the image data.
fn splice_png(data: &[u8], tiff: &[u8]) -> Result<Vec<u8>, String> {
    let chunk = png_chunk(b"eXIf", tiff)?;
    let mut out = Vec::with_capacity(data.len() + chunk.len());
    out.extend_from_slice(&PNG_SIGNATURE);
    let mut pos = PNG_SIGNATURE.len();
    let mut inserted = false;

    while pos < data.len() {
        if pos + 12 > data.len() {
            return Err(format!("truncated PNG chunk at byte {pos}"));
        }
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        let kind = &data[pos + 4..pos + 8];
        let end = pos + 12 + len as usize;
        if end > data.len() {
            return Err(format!("truncated PNG chunk at byte {pos}"));
        }

        match kind {
            b"eXIf" => {
                if !inserted {
                    out.extend_from_slice(&chunk);
                    inserted = true;
                }
            }
            b"IDAT" | b"IEND" => {
                if !inserted {
                    out.extend_from_slice(&chunk);
                    inserted = true;
                }
                out.extend_from_slice(&data[pos..end]);
            }
            _ => out.extend_from_slice(&data[pos..end]),
        }
        pos = end;
    }

    if !inserted {
        return Err("PNG has no image data".to_string());
    }
    Ok(out)
}

fn png_chunk(kind: &[u8; 4], body: &[u8]) -> Result<Vec<u8>, String> {
    let len = u32::try_from(body.len()).map_err(|_| "EXIF block too large".to_string())?;
    let mut chunk = Vec::with_capacity(body.len() + 12);
    chunk.extend_from_slice(&len.to_be_bytes());
    chunk.extend_from_slice(kind);
    chunk.extend_from_slice(body);
    chunk.extend_from_slice(&crc32(&[kind, body]).to_be_bytes());
    Ok(chunk)
}

/// CRC-32 (IEEE) over the concatenation of `parts`, as PNG chunks use.
fn crc32(parts: &[&[u8]]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::path::PathBuf;

    fn sample(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_fn(16, 8, |x, y| Rgb([(x * 16) as u8, (y * 32) as u8, 128]))
            .save(&path)
            .unwrap();
        path
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn test_crc32_known_value() {
        // CRC of an empty IEND chunk
        assert_eq!(crc32(&[b"IEND", b""]), 0xAE42_6082);
    }

    #[test]
    fn test_jpeg_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(dir.path(), "a.jpg");
        let writer = ExifTagWriter::new();

        assert_eq!(writer.read(&path).unwrap(), None);
        writer
            .write(&path, "hatsune_miku, rating:safe, long_hair")
            .unwrap();
        assert_eq!(
            writer.read(&path).unwrap().as_deref(),
            Some("hatsune_miku, rating:safe, long_hair")
        );

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(dir.path(), "a.png");
        let writer = ExifTagWriter::new();

        writer.write(&path, "smile, rating:questionable").unwrap();
        assert_eq!(
            writer.read(&path).unwrap().as_deref(),
            Some("smile, rating:questionable")
        );
        let decoded = image::load_from_memory_with_format(
            &std::fs::read(&path).unwrap(),
            ImageFormat::Png,
        )
        .unwrap();
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn test_rewrite_replaces_previous_tags() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "a.png"] {
            let path = sample(dir.path(), name);
            let writer = ExifTagWriter::new();
            writer.write(&path, "first").unwrap();
            writer.write(&path, "second, third").unwrap();

            assert_eq!(
                writer.read(&path).unwrap().as_deref(),
                Some("second, third")
            );
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(count(&bytes, b"first"), 0, "{name}");
        }
    }

    #[test]
    fn test_write_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(dir.path(), "camera.jpg");

        // Give the file an existing EXIF block with a camera make
        let make = Field {
            tag: Tag::Make,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"Tagsmith Camera".to_vec()]),
        };
        let mut exif_writer = Writer::new();
        exif_writer.push_field(&make);
        let mut tiff = Cursor::new(Vec::new());
        exif_writer.write(&mut tiff, false).unwrap();
        let original = std::fs::read(&path).unwrap();
        std::fs::write(&path, splice_jpeg(&original, &tiff.into_inner()).unwrap()).unwrap();

        ExifTagWriter::new().write(&path, "smile").unwrap();

        let file = File::open(&path).unwrap();
        let exif = Reader::new()
            .read_from_container(&mut BufReader::new(file))
            .unwrap();
        let make = exif.get_field(Tag::Make, In::PRIMARY).unwrap();
        assert!(make.display_value().to_string().contains("Tagsmith Camera"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(count(&bytes, EXIF_HEADER), 1);
    }

    #[test]
    fn test_unsupported_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(dir.path(), "a.bmp");
        let err = ExifTagWriter::new().write(&path, "smile").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_splice_jpeg_rejects_garbage() {
        assert!(splice_jpeg(&[0xFF, 0xD8, 0x00, 0x00], b"MM").is_err());
    }
}
