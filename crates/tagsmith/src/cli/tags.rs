//! The `tagsmith read` and `tagsmith write` commands.

use clap::Args;
use std::path::PathBuf;
use tagsmith_core::config::WriterKind;
use tagsmith_core::{writer_for, Config};

use super::predict::WriterChoice;

/// Arguments for the `read` command.
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Image to read tags from
    pub image: PathBuf,

    /// Where tags are stored (defaults to `writer.kind` from the config)
    #[arg(long, value_enum)]
    pub writer: Option<WriterChoice>,
}

/// Arguments for the `write` command.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Image to store tags in
    pub image: PathBuf,

    /// Tag string, stored verbatim (e.g. "rating:safe, cat, sitting")
    pub text: String,

    /// Where tags are stored (defaults to `writer.kind` from the config)
    #[arg(long, value_enum)]
    pub writer: Option<WriterChoice>,
}

fn writer_kind(choice: Option<WriterChoice>, config: &Config) -> WriterKind {
    choice.map(WriterKind::from).unwrap_or(config.writer.kind)
}

/// Print the stored tag string, if any.
pub fn read(args: ReadArgs, config: &Config) -> anyhow::Result<()> {
    let writer = writer_for(writer_kind(args.writer, config));
    match writer.read(&args.image)? {
        Some(text) => println!("{text}"),
        None => eprintln!("No tags stored for {}", args.image.display()),
    }
    Ok(())
}

/// Store a tag string.
pub fn write(args: WriteArgs, config: &Config) -> anyhow::Result<()> {
    let writer = writer_for(writer_kind(args.writer, config));
    writer.write(&args.image, &args.text)?;
    tracing::info!("Tags written to {:?}", args.image);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn flag_overrides_config_writer() {
        let config = Config::default();
        assert_eq!(writer_kind(None, &config), config.writer.kind);
        assert_eq!(
            writer_kind(Some(WriterChoice::Sidecar), &config),
            WriterKind::Sidecar
        );
    }

    #[test]
    fn write_then_read_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cat.png");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&image).unwrap();

        let config = Config::default();
        write(
            WriteArgs {
                image: image.clone(),
                text: "rating:safe, cat".to_string(),
                writer: Some(WriterChoice::Sidecar),
            },
            &config,
        )
        .unwrap();

        let stored = writer_for(WriterKind::Sidecar).read(&image).unwrap();
        assert_eq!(stored.as_deref(), Some("rating:safe, cat"));
    }

    #[test]
    fn write_to_missing_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = write(
            WriteArgs {
                image: dir.path().join("missing.png"),
                text: "cat".to_string(),
                writer: Some(WriterChoice::Sidecar),
            },
            &Config::default(),
        );
        assert!(result.is_err());
    }
}
