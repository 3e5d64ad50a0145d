//! The `tagsmith predict` command: batch prediction, export, optional write.

pub(crate) mod batch;
pub(crate) mod setup;
pub mod types;

pub use types::{OutputFormat, WriterChoice};

use clap::builder::RangedU64ValueParser;
use clap::Args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tagsmith_core::{Config, OutputFormat as CoreOutputFormat, OutputWriter};

use setup::RunContext;

/// Options shared by every command that runs a batch.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Folder of images to tag (subfolders are ignored)
    #[arg(required = true)]
    pub dir: PathBuf,

    /// Model directory (weights plus tags.txt / tags-character.txt)
    #[arg(short, long)]
    pub model: Option<String>,

    /// General-tag threshold in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub general: Option<u8>,

    /// Character-tag threshold in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub character: Option<u8>,

    /// Number of images decoded in parallel
    #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub parallel: Option<usize>,

    /// Images per classifier call
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub batch_size: Option<usize>,

    /// Where tags are written
    #[arg(long, value_enum)]
    pub writer: Option<WriterChoice>,
}

/// Arguments for the `predict` command.
#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `output.format` from the config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write every image's default-accepted tags with the configured writer
    #[arg(long)]
    pub write: bool,
}

/// Execute the predict command.
pub async fn execute(args: PredictArgs, config: Config) -> anyhow::Result<()> {
    let mut ctx = setup::prepare(&args.run, config).await?;

    let stats = batch::run_batch(&mut ctx, &args.run.dir).await?;
    batch::print_summary(&stats);

    if ctx.session.is_empty() {
        tracing::warn!("No image in {:?} produced tags", args.run.dir);
        return Ok(());
    }

    export(&ctx, &args)?;

    if args.write {
        write_all(&ctx)?;
    }

    Ok(())
}

/// Export every record to the output file, or stdout.
fn export(ctx: &RunContext, args: &PredictArgs) -> anyhow::Result<()> {
    let format = args
        .format
        .map(CoreOutputFormat::from)
        .or_else(|| CoreOutputFormat::parse(&ctx.config.output.format))
        .unwrap_or(CoreOutputFormat::Json);
    let pretty = ctx.config.output.pretty;

    match args.output {
        Some(ref output_path) => {
            let file = File::create(output_path)?;
            let mut writer = OutputWriter::new(BufWriter::new(file), format, pretty);
            writer.write_records(ctx.session.records())?;
            writer.flush()?;
            tracing::info!(
                "{} record(s) written to {:?}",
                writer.items_written(),
                output_path
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = OutputWriter::new(stdout.lock(), format, pretty);
            writer.write_records(ctx.session.records())?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Persist the committed tags of every record.
fn write_all(ctx: &RunContext) -> anyhow::Result<()> {
    let indices: Vec<usize> = (0..ctx.session.len()).collect();
    let (written, failures) = ctx.session.write_records(&indices, ctx.writer.as_ref());

    let mut stderr = std::io::stderr();
    writeln!(stderr, "  Wrote tags to {written} image(s)")?;
    if !failures.is_empty() {
        for (path, error) in &failures {
            writeln!(stderr, "  Failed: {} - {error}", path.display())?;
        }
        anyhow::bail!("{} image(s) could not be written", failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_default_has_no_overrides() {
        let args = RunArgs::default();
        assert_eq!(args.dir, PathBuf::new());
        assert!(args.model.is_none());
        assert!(args.general.is_none());
        assert!(args.character.is_none());
        assert!(args.parallel.is_none());
        assert!(args.batch_size.is_none());
        assert!(args.writer.is_none());
    }

    #[test]
    fn output_format_maps_to_core() {
        assert_eq!(
            CoreOutputFormat::from(OutputFormat::Json),
            CoreOutputFormat::Json
        );
        assert_eq!(
            CoreOutputFormat::from(OutputFormat::Jsonl),
            CoreOutputFormat::JsonLines
        );
    }
}
