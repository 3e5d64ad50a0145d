//! The `tagsmith review` command: predict a folder, then curate tags image by image.
//!
//! The batch runs exactly as in `tagsmith predict`. Afterwards a menu loop lets
//! the user browse images, edit each image's accepted tags, filter the list by
//! tags from the frequency histogram, and write tags for the current image or
//! for a checked subset.

mod editor;
pub mod theme;

use clap::Args;
use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{MultiSelect, Select};
use tagsmith_core::{Config, ImageRecord, TagFrequencyHistogram};

use super::predict::batch::{print_summary, run_batch};
use super::predict::setup::{prepare, RunContext};
use super::predict::RunArgs;

/// Arguments for the `review` command.
#[derive(Args, Debug)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)` on
/// interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O failures.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

const MENU_ITEMS: &[&str] = &[
    "Browse images",
    "Filter by tags",
    "Clear filter",
    "Write checked images",
    "Exit",
];

/// Execute the review command.
pub async fn execute(args: ReviewArgs, config: Config) -> anyhow::Result<()> {
    let mut ctx = prepare(&args.run, config).await?;

    let stats = run_batch(&mut ctx, &args.run.dir).await?;
    print_summary(&stats);

    if ctx.session.is_empty() {
        tracing::warn!("No image in {:?} produced tags; nothing to review", args.run.dir);
        return Ok(());
    }

    theme::print_banner(ctx.session.len(), &args.run.dir);
    let theme = theme::review_theme();
    let mut filter = TagFilter::default();

    loop {
        let visible = filter.visible(ctx.session.records());
        print_status(&filter, visible.len(), ctx.session.len());

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(MENU_ITEMS)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => browse(&mut ctx, &visible, &theme)?,
            Some(1) => {
                if let Some(tags) = pick_filter_tags(ctx.session.histogram(), &filter, &theme)? {
                    filter = TagFilter::new(tags);
                }
            }
            Some(2) => filter = TagFilter::default(),
            Some(3) => write_checked(&ctx, &visible, &theme)?,
            Some(4) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// Tags every listed image must currently accept.
#[derive(Debug, Default)]
struct TagFilter {
    tags: Vec<String>,
}

impl TagFilter {
    fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    fn is_active(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Indices of the records passing the filter, recomputed from current edits.
    fn visible(&self, records: &[ImageRecord]) -> Vec<usize> {
        tagsmith_core::tagging::filter_records(records, &self.tags)
    }
}

fn print_status(filter: &TagFilter, visible: usize, total: usize) {
    let dim = Style::new().for_stderr().dim();
    if filter.is_active() {
        eprintln!(
            "  {}",
            dim.apply_to(format!(
                "{visible} of {total} image(s) tagged {}",
                filter.tags.join(" + ")
            ))
        );
    } else {
        eprintln!("  {}", dim.apply_to(format!("{total} image(s)")));
    }
}

/// Pick an image from the visible list and open it in the editor.
fn browse(ctx: &mut RunContext, visible: &[usize], theme: &ColorfulTheme) -> anyhow::Result<()> {
    if visible.is_empty() {
        let warn = Style::new().for_stderr().yellow();
        eprintln!("  {}", warn.apply_to("No images match the current filter."));
        return Ok(());
    }

    let mut cursor = 0;
    loop {
        let items: Vec<String> = visible
            .iter()
            .filter_map(|&i| ctx.session.record(i))
            .map(record_label)
            .collect();

        let Some(choice) = Select::with_theme(theme)
            .with_prompt("Image (Esc to go back)")
            .items(&items)
            .default(cursor)
            .max_length(15)
            .interact_opt()?
        else {
            return Ok(());
        };

        cursor = choice;
        editor::edit_image(ctx, visible[choice], theme)?;
    }
}

/// Choose histogram tags to filter on. `None` means the user backed out.
fn pick_filter_tags(
    histogram: &TagFrequencyHistogram,
    current: &TagFilter,
    theme: &ColorfulTheme,
) -> anyhow::Result<Option<Vec<String>>> {
    if histogram.is_empty() {
        eprintln!("  No tags to filter on.");
        return Ok(None);
    }

    let labels = histogram_labels(histogram);
    let defaults: Vec<bool> = histogram
        .entries()
        .iter()
        .map(|(tag, _)| current.tags.contains(tag))
        .collect();

    let chosen = MultiSelect::with_theme(theme)
        .with_prompt("Show images with all of")
        .items(&labels)
        .defaults(&defaults)
        .max_length(20)
        .interact_opt()?;

    Ok(chosen.map(|indices| {
        indices
            .into_iter()
            .filter_map(|i| histogram.entries().get(i))
            .map(|(tag, _)| tag.clone())
            .collect()
    }))
}

/// Write the committed tags of the images the user checks.
fn write_checked(ctx: &RunContext, visible: &[usize], theme: &ColorfulTheme) -> anyhow::Result<()> {
    if visible.is_empty() {
        eprintln!("  No images to write.");
        return Ok(());
    }

    let items: Vec<String> = visible
        .iter()
        .filter_map(|&i| ctx.session.record(i))
        .map(record_label)
        .collect();
    let defaults = vec![true; items.len()];

    let Some(chosen) = MultiSelect::with_theme(theme)
        .with_prompt("Write tags for")
        .items(&items)
        .defaults(&defaults)
        .max_length(15)
        .interact_opt()?
    else {
        return Ok(());
    };

    let indices: Vec<usize> = chosen.into_iter().map(|i| visible[i]).collect();
    let (written, failures) = ctx.session.write_records(&indices, ctx.writer.as_ref());

    let ok = Style::new().for_stderr().green();
    let err = Style::new().for_stderr().red();
    eprintln!("  {} Wrote tags to {written} image(s)", ok.apply_to("✓"));
    for (path, e) in &failures {
        eprintln!("  {} {}: {e}", err.apply_to("✗"), path.display());
    }
    Ok(())
}

fn record_label(record: &ImageRecord) -> String {
    format!(
        "{}  ({} tag(s))",
        record.file_name(),
        record.state.accepted().count()
    )
}

fn histogram_labels(histogram: &TagFrequencyHistogram) -> Vec<String> {
    histogram
        .entries()
        .iter()
        .map(|(tag, count)| format!("{tag} ({count})"))
        .collect()
}
