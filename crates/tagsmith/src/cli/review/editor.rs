//! Editing the tags of a single image.

use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select};
use tagsmith_core::{ImageRecord, LabelVocabulary, Rating};

use super::handle_interrupt;
use crate::cli::predict::setup::RunContext;

const IMAGE_MENU: &[&str] = &[
    "Toggle tags",
    "Add custom tag",
    "Select all",
    "Clear",
    "Save changes",
    "Write tags to image",
    "Show stored tags",
    "Back",
];

/// Most completions offered when a typed tag is not a known label.
const MAX_SUGGESTIONS: usize = 8;

/// Interactive editor for the record at `index`.
pub fn edit_image(
    ctx: &mut RunContext,
    index: usize,
    theme: &ColorfulTheme,
) -> anyhow::Result<()> {
    let ok = Style::new().for_stderr().green();
    let err = Style::new().for_stderr().red();

    loop {
        let Some(record) = ctx.session.record(index) else {
            return Ok(());
        };
        print_record(record);

        let selection = Select::with_theme(theme)
            .with_prompt(record.file_name())
            .items(IMAGE_MENU)
            .default(0)
            .interact_opt()?;

        match selection {
            Some(0) => toggle_tags(ctx, index, theme)?,
            Some(1) => add_custom_tag(ctx, index, theme)?,
            Some(2) => {
                if let Some(record) = ctx.session.record_mut(index) {
                    record.state.select_all();
                }
            }
            Some(3) => {
                if let Some(record) = ctx.session.record_mut(index) {
                    record.state.clear();
                }
            }
            Some(4) => {
                if let Some(record) = ctx.session.record_mut(index) {
                    let text = record.save_changes().to_string();
                    eprintln!("  {} {}", ok.apply_to("✓"), text);
                }
            }
            Some(5) => match ctx.session.write_record(index, ctx.writer.as_ref()) {
                Ok(()) => eprintln!("  {} Tags written", ok.apply_to("✓")),
                Err(e) => eprintln!("  {} {e}", err.apply_to("✗")),
            },
            Some(6) => {
                if let Some(record) = ctx.session.record(index) {
                    match ctx.writer.read(&record.path) {
                        Ok(Some(text)) => eprintln!("  {text}"),
                        Ok(None) => eprintln!("  (no stored tags)"),
                        Err(e) => eprintln!("  {} {e}", err.apply_to("✗")),
                    }
                }
            }
            Some(7) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

fn print_record(record: &ImageRecord) {
    let label = Style::new().for_stderr().bold();
    let dim = Style::new().for_stderr().dim();

    let scores: Vec<String> = record
        .result
        .rating
        .iter()
        .map(|(rating, score)| format!("{} {:.1}%", rating, score * 100.0))
        .collect();

    eprintln!();
    eprintln!("  {:<10} {}", label.apply_to("Image:"), record.path.display());
    eprintln!("  {:<10} {}", label.apply_to("Rating:"), scores.join(", "));
    eprintln!("  {:<10} {}", label.apply_to("Text:"), dim.apply_to(&record.text));
    eprintln!("  {:<10} {}", label.apply_to("Writes:"), record.state.commit());
    eprintln!();
}

/// Checkbox list over every tag of the record.
fn toggle_tags(ctx: &mut RunContext, index: usize, theme: &ColorfulTheme) -> anyhow::Result<()> {
    let Some(record) = ctx.session.record_mut(index) else {
        return Ok(());
    };

    let tags: Vec<(String, bool)> = record
        .state
        .iter()
        .map(|(tag, accepted)| (tag.to_string(), accepted))
        .collect();
    let labels: Vec<String> = tags.iter().map(|(tag, _)| tag_label(record, tag)).collect();
    let defaults: Vec<bool> = tags.iter().map(|&(_, accepted)| accepted).collect();

    let chosen = MultiSelect::with_theme(theme)
        .with_prompt("Accepted tags (space to toggle, enter to confirm)")
        .items(&labels)
        .defaults(&defaults)
        .interact_opt()?;

    if let Some(chosen) = chosen {
        for (i, (tag, _)) in tags.iter().enumerate() {
            record.state.set(tag, chosen.contains(&i));
        }
    }
    Ok(())
}

fn add_custom_tag(ctx: &mut RunContext, index: usize, theme: &ColorfulTheme) -> anyhow::Result<()> {
    let Some(typed) = handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt("Tag")
            .allow_empty(true)
            .interact_text(),
    )?
    else {
        return Ok(());
    };
    let typed = typed.trim().to_string();
    if typed.is_empty() {
        return Ok(());
    }

    let Some(tag) = resolve_tag(ctx.session.vocab(), &typed, theme)? else {
        return Ok(());
    };

    let kind = if ctx.session.vocab().is_character(&tag) {
        "character"
    } else {
        "general"
    };
    if ctx.session.add_custom_tag(index, &tag) {
        let ok = Style::new().for_stderr().green();
        eprintln!("  {} Added {kind} tag {tag}", ok.apply_to("✓"));
    }
    Ok(())
}

/// Offer known labels starting with `typed` when it is not a label itself.
fn resolve_tag(
    vocab: &LabelVocabulary,
    typed: &str,
    theme: &ColorfulTheme,
) -> anyhow::Result<Option<String>> {
    let suggestions = suggestions(vocab, typed);
    if suggestions.is_empty() {
        return Ok(Some(typed.to_string()));
    }

    let mut items = vec![format!("{typed} (as typed)")];
    items.extend(suggestions.iter().cloned());

    let choice = Select::with_theme(theme)
        .with_prompt("Known labels")
        .items(&items)
        .default(0)
        .interact_opt()?;

    Ok(match choice {
        Some(0) => Some(typed.to_string()),
        Some(i) => suggestions.get(i - 1).cloned(),
        None => None,
    })
}

/// Completions for a typed tag; empty when it already names a label.
fn suggestions(vocab: &LabelVocabulary, typed: &str) -> Vec<String> {
    let matches: Vec<&str> = vocab.complete(typed).collect();
    if matches.contains(&typed) {
        return Vec::new();
    }
    matches
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}

/// Display label for a tag: its name and where its score came from.
pub(crate) fn tag_label(record: &ImageRecord, tag: &str) -> String {
    let source = record
        .result
        .character_tags
        .get(tag)
        .or_else(|| record.result.threshold_tags.get(tag));

    match (source, Rating::from_tag_name(tag)) {
        (Some(source), _) => format!("{tag} ({source})"),
        (None, Some(rating)) => {
            format!("{tag} ({:.2}%)", record.result.rating.get(rating) * 100.0)
        }
        (None, None) => tag.to_string(),
    }
}
