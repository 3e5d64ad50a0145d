//! Dialoguer theme and banner for the review session.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// Returns a `ColorfulTheme` with Tagsmith's prompt glyphs.
///
/// All styles target stderr so stdout stays free for piped output.
pub fn review_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().magenta(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().magenta(),
        active_item_style: Style::new().for_stderr().magenta(),
        checked_item_prefix: style("[x]".to_string()).for_stderr().green(),
        unchecked_item_prefix: style("[ ]".to_string()).for_stderr().dim(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Prints the review banner to stderr.
pub fn print_banner(images: usize, folder: &std::path::Path) {
    let version_line = format!("Tagsmith v{}", tagsmith_core::VERSION);
    let tagline = format!("Reviewing {images} tagged image(s)");
    let folder_line = folder.display().to_string();

    let inner_width = [version_line.len(), tagline.len(), folder_line.len()]
        .into_iter()
        .max()
        .unwrap_or(0)
        + 4;

    let magenta = Style::new().for_stderr().magenta();
    let dim = Style::new().for_stderr().dim();

    eprintln!();
    eprintln!(
        "{}",
        magenta.apply_to(format!("  ╔{:═<width$}╗", "", width = inner_width))
    );
    eprintln!(
        "{}",
        magenta.apply_to(format!("  ║{:^width$}║", version_line, width = inner_width))
    );
    eprintln!(
        "{}",
        magenta.apply_to(format!("  ║{:^width$}║", tagline, width = inner_width))
    );
    eprintln!(
        "{}",
        magenta.apply_to(format!("  ╚{:═<width$}╝", "", width = inner_width))
    );
    eprintln!("  {}", dim.apply_to(folder_line));
    eprintln!();
}
