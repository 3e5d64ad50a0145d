//! Batch run with two progress bars, Ctrl-C cancellation and a summary table.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tagsmith_core::{BatchProgress, BatchStats, PipelineError, ProgressSnapshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::setup::RunContext;

/// Predict every image in `dir` and load the results into the session.
///
/// A cancelled run leaves the session's previous records untouched.
pub async fn run_batch(ctx: &mut RunContext, dir: &Path) -> anyhow::Result<BatchStats> {
    let progress = Arc::new(BatchProgress::new());
    let cancel = CancellationToken::new();

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping batch...");
                cancel.cancel();
            }
        })
    };

    let bars = BatchBars::new()?;
    let ticker = bars.spawn_ticker(progress.clone());

    let predictor = ctx.session.predictor(&ctx.config);
    let result = predictor
        .run(dir, ctx.thresholds, &progress, &cancel)
        .await;

    ticker.abort();
    interrupt.abort();
    bars.update(progress.snapshot());
    bars.finish();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(PipelineError::Cancelled) => anyhow::bail!("Batch cancelled; no tags were changed"),
        Err(PipelineError::EmptyVocabulary) => {
            anyhow::bail!("No labels loaded, so nothing was predicted; no tags were changed")
        }
        Err(e) => return Err(e.into()),
    };

    let stats = outcome.stats.clone();
    ctx.session.replace_batch(outcome);
    Ok(stats)
}

/// The preprocess and predict bars, fed from [`BatchProgress`] snapshots.
#[derive(Clone)]
struct BatchBars {
    _multi: MultiProgress,
    preprocess: ProgressBar,
    predict: ProgressBar,
}

impl BatchBars {
    fn new() -> anyhow::Result<Self> {
        let style = ProgressStyle::default_bar()
            .template(
                "{prefix:>10.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )?
            .progress_chars("##-");

        let multi = MultiProgress::new();
        let preprocess = multi.add(ProgressBar::new(0));
        preprocess.set_style(style.clone());
        preprocess.set_prefix("decode");
        let predict = multi.add(ProgressBar::new(0));
        predict.set_style(style);
        predict.set_prefix("predict");

        Ok(Self {
            _multi: multi,
            preprocess,
            predict,
        })
    }

    fn spawn_ticker(&self, progress: Arc<BatchProgress>) -> JoinHandle<()> {
        let bars = self.clone();
        tokio::spawn(async move {
            let started = std::time::Instant::now();
            let mut interval = tokio::time::interval(Duration::from_millis(100));
            loop {
                interval.tick().await;
                let snapshot = progress.snapshot();
                bars.update(snapshot);

                let elapsed = started.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    bars.predict
                        .set_message(format!("{:.1} img/sec", snapshot.predicted as f64 / elapsed));
                }
            }
        })
    }

    fn update(&self, snapshot: ProgressSnapshot) {
        let total = snapshot.total as u64;
        self.preprocess.set_length(total);
        self.preprocess.set_position(snapshot.preprocessed as u64);
        self.predict.set_length(total);
        self.predict.set_position(snapshot.predicted as u64);
    }

    fn finish(&self) {
        self.preprocess.finish_and_clear();
        self.predict.finish_and_clear();
    }
}

/// Lines of the summary table printed after a batch.
fn summary_lines(stats: &BatchStats) -> Vec<String> {
    let rate = if stats.total_seconds > 0.0 {
        stats.discovered as f64 / stats.total_seconds
    } else {
        0.0
    };

    let mut lines = vec![
        String::new(),
        "  ====================================".to_string(),
        "               Summary".to_string(),
        "  ====================================".to_string(),
        format!("    Tagged:       {:>8}", stats.retained),
    ];
    if stats.below_threshold > 0 {
        lines.push(format!("    No tags:      {:>8}", stats.below_threshold));
    }
    if stats.preprocess_failed > 0 {
        lines.push(format!("    Unreadable:   {:>8}", stats.preprocess_failed));
    }
    if stats.classify_failed > 0 {
        lines.push(format!("    Failed:       {:>8}", stats.classify_failed));
    }
    lines.extend([
        "  ------------------------------------".to_string(),
        format!("    Total:        {:>8}", stats.discovered),
        format!("    Duration:     {:>7.1}s", stats.total_seconds),
        format!("    Rate:         {:>7.1} img/sec", rate),
        "  ====================================".to_string(),
    ]);
    lines
}

/// Print a formatted summary table to stderr.
pub fn print_summary(stats: &BatchStats) {
    for line in summary_lines(stats) {
        eprintln!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_hides_zero_failure_rows() {
        let stats = BatchStats {
            discovered: 4,
            retained: 4,
            total_seconds: 2.0,
            ..Default::default()
        };
        let text = summary_lines(&stats).join("\n");

        assert!(text.contains("Tagged:              4"));
        assert!(text.contains("2.0 img/sec"));
        assert!(!text.contains("Unreadable"));
        assert!(!text.contains("No tags"));
    }

    #[test]
    fn summary_lists_failures() {
        let stats = BatchStats {
            discovered: 10,
            preprocess_failed: 2,
            classify_failed: 3,
            below_threshold: 1,
            retained: 4,
            total_seconds: 0.0,
        };
        let text = summary_lines(&stats).join("\n");

        assert!(text.contains("Unreadable:          2"));
        assert!(text.contains("Failed:              3"));
        assert!(text.contains("No tags:             1"));
        assert!(text.contains("Total:              10"));
        assert!(text.contains("0.0 img/sec"));
    }
}
