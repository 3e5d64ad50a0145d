//! Run setup: config overrides, model loading, writer selection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tagsmith_core::{
    writer_for, Config, LabelVocabulary, ModelLoader, PipelineError, Session, TagWriter,
    Thresholds,
};

use super::RunArgs;

/// Everything a batch run and the commands after it need.
pub(crate) struct RunContext {
    pub config: Config,
    pub thresholds: Thresholds,
    pub session: Session,
    pub writer: Box<dyn TagWriter>,
}

/// Validate the target folder, apply CLI overrides and load the model.
pub async fn prepare(args: &RunArgs, mut config: Config) -> anyhow::Result<RunContext> {
    if !args.dir.is_dir() {
        anyhow::bail!(
            "Not a folder: {:?}\n\n  Hint: Pass the folder that holds the images to tag.",
            args.dir
        );
    }

    apply_overrides(args, &mut config);
    let thresholds = config.thresholds()?;
    tracing::debug!(
        "Thresholds: general {:.2}, character {:.2}",
        thresholds.general,
        thresholds.character
    );

    let model_dir = config.model_dir();
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message(format!("Loading model from {}", model_dir.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let loaded = ModelLoader::new(config.model.clone())
        .load(model_dir.clone())
        .await;
    spinner.finish_and_clear();

    let model = loaded.map_err(|e| match e {
        PipelineError::ResourceNotFound(path) => anyhow::anyhow!(
            "Model weights not found at {:?}\n\n  \
             Hint: Set `general.model_dir` with `tagsmith config set` or pass --model.",
            path
        ),
        other => other.into(),
    })?;
    require_labels(&model.vocab, &model_dir, &config.model.general_labels_file)?;
    tracing::info!(
        "Model loaded: {} labels ({} characters)",
        model.vocab.len(),
        model.vocab.character_count()
    );

    let writer = writer_for(config.writer.kind);

    Ok(RunContext {
        config,
        thresholds,
        session: Session::new(model),
        writer,
    })
}

/// Refuse to start a batch whose classifier output could not be named.
fn require_labels(vocab: &LabelVocabulary, model_dir: &Path, labels_file: &str) -> anyhow::Result<()> {
    if vocab.is_empty() {
        anyhow::bail!(
            "No labels found in {:?}\n\n  \
             Hint: The model directory needs {} (one label per line) next to the weights.",
            model_dir,
            labels_file
        );
    }
    Ok(())
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(args: &RunArgs, config: &mut Config) {
    if let Some(ref model) = args.model {
        config.general.model_dir = PathBuf::from(shellexpand::tilde(model).into_owned());
    }
    if let Some(general) = args.general {
        config.thresholds.general = general;
    }
    if let Some(character) = args.character {
        config.thresholds.character = character;
    }
    if let Some(parallel) = args.parallel {
        config.processing.parallel_workers = parallel;
    }
    if let Some(batch_size) = args.batch_size {
        config.processing.batch_size = batch_size;
    }
    if let Some(writer) = args.writer {
        config.writer.kind = writer.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::predict::WriterChoice;
    use tagsmith_core::config::WriterKind;

    #[test]
    fn overrides_replace_config_values() {
        let args = RunArgs {
            model: Some("/models/dd".to_string()),
            general: Some(35),
            character: Some(95),
            parallel: Some(2),
            batch_size: Some(4),
            writer: Some(WriterChoice::Sidecar),
            ..Default::default()
        };
        let mut config = Config::default();
        apply_overrides(&args, &mut config);

        assert_eq!(config.model_dir(), PathBuf::from("/models/dd"));
        assert_eq!(config.thresholds.general, 35);
        assert_eq!(config.thresholds.character, 95);
        assert_eq!(config.processing.parallel_workers, 2);
        assert_eq!(config.processing.batch_size, 4);
        assert_eq!(config.writer.kind, WriterKind::Sidecar);
    }

    #[test]
    fn no_overrides_keep_config() {
        let mut config = Config::default();
        apply_overrides(&RunArgs::default(), &mut config);

        assert_eq!(config.thresholds.general, 50);
        assert_eq!(config.thresholds.character, 85);
        assert_eq!(config.processing.batch_size, 16);
    }

    #[test]
    fn empty_vocabulary_is_refused_with_hint() {
        let err = require_labels(&LabelVocabulary::default(), Path::new("/models/dd"), "tags.txt")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("No labels found"));
        assert!(message.contains("tags.txt"));

        let vocab = LabelVocabulary::from_parts(["smile"], Vec::<String>::new());
        assert!(require_labels(&vocab, Path::new("/models/dd"), "tags.txt").is_ok());
    }

    #[tokio::test]
    async fn prepare_rejects_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            dir: dir.path().join("missing"),
            ..Default::default()
        };
        let err = prepare(&args, Config::default()).await.err().unwrap();
        assert!(err.to_string().contains("Not a folder"));
    }

    #[tokio::test]
    async fn prepare_reports_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            dir: dir.path().to_path_buf(),
            model: Some(dir.path().display().to_string()),
            ..Default::default()
        };
        let err = prepare(&args, Config::default()).await.err().unwrap();
        assert!(err.to_string().contains("Model weights not found"));
    }
}
