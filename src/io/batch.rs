use super::{OverwriteEngine, DEFAULT_CHUNK_SIZE};
use crate::error::WipeError;
use crate::patterns::Rule;
use crate::Result;
use anyhow::Context;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{info, warn};

/// Options for a batch run over a file or a directory tree.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub keep: bool,
    pub report: bool,
    pub sync: bool,
    pub chunk_size: usize,
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            keep: false,
            report: false,
            sync: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            jobs: num_cpus::get(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub bytes: u64,
    pub removed: usize,
}

/// Wipes every regular file under a path, several files at a time.
///
/// Each file gets its own engine on a blocking worker; passes within a file
/// stay sequential.
pub struct BatchWiper {
    rule: Arc<Rule>,
    options: BatchOptions,
    concurrency_limit: Arc<Semaphore>,
    progress: Option<MultiProgress>,
}

struct FileOutcome {
    bytes: u64,
    removed: bool,
}

impl BatchWiper {
    pub fn new(rule: Rule, options: BatchOptions) -> Self {
        let jobs = options.jobs.max(1);
        let progress = options.report.then(MultiProgress::new);
        Self {
            rule: Arc::new(rule),
            options,
            concurrency_limit: Arc::new(Semaphore::new(jobs)),
            progress,
        }
    }

    /// Wipes `path` (a file, or every regular file below a directory) and
    /// removes what was wiped unless `keep` is set.
    pub async fn wipe_path(&self, path: &Path) -> Result<BatchSummary> {
        let metadata = fs::symlink_metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;

        let files = if metadata.is_dir() {
            self.report(format_args!(
                "Recursively traversing files and directories in {} ...",
                path.display()
            ));
            collect_files(path)?
        } else if metadata.is_file() {
            let outcome = self.wipe_one(path.to_path_buf(), false).await?;
            return Ok(BatchSummary {
                files: 1,
                bytes: outcome.bytes,
                removed: usize::from(outcome.removed),
            });
        } else {
            anyhow::bail!("{} is not a regular file or directory", path.display());
        };

        let tasks = files
            .into_iter()
            .map(|file| self.wipe_one(file, true));
        let outcomes = futures::future::try_join_all(tasks).await?;

        Ok(outcomes
            .iter()
            .fold(BatchSummary::default(), |mut summary, outcome| {
                summary.files += 1;
                summary.bytes += outcome.bytes;
                summary.removed += usize::from(outcome.removed);
                summary
            }))
    }

    async fn wipe_one(&self, path: PathBuf, allow_empty: bool) -> Result<FileOutcome> {
        let _permit = self
            .concurrency_limit
            .acquire()
            .await
            .context("Wipe worker pool closed")?;

        self.report(format_args!("Currently processing file: {}", path.display()));
        let rule = Arc::clone(&self.rule);
        let options = self.options.clone();
        let progress = self.file_progress(&path);

        task::spawn_blocking(move || -> Result<FileOutcome> {
            let mut engine = OverwriteEngine::new()
                .chunk_size(options.chunk_size)
                .sync(options.sync);
            if let Some(pb) = &progress {
                engine = engine.progress(pb.clone());
            }

            let bytes = match engine.wipe(&path, &rule) {
                Ok(summary) => summary.bytes_written,
                Err(WipeError::EmptyFile { .. }) if allow_empty => {
                    info!(path = %path.display(), "empty file, nothing to overwrite");
                    0
                }
                Err(e) => {
                    if let Some(pb) = &progress {
                        pb.abandon_with_message("Wipe failed");
                    }
                    return Err(e).with_context(|| format!("Failed to wipe {}", path.display()));
                }
            };

            if let Some(pb) = &progress {
                pb.finish_with_message("Wipe completed");
            }

            let removed = !options.keep;
            if removed {
                remove(&path)?;
            }
            Ok(FileOutcome { bytes, removed })
        })
        .await
        .context("Wipe worker panicked")?
    }

    fn file_progress(&self, path: &Path) -> Option<ProgressBar> {
        let multi = self.progress.as_ref()?;
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let pb = multi.add(ProgressBar::new(size * self.rule.len() as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {bytes:>10}/{total_bytes:10} {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        Some(pb)
    }

    fn report(&self, line: std::fmt::Arguments<'_>) {
        match &self.progress {
            Some(multi) => {
                let _ = multi.println(line.to_string());
            }
            None => info!("{}", line),
        }
    }
}

/// Removes a file once its contents have been wiped.
pub fn remove(path: &Path) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))
}

/// Lists regular files below `root`, depth first, without following links.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .with_context(|| format!("Failed to stat {}", path.display()))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            } else {
                warn!(path = %path.display(), "skipping non-regular file");
            }
        }
    }

    Ok(files)
}
