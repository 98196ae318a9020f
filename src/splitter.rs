use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::chapters::{Chapter, MatchResult, Timestamp};
use crate::error::{ClipperError, Result};
use crate::media::{ClipRequest, MediaTool};
use crate::pool::WorkerPool;

pub const DEFAULT_MANIFEST_NAME: &str = "info.txt";

/// Per-item file holding the guest line shown on title frames
pub const GUEST_FILE_NAME: &str = "guest.txt";

/// Guest line written next to an item's manifest
pub async fn read_guest(dir: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(dir.join(GUEST_FILE_NAME)).await?;
    Ok(text.trim().to_string())
}

/// Record of the clips cut from one media item: a header line with the item's
/// name, then one `name, start, end` line per clip in chapter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipManifest {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl ClipManifest {
    pub fn new(title: impl Into<String>, chapters: Vec<Chapter>) -> Self {
        Self {
            title: title.into(),
            chapters,
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Parse manifest text. Fields are split from the right, so chapter names may contain commas.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let malformed = |reason: String| ClipperError::Manifest {
            path: origin.to_path_buf(),
            reason,
        };

        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        let title = lines
            .next()
            .ok_or_else(|| malformed("missing header line".to_string()))?
            .to_string();

        let mut chapters = Vec::new();
        for line in lines {
            let mut fields = line.rsplitn(3, ',').map(str::trim);
            let (Some(end), Some(start), Some(name)) = (fields.next(), fields.next(), fields.next()) else {
                return Err(malformed(format!("expected 'name, start, end' but got '{}'", line)));
            };

            let start = Timestamp::parse(start).map_err(|e| malformed(e.to_string()))?;
            let end = Timestamp::parse(end).map_err(|e| malformed(e.to_string()))?;
            chapters.push(Chapter::new(name, start, end));
        }

        Ok(Self { title, chapters })
    }

    /// Write the manifest into `dir`. Refuses to replace an existing file.
    pub async fn write_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = dir.join(file_name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => ClipperError::AlreadyExists { path: path.clone() },
                _ => e.into(),
            })?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(path)
    }

    pub async fn read_from(dir: &Path, file_name: &str) -> Result<Self> {
        let path = dir.join(file_name);
        let text = tokio::fs::read_to_string(&path).await?;
        Self::parse(&text, &path)
    }
}

impl fmt::Display for ClipManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for chapter in &self.chapters {
            writeln!(f, "{}, {}, {}", chapter.name, chapter.start, chapter.end)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    /// Every chapter was extracted
    Completed,
    /// Some chapters could not be extracted
    Partial,
    /// The item could not be processed at all
    Failed,
}

/// A chapter whose clip could not be produced
#[derive(Debug)]
pub struct ChapterFailure {
    pub chapter: String,
    pub error: ClipperError,
}

/// Outcome of splitting one media item
#[derive(Debug)]
pub struct ItemReport {
    pub output_name: String,
    pub display_name: String,
    pub output_dir: PathBuf,
    pub status: ProcessingStatus,
    /// Written manifest; `None` when the item failed
    pub manifest: Option<ClipManifest>,
    pub clips: Vec<PathBuf>,
    pub failures: Vec<ChapterFailure>,
    /// Item-level error (destination exists, missing source, ...)
    pub error: Option<ClipperError>,
    pub processing_time: Duration,
}

impl ItemReport {
    fn failed(item: &MatchResult, output_dir: PathBuf, error: ClipperError, started: Instant) -> Self {
        Self {
            output_name: item.output_name.clone(),
            display_name: item.display_name.clone(),
            output_dir,
            status: ProcessingStatus::Failed,
            manifest: None,
            clips: Vec::new(),
            failures: Vec::new(),
            error: Some(error),
            processing_time: started.elapsed(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, ProcessingStatus::Failed)
    }
}

/// Cuts matched chapters out of source media, one pooled task per media item
#[derive(Clone)]
pub struct ChapterSplitter {
    tool: Arc<dyn MediaTool>,
    pool: WorkerPool,
    manifest_name: String,
}

impl ChapterSplitter {
    pub fn new(tool: Arc<dyn MediaTool>, pool: WorkerPool) -> Self {
        Self {
            tool,
            pool,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
        }
    }

    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Split every matched item.
    ///
    /// The source of an item is `source_dir/<output_name>.<ext>`, `ext` being the most
    /// common extension in `source_dir`. Clips and the manifest go to
    /// `output_dir/<output_name>/`. Failures of one chapter or one item are reported in
    /// the returned list (same order as `items`) and never stop the others.
    pub async fn split_all(
        &self,
        source_dir: &Path,
        output_dir: &Path,
        items: &[MatchResult],
    ) -> Result<Vec<ItemReport>> {
        let files = list_source_files(source_dir).await?;
        if files.is_empty() {
            return Err(ClipperError::EmptyInput(format!(
                "{} contains no files",
                source_dir.display()
            )));
        }
        if items.is_empty() {
            return Err(ClipperError::EmptyInput("no media items to split".to_string()));
        }

        let extension = most_common_extension(&files).ok_or_else(|| {
            ClipperError::EmptyInput(format!(
                "{} contains no files with an extension",
                source_dir.display()
            ))
        })?;

        tokio::fs::create_dir_all(output_dir).await?;

        info!("✂️ Splitting {} media items with {} workers (.{} sources)",
              items.len(), self.pool.max_workers(), extension);

        let total = items.len();
        let jobs: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let job = ItemJob {
                    tool: Arc::clone(&self.tool),
                    source: source_dir.join(format!("{}.{}", item.output_name, extension)),
                    destination: output_dir.join(&item.output_name),
                    extension: extension.clone(),
                    manifest_name: self.manifest_name.clone(),
                    item: item.clone(),
                };
                async move {
                    info!("📹 Splitting item {}/{}: {}", index + 1, total, job.item.display_name);
                    job.run().await
                }
            })
            .collect();

        let started = Instant::now();
        let reports: Vec<ItemReport> = self
            .pool
            .run_all(jobs)
            .await
            .into_iter()
            .zip(items)
            .map(|(joined, item)| {
                joined.unwrap_or_else(|e| {
                    error!("Worker for {} died: {}", item.display_name, e);
                    ItemReport::failed(item, output_dir.join(&item.output_name), e, started)
                })
            })
            .collect();

        for report in &reports {
            match report.status {
                ProcessingStatus::Completed => {
                    info!("✅ Completed: {} ({} clips in {:.2}s)",
                          report.display_name, report.clips.len(),
                          report.processing_time.as_secs_f64());
                }
                ProcessingStatus::Partial => {
                    warn!("⚠️ Partial: {} ({} clips, {} failed)",
                          report.display_name, report.clips.len(), report.failures.len());
                }
                ProcessingStatus::Failed => {
                    warn!("❌ Failed: {} - {}",
                          report.display_name,
                          report.error.as_ref().map(|e| e.to_string()).unwrap_or_default());
                }
            }
        }

        Ok(reports)
    }
}

/// Everything one item's task owns; nothing is shared with sibling tasks but the tool.
struct ItemJob {
    tool: Arc<dyn MediaTool>,
    source: PathBuf,
    destination: PathBuf,
    extension: String,
    manifest_name: String,
    item: MatchResult,
}

impl ItemJob {
    async fn write_guest(&self) -> Result<()> {
        let path = self.destination.join(GUEST_FILE_NAME);
        tokio::fs::write(&path, format!("{}\n", self.item.guest)).await?;
        Ok(())
    }

    async fn run(self) -> ItemReport {
        let started = Instant::now();

        if let Err(e) = tokio::fs::metadata(&self.source).await {
            return ItemReport::failed(&self.item, self.destination, e.into(), started);
        }

        if let Err(e) = tokio::fs::create_dir(&self.destination).await {
            let error = match e.kind() {
                ErrorKind::AlreadyExists => ClipperError::AlreadyExists {
                    path: self.destination.clone(),
                },
                _ => e.into(),
            };
            return ItemReport::failed(&self.item, self.destination, error, started);
        }

        let mut clips = Vec::new();
        let mut extracted = Vec::new();
        let mut failures = Vec::new();
        let mut used_stems = HashSet::new();

        for chapter in &self.item.chapters {
            let stem = unique_stem(chapter.file_stem(), &mut used_stems);
            let request = ClipRequest {
                source: self.source.clone(),
                start: chapter.start,
                end: chapter.end,
                destination: self.destination.join(format!("{}.{}", stem, self.extension)),
            };

            match self.tool.extract_clip(&request).await {
                Ok(()) => {
                    clips.push(request.destination);
                    extracted.push(chapter.clone());
                }
                Err(e) => {
                    warn!("⚠️ {}: chapter '{}' not extracted: {}", self.item.display_name, chapter.name, e);
                    failures.push(ChapterFailure {
                        chapter: chapter.name.clone(),
                        error: e,
                    });
                }
            }
        }

        let manifest = ClipManifest::new(self.item.display_name.clone(), extracted);
        let written = match manifest.write_to(&self.destination, &self.manifest_name).await {
            Ok(path) => self.write_guest().await.map(|_| path),
            Err(e) => Err(e),
        };
        let (status, manifest, error) = match written {
            Ok(path) => {
                debug!("📝 Manifest written: {}", path.display());
                let status = if failures.is_empty() {
                    ProcessingStatus::Completed
                } else {
                    ProcessingStatus::Partial
                };
                (status, Some(manifest), None)
            }
            Err(e) => (ProcessingStatus::Failed, None, Some(e)),
        };

        ItemReport {
            output_name: self.item.output_name,
            display_name: self.item.display_name,
            output_dir: self.destination,
            status,
            manifest,
            clips,
            failures,
            error,
            processing_time: started.elapsed(),
        }
    }
}

/// Suffix `_2`, `_3`, ... onto stems already taken within the same item.
fn unique_stem(stem: String, used: &mut HashSet<String>) -> String {
    if used.insert(stem.clone()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", stem, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
async fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Most frequent extension; ties go to the alphabetically first one.
fn most_common_extension(files: &[PathBuf]) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for ext in files.iter().filter_map(|f| f.extension()) {
        *counts.entry(ext.to_string_lossy().into_owned()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(ext, _)| ext)
}
