use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::catalog::MediaRecord;
use crate::chapters::{ChapterExtractor, KeywordMatcher, MatchResult, MatchSummary, TimestampParser};
use crate::config::Config;
use crate::error::{ClipperError, Result};
use crate::media::{Ffmpeg, MediaTool};
use crate::pool::WorkerPool;
use crate::splitter::{ChapterSplitter, ClipManifest, ItemReport, ProcessingStatus};
use crate::timeline::{ConcatList, Outline, TimelineAccumulator};

/// Per-item entry of the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    pub output_name: String,
    pub display_name: String,
    pub status: ProcessingStatus,
    pub clips: usize,
    pub failed_chapters: Vec<String>,
    pub error_message: Option<String>,
    pub manifest: Option<ClipManifest>,
    pub processing_time: Duration,
}

impl From<&ItemReport> for ItemSummary {
    fn from(report: &ItemReport) -> Self {
        Self {
            output_name: report.output_name.clone(),
            display_name: report.display_name.clone(),
            status: report.status,
            clips: report.clips.len(),
            failed_chapters: report.failures.iter().map(|f| f.chapter.clone()).collect(),
            error_message: report.error.as_ref().map(|e| e.to_string()),
            manifest: report.manifest.clone(),
            processing_time: report.processing_time,
        }
    }
}

/// Overall results of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub summary: MatchSummary,
    pub total: usize,
    pub successful: usize,
    pub partial: usize,
    pub failed: usize,
    pub clips: usize,
    pub outline: Outline,
    pub outline_path: Option<PathBuf>,
    pub concat_list_path: Option<PathBuf>,
    pub total_time: Duration,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<ItemSummary>,
}

/// Match → split → outline, wired from a `Config`
pub struct ChapterPipeline {
    config: Config,
    extractor: ChapterExtractor,
    splitter: ChapterSplitter,
}

impl ChapterPipeline {
    pub fn new(config: Config, tool: Arc<dyn MediaTool>) -> Self {
        info!("🔧 Initializing chapter pipeline with {} workers", config.performance.max_workers);

        let extractor = ChapterExtractor::new(TimestampParser::new())
            .with_policy(config.splitting.invalid_timestamps);
        let splitter = ChapterSplitter::new(tool, WorkerPool::new(config.performance.max_workers))
            .with_manifest_name(config.splitting.manifest_name.clone());

        Self {
            config,
            extractor,
            splitter,
        }
    }

    /// Pipeline driving the configured ffmpeg binary
    pub fn with_ffmpeg(config: Config) -> Self {
        let ffmpeg = Ffmpeg::with_binary(config.splitting.ffmpeg_path.clone())
            .with_extra_args(config.splitting.ffmpeg_extra_args.clone());
        Self::new(config, Arc::new(ffmpeg))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Matcher for `keywords`, falling back to the configured keywords when empty
    pub fn matcher(&self, keywords: &[String]) -> KeywordMatcher {
        if keywords.is_empty() {
            KeywordMatcher::from_raw(&self.config.matching.keywords)
        } else {
            KeywordMatcher::from_raw(keywords)
        }
    }

    /// Which chapters a query selects, without touching the filesystem
    pub fn preview(&self, records: &[MediaRecord], keywords: &[String]) -> (Vec<MatchResult>, MatchSummary) {
        let matcher = self.matcher(keywords);
        let matches = matcher.match_records(&self.extractor, records);
        let summary = MatchSummary::new(&matcher, &matches);
        (matches, summary)
    }

    /// Run the whole pipeline over `records`.
    ///
    /// Clips land in `output_dir/<output_name>/`; the outline (matched chapters of the
    /// items that were split) is appended to the configured outline file, and a concat
    /// list of every clip plus a JSON report are written next to it.
    pub async fn run(
        &self,
        records: &[MediaRecord],
        keywords: &[String],
        source_dir: &Path,
        output_dir: &Path,
    ) -> Result<PipelineResult> {
        let start_time = Instant::now();

        info!("🚀 Starting chapter pipeline...");
        info!("📁 Sources: {}", source_dir.display());
        info!("📂 Output: {}", output_dir.display());

        let (matches, summary) = self.preview(records, keywords);
        if matches.is_empty() {
            return Err(ClipperError::EmptyInput(format!(
                "no chapters matched [{}]",
                summary.keywords.join(", ")
            )));
        }

        info!("🎯 {} chapters from {} episodes ({} total)",
              summary.chapters, summary.episodes, summary.total_duration);

        let reports = self.splitter.split_all(source_dir, output_dir, &matches).await?;

        // Only clips that were actually produced go into the outline.
        let mut timeline = TimelineAccumulator::new();
        for manifest in reports.iter().filter_map(|r| r.manifest.as_ref()) {
            for chapter in &manifest.chapters {
                timeline.push(chapter, Some(&manifest.title));
            }
        }
        let outline = timeline.finish();

        let outline_path = if outline.is_empty() {
            warn!("⚠️ No clips were produced, skipping outline");
            None
        } else {
            let path = output_dir.join(&self.config.output.outline_file);
            outline.append_to(&path).await?;
            Some(path)
        };

        // The concat demuxer resolves relative entries against the list's own directory,
        // so the list holds absolute paths.
        let mut clip_paths = Vec::new();
        for clip in reports.iter().flat_map(|r| r.clips.iter()) {
            clip_paths.push(tokio::fs::canonicalize(clip).await?);
        }
        let concat_list_path = if clip_paths.is_empty() {
            None
        } else {
            let path = output_dir.join(&self.config.output.concat_list_file);
            ConcatList::clips(&clip_paths).write_to(&path).await?;
            Some(path)
        };

        let count = |status: ProcessingStatus| reports.iter().filter(|r| r.status == status).count();
        let result = PipelineResult {
            summary,
            total: reports.len(),
            successful: count(ProcessingStatus::Completed),
            partial: count(ProcessingStatus::Partial),
            failed: count(ProcessingStatus::Failed),
            clips: clip_paths.len(),
            outline,
            outline_path,
            concat_list_path,
            total_time: start_time.elapsed(),
            finished_at: Utc::now(),
            items: reports.iter().map(ItemSummary::from).collect(),
        };

        if self.config.output.save_metadata {
            let results_path = output_dir.join(&self.config.output.results_file);
            let json_data = serde_json::to_string_pretty(&result)?;
            tokio::fs::write(&results_path, json_data).await?;
            info!("💾 Results saved to: {}", results_path.display());
        }

        info!("🎉 Pipeline finished in {:.2}s: {} completed, {} partial, {} failed, {} clips",
              result.total_time.as_secs_f64(), result.successful, result.partial,
              result.failed, result.clips);

        Ok(result)
    }
}
