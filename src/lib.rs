/// Chapter Splitter
///
/// Finds keyword-matching chapters in the timestamped descriptions of long-form media
/// (podcast episodes, recorded talks), cuts them out of the source files with a stream
/// copy, and writes an outline of where each chapter lands in the concatenated result.

pub mod catalog;
pub mod chapters;
pub mod config;
pub mod error;
pub mod media;
pub mod pool;
pub mod processing;
pub mod splitter;
pub mod timeline;

// Re-export main types for easy access
pub use crate::catalog::{load_catalog, MediaRecord};
pub use crate::chapters::{
    Chapter, ChapterExtractor, ChapterSet, KeywordMatcher, MatchResult, MatchSummary, Timestamp,
    TimestampParser,
};
pub use crate::config::Config;
pub use crate::error::{ClipperError, Result};
pub use crate::media::{ClipRequest, Ffmpeg, MediaTool};
pub use crate::pool::WorkerPool;
pub use crate::processing::{ChapterPipeline, PipelineResult};
pub use crate::splitter::{read_guest, ChapterSplitter, ClipManifest, ItemReport, ProcessingStatus};
pub use crate::timeline::{title_card, ConcatList, Outline, TimelineAccumulator};
