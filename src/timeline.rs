/// Running-offset outline of matched chapters for the concatenated output
use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::chapters::{sanitize_name, Chapter, MatchResult, Timestamp};
use crate::error::{ClipperError, Result};
use crate::splitter::ClipManifest;

const OUTLINE_HEADER: &str = "OUTLINE";

/// Characters per line on a title frame
const TITLE_LINE_WIDTH: usize = 50;

/// One outline line: where the chapter starts in the concatenated output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub offset: Timestamp,
    pub duration: Timestamp,
    pub chapter: String,
    pub episode: Option<String>,
}

impl fmt::Display for OutlineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.offset, self.chapter)?;
        if let Some(episode) = &self.episode {
            write!(f, ", {}", episode)?;
        }
        Ok(())
    }
}

/// Single-pass clock over chapters in order. Starts at `00:00:00` and only moves
/// forward; `finish` consumes it, so a pass never leaks state into the next one.
#[derive(Debug, Default)]
pub struct TimelineAccumulator {
    offset: Timestamp,
    entries: Vec<OutlineEntry>,
}

impl TimelineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> Timestamp {
        self.offset
    }

    /// Stamp `chapter` with the current offset, then advance by its duration.
    pub fn push(&mut self, chapter: &Chapter, episode: Option<&str>) -> &OutlineEntry {
        let duration = chapter.duration();
        self.entries.push(OutlineEntry {
            offset: self.offset,
            duration,
            chapter: chapter.name.clone(),
            episode: episode.map(str::to_string),
        });
        self.offset = self.offset + duration;

        &self.entries[self.entries.len() - 1]
    }

    pub fn finish(self) -> Outline {
        debug!("Timeline pass finished at {}", self.offset);
        Outline {
            entries: self.entries,
        }
    }
}

/// Offset-annotated listing of chapters across media items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
}

impl Outline {
    /// Outline of matched chapters, items in order, chapters in order
    pub fn from_matches(results: &[MatchResult]) -> Self {
        let mut timeline = TimelineAccumulator::new();
        for result in results {
            for chapter in &result.chapters {
                timeline.push(chapter, Some(&result.display_name));
            }
        }
        timeline.finish()
    }

    /// Outline rebuilt from the manifests of every item directory under `output_root`,
    /// directories in name order. Directories without a manifest are skipped; any
    /// unreadable or malformed manifest aborts the pass.
    pub async fn from_manifests(output_root: &Path, manifest_name: &str) -> Result<Self> {
        let mut dirs = Vec::new();
        let mut entries = tokio::fs::read_dir(output_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && entry.file_type().await?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();

        if dirs.is_empty() {
            return Err(ClipperError::EmptyInput(format!(
                "{} contains no directories",
                output_root.display()
            )));
        }

        let mut timeline = TimelineAccumulator::new();
        for dir in &dirs {
            if !tokio::fs::try_exists(dir.join(manifest_name)).await? {
                debug!("No manifest in {}, skipping", dir.display());
                continue;
            }
            let manifest = ClipManifest::read_from(dir, manifest_name).await?;
            for chapter in &manifest.chapters {
                timeline.push(chapter, Some(&manifest.title));
            }
        }

        Ok(timeline.finish())
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the concatenated output
    pub fn total_duration(&self) -> Timestamp {
        self.entries
            .last()
            .map(|e| e.offset + e.duration)
            .unwrap_or(Timestamp::ZERO)
    }

    pub fn render(&self) -> String {
        let mut text = format!("{}\n", OUTLINE_HEADER);
        for entry in &self.entries {
            text.push_str(&entry.to_string());
            text.push('\n');
        }
        text
    }

    /// Append the rendered outline to `path`, creating the file if needed
    pub async fn append_to(&self, path: &Path) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;

        info!("🧭 Outline with {} entries appended to {}", self.entries.len(), path.display());
        Ok(())
    }
}

/// Input list for ffmpeg's concat demuxer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatList {
    lines: Vec<String>,
}

impl ConcatList {
    /// One `file` line per clip, in the given order
    pub fn clips<P: AsRef<Path>>(paths: &[P]) -> Self {
        Self {
            lines: paths.iter().map(|p| file_line(p.as_ref())).collect(),
        }
    }

    /// Still images shown for the given durations. The last image is listed a second
    /// time without a duration, which the demuxer needs to honour the final one.
    pub fn images(frames: &[(PathBuf, Timestamp)]) -> Self {
        let mut lines = Vec::with_capacity(frames.len() * 2 + 1);
        for (image, duration) in frames {
            lines.push(file_line(image));
            lines.push(format!("duration {}", duration.as_secs()));
        }
        if let Some((last, _)) = frames.last() {
            lines.push(file_line(last));
        }
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        let mut text = self.lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    pub async fn write_to(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.render()).await?;
        Ok(())
    }
}

fn file_line(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Title-frame schedule: one image per matched chapter at
/// `image_root/<output_name>/<chapter stem>.<extension>`, shown for the chapter's duration.
pub fn image_schedule(
    results: &[MatchResult],
    image_root: &Path,
    extension: &str,
) -> Vec<(PathBuf, Timestamp)> {
    results
        .iter()
        .flat_map(|result| {
            result.chapters.iter().map(move |chapter| {
                let image = image_root
                    .join(&result.output_name)
                    .join(format!("{}.{}", sanitize_name(&chapter.name), extension));
                (image, chapter.duration())
            })
        })
        .collect()
}

/// Text of a chapter's title frame: the guest line and the chapter name, each
/// wrapped to fit the frame.
pub fn title_card(guest: &str, chapter: &str) -> String {
    format!(
        "Guest:\n\n{}\n\n\nChapter:\n\n{}",
        wrap_words(guest, TITLE_LINE_WIDTH),
        wrap_words(chapter, TITLE_LINE_WIDTH)
    )
}

/// Greedy word wrap; a single word longer than `width` gets a line of its own.
fn wrap_words(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}
