/// Chapter model, extraction and keyword matching
///
/// Chapters are read out of free-text media descriptions: every line that carries a
/// time token and a title becomes a chapter running until the next one starts.

pub mod timestamp;
pub mod extractor;
pub mod matcher;

// Re-export main types
pub use extractor::{ChapterExtractor, InvalidTimestampPolicy};
pub use matcher::{first_sentence, sanitize_name, KeywordMatcher, MatchResult, MatchSummary, SignedKeyword};
pub use timestamp::{TimeMatch, Timestamp, TimestampParser};

use serde::{Deserialize, Serialize};

/// A named sub-interval of a media item's timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chapter {
    /// Chapter title as found in the description (lower-cased)
    pub name: String,
    /// Start of the chapter
    pub start: Timestamp,
    /// End of the chapter (start of the next one, or the media length)
    pub end: Timestamp,
}

impl Chapter {
    pub fn new(name: impl Into<String>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Length of the chapter; zero if the boundaries are out of order
    pub fn duration(&self) -> Timestamp {
        self.end.saturating_sub(self.start)
    }

    /// Filesystem-safe stem used for the chapter's clip
    pub fn file_stem(&self) -> String {
        sanitize_name(&self.name)
    }
}

/// Ordered, per-media-item mapping of chapter name to its interval.
///
/// Iteration follows first appearance. Inserting a name that is already present
/// replaces its interval but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterSet {
    chapters: Vec<Chapter>,
}

impl ChapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a chapter. Returns the previous entry under that name.
    pub fn insert(&mut self, chapter: Chapter) -> Option<Chapter> {
        match self.position(&chapter.name) {
            Some(index) => Some(std::mem::replace(&mut self.chapters[index], chapter)),
            None => {
                self.chapters.push(chapter);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove a chapter, keeping the order of the rest. No-op when absent.
    pub fn remove(&mut self, name: &str) -> Option<Chapter> {
        self.position(name).map(|index| self.chapters.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chapter> {
        self.chapters.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chapters.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Sum of all chapter durations
    pub fn total_duration(&self) -> Timestamp {
        self.chapters
            .iter()
            .fold(Timestamp::ZERO, |total, c| total + c.duration())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.name == name)
    }
}

impl<'a> IntoIterator for &'a ChapterSet {
    type Item = &'a Chapter;
    type IntoIter = std::slice::Iter<'a, Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}

impl IntoIterator for ChapterSet {
    type Item = Chapter;
    type IntoIter = std::vec::IntoIter<Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.into_iter()
    }
}

impl FromIterator<Chapter> for ChapterSet {
    fn from_iter<I: IntoIterator<Item = Chapter>>(iter: I) -> Self {
        let mut set = ChapterSet::new();
        for chapter in iter {
            set.insert(chapter);
        }
        set
    }
}
