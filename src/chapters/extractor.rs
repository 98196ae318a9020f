/// Turns a media description into an ordered chapter set
use super::timestamp::{Timestamp, TimestampParser};
use super::{Chapter, ChapterSet};
use crate::catalog::MediaRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What to do with a line whose time token cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidTimestampPolicy {
    /// Drop the line and keep going
    #[default]
    Skip,
    /// Fail the whole extraction with the format error
    Abort,
}

/// Chapter extractor for free-text descriptions
#[derive(Debug, Clone, Default)]
pub struct ChapterExtractor {
    parser: TimestampParser,
    policy: InvalidTimestampPolicy,
}

impl ChapterExtractor {
    pub fn new(parser: TimestampParser) -> Self {
        Self {
            parser,
            policy: InvalidTimestampPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: InvalidTimestampPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> InvalidTimestampPolicy {
        self.policy
    }

    /// Extract chapters from `description`.
    ///
    /// Each line holding a time token and some alphabetic text starts a chapter named
    /// after that text. A chapter ends where the next one starts; the last one ends at
    /// `total_length`. Lines without a token are ignored.
    pub fn extract(&self, description: &str, total_length: Timestamp) -> Result<ChapterSet> {
        let mut names = Vec::new();
        let mut starts: Vec<Timestamp> = Vec::new();

        for (line_no, line) in description.lines().enumerate() {
            let Some(found) = self.parser.find(line) else {
                continue;
            };

            let Some(name) = chapter_name(line) else {
                debug!("Skipping untitled timestamp '{}' on line {}", found.token, line_no + 1);
                continue;
            };

            let start = match found.parse() {
                Ok(start) => start,
                Err(e) => match self.policy {
                    InvalidTimestampPolicy::Skip => {
                        warn!("⚠️ Skipping chapter '{}' on line {}: {}", name, line_no + 1, e);
                        continue;
                    }
                    InvalidTimestampPolicy::Abort => return Err(e),
                },
            };

            if let Some(previous) = starts.last() {
                if start <= *previous {
                    warn!("⚠️ Chapter '{}' at {} does not start after the previous one ({})",
                          name, start, previous);
                }
            }

            names.push(name);
            starts.push(start);
        }

        if let Some(last) = starts.last() {
            if *last >= total_length {
                warn!("⚠️ Last chapter starts at {} but the media is only {} long", last, total_length);
            }
        }

        let mut chapters = ChapterSet::new();
        for (index, name) in names.into_iter().enumerate() {
            let end = starts.get(index + 1).copied().unwrap_or(total_length);
            if let Some(replaced) = chapters.insert(Chapter::new(name, starts[index], end)) {
                debug!("Chapter '{}' appears more than once, keeping the later interval", replaced.name);
            }
        }

        debug!("Extracted {} chapters", chapters.len());
        Ok(chapters)
    }

    /// Extract chapters from a catalog record, using its length as the end of the last chapter
    pub fn extract_record(&self, record: &MediaRecord) -> Result<ChapterSet> {
        let total_length = Timestamp::parse(&record.length)?;
        self.extract(&record.description, total_length)
    }
}

/// Text from the first alphabetic character to the end of the line, lower-cased.
fn chapter_name(line: &str) -> Option<String> {
    let (offset, _) = line.char_indices().find(|(_, c)| c.is_alphabetic())?;
    Some(line[offset..].trim().to_lowercase())
}
