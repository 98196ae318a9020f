/// Keyword filtering of chapters with inclusion and exclusion
use super::extractor::ChapterExtractor;
use super::timestamp::Timestamp;
use super::ChapterSet;
use crate::catalog::MediaRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// A user keyword. A leading `-` turns it into an exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedKeyword {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl SignedKeyword {
    /// Parse a raw keyword; `None` for keywords without any word characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (exclude, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let words: Vec<String> = words(body).collect();
        if words.is_empty() {
            return None;
        }

        Some(if exclude {
            Self::Exclude(words)
        } else {
            Self::Include(words)
        })
    }

    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Vec<Self> {
        raw.iter().filter_map(|k| Self::parse(k.as_ref())).collect()
    }

    pub fn words(&self) -> &[String] {
        match self {
            Self::Include(words) | Self::Exclude(words) => words,
        }
    }

    pub fn is_exclusion(&self) -> bool {
        matches!(self, Self::Exclude(_))
    }

    /// True if any of the keyword's words is one of `tokens`
    fn hits(&self, tokens: &HashSet<String>) -> bool {
        self.words().iter().any(|word| tokens.contains(word))
    }
}

impl fmt::Display for SignedKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exclusion() {
            write!(f, "-")?;
        }
        write!(f, "{}", self.words().join(" "))
    }
}

/// Lower-cased words of `text`, split on runs of non-word characters.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !is_word_char(c))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Description text up to the first full stop, trimmed.
pub fn first_sentence(description: &str) -> String {
    description.split('.').next().unwrap_or_default().trim().to_string()
}

/// Filesystem-safe form of a name: every run of non-word characters or underscores
/// becomes a single `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            sanitized.push(c);
            in_separator = false;
        } else if !in_separator {
            sanitized.push('_');
            in_separator = true;
        }
    }

    sanitized
}

/// Chapters of one media item that survived keyword filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// URL or id of the media item in the catalog
    pub media_key: String,
    pub display_name: String,
    /// Sanitized display name; stem of the source file and name of the output directory
    pub output_name: String,
    /// First sentence of the description, usually naming the guest
    #[serde(default)]
    pub guest: String,
    pub chapters: ChapterSet,
}

/// Selects chapters whose names contain keyword words
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    includes: Vec<SignedKeyword>,
    excludes: Vec<SignedKeyword>,
}

impl KeywordMatcher {
    pub fn new(keywords: Vec<SignedKeyword>) -> Self {
        let (excludes, includes) = keywords.into_iter().partition(SignedKeyword::is_exclusion);
        Self { includes, excludes }
    }

    /// Build a matcher from raw strings such as `["bitcoin", "-ads"]`
    pub fn from_raw<S: AsRef<str>>(raw: &[S]) -> Self {
        Self::new(SignedKeyword::parse_all(raw))
    }

    pub fn keywords(&self) -> impl Iterator<Item = &SignedKeyword> {
        self.includes.iter().chain(self.excludes.iter())
    }

    /// Keep the chapters matched by an include keyword and not hit by any exclude keyword.
    ///
    /// Every include keyword is evaluated before any exclusion, so an exclusion wins
    /// no matter where it appears in the keyword list.
    pub fn filter(&self, chapters: &ChapterSet) -> ChapterSet {
        let tokenized: Vec<(HashSet<String>, _)> = chapters
            .iter()
            .map(|chapter| (words(&chapter.name).collect(), chapter))
            .collect();

        let mut matched = ChapterSet::new();
        for (tokens, chapter) in &tokenized {
            if self.includes.iter().any(|keyword| keyword.hits(tokens)) {
                matched.insert((*chapter).clone());
            }
        }

        for (tokens, chapter) in &tokenized {
            if self.excludes.iter().any(|keyword| keyword.hits(tokens))
                && matched.remove(&chapter.name).is_some()
            {
                debug!("Excluded chapter '{}'", chapter.name);
            }
        }

        matched
    }

    /// Extract and filter the chapters of one record; `None` when nothing matched.
    pub fn match_record(
        &self,
        extractor: &ChapterExtractor,
        record: &MediaRecord,
    ) -> Result<Option<MatchResult>> {
        let chapters = self.filter(&extractor.extract_record(record)?);
        if chapters.is_empty() {
            return Ok(None);
        }

        Ok(Some(MatchResult {
            media_key: record.media_key().to_string(),
            display_name: record.display_name.clone(),
            output_name: sanitize_name(&record.display_name),
            guest: first_sentence(&record.description),
            chapters,
        }))
    }

    /// Match every record, in catalog order. Records without matches are left out;
    /// records that cannot be parsed are logged and left out.
    pub fn match_records(
        &self,
        extractor: &ChapterExtractor,
        records: &[MediaRecord],
    ) -> Vec<MatchResult> {
        let mut results = Vec::new();

        for record in records {
            match self.match_record(extractor, record) {
                Ok(Some(result)) => {
                    debug!("🎯 {}: {} matching chapters", result.display_name, result.chapters.len());
                    results.push(result);
                }
                Ok(None) => {}
                Err(e) => warn!("⚠️ Skipping '{}': {}", record.display_name, e),
            }
        }

        info!("🔎 {} of {} media items have matching chapters", results.len(), records.len());
        results
    }
}

/// Overview of what a keyword query selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub keywords: Vec<String>,
    pub episodes: usize,
    pub chapters: usize,
    pub total_duration: Timestamp,
    pub chapter_names: Vec<String>,
}

impl MatchSummary {
    pub fn new(matcher: &KeywordMatcher, results: &[MatchResult]) -> Self {
        let chapter_names: Vec<String> = results
            .iter()
            .flat_map(|r| r.chapters.names().map(str::to_string))
            .collect();

        Self {
            keywords: matcher.keywords().map(|k| k.to_string()).collect(),
            episodes: results.len(),
            chapters: chapter_names.len(),
            total_duration: results
                .iter()
                .fold(Timestamp::ZERO, |total, r| total + r.chapters.total_duration()),
            chapter_names,
        }
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "List of all chapters:")?;
        for name in &self.chapter_names {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)?;
        writeln!(f, "Searching for: [{}] will output a video with:", self.keywords.join(", "))?;
        writeln!(f, "Total duration: {}", self.total_duration)?;
        writeln!(f, "From {} episodes", self.episodes)?;
        write!(f, "Total of {} chapters", self.chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapters::Chapter;

    fn chapter_set(names: &[&str]) -> ChapterSet {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let start = i as u64 * 60;
                Chapter::new(*name, Timestamp::from_secs(start), Timestamp::from_secs(start + 60))
            })
            .collect()
    }

    fn names(set: &ChapterSet) -> Vec<&str> {
        set.names().collect()
    }

    #[test]
    fn test_parse_signed_keywords() {
        assert_eq!(
            SignedKeyword::parse("Bitcoin"),
            Some(SignedKeyword::Include(vec!["bitcoin".to_string()]))
        );
        assert_eq!(
            SignedKeyword::parse("-Smart Contract"),
            Some(SignedKeyword::Exclude(vec!["smart".to_string(), "contract".to_string()]))
        );
        assert_eq!(SignedKeyword::parse(""), None);
        assert_eq!(SignedKeyword::parse("-"), None);
        assert_eq!(SignedKeyword::parse("-bitcoin").unwrap().to_string(), "-bitcoin");
    }

    #[test]
    fn test_inclusion_selects_matching_chapter() {
        let chapters = chapter_set(&["intro", "bitcoin talk", "closing"]);
        let matcher = KeywordMatcher::from_raw(&["bitcoin"]);
        assert_eq!(names(&matcher.filter(&chapters)), vec!["bitcoin talk"]);
    }

    #[test]
    fn test_exclusion_removes_included_chapter() {
        let chapters = chapter_set(&["intro", "bitcoin talk", "closing"]);
        let matcher = KeywordMatcher::from_raw(&["talk", "-bitcoin"]);
        assert!(matcher.filter(&chapters).is_empty());
    }

    #[test]
    fn test_exclusion_wins_regardless_of_order() {
        let chapters = chapter_set(&["bitcoin talk", "small talk"]);
        let before = KeywordMatcher::from_raw(&["-bitcoin", "talk"]);
        let after = KeywordMatcher::from_raw(&["talk", "-bitcoin"]);

        // An exclusion listed first does not stop later includes for other chapters.
        assert_eq!(names(&before.filter(&chapters)), vec!["small talk"]);
        assert_eq!(before.filter(&chapters), after.filter(&chapters));
    }

    #[test]
    fn test_matching_is_word_level_and_case_insensitive() {
        let chapters = chapter_set(&["bitcoin talk", "ethereum's future"]);
        assert!(KeywordMatcher::from_raw(&["bit"]).filter(&chapters).is_empty());
        assert_eq!(
            names(&KeywordMatcher::from_raw(&["BITCOIN"]).filter(&chapters)),
            vec!["bitcoin talk"]
        );
        assert_eq!(
            names(&KeywordMatcher::from_raw(&["ethereum"]).filter(&chapters)),
            vec!["ethereum's future"]
        );
    }

    #[test]
    fn test_multi_word_keyword_matches_any_word() {
        let chapters = chapter_set(&["smart money", "contract law", "weather"]);
        let matcher = KeywordMatcher::from_raw(&["smart contract"]);
        assert_eq!(names(&matcher.filter(&chapters)), vec!["smart money", "contract law"]);
    }

    #[test]
    fn test_only_exclusions_select_nothing() {
        let chapters = chapter_set(&["intro", "bitcoin talk"]);
        assert!(KeywordMatcher::from_raw(&["-intro"]).filter(&chapters).is_empty());
        assert!(KeywordMatcher::from_raw::<&str>(&[]).filter(&chapters).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let chapters = chapter_set(&["intro", "bitcoin talk", "money and banks", "closing"]);
        let matcher = KeywordMatcher::from_raw(&["bitcoin", "money", "-closing"]);
        let once = matcher.filter(&chapters);
        assert_eq!(matcher.filter(&chapters), once);
        assert_eq!(matcher.filter(&once), once);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Episode #42: Money & Banks"), "Episode_42_Money_Banks");
        assert_eq!(sanitize_name("a__b"), "a_b");
        assert_eq!(sanitize_name("plain"), "plain");
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence(" Jane Doe is an economist. She talks money."), "Jane Doe is an economist");
        assert_eq!(first_sentence("no full stop"), "no full stop");
        assert_eq!(first_sentence(""), "");
    }

    #[test]
    fn test_match_records_drops_items_without_matches() {
        let records = vec![
            MediaRecord::new("Ep 1: Crypto", "url1", "0:30:00", "0:00 intro\n5:00 bitcoin basics"),
            MediaRecord::new("Ep 2: Cooking", "url2", "0:30:00", "0:00 intro\n5:00 pasta"),
            MediaRecord::new("Ep 3: Broken", "url3", "not a length", "0:00 bitcoin"),
        ];
        let matcher = KeywordMatcher::from_raw(&["bitcoin"]);
        let results = matcher.match_records(&ChapterExtractor::default(), &records);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].media_key, "url1");
        assert_eq!(results[0].output_name, "Ep_1_Crypto");
        assert_eq!(names(&results[0].chapters), vec!["bitcoin basics"]);
        assert_eq!(results[0].chapters.get("bitcoin basics").unwrap().end.as_secs(), 1800);
    }

    #[test]
    fn test_match_summary() {
        let matcher = KeywordMatcher::from_raw(&["talk"]);
        let results = vec![MatchResult {
            media_key: "url".into(),
            display_name: "Ep".into(),
            output_name: "Ep".into(),
            guest: String::new(),
            chapters: chapter_set(&["talk one", "talk two"]),
        }];
        let summary = MatchSummary::new(&matcher, &results);
        assert_eq!(summary.episodes, 1);
        assert_eq!(summary.chapters, 2);
        assert_eq!(summary.total_duration.as_secs(), 120);
        assert!(summary.to_string().contains("Total duration: 00:02:00"));
    }
}
