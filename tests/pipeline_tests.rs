use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use chapter_splitter::chapters::{sanitize_name, ChapterExtractor, KeywordMatcher};
use chapter_splitter::config::ConfigBuilder;
use chapter_splitter::error::{ClipperError, Result};
use chapter_splitter::media::{ClipRequest, MediaTool};
use chapter_splitter::{
    read_guest, title_card, ChapterPipeline, ChapterSplitter, ClipManifest, MatchResult,
    MediaRecord, Outline, ProcessingStatus, WorkerPool,
};

/// Writes a small placeholder file per clip instead of running ffmpeg
#[derive(Default)]
struct FakeTool {
    fail_chapter: Option<String>,
    fail_source: Option<String>,
    requests: Mutex<Vec<ClipRequest>>,
}

impl FakeTool {
    fn failing_on(chapter_stem: &str) -> Self {
        Self {
            fail_chapter: Some(chapter_stem.to_string()),
            ..Self::default()
        }
    }

    fn failing_for_source(file_name: &str) -> Self {
        Self {
            fail_source: Some(file_name.to_string()),
            ..Self::default()
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaTool for FakeTool {
    fn name(&self) -> &str {
        "fake"
    }

    async fn extract_clip(&self, request: &ClipRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());

        let stem = request
            .destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = request
            .source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_chapter.as_deref() == Some(stem.as_str())
            || self.fail_source.as_deref() == Some(source.as_str())
        {
            return Err(ClipperError::ExternalTool {
                tool: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }

        tokio::fs::write(&request.destination, format!("{} - {}", request.start, request.end)).await?;
        Ok(())
    }
}

fn record(name: &str, description: &str) -> MediaRecord {
    MediaRecord::new(name, format!("https://example.com/{}", sanitize_name(name)), "1:00:00", description)
}

fn match_all(records: &[MediaRecord], keywords: &[&str]) -> Vec<MatchResult> {
    KeywordMatcher::from_raw(keywords).match_records(&ChapterExtractor::default(), records)
}

async fn create_sources(dir: &Path, records: &[MediaRecord]) {
    for record in records {
        let source = dir.join(format!("{}.mp4", sanitize_name(&record.display_name)));
        tokio::fs::write(source, b"media").await.unwrap();
    }
}

fn splitter(tool: Arc<FakeTool>, workers: usize) -> ChapterSplitter {
    ChapterSplitter::new(tool, WorkerPool::new(workers))
}

#[tokio::test]
async fn test_three_chapters_three_clips() {
    let sources = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let records = vec![record(
        "Episode 1",
        "Our guest is Jane Doe. She writes about money.\n\
         0:00 bitcoin intro\n10:00 bitcoin mining\n20:00 cooking\n30:00 bitcoin future",
    )];
    create_sources(sources.path(), &records).await;

    let tool = Arc::new(FakeTool::default());
    let items = match_all(&records, &["bitcoin"]);
    let reports = splitter(Arc::clone(&tool), 2)
        .split_all(sources.path(), output.path(), &items)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.status, ProcessingStatus::Completed);
    assert_eq!(report.clips.len(), 3);
    assert_eq!(tool.request_count(), 3);

    let item_dir = output.path().join("Episode_1");
    for stem in ["bitcoin_intro", "bitcoin_mining", "bitcoin_future"] {
        assert!(item_dir.join(format!("{}.mp4", stem)).exists());
    }

    assert_eq!(read_guest(&item_dir).await.unwrap(), "Our guest is Jane Doe");

    let manifest = tokio::fs::read_to_string(item_dir.join("info.txt")).await.unwrap();
    assert_eq!(
        manifest,
        "Episode 1\n\
         bitcoin intro, 00:00:00, 00:10:00\n\
         bitcoin mining, 00:10:00, 00:20:00\n\
         bitcoin future, 00:30:00, 01:00:00\n"
    );
}

#[tokio::test]
async fn test_existing_destination_writes_nothing() {
    let sources = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let records = vec![record("Episode 1", "0:00 bitcoin intro\n10:00 bitcoin mining")];
    create_sources(sources.path(), &records).await;
    tokio::fs::create_dir(output.path().join("Episode_1")).await.unwrap();

    let tool = Arc::new(FakeTool::default());
    let items = match_all(&records, &["bitcoin"]);
    let reports = splitter(Arc::clone(&tool), 1)
        .split_all(sources.path(), output.path(), &items)
        .await
        .unwrap();

    assert_eq!(reports[0].status, ProcessingStatus::Failed);
    assert!(matches!(reports[0].error, Some(ClipperError::AlreadyExists { .. })));
    assert_eq!(tool.request_count(), 0);
    assert!(!output.path().join("Episode_1/info.txt").exists());
}

#[tokio::test]
async fn test_empty_source_directory() {
    let sources = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let records = vec![record("Episode 1", "0:00 bitcoin intro")];
    let items = match_all(&records, &["bitcoin"]);

    let err = splitter(Arc::new(FakeTool::default()), 1)
        .split_all(sources.path(), output.path(), &items)
        .await
        .unwrap_err();
    assert!(matches!(err, ClipperError::EmptyInput(_)));
}

#[tokio::test]
async fn test_missing_source_fails_only_that_item() {
    let sources = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let records: Vec<MediaRecord> = (1..=5)
        .map(|i| record(&format!("Episode {}", i), "0:00 bitcoin intro\n15:00 bitcoin outro"))
        .collect();
    create_sources(sources.path(), &records).await;
    // Item 3 has no source file
    tokio::fs::remove_file(sources.path().join("Episode_3.mp4")).await.unwrap();

    let items = match_all(&records, &["bitcoin"]);
    let reports = splitter(Arc::new(FakeTool::default()), 3)
        .split_all(sources.path(), output.path(), &items)
        .await
        .unwrap();

    let names: Vec<&str> = reports.iter().map(|r| r.output_name.as_str()).collect();
    assert_eq!(names, vec!["Episode_1", "Episode_2", "Episode_3", "Episode_4", "Episode_5"]);

    for (index, report) in reports.iter().enumerate() {
        if index == 2 {
            assert_eq!(report.status, ProcessingStatus::Failed);
            assert!(matches!(report.error, Some(ClipperError::Io(_))));
            assert!(!report.output_dir.exists());
            continue;
        }

        assert_eq!(report.status, ProcessingStatus::Completed);
        let manifest = ClipManifest::read_from(&report.output_dir, "info.txt").await.unwrap();
        assert_eq!(manifest.title, report.display_name);
        assert_eq!(manifest.chapters.len(), 2);
    }
}

#[tokio::test]
async fn test_failing_tool_on_one_item_does_not_stop_the_others() {
    let sources = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let records: Vec<MediaRecord> = (1..=5)
        .map(|i| record(&format!("Episode {}", i), "0:00 bitcoin intro\n15:00 bitcoin outro"))
        .collect();
    create_sources(sources.path(), &records).await;

    let tool = Arc::new(FakeTool::failing_for_source("Episode_3.mp4"));
    let items = match_all(&records, &["bitcoin"]);
    let reports = splitter(Arc::clone(&tool), 2)
        .split_all(sources.path(), output.path(), &items)
        .await
        .unwrap();

    // Every chapter of every item was attempted
    assert_eq!(tool.request_count(), 10);

    for (index, report) in reports.iter().enumerate() {
        let manifest = ClipManifest::read_from(&report.output_dir, "info.txt").await.unwrap();
        assert_eq!(manifest.title, report.display_name);

        if index == 2 {
            assert_eq!(report.output_name, "Episode_3");
            assert_eq!(report.status, ProcessingStatus::Partial);
            assert_eq!(report.failures.len(), 2);
            assert!(report.clips.is_empty());
            assert!(manifest.chapters.is_empty());
        } else {
            assert_eq!(report.status, ProcessingStatus::Completed);
            assert_eq!(report.clips.len(), 2);
            let names: Vec<&str> = manifest.chapters.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec!["bitcoin intro", "bitcoin outro"]);
        }
    }
}

#[tokio::test]
async fn test_failing_chapter_is_left_out_of_manifest() {
    let sources = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let records = vec![record(
        "Episode 1",
        "0:00 bitcoin intro\n10:00 bitcoin mining\n20:00 bitcoin future",
    )];
    create_sources(sources.path(), &records).await;

    let items = match_all(&records, &["bitcoin"]);
    let reports = splitter(Arc::new(FakeTool::failing_on("bitcoin_mining")), 1)
        .split_all(sources.path(), output.path(), &items)
        .await
        .unwrap();

    let report = &reports[0];
    assert_eq!(report.status, ProcessingStatus::Partial);
    assert_eq!(report.clips.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].chapter, "bitcoin mining");
    assert!(matches!(report.failures[0].error, ClipperError::ExternalTool { .. }));

    let manifest = ClipManifest::read_from(&report.output_dir, "info.txt").await.unwrap();
    let names: Vec<&str> = manifest.chapters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["bitcoin intro", "bitcoin future"]);
}

#[tokio::test]
async fn test_pipeline_end_to_end() {
    let sources = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let records = vec![
        record("Episode 1", "0:00 intro\n5:00 bitcoin basics\n12:00 sponsor read\n14:00 closing"),
        record("Episode 2", "0:00 intro\n20:00 cooking"),
        record("Episode 3", "0:00 intro\n50:00 bitcoin sponsor segment"),
        record("Episode 4", "1:00 bitcoin and banks"),
    ];
    create_sources(sources.path(), &records).await;

    let config = ConfigBuilder::new().with_workers(2).build();
    let tool = Arc::new(FakeTool::default());
    let pipeline = ChapterPipeline::new(config, tool);

    let keywords = vec!["bitcoin".to_string(), "-sponsor".to_string()];
    let result = pipeline
        .run(&records, &keywords, sources.path(), output.path())
        .await
        .unwrap();

    assert_eq!(result.summary.episodes, 2);
    assert_eq!(result.summary.chapter_names, vec!["bitcoin basics", "bitcoin and banks"]);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 0);
    assert_eq!(result.clips, 2);

    let outline = tokio::fs::read_to_string(output.path().join("outline.txt")).await.unwrap();
    assert_eq!(
        outline,
        "OUTLINE\n\
         00:00:00 - bitcoin basics, Episode 1\n\
         00:07:00 - bitcoin and banks, Episode 4\n"
    );

    let concat = tokio::fs::read_to_string(output.path().join("media.txt")).await.unwrap();
    assert_eq!(concat.lines().count(), 2);
    assert!(concat.contains("Episode_1/bitcoin_basics.mp4"));

    let guest = read_guest(&output.path().join("Episode_4")).await.unwrap();
    assert_eq!(guest, "1:00 bitcoin and banks");
    assert!(title_card(&guest, "bitcoin and banks").ends_with("Chapter:\n\nbitcoin and banks"));

    let report: serde_json::Value = serde_json::from_str(
        &tokio::fs::read_to_string(output.path().join("pipeline_results.json")).await.unwrap(),
    )
    .unwrap();
    assert_eq!(report["clips"], 2);

    // The outline can be rebuilt from the manifests alone
    let rebuilt = Outline::from_manifests(output.path(), "info.txt").await.unwrap();
    assert_eq!(rebuilt, result.outline);
}

#[tokio::test]
async fn test_concat_list_resolves_from_relative_output_dir() {
    let sources = TempDir::new().unwrap();
    // Relative to the working directory, like the default `./output`
    let output = TempDir::new_in(".").unwrap();
    let output_dir = Path::new(".").join(output.path().file_name().unwrap());
    assert!(output_dir.is_relative());

    let records = vec![
        record("Guest One", "Jane Doe, economist. More below.\n0:00 bitcoin basics\n9:00 closing"),
        record("Guest Two", "John Roe.\n0:00 bitcoin history"),
    ];
    create_sources(sources.path(), &records).await;

    let config = ConfigBuilder::new().with_workers(2).build();
    let pipeline = ChapterPipeline::new(config, Arc::new(FakeTool::default()));
    let result = pipeline
        .run(&records, &["bitcoin".to_string()], sources.path(), &output_dir)
        .await
        .unwrap();
    assert_eq!(result.clips, 2);

    let list_path = output_dir.join("media.txt");
    let list_dir = list_path.parent().unwrap().to_path_buf();
    let text = tokio::fs::read_to_string(&list_path).await.unwrap();

    for line in text.lines() {
        let entry = line
            .strip_prefix("file '")
            .and_then(|rest| rest.strip_suffix('\''))
            .unwrap()
            .replace("'\\''", "'");
        // Entries are read relative to the list file's own directory
        assert!(list_dir.join(&entry).exists(), "unresolvable concat entry {}", entry);
    }

    assert_eq!(read_guest(&output_dir.join("Guest_One")).await.unwrap(), "Jane Doe, economist");
}
