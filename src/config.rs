use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chapters::InvalidTimestampPolicy;
use crate::splitter::DEFAULT_MANIFEST_NAME;

/// Configuration for the chapter splitter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Clip extraction settings
    pub splitting: SplittingConfig,

    /// Keyword matching settings
    pub matching: MatchingConfig,

    /// Output and storage settings
    pub output: OutputConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplittingConfig {
    /// Path to the ffmpeg binary
    pub ffmpeg_path: PathBuf,

    /// Extra ffmpeg output options, e.g. `["-avoid_negative_ts", "make_zero"]`
    pub ffmpeg_extra_args: Vec<String>,

    /// File name of the per-item clip manifest
    pub manifest_name: String,

    /// Handling of description lines whose timestamp cannot be parsed
    pub invalid_timestamps: InvalidTimestampPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Default keywords when none are given on the command line.
    /// A leading `-` excludes chapters containing the word.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory
    pub base_dir: PathBuf,

    /// Outline file name, appended to inside the output directory
    pub outline_file: String,

    /// ffmpeg concat-demuxer list of all produced clips
    pub concat_list_file: String,

    /// Run report file name
    pub results_file: String,

    /// Save the JSON run report
    pub save_metadata: bool,

    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Maximum number of media items split concurrently
    pub max_workers: usize,
}

impl Default for SplittingConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffmpeg_extra_args: Vec::new(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            invalid_timestamps: InvalidTimestampPolicy::Skip,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            outline_file: "outline.txt".to_string(),
            concat_list_file: "media.txt".to_string(),
            results_file: "pipeline_results.json".to_string(),
            save_metadata: true,
            log_level: "info".to_string(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(), // One item per processing unit
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            splitting: SplittingConfig::default(),
            matching: MatchingConfig::default(),
            output: OutputConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "chapter-splitter.toml",
            "config/chapter-splitter.toml",
            "/etc/chapter-splitter/config.toml",
        ];

        for path in &config_paths {
            let path = Path::new(path);
            if path.exists() {
                let mut config = Self::from_file(path)?;
                config.apply_env();
                return Ok(config);
            }
        }

        Ok(Self::from_env())
    }

    /// Load configuration from a specific TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(workers) = std::env::var("CHAPTER_SPLITTER_WORKERS") {
            match workers.parse() {
                Ok(workers) => self.performance.max_workers = workers,
                Err(_) => tracing::warn!("Ignoring invalid CHAPTER_SPLITTER_WORKERS: {}", workers),
            }
        }

        if let Ok(ffmpeg) = std::env::var("CHAPTER_SPLITTER_FFMPEG") {
            self.splitting.ffmpeg_path = PathBuf::from(ffmpeg);
        }

        if let Ok(output_dir) = std::env::var("CHAPTER_SPLITTER_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = std::env::var("CHAPTER_SPLITTER_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(keywords) = std::env::var("CHAPTER_SPLITTER_KEYWORDS") {
            self.matching.keywords = keywords
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.performance.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if !is_plain_file_name(&self.splitting.manifest_name) {
            return Err(anyhow!("manifest_name must be a plain file name, got '{}'",
                               self.splitting.manifest_name));
        }

        if !is_plain_file_name(&self.output.outline_file) {
            return Err(anyhow!("outline_file must be a plain file name, got '{}'",
                               self.output.outline_file));
        }

        if !is_plain_file_name(&self.output.concat_list_file) {
            return Err(anyhow!("concat_list_file must be a plain file name, got '{}'",
                               self.output.concat_list_file));
        }

        if !LOG_LEVELS.contains(&self.output.log_level.to_lowercase().as_str()) {
            return Err(anyhow!("log_level must be one of {}, got '{}'",
                               LOG_LEVELS.join(", "), self.output.log_level));
        }

        if self.splitting.ffmpeg_path.as_os_str().is_empty() {
            return Err(anyhow!("ffmpeg_path must not be empty"));
        }

        Ok(())
    }

    /// Default tracing filter: the configured level for this crate, `warn` for dependencies.
    /// `verbose` raises this crate to `debug`.
    pub fn log_filter(&self, verbose: bool) -> String {
        let level = if verbose {
            "debug".to_string()
        } else {
            self.output.log_level.to_lowercase()
        };
        format!("chapter_splitter={},warn", level)
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Chapter Splitter Configuration:\n\
            - Workers: {}\n\
            - FFmpeg: {}\n\
            - Manifest: {}\n\
            - Invalid timestamps: {:?}\n\
            - Default keywords: {}\n\
            - Output Directory: {}",
            self.performance.max_workers,
            self.splitting.ffmpeg_path.display(),
            self.splitting.manifest_name,
            self.splitting.invalid_timestamps,
            self.matching.keywords.join(", "),
            self.output.base_dir.display(),
        )
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn with_ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.config.splitting.ffmpeg_path = path;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.config.matching.keywords = keywords;
        self
    }

    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.config.splitting.manifest_name = name.into();
        self
    }

    pub fn with_invalid_timestamps(mut self, policy: InvalidTimestampPolicy) -> Self {
        self.config.splitting.invalid_timestamps = policy;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.output.log_level = level.into();
        self
    }

    pub fn save_metadata(mut self, enable: bool) -> Self {
        self.config.output.save_metadata = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
