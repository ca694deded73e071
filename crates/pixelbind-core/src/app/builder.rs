//! LoaderBuilder - ローダーの構築とワイヤリング
//!
//! # 起動時検証（Fail-fast）
//! - workers が 0 なら BuildError::ZeroWorkers
//! - tokio runtime が見つからなければ BuildError::NoRuntime

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::domain::DecodeMode;
use crate::impls::{AbortingFatalSink, ImageCrateDecoder};
use crate::ports::{Clock, Decoder, FatalSink, IdGenerator, SystemClock, UlidGenerator};

use super::completion_loop::CompletionLoop;
use super::loader::ImageLoader;
use super::status::StatusBoard;
use super::worker_loop::WorkerLoop;

/// Loader settings. Every field has a default, so a config file only needs
/// the fields it changes.
///
/// ```json
/// { "workers": 4, "default_mode": "grayscale", "multi_image": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Upper bound on concurrent decodes.
    pub workers: usize,
    pub default_mode: DecodeMode,
    /// Allow `load_image_multi`.
    pub multi_image: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            default_mode: DecodeMode::default(),
            multi_image: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl LoaderConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// BuildError はローダー構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("no tokio runtime available: {0}. Call build() inside a runtime or pass one with runtime().")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// LoaderBuilder は ImageLoader と CompletionLoop を組み立てる
///
/// # 使用例
/// ```ignore
/// let (loader, completions) = ImageLoader::builder()
///     .workers(4)
///     .build()?;
/// tokio::spawn(completions.run());
/// let img = loader.load_image_async("photo.png", DecodeMode::Color).await?;
/// ```
///
/// Unset collaborators default to `ImageCrateDecoder`, `AbortingFatalSink`,
/// `SystemClock` and the current tokio runtime.
pub struct LoaderBuilder {
    config: LoaderConfig,
    decoder: Option<Arc<dyn Decoder>>,
    fatal_sink: Option<Arc<dyn FatalSink>>,
    clock: Option<Arc<dyn Clock>>,
    runtime: Option<Handle>,
}

impl LoaderBuilder {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
            decoder: None,
            fatal_sink: None,
            clock: None,
            runtime: None,
        }
    }

    /// Replace the whole config.
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn default_mode(mut self, mode: DecodeMode) -> Self {
        self.config.default_mode = mode;
        self
    }

    pub fn multi_image(mut self, enabled: bool) -> Self {
        self.config.multi_image = enabled;
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn fatal_sink(mut self, sink: Arc<dyn FatalSink>) -> Self {
        self.fatal_sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Run workers on this runtime instead of the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<(ImageLoader, CompletionLoop), BuildError> {
        if self.config.workers == 0 {
            return Err(BuildError::ZeroWorkers);
        }
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()?,
        };

        let decoder: Arc<dyn Decoder> = match self.decoder {
            Some(decoder) => decoder,
            None => Arc::new(ImageCrateDecoder::new()),
        };
        let fatal_sink: Arc<dyn FatalSink> = match self.fatal_sink {
            Some(sink) => sink,
            None => Arc::new(AbortingFatalSink),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));

        let status = Arc::new(StatusBoard::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = WorkerLoop::new(decoder, self.config.workers, tx, clock, Arc::clone(&status));

        log::info!(
            "image loader ready: {} workers, default mode {}, multi-image {}",
            self.config.workers,
            self.config.default_mode,
            if self.config.multi_image { "on" } else { "off" }
        );

        Ok((
            ImageLoader::new(runtime, worker, ids, self.config),
            CompletionLoop::new(rx, fatal_sink, status),
        ))
    }
}

impl Default for LoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let cfg = LoaderConfig::from_json_str(r#"{"default_mode": "grayscale"}"#).unwrap();
        assert_eq!(cfg.default_mode, DecodeMode::Grayscale);
        assert!(cfg.multi_image);
        assert!(cfg.workers >= 1);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let err = LoaderConfig::from_json_str(r#"{"threads": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"workers": 3, "multi_image": false}}"#).unwrap();

        let cfg = LoaderConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.workers, 3);
        assert!(!cfg.multi_image);
        assert_eq!(cfg.default_mode, DecodeMode::Color);
    }

    #[test]
    fn missing_config_file_names_the_path() {
        let err = LoaderConfig::from_path("no/such/config.json").unwrap_err();
        assert!(err.to_string().contains("no/such/config.json"));
    }

    #[tokio::test]
    async fn build_success() {
        let (loader, _completions) = LoaderBuilder::new().workers(2).build().unwrap();
        assert_eq!(loader.config().workers, 2);
        assert_eq!(loader.default_mode(), DecodeMode::Color);
    }

    #[tokio::test]
    async fn build_rejects_zero_workers() {
        let result = LoaderBuilder::new().workers(0).build();
        assert!(matches!(result, Err(BuildError::ZeroWorkers)));
    }

    #[test]
    fn build_outside_runtime_fails() {
        let result = LoaderBuilder::new().build();
        assert!(matches!(result, Err(BuildError::NoRuntime(_))));
    }

    #[test]
    fn build_with_explicit_runtime() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let result = LoaderBuilder::new().runtime(rt.handle().clone()).build();
        assert!(result.is_ok());
    }
}
