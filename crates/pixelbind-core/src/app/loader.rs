//! ImageLoader - 画像ロードの受付
//!
//! Requests return immediately: a `TaskId` for handler-style loads, a
//! `LoadFuture` for future-style ones. The decode runs on the worker pool
//! and the result comes back through the `CompletionLoop`.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::domain::{DecodeError, DecodeMode, Image, ImageSource, MultiLoadError, TaskId, TaskState};
use crate::ports::{IdGenerator, NativeError};

use super::builder::{LoaderBuilder, LoaderConfig};
use super::completion::{CompletionChannel, HandlerError, LoadFuture, LoadResult, panic_message};
use super::status::LoadCounts;
use super::task::LoadTask;
use super::worker_loop::WorkerLoop;

pub struct ImageLoader {
    runtime: Handle,
    worker: WorkerLoop,
    ids: Arc<dyn IdGenerator>,
    config: LoaderConfig,
}

/// Outcome of a synchronous multi-image load.
///
/// On failure `images` is empty and `error` is set.
#[derive(Debug)]
pub struct MultiLoad {
    pub images: Vec<Image>,
    pub error: Option<MultiLoadError>,
}

impl MultiLoad {
    fn failed(error: MultiLoadError) -> Self {
        Self {
            images: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<Image>, MultiLoadError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.images),
        }
    }
}

impl ImageLoader {
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::new()
    }

    pub(crate) fn new(
        runtime: Handle,
        worker: WorkerLoop,
        ids: Arc<dyn IdGenerator>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            runtime,
            worker,
            ids,
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn default_mode(&self) -> DecodeMode {
        self.config.default_mode
    }

    pub fn counts(&self) -> LoadCounts {
        self.worker.status().snapshot()
    }

    /// Schedule a single-image load. The result goes to `channel`, exactly
    /// once, from the completion loop.
    pub fn load_image(
        &self,
        source: impl Into<ImageSource>,
        mode: DecodeMode,
        channel: CompletionChannel,
    ) -> TaskId {
        let id = self.ids.generate_task_id();
        let mut task = LoadTask::new(id, source.into(), mode, channel, self.worker.clock().now());
        if let Err(err) = task.advance(TaskState::Scheduled) {
            log::error!("{err}");
        }
        self.worker.status().scheduled();
        log::debug!("{id} scheduled: {}", task.source());

        self.runtime.spawn(self.worker.clone().run(task));
        id
    }

    /// Handler-style load.
    pub fn load_image_with<F>(&self, source: impl Into<ImageSource>, mode: DecodeMode, handler: F) -> TaskId
    where
        F: FnOnce(LoadResult) -> Result<(), HandlerError> + Send + 'static,
    {
        self.load_image(source, mode, CompletionChannel::handler(handler))
    }

    /// Future-style load.
    pub fn load_image_async(&self, source: impl Into<ImageSource>, mode: DecodeMode) -> LoadFuture {
        let (channel, fut) = CompletionChannel::future();
        self.load_image(source, mode, channel);
        fut
    }

    /// Decode every frame of `path`, synchronously on the calling thread.
    pub fn load_image_multi(&self, path: impl AsRef<Path>) -> MultiLoad {
        let path = path.as_ref();
        let decoder = self.worker.decoder.as_ref();
        if !self.config.multi_image || !decoder.supports_multi() {
            return MultiLoad::failed(MultiLoadError::Unsupported);
        }

        let outcome = match catch_unwind(AssertUnwindSafe(|| decoder.decode_multi(path))) {
            Ok(Ok(Some(frames))) if frames.is_empty() => MultiLoad::failed(MultiLoadError::NoFrames),
            Ok(Ok(Some(frames))) => MultiLoad {
                images: frames,
                error: None,
            },
            Ok(Ok(None)) => MultiLoad::failed(MultiLoadError::Unreadable),
            Ok(Err(NativeError::Unsupported)) => MultiLoad::failed(MultiLoadError::Unsupported),
            Ok(Err(err)) => MultiLoad::failed(DecodeError::Native(err.to_string()).into()),
            Err(payload) => {
                MultiLoad::failed(DecodeError::Native(panic_message(payload.as_ref())).into())
            }
        };
        match &outcome.error {
            None => log::debug!("{}: {} frames", path.display(), outcome.images.len()),
            Some(err) => log::debug!("{}: multi-image load failed: {err}", path.display()),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FatalError;
    use crate::impls::CollectingFatalSink;
    use crate::impls::ImageCrateDecoder;
    use crate::impls::image_decoder::tests::{png_bytes, write_gif, write_tiff};
    use crate::ports::{Decoder, FixedClock};
    use chrono::{TimeZone, Utc};
    use image::{DynamicImage, RgbImage};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::{self, ThreadId};
    use std::time::Duration;

    /// What the scripted decoder does on every call.
    #[derive(Clone, Copy)]
    enum Script {
        Image(u32, u32),
        Nothing,
        Fail(&'static str),
        Frames(usize),
    }

    struct ScriptedDecoder {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedDecoder {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    fn rgb(w: u32, h: u32) -> Image {
        Image::new(DynamicImage::ImageRgb8(RgbImage::new(w, h)))
    }

    impl Decoder for ScriptedDecoder {
        fn decode(&self, _: &ImageSource, _: DecodeMode) -> Result<Option<Image>, NativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Image(w, h) => Ok(Some(rgb(w, h))),
                Script::Nothing | Script::Frames(_) => Ok(None),
                Script::Fail(msg) => Err(NativeError::Format(msg.to_string())),
            }
        }

        fn decode_multi(&self, _: &Path) -> Result<Option<Vec<Image>>, NativeError> {
            match self.script {
                Script::Frames(n) => Ok(Some((0..n).map(|_| rgb(1, 1)).collect())),
                Script::Nothing => Ok(None),
                Script::Fail(msg) => Err(NativeError::Format(msg.to_string())),
                Script::Image(w, h) => Ok(Some(vec![rgb(w, h)])),
            }
        }

        fn supports_multi(&self) -> bool {
            true
        }
    }

    /// Records how many decodes overlap, and on which threads they ran.
    #[derive(Default)]
    struct ObservingDecoder {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        threads: Mutex<Vec<ThreadId>>,
    }

    impl Decoder for ObservingDecoder {
        fn decode(&self, _: &ImageSource, _: DecodeMode) -> Result<Option<Image>, NativeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.threads.lock().unwrap().push(thread::current().id());
            thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(rgb(1, 1)))
        }
    }

    fn build(
        decoder: Arc<dyn Decoder>,
        sink: Arc<CollectingFatalSink>,
    ) -> (ImageLoader, crate::app::CompletionLoop) {
        ImageLoader::builder()
            .workers(2)
            .decoder(decoder)
            .fatal_sink(sink)
            .clock(Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
            )))
            .build()
            .unwrap()
    }

    type Seen = Arc<Mutex<Vec<LoadResult>>>;

    fn recorder(seen: &Seen) -> impl FnOnce(LoadResult) -> Result<(), HandlerError> + Send + 'static {
        let seen = Arc::clone(seen);
        move |result| {
            seen.lock().unwrap().push(result);
            Ok(())
        }
    }

    #[tokio::test]
    async fn handler_gets_the_image_exactly_once() {
        let decoder = ScriptedDecoder::new(Script::Image(4, 3));
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, mut completions) = build(decoder.clone(), sink.clone());
        let seen = Seen::default();

        let id = loader.load_image_with("a.png", DecodeMode::Color, recorder(&seen));
        let report = completions.dispatch_next().await.unwrap();
        assert_eq!(report.id, id);
        assert_eq!(report.state, TaskState::Succeeded);
        assert_eq!(
            report.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
        );

        drop(loader);
        assert_eq!(completions.run().await.delivered, 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_ref().unwrap().width(), 4);
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);
        assert!(sink.errors().is_empty());
    }

    #[tokio::test]
    async fn native_error_reaches_the_handler_once() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, completions) = build(ScriptedDecoder::new(Script::Fail("corrupt")), sink);
        let seen = Seen::default();

        loader.load_image_with("a.png", DecodeMode::Color, recorder(&seen));
        drop(loader);
        let summary = completions.run().await;

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].as_ref().unwrap_err(),
            &DecodeError::Native("corrupt".into())
        );
    }

    #[tokio::test]
    async fn future_style_load_resolves() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, completions) = build(ScriptedDecoder::new(Script::Nothing), sink);

        let fut = loader.load_image_async("missing.png", DecodeMode::Grayscale);
        drop(loader);
        let dispatcher = tokio::spawn(completions.run());

        assert_eq!(fut.await.unwrap_err(), DecodeError::NotFound);
        assert_eq!(dispatcher.await.unwrap().failed, 1);
    }

    #[tokio::test]
    async fn future_is_abandoned_without_a_completion_loop() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, completions) = build(ScriptedDecoder::new(Script::Image(1, 1)), sink);
        drop(completions);

        let err = loader.load_image_async("a.png", DecodeMode::Color).await.unwrap_err();
        assert_eq!(err, DecodeError::Abandoned);
    }

    #[tokio::test]
    async fn handler_error_goes_to_the_fatal_sink() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, mut completions) = build(ScriptedDecoder::new(Script::Image(1, 1)), sink.clone());

        let id = loader.load_image_with("a.png", DecodeMode::Color, |_| Err("caller bug".into()));
        completions.dispatch_next().await.unwrap();

        assert_eq!(
            sink.errors(),
            vec![FatalError::HandlerFailed {
                task_id: id,
                message: "caller bug".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn handler_panic_goes_to_the_fatal_sink() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, mut completions) = build(ScriptedDecoder::new(Script::Nothing), sink.clone());

        let id = loader.load_image_with("a.png", DecodeMode::Color, |_| panic!("handler blew up"));
        completions.dispatch_next().await.unwrap();

        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].task_id(), id);
        assert!(matches!(errors[0], FatalError::HandlerPanicked { .. }));
        assert_eq!(loader.counts().delivered, 1);
    }

    #[tokio::test]
    async fn counts_track_outcomes() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, mut completions) = build(ScriptedDecoder::new(Script::Image(2, 2)), sink);

        for _ in 0..3 {
            loader.load_image_with("a.png", DecodeMode::Color, |_| Ok(()));
        }
        for _ in 0..3 {
            completions.dispatch_next().await.unwrap();
        }

        assert_eq!(
            loader.counts(),
            LoadCounts {
                scheduled: 0,
                running: 0,
                succeeded: 3,
                failed: 0,
                delivered: 3,
            }
        );
    }

    #[tokio::test]
    async fn single_worker_never_overlaps_decodes() {
        let decoder = Arc::new(ObservingDecoder::default());
        let (loader, mut completions) = ImageLoader::builder()
            .workers(1)
            .decoder(decoder.clone())
            .fatal_sink(Arc::new(CollectingFatalSink::new()))
            .build()
            .unwrap();

        for _ in 0..4 {
            loader.load_image_with("a.png", DecodeMode::Color, |_| Ok(()));
        }
        for _ in 0..4 {
            completions.dispatch_next().await.unwrap();
        }

        assert_eq!(decoder.peak.load(Ordering::SeqCst), 1);
        assert_eq!(decoder.threads.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn decode_runs_off_the_owning_context() {
        let owner = thread::current().id();
        let decoder = Arc::new(ObservingDecoder::default());
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, mut completions) = build(decoder.clone(), sink);

        let handler_thread = Arc::new(Mutex::new(None));
        let record = Arc::clone(&handler_thread);
        loader.load_image_with("a.png", DecodeMode::Color, move |_| {
            *record.lock().unwrap() = Some(thread::current().id());
            Ok(())
        });
        completions.dispatch_next().await.unwrap();

        let decode_threads = decoder.threads.lock().unwrap().clone();
        assert_eq!(decode_threads.len(), 1);
        assert_ne!(decode_threads[0], owner);
        assert_eq!(*handler_thread.lock().unwrap(), Some(owner));
    }

    #[tokio::test]
    async fn nonexistent_path_fails_through_its_channel() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, completions) = build(Arc::new(ImageCrateDecoder::new()), sink);
        let seen = Seen::default();

        loader.load_image_with("nonexistent/path.png", DecodeMode::Color, recorder(&seen));
        drop(loader);
        completions.run().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let message = seen[0].as_ref().unwrap_err().to_string();
        assert_eq!(message, "Could not open or find the image");
    }

    #[tokio::test]
    async fn valid_buffer_succeeds() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, completions) = build(Arc::new(ImageCrateDecoder::new()), sink);

        let fut = loader.load_image_async(png_bytes(10, 7), DecodeMode::Grayscale);
        drop(loader);
        let dispatcher = tokio::spawn(completions.run());

        let img = fut.await.unwrap();
        assert_eq!((img.width(), img.height(), img.channels()), (10, 7, 1));
        assert_eq!(dispatcher.await.unwrap().delivered, 1);
    }

    #[tokio::test]
    async fn multi_load_returns_every_gif_frame() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("anim.gif");
        write_gif(&path, 4);

        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, _completions) = build(Arc::new(ImageCrateDecoder::new()), sink);

        let out = loader.load_image_multi(&path);
        assert!(out.is_ok());
        assert_eq!(out.images.len(), 4);
    }

    #[tokio::test]
    async fn multi_load_returns_every_tiff_page() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pages.tiff");
        write_tiff(&path, 3);

        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, _completions) = build(Arc::new(ImageCrateDecoder::new()), sink);

        let out = loader.load_image_multi(&path);
        assert_eq!(out.error, None);
        assert_eq!(out.images.len(), 3);
    }

    #[tokio::test]
    async fn multi_load_of_unreadable_path_is_empty_with_error() {
        let sink = Arc::new(CollectingFatalSink::new());
        let (loader, _completions) = build(Arc::new(ImageCrateDecoder::new()), sink);

        let out = loader.load_image_multi("nonexistent/anim.gif");
        assert!(out.images.is_empty());
        assert_eq!(out.error, Some(MultiLoadError::Unreadable));
        assert_eq!(out.error.unwrap().to_string(), "Error loading file");
    }

    #[tokio::test]
    async fn multi_load_distinguishes_failures() {
        let sink = Arc::new(CollectingFatalSink::new());

        let (loader, _c) = build(ScriptedDecoder::new(Script::Frames(0)), sink.clone());
        assert_eq!(loader.load_image_multi("x.gif").error, Some(MultiLoadError::NoFrames));

        let (loader, _c) = build(ScriptedDecoder::new(Script::Fail("lzw")), sink.clone());
        assert_eq!(
            loader.load_image_multi("x.gif").into_result().unwrap_err(),
            MultiLoadError::Decode(DecodeError::Native("lzw".into()))
        );

        let (loader, _c) = build(Arc::new(ImageCrateDecoder::single_image_only()), sink.clone());
        assert_eq!(loader.load_image_multi("x.gif").error, Some(MultiLoadError::Unsupported));

        let (loader, _c) = ImageLoader::builder()
            .multi_image(false)
            .decoder(ScriptedDecoder::new(Script::Frames(2)))
            .fatal_sink(sink)
            .build()
            .unwrap();
        assert_eq!(loader.load_image_multi("x.gif").error, Some(MultiLoadError::Unsupported));
    }
}
