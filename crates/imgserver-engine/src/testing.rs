//! Test doubles and fixtures shared by the engine's unit tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgb, RgbImage};
use imgserver_core::{ImageFormat, Size};
use imgserver_db::MemoryItemRepository;
use imgserver_processing::{CodecResult, ImageCodec, ImageHandle, ImageRsCodec};
use tempfile::TempDir;

use crate::consistency::ConsistencyPolicy;
use crate::processor::{ImageRequestProcessor, ProcessorConfig};

/// Real codec that counts calls and can slow down resizing to widen race windows.
#[derive(Default)]
pub struct CountingCodec {
    inner: ImageRsCodec,
    opens: AtomicUsize,
    resizes: AtomicUsize,
    saves: AtomicUsize,
    delay_ms: AtomicU64,
}

impl CountingCodec {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn resizes(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

impl ImageCodec for CountingCodec {
    fn open(&self, path: &Path) -> CodecResult<ImageHandle> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(path)
    }

    fn verify(&self, handle: &ImageHandle) -> CodecResult<()> {
        self.inner.verify(handle)
    }

    fn resize_crop_to_fit(&self, handle: &ImageHandle, target: Size) -> CodecResult<ImageHandle> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        self.inner.resize_crop_to_fit(handle, target)
    }

    fn save(&self, handle: &ImageHandle, path: &Path, format: ImageFormat) -> CodecResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(handle, path, format)
    }
}

pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Jpeg)
        .unwrap();
    path
}

pub fn fast_policy() -> ConsistencyPolicy {
    ConsistencyPolicy::new(50, Duration::from_millis(10))
}

/// Processor over `<tempdir>/data` with an in-memory store and a counting codec.
pub fn fixture_processor() -> (
    TempDir,
    ImageRequestProcessor,
    Arc<CountingCodec>,
    Arc<MemoryItemRepository>,
) {
    let dir = tempfile::tempdir().unwrap();
    let codec = Arc::new(CountingCodec::default());
    let repo = Arc::new(MemoryItemRepository::new());
    let processor = ImageRequestProcessor::new(
        ProcessorConfig::new(dir.path().join("data")).with_consistency(fast_policy()),
        repo.clone(),
        codec.clone(),
    )
    .unwrap();
    (dir, processor, codec, repo)
}
