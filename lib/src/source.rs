//! Frame sources
//!
//! Every source is cold: nothing is loaded or attached until the first
//! [`FrameSource::next_frame`] call. [`FrameSource::close`] releases whatever
//! the source holds and may be called any number of times.

use image::RgbaImage;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::error::{Result, StreamError};
use crate::frame::Frame;
use crate::render::Surface;

/// Lazy sequence of frames
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Next frame, an error, or `None` once the source has completed
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Detaches capture hooks and drops pending work
    fn close(&mut self) {}
}

type BitmapLoader = Pin<Box<dyn Future<Output = Result<RgbaImage>>>>;

enum ImageState {
    Loading(BitmapLoader),
    Ready(RgbaImage),
    Done,
}

/// Still image: one frame once the bitmap is ready, then completes
pub struct ImageSource {
    state: ImageState,
}

impl ImageSource {
    /// From a bitmap the host has already decoded
    pub fn from_bitmap(bitmap: RgbaImage) -> Self {
        Self {
            state: ImageState::Ready(bitmap),
        }
    }

    /// From a host-side load (fetch + decode). The future is not polled
    /// before the first pull; any failure surfaces as `StreamError::Load`.
    pub fn from_loader<F>(loader: F) -> Self
    where
        F: Future<Output = Result<RgbaImage>> + 'static,
    {
        Self {
            state: ImageState::Loading(Box::pin(loader)),
        }
    }
}

impl FrameSource for ImageSource {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        let bitmap = match std::mem::replace(&mut self.state, ImageState::Done) {
            ImageState::Done => return None,
            ImageState::Ready(bitmap) => Ok(bitmap),
            ImageState::Loading(loader) => loader.await.map_err(|err| match err {
                StreamError::Load(reason) => StreamError::Load(reason),
                other => StreamError::Load(other.to_string()),
            }),
        };

        Some(bitmap.and_then(Frame::from_image))
    }

    fn close(&mut self) {
        self.state = ImageState::Done;
    }
}

/// Already rendered canvas or bitmap: one frame, no suspension
pub struct CanvasSource {
    bitmap: Option<RgbaImage>,
}

impl CanvasSource {
    pub fn from_image(bitmap: RgbaImage) -> Self {
        Self {
            bitmap: Some(bitmap),
        }
    }

    /// Captures the surface's current pixels
    pub fn from_surface<S: Surface + ?Sized>(surface: &S) -> Self {
        Self::from_image(surface.snapshot())
    }
}

impl FrameSource for CanvasSource {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        self.bitmap.take().map(Frame::from_image)
    }

    fn close(&mut self) {
        self.bitmap = None;
    }
}

/// Host media element able to report presented frames
///
/// `attach` installs a per-frame hook that pushes into the sink; `detach`
/// removes it. A [`VideoSource`] calls `detach` exactly once per `attach`.
pub trait VideoElement {
    fn attach(&mut self, sink: FrameSink) -> Result<()>;
    fn detach(&mut self);
}

#[derive(Debug, Clone)]
enum PlaybackEnd {
    Ended,
    Failed(String),
}

/// Host-side end of a video capture hook
#[derive(Clone)]
pub struct FrameSink {
    frames: mpsc::Sender<Frame>,
    end: Arc<watch::Sender<Option<PlaybackEnd>>>,
}

impl FrameSink {
    /// Offers a presented frame. Dropped if the previous one has not been
    /// consumed yet. Returns `false` once the consumer is gone.
    pub fn present(&self, frame: Frame) -> bool {
        match self.frames.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::trace!("video frame dropped, consumer busy");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Waits for room instead of dropping; for file-backed playback that
    /// paces itself on the consumer. Returns `false` once the consumer is gone.
    pub async fn deliver(&self, frame: Frame) -> bool {
        self.frames.send(frame).await.is_ok()
    }

    /// Playback reached its end
    pub fn end(&self) {
        self.end.send_replace(Some(PlaybackEnd::Ended));
    }

    /// Media failed mid-stream
    pub fn fail(&self, reason: impl Into<String>) {
        self.end.send_replace(Some(PlaybackEnd::Failed(reason.into())));
    }

    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }
}

enum VideoState {
    Idle,
    Attached {
        frames: mpsc::Receiver<Frame>,
        end: watch::Receiver<Option<PlaybackEnd>>,
    },
    Finished,
}

enum VideoEvent {
    Frame(Frame),
    Ended,
    Failed(String),
}

/// Live or file-backed video: one frame per presented video frame
///
/// Completes when playback ends or the source is closed. A finished source
/// cannot be restarted; build a new one over the same element instead.
pub struct VideoSource<V: VideoElement> {
    element: V,
    state: VideoState,
}

impl<V: VideoElement> VideoSource<V> {
    pub fn new(element: V) -> Self {
        Self {
            element,
            state: VideoState::Idle,
        }
    }

    pub fn element(&self) -> &V {
        &self.element
    }

    fn attach(&mut self) -> Result<()> {
        let (frame_tx, frame_rx) = mpsc::channel(1);
        let (end_tx, end_rx) = watch::channel(None);
        self.element.attach(FrameSink {
            frames: frame_tx,
            end: Arc::new(end_tx),
        })?;
        log::debug!("video capture hook attached");
        self.state = VideoState::Attached {
            frames: frame_rx,
            end: end_rx,
        };
        Ok(())
    }

    fn finish(&mut self) {
        if let VideoState::Attached { .. } = self.state {
            self.element.detach();
            log::debug!("video capture hook detached");
        }
        self.state = VideoState::Finished;
    }
}

impl<V: VideoElement> FrameSource for VideoSource<V> {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        if let VideoState::Idle = self.state
            && let Err(err) = self.attach()
        {
            self.state = VideoState::Finished;
            return Some(Err(err));
        }

        let event = match &mut self.state {
            VideoState::Idle | VideoState::Finished => return None,
            VideoState::Attached { frames, end } => {
                tokio::select! {
                    biased;
                    frame = frames.recv() => match frame {
                        Some(frame) => VideoEvent::Frame(frame),
                        None => VideoEvent::Ended,
                    },
                    changed = end.changed() => match changed {
                        Ok(()) => match end.borrow_and_update().clone() {
                            Some(PlaybackEnd::Failed(reason)) => VideoEvent::Failed(reason),
                            _ => VideoEvent::Ended,
                        },
                        Err(_) => VideoEvent::Ended,
                    },
                }
            }
        };

        match event {
            VideoEvent::Frame(frame) => Some(Ok(frame)),
            VideoEvent::Ended => {
                self.finish();
                None
            }
            VideoEvent::Failed(reason) => {
                self.finish();
                Some(Err(StreamError::Load(format!("video playback failed: {reason}"))))
            }
        }
    }

    fn close(&mut self) {
        self.finish();
    }
}

impl<V: VideoElement> Drop for VideoSource<V> {
    fn drop(&mut self) {
        self.finish();
    }
}
