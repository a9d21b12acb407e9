//! Pull-based stream engine
//!
//! A [`Pipeline`] is a source plus a chain of [`Stage`]s. Nothing runs until
//! [`Pipeline::subscribe`] is called and the returned [`Subscription`] is
//! driven with [`Subscription::run`]. The engine keeps exactly one frame in
//! flight: the next frame is requested only after the previous one has been
//! through every stage and handed to the sink.
//!
//! ```no_run
//! use ascii_stream::pipeline::compose;
//! use ascii_stream::{ConversionConfig, Filter, GlyphConverter, ImageSource, MarkupRenderer};
//!
//! # async fn demo(bitmap: image::RgbaImage) -> ascii_stream::Result<()> {
//! let subscription = compose(ImageSource::from_bitmap(bitmap))
//!     .pipe(Filter::contrast(0.2))
//!     .pipe(GlyphConverter::new(ConversionConfig::new(120, 60)))
//!     .pipe(MarkupRenderer::default())
//!     .subscribe(|markup| println!("{}", markup.to_html()));
//! subscription.run().await?;
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{Result, StreamError};
use crate::frame::Frame;
use crate::source::FrameSource;

/// One synchronous step of a pipeline
pub trait Stage {
    type Input;
    type Output;

    fn process(&mut self, input: Self::Input) -> Result<Self::Output>;
}

/// Passes frames through untouched; the head of every pipeline
pub struct Identity<T>(PhantomData<fn(T) -> T>);

impl<T> Default for Identity<T> {
    fn default() -> Self {
        Identity(PhantomData)
    }
}

impl<T> Stage for Identity<T> {
    type Input = T;
    type Output = T;

    fn process(&mut self, input: T) -> Result<T> {
        Ok(input)
    }
}

/// Two stages run back to back; built by [`Pipeline::pipe`]
pub struct Then<A, B> {
    first: A,
    second: B,
    cancel: CancelToken,
}

impl<A, B> Stage for Then<A, B>
where
    A: Stage,
    B: Stage<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn process(&mut self, input: A::Input) -> Result<B::Output> {
        let intermediate = self.first.process(input)?;
        // a stage may have disposed the subscription
        if self.cancel.is_cancelled() {
            return Err(StreamError::Disposed);
        }
        self.second.process(intermediate)
    }
}

/// Stage built from a closure, see [`map`]
pub struct Map<F, I, O> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

/// Wraps a fallible closure as a stage
pub fn map<I, O, F>(f: F) -> Map<F, I, O>
where
    F: FnMut(I) -> Result<O>,
{
    Map {
        f,
        _marker: PhantomData,
    }
}

impl<I, O, F> Stage for Map<F, I, O>
where
    F: FnMut(I) -> Result<O>,
{
    type Input = I;
    type Output = O;

    fn process(&mut self, input: I) -> Result<O> {
        (self.f)(input)
    }
}

/// Shared cancellation flag; wakes a run parked on its source when set
#[derive(Clone)]
struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    fn cancel(&self) {
        self.tx.send_replace(true);
    }

    fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// A cold, composable pipeline
pub struct Pipeline<S, St> {
    source: S,
    stages: St,
    cancel: CancelToken,
}

/// Starts a pipeline from a frame source
pub fn compose<S: FrameSource>(source: S) -> Pipeline<S, Identity<Frame>> {
    Pipeline {
        source,
        stages: Identity::default(),
        cancel: CancelToken::new(),
    }
}

impl<S, St> Pipeline<S, St>
where
    S: FrameSource,
    St: Stage<Input = Frame>,
{
    /// Appends a stage fed by the current last stage
    pub fn pipe<N>(self, next: N) -> Pipeline<S, Then<St, N>>
    where
        N: Stage<Input = St::Output>,
    {
        Pipeline {
            source: self.source,
            stages: Then {
                first: self.stages,
                second: next,
                cancel: self.cancel.clone(),
            },
            cancel: self.cancel,
        }
    }

    /// Binds a sink for the final stage's output. No frame is pulled until
    /// [`Subscription::run`] is awaited.
    pub fn subscribe<K>(self, sink: K) -> Subscription<S, St, K>
    where
        K: FnMut(St::Output),
    {
        Subscription {
            source: self.source,
            stages: self.stages,
            sink,
            handle: SubscriptionHandle {
                cancel: self.cancel,
            },
        }
    }
}

/// How a subscription finished without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The source completed
    Ended { frames: u64 },
    /// The handle was disposed
    Disposed { frames: u64 },
}

impl Completion {
    /// Number of artifacts handed to the sink
    pub fn frames(&self) -> u64 {
        match *self {
            Completion::Ended { frames } | Completion::Disposed { frames } => frames,
        }
    }
}

/// Disposable handle to a running subscription; cheap to clone
#[derive(Clone)]
pub struct SubscriptionHandle {
    cancel: CancelToken,
}

impl SubscriptionHandle {
    /// Stops the subscription. Safe to call at any time and more than once,
    /// including from inside a stage or the sink.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// One run of source → stages → sink
pub struct Subscription<S, St, K> {
    source: S,
    stages: St,
    sink: K,
    handle: SubscriptionHandle,
}

impl<S, St, K> Subscription<S, St, K>
where
    S: FrameSource,
    St: Stage<Input = Frame>,
    K: FnMut(St::Output),
{
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Drives the subscription to completion.
    ///
    /// Returns the first source or stage error; frames delivered before it
    /// stay delivered. The source is closed on every exit path.
    pub async fn run(self) -> Result<Completion> {
        let Subscription {
            mut source,
            mut stages,
            mut sink,
            handle,
        } = self;

        let mut cancelled = handle.cancel.watch();
        let mut frames = 0u64;
        log::debug!("subscription started");

        let outcome = loop {
            if handle.is_disposed() {
                break Ok(Completion::Disposed { frames });
            }

            let next = tokio::select! {
                biased;
                _ = cancelled.wait_for(|disposed| *disposed) => {
                    break Ok(Completion::Disposed { frames });
                }
                next = source.next_frame() => next,
            };

            let frame = match next {
                None => break Ok(Completion::Ended { frames }),
                Some(Err(err)) => break Err(err),
                Some(Ok(frame)) => frame,
            };

            if handle.is_disposed() {
                break Ok(Completion::Disposed { frames });
            }

            log::trace!("frame {} {}x{}", frames, frame.width(), frame.height());
            match stages.process(frame) {
                Ok(output) => {
                    if handle.is_disposed() {
                        break Ok(Completion::Disposed { frames });
                    }
                    sink(output);
                    frames += 1;
                }
                Err(StreamError::Disposed) => break Ok(Completion::Disposed { frames }),
                Err(err) => break Err(err),
            }
        };

        source.close();
        match &outcome {
            Ok(completion) => log::debug!("subscription finished: {completion:?}"),
            Err(err) => log::debug!("subscription failed after {frames} frames: {err}"),
        }
        outcome
    }
}
