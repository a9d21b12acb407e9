/// Video example: stream a synthetic moving pattern through the pipeline
///
/// A fake video element pushes one frame per "presented" frame; the pipeline
/// converts each to glyphs and paints them incrementally onto a surface.
use ascii_stream::{
    CanvasOptions, CanvasRenderer, ConversionConfig, Filter, Frame, FrameSink, GlyphConverter,
    PaintMode, RasterSurface, RenderedFrame, Result, StreamError, VideoElement, VideoSource,
    compose, pipeline::map,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

const FRAMES: u32 = 30;

/// Stands in for a host media element
#[derive(Clone, Default)]
struct SyntheticVideo {
    sink: Rc<RefCell<Option<FrameSink>>>,
}

impl VideoElement for SyntheticVideo {
    fn attach(&mut self, sink: FrameSink) -> Result<()> {
        *self.sink.borrow_mut() = Some(sink);
        Ok(())
    }

    fn detach(&mut self) {
        self.sink.borrow_mut().take();
    }
}

/// Horizontal ramp scrolling one step per frame
fn pattern(width: u32, height: u32, step: u32) -> Result<Frame> {
    let mut raw = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..height {
        for x in 0..width {
            let v = (((x + step * 4) % width) * 255 / width) as u8;
            raw.extend_from_slice(&[v, v / 2, 255 - v, 255]);
        }
    }
    Frame::from_raw(width, height, raw)
}

async fn play(video: SyntheticVideo) -> Result<()> {
    while video.sink.borrow().is_none() {
        tokio::task::yield_now().await;
    }
    let Some(sink) = video.sink.borrow().clone() else {
        return Ok(());
    };
    for step in 0..FRAMES {
        // file-backed playback: wait for the consumer instead of dropping
        if !sink.deliver(pattern(128, 64, step)?).await {
            break;
        }
    }
    sink.end();
    Ok(())
}

async fn run() -> Result<()> {
    let video = SyntheticVideo::default();
    let conversion = ConversionConfig::new(64, 16).colored(true);
    let options = CanvasOptions {
        mode: PaintMode::Incremental,
        ..CanvasOptions::default()
    };
    let (width, height) = options.font.grid_extent(conversion.width, conversion.height);
    let surface = Rc::new(RefCell::new(RasterSurface::new(width, height)));

    let last_text = Rc::new(RefCell::new(String::new()));
    let text = last_text.clone();
    let mut glyphs = 0;
    let start = Instant::now();

    let subscription = compose(VideoSource::new(video.clone()))
        .pipe(Filter::contrast(0.3))
        .pipe(GlyphConverter::new(conversion))
        .pipe(map(move |grid: RenderedFrame| {
            *text.borrow_mut() = grid.to_text();
            Ok(grid)
        }))
        .pipe(CanvasRenderer::new(surface.clone(), options))
        .subscribe(|artifact| glyphs += artifact.glyphs);

    let (completion, played) = tokio::join!(subscription.run(), play(video));
    played?;
    let completion = completion?;

    println!("ASCII Stream - Video Example");
    println!("============================\n");
    println!(
        "{} frames, {glyphs} glyphs painted in {:.1} ms",
        completion.frames(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    println!("Last frame:\n{}\n", last_text.borrow());

    surface
        .borrow()
        .image()
        .save("video_last_frame.png")
        .map_err(|e| StreamError::Io(std::io::Error::other(e)))?;
    println!("✓ Saved last painted frame ({width}x{height}) to: video_last_frame.png");
    Ok(())
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(StreamError::Io)?;
    runtime.block_on(run())
}
