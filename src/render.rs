//! Render loop
//!
//! A periodic thread independent of the audio clock. On every tick it
//! drains the frame channel latest-wins and redraws; if nothing arrived
//! since the last tick the previously rendered frame is retained and the
//! tick is a no-op.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::frame::{Frame, FrameChannel};

/// A surface that can redraw from a frame. The render loop drives it on
/// the render thread; no other coupling is assumed.
pub trait RenderSurface: Send {
    fn draw(&mut self, frame: &Frame);
}

/// Text surface: logs the tracked state, one line per redraw
pub struct TextSurface;

impl RenderSurface for TextSurface {
    fn draw(&mut self, frame: &Frame) {
        let azimuths: Vec<String> = frame
            .azimuths
            .iter()
            .map(|az| format!("{az:6.1}"))
            .collect();
        tracing::info!(
            block = frame.block_index,
            sources = frame.source_count,
            beams = frame.beams.len(),
            "tracks [{}]",
            azimuths.join(", ")
        );
    }
}

/// Periodic consumer of the frame channel
pub struct RenderLoop {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    /// Most recently rendered frame, for status queries from other threads
    last_frame: Arc<Mutex<Option<Frame>>>,
}

impl RenderLoop {
    /// Start the render thread, ticking every `interval`
    pub fn start(
        channel: Arc<FrameChannel>,
        mut surface: Box<dyn RenderSurface>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_for_loop = running.clone();
        let last_frame = Arc::new(Mutex::new(None));
        let last_frame_for_loop = last_frame.clone();

        let handle = thread::Builder::new()
            .name("doa-render".to_string())
            .spawn(move || {
                while running_for_loop.load(Ordering::Relaxed) {
                    thread::sleep(interval);

                    if let Some(frame) = channel.drain_latest() {
                        surface.draw(&frame);
                        *last_frame_for_loop.lock() = Some(frame);
                    }
                    // empty tick: previous frame stays current, no redraw
                }
            })?;

        Ok(Self {
            running,
            thread_handle: Some(handle),
            last_frame,
        })
    }

    /// Most recently rendered frame, if any
    pub fn last_frame(&self) -> Option<Frame> {
        self.last_frame.lock().clone()
    }

    /// Stop the render thread and join it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingSurface {
        draws: Arc<AtomicUsize>,
        last_block: Arc<AtomicUsize>,
    }

    impl RenderSurface for CountingSurface {
        fn draw(&mut self, frame: &Frame) {
            self.draws.fetch_add(1, Ordering::SeqCst);
            self.last_block
                .store(frame.block_index as usize, Ordering::SeqCst);
        }
    }

    fn frame(index: u64) -> Frame {
        Frame {
            block_index: index,
            source_count: 0,
            azimuths: Vec::new(),
            spectrum: None,
            beams: Vec::new(),
        }
    }

    #[test]
    fn test_renders_latest_pending_frame() {
        let channel = Arc::new(FrameChannel::new(8));
        let draws = Arc::new(AtomicUsize::new(0));
        let last_block = Arc::new(AtomicUsize::new(usize::MAX));

        channel.publish(frame(1));
        channel.publish(frame(2));
        channel.publish(frame(3));

        let mut render_loop = RenderLoop::start(
            channel.clone(),
            Box::new(CountingSurface {
                draws: draws.clone(),
                last_block: last_block.clone(),
            }),
            Duration::from_millis(5),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        render_loop.stop();

        // all three pending frames collapsed into one redraw of the latest
        assert_eq!(draws.load(Ordering::SeqCst), 1);
        assert_eq!(last_block.load(Ordering::SeqCst), 3);
        assert_eq!(render_loop.last_frame().unwrap().block_index, 3);
    }

    #[test]
    fn test_empty_ticks_are_noops() {
        let channel = Arc::new(FrameChannel::new(8));
        let draws = Arc::new(AtomicUsize::new(0));
        let last_block = Arc::new(AtomicUsize::new(usize::MAX));

        let mut render_loop = RenderLoop::start(
            channel,
            Box::new(CountingSurface {
                draws: draws.clone(),
                last_block,
            }),
            Duration::from_millis(5),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(40));
        render_loop.stop();

        assert_eq!(draws.load(Ordering::SeqCst), 0);
        assert!(render_loop.last_frame().is_none());
    }
}
