//! Frames and the capture→render handoff channel
//!
//! A [`Frame`] is the immutable unit delivered to rendering; ownership
//! transfers from the capture thread to the render loop on enqueue. The
//! [`FrameChannel`] is a bounded single-producer/single-consumer queue
//! with drop-oldest-on-full publishing, preserving the latest-wins
//! delivery contract even when the renderer falls behind.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Angular magnitude response for one beamformed track
#[derive(Debug, Clone)]
pub struct BeamResponse {
    /// Track slot this beam is steered at
    pub slot: usize,
    /// Steer azimuth in degrees
    pub azimuth: f32,
    /// Response magnitude over the fixed angle grid
    pub magnitudes: Vec<f32>,
}

impl BeamResponse {
    /// Magnitudes normalized to a unit peak, as the display plots them
    pub fn normalized(&self) -> Vec<f32> {
        let peak = self.magnitudes.iter().cloned().fold(0.0f32, f32::max);
        if peak > 0.0 {
            self.magnitudes.iter().map(|m| m / peak).collect()
        } else {
            self.magnitudes.clone()
        }
    }
}

/// One rendered-ready unit of pipeline output. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Index of the audio block this frame was computed from
    pub block_index: u64,
    /// Estimated source count for the block
    pub source_count: usize,
    /// Current azimuth of every track slot, in slot order
    pub azimuths: Vec<f32>,
    /// Localization pseudo-spectrum over the candidate grid, when the
    /// block produced one
    pub spectrum: Option<Vec<f32>>,
    /// Beam responses for the selected strongest tracks
    pub beams: Vec<BeamResponse>,
}

/// Bounded SPSC handoff from the capture thread to the render loop
pub struct FrameChannel {
    queue: ArrayQueue<Frame>,
    dropped_count: AtomicUsize,
    published_count: AtomicUsize,
}

impl FrameChannel {
    /// Create a channel holding at most `capacity` pending frames
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            dropped_count: AtomicUsize::new(0),
            published_count: AtomicUsize::new(0),
        }
    }

    /// Enqueue a frame, evicting the oldest pending frame if the queue is
    /// full. Never blocks and never fails; called from the capture thread.
    pub fn publish(&self, frame: Frame) {
        let mut frame = frame;
        loop {
            match self.queue.push(frame) {
                Ok(()) => break,
                Err(rejected) => {
                    // full: evict the oldest and retry with the same frame
                    if self.queue.pop().is_some() {
                        self.dropped_count.fetch_add(1, Ordering::Relaxed);
                    }
                    frame = rejected;
                }
            }
        }
        self.published_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Drain every pending frame and return only the most recent one;
    /// `None` if nothing is pending. Frames skipped here count as dropped.
    pub fn drain_latest(&self) -> Option<Frame> {
        let mut latest = None;
        while let Some(frame) = self.queue.pop() {
            if latest.is_some() {
                self.dropped_count.fetch_add(1, Ordering::Relaxed);
            }
            latest = Some(frame);
        }
        latest
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Frames evicted or skipped since creation
    pub fn dropped_count(&self) -> usize {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Frames published since creation
    pub fn published_count(&self) -> usize {
        self.published_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_latest_wins() {
        let channel = FrameChannel::new(8);
        channel.publish(frame(1));
        channel.publish(frame(2));
        channel.publish(frame(3));

        let latest = channel.drain_latest().unwrap();
        assert_eq!(latest.block_index, 3);
        assert!(channel.drain_latest().is_none());
    }

    #[test]
    fn test_drop_oldest_on_full() {
        let channel = FrameChannel::new(2);
        channel.publish(frame(1));
        channel.publish(frame(2));
        channel.publish(frame(3)); // evicts 1

        assert_eq!(channel.dropped_count(), 1);
        let latest = channel.drain_latest().unwrap();
        assert_eq!(latest.block_index, 3);
    }

    #[test]
    fn test_empty_drain() {
        let channel = FrameChannel::new(4);
        assert!(channel.drain_latest().is_none());
        assert!(channel.is_empty());
    }

    #[test]
    fn test_publish_counts() {
        let channel = FrameChannel::new(4);
        for i in 0..10 {
            channel.publish(frame(i));
        }
        assert_eq!(channel.published_count(), 10);
        // 6 evicted on publish, 3 skipped on drain, 1 delivered
        let latest = channel.drain_latest().unwrap();
        assert_eq!(latest.block_index, 9);
        assert_eq!(channel.dropped_count(), 9);
    }

    #[test]
    fn test_normalized_beam_response() {
        let beam = BeamResponse {
            slot: 0,
            azimuth: 90.0,
            magnitudes: vec![1.0, 4.0, 2.0],
        };
        assert_eq!(beam.normalized(), vec![0.25, 1.0, 0.5]);
    }

    #[test]
    fn test_cross_thread_handoff() {
        use std::sync::Arc;

        let channel = Arc::new(FrameChannel::new(4));
        let producer_channel = channel.clone();

        let producer = std::thread::spawn(move || {
            for i in 0..100 {
                producer_channel.publish(frame(i));
            }
        });

        producer.join().unwrap();
        let latest = channel.drain_latest().unwrap();
        assert_eq!(latest.block_index, 99);
    }
}
