//! Audio capture from the array input device
//!
//! Runs a dedicated thread owning the cpal input stream. Each hardware
//! callback deinterleaves its buffer into an [`AudioBlock`] and hands it to
//! the user-supplied block handler on the real-time thread; the handler
//! must complete within one block duration or the hardware stream will
//! overrun.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::block::AudioBlock;
use crate::audio::device::{get_default_input_device, get_device_by_id};
use crate::config::CaptureConfig;
use crate::error::AudioError;

/// Audio capture instance for the array device
pub struct AudioCapture {
    /// Device identifier, `None` for the default input
    device_id: Option<String>,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream faults (device overflow/underflow, stream errors)
    fault_rx: Option<Receiver<AudioError>>,

    /// Total blocks delivered to the handler
    blocks_captured: Arc<AtomicU64>,

    /// Stream configuration
    config: StreamConfig,
}

impl AudioCapture {
    /// Create a new capture for the configured device.
    ///
    /// Fails if the device cannot be found or probed; this is the only
    /// fatal error in the system (spec: capture-device-open failure at
    /// startup aborts before the real-time loop begins).
    pub fn new(capture_config: &CaptureConfig) -> Result<Self, AudioError> {
        let device = open_device(capture_config.device_id.as_deref())?;

        // Probe the default config so an unusable device fails here, at
        // startup, rather than inside the capture thread.
        let _ = device.default_input_config()?;

        let config = StreamConfig {
            channels: capture_config.channels,
            sample_rate: cpal::SampleRate(capture_config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(capture_config.block_size),
        };

        Ok(Self {
            device_id: capture_config.device_id.clone(),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            fault_rx: None,
            blocks_captured: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    /// Start capturing, invoking `on_block` once per hardware block on the
    /// capture thread
    pub fn start<F>(&mut self, mut on_block: F) -> Result<(), AudioError>
    where
        F: FnMut(AudioBlock) + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let device = open_device(self.device_id.as_deref())?;
        let (fault_tx, fault_rx) = bounded::<AudioError>(16);
        self.fault_rx = Some(fault_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let blocks_captured = self.blocks_captured.clone();
        let config = self.config.clone();
        let channels = self.config.channels;
        let sample_rate = self.config.sample_rate.0;

        self.blocks_captured.store(0, Ordering::SeqCst);
        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("doa-capture".to_string())
            .spawn(move || {
                let cpal_device = device.into_inner();
                let mut block_index: u64 = 0;

                let stream = cpal_device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }

                        let block =
                            AudioBlock::from_interleaved(data, channels, block_index, sample_rate);
                        block_index += 1;
                        blocks_captured.fetch_add(1, Ordering::Relaxed);

                        on_block(block);
                    },
                    move |err| {
                        // Device faults are reported but non-fatal; the
                        // stream continues.
                        let _ = fault_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            tracing::error!("Failed to start stream: {}", e);
                            return;
                        }

                        // Keep thread alive while running
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(std::time::Duration::from_millis(10));
                        }

                        // Stream is dropped here, stopping capture
                    }
                    Err(e) => {
                        tracing::error!("Failed to build stream: {}", e);
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Total blocks delivered so far
    pub fn blocks_captured(&self) -> u64 {
        self.blocks_captured.load(Ordering::Relaxed)
    }

    /// Drain one pending device fault, if any
    pub fn check_faults(&self) -> Option<AudioError> {
        self.fault_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }

    /// Get the stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Block duration implied by the configured size and rate
    pub fn block_duration(&self) -> std::time::Duration {
        let us = match self.config.buffer_size {
            cpal::BufferSize::Fixed(frames) => {
                frames as u64 * 1_000_000 / self.config.sample_rate.0 as u64
            }
            cpal::BufferSize::Default => 0,
        };
        std::time::Duration::from_micros(us)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_device(device_id: Option<&str>) -> Result<crate::audio::device::AudioDevice, AudioError> {
    match device_id {
        Some(id) => get_device_by_id(id),
        None => get_default_input_device(),
    }
}
