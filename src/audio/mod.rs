//! Audio subsystem module

pub mod block;
pub mod capture;
pub mod device;

pub use block::AudioBlock;
pub use capture::AudioCapture;
pub use device::{get_device_by_id, get_default_input_device, list_devices, AudioDevice};
