// Audio module - microphone capture and real-time buffer transport
//
// This module owns the capture side of the pipeline: the cpal input stream,
// the lock-free buffer pool that moves hop buffers to the analysis thread,
// and the shared level meter cell.

pub mod buffer_pool;
pub mod capture;

pub use buffer_pool::{BufferPool, BufferPoolChannels, DEFAULT_BUFFER_COUNT, DEFAULT_HOP_SIZE};
pub use capture::{load_level, store_level, CaptureEngine};
