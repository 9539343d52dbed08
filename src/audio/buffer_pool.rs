// BufferPool - lock-free buffer pool with dual SPSC queues
//
// Implements an object pool pattern using two lock-free SPSC (Single Producer Single Consumer)
// ring buffers for real-time audio processing. This design avoids heap allocations in the
// audio callback thread, ensuring glitch-free capture.
//
// Architecture:
// - DATA queue: capture thread pushes filled hop buffers, analysis thread consumes
// - POOL queue: analysis thread returns empty buffers, capture thread recycles
//
// Buffer flow:
// 1. Capture thread pops empty buffer from POOL queue
// 2. Capture thread fills buffer with one hop of samples
// 3. Capture thread pushes the filled buffer, tagged with the sample index
//    of its first sample, to the DATA queue
// 4. Analysis thread pops tagged buffer from DATA queue
// 5. Analysis thread processes data
// 6. Analysis thread pushes empty buffer back to POOL queue
//
// When the pool is exhausted (analysis falling behind), the capture thread
// drops the hop instead of queueing: stale drum-hit detections are worse
// than missed ones. The sample-index tag keeps downstream timestamps exact
// even across dropped hops.

use rtrb::{Consumer, Producer};

/// Configuration constants for buffer pool
pub const DEFAULT_BUFFER_COUNT: usize = 16;
pub const DEFAULT_HOP_SIZE: usize = 2048;

/// Audio buffer type - pre-allocated vector of f32 samples
pub type AudioBuffer = Vec<f32>;

/// A filled hop tagged with the engine-timeline index of its first sample
pub type TaggedBuffer = (u64, AudioBuffer);

/// Queue endpoints owned by the capture thread
pub struct AudioThreadChannels {
    /// Producer for sending filled hop buffers to the analysis thread
    pub data_producer: Producer<TaggedBuffer>,
    /// Consumer for retrieving empty buffers in the capture thread
    pub pool_consumer: Consumer<AudioBuffer>,
}

/// Queue endpoints owned by the analysis thread
pub struct AnalysisThreadChannels {
    /// Consumer for receiving filled hop buffers in the analysis thread
    pub data_consumer: Consumer<TaggedBuffer>,
    /// Producer for returning empty buffers from the analysis thread
    pub pool_producer: Producer<AudioBuffer>,
}

/// Split buffer pool channels for producer/consumer separation
///
/// This struct is returned by BufferPool::new() and provides
/// ownership-based access to the dual-queue system.
pub struct BufferPoolChannels {
    pub data_producer: Producer<TaggedBuffer>,
    pub data_consumer: Consumer<TaggedBuffer>,
    pub pool_producer: Producer<AudioBuffer>,
    pub pool_consumer: Consumer<AudioBuffer>,
}

impl BufferPoolChannels {
    /// Split into the per-thread endpoint pairs
    pub fn split_for_threads(self) -> (AudioThreadChannels, AnalysisThreadChannels) {
        (
            AudioThreadChannels {
                data_producer: self.data_producer,
                pool_consumer: self.pool_consumer,
            },
            AnalysisThreadChannels {
                data_consumer: self.data_consumer,
                pool_producer: self.pool_producer,
            },
        )
    }
}

/// Lock-free buffer pool using dual SPSC ring buffers
///
/// Pre-allocates a fixed number of audio buffers and manages them through
/// two lock-free queues. This design is safe for real-time audio threads
/// because all heap allocations happen during initialization.
///
/// # Thread Safety
/// - Lock-free: No mutex locks in queue operations
/// - Wait-free: Push/pop operations have bounded execution time
pub struct BufferPool;

impl BufferPool {
    /// Create a new BufferPool with specified buffer count and size
    ///
    /// Returns BufferPoolChannels directly with pre-allocated buffers.
    ///
    /// # Arguments
    /// * `buffer_count` - Number of buffers to pre-allocate (typical: 8-32)
    /// * `buffer_size` - Capacity of each buffer in f32 samples (one hop)
    ///
    /// # Panics
    /// Panics if buffer_count is 0 or buffer_size is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(buffer_count: usize, buffer_size: usize) -> BufferPoolChannels {
        assert!(buffer_count > 0, "buffer_count must be greater than 0");
        assert!(buffer_size > 0, "buffer_size must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(buffer_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(buffer_count);

        // Pre-allocate all buffers and fill the pool queue.
        // This is the only place where heap allocation occurs.
        for _ in 0..buffer_count {
            let buffer = AudioBuffer::with_capacity(buffer_size);
            pool_producer
                .push(buffer)
                .expect("Failed to push buffer to pool queue during initialization");
        }

        BufferPoolChannels {
            data_producer,
            data_consumer,
            pool_producer,
            pool_consumer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_creation() {
        let mut channels = BufferPool::new(16, 2048);

        // All buffers should be in the pool queue initially
        let mut available_buffers = 0;
        while channels.pool_consumer.pop().is_ok() {
            available_buffers += 1;
        }
        assert_eq!(available_buffers, 16, "Expected 16 buffers in pool queue");

        // Data queue should be empty
        assert!(
            channels.data_consumer.pop().is_err(),
            "Data queue should be empty initially"
        );
    }

    #[test]
    fn test_buffer_capacity() {
        let hop_size = 2048;
        let mut channels = BufferPool::new(1, hop_size);

        let buffer = channels
            .pool_consumer
            .pop()
            .expect("Should have one buffer in pool");
        assert!(
            buffer.capacity() >= hop_size,
            "Buffer capacity should cover one hop"
        );
        assert!(buffer.is_empty(), "Pool buffers start empty");
    }

    #[test]
    fn test_buffer_circulation() {
        let mut channels = BufferPool::new(4, 1024);

        // Simulate capture thread: pop from pool, fill, push tagged to data
        let mut buffer = channels
            .pool_consumer
            .pop()
            .expect("Should have buffer in pool");
        buffer.push(1.0);
        channels
            .data_producer
            .push((4096, buffer))
            .expect("Should push to data queue");

        // Simulate analysis thread: pop from data, process, return to pool
        let (start_sample, mut buffer) = channels
            .data_consumer
            .pop()
            .expect("Should have buffer in data queue");
        assert_eq!(start_sample, 4096, "Sample tag should be preserved");
        assert_eq!(buffer[0], 1.0, "Buffer data should be preserved");
        buffer.clear();
        channels
            .pool_producer
            .push(buffer)
            .expect("Should return buffer to pool");

        // Verify buffer is back in pool
        let buffer = channels
            .pool_consumer
            .pop()
            .expect("Buffer should be back in pool");
        assert!(buffer.is_empty(), "Returned buffer should be cleared");
    }

    #[test]
    fn test_split_for_threads() {
        let channels = BufferPool::new(2, 512);
        let (mut audio, mut analysis) = channels.split_for_threads();

        let mut buffer = audio.pool_consumer.pop().unwrap();
        buffer.push(0.5);
        audio.data_producer.push((0, buffer)).unwrap();

        let (start_sample, buffer) = analysis.data_consumer.pop().unwrap();
        assert_eq!(start_sample, 0);
        assert_eq!(buffer[0], 0.5);
        analysis.pool_producer.push(buffer).unwrap();
    }

    #[test]
    fn test_send() {
        fn assert_send<T: Send>() {}
        // Producer and Consumer are Send (can be moved between threads)
        // but not Sync, which is correct for the SPSC pattern
        assert_send::<Producer<TaggedBuffer>>();
        assert_send::<Consumer<TaggedBuffer>>();
        assert_send::<AudioThreadChannels>();
        assert_send::<AnalysisThreadChannels>();
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut channels = BufferPool::new(2, 512);

        // Drain the pool
        let a = channels.pool_consumer.pop().unwrap();
        let b = channels.pool_consumer.pop().unwrap();
        assert!(
            channels.pool_consumer.pop().is_err(),
            "Pool should be exhausted"
        );

        // Capture policy on exhaustion is to drop the hop, so nothing else
        // happens until the analysis side recycles
        channels.pool_producer.push(a).unwrap();
        channels.pool_producer.push(b).unwrap();
        assert!(channels.pool_consumer.pop().is_ok());
    }

    #[test]
    #[should_panic(expected = "buffer_count must be greater than 0")]
    fn test_zero_buffer_count_panics() {
        BufferPool::new(0, 1024);
    }

    #[test]
    #[should_panic(expected = "buffer_size must be greater than 0")]
    fn test_zero_buffer_size_panics() {
        BufferPool::new(16, 0);
    }
}
