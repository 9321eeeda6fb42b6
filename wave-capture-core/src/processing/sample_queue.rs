use std::collections::VecDeque;

/// FIFO of interleaved i16 samples between a device callback and the reader.
///
/// Unlike a ring buffer it never drops samples: the capture contract forbids
/// loss, so the queue grows until the reader catches up. Pushes and pops are
/// expected in whole frames; the queue itself does not track channel layout.
#[derive(Debug, Default)]
pub struct SampleQueue {
    samples: VecDeque<i16>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append samples at the back of the queue.
    pub fn push(&mut self, samples: &[i16]) {
        self.samples.extend(samples.iter().copied());
    }

    /// Move up to `out.len()` samples from the front of the queue into `out`.
    ///
    /// Returns the number of samples written.
    pub fn pop_into(&mut self, out: &mut [i16]) -> usize {
        let count = out.len().min(self.samples.len());
        for (slot, sample) in out.iter_mut().zip(self.samples.drain(..count)) {
            *slot = sample;
        }
        count
    }

    /// Number of samples waiting to be read.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
