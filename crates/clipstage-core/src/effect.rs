//! Block processing trait.
//!
//! The [`BlockProcessor`] trait is the injected processing contract between
//! a host scheduler and a stage: the host owns the buffers and decides when
//! to call, the processor mutates one block in place and returns.
//!
//! ## Design Decisions
//!
//! - **Block based**: oversampling works on whole blocks (the FIR history is
//!   carried between blocks), so the unit of work is a slice, not a sample.
//!
//! - **Object-safe**: usable as `dyn BlockProcessor` when the host picks the
//!   processor at runtime.
//!
//! - **No allocations**: all methods are meant to be called from real-time
//!   audio callbacks.

/// Core trait for in-place block processors.
///
/// # Example
///
/// ```rust
/// use clipstage_core::BlockProcessor;
///
/// struct Trim(f32);
///
/// impl BlockProcessor for Trim {
///     fn process_block(&mut self, block: &mut [f32]) {
///         for s in block.iter_mut() {
///             *s *= self.0;
///         }
///     }
///
///     fn reset(&mut self) {}
/// }
///
/// let mut trim = Trim(0.5);
/// let mut block = [1.0f32; 4];
/// trim.process_block(&mut block);
/// assert_eq!(block, [0.5; 4]);
/// ```
pub trait BlockProcessor {
    /// Process one block in place.
    ///
    /// An empty block is a valid no-op.
    fn process_block(&mut self, block: &mut [f32]);

    /// Clear internal state (filter memories, histories) without touching
    /// parameters.
    fn reset(&mut self);

    /// Processing latency in samples. Default returns 0.
    fn latency_samples(&self) -> usize {
        0
    }
}

impl<P: BlockProcessor + ?Sized> BlockProcessor for &mut P {
    fn process_block(&mut self, block: &mut [f32]) {
        (**self).process_block(block);
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn latency_samples(&self) -> usize {
        (**self).latency_samples()
    }
}
