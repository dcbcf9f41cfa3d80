//! Block exchange contract between a host scheduler and the stage.
//!
//! The host owns block storage. Each cycle the stage asks for one input
//! block, processes it in place, hands it to [`emit`](BlockHost::emit) for
//! delivery downstream and returns ownership with
//! [`release_block`](BlockHost::release_block). A host with nothing to
//! offer returns `None` and the cycle is a no-op.

/// A source and sink of audio blocks.
///
/// # Example
///
/// A pull host over an in-memory signal:
///
/// ```rust
/// use clipstage_effects::{BlockHost, NonlinearStage, StageConfig};
///
/// struct Pull {
///     input: std::vec::IntoIter<Vec<f32>>,
///     output: Vec<f32>,
/// }
///
/// impl BlockHost for Pull {
///     type Block = Vec<f32>;
///
///     fn acquire_input_block(&mut self) -> Option<Vec<f32>> {
///         self.input.next()
///     }
///
///     fn emit(&mut self, block: &Vec<f32>) {
///         self.output.extend_from_slice(block);
///     }
///
///     fn release_block(&mut self, _block: Vec<f32>) {}
/// }
///
/// let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
/// stage.begin(true);
/// let mut host = Pull {
///     input: vec![vec![0.1; 128]; 4].into_iter(),
///     output: Vec::new(),
/// };
/// while stage.run_cycle(&mut host) {}
/// assert_eq!(host.output.len(), 512);
/// ```
pub trait BlockHost {
    /// Mutable sample storage handed to the stage for one call.
    type Block: AsMut<[f32]>;

    /// Next input block, or `None` when nothing is available this cycle.
    fn acquire_input_block(&mut self) -> Option<Self::Block>;

    /// Deliver a processed block downstream.
    fn emit(&mut self, block: &Self::Block);

    /// Return a block to the host after it was emitted.
    fn release_block(&mut self, block: Self::Block);
}
