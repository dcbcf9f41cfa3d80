//! Clipstage Effects - the oversampled nonlinear distortion stage
//!
//! This crate assembles the clipstage-core primitives into a complete,
//! host-agnostic clipping stage:
//!
//! - [`NonlinearStage`] - Per-block orchestrator (oversample, shape, filter, smooth)
//! - [`ParameterStore`] - Controls shared between the control and audio contexts
//! - [`ParamSnapshot`] - Consistent per-block view of every derived coefficient
//! - [`StageConfig`] - Construction-time configuration (TOML with the `serde` feature)
//! - [`BlockHost`] - Block exchange contract with the host scheduler
//!
//! ## Example
//!
//! ```rust
//! use clipstage_core::DriveCurve;
//! use clipstage_effects::{NonlinearStage, StageConfig};
//!
//! let mut stage = NonlinearStage::new(StageConfig::default()).unwrap();
//! stage.begin(true);
//!
//! // Control context (any thread)
//! let params = stage.params();
//! params.set_drive(DriveCurve::Cubic, 0.7);
//! params.set_level(0.8);
//!
//! // Audio context
//! let block = stage.process(vec![0.2f32; 128]);
//! assert_eq!(block.len(), 128);
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod nonlinear;
pub mod params;

// Re-export main types at crate root
pub use config::{DEFAULT_BLOCK_LEN, DEFAULT_SAMPLE_RATE, StageConfig, TuningOverride};
pub use error::StageError;
pub use host::BlockHost;
pub use nonlinear::{NonlinearStage, StagePhase};
pub use params::{Controls, ParamSnapshot, ParameterStore, TuningTable};
