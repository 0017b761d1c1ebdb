//! Pipeline stages for page triage.
//!
//! Each submodule implements exactly one step and is a pure function of its
//! inputs, so every stage can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ detect ──▶ fusion ──▶ strategy   (per-page decision)
//! features ──┤
//!            └─▶ regions ──▶ merge                 (per-page region list)
//! ```
//!
//! 1. [`features`]: query the document once per signal into an immutable
//!    [`features::FeatureCache`]
//! 2. [`text`]: figure-number caption/reference analysis and the quick
//!    text-only screen
//! 3. [`detect`]: the detector registry; detectors may run concurrently
//!    under a per-detector timeout
//! 4. [`fusion`]: order-independent combination of candidates
//! 5. [`strategy`]: decision table from classification to processing method
//! 6. [`regions`]: table, image and shape-cluster regions
//! 7. [`merge`]: greedy overlap merge and caption binding

pub mod detect;
pub mod features;
pub mod fusion;
pub mod merge;
pub mod regions;
pub mod strategy;
pub mod text;
