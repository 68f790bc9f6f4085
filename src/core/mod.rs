//! Analysis core: scoring, permutation nulls, Δ scans, and the toy RG flow.

pub mod delta_scan;
pub mod deviation;
pub mod error;
pub mod fft;
pub mod force_clustering;
pub mod ladder;
pub mod permutation;
pub mod rg_flow;

pub use error::{ErrorKind, OctaveError, Result};
