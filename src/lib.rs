//! Per-pixel reduction, outlier filtering and band selection for
//! hyperspectral cubes.
//!
//! ```text
//!  cube ──► reduce ──► quartile ──► filter ──► filtered records
//!    │
//!    └────► band ──► good pixels ──► interpolate ──► classify
//! ```
//!
//! The [`analysis`] and [`classify`] modules are pure and return
//! [`Result`]; [`data`] and [`pipeline`] handle files and report through
//! `log`.

pub mod analysis;
pub mod classify;
pub mod data;
pub mod error;
pub mod pipeline;

pub use error::{HyperspecError, Result};
