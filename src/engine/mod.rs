//! Core engine: the fetch → evaluate → persist loop.

pub mod scanner;

pub use scanner::{CycleReport, Scanner};
