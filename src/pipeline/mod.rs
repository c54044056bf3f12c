//! Pipeline stages for one Markdown conversion.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the orchestrator in [`crate::convert`] reads as a straight
//! sequence.
//!
//! ## Data Flow
//!
//! ```text
//! stage ──▶ args ──▶ tool ──▶ collect
//! (temp .md) (flags)  (pandoc)  (poll, read, delete)
//! ```
//!
//! 1. [`stage`]: compose the cover block and write the Markdown into a
//!    unique scratch directory
//! 2. [`args`]: merge metadata over format defaults and build the
//!    converter command line
//! 3. [`tool`]: spawn the converter, await its exit, keep bounded stderr
//! 4. [`collect`]: wait for the output file, read it, remove it

pub mod args;
pub mod collect;
pub mod stage;
pub mod tool;
