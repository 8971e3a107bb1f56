//! API implementation submodules.
//!
//! Each submodule contains `impl Importer` blocks that extend the public API.
//! The struct definition remains in `lib.rs`.

mod builder;
mod dispatch;
mod options;

pub use builder::ImporterBuilder;
