//! C++ emission from a compiled environment.
//!
//! - `snippet` - code text with attached header requirements
//! - `deps` - fragment dependency ordering
//! - `cpp` - the emitter itself

mod cpp;
mod deps;
mod snippet;

#[cfg(test)]
mod emit_tests;

pub use cpp::{Prologue, emit_env};
pub use deps::{Fragment, named_deps, sort_fragments};
pub use snippet::CppSnippet;
