//! Builder API for assembling machine definitions.
//!
//! The builder is a plain data assembler: it collects the initial state,
//! one handler per state, optional graph edges and the default run
//! configuration, and validates them once in `build`. It has no runtime
//! behavior of its own.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::MachineBuilder;
