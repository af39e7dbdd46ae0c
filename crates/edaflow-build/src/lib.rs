//! edaflow build description generator
//!
//! Produces Makefiles driving FPGA toolchains:
//! - Input file classification by role
//! - Backend/architecture variants with declarative option and role checks
//! - Synthesis, place-and-route, bitstream and back-annotation stage chains
//! - Typed command lines, quoted only when serialized
//! - Deterministic Makefile serialization

pub mod command;
pub mod emit;
pub mod error;
pub mod files;
pub mod flow;
pub mod graph;
pub mod options;
pub mod variant;

// Re-export main types
pub use command::{Arg, Command};
pub use emit::{Emitter, MAKEFILE_NAME};
pub use error::{BuildError, BuildResult};
pub use files::{
    ConstraintFormat, FileClassifier, HdlLanguage, InputFile, NetlistFormat, Role,
    RoleAssignment, RoleRule, Slot,
};
pub use flow::{configure, FlowPlan, FlowRequest, HelperScript};
pub use graph::{make_escape, BuildGraph, GraphBuilder, OutputHazard, OverlapPolicy, Stage};
pub use options::{OptionSchema, OptionValue, Options};
pub use variant::{Backend, NextpnrArch, SubFlow, SymbiflowArch, Variant, Vendor};
