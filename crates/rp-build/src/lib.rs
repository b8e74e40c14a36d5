//! Build orchestration for rollpack.
//!
//! This crate turns a resolved [`Config`](rp_core::Config) into output files:
//!
//! - [`Variant`] / [`BuildTask`]: per-format build passes and output paths
//! - [`ModuleCompiler`] / [`DeclarationEmitter`]: toolchain contracts
//! - [`CommandCompiler`] / [`CommandDeclarationEmitter`]: subprocess-backed
//!   implementations driven by [`ToolchainSettings`]
//! - [`BuildOrchestrator`]: sequential format passes with concurrent dispatch
//! - [`BuildStats`]: atomic counters behind the final [`BuildSummary`]
//!
//! # Failure model
//!
//! | Failure | Scope |
//! |---|---|
//! | compile or declaration error for one file | logged and counted |
//! | copy or output directory error | fails the format pass |
//! | discovery error | stops the run |

#![deny(clippy::all)]
#![warn(missing_docs)]

mod command;
mod compiler;
mod error;
mod orchestrator;
mod stats;
mod variant;

pub use command::{CommandCompiler, CommandDeclarationEmitter, ToolchainSettings};
pub use compiler::{
    CompileRequest, DeclarationEmitter, DeclarationFailure, DeclarationRequest, DeclarationSink,
    Externals, ModuleCompiler,
};
pub use error::{BuildError, CompileError};
pub use orchestrator::{BuildOrchestrator, BuildSummary, FormatReport, OrchestratorOptions};
pub use stats::{BuildStats, StatsSnapshot};
pub use variant::{BuildTask, OUTPUT_EXTENSION, Variant};
