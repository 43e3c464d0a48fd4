//! Error taxonomy shared by the analysis pipeline and both command-line tools.
//!
//! The engine surfaces errors by returning them; nothing is recovered
//! locally. An empty finding list is a successful result, not an error.

use miette::Diagnostic;
use thiserror::Error;

/// Every failure the pipeline can report to a user.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// Malformed flags or flag combinations (exit code 2).
    #[error("{0}")]
    #[diagnostic(code(deadwood::usage))]
    Usage(String),

    /// The program snapshot could not be resolved or decoded.
    #[error("load: {0}")]
    #[diagnostic(code(deadwood::load))]
    Load(String),

    /// Packages loaded but carry type-check diagnostics.
    #[error("packages contain errors: {0}")]
    #[diagnostic(code(deadwood::typecheck))]
    Type(String),

    /// No executable package in the initial set.
    #[error("no main packages")]
    #[diagnostic(code(deadwood::no_main))]
    NoMainPackages,

    /// The RTA fixed point could not be computed.
    #[error("RTA analysis failed: {0}")]
    #[diagnostic(code(deadwood::analysis))]
    AnalysisFailed(String),

    /// `-whylive`: the named function is not part of the program.
    #[error("function {0:?} not found in program")]
    #[diagnostic(code(deadwood::whylive::not_found))]
    NotFound(String),

    /// `-whylive`: every function with the given name is unreachable.
    #[error("function {0} is dead code")]
    #[diagnostic(code(deadwood::whylive::dead))]
    IsDead(String),

    /// `-whylive`: the target is itself a root with no incoming path.
    #[error("{0} is a root")]
    #[diagnostic(code(deadwood::whylive::root))]
    IsRoot(String),

    /// `-whylive`: reachable, but no call-graph path exists even through
    /// dynamic edges. RTA does not model reflective calls.
    #[error("{0} is reachable only through reflection")]
    #[diagnostic(code(deadwood::whylive::reflective))]
    ReflectiveOnly(String),
}

impl Error {
    /// Process exit code for this failure: 2 for usage errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
