//! Compose engine for agents-md
//!
//! Contains the core composition logic without any I/O concerns:
//! directive parsing, import resolution, routing, rendering and limits.

pub mod relpath;
mod directive;
mod diagnostic;
mod fragment;
mod graph;
mod router;
mod truncate;
mod composer;
mod report;

pub use directive::{parse_directive, strip_directives, Directive, ImportRef, RejectedValue, TargetSelector};
pub use diagnostic::Diagnostic;
pub use fragment::{Fragment, FRAGMENT_DIR, FRAGMENT_SUFFIX};
pub use graph::{resolve_reference, CycleLog, ImportGraph, Step};
pub use router::{glob_root, output_in, DefaultTarget, Route, Router, OUTPUT_FILE};
pub use truncate::{truncate, TruncateScope, TruncateStrategy, Truncation, ELISION_MARKER};
pub use composer::{compose, ComposeOptions, Composition, Document, Output, SourceEntry};
pub use report::{summarize, JsonReport, LimitReport, Limits, Totals};
