//! Single-import surface for the crate's everyday types.
//!
//! Pulls the analyzer front door, the batch machinery, and the public
//! error types into one namespace, so downstream code can start from
//! one `use` line.
//!
//! # Example
//!
//! ```rust,no_run
//! use yurai::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! // Ingest and analyze a single definition
//! let definition = yurai::flow::ingest_file("path/to/definition.json")?;
//! let analysis = FlowAnalyzer::new().analyze(definition);
//!
//! for assignment in &analysis.assignments {
//!     println!("{} = {}", assignment.field, assignment.source.kind());
//! }
//! # Ok(())
//! # }
//! ```

// Ingestion and the document model
pub use crate::flow::{
    ingest_file, ingest_reader, ingest_str, ActionKind, FlowDefinition, TriggerDefinition,
};

// Graph flattening and variable tracking
pub use crate::graph::{ActionGraph, ActionNode, BranchArm, ScopePath};
pub use crate::tracker::{VariableBinding, VariableTracker};

// Expression engine
pub use crate::expr::{Classification, ExpressionEngine, PhaseOutcome, SourceKind, ValueSource};

// Provenance resolution and reporting
pub use crate::report::{render_report, write_report, FlowRecord};
pub use crate::resolver::{FieldAssignment, FlowAnalysis, FlowAnalyzer};

// Batch machinery
pub use crate::governor::{RateGovernor, RateSummary, RequestOutcome, RetryPolicy};
pub use crate::pipeline::AnalysisPipeline;
pub use crate::store::{FlowHandle, FlowStore};

// Error types
pub use crate::error::{
    ExpressionError, GovernorError, IngestError, PipelineError, StoreError, TrackError,
};

// Std types that appear in most call sites
pub use std::path::Path;

// Boxed-error result for application code and doc examples
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
