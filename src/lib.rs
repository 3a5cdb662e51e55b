//! # Yurai - Flow Field Provenance Analyzer
//!
//! **Yurai** answers one question about automated workflow definitions: for
//! every record field a flow writes, where does the value come from? It
//! ingests raw JSON definitions, flattens their nested action trees, replays
//! variable state in document order, and classifies each written field as
//! coming from the trigger payload, a variable, an action output, an
//! environment parameter, or a static literal.
//!
//! ## Core Workflow
//!
//! The crate operates on a canonical internal model of a "flow definition."
//! The primary workflow is:
//!
//! 1.  **Ingest**: Stream a raw definition document into a [`FlowDefinition`](flow::FlowDefinition) with [`flow::ingest_reader`]. Unknown action types degrade instead of failing.
//! 2.  **Flatten**: Build an [`ActionGraph`](graph::ActionGraph), an ordered arena of every action with its scope path, so nested branches and loops become a single walkable sequence.
//! 3.  **Analyze**: Run a [`FlowAnalyzer`](resolver::FlowAnalyzer) over the definition. It replays a [`VariableTracker`](tracker::VariableTracker) across the graph and resolves the provenance of every field write.
//! 4.  **Export**: Turn each analysis into a [`FlowRecord`](report::FlowRecord) and render the batch with [`report::write_report`]. For whole environments, [`AnalysisPipeline`](pipeline::AnalysisPipeline) drives listing, fetching, and rate limiting end to end.
//!
//! ## Quick Start
//!
//! The following example analyzes a single definition from disk.
//!
//! ```rust,no_run
//! use yurai::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let definition = yurai::flow::ingest_file("path/to/definition.json")?;
//!     let analysis = FlowAnalyzer::new().analyze(definition);
//!
//!     for assignment in &analysis.assignments {
//!         println!(
//!             "{} writes {} from {}",
//!             assignment.action_name,
//!             assignment.field,
//!             assignment.source.kind()
//!         );
//!     }
//!     println!("reads: {:?}", analysis.read_attributes);
//!
//!     Ok(())
//! }
//! ```
//!
//! To process a whole environment, implement [`FlowStore`](store::FlowStore)
//! for your definition source and hand it to an
//! [`AnalysisPipeline`](pipeline::AnalysisPipeline):
//!
//! ```rust,ignore
//! let pipeline = AnalysisPipeline::new(my_store);
//! let records = pipeline.run_to_writer(std::fs::File::create("report.txt")?)?;
//! println!("{}", pipeline.governor().summary());
//! ```

pub mod error;
pub mod expr;
pub mod flow;
pub mod governor;
pub mod graph;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod resolver;
pub mod store;
pub mod tracker;
