use std::io::Write;

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::flow::ingest_reader;
use crate::governor::{RateGovernor, RetryPolicy};
use crate::report::{write_report, FlowRecord};
use crate::resolver::FlowAnalyzer;
use crate::store::{FlowHandle, FlowStore};

/// Batch driver: lists a store, fetches one definition at a time through
/// the governor, and turns each into an export record.
pub struct AnalysisPipeline<S> {
    store: S,
    governor: RateGovernor,
    analyzer: FlowAnalyzer,
}

impl<S: FlowStore> AnalysisPipeline<S> {
    pub fn new(store: S) -> Self {
        AnalysisPipeline {
            store,
            governor: RateGovernor::new(),
            analyzer: FlowAnalyzer::new(),
        }
    }

    /// Shares an existing governor handle instead of a fresh one, so
    /// several pipelines can draw from one request window.
    pub fn with_governor(mut self, governor: RateGovernor) -> Self {
        self.governor = governor;
        self
    }

    /// Replaces the governor with a fresh one driven by `policy`.
    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        self.with_governor(RateGovernor::with_policy(policy))
    }

    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Analyzes every flow in the store, producing one record per flow.
    ///
    /// Only a failed listing fails the run. A flow whose definition cannot
    /// be fetched or parsed yields a stub record with `parse_error` set,
    /// and the batch moves on.
    pub fn run(&self) -> Result<Vec<FlowRecord>, PipelineError> {
        let flows = self.governor.run("list flows", || self.store.list_flows())?;
        info!(flows = flows.len(), "store listing complete");

        let mut records = Vec::with_capacity(flows.len());
        for handle in &flows {
            records.push(self.analyze_flow(handle));
        }
        Ok(records)
    }

    /// One flow, one record, never a failure.
    pub fn analyze_flow(&self, handle: &FlowHandle) -> FlowRecord {
        let reader = match self
            .governor
            .run(&handle.name, || self.store.open_definition(handle))
        {
            Ok(reader) => reader,
            Err(error) => {
                warn!(flow = %handle.name, %error, "definition fetch failed");
                return FlowRecord::failed(&handle.name, &handle.id, error);
            }
        };
        match ingest_reader(reader) {
            Ok(definition) => {
                let analysis = self.analyzer.analyze(definition);
                FlowRecord::from_analysis(&handle.name, &handle.id, analysis)
            }
            Err(error) => {
                warn!(flow = %handle.name, %error, "definition did not parse");
                FlowRecord::failed(&handle.name, &handle.id, error)
            }
        }
    }

    /// Runs the batch and writes the rendered report to `writer`.
    pub fn run_to_writer<W: Write>(&self, writer: W) -> Result<Vec<FlowRecord>, PipelineError> {
        let records = self.run()?;
        write_report(&records, writer)?;
        Ok(records)
    }
}
