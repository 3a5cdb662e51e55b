use std::fmt;

use crate::expr::SourceKind;
use crate::resolver::FlowAnalysis;

/// One export row, ready for rendering.
///
/// Every analyzed flow produces exactly one record. Flows whose definition
/// could not be fetched or parsed still produce one, with [`parse_error`]
/// set and the analytical fields empty.
///
/// [`parse_error`]: FlowRecord::parse_error
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    pub flow_name: String,
    pub flow_id: String,
    /// Humanized trigger category, `Unknown` for failed flows.
    pub trigger_type: String,
    /// Flattened action names in document order.
    pub actions: Vec<String>,
    /// Written field names, first-write order.
    pub modified_attributes: Vec<String>,
    /// Payload fields read anywhere in the document.
    pub read_attributes: Vec<String>,
    /// Field name and provenance kind, unique per field.
    pub source_types: Vec<(String, SourceKind)>,
    pub has_set_value: bool,
    /// Statically named entities, trigger first.
    pub entities: Vec<String>,
    /// Why analysis never ran, when it did not.
    pub parse_error: Option<String>,
}

impl FlowRecord {
    /// Every record carries the same document category.
    pub const FLOW_TYPE: &'static str = "Cloud Flow";

    /// Builds the record for a successfully analyzed flow.
    pub fn from_analysis(
        flow_name: impl Into<String>,
        flow_id: impl Into<String>,
        analysis: FlowAnalysis,
    ) -> Self {
        FlowRecord {
            flow_name: flow_name.into(),
            flow_id: flow_id.into(),
            trigger_type: analysis.trigger_type,
            actions: analysis.action_names,
            modified_attributes: analysis.modified_attributes.into_iter().collect(),
            read_attributes: analysis.read_attributes.into_iter().collect(),
            source_types: analysis.source_kinds.into_iter().collect(),
            has_set_value: analysis.has_set_value,
            entities: analysis.entities.into_iter().collect(),
            parse_error: None,
        }
    }

    /// Builds the stub record for a flow whose definition never reached
    /// the analyzer.
    pub fn failed(
        flow_name: impl Into<String>,
        flow_id: impl Into<String>,
        error: impl fmt::Display,
    ) -> Self {
        FlowRecord {
            flow_name: flow_name.into(),
            flow_id: flow_id.into(),
            trigger_type: "Unknown".to_string(),
            actions: Vec::new(),
            modified_attributes: Vec::new(),
            read_attributes: Vec::new(),
            source_types: Vec::new(),
            has_set_value: false,
            entities: Vec::new(),
            parse_error: Some(error.to_string()),
        }
    }
}
