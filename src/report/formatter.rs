use std::io::{self, Write};

use itertools::Itertools;

use crate::report::FlowRecord;

/// Joins multi-valued cells.
const LIST_SEPARATOR: &str = " | ";

/// Separates records in a report.
const RECORD_SEPARATOR: &str = "---";

/// Renders one record as `key: value` lines in export order.
pub fn render_record(record: &FlowRecord) -> String {
    let source_types = record
        .source_types
        .iter()
        .map(|(field, kind)| format!("{field}={kind}"))
        .join(LIST_SEPARATOR);

    let mut lines = vec![
        format!("flow_name: {}", record.flow_name),
        format!("flow_id: {}", record.flow_id),
        format!("flow_type: {}", FlowRecord::FLOW_TYPE),
        format!("trigger_type: {}", record.trigger_type),
        format!("actions: {}", record.actions.iter().join(LIST_SEPARATOR)),
        format!(
            "modified_attributes: {}",
            record.modified_attributes.iter().join(LIST_SEPARATOR)
        ),
        format!(
            "read_attributes: {}",
            record.read_attributes.iter().join(LIST_SEPARATOR)
        ),
        format!("source_types: {source_types}"),
        format!(
            "has_set_value: {}",
            if record.has_set_value { "True" } else { "False" }
        ),
        format!("entities: {}", record.entities.iter().join(LIST_SEPARATOR)),
    ];
    if let Some(error) = &record.parse_error {
        lines.push(format!("parse_error: {error}"));
    }
    lines.join("\n")
}

/// Renders a whole report, records separated by `---` lines.
pub fn render_report(records: &[FlowRecord]) -> String {
    let mut out = records
        .iter()
        .map(render_record)
        .join(&format!("\n{RECORD_SEPARATOR}\n"));
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Writes a rendered report to `writer`.
pub fn write_report<W: Write>(records: &[FlowRecord], mut writer: W) -> io::Result<()> {
    writer.write_all(render_report(records).as_bytes())?;
    writer.flush()
}
