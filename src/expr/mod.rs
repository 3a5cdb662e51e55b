use crate::error::ExpressionError;
use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, warn};

pub mod ast;
pub mod classify;
pub mod parser;
pub mod recognizer;

pub use ast::{ExprNode, LiteralValue, PropertyKey};
pub use classify::{SourceKind, ValueSource};
pub use parser::MAX_EXPRESSION_DEPTH;
pub use recognizer::recognize;

/// A classified expression: its provenance plus every payload field it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub source: ValueSource,
    pub reads: Vec<String>,
}

impl Classification {
    pub fn static_literal() -> Self {
        Classification {
            source: ValueSource::Static,
            reads: Vec::new(),
        }
    }

    pub fn unresolved() -> Self {
        Classification {
            source: ValueSource::Unresolved,
            reads: Vec::new(),
        }
    }

    fn from_node(node: &ExprNode) -> Self {
        let mut reads = Vec::new();
        classify::collect_field_refs(node, &mut reads);
        Classification {
            source: classify::classify_node(node),
            reads,
        }
    }
}

/// Outcome of one phase of the two-phase parse. Each phase is testable in
/// isolation through this type.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutcome {
    /// The phase classified the expression.
    Recognized(Classification),
    /// No fast pattern covers this shape; the grammar parser must run.
    NeedsFullParse,
    /// The grammar rejected the text, or the depth guard tripped.
    Unparseable(ExpressionError),
}

/// The two-phase expression engine.
///
/// Plain values that are not expressions classify as `static` without
/// invoking either phase. Expression values go through the fast recognizer
/// first and fall back to the grammar parser; text that survives neither
/// phase classifies as `unresolved` rather than failing the analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEngine;

impl ExpressionEngine {
    pub fn new() -> Self {
        ExpressionEngine
    }

    /// Classifies one raw value.
    pub fn classify(&self, raw: &str) -> Classification {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("@@") {
            return Classification::static_literal();
        }
        if trimmed.contains("@{") {
            return match parser::parse_template(trimmed) {
                Ok(node) => Classification::from_node(&node),
                Err(error) => {
                    warn!(expression = %trimmed, %error, "interpolation template did not parse");
                    Classification::unresolved()
                }
            };
        }
        if !trimmed.starts_with('@') {
            return Classification::static_literal();
        }

        match recognizer::recognize(trimmed) {
            PhaseOutcome::Recognized(classification) => classification,
            _ => {
                debug!(expression = %trimmed, "no fast pattern matched, running grammar parser");
                match self.full_parse(trimmed) {
                    PhaseOutcome::Recognized(classification) => classification,
                    PhaseOutcome::Unparseable(error) => {
                        warn!(expression = %trimmed, %error, "expression fell through both parse phases");
                        Classification::unresolved()
                    }
                    PhaseOutcome::NeedsFullParse => Classification::unresolved(),
                }
            }
        }
    }

    /// Phase two: builds the full AST and classifies from it.
    pub fn full_parse(&self, raw: &str) -> PhaseOutcome {
        match parser::parse_expression(raw) {
            Ok(node) => PhaseOutcome::Recognized(Classification::from_node(&node)),
            Err(error) => PhaseOutcome::Unparseable(error),
        }
    }

    /// Classifies a JSON input value. Strings are treated as raw expression
    /// text; everything else is a constant.
    pub fn classify_value(&self, value: &Value) -> Classification {
        match value {
            Value::String(s) => self.classify(s),
            _ => Classification::static_literal(),
        }
    }

    /// Collects the payload fields read by every expression nested anywhere
    /// inside a JSON input value.
    pub fn collect_reads(&self, value: &Value, out: &mut IndexSet<String>) {
        match value {
            Value::String(s) => {
                out.extend(self.classify(s).reads);
            }
            Value::Array(items) => {
                for item in items {
                    self.collect_reads(item, out);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    self.collect_reads(item, out);
                }
            }
            _ => {}
        }
    }
}
