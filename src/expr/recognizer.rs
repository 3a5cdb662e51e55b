use super::classify::{ValueSource, normalize_field_ref};
use super::{Classification, PhaseOutcome};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// One anchored pattern of the fast recognizer, paired with its classifier.
struct FastPattern {
    regex: Regex,
    build: fn(&Captures) -> Classification,
}

macro_rules! fast_pattern {
    ($pattern:literal, $build:expr) => {
        FastPattern {
            regex: Regex::new($pattern).expect("fast pattern must compile"),
            build: $build,
        }
    };
}

/// The single-call shapes covering the overwhelming majority of real
/// documents. Anchored on both ends: composed expressions must fall through
/// to the grammar parser instead of being classified by an embedded fragment.
static FAST_PATTERNS: Lazy<Vec<FastPattern>> = Lazy::new(|| {
    vec![
        fast_pattern!(
            r#"^@triggerBody\(\)\s*\??\s*\[\s*['"]([^'"]+)['"]\s*\]$"#,
            |caps| {
                let field = normalize_field_ref(&caps[1]).to_string();
                Classification {
                    source: ValueSource::Trigger {
                        field: Some(field.clone()),
                    },
                    reads: vec![field],
                }
            }
        ),
        fast_pattern!(
            r#"^@triggerOutputs\(\)\s*\??\s*\[\s*['"]((?:body/)?[^'"]+)['"]\s*\]$"#,
            |caps| {
                let field = normalize_field_ref(&caps[1]).to_string();
                Classification {
                    source: ValueSource::Trigger {
                        field: Some(field.clone()),
                    },
                    reads: vec![field],
                }
            }
        ),
        fast_pattern!(r#"^@variables\(\s*['"]([^'"]+)['"]\s*\)$"#, |caps| {
            Classification {
                source: ValueSource::Variable {
                    name: caps[1].to_string(),
                },
                reads: vec![],
            }
        }),
        fast_pattern!(
            r#"^@outputs\(\s*['"]([^'"]+)['"]\s*\)\s*\??\s*\[\s*['"]((?:body/)?[^'"]+)['"]\s*\]$"#,
            |caps| {
                let field = normalize_field_ref(&caps[2]).to_string();
                Classification {
                    source: ValueSource::ActionOutput {
                        action: caps[1].to_string(),
                        field: Some(field.clone()),
                    },
                    reads: vec![field],
                }
            }
        ),
        fast_pattern!(r#"^@outputs\(\s*['"]([^'"]+)['"]\s*\)$"#, |caps| {
            Classification {
                source: ValueSource::ActionOutput {
                    action: caps[1].to_string(),
                    field: None,
                },
                reads: vec![],
            }
        }),
        fast_pattern!(
            r#"^@body\(\s*['"]([^'"]+)['"]\s*\)\s*\??\s*\[\s*['"]((?:body/)?[^'"]+)['"]\s*\]$"#,
            |caps| {
                let field = normalize_field_ref(&caps[2]).to_string();
                Classification {
                    source: ValueSource::ActionOutput {
                        action: caps[1].to_string(),
                        field: Some(field.clone()),
                    },
                    reads: vec![field],
                }
            }
        ),
        fast_pattern!(r#"^@body\(\s*['"]([^'"]+)['"]\s*\)$"#, |caps| {
            Classification {
                source: ValueSource::ActionOutput {
                    action: caps[1].to_string(),
                    field: None,
                },
                reads: vec![],
            }
        }),
        fast_pattern!(r#"^@item\(\)\s*\??\s*\[\s*['"]([^'"]+)['"]\s*\]$"#, |caps| {
            let field = normalize_field_ref(&caps[1]).to_string();
            Classification {
                source: ValueSource::Unresolved,
                reads: vec![field],
            }
        }),
        fast_pattern!(r#"^@parameters\(\s*['"]([^'"]+)['"]\s*\)$"#, |caps| {
            Classification {
                source: ValueSource::Parameter {
                    name: caps[1].to_string(),
                },
                reads: vec![],
            }
        }),
    ]
});

/// Phase one: matches the known single-call shapes without building an AST.
pub fn recognize(raw: &str) -> PhaseOutcome {
    let trimmed = raw.trim();
    for pattern in FAST_PATTERNS.iter() {
        if let Some(caps) = pattern.regex.captures(trimmed) {
            return PhaseOutcome::Recognized((pattern.build)(&caps));
        }
    }
    PhaseOutcome::NeedsFullParse
}
