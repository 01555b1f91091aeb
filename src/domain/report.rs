//! Limit evaluation and the run summary
//!
//! `summarize` is a pure function over composed outputs and the configured
//! thresholds. The `limits` section is present only when at least one
//! threshold was exceeded; its absence does not distinguish "no thresholds
//! configured" from "none triggered".

use serde::{Deserialize, Serialize};

use super::composer::Output;

/// Character thresholds; unset fields are not checked
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    #[serde(alias = "warnSourceChars")]
    pub warn_source_chars: Option<usize>,

    #[serde(alias = "maxSourceChars")]
    pub max_source_chars: Option<usize>,

    #[serde(alias = "warnOutputChars")]
    pub warn_output_chars: Option<usize>,

    #[serde(alias = "maxOutputChars")]
    pub max_output_chars: Option<usize>,
}

impl Limits {
    /// True if any threshold is set. A threshold of 0 counts as unset.
    pub fn is_configured(&self) -> bool {
        [
            self.warn_source_chars,
            self.max_source_chars,
            self.warn_output_chars,
            self.max_output_chars,
        ]
        .into_iter()
        .any(|limit| enabled(limit).is_some())
    }
}

/// A zero threshold disables the check
fn enabled(limit: Option<usize>) -> Option<usize> {
    limit.filter(|&l| l > 0)
}

/// Aggregate counts over all outputs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Totals {
    pub outputs: usize,
    pub chars: usize,
    pub sources: usize,
}

/// Threshold findings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LimitReport {
    /// True if any `max_*` threshold was exceeded
    pub violated: bool,
    pub details: Vec<String>,
}

/// Machine-readable summary of a compose run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonReport {
    pub outputs: Vec<Output>,
    pub totals: Totals,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limits: Option<LimitReport>,
}

impl JsonReport {
    /// True if a hard limit was exceeded
    pub fn violated(&self) -> bool {
        self.limits.as_ref().is_some_and(|l| l.violated)
    }
}

#[derive(Clone, Copy)]
enum Severity {
    Warn,
    Max,
}

#[derive(Clone, Copy)]
enum Subject {
    Source,
    Output,
}

struct Evaluation {
    violated: bool,
    details: Vec<String>,
}

impl Evaluation {
    fn check(&mut self, path: &str, chars: usize, limit: Option<usize>, severity: Severity, subject: Subject) {
        let Some(limit) = enabled(limit) else {
            return;
        };
        if chars <= limit {
            return;
        }

        let severity_name = match severity {
            Severity::Warn => "warn",
            Severity::Max => {
                self.violated = true;
                "max"
            }
        };
        let subject_name = match subject {
            Subject::Source => "source",
            Subject::Output => "output",
        };
        self.details.push(format!(
            "{} exceeds {} {} chars ({} > {})",
            path, severity_name, subject_name, chars, limit
        ));
    }
}

/// Builds the report for a set of outputs
pub fn summarize(outputs: &[Output], limits: Option<&Limits>) -> JsonReport {
    let totals = Totals {
        outputs: outputs.len(),
        chars: outputs.iter().map(|o| o.chars).sum(),
        sources: outputs.iter().map(|o| o.sources.len()).sum(),
    };

    let mut evaluation = Evaluation {
        violated: false,
        details: Vec::new(),
    };

    if let Some(limits) = limits {
        for output in outputs {
            evaluation.check(&output.path, output.chars, limits.warn_output_chars, Severity::Warn, Subject::Output);
            evaluation.check(&output.path, output.chars, limits.max_output_chars, Severity::Max, Subject::Output);

            for source in &output.sources {
                evaluation.check(&source.path, source.chars, limits.warn_source_chars, Severity::Warn, Subject::Source);
                evaluation.check(&source.path, source.chars, limits.max_source_chars, Severity::Max, Subject::Source);
            }
        }
    }

    let limits = if evaluation.details.is_empty() {
        None
    } else {
        Some(LimitReport {
            violated: evaluation.violated,
            details: evaluation.details,
        })
    };

    JsonReport {
        outputs: outputs.to_vec(),
        totals,
        limits,
    }
}
