//! Non-fatal problems found while composing
//!
//! Diagnostics never abort a compose run; the offending edge or value is
//! dropped and the run continues.

use std::fmt;

/// A problem attributed to one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An import reference that matches no discovered fragment
    MissingImport {
        fragment: String,
        reference: String,
        line: usize,
    },

    /// An import edge that would re-enter the current traversal path
    ImportCycle {
        fragment: String,
        reference: String,
        line: usize,
    },

    /// A directive value that could not be parsed for its key
    InvalidValue {
        fragment: String,
        key: String,
        value: String,
        line: usize,
    },

    /// An explicit target that resolves outside the project root
    TargetOutsideRoot { fragment: String, target: String },
}

impl Diagnostic {
    /// The fragment the diagnostic belongs to
    pub fn fragment(&self) -> &str {
        match self {
            Diagnostic::MissingImport { fragment, .. }
            | Diagnostic::ImportCycle { fragment, .. }
            | Diagnostic::InvalidValue { fragment, .. }
            | Diagnostic::TargetOutsideRoot { fragment, .. } => fragment,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingImport { fragment, reference, line } => write!(
                f,
                "missing import '{}' in {} referenced at line {}",
                reference, fragment, line
            ),
            Diagnostic::ImportCycle { fragment, reference, line } => write!(
                f,
                "import cycle: {} imports '{}' at line {} which is already being composed; edge dropped",
                fragment, reference, line
            ),
            Diagnostic::InvalidValue { fragment, key, value, line } => write!(
                f,
                "invalid {} value '{}' in {} at line {}; ignored",
                key, value, fragment, line
            ),
            Diagnostic::TargetOutsideRoot { fragment, target } => write!(
                f,
                "target '{}' in {} points outside the project root; using default routing",
                target, fragment
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_import_message_names_reference_and_line() {
        let d = Diagnostic::MissingImport {
            fragment: "a.agents.md".to_string(),
            reference: "@missing.md".to_string(),
            line: 3,
        };
        let text = d.to_string();
        assert!(text.starts_with("missing import"));
        assert!(text.contains("@missing.md"));
        assert!(text.contains("line 3"));
        assert_eq!(d.fragment(), "a.agents.md");
    }
}
