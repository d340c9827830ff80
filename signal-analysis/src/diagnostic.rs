use std::fmt::Display;

/// A problem encountered while processing a trace which does not stop the processing.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    NoSignalsFound { trace: String },
    BackgroundUnavailable { trace: String, reason: String },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::NoSignalsFound { trace } => write!(
                f,
                "No signals were found in {trace}. Try to adjust the starting point or threshold."
            ),
            Diagnostic::BackgroundUnavailable { trace, reason } => {
                write!(f, "Background of {trace} could not be calculated: {reason}")
            }
        }
    }
}
