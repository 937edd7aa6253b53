//! Error types for the payload client.

use thiserror::Error;

/// Failures that can occur before or while talking to the agent.
///
/// None of these escape the public client operations; they are rendered
/// into operator-facing text at the call boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Agent unreachable, connect/read timeout, DNS failure, broken body stream.
    #[error("{}", error_chain(.0))]
    Transport(#[from] reqwest::Error),

    /// Rejected before dispatch: blank payload name, blank job id, etc.
    #[error("{0}")]
    InvalidInput(String),

    /// Base URL could not be parsed or cannot carry path segments.
    #[error("invalid agent endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

impl ClientError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Render an error together with every `source()` below it.
///
/// reqwest's top-level message ("error sending request for url ...") hides
/// the part operators care about ("Connection refused"), which lives further
/// down the chain.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        current = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|l| l as _)
        }
    }

    #[test]
    fn chain_includes_sources() {
        let err = Layer(
            "error sending request",
            Some(Box::new(Layer(
                "tcp connect error",
                Some(Box::new(Layer("Connection refused", None))),
            ))),
        );
        assert_eq!(
            error_chain(&err),
            "error sending request: tcp connect error: Connection refused"
        );
    }

    #[test]
    fn chain_skips_repeated_text() {
        let err = Layer("outer: inner", Some(Box::new(Layer("inner", None))));
        assert_eq!(error_chain(&err), "outer: inner");
    }

    #[test]
    fn invalid_input_display() {
        let err = ClientError::invalid_input("payload name cannot be empty");
        assert_eq!(err.to_string(), "payload name cannot be empty");
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }
}
