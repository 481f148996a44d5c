use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::browser::BrowserError;

/// The protocol step a render was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStep {
    OpenTab,
    EnablePageEvents,
    AwaitLoad,
    QueryDocument,
    FetchOuterHtml,
    CloseTab,
}

impl RenderStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStep::OpenTab => "open-tab",
            RenderStep::EnablePageEvents => "enable-page-events",
            RenderStep::AwaitLoad => "await-load",
            RenderStep::QueryDocument => "query-document",
            RenderStep::FetchOuterHtml => "fetch-outer-html",
            RenderStep::CloseTab => "close-tab",
        }
    }
}

impl fmt::Display for RenderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render failed at {step}: {source}")]
    Step {
        step: RenderStep,
        #[source]
        source: BrowserError,
    },

    #[error("page load event not received within {timeout:?}")]
    LoadTimeout { timeout: Duration },

    #[error("render cancelled by shutdown")]
    Cancelled,

    #[error("render coordinator unavailable")]
    Unavailable,
}

impl RenderError {
    pub fn step(step: RenderStep, source: BrowserError) -> Self {
        RenderError::Step { step, source }
    }

    /// The step that failed, if the failure is tied to one.
    pub fn failed_step(&self) -> Option<RenderStep> {
        match self {
            RenderError::Step { step, .. } => Some(*step),
            RenderError::LoadTimeout { .. } => Some(RenderStep::AwaitLoad),
            RenderError::Cancelled | RenderError::Unavailable => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RenderError::Step {
                source: BrowserError::Timeout { .. },
                ..
            }
            | RenderError::LoadTimeout { .. } => ErrorCategory::Timeout,
            RenderError::Step {
                step: RenderStep::OpenTab | RenderStep::CloseTab,
                ..
            } => ErrorCategory::Tab,
            RenderError::Step { .. } => ErrorCategory::Extraction,
            RenderError::Cancelled | RenderError::Unavailable => ErrorCategory::Unavailable,
        }
    }
}

#[derive(Debug, Error)]
pub enum PrerenderError {
    #[error("cannot reach automation endpoint {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: BrowserError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrerenderError {
    pub fn connection(endpoint: impl Into<String>, source: BrowserError) -> Self {
        PrerenderError::Connection {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PrerenderError::Config(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PrerenderError::Connection { .. } => ErrorCategory::Connection,
            PrerenderError::Render(err) => err.category(),
            PrerenderError::Config(_) | PrerenderError::Io(_) => ErrorCategory::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, PrerenderError>;

/// Coarse failure class, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Tab,
    Extraction,
    Timeout,
    Unavailable,
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Connection => "connection",
            ErrorCategory::Tab => "tab",
            ErrorCategory::Extraction => "extraction",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Unavailable => "unavailable",
            ErrorCategory::Config => "config",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_close_failures_are_tab_errors() {
        let open = RenderError::step(RenderStep::OpenTab, BrowserError::NoActiveTab);
        let close = RenderError::step(
            RenderStep::CloseTab,
            BrowserError::WebSocket("reset".to_string()),
        );
        assert_eq!(open.category(), ErrorCategory::Tab);
        assert_eq!(close.category(), ErrorCategory::Tab);
    }

    #[test]
    fn dom_failures_are_extraction_errors() {
        for step in [
            RenderStep::EnablePageEvents,
            RenderStep::QueryDocument,
            RenderStep::FetchOuterHtml,
        ] {
            let err = RenderError::step(step, BrowserError::MissingRoot);
            assert_eq!(err.category(), ErrorCategory::Extraction, "step {step}");
            assert_eq!(err.failed_step(), Some(step));
        }
    }

    #[test]
    fn command_timeouts_are_timeouts_regardless_of_step() {
        let err = RenderError::step(
            RenderStep::QueryDocument,
            BrowserError::Timeout {
                method: "DOM.getDocument".to_string(),
                duration: Duration::from_secs(1),
            },
        );
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn load_timeout_points_at_await_load() {
        let err = RenderError::LoadTimeout {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.failed_step(), Some(RenderStep::AwaitLoad));
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert_eq!(err.to_string(), "page load event not received within 250ms");
    }

    #[test]
    fn step_error_display_names_step() {
        let err = RenderError::step(RenderStep::QueryDocument, BrowserError::MissingRoot);
        assert_eq!(
            err.to_string(),
            "render failed at query-document: document response has no root node"
        );
    }

    #[test]
    fn render_errors_lift_into_crate_errors() {
        let err: PrerenderError = RenderError::Unavailable.into();
        assert_eq!(err.category(), ErrorCategory::Unavailable);
        assert_eq!(err.to_string(), "render coordinator unavailable");
    }

    #[test]
    fn connection_error_names_endpoint() {
        let err = PrerenderError::connection(
            "localhost:9222",
            BrowserError::ConnectionFailed {
                url: "http://localhost:9222".to_string(),
                reason: "connection refused".to_string(),
            },
        );
        assert_eq!(err.category(), ErrorCategory::Connection);
        assert!(err.to_string().starts_with("cannot reach automation endpoint localhost:9222"));
    }
}
