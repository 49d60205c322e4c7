//! Runs a scenario body between a setup precondition and a guaranteed
//! teardown.
//!
//! Each run gets its own [`OutputSink`]; the body writes its status lines to
//! the sink rather than to the process stdout, and the captured text is
//! asserted on afterwards. Teardown runs on every exit path.

use std::error::Error as StdError;
use std::fmt::Display;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sweep::SweepSummary;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that fail a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Raised when the precondition could not be established.
    #[error("setup failed: {message}")]
    Setup {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
    /// Raised when the scenario body fails.
    #[error("scenario body failed: {message}")]
    Action {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
    /// Raised when teardown fails after the body succeeded.
    #[error("teardown failed: {message}")]
    Teardown {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
    /// Raised when the captured output lacks the expected text.
    #[error("expected output to contain {expected:?}, got {output:?}")]
    Assertion {
        /// Substring the output should contain.
        expected: String,
        /// Captured output.
        output: String,
    },
}

/// Cloneable in-memory writer handed to a scenario body.
#[derive(Clone, Debug, Default)]
pub struct OutputSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl OutputSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything written so far, replacing invalid UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Result of one scenario run.
#[derive(Debug)]
pub struct TestOutcome {
    /// Identifier correlating this run's log lines.
    pub scenario_id: Uuid,
    /// Scenario name.
    pub name: String,
    /// Text the body wrote to its sink.
    pub output: String,
    /// Teardown summary when teardown succeeded.
    pub sweep: Option<SweepSummary>,
    /// First failure, if any.
    pub failure: Option<ScenarioError>,
}

impl TestOutcome {
    /// Whether the scenario passed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Converts the outcome into a `Result`, keeping the failure.
    ///
    /// # Errors
    ///
    /// Returns the scenario's failure when it did not pass.
    pub fn into_result(self) -> Result<String, ScenarioError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.output),
        }
    }
}

/// A named scenario with an optional expectation on its output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scenario {
    name: String,
    expected_output: Option<String>,
}

impl Scenario {
    /// Creates a scenario with no output expectation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_output: None,
        }
    }

    /// Requires the captured output to contain `needle`.
    #[must_use]
    pub fn expect_output(mut self, needle: impl Into<String>) -> Self {
        self.expected_output = Some(needle.into());
        self
    }

    /// Runs `setup`, then `action` with a fresh sink, then `teardown`.
    ///
    /// The action runs once and only after setup succeeds. Teardown always
    /// runs. Failures are reported in order of occurrence; a teardown failure
    /// that follows an earlier failure is appended to that failure's message.
    pub async fn run<Setup, SetupError, Action, ActionFuture, ActionError, Teardown, TeardownError>(
        &self,
        setup: Setup,
        action: Action,
        teardown: Teardown,
    ) -> TestOutcome
    where
        Setup: Future<Output = Result<(), SetupError>>,
        SetupError: StdError + Send + Sync + 'static,
        Action: FnOnce(OutputSink) -> ActionFuture,
        ActionFuture: Future<Output = Result<(), ActionError>>,
        ActionError: StdError + Send + Sync + 'static,
        Teardown: Future<Output = Result<SweepSummary, TeardownError>>,
        TeardownError: StdError + Send + Sync + 'static,
    {
        let scenario_id = Uuid::new_v4();
        let sink = OutputSink::new();
        info!(scenario = %self.name, id = %scenario_id, "starting scenario");

        let primary = match setup.await {
            Err(err) => Some(Phase::Setup(Box::new(err))),
            Ok(()) => action(sink.clone())
                .await
                .err()
                .map(|err| Phase::Action(Box::new(err))),
        };

        let (sweep, teardown_error) = match teardown.await {
            Ok(summary) => (Some(summary), None),
            Err(err) => {
                warn!(scenario = %self.name, id = %scenario_id, error = %err, "teardown failed");
                (None, Some(Box::new(err) as BoxError))
            }
        };

        let output = sink.contents();
        let failure = match (primary, teardown_error) {
            (Some(phase), teardown) => Some(phase.into_error(teardown.as_ref())),
            (None, Some(source)) => Some(ScenarioError::Teardown {
                message: source.to_string(),
                source,
            }),
            (None, None) => self.check_output(&output),
        };

        match &failure {
            None => info!(scenario = %self.name, id = %scenario_id, "scenario passed"),
            Some(err) => warn!(
                scenario = %self.name,
                id = %scenario_id,
                error = %err,
                "scenario failed"
            ),
        }

        TestOutcome {
            scenario_id,
            name: self.name.clone(),
            output,
            sweep,
            failure,
        }
    }

    fn check_output(&self, output: &str) -> Option<ScenarioError> {
        let expected = self.expected_output.as_ref()?;
        if output.contains(expected.as_str()) {
            return None;
        }
        Some(ScenarioError::Assertion {
            expected: expected.clone(),
            output: output.to_owned(),
        })
    }
}

enum Phase {
    Setup(BoxError),
    Action(BoxError),
}

impl Phase {
    fn into_error(self, teardown_error: Option<&BoxError>) -> ScenarioError {
        match self {
            Self::Setup(source) => ScenarioError::Setup {
                message: append_teardown_note(source.to_string(), teardown_error),
                source,
            },
            Self::Action(source) => ScenarioError::Action {
                message: append_teardown_note(source.to_string(), teardown_error),
                source,
            },
        }
    }
}

fn append_teardown_note<E: Display>(message: String, teardown_error: Option<&E>) -> String {
    if let Some(teardown) = teardown_error {
        format!("{message} (teardown also failed: {teardown})")
    } else {
        message
    }
}
