//! Run report: one outcome per processed validation request.

use std::fmt;

/// What happened to one validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    /// Results were published under the given result IRI.
    Published(String),
    /// Nothing to do, e.g. the request carries no cohort query.
    Skipped(String),
    /// Processing stopped with the given error.
    Failed(String),
}

/// The outcome of one validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    /// Request IRI.
    pub request: String,
    /// What happened.
    pub status: RequestStatus,
}

impl RequestOutcome {
    /// Creates a published outcome.
    pub fn published(request: impl Into<String>, result_id: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            status: RequestStatus::Published(result_id.into()),
        }
    }

    /// Creates a skipped outcome.
    pub fn skipped(request: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            status: RequestStatus::Skipped(reason.into()),
        }
    }

    /// Creates a failed outcome.
    pub fn failed(request: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            request: request.into(),
            status: RequestStatus::Failed(error.to_string()),
        }
    }

    /// Returns true if processing failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, RequestStatus::Failed(_))
    }

    /// Returns the result IRI if results were published.
    #[must_use]
    pub fn result_id(&self) -> Option<&str> {
        match &self.status {
            RequestStatus::Published(id) => Some(id),
            _ => None,
        }
    }
}

/// Outcomes of one pass over the open validation requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRunReport {
    /// Outcomes in processing order.
    pub outcomes: Vec<RequestOutcome>,
}

impl ValidationRunReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an outcome.
    pub fn push(&mut self, outcome: RequestOutcome) {
        self.outcomes.push(outcome);
    }

    /// Returns the number of failed requests.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Returns the number of requests whose results were published.
    #[must_use]
    pub fn published_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.result_id().is_some())
            .count()
    }

    /// Returns true if no request failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }

    /// Returns the outcome for `request`.
    #[must_use]
    pub fn outcome(&self, request: &str) -> Option<&RequestOutcome> {
        self.outcomes.iter().find(|o| o.request == request)
    }
}

impl fmt::Display for ValidationRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match &outcome.status {
                RequestStatus::Published(id) => {
                    writeln!(f, "[PUBLISHED] {} -> {id}", outcome.request)?;
                }
                RequestStatus::Skipped(reason) => {
                    writeln!(f, "[SKIPPED]   {}: {reason}", outcome.request)?;
                }
                RequestStatus::Failed(error) => {
                    writeln!(f, "[FAILED]    {}: {error}", outcome.request)?;
                }
            }
        }
        write!(
            f,
            "{} request(s): {} published, {} failed",
            self.outcomes.len(),
            self.published_count(),
            self.failure_count()
        )
    }
}
