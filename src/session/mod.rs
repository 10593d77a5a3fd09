use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::{BatchSummary, ValidationResult};
use crate::output::{self, ResultsTable, TableRow};
use crate::service::{ServiceError, ServiceReply, ValidationService};

/// Input problems caught before anything is sent.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Notice {
    #[error("Select at least one PDF")]
    NoFilesSelected,

    #[error("Paste JSON first.")]
    EmptyJson,

    #[error("Invalid JSON")]
    InvalidJson,
}

#[derive(Debug)]
pub enum Outcome {
    /// The cache was replaced and the table re-rendered.
    Rendered { shown: usize, total: usize },
    Rejected(Notice),
    Failed(ServiceError),
    /// A newer submission already landed; this response was dropped.
    Superseded,
}

impl Outcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Records where `valid` is false when `invalid_only` is set, otherwise all
/// of them. Relative order is kept.
pub fn filter_view(results: &[ValidationResult], invalid_only: bool) -> Vec<&ValidationResult> {
    results
        .iter()
        .filter(|r| !invalid_only || !r.valid)
        .collect()
}

#[derive(Debug, Default)]
struct SessionState {
    cache: Vec<ValidationResult>,
    show_invalid_only: bool,
    table: ResultsTable,
    last_response: Option<serde_json::Value>,
    issued: u64,
    applied: u64,
}

impl SessionState {
    fn rerender(&mut self) -> usize {
        let view = filter_view(&self.cache, self.show_invalid_only);
        let shown = view.len();
        output::render(&mut self.table, view);
        shown
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Ticket(u64);

/// One validation session: the service, the last fetched batch, the
/// "invalid only" toggle and the table they render into.
pub struct Session<S> {
    service: S,
    state: Mutex<SessionState>,
}

impl<S: ValidationService> Session<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn submit_pdfs(&self, files: &[PathBuf]) -> Outcome {
        if files.is_empty() {
            return Outcome::Rejected(Notice::NoFilesSelected);
        }
        let ticket = self.issue_ticket().await;
        let reply = self.service.validate_pdfs(files).await;
        self.complete(ticket, reply).await
    }

    pub async fn submit_json(&self, raw: &str) -> Outcome {
        let raw = raw.trim();
        if raw.is_empty() {
            return Outcome::Rejected(Notice::EmptyJson);
        }
        let payload: serde_json::Value = match serde_json::from_str(raw) {
            Ok(payload) => payload,
            Err(_) => return Outcome::Rejected(Notice::InvalidJson),
        };
        let ticket = self.issue_ticket().await;
        let reply = self.service.validate_json(&payload).await;
        self.complete(ticket, reply).await
    }

    /// Stores the checkbox state and re-renders from the cached batch.
    pub async fn set_show_invalid_only(&self, checked: bool) -> usize {
        let mut state = self.state.lock().await;
        state.show_invalid_only = checked;
        state.rerender()
    }

    pub async fn show_invalid_only(&self) -> bool {
        self.state.lock().await.show_invalid_only
    }

    pub async fn results(&self) -> Vec<ValidationResult> {
        self.state.lock().await.cache.clone()
    }

    pub async fn rows(&self) -> Vec<TableRow> {
        self.state.lock().await.table.rows().to_vec()
    }

    /// Raw body of the last applied response.
    pub async fn last_response(&self) -> Option<serde_json::Value> {
        self.state.lock().await.last_response.clone()
    }

    pub async fn summary(&self) -> BatchSummary {
        BatchSummary::from_results(&self.state.lock().await.cache)
    }

    async fn issue_ticket(&self) -> Ticket {
        let mut state = self.state.lock().await;
        state.issued += 1;
        Ticket(state.issued)
    }

    async fn complete(&self, ticket: Ticket, reply: Result<ServiceReply, ServiceError>) -> Outcome {
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => return Outcome::Failed(e),
        };
        let mut state = self.state.lock().await;
        if ticket.0 <= state.applied {
            return Outcome::Superseded;
        }
        state.applied = ticket.0;
        state.cache = reply.results;
        state.last_response = Some(reply.raw);
        let shown = state.rerender();
        Outcome::Rendered {
            shown,
            total: state.cache.len(),
        }
    }
}
