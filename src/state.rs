// SPDX-License-Identifier: MIT
//!
//! Presentation state shared by the upload and query controllers
//!

use crate::rag::{IndexStatus, QueryResult, UploadResult};
use std::cell::RefCell;

/// Action that holds the busy flag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Query,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Busy(Operation),
}

/// Transient message shown after an action settles
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Uploaded,
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Uploaded => "Uploaded and indexed!",
            Self::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Everything the render layer needs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UiState {
    pub phase: Phase,
    /// Latest known index state, absent until a probe or upload succeeds
    pub status: Option<IndexStatus>,
    pub result: Option<QueryResult>,
    pub notice: Option<Notice>,
}

impl UiState {
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Both trigger controls are enabled only while idle
    pub fn controls_enabled(&self) -> bool {
        !self.is_busy()
    }
}

/// Single writer store for [`UiState`]
///
/// Each setter borrows the state only for its own duration, so no borrow is
/// ever held across an `.await`.
#[derive(Debug, Default)]
pub struct Store {
    state: RefCell<UiState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> UiState {
        self.state.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    /// Idle -> Busy. Clears the previous result and notice.
    ///
    /// Returns `None` while another action is in flight; the caller must not
    /// issue a request then. The busy flag is released when the guard drops.
    pub fn begin(&self, op: Operation) -> Option<BusyGuard<'_>> {
        let mut state = self.state.borrow_mut();
        if let Phase::Busy(current) = state.phase {
            log::debug!("{:?} suppressed, {:?} in flight", op, current);
            return None;
        }
        state.phase = Phase::Busy(op);
        state.result = None;
        state.notice = None;
        Some(BusyGuard { store: self })
    }

    /// Probe result replaces whatever was known
    pub fn replace_status(&self, status: IndexStatus) {
        self.state.borrow_mut().status = Some(status);
    }

    /// Upload result updates row count and dimension, other fields are kept
    pub fn merge_upload(&self, uploaded: &UploadResult) {
        let mut state = self.state.borrow_mut();
        let status = state.status.get_or_insert_with(IndexStatus::default);
        status.indexed_rows = uploaded.rows_indexed;
        status.vector_dim = uploaded.vector_dim;
    }

    pub fn show_result(&self, result: QueryResult) {
        self.state.borrow_mut().result = Some(result);
    }

    pub fn notify(&self, notice: Notice) {
        self.state.borrow_mut().notice = Some(notice);
    }

    fn finish(&self) {
        self.state.borrow_mut().phase = Phase::Idle;
    }
}

/// Busy -> Idle on drop, whatever path the controller took
#[must_use]
pub struct BusyGuard<'a> {
    store: &'a Store,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.store.finish();
    }
}
