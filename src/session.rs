// SPDX-License-Identifier: MIT
//!
//! Status probe, upload and query controllers
//!

use crate::error::ClientError;
use crate::rag::{
    Direction, IndexStatus, QueryRequest, QueryResult, RagService, UploadRequest, UploadResult,
};
use crate::state::{Notice, Operation, Store, UiState};

pub const UPLOAD_FAILED: &str = "Upload failed";
pub const QUERY_FAILED: &str = "Query failed";

/// Settled request, failure carries the message shown to the user
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(String),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// One user session against the index service
///
/// All three controllers write through the same [`Store`]; upload and query
/// share its busy flag, so at most one of them is in flight.
pub struct Session {
    rag: RagService,
    store: Store,
}

impl Session {
    pub fn new(rag: RagService) -> Self {
        Self {
            rag,
            store: Store::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> UiState {
        self.store.snapshot()
    }

    /// Best effort status probe run at startup
    ///
    /// Failures leave the known status untouched and are only logged.
    pub async fn probe_status(&self) -> Option<IndexStatus> {
        match self.rag.status().await {
            Ok(status) => {
                log::debug!(
                    "Index status: {} rows, dim {:?}",
                    status.indexed_rows,
                    status.vector_dim
                );
                self.store.replace_status(status.clone());
                Some(status)
            }
            Err(err) => {
                log::debug!("Status probe failed: {}", err);
                None
            }
        }
    }

    /// Upload glossary spreadsheet and rebuild the index
    ///
    /// Returns `None` without any request when no file is given or another
    /// action is in flight.
    pub async fn submit_upload(
        &self,
        file: Option<&std::path::Path>,
        sheet_name: Option<&str>,
        api_key: Option<&str>,
    ) -> Option<Outcome<UploadResult>> {
        let Some(file) = file else {
            log::debug!("Upload without file ignored");
            return None;
        };
        let _busy = self.store.begin(Operation::Upload)?;

        let req = UploadRequest {
            file,
            sheet_name,
            api_key,
        };
        let outcome = match self.rag.upload(&req).await {
            Ok(uploaded) => {
                log::info!(
                    "Indexed {} rows, dim {:?}",
                    uploaded.rows_indexed,
                    uploaded.vector_dim
                );
                self.store.merge_upload(&uploaded);
                self.store.notify(Notice::Uploaded);
                Outcome::Success(uploaded)
            }
            Err(err) => self.fail(Operation::Upload, err, UPLOAD_FAILED),
        };
        Some(outcome)
    }

    /// Translate text, showing the glossary entries the server retrieved
    ///
    /// Returns `None` without any request for blank text or while another
    /// action is in flight.
    pub async fn submit_query(
        &self,
        text: &str,
        direction: Direction,
        api_key: Option<&str>,
    ) -> Option<Outcome<QueryResult>> {
        if text.trim().is_empty() {
            log::debug!("Empty query ignored");
            return None;
        }
        let _busy = self.store.begin(Operation::Query)?;

        let req = QueryRequest::new(text, direction, api_key);
        let outcome = match self.rag.query(&req).await {
            Ok(result) => {
                log::debug!("{} glossary entries retrieved", result.retrieved.len());
                self.store.show_result(result.clone());
                Outcome::Success(result)
            }
            Err(err) => self.fail(Operation::Query, err, QUERY_FAILED),
        };
        Some(outcome)
    }

    fn fail<T>(&self, op: Operation, err: ClientError, fallback: &str) -> Outcome<T> {
        log::warn!("{:?} failed: {}", op, err);
        let msg = err.user_message(fallback);
        self.store.notify(Notice::Error(msg.clone()));
        Outcome::Failure(msg)
    }
}
