// SPDX-License-Identifier: MIT
pub mod console;
mod error;
mod rag;
pub mod render;
mod session;
mod state;

#[cfg(test)]
mod mock;

// re-export
pub use error::ClientError;
pub use rag::{
    ClientConfig, Direction, IndexStatus, QueryRequest, QueryResult, RagService, RetrievedEntry,
    UploadRequest, UploadResult, BACKEND_ENV, DEFAULT_BACKEND,
};
pub use session::{Outcome, Session, QUERY_FAILED, UPLOAD_FAILED};
pub use state::{BusyGuard, Notice, Operation, Phase, Store, UiState};
