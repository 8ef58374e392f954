// SPDX-License-Identifier: MIT
//!
//! Plain text view of [`UiState`]
//!

use crate::rag::{IndexStatus, QueryResult};
use crate::state::{Operation, Phase, UiState};

/// `Indexed rows: 42 • Vector dim: 1536`, unknown dimension shown as `—`
pub fn status_line(status: &IndexStatus) -> String {
    let dim = status
        .vector_dim
        .map(|dim| dim.to_string())
        .unwrap_or_else(|| "—".to_string());
    format!("Indexed rows: {} • Vector dim: {}", status.indexed_rows, dim)
}

/// Label of the upload or query trigger in the given phase
pub fn trigger_label(phase: Phase, trigger: Operation) -> &'static str {
    match (phase, trigger) {
        (Phase::Idle, Operation::Upload) => "Upload & Build Index",
        (Phase::Idle, Operation::Query) => "Translate",
        (Phase::Busy(_), Operation::Upload) => "Working...",
        (Phase::Busy(_), Operation::Query) => "Translating...",
    }
}

/// Translation block followed by the retrieved glossary entries
pub fn result_block(result: &QueryResult) -> String {
    let mut out = String::new();
    if !result.translation.is_empty() {
        out += "Translation\n";
        out += &result.translation;
        out += "\n";
    }
    if !result.retrieved.is_empty() {
        if !out.is_empty() {
            out += "\n";
        }
        out += "Top matches from your glossary\n";
        for entry in &result.retrieved {
            out += &format!("  EN: {}    AR: {}\n", entry.english, entry.arabic);
        }
    }
    out
}

/// Whole view: status, result, then the pending notice
pub fn render(state: &UiState) -> String {
    let mut sections = vec![];
    if let Some(status) = &state.status {
        sections.push(status_line(status));
    }
    if state.is_busy() {
        sections.push(format!(
            "[{}] [{}]",
            trigger_label(state.phase, Operation::Upload),
            trigger_label(state.phase, Operation::Query)
        ));
    }
    if let Some(result) = &state.result {
        let block = result_block(result);
        if !block.is_empty() {
            sections.push(block.trim_end().to_string());
        }
    }
    if let Some(notice) = &state.notice {
        sections.push(if notice.is_error() {
            format!("Error: {}", notice)
        } else {
            notice.to_string()
        });
    }
    sections.join("\n\n")
}
