//! Call list: fetch everything, replace the view, render it as a table.

use std::sync::Arc;

use chrono::Local;
use shared::protocol::Call;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{api::CallsApi, error::Result};

pub const MSG_LOADING: &str = "Loading calls...";
pub const MSG_EMPTY: &str = "No calls uploaded yet.";
pub const MSG_LOAD_FAILED: &str = "Failed to load calls.";

const HEADERS: [&str; 4] = ["Call ID", "Original Filename", "Status", "Created At"];

#[derive(Debug, Clone, PartialEq)]
pub enum CallListView {
    Loading,
    Loaded(Vec<Call>),
    Failed(String),
}

pub struct CallListViewer {
    api: Arc<dyn CallsApi>,
    view: Mutex<CallListView>,
}

impl CallListViewer {
    /// Starts in `Loading`; the first `refresh` plays the role of the
    /// on-mount fetch.
    pub fn new(api: Arc<dyn CallsApi>) -> Self {
        Self {
            api,
            view: Mutex::new(CallListView::Loading),
        }
    }

    pub async fn view(&self) -> CallListView {
        self.view.lock().await.clone()
    }

    /// Fetches the full list and replaces whatever was shown before.
    pub async fn refresh(&self) -> Result<usize> {
        *self.view.lock().await = CallListView::Loading;

        match self.api.list_calls().await {
            Ok(calls) => {
                let count = calls.len();
                info!(count, "calls loaded");
                *self.view.lock().await = CallListView::Loaded(calls);
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch calls");
                *self.view.lock().await = CallListView::Failed(MSG_LOAD_FAILED.to_string());
                Err(err)
            }
        }
    }

    pub async fn render(&self) -> String {
        render_view(&*self.view.lock().await)
    }
}

pub fn render_view(view: &CallListView) -> String {
    match view {
        CallListView::Loading => MSG_LOADING.to_string(),
        CallListView::Failed(message) => message.clone(),
        CallListView::Loaded(calls) if calls.is_empty() => MSG_EMPTY.to_string(),
        CallListView::Loaded(calls) => render_table(calls),
    }
}

pub fn format_created_at(call: &Call) -> String {
    call.created_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn render_table(calls: &[Call]) -> String {
    let rows: Vec<[String; 4]> = calls
        .iter()
        .map(|call| {
            [
                call.id.to_string(),
                call.original_filename.clone(),
                call.status.to_string(),
                format_created_at(call),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: [&str; 4]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(HEADERS));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &rows {
        lines.push(format_row([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
        ]));
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "tests/calls_tests.rs"]
mod tests;
