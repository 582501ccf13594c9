//! Jupyter notebook to script transcoding.
//!
//! Notebooks are JSON documents; feeding them verbatim to a model wastes most
//! of the budget on structure. This module flattens a notebook into a
//! Python-like script: code cells verbatim, markdown/raw cells and cell
//! outputs as triple-quoted blocks.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// First line of every transcoded notebook.
pub const HEADER: &str = "# Jupyter notebook converted to Python script.";

/// Errors that can occur while transcoding a notebook.
#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("invalid notebook JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown cell type {cell_type:?}")]
    UnknownCellType { cell_type: String },

    #[error("unknown output type {output_type:?}")]
    UnknownOutputType { output_type: String },

    #[error("malformed notebook: {0}")]
    Malformed(String),
}

impl NotebookError {
    /// Unknown cell or output types abort the ingestion. A document that
    /// does not parse is reported in place of the file's content instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NotebookError::UnknownCellType { .. } | NotebookError::UnknownOutputType { .. }
        )
    }
}

/// Transcoding options.
#[derive(Debug, Clone, Copy)]
pub struct TranscodeOptions {
    /// Append cell outputs after code cells.
    pub include_output: bool,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            include_output: true,
        }
    }
}

/// Whether a path should be transcoded rather than read as plain text.
pub fn is_notebook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ipynb"))
}

/// Transcode notebook JSON text into a script-like string.
///
/// # Examples
///
/// ```
/// use treedigest::notebook::{transcode, TranscodeOptions};
///
/// let nb = r#"{"cells": [{"cell_type": "code", "source": ["x = 1"], "outputs": []}]}"#;
/// let script = transcode(nb, &TranscodeOptions::default()).unwrap();
/// assert!(script.contains("x = 1"));
/// ```
pub fn transcode(text: &str, options: &TranscodeOptions) -> Result<String, NotebookError> {
    let notebook: Value = serde_json::from_str(text)?;
    let cells = collect_cells(&notebook)?;

    let mut parts = vec![format!("{HEADER}\n")];
    for cell in &cells {
        if let Some(rendered) = transcode_cell(cell, options)? {
            parts.push(rendered);
        }
    }
    Ok(parts.join("\n"))
}

/// Gather cells, flattening the legacy `worksheets` layout.
fn collect_cells(notebook: &Value) -> Result<Vec<&Value>, NotebookError> {
    if let Some(worksheets) = notebook.get("worksheets").and_then(Value::as_array) {
        tracing::warn!("notebook uses deprecated worksheets; flattening them into one cell list");
        if worksheets.len() > 1 {
            tracing::warn!(
                count = worksheets.len(),
                "multiple worksheets are not supported, concatenating their cells"
            );
        }
        let mut cells = Vec::new();
        for sheet in worksheets {
            cells.extend(cell_array(sheet)?);
        }
        return Ok(cells);
    }
    cell_array(notebook)
}

fn cell_array(container: &Value) -> Result<Vec<&Value>, NotebookError> {
    match container.get("cells") {
        Some(Value::Array(cells)) => Ok(cells.iter().collect()),
        Some(_) => Err(NotebookError::Malformed("`cells` is not a list".into())),
        None => Err(NotebookError::Malformed("missing `cells`".into())),
    }
}

fn transcode_cell(
    cell: &Value,
    options: &TranscodeOptions,
) -> Result<Option<String>, NotebookError> {
    let cell_type = cell.get("cell_type").and_then(Value::as_str).unwrap_or_default();
    if !matches!(cell_type, "code" | "markdown" | "raw") {
        return Err(NotebookError::UnknownCellType {
            cell_type: cell_type.to_string(),
        });
    }

    let source = join_text(cell.get("source"));
    if source.is_empty() {
        return Ok(None);
    }

    if cell_type != "code" {
        return Ok(Some(format!("\"\"\"\n{source}\n\"\"\"\n")));
    }

    let mut rendered = format!("{source}\n");
    let outputs = cell.get("outputs").and_then(Value::as_array);
    if let Some(outputs) = outputs.filter(|o| options.include_output && !o.is_empty()) {
        let lines = outputs
            .iter()
            .map(output_text)
            .collect::<Result<Vec<_>, _>>()?;
        rendered.push_str("\"\"\"\nOutput:\n");
        rendered.push_str(&lines.join("\n"));
        rendered.push_str("\n\"\"\"\n");
    }
    Ok(Some(rendered))
}

/// Textual representation of one code cell output.
fn output_text(output: &Value) -> Result<String, NotebookError> {
    let output_type = output.get("output_type").and_then(Value::as_str).unwrap_or_default();
    match output_type {
        "stream" => Ok(join_text(output.get("text"))),
        "execute_result" | "display_data" => Ok(join_text(
            output.get("data").and_then(|d| d.get("text/plain")),
        )),
        "error" => {
            let field = |key: &str| output.get(key).and_then(Value::as_str).unwrap_or_default();
            Ok(format!("Error: {}: {}", field("ename"), field("evalue")))
        }
        other => Err(NotebookError::UnknownOutputType {
            output_type: other.to_string(),
        }),
    }
}

/// Notebook text fields are either a string or a list of line strings.
fn join_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(lines)) => lines.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}
