use crate::candidates::round_ms;
use crate::chart::{Chart, Note, NoteKind};
use crate::error::ChartError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartExport {
    pub difficulty: String,
    pub tempo: f64,
    pub duration: f64,
    pub preview_start_sec: f64,
    pub preview_duration_sec: f64,
    pub note_count: usize,
    pub notes: Vec<NoteExport>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    Tap,
    Long,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteExport {
    pub time: f64,
    pub lane: u8,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    /// `null` for taps
    pub end_time: Option<f64>,
}

impl From<&Note> for NoteExport {
    fn from(note: &Note) -> Self {
        let (note_type, end_time) = match note.kind {
            NoteKind::Tap => (NoteType::Tap, None),
            NoteKind::Long { end } => (NoteType::Long, Some(round_ms(end))),
        };
        NoteExport {
            time: round_ms(note.time),
            lane: note.lane,
            note_type,
            end_time,
        }
    }
}

impl ChartExport {
    pub fn new(chart: &Chart) -> Self {
        let notes: Vec<NoteExport> = chart.notes.iter().map(NoteExport::from).collect();
        ChartExport {
            difficulty: chart.difficulty.to_string(),
            tempo: chart.tempo,
            duration: chart.duration,
            preview_start_sec: chart.preview_start_sec,
            preview_duration_sec: chart.preview_duration_sec,
            note_count: notes.len(),
            notes,
        }
    }

    /// Export to JSON format
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Save chart to file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Body returned instead of a chart when generation fails.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    /// Unexpected faults that did not come from the charter itself.
    pub fn internal(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ChartError>() {
            Some(chart_err) => ErrorResponse::from(chart_err),
            None => ErrorResponse::new("internal", format!("{:#}", err)),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

impl From<&ChartError> for ErrorResponse {
    fn from(err: &ChartError) -> Self {
        ErrorResponse::new(err.code(), err.to_string())
    }
}
