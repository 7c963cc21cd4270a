//! Hand-off of finished analyses to persistence or reporting collaborators.

use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Clause, Document, EntityBundle};

/// Errors raised while emitting a record.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sink poisoned by a panicked writer")]
    Poisoned,
}

/// Storable shape of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub language: String,
    pub entities: EntityBundle,
    pub overall_score: u8,
    pub summary: String,
    pub clauses_analyzed_count: usize,
    pub clauses: Vec<Clause>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn from_document(document: &Document, source: Option<String>) -> Self {
        Self {
            source,
            language: document.language.to_string(),
            entities: document.entities.clone(),
            overall_score: document.assessment.overall_score,
            summary: document.assessment.summary.clone(),
            clauses_analyzed_count: document.clauses.len(),
            clauses: document.clauses.clone(),
            analyzed_at: document.analyzed_at,
        }
    }
}

/// Receives completed analyses.
pub trait AnalysisSink: Send + Sync {
    fn emit(&self, record: &AnalysisRecord) -> Result<(), SinkError>;
}

/// Writes each record as pretty JSON followed by a newline.
pub struct JsonSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|_| SinkError::Poisoned)
    }
}

impl<W: Write + Send> AnalysisSink for JsonSink<W> {
    fn emit(&self, record: &AnalysisRecord) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        serde_json::to_writer_pretty(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
