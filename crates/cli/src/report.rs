//! Structured JSON records printed on stdout

use anyhow::Result;
use bandcalc_algorithms::imagery::BandRoleMap;
use bandcalc_core::Bounds;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
    Info,
}

/// Output extent; serializes as `{}` when unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReportBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub north: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub south: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub west: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub east: Option<f64>,
}

impl From<Bounds> for ReportBounds {
    fn from(b: Bounds) -> Self {
        Self {
            north: Some(b.north),
            south: Some(b.south),
            west: Some(b.west),
            east: Some(b.east),
        }
    }
}

/// What the run was asked to compute, reported under `algo` or `formula`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunLabel {
    Algo(String),
    Formula(String),
}

/// Final record of a run, built once
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub status: Status,
    pub messages: String,
    pub filename: Option<String>,
    pub path: Option<String>,
    pub preview_png: Option<String>,
    pub bounds: ReportBounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl RunResult {
    fn labelled(status: Status, messages: String, label: RunLabel) -> Self {
        let (algo, formula) = match label {
            RunLabel::Algo(a) => (Some(a), None),
            RunLabel::Formula(f) => (None, Some(f)),
        };
        Self {
            status,
            messages,
            filename: None,
            path: None,
            preview_png: None,
            bounds: ReportBounds::default(),
            algo,
            formula,
        }
    }

    /// Failure record: no path fields, empty bounds
    pub fn failed(messages: impl Into<String>, label: RunLabel) -> Self {
        Self::labelled(Status::Failed, messages.into(), label)
    }

    pub fn success(
        messages: impl Into<String>,
        label: RunLabel,
        filename: String,
        path: String,
        preview_png: Option<String>,
        bounds: ReportBounds,
    ) -> Self {
        Self {
            filename: Some(filename),
            path: Some(path),
            preview_png,
            bounds,
            ..Self::labelled(Status::Success, messages.into(), label)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Diagnostic record emitted before an index run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoRecord {
    pub status: Status,
    pub messages: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<BandRoleMap>,
}

impl InfoRecord {
    pub fn platform(label: &str, roles: &BandRoleMap) -> Self {
        Self {
            status: Status::Info,
            messages: format!("Detected Platform: {}. Band Mapping used: {}", label, roles),
            algo: None,
            roles: None,
        }
    }

    pub fn with_algo(mut self, algo: impl Into<String>) -> Self {
        self.algo = Some(algo.into());
        self
    }

    pub fn with_roles(mut self, roles: BandRoleMap) -> Self {
        self.roles = Some(roles);
        self
    }
}

/// Bare failure of an inspection command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub status: Status,
    pub message: String,
}

impl FailureRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            message: message.into(),
        }
    }
}

/// Result of the band inspection utility
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BandsReport {
    Listed {
        status: Status,
        bands: Vec<String>,
        count: usize,
        #[serde(rename = "type")]
        kind: &'static str,
    },
    Failed(FailureRecord),
}

impl BandsReport {
    pub fn listed(bands: Vec<String>) -> Self {
        Self::Listed {
            status: Status::Success,
            count: bands.len(),
            bands,
            kind: "GeoTIFF",
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(FailureRecord::new(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Listed { .. })
    }
}

/// Receiver of structured records
pub trait ResultSink {
    fn emit<T: Serialize>(&mut self, record: &T) -> Result<()>;
}

/// One JSON object per line
pub struct JsonLineSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLineSink<W> {
    fn emit<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
