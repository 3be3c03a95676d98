use crate::plugin::DiagnosisResult;
use crate::{Error, Result};
use kvdiag_types::GlobalConfig;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the report in the target directory.
pub const REPORT_FILE_NAME: &str = "kvdiag_report.json";

/// Configuration of the run plus one result per plugin, in invocation order.
#[derive(Default)]
pub struct Report {
    pub input: Option<GlobalConfig>,
    pub results: Vec<Box<dyn DiagnosisResult>>,
}

impl Report {
    pub fn new(input: GlobalConfig) -> Self {
        Self {
            input: Some(input),
            results: Vec::new(),
        }
    }

    /// Tab-indented JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

struct Results<'a>(&'a [Box<dyn DiagnosisResult>]);

impl Serialize for Results<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for result in self.0 {
            let value = result.to_value().map_err(S::Error::custom)?;
            seq.serialize_element(&value)?;
        }
        seq.end()
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = usize::from(self.input.is_some()) + usize::from(!self.results.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(input) = &self.input {
            map.serialize_entry("input", input)?;
        }
        if !self.results.is_empty() {
            map.serialize_entry("results", &Results(&self.results))?;
        }
        map.end()
    }
}

/// Persists reports into one directory, replacing any previous report.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE_NAME)
    }

    /// Serialize `report` and atomically replace the report file.
    pub fn write(&self, report: &Report) -> Result<PathBuf> {
        let bytes = report.to_json()?;
        let path = self.path();
        self.write_bytes(&path, &bytes)
            .map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
