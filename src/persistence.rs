//! Per-generation record of the best genome, kept so a run can be inspected or
//! resumed from its champion.
use crate::engines::generation::Genome;
use crate::engines::metrics::PerformanceMetrics;
use crate::error::{AetraderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub genome: Genome,
    pub fitness: f64,
    /// `None` when the best genome's evaluation failed
    pub metrics: Option<PerformanceMetrics>,
    pub recorded_at: DateTime<Utc>,
}

pub trait GenomeStore: Send {
    fn save(&mut self, record: &GenerationRecord) -> Result<()>;
    fn load_all(&self) -> Result<Vec<GenerationRecord>>;
}

/// Appends one JSON document per line
pub struct JsonLinesStore {
    path: PathBuf,
}

impl JsonLinesStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GenomeStore for JsonLinesStore {
    fn save(&mut self, record: &GenerationRecord) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<GenerationRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                AetraderError::Persistence(format!("{}:{}: {}", self.path.display(), i + 1, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

/// In-process store. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<GenerationRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<GenerationRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl GenomeStore for MemoryStore {
    fn save(&mut self, record: &GenerationRecord) -> Result<()> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<GenerationRecord>> {
        Ok(self.records())
    }
}
