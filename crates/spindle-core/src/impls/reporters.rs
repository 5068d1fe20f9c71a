//! ResultReporter の実装
//!
//! - **JsonLinesReporter**: 任意の `Write` に 1 行 1 JSON で書く（既定は stdout）
//! - **FileReporter**: ファイルに追記する
//! - **MemoryReporter**: 呼ばれた内容を保持する（テスト用）

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::domain::{ReportError, ResultReport};
use crate::ports::ResultReporter;

/// Writes each report as one JSON line and flushes before returning.
#[derive(Debug)]
pub struct JsonLinesReporter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ResultReporter for JsonLinesReporter<W> {
    fn report(&self, report: &ResultReport) -> Result<(), ReportError> {
        let mut line = serde_json::to_vec(report)?;
        line.push(b'\n');

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(&line)?;
        out.flush()?;
        Ok(())
    }
}

/// Appends each report as one JSON line to a file.
///
/// The file is opened per report so a missing directory surfaces as a
/// report failure, not as a startup failure.
#[derive(Debug, Clone)]
pub struct FileReporter {
    path: PathBuf,
}

impl FileReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultReporter for FileReporter {
    fn report(&self, report: &ResultReport) -> Result<(), ReportError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut file = io::BufWriter::new(file);
        serde_json::to_writer(&mut file, report)?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.get_ref().sync_data()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<ResultReport>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ResultReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResultReporter for MemoryReporter {
    fn report(&self, report: &ResultReport) -> Result<(), ReportError> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }
}
