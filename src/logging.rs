//! CSV output: appends samples to the log file and mirrors them to the console.

use crate::error::{MonitorError, Result};
use crate::sampler::Sample;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "indice,memoria(%),cpu(%),Disco-uso(%),Disk-Read(bytes),Disk-Write(bytes),Net-in(bytes),Net-out(bytes),TimeStamp";

pub const DEFAULT_PRECISION: usize = 1;

/// Formats a sample as one CSV line, without the trailing newline.
pub fn format_row(sample: &Sample, precision: usize) -> String {
    format!(
        "{},{:.p$},{:.p$},{:.p$},{},{},{},{},{}",
        sample.index,
        sample.memory_percent,
        sample.cpu_percent,
        sample.disk_use_percent,
        sample.disk_read_bytes,
        sample.disk_write_bytes,
        sample.net_in_bytes,
        sample.net_out_bytes,
        sample.timestamp,
        p = precision,
    )
}

/// Appends samples to a CSV file, one complete line per write.
///
/// The file is opened once in append mode, so earlier runs are kept and
/// each run adds its own header. Lines are echoed to `console` after they
/// reach the file.
pub struct CsvLogger<W = io::Stdout> {
    path: PathBuf,
    file: File,
    console: Option<W>,
    precision: usize,
    header_written: bool,
}

impl CsvLogger<io::Stdout> {
    /// Opens `path` with stdout as the console, or no console when `mirror`
    /// is false.
    pub fn open<P: AsRef<Path>>(path: P, precision: usize, mirror: bool) -> Result<Self> {
        Self::with_console(path, precision, mirror.then(io::stdout))
    }
}

impl<W: Write> CsvLogger<W> {
    pub fn with_console<P: AsRef<Path>>(path: P, precision: usize, console: Option<W>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| MonitorError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file,
            console,
            precision,
            header_written: false,
        })
    }

    /// Writes the column header. Only the first call per logger has an effect.
    pub fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.emit(CSV_HEADER)?;
        self.header_written = true;
        Ok(())
    }

    pub fn log(&mut self, sample: &Sample) -> Result<()> {
        let row = format_row(sample, self.precision);
        self.emit(&row)
    }

    #[cfg(test)]
    fn into_console(self) -> Option<W> {
        self.console
    }

    fn emit(&mut self, line: &str) -> Result<()> {
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        self.file
            .write_all(record.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| MonitorError::Io {
                path: self.path.clone(),
                source,
            })?;

        if let Some(console) = self.console.as_mut() {
            // The file is authoritative; a closed stdout must not end the run
            if let Err(e) = console.write_all(record.as_bytes()).and_then(|()| console.flush()) {
                tracing::debug!(error = %e, "Console mirror write failed");
            }
        }
        Ok(())
    }
}
