use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Who produced a transcript line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptRole {
    /// Controller state changes and boot summary.
    Flight,
    /// Lines the ground build writes to its debug link.
    Ground,
    /// Records drained from the telemetry ring.
    Telemetry,
    /// Emulator bookkeeping.
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Flight => "FCU ",
            TranscriptRole::Ground => "GND <",
            TranscriptRole::Telemetry => "TLM ",
            TranscriptRole::Emulator => "EMU ",
        }
    }
}

/// Writes timestamped lines to stdout and, optionally, a transcript file.
pub struct TranscriptLogger<W: Write> {
    console: W,
    file: Option<BufWriter<File>>,
}

impl<W: Write> TranscriptLogger<W> {
    pub fn new(console: W, path: Option<&Path>) -> io::Result<Self> {
        let file = match path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?;
                Some(BufWriter::new(file))
            }
            None => None,
        };

        let mut logger = Self { console, file };
        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "# JagSat flight emulator transcript")?;
            writeln!(file, "# Timestamps are simulated seconds since boot")?;
            writeln!(file)?;
            file.flush()?;
        }
        Ok(())
    }

    pub fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        let formatted = format_line(elapsed, role, line);
        writeln!(self.console, "{formatted}")?;
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{formatted}")?;
            file.flush()?;
        }
        Ok(())
    }

    pub fn console(&self) -> &W {
        &self.console
    }
}

fn format_line(elapsed: Duration, role: TranscriptRole, line: &str) -> String {
    format!(
        "[+{:>8.3} s] {} {}",
        elapsed.as_secs_f64(),
        role.prefix(),
        line
    )
}
