use anyhow::Result;
use chrono::Utc;
use council_core::{EventEnvelope, runtime_dir};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only operational log at `.council/observe.log`.
pub struct Observer {
    log_path: PathBuf,
    verbose: bool,
}

impl Observer {
    pub fn new(workspace: &Path) -> Result<Self> {
        let dir = runtime_dir(workspace);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            log_path: dir.join("observe.log"),
            verbose: false,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn record_event(&self, event: &EventEnvelope) -> Result<()> {
        self.append_log_line(&format!(
            "{} EVENT {}",
            Utc::now().to_rfc3339(),
            serde_json::to_string(event)?
        ))
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Log to stderr with a `[council]` prefix when verbose mode is on.
    pub fn verbose_log(&self, msg: &str) {
        if self.verbose {
            eprintln!("[council] {msg}");
        }
    }

    /// Always written to the log file and to stderr.
    pub fn warn_log(&self, msg: &str) {
        eprintln!("[council WARN] {msg}");
        let _ = self.append_log_line(&format!("{} WARN {msg}", Utc::now().to_rfc3339()));
    }

    fn append_log_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_core::CouncilEvent;

    #[test]
    fn events_and_warnings_land_in_log_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let observer = Observer::new(dir.path()).expect("observer");
        observer
            .record_event(&EventEnvelope::now(CouncilEvent::StateMutated {
                operation: "plan".to_string(),
                updated_index: 3,
            }))
            .expect("record");
        observer.warn_log("state file unreadable");

        let log = fs::read_to_string(observer.log_path()).expect("read log");
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" EVENT "));
        assert!(lines[0].contains("\"StateMutated\""));
        assert!(lines[0].contains("\"updated_index\":3"));
        assert!(lines[1].ends_with("WARN state file unreadable"));
    }

    #[test]
    fn verbose_is_off_by_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut observer = Observer::new(dir.path()).expect("observer");
        assert!(!observer.is_verbose());
        observer.set_verbose(true);
        assert!(observer.is_verbose());
    }
}
