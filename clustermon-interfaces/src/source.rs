//! External-command file ingestion (spec §4.8: "A file ingestion command
//! allows reading verbs from a file and optionally unlinking it
//! afterward"), grounded on `externalcommandprocessor.cpp`'s
//! `ProcessExternalCommandFile`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{parse_line, ExternalCommand};

pub struct FileCommandSource {
    path: PathBuf,
    unlink_after: bool,
}

impl FileCommandSource {
    pub fn new(path: impl Into<PathBuf>, unlink_after: bool) -> Self {
        FileCommandSource { path: path.into(), unlink_after }
    }

    /// Read every line, parsing what looks like a command. Malformed
    /// lines are logged and skipped — per spec §6 the pipe itself is
    /// never reported as failed over this.
    pub fn ingest(&self) -> std::io::Result<Vec<ExternalCommand>> {
        let contents = fs::read_to_string(&self.path)?;
        let commands = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match parse_line(line) {
                Ok(cmd) => Some(cmd),
                Err(e) => {
                    tracing::warn!(line, error = %e, "discarding malformed external command line");
                    None
                }
            })
            .collect();

        if self.unlink_after {
            fs::remove_file(&self.path)?;
        }
        Ok(commands)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("clustermon-cmdsrc-test-{}-{name}", std::process::id()))
    }

    #[test]
    fn ingest_skips_malformed_lines_and_keeps_the_rest() {
        let path = temp_path("ingest");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "[100] SCHEDULE_FORCED_CHECK;web1;500").unwrap();
        writeln!(f, "not a command at all").unwrap();
        writeln!(f, "[200] ACKNOWLEDGE_PROBLEM;web1;1;oncall;comment;0").unwrap();
        drop(f);

        let source = FileCommandSource::new(&path, false);
        let commands = source.ingest().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].verb, "SCHEDULE_FORCED_CHECK");
        assert_eq!(commands[1].verb, "ACKNOWLEDGE_PROBLEM");

        fs::remove_file(&path).ok();
    }

    #[test]
    fn unlink_after_removes_the_file() {
        let path = temp_path("unlink");
        fs::write(&path, "[0] ACKNOWLEDGE_PROBLEM;web1;1;oncall;comment;0\n").unwrap();

        let source = FileCommandSource::new(&path, true);
        source.ingest().unwrap();

        assert!(!path.exists());
    }
}
