use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use log::{error, info, warn};

/// Logger de la sesión: emite por la fachada `log` (target = stage) y además
/// acumula las líneas para el `stage.log` del run.
#[derive(Debug)]
pub struct StageLogger {
    stage: String,
    file: Option<PathBuf>,
    pending: Vec<String>,
}

impl StageLogger {
    pub fn new(stage: &str, file: Option<PathBuf>) -> Self {
        Self { stage: stage.to_string(),
               file,
               pending: vec![] }
    }

    pub fn info(&mut self, msg: impl AsRef<str>) {
        info!(target: "stage", "[{}] {}", self.stage, msg.as_ref());
        self.push("INFO", msg.as_ref());
    }

    pub fn warn(&mut self, msg: impl AsRef<str>) {
        warn!(target: "stage", "[{}] {}", self.stage, msg.as_ref());
        self.push("WARN", msg.as_ref());
    }

    pub fn error(&mut self, msg: impl AsRef<str>) {
        error!(target: "stage", "[{}] {}", self.stage, msg.as_ref());
        self.push("ERROR", msg.as_ref());
    }

    /// Hito positivo (se registra como INFO en la fachada).
    pub fn success(&mut self, msg: impl AsRef<str>) {
        info!(target: "stage", "[{}] ✓ {}", self.stage, msg.as_ref());
        self.push("SUCCESS", msg.as_ref());
    }

    pub fn pending_lines(&self) -> &[String] {
        &self.pending
    }

    /// Agrega las líneas pendientes al archivo del run (si hay uno).
    pub fn flush(&mut self) -> std::io::Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        if self.pending.is_empty() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        for line in self.pending.drain(..) {
            writeln!(f, "{line}")?;
        }
        f.sync_all()
    }

    fn push(&mut self, level: &str, msg: &str) {
        self.pending.push(format!("{} {:<7} {}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"), level, msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_appends_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("stage.log");
        let mut logger = StageLogger::new("04_clf_svm", Some(path.clone()));
        logger.info("Test Accuracy: 0.9");
        logger.warn("slow");
        logger.flush().unwrap();
        assert!(logger.pending_lines().is_empty());
        logger.success("done");
        logger.flush().unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("Test Accuracy: 0.9"));
        assert!(text.lines().last().unwrap().contains("SUCCESS"));
    }
}
