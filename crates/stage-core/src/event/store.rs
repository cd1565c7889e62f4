use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::Utc;

use super::{SessionEvent, SessionEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, run_id: &str, kind: SessionEventKind) -> SessionEvent;
    /// Lista eventos de un run (orden ascendente por seq).
    fn list(&self, run_id: &str) -> Vec<SessionEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    pub inner: HashMap<String, Vec<SessionEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: &str, kind: SessionEventKind) -> SessionEvent {
        let vec = self.inner.entry(run_id.to_string()).or_default();
        let seq = vec.len() as u64;
        let ev = SessionEvent { seq,
                                run_id: run_id.to_string(),
                                kind,
                                ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }

    fn list(&self, run_id: &str) -> Vec<SessionEvent> {
        self.inner.get(run_id).cloned().unwrap_or_default()
    }
}

/// Vuelca eventos como JSON por línea.
pub fn write_jsonl(path: &Path, events: &[SessionEvent]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    for ev in events {
        let line = serde_json::to_string(ev).map_err(std::io::Error::other)?;
        writeln!(file, "{line}")?;
    }
    file.sync_all()
}

pub fn read_jsonl(path: &Path) -> std::io::Result<Vec<SessionEvent>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line).map_err(std::io::Error::other)?);
    }
    Ok(out)
}
