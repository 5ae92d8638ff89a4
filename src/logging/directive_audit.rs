use crate::model::{AdoptDirective, CreateDirective, StopDirective};
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::{create_dir_all, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Serialize, Clone)]
pub struct DirectiveRecord {
    pub timestamp: String,
    pub instrument: String,
    pub action: String, // CREATE, STOP, ADOPT
    pub level: Option<String>,
    pub entry_price: Option<f64>,
    pub amount: Option<f64>,
    pub position_id: Option<String>,
}

/// Append-only CSV trail of every directive handed to the executor.
#[derive(Clone)]
pub struct DirectiveAuditLogger {
    writer: Arc<Mutex<Writer<std::fs::File>>>,
}

impl DirectiveAuditLogger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = Path::new(log_dir);
        create_dir_all(dir).context("Failed to create log directory")?;

        let file_path = dir.join("directives.csv");
        let file_exists = file_path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .context("Failed to open directives.csv")?;

        let writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
        })
    }

    pub fn log(&self, record: DirectiveRecord) {
        if let Ok(mut w) = self.writer.lock() {
            if let Err(e) = w.serialize(record) {
                eprintln!("Failed to write directive audit log: {}", e);
            } else {
                let _ = w.flush();
            }
        }
    }

    pub fn log_create(&self, directive: &CreateDirective) {
        self.log(DirectiveRecord {
            timestamp: Local::now().to_rfc3339(),
            instrument: directive.level.instrument.clone(),
            action: "CREATE".to_string(),
            level: Some(directive.level.to_string()),
            entry_price: Some(directive.entry_price),
            amount: Some(directive.amount),
            position_id: None,
        });
    }

    pub fn log_stop(&self, instrument: &str, directive: &StopDirective) {
        self.log(DirectiveRecord {
            timestamp: Local::now().to_rfc3339(),
            instrument: instrument.to_string(),
            action: "STOP".to_string(),
            level: None,
            entry_price: None,
            amount: None,
            position_id: Some(directive.position_id.to_string()),
        });
    }

    pub fn log_adopt(&self, directive: &AdoptDirective) {
        self.log(DirectiveRecord {
            timestamp: Local::now().to_rfc3339(),
            instrument: directive.level.instrument.clone(),
            action: "ADOPT".to_string(),
            level: Some(directive.level.to_string()),
            entry_price: None,
            amount: None,
            position_id: Some(directive.position_id.to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LevelId;
    use tempfile::tempdir;

    #[test]
    fn test_audit_log_header_and_record() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().to_str().unwrap();
        let logger = DirectiveAuditLogger::new(log_dir).unwrap();

        logger.log_create(&CreateDirective {
            level: LevelId::new("WLD-USDT", 0),
            entry_price: 100.0,
            amount: 10.0,
        });

        let file_path = dir.path().join("directives.csv");
        let content = std::fs::read_to_string(file_path).unwrap();
        let lines: Vec<&str> = content.trim().split('\n').collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0]
            .contains("timestamp,instrument,action,level,entry_price,amount,position_id"));
        assert!(lines[1].contains("WLD-USDT,CREATE,WLD-USDT_0,100.0,10.0"));
    }
}
