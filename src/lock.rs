// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! The installation directory lock. `install` creates `.replcfg.lock` and refuses a directory
//! that already has one; `update` requires it. Every successful run appends one record line.

use std::{
    fmt,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};
use log::debug;

use crate::error::{ConfigError, Result};

pub const LOCK_FILE: &str = ".replcfg.lock";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%f";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Install,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Action::Install => "install",
                Action::Update => "update",
            }
        )
    }
}

impl TryFrom<&str> for Action {
    type Error = String;

    fn try_from(val: &str) -> std::result::Result<Self, Self::Error> {
        match val {
            "install" => Ok(Action::Install),
            "update" => Ok(Action::Update),
            _ => Err(format!("failed to parse '{val}' as a lock action")),
        }
    }
}

/// One line of the lock file.
#[derive(Debug, Clone, PartialEq)]
pub struct LockRecord {
    pub timestamp: NaiveDateTime,
    pub action: Action,
    pub dataservices: Vec<String>,
}

impl LockRecord {
    pub fn new(action: Action, dataservices: &[String]) -> Self {
        LockRecord {
            timestamp: Local::now().naive_local(),
            action,
            dataservices: dataservices.to_vec(),
        }
    }

    pub fn as_string(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.action,
            self.dataservices.join(",")
        )
    }

    pub fn from_string(record: &str) -> std::result::Result<Self, String> {
        let mut fields = record.split('\t');
        let Some(timestamp) = fields.next() else {
            return Err("missing timestamp field".to_string());
        };
        let Some(action) = fields.next() else {
            return Err("missing action field".to_string());
        };
        let dataservices = crate::store::split_list(fields.next().unwrap_or(""));

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| format!("failed to parse timestamp: '{e}'"))?;

        Ok(LockRecord {
            timestamp,
            action: Action::try_from(action)?,
            dataservices,
        })
    }
}

pub fn lock_path(directory: &Path) -> PathBuf {
    directory.join(LOCK_FILE)
}

pub fn is_locked(directory: &Path) -> bool {
    lock_path(directory).exists()
}

/// Every record in the lock file, oldest first. A missing file has none.
pub fn records(directory: &Path) -> Result<Vec<LockRecord>> {
    let path = lock_path(directory);
    let display = path.display().to_string();
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ConfigError::io(display, e)),
    };

    let mut records = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            LockRecord::from_string(line).map_err(|reason| ConfigError::Corrupt {
                path: display.clone(),
                reason,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    records.sort_by_key(|record| record.timestamp);
    Ok(records)
}

fn write_record(directory: &Path, record: &LockRecord) -> Result<()> {
    let path = lock_path(directory);
    let display = path.display().to_string();
    fs::create_dir_all(directory).map_err(|e| ConfigError::io(&display, e))?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ConfigError::io(&display, e))?;
    file.write_all(&[record.as_string().as_bytes(), b"\n"].concat())
        .map_err(|e| ConfigError::io(&display, e))?;
    debug!("wrote lock record '{}' to {display}", record.as_string());
    Ok(())
}

/// Claim `directory` for a fresh installation.
pub fn acquire(directory: &Path, dataservices: &[String]) -> Result<LockRecord> {
    if is_locked(directory) {
        return Err(ConfigError::Locked(directory.display().to_string()));
    }
    let record = LockRecord::new(Action::Install, dataservices);
    write_record(directory, &record)?;
    Ok(record)
}

/// Record an update of an already installed `directory`.
pub fn refresh(directory: &Path, dataservices: &[String]) -> Result<LockRecord> {
    if !is_locked(directory) {
        return Err(ConfigError::NotLocked(directory.display().to_string()));
    }
    let record = LockRecord::new(Action::Update, dataservices);
    write_record(directory, &record)?;
    Ok(record)
}
