//! Common test utilities for tf-index integration tests
//!
//! - `TestDb`: scratch directory holding a framework database with every
//!   entity table, plus helpers to run the CLI against it

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rusqlite::Connection;
use tempfile::TempDir;
use uuid::Uuid;

pub const TABLES: [(&str, &str); 7] = [
    ("Components", "Name"),
    ("Properties", "Name"),
    ("Threats", "Name"),
    ("SecurityRequirements", "Name"),
    ("TestCases", "Name"),
    ("Libraries", "Name"),
    ("PropertyOptions", "OptionText"),
];

/// A temporary directory with `framework.db` inside it
pub struct TestDb {
    dir: TempDir,
}

impl TestDb {
    /// Create the database with every table empty
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let conn = Connection::open(dir.path().join("framework.db")).expect("Failed to create db");
        for (table, name_column) in TABLES {
            conn.execute_batch(&format!(
                "CREATE TABLE {table} (Guid TEXT, {name_column} TEXT);"
            ))
            .expect("Failed to create table");
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("framework.db")
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.path().join("index.yaml")
    }

    /// Insert a row; `None` stores a NULL identifier
    pub fn insert(&self, table: &str, id: Option<Uuid>, name: &str) -> &Self {
        let name_column = TABLES
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, c)| *c)
            .expect("Unknown table");
        let conn = Connection::open(self.db_path()).expect("Failed to open db");
        conn.execute(
            &format!("INSERT INTO {table} (Guid, {name_column}) VALUES (?1, ?2)"),
            rusqlite::params![id.map(|u| u.to_string()), name],
        )
        .expect("Failed to insert row");
        self
    }

    /// Insert a row with a fresh identifier and return it
    pub fn add(&self, table: &str, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.insert(table, Some(id), name);
        id
    }

    /// Write `tf-index.toml` pointing at this database and index file
    pub fn write_config(&self) -> &Self {
        let config = format!(
            "[database]\npath = {:?}\n\n[index]\npath = {:?}\n",
            self.db_path().display().to_string(),
            self.index_path().display().to_string()
        );
        std::fs::write(self.path().join("tf-index.toml"), config).expect("Failed to write config");
        self
    }

    /// Run the CLI binary in this directory
    pub fn run_cli(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new(env!("CARGO_BIN_EXE_tf-index"))
            .current_dir(self.path())
            .env_remove("TF_INDEX_DB")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
    }

    /// Run CLI and expect success, return stdout
    pub fn run_cli_success(&self, args: &[&str]) -> String {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            output.status.success(),
            "CLI command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run CLI and expect failure, return (exit code, stderr)
    pub fn run_cli_failure(&self, args: &[&str]) -> (Option<i32>, String) {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            !output.status.success(),
            "CLI command {:?} should have failed",
            args
        );
        (
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }
}
