//! SQLite persistence for acquisition plans.
//!
//! Keeps active plans across restarts. Each plan is stored as one JSON row
//! keyed by symbol; Decimal fields serialize as strings so no precision is
//! lost.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::Result;
use crate::execution::{AcquisitionPlan, PlanRepository};

/// Plan repository backed by a single SQLite connection.
///
/// The connection mutex is held for the whole read-modify-write in
/// `update`, which serializes all plan mutations through this store.
pub struct SqlitePlanRepository {
    conn: Mutex<Connection>,
}

impl SqlitePlanRepository {
    /// Open (or create) the database at `db_path`. Pass `":memory:"` for a
    /// throwaway store.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.init_schema()?;

        info!("Plan repository initialized at {:?}", db_path.as_ref());
        Ok(repo)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS plans (
                symbol TEXT PRIMARY KEY,
                plan_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load(conn: &Connection, symbol: &str) -> Result<Option<AcquisitionPlan>> {
        let json: Option<String> = conn
            .query_row(
                "SELECT plan_json FROM plans WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn store(conn: &Connection, plan: &AcquisitionPlan) -> Result<()> {
        let json = serde_json::to_string(plan)?;
        conn.execute(
            "INSERT OR REPLACE INTO plans (symbol, plan_json, updated_at) VALUES (?1, ?2, ?3)",
            params![plan.symbol, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Remove every stored plan.
    pub fn clear_all(&self) -> Result<()> {
        self.conn().execute("DELETE FROM plans", [])?;
        info!("Cleared all persisted plans");
        Ok(())
    }
}

impl PlanRepository for SqlitePlanRepository {
    fn get(&self, symbol: &str) -> Result<Option<AcquisitionPlan>> {
        Self::load(&self.conn(), symbol)
    }

    fn put(&self, plan: AcquisitionPlan) -> Result<Option<AcquisitionPlan>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let previous = Self::load(&tx, &plan.symbol)?;
        Self::store(&tx, &plan)?;
        tx.commit()?;

        debug!(symbol = %plan.symbol, status = ?plan.status, "Plan saved");
        Ok(previous)
    }

    fn remove(&self, symbol: &str) -> Result<Option<AcquisitionPlan>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let previous = Self::load(&tx, symbol)?;
        tx.execute("DELETE FROM plans WHERE symbol = ?1", params![symbol])?;
        tx.commit()?;
        Ok(previous)
    }

    fn update(&self, symbol: &str, f: &mut dyn FnMut(&mut AcquisitionPlan)) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let Some(mut plan) = Self::load(&tx, symbol)? else {
            return Ok(false);
        };

        f(&mut plan);
        Self::store(&tx, &plan)?;
        tx.commit()?;
        Ok(true)
    }

    fn symbols(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT symbol FROM plans ORDER BY symbol")?;
        let symbols = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(symbols)
    }
}
