//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The round loop calls store methods; nothing else executes SQL.

use crate::{error::RoundResult, event::EventLogEntry, types::Tick};
use rusqlite::{params, Connection, OptionalExtension};

pub struct RoundStore {
    conn: Connection,
}

impl RoundStore {
    /// Open (or create) the round database at `path`.
    pub fn open(path: &str) -> RoundResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RoundResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RoundResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Round ──────────────────────────────────────────────────

    pub fn insert_round(
        &self,
        run_id:     &str,
        seed:       u64,
        difficulty: &str,
        version:    &str,
    ) -> RoundResult<()> {
        self.conn.execute(
            "INSERT INTO round (run_id, seed, difficulty, version, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                seed as i64,
                difficulty,
                version,
                chrono::Utc::now().timestamp()
            ],
        )?;
        Ok(())
    }

    pub fn record_final_score(&self, run_id: &str, final_score: f64) -> RoundResult<()> {
        self.conn.execute(
            "UPDATE round SET final_score = ?2 WHERE run_id = ?1",
            params![run_id, final_score],
        )?;
        Ok(())
    }

    pub fn final_score(&self, run_id: &str) -> RoundResult<Option<f64>> {
        let score = self
            .conn
            .query_row(
                "SELECT final_score FROM round WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, Option<f64>>(0),
            )
            .optional()?;
        Ok(score.flatten())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> RoundResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, tick, sim_time, event_type, score_delta, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.sim_time,
                entry.event_type,
                entry.score_delta,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, run_id: &str, tick: Tick) -> RoundResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, run_id, tick, sim_time, event_type, score_delta, payload
             FROM event_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC",
            params![run_id, tick as i64],
        )
    }

    pub fn all_events(&self, run_id: &str) -> RoundResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, run_id, tick, sim_time, event_type, score_delta, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
            params![run_id],
        )
    }

    fn query_events(
        &self,
        sql:    &str,
        params: impl rusqlite::Params,
    ) -> RoundResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt
            .query_map(params, |row| {
                Ok(EventLogEntry {
                    id:          Some(row.get(0)?),
                    run_id:      row.get(1)?,
                    tick:        row.get::<_, i64>(2)? as u64,
                    sim_time:    row.get(3)?,
                    event_type:  row.get(4)?,
                    score_delta: row.get(5)?,
                    payload:     row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str) -> RoundResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn event_count_by_type(&self, run_id: &str, event_type: &str) -> RoundResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sum of all logged score changes; equals the live score.
    pub fn score_delta_total(&self, run_id: &str) -> RoundResult<f64> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(score_delta), 0.0) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, run_id: &str, tick: Tick, state_json: &str) -> RoundResult<()> {
        self.conn.execute(
            "INSERT INTO snapshot (run_id, tick, state_json) VALUES (?1, ?2, ?3)",
            params![run_id, tick as i64, state_json],
        )?;
        Ok(())
    }

    pub fn latest_snapshot_before(
        &self,
        run_id: &str,
        tick:   Tick,
    ) -> RoundResult<Option<(Tick, String)>> {
        let result = self
            .conn
            .query_row(
                "SELECT tick, state_json FROM snapshot
                 WHERE run_id = ?1 AND tick <= ?2
                 ORDER BY tick DESC LIMIT 1",
                params![run_id, tick as i64],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(result)
    }
}
