use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

const DB_PATH: &str = "data/archivio.sqlite";

pub fn connect() -> Result<Connection> {
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS page_cache (
            url        TEXT PRIMARY KEY,
            status     INTEGER NOT NULL,
            body       TEXT NOT NULL,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Extracted structured data, one JSON payload per record
        CREATE TABLE IF NOT EXISTS records (
            category     TEXT NOT NULL,
            id           TEXT NOT NULL,
            name         TEXT NOT NULL,
            data         TEXT NOT NULL,
            extracted_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (category, id)
        );
        CREATE INDEX IF NOT EXISTS idx_records_category ON records(category);
        ",
    )?;
    Ok(())
}

// ── Page cache ──

/// Cached body for `url`, unless missing or older than `max_age_days`.
pub fn cache_get(conn: &Connection, url: &str, max_age_days: i64) -> Result<Option<String>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT body, fetched_at FROM page_cache WHERE url = ?1",
            [url],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    let Some((body, fetched_at)) = row else {
        return Ok(None);
    };
    let fetched = NaiveDateTime::parse_from_str(&fetched_at, "%Y-%m-%d %H:%M:%S")
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))?;
    if Utc::now() - fetched > Duration::days(max_age_days) {
        return Ok(None);
    }
    Ok(Some(body))
}

pub fn cache_put(conn: &Connection, url: &str, status: u16, body: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO page_cache (url, status, body, fetched_at)
         VALUES (?1, ?2, ?3, datetime('now'))",
        rusqlite::params![url, status, body],
    )?;
    Ok(())
}

// ── Extracted records ──

pub struct RecordRow {
    pub id: String,
    pub name: String,
    pub data: String,
}

pub fn save_records(conn: &Connection, category: &str, rows: &[RecordRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO records (category, id, name, data)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in rows {
            count += stmt.execute(rusqlite::params![category, r.id, r.name, r.data])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn load_records(conn: &Connection, category: &str) -> Result<Vec<RecordRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, data FROM records WHERE category = ?1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([category], |row| {
            Ok(RecordRow {
                id: row.get(0)?,
                name: row.get(1)?,
                data: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub cached_pages: usize,
    pub per_category: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let cached_pages: usize =
        conn.query_row("SELECT COUNT(*) FROM page_cache", [], |r| r.get(0))?;
    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) FROM records GROUP BY category ORDER BY category",
    )?;
    let per_category = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stats {
        cached_pages,
        per_category,
    })
}
