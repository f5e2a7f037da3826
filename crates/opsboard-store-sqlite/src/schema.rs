//! SQL schema for the opsboard SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The two secondary indexes back the filtered list paths: one query per
/// filter column, ordered by `timestamp` descending.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS incidents (
    incident_id TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    severity    TEXT NOT NULL,   -- 'Critical' | 'High' | 'Medium' | 'Low'
    status      TEXT NOT NULL,   -- 'New' | 'Acknowledged' | 'InProgress' | 'Resolved'
    service     TEXT NOT NULL DEFAULT 'custom',
    source      TEXT NOT NULL DEFAULT 'manual',
    timestamp   TEXT NOT NULL,   -- ISO 8601 UTC; creation time, immutable
    assigned_to TEXT,
    tags        TEXT NOT NULL DEFAULT '[]',   -- JSON array
    metadata    TEXT,                         -- JSON object or NULL
    created_at  TEXT NOT NULL,   -- store-assigned
    updated_at  TEXT NOT NULL,   -- refreshed on every mutation
    resolved_at TEXT             -- derived from status transitions
);

CREATE INDEX IF NOT EXISTS incidents_status_ts_idx
    ON incidents(status, timestamp DESC);
CREATE INDEX IF NOT EXISTS incidents_severity_ts_idx
    ON incidents(severity, timestamp DESC);

PRAGMA user_version = 1;
";
