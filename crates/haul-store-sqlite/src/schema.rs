//! SQL schema for the haul SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS uploads (
    upload_id    TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    kind         TEXT NOT NULL,
    uploaded_at  TEXT NOT NULL,      -- RFC 3339 UTC
    processed    INTEGER NOT NULL,   -- 0 when the file could not be read
    content_hash TEXT NOT NULL,      -- SHA-256 hex of the raw file
    created      INTEGER NOT NULL DEFAULT 0,
    updated      INTEGER NOT NULL DEFAULT 0,
    skipped      INTEGER NOT NULL DEFAULT 0,
    conflicts    INTEGER NOT NULL DEFAULT 0,
    error        TEXT
);

-- One row per journey. The full record lives in record_json; the other
-- columns are copies used for the natural key and for filtering.
CREATE TABLE IF NOT EXISTS journeys (
    journey_id       TEXT PRIMARY KEY,
    load_number      TEXT NOT NULL,
    create_date      TEXT NOT NULL,  -- YYYY-MM-DD
    truck_number     TEXT NOT NULL,
    driver_name      TEXT NOT NULL,
    customer_name    TEXT NOT NULL,
    current_status   TEXT NOT NULL,
    efficiency_score REAL,
    record_json      TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (load_number, create_date, truck_number)
);

CREATE INDEX IF NOT EXISTS journeys_load_date_idx  ON journeys(load_number, create_date);
CREATE INDEX IF NOT EXISTS journeys_status_idx     ON journeys(current_status);
CREATE INDEX IF NOT EXISTS journeys_efficiency_idx ON journeys(efficiency_score);
CREATE INDEX IF NOT EXISTS uploads_hash_idx        ON uploads(kind, content_hash);

PRAGMA user_version = 1;
";
