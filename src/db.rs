//! Local SQLite database layer for the Bro Bro Foods storefront.
//!
//! Uses rusqlite with WAL mode. This module is the order storage service:
//! it exclusively owns the order collection and the append-only status
//! event log. Provides schema migrations, settings helpers, and managed
//! state for use across Tauri commands.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Tauri managed state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Initialize the database at `{app_data_dir}/storefront.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(app_data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(app_data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = app_data_dir.join("storefront.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path)
                .map_err(|e| format!("Database open failed after retry: {e}"))?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }
    if current < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32) -> Result<(), String> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![version],
    )
    .map_err(|e| format!("record schema version {version}: {e}"))?;
    Ok(())
}

/// v1: orders and the append-only status event log.
///
/// Order ids are INTEGER PRIMARY KEY AUTOINCREMENT so they are issued
/// monotonically and never reused. All monetary columns are integer
/// rupees; there is no fractional paise handling anywhere in the app.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plate_type_id INTEGER NOT NULL,
            plate_type_name TEXT NOT NULL,
            price INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            total_amount INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS order_status_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL REFERENCES orders(id),
            status TEXT NOT NULL,
            changed_at TEXT NOT NULL,
            changed_by TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_status_events_order
            ON order_status_events(order_id, id);
        ",
    )
    .map_err(|e| format!("migrate v1: {e}"))?;
    record_version(conn, 1)
}

/// v2: local settings store (ads config, build status) and the
/// customer-asserted payment confirmation columns.
fn migrate_v2(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS local_settings (
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now')),
            PRIMARY KEY (setting_category, setting_key)
        );

        ALTER TABLE orders ADD COLUMN pc_utr TEXT;
        ALTER TABLE orders ADD COLUMN pc_paid_via TEXT;
        ALTER TABLE orders ADD COLUMN pc_paid_at TEXT;
        ALTER TABLE orders ADD COLUMN pc_payment_method_id INTEGER;
        ",
    )
    .map_err(|e| format!("migrate v2: {e}"))?;
    record_version(conn, 2)
}

/// v3: order-level payment method reference (currently always the
/// constant placeholder supplied by the frontend).
fn migrate_v3(conn: &Connection) -> Result<(), String> {
    conn.execute_batch("ALTER TABLE orders ADD COLUMN payment_method_id INTEGER;")
        .map_err(|e| format!("migrate v3: {e}"))?;
    record_version(conn, 3)
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Read a single setting. Returns `None` when the key does not exist.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(
    conn: &Connection,
    category: &str,
    key: &str,
    value: &str,
) -> Result<(), String> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(|e| format!("set_setting: {e}"))?;
    Ok(())
}

/// Read a setting that stores a JSON document. Unparseable or missing
/// values come back as `Null` rather than an error.
pub fn get_json_setting(db: &DbState, category: &str, key: &str) -> Result<serde_json::Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    if let Some(raw) = get_setting(&conn, category, key) {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&raw) {
            return Ok(parsed);
        }
    }
    Ok(serde_json::Value::Null)
}

/// Write a JSON document into the settings store.
pub fn set_json_setting(
    db: &DbState,
    category: &str,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    set_setting(&conn, category, key, &value.to_string())
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("run_migrations should succeed in test");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .expect("pragma setup");
        run_migrations_for_test(&conn);
        conn
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_conn();
        run_migrations(&conn).expect("second run");
        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn order_ids_are_monotonic() {
        let conn = test_conn();
        for _ in 0..3 {
            conn.execute(
                "INSERT INTO orders (plate_type_id, plate_type_name, price, quantity, total_amount, created_at)
                 VALUES (1, 'Half Plate', 50, 2, 100, datetime('now'))",
                [],
            )
            .unwrap();
        }
        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM orders ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn set_and_get_setting_roundtrip() {
        let conn = test_conn();
        set_setting(&conn, "ads", "settings", "{\"enabled\":false}").unwrap();
        assert_eq!(
            get_setting(&conn, "ads", "settings").as_deref(),
            Some("{\"enabled\":false}")
        );
        set_setting(&conn, "ads", "settings", "{\"enabled\":true}").unwrap();
        assert_eq!(
            get_setting(&conn, "ads", "settings").as_deref(),
            Some("{\"enabled\":true}")
        );
        assert!(get_setting(&conn, "ads", "missing").is_none());
    }
}
