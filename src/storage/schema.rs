//! Database schema definitions
//!
//! One row per extracted listing. The full record is kept as a JSON document
//! so new listing fields never need a migration; `raw_text` and
//! `extracted_at` are broken out for ad-hoc queries.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    id TEXT PRIMARY KEY,
    document TEXT NOT NULL,
    raw_text TEXT NOT NULL,
    extracted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_extracted_at ON listings(extracted_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
