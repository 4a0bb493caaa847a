//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the content repository.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Theme folders
CREATE TABLE IF NOT EXISTS themes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    folder TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Imported sites
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    root_url TEXT NOT NULL,
    theme_id INTEGER,
    created_at TEXT NOT NULL
);

-- Repository folders
CREATE TABLE IF NOT EXISTS folders (
    path TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

-- Page templates
CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    head_content TEXT NOT NULL DEFAULT '',
    body_content TEXT NOT NULL DEFAULT '',
    checked_out INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_templates_site ON templates(site_id);

-- Pages, cataloged first and filled in by commits
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER,
    path TEXT NOT NULL UNIQUE,
    folder TEXT NOT NULL,
    name TEXT NOT NULL,
    title TEXT,
    link_text TEXT NOT NULL DEFAULT '',
    remote_url TEXT NOT NULL DEFAULT '',
    template_id INTEGER,
    description TEXT,
    head_content TEXT NOT NULL DEFAULT '',
    after_body_start TEXT NOT NULL DEFAULT '',
    before_body_close TEXT NOT NULL DEFAULT '',
    body_content TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    checked_out INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_site ON pages(site_id);
CREATE INDEX IF NOT EXISTS idx_pages_folder ON pages(folder);

-- Downloaded files and page content attachments
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    remote_url TEXT,
    content_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    data BLOB NOT NULL,
    page_id INTEGER,
    created_at TEXT NOT NULL
);

-- Rendered previews
CREATE TABLE IF NOT EXISTS thumbnails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL,
    page_id INTEGER NOT NULL,
    caption TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Aggregated import statistics
CREATE TABLE IF NOT EXISTS summaries (
    site_name TEXT NOT NULL,
    category TEXT NOT NULL,
    count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (site_name, category)
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in [
            "themes",
            "sites",
            "folders",
            "templates",
            "pages",
            "assets",
            "thumbnails",
            "summaries",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
