//! SQLite repository implementation
//!
//! This module provides a SQLite-backed implementation of every repository
//! collaborator trait. The connection sits behind a mutex; each call holds
//! it only for the statements it runs.

use crate::repository::schema::initialize_schema;
use crate::repository::traits::{
    AssetStore, PageCatalogService, PageStore, RepositoryError, RepositoryResult, SiteStore,
    TemplateStore, ThemeStore, ThumbnailRenderer,
};
use crate::repository::{
    AssetRecord, ContentId, PageHandle, PageRecord, PageStatus, SiteRecord, TemplateRecord,
    ThemeRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PAGE_COLUMNS: &str = "id, site_id, folder, name, title, link_text, remote_url, template_id,
     description, head_content, after_body_start, before_body_close, body_content, status, checked_out";

const TEMPLATE_COLUMNS: &str = "id, site_id, name, head_content, body_content, checked_out";

/// SQLite content repository
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens (or creates) a repository database file
    pub fn new(path: &Path) -> RepositoryResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory repository
    pub fn in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Database("connection lock poisoned".to_string()))
    }

    // ===== Summary persistence =====

    /// Adds per-category counts to a site's stored summary
    pub fn save_summary(
        &self,
        site_name: &str,
        counts: &HashMap<String, u64>,
    ) -> RepositoryResult<()> {
        let conn = self.conn()?;
        for (category, count) in counts {
            conn.execute(
                "INSERT INTO summaries (site_name, category, count) VALUES (?1, ?2, ?3)
                 ON CONFLICT(site_name, category) DO UPDATE SET count = count + excluded.count",
                params![site_name, category, *count as i64],
            )?;
        }
        Ok(())
    }

    /// Loads a site's stored summary
    pub fn load_summary(&self, site_name: &str) -> RepositoryResult<BTreeMap<String, u64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT category, count FROM summaries WHERE site_name = ?1")?;
        let rows = stmt.query_map(params![site_name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = BTreeMap::new();
        for row in rows {
            let (category, count) = row?;
            summary.insert(category, count.max(0) as u64);
        }
        Ok(summary)
    }

    /// Lists every site, oldest first
    pub fn list_sites(&self) -> RepositoryResult<Vec<SiteRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, root_url, theme_id, created_at FROM sites ORDER BY id")?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    pub fn count_thumbnails(&self, site_id: ContentId) -> RepositoryResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM thumbnails WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn count_assets(&self) -> RepositoryResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assets WHERE page_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        root_url: row.get(2)?,
        theme_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        folder: row.get(2)?,
        name: row.get(3)?,
        title: row.get(4)?,
        link_text: row.get(5)?,
        remote_url: row.get(6)?,
        template_id: row.get(7)?,
        description: row.get(8)?,
        head_content: row.get(9)?,
        after_body_start: row.get(10)?,
        before_body_close: row.get(11)?,
        body_content: row.get(12)?,
        status: PageStatus::from_db_string(&row.get::<_, String>(13)?)
            .unwrap_or(PageStatus::Cataloged),
        checked_out: row.get(14)?,
    })
}

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<TemplateRecord> {
    Ok(TemplateRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        name: row.get(2)?,
        head_content: row.get(3)?,
        body_content: row.get(4)?,
        checked_out: row.get(5)?,
    })
}

/// Inserts `path` and all of its parent folders
///
/// Returns true when `path` itself was newly created.
fn ensure_folders(conn: &Connection, path: &str) -> rusqlite::Result<bool> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let created_at = now();
    let mut created = false;
    let mut current = String::new();

    for segment in segments {
        current.push('/');
        current.push_str(segment);
        created = conn.execute(
            "INSERT OR IGNORE INTO folders (path, created_at) VALUES (?1, ?2)",
            params![current, created_at],
        )? > 0;
    }

    Ok(created)
}

fn folder_exists(conn: &Connection, path: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM folders WHERE path = ?1",
        params![path],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn page_exists(conn: &Connection, path: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pages WHERE path = ?1",
        params![path],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Reads a checked-out flag; `None` when the row does not exist
fn checked_out_flag(conn: &Connection, table: &str, id: ContentId) -> rusqlite::Result<Option<bool>> {
    conn.query_row(
        &format!("SELECT checked_out FROM {} WHERE id = ?1", table),
        params![id],
        |row| row.get(0),
    )
    .optional()
}

fn checkout(conn: &Connection, table: &str, id: ContentId) -> RepositoryResult<()> {
    match checked_out_flag(conn, table, id)? {
        None => Err(RepositoryError::NotFound(format!("{} {}", table, id))),
        Some(true) => Err(RepositoryError::CheckedOut(id)),
        Some(false) => {
            conn.execute(
                &format!("UPDATE {} SET checked_out = 1 WHERE id = ?1", table),
                params![id],
            )?;
            Ok(())
        }
    }
}

fn checkin(conn: &Connection, table: &str, id: ContentId) -> RepositoryResult<()> {
    match checked_out_flag(conn, table, id)? {
        None => Err(RepositoryError::NotFound(format!("{} {}", table, id))),
        Some(false) => Err(RepositoryError::NotCheckedOut(id)),
        Some(true) => {
            conn.execute(
                &format!("UPDATE {} SET checked_out = 0 WHERE id = ?1", table),
                params![id],
            )?;
            Ok(())
        }
    }
}

fn require_checked_out(conn: &Connection, table: &str, id: ContentId) -> RepositoryResult<()> {
    match checked_out_flag(conn, table, id)? {
        None => Err(RepositoryError::NotFound(format!("{} {}", table, id))),
        Some(false) => Err(RepositoryError::NotCheckedOut(id)),
        Some(true) => Ok(()),
    }
}

#[async_trait]
impl PageCatalogService for SqliteRepository {
    async fn add_catalog_page(
        &self,
        site_name: &str,
        page_name: &str,
        link_text: &str,
        folder: &str,
        remote_url: &str,
    ) -> RepositoryResult<Option<PageHandle>> {
        let conn = self.conn()?;
        let path = format!("{}/{}", folder, page_name);

        if page_exists(&conn, &path)? || folder_exists(&conn, &path)? {
            return Ok(None);
        }

        let site_id: Option<ContentId> = conn
            .query_row(
                "SELECT id FROM sites WHERE name = ?1",
                params![site_name],
                |row| row.get(0),
            )
            .optional()?;

        ensure_folders(&conn, folder)?;

        let timestamp = now();
        conn.execute(
            "INSERT INTO pages (site_id, path, folder, name, link_text, remote_url, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                site_id,
                path,
                folder,
                page_name,
                link_text,
                remote_url,
                PageStatus::Cataloged.to_db_string(),
                timestamp
            ],
        )?;

        Ok(Some(PageHandle {
            id: conn.last_insert_rowid(),
            path,
        }))
    }

    async fn page_exists_at_path(&self, path: &str) -> RepositoryResult<bool> {
        let conn = self.conn()?;
        Ok(page_exists(&conn, path)?)
    }

    async fn promote_cataloged_page(&self, id: ContentId) -> RepositoryResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE pages SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![PageStatus::Imported.to_db_string(), now(), id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("page {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl PageStore for SqliteRepository {
    async fn get_page(&self, id: ContentId) -> RepositoryResult<Option<PageRecord>> {
        let conn = self.conn()?;
        let page = conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![id],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    async fn find_page_by_path(&self, path: &str) -> RepositoryResult<Option<PageRecord>> {
        let conn = self.conn()?;
        let page = conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE path = ?1", PAGE_COLUMNS),
                params![path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    async fn pages_under(&self, prefix: &str) -> RepositoryResult<Vec<PageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages WHERE folder = ?1 OR folder LIKE ?1 || '/%' ORDER BY path",
            PAGE_COLUMNS
        ))?;
        let pages = stmt
            .query_map(params![prefix], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    async fn checkout_page(&self, id: ContentId) -> RepositoryResult<()> {
        let conn = self.conn()?;
        checkout(&conn, "pages", id)
    }

    async fn save_page(&self, page: &PageRecord) -> RepositoryResult<()> {
        let conn = self.conn()?;
        require_checked_out(&conn, "pages", page.id)?;

        let path = page.path();
        let occupied: Option<ContentId> = conn
            .query_row(
                "SELECT id FROM pages WHERE path = ?1 AND id != ?2",
                params![path, page.id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(other) = occupied {
            return Err(RepositoryError::ConstraintViolation(format!(
                "{} is already used by page {}",
                path, other
            )));
        }

        conn.execute(
            "UPDATE pages SET path = ?1, folder = ?2, name = ?3, title = ?4, link_text = ?5,
             remote_url = ?6, template_id = ?7, description = ?8, head_content = ?9,
             after_body_start = ?10, before_body_close = ?11, body_content = ?12,
             status = ?13, updated_at = ?14 WHERE id = ?15",
            params![
                path,
                page.folder,
                page.name,
                page.title,
                page.link_text,
                page.remote_url,
                page.template_id,
                page.description,
                page.head_content,
                page.after_body_start,
                page.before_body_close,
                page.body_content,
                page.status.to_db_string(),
                now(),
                page.id
            ],
        )?;
        Ok(())
    }

    async fn checkin_page(&self, id: ContentId) -> RepositoryResult<()> {
        let conn = self.conn()?;
        checkin(&conn, "pages", id)
    }

    async fn delete_page(&self, id: ContentId) -> RepositoryResult<bool> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM assets WHERE page_id = ?1", params![id])?;
        let deleted = conn.execute("DELETE FROM pages WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    async fn create_folder(&self, path: &str) -> RepositoryResult<bool> {
        let conn = self.conn()?;
        Ok(ensure_folders(&conn, path)?)
    }

    async fn folder_exists(&self, path: &str) -> RepositoryResult<bool> {
        let conn = self.conn()?;
        Ok(folder_exists(&conn, path)?)
    }
}

#[async_trait]
impl TemplateStore for SqliteRepository {
    async fn create_template(
        &self,
        site_id: ContentId,
        name: &str,
        head_content: &str,
        body_content: &str,
    ) -> RepositoryResult<TemplateRecord> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO templates (site_id, name, head_content, body_content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![site_id, name, head_content, body_content, now()],
        )?;
        Ok(TemplateRecord {
            id: conn.last_insert_rowid(),
            site_id,
            name: name.to_string(),
            head_content: head_content.to_string(),
            body_content: body_content.to_string(),
            checked_out: false,
        })
    }

    async fn get_template(&self, id: ContentId) -> RepositoryResult<Option<TemplateRecord>> {
        let conn = self.conn()?;
        let template = conn
            .query_row(
                &format!("SELECT {} FROM templates WHERE id = ?1", TEMPLATE_COLUMNS),
                params![id],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    async fn find_template_for_site(
        &self,
        site_id: ContentId,
    ) -> RepositoryResult<Option<TemplateRecord>> {
        let conn = self.conn()?;
        let template = conn
            .query_row(
                &format!(
                    "SELECT {} FROM templates WHERE site_id = ?1 ORDER BY id LIMIT 1",
                    TEMPLATE_COLUMNS
                ),
                params![site_id],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    async fn checkout_template(&self, id: ContentId) -> RepositoryResult<()> {
        let conn = self.conn()?;
        checkout(&conn, "templates", id)
    }

    async fn save_template(&self, template: &TemplateRecord) -> RepositoryResult<()> {
        let conn = self.conn()?;
        require_checked_out(&conn, "templates", template.id)?;
        conn.execute(
            "UPDATE templates SET name = ?1, head_content = ?2, body_content = ?3 WHERE id = ?4",
            params![
                template.name,
                template.head_content,
                template.body_content,
                template.id
            ],
        )?;
        Ok(())
    }

    async fn checkin_template(&self, id: ContentId) -> RepositoryResult<()> {
        let conn = self.conn()?;
        checkin(&conn, "templates", id)
    }

    async fn delete_template(&self, id: ContentId) -> RepositoryResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl ThemeStore for SqliteRepository {
    async fn create_theme(&self, name: &str, folder: &str) -> RepositoryResult<ThemeRecord> {
        let conn = self.conn()?;
        ensure_folders(&conn, folder)?;
        let created_at = now();
        conn.execute(
            "INSERT INTO themes (name, folder, created_at) VALUES (?1, ?2, ?3)",
            params![name, folder, created_at],
        )?;
        Ok(ThemeRecord {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            folder: folder.to_string(),
            created_at,
        })
    }

    async fn find_theme(&self, name: &str) -> RepositoryResult<Option<ThemeRecord>> {
        let conn = self.conn()?;
        let theme = conn
            .query_row(
                "SELECT id, name, folder, created_at FROM themes WHERE name = ?1",
                params![name],
                |row| {
                    Ok(ThemeRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        folder: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(theme)
    }

    async fn delete_theme(&self, id: ContentId) -> RepositoryResult<bool> {
        let conn = self.conn()?;
        let folder: Option<String> = conn
            .query_row(
                "SELECT folder FROM themes WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(folder) = folder else {
            return Ok(false);
        };

        conn.execute(
            "DELETE FROM folders WHERE path = ?1 OR path LIKE ?1 || '/%'",
            params![folder],
        )?;
        conn.execute("DELETE FROM themes WHERE id = ?1", params![id])?;
        Ok(true)
    }
}

#[async_trait]
impl SiteStore for SqliteRepository {
    async fn create_site(
        &self,
        name: &str,
        root_url: &str,
        theme_id: Option<ContentId>,
    ) -> RepositoryResult<SiteRecord> {
        let conn = self.conn()?;
        let created_at = now();
        conn.execute(
            "INSERT INTO sites (name, root_url, theme_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, root_url, theme_id, created_at],
        )?;
        Ok(SiteRecord {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            root_url: root_url.to_string(),
            theme_id,
            created_at,
        })
    }

    async fn find_site(&self, name: &str) -> RepositoryResult<Option<SiteRecord>> {
        let conn = self.conn()?;
        let site = conn
            .query_row(
                "SELECT id, name, root_url, theme_id, created_at FROM sites WHERE name = ?1",
                params![name],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    async fn delete_site(&self, id: ContentId) -> RepositoryResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let deleted = {
            tx.execute(
                "DELETE FROM assets WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?1)",
                params![id],
            )?;
            tx.execute("DELETE FROM pages WHERE site_id = ?1", params![id])?;
            tx.execute("DELETE FROM templates WHERE site_id = ?1", params![id])?;
            tx.execute("DELETE FROM thumbnails WHERE site_id = ?1", params![id])?;
            tx.execute("DELETE FROM sites WHERE id = ?1", params![id])?
        };

        tx.commit()?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl AssetStore for SqliteRepository {
    async fn store_asset(
        &self,
        path: &str,
        remote_url: &str,
        content_type: &str,
        data: &[u8],
    ) -> RepositoryResult<ContentId> {
        let conn = self.conn()?;
        if let Some((folder, _)) = path.rsplit_once('/') {
            ensure_folders(&conn, folder)?;
        }
        conn.execute(
            "INSERT INTO assets (path, remote_url, content_type, size, data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(path) DO UPDATE SET remote_url = excluded.remote_url,
                content_type = excluded.content_type, size = excluded.size, data = excluded.data",
            params![path, remote_url, content_type, data.len() as i64, data, now()],
        )?;
        let id = conn.query_row(
            "SELECT id FROM assets WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    async fn find_asset(&self, path: &str) -> RepositoryResult<Option<AssetRecord>> {
        let conn = self.conn()?;
        let asset = conn
            .query_row(
                "SELECT id, path, remote_url, content_type, size, page_id FROM assets WHERE path = ?1",
                params![path],
                |row| {
                    Ok(AssetRecord {
                        id: row.get(0)?,
                        path: row.get(1)?,
                        remote_url: row.get(2)?,
                        content_type: row.get(3)?,
                        size: row.get::<_, i64>(4)? as u64,
                        page_id: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(asset)
    }

    async fn attach_content(
        &self,
        page_id: ContentId,
        content_type: &str,
        data: &[u8],
    ) -> RepositoryResult<ContentId> {
        let conn = self.conn()?;
        require_checked_out(&conn, "pages", page_id)?;

        let path = format!("/.content/{}", page_id);
        conn.execute(
            "INSERT INTO assets (path, content_type, size, data, page_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(path) DO UPDATE SET content_type = excluded.content_type,
                size = excluded.size, data = excluded.data",
            params![path, content_type, data.len() as i64, data, page_id, now()],
        )?;
        let id = conn.query_row(
            "SELECT id FROM assets WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

#[async_trait]
impl ThumbnailRenderer for SqliteRepository {
    async fn render_thumbnail(
        &self,
        site_id: ContentId,
        page_id: ContentId,
    ) -> RepositoryResult<ContentId> {
        let conn = self.conn()?;
        let caption: Option<(Option<String>, String)> = conn
            .query_row(
                "SELECT title, path FROM pages WHERE id = ?1",
                params![page_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((title, path)) = caption else {
            return Err(RepositoryError::NotFound(format!("page {}", page_id)));
        };

        conn.execute(
            "INSERT INTO thumbnails (site_id, page_id, caption, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![site_id, page_id, title.unwrap_or(path), now()],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
