//! SQLite implementation of `OfferRepository`.
//!
//! Persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table tracking the schema version.
//! When the schema changes, increment `CURRENT_SCHEMA_VERSION` and add a
//! migration in `run_migrations()`. Migrations run sequentially from the
//! current version to the target version.
//!
//! # Layout
//!
//! The offer document is stored as JSON in `offer_json`; `status`,
//! `brand_id`, and `creator_id` are mirrored into indexed columns for the
//! compare-and-swap and the party-scoped lists. Use `#[serde(default)]` on
//! new `PrOffer` fields so old rows keep deserializing.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use prbridge_core::{BrandId, CreatorId, CreatorProfile, OfferId, OfferStatus, PrOffer};

use super::{OfferRepository, RepositoryError};

/// Current schema version. Increment when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed offer repository.
///
/// All statements are short; the connection is shared behind a mutex and
/// never held across an await point.
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Create a new SQLite repository at the given path.
    ///
    /// Creates the database file and schema if they don't exist, and runs
    /// pending migrations otherwise. The database is configured with WAL
    /// journaling and a busy timeout so concurrent requests queue instead
    /// of failing.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();

        if path_str != ":memory:" && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        // WAL can silently stay off on filesystems without shared-memory
        // support; verify it actually took. In-memory databases report
        // "memory", which is fine for tests.
        let is_in_memory = path_str == ":memory:";
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;
        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            return Err(RepositoryError::storage(
                "configure journal_mode",
                format!(
                    "failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "database schema version {} is newer than supported version {}; \
                     upgrade the application",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS offers (
                    id TEXT PRIMARY KEY,
                    brand_id TEXT NOT NULL,
                    creator_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    offer_json TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_offers_brand ON offers(brand_id);
                CREATE INDEX IF NOT EXISTS idx_offers_creator ON offers(creator_id);
                CREATE INDEX IF NOT EXISTS idx_offers_status ON offers(status);

                CREATE TABLE IF NOT EXISTS creator_profiles (
                    creator_id TEXT PRIMARY KEY,
                    profile_json TEXT NOT NULL
                );
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT INTO schema_version (id, version) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET version = ?1",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("record schema version", e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::storage("lock connection", "mutex poisoned"))
    }

    fn row_to_offer(offer_json: String) -> Result<PrOffer, RepositoryError> {
        Ok(serde_json::from_str(&offer_json)?)
    }

    fn query_offers(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<PrOffer>, RepositoryError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| RepositoryError::storage("prepare query", e.to_string()))?;
        let rows = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(|e| RepositoryError::storage("query offers", e.to_string()))?;

        let mut offers = Vec::new();
        for row in rows {
            let json = row.map_err(|e| RepositoryError::storage("read row", e.to_string()))?;
            offers.push(Self::row_to_offer(json)?);
        }
        Ok(offers)
    }
}

#[async_trait]
impl OfferRepository for SqliteRepository {
    async fn insert(&self, offer: &PrOffer) -> Result<(), RepositoryError> {
        let offer_json = serde_json::to_string(offer)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO offers (id, brand_id, creator_id, status, created_at, offer_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                offer.id.to_string(),
                offer.brand_id.to_string(),
                offer.creator_id.to_string(),
                offer.status.as_str(),
                offer.created_at.to_rfc3339(),
                offer_json,
            ],
        )
        .map_err(|e| RepositoryError::storage("insert offer", e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: &OfferId) -> Result<Option<PrOffer>, RepositoryError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT offer_json FROM offers WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("get offer", e.to_string()))?;
        json.map(Self::row_to_offer).transpose()
    }

    async fn update_where_status(
        &self,
        offer: &PrOffer,
        expected: OfferStatus,
    ) -> Result<(), RepositoryError> {
        let offer_json = serde_json::to_string(offer)?;
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE offers SET status = ?1, offer_json = ?2
                 WHERE id = ?3 AND status = ?4",
                params![
                    offer.status.as_str(),
                    offer_json,
                    offer.id.to_string(),
                    expected.as_str(),
                ],
            )
            .map_err(|e| RepositoryError::storage("update offer", e.to_string()))?;

        if changed == 1 {
            return Ok(());
        }

        // Zero rows: either the offer is gone or someone swapped first.
        let actual: Option<String> = conn
            .query_row(
                "SELECT status FROM offers WHERE id = ?1",
                params![offer.id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepositoryError::storage("re-read status", e.to_string()))?;

        match actual {
            None => Err(RepositoryError::NotFound),
            Some(raw) => {
                let actual = OfferStatus::parse(&raw).ok_or_else(|| {
                    RepositoryError::storage("parse status", format!("unknown status '{}'", raw))
                })?;
                Err(RepositoryError::Stale { expected, actual })
            }
        }
    }

    async fn list_for_brand(&self, brand_id: &BrandId) -> Result<Vec<PrOffer>, RepositoryError> {
        let conn = self.lock()?;
        Self::query_offers(
            &conn,
            "SELECT offer_json FROM offers WHERE brand_id = ?1 ORDER BY created_at DESC",
            params![brand_id.to_string()],
        )
    }

    async fn list_for_creator(
        &self,
        creator_id: &CreatorId,
    ) -> Result<Vec<PrOffer>, RepositoryError> {
        let conn = self.lock()?;
        Self::query_offers(
            &conn,
            "SELECT offer_json FROM offers WHERE creator_id = ?1 ORDER BY created_at DESC",
            params![creator_id.to_string()],
        )
    }

    async fn list_all(&self) -> Result<Vec<PrOffer>, RepositoryError> {
        let conn = self.lock()?;
        Self::query_offers(
            &conn,
            "SELECT offer_json FROM offers ORDER BY created_at DESC",
            params![],
        )
    }

    async fn upsert_creator_profile(
        &self,
        profile: &CreatorProfile,
    ) -> Result<(), RepositoryError> {
        let profile_json = serde_json::to_string(profile)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO creator_profiles (creator_id, profile_json) VALUES (?1, ?2)
             ON CONFLICT(creator_id) DO UPDATE SET profile_json = ?2",
            params![profile.creator_id.to_string(), profile_json],
        )
        .map_err(|e| RepositoryError::storage("upsert profile", e.to_string()))?;
        Ok(())
    }

    async fn creator_profiles(&self) -> Result<Vec<CreatorProfile>, RepositoryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT profile_json FROM creator_profiles ORDER BY creator_id")
            .map_err(|e| RepositoryError::storage("prepare query", e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| RepositoryError::storage("query profiles", e.to_string()))?;

        let mut profiles = Vec::new();
        for row in rows {
            let json = row.map_err(|e| RepositoryError::storage("read row", e.to_string()))?;
            profiles.push(serde_json::from_str(&json)?);
        }
        Ok(profiles)
    }
}
