//! Session persistence: the raw bearer token and the decoded identity.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::token::DecodedIdentity;
use crate::error::{DashboardError, Result};
use crate::logging::{log, obj, token_fingerprint, v_str, Domain, Level};

pub const TOKEN_KEY: &str = "jwt";
pub const IDENTITY_KEY: &str = "user";

/// Key/value persistence for one login session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Stores token and identity together.
    fn save_login(&mut self, token: &str, identity: &DecodedIdentity) -> Result<()> {
        let encoded = serde_json::to_string(identity)
            .map_err(|e| DashboardError::Session(format!("encode identity: {}", e)))?;
        self.set(TOKEN_KEY, token)?;
        self.set(IDENTITY_KEY, &encoded)?;
        log(
            Level::Info,
            Domain::Session,
            "login_saved",
            obj(&[("token_ref", v_str(&token_fingerprint(token)))]),
        );
        Ok(())
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(self.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    fn require_token(&self) -> Result<String> {
        self.token()?.ok_or(DashboardError::NotAuthenticated)
    }

    fn identity(&self) -> Result<Option<DecodedIdentity>> {
        match self.get(IDENTITY_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DashboardError::Session(format!("decode identity: {}", e))),
            None => Ok(None),
        }
    }

    /// Logout: token and identity are always cleared together.
    fn clear(&mut self) -> Result<()> {
        self.remove(TOKEN_KEY)?;
        self.remove(IDENTITY_KEY)?;
        log(Level::Info, Domain::Session, "cleared", obj(&[]));
        Ok(())
    }
}

/// Process-lifetime store, used in tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Session kept in a small SQLite file so it survives between CLI invocations.
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    pub fn open(path: &str) -> Result<Self> {
        let mut store = Self { conn: Connection::open(path)? };
        store.init()?;
        Ok(store)
    }

    fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS session (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM session WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO session (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM session WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM session WHERE key IN (?1, ?2)", params![TOKEN_KEY, IDENTITY_KEY])?;
        tx.commit()?;
        log(Level::Info, Domain::Session, "cleared", obj(&[]));
        Ok(())
    }
}
