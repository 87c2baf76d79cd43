//! Namespace and entry CRUD operations.
//!
//! A namespace is a named, isolated collection of cached entries. An
//! entry is owned exclusively by its namespace and overwritten wholesale
//! on every re-store (UPSERT), never partially updated. Deleting a
//! namespace drops its entries in the same statement via the cascading
//! foreign key.

use super::connection::StoreDb;
use super::hash::compute_entry_key;
use crate::request::{Method, Request};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// The response material persisted for a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A cached entry: request identity plus the stored response.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub key_hash: String,
    pub method: Method,
    pub url: String,
    pub response: StoredResponse,
    pub stored_at: String,
}

impl CachedEntry {
    /// Build an entry for a request/response pair, stamping `stored_at` now.
    pub fn new(request: &Request, response: StoredResponse) -> Self {
        let url = request.url.as_str().to_string();
        Self {
            key_hash: compute_entry_key(request.method.as_str(), &url),
            method: request.method,
            url,
            response,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The key a request would be stored under.
    pub fn key_for(request: &Request) -> String {
        compute_entry_key(request.method.as_str(), request.url.as_str())
    }
}

impl StoreDb {
    /// Open-or-create a namespace by name. Idempotent.
    pub async fn open_namespace(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO namespaces (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Enumerate every namespace name currently on disk.
    pub async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM namespaces ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a namespace and all of its entries.
    ///
    /// Returns true if the namespace existed.
    pub async fn delete_namespace(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM namespaces WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every namespace regardless of generation (hard reset).
    ///
    /// Returns the number of deleted namespaces. A no-op on an empty store.
    pub async fn delete_all_namespaces(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM namespaces", [])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite a cached entry.
    ///
    /// Uses UPSERT semantics: inserts if the key doesn't exist in the
    /// namespace, replaces every field if it does.
    pub async fn put_entry(&self, namespace: &str, entry: &CachedEntry) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let entry = entry.clone();
        let headers_json = serde_json::to_string(&entry.response.headers).unwrap_or_default();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        namespace, key_hash, method, url, status, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(namespace, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        namespace,
                        entry.key_hash,
                        entry.method.as_str(),
                        entry.url,
                        entry.response.status,
                        headers_json,
                        entry.response.body,
                        entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by key within a namespace.
    ///
    /// Returns None if the key doesn't exist in the namespace.
    pub async fn get_entry(&self, namespace: &str, key_hash: &str) -> Result<Option<CachedEntry>, Error> {
        let namespace = namespace.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status, headers_json, body, stored_at
                     FROM entries WHERE namespace = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![namespace, key_hash], |row| {
                    let method_str: String = row.get(1)?;
                    let headers_json: String = row.get(4)?;
                    Ok(CachedEntry {
                        key_hash: row.get(0)?,
                        method: parse_method(&method_str),
                        url: row.get(2)?,
                        response: StoredResponse {
                            status: row.get::<_, i64>(3)? as u16,
                            headers: serde_json::from_str(&headers_json).unwrap_or_default(),
                            body: row.get(5)?,
                        },
                        stored_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an entry by key within a namespace.
    ///
    /// Returns true if the entry existed.
    pub async fn delete_entry(&self, namespace: &str, key_hash: &str) -> Result<bool, Error> {
        let namespace = namespace.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE namespace = ?1 AND key_hash = ?2",
                    params![namespace, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Count entries in a namespace.
    pub async fn count_entries(&self, namespace: &str) -> Result<u64, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn parse_method(s: &str) -> Method {
    match s {
        "HEAD" => Method::Head,
        "POST" => Method::Post,
        "PUT" => Method::Put,
        "PATCH" => Method::Patch,
        "DELETE" => Method::Delete,
        _ => Method::Get,
    }
}
