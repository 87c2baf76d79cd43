//! Pending mutation queue operations.
//!
//! Rows record mutating requests that failed while offline so a retry
//! driver can replay them later. The replay itself lives in the worker;
//! this module only owns the persistence.

use super::connection::StoreDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Lifecycle of a queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    Queued,
    Retrying,
    Succeeded,
    Abandoned,
}

impl MutationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationStatus::Queued => "queued",
            MutationStatus::Retrying => "retrying",
            MutationStatus::Succeeded => "succeeded",
            MutationStatus::Abandoned => "abandoned",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "retrying" => MutationStatus::Retrying,
            "succeeded" => MutationStatus::Succeeded,
            "abandoned" => MutationStatus::Abandoned,
            _ => MutationStatus::Queued,
        }
    }
}

/// A mutating request captured for deferred replay.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub id: i64,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub attempts: u32,
    pub status: MutationStatus,
    pub created_at: String,
}

impl StoreDb {
    /// Record a failed mutating request. Returns the new row id.
    pub async fn enqueue_mutation(
        &self, method: &str, url: &str, headers: &[(String, String)], body: Option<Vec<u8>>,
    ) -> Result<i64, Error> {
        let method = method.to_string();
        let url = url.to_string();
        let headers_json = serde_json::to_string(headers).unwrap_or_default();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO pending_mutations (method, url, headers_json, body, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![method, url, headers_json, body, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// List mutations still awaiting replay (queued or retrying), oldest first.
    pub async fn pending_mutations(&self) -> Result<Vec<PendingMutation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PendingMutation>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, method, url, headers_json, body, attempts, status, created_at
                     FROM pending_mutations
                     WHERE status IN ('queued', 'retrying')
                     ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        let headers_json: String = row.get(3)?;
                        let status: String = row.get(6)?;
                        Ok(PendingMutation {
                            id: row.get(0)?,
                            method: row.get(1)?,
                            url: row.get(2)?,
                            headers: serde_json::from_str(&headers_json).unwrap_or_default(),
                            body: row.get(4)?,
                            attempts: row.get::<_, i64>(5)? as u32,
                            status: MutationStatus::parse(&status),
                            created_at: row.get(7)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Move a mutation to a new status, bumping the attempt counter when
    /// it enters `retrying`.
    pub async fn mark_mutation(&self, id: i64, status: MutationStatus) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let bump = matches!(status, MutationStatus::Retrying) as i64;
                let updated = conn.execute(
                    "UPDATE pending_mutations SET status = ?2, attempts = attempts + ?3 WHERE id = ?1",
                    params![id, status.as_str(), bump],
                )?;
                if updated == 0 {
                    return Err(Error::CacheMiss(format!("pending mutation {id}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a mutation row (on success, or when abandoned rows are swept).
    pub async fn delete_mutation(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM pending_mutations WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Fetch one mutation by id.
    pub async fn get_mutation(&self, id: i64) -> Result<Option<PendingMutation>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<PendingMutation>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, method, url, headers_json, body, attempts, status, created_at
                     FROM pending_mutations WHERE id = ?1",
                )?;
                let result = stmt.query_row(params![id], |row| {
                    let headers_json: String = row.get(3)?;
                    let status: String = row.get(6)?;
                    Ok(PendingMutation {
                        id: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        headers: serde_json::from_str(&headers_json).unwrap_or_default(),
                        body: row.get(4)?,
                        attempts: row.get::<_, i64>(5)? as u32,
                        status: MutationStatus::parse(&status),
                        created_at: row.get(7)?,
                    })
                });
                match result {
                    Ok(m) => Ok(Some(m)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_and_list() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let id = db
            .enqueue_mutation("POST", "https://app.example/api/docs", &[], Some(b"{}".to_vec()))
            .await
            .unwrap();

        let pending = db.pending_mutations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].status, MutationStatus::Queued);
        assert_eq!(pending[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_retrying_bumps_attempts() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let id = db
            .enqueue_mutation("PUT", "https://app.example/api/docs/1", &[], None)
            .await
            .unwrap();

        db.mark_mutation(id, MutationStatus::Retrying).await.unwrap();
        db.mark_mutation(id, MutationStatus::Retrying).await.unwrap();

        let m = db.get_mutation(id).await.unwrap().unwrap();
        assert_eq!(m.attempts, 2);
        assert_eq!(m.status, MutationStatus::Retrying);
    }

    #[tokio::test]
    async fn test_succeeded_leaves_pending_list() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let id = db
            .enqueue_mutation("DELETE", "https://app.example/api/docs/1", &[], None)
            .await
            .unwrap();

        db.mark_mutation(id, MutationStatus::Succeeded).await.unwrap();
        assert!(db.pending_mutations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_missing_row() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let result = db.mark_mutation(999, MutationStatus::Abandoned).await;
        assert!(matches!(result, Err(Error::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_delete_mutation() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let id = db
            .enqueue_mutation("POST", "https://app.example/api/docs", &[], None)
            .await
            .unwrap();
        assert!(db.delete_mutation(id).await.unwrap());
        assert!(db.get_mutation(id).await.unwrap().is_none());
    }
}
