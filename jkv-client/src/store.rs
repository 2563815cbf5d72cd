//! # Operation Executor
//!
//! Purpose: Run each store operation on its own task, raced against the
//! caller's deadline, and map raw replies to typed outcomes.
//!
//! ## Design Principles
//!
//! 1. **Two-Way Wait**: The caller awaits "store replied" vs "deadline
//!    elapsed" through a timeout combinator over a joined task.
//! 2. **Abandon, Don't Kill**: When the deadline fires first, the round-trip
//!    keeps running detached; its reply is discarded and the borrow guard
//!    still returns the connection.
//! 3. **Atomic Set+Expire**: An expiring write is queued and executed as one
//!    batch that fully commits or fully aborts.
//! 4. **Static Operation Names**: Spans carry explicit operation labels; no
//!    runtime introspection.

use std::future::Future;

use serde_json::Value;
use tracing::Instrument;

use jkv_common::config::StoreSettings;
use jkv_common::envelope::SetRequest;

use crate::codec;
use crate::deadline::Deadline;
use crate::error::{StoreError, StoreResult};
use crate::pool::{Pool, PooledConn};
use crate::resp::Reply;
use crate::scan;

/// Outcome of a single-key delete.
///
/// The failure arm of the historical `-1 | 0 | 1+` contract is the `Err`
/// side of the result; these variants cover the two successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// The key did not exist; nothing was removed.
    Missing,
    /// The key existed and was removed; carries the store's count.
    Removed(u64),
}

/// Pooled, deadline-aware access to the JSON document store.
#[derive(Clone)]
pub struct DocumentStore {
    pool: Pool,
}

impl DocumentStore {
    /// Creates a store handle over a fresh connection pool.
    pub fn new(settings: &StoreSettings) -> Self {
        DocumentStore {
            pool: Pool::new(settings),
        }
    }

    /// Writes a document, transactionally pairing it with an expiry when the
    /// request carries one.
    pub async fn set(&self, deadline: Deadline, request: &SetRequest) -> StoreResult<()> {
        let expiry = request
            .expiry_seconds()
            .map_err(|_| StoreError::InvalidExpiry)?;
        let doc = codec::encode_document(&request.value)?;
        let key = request.key.clone();
        let pool = self.pool.clone();

        race(deadline, "set", async move {
            let mut conn = pool.acquire().await?;
            match expiry {
                Some(seconds) => set_with_expiry(&mut conn, &key, &doc, seconds).await,
                None => plain_set(&mut conn, &key, &doc).await,
            }
        })
        .await
    }

    /// Fetches the document stored under `key`.
    ///
    /// `Ok(None)` is a normal miss, not an error.
    pub async fn get(&self, deadline: Deadline, key: &str) -> StoreResult<Option<Value>> {
        let key = key.to_owned();
        let pool = self.pool.clone();

        race(deadline, "get", async move {
            let mut conn = pool.acquire().await?;
            let args = codec::get_args(&key);
            match conn.round_trip(&args).await? {
                Reply::Bulk(bytes) => Ok(Some(codec::decode_document(&bytes)?)),
                Reply::Null => Ok(None),
                Reply::Error(message) => Err(StoreError::Reply(message)),
                _ => Err(StoreError::UnexpectedReply),
            }
        })
        .await
    }

    /// Removes the document stored under `key`.
    pub async fn delete(&self, deadline: Deadline, key: &str) -> StoreResult<DeleteStatus> {
        let key = key.to_owned();
        let pool = self.pool.clone();

        race(deadline, "delete", async move {
            let mut conn = pool.acquire().await?;
            let args = codec::del_args(&key);
            match conn.round_trip(&args).await? {
                Reply::Integer(0) => Ok(DeleteStatus::Missing),
                Reply::Integer(count) if count > 0 => Ok(DeleteStatus::Removed(count as u64)),
                Reply::Error(message) => Err(StoreError::Reply(message)),
                _ => Err(StoreError::UnexpectedReply),
            }
        })
        .await
    }

    /// Removes every key matching the glob `pattern`, returning the
    /// confirmed count.
    ///
    /// The bare wildcard is refused before any store interaction. Deletions
    /// issued before a mid-scan failure or timeout are not rolled back.
    pub async fn delete_matching(&self, deadline: Deadline, pattern: &str) -> StoreResult<u64> {
        if pattern.trim() == "*" {
            return Err(StoreError::PatternForbidden);
        }
        let pattern = pattern.to_owned();
        let pool = self.pool.clone();

        race(deadline, "delete_matching", async move {
            let mut conn = pool.acquire().await?;
            scan::unlink_matching(&mut conn, &pattern).await
        })
        .await
    }

    /// Closes the underlying pool; subsequent operations fail fast.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Number of connections currently parked in the pool.
    pub fn idle_connections(&self) -> usize {
        self.pool.idle_connections()
    }
}

/// Spawns `work` and waits for whichever comes first: its result or the
/// deadline. On timeout the task keeps running detached so the borrow guard
/// can still return the connection once the reply drains.
async fn race<T, F>(deadline: Deadline, op: &'static str, work: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: Future<Output = StoreResult<T>> + Send + 'static,
{
    let span = tracing::info_span!("store_op", op);
    let handle = tokio::spawn(work.instrument(span));

    match tokio::time::timeout_at(deadline.instant(), handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            tracing::error!(op, error = %join_error, "store task failed to complete");
            Err(StoreError::Io(std::io::Error::other("store task aborted")))
        }
        Err(_elapsed) => {
            tracing::debug!(op, "deadline elapsed before the store replied");
            Err(StoreError::DeadlineExceeded)
        }
    }
}

async fn plain_set(conn: &mut PooledConn, key: &str, doc: &[u8]) -> StoreResult<()> {
    let args = codec::set_args(key, doc);
    match conn.round_trip(&args).await? {
        Reply::Simple(_) => Ok(()),
        Reply::Error(message) => Err(StoreError::Reply(message)),
        _ => Err(StoreError::UnexpectedReply),
    }
}

/// Queues the write and the expiry as one batch and executes it atomically:
/// the store applies both or neither.
async fn set_with_expiry(
    conn: &mut PooledConn,
    key: &str,
    doc: &[u8],
    seconds: u64,
) -> StoreResult<()> {
    let seconds = seconds.to_string();
    let begin: [&[u8]; 1] = [b"MULTI"];
    let write = codec::set_args(key, doc);
    let expire: [&[u8]; 3] = [b"EXPIRE", key.as_bytes(), seconds.as_bytes()];
    let commit: [&[u8]; 1] = [b"EXEC"];
    let batch: [&[&[u8]]; 4] = [&begin, &write, &expire, &commit];

    let replies = conn.pipeline(&batch).await?;

    // MULTI ack plus one queue ack per command, then the batch outcome.
    expect_ack(&replies[0])?;
    expect_ack(&replies[1])?;
    expect_ack(&replies[2])?;
    match &replies[3] {
        Reply::Array(results) => {
            for result in results {
                if let Reply::Error(message) = result {
                    return Err(StoreError::Reply(message.clone()));
                }
            }
            Ok(())
        }
        Reply::Null => Err(StoreError::Reply("transaction aborted by the store".to_string())),
        Reply::Error(message) => Err(StoreError::Reply(message.clone())),
        _ => Err(StoreError::UnexpectedReply),
    }
}

fn expect_ack(reply: &Reply) -> StoreResult<()> {
    match reply {
        Reply::Simple(_) => Ok(()),
        Reply::Error(message) => Err(StoreError::Reply(message.clone())),
        _ => Err(StoreError::UnexpectedReply),
    }
}
