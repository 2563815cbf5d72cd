//! # Pattern Scanner
//!
//! Purpose: Sweep the keyspace for a glob pattern in store-sized chunks,
//! unlinking each match, without ever materializing the full matching set.
//!
//! The cursor walk mirrors the store's scan contract: start at `0`, follow
//! the cursor the store hands back, stop when it returns to `0`. Any error
//! aborts the sweep; the partial count is discarded by the caller, and keys
//! already unlinked stay gone (chunk deletions are not transactional).

use crate::error::{StoreError, StoreResult};
use crate::pool::PooledConn;
use crate::resp::Reply;

/// Deletes every key matching `pattern`, returning the confirmed count.
///
/// Each chunk's keys are removed with non-blocking unlinks; the running
/// total sums the store's acknowledgements, so the result reflects keys the
/// store actually removed rather than requests merely issued.
pub(crate) async fn unlink_matching(conn: &mut PooledConn, pattern: &str) -> StoreResult<u64> {
    let mut cursor: u64 = 0;
    let mut removed: u64 = 0;

    loop {
        let cursor_text = cursor.to_string();
        let scan: [&[u8]; 4] = [b"SCAN", cursor_text.as_bytes(), b"MATCH", pattern.as_bytes()];
        let (next, keys) = match conn.round_trip(&scan).await? {
            Reply::Array(items) => parse_chunk(items)?,
            Reply::Error(message) => return Err(StoreError::Reply(message)),
            _ => return Err(StoreError::UnexpectedReply),
        };
        tracing::debug!(keys = keys.len(), cursor = next, "unlinking scan chunk");

        for key in &keys {
            let unlink: [&[u8]; 2] = [b"UNLINK", key];
            match conn.round_trip(&unlink).await? {
                Reply::Integer(count) if count >= 0 => removed += count as u64,
                Reply::Error(message) => return Err(StoreError::Reply(message)),
                _ => return Err(StoreError::UnexpectedReply),
            }
        }

        cursor = next;
        if cursor == 0 {
            return Ok(removed);
        }
    }
}

/// Splits a scan reply into the follow-up cursor and the chunk's keys.
fn parse_chunk(items: Vec<Reply>) -> StoreResult<(u64, Vec<Vec<u8>>)> {
    let mut items = items.into_iter();

    let cursor = match items.next() {
        Some(Reply::Bulk(text)) => parse_cursor(&text)?,
        _ => return Err(StoreError::UnexpectedReply),
    };
    let keys = match items.next() {
        Some(Reply::Array(entries)) => entries
            .into_iter()
            .map(|entry| match entry {
                Reply::Bulk(key) => Ok(key),
                _ => Err(StoreError::UnexpectedReply),
            })
            .collect::<StoreResult<Vec<_>>>()?,
        _ => return Err(StoreError::UnexpectedReply),
    };
    Ok((cursor, keys))
}

fn parse_cursor(text: &[u8]) -> StoreResult<u64> {
    std::str::from_utf8(text)
        .ok()
        .and_then(|digits| digits.parse().ok())
        .ok_or(StoreError::Protocol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_chunk() {
        let items = vec![
            Reply::Bulk(b"17".to_vec()),
            Reply::Array(vec![Reply::Bulk(b"a".to_vec()), Reply::Bulk(b"b".to_vec())]),
        ];
        let (cursor, keys) = parse_chunk(items).unwrap();
        assert_eq!(cursor, 17);
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn rejects_malformed_cursor() {
        let items = vec![Reply::Bulk(b"soon".to_vec()), Reply::Array(Vec::new())];
        assert!(matches!(parse_chunk(items), Err(StoreError::Protocol)));
    }

    #[test]
    fn rejects_missing_key_list() {
        let items = vec![Reply::Bulk(b"0".to_vec())];
        assert!(matches!(parse_chunk(items), Err(StoreError::UnexpectedReply)));
    }
}
