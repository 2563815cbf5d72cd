//! # Connection Pool
//!
//! Purpose: Keep a bounded set of reusable store connections, evicting
//! stale ones lazily and probing survivors for liveness before handing
//! them out.
//!
//! ## Design Principles
//!
//! 1. **Object Pool Pattern**: A mutex-guarded idle queue; the lock is held
//!    only while moving connections in or out.
//! 2. **Lazy Eviction**: Idle age is checked on borrow, not by a sweeper.
//! 3. **Probe Before Reuse**: A parked connection must answer a ping before
//!    it is trusted again; failures are dropped silently.
//! 4. **RAII Release**: The borrow guard returns or discards the connection
//!    on every exit path, including task abandonment after a timeout.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use jkv_common::config::StoreSettings;

use crate::error::{StoreError, StoreResult};
use crate::resp::{encode_command, parse_reply, Reply};

/// Connection pool handle; clones share one pool.
#[derive(Clone)]
pub(crate) struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    settings: StoreSettings,
    state: Mutex<PoolState>,
}

struct PoolState {
    idle: VecDeque<Parked>,
    closed: bool,
}

struct Parked {
    conn: Connection,
    parked_at: Instant,
}

impl Pool {
    /// Creates a pool for the given store settings.
    pub(crate) fn new(settings: &StoreSettings) -> Self {
        Pool {
            inner: Arc::new(PoolInner {
                settings: settings.clone(),
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Borrows a connection: a live parked one when available, otherwise a
    /// fresh dial (retried once before the error surfaces).
    pub(crate) async fn acquire(&self) -> StoreResult<PooledConn> {
        while let Some(mut conn) = self.next_parked()? {
            if conn.ping().await.is_ok() {
                return Ok(PooledConn::new(self.inner.clone(), conn));
            }
            // Probe failures are dropped without surfacing; the dial below
            // covers the caller.
            tracing::debug!("discarding pooled connection that failed its liveness probe");
        }

        let conn = match Connection::dial(&self.inner.settings).await {
            Ok(conn) => conn,
            Err(first) => {
                tracing::warn!(error = %first, "dial failed, retrying once");
                Connection::dial(&self.inner.settings).await?
            }
        };
        Ok(PooledConn::new(self.inner.clone(), conn))
    }

    /// Pops the next parked connection young enough to reuse.
    fn next_parked(&self) -> StoreResult<Option<Connection>> {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.closed {
            return Err(StoreError::PoolClosed);
        }
        while let Some(parked) = state.idle.pop_front() {
            if parked.parked_at.elapsed() <= self.inner.settings.idle_timeout {
                return Ok(Some(parked.conn));
            }
            // Stale: dropping the connection closes its socket.
        }
        Ok(None)
    }

    /// Closes the pool; parked connections are dropped and subsequent
    /// borrows fail with a fatal error.
    pub(crate) fn close(&self) {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        state.closed = true;
        state.idle.clear();
    }

    /// Number of connections currently parked.
    pub(crate) fn idle_connections(&self) -> usize {
        let state = self.inner.state.lock().expect("pool mutex poisoned");
        state.idle.len()
    }
}

impl PoolInner {
    fn park(&self, conn: Connection) {
        let mut state = self.state.lock().expect("pool mutex poisoned");
        if !state.closed && state.idle.len() < self.settings.max_idle {
            state.idle.push_back(Parked {
                conn,
                parked_at: Instant::now(),
            });
        }
        // Otherwise the connection drops here and its socket closes.
    }
}

/// Borrow guard; at most one in-flight operation holds a connection, and
/// dropping the guard hands it back (or discards it after a fault).
pub(crate) struct PooledConn {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    fault: bool,
}

impl PooledConn {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConn {
            pool,
            conn: Some(conn),
            fault: false,
        }
    }

    /// Sends one command and reads its reply.
    ///
    /// IO and framing failures poison the guard so the connection is not
    /// returned to the idle queue.
    pub(crate) async fn round_trip(&mut self, args: &[&[u8]]) -> StoreResult<Reply> {
        let conn = self.conn.as_mut().expect("connection present until drop");
        let result = conn.round_trip(args).await;
        if result.is_err() {
            self.fault = true;
        }
        result
    }

    /// Sends a fixed batch of commands in one write and reads one reply per
    /// command, in order.
    pub(crate) async fn pipeline(&mut self, commands: &[&[&[u8]]]) -> StoreResult<Vec<Reply>> {
        let conn = self.conn.as_mut().expect("connection present until drop");
        let result = conn.pipeline(commands).await;
        if result.is_err() {
            self.fault = true;
        }
        result
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };
        if self.fault {
            return;
        }
        self.pool.park(conn);
    }
}

/// One TCP connection to the store with its framing buffers.
struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    write_buf: Vec<u8>,
}

impl Connection {
    async fn dial(settings: &StoreSettings) -> StoreResult<Self> {
        let stream = TcpStream::connect(settings.addr()).await?;
        // Small request/reply exchanges; latency beats batching.
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            stream,
            read_buf: BytesMut::with_capacity(4 * 1024),
            write_buf: Vec::with_capacity(256),
        };
        conn.authenticate(settings).await?;
        Ok(conn)
    }

    async fn authenticate(&mut self, settings: &StoreSettings) -> StoreResult<()> {
        let password = match &settings.password {
            Some(password) => password.clone(),
            None => return Ok(()),
        };
        let reply = match &settings.username {
            Some(username) => {
                self.round_trip(&[b"AUTH", username.as_bytes(), password.as_bytes()])
                    .await?
            }
            None => self.round_trip(&[b"AUTH", password.as_bytes()]).await?,
        };
        match reply {
            Reply::Simple(_) => Ok(()),
            Reply::Error(message) => Err(StoreError::Reply(message)),
            _ => Err(StoreError::UnexpectedReply),
        }
    }

    /// Lightweight liveness probe.
    async fn ping(&mut self) -> StoreResult<()> {
        match self.round_trip(&[b"PING"]).await? {
            Reply::Simple(_) => Ok(()),
            _ => Err(StoreError::UnexpectedReply),
        }
    }

    async fn round_trip(&mut self, args: &[&[u8]]) -> StoreResult<Reply> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);
        self.stream.write_all(&self.write_buf).await?;
        self.read_reply().await
    }

    async fn pipeline(&mut self, commands: &[&[&[u8]]]) -> StoreResult<Vec<Reply>> {
        self.write_buf.clear();
        for args in commands {
            encode_command(args, &mut self.write_buf);
        }
        self.stream.write_all(&self.write_buf).await?;

        let mut replies = Vec::with_capacity(commands.len());
        for _ in 0..commands.len() {
            replies.push(self.read_reply().await?);
        }
        Ok(replies)
    }

    async fn read_reply(&mut self) -> StoreResult<Reply> {
        loop {
            if let Some(reply) = parse_reply(&mut self.read_buf)? {
                return Ok(reply);
            }
            let bytes = self.stream.read_buf(&mut self.read_buf).await?;
            if bytes == 0 {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "store closed the connection",
                )));
            }
        }
    }
}
