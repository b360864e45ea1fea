use anyhow::Context as _;
use helm_core::{Error, Result, logged};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::spawn_blocking,
};
use url::form_urlencoded;

const PREFIX: &str = "sqlite://";
const DEFAULT_BUSY_TIMEOUT: u64 = 5000;

/// Where and how connections are opened, parsed from `sqlite://<path>?<params>`.
///
/// `busy_timeout` (milliseconds) and `journal_mode` are applied with pragmas,
/// every other parameter is handed to SQLite as a URI parameter (`mode=rwc`,
/// `cache=shared`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteUrl {
    pub path: String,
    pub params: Vec<(String, String)>,
    pub busy_timeout: Duration,
    pub journal_mode: Option<String>,
}

impl SqliteUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let Some(rest) = url.strip_prefix(PREFIX) else {
            return Err(logged!(Error::invalid_input(format!(
                "Expected sqlite connection url to start with `{}`, got `{}`",
                PREFIX, url
            ))));
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        if path.is_empty() {
            return Err(logged!(Error::invalid_input(format!(
                "Missing database path in `{url}`"
            ))));
        }
        let mut result = Self {
            path: path.to_string(),
            params: Vec::new(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT),
            journal_mode: None,
        };
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "busy_timeout" => {
                    let millis = value.parse::<u64>().map_err(|_| {
                        logged!(Error::invalid_input(format!(
                            "Invalid busy_timeout `{value}` in `{url}`"
                        )))
                    })?;
                    result.busy_timeout = Duration::from_millis(millis);
                }
                "journal_mode" => result.journal_mode = Some(value.into_owned()),
                _ => result.params.push((key.into_owned(), value.into_owned())),
            }
        }
        Ok(result)
    }

    pub fn is_memory(&self) -> bool {
        self.path == ":memory:" || self.params.iter().any(|(k, v)| k == "mode" && v == "memory")
    }

    /// `file:` URI understood by `sqlite3_open_v2` with `SQLITE_OPEN_URI`.
    pub fn uri(&self) -> String {
        let mut uri = format!("file:{}", self.path);
        if !self.params.is_empty() {
            uri.push('?');
            uri.push_str(
                &form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&self.params)
                    .finish(),
            );
        }
        uri
    }
}

struct PoolInner {
    url: SqliteUrl,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

impl PoolInner {
    fn open(&self) -> Result<Connection> {
        let uri = self.url.uri();
        let context = || format!("While opening the sqlite database `{}`", uri);
        let connection = Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(context)?;
        connection
            .busy_timeout(self.url.busy_timeout)
            .with_context(context)?;
        connection
            .execute_batch("PRAGMA case_sensitive_like = ON;\nPRAGMA foreign_keys = ON;")
            .with_context(context)?;
        if let Some(mode) = &self.url.journal_mode {
            let applied: String = connection
                .pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))
                .with_context(context)?;
            log::debug!("Journal mode of `{}` is {}", self.url.path, applied);
        }
        log::trace!("Opened sqlite connection to `{}`", self.url.path);
        Ok(connection)
    }
}

/// Bounded set of connections to one database.
///
/// At most `size` connections are checked out at any time, further callers
/// wait. Idle connections are kept open and reused.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub async fn connect(url: SqliteUrl, size: usize) -> Result<Self> {
        let size = if url.is_memory() && size > 1 {
            log::warn!(
                "In memory database `{}` cannot be shared between connections, the pool is limited to one connection",
                url.path
            );
            1
        } else {
            size.max(1)
        };
        let pool = Self {
            inner: Arc::new(PoolInner {
                url,
                idle: Mutex::new(Vec::with_capacity(size)),
                permits: Arc::new(Semaphore::new(size)),
            }),
        };
        // Open eagerly so a wrong url fails here rather than on first use
        drop(pool.acquire().await?);
        Ok(pool)
    }

    pub fn url(&self) -> &SqliteUrl {
        &self.inner.url
    }

    pub async fn acquire(&self) -> Result<PooledConnection> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("The connection pool is closed")?;
        let idle = self.inner.idle.lock().pop();
        let connection = match idle {
            Some(connection) => connection,
            None => {
                let inner = self.inner.clone();
                spawn_blocking(move || inner.open())
                    .await
                    .context("The task opening a sqlite connection failed")??
            }
        };
        Ok(PooledConnection {
            connection: Some(connection),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }
}

/// Connection checked out of a [`ConnectionPool`], returned to it on drop.
pub struct PooledConnection {
    connection: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;
    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .unwrap_or_else(|| unreachable!("connection taken before drop"))
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection taken before drop"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if connection.is_autocommit() {
                self.pool.idle.lock().push(connection);
            } else {
                log::warn!(
                    "Discarding a sqlite connection to `{}` left inside a transaction",
                    self.pool.url.path
                );
            }
        }
    }
}
