use crate::{EntityDef, EntityValue, Result};
use futures::{StreamExt, stream::BoxStream};
use std::{ops::AsyncFnOnce, sync::Arc};

type Release = Box<dyn FnOnce() + Send>;

/// Streaming, single-consumer handle over an open result set.
///
/// The cursor owns the backend resource producing the rows (for example a
/// pooled connection) until [`close`](Self::close) is called. Dropping an
/// unclosed cursor still releases the resource but logs a warning: leaving
/// cursors open is a caller contract violation because every open cursor pins
/// a backend resource.
pub struct EntityListIterator {
    entity: Arc<EntityDef>,
    stream: Option<BoxStream<'static, Result<EntityValue>>>,
    release: Option<Release>,
    fetched: usize,
}

impl EntityListIterator {
    pub fn new(entity: Arc<EntityDef>, stream: BoxStream<'static, Result<EntityValue>>) -> Self {
        Self {
            entity,
            stream: Some(stream),
            release: None,
            fetched: 0,
        }
    }

    /// Cursor over rows already materialized.
    pub fn from_values(entity: Arc<EntityDef>, values: Vec<EntityValue>) -> Self {
        Self::new(
            entity,
            futures::stream::iter(values.into_iter().map(Ok)).boxed(),
        )
    }

    /// Hook run exactly once when the cursor is closed or dropped, after the stream is dropped.
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn entity(&self) -> &Arc<EntityDef> {
        &self.entity
    }

    /// Rows handed out so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Next row, `None` once the result set is exhausted.
    pub async fn next(&mut self) -> Result<Option<EntityValue>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(value)) => {
                self.fetched += 1;
                Ok(Some(value))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Skip `skip` rows then return up to `count` rows.
    pub async fn partial_list(&mut self, skip: usize, count: usize) -> Result<Vec<EntityValue>> {
        for _ in 0..skip {
            if self.next().await?.is_none() {
                return Ok(Vec::new());
            }
        }
        let mut result = Vec::with_capacity(count.min(1024));
        while result.len() < count {
            match self.next().await? {
                Some(v) => result.push(v),
                None => break,
            }
        }
        Ok(result)
    }

    /// Drain the remaining rows.
    pub async fn complete_list(&mut self) -> Result<Vec<EntityValue>> {
        let mut result = Vec::new();
        while let Some(v) = self.next().await? {
            result.push(v);
        }
        Ok(result)
    }

    /// Release the backend resource.
    pub async fn close(mut self) -> Result<()> {
        self.release_resource();
        log::trace!(
            "Closed cursor over {} after {} rows",
            self.entity.name,
            self.fetched
        );
        Ok(())
    }

    /// Run `f` with the cursor and close it afterwards, whatever `f` returned.
    pub async fn scoped<T>(mut self, f: impl AsyncFnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(&mut self).await;
        let closed = self.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }

    fn release_resource(&mut self) {
        drop(self.stream.take());
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for EntityListIterator {
    fn drop(&mut self) {
        if self.stream.is_some() {
            log::warn!(
                "Cursor over {} was dropped without being closed after {} rows, release it with close()",
                self.entity.name,
                self.fetched
            );
            self.release_resource();
        }
    }
}
