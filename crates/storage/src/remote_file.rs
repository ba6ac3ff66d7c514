//! Remote objects exposed as seekable, readable files.
//!
//! A [`RemoteFile`] bridges the synchronous `Read + Seek` interface the
//! granule readers need onto the async object_store API. Calls block the
//! current thread on the runtime `Handle`, so a `RemoteFile` must be used
//! from threads outside the runtime (the pipeline's worker pool).

use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectStore;
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use subset_common::{GranuleLocator, SubsetResult};

use crate::block_cache::{BlockCache, CacheStats};
use crate::config::{AccessConfig, CacheStrategy};
use crate::error::{StorageError, StorageResult};
use crate::object_store::build_store;

type Prefetch = JoinHandle<Result<Bytes, object_store::Error>>;

/// Opens granule URLs as [`RemoteFile`]s under one shared [`AccessConfig`].
#[derive(Clone)]
pub struct RemoteAccessor {
    config: Arc<AccessConfig>,
    handle: Handle,
}

impl RemoteAccessor {
    /// Validates the configuration once for the whole run.
    pub fn new(config: AccessConfig, handle: Handle) -> SubsetResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            handle,
        })
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Open `locator` for reading. Issues one metadata request for the size.
    #[instrument(skip_all, fields(url = %locator.url))]
    pub fn open(&self, locator: &GranuleLocator) -> StorageResult<RemoteFile> {
        let (store, path) = build_store(&locator.url, &self.config)?;
        let meta = self
            .handle
            .block_on(store.head(&path))
            .map_err(|e| StorageError::from_object_store(&locator.url, e))?;

        debug!(size = meta.size, strategy = ?self.config.cache_strategy, "Opened remote object");

        Ok(RemoteFile::new(
            locator.url.clone(),
            store,
            path,
            meta.size as u64,
            &self.config,
            self.handle.clone(),
        ))
    }
}

/// A read-only, seekable view of one remote object.
pub struct RemoteFile {
    url: String,
    store: Arc<dyn ObjectStore>,
    path: Path,
    size: u64,
    position: u64,
    strategy: CacheStrategy,
    block_size: u64,
    cache: BlockCache,
    pending: HashMap<u64, Prefetch>,
    handle: Handle,
}

impl RemoteFile {
    pub fn new(
        url: String,
        store: Arc<dyn ObjectStore>,
        path: Path,
        size: u64,
        config: &AccessConfig,
        handle: Handle,
    ) -> Self {
        Self {
            url,
            store,
            path,
            size,
            position: 0,
            strategy: config.cache_strategy,
            block_size: config.block_size.max(1) as u64,
            cache: BlockCache::new(config.cache_blocks),
            pending: HashMap::new(),
            handle,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    fn block_range(&self, index: u64) -> Range<usize> {
        let start = index * self.block_size;
        let end = (start + self.block_size).min(self.size);
        start as usize..end as usize
    }

    fn block_count(&self) -> u64 {
        self.size.div_ceil(self.block_size)
    }

    fn fetch(&mut self, range: Range<usize>) -> StorageResult<Bytes> {
        let bytes = self
            .handle
            .block_on(self.store.get_range(&self.path, range))
            .map_err(|e| StorageError::from_object_store(&self.url, e))?;
        self.cache.record_fetch(bytes.len());
        Ok(bytes)
    }

    /// Return block `index`, from cache, an in-flight prefetch, or a new request.
    fn block(&mut self, index: u64) -> StorageResult<Bytes> {
        if let Some(block) = self.cache.get(index) {
            return Ok(block);
        }

        let block = match self.pending.remove(&index) {
            Some(task) => {
                let joined = self.handle.block_on(task).map_err(|e| StorageError::Prefetch {
                    url: self.url.clone(),
                    message: e.to_string(),
                })?;
                let bytes = joined.map_err(|e| StorageError::from_object_store(&self.url, e))?;
                self.cache.record_prefetch_hit();
                bytes
            }
            None => {
                let range = self.block_range(index);
                self.fetch(range)?
            }
        };

        self.cache.insert(index, block.clone());

        if self.strategy == CacheStrategy::Background {
            self.prefetch(index + 1);
        }

        Ok(block)
    }

    fn prefetch(&mut self, index: u64) {
        if index >= self.block_count()
            || self.cache.contains(index)
            || self.pending.contains_key(&index)
        {
            return;
        }

        let range = self.block_range(index);
        // Counted when issued; a cancelled prefetch still cost a request.
        self.cache.record_fetch(range.len());

        let store = Arc::clone(&self.store);
        let path = self.path.clone();
        let task = self
            .handle
            .spawn(async move { store.get_range(&path, range).await });
        self.pending.insert(index, task);
    }

    fn read_direct(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        let end = (self.position + buf.len() as u64).min(self.size);
        let bytes = self.fetch(self.position as usize..end as usize)?;
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn read_cached(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        let index = self.position / self.block_size;
        let block = self.block(index)?;
        let offset = (self.position - index * self.block_size) as usize;
        if offset >= block.len() {
            return Ok(0);
        }
        let n = (block.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&block[offset..offset + n]);
        Ok(n)
    }
}

impl Read for RemoteFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.size {
            return Ok(0);
        }

        let n = match self.strategy {
            CacheStrategy::None => self.read_direct(buf),
            CacheStrategy::Blocks | CacheStrategy::Background => self.read_cached(buf),
        }
        .map_err(io::Error::other)?;

        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for RemoteFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(offset) => {
                self.position = offset;
                Ok(offset)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

impl Drop for RemoteFile {
    fn drop(&mut self) {
        for (_, task) in self.pending.drain() {
            task.abort();
        }

        let stats = self.cache.stats();
        debug!(
            url = %self.url,
            requests = stats.requests,
            bytes_fetched = stats.bytes_fetched,
            hits = stats.hits,
            misses = stats.misses,
            prefetch_hits = stats.prefetch_hits,
            hit_rate = stats.hit_rate(),
            "Closed remote object"
        );
    }
}
