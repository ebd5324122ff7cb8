use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::fetcher::PageFetcher;

/// Fixed set of fetch handles. A semaphore permit is held for every handle handed
/// out, so no more than `capacity` fetches ever run at once.
pub struct ResourcePool<H> {
    permits: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<H>>>,
    capacity: usize,
}

impl<H> fmt::Debug for ResourcePool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<H> ResourcePool<H> {
    pub fn new(handles: Vec<H>) -> Result<Self> {
        if handles.is_empty() {
            bail!("A resource pool needs at least one handle");
        }
        let capacity = handles.len();
        Ok(Self {
            permits: Arc::new(Semaphore::new(capacity)),
            idle: Arc::new(Mutex::new(handles)),
            capacity,
        })
    }

    /// Builds `size` handles with `make`, failing on the first handle that can't be built.
    pub fn build<F>(size: usize, make: F) -> Result<Self>
    where
        F: FnMut() -> Result<H>,
    {
        let handles = std::iter::repeat_with(make)
            .take(size)
            .collect::<Result<Vec<_>>>()?;
        Self::new(handles)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Waits until a handle is idle and takes it. Fails once the pool is shut down.
    pub async fn acquire(&self) -> Result<PooledHandle<H>> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| anyhow!("Resource pool is shut down"))?;
        let handle = lock(&self.idle)
            .pop()
            .ok_or_else(|| anyhow!("Resource pool granted a permit without an idle handle"))?;
        Ok(PooledHandle {
            handle: Some(handle),
            home: self.idle.clone(),
            _permit: permit,
        })
    }
}

impl<H: PageFetcher> ResourcePool<H> {
    /// Waits for every handle to come back, closes the pool then closes each handle.
    pub async fn shutdown(&self) -> Result<()> {
        let all = u32::try_from(self.capacity)?;
        let permits = self
            .permits
            .acquire_many(all)
            .await
            .map_err(|_| anyhow!("Resource pool is already shut down"))?;
        self.permits.close();
        drop(permits);

        let handles = std::mem::take(&mut *lock(&self.idle));
        log::info!("Closing {} pooled fetchers", handles.len());
        for handle in handles {
            if let Err(e) = handle.close().await {
                log::warn!("Couldn't close pooled fetcher: {e:#}");
            }
        }
        Ok(())
    }
}

/// A handle checked out of a [`ResourcePool`], returned to it on drop.
pub struct PooledHandle<H> {
    handle: Option<H>,
    home: Arc<Mutex<Vec<H>>>,
    // Released after the handle is back home, see Drop
    _permit: OwnedSemaphorePermit,
}

impl<H> Deref for PooledHandle<H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.handle.as_ref().expect("Handle is only taken on drop")
    }
}

impl<H> DerefMut for PooledHandle<H> {
    fn deref_mut(&mut self) -> &mut H {
        self.handle.as_mut().expect("Handle is only taken on drop")
    }
}

impl<H> Drop for PooledHandle<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            lock(&self.home).push(handle);
        }
    }
}

fn lock<H>(idle: &Mutex<Vec<H>>) -> MutexGuard<'_, Vec<H>> {
    idle.lock().unwrap_or_else(PoisonError::into_inner)
}
