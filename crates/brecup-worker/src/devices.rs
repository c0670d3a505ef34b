//! Exclusive device allocation.
//!
//! The pool is a fixed-capacity channel pre-loaded with one token per
//! device. Acquiring pops a token, releasing pushes it back. A busy table
//! behind a mutex validates every transition, so a token can never be
//! handed out twice and a slot can never be released twice.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use brecup_models::DeviceId;

use crate::error::{WorkerError, WorkerResult};

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub capacity: usize,
    pub busy: usize,
    /// Highest `busy` seen so far
    pub peak_busy: usize,
    pub acquires: u64,
    pub releases: u64,
}

#[derive(Debug)]
struct BusyTable {
    busy: Vec<bool>,
    stats: PoolStats,
}

#[derive(Debug)]
struct PoolInner {
    devices: Vec<DeviceId>,
    table: Mutex<BusyTable>,
    tokens_tx: async_channel::Sender<usize>,
    tokens_rx: async_channel::Receiver<usize>,
}

/// Fixed set of compute devices with exclusive leases.
///
/// Cheap to clone; clones share the same slots.
#[derive(Debug, Clone)]
pub struct DevicePool {
    inner: Arc<PoolInner>,
}

impl DevicePool {
    /// Create a pool over `devices`. The set never changes afterwards.
    pub fn new(devices: Vec<DeviceId>) -> WorkerResult<Self> {
        if devices.is_empty() {
            return Err(WorkerError::config_error("device pool needs at least one device"));
        }

        let capacity = devices.len();
        let (tokens_tx, tokens_rx) = async_channel::bounded(capacity);
        for slot in 0..capacity {
            tokens_tx
                .try_send(slot)
                .map_err(|e| WorkerError::allocator_invariant(format!("seeding slot {slot}: {e}")))?;
        }

        Ok(Self {
            inner: Arc::new(PoolInner {
                devices,
                table: Mutex::new(BusyTable {
                    busy: vec![false; capacity],
                    stats: PoolStats {
                        capacity,
                        ..PoolStats::default()
                    },
                }),
                tokens_tx,
                tokens_rx,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.devices.len()
    }

    /// Take a free device without waiting.
    ///
    /// Callers size their concurrency to the pool, so finding no free
    /// device means a lease leaked or a job launched too early.
    pub fn try_acquire(&self) -> WorkerResult<DeviceLease> {
        let slot = self.inner.tokens_rx.try_recv().map_err(|_| {
            let stats = self.stats();
            error!(
                busy = stats.busy,
                capacity = stats.capacity,
                "acquire with no free device"
            );
            WorkerError::allocator_invariant(format!(
                "no free device ({} of {} busy)",
                stats.busy, stats.capacity
            ))
        })?;
        self.mark_busy(slot)
    }

    /// Return `slot` to the pool.
    ///
    /// Releasing a slot that is not busy is a programming error.
    pub fn release(&self, slot: usize) -> WorkerResult<()> {
        {
            let mut table = self.table();
            match table.busy.get(slot).copied() {
                Some(true) => {}
                Some(false) => {
                    error!(slot, device = %self.inner.devices[slot], "double release of device");
                    return Err(WorkerError::allocator_invariant(format!(
                        "device {} released while free",
                        self.inner.devices[slot]
                    )));
                }
                None => {
                    error!(slot, "release of unknown device slot");
                    return Err(WorkerError::allocator_invariant(format!(
                        "slot {slot} out of range"
                    )));
                }
            }

            table.busy[slot] = false;
            table.stats.busy -= 1;
            table.stats.releases += 1;
            metrics::gauge!("brecup_devices_busy").set(table.stats.busy as f64);
        }

        self.inner
            .tokens_tx
            .try_send(slot)
            .map_err(|e| WorkerError::allocator_invariant(format!("returning slot {slot}: {e}")))?;
        debug!(slot, "device slot returned");
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        self.table().stats
    }

    /// Slots currently marked busy.
    pub fn busy_slots(&self) -> Vec<usize> {
        self.table()
            .busy
            .iter()
            .enumerate()
            .filter_map(|(slot, busy)| busy.then_some(slot))
            .collect()
    }

    fn mark_busy(&self, slot: usize) -> WorkerResult<DeviceLease> {
        let mut table = self.table();
        if table.busy[slot] {
            error!(slot, device = %self.inner.devices[slot], "token for a busy device");
            return Err(WorkerError::allocator_invariant(format!(
                "device {} handed out twice",
                self.inner.devices[slot]
            )));
        }

        table.busy[slot] = true;
        table.stats.busy += 1;
        table.stats.acquires += 1;
        table.stats.peak_busy = table.stats.peak_busy.max(table.stats.busy);
        metrics::gauge!("brecup_devices_busy").set(table.stats.busy as f64);

        Ok(DeviceLease {
            pool: self.clone(),
            slot,
            device: self.inner.devices[slot].clone(),
            released: false,
        })
    }

    fn table(&self) -> MutexGuard<'_, BusyTable> {
        self.inner
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive hold on one device.
///
/// Released explicitly with [`DeviceLease::release`]; a lease dropped on an
/// error path or by an aborted task releases itself.
#[derive(Debug)]
pub struct DeviceLease {
    pool: DevicePool,
    slot: usize,
    device: DeviceId,
    released: bool,
}

impl DeviceLease {
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Give the device back.
    pub fn release(mut self) -> WorkerResult<()> {
        self.released = true;
        self.pool.release(self.slot)
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            // Errors are already logged by the pool.
            let _ = self.pool.release(self.slot);
        }
    }
}
