// ============================================================
// Layer 4 — Batch Prefetching
// ============================================================
// Moves a BatchGenerator onto a background thread that fills
// a bounded channel ahead of the training loop.
//
//   worker thread                      training loop
//   ─────────────                      ─────────────
//   generator.next_batch() ──send──▶ [ capacity slots ] ──recv──▶ model step
//
// The generator (and its cursor) is owned by exactly one
// thread, so batches arrive in cursor order and none are
// duplicated or skipped. `send` blocks while the channel is
// full; `recv` blocks while it is empty.
//
// A DataFault is forwarded once and the worker stops.
// Dropping the Prefetcher disconnects the channel, which ends
// the worker's next `send`, and then joins the thread.
//
// Reference: Rust Book §16 (Using Message Passing to Transfer Data)

use anyhow::{anyhow, Context, Result};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::data::batcher::{BatchError, BatchGenerator};
use crate::domain::batch::OneHotBatch;

pub struct Prefetcher {
    name:   String,
    rx:     Option<Receiver<Result<OneHotBatch, BatchError>>>,
    handle: Option<JoinHandle<()>>,
}

impl Prefetcher {
    /// Spawn a worker owning `generator`, buffering up to `capacity` batches.
    pub fn spawn(name: &str, mut generator: BatchGenerator, capacity: usize) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let thread_name = format!("prefetch-{name}");

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || loop {
                let item  = generator.next_batch();
                let fatal = item.is_err();
                if tx.send(item).is_err() || fatal {
                    break;
                }
            })
            .with_context(|| format!("Cannot spawn thread '{thread_name}'"))?;

        tracing::debug!("Started {} (capacity {})", thread_name, capacity.max(1));

        Ok(Self {
            name:   name.to_string(),
            rx:     Some(rx),
            handle: Some(handle),
        })
    }

    /// Block until the worker hands over the next batch.
    pub fn next_batch(&self) -> Result<OneHotBatch> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| anyhow!("prefetcher '{}' is closed", self.name))?;

        match rx.recv() {
            Ok(item) => Ok(item?),
            Err(_) => Err(anyhow!(
                "prefetch worker '{}' stopped before producing a batch",
                self.name
            )),
        }
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        // Disconnect first so a worker blocked in `send` wakes up
        drop(self.rx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("prefetch worker '{}' panicked", self.name);
            }
        }
    }
}

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// Where the training loop pulls batches from.
pub enum BatchSource {
    /// Produce on the calling thread
    Inline(BatchGenerator),
    /// Produce on a background thread
    Prefetched(Prefetcher),
}

impl BatchSource {
    /// `capacity == 0` keeps production on the calling thread.
    pub fn new(name: &str, generator: BatchGenerator, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            Ok(Self::Inline(generator))
        } else {
            Ok(Self::Prefetched(Prefetcher::spawn(name, generator, capacity)?))
        }
    }

    pub fn next_batch(&mut self) -> Result<OneHotBatch> {
        match self {
            Self::Inline(generator)     => Ok(generator.next_batch()?),
            Self::Prefetched(prefetcher) => prefetcher.next_batch(),
        }
    }
}
