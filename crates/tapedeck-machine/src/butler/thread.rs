//! Butler thread: owns the storage and keeps the window in step with the play point.

use super::flush::{flush_writes, persist_slices};
use super::refill::{refill, relocate_if_needed};
use super::request::{ClipboardRequest, Wake};
use super::shared_state::SharedTape;
use super::transfer::run_transfer;
use crate::error::{Error, Result};
use crate::storage::TapeStorage;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thread_priority::ThreadPriority;
use tracing::{debug, info, trace, warn};

pub(crate) struct ButlerThread {
    shared: Arc<SharedTape>,
    handle: Option<JoinHandle<()>>,
}

impl ButlerThread {
    pub fn spawn(
        shared: Arc<SharedTape>,
        rx: Receiver<Wake>,
        storage: Box<dyn TapeStorage>,
    ) -> Result<Self> {
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("tapedeck-butler".into())
            .spawn(move || {
                let _ = thread_priority::set_current_thread_priority(ThreadPriority::Max);
                butler_loop(thread_shared, rx, storage);
            })
            .map_err(|e| Error::Butler(format!("failed to spawn butler thread: {}", e)))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Ask the butler to flush and exit, then join it.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.wake(Wake::Shutdown);
        if handle.join().is_err() {
            warn!("butler thread panicked");
        }
    }
}

impl Drop for ButlerThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn butler_loop(shared: Arc<SharedTape>, rx: Receiver<Wake>, mut storage: Box<dyn TapeStorage>) {
    info!(
        window_frames = shared.config.window_frames,
        chunk_frames = shared.config.chunk_frames,
        "butler started"
    );

    let mut scratch = Vec::with_capacity(shared.config.chunk_frames);
    let mut clipboard: Vec<ClipboardRequest> = Vec::new();

    loop {
        let exit = process_wakes(&rx, &shared, &mut clipboard) || shared.is_shutting_down();
        let storage = storage.as_mut();

        relocate_if_needed(&shared, storage);
        // Transfers read their source from storage, so recorded frames go first.
        let flushed = flush_writes(&shared, storage);
        for request in clipboard.drain(..) {
            let result = run_transfer(&shared, storage, &request.transfer);
            if let Err(e) = &result {
                warn!(transfer = ?request.transfer, "clipboard transfer failed: {}", e);
            }
            let _ = request.done.send(result);
        }
        let persisted = persist_slices(&shared, storage);
        shared.state.lock().passes += 1;
        shared.progress.notify_all();

        if exit {
            if !flushed || !persisted {
                warn!("butler exiting with unsaved changes");
            }
            break;
        }

        // Write-back faults only slow the retries down; the window keeps filling.
        let filled = refill(&shared, storage, &mut scratch, &rx);
        if !(filled && flushed && persisted) {
            thread::sleep(shared.config.retry_interval());
        }
    }

    info!("butler stopped");
}

/// Wait for the next wake-up, then drain the channel.
///
/// Returns true once shutdown has been requested.
fn process_wakes(
    rx: &Receiver<Wake>,
    shared: &SharedTape,
    clipboard: &mut Vec<ClipboardRequest>,
) -> bool {
    let first = match rx.recv_timeout(shared.config.idle_poll()) {
        Ok(wake) => wake,
        Err(RecvTimeoutError::Timeout) => return false,
        Err(RecvTimeoutError::Disconnected) => return true,
    };

    let mut exit = handle_wake(first, clipboard);
    loop {
        match rx.try_recv() {
            Ok(wake) => exit |= handle_wake(wake, clipboard),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => return true,
        }
    }
    exit
}

fn handle_wake(wake: Wake, clipboard: &mut Vec<ClipboardRequest>) -> bool {
    match wake {
        Wake::Shutdown => {
            debug!("shutdown requested");
            true
        }
        Wake::Clipboard(request) => {
            clipboard.push(request);
            false
        }
        other => {
            trace!(wake = ?other, "butler woken");
            false
        }
    }
}
