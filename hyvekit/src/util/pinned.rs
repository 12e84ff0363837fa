//! Run a closure on one dedicated OS thread for its entire lifetime.
//!
//! Hypervisor handles are thread-affine, so construction, bootstrap and the
//! dispatch loop must all execute on the same thread. A tokio runtime would
//! be free to move a task between workers at every await point; a plain
//! named thread gives the guarantee outright.

use hyvekit_shared::errors::{HyvekitError, HyvekitResult};
use std::thread::JoinHandle;
use tokio::sync::oneshot;

/// Handle to a closure running on its own OS thread.
///
/// Wait for the result synchronously with [`PinnedTask::join`] or from
/// async code with [`PinnedTask::wait`].
#[derive(Debug)]
pub struct PinnedTask<T> {
    name: String,
    handle: JoinHandle<()>,
    result_rx: oneshot::Receiver<T>,
}

/// Spawn `f` on a new OS thread named `name`.
pub fn spawn_pinned<T, F>(name: &str, f: F) -> HyvekitResult<PinnedTask<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (result_tx, result_rx) = oneshot::channel();

    let handle = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // Receiver may be gone if the caller dropped the handle.
            let _ = result_tx.send(f());
        })?;

    tracing::debug!(thread = name, "Spawned pinned thread");

    Ok(PinnedTask {
        name: name.to_string(),
        handle,
        result_rx,
    })
}

impl<T> PinnedTask<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block the current thread until the pinned closure finishes.
    pub fn join(self) -> HyvekitResult<T> {
        let PinnedTask {
            name,
            handle,
            mut result_rx,
        } = self;

        handle
            .join()
            .map_err(|_| HyvekitError::Internal(format!("pinned thread '{}' panicked", name)))?;

        result_rx.try_recv().map_err(|_| {
            HyvekitError::Internal(format!("pinned thread '{}' exited without a result", name))
        })
    }

    /// Await the pinned closure's result without blocking the runtime.
    pub async fn wait(self) -> HyvekitResult<T> {
        let PinnedTask {
            name,
            handle,
            result_rx,
        } = self;

        let result = result_rx.await;
        // The thread has sent its result or unwound; reap it either way.
        let joined = handle.join();

        match (result, joined) {
            (Ok(value), _) => Ok(value),
            (Err(_), Err(_)) => Err(HyvekitError::Internal(format!(
                "pinned thread '{}' panicked",
                name
            ))),
            (Err(_), Ok(())) => Err(HyvekitError::Internal(format!(
                "pinned thread '{}' exited without a result",
                name
            ))),
        }
    }
}
