//! Dispatch handoff: the terminal action of a successful bootstrap.

use crate::backend::{GuestExit, HypervisorBackend};
use uuid::Uuid;

/// Enter the backend's event loop and block until the guest terminates.
///
/// The orchestrator has no control once this is called. There is no
/// timeout and no cancellation; the call returns only when the backend
/// reports guest shutdown.
pub(crate) fn hand_off(backend: &mut dyn HypervisorBackend, instance_id: &Uuid) -> GuestExit {
    tracing::info!(
        instance_id = %instance_id,
        backend = backend.name(),
        "Bootstrap complete, entering dispatch loop"
    );

    let exit = backend.dispatch();

    if exit.success() {
        tracing::info!(instance_id = %instance_id, status = exit.status, "Guest exited");
    } else {
        tracing::warn!(
            instance_id = %instance_id,
            status = exit.status,
            "Guest exited with failure status"
        );
    }
    exit
}
