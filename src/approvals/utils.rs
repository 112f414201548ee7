use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};

use crate::approvals::errors::ApprovalError;

/// Returns the handle of the current tokio runtime, creating a new runtime when called outside
/// of one. The created runtime is returned so the caller can keep it alive.
pub fn get_runtime() -> Result<(Handle, Option<Arc<Runtime>>), ApprovalError> {
    match Handle::try_current() {
        Ok(handle) => Ok((handle, None)),
        Err(_) => {
            let runtime = Runtime::new().map_err(|e| {
                ApprovalError::FatalError(format!("Failed to create a new tokio runtime: {e}"))
            })?;
            let handle = runtime.handle().clone();
            Ok((handle, Some(Arc::new(runtime))))
        }
    }
}
