//! Saved vignette history for the calling owner.

use std::sync::Mutex;

use super::{Caller, CommandError};
use crate::agent_core::database::ArtifactStore;
use crate::agent_core::types::SavedVignette;

/// List the caller's saved vignettes, most recent first.
pub fn list_vignettes<S>(caller: &Caller, store: &Mutex<S>) -> Result<Vec<SavedVignette>, CommandError>
where
    S: ArtifactStore + ?Sized,
{
    let owner_id = caller.require_owner()?;
    let store = store.lock().map_err(|e| CommandError::Lock {
        reason: e.to_string(),
    })?;
    Ok(store.list_by_owner(owner_id)?)
}
