//! Scoped release of media handles

use crate::track::Release;
use crate::Result;
use std::ops::{Deref, DerefMut};

/// Owns a media handle and releases it when dropped.
///
/// Release failures are logged as warnings and never propagate, so the
/// outcome of whatever ran while the guard was alive is left untouched.
pub struct Reaper<T: Release> {
    value: Option<T>,
}

impl<T: Release> Reaper<T> {
    /// Takes ownership of a handle
    pub fn new(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Releases the handle now and reports the outcome
    pub fn reap(mut self) -> Result<()> {
        match self.value.take() {
            Some(mut value) => release_value(&mut value),
            None => Ok(()),
        }
    }
}

impl<T: Release> Deref for Reaper<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `reap` and `drop` empty the slot, and both consume the guard.
        self.value.as_ref().expect("reaper holds a value until consumed")
    }
}

impl<T: Release> DerefMut for Reaper<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("reaper holds a value until consumed")
    }
}

impl<T: Release> Drop for Reaper<T> {
    fn drop(&mut self) {
        if let Some(mut value) = self.value.take() {
            let _ = release_value(&mut value);
        }
    }
}

fn release_value<T: Release>(value: &mut T) -> Result<()> {
    let kind = value.kind();
    match value.release() {
        Ok(()) => {
            tracing::debug!(%kind, "released media handle");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(%kind, error = %e, "Error closing clip");
            Err(e)
        }
    }
}
