//! The [`Disposable`] contract.
//!
//! A disposable is any value owning a resource that must be released
//! explicitly and exactly once: GPU buffers, textures, audio voices,
//! physics bodies. Releasing is fallible so a misbehaving resource can be
//! reported without aborting the teardown of its neighbours.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::DisposeError;

/// Stops a watcher or subscription. Called at most once.
pub type StopHandle = Box<dyn FnOnce()>;

/// A resource exposing an explicit release operation.
///
/// # Examples
///
/// ```rust
/// use engine_resource::{Disposable, DisposeError};
///
/// struct AudioVoice {
///     playing: bool,
/// }
///
/// impl Disposable for AudioVoice {
///     fn dispose(&mut self) -> Result<(), DisposeError> {
///         self.playing = false;
///         Ok(())
///     }
/// }
/// ```
pub trait Disposable {
    /// A short human-readable label used in diagnostics.
    fn label(&self) -> String {
        "resource".to_string()
    }

    /// Release the underlying resource.
    ///
    /// # Errors
    ///
    /// Returns a [`DisposeError`] if the resource could not be released, for
    /// example because it was released before.
    fn dispose(&mut self) -> Result<(), DisposeError>;
}

impl<T: Disposable + ?Sized> Disposable for Box<T> {
    fn label(&self) -> String {
        (**self).label()
    }

    fn dispose(&mut self) -> Result<(), DisposeError> {
        (**self).dispose()
    }
}

/// Shared resources are released through the shared cell, so the owning
/// component can keep using its handle until teardown.
impl<T: Disposable + ?Sized> Disposable for Rc<RefCell<T>> {
    fn label(&self) -> String {
        match self.try_borrow() {
            Ok(inner) => inner.label(),
            Err(_) => "shared resource".to_string(),
        }
    }

    fn dispose(&mut self) -> Result<(), DisposeError> {
        let mut inner = self.try_borrow_mut().map_err(|_| DisposeError::Failed {
            resource: "shared resource".to_string(),
            reason: "resource is borrowed elsewhere".to_string(),
        })?;
        inner.dispose()
    }
}
