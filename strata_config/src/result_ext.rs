//! Extensions for mapping errors into the shared result alias concisely.
//!
//! These helpers reduce repetitive `.map_err(Arc::new)` noise when a
//! fallible step produces a plain [`StrataError`] but the caller works in
//! [`StrataResult`] (`Result<T, Arc<StrataError>>`).

use std::sync::Arc;

use crate::{StrataError, StrataResult};

/// Extension mapping `Result<T, StrataError>` into `StrataResult<T>`.
pub trait StrataResultExt<T> {
    /// Wrap the error side in [`Arc`] for the shared result alias.
    ///
    /// # Errors
    ///
    /// Propagates the original error after wrapping it in `Arc`.
    fn into_shared(self) -> StrataResult<T>;
}

impl<T> StrataResultExt<T> for Result<T, StrataError> {
    fn into_shared(self) -> StrataResult<T> {
        self.map_err(Arc::new)
    }
}
