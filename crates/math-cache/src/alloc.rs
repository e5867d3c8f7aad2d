//! Fallible allocation helpers.

use crate::CacheError;

/// A vector of `len` copies of `value`, or an error if the storage cannot be
/// reserved.
pub(crate) fn filled<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>, CacheError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| CacheError::AllocationFailed { what, len })?;
    v.resize(len, value);
    Ok(v)
}
