/*!
 * Interop Bridge
 *
 * String processing for callers that hand over a foreign-owned string.
 * The foreign side lends its bytes through [`NativeStringSource`]; the loan
 * is held by a [`BorrowedString`] guard and returned before
 * `process_native_string` hands back its freshly owned output.
 */

use crate::core::errors::ResourceError;
use crate::core::limits::MAX_INTEROP_OUTPUT;
use crate::core::types::ResourceResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

const OUTPUT_PREFIX: &str = "Processed: ";

/// A string owned by the other side of the bridge
pub trait NativeStringSource {
    /// Borrow the string's UTF-8 bytes; `None` means a null input
    fn acquire(&self) -> Option<&[u8]>;

    /// Return a borrow obtained from `acquire`
    fn release(&self);
}

/// Loaned native string, returned to its source on drop
pub struct BorrowedString<'a, S: NativeStringSource + ?Sized> {
    source: &'a S,
    bytes: &'a [u8],
}

impl<'a, S: NativeStringSource + ?Sized> BorrowedString<'a, S> {
    /// `None` for a null input; nothing is held in that case
    pub fn acquire(source: &'a S) -> Option<Self> {
        let bytes = source.acquire()?;
        Some(Self { source, bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn as_str(&self) -> ResourceResult<&str> {
        std::str::from_utf8(self.bytes)
            .map_err(|e| ResourceError::Interop(format!("input is not valid UTF-8: {}", e)))
    }
}

impl<S: NativeStringSource + ?Sized> Drop for BorrowedString<'_, S> {
    fn drop(&mut self) {
        self.source.release();
    }
}

/// Produce `"Processed: <input>"` as a newly owned string
///
/// Rejects null input, invalid UTF-8 and outputs longer than
/// [`MAX_INTEROP_OUTPUT`]. The input is released before this returns, on
/// success and on every error.
pub fn process_native_string<S: NativeStringSource + ?Sized>(source: &S) -> ResourceResult<String> {
    process_native_string_bounded(source, MAX_INTEROP_OUTPUT)
}

pub fn process_native_string_bounded<S: NativeStringSource + ?Sized>(
    source: &S,
    limit: usize,
) -> ResourceResult<String> {
    let borrowed = BorrowedString::acquire(source)
        .ok_or_else(|| ResourceError::Interop("null input string".to_string()))?;
    let input = borrowed.as_str()?;

    let needed = OUTPUT_PREFIX.len() + input.len();
    if needed > limit {
        warn!(needed, limit, "interop output exceeds limit");
        return Err(ResourceError::Capacity {
            requested: needed,
            capacity: limit,
        });
    }

    let mut output = String::with_capacity(needed);
    output.push_str(OUTPUT_PREFIX);
    output.push_str(input);
    drop(borrowed);

    debug!(input_len = needed - OUTPUT_PREFIX.len(), "native string processed");
    Ok(output)
}

/// In-process [`NativeStringSource`] that tracks outstanding borrows
#[derive(Debug, Default)]
pub struct LocalString {
    value: Option<Vec<u8>>,
    outstanding: AtomicUsize,
}

impl LocalString {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: Some(value.into()),
            outstanding: AtomicUsize::new(0),
        }
    }

    /// A source standing in for a null foreign reference
    pub fn null() -> Self {
        Self::default()
    }

    /// Borrows not yet released
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

impl NativeStringSource for LocalString {
    fn acquire(&self) -> Option<&[u8]> {
        let bytes = self.value.as_deref()?;
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Some(bytes)
    }

    fn release(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}
