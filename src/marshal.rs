//! Argument and environment vectors for exec
//!
//! Everything the child needs is copied into a `CStringArray` in the parent,
//! before fork. The child then only reads from memory it already owns, which
//! keeps allocation out of the window between fork and exec.

use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::ptr;

use libc::c_char;

use crate::error::{Error, Result};

/// Owned, null-terminated vector of nul-terminated strings
///
/// `as_ptr` yields the `char *const[]` layout the exec family expects. The
/// pointer table points into the heap buffers of `strings`, which do not move
/// when the `CString` values themselves are moved.
#[derive(Debug)]
pub struct CStringArray {
    strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CStringArray {
    /// Deep-copy an ordered sequence of strings
    ///
    /// Fails with `ResourceExhausted` if any allocation fails (already copied
    /// entries are freed on the way out) and with `InteriorNul` if an entry
    /// would be cut short by an embedded nul byte.
    pub fn new<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let items = items.into_iter();
        let mut strings: Vec<CString> = Vec::new();
        strings.try_reserve_exact(items.size_hint().0)?;

        for (index, item) in items.enumerate() {
            strings.try_reserve(1)?;
            strings.push(dup_entry(item.as_ref().as_bytes(), index)?);
        }

        let mut ptrs: Vec<*const c_char> = Vec::new();
        ptrs.try_reserve_exact(strings.len() + 1)?;
        ptrs.extend(strings.iter().map(|s| s.as_ptr()));
        ptrs.push(ptr::null());

        tracing::trace!(entries = strings.len(), "marshalled string vector");
        Ok(Self { strings, ptrs })
    }

    /// Number of content entries, not counting the null sentinel
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CStr> {
        self.strings.get(index).map(CString::as_c_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.strings.iter().map(CString::as_c_str)
    }

    /// Pointer table, `len() + 1` entries, the last one null
    pub fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }

    #[cfg(test)]
    fn pointers(&self) -> &[*const c_char] {
        &self.ptrs
    }
}

/// Copy one entry into a fresh allocation sized for its terminator
pub(crate) fn dup_entry(bytes: &[u8], index: usize) -> Result<CString> {
    if bytes.contains(&0) {
        return Err(Error::InteriorNul { index });
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes.len() + 1)?;
    buf.extend_from_slice(bytes);
    // Capacity already covers the terminator, so this does not reallocate
    CString::new(buf).map_err(|_| Error::InteriorNul { index })
}
