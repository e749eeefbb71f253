//! Payload - opaque byte buffer attached to a header
//!
//! Moved into the dispatcher queue at enqueue time and only lent to
//! backends, postmen and callbacks afterwards.

use bytes::Bytes;
use std::fmt;
use std::ops::Deref;

/// Opaque packet payload.
///
/// # Examples
/// ```
/// use contracts::Payload;
///
/// let payload = Payload::from(vec![0x12, 0x34]);
/// assert_eq!(payload.len(), 2);
/// assert_eq!(&payload[..], &[0x12, 0x34]);
/// assert!(Payload::empty().is_empty());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Payload(Bytes);

impl Payload {
    /// Zero-length payload, used by acknowledges
    #[inline]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    #[inline]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Payload {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Payload {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for Payload {
    #[inline]
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    #[inline]
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Payload {
    #[inline]
    fn from(bytes: &'static [u8; N]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_const() {
        static EMPTY: Payload = Payload::empty();
        assert!(EMPTY.is_empty());
        assert_eq!(EMPTY, Payload::default());
    }

    #[test]
    fn test_conversions() {
        let from_vec = Payload::from(vec![1u8, 2, 3]);
        let from_static = Payload::from(b"\x01\x02\x03");
        assert_eq!(from_vec, from_static);
        assert_eq!(from_vec.as_bytes(), &[1, 2, 3]);
        assert_eq!(from_vec.into_bytes(), Bytes::from_static(&[1, 2, 3]));
    }

    #[test]
    fn test_debug_shows_length_only() {
        let payload = Payload::from(vec![0u8; 16]);
        assert_eq!(format!("{payload:?}"), "Payload(16 bytes)");
    }
}
