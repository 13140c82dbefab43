//! The screen-relay frame: an opaque payload behind a length prefix.
//!
//! ## Wire format
//!
//! ```text
//! length:  u64 big-endian (8)
//! payload: [u8]           (length bytes, opaque)
//! ```
//!
//! The relay never looks inside the payload. In practice it is an
//! encoded image (JPEG or similar) produced by the sharing client.

use bytes::Bytes;

/// Size of the length prefix on the wire.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Default upper bound on a single frame payload (32 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// One length-prefixed binary unit on the screen protocol.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Bytes this frame occupies on the wire, prefix included.
    pub fn wire_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&'static [u8]> for Frame {
    fn from(v: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_payload() {
        let frame = Frame::new(vec![1u8, 2, 3]);
        let copy = frame.clone();
        assert_eq!(copy.payload().as_ptr(), frame.payload().as_ptr());
        assert_eq!(frame.wire_len(), 11);
    }

    #[test]
    fn empty_frame() {
        let frame = Frame::default();
        assert!(frame.is_empty());
        assert_eq!(frame.wire_len(), FRAME_HEADER_SIZE);
    }
}
