use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::error::BeamError;

/// Default upper bound on one chat line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4 * 1024;

/// Newline-delimited UTF-8 codec.
///
/// Thin wrapper over [`LinesCodec`] that reports failures as
/// [`BeamError`] so relay loops handle a single error type.
#[derive(Debug, Clone)]
pub struct LineCodec {
    inner: LinesCodec,
    max_length: usize,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    fn map_err(&self, err: LinesCodecError) -> BeamError {
        match err {
            LinesCodecError::MaxLineLengthExceeded => BeamError::LineTooLong {
                max: self.max_length,
            },
            LinesCodecError::Io(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                BeamError::Protocol("line is not valid utf-8".to_string())
            }
            LinesCodecError::Io(e) => BeamError::Io(e),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = BeamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode(src).map_err(|e| self.map_err(e))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_eof(src).map_err(|e| self.map_err(e))
    }
}

impl Encoder<String> for LineCodec {
    type Error = BeamError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(item, dst).map_err(|e| self.map_err(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newline_and_strips_cr() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("alice\r\nhi there\npartial");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("alice"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("hi there"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap().as_deref(),
            Some("partial")
        );
    }

    #[test]
    fn encode_appends_newline() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode("🟢 bob joined the chat".to_string(), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], "🟢 bob joined the chat\n".as_bytes());
    }

    #[test]
    fn over_long_line_is_rejected() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from("abcdefgh\n");
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, BeamError::LineTooLong { max: 4 }));
    }

    #[test]
    fn invalid_utf8_is_protocol_error() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, BeamError::Protocol(_)));
    }
}
