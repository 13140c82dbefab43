use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BeamError;
use crate::frame::{DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE, Frame};

/// Length-prefixed frame codec for the screen relay.
///
/// Partial reads are absorbed by the framed reader's buffer: `decode`
/// only yields once the full prefix and payload are present. A stream
/// that ends part-way through a frame surfaces as
/// [`BeamError::ConnectionClosed`].
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = BeamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; FRAME_HEADER_SIZE];
        prefix.copy_from_slice(&src[..FRAME_HEADER_SIZE]);
        let declared = u64::from_be_bytes(prefix);

        // Reject before buffering anything the peer claims it will send.
        if declared > self.max_frame_size as u64 {
            return Err(BeamError::FrameTooLarge {
                size: declared,
                max: self.max_frame_size,
            });
        }

        let total = FRAME_HEADER_SIZE + declared as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_SIZE);
        let payload = src.split_to(declared as usize).freeze();
        Ok(Some(Frame::new(payload)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(BeamError::ConnectionClosed),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = BeamError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_size {
            return Err(BeamError::FrameTooLarge {
                size: item.len() as u64,
                max: self.max_frame_size,
            });
        }

        dst.reserve(item.wire_len());
        dst.put_u64(item.len() as u64);
        dst.extend_from_slice(item.payload());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    #[test]
    fn encodes_big_endian_prefix() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(Frame::new(vec![0x01, 0x02, 0x03]), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 0, 0, 0, 0, 3, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn waits_for_full_payload() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 0, 0, 0, 0, 4, 9, 9][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&[9, 9, 7]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.payload(), &[9, 9, 9, 9]);
        // Start of the next frame stays buffered.
        assert_eq!(&buf[..], &[7]);
    }

    #[test]
    fn zero_length_frame_is_valid() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(Frame::default(), &mut buf).unwrap();
        assert_eq!(buf.len(), FRAME_HEADER_SIZE);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(frame.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_oversize_declaration() {
        let mut codec = FrameCodec::new(16);
        let mut buf = BytesMut::new();
        buf.put_u64(17);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, BeamError::FrameTooLarge { size: 17, max: 16 }));
    }

    #[test]
    fn refuses_to_encode_oversize_frame() {
        let mut codec = FrameCodec::new(2);
        let mut buf = BytesMut::new();
        assert!(codec.encode(Frame::new(vec![0u8; 3]), &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn reassembles_from_tiny_reads() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0, 0, 0])
            .read(&[0, 0, 0, 0])
            .read(&[5, b'h'])
            .read(&[b'e', b'l'])
            .read(&[b'l', b'o', 0, 0, 0, 0, 0, 0, 0, 0])
            .build();
        let mut reader = FramedRead::new(mock, FrameCodec::default());

        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(first.payload(), b"hello");
        let second = reader.next().await.unwrap().unwrap();
        assert!(second.is_empty());
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn eof_mid_frame_is_connection_closed() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0, 0, 0, 0, 0, 0, 0, 10, 1, 2])
            .build();
        let mut reader = FramedRead::new(mock, FrameCodec::default());

        let err = reader.next().await.unwrap().unwrap_err();
        assert!(matches!(err, BeamError::ConnectionClosed));
    }

    #[tokio::test]
    async fn eof_mid_prefix_is_connection_closed() {
        let mock = tokio_test::io::Builder::new().read(&[0, 0, 0]).build();
        let mut reader = FramedRead::new(mock, FrameCodec::default());

        let err = reader.next().await.unwrap().unwrap_err();
        assert!(matches!(err, BeamError::ConnectionClosed));
    }
}
