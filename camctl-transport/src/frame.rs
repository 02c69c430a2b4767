//! Length-prefixed message framing
//!
//! ```text
//! ┌─────────────┬──────────────────────┐
//! │   Length    │        Body          │
//! │   4 bytes   │    Length bytes      │
//! │  (LE u32)   │   (JSON packet)      │
//! └─────────────┴──────────────────────┘
//! ```

use std::io;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Error, Result};

/// Frame header size in bytes
pub const HEADER_SIZE: usize = 4;

/// Largest accepted frame body
pub const MAX_FRAME_SIZE: usize = camctl_core::MAX_PACKET_SIZE;

/// Encode one frame
pub fn encode(body: &[u8]) -> Result<BytesMut> {
    check_size(body.len())?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_u32_le(body.len() as u32);
    buf.put_slice(body);
    Ok(buf)
}

/// Decode a frame header into the body length
pub fn body_len(header: &[u8; HEADER_SIZE]) -> Result<usize> {
    let len = LittleEndian::read_u32(header) as usize;
    check_size(len)?;
    Ok(len)
}

fn check_size(size: usize) -> Result<()> {
    if size > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}

/// Read one frame body
///
/// Returns `Ok(None)` when the peer closed the stream cleanly between
/// frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<BytesMut>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    }

    let len = body_len(&header)?;
    let mut body = BytesMut::zeroed(len);
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::ConnectionClosed
        } else {
            Error::Io(e)
        }
    })?;

    trace!(
        "Read frame of {} bytes: {}",
        len,
        hex::encode(&body[..len.min(32)])
    );

    Ok(Some(body))
}

/// Write one frame
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(body)?;

    trace!(
        "Writing frame of {} bytes: {}",
        body.len(),
        hex::encode(&body[..body.len().min(32)])
    );

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header() {
        let frame = encode(b"{}").unwrap();
        assert_eq!(&frame[..], &[2, 0, 0, 0, b'{', b'}']);
    }

    #[test]
    fn test_body_len_rejects_oversize() {
        let header = ((MAX_FRAME_SIZE + 1) as u32).to_le_bytes();
        assert!(matches!(body_len(&header), Err(Error::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_read_write_frame() {
        let (mut a, mut b) = tokio::io::duplex(64);

        write_frame(&mut a, b"{\"cmd_type\":\"list\"}").await.unwrap();
        let body = read_frame(&mut b).await.unwrap().unwrap();

        assert_eq!(&body[..], b"{\"cmd_type\":\"list\"}");
    }

    #[tokio::test]
    async fn test_read_frame_clean_eof() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);

        assert!(read_frame(&mut b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_truncated_body() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[10, 0, 0, 0, 1, 2]).await.unwrap();
        drop(a);

        let result = read_frame(&mut b).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
