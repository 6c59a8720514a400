//! Bulk pixel transfer.
//!
//! Reads stream raw bytes until the agreed count has arrived. Writes follow
//! a handshake: the worker announces its bytes per plane, then every chunk
//! sent is acknowledged by a text frame, and every completed plane by one
//! more.

use scifio_bridge_frame::FrameReader;
use scifio_bridge_meta::{MetadataValue, Region};
use scifio_bridge_process::WorkerChannel;
use tracing::{debug, trace, warn};

use crate::command::{READ, WRITE};
use crate::error::{BridgeError, Result};

/// What a completed write exchanged with the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    /// Bytes per plane announced by the worker.
    pub bytes_per_plane: usize,
    /// Planes sent.
    pub planes: usize,
    /// Data chunks sent.
    pub chunks: usize,
    /// Acknowledgement frames received (one per chunk plus one per plane).
    pub acknowledgements: usize,
}

/// Receive exactly `dst.len()` bytes of pixel data.
///
/// Call after the `read` command has been sent.
pub fn read_region_data<C>(reader: &mut FrameReader<'_, C>, dst: &mut [u8]) -> Result<()>
where
    C: WorkerChannel + ?Sized,
{
    reader.read_binary_into(READ, dst)?;
    debug!(bytes = dst.len(), "region read");
    Ok(())
}

/// Run the write handshake for `region`, sending pixels from `src`.
///
/// Call after the `write` command has been sent. Chunks are at most
/// `chunk_size` bytes. Any failure tears the worker down.
pub fn write_region_data<C>(
    reader: &mut FrameReader<'_, C>,
    region: &Region,
    src: &[u8],
    chunk_size: usize,
) -> Result<WriteStats>
where
    C: WorkerChannel + ?Sized,
{
    let announcement = reader.read_text_frame(WRITE)?;
    let first_line = announcement.first_line();
    let Some(bytes_per_plane) = usize::parse_value(&first_line) else {
        reader.channel_mut().shutdown();
        return Err(BridgeError::Protocol {
            context: WRITE,
            message: format!("expected bytes per plane, got {first_line:?}"),
        });
    };

    let Some((planes, expected)) = region
        .plane_count()
        .and_then(|planes| planes.checked_mul(bytes_per_plane).map(|total| (planes, total)))
    else {
        reader.channel_mut().shutdown();
        return Err(BridgeError::Protocol {
            context: WRITE,
            message: format!(
                "{bytes_per_plane} bytes per plane over {:?} overflows the transfer size",
                region.size()
            ),
        });
    };
    if src.len() < expected {
        reader.channel_mut().shutdown();
        return Err(BridgeError::BufferSize {
            expected,
            actual: src.len(),
        });
    }
    if src.len() > expected {
        warn!(
            expected,
            actual = src.len(),
            "pixel buffer larger than the region; trailing bytes not sent"
        );
    }
    debug!(bytes_per_plane, planes, "write handshake started");

    let chunk_size = chunk_size.max(1);
    let mut stats = WriteStats {
        bytes_per_plane,
        planes,
        chunks: 0,
        acknowledgements: 0,
    };

    // planes * bytes_per_plane fits in usize, so these offsets cannot overflow
    for plane in 0..planes {
        let start = plane * bytes_per_plane;
        for chunk in src[start..start + bytes_per_plane].chunks(chunk_size) {
            trace!(plane, bytes = chunk.len(), "sending chunk");
            if let Err(err) = reader.channel_mut().send(chunk) {
                reader.channel_mut().shutdown();
                return Err(err.into());
            }
            stats.chunks += 1;
            reader.read_text_frame(WRITE)?;
            stats.acknowledgements += 1;
        }

        trace!(plane, "waiting for end of plane");
        reader.read_text_frame(WRITE)?;
        stats.acknowledgements += 1;
    }

    debug!(?stats, "region written");
    Ok(stats)
}
