// SPDX-License-Identifier: GPL-3.0-only

//! QR decoding of picked gallery images
//!
//! Uses rqrr on a grayscale copy of the image. Decoding is CPU bound, so the
//! async entry point runs it on the blocking pool.

use crate::errors::{ScanError, ScanResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Decode the first readable QR code in an image file
///
/// `Ok(None)` means the image was readable but contained no decodable code.
pub async fn decode_image_file(path: PathBuf) -> ScanResult<Option<String>> {
    tokio::task::spawn_blocking(move || decode_image_sync(&path))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Image decode task panicked");
            Err(ScanError::Decode(e.to_string()))
        })
}

/// Synchronous decode (runs in blocking task)
pub fn decode_image_sync(path: &Path) -> ScanResult<Option<String>> {
    let start = std::time::Instant::now();

    let image = image::open(path)
        .map_err(|e| ScanError::Decode(format!("{}: {}", path.display(), e)))?
        .to_luma8();

    let mut prepared = rqrr::PreparedImage::prepare(image);
    let grids = prepared.detect_grids();
    debug!(count = grids.len(), path = %path.display(), "QR grids found");

    for grid in grids {
        match grid.decode() {
            Ok((meta, content)) => {
                debug!(
                    version = meta.version.0,
                    decode_ms = start.elapsed().as_millis(),
                    "Decoded QR code from image"
                );
                return Ok(Some(content));
            }
            Err(e) => debug!(error = %e, "Failed to decode QR grid"),
        }
    }

    Ok(None)
}
