// SPDX-License-Identifier: Apache-2.0
//! Board exchange codec (C12): the on-disk/over-the-wire board format
//! `load_board` accepts.
//!
//! Wire shape:
//! ```json
//! { "version": 1, "board": { "size": [x, y, z], "placements": [...] }, "profile": {} }
//! ```
//! Optionally gzip-framed (detected by the `\x1f\x8b` magic bytes), matching
//! this codebase's convention of accepting either a raw or compressed blob
//! at the same entry point.

use std::io::Read as _;

use serde::{Deserialize, Serialize};

use crate::board::Placement;
use crate::error::BoardLoadError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The wire envelope `load_board_bytes` decodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoardEnvelope {
    version: u32,
    board: BoardSection,
    #[serde(default)]
    profile: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoardSection {
    size: (i32, i32, i32),
    placements: Vec<Placement>,
}

/// A decoded board blob, ready to be replayed onto a fresh [`crate::board::Board`].
#[derive(Debug, Clone)]
pub struct BoardBlob {
    /// Declared board extent.
    pub size: (i32, i32, i32),
    /// Placements to replay, in file order.
    pub placements: Vec<Placement>,
    /// Opaque authoring metadata, round-tripped but not interpreted by the
    /// engine.
    pub profile: serde_json::Value,
}

/// Decodes a board blob, transparently gzip-decompressing first if `bytes`
/// starts with the gzip magic.
pub fn load_board_bytes(bytes: &[u8]) -> Result<BoardBlob, BoardLoadError> {
    let json_bytes = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = flate2::read::GzDecoder::new(bytes);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(|e| BoardLoadError::InvalidBlob {
            reason: format!("gzip decompression failed: {e}"),
        })?;
        out
    } else {
        bytes.to_vec()
    };

    let envelope: BoardEnvelope = serde_json::from_slice(&json_bytes).map_err(|e| BoardLoadError::InvalidBlob {
        reason: format!("JSON parse failed: {e}"),
    })?;

    if envelope.version != 1 {
        return Err(BoardLoadError::InvalidBlob {
            reason: format!("unsupported board format version {}", envelope.version),
        });
    }

    Ok(BoardBlob {
        size: envelope.board.size,
        placements: envelope.board.placements,
        profile: envelope.profile,
    })
}

/// Encodes a board blob back to its JSON wire form (uncompressed). Used by
/// the CLI's `inspect`/export paths.
pub fn save_board_bytes(blob: &BoardBlob) -> Result<Vec<u8>, serde_json::Error> {
    let envelope = BoardEnvelope {
        version: 1,
        board: BoardSection {
            size: blob.size,
            placements: blob.placements.clone(),
        },
        profile: blob.profile.clone(),
    };
    serde_json::to_vec_pretty(&envelope)
}
