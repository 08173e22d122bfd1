// Copyright 2025 xlstore Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use sha2::{Digest, Sha512};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::disk::error::{DiskError, Result};

use super::erasure::{calc_shard_size, Erasure};

/// Hex SHA-512 of a whole shard file, for comparison against the checksum
/// recorded in the metadata of the disk holding it.
pub fn bitrot_sha512_hex(data: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data);
    faster_hex::hex_string(hasher.finalize().as_slice())
}

/// Decodes the payload of one erasure-coded file from its shard files and
/// streams it to `writer`.
///
/// `shard_files` is indexed by shard (not disk); `None` marks a shard whose
/// disk was offline or whose bitrot check failed. Missing data shards are
/// rebuilt stripe by stripe as long as `data_shards` shards survive.
pub async fn decode_stripes<W>(
    erasure: &Erasure,
    shard_files: &[Option<Vec<u8>>],
    total_length: u64,
    writer: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let available = shard_files.iter().filter(|s| s.is_some()).count();
    if available < erasure.data_shards {
        return Err(DiskError::ErasureReadQuorum);
    }

    let full_shard_size = erasure.shard_size();
    let mut remaining = total_length as usize;
    let mut stripe = 0usize;

    while remaining > 0 {
        let stripe_len = remaining.min(erasure.block_size);
        let shard_len = calc_shard_size(stripe_len, erasure.data_shards);
        let offset = stripe * full_shard_size;

        let mut shards: Vec<Option<Vec<u8>>> = shard_files
            .iter()
            .map(|file| {
                file.as_ref().and_then(|data| {
                    if data.len() < offset + shard_len {
                        None
                    } else {
                        Some(data[offset..offset + shard_len].to_vec())
                    }
                })
            })
            .collect();

        let needs_rebuild = shards.iter().take(erasure.data_shards).any(|s| s.is_none());
        if needs_rebuild {
            erasure.reconstruct(&mut shards).map_err(|_| DiskError::ErasureReadQuorum)?;
        }

        let mut payload = Vec::with_capacity(erasure.data_shards * shard_len);
        for shard in shards.iter().take(erasure.data_shards) {
            match shard {
                Some(data) => payload.extend_from_slice(data),
                None => return Err(DiskError::ErasureReadQuorum),
            }
        }
        payload.truncate(stripe_len);

        writer.write_all(&payload).await.map_err(DiskError::Io)?;

        remaining -= stripe_len;
        stripe += 1;
    }

    Ok(())
}
