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

//! Reed-Solomon erasure coding over the SIMD backend.
//!
//! One application-level write of up to `block_size` bytes forms a stripe:
//! it is split into `data_shards` equal slices (zero-padded at the tail),
//! and `parity_shards` recovery slices are computed. Any `data_shards`
//! surviving slices suffice to rebuild the stripe.

use std::io;

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;
use tracing::warn;

/// Reed-Solomon codec with cached SIMD encoder/decoder instances.
pub struct ReedSolomonCodec {
    data_shards: usize,
    parity_shards: usize,
    encoder_cache: std::sync::RwLock<Option<reed_solomon_simd::ReedSolomonEncoder>>,
    decoder_cache: std::sync::RwLock<Option<reed_solomon_simd::ReedSolomonDecoder>>,
}

impl ReedSolomonCodec {
    pub fn new(data_shards: usize, parity_shards: usize) -> Self {
        ReedSolomonCodec {
            data_shards,
            parity_shards,
            encoder_cache: std::sync::RwLock::new(None),
            decoder_cache: std::sync::RwLock::new(None),
        }
    }

    /// Fills the parity slots of `shards` from its data slots. All slices
    /// must share one length.
    pub fn encode(&self, shards: SmallVec<[&mut [u8]; 16]>) -> io::Result<()> {
        let mut shards_vec: Vec<&mut [u8]> = shards.into_vec();
        if shards_vec.is_empty() {
            return Ok(());
        }

        let shard_len = shards_vec[0].len();

        let mut encoder = {
            let mut cache_guard = self
                .encoder_cache
                .write()
                .map_err(|_| io::Error::other("encoder cache lock poisoned"))?;

            match cache_guard.take() {
                Some(mut cached) => {
                    if let Err(e) = cached.reset(self.data_shards, self.parity_shards, shard_len) {
                        warn!("resetting cached encoder failed: {:?}, creating a new one", e);
                        reed_solomon_simd::ReedSolomonEncoder::new(self.data_shards, self.parity_shards, shard_len)
                            .map_err(|e| io::Error::other(format!("create encoder: {e:?}")))?
                    } else {
                        cached
                    }
                }
                None => reed_solomon_simd::ReedSolomonEncoder::new(self.data_shards, self.parity_shards, shard_len)
                    .map_err(|e| io::Error::other(format!("create encoder: {e:?}")))?,
            }
        };

        for (i, shard) in shards_vec.iter().enumerate().take(self.data_shards) {
            encoder
                .add_original_shard(shard)
                .map_err(|e| io::Error::other(format!("add shard {i}: {e:?}")))?;
        }

        let result = encoder.encode().map_err(|e| io::Error::other(format!("encode: {e:?}")))?;

        for (i, recovery_shard) in result.recovery_iter().enumerate() {
            if i + self.data_shards < shards_vec.len() {
                shards_vec[i + self.data_shards].copy_from_slice(recovery_shard);
            }
        }

        drop(result);

        *self
            .encoder_cache
            .write()
            .map_err(|_| io::Error::other("encoder cache lock poisoned"))? = Some(encoder);

        Ok(())
    }

    /// Rebuilds missing data shards in place. At least `data_shards` slots
    /// must be present.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> io::Result<()> {
        let shard_len = shards
            .iter()
            .find_map(|s| s.as_ref().map(|v| v.len()))
            .ok_or_else(|| io::Error::other("no shards available for reconstruction"))?;

        let mut decoder = {
            let mut cache_guard = self
                .decoder_cache
                .write()
                .map_err(|_| io::Error::other("decoder cache lock poisoned"))?;

            match cache_guard.take() {
                Some(mut cached) => {
                    if let Err(e) = cached.reset(self.data_shards, self.parity_shards, shard_len) {
                        warn!("resetting cached decoder failed: {:?}, creating a new one", e);
                        reed_solomon_simd::ReedSolomonDecoder::new(self.data_shards, self.parity_shards, shard_len)
                            .map_err(|e| io::Error::other(format!("create decoder: {e:?}")))?
                    } else {
                        cached
                    }
                }
                None => reed_solomon_simd::ReedSolomonDecoder::new(self.data_shards, self.parity_shards, shard_len)
                    .map_err(|e| io::Error::other(format!("create decoder: {e:?}")))?,
            }
        };

        for (i, shard_opt) in shards.iter().enumerate() {
            if let Some(shard) = shard_opt {
                if i < self.data_shards {
                    decoder
                        .add_original_shard(i, shard)
                        .map_err(|e| io::Error::other(format!("add original shard {i}: {e:?}")))?;
                } else {
                    decoder
                        .add_recovery_shard(i - self.data_shards, shard)
                        .map_err(|e| io::Error::other(format!("add recovery shard {i}: {e:?}")))?;
                }
            }
        }

        let result = decoder.decode().map_err(|e| io::Error::other(format!("decode: {e:?}")))?;

        for (i, shard_opt) in shards.iter_mut().enumerate() {
            if shard_opt.is_none() && i < self.data_shards {
                for (restored_index, restored_data) in result.restored_original_iter() {
                    if restored_index == i {
                        *shard_opt = Some(restored_data.to_vec());
                        break;
                    }
                }
            }
        }

        drop(result);

        *self
            .decoder_cache
            .write()
            .map_err(|_| io::Error::other("decoder cache lock poisoned"))? = Some(decoder);

        Ok(())
    }
}

/// Per-shard slice length for a stripe of `len` input bytes. Rounded up to
/// an even count as the SIMD backend requires.
pub fn calc_shard_size(len: usize, data_shards: usize) -> usize {
    (len.div_ceil(data_shards) + 1) & !1
}

/// Erasure coding parameters of one upload, frozen at initiate time.
pub struct Erasure {
    pub data_shards: usize,
    pub parity_shards: usize,
    pub block_size: usize,
    codec: ReedSolomonCodec,
}

impl Erasure {
    pub fn new(data_shards: usize, parity_shards: usize, block_size: usize) -> Self {
        Erasure {
            data_shards,
            parity_shards,
            block_size,
            codec: ReedSolomonCodec::new(data_shards, parity_shards),
        }
    }

    pub fn total_shard_count(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Shard slice length of a full stripe.
    pub fn shard_size(&self) -> usize {
        calc_shard_size(self.block_size, self.data_shards)
    }

    /// On-disk length of one shard file backing `total_length` payload bytes.
    pub fn shard_file_size(&self, total_length: u64) -> u64 {
        if total_length == 0 {
            return 0;
        }

        let total_length = total_length as usize;
        let num_stripes = total_length / self.block_size;
        let last_stripe_len = total_length % self.block_size;
        let last_shard_size = calc_shard_size(last_stripe_len, self.data_shards);
        (num_stripes * self.shard_size() + last_shard_size) as u64
    }

    /// Splits one stripe of input into data shards, pads the tail with
    /// zeros and computes parity. Returns `data_shards + parity_shards`
    /// equal-length slices referencing one buffer.
    pub fn encode_data(&self, data: &[u8]) -> io::Result<Vec<Bytes>> {
        if data.is_empty() {
            return Ok(vec![Bytes::new(); self.total_shard_count()]);
        }

        let per_shard_size = calc_shard_size(data.len(), self.data_shards);
        let need_total_size = per_shard_size * self.total_shard_count();

        let mut data_buffer = BytesMut::with_capacity(need_total_size);
        data_buffer.extend_from_slice(data);
        data_buffer.resize(need_total_size, 0u8);

        {
            let data_slices: SmallVec<[&mut [u8]; 16]> = data_buffer.chunks_exact_mut(per_shard_size).collect();
            if self.parity_shards > 0 {
                self.codec.encode(data_slices)?;
            }
        }

        let mut data_buffer = data_buffer.freeze();
        let mut shards = Vec::with_capacity(self.total_shard_count());
        for _ in 0..self.total_shard_count() {
            shards.push(data_buffer.split_to(per_shard_size));
        }

        Ok(shards)
    }

    /// Rebuilds missing shards of one stripe in place.
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> io::Result<()> {
        self.codec.reconstruct(shards)
    }
}
