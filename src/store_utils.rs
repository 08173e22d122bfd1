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

use md5::{Digest as Md5Digest, Md5};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::store_api::CompletePart;

/// Smallest size a non-final part may have.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

pub fn is_min_allowed_part_size(size: u64) -> bool {
    size >= MIN_PART_SIZE
}

/// The S3 multipart composite ETag: MD5 over the concatenated binary MD5s
/// of the selected parts, hex encoded, suffixed with the part count.
pub fn get_complete_multipart_md5(parts: &[CompletePart]) -> String {
    let mut buf = Vec::new();

    for part in parts.iter() {
        if let Ok(etag_bytes) = hex_simd::decode_to_vec(part.etag.as_bytes()) {
            buf.extend(etag_bytes);
        } else {
            buf.extend(part.etag.bytes());
        }
    }

    let mut hasher = Md5::new();
    hasher.update(&buf);

    let digest = hasher.finalize();
    let etag_hex = faster_hex::hex_string(digest.as_slice());
    format!("{}-{}", etag_hex, parts.len())
}

/// Content type for an object name, by extension, with the S3 default.
pub fn content_type_of(object: &str) -> String {
    mime_guess::from_path(object).first_or_octet_stream().to_string()
}

/// Fills `buf` from `reader`, stopping early only at end of stream.
/// Returns the number of bytes read.
pub async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
