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

mod erasure;
mod reader;
mod writer;

pub use erasure::{calc_shard_size, Erasure};
pub use reader::{bitrot_sha512_hex, decode_stripes};
pub use writer::ErasureWriter;

/// Algorithm tag recorded in metadata for the shard checksums.
pub const BITROT_ALGORITHM: &str = "sha512";
