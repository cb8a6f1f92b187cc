// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Fixed-offset accessors for the 16-byte sketch header
//!
//! ```text
//! +------+---+-----+----------+
//! | HYLL | E | N/U | Cardin.  |
//! +------+---+-----+----------+
//! ```
//!
//! Bytes 0..4 are the magic, byte 4 the encoding, bytes 5..8 are reserved
//! and must be zero. Bytes 8..16 hold the cached cardinality, little endian;
//! the most significant bit of byte 15 is set when the cache is stale.

use byteorder::ByteOrder;
use byteorder::LE;

use crate::error::Error;
use crate::hll::Encoding;
use crate::hll::DENSE_SIZE;

/// Magic prefix of every sketch.
pub const MAGIC: &[u8; 4] = b"HYLL";

/// Header length in bytes.
pub const HDR_SIZE: usize = 16;

/// Offset of the encoding byte.
pub const ENCODING_BYTE: usize = 4;

/// Offset of the cached cardinality field.
pub const CARD_OFFSET: usize = 8;

const CACHE_STALE_BIT: u8 = 1 << 7;

/// Whether the cached cardinality can be reused.
#[inline]
pub fn cache_valid(buf: &[u8]) -> bool {
    buf[HDR_SIZE - 1] & CACHE_STALE_BIT == 0
}

/// Mark the cached cardinality as stale; every write path does this.
#[inline]
pub fn invalidate_cache(buf: &mut [u8]) {
    buf[HDR_SIZE - 1] |= CACHE_STALE_BIT;
}

/// Read the cached cardinality. Only meaningful while [`cache_valid`] holds.
#[inline]
pub fn cached_cardinality(buf: &[u8]) -> u64 {
    LE::read_u64(&buf[CARD_OFFSET..CARD_OFFSET + 8])
}

/// Store a freshly computed cardinality, clearing the stale flag.
#[inline]
pub fn set_cached_cardinality(buf: &mut [u8], cardinality: u64) {
    LE::write_u64(&mut buf[CARD_OFFSET..CARD_OFFSET + 8], cardinality);
}

/// Check that `buf` is a structurally valid stored sketch.
///
/// The magic and encoding byte must match, and a dense sketch must have
/// exactly the fixed stored length. Sparse payloads have variable length and
/// are validated lazily by the opcode scans that consume them.
pub fn validate(buf: &[u8]) -> Result<Encoding, Error> {
    if buf.len() < HDR_SIZE {
        return Err(Error::wrong_type("value shorter than a sketch header")
            .with_context("len", buf.len()));
    }
    if &buf[..4] != MAGIC {
        return Err(Error::wrong_type("bad magic, not a HyperLogLog string"));
    }
    let encoding = Encoding::from_byte(buf[ENCODING_BYTE]).ok_or_else(|| {
        Error::wrong_type("unknown sketch encoding").with_context("encoding", buf[ENCODING_BYTE])
    })?;
    if encoding == Encoding::Dense && buf.len() != DENSE_SIZE {
        return Err(Error::wrong_type("dense sketch has wrong length")
            .with_context("len", buf.len())
            .with_context("expected", DENSE_SIZE));
    }
    Ok(encoding)
}
