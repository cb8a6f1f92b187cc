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

use byteorder::ByteOrder;
use byteorder::LE;

use crate::hll::PRECISION;
use crate::hll::REGISTERS;

/// Seed every sketch hashes its members with.
pub const HASH_SEED: u64 = 0xadc83b19;

const M: u64 = 0xc6a4a7935bd1e995;
const R: u32 = 47;

/// MurmurHash2, 64 bit version, endian neutral.
///
/// Blocks are always consumed in little-endian byte order so the function
/// yields identical output on little- and big-endian hosts. This is a hard
/// compatibility requirement: register placement is derived from the hash,
/// and sketches built on different hosts must agree byte for byte.
pub fn murmur_hash64a(data: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (data.len() as u64).wrapping_mul(M);

    let mut blocks = data.chunks_exact(8);
    for block in &mut blocks {
        let mut k = LE::read_u64(block);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    // Fold the 1..7 byte tail in descending-offset order.
    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, &byte) in tail.iter().enumerate().rev() {
            h ^= (byte as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

/// Hash a member and derive its register coordinates.
///
/// Returns the register index (low [`PRECISION`] bits of the hash) and the
/// length of the `000..1` bit pattern starting just above them: the count of
/// consecutive zero bits plus one, in `1..=51`. The "1" terminating the run
/// is part of the count, so a hash with no zeroes at all yields 1.
pub fn register_and_runlen(member: &[u8]) -> (usize, u8) {
    let hash = murmur_hash64a(member, HASH_SEED);
    let index = (hash & (REGISTERS as u64 - 1)) as usize;

    // Bit 63 is a sentinel so the scan below always terminates.
    let hash = hash | (1 << 63);
    let mut bit = 1u64 << PRECISION;
    let mut count: u8 = 1;
    while hash & bit == 0 {
        count += 1;
        bit <<= 1;
    }
    (index, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        // One vector per tail length, plus an empty and a multi-block input.
        let cases: &[(&[u8], u64)] = &[
            (b"", 0xd8dfea6585bc9732),
            (b"a", 0x53d2470a9b43b1a7),
            (b"ab", 0x0eaed676437142cf),
            (b"abc", 0x77ec90aeb374e502),
            (b"abcd", 0xb079ee3d44202b3e),
            (b"abcde", 0x52a7daa2324a0e8e),
            (b"abcdef", 0x3a4f3a74f538b54f),
            (b"abcdefg", 0x22fe613bb08c9602),
            (b"abcdefgh", 0xf3a65df559914567),
            (b"abcdefghij", 0xce00afbfdbd6efc4),
            (
                b"The quick brown fox jumps over the lazy dog",
                0x51606c5c5b561ace,
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(
                murmur_hash64a(input, HASH_SEED),
                *expected,
                "hash mismatch for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_register_and_runlen() {
        assert_eq!(register_and_runlen(b"hello"), (9216, 1));
        assert_eq!(register_and_runlen(b"x"), (16374, 2));
        assert_eq!(register_and_runlen(b"y"), (14932, 3));
        assert_eq!(register_and_runlen(b"z"), (8581, 1));
    }

    #[test]
    fn test_runlen_range() {
        for i in 0..1000u32 {
            let member = i.to_le_bytes();
            let (index, count) = register_and_runlen(&member);
            assert!(index < REGISTERS);
            assert!((1..=51).contains(&count), "count {count} out of range");
        }
    }
}
