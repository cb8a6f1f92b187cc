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

//! HyperLogLog sketch buffers in the Redis `HYLL` byte format.
//!
//! A sketch is a single contiguous byte string: a 16-byte header followed by
//! a payload whose shape depends on the encoding byte.
//!
//! # Dense encoding
//!
//! 16384 six-bit counters packed one after the other starting from the LSB
//! of each byte and spilling into the next byte as needed, 12288 payload
//! bytes total. See [`dense`](self::dense) for the exact bit layout.
//!
//! # Sparse encoding
//!
//! A run-length stream of three opcodes (ZERO, XZERO, VAL), each encoding a
//! run of consecutive registers holding the same value. The opcodes of a
//! valid sketch cover exactly [`REGISTERS`] registers; anything else is
//! corrupt. An empty sketch is a single `XZERO:16384`, two bytes.
//!
//! Registers above value 32 cannot be represented sparsely. An update that
//! needs one, or that would grow the buffer past the configured bound,
//! promotes the sketch to the dense encoding. Promotion is one-way.
//!
//! # Header
//!
//! Four magic bytes `HYLL`, one encoding byte, three reserved zero bytes,
//! then the last computed cardinality as a little-endian u64 whose most
//! significant bit flags the cache as stale. See [`header`](self::header).

pub mod dense;
pub mod header;

pub(crate) mod estimator;
pub(crate) mod sparse;

mod sketch;

pub use self::sketch::Sketch;

/// Number of hash bits used to address a register.
pub const PRECISION: usize = 14;

/// Number of registers per sketch.
pub const REGISTERS: usize = 1 << PRECISION;

/// Width of one register in bits, enough to count 63 leading zeroes.
pub const REGISTER_BITS: usize = 6;

/// Largest value a register can hold.
pub const REGISTER_MAX: u8 = (1 << REGISTER_BITS) as u8 - 1;

/// Dense payload length in bytes, header excluded.
pub const DENSE_PAYLOAD_SIZE: usize = (REGISTERS * REGISTER_BITS + 7) / 8;

/// Exact stored length of a dense sketch.
pub const DENSE_SIZE: usize = header::HDR_SIZE + DENSE_PAYLOAD_SIZE;

/// Payload encoding of a stored sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Bit-packed register array, fixed size.
    Dense = 0,
    /// Run-length opcode stream, variable size.
    Sparse = 1,
}

impl Encoding {
    pub(crate) fn from_byte(byte: u8) -> Option<Encoding> {
        match byte {
            0 => Some(Encoding::Dense),
            1 => Some(Encoding::Sparse),
            _ => None,
        }
    }
}
