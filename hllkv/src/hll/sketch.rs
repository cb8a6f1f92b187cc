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

//! The sketch buffer type
//!
//! [`Sketch`] owns one validated sketch byte string and dispatches every
//! operation to the codec matching its current encoding. It is the only
//! type that crosses the header/payload boundary; everything below it works
//! on payload slices.

use crate::error::Error;
use crate::hash::register_and_runlen;
use crate::hll::dense;
use crate::hll::estimator;
use crate::hll::estimator::Registers;
use crate::hll::header;
use crate::hll::header::HDR_SIZE;
use crate::hll::sparse;
use crate::hll::sparse::SparseUpdate;
use crate::hll::Encoding;
use crate::hll::DENSE_SIZE;
use crate::hll::REGISTERS;

/// A HyperLogLog sketch in the Redis `HYLL` byte format.
///
/// Freshly created sketches are sparse; updates promote them to dense when
/// the sparse encoding can no longer hold them. While the sketch is dense
/// the internal buffer carries one zero sentinel byte past the packed
/// registers (the register codec reads and writes `byte + 1` branch-free);
/// the sentinel is stripped again by [`into_bytes`](Sketch::into_bytes), so
/// stored dense sketches always have exactly [`DENSE_SIZE`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sketch {
    bytes: Vec<u8>,
}

impl Sketch {
    /// Create an empty sparse sketch.
    ///
    /// The cached cardinality starts as a valid zero, which is exactly the
    /// cardinality of the empty set.
    pub fn new() -> Self {
        let mut bytes = Vec::with_capacity(HDR_SIZE + 2);
        bytes.extend_from_slice(header::MAGIC);
        bytes.push(Encoding::Sparse as u8);
        bytes.extend_from_slice(&[0u8; 11]);
        bytes.extend_from_slice(&sparse::empty_payload());
        Self { bytes }
    }

    /// Take ownership of a stored sketch, validating its header.
    ///
    /// Sparse payloads are only validated lazily by the scans that read
    /// them, mirroring how the stored format is defined.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, Error> {
        let encoding = header::validate(&bytes)?;
        if encoding == Encoding::Dense {
            bytes.push(0);
        }
        Ok(Self { bytes })
    }

    /// Return the stored byte representation.
    pub fn into_bytes(mut self) -> Vec<u8> {
        if self.encoding() == Encoding::Dense {
            self.bytes.truncate(DENSE_SIZE);
        }
        self.bytes
    }

    /// Current payload encoding.
    pub fn encoding(&self) -> Encoding {
        // Validated at construction; only promotion rewrites this byte.
        Encoding::from_byte(self.bytes[header::ENCODING_BYTE]).expect("sketch encoding byte")
    }

    /// Observe a member, raising its register if the hash produced a longer
    /// zero run than any earlier member of that register.
    ///
    /// Returns whether any register changed. May promote the sketch to the
    /// dense encoding; `sparse_max_bytes` bounds the sparse buffer length
    /// (header included) before promotion is forced.
    pub fn add(&mut self, member: &[u8], sparse_max_bytes: usize) -> Result<bool, Error> {
        let (index, count) = register_and_runlen(member);
        match self.encoding() {
            Encoding::Dense => Ok(self.dense_add(index, count)),
            Encoding::Sparse => {
                match sparse::sparse_set(&mut self.bytes, index, count, sparse_max_bytes)? {
                    SparseUpdate::Updated => Ok(true),
                    SparseUpdate::Unchanged => Ok(false),
                    SparseUpdate::Promote => {
                        self.bytes = sparse::sparse_to_dense(&self.bytes)?;
                        // Promotion only happens for an update the sparse
                        // form could not hold, so replaying it must win.
                        let changed = self.dense_add(index, count);
                        debug_assert!(changed, "promoting update must raise a register");
                        Ok(changed)
                    }
                }
            }
        }
    }

    fn dense_add(&mut self, index: usize, count: u8) -> bool {
        let changed = dense::dense_add(&mut self.bytes[HDR_SIZE..], index, count);
        if changed {
            header::invalidate_cache(&mut self.bytes);
        }
        changed
    }

    /// Approximate the number of distinct members observed so far.
    ///
    /// Always recomputes; the header cache is managed by the caller (see
    /// [`HllStore::pfcount`](crate::HllStore::pfcount)).
    pub fn cardinality(&self) -> Result<u64, Error> {
        let payload = &self.bytes[HDR_SIZE..];
        match self.encoding() {
            Encoding::Dense => estimator::cardinality(Registers::Dense(payload)),
            Encoding::Sparse => estimator::cardinality(Registers::Sparse(payload)),
        }
    }

    /// Whether the cached cardinality in the header can be reused.
    pub fn cache_valid(&self) -> bool {
        header::cache_valid(&self.bytes)
    }

    /// The cached cardinality. Only meaningful while the cache is valid.
    pub fn cached_cardinality(&self) -> u64 {
        header::cached_cardinality(&self.bytes)
    }

    /// Store a freshly computed cardinality, marking the cache valid.
    pub fn set_cached_cardinality(&mut self, cardinality: u64) {
        header::set_cached_cardinality(&mut self.bytes, cardinality);
    }

    /// Mark the cached cardinality as stale.
    pub fn invalidate_cache(&mut self) {
        header::invalidate_cache(&mut self.bytes);
    }

    /// Decode all registers into one byte each, whatever the encoding.
    pub fn registers(&self) -> Result<Vec<u8>, Error> {
        let mut registers = vec![0u8; REGISTERS];
        self.merge_max_into(&mut registers)?;
        Ok(registers)
    }

    /// Fold this sketch into `max`, keeping the register-wise maximum.
    ///
    /// # Panics
    ///
    /// If `max` is not exactly [`REGISTERS`] bytes long.
    pub fn merge_max_into(&self, max: &mut [u8]) -> Result<(), Error> {
        assert_eq!(
            max.len(),
            REGISTERS,
            "merge target must have one byte per register"
        );
        let payload = &self.bytes[HDR_SIZE..];
        match self.encoding() {
            Encoding::Dense => {
                for (index, slot) in max.iter_mut().enumerate() {
                    let value = dense::get_register(payload, index);
                    if value > *slot {
                        *slot = value;
                    }
                }
                Ok(())
            }
            Encoding::Sparse => sparse::merge_max(payload, max),
        }
    }

    /// Overwrite every register from a one-byte-per-register array,
    /// promoting the sketch to the dense encoding first.
    ///
    /// This is the write half of a merge: accumulate maxima with
    /// [`merge_max_into`](Sketch::merge_max_into), then store them here.
    ///
    /// # Panics
    ///
    /// If `values` is not exactly [`REGISTERS`] bytes long.
    pub fn set_registers(&mut self, values: &[u8]) -> Result<(), Error> {
        assert_eq!(
            values.len(),
            REGISTERS,
            "register source must have one byte per register"
        );
        if self.encoding() == Encoding::Sparse {
            self.bytes = sparse::sparse_to_dense(&self.bytes)?;
        }
        let payload = &mut self.bytes[HDR_SIZE..];
        for (index, &value) in values.iter().enumerate() {
            dense::set_register(payload, index, value);
        }
        header::invalidate_cache(&mut self.bytes);
        Ok(())
    }
}

impl Default for Sketch {
    fn default() -> Self {
        Self::new()
    }
}
