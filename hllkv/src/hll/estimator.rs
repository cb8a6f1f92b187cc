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

//! Cardinality estimation over any register representation
//!
//! The estimate is the harmonic mean of the register values scaled by
//! `alpha * m^2`, replaced by linear counting when the raw estimate is small
//! and there are empty registers, and corrected by a polynomial bias fit in
//! the 2.5m..72000 range where the raw formula shows a strong bias.

use std::sync::OnceLock;

use crate::error::Error;
use crate::hll::dense;
use crate::hll::sparse;
use crate::hll::REGISTERS;

/// A borrowed view of the registers in whichever shape they currently have.
///
/// `Raw` is the transient one-byte-per-register array multi-key operations
/// accumulate into; it never leaves the process.
pub(crate) enum Registers<'a> {
    Dense(&'a [u8]),
    Sparse(&'a [u8]),
    Raw(&'a [u8]),
}

/// The `2^-j` table shared by every sum routine, built on first use.
pub(crate) fn pe_table() -> &'static [f64; 64] {
    static PE: OnceLock<[f64; 64]> = OnceLock::new();
    PE.get_or_init(|| {
        let mut pe = [1.0f64; 64];
        for (j, entry) in pe.iter_mut().enumerate().skip(1) {
            *entry = 1.0 / (1u64 << j) as f64;
        }
        pe
    })
}

/// Approximate the cardinality of the set behind `registers`.
///
/// Fails only when a sparse payload turns out not to cover the register
/// array.
pub(crate) fn cardinality(registers: Registers<'_>) -> Result<u64, Error> {
    let pe = pe_table();
    let (sum, ez) = match registers {
        Registers::Dense(payload) => dense::dense_sum(payload, pe),
        Registers::Sparse(payload) => sparse::sparse_sum(payload, pe)?,
        Registers::Raw(payload) => raw_sum(payload, pe),
    };

    let m = REGISTERS as f64;
    let alpha = 0.7213 / (1.0 + 1.079 / m);
    let mut e = (1.0 / sum) * alpha * m * m;

    if e < m * 2.5 && ez != 0 {
        // Linear counting is more accurate while most registers are empty.
        e = m * (m / ez as f64).ln();
    } else if e < 72000.0 {
        // Polynomial regression of the raw estimator's bias, fit for this
        // register count.
        let bias = 5.9119e-18 * (e * e * e * e) - 1.4253e-12 * (e * e * e)
            + 1.2940e-7 * (e * e)
            - 5.2921e-3 * e
            + 83.3216;
        e -= e * (bias / 100.0);
    }
    Ok(e as u64)
}

/// `SUM(2^-register)` over a one-byte-per-register array.
///
/// Folds eight registers at a time with a fast path for all-zero words,
/// which dominate when few keys were merged.
fn raw_sum(registers: &[u8], pe: &[f64; 64]) -> (f64, usize) {
    let mut sum = 0.0;
    let mut ez = 0usize;
    for word in registers.chunks_exact(8) {
        if u64::from_ne_bytes(word.try_into().expect("eight-byte chunk")) == 0 {
            ez += 8;
            continue;
        }
        for &reg in word {
            if reg == 0 {
                ez += 1;
            } else {
                sum += pe[reg as usize];
            }
        }
    }
    (sum + ez as f64, ez)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pe_table() {
        let pe = pe_table();
        assert_eq!(pe[0], 1.0);
        assert_eq!(pe[1], 0.5);
        assert_eq!(pe[6], 1.0 / 64.0);
        assert_eq!(pe[63], 1.0 / (1u64 << 63) as f64);
    }

    #[test]
    fn test_empty_registers_estimate_zero() {
        let raw = vec![0u8; REGISTERS];
        assert_eq!(cardinality(Registers::Raw(&raw)).unwrap(), 0);
    }

    #[test]
    fn test_linear_counting_small_sets() {
        let mut raw = vec![0u8; REGISTERS];
        raw[10] = 1;
        assert_eq!(cardinality(Registers::Raw(&raw)).unwrap(), 1);
        raw[20] = 3;
        assert_eq!(cardinality(Registers::Raw(&raw)).unwrap(), 2);
        raw[30] = 2;
        assert_eq!(cardinality(Registers::Raw(&raw)).unwrap(), 3);
    }

    #[test]
    fn test_raw_sum_zero_word_fast_path() {
        let pe = pe_table();
        let mut raw = vec![0u8; 64];
        raw[9] = 1;
        let (sum, ez) = raw_sum(&raw, pe);
        assert_eq!(ez, 63);
        assert_eq!(sum, 63.0 + 0.5);
    }
}
