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

//! Run-length sparse register encoding
//!
//! Three opcodes encode runs of consecutive registers holding one value:
//!
//! - `ZERO`, one byte `00xxxxxx`: `xxxxxx + 1` registers set to zero,
//!   run length 1..=64.
//! - `XZERO`, two bytes `01xxxxxx yyyyyyyy`: a 14-bit run length (high bits
//!   first) plus one, 1..=16384 registers set to zero.
//! - `VAL`, one byte `1vvvvvll`: `ll + 1` registers (1..=4) all set to
//!   `vvvvv + 1` (1..=32).
//!
//! The encoding is purely positional: a valid payload's run lengths add up
//! to exactly [`REGISTERS`]. An empty sketch is the single opcode
//! `XZERO:16384`.
//!
//! Values above [`VAL_MAX_VALUE`] are not representable; an update that
//! needs one reports [`SparseUpdate::Promote`] so the caller can switch the
//! sketch to the dense encoding.

use crate::error::Error;
use crate::hll::dense;
use crate::hll::header;
use crate::hll::header::HDR_SIZE;
use crate::hll::Encoding;
use crate::hll::DENSE_SIZE;
use crate::hll::REGISTERS;

const XZERO_BIT: u8 = 0x40;
const VAL_BIT: u8 = 0x80;

/// Longest run a one-byte ZERO opcode can carry.
pub(crate) const ZERO_MAX_LEN: usize = 64;

/// Longest run a two-byte XZERO opcode can carry.
pub(crate) const XZERO_MAX_LEN: usize = 16384;

/// Largest register value a VAL opcode can carry.
pub(crate) const VAL_MAX_VALUE: u8 = 32;

/// Longest run a VAL opcode can carry.
const VAL_MAX_LEN: usize = 4;

#[inline]
fn is_zero(b: u8) -> bool {
    b & 0xc0 == 0
}

#[inline]
fn is_xzero(b: u8) -> bool {
    b & 0xc0 == XZERO_BIT
}

#[inline]
fn is_val(b: u8) -> bool {
    b & VAL_BIT != 0
}

#[inline]
fn zero_len(b: u8) -> usize {
    (b & 0x3f) as usize + 1
}

#[inline]
fn xzero_len(b0: u8, b1: u8) -> usize {
    (((b0 & 0x3f) as usize) << 8 | b1 as usize) + 1
}

#[inline]
fn val_value(b: u8) -> u8 {
    ((b >> 2) & 0x1f) + 1
}

#[inline]
fn val_len(b: u8) -> usize {
    (b & 0x3) as usize + 1
}

#[inline]
fn val_byte(value: u8, len: usize) -> u8 {
    (value - 1) << 2 | (len as u8 - 1) | VAL_BIT
}

#[inline]
fn zero_byte(len: usize) -> u8 {
    len as u8 - 1
}

#[inline]
fn xzero_bytes(len: usize) -> [u8; 2] {
    let l = len - 1;
    [(l >> 8) as u8 | XZERO_BIT, (l & 0xff) as u8]
}

/// One decoded sparse opcode.
pub(crate) enum Opcode {
    Zero(usize),
    XZero(usize),
    Val { value: u8, len: usize },
}

/// Sequential decoder over a sparse payload (header excluded).
///
/// The scan itself never fails; consumers must check that the decoded run
/// lengths cover exactly [`REGISTERS`] and treat anything else as corrupt.
pub(crate) struct OpcodeScan<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> OpcodeScan<'a> {
    pub(crate) fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }
}

impl Iterator for OpcodeScan<'_> {
    type Item = Opcode;

    fn next(&mut self) -> Option<Opcode> {
        let b = *self.payload.get(self.pos)?;
        if is_zero(b) {
            self.pos += 1;
            Some(Opcode::Zero(zero_len(b)))
        } else if is_xzero(b) {
            let lo = *self.payload.get(self.pos + 1).unwrap_or(&0);
            self.pos += 2;
            Some(Opcode::XZero(xzero_len(b, lo)))
        } else {
            self.pos += 1;
            Some(Opcode::Val {
                value: val_value(b),
                len: val_len(b),
            })
        }
    }
}

/// Payload of an empty sketch: XZERO runs covering every register.
pub(crate) fn empty_payload() -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 * REGISTERS.div_ceil(XZERO_MAX_LEN));
    let mut left = REGISTERS;
    while left > 0 {
        let run = left.min(XZERO_MAX_LEN);
        payload.extend_from_slice(&xzero_bytes(run));
        left -= run;
    }
    payload
}

/// Convert a whole sparse sketch into a fresh dense one.
///
/// The header (cached cardinality included) is carried over with the
/// encoding byte switched; the returned buffer has the one-byte sentinel
/// after the packed registers.
pub(crate) fn sparse_to_dense(buf: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; DENSE_SIZE + 1];
    out[..HDR_SIZE].copy_from_slice(&buf[..HDR_SIZE]);
    out[header::ENCODING_BYTE] = Encoding::Dense as u8;

    let registers = &mut out[HDR_SIZE..];
    let mut idx = 0usize;
    for opcode in OpcodeScan::new(&buf[HDR_SIZE..]) {
        match opcode {
            Opcode::Zero(len) | Opcode::XZero(len) => idx += len,
            Opcode::Val { value, len } => {
                if idx + len > REGISTERS {
                    return Err(coverage_error(idx + len));
                }
                for _ in 0..len {
                    dense::set_register(registers, idx, value);
                    idx += 1;
                }
            }
        }
    }
    if idx != REGISTERS {
        return Err(coverage_error(idx));
    }
    Ok(out)
}

/// Compute `SUM(2^-register)` over a sparse payload.
///
/// `pe` is the precomputed `2^-j` table. Returns the sum and the number of
/// zero registers, or an error if the opcodes do not cover the register
/// array.
pub(crate) fn sparse_sum(payload: &[u8], pe: &[f64; 64]) -> Result<(f64, usize), Error> {
    let mut sum = 0.0;
    let mut ez = 0usize;
    let mut idx = 0usize;
    for opcode in OpcodeScan::new(payload) {
        match opcode {
            Opcode::Zero(len) | Opcode::XZero(len) => {
                idx += len;
                ez += len;
            }
            Opcode::Val { value, len } => {
                sum += pe[value as usize] * len as f64;
                idx += len;
            }
        }
    }
    if idx != REGISTERS {
        return Err(coverage_error(idx));
    }
    Ok((sum + ez as f64, ez))
}

/// Fold a sparse payload into `max`, register-wise maximum.
pub(crate) fn merge_max(payload: &[u8], max: &mut [u8]) -> Result<(), Error> {
    let mut idx = 0usize;
    for opcode in OpcodeScan::new(payload) {
        match opcode {
            Opcode::Zero(len) | Opcode::XZero(len) => idx += len,
            Opcode::Val { value, len } => {
                if idx + len > REGISTERS {
                    return Err(coverage_error(idx + len));
                }
                for slot in &mut max[idx..idx + len] {
                    if value > *slot {
                        *slot = value;
                    }
                }
                idx += len;
            }
        }
    }
    if idx != REGISTERS {
        return Err(coverage_error(idx));
    }
    Ok(())
}

fn coverage_error(covered: usize) -> Error {
    Error::corrupted("sparse opcodes do not cover the register array")
        .with_context("covered", covered)
        .with_context("registers", REGISTERS)
}

/// Outcome of an in-place sparse register update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SparseUpdate {
    /// A register was raised; the cache has been invalidated.
    Updated,
    /// The register already held an equal or larger value.
    Unchanged,
    /// The update cannot be represented sparsely; convert to dense and redo.
    Promote,
}

/// Raise the register at `index` to `count` inside a whole sparse sketch.
///
/// The mutation happens in place: the opcode covering `index` is rewritten,
/// or split into up to three opcodes spliced over it. Afterwards adjacent
/// VAL runs of equal value are fused back together, scanning a bounded
/// window so a pathological payload cannot make updates quadratic.
///
/// Reports [`SparseUpdate::Promote`] without touching the buffer when
/// `count` exceeds [`VAL_MAX_VALUE`] or the splice would grow the sketch
/// past `sparse_max_bytes`.
pub(crate) fn sparse_set(
    buf: &mut Vec<u8>,
    index: usize,
    count: u8,
    sparse_max_bytes: usize,
) -> Result<SparseUpdate, Error> {
    if count > VAL_MAX_VALUE {
        return Ok(SparseUpdate::Promote);
    }

    // Worst case the splice grows the buffer by three bytes
    // (XZERO split into XZERO-VAL-XZERO).
    buf.reserve(3);

    // Step 1: locate the opcode covering `index`.
    let end = buf.len();
    let mut p = HDR_SIZE;
    let mut prev: Option<usize> = None;
    let mut first = 0usize;
    let mut found = None;
    while p < end {
        let b = buf[p];
        let (span, oplen) = if is_zero(b) {
            (zero_len(b), 1)
        } else if is_val(b) {
            (val_len(b), 1)
        } else {
            (xzero_len(b, *buf.get(p + 1).unwrap_or(&0)), 2)
        };
        if index <= first + span - 1 {
            found = Some((span, oplen));
            break;
        }
        prev = Some(p);
        p += oplen;
        first += span;
    }
    let Some((span, oplen)) = found else {
        return Err(
            Error::corrupted("no sparse opcode covers the register").with_context("register", index)
        );
    };

    // Step 2: trivial rewrites that change no opcode boundaries. A VAL run
    // already at or above `count` means nothing to do at all.
    let b = buf[p];
    let mut rewritten = false;
    if is_val(b) {
        if val_value(b) >= count {
            return Ok(SparseUpdate::Unchanged);
        }
        if span == 1 {
            buf[p] = val_byte(count, 1);
            rewritten = true;
        }
    } else if is_zero(b) && span == 1 {
        buf[p] = val_byte(count, 1);
        rewritten = true;
    }

    if !rewritten {
        // Step 3: split the covering opcode. The register lands in the
        // middle of a run, so the run becomes left part, VAL(count, 1),
        // right part; either part may be empty.
        let last = first + span - 1;
        let mut seq = [0u8; 5];
        let mut n = 0usize;
        if is_val(b) {
            let curval = val_value(b);
            if index != first {
                seq[n] = val_byte(curval, index - first);
                n += 1;
            }
            seq[n] = val_byte(count, 1);
            n += 1;
            if index != last {
                seq[n] = val_byte(curval, last - index);
                n += 1;
            }
        } else {
            if index != first {
                push_zero_run(&mut seq, &mut n, index - first);
            }
            seq[n] = val_byte(count, 1);
            n += 1;
            if index != last {
                push_zero_run(&mut seq, &mut n, last - index);
            }
        }

        let grown = n.saturating_sub(oplen);
        if grown > 0 && buf.len() + grown > sparse_max_bytes {
            return Ok(SparseUpdate::Promote);
        }
        buf.splice(p..p + oplen, seq[..n].iter().copied());
    }

    // Step 4: fuse adjacent VAL runs of the same value back together,
    // rescanning from the opcode before the touched one.
    merge_adjacent(buf, prev.unwrap_or(HDR_SIZE));

    header::invalidate_cache(buf);
    Ok(SparseUpdate::Updated)
}

fn push_zero_run(seq: &mut [u8; 5], n: &mut usize, len: usize) {
    if len > ZERO_MAX_LEN {
        let bytes = xzero_bytes(len);
        seq[*n] = bytes[0];
        seq[*n + 1] = bytes[1];
        *n += 2;
    } else {
        seq[*n] = zero_byte(len);
        *n += 1;
    }
}

/// Fuse consecutive equal-value VAL opcodes whose combined run still fits.
///
/// Scans at most five opcodes starting at `start`; after a fuse the scan
/// stays on the same position so chains collapse in one pass.
fn merge_adjacent(buf: &mut Vec<u8>, start: usize) {
    let mut p = start;
    let mut scanlen = 5;
    while p < buf.len() && scanlen > 0 {
        scanlen -= 1;
        let b = buf[p];
        if is_xzero(b) {
            p += 2;
            continue;
        }
        if is_zero(b) {
            p += 1;
            continue;
        }
        if p + 1 < buf.len() && is_val(buf[p + 1]) {
            let v1 = val_value(b);
            let v2 = val_value(buf[p + 1]);
            if v1 == v2 {
                let len = val_len(b) + val_len(buf[p + 1]);
                if len <= VAL_MAX_LEN {
                    buf[p + 1] = val_byte(v1, len);
                    buf.remove(p);
                    continue;
                }
            }
        }
        p += 1;
    }
}
