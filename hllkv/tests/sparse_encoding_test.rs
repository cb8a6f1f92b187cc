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

//! Byte-exact checks of the sparse opcode stream through the public API.
//!
//! The expected buffers were produced with a reference implementation of
//! the format; every member below is chosen for the register and run length
//! its hash yields.

use hllkv::config::DEFAULT_SPARSE_MAX_BYTES;
use hllkv::hash::register_and_runlen;
use hllkv::Encoding;
use hllkv::Sketch;

const HDR: usize = 16;

fn sketch_with(members: &[&[u8]]) -> Sketch {
    let mut sketch = Sketch::new();
    for member in members {
        sketch.add(member, DEFAULT_SPARSE_MAX_BYTES).unwrap();
    }
    sketch
}

#[test]
fn test_empty_sketch_bytes() {
    let bytes = Sketch::new().into_bytes();
    let mut expected = b"HYLL\x01\x00\x00\x00".to_vec();
    expected.extend_from_slice(&[0u8; 8]);
    expected.extend_from_slice(&[0x7f, 0xff]);
    assert_eq!(bytes, expected);
    assert_eq!(bytes.len(), 18);
}

#[test]
fn test_single_add_splits_the_initial_xzero() {
    // "hello" hashes to register 9216 with run length 1. The initial
    // XZERO:16384 splits into XZERO:9216, VAL(1,1), XZERO:7167, and the
    // update flips the cache-stale bit.
    assert_eq!(register_and_runlen(b"hello"), (9216, 1));

    let bytes = sketch_with(&[b"hello"]).into_bytes();
    let mut expected = b"HYLL\x01\x00\x00\x00".to_vec();
    expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0x80]);
    expected.extend_from_slice(&[0x63, 0xff, 0x80, 0x5b, 0xfe]);
    assert_eq!(bytes, expected);
}

#[test]
fn test_zero_run_split_and_val_chain_merge() {
    // w33203 lands on register 9218 (run length 1): the right XZERO splits
    // again, leaving a one-register ZERO gap at 9217.
    assert_eq!(register_and_runlen(b"w33203"), (9218, 1));
    let bytes = sketch_with(&[b"hello", b"w33203"]).into_bytes();
    assert_eq!(
        &bytes[HDR..],
        &[0x63, 0xff, 0x80, 0x00, 0x80, 0x5b, 0xfc],
        "expected XZERO, VAL, ZERO:1, VAL, XZERO"
    );

    // w4798 fills the gap at 9217 with the same value; the three adjacent
    // VAL(1,1) runs collapse into a single VAL(1,3).
    assert_eq!(register_and_runlen(b"w4798"), (9217, 1));
    let bytes = sketch_with(&[b"hello", b"w33203", b"w4798"]).into_bytes();
    assert_eq!(&bytes[HDR..], &[0x63, 0xff, 0x82, 0x5b, 0xfc]);
}

#[test]
fn test_val_run_split_in_the_middle() {
    // Three members covering consecutive registers 10963..=10965, all with
    // run length 1, merge into VAL(1,3).
    let trio: &[&[u8]] = &[b"probe-2073", b"probe-449", b"probe-1651"];
    let bytes = sketch_with(trio).into_bytes();
    assert_eq!(&bytes[HDR..], &[0x6a, 0xd2, 0x82, 0x55, 0x29]);

    // w15476 raises the middle register to 2, splitting the VAL run.
    assert_eq!(register_and_runlen(b"w15476"), (10964, 2));
    let mut members = trio.to_vec();
    members.push(b"w15476");
    let sketch = sketch_with(&members);
    let registers = sketch.registers().unwrap();
    assert_eq!(&registers[10963..=10965], &[1, 2, 1]);
    assert_eq!(
        &sketch.into_bytes()[HDR..],
        &[0x6a, 0xd2, 0x80, 0x84, 0x80, 0x55, 0x29]
    );
}

#[test]
fn test_opcodes_always_cover_the_register_array() {
    let mut sketch = Sketch::new();
    for i in 0..400u32 {
        sketch
            .add(format!("t{i:05}").as_bytes(), DEFAULT_SPARSE_MAX_BYTES)
            .unwrap();
        // registers() rescans the opcode stream and fails unless the runs
        // cover exactly the register array.
        assert_eq!(sketch.registers().unwrap().len(), 16384);
    }
    assert_eq!(sketch.encoding(), Encoding::Sparse);
}

#[test]
fn test_promotion_by_unrepresentable_run_length() {
    // This member's hash was constructed to yield register 7 with a zero
    // run of length 33, one past what a VAL opcode can carry.
    let member: &[u8] = &[0x90, 0x54, 0x6a, 0xf2, 0x2e, 0x7f, 0x67, 0x67];
    assert_eq!(register_and_runlen(member), (7, 33));

    let mut sketch = Sketch::new();
    assert!(sketch.add(member, DEFAULT_SPARSE_MAX_BYTES).unwrap());
    assert_eq!(sketch.encoding(), Encoding::Dense);
    assert_eq!(sketch.registers().unwrap()[7], 33);

    let bytes = sketch.into_bytes();
    assert_eq!(bytes.len(), 16 + 12288);
    assert_eq!(bytes[4], 0);
}

#[test]
fn test_promotion_by_sparse_size_bound() {
    let mut sketch = Sketch::new();
    let mut promoted_at = None;
    for i in 0..200u32 {
        sketch.add(format!("q{i:05}").as_bytes(), 64).unwrap();
        if sketch.encoding() == Encoding::Dense {
            promoted_at = Some(i);
            break;
        }
    }
    let promoted_at = promoted_at.expect("a 64-byte bound must force promotion");

    // The promoting add and everything before it must be visible.
    let registers = sketch.registers().unwrap();
    for i in 0..=promoted_at {
        let (index, count) = register_and_runlen(format!("q{i:05}").as_bytes());
        assert!(
            registers[index] >= count,
            "register {index} lost its value across promotion"
        );
    }
}

#[test]
fn test_idempotent_add_leaves_bytes_untouched() {
    let mut sketch = sketch_with(&[b"hello", b"w33203"]);
    let before = sketch.clone();
    assert!(!sketch.add(b"hello", DEFAULT_SPARSE_MAX_BYTES).unwrap());
    assert!(!sketch.add(b"w33203", DEFAULT_SPARSE_MAX_BYTES).unwrap());
    assert_eq!(sketch, before);
}
