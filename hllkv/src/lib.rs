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

//! Redis-compatible HyperLogLog sketches over a pluggable key-value backend.
//!
//! This crate implements the probabilistic cardinality subsystem of a
//! Redis-compatible server: each sketch is an opaque byte string holding a
//! 16-byte header followed by 16384 six-bit registers, stored either in a
//! run-length *sparse* encoding or a bit-packed *dense* encoding. The byte
//! layout is bit-exact with the Redis `HYLL` string format, so sketches can
//! be exchanged with any other implementation of that format.
//!
//! # Overview
//!
//! A sketch starts out sparse (a couple of bytes for an empty set) and is
//! promoted to the dense encoding when an update would produce a register
//! value the sparse opcodes cannot represent, or when the sparse buffer
//! would outgrow the configured threshold. Promotion is one-way.
//!
//! Cardinality is estimated with the harmonic mean of the registers,
//! switching to linear counting for small sets and applying a polynomial
//! bias correction in the mid range. The last computed cardinality is cached
//! in the header and reused until the next mutation invalidates it.
//!
//! # Core types
//!
//! [`Sketch`] owns a single validated sketch buffer and provides the update,
//! estimation and merge primitives. [`HllStore`] layers the three commands
//! (`PFADD`, `PFCOUNT`, `PFMERGE`) on top of a [`Backend`] holding one
//! sketch per key, serializing access per key through a [`KeyLocker`].
//!
//! # Usage
//!
//! ```rust
//! use hllkv::HllStore;
//! use hllkv::MemoryBackend;
//!
//! let store = HllStore::new(MemoryBackend::default());
//! store.pfadd(b"visitors", &[b"alice", b"bob"]).unwrap();
//! assert_eq!(store.pfcount(&[b"visitors"]).unwrap(), 2);
//! ```
//!
//! Sketches can also be used standalone:
//!
//! ```rust
//! use hllkv::Sketch;
//! use hllkv::config::DEFAULT_SPARSE_MAX_BYTES;
//!
//! let mut sketch = Sketch::new();
//! sketch.add(b"apple", DEFAULT_SPARSE_MAX_BYTES).unwrap();
//! sketch.add(b"apple", DEFAULT_SPARSE_MAX_BYTES).unwrap();
//! assert_eq!(sketch.cardinality().unwrap(), 1);
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod hll;
pub mod store;

pub use self::config::HllConfig;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::hll::Encoding;
pub use self::hll::Sketch;
pub use self::store::Backend;
pub use self::store::HllStore;
pub use self::store::KeyLocker;
pub use self::store::MemoryBackend;
