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

//! The command layer: sketches keyed in a backing store
//!
//! [`HllStore`] implements the three HyperLogLog commands on top of any
//! [`Backend`] holding one sketch per key. Access is serialized per key by a
//! [`KeyLocker`]; multi-key commands take all their locks in lexicographic
//! key order so concurrent callers cannot deadlock against each other.

mod backend;
mod hll_store;
mod locker;

pub use self::backend::Backend;
pub use self::backend::MemoryBackend;
pub use self::hll_store::HllStore;
pub use self::locker::KeyGuard;
pub use self::locker::KeyLocker;
