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

//! Store configuration

/// Default upper bound on a sparse sketch's total length in bytes.
///
/// The sparse encoding wins over the dense one up to roughly this size;
/// past it the constant cost of in-place opcode updates stops paying for
/// the memory saved.
pub const DEFAULT_SPARSE_MAX_BYTES: usize = 3000;

/// Tunables for [`HllStore`](crate::HllStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HllConfig {
    /// Maximum length in bytes (header included) a sparse sketch may reach
    /// before an update forces promotion to the dense encoding.
    pub sparse_max_bytes: usize,
}

impl Default for HllConfig {
    fn default() -> Self {
        Self {
            sparse_max_bytes: DEFAULT_SPARSE_MAX_BYTES,
        }
    }
}
