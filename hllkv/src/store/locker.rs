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

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::Mutex;
use parking_lot::RawMutex;

/// Per-key mutual exclusion.
///
/// Each key gets its own mutex, handed out as an RAII [`KeyGuard`] so the
/// lock is released on every exit path. Locks for distinct keys are
/// independent; re-locking a key held by the same thread deadlocks, so a
/// caller must take all the locks an operation needs up front through
/// [`lock_many`](KeyLocker::lock_many).
#[derive(Debug, Default)]
pub struct KeyLocker {
    locks: Mutex<HashMap<Vec<u8>, Arc<Mutex<()>>>>,
}

/// Holds one key's lock until dropped.
pub struct KeyGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl KeyLocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a single key, blocking until it is free.
    pub fn lock(&self, key: &[u8]) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(key.to_vec()).or_default().clone()
        };
        KeyGuard {
            _guard: lock.lock_arc(),
        }
    }

    /// Acquire the locks for several keys at once.
    ///
    /// Keys are deduplicated and locked in lexicographic order, so any two
    /// callers acquire overlapping key sets in the same order.
    pub fn lock_many(&self, keys: &[&[u8]]) -> Vec<KeyGuard> {
        let mut unique: Vec<&[u8]> = keys.to_vec();
        unique.sort_unstable();
        unique.dedup();
        unique.into_iter().map(|key| self.lock(key)).collect()
    }
}
