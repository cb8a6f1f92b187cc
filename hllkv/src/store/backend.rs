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

use parking_lot::RwLock;

use crate::error::Error;

/// The storage contract the store consumes.
///
/// A missing key is a normal condition and reported as `Ok(None)`; real
/// failures are wrapped with [`Error::backend`]. Implementations only need
/// whole-value reads and writes: the store rewrites a sketch atomically on
/// every mutation while holding that key's lock.
pub trait Backend {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &[u8], value: Vec<u8>) -> Result<(), Error>;
}

/// Process-local backend over a hash map.
///
/// Good enough for tests and for embedding the store without a durable
/// engine behind it.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl Backend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: Vec<u8>) -> Result<(), Error> {
        self.entries.write().insert(key.to_vec(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_round_trip() {
        let backend = MemoryBackend::default();
        assert!(backend.get(b"missing").unwrap().is_none());
        backend.set(b"k", vec![1, 2, 3]).unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(vec![1, 2, 3]));
        backend.set(b"k", vec![4]).unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(vec![4]));
    }
}
