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

use tracing::debug;
use tracing::warn;

use crate::config::HllConfig;
use crate::error::Error;
use crate::hll::estimator;
use crate::hll::estimator::Registers;
use crate::hll::Sketch;
use crate::hll::REGISTERS;
use crate::store::Backend;
use crate::store::KeyLocker;

/// The HyperLogLog command surface over a keyed backend.
///
/// Each entry point takes the locks for every key it touches for the whole
/// operation, reads the affected sketches once, and writes any mutation
/// back atomically through [`Backend::set`].
#[derive(Debug)]
pub struct HllStore<B> {
    backend: B,
    locker: KeyLocker,
    config: HllConfig,
}

impl<B: Backend> HllStore<B> {
    /// Create a store with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, HllConfig::default())
    }

    /// Create a store with explicit tunables.
    pub fn with_config(backend: B, config: HllConfig) -> Self {
        Self {
            backend,
            locker: KeyLocker::new(),
            config,
        }
    }

    /// The backing store.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Observe members under `key`, creating the sketch if missing.
    ///
    /// Returns `true` when the stored value changed: any register was
    /// raised, or the sketch was created. Adding zero members to a missing
    /// key still creates (and stores) an empty sketch.
    pub fn pfadd(&self, key: &[u8], members: &[&[u8]]) -> Result<bool, Error> {
        let _guard = self.locker.lock(key);

        let mut updated = false;
        let mut sketch = match self.backend.get(key)? {
            Some(bytes) => Sketch::from_bytes(bytes)?,
            None => {
                debug!(key = %String::from_utf8_lossy(key), "creating empty sketch");
                updated = true;
                Sketch::new()
            }
        };

        for member in members {
            if sketch.add(member, self.config.sparse_max_bytes)? {
                updated = true;
            }
        }

        if updated {
            self.backend.set(key, sketch.into_bytes())?;
        }
        Ok(updated)
    }

    /// Approximate the cardinality of one key, or of the union of several.
    ///
    /// Missing keys count as empty. The single-key path reuses the cached
    /// cardinality from the sketch header when it is still valid, and
    /// refreshes it otherwise; the union path never persists anything.
    pub fn pfcount(&self, keys: &[&[u8]]) -> Result<u64, Error> {
        match keys {
            [] => Ok(0),
            [key] => self.count_key(key),
            keys => self.count_union(keys),
        }
    }

    fn count_key(&self, key: &[u8]) -> Result<u64, Error> {
        let _guard = self.locker.lock(key);

        let Some(bytes) = self.backend.get(key)? else {
            return Ok(0);
        };
        let mut sketch = Sketch::from_bytes(bytes)?;
        if sketch.cache_valid() {
            debug!(key = %String::from_utf8_lossy(key), "cardinality served from cache");
            return Ok(sketch.cached_cardinality());
        }

        let cardinality = sketch.cardinality()?;
        sketch.set_cached_cardinality(cardinality);
        if let Err(err) = self.backend.set(key, sketch.into_bytes()) {
            warn!(
                key = %String::from_utf8_lossy(key),
                error = %err,
                "cardinality cache write-back failed"
            );
        }
        Ok(cardinality)
    }

    fn count_union(&self, keys: &[&[u8]]) -> Result<u64, Error> {
        let mut unique: Vec<&[u8]> = keys.to_vec();
        unique.sort_unstable();
        unique.dedup();
        let _guards = self.locker.lock_many(&unique);

        let mut max = vec![0u8; REGISTERS];
        for key in unique {
            if let Some(bytes) = self.backend.get(key)? {
                Sketch::from_bytes(bytes)?.merge_max_into(&mut max)?;
            }
        }
        estimator::cardinality(Registers::Raw(&max))
    }

    /// Merge the union of `sources` into `dest`.
    ///
    /// Every source key is folded register-wise into a maximum array, which
    /// then overwrites the destination's registers; the destination is
    /// created if missing and always stored dense. A destination that
    /// should contribute its own registers must be listed as a source.
    pub fn pfmerge(&self, dest: &[u8], sources: &[&[u8]]) -> Result<(), Error> {
        let mut involved: Vec<&[u8]> = sources.to_vec();
        involved.push(dest);
        let _guards = self.locker.lock_many(&involved);

        let mut max = vec![0u8; REGISTERS];
        let mut unique: Vec<&[u8]> = sources.to_vec();
        unique.sort_unstable();
        unique.dedup();
        for source in unique {
            if let Some(bytes) = self.backend.get(source)? {
                Sketch::from_bytes(bytes)?.merge_max_into(&mut max)?;
            }
        }

        let mut sketch = match self.backend.get(dest)? {
            Some(bytes) => Sketch::from_bytes(bytes)?,
            None => Sketch::new(),
        };
        sketch.set_registers(&max)?;
        debug!(
            dest = %String::from_utf8_lossy(dest),
            sources = sources.len(),
            "merged sketches into dense destination"
        );
        self.backend.set(dest, sketch.into_bytes())
    }
}
