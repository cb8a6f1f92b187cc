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

use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::near;

use hllkv::config::DEFAULT_SPARSE_MAX_BYTES;
use hllkv::Sketch;

/// Standard relative error with this register count (1.04 / sqrt(16384)).
const RELATIVE_ERROR: f64 = 0.0082;

fn estimate_for<F: Fn(u64) -> String>(n: u64, member: F) -> u64 {
    let mut sketch = Sketch::new();
    for i in 0..n {
        sketch
            .add(member(i).as_bytes(), DEFAULT_SPARSE_MAX_BYTES)
            .unwrap();
    }
    sketch.cardinality().unwrap()
}

#[test]
fn test_exact_for_tiny_sets() {
    let mut sketch = Sketch::new();
    assert_eq!(sketch.cardinality().unwrap(), 0);

    sketch.add(b"x", DEFAULT_SPARSE_MAX_BYTES).unwrap();
    assert_eq!(sketch.cardinality().unwrap(), 1);

    sketch.add(b"y", DEFAULT_SPARSE_MAX_BYTES).unwrap();
    assert_eq!(sketch.cardinality().unwrap(), 2);

    sketch.add(b"z", DEFAULT_SPARSE_MAX_BYTES).unwrap();
    assert_eq!(sketch.cardinality().unwrap(), 3);

    // Re-adding never moves the estimate.
    sketch.add(b"x", DEFAULT_SPARSE_MAX_BYTES).unwrap();
    assert_eq!(sketch.cardinality().unwrap(), 3);
}

#[test]
fn test_thousand_members() {
    let estimate = estimate_for(1000, |i| format!("item:{i}")) as f64;
    assert_that!(estimate, near(1000.0, RELATIVE_ERROR * 1000.0));
}

#[test]
fn test_ten_thousand_members() {
    let estimate = estimate_for(10_000, |i| format!("obj/{i}")) as f64;
    assert_that!(estimate, near(10_000.0, RELATIVE_ERROR * 10_000.0));
}

#[test]
fn test_hundred_thousand_members() {
    let estimate = estimate_for(100_000, |i| format!("key:{i}")) as f64;
    assert_that!(estimate, near(100_000.0, RELATIVE_ERROR * 100_000.0));
}

#[test]
fn test_million_members() {
    let estimate = estimate_for(1_000_000, |i| format!("user-{i}")) as f64;
    assert_that!(estimate, near(1_000_000.0, RELATIVE_ERROR * 1_000_000.0));
}

#[test]
fn test_estimate_is_monotone_in_set_size() {
    let mut sketch = Sketch::new();
    let mut previous = 0u64;
    for step in 1..=20u64 {
        for i in (step - 1) * 500..step * 500 {
            sketch
                .add(format!("mono:{i}").as_bytes(), DEFAULT_SPARSE_MAX_BYTES)
                .unwrap();
        }
        let estimate = sketch.cardinality().unwrap();
        assert_that!(estimate, ge(previous));
        assert_that!(
            estimate as f64,
            le((step * 500) as f64 * (1.0 + 4.0 * RELATIVE_ERROR))
        );
        previous = estimate;
    }
}
