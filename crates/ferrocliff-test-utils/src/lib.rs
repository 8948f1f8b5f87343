//! ferrocliff-test-utils: stub chemistry engine and row fixtures shared by
//! the workspace's tests.

pub mod stub_engine;
pub mod fixtures;

pub use fixtures::{columns, drain, row, row_with_id, rows, synthetic_library};
pub use stub_engine::StubEngine;
