//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the controller against
//! mock adapters. All tests run on the host with no real rig attached.

mod abort_tests;
mod mock_rig;
