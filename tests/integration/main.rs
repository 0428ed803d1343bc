//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock ports.  All tests run on the host (x86_64) with no
//! real hardware required.

mod gatt_server_tests;
mod mock_ports;
mod registration_tests;
