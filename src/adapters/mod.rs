//! Concrete implementations of the port traits.
//!
//! | Adapter    | Implements          | Connects to              |
//! |------------|---------------------|--------------------------|
//! | `ble`      | AttributeRegistrar  | Bluedroid GATT server    |
//! |            | IndicationSender    |                          |
//! | `hardware` | ValueSource         | Mock sensors, LED GPIO   |
//! | `log_sink` | EventSink           | Serial log output        |
//! | `nvs`      | ConfigPort          | NVS / in-memory store    |

pub mod ble;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
