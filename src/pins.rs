//! GPIO assignments for the sensor-node board.
//!
//! Drivers take pin numbers from here instead of hard-coding them, so a
//! board respin is a one-file change.

// ---------------------------------------------------------------------------
// Status / peer-controlled LED
// ---------------------------------------------------------------------------

/// Digital output driving the onboard LED (active HIGH).
/// GPIO 8 is the onboard LED on the ESP32-C3 devkit.
pub const LED_GPIO: i32 = 8;
