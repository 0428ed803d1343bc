//! Peer-controlled LED driver.
//!
//! One push-pull GPIO, active HIGH. Written from the LED characteristic's
//! write path and read back for the characteristic's read path.
//!
//! On ESP-IDF the driver hits the GPIO through raw esp-idf-sys calls;
//! everywhere else it just remembers the level so host tests can read
//! it back.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub struct Led {
    gpio: i32,
    is_on: bool,
}

impl Led {
    /// Configure the pin as an output and drive it low.
    pub fn new(gpio: i32) -> Self {
        #[cfg(target_os = "espidf")]
        // SAFETY: plain GPIO configuration calls on a pin this driver owns.
        unsafe {
            gpio_reset_pin(gpio);
            let ret = gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT);
            if ret != ESP_OK {
                log::error!("led: gpio{gpio} direction set failed (rc={ret})");
            }
            gpio_set_level(gpio, 0);
        }
        Self { gpio, is_on: false }
    }

    pub fn set(&mut self, on: bool) {
        #[cfg(target_os = "espidf")]
        // SAFETY: level write on the pin configured in `new`.
        unsafe {
            gpio_set_level(self.gpio, u32::from(on));
        }
        self.is_on = on;
        log::debug!("led: gpio{} -> {}", self.gpio, if on { "on" } else { "off" });
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }
}
