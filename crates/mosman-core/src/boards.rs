//! Board table mapping human-readable board names to build flags
//!
//! The flags are appended to `build` invocations only. The table is fixed;
//! new boards require a new release.

/// Board name → build-flag string (platform plus optional board variant)
pub const BOARDS: &[(&str, &str)] = &[
    (
        "STM32 B-L475E-IOT01A",
        "--platform stm32 --build-var BOARD=B-L475E-IOT01A",
    ),
    (
        "STM32 DISCO-F746NG",
        "--platform stm32 --build-var BOARD=DISCO-F746NG",
    ),
    (
        "STM32 NUCLEO-F746ZG",
        "--platform stm32 --build-var BOARD=NUCLEO-F746ZG",
    ),
    ("TI CC3220", "--platform cc3220"),
    ("TI CC3200", "--platform cc3200"),
    ("ESP32", "--platform esp32"),
    (
        "ESP32 Olimex EVB",
        "--platform esp32 --build-var BOARD=ESP32-EVB",
    ),
    ("ESP8266", "--platform esp8266"),
    (
        "ESP8266, flash 1M",
        "--platform esp8266 --build-var BOARD=esp8266-1M",
    ),
    (
        "ESP8266, flash 2M",
        "--platform esp8266 --build-var BOARD=esp8266-2M",
    ),
];

/// Look up the build flags for a board name
pub fn board_flags(name: &str) -> Option<&'static str> {
    BOARDS
        .iter()
        .find(|(board, _)| *board == name)
        .map(|(_, flags)| *flags)
}

/// All known board names, in table order
pub fn board_names() -> impl Iterator<Item = &'static str> {
    BOARDS.iter().map(|(board, _)| *board)
}
