/// Fixed quick-command phrases offered next to the free-form input.
pub const QUICK_COMMANDS: [&str; 6] = [
    "move forward",
    "move backward",
    "turn left",
    "turn right",
    "stop",
    "rotate around",
];

/// Upper bound of the speed parameter, in percent.
pub const MAX_SPEED: u8 = 100;

/// Append the optional speed parameter to a quick command, clamped to
/// 0..=100.
pub fn with_speed(command: &str, speed: u8) -> String {
    format!("{command} at {}", speed.min(MAX_SPEED))
}
