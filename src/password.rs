//! Password-strength scoring for the registration and reset forms.

const SYMBOLS: &[char] = &['$', '@', '#', '&', '!'];
const WEIGHT: u8 = 20;
const MIN_LONG_LENGTH: usize = 8;

/// Scores a password in steps of 20, from 0 to 100.
///
/// One step each for: a lowercase ASCII letter, an uppercase ASCII letter,
/// an ASCII digit, one of `$@#&!`, and more than 8 UTF-16 code units
/// (the length a browser form reports).
#[must_use]
pub fn password_strength(password: &str) -> u8 {
    let checks = [
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| SYMBOLS.contains(&c)),
        password.encode_utf16().count() > MIN_LONG_LENGTH,
    ];

    checks.iter().filter(|&&passed| passed).count() as u8 * WEIGHT
}

/// Progress-bar color for a strength score.
#[must_use]
pub fn progress_bar_color(strength: u8) -> &'static str {
    match strength {
        // Unreachable from `password_strength`, which caps at 100.
        101.. => "#f00",
        81..=100 => "#f80",
        61..=80 => "#ff0",
        41..=60 => "#0f0",
        21..=40 => "#0ff",
        _ => "#00f",
    }
}
