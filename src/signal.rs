//! Activity indicator and fatal signal for the host build
//!
//! On the board these drive the status LED; here the indicator becomes a
//! trace line, and Morse messages (the startup announcement and the
//! repeating fatal code) go to the log.

use blackbox_core::pipeline::{FatalError, FatalSignal, Indicator};
use std::time::Duration;

/// Pause between repetitions of the fatal code
const HALT_REPEAT: Duration = Duration::from_secs(3);

/// Indicator that logs every toggle at trace level
#[derive(Debug, Default)]
pub struct TraceIndicator {
    lit: bool,
    toggles: u64,
}

impl Indicator for TraceIndicator {
    fn toggle(&mut self) {
        self.lit = !self.lit;
        self.toggles += 1;
        log::trace!(
            "indicator {} (toggle {})",
            if self.lit { "on" } else { "off" },
            self.toggles
        );
    }
}

/// Morse for one letter or digit
fn morse_symbol(c: char) -> Option<&'static str> {
    const LETTERS: [&str; 26] = [
        ".-", "-...", "-.-.", "-..", ".", "..-.", "--.", "....", "..", ".---", "-.-", ".-..",
        "--", "-.", "---", ".--.", "--.-", ".-.", "...", "-", "..-", "...-", ".--", "-..-",
        "-.--", "--..",
    ];
    const DIGITS: [&str; 10] = [
        "-----", ".----", "..---", "...--", "....-", ".....", "-....", "--...", "---..", "----.",
    ];

    let c = c.to_ascii_uppercase();
    match c {
        'A'..='Z' => Some(LETTERS[(c as u8 - b'A') as usize]),
        '0'..='9' => Some(DIGITS[(c as u8 - b'0') as usize]),
        '?' => Some("..--.."),
        ' ' => Some("/"),
        _ => None,
    }
}

/// True if `c` can be sent in Morse
pub fn is_morse(c: char) -> bool {
    morse_symbol(c).is_some()
}

/// Render `code` in Morse, letters separated by spaces and words by `/`
pub fn morse(code: &str) -> String {
    code.chars()
        .filter_map(morse_symbol)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Send a one-off message, as the board does with its startup string
pub fn announce(message: &str) {
    log::info!("{}  [{}]", message, morse(message));
}

/// Fatal signal that repeats the error code on the log forever
#[derive(Debug, Default)]
pub struct HaltSignal;

impl FatalSignal for HaltSignal {
    fn halt(&mut self, error: FatalError) -> ! {
        let pattern = morse(error.code());
        loop {
            log::error!("FATAL {}: {}  [{}]", error.code().trim_end(), error, pattern);
            std::thread::sleep(HALT_REPEAT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_morse() {
        assert_eq!(morse("SOS"), "... --- ...");
        assert_eq!(morse("rx"), ".-. -..-");
        assert_eq!(morse("CFG"), "-.-. ..-. --.");
        assert_eq!(morse("DATA "), "-.. .- - .- /");
        assert_eq!(morse("?"), "..--..");
        assert_eq!(morse(""), "");
        assert!(!is_morse('!'));
    }

    #[test]
    fn test_every_fatal_code_renders() {
        let all = [
            FatalError::Mount,
            FatalError::ConfigWrite,
            FatalError::ConfigRead,
            FatalError::ConfigInvalid,
            FatalError::Receiver,
            FatalError::NameExhausted,
            FatalError::Open,
            FatalError::Write,
            FatalError::ShortWrite,
            FatalError::Flush,
        ];
        for error in all {
            assert_eq!(morse(error.code()).split(' ').count(), error.code().len());
        }
    }

    #[test]
    fn test_indicator_toggles() {
        let mut indicator = TraceIndicator::default();
        indicator.toggle();
        indicator.toggle();
        assert_eq!(indicator.toggles, 2);
        assert!(!indicator.lit);
    }
}
