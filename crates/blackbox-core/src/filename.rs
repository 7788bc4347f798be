//! Incrementing log file names
//!
//! Log files follow a fixed pattern with a decimal counter, `log000.txt`,
//! `log001.txt` and so on. The counter is the last run of digits in the
//! name; its width never changes, so running out of digits is final.

use core::fmt;

/// Longest supported log file name
pub const MAX_NAME_LEN: usize = 32;

/// A log file name
pub type LogName = heapless::String<MAX_NAME_LEN>;

/// Why no further log file name could be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameError {
    /// Name is longer than [`MAX_NAME_LEN`]
    TooLong,
    /// Name has no digits to count with
    NoCounter,
    /// Counter already at its highest value
    Exhausted,
}

impl fmt::Display for FilenameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong => write!(f, "log file name too long"),
            Self::NoCounter => write!(f, "log file name has no counter"),
            Self::Exhausted => write!(f, "log file counter exhausted"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FilenameError {}

fn to_log_name(name: &str) -> Result<LogName, FilenameError> {
    let mut out = LogName::new();
    out.push_str(name).map_err(|_| FilenameError::TooLong)?;
    Ok(out)
}

/// Increment the counter in `name` by one, carrying into higher digits
///
/// `log009.txt` becomes `log010.txt`; `log999.txt` has nowhere to carry to
/// and fails with [`FilenameError::Exhausted`].
pub fn advance_filename(name: &str) -> Result<LogName, FilenameError> {
    let mut bytes: heapless::Vec<u8, MAX_NAME_LEN> =
        heapless::Vec::from_slice(name.as_bytes()).map_err(|_| FilenameError::TooLong)?;

    let last_digit = bytes
        .iter()
        .rposition(u8::is_ascii_digit)
        .ok_or(FilenameError::NoCounter)?;

    let mut i = last_digit;
    loop {
        if bytes[i] == b'9' {
            bytes[i] = b'0';
        } else {
            bytes[i] += 1;
            break;
        }

        if i == 0 || !bytes[i - 1].is_ascii_digit() {
            return Err(FilenameError::Exhausted);
        }
        i -= 1;
    }

    // Only ASCII digits were replaced, so the bytes are still valid UTF-8
    let name = core::str::from_utf8(&bytes).map_err(|_| FilenameError::NoCounter)?;
    to_log_name(name)
}

/// First name starting at `pattern` for which `exists` is false
pub fn next_free_name(
    pattern: &str,
    mut exists: impl FnMut(&str) -> bool,
) -> Result<LogName, FilenameError> {
    let mut name = to_log_name(pattern)?;
    while exists(&name) {
        name = advance_filename(&name)?;
    }
    Ok(name)
}
