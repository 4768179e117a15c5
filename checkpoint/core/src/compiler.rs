//! Action specifier compiler
//!
//! Turns one textual specifier (as given to `--checkpoint-action`) into an
//! [`Action`]. Matching is exact and case-sensitive:
//!
//! | Specifier | Action |
//! |-----------|--------|
//! | `.` or `dot` | [`Action::Dot`] |
//! | `bell` | [`Action::Bell`] |
//! | `echo` | [`Action::Echo`] with the default template |
//! | `echo=TEXT` | [`Action::Echo`] |
//! | `ttyout=TEXT` | [`Action::Ttyout`] |
//! | `exec=CMD` | [`Action::Exec`] |
//! | `sleep=N` | [`Action::Sleep`], N whole seconds |
//! | `totals` | [`Action::Totals`] |
//! | `wait=SIG` | [`Action::Wait`] |
//!
//! `TEXT` and `CMD` lose one pair of matching outer quotes and have their
//! backslash escapes resolved.

use std::time::Duration;

use crate::action::Action;
use crate::error::CheckpointError;
use crate::signals::decode_signal;
use crate::text::unquote_payload;

/// Largest accepted `sleep=` value, the range of a signed 64-bit time value
pub const MAX_SLEEP_SECS: u64 = i64::MAX as u64;

/// Compile one specifier
///
/// # Errors
///
/// [`CheckpointError::UnknownAction`], [`CheckpointError::InvalidTimeout`] or
/// [`CheckpointError::UnknownSignal`].
pub fn parse_action(spec: &str) -> Result<Action, CheckpointError> {
    let action = match spec {
        "." | "dot" => Action::Dot,
        "bell" => Action::Bell,
        "echo" => Action::Echo(None),
        "totals" => Action::Totals,
        _ => {
            if let Some(text) = spec.strip_prefix("echo=") {
                Action::Echo(Some(unquote_payload(text)))
            } else if let Some(cmd) = spec.strip_prefix("exec=") {
                Action::Exec(unquote_payload(cmd))
            } else if let Some(text) = spec.strip_prefix("ttyout=") {
                Action::Ttyout(unquote_payload(text))
            } else if let Some(arg) = spec.strip_prefix("sleep=") {
                let secs = parse_timeout(arg)
                    .ok_or_else(|| CheckpointError::InvalidTimeout(spec.to_string()))?;
                Action::Sleep(Duration::from_secs(secs))
            } else if let Some(name) = spec.strip_prefix("wait=") {
                Action::Wait(decode_signal(name)?)
            } else {
                return Err(CheckpointError::UnknownAction(spec.to_string()));
            }
        }
    };
    Ok(action)
}

/// Parse a full, non-negative decimal second count within range
fn parse_timeout(arg: &str) -> Option<u64> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    arg.parse::<u64>().ok().filter(|&secs| secs <= MAX_SLEEP_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dot_aliases_are_identical() {
        assert_eq!(parse_action(".").unwrap(), Action::Dot);
        assert_eq!(parse_action(".").unwrap(), parse_action("dot").unwrap());
    }

    #[test]
    fn test_simple_keywords() {
        assert_eq!(parse_action("bell").unwrap(), Action::Bell);
        assert_eq!(parse_action("echo").unwrap(), Action::Echo(None));
        assert_eq!(parse_action("totals").unwrap(), Action::Totals);
    }

    #[test]
    fn test_payload_actions_unquote() {
        assert_eq!(
            parse_action("echo=\"hello\"").unwrap(),
            Action::Echo(Some("hello".to_string()))
        );
        assert_eq!(
            parse_action("ttyout='%u%*\\r'").unwrap(),
            Action::Ttyout("%u%*\r".to_string())
        );
        assert_eq!(
            parse_action("exec=/usr/bin/true").unwrap(),
            Action::Exec("/usr/bin/true".to_string())
        );
        assert_eq!(parse_action("echo=").unwrap(), Action::Echo(Some(String::new())));
    }

    #[test]
    fn test_sleep() {
        assert_eq!(
            parse_action("sleep=5").unwrap(),
            Action::Sleep(Duration::from_secs(5))
        );
        assert_eq!(parse_action("sleep=0").unwrap(), Action::Sleep(Duration::ZERO));
    }

    #[test]
    fn test_sleep_rejects_invalid() {
        for spec in ["sleep=-1", "sleep=abc", "sleep=", "sleep=5s", "sleep= 5", "sleep=+5"] {
            assert!(
                matches!(parse_action(spec), Err(CheckpointError::InvalidTimeout(ref s)) if s == spec),
                "{spec} should be rejected"
            );
        }
    }

    #[test]
    fn test_sleep_range() {
        let max = format!("sleep={MAX_SLEEP_SECS}");
        assert!(parse_action(&max).is_ok());
        let over = format!("sleep={}", MAX_SLEEP_SECS + 1);
        assert!(parse_action(&over).is_err());
        assert!(parse_action("sleep=99999999999999999999999").is_err());
    }

    #[test]
    fn test_wait() {
        assert_eq!(parse_action("wait=USR1").unwrap(), Action::Wait(Signal::SIGUSR1));
        assert_eq!(parse_action("wait=SIGHUP").unwrap(), Action::Wait(Signal::SIGHUP));
        assert!(matches!(
            parse_action("wait=KILL"),
            Err(CheckpointError::UnknownSignal(_))
        ));
    }

    #[test]
    fn test_unknown_actions() {
        for spec in ["", "DOT", "beep", "echo ", "Echo=x", "sleep", "wait"] {
            assert!(
                matches!(parse_action(spec), Err(CheckpointError::UnknownAction(_))),
                "{spec:?} should be unknown"
            );
        }
    }
}
