//! CLI presenter for output formatting

use colored::*;

use crate::infrastructure::media::MicrophoneInfo;

/// Presenter for CLI output formatting
#[derive(Debug, Default)]
pub struct Presenter;

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print daemon status
    pub fn daemon_status(&self, state: &str) {
        eprintln!("{} Daemon: {}", "●".cyan(), state);
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Print one line per microphone, default first marker included
    pub fn microphones(&self, devices: &[MicrophoneInfo]) {
        if devices.is_empty() {
            self.warn("No input devices found");
            return;
        }
        for line in devices.iter().map(format_microphone) {
            println!("{}", line);
        }
    }

    /// Print a daemon reply, colouring failures
    pub fn reply(&self, line: &str) {
        let line = line.trim_end();
        if is_error_reply(line) {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

fn format_microphone(device: &MicrophoneInfo) -> String {
    let marker = if device.is_default { "*" } else { " " };
    match device.sample_rate {
        Some(rate) => format!("{} {} ({} Hz)", marker, device.name, rate),
        None => format!("{} {}", marker, device.name),
    }
}

fn is_error_reply(line: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(line)
        .is_ok_and(|value| value["status"] == "error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_microphone_is_marked() {
        let line = format_microphone(&MicrophoneInfo {
            name: "Built-in".to_string(),
            sample_rate: Some(44_100),
            is_default: true,
        });
        assert_eq!(line, "* Built-in (44100 Hz)");
    }

    #[test]
    fn microphone_without_rate() {
        let line = format_microphone(&MicrophoneInfo {
            name: "USB".to_string(),
            sample_rate: None,
            is_default: false,
        });
        assert_eq!(line, "  USB");
    }

    #[test]
    fn error_replies_are_detected() {
        assert!(is_error_reply(r#"{"status":"error","message":"boom"}"#));
        assert!(!is_error_reply(r#"{"status":"ok"}"#));
        assert!(!is_error_reply("not json"));
    }
}
