//! Text control surface.
//!
//! One command per line:
//!
//! | Command            | Effect                              |
//! |--------------------|-------------------------------------|
//! | `start`            | start the session                   |
//! | `stop`             | stop the session                    |
//! | `gain <0-150>`     | output gain in percent              |
//! | `delay <secs>`     | echo delay, 0.0-1.0 s               |
//! | `feedback <x>`     | feedback gain, 0.0-0.95             |
//! | `status`           | print status and readouts           |
//! | `help`             | list commands                       |
//! | `quit`             | stop and exit                       |
//!
//! Out-of-range numbers are accepted and clamped.

use std::str::FromStr;

use thiserror::Error;

use crate::error::SessionError;
use crate::session::SessionController;
use crate::visual::VisualizationSink;

/// Help text listing every command.
pub const HELP: &str = "commands: start | stop | gain <0-150> | delay <secs> | feedback <0-0.95> | status | help | quit";

/// A parsed control command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start the session.
    Start,
    /// Stop the session.
    Stop,
    /// Output gain in percent.
    Gain(f32),
    /// Delay time in seconds.
    Delay(f32),
    /// Feedback gain.
    Feedback(f32),
    /// Show status and readouts.
    Status,
    /// Show help.
    Help,
    /// Stop and exit.
    Quit,
}

/// Errors from parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Blank line.
    #[error("empty command")]
    Empty,
    /// First word is not a command.
    #[error("unknown command '{0}'")]
    Unknown(String),
    /// A value command without its value.
    #[error("'{0}' needs a value")]
    MissingValue(&'static str),
    /// The value is not a number.
    #[error("'{value}' is not a number for '{command}'")]
    InvalidNumber {
        /// Command name.
        command: &'static str,
        /// Offending text.
        value: String,
    },
    /// Extra words after a complete command.
    #[error("unexpected '{0}'")]
    Trailing(String),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(ParseError::Empty)?.to_lowercase();

        let command = match head.as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "status" => Command::Status,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            "gain" => Command::Gain(number("gain", words.next())?),
            "delay" => Command::Delay(number("delay", words.next())?),
            "feedback" => Command::Feedback(number("feedback", words.next())?),
            _ => return Err(ParseError::Unknown(head)),
        };

        match words.next() {
            Some(extra) => Err(ParseError::Trailing(extra.to_string())),
            None => Ok(command),
        }
    }
}

fn number(command: &'static str, word: Option<&str>) -> Result<f32, ParseError> {
    let word = word.ok_or(ParseError::MissingValue(command))?;
    word.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            command,
            value: word.to_string(),
        })
}

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Line to show the user.
    pub message: String,
    /// The caller should exit.
    pub quit: bool,
}

impl Reply {
    fn say(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            quit: false,
        }
    }
}

/// Runs `command` against `controller`.
pub fn execute<S: VisualizationSink + 'static>(
    controller: &mut SessionController<S>,
    command: Command,
) -> Reply {
    match command {
        Command::Start => match controller.start() {
            Ok(()) => Reply::say(controller.status()),
            Err(SessionError::AlreadyActive) => Reply::say("already live"),
            Err(_) => Reply::say(controller.status()),
        },
        Command::Stop => match controller.stop() {
            Ok(()) => Reply::say(controller.status()),
            Err(SessionError::AlreadyIdle) => Reply::say("not running"),
            Err(err) => Reply::say(err.status_message()),
        },
        Command::Gain(percent) => {
            controller.set_gain_percent(percent);
            Reply::say(format!("gain {}%", controller.readouts().gain))
        }
        Command::Delay(secs) => {
            controller.set_delay_time(secs);
            Reply::say(format!("delay {} s", controller.readouts().delay))
        }
        Command::Feedback(feedback) => {
            controller.set_feedback_gain(feedback);
            Reply::say(format!("feedback {}", controller.readouts().feedback))
        }
        Command::Status => Reply::say(format!(
            "{} | {}",
            controller.status(),
            controller.readouts()
        )),
        Command::Help => Reply::say(HELP),
        Command::Quit => {
            let _ = controller.stop();
            Reply {
                message: "bye".to_string(),
                quit: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::visual::RecordingSink;
    use echoloop_io::MockBackend;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn parses_every_command() {
        assert_eq!("start".parse(), Ok(Command::Start));
        assert_eq!("  STOP ".parse(), Ok(Command::Stop));
        assert_eq!("gain 120".parse(), Ok(Command::Gain(120.0)));
        assert_eq!("delay 0.45".parse(), Ok(Command::Delay(0.45)));
        assert_eq!("feedback 0.6".parse(), Ok(Command::Feedback(0.6)));
        assert_eq!("status".parse(), Ok(Command::Status));
        assert_eq!("?".parse(), Ok(Command::Help));
        assert_eq!("q".parse(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "louder".parse::<Command>(),
            Err(ParseError::Unknown("louder".into()))
        );
        assert_eq!(
            "gain".parse::<Command>(),
            Err(ParseError::MissingValue("gain"))
        );
        assert!(matches!(
            "delay soon".parse::<Command>(),
            Err(ParseError::InvalidNumber { command: "delay", .. })
        ));
        assert!(matches!(
            "feedback NaN".parse::<Command>(),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert_eq!(
            "start now".parse::<Command>(),
            Err(ParseError::Trailing("now".into()))
        );
    }

    #[test]
    fn execute_drives_the_controller() {
        let backend = MockBackend::new();
        let mut ctl = SessionController::new(
            Box::new(backend.clone()),
            &AppConfig::default(),
            Arc::new(Mutex::new(RecordingSink::new())),
        );

        assert_eq!(execute(&mut ctl, Command::Stop).message, "not running");
        assert_eq!(execute(&mut ctl, Command::Start).message, "Live - sing along!");
        assert_eq!(execute(&mut ctl, Command::Start).message, "already live");
        assert_eq!(execute(&mut ctl, Command::Gain(500.0)).message, "gain 150%");
        assert_eq!(
            execute(&mut ctl, Command::Feedback(2.0)).message,
            "feedback 0.95"
        );

        let reply = execute(&mut ctl, Command::Quit);
        assert!(reply.quit);
        assert_eq!(backend.open_streams(), 0);
    }

    #[test]
    fn failed_start_reports_status() {
        let backend = MockBackend::new().deny_input();
        let mut ctl = SessionController::new(
            Box::new(backend),
            &AppConfig::default(),
            Arc::new(Mutex::new(RecordingSink::new())),
        );
        assert_eq!(
            execute(&mut ctl, Command::Start).message,
            "Error: microphone access denied"
        );
    }
}
