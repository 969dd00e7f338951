//! Operator console: key commands and the live display
//!
//! The terminal runs in raw mode so single key presses arrive without Enter.
//! Raw mode disables output post-processing, so everything printed while it
//! is active ends lines with `\r\n`.

use can_sniffer::{Direction, LiveRow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, queue, style, terminal};
use std::io::{self, Write};
use std::time::Duration;

/// Line terminator usable in raw mode
pub const EOL: &str = "\r\n";

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Copy the current window into the baseline
    Capture,
    /// Keep identifiers whose value went up or down
    Classify(Direction),
    /// End the session
    Quit,
}

impl Command {
    /// Map a key press to a command; unmapped keys are ignored
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Command::Quit)
            }
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                's' => Some(Command::Capture),
                'i' => Some(Command::Classify(Direction::Increase)),
                'k' => Some(Command::Classify(Direction::Decrease)),
                'q' => Some(Command::Quit),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Key help shown in the startup banner
pub const KEY_HELP: &str =
    "Press 's' to capture the baseline, 'i' to keep increased values, 'k' to keep decreased values, 'q' to quit.";

/// Wait up to `timeout` for a command key
pub fn poll_command(timeout: Duration) -> io::Result<Option<Command>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(Command::from_key(&key)),
        _ => Ok(None),
    }
}

/// Keeps the terminal in raw mode for its lifetime
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Print an operator message
pub fn status(message: &str) {
    let mut out = io::stdout().lock();
    // Nothing useful to do if stdout is gone
    let _ = write!(out, "{}{}", message, EOL).and_then(|_| out.flush());
}

/// Format the live display lines: target payloads, then parameter readings
pub fn format_rows(targets: &[LiveRow], parameters: &[LiveRow]) -> Vec<String> {
    let mut lines: Vec<String> = targets
        .iter()
        .map(|row| format!("{}: {}", row.label, row.value))
        .collect();
    if !parameters.is_empty() {
        lines.push("--".to_string());
        lines.extend(
            parameters
                .iter()
                .map(|row| format!("{}: {}", row.label, row.value)),
        );
    }
    lines
}

/// Draw the live display on the bottom rows of the terminal
pub fn render_live(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let (_, rows) = terminal::size()?;
    let top = rows.saturating_sub(u16::try_from(lines.len()).unwrap_or(u16::MAX));

    queue!(out, cursor::SavePosition)?;
    for (offset, line) in lines.iter().enumerate() {
        let row = top.saturating_add(u16::try_from(offset).unwrap_or(u16::MAX));
        queue!(
            out,
            cursor::MoveTo(0, row),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(line)
        )?;
    }
    queue!(out, cursor::RestorePosition)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_command_keys() {
        assert_eq!(Command::from_key(&press(KeyCode::Char('s'))), Some(Command::Capture));
        assert_eq!(
            Command::from_key(&press(KeyCode::Char('i'))),
            Some(Command::Classify(Direction::Increase))
        );
        assert_eq!(
            Command::from_key(&press(KeyCode::Char('K'))),
            Some(Command::Classify(Direction::Decrease))
        );
        assert_eq!(Command::from_key(&press(KeyCode::Char('q'))), Some(Command::Quit));
    }

    #[test]
    fn test_other_keys_ignored() {
        assert_eq!(Command::from_key(&press(KeyCode::Char('x'))), None);
        assert_eq!(Command::from_key(&press(KeyCode::Enter)), None);
        assert_eq!(Command::from_key(&press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Command::from_key(&key), Some(Command::Quit));
    }

    #[test]
    fn test_key_release_ignored() {
        let key = KeyEvent {
            code: KeyCode::Char('s'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(Command::from_key(&key), None);
    }

    #[test]
    fn test_format_rows() {
        let targets = vec![
            LiveRow {
                label: "136".to_string(),
                value: "1 2 3".to_string(),
            },
            LiveRow {
                label: "17C".to_string(),
                value: "no data".to_string(),
            },
        ];
        let params = vec![LiveRow {
            label: "Speed".to_string(),
            value: "12.500".to_string(),
        }];

        assert_eq!(
            format_rows(&targets, &params),
            vec!["136: 1 2 3", "17C: no data", "--", "Speed: 12.500"]
        );
        assert_eq!(format_rows(&targets, &[]).len(), 2);
        assert!(format_rows(&[], &[]).is_empty());
    }
}
