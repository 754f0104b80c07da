use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io;

/// Reads a line from the terminal without echoing it.
/// Esc or Ctrl-C abandon the entry and yield an empty string.
pub fn read_masked() -> io::Result<String> {
    enable_raw_mode()?;
    let result = read_keys();
    disable_raw_mode()?;
    result
}

fn read_keys() -> io::Result<String> {
    let mut secret = String::new();

    loop {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            match code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Esc => return Ok(String::new()),
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(String::new())
                }
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
}
