use std::collections::VecDeque;
use std::io::{stdin, stdout, ErrorKind, IsTerminal, Read, Stdout, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};

/// Exit status used when the user interrupts the machine with `Ctrl+C`.
pub const INTERRUPT_EXIT: i32 = -2;

/// Input side of the console, as seen by the keyboard registers.
pub trait Keyboard {
    /// Whether a byte can be read without blocking. Must never block.
    fn key_available(&mut self) -> bool;
    /// Read the next input byte, blocking until one arrives.
    fn read_byte(&mut self) -> u8;
}

/// Full console device used by the trap routines.
pub trait Console: Keyboard {
    fn write_byte(&mut self, byte: u8);
    fn flush(&mut self);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }
}

/// Console backed by an in-memory input queue and output buffer.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: &[u8]) -> Self {
        let mut console = Self::new();
        console.push_input(input);
        console
    }

    pub fn push_input(&mut self, input: &[u8]) {
        self.input.extend(input);
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Keyboard for ScriptedConsole {
    fn key_available(&mut self) -> bool {
        !self.input.is_empty()
    }

    /// Panics when the script has run out, since a real read would block forever.
    fn read_byte(&mut self) -> u8 {
        self.input
            .pop_front()
            .expect("scripted console ran out of input")
    }
}

impl Console for ScriptedConsole {
    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }

    fn flush(&mut self) {}
}

/// Console attached to the process' standard streams.
///
/// If stdin is an interactive terminal, it is put into raw mode from [`TerminalConsole::attach`]
/// (or the first keyboard access) until this value is dropped, so keys are delivered one at a
/// time and without echo. Otherwise stdin is drained by a reader thread, so checking for input
/// never waits on the stream.
pub struct TerminalConsole {
    out: Stdout,
    /// Bytes received but not yet read by the machine.
    pending: VecDeque<u8>,
    /// Bytes from the reader thread, if stdin is not a terminal.
    stream: Option<Receiver<u8>>,
    raw: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        let stream = if stdin().is_terminal() {
            None
        } else {
            Some(spawn_reader(stdin()))
        };
        Self::with_stream(stream)
    }

    fn with_stream(stream: Option<Receiver<u8>>) -> Self {
        TerminalConsole {
            out: stdout(),
            pending: VecDeque::new(),
            stream,
            raw: false,
        }
    }

    /// Take over an interactive terminal. Does nothing for piped input.
    pub fn attach(&mut self) {
        if !self.raw && self.stream.is_none() {
            let _ = self.out.flush();
            enable_raw_mode();
            self.raw = true;
        }
    }

    /// Move every byte or key event already waiting into the input buffer.
    ///
    /// Never blocks. `Ctrl+C` restores the terminal and exits.
    pub fn pump(&mut self) {
        if let Some(stream) = &self.stream {
            self.pending.extend(stream.try_iter());
            return;
        }
        if !self.raw {
            return;
        }
        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(event) = event::read() else {
                break;
            };
            if let Event::Key(key) = event {
                push_key(&mut self.pending, key);
            }
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        let _ = self.out.flush();
        if self.raw {
            disable_raw_mode();
        }
    }
}

impl Keyboard for TerminalConsole {
    fn key_available(&mut self) -> bool {
        self.attach();
        self.pump();
        !self.pending.is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        self.attach();
        let _ = self.out.flush();
        loop {
            if let Some(byte) = self.pending.pop_front() {
                break byte;
            }
            match &self.stream {
                // Reader thread hangs up at end of input
                Some(stream) => break stream.recv().unwrap_or(EOF_BYTE),
                None => match event::read() {
                    Ok(Event::Key(key)) => push_key(&mut self.pending, key),
                    Ok(_) => continue,
                    Err(_) => break EOF_BYTE,
                },
            }
        }
    }
}

impl Console for TerminalConsole {
    fn write_byte(&mut self, byte: u8) {
        // Raw mode disables output post-processing
        let res = if byte == b'\n' && self.raw {
            self.out.write_all(b"\r\n")
        } else {
            self.out.write_all(&[byte])
        };
        res.expect("failed to write to stdout");
    }

    fn flush(&mut self) {
        self.out.flush().expect("failed to flush stdout");
    }
}

/// Byte produced by reading past the end of input.
const EOF_BYTE: u8 = 0xFF;

/// Forward every byte of `reader` over a channel until end of input.
fn spawn_reader(mut reader: impl Read + Send + 'static) -> Receiver<u8> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0; 256];
        loop {
            let len = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(len) => len,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            };
            if buf[..len].iter().any(|byte| tx.send(*byte).is_err()) {
                break;
            }
        }
    });
    rx
}

/// Must only be called if terminal is NOT in raw mode.
fn enable_raw_mode() {
    debug_assert!(
        !terminal::is_raw_mode_enabled().is_ok_and(|is| is),
        "terminal should not be in raw mode to enable raw mode",
    );
    terminal::enable_raw_mode().expect("failed to enable raw terminal");
}

/// Must only be called if terminal is in raw mode.
fn disable_raw_mode() {
    debug_assert!(
        terminal::is_raw_mode_enabled().is_ok_and(|is| is),
        "terminal should already be in raw mode to disable raw mode",
    );
    terminal::disable_raw_mode().expect("failed to disable raw terminal");
}

/// Buffer the bytes a key press would have produced on a cooked terminal.
///
/// `Ctrl+C` will always return the terminal to normal state and exit.
fn push_key(pending: &mut VecDeque<u8>, event: KeyEvent) {
    if matches!(event.kind, KeyEventKind::Release) {
        return;
    }
    match (event.modifiers, event.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            disable_raw_mode();
            println!();
            std::process::exit(INTERRUPT_EXIT);
        }
        (KeyModifiers::CONTROL, KeyCode::Char(ch)) if ch.is_ascii_alphabetic() => {
            pending.push_back(ch.to_ascii_lowercase() as u8 - b'a' + 1);
        }
        (_, KeyCode::Enter) => pending.push_back(b'\n'),
        (_, KeyCode::Tab) => pending.push_back(b'\t'),
        (_, KeyCode::Backspace) => pending.push_back(0x7f),
        (_, KeyCode::Esc) => pending.push_back(0x1b),
        (_, KeyCode::Char(ch)) => {
            let mut bytes = [0u8; 4];
            pending.extend(ch.encode_utf8(&mut bytes).as_bytes());
        }
        _ => (),
    }
}
