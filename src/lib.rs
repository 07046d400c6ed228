// Machine state
mod registers;
pub use registers::{Flag, RegisterFile, PC_START};
mod memory;
pub use memory::{Memory, KBDR, KBSR, MEMORY_MAX};

// Devices
pub mod console;
pub use console::{Console, Keyboard, ScriptedConsole, TerminalConsole};

// Loading
mod image;
pub use image::{load_file, load_image};

// Running
mod runtime;
pub use runtime::{sign_extend, Opcode, RunState, Status};
mod trap;
pub use trap::{TrapOutcome, TrapVector};

mod error;
pub use error::{Fault, LoadError};

/// Instructions executed between checks for a pending `Ctrl+C`.
pub const INTERRUPT_CHECK_INTERVAL: usize = 0x1000;
