use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Failure to place an image into memory. Execution never starts after one of these.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Failed to load image: {}", .path.display())]
    #[diagnostic(
        code(load::open),
        help("check that the image file exists and is readable")
    )]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read image{}", described(.path))]
    #[diagnostic(code(load::read))]
    Read {
        /// Unknown when loading from a bare byte stream.
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    #[error("Image{} is too short to contain an origin address", described(.path))]
    #[diagnostic(
        code(load::truncated),
        help("images start with a 2-byte big-endian origin, followed by the program words")
    )]
    Truncated { path: Option<PathBuf> },
}

impl LoadError {
    /// Name the file the image came from, if not named already.
    pub(crate) fn in_file(mut self, file: &Path) -> Self {
        match &mut self {
            Self::Read { path, .. } | Self::Truncated { path } => {
                path.get_or_insert_with(|| file.to_path_buf());
            }
            Self::Open { .. } => (),
        }
        self
    }
}

fn described(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

/// Condition that stops execution for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Diagnostic)]
pub enum Fault {
    #[error("Reserved opcode 0x{opcode:x} in instruction 0x{instr:04x} at address 0x{addr:04x}")]
    #[diagnostic(
        code(run::reserved_opcode),
        help("the image is malformed or uses an instruction this machine does not implement")
    )]
    ReservedOpcode { opcode: u8, instr: u16, addr: u16 },

    #[error("Trap called with an unknown vector of 0x{vector:02x} at address 0x{addr:04x}")]
    #[diagnostic(
        code(run::unknown_trap),
        help("pass `--unknown-trap ignore` to treat unknown traps as no-ops")
    )]
    UnknownTrap { vector: u8, addr: u16 },
}
