use crate::console::Console;
use crate::memory::Memory;
use crate::registers::RegisterFile;

/// Text written before reading a character with the `IN` trap.
pub const IN_PROMPT: &[u8] = b"Enter a character: ";
/// Text written by the `HALT` trap.
pub const HALT_NOTICE: &[u8] = b"HALT\n";

/// System call selected by the low 8 bits of a `TRAP` instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapVector {
    /// Read one character into R0, without echo.
    Getc = 0x20,
    /// Write the character in R0.
    Out = 0x21,
    /// Write the string of one character per word at R0.
    Puts = 0x22,
    /// Prompt, read one character into R0 and echo it.
    In = 0x23,
    /// Write the string of two characters per word at R0.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVector {
    type Error = u8;
    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        Ok(match vector {
            0x20 => Self::Getc,
            0x21 => Self::Out,
            0x22 => Self::Puts,
            0x23 => Self::In,
            0x24 => Self::Putsp,
            0x25 => Self::Halt,
            _ => return Err(vector),
        })
    }
}

/// What the machine should do once a trap routine has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapOutcome {
    Continue,
    Halt,
}

impl TrapVector {
    /// Run the trap routine. R7 must already hold the return address.
    pub fn execute<C>(self, regs: &mut RegisterFile, mem: &mut Memory<C>) -> TrapOutcome
    where
        C: Console,
    {
        match self {
            Self::Getc => {
                let ch = mem.device_mut().read_byte();
                regs.set_with_flags(0, ch as u16);
            }
            Self::Out => {
                let console = mem.device_mut();
                console.write_byte(regs.get(0) as u8);
                console.flush();
            }
            Self::Puts => {
                let mut addr = regs.get(0);
                loop {
                    let word = mem.peek(addr);
                    if word == 0 {
                        break;
                    }
                    mem.device_mut().write_byte(word as u8);
                    addr = addr.wrapping_add(1);
                }
                mem.device_mut().flush();
            }
            Self::In => {
                let console = mem.device_mut();
                console.write_bytes(IN_PROMPT);
                console.flush();
                let ch = console.read_byte();
                console.write_byte(ch);
                console.flush();
                regs.set_with_flags(0, ch as u16);
            }
            Self::Putsp => {
                let mut addr = regs.get(0);
                loop {
                    let word = mem.peek(addr);
                    if word == 0 {
                        break;
                    }
                    let [low, high] = word.to_le_bytes();
                    let console = mem.device_mut();
                    console.write_byte(low);
                    if high != 0 {
                        console.write_byte(high);
                    }
                    addr = addr.wrapping_add(1);
                }
                mem.device_mut().flush();
            }
            Self::Halt => {
                let console = mem.device_mut();
                console.write_bytes(HALT_NOTICE);
                console.flush();
                return TrapOutcome::Halt;
            }
        }
        TrapOutcome::Continue
    }
}
