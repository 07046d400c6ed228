use std::cmp::Ordering;

/// Address of the first instruction executed after start-up.
pub const PC_START: u16 = 0x3000;

/// Condition code. Values line up with the `nzp` bits of a branch instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

impl Flag {
    /// Condition code describing the sign of `val`.
    pub fn of(val: u16) -> Flag {
        match (val as i16).cmp(&0) {
            Ordering::Less => Flag::N,
            Ordering::Equal => Flag::Z,
            Ordering::Greater => Flag::P,
        }
    }
}

/// General purpose registers, program counter and condition code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Program counter
    pc: u16,
    /// Condition code
    cond: Flag,
}

impl Default for RegisterFile {
    fn default() -> Self {
        RegisterFile {
            reg: [0; 8],
            pc: PC_START,
            cond: Flag::Z,
        }
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the low three bits of `reg` select a register.
    #[inline]
    pub fn get(&self, reg: u16) -> u16 {
        self.reg[(reg & 0b111) as usize]
    }

    #[inline]
    pub fn set(&mut self, reg: u16, val: u16) {
        self.reg[(reg & 0b111) as usize] = val;
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    #[inline]
    pub fn cond(&self) -> Flag {
        self.cond
    }

    /// Recompute the condition code from the current value of `reg`.
    #[inline]
    pub fn update_flags(&mut self, reg: u16) {
        self.cond = Flag::of(self.get(reg));
    }

    /// Write `val` to `reg` and recompute the condition code from it.
    #[inline]
    pub fn set_with_flags(&mut self, reg: u16, val: u16) {
        self.set(reg, val);
        self.update_flags(reg);
    }
}
