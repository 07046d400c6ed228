use std::io::Read;
use std::path::Path;

use crate::console::Console;
use crate::error::{Fault, LoadError};
use crate::image;
use crate::memory::Memory;
use crate::registers::RegisterFile;
use crate::trap::{TrapOutcome, TrapVector};

/// Instruction selected by bits [15:12] of an instruction word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    pub fn of(instr: u16) -> Opcode {
        match instr >> 12 {
            0x0 => Self::Br,
            0x1 => Self::Add,
            0x2 => Self::Ld,
            0x3 => Self::St,
            0x4 => Self::Jsr,
            0x5 => Self::And,
            0x6 => Self::Ldr,
            0x7 => Self::Str,
            0x8 => Self::Rti,
            0x9 => Self::Not,
            0xA => Self::Ldi,
            0xB => Self::Sti,
            0xC => Self::Jmp,
            0xD => Self::Res,
            0xE => Self::Lea,
            0xF => Self::Trap,
            _ => unreachable!("opcode is only 4 bits"),
        }
    }
}

/// Sign-extend the low `bits` bits of `val` to 16 bits.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    let val = val & ((1u16 << bits) - 1);
    if (val >> (bits - 1)) & 1 != 0 {
        val | (0xFFFF << bits)
    } else {
        val
    }
}

/// Whether the machine may keep executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// Represents complete program state during runtime.
pub struct RunState<C> {
    regs: RegisterFile,
    mem: Memory<C>,
    status: Status,
    /// Set once execution has hit a fault; the machine never runs again.
    fault: Option<Fault>,
    /// Treat unknown trap vectors as no-ops instead of faulting.
    ignore_unknown_traps: bool,
}

impl<C: Console> RunState<C> {
    /// Zeroed memory and registers, PC at `0x3000` and condition code Z.
    pub fn new(console: C) -> Self {
        RunState {
            regs: RegisterFile::new(),
            mem: Memory::new(console),
            status: Status::Running,
            fault: None,
            ignore_unknown_traps: false,
        }
    }

    /// Load an image from a byte stream, returning its origin. Does not touch the PC.
    pub fn load_image(&mut self, reader: impl Read) -> Result<u16, LoadError> {
        image::load_image(&mut self.mem, reader)
    }

    /// Load an image from a file, returning its origin. Does not touch the PC.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<u16, LoadError> {
        image::load_file(&mut self.mem, path.as_ref())
    }

    pub fn set_ignore_unknown_traps(&mut self, ignore: bool) {
        self.ignore_unknown_traps = ignore;
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    pub fn mem(&self) -> &Memory<C> {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Memory<C> {
        &mut self.mem
    }

    pub fn console(&self) -> &C {
        self.mem.device()
    }

    pub fn console_mut(&mut self) -> &mut C {
        self.mem.device_mut()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Run until the program halts or faults.
    pub fn run(&mut self) -> Result<(), Fault> {
        while self.step()? == Status::Running {}
        Ok(())
    }

    /// Fetch, decode and execute a single instruction.
    pub fn step(&mut self) -> Result<Status, Fault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        if self.status == Status::Halted {
            return Ok(Status::Halted);
        }

        let addr = self.regs.pc();
        let instr = self.mem.read(addr);
        // PC incremented before instruction is performed
        self.regs.set_pc(addr.wrapping_add(1));

        match Opcode::of(instr) {
            Opcode::Br => self.br(instr),
            Opcode::Add => self.add(instr),
            Opcode::Ld => self.ld(instr),
            Opcode::St => self.st(instr),
            Opcode::Jsr => self.jsr(instr),
            Opcode::And => self.and(instr),
            Opcode::Ldr => self.ldr(instr),
            Opcode::Str => self.str(instr),
            Opcode::Not => self.not(instr),
            Opcode::Ldi => self.ldi(instr),
            Opcode::Sti => self.sti(instr),
            Opcode::Jmp => self.jmp(instr),
            Opcode::Lea => self.lea(instr),
            Opcode::Trap => self.trap(instr, addr)?,
            Opcode::Rti | Opcode::Res => {
                return Err(self.fail(Fault::ReservedOpcode {
                    opcode: (instr >> 12) as u8,
                    instr,
                    addr,
                }))
            }
        }
        Ok(self.status)
    }

    fn fail(&mut self, fault: Fault) -> Fault {
        self.fault = Some(fault);
        fault
    }

    /// PC plus the sign-extended low `bits` bits of `instr`.
    #[inline]
    fn pc_relative(&self, instr: u16, bits: u32) -> u16 {
        self.regs.pc().wrapping_add(sign_extend(instr, bits))
    }

    /// Address from base register in bits [8:6] plus 6-bit offset.
    #[inline]
    fn base_relative(&self, instr: u16) -> u16 {
        self.regs.get(base_reg(instr)).wrapping_add(sign_extend(instr, 6))
    }

    /// Second operand of ADD/AND: imm5 if bit 5 is set, otherwise SR2.
    #[inline]
    fn operand2(&self, instr: u16) -> u16 {
        if instr & 0b10_0000 == 0 {
            self.regs.get(instr & 0b111)
        } else {
            sign_extend(instr, 5)
        }
    }

    fn add(&mut self, instr: u16) {
        let res = self
            .regs
            .get(base_reg(instr))
            .wrapping_add(self.operand2(instr));
        self.regs.set_with_flags(dest_reg(instr), res);
    }

    fn and(&mut self, instr: u16) {
        let res = self.regs.get(base_reg(instr)) & self.operand2(instr);
        self.regs.set_with_flags(dest_reg(instr), res);
    }

    fn not(&mut self, instr: u16) {
        let res = !self.regs.get(base_reg(instr));
        self.regs.set_with_flags(dest_reg(instr), res);
    }

    fn br(&mut self, instr: u16) {
        let nzp = (instr >> 9) & 0b111;
        if self.regs.cond() as u16 & nzp != 0 {
            self.regs.set_pc(self.pc_relative(instr, 9));
        }
    }

    fn jmp(&mut self, instr: u16) {
        self.regs.set_pc(self.regs.get(base_reg(instr)));
    }

    fn jsr(&mut self, instr: u16) {
        // R7 is written first, so `jsrr r7` lands on the next instruction
        self.regs.set(7, self.regs.pc());
        if instr & 0x0800 == 0 {
            // jsrr
            self.regs.set_pc(self.regs.get(base_reg(instr)));
        } else {
            self.regs.set_pc(self.pc_relative(instr, 11));
        }
    }

    fn ld(&mut self, instr: u16) {
        let val = self.mem.read(self.pc_relative(instr, 9));
        self.regs.set_with_flags(dest_reg(instr), val);
    }

    fn ldi(&mut self, instr: u16) {
        let ptr = self.mem.read(self.pc_relative(instr, 9));
        let val = self.mem.read(ptr);
        self.regs.set_with_flags(dest_reg(instr), val);
    }

    fn ldr(&mut self, instr: u16) {
        let val = self.mem.read(self.base_relative(instr));
        self.regs.set_with_flags(dest_reg(instr), val);
    }

    fn lea(&mut self, instr: u16) {
        let val = self.pc_relative(instr, 9);
        self.regs.set_with_flags(dest_reg(instr), val);
    }

    fn st(&mut self, instr: u16) {
        let val = self.regs.get(dest_reg(instr));
        self.mem.write(self.pc_relative(instr, 9), val);
    }

    fn sti(&mut self, instr: u16) {
        let val = self.regs.get(dest_reg(instr));
        let ptr = self.mem.read(self.pc_relative(instr, 9));
        self.mem.write(ptr, val);
    }

    fn str(&mut self, instr: u16) {
        let val = self.regs.get(dest_reg(instr));
        self.mem.write(self.base_relative(instr), val);
    }

    fn trap(&mut self, instr: u16, addr: u16) -> Result<(), Fault> {
        self.regs.set(7, self.regs.pc());
        let vector = (instr & 0xFF) as u8;
        match TrapVector::try_from(vector) {
            Ok(trap) => {
                if trap.execute(&mut self.regs, &mut self.mem) == TrapOutcome::Halt {
                    self.status = Status::Halted;
                }
                Ok(())
            }
            Err(_) if self.ignore_unknown_traps => Ok(()),
            Err(vector) => Err(self.fail(Fault::UnknownTrap { vector, addr })),
        }
    }
}

/// DR/SR field, bits [11:9].
#[inline]
fn dest_reg(instr: u16) -> u16 {
    (instr >> 9) & 0b111
}

/// SR1/BaseR field, bits [8:6].
#[inline]
fn base_reg(instr: u16) -> u16 {
    (instr >> 6) & 0b111
}
