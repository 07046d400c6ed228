use crate::console::Keyboard;

/// LC3 can address 128KB of memory.
pub const MEMORY_MAX: usize = 0x10000;

/// Keyboard status register. Bit 15 is set when a key has been latched into [`KBDR`].
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register.
pub const KBDR: u16 = 0xFE02;

/// The full address space, plus the keyboard device mapped into it.
///
/// Reading [`KBSR`] polls the device; every other access is a plain word access.
pub struct Memory<D> {
    mem: Box<[u16; MEMORY_MAX]>,
    device: D,
}

impl<D: Keyboard> Memory<D> {
    pub fn new(device: D) -> Self {
        Memory {
            mem: vec![0; MEMORY_MAX]
                .into_boxed_slice()
                .try_into()
                .unwrap_or_else(|_| unreachable!("memory is exactly MEMORY_MAX words")),
            device,
        }
    }

    /// Read the word at `addr`, latching a pending key first if `addr` is [`KBSR`].
    pub fn read(&mut self, addr: u16) -> u16 {
        if addr == KBSR {
            if self.device.key_available() {
                let byte = self.device.read_byte();
                *self.word(KBSR) = 1 << 15;
                *self.word(KBDR) = byte as u16;
            } else {
                *self.word(KBSR) = 0;
            }
        }
        *self.word(addr)
    }

    pub fn write(&mut self, addr: u16, val: u16) {
        *self.word(addr) = val;
    }

    /// Read without triggering device side effects.
    pub fn peek(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Words from `addr` to the end of the address space.
    pub fn tail_mut(&mut self, addr: u16) -> &mut [u16] {
        &mut self.mem[addr as usize..]
    }

    #[inline]
    fn word(&mut self, addr: u16) -> &mut u16 {
        // Memory fits any u16 index
        &mut self.mem[addr as usize]
    }
}
