//! The machine state shared between execution and snapshotting.

use crate::definitions::{
    encoding::{ENCRYPTION_TRANSLATE, PRINTABLE_MAX, PRINTABLE_MIN},
    machine::TAPE_RESERVE,
};

/// One Malbolge machine instant: the ternary tape and the three registers.
///
/// `c` is the instruction pointer, `d` the data pointer and `a` the
/// accumulator. Snapshots of this state are plain deep copies, so a
/// snapshot returned from an execution never aliases the interpreter that
/// produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Machine {
    /// The self modifying tape; cells hold ternary words below `3^10`.
    pub(crate) tape: Vec<u16>,
    pub(crate) a: u16,
    pub(crate) c: usize,
    pub(crate) d: usize,
    pub(crate) halted: bool,
}

impl Machine {
    /// Will create an empty machine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Will reset the registers and the halt flag, the tape stays as is.
    pub fn reset(&mut self) {
        self.a = 0;
        self.c = 0;
        self.d = 0;
        self.halted = false;
    }

    /// Will replace the tape with the given ASCII program bytes and reset
    /// the registers.
    ///
    /// A slice of the eventual address space is reserved up front, so the
    /// common short expansions do not reallocate.
    pub(crate) fn load_tape(&mut self, ascii: &[u8]) {
        let mut tape = Vec::with_capacity(ascii.len() + TAPE_RESERVE);
        tape.extend(ascii.iter().map(|byte| u16::from(*byte)));
        self.tape = tape;
        self.reset();
    }

    /// Will re-encrypt the cell under the instruction pointer.
    ///
    /// Only printable values are mapped; the encryption table maps back
    /// into the printable range, which keeps executed cells printable.
    pub(crate) fn encrypt_current_cell(&mut self) {
        let cell = self.tape[self.c];
        if (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&cell) {
            let encrypted = ENCRYPTION_TRANSLATE.as_bytes()[usize::from(cell - PRINTABLE_MIN)];
            self.tape[self.c] = u16::from(encrypted);
        }
    }

    /// Will return the current tape content.
    pub fn tape(&self) -> &[u16] {
        &self.tape
    }

    /// Will return the accumulator register.
    pub fn a(&self) -> u16 {
        self.a
    }

    /// Will return the instruction pointer.
    pub fn c(&self) -> usize {
        self.c
    }

    /// Will return the data pointer.
    pub fn d(&self) -> usize {
        self.d
    }

    /// Will check if the machine has reached a terminal state.
    pub fn halted(&self) -> bool {
        self.halted
    }
}
