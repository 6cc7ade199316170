//! The pretty print implementation for the [`machine state`](super::Machine).
//! Split into its own file for smaller file sizes and higher cohesion.

use std::fmt::{self, Write};

use super::Machine;

/// The amount of tape cells shown per row.
const HEX_PRINT_STEP: usize = 8;

/// Will format one row of tape cells with its address range.
fn row_formatter(line: &mut String, from: usize, to: usize, cells: &[u16]) -> fmt::Result {
    write!(line, "\t\t{:#06X} - {:#06X} :", from, to)?;
    for cell in cells.iter() {
        write!(line, " {:#06X}", cell)?;
    }
    Ok(())
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tape = String::with_capacity(self.tape.len() * 8);
        for from in (0..self.tape.len()).step_by(HEX_PRINT_STEP) {
            let to = (from + HEX_PRINT_STEP - 1).min(self.tape.len() - 1);
            row_formatter(&mut tape, from, to, &self.tape[from..=to])?;
            tape.push('\n');
        }
        // remove the trailing newline again
        if let Some(index) = tape.rfind('\n') {
            tape.truncate(index);
        }

        write!(
            f,
            "Machine {{\n\
                \tRegisters :\n\
                \t\tA : {:#06X}\n\
                \t\tC : {:#06X}\n\
                \t\tD : {:#06X}\n\
                \tHalted :\n\
                \t\t{}\n\
                \tTape :\n\
                {}\n\
            }}",
            self.a, self.c, self.d, self.halted, tape
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT_PRINT: &str = "\
        Machine {\n\
            \tRegisters :\n\
                \t\tA : 0x0041\n\
                \t\tC : 0x0001\n\
                \t\tD : 0x0002\n\
            \tHalted :\n\
                \t\tfalse\n\
            \tTape :\n\
                \t\t0x0000 - 0x0007 : 0x0021 0x0022 0x0023 0x0024 0x0025 0x0026 0x0027 0x0028\n\
                \t\t0x0008 - 0x0008 : 0x0029\n\
        }";

    #[test]
    /// tests if the pretty print output is as expected
    fn test_full_print() {
        let machine = Machine {
            tape: (33..=41).collect(),
            a: 0x41,
            c: 1,
            d: 2,
            halted: false,
        };

        let actual = format!("{}", machine);
        for (expected, actual) in OUTPUT_PRINT.split('\n').zip(actual.split('\n')) {
            assert_eq!(expected, actual);
        }
        assert_eq!(OUTPUT_PRINT, actual);
    }
}
