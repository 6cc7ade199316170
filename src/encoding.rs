//! Translation between printable ASCII programs and the Malbolge
//! instruction set.
//!
//! Both directions run over the fixed 94 character tables in
//! [`definitions::encoding`](crate::definitions::encoding); the translation
//! of a character depends on its position inside the program.

use once_cell::sync::Lazy;

use crate::{
    definitions::encoding::{NORMAL_TRANSLATE, TABLE_SIZE, VALID_INSTRUCTIONS},
    definitions::ternary::MAX_ADDRESS_SPACE,
    EncodingError,
};

/// The position of every printable character inside
/// [`NORMAL_TRANSLATE`], indexed by ASCII code.
///
/// The table is a permutation of the printable range, so the lookup is
/// total for program bytes; it replaces a modular search per opcode.
static TRANSLATE_POSITIONS: Lazy<[u8; 128]> = Lazy::new(|| {
    let mut positions = [0; 128];
    for (position, byte) in NORMAL_TRANSLATE.bytes().enumerate() {
        positions[byte as usize] = position as u8;
    }
    positions
});

/// Will translate a printable ASCII program into the opcode sequence it
/// executes as.
///
/// Characters whose translation falls outside the instruction set are
/// discarded, which is what lets source files carry whitespace and
/// comments.
pub fn normalize(ascii: &str) -> Result<String, EncodingError> {
    if ascii.len() > MAX_ADDRESS_SPACE {
        return Err(EncodingError::ProgramTooLong);
    }

    let mut opcodes = String::with_capacity(ascii.len());
    for (index, byte) in ascii.bytes().enumerate() {
        let offset = (usize::from(byte) + index + TABLE_SIZE - 33) % TABLE_SIZE;
        let translated = NORMAL_TRANSLATE.as_bytes()[offset] as char;
        if VALID_INSTRUCTIONS.contains(translated) {
            opcodes.push(translated);
        }
    }

    Ok(opcodes)
}

/// Will encode an opcode sequence back into printable ASCII, so that
/// normalizing the result at `start_index` yields the opcodes again.
///
/// `start_index` is the global program position of the first opcode; it is
/// non zero when a suffix is appended to an already encoded program.
pub fn reverse_normalize(opcodes: &str, start_index: usize) -> Result<String, EncodingError> {
    if start_index + opcodes.len() > MAX_ADDRESS_SPACE {
        return Err(EncodingError::ProgramTooLong);
    }

    let mut ascii = String::with_capacity(opcodes.len());
    for (offset, opcode) in opcodes.chars().enumerate() {
        if !VALID_INSTRUCTIONS.contains(opcode) {
            return Err(EncodingError::InvalidOpcode(opcode));
        }
        let position = usize::from(TRANSLATE_POSITIONS[opcode as usize]);
        let index = (start_index + offset) % TABLE_SIZE;
        let translated = (position + TABLE_SIZE - index) % TABLE_SIZE;
        ascii.push((translated as u8 + 33) as char);
    }

    Ok(ascii)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::encoding::ENCRYPTION_TRANSLATE;

    #[test]
    fn test_tables_are_printable_permutations() {
        for table in [NORMAL_TRANSLATE, ENCRYPTION_TRANSLATE].iter() {
            assert_eq!(table.len(), TABLE_SIZE);
            let mut seen = [false; 128];
            for byte in table.bytes() {
                assert!((33..=126).contains(&byte));
                assert!(!seen[byte as usize]);
                seen[byte as usize] = true;
            }
        }
    }

    #[test]
    fn test_round_trip_opcodes() {
        let opcodes = "i<ov";
        let ascii = reverse_normalize(opcodes, 0).unwrap();
        assert_eq!(normalize(&ascii).unwrap(), opcodes);
    }

    #[test]
    fn test_round_trip_all_instructions() {
        let opcodes = VALID_INSTRUCTIONS.repeat(12);
        let ascii = reverse_normalize(&opcodes, 0).unwrap();
        assert_eq!(normalize(&ascii).unwrap(), opcodes);
    }

    #[test]
    fn test_round_trip_with_offset() {
        let prefix = "i<";
        let suffix = "p";
        let mut combined = reverse_normalize(prefix, 0).unwrap();
        combined.push_str(&reverse_normalize(suffix, prefix.len()).unwrap());
        assert_eq!(normalize(&combined).unwrap(), "i<p");
    }

    #[test]
    fn test_normalize_discards_non_instructions() {
        // every byte translates, only instruction hits survive
        let ascii = reverse_normalize("v", 0).unwrap() + " \t";
        assert_eq!(normalize(&ascii).unwrap(), "v");
    }

    #[test]
    fn test_normalize_max_length_guard() {
        let ascii = "!".repeat(MAX_ADDRESS_SPACE + 1);
        assert_eq!(normalize(&ascii), Err(EncodingError::ProgramTooLong));
    }

    #[test]
    fn test_reverse_normalize_invalid_opcode() {
        assert_eq!(
            reverse_normalize("x", 0),
            Err(EncodingError::InvalidOpcode('x'))
        );
    }

    #[test]
    fn test_reverse_normalize_max_length_guard() {
        let opcodes = "i".repeat(MAX_ADDRESS_SPACE + 1);
        assert_eq!(
            reverse_normalize(&opcodes, 0),
            Err(EncodingError::ProgramTooLong)
        );
        assert_eq!(
            reverse_normalize("i", MAX_ADDRESS_SPACE),
            Err(EncodingError::ProgramTooLong)
        );
    }
}
