/// The definitions

/// The definitions of the ternary number model
pub mod ternary {
    /// The amount of ternary digits in a Malbolge word
    pub const DIGITS: usize = 10;
    /// One past the largest representable word (`3^10`), doubling as the
    /// amount of addressable tape cells
    pub const MAX_ADDRESS_SPACE: usize = 59049;
    /// The precalculated powers of three up to the word size
    pub const POWERS_OF_THREE: [u32; DIGITS] = [1, 3, 9, 27, 81, 243, 729, 2187, 6561, 19683];
    /// The power of three of the most significant digit
    pub const MAX_TERNARY_POWER: u32 = POWERS_OF_THREE[DIGITS - 1];
    /// The digit-wise lookup table of the crazy operation, row-major over
    /// `(first mod 3, second mod 3)`
    pub const CRAZY_TABLE: [u16; 9] = [1, 1, 2, 0, 0, 2, 0, 2, 1];
}

/// The definitions needed for translating between ASCII programs and opcodes
pub mod encoding {
    /// Maps ASCII onto the opcode stream during load and execution
    pub const NORMAL_TRANSLATE: &str = "+b(29e*j1VMEKLyC})8&m#~W>qxdRp0wkrUo[D7,XTcA\"lI.v%{gJh4G\\-=O@5`_3i<?Z';FNQuY]szf$!BS/|t:Pn6^Ha";
    /// Re-encrypts the current cell after every executed instruction
    pub const ENCRYPTION_TRANSLATE: &str = "5z]&gqtyfr$(we4{WP)H-Zn,[%\\3dL+Q;>U!pJS72FhOA1CB6v^=I_0/8|jsb9m<.TVac`uY*MK'X~xDl}REokN:#?G\"i@";
    /// The eight characters of the Malbolge instruction set
    pub const VALID_INSTRUCTIONS: &str = "i</*jpov";
    /// The size of both translation tables
    pub const TABLE_SIZE: usize = 94;
    /// The lowest printable program byte
    pub const PRINTABLE_MIN: u16 = 33;
    /// The highest printable program byte
    pub const PRINTABLE_MAX: u16 = 126;
}

/// The definitions for the machine implementation
pub mod machine {
    /// The amount of cells reserved ahead of time when a tape is loaded,
    /// amortizes the on-demand expansion
    pub const TAPE_RESERVE: usize = 2048;
    /// The amount of distinct machine states remembered for cycle reporting
    pub const CYCLE_DETECTION_LIMIT: usize = 100_000;
}

/// The definitions for the program generator
pub mod generator {
    /// The opcodes tried when extending a search candidate
    pub const OPCODE_CHOICES: &str = "op*";
    /// The search depth after which a randomized commit happens
    pub const MAX_SEARCH_DEPTH: usize = 5;
    /// The amount of trailing tape cells folded into a state signature
    pub const SIGNATURE_TAPE_WIDTH: usize = 8;
    /// The amount of `o` filler opcodes in the bootstrap sequence
    pub const BOOTSTRAP_FILLER: usize = 99;
}
