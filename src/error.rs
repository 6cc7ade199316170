use thiserror::Error;

/// Errors produced while translating between ASCII programs and opcode
/// sequences.
#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum EncodingError {
    #[error("Program exceeds Malbolge maximum length (59049).")]
    ProgramTooLong,
    #[error("Invalid opcode '{0}' encountered during decoding.")]
    InvalidOpcode(char),
}

/// Errors raised while loading or executing a program.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ExecutionError {
    #[error("Invalid program '{0}'.")]
    Encoding(#[from] EncodingError),
    #[error("Opcode sequence is empty.")]
    EmptyProgram,
    #[error("Input instruction encountered with an exhausted input source.")]
    InputUnderflow,
    #[error("Maximum step count exceeded after {steps} steps.")]
    StepLimitExceeded {
        /// The output emitted up to the point the limit struck. The machine
        /// stays resumable, so this concatenates with the output of a later
        /// `resume_execution` into the full program output.
        output: String,
        steps: u64,
    },
    #[error("Memory expansion is disabled for this interpreter.")]
    MemoryExpansionDisabled,
    #[error("Memory limit exceeded.")]
    MemoryLimitExceeded,
    #[error("Unsupported opcode '{0}' reached during execution.")]
    UnsupportedInstruction(char),
}

/// Errors raised by the program generator.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum GenerationError {
    #[error("Target string must not be empty.")]
    EmptyTarget,
    #[error("Invalid machine state '{0}'.")]
    Execution(#[from] ExecutionError),
    #[error("Exhausted opcode search before reaching target prefix '{0}'.")]
    SearchExhausted(String),
    #[error("Bootstrap sequence exceeds maximum program length.")]
    BootstrapTooLong,
    #[error("Generated program exceeds maximum allowed length.")]
    ProgramLengthExceeded,
    #[error("Interpreter failed to capture a machine snapshot.")]
    MissingSnapshot,
}
