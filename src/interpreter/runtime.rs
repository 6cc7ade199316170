//! The interpreter implementation: program loading, the step loop and the
//! execution diagnostics.

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::{
    definitions::{
        encoding::{NORMAL_TRANSLATE, TABLE_SIZE},
        machine::CYCLE_DETECTION_LIMIT,
        ternary::MAX_ADDRESS_SPACE,
    },
    encoding::reverse_normalize,
    input::InputSource,
    ternary::{crazy_operation, ternary_rotate},
    ExecutionError,
};

use super::Machine;

/// Why an execution reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// A `v` instruction was executed.
    HaltOpcode,
    /// The instruction pointer ran past the end of the program.
    ProgramEnd,
    /// The run ended without a recognized halt condition.
    Unknown,
}

impl HaltReason {
    /// Will return the stable identifier of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            HaltReason::HaltOpcode => "halt_opcode",
            HaltReason::ProgramEnd => "program_end",
            HaltReason::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Additional information about how an execution came to its end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HaltMetadata {
    /// The last instruction that was dispatched.
    pub last_instruction: Option<char>,
    /// The destination of the last `i` or `j` instruction.
    pub last_jump_target: Option<usize>,
    /// A machine state repeated during the run.
    pub cycle_detected: bool,
    /// The state map hit its capacity, later repeats may go unnoticed.
    pub cycle_tracking_limited: bool,
    /// Steps between the first and second sighting of the repeated state.
    pub cycle_repeat_length: Option<u64>,
}

/// The outcome of a single execution, resumption or snapshot extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Everything the `<` instruction emitted, in execution order.
    pub output: String,
    pub halted: bool,
    pub steps: u64,
    pub halt_reason: HaltReason,
    /// A deep copy of the machine after the run, if requested.
    pub machine: Option<Machine>,
    pub halt_metadata: HaltMetadata,
    /// The amount of cells appended to the tape during this run.
    pub memory_expansions: u64,
    /// The largest tape size observed during this run.
    pub peak_memory_cells: usize,
}

/// The construction time configuration of an [`Interpreter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Grow the tape on demand instead of failing the access.
    pub allow_memory_expansion: bool,
    /// The hard upper bound on the tape size.
    pub memory_limit: usize,
    /// The amount of machine states remembered for cycle reporting,
    /// `None` disables the tracking entirely.
    pub cycle_detection_limit: Option<usize>,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            allow_memory_expansion: true,
            memory_limit: MAX_ADDRESS_SPACE,
            cycle_detection_limit: Some(CYCLE_DETECTION_LIMIT),
        }
    }
}

/// The per call configuration of an execution.
#[derive(Default)]
pub struct RunOptions<'a> {
    /// The source the `/` instruction pulls its bytes from.
    pub input: Option<&'a mut dyn InputSource>,
    /// Fail with a resumable step limit error once this many steps ran.
    pub max_steps: Option<u64>,
    /// Attach a deep copy of the final machine state to the result.
    pub capture_machine: bool,
}

/// Execute normalized Malbolge opcodes and capture output.
///
/// A single interpreter instance can run multiple programs sequentially;
/// the internal lock serializes concurrent calls to the same instance,
/// distinct instances are fully independent.
pub struct Interpreter {
    core: Mutex<Core>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Will create an interpreter with the default options.
    pub fn new() -> Self {
        Self::with_options(InterpreterOptions::default())
    }

    /// Will create an interpreter with the given options.
    pub fn with_options(options: InterpreterOptions) -> Self {
        Self {
            core: Mutex::new(Core {
                machine: Machine::new(),
                options,
                program_length: 0,
                memory_expansions: 0,
                peak_memory_cells: 0,
            }),
        }
    }

    /// Will validate and load a program without running it.
    pub fn load_program(&self, opcodes: &str) -> Result<(), ExecutionError> {
        self.core.lock().load_program(opcodes)
    }

    /// Will load the opcodes and run them to completion.
    pub fn execute(
        &self,
        opcodes: &str,
        run: RunOptions<'_>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut core = self.core.lock();
        core.load_program(opcodes)?;
        core.run(run)
    }

    /// Will load the opcodes, run them and return only the produced output.
    pub fn run(&self, opcodes: &str, run: RunOptions<'_>) -> Result<String, ExecutionError> {
        Ok(self.execute(opcodes, run)?.output)
    }

    /// Will continue execution from the currently loaded machine state.
    ///
    /// After a step limit error this picks up exactly where the limit
    /// struck, so the outputs of the partial runs concatenate into the
    /// output of an unbounded run.
    pub fn resume_execution(&self, run: RunOptions<'_>) -> Result<ExecutionResult, ExecutionError> {
        self.core.lock().run(run)
    }

    /// Will continue execution and return only the produced output.
    pub fn resume(&self, run: RunOptions<'_>) -> Result<String, ExecutionError> {
        Ok(self.resume_execution(run)?.output)
    }

    /// Will restore the snapshot, append the encoded suffix opcodes to the
    /// tape and run to completion.
    ///
    /// The cost of an extension is proportional to the steps actually
    /// executed, not to the prefix that produced the snapshot.
    pub fn execute_from_snapshot(
        &self,
        snapshot: &Machine,
        suffix_opcodes: &str,
        run: RunOptions<'_>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut core = self.core.lock();
        core.seed_from_snapshot(snapshot, suffix_opcodes)?;
        core.run(run)
    }
}

/// The lock protected interpreter state.
struct Core {
    machine: Machine,
    options: InterpreterOptions,
    program_length: usize,
    memory_expansions: u64,
    peak_memory_cells: usize,
}

impl Core {
    fn load_program(&mut self, opcodes: &str) -> Result<(), ExecutionError> {
        if opcodes.is_empty() {
            return Err(ExecutionError::EmptyProgram);
        }

        let ascii = reverse_normalize(opcodes, 0)?;
        self.machine.load_tape(ascii.as_bytes());
        self.program_length = opcodes.len();
        log::debug!("loaded program with {} opcodes", self.program_length);
        Ok(())
    }

    fn seed_from_snapshot(
        &mut self,
        snapshot: &Machine,
        suffix_opcodes: &str,
    ) -> Result<(), ExecutionError> {
        let mut machine = snapshot.clone();
        let prefix_length = machine.tape.len();
        if !suffix_opcodes.is_empty() {
            let ascii = reverse_normalize(suffix_opcodes, prefix_length)?;
            machine.tape.extend(ascii.bytes().map(u16::from));
        }
        self.machine = machine;
        self.program_length = prefix_length + suffix_opcodes.len();
        Ok(())
    }

    fn run(&mut self, run: RunOptions<'_>) -> Result<ExecutionResult, ExecutionError> {
        let RunOptions {
            mut input,
            max_steps,
            capture_machine,
        } = run;

        self.machine.halted = false;
        self.memory_expansions = 0;
        self.peak_memory_cells = self.machine.tape.len();

        let mut output = String::new();
        let mut steps: u64 = 0;
        let mut steps_remaining = max_steps;
        let mut halt_reason = HaltReason::Unknown;
        let mut metadata = HaltMetadata::default();
        let mut cycles = CycleTracker::new(self.options.cycle_detection_limit);

        while !self.machine.halted {
            if let Some(remaining) = steps_remaining.as_mut() {
                if *remaining == 0 {
                    return Err(ExecutionError::StepLimitExceeded { output, steps });
                }
                *remaining -= 1;
            }
            if self.machine.c >= self.program_length {
                self.machine.halted = true;
                halt_reason = HaltReason::ProgramEnd;
                break;
            }

            self.ensure_capacity(self.machine.c)?;
            let cell = self.machine.tape[self.machine.c];
            cycles.observe(&self.machine, cell, steps, &mut metadata);
            let instruction = decode_instruction(cell, self.machine.c);

            match instruction {
                'i' => {
                    self.ensure_capacity(self.machine.d)?;
                    let target = usize::from(self.machine.tape[self.machine.d]);
                    metadata.last_jump_target = Some(target);
                    self.machine.c = target;
                }
                '<' => output.push((self.machine.a % 256) as u8 as char),
                '/' => {
                    let byte = input
                        .as_mut()
                        .and_then(|source| source.next_byte())
                        .ok_or(ExecutionError::InputUnderflow)?;
                    self.machine.a = u16::from(byte);
                }
                '*' => {
                    self.ensure_capacity(self.machine.d)?;
                    self.machine.a = ternary_rotate(self.machine.tape[self.machine.d]);
                    self.machine.tape[self.machine.d] = self.machine.a;
                }
                'j' => {
                    self.ensure_capacity(self.machine.d)?;
                    let target = usize::from(self.machine.tape[self.machine.d]);
                    metadata.last_jump_target = Some(target);
                    self.machine.d = target;
                }
                'p' => {
                    self.ensure_capacity(self.machine.d)?;
                    self.machine.a =
                        crazy_operation(self.machine.a, self.machine.tape[self.machine.d]);
                    self.machine.tape[self.machine.d] = self.machine.a;
                }
                // NOP, still re-encrypts and advances C and D
                'o' => {}
                'v' => {
                    self.machine.halted = true;
                    halt_reason = HaltReason::HaltOpcode;
                }
                other => return Err(ExecutionError::UnsupportedInstruction(other)),
            }

            metadata.last_instruction = Some(instruction);
            // an `i` jump may have moved C past the end of the tape
            self.ensure_capacity(self.machine.c)?;
            self.machine.encrypt_current_cell();
            self.machine.c += 1;
            self.machine.d += 1;
            steps += 1;
        }

        let machine = if capture_machine {
            Some(self.machine.clone())
        } else {
            None
        };

        Ok(ExecutionResult {
            output,
            halted: self.machine.halted,
            steps,
            halt_reason,
            machine,
            halt_metadata: metadata,
            memory_expansions: self.memory_expansions,
            peak_memory_cells: self.peak_memory_cells,
        })
    }

    /// Will grow the tape to cover the given index.
    ///
    /// New cells continue the crazy operation chain over the last two
    /// cells.
    fn ensure_capacity(&mut self, index: usize) -> Result<(), ExecutionError> {
        if index < self.machine.tape.len() {
            return Ok(());
        }
        if !self.options.allow_memory_expansion {
            return Err(ExecutionError::MemoryExpansionDisabled);
        }
        if index >= self.options.memory_limit {
            return Err(ExecutionError::MemoryLimitExceeded);
        }

        let limit = self.options.memory_limit.min(MAX_ADDRESS_SPACE);
        while self.machine.tape.len() <= index {
            let tape = &mut self.machine.tape;
            let next_value = match tape.len() {
                0 => 0,
                1 => crazy_operation(tape[0], tape[0]),
                len => crazy_operation(tape[len - 2], tape[len - 1]),
            };
            tape.push(next_value);
            self.memory_expansions += 1;
            if tape.len() >= limit {
                break;
            }
        }
        self.peak_memory_cells = self.peak_memory_cells.max(self.machine.tape.len());

        if index >= self.machine.tape.len() {
            return Err(ExecutionError::MemoryLimitExceeded);
        }
        Ok(())
    }
}

/// Will decode the instruction a cell executes as at the given tape index.
fn decode_instruction(cell: u16, index: usize) -> char {
    let offset = (usize::from(cell) + index + TABLE_SIZE - 33) % TABLE_SIZE;
    NORMAL_TRANSLATE.as_bytes()[offset] as char
}

/// Informational repeated state tracking.
///
/// Detection never halts execution, it only annotates the result.
pub(super) struct CycleTracker {
    keys: Option<HashMap<(usize, u16, u16, usize), u64>>,
    limit: usize,
}

impl CycleTracker {
    pub(super) fn new(limit: Option<usize>) -> Self {
        match limit {
            Some(limit) => Self {
                keys: Some(HashMap::with_capacity(limit.min(1024))),
                limit,
            },
            None => Self { keys: None, limit: 0 },
        }
    }

    /// Will record the pre dispatch state of a step.
    pub(super) fn observe(
        &mut self,
        machine: &Machine,
        cell: u16,
        step: u64,
        metadata: &mut HaltMetadata,
    ) {
        let keys = match self.keys.as_mut() {
            Some(keys) => keys,
            None => return,
        };

        let key = (machine.c, cell, machine.a, machine.d);
        if let Some(first_seen) = keys.get(&key) {
            metadata.cycle_detected = true;
            if metadata.cycle_repeat_length.is_none() {
                metadata.cycle_repeat_length = Some(step - first_seen);
            }
        } else if keys.len() >= self.limit {
            metadata.cycle_tracking_limited = true;
        } else {
            keys.insert(key, step);
        }
    }
}
