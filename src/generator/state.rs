//! The bookkeeping types of the search: candidate states, signatures,
//! statistics and trace events.

use tinyvec::ArrayVec;

use crate::{definitions::generator::SIGNATURE_TAPE_WIDTH, interpreter::Machine};

/// One search candidate: the opcodes written so far, the output they
/// produced and the machine snapshot to extend from.
#[derive(Debug, Clone)]
pub(super) struct PrefixState {
    pub(super) opcodes: String,
    pub(super) output: String,
    pub(super) machine: Machine,
}

/// A compressed fingerprint of a machine state.
///
/// Two flavors share this shape: the canonical signature folds the
/// accumulator modulo 256, the fallback signature keeps it whole. Pruning
/// runs on the fallback flavor, the canonical one only counts collisions,
/// which keeps distinct states folded together by the modulus from being
/// pruned away wrongly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct StateSignature {
    tape_len: usize,
    a: u16,
    c: usize,
    d: usize,
    tail: ArrayVec<[u16; SIGNATURE_TAPE_WIDTH]>,
}

impl StateSignature {
    /// Will fingerprint the machine with the accumulator folded mod 256.
    pub(super) fn canonical(machine: &Machine) -> Self {
        Self::build(machine, machine.a() % 256)
    }

    /// Will fingerprint the machine with the accumulator kept whole.
    pub(super) fn fallback(machine: &Machine) -> Self {
        Self::build(machine, machine.a())
    }

    fn build(machine: &Machine, a: u16) -> Self {
        let tape = machine.tape();
        let start = tape.len().saturating_sub(SIGNATURE_TAPE_WIDTH);
        let mut tail = ArrayVec::new();
        tail.extend_from_slice(&tape[start..]);

        Self {
            tape_len: tape.len(),
            a,
            c: machine.c(),
            d: machine.d(),
            tail,
        }
    }
}

/// The mutable counters of one generation run.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct SearchCounters {
    pub(super) evaluations: u64,
    pub(super) cache_hits: u64,
    pub(super) pruned: u64,
    pub(super) repeated_state_pruned: u64,
    pub(super) signature_collisions: u64,
}

/// The statistics of a finished generation.
///
/// The ratios follow the `0/0 = 0` convention.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    /// Snapshot extensions actually executed on the machine.
    pub evaluations: u64,
    /// Extensions answered from the candidate cache.
    pub cache_hits: u64,
    /// Candidates discarded for any reason.
    pub pruned: u64,
    /// Candidates discarded as repeated states, including signature
    /// collisions.
    pub repeated_state_pruned: u64,
    pub duration_ns: u128,
    pub trace_length: usize,
    pub pruned_ratio: f64,
    pub repeated_state_ratio: f64,
}

/// Why a candidate evaluation ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceReason {
    Accepted,
    CandidateRetained,
    DeadProgramCache,
    PrefixMismatch,
    RepeatedState,
    SignatureCollision,
    RandomExtension,
    CollisionExtension,
    Halt,
}

impl TraceReason {
    /// Will return the stable identifier of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceReason::Accepted => "accepted",
            TraceReason::CandidateRetained => "candidate_retained",
            TraceReason::DeadProgramCache => "dead_program_cache",
            TraceReason::PrefixMismatch => "prefix_mismatch",
            TraceReason::RepeatedState => "repeated_state",
            TraceReason::SignatureCollision => "signature_collision",
            TraceReason::RandomExtension => "random_extension",
            TraceReason::CollisionExtension => "collision_extension",
            TraceReason::Halt => "halt",
        }
    }
}

impl std::fmt::Display for TraceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded candidate evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// The target prefix the search was working towards.
    pub target_prefix: String,
    /// The opcode suffix under evaluation.
    pub candidate: String,
    /// The full output of the extended candidate, if it was evaluated.
    pub output: Option<String>,
    pub pruned: bool,
    pub reason: TraceReason,
    pub cache_hit: bool,
    /// The evaluation counter at record time.
    pub evaluations: u64,
    /// The cache hit counter at record time.
    pub cache_hits: u64,
    /// The search depth the candidate was tried at.
    pub depth: usize,
}
