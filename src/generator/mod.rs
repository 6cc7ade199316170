//! Program generation for Malbolge.
//!
//! The search extends a current prefix with short opcode suffixes, runs
//! every candidate through snapshot resumption on the interpreter and
//! prunes on output prefixes, a dead program cache and repeated state
//! signatures. Given a fixed seed the whole search is deterministic.

mod state;

use std::time::Instant;

use hashbrown::{HashMap, HashSet};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

pub use state::{GenerationStats, TraceEvent, TraceReason};
use state::{PrefixState, SearchCounters, StateSignature};

use crate::{
    definitions::generator::{BOOTSTRAP_FILLER, MAX_SEARCH_DEPTH, OPCODE_CHOICES},
    definitions::ternary::MAX_ADDRESS_SPACE,
    encoding::reverse_normalize,
    interpreter::{Interpreter, RunOptions},
    EncodingError, GenerationError,
};

/// split up tests into an other file for simpler implementation
#[cfg(test)]
mod tests;

/// The knobs of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// The opcodes tried when extending a candidate.
    pub opcode_choices: String,
    /// The breadth first depth before a randomized commit.
    pub max_search_depth: usize,
    /// The seed of the commit randomization; unseeded runs draw from OS
    /// entropy and give up determinism.
    pub random_seed: Option<u64>,
    /// The hard upper bound on the generated opcode length.
    pub max_program_length: usize,
    /// Record every candidate evaluation into the result trace.
    pub capture_trace: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            opcode_choices: OPCODE_CHOICES.to_string(),
            max_search_depth: MAX_SEARCH_DEPTH,
            random_seed: None,
            max_program_length: MAX_ADDRESS_SPACE,
            capture_trace: false,
        }
    }
}

/// The outcome of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub target: String,
    /// The generated opcode sequence, always ending in `v`.
    pub opcodes: String,
    /// The output of the generated opcodes, equals the target on success.
    pub machine_output: String,
    pub stats: GenerationStats,
    /// The recorded candidate evaluations, empty unless tracing was on.
    pub trace: Vec<TraceEvent>,
}

impl GenerationResult {
    /// Will encode the generated opcodes into their printable ASCII form.
    pub fn malbolge_program(&self) -> Result<String, EncodingError> {
        reverse_normalize(&self.opcodes, 0)
    }
}

/// Searches for a program whose output equals a caller supplied target.
///
/// A generator owns its interpreter and all of its caches; parallel
/// generation takes distinct generator instances.
pub struct ProgramGenerator {
    interpreter: Interpreter,
}

impl Default for ProgramGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramGenerator {
    /// Will create a generator with a default configured interpreter.
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// Will create a generator running on the given interpreter.
    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    /// Will search for an opcode sequence that prints the target and then
    /// halts.
    ///
    /// Running the returned opcodes through a fresh interpreter yields
    /// exactly `machine_output == target`.
    pub fn generate_for_string(
        &self,
        target: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult, GenerationError> {
        if target.is_empty() {
            return Err(GenerationError::EmptyTarget);
        }

        let started = Instant::now();
        let mut search = Search::new(&self.interpreter, config);
        let final_state = search.run(target)?;

        let duration_ns = started.elapsed().as_nanos();
        let counters = search.counters;
        let total_pruned = counters.pruned;
        let total_repeated = counters.repeated_state_pruned + counters.signature_collisions;
        let trace = search.trace.take().unwrap_or_default();

        let stats = GenerationStats {
            evaluations: counters.evaluations,
            cache_hits: counters.cache_hits,
            pruned: total_pruned,
            repeated_state_pruned: total_repeated,
            duration_ns,
            trace_length: trace.len(),
            pruned_ratio: ratio(total_pruned, counters.evaluations),
            repeated_state_ratio: ratio(total_repeated, total_pruned),
        };

        Ok(GenerationResult {
            target: target.to_string(),
            opcodes: final_state.opcodes,
            machine_output: final_state.output,
            stats,
            trace,
        })
    }
}

/// The ratio of two counters under the `0/0 = 0` convention.
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// The working state of one generation run.
struct Search<'a> {
    interpreter: &'a Interpreter,
    cfg: &'a GenerationConfig,
    rng: StdRng,
    counters: SearchCounters,
    /// Evaluated candidate programs by their full opcode string.
    state_cache: HashMap<String, PrefixState>,
    /// Candidate programs known to be non viable.
    dead_programs: HashSet<String>,
    /// Best known output length per fallback signature.
    seen_states: HashMap<StateSignature, usize>,
    /// Best known output length per canonical signature.
    canonical_signatures: HashMap<StateSignature, usize>,
    trace: Option<Vec<TraceEvent>>,
}

impl<'a> Search<'a> {
    fn new(interpreter: &'a Interpreter, cfg: &'a GenerationConfig) -> Self {
        let rng = match cfg.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            interpreter,
            cfg,
            rng,
            counters: SearchCounters::default(),
            state_cache: HashMap::new(),
            dead_programs: HashSet::new(),
            seen_states: HashMap::new(),
            canonical_signatures: HashMap::new(),
            trace: if cfg.capture_trace {
                Some(Vec::new())
            } else {
                None
            },
        }
    }

    fn run(&mut self, target: &str) -> Result<PrefixState, GenerationError> {
        let mut prefix_state = self.bootstrap()?;

        for index in 0..target.chars().count() {
            let target_prefix: String = target.chars().take(index + 1).collect();
            let mut combinations = self.choice_list();
            let mut depth = 0;
            let mut found = false;

            while !found {
                depth += 1;
                for candidate in combinations.iter() {
                    let suffix = format!("{}<", candidate);
                    let program_key = format!("{}{}", prefix_state.opcodes, suffix);
                    if self.dead_programs.contains(&program_key) {
                        self.counters.pruned += 1;
                        self.record_trace(
                            &suffix,
                            None,
                            true,
                            TraceReason::DeadProgramCache,
                            false,
                            depth,
                            &target_prefix,
                        );
                        continue;
                    }

                    let (combined_state, from_cache) = self.get_or_extend(&prefix_state, &suffix)?;
                    let signature = StateSignature::canonical(&combined_state.machine);
                    let fallback_key = StateSignature::fallback(&combined_state.machine);
                    let output_length = combined_state.output.chars().count();
                    let known_output_length = self.seen_states.get(&fallback_key).copied();
                    let is_new_state =
                        known_output_length.map_or(true, |known| output_length > known);
                    let previous_signature_output =
                        self.canonical_signatures.get(&signature).copied();
                    let is_new_by_signature =
                        previous_signature_output.map_or(true, |previous| output_length > previous);
                    let valid_prefix = target.starts_with(combined_state.output.as_str());

                    let mut pruned = false;
                    let mut reason = TraceReason::CandidateRetained;

                    if valid_prefix && combined_state.output == target_prefix {
                        self.seen_states.insert(
                            fallback_key,
                            known_output_length.unwrap_or(0).max(output_length),
                        );
                        self.canonical_signatures.insert(
                            signature,
                            previous_signature_output.unwrap_or(0).max(output_length),
                        );
                        found = true;
                        reason = TraceReason::Accepted;
                    } else if !valid_prefix {
                        self.counters.pruned += 1;
                        self.dead_programs.insert(program_key);
                        pruned = true;
                        reason = TraceReason::PrefixMismatch;
                    } else if !is_new_state {
                        self.counters.pruned += 1;
                        self.counters.repeated_state_pruned += 1;
                        self.state_cache.remove(&program_key);
                        self.dead_programs.insert(program_key);
                        pruned = true;
                        reason = TraceReason::RepeatedState;
                    } else {
                        if !is_new_by_signature {
                            self.counters.signature_collisions += 1;
                            reason = TraceReason::SignatureCollision;
                        }
                        if known_output_length.map_or(true, |known| output_length > known) {
                            self.seen_states.insert(fallback_key, output_length);
                        }
                        if previous_signature_output.map_or(true, |previous| output_length > previous)
                        {
                            self.canonical_signatures.insert(signature, output_length);
                        }
                    }

                    self.record_trace(
                        &suffix,
                        Some(combined_state.output.as_str()),
                        pruned,
                        reason,
                        from_cache,
                        depth,
                        &target_prefix,
                    );
                    if pruned {
                        continue;
                    }
                    if found {
                        prefix_state = combined_state;
                        break;
                    }
                }

                if found {
                    break;
                }

                let mut next_frontier = Vec::new();
                for base in combinations.iter() {
                    for opcode in self.cfg.opcode_choices.chars() {
                        let candidate = format!("{}{}", base, opcode);
                        let candidate_key = format!("{}{}<", prefix_state.opcodes, candidate);
                        if self.dead_programs.contains(&candidate_key) {
                            continue;
                        }
                        next_frontier.push(candidate);
                    }
                }
                combinations = next_frontier;

                if combinations.is_empty() {
                    return Err(GenerationError::SearchExhausted(target_prefix));
                }

                if depth >= self.cfg.max_search_depth {
                    let random_choice = {
                        let viable: Vec<&String> = combinations
                            .iter()
                            .filter(|candidate| {
                                let key = format!("{}{}<", prefix_state.opcodes, candidate);
                                !self.dead_programs.contains(&key)
                            })
                            .collect();
                        viable.choose(&mut self.rng).map(|choice| (*choice).clone())
                    };
                    let random_choice = match random_choice {
                        Some(choice) => choice,
                        None => {
                            combinations = self.choice_list();
                            depth = 0;
                            continue;
                        }
                    };

                    let random_key = format!("{}{}", prefix_state.opcodes, random_choice);
                    let (random_state, random_from_cache) =
                        self.get_or_extend(&prefix_state, &random_choice)?;
                    let random_signature = StateSignature::canonical(&random_state.machine);
                    let random_fallback = StateSignature::fallback(&random_state.machine);
                    let random_output_length = random_state.output.chars().count();
                    let random_known_length = self.seen_states.get(&random_fallback).copied();
                    let random_is_new =
                        random_known_length.map_or(true, |known| random_output_length > known);
                    let random_previous =
                        self.canonical_signatures.get(&random_signature).copied();
                    let random_is_new_by_signature =
                        random_previous.map_or(true, |previous| random_output_length > previous);

                    let mut random_pruned = false;
                    let mut random_reason = TraceReason::RandomExtension;
                    if !random_is_new {
                        self.counters.pruned += 1;
                        self.counters.repeated_state_pruned += 1;
                        self.state_cache.remove(&random_key);
                        random_pruned = true;
                        random_reason = TraceReason::RepeatedState;
                    } else {
                        if !random_is_new_by_signature {
                            self.counters.signature_collisions += 1;
                            random_reason = TraceReason::CollisionExtension;
                        }
                        if random_known_length
                            .map_or(true, |known| random_output_length > known)
                        {
                            self.seen_states.insert(random_fallback, random_output_length);
                        }
                        if random_previous.map_or(true, |previous| random_output_length > previous)
                        {
                            self.canonical_signatures
                                .insert(random_signature, random_output_length);
                        }
                    }
                    self.record_trace(
                        &random_choice,
                        Some(random_state.output.as_str()),
                        random_pruned,
                        random_reason,
                        random_from_cache,
                        depth,
                        &target_prefix,
                    );
                    if random_pruned {
                        combinations = self.choice_list();
                        depth = 0;
                        continue;
                    }
                    prefix_state = random_state;
                    combinations = self.choice_list();
                    depth = 0;
                }
            }
        }

        self.finalize(prefix_state, target)
    }

    /// Will execute the fixed bootstrap and seed the signature maps with
    /// its state.
    fn bootstrap(&mut self) -> Result<PrefixState, GenerationError> {
        let mut opcodes = String::with_capacity(BOOTSTRAP_FILLER + 1);
        opcodes.push('i');
        for _ in 0..BOOTSTRAP_FILLER {
            opcodes.push('o');
        }
        if opcodes.len() >= self.cfg.max_program_length {
            return Err(GenerationError::BootstrapTooLong);
        }

        let result = self.interpreter.execute(
            &opcodes,
            RunOptions {
                capture_machine: true,
                ..Default::default()
            },
        )?;
        let machine = result.machine.ok_or(GenerationError::MissingSnapshot)?;
        let state = PrefixState {
            opcodes,
            output: result.output,
            machine,
        };

        let output_length = state.output.chars().count();
        self.seen_states
            .insert(StateSignature::fallback(&state.machine), output_length);
        self.canonical_signatures
            .insert(StateSignature::canonical(&state.machine), output_length);
        self.state_cache.insert(state.opcodes.clone(), state.clone());
        Ok(state)
    }

    /// Will extend the accepted last character with the halt instruction.
    fn finalize(
        &mut self,
        prefix_state: PrefixState,
        target: &str,
    ) -> Result<PrefixState, GenerationError> {
        let (final_state, final_from_cache) = self.get_or_extend(&prefix_state, "v")?;
        let final_fallback = StateSignature::fallback(&final_state.machine);
        let final_signature = StateSignature::canonical(&final_state.machine);
        let final_output_length = final_state.output.chars().count();
        self.seen_states.insert(final_fallback, final_output_length);
        let previous = self
            .canonical_signatures
            .get(&final_signature)
            .copied()
            .unwrap_or(0);
        self.canonical_signatures
            .insert(final_signature, previous.max(final_output_length));
        self.record_trace(
            "v",
            Some(final_state.output.as_str()),
            false,
            TraceReason::Halt,
            final_from_cache,
            0,
            target,
        );
        Ok(final_state)
    }

    /// Will answer an extension from the cache or evaluate it on the
    /// interpreter.
    fn get_or_extend(
        &mut self,
        state: &PrefixState,
        suffix: &str,
    ) -> Result<(PrefixState, bool), GenerationError> {
        let candidate_key = format!("{}{}", state.opcodes, suffix);
        if let Some(cached) = self.state_cache.get(&candidate_key) {
            self.counters.cache_hits += 1;
            return Ok((cached.clone(), true));
        }

        let extended = self.extend(state, suffix)?;
        self.state_cache.insert(candidate_key, extended.clone());
        Ok((extended, false))
    }

    /// Will run the suffix on top of the state's snapshot.
    fn extend(
        &mut self,
        state: &PrefixState,
        suffix: &str,
    ) -> Result<PrefixState, GenerationError> {
        if suffix.is_empty() {
            return Ok(state.clone());
        }
        if state.opcodes.len() + suffix.len() > self.cfg.max_program_length {
            return Err(GenerationError::ProgramLengthExceeded);
        }

        let result = self.interpreter.execute_from_snapshot(
            &state.machine,
            suffix,
            RunOptions {
                capture_machine: true,
                ..Default::default()
            },
        )?;
        self.counters.evaluations += 1;
        let machine = result.machine.ok_or(GenerationError::MissingSnapshot)?;

        Ok(PrefixState {
            opcodes: format!("{}{}", state.opcodes, suffix),
            output: format!("{}{}", state.output, result.output),
            machine,
        })
    }

    fn record_trace(
        &mut self,
        candidate: &str,
        output: Option<&str>,
        pruned: bool,
        reason: TraceReason,
        cache_hit: bool,
        depth: usize,
        target_prefix: &str,
    ) {
        log::debug!(
            "generation trace event: status={} candidate={} pruned={} cache_hit={} depth={}",
            reason,
            candidate,
            pruned,
            cache_hit,
            depth
        );

        let trace = match self.trace.as_mut() {
            Some(trace) => trace,
            None => return,
        };
        trace.push(TraceEvent {
            target_prefix: target_prefix.to_string(),
            candidate: candidate.to_string(),
            output: output.map(str::to_string),
            pruned,
            reason,
            cache_hit,
            evaluations: self.counters.evaluations,
            cache_hits: self.counters.cache_hits,
            depth,
        });
    }

    fn choice_list(&self) -> Vec<String> {
        self.cfg
            .opcode_choices
            .chars()
            .map(|opcode| opcode.to_string())
            .collect()
    }
}
