use super::{ratio, GenerationConfig, ProgramGenerator, TraceReason};
use crate::{interpreter::Interpreter, interpreter::RunOptions, GenerationError};

/// will setup the default configured generator
pub(super) fn get_default_generator() -> ProgramGenerator {
    ProgramGenerator::new()
}

#[test]
fn test_generate_simple_string() {
    let generator = get_default_generator();
    let config = GenerationConfig {
        random_seed: Some(1234),
        ..Default::default()
    };
    let result = generator.generate_for_string("A", &config).unwrap();

    assert_eq!(result.target, "A");
    assert_eq!(result.machine_output, "A");
    assert!(result.opcodes.ends_with('v'));
    assert!(!result.malbolge_program().unwrap().is_empty());
    assert!(result.stats.evaluations > 0);
    assert!(result.stats.duration_ns > 0);
    assert!(result.stats.pruned_ratio >= 0.0);
    assert!(result.stats.repeated_state_ratio >= 0.0);
    assert_eq!(result.stats.trace_length, 0);
    assert!(result.trace.is_empty());

    // the generated opcodes replay into the target on a fresh machine
    let interpreter = Interpreter::new();
    let output = interpreter
        .run(&result.opcodes, RunOptions::default())
        .unwrap();
    assert_eq!(output, "A");
}

#[test]
fn test_generation_is_deterministic_with_seed() {
    let config = GenerationConfig {
        random_seed: Some(42),
        ..Default::default()
    };
    let generator_one = get_default_generator();
    let generator_two = get_default_generator();

    let result_one = generator_one.generate_for_string("Hi", &config).unwrap();
    let result_two = generator_two.generate_for_string("Hi", &config).unwrap();

    assert_eq!(result_one.opcodes, result_two.opcodes);
    assert_eq!(result_one.machine_output, result_two.machine_output);
    assert_eq!(result_one.machine_output, "Hi");
    assert!(result_one.stats.duration_ns > 0);
    assert!(result_two.stats.duration_ns > 0);
    assert_eq!(result_one.stats.evaluations, result_two.stats.evaluations);
    assert_eq!(result_one.stats.cache_hits, result_two.stats.cache_hits);
    assert_eq!(result_one.stats.pruned, result_two.stats.pruned);
    assert_eq!(
        result_one.stats.repeated_state_pruned,
        result_two.stats.repeated_state_pruned
    );
    assert_eq!(result_one.stats.trace_length, result_two.stats.trace_length);
    assert!(result_one.trace.is_empty());
    assert!(result_two.trace.is_empty());
}

#[test]
fn test_empty_target_fails_fast() {
    let generator = get_default_generator();
    assert_eq!(
        generator.generate_for_string("", &GenerationConfig::default()),
        Err(GenerationError::EmptyTarget)
    );
}

#[test]
fn test_bootstrap_must_fit_the_length_limit() {
    let generator = get_default_generator();
    let config = GenerationConfig {
        max_program_length: 50,
        ..Default::default()
    };
    assert_eq!(
        generator.generate_for_string("A", &config),
        Err(GenerationError::BootstrapTooLong)
    );
}

#[test]
fn test_capture_trace_records_events() {
    let generator = get_default_generator();
    let config = GenerationConfig {
        random_seed: Some(1234),
        capture_trace: true,
        ..Default::default()
    };
    let result = generator.generate_for_string("Hi", &config).unwrap();

    assert!(result.stats.trace_length > 0);
    assert_eq!(result.stats.trace_length, result.trace.len());

    let first_event = &result.trace[0];
    assert!(!first_event.candidate.is_empty());
    assert_eq!(first_event.target_prefix, "H");

    let last_event = result.trace.last().unwrap();
    assert_eq!(last_event.reason, TraceReason::Halt);
    assert_eq!(last_event.candidate, "v");
    assert!(!last_event.pruned);

    // the counters are consistent with the recorded events
    let evaluated = result
        .trace
        .iter()
        .filter(|event| event.output.is_some() && !event.cache_hit)
        .count() as u64;
    assert_eq!(evaluated, result.stats.evaluations);
}

#[test]
fn test_trace_reason_identifiers() {
    assert_eq!(TraceReason::Accepted.as_str(), "accepted");
    assert_eq!(TraceReason::DeadProgramCache.as_str(), "dead_program_cache");
    assert_eq!(TraceReason::PrefixMismatch.as_str(), "prefix_mismatch");
    assert_eq!(TraceReason::RepeatedState.as_str(), "repeated_state");
    assert_eq!(
        TraceReason::SignatureCollision.as_str(),
        "signature_collision"
    );
    assert_eq!(TraceReason::Halt.as_str(), "halt");
}

#[test]
/// the canonical signature folds the accumulator, the fallback keeps it
fn test_signatures_fold_the_accumulator_differently() {
    use super::state::StateSignature;
    use crate::interpreter::Machine;

    let mut folded = Machine::new();
    folded.tape = vec![40, 41, 42];
    folded.a = 300;
    let mut plain = folded.clone();
    plain.a = 300 % 256;

    assert_eq!(
        StateSignature::canonical(&folded),
        StateSignature::canonical(&plain)
    );
    assert_ne!(
        StateSignature::fallback(&folded),
        StateSignature::fallback(&plain)
    );
}

#[test]
fn test_ratio_convention() {
    assert_eq!(ratio(0, 0), 0.0);
    assert_eq!(ratio(5, 0), 0.0);
    assert_eq!(ratio(1, 4), 0.25);
}
