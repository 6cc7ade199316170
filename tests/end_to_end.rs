use malbolge::encoding::{normalize, reverse_normalize};
use malbolge::input::BufferInput;
use malbolge::interpreter::HaltReason;
use malbolge::{ExecutionError, GenerationConfig, Interpreter, ProgramGenerator, RunOptions};

#[test]
fn test_halt_program_through_public_api() {
    let interpreter = Interpreter::new();
    let result = interpreter.execute("v", RunOptions::default()).unwrap();

    assert_eq!(result.output, "");
    assert!(result.halted);
    assert_eq!(result.steps, 1);
    assert_eq!(result.halt_reason, HaltReason::HaltOpcode);
}

#[test]
fn test_echo_program_through_public_api() {
    let interpreter = Interpreter::new();
    let mut input = BufferInput::from("A");
    let output = interpreter
        .run(
            "/<v",
            RunOptions {
                input: Some(&mut input),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(output, "A");
}

#[test]
fn test_underflow_surfaces_unchanged() {
    let interpreter = Interpreter::new();
    assert_eq!(
        interpreter.execute("/v", RunOptions::default()),
        Err(ExecutionError::InputUnderflow)
    );
}

#[test]
fn test_ascii_program_form_replays_like_the_opcodes() {
    let opcodes = "oo*pv";
    let ascii = reverse_normalize(opcodes, 0).unwrap();
    assert_eq!(normalize(&ascii).unwrap(), opcodes);

    let from_opcodes = Interpreter::new()
        .execute(opcodes, RunOptions::default())
        .unwrap();
    let from_ascii = Interpreter::new()
        .execute(&normalize(&ascii).unwrap(), RunOptions::default())
        .unwrap();
    assert_eq!(from_opcodes, from_ascii);
}

#[test]
fn test_generated_program_replays_into_target() {
    let generator = ProgramGenerator::new();
    let config = GenerationConfig {
        random_seed: Some(1234),
        ..Default::default()
    };
    let result = generator.generate_for_string("A", &config).unwrap();

    assert!(result.opcodes.ends_with('v'));
    assert_eq!(result.machine_output, "A");

    let interpreter = Interpreter::new();
    let replayed = interpreter
        .run(&result.opcodes, RunOptions::default())
        .unwrap();
    assert_eq!(replayed, "A");

    // the printable ASCII form of the program normalizes back to the opcodes
    let ascii = result.malbolge_program().unwrap();
    assert_eq!(normalize(&ascii).unwrap(), result.opcodes);
}

#[test]
fn test_independent_generators_agree_on_a_seed() {
    let config = GenerationConfig {
        random_seed: Some(42),
        ..Default::default()
    };
    let result_one = ProgramGenerator::new()
        .generate_for_string("Hi", &config)
        .unwrap();
    let result_two = ProgramGenerator::new()
        .generate_for_string("Hi", &config)
        .unwrap();

    assert_eq!(result_one.opcodes, result_two.opcodes);
    assert_eq!(result_one.machine_output, result_two.machine_output);
    assert_eq!(result_one.stats.evaluations, result_two.stats.evaluations);
    assert_eq!(result_one.stats.cache_hits, result_two.stats.cache_hits);
    assert_eq!(result_one.stats.pruned, result_two.stats.pruned);
}
