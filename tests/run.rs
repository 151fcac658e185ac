//! End-to-end scenarios: assemble a source text, run it, assert the
//! observable output.

use bbx_asm::{ContainerError, PanicReason};
use bbx_vm::prelude::*;
use bbx_vm::util::capture_console;

fn run_with_input(source: &str, input: &str) -> (u8, String, String) {
    let container = bbx_asm::assemble(source).expect("assembles");
    let (console, out, err) = capture_console(input);
    let mut vm = Interpreter::new().with_console(console);
    vm.load(container).expect("loads");
    let state = vm.run().expect("runs");
    (state.exit_code(), out.text(), err.text())
}

fn run(source: &str) -> (u8, String) {
    let (code, out, _err) = run_with_input(source, "");
    (code, out)
}

#[test]
fn minimal_hello() {
    let source = "\
%asm
%main
.start:
WRITE stdout, \"hi\"
NEWLINE
HALT
";
    assert_eq!(run(source), (0, "hi\n".to_owned()));
}

#[test]
fn register_arithmetic() {
    let source = "\
%asm
%main
.start:
MOV R0, 3
MOV R1, 4
ADD R0, R1
PRINTREG R0
HALT
";
    assert_eq!(run(source), (0, "7".to_owned()));
}

#[test]
fn loop_with_cmp_and_jl() {
    let source = "\
%asm
%main
.start:
MOV R0, 0
.loop:
PRINTREG R0
NEWLINE
INC R0
MOV R1, 3
CMP R0, R1
JL loop
HALT
";
    assert_eq!(run(source), (0, "0\n1\n2\n".to_owned()));
}

#[test]
fn data_table_string() {
    let source = "\
%asm
%data
STR $msg, \"abc\"
%main
.start:
LOADSTR $msg, R0
PRINTSTR R0
HALT
";
    assert_eq!(run(source), (0, "abc".to_owned()));
}

#[test]
fn call_with_frame() {
    let source = "\
%asm
%main
.start:
CALL inc1, 0
PRINTREG R0
HALT
.inc1:
FRAME 0
MOV R0, 42
RET
";
    assert_eq!(run(source), (0, "42".to_owned()));
}

#[test]
fn macro_expansion_with_label_hygiene() {
    let source = "\
%asm
%macro twice
@@again:
PRINTREG R0
INC R0
%endmacro
%main
.start:
MOV R0, 0
%twice
%twice
HALT
";
    assert_eq!(run(source), (0, "01".to_owned()));
}

#[test]
fn write_reaches_the_named_stream() {
    let source = "\
%asm
%main
.start:
WRITE stdout, \"out\"
WRITE stderr, \"err\"
HALT
";
    let (code, out, err) = run_with_input(source, "");
    assert_eq!((code, out.as_str(), err.as_str()), (0, "out", "err"));
}

#[test]
fn multiple_data_strings_print_independently() {
    let source = "\
%asm
%data
STR $first, \"one\"
STR $second, \"two\"
%main
.start:
LOADSTR $second, R0
PRINTSTR R0
LOADSTR $first, R1
PRINTSTR R1
HALT
";
    assert_eq!(run(source), (0, "twoone".to_owned()));
}

#[test]
fn readstr_pushes_a_tagged_stack_string() {
    let source = "\
%asm
%main
.start:
READSTR R0
PRINTSTR R0
NEWLINE
HALT
";
    let (code, out, _) = run_with_input(source, "echo me\n");
    assert_eq!((code, out.as_str()), (0, "echo me\n"));
}

#[test]
fn read_parses_decimal_lines() {
    let source = "\
%asm
%main
.start:
READ R0
READ R1
ADD R0, R1
PRINTREG R0
HALT
";
    let (_, out, _) = run_with_input(source, "40\n2\n");
    assert_eq!(out, "42");
}

#[test]
fn readchar_reads_bytes_and_signals_eof() {
    let source = "\
%asm
%main
.start:
READCHAR R0
PRINTREG R0
NEWLINE
READCHAR R1
PRINTREG R1
NEWLINE
HALT
";
    let (_, out, _) = run_with_input(source, "A");
    assert_eq!(out, "65\n-1\n");
}

#[test]
fn rand_respects_inclusive_bounds() {
    let source = "\
%asm
%main
.start:
RAND R0, 10, 20
RAND R1, 20, 10
HALT
";
    for _ in 0..64 {
        let container = bbx_asm::assemble(source).unwrap();
        let (console, _out, _err) = capture_console("");
        let mut vm = Interpreter::new().with_console(console);
        vm.load(container).unwrap();
        vm.run().unwrap();

        // reversed bounds swap rather than fault
        assert!((10..=20).contains(&vm.registers()[0]));
        assert!((10..=20).contains(&vm.registers()[1]));
    }
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("scratch.bin");
    let path = path.to_str().expect("utf8 path");

    let source = format!(
        "\
%asm
%main
.start:
FOPEN w, F0, \"{path}\"
FWRITE F0, 65
MOV R0, 66
FWRITE F0, R0
FCLOSE F0
FOPEN r, F1, \"{path}\"
FSEEK F1, 1
FREAD F1, R1
PRINTREG R1
NEWLINE
FREAD F1, R2
PRINTREG R2
NEWLINE
FCLOSE F1
HALT
"
    );

    let (code, out) = run(&source);
    assert_eq!((code, out.as_str()), (0, "66\n-1\n"));
    assert_eq!(std::fs::read(path).unwrap(), b"AB");
}

#[test]
fn reading_an_unopened_descriptor_is_fatal() {
    let container = bbx_asm::assemble("%asm\n%main\n.s:\nFREAD F0, R0\nHALT\n").unwrap();
    let (console, _out, _err) = capture_console("");
    let mut vm = Interpreter::new().with_console(console);
    vm.load(container).unwrap();

    let err = vm.run().unwrap_err();
    assert_eq!(err.panic_reason(), Some(PanicReason::FileNotOpen));
}

#[test]
fn containers_are_validated_at_load_time() {
    let mut vm = Interpreter::new();
    let err = vm.load(b"ELF\x00\x00\x00\x00\x00".to_vec()).unwrap_err();
    assert!(matches!(
        err,
        InterpreterError::Container(ContainerError::BadMagic)
    ));

    let mut vm = Interpreter::new();
    let err = vm.load(b"BB".to_vec()).unwrap_err();
    assert!(matches!(
        err,
        InterpreterError::Container(ContainerError::Truncated(2))
    ));

    let mut vm = Interpreter::new();
    let err = vm.load(b"BBX\x01\x10\x00\x00\x00".to_vec()).unwrap_err();
    assert!(matches!(
        err,
        InterpreterError::Container(ContainerError::DataTableOverrun { .. })
    ));
}

#[test]
fn sleep_blocks_for_roughly_the_requested_time() {
    let started = std::time::Instant::now();
    run("%asm\n%main\n.s:\nSLEEP 30\nHALT\n");
    assert!(started.elapsed() >= std::time::Duration::from_millis(30));
}
