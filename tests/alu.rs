use bbx_asm::PanicReason;
use bbx_vm::prelude::*;
use bbx_vm::util::capture_console;

use rstest::rstest;

fn run(source: &str) -> (u8, String) {
    let container = bbx_asm::assemble(source).expect("assembles");
    let (console, out, _err) = capture_console("");
    let mut vm = Interpreter::new().with_console(console);
    vm.load(container).expect("loads");
    let state = vm.run().expect("runs");
    (state.exit_code(), out.text())
}

fn run_vm(source: &str) -> Interpreter {
    let container = bbx_asm::assemble(source).expect("assembles");
    let (console, _out, _err) = capture_console("");
    let mut vm = Interpreter::new().with_console(console);
    vm.load(container).expect("loads");
    vm.run().expect("runs");
    vm
}

#[rstest]
#[case("ADD", 3, 4, "7")]
#[case("SUB", 10, 4, "6")]
#[case("MUL", 6, 7, "42")]
#[case("DIV", 42, 5, "8")]
#[case("MOD", 42, 5, "2")]
#[case("AND", 0b1100, 0b1010, "8")]
#[case("OR", 0b1100, 0b1010, "14")]
#[case("XOR", 0b1100, 0b1010, "6")]
fn binary_arithmetic(#[case] op: &str, #[case] a: i64, #[case] b: i64, #[case] expect: &str) {
    let source =
        format!("%asm\n%main\n.start:\nMOV R0, {a}\nMOV R1, {b}\n{op} R0, R1\nPRINTREG R0\nHALT\n");
    assert_eq!(run(&source), (0, expect.to_owned()));
}

#[test]
fn arithmetic_is_signed_64_bit() {
    let (_, out) = run("%asm\n%main\n.s:\nMOV R0, -5\nMOV R1, 3\nMUL R0, R1\nPRINTREG R0\nHALT\n");
    assert_eq!(out, "-15");
}

#[test]
fn unary_operations() {
    let (_, out) = run("%asm\n%main\n.s:\nMOV R0, 0\nNOT R0\nPRINTREG R0\nHALT\n");
    assert_eq!(out, "-1");

    let (_, out) = run("%asm\n%main\n.s:\nMOV R0, 7\nINC R0\nINC R0\nDEC R0\nPRINTREG R0\nHALT\n");
    assert_eq!(out, "8");
}

#[rstest]
#[case("DIV")]
#[case("MOD")]
fn division_by_zero_is_fatal(#[case] op: &str) {
    let source = format!("%asm\n%main\n.s:\nMOV R0, 1\nMOV R1, 0\n{op} R0, R1\nHALT\n");
    let container = bbx_asm::assemble(&source).unwrap();

    let (console, _out, _err) = capture_console("");
    let mut vm = Interpreter::new().with_console(console);
    vm.load(container).unwrap();

    let err = vm.run().unwrap_err();
    assert_eq!(err.panic_reason(), Some(PanicReason::DivisionByZero));
}

/// `CMP ra, rb` leaves 1 in the flags register exactly when `ra < rb`.
#[rstest]
#[case(1, 2, 1)]
#[case(2, 2, 0)]
#[case(3, 2, 0)]
fn cmp_writes_the_flags_register(#[case] a: i64, #[case] b: i64, #[case] flag: i64) {
    let vm = run_vm(&format!("%asm\n%main\n.s:\nMOV R0, {a}\nMOV R1, {b}\nCMP R0, R1\nHALT\n"));
    assert_eq!(vm.registers()[bbx_vm::consts::REG_FLAGS], flag);
}

/// The conditional jumps key off the single compare cell: `JL`, `JB`
/// and `JNE` branch on 1; `JGE`, `JAE` and `JE` branch on 0. Equal and
/// greater-than compares are therefore indistinguishable to `JE`.
#[rstest]
#[case("JL", 1, 2, "T")]
#[case("JL", 2, 2, "F")]
#[case("JGE", 2, 2, "T")]
#[case("JGE", 1, 2, "F")]
#[case("JB", 1, 2, "T")]
#[case("JAE", 3, 2, "T")]
#[case("JE", 2, 2, "T")]
#[case("JE", 3, 2, "T")]
#[case("JE", 1, 2, "F")]
#[case("JNE", 1, 2, "T")]
#[case("JNE", 2, 2, "F")]
fn conditional_jumps(#[case] jump: &str, #[case] a: i64, #[case] b: i64, #[case] expect: &str) {
    let source = format!(
        "%asm\n%main\n.start:\nMOV R0, {a}\nMOV R1, {b}\nCMP R0, R1\n{jump} taken\nPRINT 'F\nHALT\n.taken:\nPRINT 'T\nHALT\n"
    );
    let (_, out) = run(&source);
    assert_eq!(out, expect);
}

/// PUSH then POP into the same register leaves every register
/// untouched, the flags register included.
#[test]
fn push_pop_round_trip_is_a_no_op() {
    let vm = run_vm(
        "%asm\n%main\n.s:\nMOV R3, 99\nMOV R1, 1\nMOV R2, 2\nCMP R1, R2\nPUSH R3\nPOP R3\nHALT\n",
    );
    assert_eq!(vm.registers()[3], 99);
    assert_eq!(vm.registers()[bbx_vm::consts::REG_FLAGS], 1);
    assert_eq!(vm.stack().sp(), 0);
}
