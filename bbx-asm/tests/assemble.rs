use bbx_asm::{assemble, AsmError, ContainerHeader, Instruction, Opcode, FIXED_HEADER_SIZE, MAGIC};

/// Decode the code region of a container back into instructions.
fn disassemble(container: &[u8]) -> Vec<Instruction> {
    let header = ContainerHeader::parse(container).expect("valid header");
    let mut at = header.code_base();
    let mut out = Vec::new();
    while at < container.len() {
        let (instruction, next) = Instruction::decode(container, at).expect("valid code");
        out.push(instruction);
        at = next;
    }
    out
}

#[test]
fn minimal_hello() {
    let container = assemble("%asm\n%main\n.start:\nWRITE stdout, \"hi\"\nNEWLINE\nHALT\n").unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(&MAGIC);
    expected.push(0); // no data entries
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend_from_slice(&[Opcode::WRITE as u8, 1, 2, b'h', b'i']);
    expected.push(Opcode::NEWLINE as u8);
    expected.push(Opcode::HALT as u8);

    assert_eq!(container, expected);
}

#[test]
fn parsing_is_case_insensitive() {
    let upper = "%asm\n%main\n.start:\nMOV R0, 3\nPRINTREG R0\nHALT\n";
    let lower = "%ASM\n%MAIN\n.START:\nmov r0, 3\nprintreg r0\nhalt\n";
    assert_eq!(assemble(upper).unwrap(), assemble(lower).unwrap());
}

#[test]
fn label_addresses_are_absolute_container_offsets() {
    let container = assemble(
        "%asm\n%main\n.start:\nMOV R0, 0\n.loop:\nINC R0\nJMP loop\nHALT\n",
    )
    .unwrap();

    // code base 8; MOV imm is 6 bytes, so .loop sits at 14
    let jmp_at = FIXED_HEADER_SIZE + 6 + 2;
    assert_eq!(container[jmp_at], Opcode::JMP as u8);
    assert_eq!(&container[jmp_at + 1..jmp_at + 5], &14u32.to_le_bytes());
}

#[test]
fn data_table_offsets_flow_into_operands() {
    let container = assemble(
        "%asm\n%data\nSTR $msg, \"abc\"\nBYTE $b, 255\n%main\n.start:\nLOADSTR $msg, R0\nLOADBYTE R1, $b\nHALT\n",
    )
    .unwrap();

    let header = ContainerHeader::parse(&container).unwrap();
    assert_eq!(header.data_count, 2);
    assert_eq!(header.data_size, 5);
    assert_eq!(&container[FIXED_HEADER_SIZE..header.code_base()], b"abc\x00\xff");

    assert_eq!(
        disassemble(&container),
        vec![
            Instruction::LoadStr(0, 0),
            Instruction::LoadByte(1, 4),
            Instruction::Halt,
        ]
    );
}

#[test]
fn data_reference_operands_accept_either_order() {
    let a = assemble("%asm\n%data\nSTR $m, \"x\"\n%main\n.s:\nLOADSTR $m, R3\nHALT\n").unwrap();
    let b = assemble("%asm\n%data\nSTR $m, \"x\"\n%main\n.s:\nLOADSTR R3, $m\nHALT\n").unwrap();
    assert_eq!(a, b);
}

#[test]
fn call_uses_the_frame_hint_of_its_label() {
    let container = assemble(
        "%asm\n%main\n.start:\nCALL fn\nHALT\n.fn:\nFRAME 2\nRET\n",
    )
    .unwrap();

    assert_eq!(
        disassemble(&container),
        vec![
            Instruction::Call { addr: 18, frame: 2 },
            Instruction::Halt,
            Instruction::Ret,
        ]
    );
}

#[test]
fn explicit_call_frame_overrides_the_hint() {
    let container = assemble(
        "%asm\n%main\n.start:\nCALL fn, 5\nHALT\n.fn:\nFRAME 2\nRET\n",
    )
    .unwrap();

    assert_eq!(disassemble(&container)[0], Instruction::Call { addr: 18, frame: 5 });
}

#[test]
fn halt_codes() {
    let container = assemble("%asm\n%main\n.s:\nHALT OK\n").unwrap();
    assert_eq!(disassemble(&container), vec![Instruction::HaltCode(0)]);

    let container = assemble("%asm\n%main\n.s:\nHALT BAD\n").unwrap();
    assert_eq!(disassemble(&container), vec![Instruction::HaltCode(1)]);

    let container = assemble("%asm\n%main\n.s:\nHALT 300\n").unwrap();
    assert_eq!(disassemble(&container), vec![Instruction::HaltCode(44)]);
}

#[test]
fn write_strings_are_clipped_to_255_bytes() {
    let long = "x".repeat(300);
    let container = assemble(&format!("%asm\n%main\n.s:\nWRITE stderr, \"{long}\"\nHALT\n")).unwrap();

    let Instruction::Write { fd, bytes } = &disassemble(&container)[0] else {
        panic!("expected a WRITE");
    };
    assert_eq!(*fd, 2);
    assert_eq!(bytes.len(), 255);
}

#[test]
fn macro_labels_expand_without_collisions() {
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
    let container = assemble(source).unwrap();
    assert_eq!(
        disassemble(&container)
            .iter()
            .map(Instruction::opcode)
            .collect::<Vec<_>>(),
        vec![
            Opcode::MOVIMM,
            Opcode::PRINTREG,
            Opcode::INC,
            Opcode::PRINTREG,
            Opcode::INC,
            Opcode::HALT,
        ]
    );
}

#[test]
fn register_and_immediate_forms_split_per_opcode() {
    let container = assemble(
        "%asm\n%main\n.s:\nLOAD R1, 4\nLOAD R1, R2\nSTOREVAR R3, 0\nSTOREVAR R3, R4\nHALT\n",
    )
    .unwrap();

    assert_eq!(
        disassemble(&container),
        vec![
            Instruction::Load(1, 4),
            Instruction::LoadReg(1, 2),
            Instruction::StoreVar(3, 0),
            Instruction::StoreVarReg(3, 4),
            Instruction::Halt,
        ]
    );
}

#[test]
fn missing_asm_header_is_fatal() {
    assert!(matches!(
        assemble("%main\n.s:\nHALT\n").unwrap_err(),
        AsmError::MissingAsmHeader { line: 1 }
    ));
}

#[test]
fn missing_code_section_is_fatal() {
    assert!(matches!(
        assemble("%asm\n%data\nSTR $m, \"x\"\n").unwrap_err(),
        AsmError::MissingCodeSection
    ));
}

#[test]
fn data_section_after_code_is_fatal() {
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nHALT\n%data\nSTR $m, \"x\"\n").unwrap_err(),
        AsmError::DataAfterCode { line: 5 }
    ));
}

#[test]
fn wrong_section_constructs_are_fatal() {
    assert!(matches!(
        assemble("%asm\nMOV R0, 1\n%main\n.s:\nHALT\n").unwrap_err(),
        AsmError::OutsideSection { line: 2 }
    ));
    assert!(matches!(
        assemble("%asm\n.s:\n%main\nHALT\n").unwrap_err(),
        AsmError::LabelOutsideCode { line: 2 }
    ));
    assert!(matches!(
        assemble("%asm\n%data\nMOV R0, 1\n%main\n.s:\nHALT\n").unwrap_err(),
        AsmError::Syntax { line: 3, .. }
    ));
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nSTR $m, \"x\"\nHALT\n").unwrap_err(),
        AsmError::DataOutsideSection { line: 4, .. }
    ));
}

#[test]
fn unknown_names_are_fatal_with_line_numbers() {
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nJMP nowhere\nHALT\n").unwrap_err(),
        AsmError::UnknownLabel { line: 4, .. }
    ));
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nLOADSTR $ghost, R0\nHALT\n").unwrap_err(),
        AsmError::UnknownData { line: 4, .. }
    ));
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nFLY R0\n").unwrap_err(),
        AsmError::UnknownInstruction { line: 4, .. }
    ));
}

#[test]
fn duplicate_labels_are_fatal() {
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nHALT\n.s:\nHALT\n").unwrap_err(),
        AsmError::DuplicateLabel { line: 5, .. }
    ));
}

#[test]
fn stray_frame_is_fatal() {
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nNEWLINE\nFRAME 2\nHALT\n").unwrap_err(),
        AsmError::StrayFrame { line: 5 }
    ));
}

#[test]
fn bad_register_tokens_are_fatal() {
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nINC R16\n").unwrap_err(),
        AsmError::InvalidRegister { line: 4, .. }
    ));
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nFCLOSE F9\n").unwrap_err(),
        AsmError::InvalidFd { line: 4, .. }
    ));
}

#[test]
fn unterminated_strings_are_fatal() {
    assert!(matches!(
        assemble("%asm\n%main\n.s:\nWRITE stdout, \"oops\nHALT\n").unwrap_err(),
        AsmError::UnterminatedString { line: 4 }
    ));
}
