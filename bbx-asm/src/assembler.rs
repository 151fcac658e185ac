//! Two-pass assembler.
//!
//! The macro preprocessor expands the source into an in-memory line
//! stream. Pass one walks the stream tracking the section state machine,
//! builds the data table, assigns label addresses and sizes every
//! instruction; pass two walks it again and emits the container. Both
//! passes parse each line with the same per-mnemonic parser, so the
//! layout size and the emitted width come from the same
//! [`crate::Instruction`] variant and cannot disagree.

mod parse;

use std::collections::HashMap;

use tracing::debug;

use crate::container::{ContainerHeader, DataKind, DataTable, FIXED_HEADER_SIZE};
use crate::lex::{mnemonic, parse_int, quoted, split_operands};
use crate::preprocess::{preprocess, Line};
use crate::AsmError;

use parse::{parse_instruction, Resolver};

/// Assembler section state: before any section, inside `%data`, or
/// inside `%main`/`%entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Data,
    Code,
}

/// A declared label: its absolute container address and the optional
/// frame hint attached by a `FRAME` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    pc: u32,
    frame_hint: Option<u32>,
}

/// Assemble a source text into container bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    let lines = preprocess(source)?;

    let body = match lines.split_first() {
        Some((first, body)) if first.text.eq_ignore_ascii_case("%asm") => body,
        Some((first, _)) => return Err(AsmError::MissingAsmHeader { line: first.number }),
        None => return Err(AsmError::MissingAsmHeader { line: 1 }),
    };

    let (labels, data) = layout(body)?;
    emit(body, &labels, &data)
}

fn section_marker(text: &str) -> Option<Section> {
    if text.eq_ignore_ascii_case("%data") {
        Some(Section::Data)
    } else if text.eq_ignore_ascii_case("%main") || text.eq_ignore_ascii_case("%entry") {
        Some(Section::Code)
    } else {
        None
    }
}

/// A `.NAME:` (or macro-generated `NAME:`) declaration.
fn label_decl(text: &str) -> Option<&str> {
    let body = text.strip_suffix(':')?;
    if body.is_empty() || body.contains(char::is_whitespace) || body.contains('"') {
        return None;
    }
    Some(body.strip_prefix('.').unwrap_or(body))
}

fn data_directive(head: &str) -> Option<DataKind> {
    match head.to_ascii_uppercase().as_str() {
        "STR" => Some(DataKind::Str),
        "BYTE" => Some(DataKind::Byte),
        "WORD" => Some(DataKind::Word),
        "DWORD" => Some(DataKind::Dword),
        "QWORD" => Some(DataKind::Qword),
        _ => None,
    }
}

/// Pass one: build the data table, record labels and frame hints, and
/// account instruction sizes. Label addresses are code-relative until
/// the final shift by the code base.
fn layout(body: &[Line]) -> Result<(HashMap<String, Label>, DataTable), AsmError> {
    let mut section = Section::None;
    let mut found_code = false;
    let mut data = DataTable::default();
    let mut labels: HashMap<String, Label> = HashMap::new();
    let mut pc: u32 = 0;
    let mut last_label: Option<String> = None;

    for Line { number, text } in body {
        let number = *number;

        if let Some(next) = section_marker(text) {
            if next == Section::Data && found_code {
                return Err(AsmError::DataAfterCode { line: number });
            }
            if next == Section::Code {
                found_code = true;
            }
            section = next;
            debug!(line = number, "entering {:?} section", next);
            continue;
        }

        if let Some(name) = label_decl(text) {
            if section != Section::Code {
                return Err(AsmError::LabelOutsideCode { line: number });
            }
            let key = name.to_ascii_lowercase();
            if labels.contains_key(&key) {
                return Err(AsmError::DuplicateLabel {
                    line: number,
                    name: name.to_owned(),
                });
            }
            debug!(line = number, "label {name} at pc={pc}");
            labels.insert(key.clone(), Label { pc, frame_hint: None });
            last_label = Some(key);
            continue;
        }

        match section {
            Section::None => return Err(AsmError::OutsideSection { line: number }),

            Section::Data => {
                push_data(&mut data, text, number)?;
            }

            Section::Code => {
                let (head, rest) = mnemonic(text);
                if data_directive(head).is_some() {
                    return Err(AsmError::DataOutsideSection {
                        line: number,
                        directive: head.to_ascii_uppercase(),
                    });
                }
                if head.eq_ignore_ascii_case("FRAME") {
                    // metadata only; seeds the preceding label's frame hint
                    let hint = frame_size(rest, number)?;
                    let key = last_label.take().ok_or(AsmError::StrayFrame { line: number })?;
                    labels.get_mut(&key).expect("label recorded above").frame_hint = Some(hint);
                    continue;
                }

                last_label = None;
                let instruction = parse_instruction(text, number, &LayoutResolver { data: &data })?;
                pc += instruction.size() as u32;
            }
        }
    }

    if !found_code {
        return Err(AsmError::MissingCodeSection);
    }

    let code_base = (FIXED_HEADER_SIZE as u32) + data.size();
    for label in labels.values_mut() {
        label.pc += code_base;
    }

    Ok((labels, data))
}

/// Pass two: write the header and data table, then re-walk the stream
/// and emit every instruction against the finished tables.
fn emit(body: &[Line], labels: &HashMap<String, Label>, data: &DataTable) -> Result<Vec<u8>, AsmError> {
    let mut out = Vec::new();
    ContainerHeader {
        data_count: data.count(),
        data_size: data.size(),
    }
    .write(&mut out);
    out.extend_from_slice(data.bytes());

    let resolver = EmitResolver { labels, data };
    let mut section = Section::None;

    for Line { number, text } in body {
        let number = *number;

        if let Some(next) = section_marker(text) {
            section = next;
            continue;
        }
        if section != Section::Code || label_decl(text).is_some() {
            continue;
        }

        let (head, _) = mnemonic(text);
        if head.eq_ignore_ascii_case("FRAME") {
            continue;
        }

        let instruction = parse_instruction(text, number, &resolver)?;
        let before = out.len();
        instruction.encode(&mut out);
        debug_assert_eq!(out.len() - before, instruction.size());
        debug!(
            line = number,
            "encoded {} ({} bytes) at {:#06x}",
            instruction.opcode(),
            instruction.size(),
            before,
        );
    }

    Ok(out)
}

fn push_data(data: &mut DataTable, text: &str, line: usize) -> Result<(), AsmError> {
    let (head, rest) = mnemonic(text);
    let Some(kind) = data_directive(head) else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("only data directives are allowed in %data, got `{head}`"),
        });
    };

    let operands = split_operands(rest);
    let (&name_tok, rest_ops) = operands.split_first().ok_or_else(|| AsmError::Syntax {
        line,
        msg: format!("expected {head} $<name>, <value>"),
    })?;
    let name = name_tok.strip_prefix('$').ok_or_else(|| AsmError::Syntax {
        line,
        msg: format!("expected a $<name> operand, got `{name_tok}`"),
    })?;

    let offset = match kind {
        DataKind::Str => {
            let value = quoted(rest, line)?;
            data.push_str(name, value.as_bytes())
        }
        _ => {
            let &[value_tok] = rest_ops else {
                return Err(AsmError::Syntax {
                    line,
                    msg: format!("expected {head} $<name>, <value>"),
                });
            };
            data.push_int(name, kind, parse_int(value_tok, line)?)
        }
    };

    let offset = offset.ok_or_else(|| AsmError::BadDataEntry {
        line,
        name: name.to_owned(),
    })?;
    debug!(line, "data entry ${name} at offset {offset}");

    Ok(())
}

fn frame_size(rest: &str, line: usize) -> Result<u32, AsmError> {
    let trimmed = rest.trim();
    if trimmed.is_empty() {
        return Err(AsmError::Syntax {
            line,
            msg: "expected FRAME <slot count>".into(),
        });
    }
    Ok(parse_int(trimmed, line)? as u32)
}

/// Pass-one resolver: the data table is complete before any code line is
/// reached (the `%data` section must precede the code section), but
/// labels may still be forward references, so they resolve to a
/// placeholder of the same width.
struct LayoutResolver<'a> {
    data: &'a DataTable,
}

impl Resolver for LayoutResolver<'_> {
    fn label(&self, _name: &str, _line: usize) -> Result<u32, AsmError> {
        Ok(0)
    }

    fn data_offset(&self, name: &str, line: usize) -> Result<u32, AsmError> {
        self.data.offset_of(name).ok_or_else(|| AsmError::UnknownData {
            line,
            name: name.to_owned(),
        })
    }

    fn frame_hint(&self, _name: &str) -> Option<u32> {
        None
    }
}

/// Pass-two resolver over the finished label and data tables.
struct EmitResolver<'a> {
    labels: &'a HashMap<String, Label>,
    data: &'a DataTable,
}

impl Resolver for EmitResolver<'_> {
    fn label(&self, name: &str, line: usize) -> Result<u32, AsmError> {
        self.labels
            .get(&name.to_ascii_lowercase())
            .map(|label| label.pc)
            .ok_or_else(|| AsmError::UnknownLabel {
                line,
                name: name.to_owned(),
            })
    }

    fn data_offset(&self, name: &str, line: usize) -> Result<u32, AsmError> {
        self.data.offset_of(name).ok_or_else(|| AsmError::UnknownData {
            line,
            name: name.to_owned(),
        })
    }

    fn frame_hint(&self, name: &str) -> Option<u32> {
        self.labels
            .get(&name.to_ascii_lowercase())
            .and_then(|label| label.frame_hint)
    }
}
