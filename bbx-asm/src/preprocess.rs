//! Macro preprocessor.
//!
//! Runs ahead of the assembler's first pass: collects `%macro` blocks,
//! strips them from the stream, and replaces every invocation with its
//! expanded body. The output is an in-memory line stream that both
//! assembler passes borrow.

use std::collections::HashMap;

use crate::lex::{mnemonic, strip_comment};
use crate::AsmError;

/// Nested expansion bound; exceeding it is fatal.
pub const MAX_DEPTH: usize = 32;

/// Section markers that are never treated as macro invocations.
const RESERVED: &[&str] = &["%asm", "%data", "%main", "%entry", "%macro", "%endmacro"];

/// One line of the expanded stream, tagged with the source line it came
/// from. Expanded macro bodies report the invocation site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based source line for diagnostics.
    pub number: usize,
    /// Line text with comments and surrounding whitespace removed.
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Macro {
    params: Vec<String>,
    body: Vec<String>,
}

/// Expand all macro definitions and invocations in `source`.
pub fn preprocess(source: &str) -> Result<Vec<Line>, AsmError> {
    let mut macros: HashMap<String, Macro> = HashMap::new();
    let mut out = Vec::new();
    let mut expand_id = 0u64;

    let mut lines = source.lines().enumerate();
    while let Some((index, raw)) = lines.next() {
        let number = index + 1;
        let text = strip_comment(raw);
        if text.is_empty() {
            continue;
        }

        let (head, rest) = mnemonic(text);

        if head.eq_ignore_ascii_case("%macro") {
            let mut tokens = rest.split_whitespace();
            let name = tokens.next().ok_or_else(|| AsmError::Syntax {
                line: number,
                msg: "expected %macro NAME [PARAM ...]".into(),
            })?;
            let definition = Macro {
                params: tokens.map(str::to_owned).collect(),
                body: collect_body(&mut lines, number)?,
            };
            macros.insert(name.to_ascii_lowercase(), definition);
            continue;
        }

        if head.eq_ignore_ascii_case("%endmacro") {
            return Err(AsmError::StrayEndmacro { line: number });
        }

        if is_invocation(head, &macros) {
            expand(text, number, &macros, &mut expand_id, 0, &mut out)?;
            continue;
        }

        out.push(Line {
            number,
            text: text.to_owned(),
        });
    }

    Ok(out)
}

fn collect_body<'a, I>(lines: &mut I, start: usize) -> Result<Vec<String>, AsmError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut body = Vec::new();

    for (index, raw) in lines {
        let text = strip_comment(raw);
        if text.is_empty() {
            continue;
        }

        let (head, _) = mnemonic(text);
        if head.eq_ignore_ascii_case("%endmacro") {
            return Ok(body);
        }
        if head.eq_ignore_ascii_case("%macro") {
            return Err(AsmError::Syntax {
                line: index + 1,
                msg: "%macro definitions cannot nest".into(),
            });
        }

        body.push(text.to_owned());
    }

    Err(AsmError::UnterminatedMacro { line: start })
}

fn is_invocation(head: &str, macros: &HashMap<String, Macro>) -> bool {
    if !head.starts_with('%') {
        return false;
    }
    if RESERVED.iter().any(|r| head.eq_ignore_ascii_case(r)) {
        return false;
    }
    macros.contains_key(&head[1..].to_ascii_lowercase())
}

fn expand(
    invocation: &str,
    number: usize,
    macros: &HashMap<String, Macro>,
    expand_id: &mut u64,
    depth: usize,
    out: &mut Vec<Line>,
) -> Result<(), AsmError> {
    if depth > MAX_DEPTH {
        return Err(AsmError::MacroDepth {
            line: number,
            limit: MAX_DEPTH,
        });
    }

    let (head, rest) = mnemonic(invocation);
    let definition = &macros[&head[1..].to_ascii_lowercase()];
    let args: Vec<&str> = rest.split_whitespace().collect();

    *expand_id += 1;
    let prefix = format!("M{expand_id}");

    for body_line in &definition.body {
        let mut line = body_line.clone();

        // named parameters first, then positional $1..$N
        for (i, param) in definition.params.iter().enumerate() {
            let replacement = args.get(i).copied().unwrap_or("");
            line = line.replace(&format!("${param}"), replacement);
        }
        for (i, arg) in args.iter().enumerate() {
            line = line.replace(&format!("${}", i + 1), arg);
        }

        let line = rewrite_locals(&line, &prefix);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (head, _) = mnemonic(line);
        if is_invocation(head, macros) {
            expand(line, number, macros, expand_id, depth + 1, out)?;
        } else {
            out.push(Line {
                number,
                text: line.to_owned(),
            });
        }
    }

    Ok(())
}

/// Rewrite every `@@IDENT` to `M<k>_IDENT` so each expansion's local
/// labels are unique.
fn rewrite_locals(line: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(at) = rest.find("@@") {
        out.push_str(&rest[..at]);
        let ident = &rest[at + 2..];
        let end = ident
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(ident.len());
        out.push_str(prefix);
        out.push('_');
        out.push_str(&ident[..end]);
        rest = &ident[end..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn definitions_are_stripped_from_the_stream() {
        let out = preprocess("%asm\n%macro noop\nNEWLINE\n%endmacro\n%main\nHALT\n").unwrap();
        assert_eq!(texts(&out), vec!["%asm", "%main", "HALT"]);
    }

    #[test]
    fn named_and_positional_parameters() {
        let src = "%macro put REG VAL\nMOV $REG, $VAL\nPUSH $1\n%endmacro\n%put R2 7\n";
        let out = preprocess(src).unwrap();
        assert_eq!(texts(&out), vec!["MOV R2, 7", "PUSH R2"]);
    }

    #[test]
    fn missing_arguments_substitute_empty() {
        let src = "%macro put REG VAL\nMOV $REG, $VAL\n%endmacro\n%put R2\n";
        let out = preprocess(src).unwrap();
        assert_eq!(texts(&out), vec!["MOV R2,"]);
    }

    #[test]
    fn local_labels_get_distinct_prefixes() {
        let src = "%macro twice\n@@again:\nINC R0\nJMP @@again\n%endmacro\n%twice\n%twice\n";
        let out = preprocess(src).unwrap();
        assert_eq!(
            texts(&out),
            vec![
                "M1_again:",
                "INC R0",
                "JMP M1_again",
                "M2_again:",
                "INC R0",
                "JMP M2_again",
            ]
        );
    }

    #[test]
    fn nested_invocations_expand() {
        let src = "%macro inner\nINC R0\n%endmacro\n%macro outer\n%inner\nDEC R1\n%endmacro\n%outer\n";
        let out = preprocess(src).unwrap();
        assert_eq!(texts(&out), vec!["INC R0", "DEC R1"]);
    }

    #[test]
    fn self_recursion_hits_the_depth_limit() {
        let src = "%macro loop\n%loop\n%endmacro\n%loop\n";
        let err = preprocess(src).unwrap_err();
        assert!(matches!(err, AsmError::MacroDepth { limit: MAX_DEPTH, .. }));
    }

    #[test]
    fn reserved_markers_are_not_invocations() {
        let src = "%macro main\nHALT\n%endmacro\n%main\n";
        let out = preprocess(src).unwrap();
        assert_eq!(texts(&out), vec!["%main"]);
    }

    #[test]
    fn unterminated_macro_is_fatal() {
        let err = preprocess("%macro broken\nNEWLINE\n").unwrap_err();
        assert!(matches!(err, AsmError::UnterminatedMacro { line: 1 }));
    }

    #[test]
    fn invocation_lines_report_the_call_site() {
        let src = "%macro noop\nNEWLINE\n%endmacro\n\n\n%noop\n";
        let out = preprocess(src).unwrap();
        assert_eq!(out, vec![Line { number: 6, text: "NEWLINE".into() }]);
    }
}
