//! Lexical helpers shared by the preprocessor and both assembler passes.
//!
//! All mnemonic and directive matching is case-insensitive; tokens keep
//! their original spelling for diagnostics.

use crate::{AsmError, FileId, RegisterId, FDS, REGISTERS};

/// Split a line into its mnemonic and the remaining operand text.
pub fn mnemonic(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(i) => (&line[..i], line[i..].trim_start()),
        None => (line, ""),
    }
}

/// Strip a trailing `;` comment, ignoring semicolons inside string
/// literals, and trim surrounding whitespace.
pub fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return line[..i].trim(),
            _ => {}
        }
    }
    line.trim()
}

/// Split operand text on commas that sit outside string literals.
pub fn split_operands(rest: &str) -> Vec<&str> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in rest.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(rest[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(rest[start..].trim());
    parts
}

/// Parse a register token: `R`/`r` followed by a decimal index.
pub fn parse_register(token: &str, line: usize) -> Result<RegisterId, AsmError> {
    let invalid = || AsmError::InvalidRegister {
        line,
        token: token.to_owned(),
    };

    let index = token
        .strip_prefix(['R', 'r'])
        .ok_or_else(invalid)?
        .parse::<usize>()
        .map_err(|_| invalid())?;

    if index >= REGISTERS {
        return Err(invalid());
    }
    Ok(index as RegisterId)
}

/// Parse a file-descriptor token: `F`/`f` followed by a decimal index.
pub fn parse_fd(token: &str, line: usize) -> Result<FileId, AsmError> {
    let invalid = || AsmError::InvalidFd {
        line,
        token: token.to_owned(),
    };

    let index = token
        .strip_prefix(['F', 'f'])
        .ok_or_else(invalid)?
        .parse::<usize>()
        .map_err(|_| invalid())?;

    if index >= FDS {
        return Err(invalid());
    }
    Ok(index as FileId)
}

/// Does this token look like a register operand?
pub fn is_register(token: &str) -> bool {
    token.starts_with(['R', 'r']) && token[1..].chars().all(|c| c.is_ascii_digit()) && token.len() > 1
}

/// Parse an integer operand: decimal, or hexadecimal with a `0x` prefix.
pub fn parse_int(token: &str, line: usize) -> Result<i64, AsmError> {
    let syntax = || AsmError::Syntax {
        line,
        msg: format!("invalid integer `{token}`"),
    };

    let (negative, body) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let value = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| syntax())?
    } else {
        body.parse::<i64>().map_err(|_| syntax())?
    };

    Ok(if negative { value.wrapping_neg() } else { value })
}

/// Extract the contents of the first double-quoted literal in `text`.
pub fn quoted(text: &str, line: usize) -> Result<&str, AsmError> {
    let open = text.find('"').ok_or(AsmError::UnterminatedString { line })?;
    let rest = &text[open + 1..];
    let close = rest.find('"').ok_or(AsmError::UnterminatedString { line })?;
    Ok(&rest[..close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("R0", 0)]
    #[case("r7", 7)]
    #[case("R15", 15)]
    fn registers_parse(#[case] token: &str, #[case] expect: RegisterId) {
        assert_eq!(parse_register(token, 1).unwrap(), expect);
    }

    #[rstest]
    #[case("R16")]
    #[case("RX")]
    #[case("7")]
    #[case("F0")]
    fn bad_registers_rejected(#[case] token: &str) {
        assert!(parse_register(token, 1).is_err());
    }

    #[test]
    fn fd_tokens() {
        assert_eq!(parse_fd("F0", 1).unwrap(), 0);
        assert_eq!(parse_fd("f7", 1).unwrap(), 7);
        assert!(parse_fd("F8", 1).is_err());
        assert!(parse_fd("R1", 1).is_err());
    }

    #[test]
    fn operand_split_respects_quotes() {
        assert_eq!(split_operands(r#"1, "a,b", R2"#), vec!["1", r#""a,b""#, "R2"]);
        assert_eq!(split_operands(""), Vec::<&str>::new());
    }

    #[test]
    fn comment_strip_respects_quotes() {
        assert_eq!(strip_comment(r#"WRITE 1, "a;b" ; trailing"#), r#"WRITE 1, "a;b""#);
        assert_eq!(strip_comment("; whole line"), "");
    }

    #[test]
    fn integers() {
        assert_eq!(parse_int("42", 1).unwrap(), 42);
        assert_eq!(parse_int("-7", 1).unwrap(), -7);
        assert_eq!(parse_int("0xFF", 1).unwrap(), 255);
        assert!(parse_int("seven", 1).is_err());
    }
}
