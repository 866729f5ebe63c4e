// Interactive stdin prompts.
//
// The prompt text goes to stderr so stdout stays clean for piping.
// Empty input or EOF means the user cancelled.

use std::io::{self, BufRead, Write};

/// Prompt on stderr and read one trimmed line from stdin.
/// Returns `None` on empty input or EOF.
pub fn read_line(prompt: &str) -> io::Result<Option<String>> {
    read_line_from(prompt, &mut io::stdin().lock(), &mut io::stderr().lock())
}

fn read_line_from<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    out: &mut W,
) -> io::Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_trimmed_input() {
        let mut input = "  my-repo \n".as_bytes();
        let mut out = Vec::new();
        let value = read_line_from("Name: ", &mut input, &mut out).unwrap();
        assert_eq!(value, Some("my-repo".to_string()));
    }

    #[test]
    fn empty_line_is_cancellation() {
        let mut input = "\n".as_bytes();
        let mut out = Vec::new();
        assert_eq!(read_line_from("Name: ", &mut input, &mut out).unwrap(), None);
    }

    #[test]
    fn whitespace_only_is_cancellation() {
        let mut input = "   \n".as_bytes();
        let mut out = Vec::new();
        assert_eq!(read_line_from("Name: ", &mut input, &mut out).unwrap(), None);
    }

    #[test]
    fn eof_is_cancellation() {
        let mut input = "".as_bytes();
        let mut out = Vec::new();
        assert_eq!(read_line_from("Name: ", &mut input, &mut out).unwrap(), None);
    }

    #[test]
    fn prompt_is_written_before_reading() {
        let mut input = "value\n".as_bytes();
        let mut out = Vec::new();
        read_line_from("Enter value: ", &mut input, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Enter value: ");
    }
}
