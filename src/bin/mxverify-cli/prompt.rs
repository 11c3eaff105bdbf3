use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

const PROMPT: &str = "Enter the email address to verify: ";

/// Prints the prompt and reads one line from `input`.
pub fn read_email<R, W>(mut input: R, mut output: W) -> Result<String>
where
    R: BufRead,
    W: Write,
{
    output.write_all(PROMPT.as_bytes()).context("write prompt")?;
    output.flush().context("flush prompt")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("read stdin")?;
    if read == 0 {
        bail!("no email address given (stdin closed)");
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_single_trimmed_line() {
        let mut out = Vec::new();
        let email = read_email(Cursor::new("  user@example.com\r\nignored\n"), &mut out)
            .expect("read");
        assert_eq!(email, "user@example.com");
        assert_eq!(String::from_utf8(out).expect("utf8"), PROMPT);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = read_email(Cursor::new(""), Vec::new()).expect_err("eof");
        assert!(err.to_string().contains("stdin closed"));
    }
}
