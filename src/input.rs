use std::io::{BufRead, Write};

use chrono::NaiveDate;

use crate::window::parse_date;
use crate::{AppError, Result};

pub const DATE_PROMPT: &str = concat!(
    "Fetches history from the start of the month through the given date. ",
    "Enter a date (YYYY-MM-DD): "
);

/// Writes the prompt and reads one line; `\r\n` is stripped before parsing.
pub fn prompt_date<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> Result<NaiveDate> {
    write!(writer, "{}", DATE_PROMPT)?;
    writer.flush()?;

    let mut line = String::new();
    let read = reader.read_line(&mut line)?;
    if read == 0 {
        return Err(AppError::InvalidDate("<end of input>".to_string()));
    }

    parse_date(line.trim_end_matches(['\r', '\n']))
}
