//! Record parser: one delimited input line → fixed-arity field tuple

/// A line whose field count does not match the configured arity.
///
/// This is an expected condition for real-world dumps (headers, truncated
/// rows, trailing blank lines); the driver skips the line and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedRecord {
    pub expected: usize,
    pub found: usize,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "expected {} fields, found {}",
            self.expected, self.found
        )
    }
}

impl std::error::Error for MalformedRecord {}

/// Strip a trailing `\n` or `\r\n` left by `read_line`/`read_until`.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Split `line` on `delimiter` and return the fields if there are exactly `arity` of them.
///
/// Fields are returned as uninterpreted text; typed conversion happens in the
/// database. An empty line has zero fields.
pub fn parse_line<'a>(
    line: &'a str,
    delimiter: &str,
    arity: usize,
) -> Result<Vec<&'a str>, MalformedRecord> {
    let line = trim_line_ending(line);
    if line.is_empty() {
        return Err(MalformedRecord {
            expected: arity,
            found: 0,
        });
    }

    let mut fields = Vec::with_capacity(arity);
    for field in line.split(delimiter) {
        if fields.len() == arity {
            return Err(MalformedRecord {
                expected: arity,
                found: line.split(delimiter).count(),
            });
        }
        fields.push(field);
    }

    if fields.len() == arity {
        Ok(fields)
    } else {
        Err(MalformedRecord {
            expected: arity,
            found: fields.len(),
        })
    }
}
