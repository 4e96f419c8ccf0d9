// Robot-mode record tokenizer
// Splits `TAG:field,field,"quoted, field"` lines into a tag and its fields

/// One robot-mode output line split into its tag and fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotRecord<'a> {
    pub tag: &'a str,
    pub fields: Vec<String>,
}

impl RobotRecord<'_> {
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Field parsed as an integer, `None` when absent or not numeric
    pub fn int_field(&self, index: usize) -> Option<i64> {
        self.field(index)?.trim().parse().ok()
    }
}

/// Split a line at its first ':' into tag and fields. Robot tags are upper
/// case (`MSG`, `PRGV`, `TINFO`, ...); anything else is not a record.
pub fn parse_record(line: &str) -> Option<RobotRecord<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (tag, rest) = line.split_once(':')?;
    let tag = tag.trim();

    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return None;
    }

    Some(RobotRecord {
        tag,
        fields: split_fields(rest),
    })
}

/// Comma splitter that respects double-quoted fields. Inside quotes, `\"` and
/// `""` are a literal quote and `\\` a literal backslash.
pub fn split_fields(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '\\' => match chars.peek() {
                    Some('"') | Some('\\') => {
                        if let Some(escaped) = chars.next() {
                            current.push(escaped);
                        }
                    }
                    _ => current.push(c),
                },
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => current.push(c),
            }
        } else {
            match c {
                ',' => fields.push(std::mem::take(&mut current)),
                '"' => in_quotes = true,
                _ => current.push(c),
            }
        }
    }

    fields.push(current);
    fields
}
