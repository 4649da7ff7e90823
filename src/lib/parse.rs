use std::{
  borrow::Cow,
  fmt::{self, Write as _},
};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::map::EnvMap;

const COMMENT_PREFIX: &str = "#";
const ASSIGNMENT_OPERATOR: &str = "=";
const EXPORT_PREFIX: &str = "export ";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvFile<'a> {
  pub entries: Vec<EnvEntry<'a>>,
}

impl<'a> TryFrom<&'a str> for EnvFile<'a> {
  type Error = ParseError;

  fn try_from(s: &'a str) -> Result<Self, Self::Error> {
    #[cfg(feature = "tracing")]
    debug!("Parsing env file with {} lines", s.lines().count());

    let entries = s
      .lines()
      .enumerate()
      .map(|(idx, line)| EnvEntry::parse_line(idx + 1, line))
      .collect::<Result<Vec<_>, _>>()?;

    #[cfg(feature = "tracing")]
    debug!("Parsed {} entries", entries.len());

    Ok(Self { entries })
  }
}

impl<'a> EnvFile<'a> {
  /// Folds the variables into a mapping where later definitions override earlier ones.
  pub fn into_map(self) -> EnvMap {
    self
      .entries
      .into_iter()
      .filter_map(|entry| match entry {
        EnvEntry::Variable(var) => Some((var.key.into_owned(), var.value.into_owned())),
        _ => None,
      })
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvEntry<'a> {
  Variable(EnvVariable<'a>),
  Comment(EnvComment<'a>),
  EmptyLine,
}

impl<'a> EnvEntry<'a> {
  /// Parses a single line. `line` is the 1-based line number used in errors.
  pub fn parse_line(line: usize, s: &'a str) -> Result<Self, ParseError> {
    #[cfg(feature = "tracing")]
    trace!("Parsing line {}: {:?}", line, s);

    let trimmed = s.trim();

    if trimmed.is_empty() {
      Ok(EnvEntry::EmptyLine)
    } else if let Some(content) = trimmed.strip_prefix(COMMENT_PREFIX) {
      Ok(EnvEntry::Comment(EnvComment(Cow::Borrowed(content))))
    } else {
      EnvVariable::parse(line, trimmed).map(EnvEntry::Variable)
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvVariable<'a> {
  pub key: Cow<'a, str>,
  pub value: Cow<'a, str>,
}

impl<'a> fmt::Display for EnvVariable<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // The parser strips one `export `, so a key that itself starts with it needs another.
    if self.key.starts_with(EXPORT_PREFIX) {
      f.write_str(EXPORT_PREFIX)?;
    }
    write!(f, "{}{}", self.key, ASSIGNMENT_OPERATOR)?;
    if needs_quotes(&self.value) {
      write_quoted(f, &self.value)
    } else {
      f.write_str(&self.value)
    }
  }
}

impl<'a> EnvVariable<'a> {
  pub fn new(key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
    }
  }

  fn parse(line: usize, s: &'a str) -> Result<Self, ParseError> {
    let s = s
      .strip_prefix(EXPORT_PREFIX)
      .map(str::trim_start)
      .unwrap_or(s);

    let Some((key, raw_value)) = s.split_once(ASSIGNMENT_OPERATOR) else {
      return Err(ParseError::MissingAssignment {
        line,
        content: s.to_string(),
      });
    };

    let key = key.trim();
    if key.is_empty() {
      return Err(ParseError::EmptyKey { line });
    }

    let value = parse_value(raw_value).ok_or_else(|| ParseError::UnterminatedQuote {
      line,
      key: key.to_string(),
    })?;

    #[cfg(feature = "tracing")]
    trace!("Parsed variable: key={}, value={}", key, value);

    Ok(EnvVariable {
      key: Cow::Borrowed(key),
      value,
    })
  }
}

/// Returns `None` when a quoted value has no closing quote.
fn parse_value(raw: &str) -> Option<Cow<'_, str>> {
  let trimmed = raw.trim_start();

  if let Some(rest) = trimmed.strip_prefix('"') {
    unescape_double_quoted(rest)
  } else if let Some(rest) = trimmed.strip_prefix('\'') {
    rest.find('\'').map(|end| Cow::Borrowed(&rest[..end]))
  } else {
    Some(Cow::Borrowed(strip_inline_comment(raw).trim()))
  }
}

// An inline comment starts at a `#` that follows whitespace.
fn strip_inline_comment(raw: &str) -> &str {
  raw
    .char_indices()
    .find(|&(pos, c)| c == '#' && raw[..pos].ends_with(char::is_whitespace))
    .map_or(raw, |(pos, _)| &raw[..pos])
}

fn unescape_double_quoted(rest: &str) -> Option<Cow<'_, str>> {
  let mut chars = rest.char_indices();
  let mut owned: Option<String> = None;

  while let Some((pos, c)) = chars.next() {
    match c {
      '"' => return Some(owned.map_or(Cow::Borrowed(&rest[..pos]), Cow::Owned)),
      '\\' => {
        let buf = owned.get_or_insert_with(|| rest[..pos].to_string());
        let (_, escaped) = chars.next()?;
        buf.push(match escaped {
          'n' => '\n',
          'r' => '\r',
          't' => '\t',
          other => other,
        });
      }
      _ => {
        if let Some(buf) = owned.as_mut() {
          buf.push(c);
        }
      }
    }
  }

  None
}

fn needs_quotes(value: &str) -> bool {
  value != value.trim()
    || value.starts_with(['"', '\''])
    || value.contains(COMMENT_PREFIX)
    || value.contains('\\')
    || value.chars().any(char::is_control)
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
  f.write_char('"')?;
  for c in value.chars() {
    match c {
      '"' => f.write_str("\\\"")?,
      '\\' => f.write_str("\\\\")?,
      '\n' => f.write_str("\\n")?,
      '\r' => f.write_str("\\r")?,
      '\t' => f.write_str("\\t")?,
      c => f.write_char(c)?,
    }
  }
  f.write_char('"')
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvComment<'a>(pub Cow<'a, str>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
  #[error("line {line}: expected KEY=VALUE, got {content:?}")]
  MissingAssignment { line: usize, content: String },
  #[error("line {line}: empty variable name")]
  EmptyKey { line: usize },
  #[error("line {line}: unterminated quoted value for {key}")]
  UnterminatedQuote { line: usize, key: String },
}
