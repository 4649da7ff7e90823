//! Conversion between env file text and [`EnvMap`].
//!
//! The sync pipeline only depends on the [`EnvCodec`] trait, so the dotenv
//! dialect handled by [`DotenvCodec`] can be swapped without touching it.

use crate::map::EnvMap;
use crate::parse::{EnvFile, EnvVariable, ParseError};

pub trait EnvCodec {
  /// Parses file content into a mapping. Later definitions of a key win.
  fn parse(&self, content: &str) -> Result<EnvMap, ParseError>;

  /// Renders a mapping as newline-terminated `KEY=VALUE` lines, in the map's order.
  fn serialize(&self, env: &EnvMap) -> String;
}

/// The dotenv dialect implemented by [`crate::parse`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DotenvCodec;

impl EnvCodec for DotenvCodec {
  fn parse(&self, content: &str) -> Result<EnvMap, ParseError> {
    EnvFile::try_from(content).map(EnvFile::into_map)
  }

  fn serialize(&self, env: &EnvMap) -> String {
    env.iter().fold(String::new(), |mut out, (key, value)| {
      out.push_str(&EnvVariable::new(key, value).to_string());
      out.push('\n');
      out
    })
  }
}
