//! Environment file synchronization functionality.
//!
//! This module appends the variables a sample file defines, but the actual env
//! file lacks, to the end of the actual env file. Existing lines in the actual
//! file are never modified.
//!
//! # Sync Logic
//!
//! The sync process:
//! 1. Opens the source (sample) file for reading and the target file for
//!    reading and appending. The target is never created.
//! 2. Parses both files into [`EnvMap`]s with the configured [`EnvCodec`]
//! 3. Collects the source variables whose keys are missing from the target
//! 4. If any are missing, appends a `# Merged by envsync at <time>` marker
//!    followed by the missing variables to the target in a single write
//!
//! The append is not atomic: a failed write may leave a partial block behind.
//!
//! # Examples
//!
//! ```rust,no_run
//! use envsync::sync::{EnvSync, EnvSyncOptions};
//! use std::path::PathBuf;
//!
//! let options = EnvSyncOptions {
//!     source_file: PathBuf::from("env.sample"),
//!     target_file: PathBuf::from(".env"),
//! };
//!
//! let added = EnvSync::sync_with_options(options).unwrap();
//! println!("added {} variables", added.len());
//! ```

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
#[cfg(feature = "tracing")]
use tracing::{debug, info, trace};

use crate::codec::{DotenvCodec, EnvCodec};
use crate::map::EnvMap;
use crate::parse::ParseError;

const DEFAULT_SOURCE_FILENAME: &str = "env.sample";
const DEFAULT_TARGET_FILENAME: &str = ".env";
const MARKER_PREFIX: &str = concat!("# Merged by ", env!("CARGO_PKG_NAME"), " at ");
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// Main synchronization service for environment files.
#[derive(Debug, Clone, Default)]
pub struct EnvSync<C = DotenvCodec> {
  codec: C,
}

impl EnvSync {
  pub fn new() -> Self {
    Self::default()
  }

  /// Synchronizes the files named in `options` using the dotenv codec.
  ///
  /// Returns the variables that were appended to the target file.
  pub fn sync_with_options(options: EnvSyncOptions) -> Result<EnvMap, EnvSyncError> {
    let EnvSyncOptions {
      source_file,
      target_file,
    } = options;

    Self::new().sync(source_file, target_file)
  }
}

impl<C: EnvCodec> EnvSync<C> {
  pub fn with_codec(codec: C) -> Self {
    Self { codec }
  }

  /// Appends the variables of `source` that are missing from `target` to `target`.
  ///
  /// Returns the appended variables, which is empty when the target already
  /// defines every source key. In that case the target is left untouched.
  pub fn sync<S, T>(&self, source: S, target: T) -> Result<EnvMap, EnvSyncError>
  where
    S: AsRef<Path>,
    T: AsRef<Path>,
  {
    let source = source.as_ref();
    let target = target.as_ref();

    #[cfg(feature = "tracing")]
    info!(?source, ?target, "Starting env sync");

    let source_open = |err| EnvSyncError::SourceOpen {
      path: source.to_path_buf(),
      source: err,
    };
    let target_open = |err| EnvSyncError::TargetOpen {
      path: target.to_path_buf(),
      source: err,
    };

    let mut source_file = File::open(source).map_err(source_open)?;
    let mut target_file = OpenOptions::new()
      .read(true)
      .append(true)
      .open(target)
      .map_err(target_open)?;

    let source_str = read_all(&mut source_file).map_err(source_open)?;
    let target_str = read_all(&mut target_file).map_err(target_open)?;

    let source_env = self
      .codec
      .parse(&source_str)
      .map_err(EnvSyncError::SourceParse)?;
    let target_env = self
      .codec
      .parse(&target_str)
      .map_err(EnvSyncError::TargetParse)?;

    #[cfg(feature = "tracing")]
    debug!(
      "Parsed {} source and {} target variables",
      source_env.len(),
      target_env.len()
    );

    let added = missing_entries(&source_env, &target_env);

    if added.is_empty() {
      #[cfg(feature = "tracing")]
      info!("Target already defines every source variable");
      return Ok(added);
    }

    let block = self.append_block(&target_str, &added, &Local::now());

    #[cfg(feature = "tracing")]
    trace!("Appending block: {:?}", block);

    target_file
      .write_all(block.as_bytes())
      .map_err(EnvSyncError::Write)?;

    #[cfg(feature = "tracing")]
    info!("Appended {} variables", added.len());

    Ok(added)
  }

  /// Builds the text appended after `existing`: the marker line and the serialized variables.
  fn append_block<Tz>(&self, existing: &str, added: &EnvMap, timestamp: &DateTime<Tz>) -> String
  where
    Tz: TimeZone,
    Tz::Offset: Display,
  {
    let mut block = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
      block.push('\n');
    }
    block.push_str(&merge_marker(timestamp));
    block.push('\n');
    block.push_str(&self.codec.serialize(added));
    block
  }
}

/// Returns the variables of `source` whose keys `target` does not define.
///
/// Values always come from `source`; a key present in both is skipped whatever its values.
pub fn missing_entries(source: &EnvMap, target: &EnvMap) -> EnvMap {
  source.difference(target)
}

/// The comment line written above each appended block.
pub fn merge_marker<Tz>(timestamp: &DateTime<Tz>) -> String
where
  Tz: TimeZone,
  Tz::Offset: Display,
{
  format!("{}{}", MARKER_PREFIX, timestamp.format(TIMESTAMP_FORMAT))
}

fn read_all(file: &mut File) -> io::Result<String> {
  let mut content = String::new();
  file.read_to_string(&mut content)?;
  Ok(content)
}

/// Errors that can occur during environment file synchronization.
#[derive(Debug, thiserror::Error)]
pub enum EnvSyncError {
  /// The source file is missing or unreadable
  #[error("Couldn't open source file {}: {source}", path.display())]
  SourceOpen { path: PathBuf, source: io::Error },
  /// The target file is missing, unreadable or not writable
  #[error("Couldn't open target file {}: {source}", path.display())]
  TargetOpen { path: PathBuf, source: io::Error },
  #[error("Source file parse error: {0}")]
  SourceParse(ParseError),
  #[error("Target file parse error: {0}")]
  TargetParse(ParseError),
  /// Appending to the target failed; part of the block may have been written
  #[error("Error writing to target file: {0}")]
  Write(io::Error),
}

/// Configuration options for environment file synchronization.
#[derive(Debug, Clone)]
pub struct EnvSyncOptions {
  /// Path to the sample file listing every expected variable.
  pub source_file: PathBuf,
  /// Path to the actual env file. It must already exist.
  pub target_file: PathBuf,
}

impl Default for EnvSyncOptions {
  fn default() -> Self {
    Self {
      source_file: PathBuf::from(DEFAULT_SOURCE_FILENAME),
      target_file: PathBuf::from(DEFAULT_TARGET_FILENAME),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::FixedOffset;
  use std::fs;
  use tempfile::TempDir;

  /// Reads `key:value` lines, so the pipeline can be checked without dotenv rules.
  struct ColonCodec;

  impl EnvCodec for ColonCodec {
    fn parse(&self, content: &str) -> Result<EnvMap, ParseError> {
      content
        .lines()
        .enumerate()
        .map(|(idx, line)| {
          line
            .split_once(':')
            .ok_or_else(|| ParseError::MissingAssignment {
              line: idx + 1,
              content: line.to_string(),
            })
        })
        .collect()
    }

    fn serialize(&self, env: &EnvMap) -> String {
      env.iter().map(|(k, v)| format!("{k}:{v}\n")).collect()
    }
  }

  fn fixed_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(7 * 3600)
      .unwrap()
      .with_ymd_and_hms(2024, 3, 9, 14, 5, 6)
      .unwrap()
  }

  #[test]
  fn test_missing_entries() {
    let source: EnvMap = [("FOO", "bar"), ("BAZ", "qux")].into_iter().collect();
    let target: EnvMap = [("FOO", "existing"), ("OTHER", "1")].into_iter().collect();

    let added = missing_entries(&source, &target);

    let expected: EnvMap = [("BAZ", "qux")].into_iter().collect();
    assert_eq!(added, expected);
  }

  #[test]
  fn test_merge_marker() {
    assert_eq!(
      merge_marker(&fixed_time()),
      "# Merged by envsync at 2024-03-09 14:05:06 +0700"
    );
  }

  #[test]
  fn test_append_block_terminates_last_line() {
    let added: EnvMap = [("NEW", "1")].into_iter().collect();
    let sync = EnvSync::new();

    let block = sync.append_block("OLD=1", &added, &fixed_time());
    assert_eq!(block, "\n# Merged by envsync at 2024-03-09 14:05:06 +0700\nNEW=1\n");

    let block = sync.append_block("OLD=1\n", &added, &fixed_time());
    assert!(block.starts_with("# Merged"));

    let block = sync.append_block("", &added, &fixed_time());
    assert!(block.starts_with("# Merged"));
  }

  #[test]
  fn test_sync_with_custom_codec() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("sample");
    let target = temp_dir.path().join("actual");
    fs::write(&source, "A:1\nB:2\n").unwrap();
    fs::write(&target, "A:9\n").unwrap();

    let added = EnvSync::with_codec(ColonCodec).sync(&source, &target).unwrap();

    assert_eq!(added, [("B", "2")].into_iter().collect::<EnvMap>());
    let content = fs::read_to_string(&target).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("A:9"));
    assert!(lines.next().unwrap().starts_with(MARKER_PREFIX));
    assert_eq!(lines.next(), Some("B:2"));
    assert_eq!(lines.next(), None);
  }

  #[test]
  fn test_source_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join(".env");
    fs::write(&target, "").unwrap();

    let options = EnvSyncOptions {
      source_file: temp_dir.path().join("nonexistent.sample"),
      target_file: target,
    };

    match EnvSync::sync_with_options(options).unwrap_err() {
      EnvSyncError::SourceOpen { path, source } => {
        assert_eq!(path, temp_dir.path().join("nonexistent.sample"));
        assert_eq!(source.kind(), io::ErrorKind::NotFound);
      }
      other => panic!("Expected SourceOpen error, got {other:?}"),
    }
  }

  #[test]
  fn test_default_options() {
    let options = EnvSyncOptions::default();
    assert_eq!(options.source_file, PathBuf::from("env.sample"));
    assert_eq!(options.target_file, PathBuf::from(".env"));
  }
}
