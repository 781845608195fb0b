use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use smol_str::SmolStr;

use crate::{EnvError, Result};

/// Serialized parse-table format version this build reads.
pub const TABLE_FORMAT_VERSION: u32 = 1;

const TABLE_MAGIC: &str = "WEFT-PT";

/// Errors produced while loading serialized parse-table data.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("malformed parse table header: {reason}")]
    MalformedHeader { reason: String },

    #[error("unsupported parse table format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("parse table is missing a grammar name")]
    MissingGrammarName,

    #[error("io error reading parse table: {0}")]
    Io(#[from] std::io::Error),
}

/// A loaded parse table.
///
/// The payload is opaque to the environment; only the header (magic, format
/// version, grammar name) is interpreted here. Tables are shared as
/// `Arc<ParseTable>` handles and never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    grammar: SmolStr,
    payload: Vec<u8>,
}

impl ParseTable {
    pub fn new(grammar: impl Into<SmolStr>, payload: Vec<u8>) -> Self {
        Self {
            grammar: grammar.into(),
            payload,
        }
    }

    /// Reads a serialized parse table:
    ///
    /// ```text
    /// WEFT-PT 1
    /// <grammar name>
    /// <opaque payload bytes>
    /// ```
    pub fn read(reader: impl Read) -> std::result::Result<Self, TableError> {
        let mut reader = BufReader::new(reader);

        let mut header = String::new();
        reader.read_line(&mut header)?;
        let header = header.trim_end();
        let version = match header.strip_prefix(TABLE_MAGIC) {
            Some(rest) => rest.trim().parse::<u32>().map_err(|_| {
                TableError::MalformedHeader {
                    reason: format!("bad version field in `{header}`"),
                }
            })?,
            None => {
                return Err(TableError::MalformedHeader {
                    reason: format!("expected `{TABLE_MAGIC} <version>`, found `{header}`"),
                })
            }
        };
        if version != TABLE_FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion {
                found: version,
                supported: TABLE_FORMAT_VERSION,
            });
        }

        let mut grammar = String::new();
        reader.read_line(&mut grammar)?;
        let grammar = grammar.trim();
        if grammar.is_empty() {
            return Err(TableError::MissingGrammarName);
        }

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        Ok(Self::new(grammar, payload))
    }

    /// Loads a serialized parse table from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| EnvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::read(file)?)
    }

    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn reads_header_and_payload() {
        let data = b"WEFT-PT 1\nJava\nstates...";
        let table = ParseTable::read(&data[..]).unwrap();
        assert_eq!(table.grammar(), "Java");
        assert_eq!(table.payload(), b"states...");
    }

    #[test]
    fn rejects_wrong_magic() {
        let err = ParseTable::read(&b"NOPE 1\nJava\n"[..]).unwrap_err();
        assert!(matches!(err, TableError::MalformedHeader { .. }));
    }

    #[test]
    fn rejects_future_version() {
        let err = ParseTable::read(&b"WEFT-PT 2\nJava\n"[..]).unwrap_err();
        assert!(matches!(
            err,
            TableError::UnsupportedVersion { found: 2, .. }
        ));
    }

    #[test]
    fn rejects_missing_grammar_name() {
        let err = ParseTable::read(&b"WEFT-PT 1\n\n"[..]).unwrap_err();
        assert!(matches!(err, TableError::MissingGrammarName));
    }

    #[test]
    fn open_reads_from_disk_and_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("java.tbl");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"WEFT-PT 1\nJava\npayload").unwrap();
        drop(file);

        let table = ParseTable::open(&path).unwrap();
        assert_eq!(table.grammar(), "Java");

        let missing = dir.path().join("missing.tbl");
        let err = ParseTable::open(&missing).unwrap_err();
        assert!(matches!(err, EnvError::Io { path, .. } if path == missing));
    }
}
