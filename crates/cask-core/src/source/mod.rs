//! Manifest front-ends.
//!
//! Two declarative formats translate into the same [`Manifest`] model: the
//! cask DSL (`*.rb`) and a TOML rendition (`*.toml`). Both share the guard
//! grammar in [`guard`].

pub mod dsl;
pub mod guard;
pub mod lexer;
pub mod toml;

use std::fs;
use std::path::{Path, PathBuf};

use cask_schema::{DigestError, VersionError};
use thiserror::Error;

use crate::manifest::{Manifest, ManifestError};
use crate::template::TemplateError;

/// Errors raised while reading a manifest source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file extension maps to no known format.
    #[error("Unsupported manifest format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Tokenization failed.
    #[error("line {line}: {message}")]
    Lex {
        /// 1-based line.
        line: usize,
        /// Description.
        message: String,
    },

    /// The token stream does not form a cask definition.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line.
        line: usize,
        /// Description.
        message: String,
    },

    /// A `url` or `appcast` template is invalid.
    #[error("line {line}: {source}")]
    Template {
        /// 1-based line.
        line: usize,
        /// Underlying template error.
        source: TemplateError,
    },

    /// A `sha256` or `checkpoint` is not a valid digest.
    #[error("line {line}: {source}")]
    Digest {
        /// 1-based line.
        line: usize,
        /// Underlying digest error.
        source: DigestError,
    },

    /// A `version` is invalid.
    #[error("line {line}: {source}")]
    Version {
        /// 1-based line.
        line: usize,
        /// Underlying version error.
        source: VersionError,
    },

    /// The TOML document is malformed.
    #[error("TOML error: {0}")]
    Toml(#[from] ::toml::de::Error),

    /// The parsed definition failed manifest validation.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Source format of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Cask DSL (`.rb`).
    Dsl,
    /// TOML (`.toml`).
    Toml,
}

impl Format {
    /// Determine the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "rb" => Some(Self::Dsl),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parse manifest source text in the given format.
///
/// # Errors
///
/// Returns a [`SourceError`] describing the first problem found.
pub fn parse_str(src: &str, format: Format) -> Result<Manifest, SourceError> {
    match format {
        Format::Dsl => dsl::parse(src),
        Format::Toml => toml::parse(src),
    }
}

/// Read and parse a manifest file, choosing the format by extension.
///
/// # Errors
///
/// Returns a [`SourceError`] when the file cannot be read, has an unknown
/// extension, or does not parse into a valid manifest.
pub fn load_file(path: &Path) -> Result<Manifest, SourceError> {
    let format =
        Format::from_path(path).ok_or_else(|| SourceError::UnsupportedFormat(path.to_path_buf()))?;
    let src = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&src, format)
}
