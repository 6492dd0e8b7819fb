//! Default tokenizer

use super::{CliArguments, NamedEntry, NamedValue};
use thiserror::Error;
use tracing::trace;

/// Errors for malformed raw input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// A bare `--` token
    #[error("Empty argument name at position {position}")]
    EmptyKey {
        /// Raw token index
        position: usize,
    },

    /// A key with more than two leading dashes
    #[error("Invalid argument key \"{token}\" at position {position}")]
    InvalidKey {
        /// Raw token index
        position: usize,
        /// The offending token
        token: String,
    },

    /// A key given both as flag and as value key
    #[error("Argument \"{key}\" is used as flag and as value key")]
    MixedUsage {
        /// The key as first written
        key: String,
    },
}

/// Turns raw tokens into [`CliArguments`].
///
/// The dispatcher only depends on this trait, so a custom token syntax can
/// be swapped in with [`CliApp::with_tokenizer`](crate::dispatch::CliApp::with_tokenizer).
pub trait Tokenizer: Send + Sync {
    /// Tokenize one chunk
    fn tokenize(&self, raw: &[String]) -> Result<CliArguments, TokenizeError>;
}

/// `--name value`, `-flag` and positional tokens.
///
/// A `--name` without any following value is recorded as a flag. Any
/// token after an open `--name` that doesn't look like a key is one of its
/// values, including a bare `-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTokenizer;

impl Tokenizer for DefaultTokenizer {
    fn tokenize(&self, raw: &[String]) -> Result<CliArguments, TokenizeError> {
        let mut args = CliArguments {
            raw: raw.to_vec(),
            ..CliArguments::default()
        };
        let mut open: Option<usize> = None;

        for (position, token) in raw.iter().enumerate() {
            if let Some(name) = token.strip_prefix("--") {
                if name.is_empty() {
                    return Err(TokenizeError::EmptyKey { position });
                }
                if name.starts_with('-') {
                    return Err(TokenizeError::InvalidKey {
                        position,
                        token: token.clone(),
                    });
                }
                args.close(open.take());
                open = Some(args.open_value_key(name)?);
            } else if token.len() > 1 && token.starts_with('-') {
                args.close(open.take());
                args.add_flag(&token[1..])?;
            } else if let Some(index) = open {
                if let NamedValue::Values(values) = &mut args.named[index].value {
                    values.push(token.clone());
                }
            } else {
                args.keyless.push(token.clone());
                args.positions.push(position);
            }
        }
        args.close(open.take());

        trace!(
            keyless = args.keyless.len(),
            named = args.named.len(),
            "Tokenized {} raw arguments",
            raw.len()
        );
        Ok(args)
    }
}

impl CliArguments {
    fn open_value_key(&mut self, name: &str) -> Result<usize, TokenizeError> {
        match self.position_of(name) {
            Some(index) => match self.named[index].value {
                NamedValue::Flag => Err(TokenizeError::MixedUsage {
                    key: self.named[index].key.clone(),
                }),
                NamedValue::Values(_) => Ok(index),
            },
            None => {
                self.named.push(NamedEntry {
                    key: name.to_string(),
                    value: NamedValue::Values(Vec::new()),
                });
                Ok(self.named.len() - 1)
            }
        }
    }

    fn add_flag(&mut self, name: &str) -> Result<(), TokenizeError> {
        match self.position_of(name) {
            Some(index) => match self.named[index].value {
                NamedValue::Flag => Ok(()),
                NamedValue::Values(_) => Err(TokenizeError::MixedUsage {
                    key: self.named[index].key.clone(),
                }),
            },
            None => {
                self.named.push(NamedEntry {
                    key: name.to_string(),
                    value: NamedValue::Flag,
                });
                Ok(())
            }
        }
    }

    // A value key that never received a value becomes a flag.
    fn close(&mut self, open: Option<usize>) {
        if let Some(index) = open {
            if matches!(&self.named[index].value, NamedValue::Values(v) if v.is_empty()) {
                self.named[index].value = NamedValue::Flag;
            }
        }
    }
}
