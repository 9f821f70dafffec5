//! # Store Error Module
//!
//! This module defines the errors that can be produced while opening,
//! reading from, or writing to a store. These are grouped by the kind of
//! failure rather than by the component that raised it, so that callers can
//! match on "what went wrong" without needing to know which internal module
//! detected it.

use std::{error::Error, fmt};

use crate::key::ClassId;

/* SCHEMA DIAGNOSTICS */

/// A single point of disagreement between a class's persisted property list
/// and the runtime property list supplied to [`crate::schema::SchemaRegistry::open`].
#[derive(Debug, Clone)]
pub struct PropertyDiff {
    pub class_name: String,
    pub position: usize,
    pub field: String,
    pub description: String,
    pub runtime: String,
    pub saved: String,
}

impl fmt::Display for PropertyDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}].{}: {} (runtime={}, saved={})",
            self.class_name,
            self.position,
            self.field,
            self.description,
            self.runtime,
            self.saved
        )
    }
}

/* ERROR WRAPPER */

/// Wrapper for all store-related errors that could happen during runtime.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying KV I/O failure, capacity exhaustion, or corruption (header
    /// mismatch, truncated record, bad chunk index).
    Persistence(String),

    /// Raised by [`crate::schema::SchemaRegistry::open`] when a class's saved
    /// and runtime property lists cannot be reconciled at all, carrying a
    /// diff entry per point of disagreement.
    IncompatibleSchema {
        class_name: String,
        diffs: Vec<PropertyDiff>,
    },

    /// A load encountered a `classId` unknown to the runtime registry and no
    /// substitute was configured to stand in for it.
    ClassNotRegistered(ClassId),

    /// A transaction lifecycle violation: writer-while-writer, a complex
    /// object saved in append mode, or a non-monotonic key in append mode.
    InvalidArgument(String),
}

impl Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistence(message) => {
                write!(f, "persistence failure: {}", message)
            }
            Self::IncompatibleSchema { class_name, diffs } => {
                writeln!(
                    f,
                    "class '{}' is incompatible with its saved schema:",
                    class_name
                )?;
                for diff in diffs {
                    writeln!(f, "  - {}", diff)?;
                }
                Ok(())
            }
            Self::ClassNotRegistered(class_id) => {
                write!(
                    f,
                    "class id {} is not registered and has no configured substitute",
                    class_id
                )
            }
            Self::InvalidArgument(message) => {
                write!(f, "invalid argument: {}", message)
            }
        }
    }
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

/// Convenience alias used throughout the store's internal modules.
pub type StoreResult<T> = Result<T, StoreError>;
