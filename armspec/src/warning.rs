//! Recoverable data-quality problems found while building the models

use {
    crate::register::Encoding,
    std::{fmt::Display, slice},
};

/// Inconsistency left for a human to resolve in the source-of-truth files
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display)]
pub enum Warning {
    /// {0} is documented, should not be marked as (removed)
    RemovedButDocumented(String),
    /// {0} is no longer documented, should be marked as (removed)
    Undocumented(String),
    /// Conflicting encodings for register {register}: {existing} vs. {conflicting}
    ConflictingEncoding {
        register: String,
        existing: Encoding,
        conflicting: Encoding,
    },
    /// Invalid bitfield {lsb}:{width} {register}_{field}
    InvalidBitfield {
        register: String,
        field: String,
        lsb: u32,
        width: u32,
    },
    /// Undefined encoding for register {0}
    UndefinedEncoding(String),
}

/// Ordered collection of warnings, in the order they were found
#[derive(Debug, Default)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I: IntoIterator<Item = Warning>>(&mut self, iter: I) {
        self.0.extend(iter);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Warning> {
        self.0.iter()
    }

    /// Prints every warning on stdout with the `---` prefix
    pub fn report(&self) {
        for warning in &self.0 {
            println!("{}", Prefixed(warning));
        }
    }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a Warning;
    type IntoIter = slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

struct Prefixed<'w>(&'w Warning);

impl Display for Prefixed<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--- {}", self.0)
    }
}
