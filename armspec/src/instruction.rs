//! A64 instructions, from the per-class indices of the ISA specification

use {
    crate::{error::Result, xml},
    common::HashMap,
    itertools::Itertools,
    std::{fmt::Display, path::Path},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstructionClass {
    Base,
    Simd,
    Sve,
    Sme,
}

impl InstructionClass {
    pub const ALL: [InstructionClass; 4] = [Self::Base, Self::Simd, Self::Sve, Self::Sme];

    pub fn name(self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::Simd => "SIMD",
            Self::Sve => "SVE",
            Self::Sme => "SME",
        }
    }

    /// Index file of the class, next to the ISA index
    pub fn index_file(self) -> &'static str {
        match self {
            Self::Base => "index.xml",
            Self::Simd => "fpsimdindex.xml",
            Self::Sve => "sveindex.xml",
            Self::Sme => "mortlachindex.xml",
        }
    }
}

impl Display for InstructionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub name: String,
    pub description: String,
    pub class: InstructionClass,
}

/// Splits a comma-separated list of instruction names.
///
/// A comma inside a parenthesis which is still open belongs to the previous
/// name: `"ADD, ADDS (shifted register, 32-bit)"` is `ADD` and
/// `ADDS (shifted register, 32-bit)`.
pub fn split_names(list: &str) -> Vec<String> {
    let mut names: Vec<String> = vec![];

    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match names.last_mut() {
            Some(last) if has_open_parenthesis(last) => {
                last.push_str(", ");
                last.push_str(part);
            }
            _ => names.push(part.to_owned()),
        }
    }

    names
}

fn has_open_parenthesis(s: &str) -> bool {
    match (s.rfind('('), s.rfind(')')) {
        (Some(open), Some(close)) => close < open,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// All instructions, same-named ones kept in encounter order
#[derive(Debug, Default)]
pub struct InstructionRegistry {
    by_name: HashMap<String, Vec<Instruction>>,
    counts: HashMap<InstructionClass, usize>,
}

impl InstructionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: String, description: String, class: InstructionClass) {
        *self.counts.entry(class).or_default() += 1;
        self.by_name.entry(name.clone()).or_default().push(Instruction {
            name,
            description,
            class,
        });
    }

    pub fn get(&self, name: &str) -> &[Instruction] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of instructions of `class`
    pub fn count(&self, class: InstructionClass) -> usize {
        self.counts.get(&class).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Registers every name of every `iform` row of an index, returns the
    /// number of instructions added
    pub fn load_index_text<P: AsRef<Path>>(
        &mut self,
        path: P,
        text: &str,
        class: InstructionClass,
    ) -> Result<usize> {
        let doc = xml::parse(path, text)?;
        let before = self.count(class);

        for iform in xml::find_all(doc.root_element(), &["iform"]) {
            let description = xml::text(iform).trim();
            for name in split_names(iform.attribute("heading").unwrap_or_default()) {
                self.add(name, description.to_owned(), class);
            }
        }

        Ok(self.count(class) - before)
    }

    pub fn load_index<P: AsRef<Path>>(&mut self, path: P, class: InstructionClass) -> Result<usize> {
        let text = xml::read(&path)?;
        self.load_index_text(path, &text, class)
    }

    /// Every instruction, by name then encounter order
    pub fn sorted(&self) -> impl Iterator<Item = &Instruction> {
        self.by_name
            .iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .flat_map(|(_, list)| list)
    }
}
