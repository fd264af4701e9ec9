//! AArch64 system registers: encodings, bitfields and how the project
//! headers expose them

use {
    crate::warning::Warning,
    common::HashMap,
    itertools::Itertools,
    std::{cmp::Reverse, fmt::Display},
};

pub mod headers;
pub mod xml;

/// Size in bits of most system registers
pub const DEFAULT_SIZE: u32 = 64;

/// `op0, op1, CRn, CRm, op2` fields selecting a system register in an
/// `MRS`/`MSR` instruction, each a `0b` binary literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Encoding {
    pub op0: String,
    pub op1: String,
    pub crn: String,
    pub crm: String,
    pub op2: String,
}

impl Encoding {
    /// Builds an encoding from fields with or without the `0b` prefix,
    /// `None` if any field is not a binary literal
    pub fn new(op0: &str, op1: &str, crn: &str, crm: &str, op2: &str) -> Option<Self> {
        Some(Self {
            op0: bin_literal(op0)?,
            op1: bin_literal(op1)?,
            crn: bin_literal(crn)?,
            crm: bin_literal(crm)?,
            op2: bin_literal(op2)?,
        })
    }

    pub fn fields(&self) -> [&str; 5] {
        [&self.op0, &self.op1, &self.crn, &self.crm, &self.op2]
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fields().iter().join(", "))
    }
}

/// Formats `op` as a `0b...` literal, `None` if empty or not binary
pub fn bin_literal(op: &str) -> Option<String> {
    let op = op.trim();
    let digits = op.strip_prefix("0b").unwrap_or(op);

    if digits.is_empty() || !digits.chars().all(|c| c == '0' || c == '1') {
        return None;
    }

    Some(format!("0b{digits}"))
}

/// Gets a system register name from an `MRS` or `MSR` instruction
pub fn name_from_instruction(inst: &str) -> Option<String> {
    if !inst.contains(',') {
        return None;
    }

    let inst = inst.trim().to_uppercase();
    if let Some(operands) = inst.strip_prefix("MRS ") {
        operands.rsplit(',').next().map(|s| s.trim().to_owned())
    } else if let Some(operands) = inst.strip_prefix("MSR ") {
        operands.split(',').next().map(|s| s.trim().to_owned())
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    pub name: String,
    /// Least significant bit
    pub lsb: u32,
    pub width: u32,
    pub description: String,
}

impl Bitfield {
    /// `None` if `msb` is lower than `lsb`
    pub fn new<S: Into<String>>(name: S, msb: u32, lsb: u32) -> Option<Self> {
        Some(Self {
            name: name.into(),
            lsb,
            width: msb.checked_sub(lsb)? + 1,
            description: String::new(),
        })
    }

    pub fn msb(&self) -> u32 {
        self.lsb + self.width - 1
    }
}

/// Field of the C++ feature-detection class holding the register value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppBinding {
    pub field: String,
    /// Declaration order in the class
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub name: String,
    pub size: u32,
    pub description: String,
    pub encoding: Option<Encoding>,
    /// Sorted from most to least significant, `None` if never described
    pub bitfields: Option<Vec<Bitfield>>,
    /// Accessible through the kernel module interface
    pub kernel_access: bool,
    pub cpp: Option<CppBinding>,
}

impl Register {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            size: DEFAULT_SIZE,
            description: String::new(),
            encoding: None,
            bitfields: None,
            kernel_access: false,
            cpp: None,
        }
    }

    /// Sets the encoding once, a different encoding afterwards is
    /// reported and ignored
    pub fn set_encoding(&mut self, encoding: Encoding) -> Option<Warning> {
        match &self.encoding {
            Some(existing) if *existing != encoding => Some(Warning::ConflictingEncoding {
                register: self.name.clone(),
                existing: existing.clone(),
                conflicting: encoding,
            }),
            Some(_) => None,
            None => {
                self.encoding = Some(encoding);
                None
            }
        }
    }

    /// Sets the bitfields, sorted by descending lsb, with adjacent duplicates
    /// removed. Bitfields outside of the register are reported, not dropped.
    pub fn set_bitfields(&mut self, mut bitfields: Vec<Bitfield>) -> Vec<Warning> {
        bitfields.sort_by_key(|bf| Reverse(bf.lsb));

        let warnings = bitfields
            .iter()
            .filter(|bf| bf.lsb + bf.width > self.size)
            .map(|bf| Warning::InvalidBitfield {
                register: self.name.clone(),
                field: bf.name.clone(),
                lsb: bf.lsb,
                width: bf.width,
            })
            .collect();

        bitfields.dedup_by(|a, b| a.name == b.name);
        self.bitfields = Some(bitfields);

        warnings
    }

    /// Registers whose bitfields are worth extracting
    pub fn is_relevant(&self) -> bool {
        self.kernel_access || self.cpp.is_some()
    }

    /// More than one bitfield, or a single one narrower than the register
    pub fn has_bitfield_table(&self) -> bool {
        match self.bitfields.as_deref() {
            Some([]) | None => false,
            Some([single]) => single.width != self.size,
            Some(_) => true,
        }
    }
}

/// All known registers, indexed by uppercase name
#[derive(Debug, Default)]
pub struct RegisterRegistry {
    registers: HashMap<String, Register>,
}

impl RegisterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a register, creating it if necessary
    pub fn get_or_insert(&mut self, name: &str) -> &mut Register {
        self.registers
            .entry(name.to_owned())
            .or_insert_with(|| Register::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.registers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Register> {
        self.registers.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Registers sorted case-insensitively by name
    pub fn sorted(&self) -> Vec<&Register> {
        self.registers
            .values()
            .sorted_by_cached_key(|r| (r.name.to_lowercase(), r.name.clone()))
            .collect()
    }

    /// Registers sorted by name
    pub fn sorted_exact(&self) -> Vec<&Register> {
        self.registers
            .values()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }

    /// Registers of the C++ feature-detection class with known bitfields, in
    /// declaration order
    pub fn cpp_bound(&self) -> Vec<(&Register, &CppBinding)> {
        self.registers
            .values()
            .filter(|r| r.bitfields.is_some())
            .filter_map(|r| r.cpp.as_ref().map(|cpp| (r, cpp)))
            .sorted_by_key(|(_, cpp)| cpp.index)
            .collect()
    }

    /// Kernel-accessible registers sorted case-insensitively by name
    pub fn kernel_accessible(&self) -> Vec<&Register> {
        self.sorted()
            .into_iter()
            .filter(|r| r.kernel_access)
            .collect()
    }

    /// Copies the description of `X_EL1`/`X_EL0` into registers `X_EL12`/`X_EL02`
    /// which have none, returns the number of registers updated
    pub fn backfill_descriptions(&mut self) -> usize {
        let updates = self
            .registers
            .values()
            .filter(|r| r.description.is_empty())
            .filter_map(|r| {
                let (level, alias) = if r.name.ends_with("_EL12") {
                    ("EL1", "EL1&2")
                } else if r.name.ends_with("_EL02") {
                    ("EL0", "EL0&2")
                } else {
                    return None;
                };
                let base = self.registers.get(&r.name[..r.name.len() - 1])?;
                Some((r.name.clone(), base.description.replace(level, alias)))
            })
            .collect::<Vec<_>>();

        let count = updates.len();
        for (name, description) in updates {
            if let Some(reg) = self.registers.get_mut(&name) {
                reg.description = description;
            }
        }
        count
    }

    /// Reports registers without encoding, by name
    pub fn check_encodings(&self) -> Vec<Warning> {
        self.sorted_exact()
            .into_iter()
            .filter(|r| r.encoding.is_none())
            .map(|r| Warning::UndefinedEncoding(r.name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{
            bin_literal, name_from_instruction, Bitfield, Encoding, Register, RegisterRegistry,
        },
        crate::warning::Warning,
        proptest::prelude::*,
    };

    fn enc(op2: &str) -> Encoding {
        Encoding::new("11", "000", "0101", "0010", op2).unwrap()
    }

    #[test]
    fn literals() {
        assert_eq!(bin_literal("0101"), Some("0b0101".to_owned()));
        assert_eq!(bin_literal(" 0b11 "), Some("0b11".to_owned()));
        assert_eq!(bin_literal("0b"), None);
        assert_eq!(bin_literal(""), None);
        assert_eq!(bin_literal("01x1"), None);
        assert_eq!(bin_literal("0b012"), None);
    }

    #[test]
    fn encoding_display() {
        assert_eq!(enc("000").to_string(), "0b11, 0b000, 0b0101, 0b0010, 0b000");
        assert!(Encoding::new("11", "000", "0101", "0010", "1x0").is_none());
    }

    #[test]
    fn instruction_names() {
        assert_eq!(
            name_from_instruction("MRS <Xt>, ESR_EL1"),
            Some("ESR_EL1".to_owned())
        );
        assert_eq!(
            name_from_instruction("MSR ESR_EL1, <Xt>"),
            Some("ESR_EL1".to_owned())
        );
        assert_eq!(
            name_from_instruction("  mrs <Xt>, tcr_el1 "),
            Some("TCR_EL1".to_owned())
        );
        assert_eq!(name_from_instruction("MRS <Xt>"), None);
        assert_eq!(name_from_instruction("SYS #0, C7, C5, #0"), None);
    }

    #[test]
    fn encoding_once() {
        let mut reg = Register::new("ESR_EL1");
        assert_eq!(reg.set_encoding(enc("000")), None);
        assert_eq!(reg.set_encoding(enc("000")), None);
        assert_eq!(
            reg.set_encoding(enc("001")),
            Some(Warning::ConflictingEncoding {
                register: "ESR_EL1".to_owned(),
                existing: enc("000"),
                conflicting: enc("001"),
            })
        );
        assert_eq!(reg.encoding, Some(enc("000")));
    }

    #[test]
    fn bitfields() {
        let mut reg = Register::new("TCR_EL1");
        let warnings = reg.set_bitfields(vec![
            Bitfield::new("T0SZ", 5, 0).unwrap(),
            Bitfield::new("HUGE", 70, 60).unwrap(),
            Bitfield::new("EPD0", 7, 7).unwrap(),
            Bitfield::new("EPD0", 7, 7).unwrap(),
        ]);

        let bitfields = reg.bitfields.as_ref().unwrap();
        let names = bitfields.iter().map(|bf| bf.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["HUGE", "EPD0", "T0SZ"]);
        assert_eq!(bitfields[2].width, 6);
        assert_eq!(bitfields[0].msb(), 70);

        assert_eq!(
            warnings,
            [Warning::InvalidBitfield {
                register: "TCR_EL1".to_owned(),
                field: "HUGE".to_owned(),
                lsb: 60,
                width: 11,
            }]
        );
    }

    #[test]
    fn bitfield_table() {
        let mut reg = Register::new("RNDR");
        assert!(!reg.has_bitfield_table());
        reg.set_bitfields(vec![Bitfield::new("RNDR", 63, 0).unwrap()]);
        assert!(!reg.has_bitfield_table());
        reg.set_bitfields(vec![Bitfield::new("X", 31, 0).unwrap()]);
        assert!(reg.has_bitfield_table());
        assert!(Bitfield::new("X", 0, 1).is_none());
    }

    #[test]
    fn backfill() {
        let mut registry = RegisterRegistry::new();
        registry.get_or_insert("SCTLR_EL1").description = "System Control Register (EL1)".into();
        registry.get_or_insert("SCTLR_EL12");
        registry.get_or_insert("CNTKCTL_EL12");
        registry.get_or_insert("CNTP_CTL_EL0").description = "Counter (EL0)".into();
        registry.get_or_insert("CNTP_CTL_EL02");

        assert_eq!(registry.backfill_descriptions(), 2);
        assert_eq!(
            registry.get("SCTLR_EL12").unwrap().description,
            "System Control Register (EL1&2)"
        );
        assert_eq!(
            registry.get("CNTP_CTL_EL02").unwrap().description,
            "Counter (EL0&2)"
        );
        assert_eq!(registry.get("CNTKCTL_EL12").unwrap().description, "");
    }

    #[test]
    fn undefined_encodings() {
        let mut registry = RegisterRegistry::new();
        registry.get_or_insert("B_EL1");
        registry.get_or_insert("A_EL1").encoding = Some(enc("000"));
        registry.get_or_insert("C_EL1");
        assert_eq!(
            registry.check_encodings(),
            [
                Warning::UndefinedEncoding("B_EL1".to_owned()),
                Warning::UndefinedEncoding("C_EL1".to_owned()),
            ]
        );
    }

    fn arb_bitfield() -> impl Strategy<Value = Bitfield> {
        ("[A-D]", 0u32..64, 1u32..8).prop_map(|(name, lsb, width)| Bitfield {
            name,
            lsb,
            width,
            description: String::new(),
        })
    }

    proptest! {
        #[test]
        fn bitfields_sorted_and_deduplicated(fields in prop::collection::vec(arb_bitfield(), 0..24)) {
            let mut reg = Register::new("R");
            let warnings = reg.set_bitfields(fields.clone());
            let sorted = reg.bitfields.unwrap();

            for pair in sorted.windows(2) {
                prop_assert!(pair[0].lsb >= pair[1].lsb);
                prop_assert_ne!(&pair[0].name, &pair[1].name);
            }

            let overflowing = fields.iter().filter(|bf| bf.lsb + bf.width > 64).count();
            prop_assert_eq!(warnings.len(), overflowing);
        }
    }
}
