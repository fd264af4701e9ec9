//! Registers referenced by the hand-written C/C++ headers
//!
//! Register pairs of the kernel interface can only be resolved once every
//! register is known, so scanning the kernel header yields [`PendingPairs`]
//! which are resolved in a second phase.

use {
    super::{CppBinding, RegisterRegistry},
    once_cell::sync::Lazy,
    regex::Regex,
};

/// Records the `csr_u64_t _field = ...; // @REG: NAME` fields of the
/// feature-detection class, returns their number
pub fn scan_feature_header<'a, I: IntoIterator<Item = &'a str>>(
    registry: &mut RegisterRegistry,
    lines: I,
) -> usize {
    static FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^ *csr_u64_t +(_[a-zA-Z0-9_]+) *=.*@REG: +([a-zA-Z0-9_]+)").unwrap()
    });

    let mut index = 0;
    for caps in lines.into_iter().filter_map(|line| FIELD.captures(line)) {
        registry.get_or_insert(&caps[2]).cpp = Some(CppBinding {
            field: caps[1].to_owned(),
            index,
        });
        index += 1;
    }
    index
}

/// `CSR_REGID2_<base><suffix>` identifier of a register pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPair {
    pub base: String,
    /// Exception level suffix, such as `_EL1`
    pub suffix: String,
}

impl RegisterPair {
    pub fn name(&self) -> String {
        format!("{}{}", self.base, self.suffix)
    }

    pub fn high(&self) -> String {
        format!("{}HI{}", self.base, self.suffix)
    }

    pub fn low(&self) -> String {
        format!("{}LO{}", self.base, self.suffix)
    }
}

/// Register pairs waiting for the full register set
#[derive(Debug, Default)]
pub struct PendingPairs(Vec<RegisterPair>);

impl PendingPairs {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flags the registers behind each pair as kernel-accessible: either the
    /// register named like the pair, or its `HI`/`LO` halves when both exist.
    ///
    /// Returns the number of registers flagged.
    pub fn resolve(self, registry: &mut RegisterRegistry) -> usize {
        let mut count = 0;

        for pair in self.0 {
            let (name, high, low) = (pair.name(), pair.high(), pair.low());

            if let Some(reg) = registry.get_mut(&name) {
                reg.kernel_access = true;
                count += 1;
            } else if registry.contains(&high) && registry.contains(&low) {
                for half in [high, low] {
                    if let Some(reg) = registry.get_mut(&half) {
                        reg.kernel_access = true;
                        count += 1;
                    }
                }
            }
        }

        count
    }
}

/// Flags the `CSR_REGID_<NAME>` registers of the kernel interface header as
/// kernel-accessible and collects the `CSR_REGID2_` pairs.
///
/// Returns the number of single registers and the pending pairs.
pub fn scan_kernel_header<'a, I: IntoIterator<Item = &'a str>>(
    registry: &mut RegisterRegistry,
    lines: I,
) -> (usize, PendingPairs) {
    static SINGLE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^CSR_REGID_([a-zA-Z0-9_]+), ").unwrap());
    static PAIR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^CSR_REGID2_([a-zA-Z0-9_]+)(_EL[0-3]+), ").unwrap());

    let mut count = 0;
    let mut pairs = PendingPairs::default();

    for line in lines.into_iter().map(str::trim) {
        if let Some(caps) = SINGLE.captures(line) {
            if &caps[1] != "INVALID" {
                registry.get_or_insert(&caps[1]).kernel_access = true;
                count += 1;
            }
        } else if let Some(caps) = PAIR.captures(line) {
            pairs.0.push(RegisterPair {
                base: caps[1].to_owned(),
                suffix: caps[2].to_owned(),
            });
        }
    }

    (count, pairs)
}
