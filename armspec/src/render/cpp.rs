//! C/C++ header fragments

use {
    super::{column_width, Lines},
    crate::register::RegisterRegistry,
    common::mask::mask,
};

/// `CSR_SREG_<NAME>` encoding macros of the kernel interface header,
/// registers without encoding are left out
pub fn kernel_header(registry: &RegisterRegistry) -> String {
    let registers = registry.sorted_exact();
    let name_w = column_width("", registers.iter().map(|r| r.name.as_str()));

    let mut out = Lines::default();
    for reg in registers {
        if let Some(encoding) = &reg.encoding {
            out.push(format!(
                "#define CSR_SREG_{:<name_w$}  CSR_SREG({encoding})",
                reg.name
            ));
        }
    }
    out.finish()
}

/// `<REGISTER>_<BITFIELD>()` accessor methods of the feature-detection
/// class, one group per register in field declaration order
pub fn feature_header(registry: &RegisterRegistry) -> String {
    let registers = registry.cpp_bound();

    let mut out = Lines::default();
    for (i, (reg, cpp)) in registers.iter().enumerate() {
        if i > 0 {
            out.blank();
        }
        for bf in reg.bitfields.as_deref().unwrap_or_default() {
            let typename = if bf.width < 32 { "int" } else { "csr_u64_t" };
            let shift = if bf.lsb == 0 {
                String::new()
            } else {
                format!(" >> {}", bf.lsb)
            };
            out.push(format!(
                "    {typename} {}_{}() const {{ return ({typename})({}{shift}) & 0x{:02X}; }}",
                reg.name,
                bf.name,
                cpp.field,
                mask(bf.width)
            ));
        }
    }
    out.finish()
}

/// Register view table of every kernel-accessible register, a standalone
/// source fragment
pub fn regview(registry: &RegisterRegistry) -> String {
    let mut out = Lines::default();
    for reg in registry.kernel_accessible() {
        out.push("    {");
        out.push(format!(
            "        \"{}\", CSR_REGID_{}, READ,",
            reg.name, reg.name
        ));
        out.push("        {");
        if let Some(bitfields) = reg.bitfields.as_deref().filter(|b| !b.is_empty()) {
            let width = 3 + column_width("", bitfields.iter().map(|bf| bf.name.as_str()));
            for bf in bitfields {
                let name = format!("\"{}\",", bf.name);
                out.push(format!(
                    "            {{{name:<width$} {:2}, {:2}, {{}}}},",
                    bf.msb(),
                    bf.lsb
                ));
            }
        }
        out.push("        }");
        out.push("    },");
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use {
        super::{feature_header, kernel_header, regview},
        crate::register::{Bitfield, CppBinding, Encoding, RegisterRegistry},
        pretty_assertions::assert_eq,
    };

    fn registry() -> RegisterRegistry {
        let mut registry = RegisterRegistry::new();

        let pfr0 = registry.get_or_insert("ID_AA64PFR0_EL1");
        pfr0.encoding = Encoding::new("11", "000", "0000", "0100", "000");
        pfr0.cpp = Some(CppBinding {
            field: "_aa64pfr0".to_owned(),
            index: 1,
        });
        pfr0.kernel_access = true;
        pfr0.set_bitfields(vec![
            Bitfield::new("EL0", 3, 0).unwrap(),
            Bitfield::new("CSV3", 63, 60).unwrap(),
        ]);

        let isar0 = registry.get_or_insert("ID_AA64ISAR0_EL1");
        isar0.cpp = Some(CppBinding {
            field: "_aa64isar0".to_owned(),
            index: 0,
        });
        isar0.set_bitfields(vec![Bitfield::new("AES", 7, 4).unwrap()]);

        let mut tcr = Bitfield::new("TCR", 63, 0).unwrap();
        tcr.description = "ignored".to_owned();
        let rndr = registry.get_or_insert("RNDR");
        rndr.encoding = Encoding::new("11", "011", "0010", "0100", "000");
        rndr.set_bitfields(vec![tcr]);
        rndr.cpp = Some(CppBinding {
            field: "_rndr".to_owned(),
            index: 2,
        });

        registry
    }

    #[test]
    fn kernel() {
        assert_eq!(
            kernel_header(&registry()),
            "#define CSR_SREG_ID_AA64PFR0_EL1   CSR_SREG(0b11, 0b000, 0b0000, 0b0100, 0b000)\n\
             #define CSR_SREG_RNDR              CSR_SREG(0b11, 0b011, 0b0010, 0b0100, 0b000)\n"
        );
    }

    #[test]
    fn accessors() {
        assert_eq!(
            feature_header(&registry()),
            "    int ID_AA64ISAR0_EL1_AES() const { return (int)(_aa64isar0 >> 4) & 0x0F; }\n\
             \n\
             \x20   int ID_AA64PFR0_EL1_CSV3() const { return (int)(_aa64pfr0 >> 60) & 0x0F; }\n\
             \x20   int ID_AA64PFR0_EL1_EL0() const { return (int)(_aa64pfr0) & 0x0F; }\n\
             \n\
             \x20   csr_u64_t RNDR_TCR() const { return (csr_u64_t)(_rndr) & 0xFFFFFFFFFFFFFFFF; }\n"
        );
    }

    #[test]
    fn view() {
        assert_eq!(
            regview(&registry()),
            "    {\n\
             \x20       \"ID_AA64PFR0_EL1\", CSR_REGID_ID_AA64PFR0_EL1, READ,\n\
             \x20       {\n\
             \x20           {\"CSV3\", 63, 60, {}},\n\
             \x20           {\"EL0\",   3,  0, {}},\n\
             \x20       }\n\
             \x20   },\n"
        );
    }
}
