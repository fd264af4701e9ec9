//! Markdown tables

use {
    super::{column_width, Lines},
    crate::{
        feature::{FeatureRegistry, DETECTABLE},
        instruction::{InstructionClass, InstructionRegistry},
        register::RegisterRegistry,
    },
};

/// Feature table, sorted case-insensitively, with the column labels of the
/// existing table
pub fn features(registry: &FeatureRegistry) -> String {
    let features = registry.sorted();
    let cols = registry.columns();

    let name_w = column_width(&cols.name, features.iter().map(|f| f.name.as_str()));
    let opt_w = column_width(&cols.optional, features.iter().map(|f| f.optional.as_str()));
    let mand_w = column_width(&cols.mandatory, features.iter().map(|f| f.mandatory.as_str()));
    let sys_w = column_width(&cols.sysregs, features.iter().map(|f| f.sysregs.as_str()));
    let desc_w = column_width(&cols.description, []);

    let detectable = features.iter().filter(|f| f.sysregs == DETECTABLE).count();
    let removed = features.iter().filter(|f| f.is_removed()).count();

    let mut out = Lines::default();
    out.push(format!(
        "Total: {} features, {detectable} detectable, {removed} removed.",
        features.len()
    ));
    out.blank();
    out.push(format!(
        "| {:<name_w$} | {:<opt_w$} | {:<mand_w$} | {:<sys_w$} | {}",
        cols.name, cols.optional, cols.mandatory, cols.sysregs, cols.description
    ));
    out.push(format!(
        "| {} | {} | {} | :{}: | {}",
        "-".repeat(name_w),
        "-".repeat(opt_w),
        "-".repeat(mand_w),
        "-".repeat(sys_w.saturating_sub(2)),
        "-".repeat(desc_w)
    ));
    for f in features {
        out.push(format!(
            "| {:<name_w$} | {:<opt_w$} | {:<mand_w$} | {:^sys_w$} | {}",
            f.name, f.optional, f.mandatory, f.sysregs, f.description
        ));
    }

    out.finish()
}

/// Register table, sorted case-insensitively
pub fn registers(registry: &RegisterRegistry) -> String {
    const HEADER: [&str; 3] = ["System Register", "sysregs", "Description"];

    let registers = registry.sorted();
    let name_w = column_width(HEADER[0], registers.iter().map(|r| r.name.as_str()));
    let sys_w = HEADER[1].len();
    let accessible = registers.iter().filter(|r| r.kernel_access).count();

    let mut out = Lines::default();
    out.push(format!(
        "Total: {} system registers, {accessible} can be accessed by cpusysregs.",
        registers.len()
    ));
    out.blank();
    out.push(format!(
        "| {:<name_w$} | {} | {}",
        HEADER[0], HEADER[1], HEADER[2]
    ));
    out.push(format!(
        "| {} | :{}: | {}",
        "-".repeat(name_w),
        "-".repeat(sys_w - 2),
        "-".repeat(HEADER[2].len())
    ));
    for reg in registers {
        let access = if reg.kernel_access { DETECTABLE } else { "" };
        out.push(format!(
            "| {:<name_w$} | {access:^sys_w$} | {}",
            reg.name, reg.description
        ));
    }

    out.finish()
}

/// One bitfield table per register, skipping registers without bitfields
/// or with a single field covering the whole register
pub fn bitfields(registry: &RegisterRegistry) -> String {
    const HEADER: [&str; 4] = ["Bitfield", "msb:lsb", "Size", "Description"];
    let pos_w = HEADER[1].len();
    let size_w = HEADER[2].len();

    let mut out = Lines::default();

    for reg in registry.sorted() {
        if !reg.has_bitfield_table() {
            continue;
        }
        let bitfields = reg.bitfields.as_deref().unwrap_or_default();
        let name_w = column_width(HEADER[0], bitfields.iter().map(|bf| bf.name.as_str()));

        out.blank();
        out.push(format!("## {} bitfields", reg.name));
        out.blank();
        out.push(format!(
            "| {:<name_w$} | {} | {} | {}",
            HEADER[0], HEADER[1], HEADER[2], HEADER[3]
        ));
        out.push(format!(
            "| {} | {}: | {}: | {}",
            "-".repeat(name_w),
            "-".repeat(pos_w - 1),
            "-".repeat(size_w - 1),
            "-".repeat(HEADER[3].len())
        ));
        for bf in bitfields {
            let pos = format!("{}:{}", bf.msb(), bf.lsb);
            let description = bf.description.replace('|', "\\|").replace('\n', " ");
            out.push(format!(
                "| {:<name_w$} | {pos:>pos_w$} | {:>size_w$} | {description}",
                bf.name, bf.width
            ));
        }
    }

    out.finish()
}

/// Instruction counts per class, then every instruction sorted by name
pub fn instructions(registry: &InstructionRegistry) -> String {
    const HEADER: [&str; 2] = ["Class", "Instructions"];

    let rows = InstructionClass::ALL
        .iter()
        .map(|class| (class.name(), registry.count(*class)))
        .chain([("Total", registry.total())])
        .collect::<Vec<_>>();
    let name_w = column_width(HEADER[0], rows.iter().map(|(name, _)| *name));

    let mut out = Lines::default();
    out.blank();
    out.push("## Number of instructions per class");
    out.blank();
    out.push(format!("| {:<name_w$} | {}", HEADER[0], HEADER[1]));
    out.push(format!(
        "| {} | {}",
        "-".repeat(name_w),
        "-".repeat(HEADER[1].len())
    ));
    for (name, count) in rows {
        out.push(format!("| {name:<name_w$} | {count}"));
    }

    out.blank();
    out.push("## All instructions");
    out.blank();
    out.push("| Opcode | Class | Description");
    out.push("| ------ | ----- | -----------");
    for inst in registry.sorted() {
        out.push(format!(
            "| {} | {} | {}",
            inst.name, inst.class, inst.description
        ));
    }

    out.finish()
}
