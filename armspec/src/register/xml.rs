//! Vendor XML register descriptions

use {
    super::{name_from_instruction, Bitfield, Encoding, RegisterRegistry},
    crate::{error::Result, warning::Warnings, xml},
    log::trace,
    roxmltree::Node,
    std::path::Path,
};

const OPS: [&str; 5] = ["op0", "op1", "CRn", "CRm", "op2"];

/// Lists the per-register XML files referenced by the register index
pub fn load_register_index<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let text = xml::read(&path)?;
    let doc = xml::parse(&path, &text)?;

    Ok(
        xml::find_all(doc.root_element(), &["register_links", "register_link"])
            .filter_map(|link| link.attribute("registerfile"))
            .filter(|file| !file.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

/// Loads one per-register XML file.
///
/// Encodings are attributed to the register named in their access
/// instruction, which is not always the register the file describes.
pub fn load_register_file<P: AsRef<Path>>(
    registry: &mut RegisterRegistry,
    path: P,
    warnings: &mut Warnings,
) -> Result<()> {
    let text = xml::read(&path)?;
    let doc = xml::parse(&path, &text)?;
    let root = doc.root_element();

    let Some(name) = xml::find_text(root, &["registers", "register", "reg_short_name"]) else {
        return Ok(());
    };
    if is_generic(name) {
        trace!("skipping generic register {name:?}");
        return Ok(());
    }
    let name = name.trim().to_uppercase();
    registry.get_or_insert(&name);

    for enc in xml::find_all(root, &["encoding"]) {
        let Some(enc_name) = xml::child_text(enc, "access_instruction").and_then(name_from_instruction)
        else {
            continue;
        };
        let [op0, op1, crn, crm, op2] =
            OPS.map(|op| xml::child_with_attr(enc, "enc", "n", op).and_then(|e| e.attribute("v")));
        let (Some(op0), Some(op1), Some(crn), Some(crm), Some(op2)) = (op0, op1, crn, crm, op2)
        else {
            continue;
        };

        if let Some(encoding) = Encoding::new(op0, op1, crn, crm, op2) {
            warnings.extend(registry.get_or_insert(&enc_name).set_encoding(encoding));
        }
    }

    let reg = registry.get_or_insert(&name);

    if let Some(desc) = xml::find_text(root, &["registers", "register", "reg_long_name"]) {
        let desc = desc.trim();
        if !desc.is_empty() {
            reg.description = desc.to_owned();
        }
    }

    if !reg.is_relevant() {
        return Ok(());
    }

    if let Some(fields) = xml::find(root, &["fields"]) {
        if let Some(size) = fields
            .attribute("length")
            .filter(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()))
            .and_then(|l| l.parse().ok())
        {
            reg.size = size;
        }

        let bitfields = fields
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name("field"))
            .filter_map(bitfield)
            .collect();

        warnings.extend(reg.set_bitfields(bitfields));
    }

    Ok(())
}

/// Placeholder names such as `DBGBCR<n>_EL1`
fn is_generic(name: &str) -> bool {
    name.find('<')
        .is_some_and(|open| name[open..].contains('>'))
}

fn bitfield(field: Node) -> Option<Bitfield> {
    let name = xml::child_text(field, "field_name")?;
    let msb = xml::child_text(field, "field_msb")?.trim().parse().ok()?;
    let lsb = xml::child_text(field, "field_lsb")?.trim().parse().ok()?;

    let mut bitfield = Bitfield::new(name, msb, lsb)?;

    if let Some(description) = xml::children(field, "field_description")
        .filter(|d| d.attribute("order") == Some("before"))
        .map(xml::joined_text)
        .find(|d| !d.is_empty())
    {
        bitfield.description = description;
    }

    Some(bitfield)
}

/// Loads encodings of already known registers from the encoding index,
/// returns the number of encodings applied
pub fn load_encoding_index<P: AsRef<Path>>(
    registry: &mut RegisterRegistry,
    path: P,
    warnings: &mut Warnings,
) -> Result<usize> {
    let text = xml::read(&path)?;
    let doc = xml::parse(&path, &text)?;

    let mut count = 0;

    for row in xml::find_all(doc.root_element(), &["row"]) {
        let [op0, op1, crn, crm, op2] = OPS.map(|op| {
            xml::child_with_attr(row, "entry", "field", op).map(xml::text)
        });
        let (Some(op0), Some(op1), Some(crn), Some(crm), Some(op2)) = (op0, op1, crn, crm, op2)
        else {
            continue;
        };
        let Some(encoding) = Encoding::new(op0, op1, crn, crm, op2) else {
            continue;
        };

        for entry in xml::children(row, "entry") {
            if let Some(reg) = registry.get_mut(xml::text(entry).trim()) {
                warnings.extend(reg.set_encoding(encoding.clone()));
                count += 1;
            }
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use {
        super::{bitfield, is_generic},
        crate::xml,
    };

    #[test]
    fn generic_names() {
        assert!(is_generic("DBGBCR<n>_EL1"));
        assert!(!is_generic("DBGBCR0_EL1"));
        assert!(!is_generic("A>B<"));
    }

    #[test]
    fn field() {
        let text = r#"<field id="TG0">
            <field_name>TG0</field_name>
            <field_msb>15</field_msb>
            <field_lsb>14</field_lsb>
            <field_description order="after"><para>ignored</para></field_description>
            <field_description order="before"><para>   </para></field_description>
            <field_description order="before"><para>Granule size for
              <register_link>TTBR0_EL1</register_link>.</para></field_description>
        </field>"#;
        let doc = xml::parse("field.xml", text).unwrap();
        let bf = bitfield(doc.root_element()).unwrap();
        assert_eq!(bf.name, "TG0");
        assert_eq!(bf.lsb, 14);
        assert_eq!(bf.width, 2);
        assert_eq!(bf.description, "Granule size for TTBR0_EL1 .");
    }
}
