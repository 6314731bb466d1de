use super::*;

pub fn serialize(file: &File) -> Vec<u8> {
    let mut b = vec![0_u8; 24];

    let lh = serialize_section(&file.header, &mut b);

    let (bc, ec) = if file.char_infos.is_empty() {
        (1, 0)
    } else {
        let bc = file.smallest_char_code.0 as u16;
        let diff = serialize_section(&file.char_infos, &mut b);
        (bc, bc + diff - 1)
    };

    let nw = serialize_section(&file.widths, &mut b);
    let nh = serialize_section(&file.heights, &mut b);
    let nd = serialize_section(&file.depths, &mut b);
    let ni = serialize_section(&file.italic_corrections, &mut b);

    let nl = serialize_section(&file.lig_kern_instructions, &mut b);
    let nk = serialize_section(&file.kerns, &mut b);
    let ne = serialize_section(&file.extensible_chars, &mut b);

    let np = serialize_section(&file.params, &mut b);

    let lf = 6 + lh + (ec + 1 - bc) + nw + nh + nd + ni + nl + nk + ne + np;
    for (u, v) in [lf, lh, bc, ec, nw, nh, nd, ni, nl, nk, ne, np]
        .into_iter()
        .enumerate()
    {
        [b[2 * u], b[2 * u + 1]] = v.to_be_bytes();
    }
    b
}

fn serialize_section<T: Serializable>(t: &T, b: &mut Vec<u8>) -> u16 {
    let start = b.len();
    t.serialize(b);
    let words = (b.len() - start) / 4;
    match i16::try_from(words) {
        Ok(words) => words as u16,
        Err(_) => panic!("a .tfm section cannot contain {words} words"),
    }
}

trait Serializable: Sized {
    fn serialize(&self, b: &mut Vec<u8>);
}

impl Serializable for u32 {
    fn serialize(&self, b: &mut Vec<u8>) {
        b.extend(self.to_be_bytes())
    }
}

impl Serializable for Option<CharInfo> {
    fn serialize(&self, b: &mut Vec<u8>) {
        match self {
            None => b.extend([0; 4]),
            Some(char_info) => char_info.to_word().serialize(b),
        }
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn serialize(&self, b: &mut Vec<u8>) {
        for element in self {
            element.serialize(b)
        }
    }
}

impl Serializable for FixWord {
    fn serialize(&self, b: &mut Vec<u8>) {
        (self.0 as u32).serialize(b)
    }
}

impl Serializable for ligkern::lang::Instruction {
    fn serialize(&self, b: &mut Vec<u8>) {
        b.extend(self.to_bytes())
    }
}

impl Serializable for ExtensibleRecipe {
    fn serialize(&self, b: &mut Vec<u8>) {
        self.to_word().serialize(b)
    }
}

impl Serializable for Params {
    fn serialize(&self, b: &mut Vec<u8>) {
        self.0.serialize(b)
    }
}

/// Writes a BCPL string into a field of `size + 1` bytes.
///
/// Strings that don't fit are truncated.
fn serialize_string(s: &str, size: u8, b: &mut Vec<u8>) {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| u8::try_from(c).unwrap_or(b'?'))
        .take(size as usize)
        .collect();
    b.push(bytes.len() as u8);
    let padding = size as usize - bytes.len();
    b.extend(bytes);
    b.extend(std::iter::repeat(0).take(padding));
}

impl Serializable for Header {
    /// The optional fields are written if any of them is set.
    ///
    /// In that case the header is at least 18 words long.
    fn serialize(&self, b: &mut Vec<u8>) {
        self.checksum.serialize(b);
        self.design_size.serialize(b);
        let has_optional_fields = self.character_coding_scheme.is_some()
            || self.font_family.is_some()
            || self.seven_bit_safe.is_some()
            || self.face.is_some()
            || !self.additional_data.is_empty();
        if !has_optional_fields {
            return;
        }
        serialize_string(
            self.character_coding_scheme.as_deref().unwrap_or_default(),
            39,
            b,
        );
        serialize_string(self.font_family.as_deref().unwrap_or_default(), 19, b);
        if self.seven_bit_safe == Some(true) {
            // Any value >=128 is interpreted as true, but PLtoTF.2014.133 uses 128 exactly...
            b.push(128);
        } else {
            // ...and 0 for false.
            b.push(0);
        }
        b.push(0);
        b.push(0);
        b.push(self.face.unwrap_or(0_u8.into()).into());
        self.additional_data.serialize(b);
    }
}
