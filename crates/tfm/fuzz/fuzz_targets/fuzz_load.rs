#![no_main]

use extex_tfm::{Char, Font, FontKey, ScaledFont};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|input: Input| {
    let tfm_bytes = input.tfm_bytes();
    let font = match Font::from_bytes(&tfm_bytes) {
        Ok(font) => Arc::new(font),
        Err(_) => return,
    };
    let font = match ScaledFont::new(font, FontKey::default().scaled(input.scale)) {
        Ok(font) => font,
        Err(_) => return,
    };
    for left in 0..=u8::MAX {
        let glyph = font.glyph(Char(left));
        if !glyph.exists() {
            assert!(glyph.ligatures.is_empty());
            assert!(glyph.kerns.is_empty());
        }
        for right in 0..=u8::MAX {
            font.kern(Char(left), Char(right));
            font.ligature(Char(left), Char(right));
        }
    }
    font.space();
});

/// The sections of a .tfm file.
///
/// The sub-file sizes are computed from the sections so that most inputs
///     get past the structural checks and exercise the load-time validation.
#[derive(Clone, Debug, arbitrary::Arbitrary)]
pub struct Input {
    pub scale: i32,
    pub header: Vec<u32>,
    pub smallest_char: u8,
    pub char_infos: Vec<u32>,
    pub widths: Vec<u32>,
    pub heights: Vec<u32>,
    pub depths: Vec<u32>,
    pub italic_corrections: Vec<u32>,
    pub lig_kern_instructions: Vec<u32>,
    pub kerns: Vec<u32>,
    pub extensible_recipes: Vec<u32>,
    pub params: Vec<u32>,
}

impl Input {
    fn tfm_bytes(&self) -> Vec<u8> {
        let mut b = vec![0_u8; 24];
        let lh = append_words(&mut b, &self.header, 2, 1000);
        let max_chars = 256 - self.smallest_char as usize;
        let num_chars = append_words(&mut b, &self.char_infos, 0, max_chars);
        let (bc, ec) = if num_chars == 0 {
            (1, 0)
        } else {
            let bc = self.smallest_char as i16;
            (bc, bc + num_chars - 1)
        };
        let nw = append_words(&mut b, &self.widths, 1, 256);
        let nh = append_words(&mut b, &self.heights, 1, 16);
        let nd = append_words(&mut b, &self.depths, 1, 16);
        let ni = append_words(&mut b, &self.italic_corrections, 1, 64);
        let nl = append_words(&mut b, &self.lig_kern_instructions, 0, 1000);
        let nk = append_words(&mut b, &self.kerns, 0, 1000);
        let ne = append_words(&mut b, &self.extensible_recipes, 0, 256);
        let np = append_words(&mut b, &self.params, 0, 1000);
        let lf = 6 + lh + (ec + 1 - bc) + nw + nh + nd + ni + nl + nk + ne + np;
        for (i, v) in [lf, lh, bc, ec, nw, nh, nd, ni, nl, nk, ne, np]
            .into_iter()
            .enumerate()
        {
            [b[2 * i], b[2 * i + 1]] = v.to_be_bytes();
        }
        b
    }
}

fn append_words(b: &mut Vec<u8>, raw: &[u32], min: usize, max: usize) -> i16 {
    let raw = &raw[..raw.len().min(max)];
    b.extend(raw.iter().flat_map(|u| u.to_be_bytes()));
    for _ in raw.len()..min {
        b.extend([0_u8; 4]);
    }
    raw.len().max(min) as i16
}
