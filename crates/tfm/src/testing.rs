//! Font files shared by the tests in this crate.

use crate::format::File;
use crate::ligkern::lang::{Instruction, PostLigOperation};
use crate::*;

pub const FF: Char = Char(0xA6);
pub const FI: Char = Char(0xA7);
pub const FFI: Char = Char(0xA8);

fn lig(right: u8, insert: Char, next: Option<u8>) -> Instruction {
    Instruction::ligature(
        Char(right),
        insert,
        PostLigOperation::RetainNeitherMoveToInserted,
        next,
    )
}

/// A text font in the style of cmr10.
///
/// - `f` has ligatures with `f` and `i`, and `ff` has a ligature with `i`.
/// - `A` kerns with `o` but not with `V`.
/// - `V` kerns with `A` and `o`.
/// - The seven text parameters are set.
pub fn text_font() -> File {
    let mut file = File::from_chars(&[
        (Char::A, FixWord(786434)),
        (Char::V, FixWord(786434)),
        (Char(b'f'), FixWord(320858)),
        (Char(b'i'), FixWord(291271)),
        (Char(b'o'), FixWord(524288)),
        (FF, FixWord(611672)),
        (FI, FixWord(582544)),
        (FFI, FixWord(873816)),
    ]);
    file.header.checksum = 0x4BF16079;
    file.header.character_coding_scheme = Some("TeX text".into());
    file.header.font_family = Some("CMR".into());
    file.header.seven_bit_safe = Some(false);
    file.header.face = Some(Face::from(0xEA));
    file.heights = vec![FixWord::ZERO, FixWord(713045), FixWord(734003)];
    file.italic_corrections = vec![FixWord::ZERO, FixWord(81557)];
    for c in [Char::A, Char::V] {
        if let Some(info) = file.char_info_mut(c) {
            info.height_index = 1;
        }
    }
    if let Some(info) = file.char_info_mut(Char(b'f')) {
        info.height_index = 2;
        info.italic_index = 1;
        info.tag = CharTag::Ligature(0);
    }
    if let Some(info) = file.char_info_mut(FF) {
        info.tag = CharTag::Ligature(2);
    }
    if let Some(info) = file.char_info_mut(Char::A) {
        info.tag = CharTag::Ligature(3);
    }
    if let Some(info) = file.char_info_mut(Char::V) {
        info.tag = CharTag::Ligature(4);
    }
    file.lig_kern_instructions = vec![
        /* 0: f */ lig(b'f', FF, Some(0)),
        /* 1 */ lig(b'i', FI, None),
        /* 2: ff */ lig(b'i', FFI, None),
        /* 3: A */ Instruction::kern(Char(b'o'), 0, None),
        /* 4: V */ Instruction::kern(Char::A, 1, Some(0)),
        /* 5 */ Instruction::kern(Char(b'o'), 0, None),
    ];
    file.kerns = vec![FixWord(-29128), FixWord(-116508)];
    file.params = Params(vec![
        /* SLANT */ FixWord::ZERO,
        /* SPACE */ FixWord(349526),
        /* STRETCH */ FixWord(174763),
        /* SHRINK */ FixWord(116508),
        /* XHEIGHT */ FixWord(451470),
        /* QUAD */ FixWord::UNITY,
        /* EXTRASPACE */ FixWord(116508),
    ]);
    file
}

/// A font with capital letters only and a single parameter, the slant.
pub fn math_symbol_font() -> File {
    let chars: Vec<(Char, FixWord)> = (b'A'..=b'Z')
        .map(|c| (Char(c), FixWord::UNITY / 2))
        .collect();
    let mut file = File::from_chars(&chars);
    file.params = Params(vec![FixWord::UNITY / 4]);
    file
}

/// A font whose `A` has a chain of larger versions and whose `B` is extensible.
pub fn math_extension_font() -> File {
    let mut file = File::from_chars(&[
        (Char::A, FixWord::UNITY / 2),
        (Char::B, FixWord::UNITY / 2),
        (Char::C, FixWord::UNITY),
        (Char::X, FixWord::UNITY),
        (Char::Y, FixWord::UNITY),
    ]);
    if let Some(info) = file.char_info_mut(Char::A) {
        info.tag = CharTag::List(Char::C);
    }
    if let Some(info) = file.char_info_mut(Char::C) {
        info.tag = CharTag::List(Char::X);
    }
    if let Some(info) = file.char_info_mut(Char::B) {
        info.tag = CharTag::Extension(0);
    }
    file.extensible_chars = vec![ExtensibleRecipe {
        top: Some(Char::X),
        middle: None,
        bottom: Some(Char::Y),
        rep: Char::C,
    }];
    file
}
