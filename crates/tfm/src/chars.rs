//! Per-character data: the char info table and the shared dimension arrays.
//!
//! In a TFM file the dimensions of characters are not stored per character.
//! Instead there are four small arrays of distinct widths, heights, depths and italic corrections,
//!     and each character stores indices into these arrays.
//! The [`CharInfoTable`] keeps this layout and resolves indices when queried.

use std::num::NonZeroU8;

use crate::{Char, CorruptIndexError, FixWord, Table};

/// Data about one character in a .tfm file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct CharInfo {
    /// Index into the widths array.
    ///
    /// A width index of zero means the character is not in the font,
    ///     which is why this is never zero for a [`CharInfo`] that exists.
    pub width_index: NonZeroU8,
    /// Index into the heights array; 4 bits.
    pub height_index: u8,
    /// Index into the depths array; 4 bits.
    pub depth_index: u8,
    /// Index into the italic corrections array; 6 bits.
    pub italic_index: u8,
    pub tag: CharTag,
}

/// Tag of a character in a .tfm file.
///
/// The payload is the remainder byte of the char info word.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum CharTag {
    #[default]
    None,
    /// The character has a lig/kern program starting at this index.
    Ligature(u8),
    /// The character is part of a chain of successively larger characters.
    List(Char),
    /// The character is built from pieces according to this extensible recipe.
    Extension(u8),
}

/// Extensible recipe instruction in a .tfm file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct ExtensibleRecipe {
    pub top: Option<Char>,
    pub middle: Option<Char>,
    pub bottom: Option<Char>,
    pub rep: Char,
}

impl ExtensibleRecipe {
    pub fn from_word(word: u32) -> ExtensibleRecipe {
        let b = word.to_be_bytes();
        let char_or = |b: u8| if b == 0 { None } else { Some(Char(b)) };
        ExtensibleRecipe {
            top: char_or(b[0]),
            middle: char_or(b[1]),
            bottom: char_or(b[2]),
            rep: Char(b[3]),
        }
    }

    pub fn to_word(&self) -> u32 {
        u32::from_be_bytes([
            self.top.unwrap_or_default().0,
            self.middle.unwrap_or_default().0,
            self.bottom.unwrap_or_default().0,
            self.rep.0,
        ])
    }

    /// All characters the recipe refers to.
    pub fn chars(&self) -> impl Iterator<Item = Char> + '_ {
        [self.top, self.middle, self.bottom, Some(self.rep)]
            .into_iter()
            .flatten()
    }
}

impl CharInfo {
    /// Decodes a packed char info word.
    ///
    /// Returns [`None`] if the width index is zero, which means the character does not exist.
    pub fn from_word(word: u32) -> Option<CharInfo> {
        let b = word.to_be_bytes();
        let width_index = NonZeroU8::new(b[0])?;
        Some(CharInfo {
            width_index,
            height_index: b[1] / (1 << 4),
            depth_index: b[1] % (1 << 4),
            italic_index: b[2] / (1 << 2),
            tag: match b[2] % (1 << 2) {
                0 => CharTag::None,
                1 => CharTag::Ligature(b[3]),
                2 => CharTag::List(Char(b[3])),
                _ => CharTag::Extension(b[3]),
            },
        })
    }

    pub fn to_word(&self) -> u32 {
        let (discriminant, payload) = match self.tag {
            CharTag::None => (0_u8, 0_u8),
            CharTag::Ligature(p) => (1, p),
            CharTag::List(p) => (2, p.0),
            CharTag::Extension(p) => (3, p),
        };
        u32::from_be_bytes([
            self.width_index.get(),
            self.height_index
                .wrapping_mul(16)
                .wrapping_add(self.depth_index % 16),
            self.italic_index
                .wrapping_mul(4)
                .wrapping_add(discriminant),
            payload,
        ])
    }
}

/// The four dimensions of a character, unscaled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: FixWord,
    pub height: FixWord,
    pub depth: FixWord,
    pub italic_correction: FixWord,
}

/// Char info entries for a contiguous range of character codes, and the arrays they index into.
///
/// All indices are checked when the table is built,
///     so lookups never fail for characters that exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharInfoTable {
    smallest_char: Char,
    entries: Vec<Option<CharInfo>>,
    widths: Vec<FixWord>,
    heights: Vec<FixWord>,
    depths: Vec<FixWord>,
    italic_corrections: Vec<FixWord>,
}

impl CharInfoTable {
    /// Decodes the packed char info words for the characters `bc..=ec` and checks their indices.
    ///
    /// If `bc > ec` the font has no characters and `char_info_words` should be empty.
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        char_info_words: &[u32],
        widths: Vec<FixWord>,
        heights: Vec<FixWord>,
        depths: Vec<FixWord>,
        italic_corrections: Vec<FixWord>,
        bc: Char,
        ec: Char,
    ) -> Result<CharInfoTable, CorruptIndexError> {
        let num_chars = if bc <= ec {
            (ec.0 - bc.0) as usize + 1
        } else {
            0
        };
        if char_info_words.len() < num_chars {
            return Err(CorruptIndexError {
                table: Table::Chars,
                index: bc.0 as usize + char_info_words.len(),
                len: char_info_words.len(),
                origin: None,
            });
        }
        let entries = char_info_words[..num_chars]
            .iter()
            .map(|word| CharInfo::from_word(*word))
            .collect();
        CharInfoTable::new(bc, entries, widths, heights, depths, italic_corrections)
    }

    /// Builds a table from decoded entries and checks their indices.
    pub fn new(
        smallest_char: Char,
        entries: Vec<Option<CharInfo>>,
        widths: Vec<FixWord>,
        heights: Vec<FixWord>,
        depths: Vec<FixWord>,
        italic_corrections: Vec<FixWord>,
    ) -> Result<CharInfoTable, CorruptIndexError> {
        let table = CharInfoTable {
            smallest_char,
            entries,
            widths,
            heights,
            depths,
            italic_corrections,
        };
        if table.entries.len() + smallest_char.0 as usize > 256 {
            return Err(CorruptIndexError {
                table: Table::Chars,
                index: 256,
                len: table.entries.len(),
                origin: None,
            });
        }
        for (c, info) in table.iter() {
            for (index, array, array_table) in [
                (info.width_index.get(), &table.widths, Table::Widths),
                (info.height_index, &table.heights, Table::Heights),
                (info.depth_index, &table.depths, Table::Depths),
                (
                    info.italic_index,
                    &table.italic_corrections,
                    Table::ItalicCorrections,
                ),
            ] {
                if index as usize >= array.len() {
                    return Err(CorruptIndexError {
                        table: array_table,
                        index: index as usize,
                        len: array.len(),
                        origin: Some(c),
                    });
                }
            }
        }
        Ok(table)
    }

    /// Number of entries in the table, including absent characters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The smallest character code covered by the table.
    pub fn smallest_char(&self) -> Char {
        self.smallest_char
    }

    /// The largest character code covered by the table, if the table is not empty.
    pub fn largest_char(&self) -> Option<Char> {
        let n = self.entries.len();
        if n == 0 {
            None
        } else {
            Some(Char(self.smallest_char.0.wrapping_add((n - 1) as u8)))
        }
    }

    pub fn get(&self, c: Char) -> Option<&CharInfo> {
        let offset = (c.0 as usize).checked_sub(self.smallest_char.0 as usize)?;
        self.entries.get(offset)?.as_ref()
    }

    pub fn contains(&self, c: Char) -> bool {
        self.get(c).is_some()
    }

    /// Iterates over the characters that exist in the font, in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = (Char, &CharInfo)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, info)| {
            info.as_ref()
                .map(|info| (Char(self.smallest_char.0.wrapping_add(i as u8)), info))
        })
    }

    pub fn chars(&self) -> impl Iterator<Item = Char> + '_ {
        self.iter().map(|(c, _)| c)
    }

    /// Returns the unscaled dimensions of a character, or [`None`] if the character does not exist.
    pub fn dimensions(&self, c: Char) -> Option<Dimensions> {
        let info = self.get(c)?;
        let lookup = |array: &[FixWord], index: u8| -> FixWord {
            array.get(index as usize).copied().unwrap_or_default()
        };
        Some(Dimensions {
            width: lookup(&self.widths, info.width_index.get()),
            height: lookup(&self.heights, info.height_index),
            depth: lookup(&self.depths, info.depth_index),
            italic_correction: lookup(&self.italic_corrections, info.italic_index),
        })
    }

    pub fn widths(&self) -> &[FixWord] {
        &self.widths
    }

    pub fn heights(&self) -> &[FixWord] {
        &self.heights
    }

    pub fn depths(&self) -> &[FixWord] {
        &self.depths
    }

    pub fn italic_corrections(&self) -> &[FixWord] {
        &self.italic_corrections
    }

    /// The decoded entries, one per code starting at [`CharInfoTable::smallest_char`].
    pub fn entries(&self) -> &[Option<CharInfo>] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(n: i32) -> Vec<FixWord> {
        (0..n).map(|i| FixWord::UNITY * i / 4).collect()
    }

    #[test]
    fn decode_char_info_word() {
        let info = CharInfo::from_word(u32::from_be_bytes([13, 35, 16 + 1, 7])).unwrap();
        assert_eq!(
            info,
            CharInfo {
                width_index: NonZeroU8::new(13).unwrap(),
                height_index: 2,
                depth_index: 3,
                italic_index: 4,
                tag: CharTag::Ligature(7),
            }
        );
        assert_eq!(info.to_word(), u32::from_be_bytes([13, 35, 17, 7]));
    }

    #[test]
    fn zero_width_index_means_absent() {
        assert_eq!(CharInfo::from_word(u32::from_be_bytes([0, 35, 16, 7])), None);
    }

    #[test]
    fn absent_character_outside_range() {
        // A-Z only
        let words: Vec<u32> = (b'A'..=b'Z').map(|_| 1 << 24).collect();
        let table =
            CharInfoTable::parse(&words, dims(2), dims(1), dims(1), dims(1), Char(b'A'), Char(b'Z'))
                .unwrap();
        assert_eq!(table.len(), 26);
        assert_eq!(table.get(Char(b'a')), None);
        assert_eq!(table.dimensions(Char(b'a')), None);
        assert_eq!(table.get(Char(0)), None);
        assert_eq!(
            table.dimensions(Char(b'Q')).map(|d| d.width),
            Some(FixWord::UNITY / 4)
        );
        assert_eq!(table.largest_char(), Some(Char(b'Z')));
    }

    #[test]
    fn gaps_inside_range_are_absent() {
        let words = [1 << 24, 0, 1 << 24];
        let table =
            CharInfoTable::parse(&words, dims(2), dims(1), dims(1), dims(1), Char(10), Char(12))
                .unwrap();
        assert_eq!(table.chars().collect::<Vec<_>>(), vec![Char(10), Char(12)]);
        assert!(!table.contains(Char(11)));
    }

    #[test]
    fn empty_range() {
        let table =
            CharInfoTable::parse(&[], dims(1), dims(1), dims(1), dims(1), Char(1), Char(0)).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.largest_char(), None);
        assert_eq!(table.chars().count(), 0);
    }

    macro_rules! corrupt_index_tests {
        ( $( ($name: ident, $word: expr, $table: expr, $index: expr, $len: expr), )+ ) => {
            $(
                #[test]
                fn $name() {
                    let got = CharInfoTable::parse(
                        &[$word],
                        dims(3),
                        dims(2),
                        dims(2),
                        dims(1),
                        Char(b'x'),
                        Char(b'x'),
                    );
                    assert_eq!(
                        got,
                        Err(CorruptIndexError {
                            table: $table,
                            index: $index,
                            len: $len,
                            origin: Some(Char(b'x')),
                        })
                    );
                }
            )+
        };
    }

    corrupt_index_tests!(
        (width_out_of_range, u32::from_be_bytes([3, 0, 0, 0]), Table::Widths, 3, 3),
        (height_out_of_range, u32::from_be_bytes([1, 2 << 4, 0, 0]), Table::Heights, 2, 2),
        (depth_out_of_range, u32::from_be_bytes([1, 15, 0, 0]), Table::Depths, 15, 2),
        (
            italic_out_of_range,
            u32::from_be_bytes([1, 0, 1 << 2, 0]),
            Table::ItalicCorrections,
            1,
            1
        ),
    );

    #[test]
    fn missing_char_info_words() {
        let got = CharInfoTable::parse(&[1 << 24], dims(2), dims(1), dims(1), dims(1), Char(5), Char(6));
        assert_eq!(
            got,
            Err(CorruptIndexError {
                table: Table::Chars,
                index: 6,
                len: 1,
                origin: None,
            })
        );
    }

    #[test]
    fn extensible_recipe_word() {
        let recipe = ExtensibleRecipe::from_word(u32::from_be_bytes([0, 5, 6, 7]));
        assert_eq!(
            recipe,
            ExtensibleRecipe {
                top: None,
                middle: Some(Char(5)),
                bottom: Some(Char(6)),
                rep: Char(7),
            }
        );
        assert_eq!(recipe.to_word(), u32::from_be_bytes([0, 5, 6, 7]));
        assert_eq!(recipe.chars().collect::<Vec<_>>(), vec![Char(5), Char(6), Char(7)]);
    }
}
