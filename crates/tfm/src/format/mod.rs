//! The TeX font metric (.tfm) file format
//!
//! This module converts between bytes and the raw tables of a .tfm file ([`File`]).
//! It checks that the file is structurally sound: that the sub-file sizes
//!     at the start of the file are consistent with each other and with the file length.
//! It does not check that the tables are consistent with each other;
//!     this happens when a [`File`] is turned into a [`Font`](crate::Font).

mod deserialize;
mod serialize;

use super::*;

pub use deserialize::Error as DeserializeError;
pub use deserialize::SubFileSizes;
pub use deserialize::Warning as DeserializeWarning;

/// Complete contents of a TeX font metric (.tfm) file.
///
/// In TeX the font data for all fonts is stored in one contiguous piece of memory
///     (`font_info`, defined in TeX82.2021.549).
/// Here each table is a separate vector, but entries are still referred to by index
///     exactly as in the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct File {
    /// Header.
    pub header: Header,

    /// The smallest character in the font.
    pub smallest_char_code: Char,

    /// Character infos.
    ///
    /// The char infos mostly contain indices for other vectors in this struct.
    /// A [`None`] entry is a character code in the font's range that does not exist.
    pub char_infos: Vec<Option<CharInfo>>,

    /// Character widths
    pub widths: Vec<FixWord>,

    /// Character heights
    pub heights: Vec<FixWord>,

    /// Character depths
    pub depths: Vec<FixWord>,

    /// Character italic corrections
    pub italic_corrections: Vec<FixWord>,

    /// Lig kern instructions.
    pub lig_kern_instructions: Vec<ligkern::lang::Instruction>,

    /// Kerns. These are referenced from inside the lig kern instructions.
    pub kerns: Vec<FixWord>,

    /// Extensible characters.
    pub extensible_chars: Vec<ExtensibleRecipe>,

    /// Font parameters.
    pub params: Params,
}

impl Default for File {
    fn default() -> Self {
        Self {
            header: Default::default(),
            smallest_char_code: Default::default(),
            char_infos: vec![],
            widths: vec![FixWord::ZERO],
            heights: vec![FixWord::ZERO],
            depths: vec![FixWord::ZERO],
            italic_corrections: vec![FixWord::ZERO],
            lig_kern_instructions: vec![],
            kerns: vec![],
            extensible_chars: vec![],
            params: Default::default(),
        }
    }
}

impl File {
    pub fn deserialize(b: &[u8]) -> Result<(File, Vec<DeserializeWarning>), DeserializeError> {
        deserialize::deserialize(b)
    }

    /// Serializes the file in the format PLtoTF writes.
    ///
    /// # Panics
    ///
    /// Panics if a table has more than 32767 words, which no .tfm file can represent.
    pub fn serialize(&self) -> Vec<u8> {
        serialize::serialize(self)
    }

    /// Builds a file containing the given characters with the given widths.
    ///
    /// The characters have zero height, depth and italic correction, and no tags.
    /// Distinct widths share entries in the widths array.
    pub fn from_chars(chars: &[(Char, FixWord)]) -> File {
        let mut file: File = Default::default();
        let Some(smallest) = chars.iter().map(|(c, _)| *c).min() else {
            return file;
        };
        let largest = chars.iter().map(|(c, _)| *c).max().unwrap_or(smallest);
        file.smallest_char_code = smallest;
        file.char_infos = vec![None; (largest.0 - smallest.0) as usize + 1];
        for (c, width) in chars {
            file.set_char(*c, *width);
        }
        file
    }

    /// Adds a character with the given width, or changes the width of an existing character.
    ///
    /// The character must be in the range of the char info table.
    /// Extend the table first with [`File::extend_range`] if it isn't.
    pub fn set_char(&mut self, c: Char, width: FixWord) {
        let width_index = match self.widths.iter().position(|w| *w == width) {
            Some(0) | None => {
                self.widths.push(width);
                self.widths.len() - 1
            }
            Some(i) => i,
        };
        let Some(slot) = (c.0 as usize)
            .checked_sub(self.smallest_char_code.0 as usize)
            .and_then(|i| self.char_infos.get_mut(i))
        else {
            return;
        };
        let width_index = std::num::NonZeroU8::new(width_index.min(255) as u8)
            .unwrap_or(std::num::NonZeroU8::MIN);
        match slot {
            Some(info) => info.width_index = width_index,
            None => {
                *slot = Some(CharInfo {
                    width_index,
                    height_index: 0,
                    depth_index: 0,
                    italic_index: 0,
                    tag: CharTag::None,
                })
            }
        }
    }

    /// Extends the char info table so that it covers the character.
    pub fn extend_range(&mut self, c: Char) {
        if self.char_infos.is_empty() {
            self.smallest_char_code = c;
            self.char_infos.push(None);
            return;
        }
        let smallest = self.smallest_char_code.0 as usize;
        if (c.0 as usize) < smallest {
            let mut v = vec![None; smallest - c.0 as usize];
            v.append(&mut self.char_infos);
            self.char_infos = v;
            self.smallest_char_code = c;
        } else if c.0 as usize >= smallest + self.char_infos.len() {
            self.char_infos.resize(c.0 as usize - smallest + 1, None);
        }
    }

    /// Returns a mutable reference to the char info of a character, if it exists.
    pub fn char_info_mut(&mut self, c: Char) -> Option<&mut CharInfo> {
        let i = (c.0 as usize).checked_sub(self.smallest_char_code.0 as usize)?;
        self.char_infos.get_mut(i)?.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_chars_shares_widths() {
        let file = File::from_chars(&[
            (Char(b'a'), FixWord::UNITY),
            (Char(b'c'), FixWord::UNITY / 2),
            (Char(b'b'), FixWord::UNITY),
        ]);
        assert_eq!(file.smallest_char_code, Char(b'a'));
        assert_eq!(file.char_infos.len(), 3);
        assert_eq!(
            file.widths,
            vec![FixWord::ZERO, FixWord::UNITY, FixWord::UNITY / 2]
        );
        let width_indices: Vec<Option<u8>> = file
            .char_infos
            .iter()
            .map(|info| info.as_ref().map(|info| info.width_index.get()))
            .collect();
        assert_eq!(width_indices, vec![Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn zero_width_chars_get_their_own_entry() {
        let file = File::from_chars(&[(Char(b'a'), FixWord::ZERO)]);
        assert_eq!(file.widths, vec![FixWord::ZERO, FixWord::ZERO]);
        assert_eq!(file.char_infos[0].as_ref().map(|i| i.width_index.get()), Some(1));
    }

    #[test]
    fn extend_range() {
        let mut file = File::from_chars(&[(Char(10), FixWord::UNITY)]);
        file.extend_range(Char(8));
        file.extend_range(Char(12));
        assert_eq!(file.smallest_char_code, Char(8));
        assert_eq!(file.char_infos.len(), 5);
        assert!(file.char_infos[2].is_some());
        file.set_char(Char(12), FixWord::UNITY);
        assert!(file.char_info_mut(Char(12)).is_some());
        assert!(file.char_info_mut(Char(11)).is_none());
    }
}
