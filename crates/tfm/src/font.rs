use crate::chars::CharInfoTable;
use crate::format::File;
use crate::ligkern::{self, LigatureStep};
use crate::*;

/// A validated, immutable TeX font.
///
/// All of the indices inside the font have been checked when it was built,
///     so queries on it never fail.
/// A [`Font`] is unscaled: all of its dimensions are [`FixWord`]s relative to the font's size.
/// Use a [`ScaledFont`] to get absolute lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    header: Header,
    params: Params,
    chars: CharInfoTable,
    lig_kern: ligkern::Program,
    kerns: Vec<FixWord>,
    extensible_recipes: Vec<ExtensibleRecipe>,
}

impl extex_core::FontFormat for Font {
    const DEFAULT_FILE_EXTENSION: &'static str = "tfm";
    type Error = Error;

    fn parse(b: &[u8]) -> Result<Self, Self::Error> {
        Font::from_bytes(b)
    }
}

impl Font {
    /// Loads a font from the contents of a .tfm file.
    pub fn from_bytes(b: &[u8]) -> Result<Font, Error> {
        let (file, warnings) = File::deserialize(b)?;
        for warning in warnings {
            log::warn!("{warning}");
        }
        Font::from_file(file)
    }

    /// Validates the raw tables of a .tfm file and builds a font from them.
    ///
    /// The checks are the ones TeX performs when loading a font (TeX.2021.560-575).
    pub fn from_file(file: File) -> Result<Font, Error> {
        if file.header.design_size <= FixWord::ZERO {
            return Err(Error::InvalidHeader(file.header.design_size));
        }
        for (table, values) in [
            (Table::Widths, &file.widths),
            (Table::Heights, &file.heights),
            (Table::Depths, &file.depths),
            (Table::ItalicCorrections, &file.italic_corrections),
        ] {
            if let Some(first) = values.first() {
                if *first != FixWord::ZERO {
                    return Err(Error::NonZeroFirstEntry(table));
                }
            }
        }
        for (table, values, skip) in [
            (Table::Widths, &file.widths, 0),
            (Table::Heights, &file.heights, 0),
            (Table::Depths, &file.depths, 0),
            (Table::ItalicCorrections, &file.italic_corrections, 0),
            (Table::Kerns, &file.kerns, 0),
            // The slant is a pure number and is not scaled.
            (Table::Params, &file.params.0, 1),
        ] {
            check_fix_words(table, values, skip)?;
        }
        let chars = CharInfoTable::new(
            file.smallest_char_code,
            file.char_infos,
            file.widths,
            file.heights,
            file.depths,
            file.italic_corrections,
        )?;
        let lig_kern = ligkern::Program::new(file.lig_kern_instructions);
        let font = Font {
            header: file.header,
            params: file.params,
            chars,
            lig_kern,
            kerns: file.kerns,
            extensible_recipes: file.extensible_chars,
        };
        font.validate_tags()?;
        font.lig_kern.validate(font.kerns.len(), &font.chars)?;
        log::debug!(
            "loaded font with {} characters, {} lig/kern instructions and {} parameters (design size {}pt)",
            font.chars.chars().count(),
            font.lig_kern.len(),
            font.params.len(),
            font.header.design_size,
        );
        Ok(font)
    }

    /// Checks the targets of character tags (TeX.2021.570).
    fn validate_tags(&self) -> Result<(), Error> {
        let missing = |c: Char, origin: Char| CorruptIndexError {
            table: Table::Chars,
            index: c.0 as usize,
            len: self.chars.len(),
            origin: Some(origin),
        };
        for (c, info) in self.chars.iter() {
            match info.tag {
                CharTag::None => {}
                CharTag::Ligature(start) => {
                    if start as usize >= self.lig_kern.len() {
                        return Err(CorruptIndexError {
                            table: Table::LigKern,
                            index: start as usize,
                            len: self.lig_kern.len(),
                            origin: Some(c),
                        }
                        .into());
                    }
                }
                CharTag::List(next) => {
                    if !self.chars.contains(next) {
                        return Err(missing(next, c).into());
                    }
                    self.check_next_larger_chain(c)?;
                }
                CharTag::Extension(index) => {
                    let recipe =
                        self.extensible_recipes
                            .get(index as usize)
                            .ok_or(CorruptIndexError {
                                table: Table::ExtensibleRecipes,
                                index: index as usize,
                                len: self.extensible_recipes.len(),
                                origin: Some(c),
                            })?;
                    for piece in recipe.chars() {
                        if !self.chars.contains(piece) {
                            return Err(missing(piece, c).into());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn check_next_larger_chain(&self, start: Char) -> Result<(), Error> {
        let mut seen = [false; 256];
        let mut current = start;
        loop {
            if seen[current.0 as usize] {
                return Err(Error::NextLargerCycle(start));
            }
            seen[current.0 as usize] = true;
            match self.chars.get(current).map(|info| info.tag) {
                Some(CharTag::List(next)) => current = next,
                _ => return Ok(()),
            }
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn design_size(&self) -> FixWord {
        self.header.design_size
    }

    pub fn checksum(&self) -> u32 {
        self.header.checksum
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn chars(&self) -> &CharInfoTable {
        &self.chars
    }

    pub fn lig_kern_program(&self) -> &ligkern::Program {
        &self.lig_kern
    }

    pub fn kerns(&self) -> &[FixWord] {
        &self.kerns
    }

    /// Returns the kern at the given index; zero if there is no such kern.
    pub fn kern_at(&self, index: u16) -> FixWord {
        self.kerns.get(index as usize).copied().unwrap_or_default()
    }

    /// Returns the start of the lig/kern program of a character, if it has one.
    pub fn lig_kern_entrypoint(&self, c: Char) -> Option<u16> {
        match self.chars.get(c)?.tag {
            CharTag::Ligature(start) => Some(start as u16),
            _ => None,
        }
    }

    /// Returns the instruction that applies when `left` is followed by `right`.
    pub fn lig_kern_instruction(
        &self,
        left: Char,
        right: Char,
    ) -> Result<Option<&ligkern::lang::Instruction>, CorruptIndexError> {
        self.lig_kern
            .run(self.lig_kern_entrypoint(left), right, false)
    }

    /// Returns the unscaled kern between two characters, if there is one.
    pub fn kern(&self, left: Char, right: Char) -> Result<Option<FixWord>, CorruptIndexError> {
        Ok(self
            .lig_kern_instruction(left, right)?
            .and_then(|instruction| match instruction.operation() {
                ligkern::lang::Operation::Kern(index) => Some(self.kern_at(index)),
                ligkern::lang::Operation::Ligature { .. } => None,
            }))
    }

    /// Returns the ligature formed by two characters, if there is one.
    pub fn ligature(&self, left: Char, right: Char) -> Result<Option<LigatureStep>, CorruptIndexError> {
        Ok(self
            .lig_kern_instruction(left, right)?
            .and_then(LigatureStep::from_instruction))
    }

    /// The next larger version of a character, for characters in a list.
    pub fn next_larger(&self, c: Char) -> Option<Char> {
        match self.chars.get(c)?.tag {
            CharTag::List(next) => Some(next),
            _ => None,
        }
    }

    /// The recipe for building large versions of an extensible character.
    pub fn extensible_recipe(&self, c: Char) -> Option<&ExtensibleRecipe> {
        match self.chars.get(c)?.tag {
            CharTag::Extension(index) => self.extensible_recipes.get(index as usize),
            _ => None,
        }
    }

    pub fn extensible_recipes(&self) -> &[ExtensibleRecipe] {
        &self.extensible_recipes
    }

    /// The character TeX pretends follows every word, if the font has one.
    pub fn right_boundary_char(&self) -> Option<Char> {
        self.lig_kern.right_boundary_char()
    }

    /// The lig/kern program TeX runs for the start of every word, if the font has one.
    pub fn left_boundary_entrypoint(&self) -> Option<u16> {
        self.lig_kern.left_boundary_entrypoint()
    }
}

/// Checks that the numbers can be scaled by TeX's algorithm (TeX.2021.571).
///
/// Parameters are reported by their 1-based number; other tables by their index.
fn check_fix_words(table: Table, values: &[FixWord], skip: usize) -> Result<(), Error> {
    for (i, value) in values.iter().enumerate().skip(skip) {
        if !value.is_abs_less_than_16() {
            return Err(Error::FixWordOutOfRange {
                table,
                index: if table == Table::Params { i + 1 } else { i },
                value: *value,
            });
        }
    }
    Ok(())
}
