//! Lig/kern programs
//!
//! A TFM file contains a single array of lig/kern instructions shared by every character.
//! A character whose tag is [`CharTag::Ligature`](crate::CharTag::Ligature) has a program
//!     that starts at the index given in the tag.
//! To find out what happens when the character (the left character) is followed by another character
//!     (the right character), the instructions of the program are examined in order.
//! The first instruction whose right character matches is applied: it is either a kern or a ligature.
//! Otherwise the instruction's skip byte says where the next instruction is,
//!     or that the program is finished.
//!
//! Programs are addressed purely by index.
//! Indices in a file can be wrong, and every walk here is bounds checked and bounded in length.
//! Invalid indices produce a [`CorruptIndexError`], never a panic.
//!
//! There are two special programs.
//! The first instruction of the array can declare a right boundary character,
//!     which TeX pretends follows every word.
//! The last instruction of the array can point at a program for the left boundary,
//!     which TeX pretends precedes every word.
//! See TFtoPL.2014.13 and TeX.2021.545.

pub mod lang;

use crate::chars::CharInfoTable;
use crate::{Char, CorruptIndexError, Table};
use lang::{Instruction, Operation, PostLigOperation};

/// An array of lig/kern instructions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

/// The result of a ligature instruction, as seen by a typesetter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LigatureStep {
    /// The character inserted by the ligature.
    pub replacement: Char,
    /// How many of the two original characters are deleted.
    pub consumed: u8,
    /// The full operation, for callers that implement the TeX variants.
    pub operation: PostLigOperation,
}

impl LigatureStep {
    pub fn from_instruction(instruction: &Instruction) -> Option<LigatureStep> {
        match instruction.operation() {
            Operation::Kern(_) => None,
            Operation::Ligature {
                char_to_insert,
                post_lig_operation,
            } => Some(LigatureStep {
                replacement: char_to_insert,
                consumed: post_lig_operation.consumed(),
                operation: post_lig_operation,
            }),
        }
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Program { instructions }
    }
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Program {
        instructions.into()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn get(&self, index: usize) -> Result<&Instruction, CorruptIndexError> {
        self.instructions.get(index).ok_or(CorruptIndexError {
            table: Table::LigKern,
            index,
            len: self.instructions.len(),
            origin: None,
        })
    }

    /// Returns the index of the first instruction of the program starting at `start`.
    ///
    /// This follows the entrypoint redirect, if there is one.
    /// Programs for the left boundary are never redirected:
    ///     their start is already a redirect target (TeX.2021.576),
    ///     and TeX enters them at `main_lig_loop+1` (TeX.2021.1034),
    ///     after the `lig_kern_restart` check of TeX.2021.1039.
    pub fn entrypoint(&self, start: u16, from_boundary: bool) -> Result<usize, CorruptIndexError> {
        let start = start as usize;
        let first = self.get(start)?;
        match first.entrypoint_redirect() {
            Some(target) if !from_boundary => {
                self.get(target as usize)?;
                Ok(target as usize)
            }
            _ => Ok(start),
        }
    }

    /// Iterates over the instructions of the program starting at `start`.
    ///
    /// The iterator yields an error and stops if the program runs off the end of the array.
    /// It also stops after as many steps as there are instructions.
    pub fn walk(&self, start: u16, from_boundary: bool) -> Walk<'_> {
        match self.entrypoint(start, from_boundary) {
            Ok(next) => Walk {
                program: self,
                next: Some(next),
                steps: 0,
                pending_error: None,
            },
            Err(err) => Walk {
                program: self,
                next: None,
                steps: 0,
                pending_error: Some(err),
            },
        }
    }

    /// Runs the program starting at `start` for the right character `right_char`.
    ///
    /// Returns the instruction that applies to the pair, or [`None`] if no instruction applies.
    /// A `start` of [`None`] means the left character has no program.
    pub fn run(
        &self,
        start: Option<u16>,
        right_char: Char,
        from_boundary: bool,
    ) -> Result<Option<&Instruction>, CorruptIndexError> {
        let Some(start) = start else {
            return Ok(None);
        };
        for instruction in self.walk(start, from_boundary) {
            let instruction = instruction?;
            if instruction.right_char == right_char && instruction.is_applicable() {
                return Ok(Some(instruction));
            }
        }
        Ok(None)
    }

    /// Returns the instruction that applies for every right character the program handles.
    ///
    /// Only the first instruction for each right character is returned,
    ///     because later ones can never be reached by [`Program::run`].
    pub fn pairs(
        &self,
        start: u16,
        from_boundary: bool,
    ) -> Result<Vec<&Instruction>, CorruptIndexError> {
        let mut seen = [false; 256];
        let mut result = vec![];
        for instruction in self.walk(start, from_boundary) {
            let instruction = instruction?;
            if !instruction.is_applicable() {
                continue;
            }
            let seen = &mut seen[instruction.right_char.0 as usize];
            if !*seen {
                *seen = true;
                result.push(instruction);
            }
        }
        Ok(result)
    }

    /// The right boundary character, declared by a first instruction with skip byte 255.
    pub fn right_boundary_char(&self) -> Option<Char> {
        match self.instructions.first() {
            Some(first) if first.skip_byte == 255 => Some(first.right_char),
            _ => None,
        }
    }

    /// Start of the left boundary program, declared by a last instruction with skip byte 255.
    pub fn left_boundary_entrypoint(&self) -> Option<u16> {
        match self.instructions.last() {
            Some(last) if last.skip_byte == 255 => last.entrypoint_redirect(),
            _ => None,
        }
    }

    /// Checks every instruction against the rest of the font, as TeX does when loading (TeX.2021.570).
    ///
    /// - Redirect targets and skips stay inside the array.
    /// - Kern indices are inside the kerns array.
    /// - Right characters exist, unless they are the right boundary character.
    /// - Ligature characters exist.
    pub fn validate(&self, num_kerns: usize, chars: &CharInfoTable) -> Result<(), CorruptIndexError> {
        let len = self.instructions.len();
        let boundary_char = self.right_boundary_char();
        let check_char = |c: Char| -> Result<(), CorruptIndexError> {
            if chars.contains(c) {
                Ok(())
            } else {
                Err(CorruptIndexError {
                    table: Table::Chars,
                    index: c.0 as usize,
                    len: chars.len(),
                    origin: None,
                })
            }
        };
        for (k, instruction) in self.instructions.iter().enumerate() {
            if let Some(target) = instruction.entrypoint_redirect() {
                if target as usize >= len {
                    return Err(CorruptIndexError {
                        table: Table::LigKern,
                        index: target as usize,
                        len,
                        origin: None,
                    });
                }
                continue;
            }
            if Some(instruction.right_char) != boundary_char {
                check_char(instruction.right_char)?;
            }
            match instruction.operation() {
                Operation::Kern(index) => {
                    if index as usize >= num_kerns {
                        return Err(CorruptIndexError {
                            table: Table::Kerns,
                            index: index as usize,
                            len: num_kerns,
                            origin: None,
                        });
                    }
                }
                Operation::Ligature { char_to_insert, .. } => check_char(char_to_insert)?,
            }
            if let Some(skip) = instruction.next_instruction() {
                let next = k + skip as usize + 1;
                if next >= len {
                    return Err(CorruptIndexError {
                        table: Table::LigKern,
                        index: next,
                        len,
                        origin: None,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Iterator over the instructions of one program.
///
/// Create using [`Program::walk`].
pub struct Walk<'a> {
    program: &'a Program,
    next: Option<usize>,
    steps: usize,
    pending_error: Option<CorruptIndexError>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Result<&'a Instruction, CorruptIndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }
        let this = self.next?;
        let len = self.program.len();
        if self.steps >= len {
            self.next = None;
            return Some(Err(CorruptIndexError {
                table: Table::LigKern,
                index: this,
                len,
                origin: None,
            }));
        }
        self.steps += 1;
        let instruction = match self.program.get(this) {
            Ok(instruction) => instruction,
            Err(err) => {
                self.next = None;
                return Some(Err(err));
            }
        };
        self.next = instruction
            .next_instruction()
            .map(|skip| this + skip as usize + 1);
        Some(Ok(instruction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixWord;
    use lang::PostLigOperation::*;

    fn lig(right: u8, insert: u8, next: Option<u8>) -> Instruction {
        Instruction::ligature(Char(right), Char(insert), RetainNeitherMoveToInserted, next)
    }

    /// The program of 'f' in a font like cmr10: f+f gives ff, f+i gives fi,
    ///     and the ff ligature itself has a program for ffi.
    fn f_ligatures() -> Program {
        vec![
            /* 0: f */ lig(b'f', 0xA6, Some(0)),
            /* 1 */ lig(b'i', 0xA7, None),
            /* 2: ff */ lig(b'i', 0xA8, None),
        ]
        .into()
    }

    #[test]
    fn ligature_chain() {
        let program = f_ligatures();
        let got = program.run(Some(0), Char(b'f'), false).unwrap().unwrap();
        assert_eq!(
            LigatureStep::from_instruction(got),
            Some(LigatureStep {
                replacement: Char(0xA6),
                consumed: 2,
                operation: RetainNeitherMoveToInserted,
            })
        );
        let got = program.run(Some(0), Char(b'i'), false).unwrap().unwrap();
        assert_eq!(got.remainder, 0xA7);
        let got = program.run(Some(2), Char(b'i'), false).unwrap().unwrap();
        assert_eq!(got.remainder, 0xA8);
        assert_eq!(program.run(Some(2), Char(b'f'), false), Ok(None));
    }

    #[test]
    fn no_program() {
        assert_eq!(f_ligatures().run(None, Char(b'f'), false), Ok(None));
    }

    #[test]
    fn no_match_after_stop() {
        let program = f_ligatures();
        assert_eq!(program.run(Some(0), Char(b'l'), false), Ok(None));
    }

    #[test]
    fn pairs_follow_the_whole_chain() {
        let program: Program = vec![
            lig(b'f', 0xA6, Some(1)),
            lig(b'x', 0, None),
            lig(b'i', 0xA7, Some(0)),
            lig(b'f', 0xA9, None),
        ]
        .into();
        let right_chars: Vec<Char> = program
            .pairs(0, false)
            .unwrap()
            .into_iter()
            .map(|i| i.right_char)
            .collect();
        assert_eq!(right_chars, vec![Char(b'f'), Char(b'i')]);
    }

    #[test]
    fn running_off_the_end_is_an_error() {
        let program: Program = vec![lig(b'a', 0, Some(5))].into();
        assert_eq!(
            program.run(Some(0), Char(b'b'), false),
            Err(CorruptIndexError {
                table: Table::LigKern,
                index: 6,
                len: 1,
                origin: None,
            })
        );
    }

    #[test]
    fn start_outside_the_array_is_an_error() {
        let program = f_ligatures();
        assert!(program.run(Some(3), Char(b'f'), false).is_err());
        assert!(program.pairs(17, false).is_err());
    }

    #[test]
    fn redirect_is_followed() {
        let program: Program = vec![
            Instruction::redirect(2, Char(0)),
            lig(b'a', 1, None),
            lig(b'b', 2, None),
        ]
        .into();
        assert_eq!(program.run(Some(0), Char(b'b'), false).unwrap().unwrap().remainder, 2);
        assert_eq!(program.run(Some(0), Char(0), false), Ok(None));
    }

    #[test]
    fn boundary_programs_are_not_redirected() {
        let program: Program = vec![
            Instruction::redirect(2, Char(b'a')),
            lig(b'a', 1, None),
            lig(b'b', 2, None),
        ]
        .into();
        // The redirect instruction is not applicable, so nothing matches from slot 0.
        assert_eq!(program.run(Some(0), Char(b'a'), true), Ok(None));
        assert_eq!(program.right_boundary_char(), Some(Char(b'a')));
    }

    #[test]
    fn boundary_declarations() {
        let program: Program = vec![
            Instruction::redirect(0, Char(32)),
            lig(b'a', 1, None),
            Instruction::redirect(1, Char(0)),
        ]
        .into();
        assert_eq!(program.right_boundary_char(), Some(Char(32)));
        assert_eq!(program.left_boundary_entrypoint(), Some(1));
        assert_eq!(f_ligatures().right_boundary_char(), None);
        assert_eq!(f_ligatures().left_boundary_entrypoint(), None);
    }

    fn chars(codes: &[u8]) -> CharInfoTable {
        let bc = codes.iter().copied().min().unwrap_or(1);
        let ec = codes.iter().copied().max().unwrap_or(0);
        let words: Vec<u32> = (bc..=ec)
            .map(|c| if codes.contains(&c) { 1 << 24 } else { 0 })
            .collect();
        CharInfoTable::parse(
            &words,
            vec![FixWord::ZERO, FixWord::UNITY],
            vec![FixWord::ZERO],
            vec![FixWord::ZERO],
            vec![FixWord::ZERO],
            Char(bc),
            Char(ec),
        )
        .unwrap()
    }

    #[test]
    fn validate_accepts_consistent_program() {
        let program = f_ligatures();
        assert_eq!(program.validate(0, &chars(&[b'f', b'i', 0xA6, 0xA7, 0xA8])), Ok(()));
    }

    #[test]
    fn validate_rejects_missing_ligature_char() {
        let program = f_ligatures();
        assert_eq!(
            program.validate(0, &chars(&[b'f', b'i', 0xA6, 0xA7])),
            Err(CorruptIndexError {
                table: Table::Chars,
                index: 0xA8,
                len: 0xA7 - b'f' as usize + 1,
                origin: None,
            })
        );
    }

    #[test]
    fn validate_rejects_kern_index() {
        let program: Program = vec![Instruction::kern(Char(b'a'), 3, None)].into();
        assert_eq!(
            program.validate(3, &chars(&[b'a'])),
            Err(CorruptIndexError {
                table: Table::Kerns,
                index: 3,
                len: 3,
                origin: None,
            })
        );
        assert_eq!(program.validate(4, &chars(&[b'a'])), Ok(()));
    }

    #[test]
    fn validate_rejects_skip_past_the_end() {
        let program: Program = vec![lig(b'a', b'a', Some(0))].into();
        assert!(program.validate(0, &chars(&[b'a'])).is_err());
    }

    #[test]
    fn validate_rejects_redirect_past_the_end() {
        let program: Program = vec![Instruction::redirect(1, Char(0))].into();
        assert!(program.validate(0, &chars(&[b'a'])).is_err());
    }

    #[test]
    fn validate_allows_the_boundary_char_to_be_missing() {
        let program: Program = vec![
            Instruction::redirect(1, Char(b'z')),
            lig(b'z', b'a', None),
        ]
        .into();
        assert_eq!(program.validate(0, &chars(&[b'a'])), Ok(()));
    }
}
