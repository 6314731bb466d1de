//! Types corresponding to single lig/kern instructions.
//!
//! See the documentation on the [`super`] module for information about lig/kern programs.
//!
//! An [`Instruction`] keeps the four bytes it was read from.
//! Everything else in this module is a decoded view of those bytes,
//!     so nothing in the file is lost even when a view doesn't model it.

use crate::Char;

/// A single instruction in a lig/kern program.
///
/// In TFM files, instructions are serialized to 32 bit integers.
/// The four bytes are called `skip_byte`, `next_char`, `op_byte` and `remainder` in TFtoPL.2014.13.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Instruction {
    /// Controls what happens after this instruction if it is not applicable.
    ///
    /// Values below 128 mean "continue", values of 128 and above mean "stop".
    /// A value above 128 in the first instruction of a program makes the
    ///     instruction a redirect; see [`Instruction::entrypoint_redirect`].
    pub skip_byte: u8,
    /// This instruction is run if the right character in the pair is this character.
    pub right_char: Char,
    /// The operation to perform: a kern if at least 128, otherwise a ligature.
    pub op_byte: u8,
    /// The kern index (low byte) or the ligature character.
    pub remainder: u8,
}

/// A lig/kern operation to perform.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Operation {
    /// Insert a kern between the current character and the next character.
    ///
    /// The variant payload is the index of the kern in the kerns array.
    Kern(u16),
    /// Perform a ligature step.
    /// This inserts `char_to_insert` between the left and right characters,
    ///     and then performs the post-lig operation.
    Ligature {
        /// Character to insert.
        char_to_insert: Char,
        /// What to do after inserting the character.
        post_lig_operation: PostLigOperation,
    },
}

/// A post-lig operation to perform after performing a ligature operation ([`Operation::Ligature`]).
///
/// A lig operation starts with a pair of characters (x,y) and a "cursor" on x.
/// The operation then inserts another character to get, say, (x,z,y).
/// At this point the cursor is still on x.
/// The post-lig operation does two things:
///
/// 1. First, it potentially deletes x or y or both.
/// 1. Second, it potentially moves the cursor forward.
///
/// After this, if the cursor is not at the end of the list of characters,
///     the lig-kern program is run for the new pair starting at the cursor.
///
/// For example, the post-lig operation [`PostLigOperation::RetainLeftMoveNowhere`] retains
///     x and deletes y, leaving (x,z).
/// It then moves the cursor nowhere, leaving it on x.
/// As a result, the lig kern program for the pair (x,z) will run.
///
/// In general all of the post-lig operations are of the form `RetainXMoveY` where `X`
///     specifies the characters to retain and `Y` specifies where the cursor should move.
/// The documentation of each variant gives the notation TeX uses for it (TeX.2021.545).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PostLigOperation {
    /// `|=:|`, op byte 3.
    RetainBothMoveNowhere,
    /// `|=:|>`, op byte 7.
    RetainBothMoveToInserted,
    /// `|=:|>>`, op byte 11.
    RetainBothMoveToRight,
    /// `=:|`, op byte 1.
    RetainRightMoveToInserted,
    /// `=:|>`, op byte 5.
    RetainRightMoveToRight,
    /// `|=:`, op byte 2.
    RetainLeftMoveNowhere,
    /// `|=:>`, op byte 6.
    RetainLeftMoveToInserted,
    /// `=:`, op byte 0.
    RetainNeitherMoveToInserted,
}

impl PostLigOperation {
    /// Decodes the op byte of a ligature instruction.
    ///
    /// Op bytes that don't correspond to one of the eight operations behave like `=:`.
    /// This is what TeX does (TeX.2021.1040).
    pub fn from_op_byte(op_byte: u8) -> PostLigOperation {
        use PostLigOperation::*;
        match op_byte {
            1 => RetainRightMoveToInserted,
            2 => RetainLeftMoveNowhere,
            3 => RetainBothMoveNowhere,
            5 => RetainRightMoveToRight,
            6 => RetainLeftMoveToInserted,
            7 => RetainBothMoveToInserted,
            11 => RetainBothMoveToRight,
            _ => RetainNeitherMoveToInserted,
        }
    }

    /// The canonical op byte for this operation.
    pub fn op_byte(&self) -> u8 {
        use PostLigOperation::*;
        match self {
            RetainNeitherMoveToInserted => 0,
            RetainRightMoveToInserted => 1,
            RetainLeftMoveNowhere => 2,
            RetainBothMoveNowhere => 3,
            RetainRightMoveToRight => 5,
            RetainLeftMoveToInserted => 6,
            RetainBothMoveToInserted => 7,
            RetainBothMoveToRight => 11,
        }
    }

    /// Number of the original two characters that the operation deletes.
    pub fn consumed(&self) -> u8 {
        let (retain_left, retain_right) = self.retains();
        2 - retain_left as u8 - retain_right as u8
    }

    /// Whether the left and right characters survive the operation.
    pub fn retains(&self) -> (bool, bool) {
        let op_byte = self.op_byte();
        (op_byte & 2 != 0, op_byte & 1 != 0)
    }

    /// Number of characters the cursor moves past after the operation.
    pub fn cursor_skip(&self) -> u8 {
        self.op_byte() / 4
    }
}

impl std::fmt::Display for PostLigOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (retain_left, retain_right) = self.retains();
        if retain_left {
            write!(f, "|")?;
        }
        write!(f, "=:")?;
        if retain_right {
            write!(f, "|")?;
        }
        for _ in 0..self.cursor_skip() {
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl Instruction {
    pub fn from_bytes(b: [u8; 4]) -> Instruction {
        Instruction {
            skip_byte: b[0],
            right_char: Char(b[1]),
            op_byte: b[2],
            remainder: b[3],
        }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.skip_byte, self.right_char.0, self.op_byte, self.remainder]
    }

    /// Builds a kern instruction.
    ///
    /// The index must be smaller than 2^15.
    pub fn kern(right_char: Char, kern_index: u16, next_instruction: Option<u8>) -> Instruction {
        let [hi, lo] = kern_index.to_be_bytes();
        Instruction {
            skip_byte: Self::skip_byte_for(next_instruction),
            right_char,
            op_byte: 128 + (hi & 127),
            remainder: lo,
        }
    }

    /// Builds a ligature instruction.
    pub fn ligature(
        right_char: Char,
        char_to_insert: Char,
        post_lig_operation: PostLigOperation,
        next_instruction: Option<u8>,
    ) -> Instruction {
        Instruction {
            skip_byte: Self::skip_byte_for(next_instruction),
            right_char,
            op_byte: post_lig_operation.op_byte(),
            remainder: char_to_insert.0,
        }
    }

    /// Builds the instruction placed at the start of a program that redirects it to a large index.
    ///
    /// When used in slot 0 the right character is the font's right boundary character.
    pub fn redirect(target: u16, right_char: Char) -> Instruction {
        let [op_byte, remainder] = target.to_be_bytes();
        Instruction {
            skip_byte: 255,
            right_char,
            op_byte,
            remainder,
        }
    }

    fn skip_byte_for(next_instruction: Option<u8>) -> u8 {
        match next_instruction {
            Some(skip) if skip < 128 => skip,
            _ => 128,
        }
    }

    /// Number of instructions to skip to find the next instruction of the program.
    ///
    /// If this is [`None`] this is the final instruction of the program.
    pub fn next_instruction(&self) -> Option<u8> {
        if self.skip_byte < 128 {
            Some(self.skip_byte)
        } else {
            None
        }
    }

    /// If this instruction is the first instruction of a program, the index the program really starts at.
    ///
    /// This redirect mechanism exists because in .tfm files entrypoints are [`u8`]s but lig/kern
    ///     programs can contain more than 256 instructions (TFtoPL.2014.13).
    pub fn entrypoint_redirect(&self) -> Option<u16> {
        if self.skip_byte > 128 {
            Some(u16::from_be_bytes([self.op_byte, self.remainder]))
        } else {
            None
        }
    }

    /// Whether this instruction can match a right character.
    ///
    /// Instructions with a skip byte above 128 are never applied.
    pub fn is_applicable(&self) -> bool {
        self.skip_byte <= 128
    }

    pub fn operation(&self) -> Operation {
        if self.op_byte >= 128 {
            Operation::Kern(u16::from_be_bytes([self.op_byte - 128, self.remainder]))
        } else {
            Operation::Ligature {
                char_to_insert: Char(self.remainder),
                post_lig_operation: PostLigOperation::from_op_byte(self.op_byte),
            }
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operation() {
            Operation::Kern(index) => write!(f, "KRN {} #{}", self.right_char, index)?,
            Operation::Ligature {
                char_to_insert,
                post_lig_operation,
            } => write!(
                f,
                "LIG {} {} {}",
                self.right_char, post_lig_operation, char_to_insert
            )?,
        }
        match self.skip_byte {
            0 => Ok(()),
            1..=127 => write!(f, " (SKIP {})", self.skip_byte),
            _ => write!(f, " (STOP)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! post_lig_tests {
        ( $( ($name: ident, $op_byte: expr, $want: expr, $notation: expr, $consumed: expr), )+ ) => {
            $(
                mod $name {
                    use super::*;
                    #[test]
                    fn decode() {
                        assert_eq!(PostLigOperation::from_op_byte($op_byte), $want);
                    }
                    #[test]
                    fn encode() {
                        assert_eq!($want.op_byte(), $op_byte);
                    }
                    #[test]
                    fn notation() {
                        assert_eq!(format!("{}", $want), $notation);
                    }
                    #[test]
                    fn consumed() {
                        assert_eq!($want.consumed(), $consumed);
                    }
                }
            )+
        };
    }

    use PostLigOperation::*;
    post_lig_tests!(
        (op_0, 0, RetainNeitherMoveToInserted, "=:", 2),
        (op_1, 1, RetainRightMoveToInserted, "=:|", 1),
        (op_2, 2, RetainLeftMoveNowhere, "|=:", 1),
        (op_3, 3, RetainBothMoveNowhere, "|=:|", 0),
        (op_5, 5, RetainRightMoveToRight, "=:|>", 1),
        (op_6, 6, RetainLeftMoveToInserted, "|=:>", 1),
        (op_7, 7, RetainBothMoveToInserted, "|=:|>", 0),
        (op_11, 11, RetainBothMoveToRight, "|=:|>>", 0),
    );

    #[test]
    fn unknown_op_bytes_behave_like_plain_ligatures() {
        for op_byte in [4, 8, 9, 10, 12, 100, 127] {
            assert_eq!(
                PostLigOperation::from_op_byte(op_byte),
                RetainNeitherMoveToInserted
            );
        }
    }

    #[test]
    fn raw_bytes_are_preserved() {
        let instruction = Instruction::from_bytes([3, 70, 9, 166]);
        assert_eq!(instruction.to_bytes(), [3, 70, 9, 166]);
        assert_eq!(instruction.next_instruction(), Some(3));
        assert_eq!(
            instruction.operation(),
            Operation::Ligature {
                char_to_insert: Char(166),
                post_lig_operation: RetainNeitherMoveToInserted,
            }
        );
    }

    #[test]
    fn kern_operation() {
        let instruction = Instruction::from_bytes([128, 86, 130, 13]);
        assert_eq!(instruction.next_instruction(), None);
        assert_eq!(instruction.operation(), Operation::Kern(256 * 2 + 13));
        assert_eq!(instruction, Instruction::kern(Char(86), 256 * 2 + 13, None));
    }

    #[test]
    fn redirect() {
        let instruction = Instruction::redirect(300, Char(32));
        assert_eq!(instruction.entrypoint_redirect(), Some(300));
        assert!(!instruction.is_applicable());
        assert_eq!(Instruction::kern(Char(0), 0, None).entrypoint_redirect(), None);
    }

    #[test]
    fn display() {
        let instruction = Instruction::ligature(Char(105), Char(0o14), RetainNeitherMoveToInserted, Some(2));
        assert_eq!(format!("{instruction}"), "LIG '151 =: '014 (SKIP 2)");
        let instruction = Instruction::kern(Char(86), 3, None);
        assert_eq!(format!("{instruction}"), "KRN '126 #3 (STOP)");
    }
}
