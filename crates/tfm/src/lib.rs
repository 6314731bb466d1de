//! Reader and evaluator for TeX font metric (.tfm) files, and PostScript encoding vectors.
//!
//! Loading a font is a two step process.
//! First the binary data is split into its sections and decoded ([`format::File`]).
//! Then the decoded tables are validated and assembled into an immutable [`Font`].
//! All corruption is detected at this point: a [`Font`] that exists is internally consistent.
//!
//! A [`Font`] knows nothing about sizes.
//! To get lengths out of it, bind it to a size request ([`FontKey`]) with a [`ScaledFont`],
//!     which converts the font's fixed-point numbers into [`Scaled`] lengths
//!     with exactly the rounding TeX uses.
//! Many scaled fonts can share one [`Font`].
//!
//! ```
//! # use extex_tfm::*;
//! # use std::sync::Arc;
//! # let bytes = format::File::from_chars(&[(Char::A, FixWord::UNITY / 2)]).serialize();
//! let font = Arc::new(Font::from_bytes(&bytes).unwrap());
//! let font_at_20pt = ScaledFont::new(font, FontKey::default().scaled(2000)).unwrap();
//! let glyph = font_at_20pt.glyph(Char::A);
//! assert_eq!(glyph.width(), Some(Scaled::ONE * 10));
//! ```
//!
//! The crate also reads and writes encoding vectors (`.enc` files) in the [`encoding`] module.

use std::num::NonZeroI16;

pub mod chars;
pub mod encoding;
mod font;
pub mod format;
pub mod ligkern;
mod metrics;
#[cfg(test)]
mod testing;

pub use chars::{CharInfo, CharInfoTable, CharTag, ExtensibleRecipe};
pub use extex_core::{Glue, Scaled};
pub use font::Font;
pub use ligkern::LigatureStep;
pub use metrics::{
    FontKey, Glyph, GlyphMetrics, Kern, Ligature, ScaledFont, SizeRequestError,
};

/// A character in a TFM file.
///
/// TFM files only support 1-byte characters.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Char(pub u8);

impl From<u8> for Char {
    fn from(value: u8) -> Self {
        Char(value)
    }
}

impl TryFrom<char> for Char {
    type Error = std::char::TryFromCharError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        let u: u8 = value.try_into()?;
        Ok(Char(u))
    }
}

impl std::fmt::Display for Char {
    /// Characters are printed in octal, as TeX does in its diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{:03o}", self.0)
    }
}

macro_rules! const_chars {
    ( $( ($name: ident, $value: expr), )+ ) => {
        $(
            pub const $name: Char = Char($value);
        )+
    };
}

impl Char {
    const_chars![
        (A, b'A'),
        (B, b'B'),
        (C, b'C'),
        (V, b'V'),
        (X, b'X'),
        (Y, b'Y'),
    ];

    pub fn is_seven_bit(&self) -> bool {
        self.0 <= 127
    }
}

/// Fixed-width numeric type used in TFM files.
///
/// This numeric type has 11 bits for the integer part,
/// 20 bits for the fractional part, and a single signed bit.
/// The inner value is the number multiplied by 2^20.
/// It is called a `fix_word` in TFtoPL and TeX.
///
/// Apart from the design size and the slant,
///     every fix word in a font is a multiple of the font's size
///     and is turned into an absolute length by [`ScaledFont::convert`].
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixWord(pub i32);

impl FixWord {
    /// Representation of the number 0 as a [FixWord].
    pub const ZERO: FixWord = FixWord(0);

    /// Representation of the number 1 as a [FixWord].
    pub const UNITY: FixWord = FixWord(1 << 20);

    /// Creates a fix word from its raw 32-bit representation.
    pub fn from_raw(raw: u32) -> FixWord {
        FixWord(raw as i32)
    }

    /// Returns the value as a floating point number.
    ///
    /// This is for display purposes only; no computation in this crate uses floats.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / FixWord::UNITY.0 as f64
    }

    /// Returns true if the number is less than 16.0 in magnitude according to Knuth.
    ///
    /// The number +16.0 is not allowed.
    /// See `check_fix` in TFtoPL.2014.60 and `store_scaled` in TeX.2021.571.
    pub fn is_abs_less_than_16(&self) -> bool {
        *self >= FixWord::UNITY * -16 && *self < FixWord::UNITY * 16
    }
}

impl std::ops::Add<FixWord> for FixWord {
    type Output = FixWord;
    fn add(self, rhs: FixWord) -> Self::Output {
        FixWord(self.0 + rhs.0)
    }
}
impl std::ops::Sub<FixWord> for FixWord {
    type Output = FixWord;
    fn sub(self, rhs: FixWord) -> Self::Output {
        FixWord(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i32> for FixWord {
    type Output = FixWord;

    fn mul(self, rhs: i32) -> Self::Output {
        FixWord(self.0 * rhs)
    }
}

impl std::ops::Div<i32> for FixWord {
    type Output = FixWord;

    fn div(self, rhs: i32) -> Self::Output {
        FixWord(self.0 / rhs)
    }
}

impl std::fmt::Display for FixWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // TFtoPL.2014.40-43
        if self.0 < 0 {
            write!(f, "-")?;
        }
        let integer_part = (self.0 / FixWord::UNITY.0).unsigned_abs();
        write!(f, "{integer_part}.")?;
        let mut fp = (self.0 % FixWord::UNITY.0).abs();
        fp = 10 * fp + 5;
        let mut delta = 10;
        loop {
            if delta > 0o4_000_000 {
                fp = fp + 0o2_000_000 - delta / 2;
            }
            write!(f, "{}", fp / 0o4_000_000)?;
            fp = 10 * (fp % 0o4_000_000);
            delta *= 10;
            if fp <= delta {
                break;
            }
        }
        Ok(())
    }
}

/// The TFM header, which contains metadata about the file.
///
/// Only the checksum and design size are mandatory.
/// The remaining fields are present if the header is long enough to contain them.
///
/// This is defined in TFtoPL.2014.10.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// The font checksum.
    ///
    /// TeX compares this with the checksum recorded in DVI files.
    /// It has no other meaning.
    pub checksum: u32,
    /// Size of the font the metric data was designed for, in points.
    pub design_size: FixWord,
    pub character_coding_scheme: Option<String>,
    pub font_family: Option<String>,
    pub seven_bit_safe: Option<bool>,
    pub face: Option<Face>,
    /// The TFM format allows the header to contain arbitrary additional data.
    pub additional_data: Vec<u32>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            checksum: 0,
            design_size: FixWord::UNITY * 10,
            character_coding_scheme: None,
            font_family: None,
            seven_bit_safe: None,
            face: None,
            additional_data: vec![],
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum FaceWeight {
    Light,
    Medium,
    Bold,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum FaceSlope {
    Roman,
    Italic,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum FaceExpansion {
    Regular,
    Condensed,
    Extended,
}

/// The Xerox PARC face byte.
///
/// Values below 18 encode a weight, slope and expansion.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Face {
    Valid(FaceWeight, FaceSlope, FaceExpansion),
    Other(u8),
}

impl From<u8> for Face {
    fn from(value: u8) -> Self {
        if value >= 18 {
            return Face::Other(value);
        }
        let weight = match (value % 6) / 2 {
            0 => FaceWeight::Medium,
            1 => FaceWeight::Bold,
            _ => FaceWeight::Light,
        };
        let slope = match value % 2 {
            0 => FaceSlope::Roman,
            _ => FaceSlope::Italic,
        };
        let expansion = match value / 6 {
            0 => FaceExpansion::Regular,
            1 => FaceExpansion::Condensed,
            _ => FaceExpansion::Extended,
        };
        Face::Valid(weight, slope, expansion)
    }
}

impl From<Face> for u8 {
    fn from(value: Face) -> Self {
        match value {
            Face::Valid(w, s, e) => {
                let w: u8 = match w {
                    FaceWeight::Medium => 0,
                    FaceWeight::Bold => 1,
                    FaceWeight::Light => 2,
                };
                let s: u8 = match s {
                    FaceSlope::Roman => 0,
                    FaceSlope::Italic => 1,
                };
                let e: u8 = match e {
                    FaceExpansion::Regular => 0,
                    FaceExpansion::Condensed => 1,
                    FaceExpansion::Extended => 2,
                };
                e * 6 + w * 2 + s
            }
            Face::Other(b) => b,
        }
    }
}

/// TeX font metric parameters
///
/// Parameters are numbered from 1, as in TeX's `\fontdimen`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(pub Vec<FixWord>);

impl Params {
    /// Returns the parameter with the given number.
    ///
    /// Parameters beyond the end of the table are zero.
    /// This is TeX's convention for unset font dimensions.
    pub fn get(&self, number: ParameterNumber) -> FixWord {
        self.0.get(number.index()).copied().unwrap_or(FixWord::ZERO)
    }

    pub fn get_named(&self, named_param: NamedParam) -> FixWord {
        self.get(named_param.number())
    }

    /// Returns true if the table is long enough to contain the parameter.
    pub fn contains(&self, number: ParameterNumber) -> bool {
        number.index() < self.0.len()
    }

    pub fn set(&mut self, number: ParameterNumber, value: FixWord) {
        let i = number.index();
        if self.0.len() <= i {
            self.0.resize(i + 1, Default::default());
        }
        self.0[i] = value;
    }

    pub fn set_named(&mut self, named_param: NamedParam, value: FixWord) {
        self.set(named_param.number(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The 1-based number of a font parameter.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ParameterNumber(NonZeroI16);

impl ParameterNumber {
    pub fn new(u: i16) -> Option<Self> {
        if u < 0 {
            None
        } else {
            NonZeroI16::new(u).map(Self)
        }
    }

    pub fn get(&self) -> i16 {
        self.0.get()
    }

    fn index(&self) -> usize {
        // The payload is positive.
        (self.0.get() as usize).saturating_sub(1)
    }
}

/// A named TeX font metric parameter.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum NamedParam {
    Slant,
    Space,
    Stretch,
    Shrink,
    XHeight,
    Quad,
    ExtraSpace,
    Num1,
    Num2,
    Num3,
    Denom1,
    Denom2,
    Sup1,
    Sup2,
    Sup3,
    Sub1,
    Sub2,
    SupDrop,
    SubDrop,
    Delim1,
    Delim2,
    AxisHeight,
    DefaultRuleThickness,
    BigOpSpacing1,
    BigOpSpacing2,
    BigOpSpacing3,
    BigOpSpacing4,
    BigOpSpacing5,
}

impl NamedParam {
    const ALL: [(NamedParam, &'static str); 28] = [
        (NamedParam::Slant, "SLANT"),
        (NamedParam::Space, "SPACE"),
        (NamedParam::Stretch, "STRETCH"),
        (NamedParam::Shrink, "SHRINK"),
        (NamedParam::XHeight, "XHEIGHT"),
        (NamedParam::Quad, "QUAD"),
        (NamedParam::ExtraSpace, "EXTRASPACE"),
        (NamedParam::Num1, "NUM1"),
        (NamedParam::Num2, "NUM2"),
        (NamedParam::Num3, "NUM3"),
        (NamedParam::Denom1, "DENOM1"),
        (NamedParam::Denom2, "DENOM2"),
        (NamedParam::Sup1, "SUP1"),
        (NamedParam::Sup2, "SUP2"),
        (NamedParam::Sup3, "SUP3"),
        (NamedParam::Sub1, "SUB1"),
        (NamedParam::Sub2, "SUB2"),
        (NamedParam::SupDrop, "SUPDROP"),
        (NamedParam::SubDrop, "SUBDROP"),
        (NamedParam::Delim1, "DELIM1"),
        (NamedParam::Delim2, "DELIM2"),
        (NamedParam::AxisHeight, "AXISHEIGHT"),
        (NamedParam::DefaultRuleThickness, "DEFAULTRULETHICKNESS"),
        (NamedParam::BigOpSpacing1, "BIGOPSPACING1"),
        (NamedParam::BigOpSpacing2, "BIGOPSPACING2"),
        (NamedParam::BigOpSpacing3, "BIGOPSPACING3"),
        (NamedParam::BigOpSpacing4, "BIGOPSPACING4"),
        (NamedParam::BigOpSpacing5, "BIGOPSPACING5"),
    ];

    pub fn number(&self) -> ParameterNumber {
        let i = match self {
            NamedParam::Slant => 1,
            NamedParam::Space => 2,
            NamedParam::Stretch => 3,
            NamedParam::Shrink => 4,
            NamedParam::XHeight => 5,
            NamedParam::Quad => 6,
            NamedParam::ExtraSpace => 7,
            NamedParam::Num1 => 8,
            NamedParam::Num2 => 9,
            NamedParam::Num3 => 10,
            NamedParam::Denom1 => 11,
            NamedParam::Denom2 => 12,
            NamedParam::Sup1 => 13,
            NamedParam::Sup2 => 14,
            NamedParam::Sup3 => 15,
            NamedParam::Sub1 => 16,
            NamedParam::Sub2 => 17,
            NamedParam::SupDrop => 18,
            NamedParam::SubDrop => 19,
            NamedParam::Delim1 => 20,
            NamedParam::Delim2 => 21,
            NamedParam::AxisHeight => 22,
            NamedParam::DefaultRuleThickness => 8,
            NamedParam::BigOpSpacing1 => 9,
            NamedParam::BigOpSpacing2 => 10,
            NamedParam::BigOpSpacing3 => 11,
            NamedParam::BigOpSpacing4 => 12,
            NamedParam::BigOpSpacing5 => 13,
        };
        ParameterNumber(i.try_into().expect("all numbers are in range"))
    }

    /// The name of the parameter as it appears in property list files.
    pub fn name(&self) -> &'static str {
        NamedParam::ALL
            .iter()
            .find(|(p, _)| p == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }

    /// The names of the parameters of text fonts, in parameter order.
    pub fn text_params() -> &'static [(NamedParam, &'static str)] {
        &NamedParam::ALL[..7]
    }
}

impl std::str::FromStr for NamedParam {
    type Err = UnknownParameterError;

    /// Parses a parameter name.
    ///
    /// Names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamedParam::ALL
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(p, _)| *p)
            .ok_or_else(|| UnknownParameterError(s.to_string()))
    }
}

/// Error returned when looking up a font parameter by an unknown name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownParameterError(pub String);

impl std::fmt::Display for UnknownParameterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown font parameter `{}`", self.0)
    }
}

impl std::error::Error for UnknownParameterError {}

/// A table inside a .tfm file that other data refers to by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Chars,
    Widths,
    Heights,
    Depths,
    ItalicCorrections,
    LigKern,
    Kerns,
    ExtensibleRecipes,
    Params,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Chars => "character",
            Table::Widths => "width",
            Table::Heights => "height",
            Table::Depths => "depth",
            Table::ItalicCorrections => "italic correction",
            Table::LigKern => "lig/kern",
            Table::Kerns => "kern",
            Table::ExtensibleRecipes => "extensible recipe",
            Table::Params => "parameter",
        }
    }
}

/// An index in a .tfm file that points outside its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptIndexError {
    /// The table the index points into.
    pub table: Table,
    /// The offending index.
    ///
    /// For [`Table::Chars`] this is the character code that does not exist.
    pub index: usize,
    /// Number of entries in the table.
    pub len: usize,
    /// The character whose data contains the index, if any.
    pub origin: Option<Char>,
}

impl std::fmt::Display for CorruptIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(c) = self.origin {
            write!(f, "character {c}: ")?;
        }
        match self.table {
            Table::Chars => write!(f, "refers to character {} which is not in the font", Char(self.index as u8)),
            _ => write!(
                f,
                "{} index {} is outside the {} table ({} entries)",
                self.table.name(),
                self.index,
                self.table.name(),
                self.len
            ),
        }
    }
}

impl std::error::Error for CorruptIndexError {}

/// Error returned when loading a font fails.
///
/// There is no partially loaded font: any of these errors aborts loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer has fewer bytes than the file declares.
    Truncated {
        expected_bytes: usize,
        actual_bytes: usize,
    },
    /// The sub-file sizes at the start of the file are inconsistent.
    Structure(format::DeserializeError),
    /// The design size in the header is not positive.
    InvalidHeader(FixWord),
    /// An index points outside its table.
    CorruptIndex(CorruptIndexError),
    /// A dimension is 16 or more in magnitude.
    ///
    /// TeX's scaling routine only handles numbers smaller than 16 (TeX.2021.571).
    FixWordOutOfRange {
        table: Table,
        index: usize,
        value: FixWord,
    },
    /// The first entry of a dimension table is not zero.
    NonZeroFirstEntry(Table),
    /// A sequence of next larger characters loops back on itself.
    NextLargerCycle(Char),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Truncated {
                expected_bytes,
                actual_bytes,
            } => write!(
                f,
                "the file has {actual_bytes} bytes but it should have at least {expected_bytes}"
            ),
            Error::Structure(err) => write!(f, "{err}"),
            Error::InvalidHeader(design_size) => {
                write!(f, "the design size {design_size} is not positive")
            }
            Error::CorruptIndex(err) => write!(f, "{err}"),
            Error::FixWordOutOfRange {
                table,
                index,
                value,
            } => write!(
                f,
                "{} {} is {} which is not smaller than 16 in magnitude",
                table.name(),
                index,
                value
            ),
            Error::NonZeroFirstEntry(table) => {
                write!(f, "the first entry of the {} table should be zero", table.name())
            }
            Error::NextLargerCycle(c) => {
                write!(f, "the list of next larger characters for {c} contains a cycle")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<CorruptIndexError> for Error {
    fn from(value: CorruptIndexError) -> Self {
        Error::CorruptIndex(value)
    }
}

impl From<format::DeserializeError> for Error {
    fn from(value: format::DeserializeError) -> Self {
        match value.truncation() {
            Some((expected_bytes, actual_bytes)) => Error::Truncated {
                expected_bytes,
                actual_bytes,
            },
            None => Error::Structure(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_word_display() {
        assert_eq!(format!["{}", FixWord::UNITY * 10], "10.0");
        assert_eq!(format!["{}", FixWord::UNITY / 2], "0.5");
        assert_eq!(format!["{}", FixWord::UNITY / -4], "-0.25");
        assert_eq!(format!["{}", FixWord(-1)], "-0.000001");
    }

    #[test]
    fn fix_word_to_f64() {
        assert_eq!((FixWord::UNITY * 3 / 2).to_f64(), 1.5);
        assert_eq!(FixWord::from_raw(0xFFF0_0000).to_f64(), -1.0);
    }

    #[test]
    fn params_beyond_the_table_are_zero() {
        let params = Params(vec![FixWord(1), FixWord(2)]);
        assert_eq!(params.get_named(NamedParam::Space), FixWord(2));
        assert_eq!(params.get_named(NamedParam::Quad), FixWord::ZERO);
        assert_eq!(params.get(ParameterNumber::new(300).unwrap()), FixWord::ZERO);
        assert!(!params.contains(NamedParam::Stretch.number()));
    }

    #[test]
    fn params_set_extends_the_table() {
        let mut params = Params::default();
        params.set_named(NamedParam::Quad, FixWord::UNITY);
        assert_eq!(params.len(), 6);
        assert_eq!(params.get_named(NamedParam::Quad), FixWord::UNITY);
        assert_eq!(params.get_named(NamedParam::Slant), FixWord::ZERO);
    }

    #[test]
    fn parameter_numbers() {
        assert_eq!(ParameterNumber::new(0), None);
        assert_eq!(ParameterNumber::new(-3), None);
        assert_eq!(NamedParam::AxisHeight.number().get(), 22);
        assert_eq!(NamedParam::BigOpSpacing5.number().get(), 13);
    }

    #[test]
    fn named_params_from_str() {
        assert_eq!("SPACE".parse(), Ok(NamedParam::Space));
        assert_eq!("xheight".parse(), Ok(NamedParam::XHeight));
        assert_eq!(
            "WIDTH".parse::<NamedParam>(),
            Err(UnknownParameterError("WIDTH".into()))
        );
        assert_eq!(NamedParam::ExtraSpace.name(), "EXTRASPACE");
    }

    #[test]
    fn face_round_trip() {
        for u in 0..=u8::MAX {
            let face: Face = u.into();
            assert_eq!(u8::from(face), u);
        }
        assert_eq!(
            Face::from(9),
            Face::Valid(FaceWeight::Bold, FaceSlope::Italic, FaceExpansion::Condensed)
        );
    }
}
