//! Core types shared by the ExTeX font crates.
//!
//! This crate contains TeX's absolute length type [`Scaled`],
//!     the units lengths can be written in,
//!     glue,
//!     and the [`FontFormat`] trait implemented by font metric formats.

use std::fmt::Write;

/// Trait satisfied by font formats (like .tfm files).
pub trait FontFormat: Sized {
    const DEFAULT_FILE_EXTENSION: &'static str;
    type Error: std::error::Error + 'static;

    /// Parse binary data into a font.
    fn parse(b: &[u8]) -> Result<Self, Self::Error>;
}

/// Scaled numbers.
///
/// This is the fixed-width numeric type TeX uses for all absolute lengths.
/// It is defined in part 7 "arithmetic with scaled dimensions" starting at TeX.2021.99.
///
/// This numeric type has 15 bits for the integer part,
/// 16 bits for the fractional part, and a single signed bit.
/// The inner value is the number multiplied by 2^16,
///     i.e. the length in scaled points (`sp`).
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scaled(pub i32);

impl Scaled {
    /// Representation of the number 0 as a [Scaled].
    pub const ZERO: Scaled = Scaled(0);

    /// Representation of the number 1 as a [Scaled].
    pub const ONE: Scaled = Scaled(1 << 16);

    /// Representation of the number 2 as a [Scaled].
    pub const TWO: Scaled = Scaled(1 << 17);

    /// Maximum possible dimension in TeX, which is (2^30-1)/2^16.
    ///
    /// This is _not_ the maximum size of the Rust scaled number type, which is (2^31-1)/2^16.
    ///
    /// Defined in TeX.2021.421.
    pub const MAX_DIMEN: Scaled = Scaled((1 << 30) - 1);

    /// Create a scaled number corresponding the provided integer.
    ///
    /// Scaled numbers are in the range `(-2^14, 2^14)`.
    /// If _i_ is outside this range an overflow error is returned.
    pub fn from_integer(i: i32) -> Result<Scaled, OverflowError> {
        if i >= (1 << 14) || i <= -(1 << 14) {
            Err(OverflowError {})
        } else {
            Ok(Scaled(Scaled::ONE.0 * i))
        }
    }

    /// Creates a scaled number from the digits of a decimal fraction.
    ///
    /// The digits are those after the decimal point, most significant first.
    ///
    /// TeX.2021.102.
    pub fn from_decimal_fraction(digits: &[u8]) -> Scaled {
        let mut a = 0;
        for d in digits.iter().take(17).rev() {
            a = (a + (*d as i32) * Scaled::TWO.0) / 10
        }
        Scaled((a + 1) / 2)
    }

    /// Creates a scaled number from an integer part, a fractional part and a unit.
    ///
    /// This is how TeX converts a length like `1.5in` to scaled points,
    ///     and the rounding is identical.
    /// The integer part may be negative; the fractional part must be in `[0, 1)`.
    ///
    /// TeX.2021.458 and TeX.2021.453.
    pub fn new(integer: i32, fraction: Scaled, unit: ScaledUnit) -> Result<Scaled, OverflowError> {
        debug_assert!(fraction >= Scaled::ZERO && fraction < Scaled::ONE);
        let negative = integer < 0;
        let integer = integer.checked_abs().ok_or(OverflowError {})?;
        let magnitude = if unit == ScaledUnit::ScaledPoint {
            if integer > Scaled::MAX_DIMEN.0 {
                return Err(OverflowError {});
            }
            Scaled(integer)
        } else {
            let (n, d) = unit.conversion_fraction();
            let (mut i, mut f) = (integer, fraction.0);
            if (n, d) != (1, 1) {
                let (v, remainder) = Scaled(i).xn_over_d(n, d)?;
                f = (n * f + Scaled::ONE.0 * remainder.0) / d;
                i = v.0 + f / Scaled::ONE.0;
                f %= Scaled::ONE.0;
            }
            if i >= (1 << 14) {
                return Err(OverflowError {});
            }
            Scaled(i * Scaled::ONE.0 + f)
        };
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Calculates the integer division _xn_/_d_ and remainder, where _x_ is this scaled number
    /// and _n_ and _d_ are integers in the range `[0,2^16]`.
    ///
    /// This function appears in TeX.2021.107. Knuth is working with 32-bit integers
    /// and so calculating this number is tricky without overflowing. E.g. _xn_ may
    /// be larger than `2^32-1` even if the final result is in range.
    /// TeX has an algorithm that calculates the exact value without overflowing,
    /// in the case when the final result is in range.
    ///
    /// Our implementation simply uses 64-bit integers.
    pub fn xn_over_d(&self, n: i32, d: i32) -> Result<(Scaled, Scaled), OverflowError> {
        debug_assert!(n <= 0o200000);
        debug_assert!(d <= 0o200000);
        let mut b: i64 = self.0.into();
        b *= n as i64; // can't overflow because |b|<=2^31 and |n|<=2^16
        let remainder: i32 = (b % (d as i64)).try_into().expect("d<=2^16 so b%d<2^16");
        b /= d as i64;
        if b < -(Scaled::MAX_DIMEN.0 as i64) || b > Scaled::MAX_DIMEN.0 as i64 {
            return Err(OverflowError {});
        }
        let b: i32 = b.try_into().expect("b in (-2^30, +2^30");
        Ok((Scaled(b), Scaled(remainder)))
    }

    pub fn integer_part(self) -> i32 {
        self.0 / Scaled::ONE.0
    }

    pub fn fractional_part(self) -> Scaled {
        self % Scaled::ONE.0
    }

    pub fn abs(self) -> Scaled {
        Scaled(self.0.abs())
    }
}

/// Error returned when a calculation leaves the range of TeX dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowError;

impl std::fmt::Display for OverflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dimension too large")
    }
}

impl std::error::Error for OverflowError {}

impl std::fmt::Display for Scaled {
    // TeX.2021.103
    fn fmt(&self, fm: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = *self;
        if s < Scaled::ZERO {
            fm.write_char('-')?;
            s = -s;
        }
        write!(fm, "{}.", s.integer_part())?;
        let mut f = s.fractional_part() * 10 + Scaled(5);
        let mut delta = Scaled(10);
        loop {
            if delta > Scaled::ONE {
                // round the last digit
                f = f + Scaled(0o100000 - 50000);
            }
            let digit = (f.integer_part() as u32).min(9);
            fm.write_char(char::from_digit(digit, 10).unwrap_or('9'))?;
            f = f.fractional_part() * 10;
            delta = delta * 10;
            if f <= delta {
                break;
            }
        }
        write!(fm, "pt")?;
        Ok(())
    }
}

impl std::ops::Add<Scaled> for Scaled {
    type Output = Scaled;
    fn add(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0 + rhs.0)
    }
}
impl std::ops::Sub<Scaled> for Scaled {
    type Output = Scaled;
    fn sub(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i32> for Scaled {
    type Output = Scaled;
    fn mul(self, rhs: i32) -> Self::Output {
        Scaled(self.0 * rhs)
    }
}

impl std::ops::Div<i32> for Scaled {
    type Output = Scaled;
    fn div(self, rhs: i32) -> Self::Output {
        Scaled(self.0 / rhs)
    }
}

impl std::ops::Rem<i32> for Scaled {
    type Output = Scaled;
    fn rem(self, rhs: i32) -> Self::Output {
        Scaled(self.0 % rhs)
    }
}

impl std::ops::Neg for Scaled {
    type Output = Scaled;
    fn neg(self) -> Self::Output {
        Scaled(-self.0)
    }
}

/// Unit used to define a scaled integer
///
/// Defined in TeX.2021.458 and chapter 10 of the TeX book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaledUnit {
    Point,
    Pica,
    Inch,
    BigPoint,
    Centimeter,
    Millimeter,
    DidotPoint,
    Cicero,
    ScaledPoint,
}

impl ScaledUnit {
    /// Parses a unit from a two character abbreviation.
    ///
    /// E.g., `"pc"` is parsed to [`ScaledUnit::Pica`].
    /// These are abreviations are defined in TeX.2021.458 and chapter 10 of the TeX book.
    pub fn parse(s: &str) -> Option<Self> {
        use ScaledUnit::*;
        Some(match s {
            "pt" => Point,
            "pc" => Pica,
            "in" => Inch,
            "bp" => BigPoint,
            "cm" => Centimeter,
            "mm" => Millimeter,
            "dd" => DidotPoint,
            "cc" => Cicero,
            "sp" => ScaledPoint,
            _ => return None,
        })
    }

    /// Returns the fraction needed to convert to/from this unit to points.
    ///
    /// The return value is of the form (_n_, _d_).
    /// If a scaled number represents _x_ in these units (e.g. _x_ [`ScaledUnit::Pica`]),
    ///     then it is _nx_/_d_ points.
    ///
    /// Defined in TeX.2021.458.
    pub fn conversion_fraction(&self) -> (i32, i32) {
        use ScaledUnit::*;
        match self {
            Point => (1, 1),
            Pica => (12, 1),
            Inch => (7227, 100),
            BigPoint => (7227, 7200),
            Centimeter => (7227, 254),
            Millimeter => (7227, 2540),
            DidotPoint => (1238, 1157),
            Cicero => (14856, 1157),
            ScaledPoint => (1, 1 << 16),
        }
    }
}

/// Glue.
///
/// Fonts provide the glue TeX inserts between words
///     through their SPACE, STRETCH and SHRINK parameters.
///
/// Described in TeX.2021.150.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glue {
    pub width: Scaled,
    pub stretch: Scaled,
    pub stretch_order: GlueOrder,
    pub shrink: Scaled,
    pub shrink_order: GlueOrder,
}

impl Glue {
    /// Returns glue whose stretch and shrink are both finite.
    pub fn finite(width: Scaled, stretch: Scaled, shrink: Scaled) -> Glue {
        Glue {
            width,
            stretch,
            stretch_order: GlueOrder::Normal,
            shrink,
            shrink_order: GlueOrder::Normal,
        }
    }
}

impl std::fmt::Display for Glue {
    // TeX.2021.178
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.width)?;
        if self.stretch != Scaled::ZERO || self.stretch_order != GlueOrder::Normal {
            write!(f, " plus {}", self.stretch_order.display(self.stretch))?;
        }
        if self.shrink != Scaled::ZERO || self.shrink_order != GlueOrder::Normal {
            write!(f, " minus {}", self.shrink_order.display(self.shrink))?;
        }
        Ok(())
    }
}

/// Order of infinity of a glue stretch or shrink.
///
/// If a list contains glue of some order (e.g. [GlueOrder::Fil]),
/// then glues of a lower order (e.g. [GlueOrder::Normal]) are not stretched
/// or shrunk.
/// Font glue is always of order [GlueOrder::Normal].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlueOrder {
    Normal,
    Fil,
    Fill,
    Filll,
}

impl GlueOrder {
    fn display(self, s: Scaled) -> String {
        let mut out = format!["{s}"];
        let suffix = match self {
            GlueOrder::Normal => return out,
            GlueOrder::Fil => "fil",
            GlueOrder::Fill => "fill",
            GlueOrder::Filll => "filll",
        };
        // TeX.2021.177: infinite glue is printed without the unit.
        out.truncate(out.len() - 2);
        out.push_str(suffix);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! display_tests {
        ( $( ($name: ident, $input: expr, $want: expr), )+ ) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(format!["{}", $input], $want);
                }
            )+
        };
    }

    display_tests!(
        (display_zero, Scaled::ZERO, "0.0pt"),
        (display_one, Scaled::ONE, "1.0pt"),
        (display_negative_half, Scaled(-(1 << 15)), "-0.5pt"),
        (display_third_of_ten, Scaled(218453), "3.33333pt"),
        (display_max_dimen, Scaled::MAX_DIMEN, "16383.99998pt"),
        (
            display_glue,
            Glue::finite(Scaled(218453), Scaled(109226), Scaled(72818)),
            "3.33333pt plus 1.66666pt minus 1.11111pt"
        ),
        (
            display_glue_without_shrink,
            Glue::finite(Scaled::ONE, Scaled::TWO, Scaled::ZERO),
            "1.0pt plus 2.0pt"
        ),
        (
            display_infinite_glue,
            Glue {
                stretch_order: GlueOrder::Fill,
                ..Glue::finite(Scaled::ZERO, Scaled::ONE, Scaled::ZERO)
            },
            "0.0pt plus 1.0fill"
        ),
    );

    macro_rules! unit_tests {
        ( $( ($name: ident, $integer: expr, $fraction: expr, $unit: expr, $want: expr), )+ ) => {
            $(
                #[test]
                fn $name() {
                    let fraction = Scaled::from_decimal_fraction($fraction);
                    let got = Scaled::new($integer, fraction, $unit);
                    assert_eq!(got, $want);
                }
            )+
        };
    }

    unit_tests!(
        (ten_points, 10, &[], ScaledUnit::Point, Ok(Scaled(655360))),
        (half_point, 0, &[5], ScaledUnit::Point, Ok(Scaled(32768))),
        (one_inch, 1, &[], ScaledUnit::Inch, Ok(Scaled(4736286))),
        (one_big_point, 1, &[], ScaledUnit::BigPoint, Ok(Scaled(65781))),
        (one_centimeter, 1, &[], ScaledUnit::Centimeter, Ok(Scaled(1864679))),
        (one_pica, 1, &[], ScaledUnit::Pica, Ok(Scaled(786432))),
        (scaled_points, 12345, &[], ScaledUnit::ScaledPoint, Ok(Scaled(12345))),
        (negative_points, -2, &[], ScaledUnit::Point, Ok(Scaled(-131072))),
        (too_big, 16384, &[], ScaledUnit::Point, Err(OverflowError)),
        (too_big_after_conversion, 300, &[], ScaledUnit::Inch, Err(OverflowError)),
    );

    #[test]
    fn decimal_fraction() {
        assert_eq!(Scaled::from_decimal_fraction(&[5]), Scaled(32768));
        assert_eq!(Scaled::from_decimal_fraction(&[2, 5]), Scaled(16384));
        assert_eq!(Scaled::from_decimal_fraction(&[]), Scaled::ZERO);
    }

    #[test]
    fn xn_over_d() {
        assert_eq!(
            Scaled(655360).xn_over_d(1200, 1000),
            Ok((Scaled(786432), Scaled(0)))
        );
        assert_eq!(Scaled(7).xn_over_d(1, 2), Ok((Scaled(3), Scaled(1))));
        assert_eq!(Scaled(-7).xn_over_d(1, 2), Ok((Scaled(-3), Scaled(-1))));
        assert_eq!(Scaled::MAX_DIMEN.xn_over_d(2, 1), Err(OverflowError));
    }
}
