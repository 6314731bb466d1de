use extex_core::{Scaled, ScaledUnit};
use extex_tfm::encoding::EncodingVector;
use extex_tfm::{Char, Font};

#[derive(Clone, Debug)]
pub struct TfmPath(pub std::path::PathBuf);

impl TfmPath {
    pub fn read(&self) -> Result<Font, String> {
        let data = match std::fs::read(&self.0) {
            Ok(data) => data,
            Err(err) => return Err(format!("Failed to read `{}`: {}", self.0.display(), err)),
        };
        match Font::from_bytes(&data) {
            Ok(font) => Ok(font),
            Err(err) => Err(format!("`{}` is not a valid .tfm file: {}", self.0.display(), err)),
        }
    }

    fn parse(input: &str) -> Result<Self, InvalidExtension> {
        let path_buf: std::path::PathBuf = input.into();
        match path_buf.extension().and_then(std::ffi::OsStr::to_str) {
            Some("tfm") => Ok(TfmPath(path_buf)),
            extension => Err(InvalidExtension {
                provided: extension.map(str::to_string),
                allowed: vec!["tfm"],
            }),
        }
    }
}

impl clap::builder::ValueParserFactory for TfmPath {
    type Parser = clap::builder::ValueParser;

    fn value_parser() -> Self::Parser {
        clap::builder::ValueParser::new(TfmPath::parse)
    }
}

#[derive(Clone, Debug)]
pub struct EncPath(pub std::path::PathBuf);

impl EncPath {
    /// Reads and parses the encoding vector, printing a report of any error to stderr.
    pub fn read(&self) -> Result<EncodingVector, String> {
        let source = match std::fs::read_to_string(&self.0) {
            Ok(source) => source,
            Err(err) => return Err(format!("Failed to read `{}`: {}", self.0.display(), err)),
        };
        match EncodingVector::parse(&source) {
            Ok(vector) => Ok(vector),
            Err(err) => {
                let path = self.0.to_string_lossy();
                let cache: (&str, _) = (&path, ariadne::Source::from(source.as_str()));
                if let Err(io_err) = err.ariadne_report(&path).eprint(cache) {
                    log::error!("failed to print the error report: {io_err}");
                }
                Err(format!("`{}` is not a valid encoding vector: {}", path, err))
            }
        }
    }

    fn parse(input: &str) -> Result<Self, InvalidExtension> {
        let path_buf: std::path::PathBuf = input.into();
        match path_buf.extension().and_then(std::ffi::OsStr::to_str) {
            Some("enc") => Ok(EncPath(path_buf)),
            extension => Err(InvalidExtension {
                provided: extension.map(str::to_string),
                allowed: vec!["enc"],
            }),
        }
    }
}

impl clap::builder::ValueParserFactory for EncPath {
    type Parser = clap::builder::ValueParser;

    fn value_parser() -> Self::Parser {
        clap::builder::ValueParser::new(EncPath::parse)
    }
}

#[derive(Debug)]
pub struct InvalidExtension {
    pub provided: Option<String>,
    pub allowed: Vec<&'static str>,
}

impl std::fmt::Display for InvalidExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let allowed = self
            .allowed
            .iter()
            .map(|s| format![".{s}"])
            .collect::<Vec<String>>()
            .join(" or ");
        match &self.provided {
            None => write!(
                f,
                "the file extension must be {} but it is missing",
                allowed
            ),
            Some(extension) => write!(
                f,
                "the file extension must be {} but it is .{}",
                allowed, extension
            ),
        }
    }
}

impl std::error::Error for InvalidExtension {}

/// A character given on the command line.
///
/// Characters are written as a single ASCII character (`A`),
///     in octal with a leading quote (`'101`),
///     or in hexadecimal (`0x41`).
#[derive(Clone, Copy, Debug)]
pub struct CharArg(pub Char);

impl CharArg {
    fn parse(input: &str) -> Result<Self, String> {
        let number = if let Some(octal) = input.strip_prefix('\'') {
            Some((octal, 8))
        } else {
            input.strip_prefix("0x").map(|hex| (hex, 16))
        };
        if let Some((digits, radix)) = number {
            return match u8::from_str_radix(digits, radix) {
                Ok(u) => Ok(CharArg(Char(u))),
                Err(_) => Err(format!(
                    "`{input}` is not a character code between 0 and 255"
                )),
            };
        }
        let mut chars = input.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Ok(CharArg(Char(c as u8))),
            _ => Err(format!(
                "`{input}` is not a character; use a single ASCII character, 'NNN (octal) or 0xNN (hex)"
            )),
        }
    }
}

impl clap::builder::ValueParserFactory for CharArg {
    type Parser = clap::builder::ValueParser;

    fn value_parser() -> Self::Parser {
        clap::builder::ValueParser::new(CharArg::parse)
    }
}

/// A length given on the command line, like `12pt` or `1.5in`.
#[derive(Clone, Copy, Debug)]
pub struct Length(pub Scaled);

impl Length {
    fn parse(input: &str) -> Result<Self, String> {
        let (number, unit) = match input.find(|c: char| c.is_ascii_alphabetic()) {
            None => return Err(format!("`{input}` has no unit, e.g. pt")),
            Some(i) => input.split_at(i),
        };
        let Some(unit) = ScaledUnit::parse(unit) else {
            return Err(format!(
                "unknown unit `{unit}`; expected one of pt, pc, in, bp, cm, mm, dd, cc or sp"
            ));
        };
        let (negative, number) = match number.strip_prefix('-') {
            Some(number) => (true, number),
            None => (false, number),
        };
        let (integer, fraction) = number.split_once('.').unwrap_or((number, ""));
        let not_a_number = || format!("`{input}` is not a length");
        if (integer.is_empty() && fraction.is_empty())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(not_a_number());
        }
        let integer: i32 = if integer.is_empty() {
            0
        } else {
            integer.parse().map_err(|_| not_a_number())?
        };
        let digits: Vec<u8> = fraction.bytes().map(|b| b - b'0').collect();
        let mut fraction = Scaled::from_decimal_fraction(&digits);
        let mut integer = integer;
        if fraction == Scaled::ONE {
            // .999999 rounds up
            integer = integer.saturating_add(1);
            fraction = Scaled::ZERO;
        }
        let length = match Scaled::new(integer, fraction, unit) {
            Ok(length) => length,
            Err(_) => return Err(format!("`{input}` is too large")),
        };
        Ok(Length(if negative { -length } else { length }))
    }
}

impl clap::builder::ValueParserFactory for Length {
    type Parser = clap::builder::ValueParser;

    fn value_parser() -> Self::Parser {
        clap::builder::ValueParser::new(Length::parse)
    }
}

/// Describes a character for humans: `'146 (f)`.
pub fn describe(c: Char) -> String {
    if c.0.is_ascii_graphic() {
        format!("{} ({})", c, c.0 as char)
    } else {
        format!("{}", c)
    }
}
