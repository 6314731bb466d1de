//! PostScript encoding vectors (`.enc` files)
//!
//! An encoding vector maps the 256 character codes of a font to PostScript glyph names.
//! The format is the one read by dvips and pdfTeX:
//!
//! ```txt
//! % A comment
//! /ExampleEncoding [
//! /grave /acute
//! /.notdef
//! ] def
//! ```
//!
//! Vectors with fewer than 256 entries are padded with `.notdef`.
//! Other tokens inside the brackets, and anything after the closing bracket
//! (usually `def` or `readonly def`), are ignored.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::OnceLock;

/// Name of the glyph used for unused slots.
pub const NOTDEF: &str = ".notdef";

/// An encoding vector.
#[derive(Debug, Clone)]
pub struct EncodingVector {
    name: String,
    glyphs: Vec<String>,
    index: OnceLock<HashMap<String, u8>>,
}

impl PartialEq for EncodingVector {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.glyphs == other.glyphs
    }
}

impl Eq for EncodingVector {}

impl EncodingVector {
    /// Creates a vector from at most 256 glyph names.
    ///
    /// Returns [`None`] if there are more than 256 names,
    ///     or if the name of the vector or of a glyph could not be read back from an `.enc` file.
    /// This is the case for empty names and names containing whitespace or one of `/[]{}%`.
    pub fn new(name: String, mut glyphs: Vec<String>) -> Option<EncodingVector> {
        if glyphs.len() > 256 || !is_valid_name(&name) {
            return None;
        }
        if let Some(invalid) = glyphs.iter().find(|glyph| !is_valid_name(glyph)) {
            log::debug!("glyph name {invalid:?} cannot appear in an encoding vector");
            return None;
        }
        glyphs.resize(256, NOTDEF.to_string());
        Some(EncodingVector {
            name,
            glyphs,
            index: Default::default(),
        })
    }

    /// Parses the text of an `.enc` file.
    pub fn parse(source: &str) -> Result<EncodingVector, MalformedEncodingError> {
        let (name, glyphs) = Parser::new(source).parse()?;
        log::debug!(
            "parsed encoding vector /{name} with {} glyph names",
            glyphs.len()
        );
        let vector = EncodingVector::new(name, glyphs);
        Ok(vector.expect("the parser reads at most 256 non-empty names without delimiters"))
    }

    /// The name of the vector, without the leading slash.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The glyph name in a slot, without the leading slash.
    pub fn glyph(&self, slot: u8) -> &str {
        &self.glyphs[slot as usize]
    }

    /// All 256 glyph names.
    pub fn glyphs(&self) -> &[String] {
        &self.glyphs
    }

    /// Returns the slot of a glyph name.
    ///
    /// A leading slash on the name is ignored.
    /// If a name appears in more than one slot, the first slot is returned.
    pub fn position(&self, glyph_name: &str) -> Option<u8> {
        let glyph_name = glyph_name.strip_prefix('/').unwrap_or(glyph_name);
        let index = self.index.get_or_init(|| {
            let mut index = HashMap::with_capacity(self.glyphs.len());
            for (slot, glyph) in self.glyphs.iter().enumerate() {
                index
                    .entry(glyph.clone())
                    .or_insert(u8::try_from(slot).expect("vectors have 256 slots"));
            }
            index
        });
        index.get(glyph_name).copied()
    }

    /// Writes the vector in the format of an `.enc` file.
    ///
    /// If `with_comments` is true, each glyph name is preceded by a comment giving its slot.
    pub fn write(&self, with_comments: bool) -> String {
        let mut s = format!("/{} [\n", self.name);
        for (slot, glyph) in self.glyphs.iter().enumerate() {
            if with_comments {
                s.push_str(&format!("% 0x{slot:02x} ({slot})\n"));
            }
            s.push('/');
            s.push_str(glyph);
            s.push('\n');
        }
        s.push_str("] def\n");
        s
    }
}

/// Error returned when an encoding vector cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEncodingError {
    pub kind: MalformedEncodingErrorKind,
    /// Byte range of the problem in the source.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedEncodingErrorKind {
    /// The file does not start with the `/name` of the vector.
    MissingName,
    /// The name of the vector is a slash on its own.
    EmptyName,
    /// The name is not followed by `[`.
    MissingOpenBracket,
    /// The `[` is never closed.
    UnmatchedBracket,
    /// The vector has more than 256 glyph names.
    TooManyGlyphs,
}

impl MalformedEncodingError {
    /// Byte offset of the problem in the source.
    pub fn offset(&self) -> usize {
        self.span.start
    }

    fn message(&self) -> &'static str {
        use MalformedEncodingErrorKind::*;
        match self.kind {
            MissingName => "an encoding vector must start with its name",
            EmptyName => "the name of the encoding vector is empty",
            MissingOpenBracket => "the name of the encoding vector must be followed by `[`",
            UnmatchedBracket => "the `[` of the encoding vector is never closed",
            TooManyGlyphs => "an encoding vector can have at most 256 glyph names",
        }
    }

    fn label(&self) -> &'static str {
        use MalformedEncodingErrorKind::*;
        match self.kind {
            MissingName => "expected a name like `/MyEncoding` here",
            EmptyName => "a name must follow the slash",
            MissingOpenBracket => "expected `[` here",
            UnmatchedBracket => "this bracket is not closed",
            TooManyGlyphs => "this is glyph number 257",
        }
    }

    #[cfg(feature = "ariadne")]
    pub fn ariadne_report<'a>(
        &self,
        file_name: &'a str,
    ) -> ariadne::Report<'static, (&'a str, Range<usize>)> {
        ariadne::Report::build(
            ariadne::ReportKind::Error,
            (file_name, self.span.clone()),
        )
        .with_config(ariadne::Config::default().with_index_type(ariadne::IndexType::Byte))
        .with_message(self.message())
        .with_label(
            ariadne::Label::new((file_name, self.span.clone()))
                .with_message(self.label())
                .with_color(ariadne::Color::BrightRed),
        )
        .finish()
    }
}

impl std::fmt::Display for MalformedEncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at byte {})", self.message(), self.span.start)
    }
}

impl std::error::Error for MalformedEncodingError {}

struct Parser {
    // The source with comments replaced by spaces, so that offsets are preserved.
    b: Vec<u8>,
    i: usize,
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'/' | b'[' | b']' | b'{' | b'}' | b'%')
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.bytes().any(is_delimiter)
}

impl Parser {
    fn new(source: &str) -> Parser {
        let mut b: Vec<u8> = source.as_bytes().into();
        let mut in_comment = false;
        for b in &mut b {
            match *b {
                b'%' => in_comment = true,
                b'\n' | b'\r' => in_comment = false,
                _ => {}
            }
            if in_comment {
                *b = b' ';
            }
        }
        Parser { b, i: 0 }
    }

    fn error(kind: MalformedEncodingErrorKind, span: Range<usize>) -> MalformedEncodingError {
        MalformedEncodingError { kind, span }
    }

    fn skip_whitespace(&mut self) {
        while self.b.get(self.i).is_some_and(u8::is_ascii_whitespace) {
            self.i += 1;
        }
    }

    /// Consumes a run of non-delimiter bytes and returns its span.
    fn word(&mut self) -> Range<usize> {
        let start = self.i;
        while self.b.get(self.i).is_some_and(|b| !is_delimiter(*b)) {
            self.i += 1;
        }
        start..self.i
    }

    fn text(&self, span: Range<usize>) -> String {
        String::from_utf8_lossy(&self.b[span]).into_owned()
    }

    /// Consumes a word, or a single delimiter if there is no word here.
    fn token(&mut self) -> Range<usize> {
        let span = self.word();
        if !span.is_empty() {
            return span;
        }
        self.i += 1;
        span.start..self.i
    }

    fn parse(mut self) -> Result<(String, Vec<String>), MalformedEncodingError> {
        use MalformedEncodingErrorKind::*;
        self.skip_whitespace();
        if self.b.get(self.i) != Some(&b'/') {
            let start = self.i;
            let span = self.word();
            return Err(Self::error(MissingName, start..span.end.max(start + 1)));
        }
        let slash = self.i;
        self.i += 1;
        let span = self.word();
        if span.is_empty() {
            return Err(Self::error(EmptyName, slash..slash + 1));
        }
        let name = self.text(span);

        self.skip_whitespace();
        if self.b.get(self.i) != Some(&b'[') {
            return Err(Self::error(MissingOpenBracket, self.i..self.i + 1));
        }
        let open_bracket = self.i;
        self.i += 1;

        let mut glyphs = vec![];
        loop {
            self.skip_whitespace();
            match self.b.get(self.i) {
                None => {
                    return Err(Self::error(UnmatchedBracket, open_bracket..open_bracket + 1));
                }
                Some(b']') => {
                    self.i += 1;
                    break;
                }
                Some(b'/') => {
                    let start = self.i;
                    self.i += 1;
                    let span = self.word();
                    if span.is_empty() {
                        log::debug!("ignoring a slash without a glyph name at byte {start}");
                        continue;
                    }
                    if glyphs.len() == 256 {
                        return Err(Self::error(TooManyGlyphs, start..self.i));
                    }
                    glyphs.push(self.text(span));
                }
                Some(_) => {
                    let span = self.token();
                    log::debug!(
                        "ignoring `{}` at byte {} in encoding vector /{name}",
                        self.text(span.clone()),
                        span.start
                    );
                }
            }
        }
        Ok((name, glyphs))
    }
}
