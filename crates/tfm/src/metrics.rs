//! Binding fonts to sizes.
//!
//! The numbers in a .tfm file are fix words relative to the size of the font.
//! TeX converts them to absolute lengths once, when a font is loaded at a particular size,
//!     using an algorithm that only needs 32-bit arithmetic (TeX.2021.571-572).
//! The result of that algorithm is what every TeX document is typeset with,
//!     so it is reproduced here bit for bit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ligkern::lang::Operation;
use crate::ligkern::LigatureStep;
use crate::*;

/// A request to use a font at a particular size.
///
/// This corresponds to the `at` and `scaled` clauses of TeX's `\font` primitive,
///     plus the typesetting switches that affect which lig/kern data is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontKey {
    /// The requested size. Zero means the design size of the font.
    pub size: Scaled,
    /// The scale factor in thousandths. Zero means 1000.
    pub scale: i32,
    /// Extra space inserted between letters by the typesetter.
    ///
    /// Letter-spaced text keeps its individual characters, so a non-zero value disables ligatures.
    pub letter_spacing: Scaled,
    /// Whether ligatures are formed.
    pub ligatures: bool,
    /// Whether kerns are inserted.
    pub kerning: bool,
}

impl Default for FontKey {
    fn default() -> Self {
        FontKey {
            size: Scaled::ZERO,
            scale: 1000,
            letter_spacing: Scaled::ZERO,
            ligatures: true,
            kerning: true,
        }
    }
}

impl FontKey {
    /// Sets the requested size, as in `\font\x=cmr10 at 12pt`.
    pub fn at(mut self, size: Scaled) -> Self {
        self.size = size;
        self
    }

    /// Sets the scale factor, as in `\font\x=cmr10 scaled 1200`.
    pub fn scaled(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    pub fn letter_spaced(mut self, letter_spacing: Scaled) -> Self {
        self.letter_spacing = letter_spacing;
        self
    }

    pub fn with_ligatures(mut self, ligatures: bool) -> Self {
        self.ligatures = ligatures;
        self
    }

    pub fn with_kerning(mut self, kerning: bool) -> Self {
        self.kerning = kerning;
        self
    }
}

/// Error returned when a font cannot be used at the requested size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeRequestError {
    /// The requested size is negative or at least 2048pt (TeX.2021.1259).
    ImproperSize(Scaled),
    /// The scale is not between 1 and 32768 (TeX.2021.1258).
    IllegalScale(i32),
    /// The scaled size is at least 2048pt, which TeX's scaling algorithm can't handle.
    SizeTooLarge(Scaled),
}

impl std::fmt::Display for SizeRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeRequestError::ImproperSize(size) => write!(
                f,
                "improper `at' size ({size}); it must be positive and less than 2048pt"
            ),
            SizeRequestError::IllegalScale(scale) => write!(
                f,
                "illegal magnification ({scale}); it must be between 1 and 32768"
            ),
            SizeRequestError::SizeTooLarge(size) => {
                write!(f, "the scaled size {size} is not less than 2048pt")
            }
        }
    }
}

impl std::error::Error for SizeRequestError {}

/// Sizes must be smaller than this; 2048pt.
const MAX_SIZE: Scaled = Scaled(1 << 27);

/// The state of TeX's `store_scaled` routine for one size (TeX.2021.572).
#[derive(Debug, Clone, Copy)]
struct Scaler {
    /// The size, halved until it is smaller than 2^23.
    z: i32,
    /// 16 times the number of halvings, times `z`.
    alpha: i32,
    /// 256 divided by 16 times the number of halvings.
    beta: i32,
    /// Number of fractional bits left after multiplying by `z`.
    shift: u32,
}

impl Scaler {
    fn new(size: Scaled) -> Scaler {
        let mut z = size.0;
        let mut alpha = 16;
        let mut shift = 20;
        while z >= 0o40000000 {
            z /= 2;
            alpha += alpha;
            shift -= 1;
        }
        let beta = 256 / alpha;
        Scaler {
            z,
            alpha: alpha * z,
            beta,
            shift,
        }
    }

    fn scale(&self, fix_word: FixWord) -> Scaled {
        let [a, b, c, d] = fix_word.0.to_be_bytes().map(i32::from);
        let z = self.z;
        let sw = (((d * z) / 256 + c * z) / 256 + b * z) / self.beta;
        match a {
            0 => Scaled(sw),
            255 => Scaled(sw - self.alpha),
            _ => {
                // Not reachable for fix words of a validated font.
                // The result is the same as what TeX's algorithm computes for in-range numbers.
                let exact = (z as i64 * fix_word.0 as i64) >> self.shift;
                Scaled(exact.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            }
        }
    }
}

/// A font bound to a size.
///
/// Scaled fonts are cheap to create and share their [`Font`].
/// Glyphs are computed on demand and cached for the lifetime of the scaled font.
/// The cache is guarded by a mutex, so a scaled font can be used from multiple threads.
#[derive(Debug)]
pub struct ScaledFont {
    font: Arc<Font>,
    key: FontKey,
    actual_size: Scaled,
    scaler: Scaler,
    cache: Mutex<HashMap<Char, Arc<Glyph>>>,
}

impl ScaledFont {
    /// Binds a font to a size request.
    ///
    /// The actual size is the requested size, or the design size if none was requested,
    ///     multiplied by the scale divided by 1000 with truncation, as in TeX.2021.1258.
    pub fn new(font: Arc<Font>, key: FontKey) -> Result<ScaledFont, SizeRequestError> {
        let actual_size = actual_size(font.design_size(), &key)?;
        log::debug!(
            "scaling font with design size {}pt to {} (key: {:?})",
            font.design_size(),
            actual_size,
            key
        );
        Ok(ScaledFont {
            font,
            key,
            actual_size,
            scaler: Scaler::new(actual_size),
            cache: Default::default(),
        })
    }

    pub fn font(&self) -> &Arc<Font> {
        &self.font
    }

    pub fn key(&self) -> &FontKey {
        &self.key
    }

    /// The design size of the font as a length.
    pub fn design_size(&self) -> Scaled {
        design_size(self.font.design_size())
    }

    /// The size the font is used at.
    pub fn actual_size(&self) -> Scaled {
        self.actual_size
    }

    pub fn checksum(&self) -> u32 {
        self.font.checksum()
    }

    /// The letter spacing requested for the font.
    pub fn letter_spacing(&self) -> Scaled {
        self.key.letter_spacing
    }

    /// Whether ligatures are formed: they are requested and the font isn't letter spaced.
    pub fn ligatures_enabled(&self) -> bool {
        self.key.ligatures && self.key.letter_spacing == Scaled::ZERO
    }

    pub fn kerning_enabled(&self) -> bool {
        self.key.kerning
    }

    /// Converts a fix word relative to the font's size to an absolute length.
    ///
    /// The result is exactly `floor(z * fix_word / 2^(20-k))`,
    ///     where `z` is the actual size halved `k` times until it is smaller than 2^23.
    /// For sizes smaller than 2^23sp (128pt) this is `floor(size * fix_word / 2^20)`.
    pub fn convert(&self, fix_word: FixWord) -> Scaled {
        self.scaler.scale(fix_word)
    }

    /// Returns the glyph for a character.
    ///
    /// Characters that are not in the font have a glyph without metrics.
    pub fn glyph(&self, c: Char) -> Arc<Glyph> {
        if let Some(glyph) = self.lock_cache().get(&c) {
            return glyph.clone();
        }
        log::trace!("computing glyph for character {c}");
        // A concurrent call may compute the same glyph; either result can be kept.
        let glyph = Arc::new(self.compute_glyph(c));
        self.lock_cache().entry(c).or_insert(glyph).clone()
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<Char, Arc<Glyph>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn compute_glyph(&self, c: Char) -> Glyph {
        let Some(dimensions) = self.font.chars().dimensions(c) else {
            return Glyph::absent(c);
        };
        let mut glyph = Glyph {
            char: c,
            metrics: Some(GlyphMetrics {
                width: self.convert(dimensions.width),
                height: self.convert(dimensions.height),
                depth: self.convert(dimensions.depth),
                italic_correction: self.convert(dimensions.italic_correction),
            }),
            ligatures: vec![],
            kerns: vec![],
            next_larger: self.font.next_larger(c),
            extensible: self.font.extensible_recipe(c).cloned(),
        };
        let Some(start) = self.font.lig_kern_entrypoint(c) else {
            return glyph;
        };
        if !self.ligatures_enabled() && !self.kerning_enabled() {
            return glyph;
        }
        let instructions = match self.font.lig_kern_program().pairs(start, false) {
            Ok(instructions) => instructions,
            Err(err) => {
                log::error!("lig/kern program of character {c} is corrupt: {err}");
                return glyph;
            }
        };
        for instruction in instructions {
            match instruction.operation() {
                Operation::Kern(index) => {
                    if self.kerning_enabled() {
                        glyph.kerns.push(Kern {
                            right: instruction.right_char,
                            amount: self.convert(self.font.kern_at(index)),
                        });
                    }
                }
                Operation::Ligature { .. } => {
                    if let (true, Some(step)) = (
                        self.ligatures_enabled(),
                        LigatureStep::from_instruction(instruction),
                    ) {
                        glyph.ligatures.push(Ligature {
                            right: instruction.right_char,
                            step,
                        });
                    }
                }
            }
        }
        glyph
    }

    /// The kern between two characters, if kerning is enabled and the font has one.
    pub fn kern(&self, left: Char, right: Char) -> Option<Scaled> {
        if !self.kerning_enabled() {
            return None;
        }
        match self.font.kern(left, right) {
            Ok(kern) => kern.map(|kern| self.convert(kern)),
            Err(err) => {
                log::error!("lig/kern program of character {left} is corrupt: {err}");
                None
            }
        }
    }

    /// The ligature formed by two characters, if ligatures are enabled and the font has one.
    pub fn ligature(&self, left: Char, right: Char) -> Option<LigatureStep> {
        if !self.ligatures_enabled() {
            return None;
        }
        match self.font.ligature(left, right) {
            Ok(step) => step,
            Err(err) => {
                log::error!("lig/kern program of character {left} is corrupt: {err}");
                None
            }
        }
    }

    /// Returns a parameter as a length. Parameters missing from the font are zero.
    ///
    /// The slant is a pure number and is returned the way TeX stores it (TeX.2021.575):
    ///     as a [`Scaled`] with 16 fractional bits.
    pub fn param(&self, named_param: NamedParam) -> Scaled {
        self.scaled_param(named_param.number())
    }

    /// Returns the parameter with the given 1-based number, as TeX's `\fontdimen` does.
    ///
    /// Numbers that are not positive, or beyond the parameters of the font, give zero.
    pub fn param_at(&self, number: i16) -> Scaled {
        match ParameterNumber::new(number) {
            None => Scaled::ZERO,
            Some(number) => self.scaled_param(number),
        }
    }

    /// Returns a parameter given by name (`SPACE`, `xheight`, ...) or by number (`2`).
    pub fn param_by_name(&self, name: &str) -> Result<Scaled, UnknownParameterError> {
        if let Ok(number) = name.parse::<i16>() {
            return Ok(self.param_at(number));
        }
        let named_param: NamedParam = name.parse()?;
        Ok(self.param(named_param))
    }

    fn scaled_param(&self, number: ParameterNumber) -> Scaled {
        let value = self.font.params().get(number);
        if number == NamedParam::Slant.number() {
            Scaled(value.0 >> 4)
        } else {
            self.convert(value)
        }
    }

    /// The slant of the font, unscaled.
    pub fn slant(&self) -> FixWord {
        self.font.params().get_named(NamedParam::Slant)
    }

    /// The interword glue of the font.
    ///
    /// If the font has no SPACE parameter, as is common for math fonts,
    ///     the glue is derived from the actual size in the proportions of cmr10:
    ///     a third of the size, stretching by a sixth and shrinking by a ninth.
    pub fn space(&self) -> Glue {
        if self.font.params().contains(NamedParam::Space.number()) {
            Glue::finite(
                self.param(NamedParam::Space),
                self.param(NamedParam::Stretch),
                self.param(NamedParam::Shrink),
            )
        } else {
            Glue::finite(
                self.actual_size / 3,
                self.actual_size / 6,
                self.actual_size / 9,
            )
        }
    }

    pub fn extra_space(&self) -> Scaled {
        self.param(NamedParam::ExtraSpace)
    }

    pub fn x_height(&self) -> Scaled {
        self.param(NamedParam::XHeight)
    }

    pub fn quad(&self) -> Scaled {
        self.param(NamedParam::Quad)
    }
}

fn design_size(fix_word: FixWord) -> Scaled {
    // TeX.2021.568
    Scaled(fix_word.0 >> 4)
}

fn actual_size(design: FixWord, key: &FontKey) -> Result<Scaled, SizeRequestError> {
    if key.size < Scaled::ZERO || key.size >= MAX_SIZE {
        return Err(SizeRequestError::ImproperSize(key.size));
    }
    let scale = if key.scale == 0 { 1000 } else { key.scale };
    if !(1..=32768).contains(&scale) {
        return Err(SizeRequestError::IllegalScale(key.scale));
    }
    let size = if key.size == Scaled::ZERO {
        design_size(design)
    } else {
        key.size
    };
    let actual_size = match size.xn_over_d(scale, 1000) {
        Ok((actual_size, _)) => actual_size,
        Err(_) => return Err(SizeRequestError::SizeTooLarge(Scaled::MAX_DIMEN)),
    };
    if actual_size >= MAX_SIZE {
        return Err(SizeRequestError::SizeTooLarge(actual_size));
    }
    Ok(actual_size)
}

/// The dimensions of a character at a particular size.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
    pub italic_correction: Scaled,
}

/// A ligature that a glyph forms with a following character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ligature {
    pub right: Char,
    pub step: LigatureStep,
}

/// A kern between a glyph and a following character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kern {
    pub right: Char,
    pub amount: Scaled,
}

/// Everything a typesetter needs to know about one character of a scaled font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub char: Char,
    /// The dimensions of the character, or [`None`] if the font does not contain it.
    pub metrics: Option<GlyphMetrics>,
    /// Ligatures with following characters, if ligatures are enabled.
    pub ligatures: Vec<Ligature>,
    /// Kerns with following characters, if kerning is enabled.
    pub kerns: Vec<Kern>,
    pub next_larger: Option<Char>,
    pub extensible: Option<ExtensibleRecipe>,
}

impl Glyph {
    fn absent(c: Char) -> Glyph {
        Glyph {
            char: c,
            metrics: None,
            ligatures: vec![],
            kerns: vec![],
            next_larger: None,
            extensible: None,
        }
    }

    /// Whether the font contains the character.
    pub fn exists(&self) -> bool {
        self.metrics.is_some()
    }

    pub fn width(&self) -> Option<Scaled> {
        self.metrics.map(|m| m.width)
    }

    pub fn height(&self) -> Option<Scaled> {
        self.metrics.map(|m| m.height)
    }

    pub fn depth(&self) -> Option<Scaled> {
        self.metrics.map(|m| m.depth)
    }

    pub fn italic_correction(&self) -> Option<Scaled> {
        self.metrics.map(|m| m.italic_correction)
    }

    pub fn kern(&self, right: Char) -> Option<Scaled> {
        self.kerns
            .iter()
            .find(|kern| kern.right == right)
            .map(|kern| kern.amount)
    }

    pub fn ligature(&self, right: Char) -> Option<&LigatureStep> {
        self.ligatures
            .iter()
            .find(|ligature| ligature.right == right)
            .map(|ligature| &ligature.step)
    }
}
