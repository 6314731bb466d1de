use super::*;

/// A structural problem in the first 24 bytes of a .tfm file.
///
/// These are the checks of TFtoPL.2014.20-21.
/// Once they pass, every table of the file can be sliced out of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer is shorter than the length the file declares,
    ///     or too short to declare a length at all.
    Truncated {
        claimed_bytes: usize,
        actual_bytes: usize,
    },
    /// The declared length `lf` is zero or negative.
    NonPositiveLength(i16),
    /// The declared length is shorter than the 24 bytes of sizes at the start of the file.
    LengthTooSmall(i16),
    /// One of the sub-file sizes is negative.
    NegativeSize(SubFileSizes),
    /// The header has fewer than the 2 mandatory words (checksum and design size).
    HeaderTooShort(i16),
    /// The character range `bc..=ec` is not empty and not inside `0..=255`.
    CharacterRange { bc: i16, ec: i16 },
    /// One of the width, height, depth and italic correction tables is empty.
    ///
    /// Each of them must at least hold the zero entry.
    EmptyDimensionTable(SubFileSizes),
    TooManyExtensibleRecipes(i16),
    /// The declared length is not the sum of the sub-file sizes.
    SizesDoNotAddUp { lf: i16, total: i32 },
}

impl Error {
    /// If the file is shorter than it should be, the expected and actual number of bytes.
    pub fn truncation(&self) -> Option<(usize, usize)> {
        match self {
            Error::Truncated {
                claimed_bytes,
                actual_bytes,
            } => Some((*claimed_bytes, *actual_bytes)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Truncated {
                claimed_bytes,
                actual_bytes,
            } => write!(
                f,
                "the file has {actual_bytes} bytes but needs {claimed_bytes}"
            ),
            Error::NonPositiveLength(lf) => write!(f, "the declared file length {lf} is not positive"),
            Error::LengthTooSmall(lf) => write!(
                f,
                "the declared file length of {lf} words cannot hold the {} bytes of sub-file sizes",
                HEADER_BYTES
            ),
            Error::NegativeSize(sizes) => write!(f, "a sub-file size is negative: {sizes:?}"),
            Error::HeaderTooShort(lh) => {
                write!(f, "the header has {lh} words but needs at least 2")
            }
            Error::CharacterRange { bc, ec } => {
                write!(f, "the character range {bc}..={ec} is invalid")
            }
            Error::EmptyDimensionTable(sizes) => write!(
                f,
                "a dimension table is empty (nw={}, nh={}, nd={}, ni={})",
                sizes.nw, sizes.nh, sizes.nd, sizes.ni
            ),
            Error::TooManyExtensibleRecipes(ne) => {
                write!(f, "there are {ne} extensible recipes but at most 256 are allowed")
            }
            Error::SizesDoNotAddUp { lf, total } => write!(
                f,
                "the file declares {lf} words but its sub-files take {total}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A problem in a .tfm file that does not stop it from being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The buffer is longer than the declared length; the extra bytes are ignored.
    TrailingBytes { claimed_bytes: usize, actual_bytes: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::TrailingBytes {
                claimed_bytes,
                actual_bytes,
            } => write!(
                f,
                "the file claims to have {claimed_bytes} bytes but has {actual_bytes}; the extra bytes are ignored"
            ),
        }
    }
}

/// Size of the sub-file sizes section at the start of the file.
const HEADER_BYTES: usize = 24;

/// Deserialize a TeX font metric (.tfm) file.
pub(super) fn deserialize(b: &[u8]) -> Result<(File, Vec<Warning>), Error> {
    let mut warnings: Vec<Warning> = vec![];
    let actual_bytes = b.len();
    if actual_bytes < 2 {
        return Err(Error::Truncated {
            claimed_bytes: HEADER_BYTES,
            actual_bytes,
        });
    }
    let lf = i16::deserialize(b);
    if lf <= 0 {
        return Err(Error::NonPositiveLength(lf));
    }
    let claimed_bytes = (lf as usize) * 4;
    if actual_bytes < claimed_bytes {
        return Err(Error::Truncated {
            claimed_bytes,
            actual_bytes,
        });
    }
    if claimed_bytes < HEADER_BYTES {
        return Err(Error::LengthTooSmall(lf));
    }
    if actual_bytes > claimed_bytes {
        warnings.push(Warning::TrailingBytes {
            claimed_bytes,
            actual_bytes,
        });
    }
    let sub_file_sizes = SubFileSizes::deserialize(&b[2..]);
    sub_file_sizes.validate(lf)?;
    #[rustfmt::skip]
    let [
        raw_header,
        raw_char_infos,
        raw_widths,
        raw_heights,
        raw_depths,
        raw_italic_corrections,
        raw_lig_kern,
        raw_kerns,
        raw_extensible_chars,
        raw_params,
    ] = sub_file_sizes.partition(&b[HEADER_BYTES..]);

    let file = File {
        header: Deserializable::deserialize(raw_header),
        smallest_char_code: if sub_file_sizes.bc <= sub_file_sizes.ec {
            // validate() checked that ec <= 255
            Char(sub_file_sizes.bc as u8)
        } else {
            Char(0)
        },
        char_infos: Deserializable::deserialize(raw_char_infos),
        widths: Deserializable::deserialize(raw_widths),
        heights: Deserializable::deserialize(raw_heights),
        depths: Deserializable::deserialize(raw_depths),
        italic_corrections: Deserializable::deserialize(raw_italic_corrections),
        lig_kern_instructions: Deserializable::deserialize(raw_lig_kern),
        kerns: Deserializable::deserialize(raw_kerns),
        extensible_chars: Deserializable::deserialize(raw_extensible_chars),
        params: Deserializable::deserialize(raw_params),
    };
    Ok((file, warnings))
}

trait Deserializable: Sized {
    fn deserialize(b: &[u8]) -> Self;
}

/// Implementations of this trait consume a fixed number of bytes when deserializing.
trait DeserializableFixed: Deserializable {
    const NUM_BYTES: usize;
}

impl Deserializable for i16 {
    #[inline]
    fn deserialize(b: &[u8]) -> Self {
        i16::from_be_bytes([b[0], b[1]])
    }
}

impl DeserializableFixed for i16 {
    const NUM_BYTES: usize = 2;
}

impl Deserializable for u32 {
    #[inline]
    fn deserialize(b: &[u8]) -> Self {
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }
}

impl DeserializableFixed for u32 {
    const NUM_BYTES: usize = 4;
}

impl Deserializable for FixWord {
    #[inline]
    fn deserialize(b: &[u8]) -> Self {
        FixWord::from_raw(u32::deserialize(b))
    }
}

impl DeserializableFixed for FixWord {
    const NUM_BYTES: usize = 4;
}

/// The twelve 16-bit numbers at the start of a .tfm file, without the file length.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct SubFileSizes {
    /// Length of the header data, in words.
    pub lh: i16,
    /// Smallest character code in the font.
    pub bc: i16,
    /// Largest character code in the font.
    pub ec: i16,
    /// Number of words in the width table.
    pub nw: i16,
    /// Number of words in the height table.
    pub nh: i16,
    /// Number of words in the depth table.
    pub nd: i16,
    /// Number of words in the italic correction table.
    pub ni: i16,
    /// Number of words in the lig/kern table.
    pub nl: i16,
    /// Number of words in the kern table.
    pub nk: i16,
    /// Number of words in the extensible character table.
    pub ne: i16,
    /// Number of font parameter words.
    pub np: i16,
}

impl Deserializable for SubFileSizes {
    fn deserialize(b: &[u8]) -> Self {
        Self {
            lh: i16::deserialize(&b[0..2]),
            bc: i16::deserialize(&b[2..4]),
            ec: i16::deserialize(&b[4..6]),
            nw: i16::deserialize(&b[6..8]),
            nh: i16::deserialize(&b[8..10]),
            nd: i16::deserialize(&b[10..12]),
            ni: i16::deserialize(&b[12..14]),
            nl: i16::deserialize(&b[14..16]),
            nk: i16::deserialize(&b[16..18]),
            ne: i16::deserialize(&b[18..20]),
            np: i16::deserialize(&b[20..22]),
        }
    }
}

impl SubFileSizes {
    fn validate(&self, lf: i16) -> Result<(), Error> {
        if self.lh < 0
            || self.bc < 0
            || self.ec < 0
            || self.nw < 0
            || self.nh < 0
            || self.nd < 0
            || self.ni < 0
            || self.nl < 0
            || self.nk < 0
            || self.ne < 0
            || self.np < 0
        {
            return Err(Error::NegativeSize(self.clone()));
        }
        if self.lh < 2 {
            return Err(Error::HeaderTooShort(self.lh));
        }
        if self.ec > 255 || self.bc > self.ec + 1 {
            return Err(Error::CharacterRange {
                bc: self.bc,
                ec: self.ec,
            });
        }
        if self.nw == 0 || self.nh == 0 || self.nd == 0 || self.ni == 0 {
            return Err(Error::EmptyDimensionTable(self.clone()));
        }
        if self.ne > 256 {
            return Err(Error::TooManyExtensibleRecipes(self.ne));
        }
        // The sum is computed in 32 bits because eleven 16-bit values can overflow 16 bits.
        let total: i32 = 6
            + [
                self.lh,
                self.ec - self.bc + 1,
                self.nw,
                self.nh,
                self.nd,
                self.ni,
                self.nl,
                self.nk,
                self.ne,
                self.np,
            ]
            .into_iter()
            .map(i32::from)
            .sum::<i32>();
        if lf as i32 != total {
            return Err(Error::SizesDoNotAddUp { lf, total });
        }
        Ok(())
    }

    fn partition<'a>(&self, mut b: &'a [u8]) -> [&'a [u8]; 10] {
        let lens = [
            self.lh,
            self.ec - self.bc + 1,
            self.nw,
            self.nh,
            self.nd,
            self.ni,
            self.nl,
            self.nk,
            self.ne,
            self.np,
        ];
        let mut r: [&[u8]; 10] = [&[0_u8; 0]; 10];
        for i in 0..10 {
            let len = (lens[i] as usize) * 4;
            r[i] = &b[..len];
            b = &b[len..];
        }
        r
    }
}

/// Reads a BCPL string: a length byte followed by that many characters.
///
/// The length is clamped to the space available, as TFtoPL.2014.52 does.
fn deserialize_string(b: &[u8]) -> String {
    let len = match b.first() {
        None => return String::new(),
        Some(&tfm_len) => {
            let max_len: u8 = (b.len() - 1).try_into().unwrap_or(u8::MAX);
            max_len.min(tfm_len)
        }
    };
    b[1..=(len as usize)].iter().map(|u| *u as char).collect()
}

impl Deserializable for Header {
    /// Optional fields are only read if the header is long enough to contain all of them.
    fn deserialize(b: &[u8]) -> Self {
        let section = |start: usize, len: usize| b.get(start..start + len);
        Self {
            checksum: u32::deserialize(b),
            design_size: FixWord::deserialize(&b[4..]),
            character_coding_scheme: section(8, 40).map(deserialize_string),
            font_family: section(48, 20).map(deserialize_string),
            seven_bit_safe: section(68, 4).map(|b| b[0] > 127),
            face: section(68, 4).map(|b| b[3].into()),
            additional_data: Deserializable::deserialize(b.get(72..).unwrap_or(&[0; 0])),
        }
    }
}

impl<T: DeserializableFixed> Deserializable for Vec<T> {
    fn deserialize(mut b: &[u8]) -> Self {
        let mut r: Self = Default::default();
        while b.len() >= T::NUM_BYTES {
            r.push(T::deserialize(b));
            b = &b[T::NUM_BYTES..]
        }
        r
    }
}

impl Deserializable for Option<CharInfo> {
    fn deserialize(b: &[u8]) -> Self {
        CharInfo::from_word(u32::deserialize(b))
    }
}

impl DeserializableFixed for Option<CharInfo> {
    const NUM_BYTES: usize = 4;
}

impl Deserializable for ligkern::lang::Instruction {
    fn deserialize(b: &[u8]) -> Self {
        ligkern::lang::Instruction::from_bytes([b[0], b[1], b[2], b[3]])
    }
}

impl DeserializableFixed for ligkern::lang::Instruction {
    const NUM_BYTES: usize = 4;
}

impl Deserializable for ExtensibleRecipe {
    fn deserialize(b: &[u8]) -> Self {
        ExtensibleRecipe::from_word(u32::deserialize(b))
    }
}

impl DeserializableFixed for ExtensibleRecipe {
    const NUM_BYTES: usize = 4;
}

impl Deserializable for Params {
    fn deserialize(b: &[u8]) -> Self {
        Self(Vec::<FixWord>::deserialize(b))
    }
}
