use std::sync::Arc;

use clap::Parser;
use extex_tfm::{Face, FaceExpansion, FaceSlope, FaceWeight, FontKey, NamedParam, ScaledFont};

mod common;
use common::*;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(err) = cli.command.run() {
        if !err.is_empty() {
            eprintln!("{err}");
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    // RUST_LOG, if set, takes precedence.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Inspect TeX font metric (.tfm) files and encoding vectors (.enc files).
#[derive(Debug, Parser)]
#[command(name = "tfminfo", version = "0.1", about, long_about, max_term_width(100))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print more log messages; repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Debug, clap::Subcommand)]
enum Command {
    /// Check that a .tfm file is valid.
    ///
    /// All of the checks TeX performs when loading a font are run.
    /// If the file is invalid, the problem is printed and the exit status is 1.
    Check(Check),
    /// Print the header of a .tfm file.
    Header(Header),
    /// Print the parameters of a .tfm file, scaled to a size.
    Params(Params),
    /// Print the scaled metrics, ligatures and kerns of characters.
    ///
    /// Characters are written as a single ASCII character (`A`),
    ///     in octal with a leading quote (`'101`),
    ///     or in hexadecimal (`0x41`):
    ///
    ///     $ tfminfo glyph cmr10.tfm f "'013" 0x41 --size 12pt
    Glyph(Glyph),
    /// Inspect an encoding vector (.enc file).
    ///
    /// Without options the non-empty slots of the vector are printed.
    Enc(Enc),
}

impl Command {
    fn run(self) -> Result<(), String> {
        match self {
            Command::Check(check) => check.run(),
            Command::Header(header) => header.run(),
            Command::Params(params) => params.run(),
            Command::Glyph(glyph) => glyph.run(),
            Command::Enc(enc) => enc.run(),
        }
    }
}

/// The size to use a font at.
#[derive(Clone, Debug, clap::Args)]
struct SizeArgs {
    /// Size of the font, like `12pt` or `1in`. Defaults to the design size.
    #[arg(long)]
    size: Option<Length>,

    /// Scale factor in thousandths, as in TeX's `\font\x=cmr10 scaled 1200`.
    #[arg(long)]
    scale: Option<i32>,
}

impl SizeArgs {
    fn font_key(&self) -> FontKey {
        let mut key = FontKey::default();
        if let Some(size) = self.size {
            key = key.at(size.0);
        }
        if let Some(scale) = self.scale {
            key = key.scaled(scale);
        }
        key
    }

    fn scaled_font(&self, path: &TfmPath, key: FontKey) -> Result<ScaledFont, String> {
        let font = Arc::new(path.read()?);
        ScaledFont::new(font, key).map_err(|err| format!("Cannot use the font at this size: {err}"))
    }
}

#[derive(Clone, Debug, Parser)]
struct Check {
    /// Path to the .tfm file to validate.
    path: TfmPath,
}

impl Check {
    fn run(&self) -> Result<(), String> {
        let font = self.path.read()?;
        println!(
            "{}: valid ({} characters, {} lig/kern instructions, {} kerns, {} parameters)",
            self.path.0.display(),
            font.chars().chars().count(),
            font.lig_kern_program().len(),
            font.kerns().len(),
            font.params().len(),
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Parser)]
struct Header {
    /// Path to the .tfm file.
    path: TfmPath,
}

fn face_code(face: Face) -> String {
    match face {
        Face::Valid(weight, slope, expansion) => {
            let weight = match weight {
                FaceWeight::Light => 'L',
                FaceWeight::Medium => 'M',
                FaceWeight::Bold => 'B',
            };
            let slope = match slope {
                FaceSlope::Roman => 'R',
                FaceSlope::Italic => 'I',
            };
            let expansion = match expansion {
                FaceExpansion::Regular => 'R',
                FaceExpansion::Condensed => 'C',
                FaceExpansion::Extended => 'E',
            };
            format!("{weight}{slope}{expansion}")
        }
        Face::Other(u) => format!("'{u:03o}"),
    }
}

impl Header {
    fn run(&self) -> Result<(), String> {
        let font = self.path.read()?;
        let header = font.header();
        let unspecified = || "(unspecified)".to_string();
        println!("checksum:       '{:011o}", header.checksum);
        println!("design size:    {}pt", header.design_size);
        println!(
            "coding scheme:  {}",
            header.character_coding_scheme.clone().unwrap_or_else(unspecified)
        );
        println!(
            "font family:    {}",
            header.font_family.clone().unwrap_or_else(unspecified)
        );
        println!(
            "seven bit safe: {}",
            header
                .seven_bit_safe
                .map(|b| b.to_string())
                .unwrap_or_else(unspecified)
        );
        println!(
            "face:           {}",
            header.face.map(face_code).unwrap_or_else(unspecified)
        );
        if let Some(c) = font.right_boundary_char() {
            println!("boundary char:  {}", describe(c));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Parser)]
struct Params {
    /// Path to the .tfm file.
    path: TfmPath,

    #[command(flatten)]
    size: SizeArgs,
}

impl Params {
    fn run(&self) -> Result<(), String> {
        let font = self.size.scaled_font(&self.path, self.size.font_key())?;
        println!("size {}", font.actual_size());
        let len = font.font().params().len();
        for number in 1..=len {
            let number = i16::try_from(number).map_err(|_| "too many parameters".to_string())?;
            let name = NamedParam::text_params()
                .get((number - 1) as usize)
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| format!("PARAMETER {number}"));
            println!("{number:>3} {name:<14} {}", font.param_at(number));
        }
        if len < 2 {
            println!("    (no SPACE parameter; the interword space is derived from the size)");
        }
        let space = font.space();
        println!(
            "space {} plus {} minus {}",
            space.width, space.stretch, space.shrink
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Parser)]
struct Glyph {
    /// Path to the .tfm file.
    path: TfmPath,

    /// The characters to print.
    #[arg(required = true)]
    chars: Vec<CharArg>,

    #[command(flatten)]
    size: SizeArgs,

    /// Do not form ligatures.
    #[arg(long)]
    no_ligatures: bool,

    /// Do not insert kerns.
    #[arg(long)]
    no_kerning: bool,
}

impl Glyph {
    fn run(&self) -> Result<(), String> {
        let key = self
            .size
            .font_key()
            .with_ligatures(!self.no_ligatures)
            .with_kerning(!self.no_kerning);
        let font = self.size.scaled_font(&self.path, key)?;
        for CharArg(c) in &self.chars {
            let glyph = font.glyph(*c);
            let Some(metrics) = glyph.metrics else {
                println!("{}: not in the font", describe(*c));
                continue;
            };
            println!("{}:", describe(*c));
            println!("  width             {}", metrics.width);
            println!("  height            {}", metrics.height);
            println!("  depth             {}", metrics.depth);
            println!("  italic correction {}", metrics.italic_correction);
            for ligature in &glyph.ligatures {
                println!(
                    "  ligature with {} {} {}",
                    describe(ligature.right),
                    ligature.step.operation,
                    describe(ligature.step.replacement),
                );
            }
            for kern in &glyph.kerns {
                println!("  kern with {} {}", describe(kern.right), kern.amount);
            }
            if let Some(next) = glyph.next_larger {
                println!("  next larger {}", describe(next));
            }
            if let Some(recipe) = &glyph.extensible {
                let piece = |c: Option<extex_tfm::Char>| match c {
                    None => "-".to_string(),
                    Some(c) => describe(c),
                };
                println!(
                    "  extensible top {} middle {} bottom {} repeat {}",
                    piece(recipe.top),
                    piece(recipe.middle),
                    piece(recipe.bottom),
                    describe(recipe.rep),
                );
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Parser)]
struct Enc {
    /// Path to the .enc file.
    path: EncPath,

    /// Print the slot of a glyph name. May be repeated.
    #[arg(short, long)]
    lookup: Vec<String>,

    /// Print the vector in canonical form.
    #[arg(short, long)]
    rewrite: bool,

    /// When rewriting, precede each glyph name with a comment giving its slot.
    #[arg(short, long, requires = "rewrite")]
    comments: bool,
}

impl Enc {
    fn run(&self) -> Result<(), String> {
        let vector = self.path.read()?;
        if self.rewrite {
            print!("{}", vector.write(self.comments));
            return Ok(());
        }
        if self.lookup.is_empty() {
            println!("/{}", vector.name());
            for (slot, glyph) in vector.glyphs().iter().enumerate() {
                if glyph != extex_tfm::encoding::NOTDEF {
                    println!("0x{slot:02x} ({slot:>3}) /{glyph}");
                }
            }
            return Ok(());
        }
        let mut missing = 0_usize;
        for name in &self.lookup {
            match vector.position(name) {
                Some(slot) => println!("{name} 0x{slot:02x} ({slot})"),
                None => {
                    println!("{name} not in the encoding");
                    missing += 1;
                }
            }
        }
        if missing > 0 {
            return Err(format!(
                "{missing} glyph name(s) are not in the encoding /{}",
                vector.name()
            ));
        }
        Ok(())
    }
}
