use assert_cmd::prelude::*;
use extex_tfm::format::File;
use extex_tfm::ligkern::lang::{Instruction, PostLigOperation};
use extex_tfm::{Char, CharTag, Face, FixWord, Params};
use predicates::prelude::*;
use std::process::Command;

/// A small text font: `f` forms ligatures, `V` kerns with `A`.
fn text_font() -> Vec<u8> {
    let mut file = File::from_chars(&[
        (Char::A, FixWord(786434)),
        (Char::V, FixWord(786434)),
        (Char(b'f'), FixWord(320858)),
        (Char(b'i'), FixWord(291271)),
        (Char(0o014), FixWord(582544)),
    ]);
    file.header.character_coding_scheme = Some("TeX text".into());
    file.header.font_family = Some("CMR".into());
    file.header.seven_bit_safe = Some(true);
    file.header.face = Some(Face::from(0_u8));
    file.char_info_mut(Char(b'f')).unwrap().tag = CharTag::Ligature(0);
    file.char_info_mut(Char::V).unwrap().tag = CharTag::Ligature(1);
    file.lig_kern_instructions = vec![
        Instruction::ligature(
            Char(b'i'),
            Char(0o014),
            PostLigOperation::RetainNeitherMoveToInserted,
            None,
        ),
        Instruction::kern(Char::A, 0, None),
    ];
    file.kerns = vec![FixWord(-116508)];
    file.params = Params(vec![
        FixWord::ZERO,
        FixWord(349526),
        FixWord(174763),
        FixWord(116508),
        FixWord(451470),
        FixWord::UNITY,
        FixWord(116508),
    ]);
    file.serialize()
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Fixture {
        Fixture {
            dir: tempfile::TempDir::new().unwrap(),
        }
    }

    fn write(&self, name: &str, content: &[u8]) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }
}

fn tfminfo(args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("tfminfo").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd.args(args);
    cmd.assert()
}

#[test]
fn incorrect_extension() {
    tfminfo(&["check", "incorrect_extension.rs"])
        .failure()
        .stderr(predicate::str::contains(
            "the file extension must be .tfm but it is .rs",
        ));
}

#[test]
fn check_valid_font() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["check", &path])
        .success()
        .stdout(predicate::str::contains(
            "valid (5 characters, 2 lig/kern instructions, 1 kerns, 7 parameters)",
        ));
}

#[test]
fn check_truncated_font() {
    let fixture = Fixture::new();
    let mut bytes = text_font();
    bytes.truncate(bytes.len() - 8);
    let path = fixture.write("truncated.tfm", &bytes);
    tfminfo(&["check", &path])
        .failure()
        .stderr(predicate::str::contains("is not a valid .tfm file"));
}

#[test]
fn check_missing_file() {
    tfminfo(&["check", "does/not/exist.tfm"])
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn header() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    let output = Command::cargo_bin("tfminfo")
        .unwrap()
        .args(["header", &path])
        .output()
        .unwrap();
    assert!(output.status.success());
    let got = String::from_utf8(output.stdout).unwrap();
    similar_asserts::assert_eq!(
        got,
        "checksum:       '00000000000
design size:    10.0pt
coding scheme:  TeX text
font family:    CMR
seven bit safe: true
face:           MRR
"
    );
}

#[test]
fn params() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["params", &path])
        .success()
        .stdout(predicate::str::contains("size 10.0pt"))
        .stdout(predicate::str::contains("  2 SPACE          3.33333pt"))
        .stdout(predicate::str::contains(
            "space 3.33333pt plus 1.66666pt minus 1.1111pt",
        ));
}

#[test]
fn params_scaled() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["params", &path, "--scale", "2000"])
        .success()
        .stdout(predicate::str::contains("size 20.0pt"))
        .stdout(predicate::str::contains("  6 QUAD           20.0pt"));
    tfminfo(&["params", &path, "--size", "1in"])
        .success()
        .stdout(predicate::str::contains("size 72.26999pt"));
}

#[test]
fn params_illegal_scale() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["params", &path, "--scale", "40000"])
        .failure()
        .stderr(predicate::str::contains("illegal magnification"));
}

#[test]
fn params_bad_unit() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["params", &path, "--size", "12xx"])
        .failure()
        .stderr(predicate::str::contains("unknown unit `xx`"));
}

#[test]
fn glyph() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["glyph", &path, "f", "V", "0x61", "'014"])
        .success()
        .stdout(predicate::str::contains("'146 (f):\n  width             3.05994pt"))
        .stdout(predicate::str::contains("  ligature with '151 (i) =: '014"))
        .stdout(predicate::str::contains("  kern with '101 (A) -1.11111pt"))
        .stdout(predicate::str::contains("'141 (a): not in the font"))
        .stdout(predicate::str::contains("'014:\n"));
}

#[test]
fn glyph_without_ligatures_or_kerns() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["glyph", &path, "f", "V", "--no-ligatures", "--no-kerning"])
        .success()
        .stdout(predicate::str::contains("ligature").not())
        .stdout(predicate::str::contains("kern with").not());
}

#[test]
fn glyph_bad_char() {
    let fixture = Fixture::new();
    let path = fixture.write("text.tfm", &text_font());
    tfminfo(&["glyph", &path, "0x1FF"])
        .failure()
        .stderr(predicate::str::contains("not a character code"));
}

const ENCODING: &str = "% test encoding
/TestEncoding [
/grave /acute % two glyphs
/.notdef /A
] def
";

#[test]
fn enc_list() {
    let fixture = Fixture::new();
    let path = fixture.write("test.enc", ENCODING.as_bytes());
    tfminfo(&["enc", &path])
        .success()
        .stdout(predicate::str::contains("/TestEncoding\n0x00 (  0) /grave\n"))
        .stdout(predicate::str::contains("0x03 (  3) /A\n"));
}

#[test]
fn enc_lookup() {
    let fixture = Fixture::new();
    let path = fixture.write("test.enc", ENCODING.as_bytes());
    tfminfo(&["enc", &path, "--lookup", "acute", "--lookup", "/A"])
        .success()
        .stdout(predicate::str::contains("acute 0x01 (1)\n/A 0x03 (3)\n"));
    tfminfo(&["enc", &path, "--lookup", "tilde"])
        .failure()
        .stdout(predicate::str::contains("tilde not in the encoding"));
}

#[test]
fn enc_readonly() {
    let fixture = Fixture::new();
    let path = fixture.write("readonly.enc", b"/RO [ /a /b ] readonly def\n");
    tfminfo(&["enc", &path, "--lookup", "b"])
        .success()
        .stdout(predicate::str::contains("b 0x01 (1)"));
}

#[test]
fn enc_rewrite_round_trip() {
    let fixture = Fixture::new();
    let path = fixture.write("test.enc", ENCODING.as_bytes());
    let output = Command::cargo_bin("tfminfo")
        .unwrap()
        .args(["enc", &path, "--rewrite", "--comments"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rewritten = String::from_utf8(output.stdout).unwrap();
    assert!(rewritten.starts_with("/TestEncoding [\n% 0x00 (0)\n/grave\n"));

    let rewritten_path = fixture.write("rewritten.enc", rewritten.as_bytes());
    let output = Command::cargo_bin("tfminfo")
        .unwrap()
        .args(["enc", &rewritten_path, "--rewrite", "--comments"])
        .output()
        .unwrap();
    similar_asserts::assert_eq!(
        first: rewritten,
        second: String::from_utf8(output.stdout).unwrap()
    );
}

#[test]
fn enc_malformed() {
    let fixture = Fixture::new();
    let path = fixture.write("bad.enc", b"/Bad [ /a /b");
    tfminfo(&["enc", &path])
        .failure()
        .stderr(predicate::str::contains("the `[` of the encoding vector is never closed"))
        .stderr(predicate::str::contains("is not a valid encoding vector"));
}
