#![no_main]

use extex_tfm::encoding::EncodingVector;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|source: &str| {
    let vector = match EncodingVector::parse(source) {
        Ok(vector) => vector,
        Err(err) => {
            assert!(err.span.start <= source.len());
            return;
        }
    };
    for with_comments in [false, true] {
        let written = vector.write(with_comments);
        let reparsed = EncodingVector::parse(&written).unwrap();
        assert_eq!(reparsed, vector);
    }
});
