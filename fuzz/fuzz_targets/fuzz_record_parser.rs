#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tabula::{DataSource, Delimiter, ParserOptions, RecordReader};

#[derive(Arbitrary, Debug)]
struct Input {
    bytes: Vec<u8>,
    tab: bool,
    trim: bool,
    skip_blank: bool,
    comment: Option<char>,
}

fuzz_target!(|input: Input| {
    let Ok(source) = DataSource::from_bytes(input.bytes, None) else {
        return;
    };
    let options = ParserOptions {
        delimiter: if input.tab { Delimiter::Tab } else { Delimiter::Comma },
        trim_leading_whitespace: input.trim,
        skip_blank_lines: input.skip_blank,
        comment: input.comment,
        ..ParserOptions::default()
    };

    // Progress must stay in [0, 1] and never decrease
    let mut reader = RecordReader::new(source, options);
    let mut last = 0.0f64;
    let _ = reader.parse_with(|_, progress| {
        assert!((0.0..=1.0).contains(&progress));
        assert!(progress >= last);
        last = progress;
        true
    });
});
