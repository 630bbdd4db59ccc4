//! Property tests for the content encoders and decoders.

use mimecodec::{MimeReader, MimeWriter, TransferEncoding};
use proptest::prelude::*;

fn encode(content: &[u8], encoding: TransferEncoding) -> Vec<u8> {
    let mut writer = MimeWriter::new(Vec::new());
    writer.write_content(content, encoding).unwrap();
    writer.into_inner()
}

fn decode(encoded: &[u8], encoding: TransferEncoding) -> Vec<u8> {
    MimeReader::new(encoded).read_data(encoding, None).unwrap()
}

fn assert_line_width(encoded: &[u8]) {
    for line in encoded.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        assert!(line.len() <= 76, "line of {} bytes", line.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_base64_round_trip(content in prop::collection::vec(any::<u8>(), 0..2048)) {
        let encoded = encode(&content, TransferEncoding::Base64);
        assert_line_width(&encoded);
        prop_assert_eq!(decode(&encoded, TransferEncoding::Base64), content);
    }

    #[test]
    fn test_quoted_printable_round_trip(content in "[ -~\r\n\t]{0,600}") {
        let encoded = encode(content.as_bytes(), TransferEncoding::QuotedPrintable);
        assert_line_width(&encoded);
        prop_assert!(encoded.is_ascii());
        prop_assert_eq!(decode(&encoded, TransferEncoding::QuotedPrintable), content.into_bytes());
    }

    #[test]
    fn test_quoted_printable_round_trip_binary(content in prop::collection::vec(any::<u8>(), 0..512)) {
        let encoded = encode(&content, TransferEncoding::QuotedPrintable);
        assert_line_width(&encoded);
        prop_assert_eq!(decode(&encoded, TransferEncoding::QuotedPrintable), content);
    }

    #[test]
    fn test_text_lines_round_trip(lines in prop::collection::vec("[ -~]{0,200}", 0..20)) {
        let content: String = lines.iter().map(|line| format!("{line}\r\n")).collect();
        let encoded = encode(content.as_bytes(), TransferEncoding::SevenBit);
        prop_assert_eq!(&encoded, &content.clone().into_bytes());
        prop_assert_eq!(decode(&encoded, TransferEncoding::SevenBit), content.into_bytes());
    }
}
