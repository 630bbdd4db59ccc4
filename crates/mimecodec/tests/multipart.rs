//! Multipart parsing and serialization tests.

use mimecodec::content_type::{
    APPLICATION_OCTET_STREAM, MULTIPART_ALTERNATIVE, MULTIPART_MIXED, TEXT_HTML,
};
use mimecodec::host::FixedHostName;
use mimecodec::{
    BoundaryLine, Config, ContentType, Message, MimeReader, Part, TransferEncoding,
};

const MIXED: &str = "From: a@example.com\r\n\
                     MIME-Version: 1.0\r\n\
                     Content-Type: multipart/mixed; boundary=\"B1\"\r\n\
                     \r\n\
                     preamble text\r\n\
                     --B1\r\n\
                     Content-Type: text/plain\r\n\
                     \r\n\
                     Hello\r\n\
                     --B1\r\n\
                     Content-Type: application/octet-stream\r\n\
                     Content-Transfer-Encoding: base64\r\n\
                     \r\n\
                     AQID\r\n\
                     --B1--\r\n";

/// Routes reader and writer events to the test output; `RUST_LOG=mimecodec=trace`
/// shows every boundary and part.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn new_message() -> Message {
    Message::with_host_name(&FixedHostName::new("mail.example.com"))
}

fn text_part(text: &str) -> Part {
    let mut part = Part::new();
    part.set_text_content(text, "us-ascii").unwrap();
    part
}

#[test]
fn test_parse_mixed() {
    init_tracing();
    let message = Message::parse(format!("{MIXED}epilogue\r\n").as_bytes()).unwrap();

    assert_eq!(message.body(), Some("preamble text\r\n"));
    assert!(message.content_type().unwrap().unwrap().is_multipart());

    let parts = message.parts().unwrap();
    assert_eq!(parts.len(), 2);
    assert!(parts.is_read_only());

    assert_eq!(parts[0].content(), Some(&b"Hello\r\n"[..]));
    assert_eq!(parts[0].content_transfer_encoding(), TransferEncoding::Text);
    assert_eq!(
        parts[1].content_type().unwrap().unwrap().media_type(),
        APPLICATION_OCTET_STREAM
    );
    assert_eq!(parts[1].content_transfer_encoding(), TransferEncoding::Base64);
    assert_eq!(parts[1].content(), Some(&[1u8, 2, 3][..]));
}

#[test]
fn test_reserialize_mixed() {
    let message = Message::parse(MIXED.as_bytes()).unwrap();
    let written = String::from_utf8(message.to_bytes().unwrap()).unwrap();
    assert_eq!(written, MIXED);

    let first = written.find("--B1\r\n").unwrap();
    let second = written[first + 1..].find("--B1\r\n").unwrap() + first + 1;
    let close = written.find("--B1--\r\n").unwrap();
    assert!(first < second && second < close);
}

#[test]
fn test_parsed_parts_are_read_only() {
    let mut message = Message::parse(MIXED.as_bytes()).unwrap();
    assert!(message.add_part(Part::new()).unwrap_err().is_invalid_operation());

    let parts = message.parts_mut().unwrap();
    assert!(parts.remove(0).unwrap_err().is_invalid_operation());
    assert!(parts.get_mut(0).is_err());
    assert_eq!(parts.len(), 2);
}

#[test]
fn test_build_nested_round_trip() {
    init_tracing();
    let mut message = new_message();
    message.set_subject("Nested").unwrap();
    message.set_content_type(ContentType::new(MULTIPART_MIXED)).unwrap();

    let mut html_type = ContentType::new(TEXT_HTML);
    html_type.set_charset("utf-8").unwrap();
    let mut html = Part::new();
    html.set_content_type(html_type).unwrap();
    html.set_content_transfer_encoding(TransferEncoding::QuotedPrintable).unwrap();
    html.set_content(b"<p>Hi</p>".to_vec()).unwrap();

    let mut alternative = Part::new();
    alternative.set_content_type(ContentType::new(MULTIPART_ALTERNATIVE)).unwrap();
    alternative.add_part(text_part("Plain")).unwrap();
    alternative.add_part(html).unwrap();
    assert!(alternative.fields().get("MIME-Version").is_none());

    let data: Vec<u8> = (0..=255u8).cycle().take(700).collect();
    let attachment =
        Part::attachment("data.bin", ContentType::new(APPLICATION_OCTET_STREAM), data.clone()).unwrap();

    message.add_part(alternative).unwrap();
    message.add_part(attachment).unwrap();

    let bytes = message.to_bytes().unwrap();
    let parsed = Message::parse(bytes.as_slice()).unwrap();

    assert_eq!(parsed.body(), Some("This is a multi-part message in MIME format.\r\n\r\n"));
    assert_eq!(parsed.subject().as_deref(), Some("Nested"));

    let parts = parsed.parts().unwrap();
    assert_eq!(parts.len(), 2);

    let inner = parts[0].parts().unwrap();
    assert_eq!(inner.len(), 2);
    assert_eq!(inner[0].content(), Some(&b"Plain\r\n"[..]));
    assert_eq!(inner[1].content(), Some(&b"<p>Hi</p>"[..]));
    assert_eq!(
        inner[1].content_type().unwrap().unwrap().media_type(),
        TEXT_HTML
    );

    let attachment = &parts[1];
    assert_eq!(attachment.name().as_deref(), Some("data.bin"));
    let disposition = attachment.content_disposition().unwrap().unwrap();
    assert!(disposition.is_attachment());
    assert_eq!(disposition.filename().as_deref(), Some("data.bin"));
    assert_eq!(attachment.content(), Some(data.as_slice()));

    assert_eq!(Message::parse(bytes.as_slice()).unwrap().to_bytes().unwrap(), parsed.to_bytes().unwrap());
}

#[test]
fn test_preamble_sources() {
    let mut message = new_message();
    message.set_content_type(ContentType::new(MULTIPART_MIXED)).unwrap();
    message.add_part(text_part("only")).unwrap();

    let config = Config::builder().preamble("").build();
    let mut out = Vec::new();
    message.write_to_with(&mut out, &config).unwrap();
    let written = String::from_utf8(out).unwrap();
    let (_, body) = written.split_once("\r\n\r\n").unwrap();
    assert!(body.starts_with("--boundary_"));

    message.set_body("Custom preamble.\r\n").unwrap();
    let parsed = Message::parse(message.to_bytes().unwrap().as_slice()).unwrap();
    assert_eq!(parsed.body(), Some("Custom preamble.\r\n"));
}

#[test]
fn test_write_multipart_without_parts() {
    let mut message = new_message();
    message.set_content_type(ContentType::new(MULTIPART_MIXED)).unwrap();
    assert!(message.to_bytes().unwrap_err().is_malformed());
}

#[test]
fn test_write_parts_under_leaf_type() {
    let mut message = new_message();
    message.set_text_content("leaf", "us-ascii").unwrap();
    message.add_part(text_part("child")).unwrap();
    assert!(message.to_bytes().unwrap_err().is_malformed());
}

#[test]
fn test_missing_boundary_parameter() {
    let err = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed\r\n\r\n--x\r\n"[..],
    )
    .unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().contains("missing 'boundary'"));
}

#[test]
fn test_missing_begin_boundary() {
    let err = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=B1\r\n\r\nno parts\r\n"[..],
    )
    .unwrap_err();
    assert!(err.to_string().contains("missing begin-boundary"));
}

#[test]
fn test_missing_end_boundary() {
    let err = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=B1\r\n\r\n\
           --B1\r\nContent-Type: text/plain\r\n\r\nHello\r\n"[..],
    )
    .unwrap_err();
    assert!(err.to_string().contains("missing end-boundary"));
}

#[test]
fn test_garbage_between_parts() {
    let err = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=B1\r\n\r\n\
           --B1\r\nContent-Transfer-Encoding: base64\r\n\r\nAQID\r\n\r\ngarbage\r\n--B1--\r\n"[..],
    )
    .unwrap_err();
    assert!(err.to_string().contains("garbage in between parts"));
}

#[test]
fn test_boundary_detection() {
    let mut reader = MimeReader::new(&b"--abc123\r\n--abc123--\r\n--abc1234\r\n-abc123\r\n"[..]);
    let mut seen = Vec::new();
    while reader.read_line(false).unwrap() {
        seen.push(reader.test_boundary("abc123"));
    }
    assert_eq!(
        seen,
        vec![
            BoundaryLine::Open,
            BoundaryLine::Close,
            BoundaryLine::None,
            BoundaryLine::None,
        ]
    );
}
