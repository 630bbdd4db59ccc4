//! End-to-end tests for single-part messages.
//!
//! Messages are written to and read from in-memory buffers.

use std::io::Cursor;

use mimecodec::host::FixedHostName;
use mimecodec::content_type::{APPLICATION_PDF, MULTIPART_MIXED, TEXT_PLAIN};
use mimecodec::{Address, AddressList, Config, ContentType, Message, Part, TransferEncoding};

fn new_message() -> Message {
    Message::with_host_name(&FixedHostName::new("mail.example.com"))
}

fn write(message: &Message) -> Vec<u8> {
    message.to_bytes().unwrap()
}

#[test]
fn test_single_part_round_trip() {
    let mut message = new_message();
    message
        .set_from(Address::with_display_name("john@example.com", "John \"JD\" Doe"))
        .unwrap();
    message
        .set_to(AddressList::parse("jane@example.com, Bob <bob@example.com>").unwrap())
        .unwrap();
    message.cc_mut().unwrap().push(Address::new("carol@example.com")).unwrap();
    message.set_subject("Quarterly numbers").unwrap();
    message.set_text_content("Line one\nLine two\n", "us-ascii").unwrap();

    let parsed = Message::parse(Cursor::new(write(&message))).unwrap();

    let from = parsed.from().unwrap().unwrap();
    assert_eq!(from.address(), "john@example.com");
    assert_eq!(from.display_name(), Some("John \"JD\" Doe"));

    let to = parsed.to().unwrap().unwrap();
    assert_eq!(to.len(), 2);
    assert_eq!(to[1].address(), "bob@example.com");
    assert_eq!(to[1].display_name(), Some("Bob"));
    assert_eq!(parsed.cc().unwrap().unwrap()[0].address(), "carol@example.com");

    assert_eq!(parsed.subject().as_deref(), Some("Quarterly numbers"));
    assert_eq!(parsed.message_id(), message.message_id());
    assert_eq!(parsed.content_transfer_encoding(), TransferEncoding::SevenBit);
    assert_eq!(parsed.content(), Some(&b"Line one\r\nLine two\r\n"[..]));
    assert_eq!(parsed.mime_version().as_deref(), Some("1.0"));
}

#[test]
fn test_non_ascii_round_trip() {
    let mut message = new_message();
    message.set_subject("R\u{e9}sum\u{e9} attached").unwrap();
    message
        .set_from(Address::with_display_name("jose@example.com", "Jos\u{e9}"))
        .unwrap();
    message.set_text_content("Caf\u{e9} au lait, cr\u{e8}me br\u{fb}l\u{e9}e", "utf-8").unwrap();

    let bytes = write(&message);
    assert!(bytes.is_ascii());

    let parsed = Message::parse(bytes.as_slice()).unwrap();
    assert_eq!(parsed.decoded_subject().as_deref(), Some("R\u{e9}sum\u{e9} attached"));
    assert_eq!(parsed.content_transfer_encoding(), TransferEncoding::QuotedPrintable);
    assert_eq!(
        parsed.text_content().unwrap().as_deref(),
        Some("Caf\u{e9} au lait, cr\u{e8}me br\u{fb}l\u{e9}e")
    );

    let from = parsed.from().unwrap().unwrap();
    assert_eq!(from.address(), "jose@example.com");
    assert_eq!(from.display_name(), Some("Jos\u{e9}"));
    assert_eq!(
        parsed.fields().get("From").unwrap().decoded_value().as_deref(),
        Some("Jos\u{e9} <jose@example.com>")
    );
}

#[test]
fn test_latin1_charset_round_trip() {
    let mut message = new_message();
    message.set_text_content("na\u{ef}ve", "iso-8859-1").unwrap();
    assert_eq!(message.content(), Some(&b"na\xefve"[..]));

    let bytes = write(&message);
    assert!(String::from_utf8_lossy(&bytes).contains("na=EFve=\r\n"));

    let parsed = Message::parse(bytes.as_slice()).unwrap();
    assert_eq!(parsed.content(), Some(&b"na\xefve"[..]));
    assert_eq!(parsed.text_content().unwrap().as_deref(), Some("na\u{ef}ve"));
}

#[test]
fn test_write_is_idempotent() {
    let mut message = new_message();
    message.set_from(Address::new("a@example.com")).unwrap();
    message
        .set_to(AddressList::parse("b@example.com, c@example.com, d@example.com").unwrap())
        .unwrap();
    message.set_subject("Folding").unwrap();
    message.set_text_content(&"long line ".repeat(30), "utf-8").unwrap();

    let first = Message::parse(write(&message).as_slice()).unwrap();
    let once = write(&first);
    let twice = write(&first);
    assert_eq!(once, twice);

    let second = Message::parse(once.as_slice()).unwrap();
    assert_eq!(write(&second), once);
    assert_eq!(second.content(), first.content());
}

#[test]
fn test_parsed_message_is_read_only() {
    let mut message = Message::parse(
        &b"From: a@example.com\r\nTo: b@example.com\r\nMIME-Version: 1.0\r\n\
           Content-Type: text/plain\r\n\r\nhello\r\n"[..],
    )
    .unwrap();

    assert!(message.set_subject("changed").unwrap_err().is_invalid_operation());
    assert!(message.to_mut().unwrap_err().is_invalid_operation());
    assert!(message.set_content(b"x".to_vec()).unwrap_err().is_invalid_operation());
    assert!(message.fields_mut().remove("From").is_err());

    let field = message.fields_mut().get_mut("To").unwrap();
    assert!(field.set_value("c@example.com").is_err());
    let to = field.address_list().unwrap();
    assert_eq!(to[0].address(), "b@example.com");

    assert_eq!(message.fields().len(), 4);
    assert_eq!(message.content(), Some(&b"hello\r\n"[..]));
}

#[test]
fn test_missing_colon_is_malformed() {
    let err = Message::parse(&b"Subject Hello\r\n\r\nbody\r\n"[..]).unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().starts_with("Mail message corrupt: "));
}

#[test]
fn test_line_too_long() {
    let mut raw = b"Subject: ".to_vec();
    raw.extend(std::iter::repeat_n(b'x', 2000));
    raw.extend_from_slice(b"\r\n\r\n");
    let err = Message::parse(raw.as_slice()).unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().contains("line too long"));

    let config = Config::builder().line_capacity(4096).build();
    assert!(Message::parse_with(raw.as_slice(), &config).is_ok());
}

#[test]
fn test_folded_headers_unfold() {
    let message = Message::parse(
        &b"To: Alice <alice@example.com>,\r\n\tBob <bob@example.com>,\r\n carol@example.com\r\n\
           Subject: first\r\n  second\r\n\r\n"[..],
    )
    .unwrap();

    let to = message.to().unwrap().unwrap();
    let addresses: Vec<_> = to.iter().map(Address::address).collect();
    assert_eq!(addresses, vec!["alice@example.com", "bob@example.com", "carol@example.com"]);
    assert_eq!(message.subject().as_deref(), Some("first  second"));
}

#[test]
fn test_bare_line_feeds_and_carriage_returns() {
    let message = Message::parse(
        &b"MIME-Version: 1.0\nContent-Type: text/plain\rSubject: mixed\n\nfirst\rsecond\n"[..],
    )
    .unwrap();
    assert_eq!(message.subject().as_deref(), Some("mixed"));
    assert_eq!(message.content(), Some(&b"first\r\nsecond\r\n"[..]));
}

#[test]
fn test_non_mime_message() {
    let raw = b"From: a@example.com\r\nSubject: plain\r\n\r\nNo MIME here.\r\n\r\nBye\r\n";
    let message = Message::parse(&raw[..]).unwrap();
    assert!(message.mime_version().is_none());
    assert_eq!(message.body(), Some("No MIME here.\r\n\r\nBye\r\n"));
    assert_eq!(write(&message), raw.to_vec());
}

#[test]
fn test_uuencoded_body() {
    let message = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: text/plain\r\n\
           Content-Transfer-Encoding: x-uuencode\r\n\r\n\
           begin 644 cat.txt\r\n#0V%T\r\n`\r\nend\r\n"[..],
    );
    // `x-uuencode` is not a known name, so the body cannot be decoded.
    assert!(message.unwrap_err().is_malformed());

    let message = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: text/plain\r\n\
           Content-Transfer-Encoding: uuencode\r\n\r\n\
           begin 644 cat.txt\r\n#0V%T\r\n`\r\nend\r\n"[..],
    )
    .unwrap();
    assert_eq!(message.content(), Some(&b"Cat"[..]));

    // There is no uuencode writer.
    assert!(message.to_bytes().unwrap_err().is_invalid_operation());
}

#[test]
fn test_quoted_printable_lowercase_hex() {
    let message = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\
           Content-Transfer-Encoding: Quoted-Printable\r\n\r\ncaf=c3=a9\r\n"[..],
    )
    .unwrap();
    assert_eq!(message.text_content().unwrap().as_deref(), Some("caf\u{e9}\r\n"));

    let err = Message::parse(
        &b"MIME-Version: 1.0\r\nContent-Type: text/plain\r\n\
           Content-Transfer-Encoding: quoted-printable\r\n\r\n=ZZ\r\n"[..],
    )
    .unwrap_err();
    assert!(err.is_malformed());
}

#[test]
fn test_date_header() {
    let message =
        Message::parse(&b"Date: Tue, 1 Nov 94 08:12:31 -0500\r\n\r\n"[..]).unwrap();
    let date = message.date().unwrap().unwrap();
    assert_eq!(date.to_rfc3339(), "1994-11-01T13:12:31+00:00");

    let message = Message::parse(&b"Date: someday\r\n\r\n"[..]).unwrap();
    assert!(message.date().unwrap_err().is_malformed());
}

#[test]
fn test_malformed_date_zone() {
    let message = Message::parse("Date: 1 Jan 2000 00:00 +1\u{e9}1\r\n\r\n".as_bytes()).unwrap();
    assert!(message.date().unwrap_err().is_malformed());
}

#[test]
fn test_non_ascii_attachment_name_round_trip() {
    let mut message = new_message();
    message.set_content_type(ContentType::new(MULTIPART_MIXED)).unwrap();
    let attachment = Part::attachment(
        "r\u{e9}sum\u{e9}.pdf",
        ContentType::new(APPLICATION_PDF),
        b"%PDF-1.4".to_vec(),
    )
    .unwrap();
    message.add_part(attachment).unwrap();

    let bytes = write(&message);
    assert!(bytes.is_ascii());

    let parsed = Message::parse(bytes.as_slice()).unwrap();
    let part = &parsed.parts().unwrap()[0];
    assert_eq!(part.name().as_deref(), Some("r\u{e9}sum\u{e9}.pdf"));
    let disposition = part.content_disposition().unwrap().unwrap();
    assert_eq!(disposition.filename().as_deref(), Some("r\u{e9}sum\u{e9}.pdf"));
}

#[test]
fn test_eight_bit_content_must_be_ascii() {
    let mut message = new_message();
    message.set_content_type(ContentType::new(TEXT_PLAIN)).unwrap();
    message.set_content_transfer_encoding(TransferEncoding::EightBit).unwrap();
    message.set_content("caf\u{e9}".as_bytes().to_vec()).unwrap();
    assert!(message.to_bytes().unwrap_err().is_malformed());

    message.set_content(b"cafe".to_vec()).unwrap();
    assert!(write(&message).is_ascii());
}

#[test]
fn test_non_mime_body_must_be_ascii() {
    let message = Message::parse(&b"Subject: x\r\n\r\ncaf\xe9\r\n"[..]).unwrap();
    assert!(message.to_bytes().unwrap_err().is_malformed());
}
