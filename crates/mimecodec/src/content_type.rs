//! MIME content type handling.

use std::borrow::Cow;

use encoding_rs::Encoding;
use rand::Rng;

use crate::encoding::decode_words;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::parameter::{ParameterField, parameter_field_newtype};

/// `message/rfc822`
pub const MESSAGE_RFC822: &str = "message/rfc822";
/// `application/x-zip-compressed`
pub const APPLICATION_ZIP: &str = "application/x-zip-compressed";
/// `application/vnd.ms-excel`
pub const APPLICATION_MS_EXCEL: &str = "application/vnd.ms-excel";
/// `application/edifact`
pub const APPLICATION_EDIFACT: &str = "application/edifact";
/// `application/edine`
pub const APPLICATION_EDINE: &str = "application/edine";
/// `application/pdf`
pub const APPLICATION_PDF: &str = "application/pdf";
/// `application/x-pkcs7-signature`
pub const APPLICATION_X_PKCS7_SIGNATURE: &str = "application/x-pkcs7-signature";
/// `application/pkcs7-signature`
pub const APPLICATION_PKCS7_SIGNATURE: &str = "application/pkcs7-signature";
/// `application/octet-stream`
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
/// `text/plain`
pub const TEXT_PLAIN: &str = "text/plain";
/// `text/html`
pub const TEXT_HTML: &str = "text/html";
/// `text/csv`
pub const TEXT_CSV: &str = "text/csv";
/// `text/xml`
pub const TEXT_XML: &str = "text/xml";
/// `text/xsl`
pub const TEXT_XSL: &str = "text/xsl";
/// `multipart/alternative`
pub const MULTIPART_ALTERNATIVE: &str = "multipart/alternative";
/// `multipart/mixed`
pub const MULTIPART_MIXED: &str = "multipart/mixed";
/// `multipart/related`
pub const MULTIPART_RELATED: &str = "multipart/related";
/// `multipart/signed`
pub const MULTIPART_SIGNED: &str = "multipart/signed";

const MULTIPART_PREFIX: &str = "multipart/";

/// Character set named by a `charset` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// 7-bit US-ASCII, the default when no charset is given.
    Ascii,
    /// Any other charset known to `encoding_rs`.
    Encoding(&'static Encoding),
}

impl Charset {
    /// Resolves a charset label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for an unknown label.
    pub fn from_label(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii") {
            return Ok(Self::Ascii);
        }
        Encoding::for_label(label.as_bytes())
            .map(Self::Encoding)
            .ok_or_else(|| Error::malformed(format!("unknown charset '{label}'.")))
    }

    /// Returns the canonical charset name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ascii => "us-ascii",
            Self::Encoding(encoding) => encoding.name(),
        }
    }

    /// Decodes bytes; non-ASCII bytes in an ASCII body become U+FFFD.
    #[must_use]
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Self::Ascii if bytes.is_ascii() => String::from_utf8_lossy(bytes),
            Self::Ascii => Cow::Owned(
                bytes
                    .iter()
                    .map(|&b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                    .collect(),
            ),
            Self::Encoding(encoding) => encoding.decode_without_bom_handling(bytes).0,
        }
    }

    /// Encodes text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the text has characters the
    /// charset cannot represent.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        match self {
            Self::Ascii if text.is_ascii() => Ok(Cow::Borrowed(text.as_bytes())),
            Self::Ascii => Err(Error::invalid("text is not us-ascii.")),
            Self::Encoding(encoding) => {
                let (bytes, _, unmappable) = encoding.encode(text);
                if unmappable {
                    return Err(Error::invalid(format!(
                        "text cannot be encoded as {}.",
                        encoding.name()
                    )));
                }
                Ok(bytes)
            }
        }
    }
}

/// `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentType(ParameterField);

parameter_field_newtype!(ContentType);

impl ContentType {
    /// Creates a content type. A multipart type gets a fresh random
    /// boundary.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        if is_multipart_type(&media_type) {
            let boundary = format!("boundary_{:032x}", rand::thread_rng().r#gen::<u128>());
            Self(ParameterField::with_parameters(media_type, [Field::new("boundary", boundary)]))
        } else {
            Self(ParameterField::new(media_type))
        }
    }

    /// Returns the media type, e.g. `text/plain`.
    #[must_use]
    pub fn media_type(&self) -> &str {
        self.value()
    }

    /// Returns true for `multipart/*` types.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        is_multipart_type(self.value())
    }

    /// Returns the `boundary` parameter.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Sets the `boundary` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the value is read-only.
    pub fn set_boundary(&mut self, boundary: impl Into<String>) -> Result<()> {
        self.set_parameter("boundary", boundary)
    }

    /// Returns the `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Sets the `charset` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the value is read-only.
    pub fn set_charset(&mut self, charset: impl Into<String>) -> Result<()> {
        self.set_parameter("charset", charset)
    }

    /// Resolves the `charset` parameter, defaulting to ASCII.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for an unknown charset.
    pub fn charset_encoding(&self) -> Result<Charset> {
        self.charset().map_or(Ok(Charset::Ascii), Charset::from_label)
    }

    /// Returns the `name` parameter with encoded-words decoded.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.parameter("name").map(decode_words)
    }

    /// Sets the `name` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the value is read-only.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.set_parameter("name", name)
    }

    /// Guesses a content type from a file name's extension.
    #[must_use]
    pub fn from_file_extension(file_name: &str) -> Self {
        let Some(extension) = extension_of(file_name) else {
            return Self::new(APPLICATION_OCTET_STREAM);
        };

        let known = [
            ("eml", MESSAGE_RFC822),
            ("zip", APPLICATION_ZIP),
            ("edn", APPLICATION_EDIFACT),
            ("xls", APPLICATION_MS_EXCEL),
            ("xml", TEXT_XML),
            ("xsl", TEXT_XSL),
            ("csv", TEXT_CSV),
            ("txt", TEXT_PLAIN),
            ("pdf", APPLICATION_PDF),
            ("htm", TEXT_HTML),
            ("html", TEXT_HTML),
        ];

        known
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map_or_else(
                || Self::new(format!("application/x-extension-{extension}")),
                |(_, media_type)| Self::new(*media_type),
            )
    }

    /// Returns the customary file extension, including the dot.
    #[must_use]
    pub fn to_file_extension(media_type: &str) -> &'static str {
        match media_type {
            MESSAGE_RFC822 => ".eml",
            APPLICATION_ZIP => ".zip",
            APPLICATION_MS_EXCEL => ".xls",
            APPLICATION_EDIFACT | APPLICATION_EDINE => ".edn",
            APPLICATION_X_PKCS7_SIGNATURE | APPLICATION_PKCS7_SIGNATURE => ".p7s",
            APPLICATION_PDF => ".pdf",
            TEXT_XML => ".xml",
            TEXT_CSV => ".csv",
            TEXT_XSL => ".xsl",
            TEXT_HTML => ".html",
            TEXT_PLAIN | MULTIPART_MIXED | MULTIPART_SIGNED => ".txt",
            _ => ".dat",
        }
    }

    /// Replaces a generic `application/octet-stream` with a type guessed
    /// from the file name.
    #[must_use]
    pub fn map_content_type(file_name: Option<&str>, content_type: Self) -> Self {
        match file_name {
            Some(file_name) if content_type.value() == APPLICATION_OCTET_STREAM => {
                Self::from_file_extension(file_name)
            }
            _ => content_type,
        }
    }
}

fn extension_of(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

fn is_multipart_type(media_type: &str) -> bool {
    media_type.len() > MULTIPART_PREFIX.len()
        && media_type
            .get(..MULTIPART_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MULTIPART_PREFIX))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let ct = ContentType::parse("text/plain; charset=\"ISO-8859-1\"").unwrap();
        assert_eq!(ct.media_type(), "text/plain");
        assert_eq!(ct.charset(), Some("ISO-8859-1"));
        assert!(!ct.is_multipart());
        assert_eq!(ct.to_string(), "text/plain; charset=\"ISO-8859-1\"");
    }

    #[test]
    fn test_multipart_boundary() {
        let ct = ContentType::parse("Multipart/Mixed; boundary=B1").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("B1"));

        assert!(!ContentType::new("multipart/").is_multipart());
        assert!(!ContentType::parse("text/multipart").unwrap().is_multipart());
    }

    #[test]
    fn test_new_multipart_generates_boundary() {
        let a = ContentType::new(MULTIPART_MIXED);
        let b = ContentType::new(MULTIPART_MIXED);
        let boundary = a.boundary().unwrap();
        assert!(boundary.starts_with("boundary_"));
        assert_eq!(boundary.len(), "boundary_".len() + 32);
        assert_ne!(a.boundary(), b.boundary());

        assert_eq!(ContentType::new(TEXT_PLAIN).boundary(), None);

        let mut c = ContentType::new("Multipart/Alternative");
        assert!(c.boundary().is_some());
        c.set_boundary("B2").unwrap();
        assert_eq!(c.boundary(), Some("B2"));
        assert_eq!(c.parameters().len(), 1);
    }

    #[test]
    fn test_charset_encoding() {
        assert_eq!(ContentType::new(TEXT_PLAIN).charset_encoding().unwrap(), Charset::Ascii);

        let ct = ContentType::parse("text/plain; charset=us-ascii").unwrap();
        assert_eq!(ct.charset_encoding().unwrap(), Charset::Ascii);

        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.charset_encoding().unwrap(), Charset::Encoding(encoding_rs::UTF_8));

        let ct = ContentType::parse("text/plain; charset=klingon").unwrap();
        assert!(ct.charset_encoding().unwrap_err().is_malformed());
    }

    #[test]
    fn test_charset_round_trip() {
        let charset = Charset::from_label("iso-8859-1").unwrap();
        let bytes = charset.encode("caf\u{e9}").unwrap();
        assert_eq!(bytes.as_ref(), b"caf\xe9");
        assert_eq!(charset.decode(&bytes), "caf\u{e9}");

        assert!(Charset::Ascii.encode("caf\u{e9}").unwrap_err().is_invalid_operation());
        assert_eq!(Charset::Ascii.decode(b"a\xffb"), "a\u{fffd}b");
    }

    #[test]
    fn test_setters() {
        let mut ct = ContentType::new(TEXT_PLAIN);
        ct.set_charset("utf-8").unwrap();
        ct.set_name("report.txt").unwrap();
        assert_eq!(ct.to_string(), "text/plain; charset=\"utf-8\"; name=\"report.txt\"");

        let mut frozen = ContentType::parse_with("text/plain", true).unwrap();
        assert!(frozen.set_charset("utf-8").unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_file_extension_mapping() {
        assert_eq!(ContentType::from_file_extension("Data.CSV").media_type(), TEXT_CSV);
        assert_eq!(ContentType::from_file_extension("dir.d/mail.eml").media_type(), MESSAGE_RFC822);
        assert_eq!(
            ContentType::from_file_extension("archive.7z").media_type(),
            "application/x-extension-7z"
        );
        assert_eq!(
            ContentType::from_file_extension("README").media_type(),
            APPLICATION_OCTET_STREAM
        );

        assert_eq!(ContentType::to_file_extension(APPLICATION_EDINE), ".edn");
        assert_eq!(ContentType::to_file_extension(MULTIPART_SIGNED), ".txt");
        assert_eq!(ContentType::to_file_extension("image/png"), ".dat");
    }

    #[test]
    fn test_map_content_type() {
        let generic = ContentType::new(APPLICATION_OCTET_STREAM);
        let mapped = ContentType::map_content_type(Some("invoice.xml"), generic.clone());
        assert_eq!(mapped.media_type(), TEXT_XML);

        assert_eq!(ContentType::map_content_type(None, generic.clone()), generic);

        let pdf = ContentType::new(APPLICATION_PDF);
        assert_eq!(ContentType::map_content_type(Some("a.txt"), pdf.clone()), pdf);
    }
}
