//! # mimecodec
//!
//! Streaming MIME message reader and writer with a mutable document model.
//!
//! ## Features
//!
//! - **Parsing**: single-pass reader that unfolds headers, finds multipart
//!   boundaries and decodes 7bit, 8bit, quoted-printable, base64 and
//!   uuencoded bodies
//! - **Document model**: messages, parts and header fields with typed
//!   addresses, address lists, content types and dispositions
//! - **Writing**: header folding, encoded-words for non-ASCII text and
//!   fixed-width content encoding
//! - **Read-only parses**: everything read from a stream is frozen, so
//!   writing it again reproduces the same bytes
//!
//! ## Quick Start
//!
//! ### Parsing
//!
//! ```
//! use mimecodec::Message;
//!
//! let raw = "From: sender@example.com\r\n\
//!            To: recipient@example.com\r\n\
//!            Subject: Test\r\n\
//!            MIME-Version: 1.0\r\n\
//!            Content-Type: text/plain; charset=us-ascii\r\n\
//!            \r\n\
//!            Hello, World!\r\n";
//!
//! let message = Message::parse(raw.as_bytes())?;
//! assert_eq!(message.subject().as_deref(), Some("Test"));
//! assert_eq!(message.text_content()?.as_deref(), Some("Hello, World!\r\n"));
//! # Ok::<(), mimecodec::Error>(())
//! ```
//!
//! ### Building
//!
//! ```
//! use mimecodec::{Address, ContentType, Message, Part};
//! use mimecodec::content_type::{APPLICATION_PDF, MULTIPART_MIXED};
//!
//! let mut message = Message::new();
//! message.set_from(Address::with_display_name("sender@example.com", "Sender"))?;
//! message.to_mut()?.push(Address::new("recipient@example.com"))?;
//! message.set_subject("Report")?;
//! message.set_content_type(ContentType::new(MULTIPART_MIXED))?;
//!
//! let mut text = Part::new();
//! text.set_text_content("See attachment.", "us-ascii")?;
//! message.add_part(text)?;
//! message.add_part(Part::attachment("report.pdf", ContentType::new(APPLICATION_PDF), vec![1, 2, 3])?)?;
//!
//! let bytes = message.to_bytes()?;
//! let parsed = Message::parse(bytes.as_slice())?;
//! assert_eq!(parsed.parts().map(|p| p.len()), Some(2));
//! # Ok::<(), mimecodec::Error>(())
//! ```
//!
//! ### Header values
//!
//! ```
//! use mimecodec::{AddressList, ContentType};
//!
//! let to = AddressList::parse("John Doe <john@example.com>, jane@example.com")?;
//! assert_eq!(to[0].display_name(), Some("John Doe"));
//!
//! let ct = ContentType::parse("multipart/mixed; boundary=\"B1\"")?;
//! assert!(ct.is_multipart());
//! assert_eq!(ct.boundary(), Some("B1"));
//! # Ok::<(), mimecodec::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod address_list;
mod config;
mod content_disposition;
mod date;
mod error;
mod field;
mod field_list;
mod message;
mod parameter;
mod part;
mod reader;
mod writer;

pub mod content_type;
pub mod encoding;
pub mod host;
pub mod lexer;

pub use address::Address;
pub use address_list::AddressList;
pub use config::{Config, ConfigBuilder, DEFAULT_LINE_CAPACITY, DEFAULT_PREAMBLE, MAX_LINE_WIDTH};
pub use content_disposition::{ATTACHMENT, ContentDisposition, INLINE};
pub use content_type::{Charset, ContentType};
pub use date::{format_date, parse_date};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use field::{Field, Structured, StructuredValue};
pub use field_list::FieldList;
pub use message::Message;
pub use parameter::ParameterField;
pub use part::{MimeEntity, Part, PartList};
pub use reader::{BoundaryLine, MimeReader};
pub use writer::{MimeWriter, WriteValue};
