//! SAX adapter over `quick-xml`
//!
//! Turns the tokenizer's event stream into three primitive callbacks,
//! [`SaxHandler::element_begin`], [`SaxHandler::element_end`] and
//! [`SaxHandler::text_data`]. Each returns `false` to stop parsing at once;
//! no further callback is made after that. Tokenizer failures go to
//! [`SaxHandler::parser_error`] instead of being returned, together with the
//! line and column they occurred at.

use crate::error::{Error, Severity};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// 1-based position in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Line
    pub line: usize,
    /// Column, counted in bytes
    pub column: usize,
}

impl Default for Location {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// One attribute of an element, value unescaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified attribute name
    pub name: String,
    /// Attribute value
    pub value: String,
}

/// Find an attribute value by name
pub fn attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

/// Receiver of SAX events
pub trait SaxHandler {
    /// An element opened; `name` is the local name
    fn element_begin(&mut self, name: &str, attributes: &[Attribute], location: Location) -> bool;

    /// An element closed
    fn element_end(&mut self, name: &str, location: Location) -> bool;

    /// Character data inside the current element; may arrive in several runs
    fn text_data(&mut self, text: &str, location: Location) -> bool;

    /// The tokenizer failed; returning `false` stops parsing
    ///
    /// Critical failures stop parsing regardless of the return value.
    fn parser_error(&mut self, error: Error, severity: Severity, location: Location) -> bool;
}

/// `BufRead` wrapper counting lines and columns of consumed bytes
struct PositionTracker<R> {
    inner: R,
    line: usize,
    column: usize,
}

impl<R: BufRead> PositionTracker<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
        }
    }
}

impl<R: BufRead> io::Read for PositionTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for PositionTracker<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // The buffer is still filled from the preceding fill_buf call
        if let Ok(buf) = self.inner.fill_buf() {
            for &byte in &buf[..amt.min(buf.len())] {
                if byte == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
            }
        }
        self.inner.consume(amt);
    }
}

/// Local name of an element (strips namespace prefix)
fn local_name(e: &BytesStart) -> Result<String, Error> {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|err| Error::InvalidXml(err.to_string()))
}

fn collect_attributes(e: &BytesStart) -> Result<Vec<Attribute>, Error> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| Error::InvalidXml(err.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::XmlAttr(err.to_string()))?
            .into_owned();
        attributes.push(Attribute { name, value });
    }
    Ok(attributes)
}

/// Parse a document from a buffered reader
///
/// Returns `true` if the whole document was read and no callback asked to
/// stop.
pub fn parse_reader<R: BufRead, H: SaxHandler + ?Sized>(reader: R, handler: &mut H) -> bool {
    let mut reader = Reader::from_reader(PositionTracker::new(reader));
    reader.config_mut().expand_empty_elements = true;
    reader.config_mut().check_end_names = true;

    let mut buf = Vec::new();
    let mut open: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf);
        let location = reader.get_ref().location();
        let keep_going = match event {
            Ok(Event::Start(ref e)) => match local_name(e).and_then(|name| {
                collect_attributes(e).map(|attributes| (name, attributes))
            }) {
                Ok((name, attributes)) => {
                    let ok = handler.element_begin(&name, &attributes, location);
                    open.push(name);
                    ok
                }
                Err(err) => {
                    handler.parser_error(err, Severity::Critical, location);
                    false
                }
            },
            Ok(Event::End(_)) => match open.pop() {
                Some(name) => handler.element_end(&name, location),
                None => {
                    handler.parser_error(
                        Error::InvalidXml("end tag without matching start tag".to_string()),
                        Severity::Critical,
                        location,
                    );
                    false
                }
            },
            Ok(Event::Text(ref t)) => match t.decode() {
                Ok(text) if text.trim().is_empty() => true,
                Ok(text) => handler.text_data(&text, location),
                // Undecodable text is dropped if the handler lets us continue
                Err(err) => handler.parser_error(
                    Error::InvalidXml(err.to_string()),
                    Severity::Error,
                    location,
                ),
            },
            Ok(Event::CData(ref c)) => match std::str::from_utf8(c) {
                Ok(text) => handler.text_data(text, location),
                Err(err) => handler.parser_error(
                    Error::InvalidXml(err.to_string()),
                    Severity::Error,
                    location,
                ),
            },
            Ok(Event::GeneralRef(ref r)) => {
                let reference = std::str::from_utf8(r).unwrap_or_default();
                match quick_xml::escape::unescape(&format!("&{};", reference)) {
                    Ok(text) => handler.text_data(&text, location),
                    Err(err) => handler.parser_error(
                        Error::InvalidXml(err.to_string()),
                        Severity::Error,
                        location,
                    ),
                }
            }
            Ok(Event::Eof) => {
                if let Some(name) = open.last() {
                    handler.parser_error(
                        Error::InvalidXml(format!(
                            "unexpected end of document, <{}> is not closed",
                            name
                        )),
                        Severity::Critical,
                        location,
                    );
                    return false;
                }
                return true;
            }
            Ok(_) => true,
            Err(err) => {
                handler.parser_error(Error::Xml(err), Severity::Critical, location);
                false
            }
        };

        if !keep_going {
            tracing::debug!(line = location.line, "parsing stopped");
            return false;
        }
        buf.clear();
    }
}

/// Parse a document held in memory
pub fn parse_bytes<H: SaxHandler + ?Sized>(bytes: &[u8], handler: &mut H) -> bool {
    parse_reader(bytes, handler)
}

/// Parse a document from disk
///
/// A file that cannot be opened is reported as a critical error.
pub fn parse_file<H: SaxHandler + ?Sized>(path: &Path, handler: &mut H) -> bool {
    match File::open(path) {
        Ok(file) => {
            tracing::debug!(path = %path.display(), "opened document");
            parse_reader(BufReader::new(file), handler)
        }
        Err(err) => {
            handler.parser_error(
                Error::MissingFile(format!("{}: {}", path.display(), err)),
                Severity::Critical,
                Location::default(),
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        errors: Vec<(Severity, Location)>,
        stop_at: Option<&'static str>,
    }

    impl SaxHandler for Recorder {
        fn element_begin(&mut self, name: &str, attributes: &[Attribute], _: Location) -> bool {
            let attrs: Vec<String> = attributes
                .iter()
                .map(|a| format!("{}={}", a.name, a.value))
                .collect();
            self.events.push(format!("begin {} [{}]", name, attrs.join(",")));
            self.stop_at != Some(name)
        }

        fn element_end(&mut self, name: &str, _: Location) -> bool {
            self.events.push(format!("end {}", name));
            true
        }

        fn text_data(&mut self, text: &str, _: Location) -> bool {
            self.events.push(format!("text {}", text));
            true
        }

        fn parser_error(&mut self, _: Error, severity: Severity, location: Location) -> bool {
            self.errors.push((severity, location));
            false
        }
    }

    #[test]
    fn test_events_in_document_order() {
        let xml = br#"<?xml version="1.0"?>
<root a="1"><child b="x&amp;y"/>hello</root>"#;
        let mut rec = Recorder::default();
        assert!(parse_bytes(xml, &mut rec));
        assert_eq!(
            rec.events,
            vec![
                "begin root [a=1]",
                "begin child [b=x&y]",
                "end child",
                "text hello",
                "end root",
            ]
        );
        assert!(rec.errors.is_empty());
    }

    #[test]
    fn test_whitespace_only_text_is_dropped() {
        let xml = b"<a>\n   <b>1 2</b>\n</a>";
        let mut rec = Recorder::default();
        assert!(parse_bytes(xml, &mut rec));
        assert_eq!(rec.events, vec!["begin a []", "begin b []", "text 1 2", "end b", "end a"]);
    }

    #[test]
    fn test_prefixed_element_uses_local_name() {
        let xml = br#"<c:root xmlns:c="urn:x"><c:leaf/></c:root>"#;
        let mut rec = Recorder::default();
        assert!(parse_bytes(xml, &mut rec));
        assert_eq!(rec.events[1], "begin leaf []");
    }

    #[test]
    fn test_stop_from_callback() {
        let xml = b"<a><b/><c/></a>";
        let mut rec = Recorder {
            stop_at: Some("b"),
            ..Default::default()
        };
        assert!(!parse_bytes(xml, &mut rec));
        assert_eq!(rec.events, vec!["begin a []", "begin b []"]);
    }

    #[test]
    fn test_mismatched_end_reports_line() {
        let xml = b"<a>\n<b>\n</a>\n";
        let mut rec = Recorder::default();
        assert!(!parse_bytes(xml, &mut rec));
        assert_eq!(rec.errors.len(), 1);
        assert_eq!(rec.errors[0].0, Severity::Critical);
        assert_eq!(rec.errors[0].1.line, 3);
    }

    #[test]
    fn test_unclosed_at_eof_is_critical() {
        let xml = b"<a><b></b>";
        let mut rec = Recorder::default();
        assert!(!parse_bytes(xml, &mut rec));
        assert_eq!(rec.errors.len(), 1);
        assert_eq!(rec.errors[0].0, Severity::Critical);
    }

    #[test]
    fn test_missing_file() {
        let mut rec = Recorder::default();
        assert!(!parse_file(Path::new("/definitely/not/here.dae"), &mut rec));
        assert_eq!(rec.errors.len(), 1);
    }

    #[test]
    fn test_cdata_forwarded_as_text() {
        let xml = b"<a><![CDATA[1 2 3]]></a>";
        let mut rec = Recorder::default();
        assert!(parse_bytes(xml, &mut rec));
        assert_eq!(rec.events[1], "text 1 2 3");
    }
}
