//! XML event source.
//!
//! The digester consumes a document as a flat stream of element-open,
//! element-close and character-data events. [`drive`] tokenizes a document
//! with roxmltree and replays it into a [`ContentHandler`].

use roxmltree::{Document, Edge, Node, ParsingOptions};

use crate::error::{DigestError, Result};
use crate::registry::Attributes;

/// Receiver of document events.
pub trait ContentHandler {
    /// An element opened.
    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<()>;

    /// An element closed.
    fn end_element(&mut self, name: &str) -> Result<()>;

    /// A chunk of character data inside the current element.
    fn characters(&mut self, chunk: &str) -> Result<()>;
}

/// Join a namespace prefix and a local name.
fn qualify(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

/// Get the tag name as written, including its namespace prefix.
///
/// Elements in a default namespace have no prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use regelrecht_digester::xml::get_tag_name;
///
/// let doc = Document::parse(r#"<c:config xmlns:c="urn:c"/>"#).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "c:config");
/// ```
pub fn get_tag_name(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    let prefix = tag.namespace().and_then(|uri| node.lookup_prefix(uri));
    qualify(prefix, tag.name())
}

/// Tokenize `document` and replay its events into `handler`.
///
/// With `case_folding` enabled element and attribute names are reported in
/// upper case. The first handler failure stops the replay.
///
/// # Errors
/// `Xml` if the document is not well-formed, or the first error returned by
/// the handler.
pub fn drive<H>(document: &str, handler: &mut H, case_folding: bool) -> Result<()>
where
    H: ContentHandler + ?Sized,
{
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(document, options).map_err(|source| {
        let pos = source.pos();
        DigestError::Xml {
            line: pos.row,
            column: pos.col,
            source,
        }
    })?;

    let fold = |name: &str| {
        if case_folding {
            name.to_uppercase()
        } else {
            name.to_string()
        }
    };

    for edge in doc.root().traverse() {
        match edge {
            Edge::Open(node) if node.is_element() => {
                let attributes: Attributes = node
                    .attributes()
                    .map(|attribute| {
                        let prefix = attribute
                            .namespace()
                            .and_then(|uri| node.lookup_prefix(uri));
                        (fold(&qualify(prefix, attribute.name())), attribute.value())
                    })
                    .collect();
                handler.start_element(&fold(&get_tag_name(node)), &attributes)?;
            }
            Edge::Open(node) if node.is_text() => {
                if let Some(text) = node.text() {
                    handler.characters(text)?;
                }
            }
            Edge::Close(node) if node.is_element() => {
                handler.end_element(&fold(&get_tag_name(node)))?;
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Transcript {
        events: Vec<String>,
    }

    impl ContentHandler for Transcript {
        fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<()> {
            let attributes: Vec<String> = attributes
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            self.events
                .push(format!("open {name} [{}]", attributes.join(" ")));
            Ok(())
        }

        fn end_element(&mut self, name: &str) -> Result<()> {
            self.events.push(format!("close {name}"));
            Ok(())
        }

        fn characters(&mut self, chunk: &str) -> Result<()> {
            if !chunk.trim().is_empty() {
                self.events.push(format!("text {}", chunk.trim()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_drive_reports_events_in_document_order() {
        let mut transcript = Transcript::default();
        drive(
            r#"<config version="2"><server host="a" port="1">up</server></config>"#,
            &mut transcript,
            false,
        )
        .unwrap();

        assert_eq!(
            transcript.events,
            vec![
                "open config [version=2]",
                "open server [host=a port=1]",
                "text up",
                "close server",
                "close config",
            ]
        );
    }

    #[test]
    fn test_drive_case_folding() {
        let mut transcript = Transcript::default();
        drive(r#"<Config Mode="x"/>"#, &mut transcript, true).unwrap();

        assert_eq!(transcript.events, vec!["open CONFIG [MODE=x]", "close CONFIG"]);
    }

    #[test]
    fn test_drive_keeps_namespace_prefixes() {
        let mut transcript = Transcript::default();
        drive(
            r#"<c:config xmlns:c="urn:c" xmlns:a="urn:a" xmlns:b="urn:b" a:id="1" b:id="2"><c:item/></c:config>"#,
            &mut transcript,
            false,
        )
        .unwrap();

        assert_eq!(
            transcript.events,
            vec![
                "open c:config [a:id=1 b:id=2]",
                "open c:item []",
                "close c:item",
                "close c:config",
            ]
        );
    }

    #[test]
    fn test_default_namespace_has_no_prefix() {
        let doc = Document::parse(r#"<config xmlns="urn:c"><server/></config>"#).unwrap();
        let server = doc.root_element().first_element_child().unwrap();

        assert_eq!(get_tag_name(doc.root_element()), "config");
        assert_eq!(get_tag_name(server), "server");
    }

    #[test]
    fn test_drive_cdata_is_text() {
        let mut transcript = Transcript::default();
        drive("<a><![CDATA[x < y]]></a>", &mut transcript, false).unwrap();

        assert_eq!(transcript.events, vec!["open a []", "text x < y", "close a"]);
    }

    #[test]
    fn test_drive_malformed_document() {
        let mut transcript = Transcript::default();
        let err = drive("<a>\n<b></a>", &mut transcript, false).unwrap_err();

        assert!(matches!(err, DigestError::Xml { line: 2, .. }));
        assert!(transcript.events.is_empty());
    }

    #[test]
    fn test_drive_stops_at_handler_error() {
        struct Failing(usize);

        impl ContentHandler for Failing {
            fn start_element(&mut self, _: &str, _: &Attributes) -> Result<()> {
                self.0 += 1;
                Err(DigestError::custom("stop"))
            }

            fn end_element(&mut self, _: &str) -> Result<()> {
                self.0 += 1;
                Ok(())
            }

            fn characters(&mut self, _: &str) -> Result<()> {
                Ok(())
            }
        }

        let mut handler = Failing(0);
        assert!(drive("<a><b/></a>", &mut handler, false).is_err());
        assert_eq!(handler.0, 1);
    }
}
