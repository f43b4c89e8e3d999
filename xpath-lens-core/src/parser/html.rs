//! Forgiving HTML to XML normalization
//!
//! The XPath engine only consumes well-formed XML, so HTML input is repaired
//! first: names are lowercased, void elements self-closed, implicit closers
//! (`li`, `p`, table cells, `option`) inserted, unquoted attributes quoted,
//! HTML entities decoded, and regions quick-xml cannot tokenize are skipped.
//! The output text is only ever fed to the parser; offset recovery always runs
//! against the original, unnormalized source.

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};

/// Elements that never have content and never take a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Whether an open `open` element is implicitly closed by an incoming `incoming`
fn closes_implicitly(open: &str, incoming: &str) -> bool {
    match open {
        "li" => incoming == "li",
        "p" => matches!(
            incoming,
            "p" | "div"
                | "ul"
                | "ol"
                | "li"
                | "table"
                | "section"
                | "article"
                | "header"
                | "footer"
                | "aside"
                | "nav"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "blockquote"
                | "pre"
                | "form"
        ),
        "td" | "th" => matches!(incoming, "td" | "th" | "tr"),
        "tr" => incoming == "tr",
        "option" => matches!(incoming, "option" | "optgroup"),
        _ => false,
    }
}

/// Whether `name` is an HTML void element (no content, no closing tag)
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX]?[0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);").unwrap());

/// Decode HTML entity references, leaving unknown ones untouched
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                return u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string());
            }
            if let Some(dec) = body.strip_prefix('#') {
                return dec
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string());
            }
            match body {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => "\u{a0}".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Sanitize an element or attribute name: lowercase, and neutralize prefixes
/// that would be undeclared in the repaired document (the `xml:` prefix is
/// predeclared and kept).
fn sanitize_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw).to_lowercase();
    if let Some(colon) = name.find(':') {
        if &name[..colon] != "xml" {
            return name.replace(':', "-");
        }
    }
    name
}

struct Normalizer {
    out: String,
    stack: Vec<String>,
    top_level_names: Vec<String>,
    top_level_text: bool,
}

impl Normalizer {
    fn new(capacity: usize) -> Self {
        Normalizer {
            out: String::with_capacity(capacity + capacity / 8),
            stack: Vec::new(),
            top_level_names: Vec::new(),
            top_level_text: false,
        }
    }

    fn close_top(&mut self) {
        if let Some(name) = self.stack.pop() {
            self.out.push_str("</");
            self.out.push_str(&name);
            self.out.push('>');
        }
    }

    fn open_tag(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        while let Some(top) = self.stack.last() {
            if closes_implicitly(top, &name) {
                self.close_top();
            } else {
                break;
            }
        }

        if self.stack.is_empty() {
            self.top_level_names.push(name.clone());
        }

        self.out.push('<');
        self.out.push_str(&name);
        for (key, value) in &attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }

        if self_closing || is_void_element(&name) {
            self.out.push_str("/>");
        } else {
            self.out.push('>');
            self.stack.push(name);
        }
    }

    fn close_tag(&mut self, name: &str) {
        // Pop to the matching open tag; ignore strays with no match
        if let Some(pos) = self.stack.iter().rposition(|open| open == name) {
            while self.stack.len() > pos {
                self.close_top();
            }
        }
    }

    fn text(&mut self, raw: &str) {
        let in_raw_text = self
            .stack
            .last()
            .map(|top| top == "script" || top == "style")
            .unwrap_or(false);
        if self.stack.is_empty() && !raw.trim().is_empty() {
            self.top_level_text = true;
        }
        if in_raw_text {
            self.out.push_str(&escape_text(raw));
        } else {
            self.out.push_str(&escape_text(&decode_entities(raw)));
        }
    }

    fn comment(&mut self, raw: &str) {
        let mut content = raw.replace("--", "- -");
        if content.ends_with('-') {
            content.push(' ');
        }
        self.out.push_str("<!--");
        self.out.push_str(&content);
        self.out.push_str("-->");
    }

    fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close_top();
        }
        let single_root = self.top_level_names.len() == 1 && !self.top_level_text;
        if single_root {
            self.out
        } else {
            // Fragments and multi-rooted soup get a browser-style envelope
            format!("<html><body>{}</body></html>", self.out)
        }
    }
}

/// Repair HTML-ish markup into well-formed XML.
///
/// Best effort: regions the tokenizer cannot make sense of (stray `<` in
/// text, raw script bodies) are skipped up to the next `>` rather than
/// failing the whole document.
pub fn normalize_html(source: &str) -> String {
    let mut normalizer = Normalizer::new(source.len());
    let mut remaining = source;

    'outer: loop {
        let mut reader = Reader::from_str(remaining);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = sanitize_name(e.name().as_ref());
                    let attrs = collect_attributes(&e);
                    normalizer.open_tag(name, attrs, false);
                }
                Ok(Event::Empty(e)) => {
                    let name = sanitize_name(e.name().as_ref());
                    let attrs = collect_attributes(&e);
                    normalizer.open_tag(name, attrs, true);
                }
                Ok(Event::End(e)) => {
                    let name = sanitize_name(e.name().as_ref());
                    normalizer.close_tag(&name);
                }
                Ok(Event::Text(e)) => {
                    let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    normalizer.text(&raw);
                }
                Ok(Event::CData(e)) => {
                    let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    normalizer.out.push_str(&escape_text(&raw));
                }
                Ok(Event::Comment(e)) => {
                    let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    normalizer.comment(&raw);
                }
                // Prolog, doctype and processing instructions carry no tree
                // content the evaluator can match
                Ok(Event::Decl(_)) | Ok(Event::DocType(_)) | Ok(Event::PI(_)) => {}
                Ok(Event::Eof) => break 'outer,
                Err(e) => {
                    log::debug!("html normalizer: skipping unparseable region: {}", e);
                    let consumed = (reader.buffer_position() as usize).min(remaining.len());
                    let Some(gt) = remaining[consumed..].find('>') else {
                        break 'outer;
                    };
                    let next = consumed + gt + 1;
                    if next >= remaining.len() {
                        break 'outer;
                    }
                    remaining = &remaining[next..];
                    continue 'outer;
                }
            }
        }
    }

    normalizer.finish()
}

fn collect_attributes(e: &quick_xml::events::BytesStart) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    for attr in e.html_attributes().flatten() {
        let key = sanitize_name(attr.key.as_ref());
        // Default namespace declarations are dropped so prefixless XPath
        // expressions match the repaired document
        if key == "xmlns" {
            continue;
        }
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        attrs.push((key, decode_entities(&raw)));
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parses(xml: &str) -> bool {
        xot::Xot::new().parse(xml).is_ok()
    }

    #[test]
    fn test_well_formed_passthrough() {
        let out = normalize_html("<div><p>hello</p></div>");
        assert_eq!(out, "<div><p>hello</p></div>");
        assert!(parses(&out));
    }

    #[test]
    fn test_void_elements_closed() {
        let out = normalize_html("<div><br><img src=\"x.png\"></div>");
        assert_eq!(out, "<div><br/><img src=\"x.png\"/></div>");
        assert!(parses(&out));
    }

    #[test]
    fn test_implicit_li_close() {
        let out = normalize_html("<ul><li>A<li>B</ul>");
        assert_eq!(out, "<ul><li>A</li><li>B</li></ul>");
        assert!(parses(&out));
    }

    #[test]
    fn test_uppercase_names_lowered() {
        let out = normalize_html("<DIV CLASS=\"Hero\">x</DIV>");
        assert_eq!(out, "<div class=\"Hero\">x</div>");
    }

    #[test]
    fn test_unquoted_attribute() {
        let out = normalize_html("<input type=text name=q>");
        assert_eq!(out, "<input type=\"text\" name=\"q\"/>");
        assert!(parses(&out));
    }

    #[test]
    fn test_stray_close_ignored() {
        let out = normalize_html("<div>a</span></div>");
        assert_eq!(out, "<div>a</div>");
    }

    #[test]
    fn test_unclosed_tags_closed_at_eof() {
        let out = normalize_html("<div><p>text");
        assert_eq!(out, "<div><p>text</p></div>");
    }

    #[test]
    fn test_fragment_wrapped() {
        let out = normalize_html("<p>a</p><p>b</p>");
        assert_eq!(out, "<html><body><p>a</p><p>b</p></body></html>");
        assert!(parses(&out));
    }

    #[test]
    fn test_doctype_dropped() {
        let out = normalize_html("<!DOCTYPE html><html><body>x</body></html>");
        assert_eq!(out, "<html><body>x</body></html>");
    }

    #[test]
    fn test_entities_decoded_and_reescaped() {
        let out = normalize_html("<p>a &amp; b &nbsp; &#65;</p>");
        assert_eq!(out, "<p>a &amp; b \u{a0} A</p>");
        assert!(parses(&out));
    }

    #[test]
    fn test_default_xmlns_dropped() {
        let out = normalize_html(r#"<html xmlns="http://www.w3.org/1999/xhtml"><body>x</body></html>"#);
        assert_eq!(out, "<html><body>x</body></html>");
    }

    #[test]
    fn test_decode_entities_unknown_kept() {
        assert_eq!(decode_entities("&bogus; &amp;"), "&bogus; &");
        assert_eq!(decode_entities("&#x41;"), "A");
    }

    #[test]
    fn test_table_cells_implicitly_closed() {
        let out = normalize_html("<table><tr><td>a<td>b<tr><td>c</table>");
        assert_eq!(
            out,
            "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table>"
        );
        assert!(parses(&out));
    }
}
