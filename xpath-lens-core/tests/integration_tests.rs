/// Integration tests for xpath-lens-core
///
/// These tests verify:
/// 1. End-to-end evaluation: source in, positioned matches out
/// 2. Highlight spans slicing back into the original text
/// 3. Click resolution feeding the evaluator (the round trip a UI performs)
/// 4. Size-threshold dispatch

use xpath_lens_core::{
    resolve_click, ClickTarget, Dispatcher, EvalRequest, ParseMode, XPathEngine,
};

fn evaluate(source: &str, xpath: &str, mode: ParseMode) -> xpath_lens_core::Evaluation {
    XPathEngine::new()
        .evaluate(source, xpath, mode)
        .expect("evaluation should succeed")
}

/// Slice a match's span out of the original source. Test sources are ASCII,
/// so character offsets equal byte offsets.
fn highlight<'a>(source: &'a str, m: &xpath_lens_core::MatchResult) -> &'a str {
    let start = m.start_offset.expect("match should be located");
    let end = m.end_offset.expect("match should be located");
    &source[start..end]
}

#[test]
fn test_evaluate_xml_end_to_end() {
    let source = "<catalog>\n  <book id=\"b1\"><title>Dune</title></book>\n  <book id=\"b2\"><title>Solaris</title></book>\n</catalog>";

    let result = evaluate(source, "//book[@id='b2']", ParseMode::Xml);
    assert_eq!(result.count, 1);
    assert_eq!(
        highlight(source, &result.matches[0]),
        "<book id=\"b2\"><title>Solaris</title></book>"
    );
}

#[test]
fn test_evaluate_messy_html_end_to_end() {
    // Unclosed <li> and <p>, uppercase names, a void element: the tree is
    // repaired for querying but spans still point into this raw text
    let source = "<UL>\n  <LI>First\n  <LI>Second<br>\n</UL>\n<p>tail";

    let result = evaluate(source, "//li", ParseMode::Html);
    assert_eq!(result.count, 2);
    assert_eq!(result.matches[0].start_offset, Some(source.find("<LI>First").unwrap()));
    assert_eq!(result.matches[1].start_offset, Some(source.find("<LI>Second").unwrap()));

    let result = evaluate(source, "//p", ParseMode::Html);
    assert_eq!(result.count, 1);
    assert_eq!(result.matches[0].start_offset, Some(source.find("<p>tail").unwrap()));
}

#[test]
fn test_text_and_attribute_highlights() {
    let source = r#"<doc><a href="guide.html">Read the guide</a></doc>"#;

    let result = evaluate(source, "//a/text()", ParseMode::Xml);
    assert_eq!(highlight(source, &result.matches[0]), "Read the guide");

    let result = evaluate(source, "//a/@href", ParseMode::Xml);
    assert_eq!(highlight(source, &result.matches[0]), r#"href="guide.html""#);
}

#[test]
fn test_click_to_xpath_to_matches_round_trip() {
    let source = "<html>\n<body>\n<div id=\"sidebar\"><p>Links</p></div>\n<div id=\"content\"><p>Body</p></div>\n</body>\n</html>";

    // Click on the second div's opening tag (line 4, inside "<div")
    let xpath = resolve_click(
        source,
        ParseMode::Html,
        &ClickTarget {
            line: 4,
            column: 2,
            line_text: "<div id=\"content\"><p>Body</p></div>".to_string(),
            surrounding: None,
        },
    )
    .expect("click should resolve");
    assert_eq!(xpath, r#"//*[@id="content"]"#);

    // The synthesized expression selects exactly the clicked element
    let result = evaluate(source, &xpath, ParseMode::Html);
    assert_eq!(result.count, 1);
    assert_eq!(
        highlight(source, &result.matches[0]),
        "<div id=\"content\"><p>Body</p></div>"
    );
}

#[test]
fn test_click_on_closing_tag_resolves_owner() {
    let source = "<html><body><section><p>one</p></section></body></html>";
    let line = source.to_string();
    let column = (source.find("</section>").unwrap() + 3) as u32;

    let xpath = resolve_click(
        source,
        ParseMode::Html,
        &ClickTarget {
            line: 1,
            column,
            line_text: line,
            surrounding: None,
        },
    )
    .expect("click should resolve");
    assert_eq!(xpath, "/html/body/section");
}

#[test]
fn test_dispatcher_worker_round_trip() {
    // Force the worker path with a tiny threshold; results must be
    // indistinguishable from the in-process path
    let source = "<list><item>a</item><item>b</item></list>";
    let request = EvalRequest {
        content: source.to_string(),
        xpath: "//item".to_string(),
        mode: ParseMode::Xml,
    };

    let inline = Dispatcher::new().dispatch(request.clone()).unwrap();
    let offloaded = Dispatcher::with_threshold(1).dispatch(request).unwrap();

    assert_eq!(inline.count, 2);
    assert_eq!(offloaded.count, 2);
    for (a, b) in inline.matches.iter().zip(offloaded.matches.iter()) {
        assert_eq!(a.value, b.value);
        assert_eq!(a.start_offset, b.start_offset);
        assert_eq!(a.end_offset, b.end_offset);
    }
}

#[test]
fn test_multibyte_source_uses_character_offsets() {
    // "héllo" before the match shifts byte offsets but not char offsets
    let source = "<r><t>héllo</t><p>World</p></r>";
    let result = evaluate(source, "//p", ParseMode::Xml);
    let start = result.matches[0].start_offset.unwrap();
    let end = result.matches[0].end_offset.unwrap();
    let chars: Vec<char> = source.chars().collect();
    let sliced: String = chars[start..end].iter().collect();
    assert_eq!(sliced, "<p>World</p>");
}
