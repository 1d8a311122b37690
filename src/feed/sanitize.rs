//! Markup stripping for free text taken from feed descriptions.
//!
//! The input is parsed as an HTML fragment and only its text nodes are kept.
//! No element is allowed through: every start and end tag becomes a single
//! space so adjacent words stay apart, and the content of `script`, `style`
//! and `noscript` is dropped. Character references are decoded, after which
//! any `<` or `>` left in the text is removed, so the output never contains a
//! markup delimiter.

use scraper::ElementRef;
use scraper::Html;
use scraper::Node;

/// Elements whose content is dropped together with the tags.
const SKIPPED_CONTENT: [&str; 3] = ["script", "style", "noscript"];

/// Elements written as a single tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Strips all markup from `input`.
pub fn strip_tags(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut out = String::with_capacity(input.len());
    push_children(fragment.root_element(), &mut out);
    out
}

fn push_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.extend(text.chars().filter(|c| !matches!(c, '<' | '>'))),
            Node::Comment(_) => out.push(' '),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn push_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();

    out.push(' ');
    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    if !SKIPPED_CONTENT.contains(&name) {
        push_children(element, out);
    }
    out.push(' ');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_no_delimiters(s: &str) {
        assert!(!s.contains('<'), "`<` survived in {s:?}");
        assert!(!s.contains('>'), "`>` survived in {s:?}");
    }

    #[test]
    fn test_each_tag_becomes_one_space() {
        assert_eq!(strip_tags("<p>amazing</p>"), " amazing ");
        assert_eq!(strip_tags("<p><i>a</i></p><p>b</p>"), "  a   b ");
        assert_eq!(strip_tags("a<br>b"), "a b");
        assert_eq!(strip_tags("<p><img src=\"x.jpg\"/></p>"), "   ");
    }

    #[test]
    fn test_plain_text_is_kept() {
        assert_eq!(strip_tags("no markup here"), "no markup here");
        assert_eq!(strip_tags("Ünïcödé ★½"), "Ünïcödé ★½");
    }

    #[test]
    fn test_character_references_are_decoded() {
        assert_eq!(strip_tags("<p>Tom &amp; Jerry&#39;s</p>"), " Tom & Jerry's ");
    }

    #[test]
    fn test_attributes_with_gt_in_quotes() {
        let out = strip_tags(r#"<a title="x > y" href='z>'>link</a>"#);
        assert_eq!(out, " link ");
    }

    #[test]
    fn test_stray_delimiters_are_removed() {
        assert_eq!(strip_tags("I loved it <3"), "I loved it 3");
        assert_eq!(strip_tags("1 &lt; 2 and 3 &gt; 2"), "1  2 and 3  2");
        assert_eq!(strip_tags("&lt;script&gt;x"), "scriptx");
    }

    #[test]
    fn test_unterminated_tag_is_dropped() {
        let out = strip_tags("before <img src=\"x\" onerror=\"alert(1)\"");
        assert_eq!(out.trim(), "before");
        assert_no_delimiters(&out);
    }

    #[test]
    fn test_unbalanced_and_nested_brackets() {
        for input in [
            "<<p>>text",
            "<p<p>>",
            "<<script>script>alert(1)<</script>/script>",
            "</",
            "<",
            "x <b",
            "text<!-- never closed",
            "<a href=\"unclosed>quote",
            "<a title='>' >y",
            "<svg/onload=alert(1)>z",
        ] {
            assert_no_delimiters(&strip_tags(input));
        }
    }

    #[test]
    fn test_comments_are_removed() {
        assert_eq!(strip_tags("a<!-- <b>hidden</b> -->b"), "a b");
    }

    #[test]
    fn test_script_and_style_content_is_dropped() {
        assert_eq!(strip_tags("a<script>alert('<p>')</script>b"), "a  b");
        assert_eq!(strip_tags("a<STYLE>p { color: red }</Style>b"), "a  b");
        assert!(!strip_tags("a<script>never closed").contains("never"));
    }
}
