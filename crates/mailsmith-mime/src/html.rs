//! HTML whitespace minification.

use regex::Regex;
use std::sync::LazyLock;

/// Elements whose content must be kept byte for byte.
#[allow(clippy::expect_used)]
static PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<textarea\b.*?</textarea\s*>|<pre\b.*?</pre\s*>|<script\b.*?</script\s*>",
    )
    .expect("protected element pattern is valid")
});

/// Any non-space whitespace run, or two or more whitespace characters.
#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\t\n\x0B\x0C\r][\t\n\x0B\x0C\r ]*|[\t\n\x0B\x0C\r ]{2,}")
        .expect("whitespace pattern is valid")
});

/// Collapses structural whitespace in an HTML document to single spaces.
///
/// Content of `<textarea>`, `<pre>` and `<script>` elements (tags
/// included) is left untouched. Unclosed elements get no protection.
#[must_use]
pub fn minify(html: &str) -> String {
    let mut minified = String::with_capacity(html.len());
    let mut last = 0;

    for protected in PROTECTED.find_iter(html) {
        minified.push_str(&WHITESPACE.replace_all(&html[last..protected.start()], " "));
        minified.push_str(protected.as_str());
        last = protected.end();
    }
    minified.push_str(&WHITESPACE.replace_all(&html[last..], " "));

    minified
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
    fn test_collapse_whitespace() {
        let html = "<html>\n  <body>\n\t<p>Hello   world</p>\n  </body>\n</html>\n";
        assert_eq!(
            minify(html),
            "<html> <body> <p>Hello world</p> </body> </html> "
        );
    }

    #[test]
    fn test_single_spaces_untouched() {
        assert_eq!(minify("<p>a b c</p>"), "<p>a b c</p>");
    }

    #[test]
    fn test_lone_newline_becomes_space() {
        assert_eq!(minify("a\nb"), "a b");
    }

    #[test]
    fn test_protected_elements_kept() {
        let html = "<div>\n  <pre>\n  keep   this\n</pre>\n  <script>if (a)\n    b();</script>\n<TEXTAREA rows=\"2\">x\n\ny</TEXTAREA>  </div>";
        assert_eq!(
            minify(html),
            "<div> <pre>\n  keep   this\n</pre> <script>if (a)\n    b();</script> <TEXTAREA rows=\"2\">x\n\ny</TEXTAREA> </div>"
        );
    }

    #[test]
    fn test_unclosed_protected_element_collapsed() {
        assert_eq!(minify("<pre>a\n\nb"), "<pre>a b");
    }

    #[test]
    fn test_prefix_tag_not_protected() {
        // <preview> is not <pre>
        assert_eq!(minify("<preview>a\n\nb</preview>"), "<preview>a b</preview>");
    }
}
