use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Render assistant text (CommonMark) as Pango markup for a single label.
/// Block structure is flattened into lines; lists get bullets or numbers.
pub fn to_pango_markup(input: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH;
    let mut out = String::new();
    // One entry per open list: next number for ordered lists
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in Parser::new_ext(input, options) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph => {}
                Tag::Heading { level, .. } => {
                    let size = match level {
                        HeadingLevel::H1 => "x-large",
                        HeadingLevel::H2 => "large",
                        _ => "medium",
                    };
                    out.push_str(&format!("<span size=\"{}\"><b>", size));
                }
                Tag::BlockQuote(_) => out.push_str("<i>"),
                Tag::CodeBlock(_) => out.push_str("<tt>"),
                Tag::List(start) => {
                    end_line(&mut out);
                    lists.push(start);
                }
                Tag::Item => {
                    end_line(&mut out);
                    let indent = "  ".repeat(lists.len().saturating_sub(1));
                    out.push_str(&indent);
                    match lists.last_mut() {
                        Some(Some(n)) => {
                            out.push_str(&format!("{}. ", n));
                            *n += 1;
                        }
                        _ => out.push_str("\u{2022} "),
                    }
                }
                Tag::Emphasis => out.push_str("<i>"),
                Tag::Strong => out.push_str("<b>"),
                Tag::Strikethrough => out.push_str("<s>"),
                Tag::Link { dest_url, .. } => {
                    out.push_str(&format!(
                        "<a href=\"{}\">",
                        glib::markup_escape_text(&dest_url)
                    ));
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph => end_block(&mut out),
                TagEnd::Heading(_) => {
                    out.push_str("</b></span>");
                    end_block(&mut out);
                }
                TagEnd::BlockQuote(_) => {
                    trim_trailing_newlines(&mut out);
                    out.push_str("</i>");
                    end_block(&mut out);
                }
                TagEnd::CodeBlock => {
                    trim_trailing_newlines(&mut out);
                    out.push_str("</tt>");
                    end_block(&mut out);
                }
                TagEnd::List(_) => {
                    lists.pop();
                    if lists.is_empty() {
                        end_block(&mut out);
                    }
                }
                TagEnd::Emphasis => out.push_str("</i>"),
                TagEnd::Strong => out.push_str("</b>"),
                TagEnd::Strikethrough => out.push_str("</s>"),
                TagEnd::Link => out.push_str("</a>"),
                _ => {}
            },
            Event::Text(text) => out.push_str(&glib::markup_escape_text(&text)),
            Event::Code(code) => {
                out.push_str("<tt>");
                out.push_str(&glib::markup_escape_text(&code));
                out.push_str("</tt>");
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                out.push_str("\u{2014}\u{2014}\u{2014}");
                end_block(&mut out);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                out.push_str(&glib::markup_escape_text(&html));
            }
            _ => {}
        }
    }

    trim_trailing_newlines(&mut out);
    out
}

fn trim_trailing_newlines(out: &mut String) {
    while out.ends_with('\n') {
        out.pop();
    }
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn end_block(out: &mut String) {
    trim_trailing_newlines(out);
    if !out.is_empty() {
        out.push_str("\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_escaped() {
        assert_eq!(to_pango_markup("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_inline_formatting() {
        assert_eq!(
            to_pango_markup("**bold** and *italic* and `code`"),
            "<b>bold</b> and <i>italic</i> and <tt>code</tt>"
        );
    }

    #[test]
    fn test_paragraphs_and_links() {
        assert_eq!(
            to_pango_markup("Hi\n\nSee [docs](https://x.io?a=1&b=2)"),
            "Hi\n\nSee <a href=\"https://x.io?a=1&amp;b=2\">docs</a>"
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(to_pango_markup("- one\n- two"), "\u{2022} one\n\u{2022} two");
        assert_eq!(to_pango_markup("3. a\n4. b"), "3. a\n4. b");
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            to_pango_markup("```\nlet x = 1;\n```"),
            "<tt>let x = 1;</tt>"
        );
    }
}
