use crate::error::TplError;

/// Output semantics of a tag, decided by its opening delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text between tags.
    Text,
    /// `<%= expr %>`: evaluate, stringify, HTML-escape, append.
    Output,
    /// `<%- expr %>`: evaluate, append without escaping.
    RawOutput,
    /// `<% stmt %>`: control flow or a discarded expression.
    Code,
    /// `<%% expr %>`: shorthand for rendering a partial, rewritten to a
    /// raw-output `render(expr)` call before parsing continues.
    Partial,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
    /// Byte offset of the tag's opening delimiter (or of the text run).
    pub offset: usize,
    /// Byte offset where `content` begins in the template source.
    pub content_offset: usize,
}

/// Split raw template text into literal text runs and tag contents.
/// A stray `<` or `%>` outside a tag is plain text.
pub fn scan(template: &str) -> Result<Vec<Segment>, TplError> {
    let mut segments = Vec::new();
    let bytes = template.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let remaining = &template[pos..];

        if let Some(rel) = remaining.find("<%") {
            if rel > 0 {
                segments.push(Segment {
                    kind: SegmentKind::Text,
                    content: remaining[..rel].to_string(),
                    offset: pos,
                    content_offset: pos,
                });
            }
            let tag_start = pos + rel;

            let (kind, skip) = match bytes.get(tag_start + 2) {
                Some(b'=') => (SegmentKind::Output, 3),
                Some(b'-') => (SegmentKind::RawOutput, 3),
                Some(b'%') => (SegmentKind::Partial, 3),
                Some(_) => (SegmentKind::Code, 2),
                None => return Err(TplError::UnterminatedTag { offset: tag_start }),
            };
            let content_start = tag_start + skip;

            let close = find_close(&template[content_start..])
                .ok_or(TplError::UnterminatedTag { offset: tag_start })?;
            segments.push(Segment {
                kind,
                content: template[content_start..content_start + close].to_string(),
                offset: tag_start,
                content_offset: content_start,
            });
            pos = content_start + close + 2;
        } else {
            segments.push(Segment {
                kind: SegmentKind::Text,
                content: remaining.to_string(),
                offset: pos,
                content_offset: pos,
            });
            break;
        }
    }

    Ok(segments)
}

// Position of the closing `%>`, skipping occurrences inside double-quoted
// string literals.
fn find_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quote = !in_quote,
            b'%' if !in_quote && bytes.get(i + 1) == Some(&b'>') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_plain_text() {
        let segments = scan("hello world").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Text);
        assert_eq!(segments[0].content, "hello world");
    }

    #[test]
    fn test_scan_stray_angle_bracket_is_text() {
        let segments = scan("hello < world %> end").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, "hello < world %> end");
    }

    #[test]
    fn test_scan_tag_kinds() {
        let segments = scan("a<%= x %>b<%- y %>c<% end %>d<%% \"p\" %>").unwrap();
        let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [
                SegmentKind::Text,
                SegmentKind::Output,
                SegmentKind::Text,
                SegmentKind::RawOutput,
                SegmentKind::Text,
                SegmentKind::Code,
                SegmentKind::Text,
                SegmentKind::Partial,
            ]
        );
        assert_eq!(segments[1].content, " x ");
        assert_eq!(segments[3].content, " y ");
        assert_eq!(segments[5].content, " end ");
        assert_eq!(segments[7].content, " \"p\" ");
    }

    #[test]
    fn test_scan_offsets() {
        let segments = scan("ab<%= x %>").unwrap();
        assert_eq!(segments[0].offset, 0);
        assert_eq!(segments[1].offset, 2);
        assert_eq!(segments[1].content_offset, 5);
    }

    #[test]
    fn test_scan_unterminated_tag() {
        let err = scan("hello <% if x ").unwrap_err();
        match err {
            TplError::UnterminatedTag { offset } => assert_eq!(offset, 6),
            other => panic!("expected UnterminatedTag, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_close_inside_string_is_skipped() {
        let segments = scan("<%= \"100%> off\" %>").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, " \"100%> off\" ");
    }

    #[test]
    fn test_scan_tag_at_eof() {
        let err = scan("text <%").unwrap_err();
        assert!(matches!(err, TplError::UnterminatedTag { offset: 5 }));
    }
}
