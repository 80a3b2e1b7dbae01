use std::sync::LazyLock;

use regex::Regex;

static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\[\]\n]+?)\]\]").expect("wikilink pattern is valid"));

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[[^\]\n]*\]\(([^)\n]+)\)").expect("markdown link pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum LinkRef {
    /// `[[target]]`, resolved by vault path or by file stem.
    Wiki(String),
    /// `[text](target)`, resolved relative to the linking note's folder.
    Relative(String),
}

/// Extracts outgoing note references from markdown text.
///
/// Embeds (`![[...]]`, `![...](...)`), external URLs and anything inside
/// fenced code blocks are skipped. Heading and block fragments are dropped.
pub(super) fn extract_links(text: &str) -> Vec<LinkRef> {
    let mut links = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        for captures in WIKILINK.captures_iter(line) {
            if !captures[1].is_empty() {
                continue;
            }
            if let Some(target) = wikilink_target(&captures[2]) {
                links.push(LinkRef::Wiki(target));
            }
        }

        for captures in MARKDOWN_LINK.captures_iter(line) {
            if !captures[1].is_empty() {
                continue;
            }
            if let Some(target) = markdown_target(&captures[2]) {
                links.push(LinkRef::Relative(target));
            }
        }
    }

    links
}

fn wikilink_target(inner: &str) -> Option<String> {
    let without_alias = inner.split('|').next().unwrap_or(inner);
    let without_fragment = without_alias.split('#').next().unwrap_or(without_alias);
    let target = without_fragment.trim();
    (!target.is_empty()).then(|| target.to_owned())
}

fn markdown_target(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = if let Some(stripped) = raw.strip_prefix('<') {
        stripped.split('>').next().unwrap_or(stripped)
    } else {
        raw.split_whitespace().next().unwrap_or(raw)
    };

    if raw.contains("://") || raw.starts_with("mailto:") || raw.starts_with('#') {
        return None;
    }

    let without_fragment = raw.split('#').next().unwrap_or(raw);
    let decoded = percent_decode(without_fragment);
    let target = decoded.trim();
    (!target.is_empty()).then(|| target.to_owned())
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%'
            && index + 2 < bytes.len()
            && let Some(byte) = std::str::from_utf8(&bytes[index + 1..index + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            out.push(byte);
            index += 3;
            continue;
        }
        out.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_alias_and_heading_from_wikilinks() {
        let links = extract_links("See [[Projects/Plan#Goals|the plan]] and [[Inbox]].");
        assert_eq!(
            links,
            vec![
                LinkRef::Wiki("Projects/Plan".to_owned()),
                LinkRef::Wiki("Inbox".to_owned()),
            ]
        );
    }

    #[test]
    fn skips_embeds_urls_and_fenced_code() {
        let text = "![[diagram.png]]\n[site](https://example.com)\n```\n[[hidden]]\n```\n[[shown]]";
        assert_eq!(extract_links(text), vec![LinkRef::Wiki("shown".to_owned())]);
    }

    #[test]
    fn decodes_relative_markdown_links() {
        let links = extract_links("[a](../My%20Note.md#part) [b](<other note.md>) [c](#local)");
        assert_eq!(
            links,
            vec![
                LinkRef::Relative("../My Note.md".to_owned()),
                LinkRef::Relative("other note.md".to_owned()),
            ]
        );
    }

    #[test]
    fn self_heading_links_have_no_target() {
        assert!(extract_links("[[#Only a heading]]").is_empty());
    }
}
