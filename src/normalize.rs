//! Canonical text form for qualification pattern matching.
//!
//! Descriptions arrive as scraped HTML-ish text with arbitrary casing,
//! punctuation and spacing. [`normalize`] reduces them to lowercase
//! alphanumeric words separated by single spaces so that multi-word
//! patterns match reliably (`"Level 3"`, `"level  3"`, `"LEVEL-3"` and
//! `"L3"`-style shorthand all line up).
//!
//! `/` is the one punctuation mark kept, as its own word, since it joins
//! alternatives such as `levels 2/3`.

const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&nbsp;", " "),
    ("&lt;", " "),
    ("&gt;", " "),
    ("&quot;", " "),
    ("&#39;", "'"),
];

/// Normalize raw description text. Never fails; empty or punctuation-only
/// input yields an empty string.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_string();
    for (entity, replacement) in ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut prev: Option<char> = None;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag && chars.peek().is_some_and(|n| n.is_alphabetic() || *n == '/') => {
                in_tag = true;
                push_space(&mut out);
                prev = None;
                continue;
            }
            '>' if in_tag => {
                in_tag = false;
                continue;
            }
            _ if in_tag => continue,
            _ => {}
        }

        if c == '/' {
            push_slash(&mut out);
            prev = None;
            continue;
        }

        if !c.is_alphanumeric() {
            push_space(&mut out);
            prev = None;
            continue;
        }

        // Split letter/digit boundaries: "nvq3" -> "nvq 3", "3rd" -> "3 rd".
        if let Some(p) = prev {
            if p.is_ascii_digit() != c.is_ascii_digit() {
                push_space(&mut out);
            }
        }
        out.extend(c.to_lowercase());
        prev = Some(c);
    }

    loop {
        out.truncate(out.trim_end().len());
        if !out.ends_with('/') {
            break;
        }
        out.pop();
    }
    out
}

fn push_slash(out: &mut String) {
    push_space(out);
    if !out.is_empty() && !out.ends_with("/ ") {
        out.push_str("/ ");
    }
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}
