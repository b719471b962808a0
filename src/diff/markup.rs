//! Diff table markup walking using tree-sitter-html
//!
//! The compare endpoint renders a sequence of `<tr>` rows. Each row holds
//! up to one added-line cell and one deleted-line cell, identified by
//! their class tokens. Inline `<ins>`/`<del>` spans mark the changed
//! words of a one-line replacement.

use regex::Regex;
use std::sync::OnceLock;
use tree_sitter::{Node, Parser};

pub(crate) const ADDED_CELL_CLASS: &str = "diff-addedline";
pub(crate) const DELETED_CELL_CLASS: &str = "diff-deletedline";

/// Node kinds whose bytes never contribute to an element's text
const MARKUP_KINDS: &[&str] = &[
    "start_tag",
    "end_tag",
    "self_closing_tag",
    "erroneous_end_tag",
    "comment",
    "doctype",
];

/// Fragments recovered from one diff body, in document order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RowFragments {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Walk every table row of a rendered diff.
pub(crate) fn collect_fragments(body: &str) -> Result<RowFragments, String> {
    let mut fragments = RowFragments::default();
    if body.trim().is_empty() {
        return Ok(fragments);
    }

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_html::LANGUAGE.into())
        .map_err(|e| format!("Failed to set HTML language: {}", e))?;
    let tree = parser
        .parse(body, None)
        .ok_or_else(|| "Failed to parse diff markup".to_string())?;

    let source = body.as_bytes();
    let mut rows = Vec::new();
    find_elements(tree.root_node(), source, "tr", &mut rows);

    for row in rows {
        let cells: Vec<Node> = row
            .named_children(&mut row.walk())
            .filter(|c| c.kind() == "element" && is_tag(*c, source, "td"))
            .collect();
        let added_cell = cells
            .iter()
            .find(|c| has_class(**c, source, ADDED_CELL_CLASS));
        let removed_cell = cells
            .iter()
            .find(|c| has_class(**c, source, DELETED_CELL_CLASS));

        match (added_cell, removed_cell) {
            (Some(added), Some(removed)) => {
                fragments
                    .added
                    .extend(descendant_texts(*added, source, "ins"));
                fragments
                    .removed
                    .extend(descendant_texts(*removed, source, "del"));
            }
            (Some(added), None) => {
                if let Some(text) = first_container_text(*added, source) {
                    fragments.added.push(text);
                }
            }
            (None, Some(removed)) => {
                if let Some(text) = first_container_text(*removed, source) {
                    fragments.removed.push(text);
                }
            }
            // Context rows
            (None, None) => {}
        }
    }

    Ok(fragments)
}

/// Tag name of an element node, as written.
fn tag_name<'a>(element: Node, source: &'a [u8]) -> Option<&'a str> {
    let tag = element
        .named_children(&mut element.walk())
        .find(|c| c.kind() == "start_tag" || c.kind() == "self_closing_tag")?;
    let name = tag
        .named_children(&mut tag.walk())
        .find(|c| c.kind() == "tag_name")?;
    name.utf8_text(source).ok()
}

fn is_tag(element: Node, source: &[u8], name: &str) -> bool {
    tag_name(element, source).is_some_and(|t| t.eq_ignore_ascii_case(name))
}

/// Whether the element's `class` attribute contains `class` as a token.
fn has_class(element: Node, source: &[u8], class: &str) -> bool {
    let Some(tag) = element
        .named_children(&mut element.walk())
        .find(|c| c.kind() == "start_tag")
    else {
        return false;
    };

    for attr in tag.named_children(&mut tag.walk()) {
        if attr.kind() != "attribute" {
            continue;
        }
        let mut name = None;
        let mut value = None;
        for part in attr.named_children(&mut attr.walk()) {
            match part.kind() {
                "attribute_name" => name = part.utf8_text(source).ok(),
                "attribute_value" => value = part.utf8_text(source).ok(),
                "quoted_attribute_value" => {
                    value = part
                        .named_children(&mut part.walk())
                        .find(|v| v.kind() == "attribute_value")
                        .and_then(|v| v.utf8_text(source).ok());
                }
                _ => {}
            }
        }
        if name.is_some_and(|n| n.eq_ignore_ascii_case("class")) {
            return value.is_some_and(|v| v.split_whitespace().any(|token| token == class));
        }
    }
    false
}

/// Depth-first search for elements named `name`, in document order.
fn find_elements<'t>(node: Node<'t>, source: &[u8], name: &str, out: &mut Vec<Node<'t>>) {
    if node.kind() == "element" && is_tag(node, source, name) {
        out.push(node);
        return;
    }
    for child in node.named_children(&mut node.walk()) {
        find_elements(child, source, name, out);
    }
}

fn descendant_texts(cell: Node, source: &[u8], name: &str) -> Vec<String> {
    let mut spans = Vec::new();
    for child in cell.named_children(&mut cell.walk()) {
        find_elements(child, source, name, &mut spans);
    }
    spans.into_iter().map(|s| inner_text(s, source)).collect()
}

/// Text of the first `div` inside a cell; cells without one carry no text.
fn first_container_text(cell: Node, source: &[u8]) -> Option<String> {
    let mut divs = Vec::new();
    for child in cell.named_children(&mut cell.walk()) {
        find_elements(child, source, "div", &mut divs);
        if !divs.is_empty() {
            break;
        }
    }
    divs.first().map(|div| inner_text(*div, source))
}

/// All character data inside an element, whitespace preserved.
pub(crate) fn inner_text(element: Node, source: &[u8]) -> String {
    let mut skipped = Vec::new();
    collect_markup_ranges(element, &mut skipped);

    let mut raw = Vec::with_capacity(element.end_byte() - element.start_byte());
    let mut cursor = element.start_byte();
    for (start, end) in skipped {
        if start > cursor {
            raw.extend_from_slice(&source[cursor..start]);
        }
        cursor = cursor.max(end);
    }
    if element.end_byte() > cursor {
        raw.extend_from_slice(&source[cursor..element.end_byte()]);
    }

    decode_entities(&String::from_utf8_lossy(&raw))
}

fn collect_markup_ranges(node: Node, out: &mut Vec<(usize, usize)>) {
    for child in node.children(&mut node.walk()) {
        if MARKUP_KINDS.contains(&child.kind()) {
            out.push((child.start_byte(), child.end_byte()));
        } else {
            collect_markup_ranges(child, out);
        }
    }
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")
            .expect("entity regex is valid")
    })
}

/// Decode numeric and core named character references.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    entity_regex()
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        _ => return None,
    })
}
