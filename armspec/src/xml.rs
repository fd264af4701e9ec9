//! Small path queries over `roxmltree` documents, enough for the loosely
//! structured vendor XML files

use {
    crate::error::{Error, Result},
    errctx::PathCtx,
    roxmltree::{Document, Node, ParsingOptions},
    std::{fs, path::Path},
};

pub fn read<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(fs::read_to_string(path.as_ref()).map_err(PathCtx::f(path.as_ref()))?)
}

/// Parses XML text read from `path`, vendor files carry a DTD declaration
pub fn parse<'input, P: AsRef<Path>>(path: P, text: &'input str) -> Result<Document<'input>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };

    Document::parse_with_options(text, options).map_err(|source| Error::Xml {
        path: path.as_ref().to_owned(),
        source,
    })
}

/// Every element below `node` at the end of the tag `path`, like `.//a/b/c`
pub fn find_all<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    path: &'a [&'a str],
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants().filter(move |n| ends_with_path(*n, path))
}

/// First element matching `path`, see [`find_all`]
pub fn find<'a, 'input: 'a>(node: Node<'a, 'input>, path: &'a [&'a str]) -> Option<Node<'a, 'input>> {
    find_all(node, path).next()
}

/// Text of the first element matching `path`, empty if it has no text
pub fn find_text<'a, 'input: 'a>(node: Node<'a, 'input>, path: &'a [&'a str]) -> Option<&'a str> {
    find(node, path).map(text)
}

/// Direct children of `node` with tag `tag`
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.has_tag_name(tag))
}

/// Text of the first direct child with tag `tag`
pub fn child_text<'a, 'input: 'a>(node: Node<'a, 'input>, tag: &'a str) -> Option<&'a str> {
    children(node, tag).next().map(text)
}

/// First direct child with tag `tag` and attribute `attr` equal to `value`,
/// like `./tag[@attr="value"]`
pub fn child_with_attr<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
    attr: &str,
    value: &str,
) -> Option<Node<'a, 'input>> {
    children(node, tag).find(|n| n.attribute(attr) == Some(value))
}

/// Text directly inside the element, before any child element
pub fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("")
}

/// All text nodes below `node`, trimmed, non-empty ones joined with a space
pub fn joined_text(node: Node) -> String {
    let mut buf = String::new();
    for text in node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(text);
    }
    buf
}

fn ends_with_path(node: Node, path: &[&str]) -> bool {
    let mut current = Some(node);
    for tag in path.iter().rev() {
        match current {
            Some(n) if n.is_element() && n.has_tag_name(*tag) => current = n.parent(),
            _ => return false,
        }
    }
    true
}
