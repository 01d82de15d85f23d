//! Flattening of the content container into plain text

use ego_tree::{NodeId, NodeRef};
use scraper::{node::Node, ElementRef, Selector};
use std::collections::HashSet;

/// Elements whose text is never page content
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

/// Flattens the text under `container` into newline-separated blocks
///
/// Subtrees matching any of `noise` are skipped without touching the tree, so
/// the traversal order of their siblings is unchanged. Every remaining text
/// node is trimmed and empty ones are dropped.
pub(crate) fn flatten_text(container: ElementRef<'_>, noise: &[Selector]) -> String {
    let excluded: HashSet<NodeId> = noise
        .iter()
        .flat_map(|selector| container.select(selector))
        .map(|element| {
            let node: &NodeRef<'_, Node> = &element;
            node.id()
        })
        .collect();

    let mut blocks = Vec::new();
    collect_blocks(&container, &excluded, &mut blocks);
    blocks.join("\n")
}

fn collect_blocks(node: &NodeRef<'_, Node>, excluded: &HashSet<NodeId>, out: &mut Vec<String>) {
    for child in node.children() {
        if excluded.contains(&child.id()) {
            continue;
        }

        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            Node::Element(element) => {
                if SKIPPED_TAGS.contains(&element.name()) {
                    continue;
                }
                collect_blocks(&child, excluded, out);
            }
            _ => {}
        }
    }
}
