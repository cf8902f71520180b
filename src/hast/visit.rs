//! Tree traversal helpers. All walks are pre-order, document order.

use super::{Element, Node};

/// Visit every element.
pub fn walk<'a>(nodes: &'a [Node], f: &mut impl FnMut(&'a Element)) {
    for node in nodes {
        if let Node::Element(el) = node {
            f(el);
            walk(&el.children, f);
        }
    }
}

/// Visit every element mutably. `f` runs before the element's children are
/// visited, so children it replaces are walked too.
pub fn walk_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let Node::Element(el) = node {
            f(el);
            walk_mut(&mut el.children, f);
        }
    }
}

/// First element matching `pred`.
pub fn find<'a>(nodes: &'a [Node], pred: &impl Fn(&Element) -> bool) -> Option<&'a Element> {
    for node in nodes {
        if let Node::Element(el) = node {
            if pred(el) {
                return Some(el);
            }
            if let Some(found) = find(&el.children, pred) {
                return Some(found);
            }
        }
    }
    None
}

pub fn find_mut<'a>(
    nodes: &'a mut [Node],
    pred: &impl Fn(&Element) -> bool,
) -> Option<&'a mut Element> {
    for node in nodes {
        if let Node::Element(el) = node {
            if pred(el) {
                return Some(el);
            }
            if let Some(found) = find_mut(&mut el.children, pred) {
                return Some(found);
            }
        }
    }
    None
}

/// Every element matching `pred`, including matches nested in matches.
pub fn find_all<'a>(nodes: &'a [Node], pred: &impl Fn(&Element) -> bool) -> Vec<&'a Element> {
    let mut out = Vec::new();
    walk(nodes, &mut |el| {
        if pred(el) {
            out.push(el);
        }
    });
    out
}

/// Outermost elements matching `pred`; matches are not searched further.
pub fn find_outermost<'a>(nodes: &'a [Node], pred: &impl Fn(&Element) -> bool) -> Vec<&'a Element> {
    let mut out = Vec::new();
    collect_outermost(nodes, pred, &mut out);
    out
}

fn collect_outermost<'a>(
    nodes: &'a [Node],
    pred: &impl Fn(&Element) -> bool,
    out: &mut Vec<&'a Element>,
) {
    for node in nodes {
        if let Node::Element(el) = node {
            if pred(el) {
                out.push(el);
            } else {
                collect_outermost(&el.children, pred, out);
            }
        }
    }
}

/// Drop every element for which `keep` returns false. Children of dropped
/// elements are not visited.
pub fn retain(nodes: &mut Vec<Node>, keep: &mut impl FnMut(&Element) -> bool) {
    nodes.retain_mut(|node| match node {
        Node::Element(el) => {
            if keep(el) {
                retain(&mut el.children, keep);
                true
            } else {
                false
            }
        }
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Node> {
        vec![
            Element::new("div")
                .with_class("popover-hint")
                .with_child(Element::new("p").with_attr("id", "inner").with_class("popover-hint"))
                .into(),
            Element::new("p").with_attr("id", "outer").into(),
        ]
    }

    #[test]
    fn test_walk_is_document_order() {
        let nodes = sample();
        let mut tags = Vec::new();
        walk(&nodes, &mut |el| tags.push(el.tag_name.clone()));
        assert_eq!(tags, vec!["div", "p", "p"]);
    }

    #[test]
    fn test_outermost_skips_nested_matches() {
        let nodes = sample();
        let roots = find_outermost(&nodes, &|el| el.has_class("popover-hint"));
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].tag_name, "div");

        let all = find_all(&nodes, &|el| el.has_class("popover-hint"));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_retain_removes_subtrees() {
        let mut nodes = sample();
        retain(&mut nodes, &mut |el| el.id() != Some("inner"));
        assert!(find(&nodes, &|el| el.id() == Some("inner")).is_none());
        assert!(find(&nodes, &|el| el.id() == Some("outer")).is_some());
    }

    #[test]
    fn test_find_mut_edits_in_place() {
        let mut nodes = sample();
        if let Some(el) = find_mut(&mut nodes, &|el| el.id() == Some("outer")) {
            el.set_attr("data-seen", "");
        }
        assert!(find(&nodes, &|el| el.has_attr("data-seen")).is_some());
    }
}
