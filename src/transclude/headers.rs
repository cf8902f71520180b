//! Collapsible header sections
//!
//! Every heading opens a section that collects the following siblings until
//! a heading of the same or shallower rank closes it. Deeper headings nest
//! inside. A stop marker (`<hr>`, or a references/footnotes/backlinks
//! section) closes everything that is open and stays outside.

use crate::hast::{Element, Node};

struct OpenSection {
    rank: u8,
    heading: Element,
    content: Vec<Node>,
}

/// Wrap the headings in `nodes` into nested collapsible sections.
pub fn wrap_collapsible_headers(nodes: Vec<Node>) -> Vec<Node> {
    let mut result: Vec<Node> = Vec::new();
    let mut stack: Vec<OpenSection> = Vec::new();

    for node in nodes {
        let (is_stop, rank) = match &node {
            Node::Element(el) => (is_stop_marker(el), el.heading_rank()),
            _ => (false, None),
        };

        if is_stop {
            let end_hr = node.as_element().is_some_and(|el| el.is("hr"));
            close_while(&mut stack, &mut result, end_hr, |_| true);
            result.push(node);
            continue;
        }

        match (rank, node) {
            (Some(rank), Node::Element(heading)) => {
                close_while(&mut stack, &mut result, false, |open| open.rank >= rank);
                stack.push(OpenSection {
                    rank,
                    heading,
                    content: Vec::new(),
                });
            }
            (_, node) => match stack.last_mut() {
                Some(open) => open.content.push(node),
                None => result.push(node),
            },
        }
    }

    close_while(&mut stack, &mut result, false, |_| true);
    result
}

fn close_while(
    stack: &mut Vec<OpenSection>,
    result: &mut Vec<Node>,
    end_hr: bool,
    should_close: impl Fn(&OpenSection) -> bool,
) {
    while stack.last().is_some_and(&should_close) {
        let Some(open) = stack.pop() else { break };
        let wrapped = Node::Element(section(open, end_hr));
        match stack.last_mut() {
            Some(parent) => parent.content.push(wrapped),
            None => result.push(wrapped),
        }
    }
}

fn is_stop_marker(el: &Element) -> bool {
    el.is("hr")
        || ["data-references", "data-footnotes", "data-backlinks"]
            .iter()
            .any(|attr| el.attr(attr) == Some(""))
}

fn icon(class: &str, href: &str, colour: Option<&str>) -> Element {
    let mut svg = Element::new("svg")
        .with_attr("xmlns", "http://www.w3.org/2000/svg")
        .with_attr("width", "16")
        .with_attr("height", "16")
        .with_attr("viewBox", "0 0 24 24")
        .with_class(class);
    if let Some(colour) = colour {
        svg.set_attr("fill", colour);
        svg.set_attr("stroke", colour);
    }
    svg.with_child(Element::new("use").with_attr("href", href))
}

fn section(open: OpenSection, end_hr: bool) -> Element {
    let OpenSection {
        rank,
        mut heading,
        content,
    } = open;
    let id = heading.id().unwrap_or("0").to_string();
    let button_id = format!("collapsible-header-{}", id);

    let dots_at = heading.children.len().saturating_sub(1);
    heading
        .children
        .insert(dots_at, icon("collapsed-dots", "#triple-dots", None).into());

    let toggle = Element::new("span")
        .with_class("toggle-button")
        .with_attr("id", format!("{}-toggle", button_id))
        .with_attr("role", "button")
        .with_attr("aria-expanded", "true")
        .with_attr("aria-label", "Toggle content visibility")
        .with_attr("aria-controls", format!("{}-content", button_id))
        .with_attr("type", "button")
        .with_child(
            Element::new("div")
                .with_class("toggle-icons")
                .with_child(icon("circle-icon", "#circle-icon", Some("var(--dark)")))
                .with_child(icon("expand-icon", "#arrow-down", Some("var(--iris)")))
                .with_child(icon("collapse-icon", "#arrow-up", Some("var(--foam)"))),
        );
    heading.children.insert(0, toggle.into());

    let mut wrapper = Element::new("section")
        .with_class("collapsible-header")
        .with_attr("id", id.clone())
        .with_attr("data-level", rank.to_string());
    if end_hr {
        wrapper.add_class("end-hr");
    }

    let body = Element::new("div")
        .with_class("collapsible-header-content")
        .with_attr("data-references", format!("{}-toggle", button_id))
        .with_attr("data-level", rank.to_string())
        .with_attr("data-heading-id", id)
        .with_children(content);

    wrapper.with_child(heading).with_child(
        Element::new("div")
            .with_class("collapsible-header-content-outer")
            .with_attr("id", format!("{}-content", button_id))
            .with_attr("aria-labelledby", button_id)
            .with_child(body),
    )
}
