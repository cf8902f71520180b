//! Markup for one stacked panel.

use chrono::SecondsFormat;

use crate::content_index::ContentDetails;
use crate::dag::DagNode;
use crate::hast::{visit, Element, Node};
use crate::slug::Slug;

use super::layout::PanelOffset;

pub const PANEL_CLASS: &str = "stacked-note";

/// Build the panel for `node` at column position `offset`.
///
/// ```text
/// div.stacked-note#<hash>[data-slug]
///   div.stacked-content
///     ...content roots
///     div.published        (only when the index knows a date)
///   div.stacked-title
/// ```
pub fn build_panel(
    node: &DagNode,
    offset: PanelOffset,
    details: Option<&ContentDetails>,
    open: &[Slug],
) -> Element {
    let mut content = Element::new("div")
        .with_class("stacked-content")
        .with_children(node.contents.contents.iter().cloned().map(Node::Element));

    if let Some(published) = details.and_then(published_line) {
        content.children.push(published.into());
    }

    mark_open_links(&mut content.children, open);

    Element::new("div")
        .with_class(PANEL_CLASS)
        .with_attr("id", node.canonical_hash().as_str())
        .with_attr("data-slug", node.slug.as_str())
        .with_attr("style", format!("left: {}px;", offset.left))
        .with_child(content)
        .with_child(Element::new("div").with_class("stacked-title").with_text(node.title.clone()))
}

/// "last edited <date> (N min read)"
pub fn published_line(details: &ContentDetails) -> Option<Element> {
    let date = details.parsed_date()?;
    let minutes = details
        .reading_time
        .map(|rt| rt.minutes.ceil().max(1.0) as u64)
        .unwrap_or(1);

    let time = Element::new("time")
        .with_attr("datetime", date.to_rfc3339_opts(SecondsFormat::Millis, true))
        .with_text(date.format("%b %d, %Y").to_string());

    let span = Element::new("span")
        .with_class("metadata")
        .with_attr("lang", "en")
        .with_attr("dir", "auto")
        .with_text("last edited ")
        .with_child(time)
        .with_text(format!(" ({} min read)", minutes));

    Some(Element::new("div").with_class("published").with_child(span))
}

/// Toggle the `dag` class on internal links by whether their target is open.
pub fn mark_open_links(nodes: &mut [Node], open: &[Slug]) {
    visit::walk_mut(nodes, &mut |el| {
        if !(el.is("a") && el.has_class("internal")) {
            return;
        }
        let is_open = el
            .attr("data-slug")
            .map(|s| open.contains(&Slug::new(s)))
            .unwrap_or(false);
        if is_open {
            el.add_class("dag");
        } else {
            el.remove_class("dag");
        }
    });
}
