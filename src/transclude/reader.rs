//! Reader view
//!
//! A distraction-free copy of a transcluded page: singletons and
//! transclusion chrome removed, references merged under a `-reader` suffix
//! so the copy can live in the same document as the original, syntax theme
//! styling dropped.

use crate::hast::{visit, Element, Root};

use super::merge::{is_citation, is_footnote_ref, merge_isomorphic};

const SUFFIX: &str = "reader";

fn is_chrome(el: &Element) -> bool {
    el.has_attr("data-singleton")
        || el.has_class("transclude-ref")
        || (el.is("a") && el.has_class("transclude-src"))
}

pub fn reader_view(tree: &Root) -> Root {
    let mut root = tree.clone();

    visit::retain(&mut root.children, &mut |el| !is_chrome(el));
    merge_isomorphic(&mut root, Some(SUFFIX));

    let tagged = |id: &str| format!("{}-{}", id, SUFFIX);
    visit::walk_mut(&mut root.children, &mut |el| {
        if el.is("a") && el.has_class("internal") {
            el.set_attr("class", "internal");
            el.set_attr("data-no-popover", "true");
        }

        if el.is("code") || el.is("pre") {
            el.remove_attr("data-theme");
            let style = el.attr("style").map(|style| {
                style
                    .split(';')
                    .map(str::trim)
                    .filter(|decl| !decl.is_empty() && !decl.starts_with("--shiki"))
                    .collect::<Vec<_>>()
                    .join("; ")
            });
            match style {
                Some(style) if style.is_empty() => {
                    el.remove_attr("style");
                }
                Some(style) => el.set_attr("style", style),
                None => {}
            }
        }

        if el.heading_rank().is_some() {
            if let Some(id) = el.id().map(&tagged) {
                el.set_attr("id", id);
                el.set_attr("data-reader", "true");
                visit::walk_mut(&mut el.children, &mut |inner| {
                    if is_footnote_ref(inner) || is_citation(inner) {
                        return;
                    }
                    let anchor = inner
                        .attr("href")
                        .and_then(|h| h.strip_prefix('#'))
                        .filter(|frag| !frag.is_empty())
                        .map(&tagged);
                    if let Some(frag) = anchor {
                        inner.set_attr("href", format!("#{}", frag));
                    }
                });
            }
        }
    });

    root
}
