//! Rebasing transcluded markup into its host page
//!
//! Relative `href`/`src` values are written relative to the target page and
//! become site-absolute paths. Element ids and same-page anchors are
//! namespaced by the (host, target) pair so the same target can be embedded
//! next to the host's own headings without id clashes. Bibliography ids are
//! site-wide citation keys and keep their names.

use url::{Position, Url};

use crate::hast::{visit, Element, Node};
use crate::slug::Slug;

/// Stand-in origin for resolving site paths
const SITE: &str = "https://site.invalid/";

const SHARED_ID_PREFIX: &str = "bib";

/// Id prefix for content of `target` embedded into `host`
pub fn namespace(host: &Slug, target: &Slug) -> String {
    format!("{}_{}_", flatten(host), flatten(target))
}

fn flatten(slug: &Slug) -> String {
    slug.as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// Namespaced form of `id`
pub fn namespaced_id(prefix: &str, id: &str) -> String {
    if id.starts_with(SHARED_ID_PREFIX) {
        id.to_string()
    } else {
        format!("{}{}", prefix, id)
    }
}

/// Normalized deep copy of `el` for embedding into `host`.
pub fn normalize_element(el: &Element, host: &Slug, target: &Slug) -> Element {
    let mut out = el.clone();
    let prefix = namespace(host, target);
    rewrite(&mut out, target, &prefix);
    let mut children = std::mem::take(&mut out.children);
    visit::walk_mut(&mut children, &mut |child| rewrite(child, target, &prefix));
    out.children = children;
    out
}

pub fn normalize_node(node: &Node, host: &Slug, target: &Slug) -> Node {
    match node {
        Node::Element(el) => Node::Element(normalize_element(el, host, target)),
        other => other.clone(),
    }
}

fn rewrite(el: &mut Element, target: &Slug, prefix: &str) {
    if let Some(id) = el.id() {
        let id = namespaced_id(prefix, id);
        el.set_attr("id", id);
    }
    for attr in ["href", "src"] {
        let Some(value) = el.attr(attr) else { continue };
        if let Some(fragment) = value.strip_prefix('#') {
            if !fragment.is_empty() {
                let anchor = format!("#{}", namespaced_id(prefix, fragment));
                el.set_attr(attr, anchor);
            }
        } else if let Some(rebased) = rebase(value, target) {
            el.set_attr(attr, rebased);
        }
    }
}

/// Site-absolute form of a link written relative to `target`. `None` for
/// values that are already absolute or site-absolute.
pub fn rebase(value: &str, target: &Slug) -> Option<String> {
    if value.is_empty() || value.starts_with('/') {
        return None;
    }
    if !matches!(Url::parse(value), Err(url::ParseError::RelativeUrlWithoutBase)) {
        return None;
    }
    let base = Url::parse(SITE).ok()?.join(&target.path()).ok()?;
    let resolved = base.join(value).ok()?;
    Some(resolved[Position::BeforePath..].to_string())
}
