use super::*;
use crate::config::TranscludeOverrides;

fn placeholder(slug: &str, block: Option<&str>) -> Node {
    let mut quote = Element::new("blockquote")
        .with_class("transclude")
        .with_attr("data-url", slug)
        .with_child(
            Element::new("a")
                .with_class("transclude-inner")
                .with_attr("href", format!("/{}", slug))
                .with_attr("data-slug", slug)
                .with_text(slug),
        );
    if let Some(block) = block {
        quote.set_attr("data-block", block);
    }
    quote.into()
}

fn h(rank: u8, id: &str) -> Node {
    Element::new(format!("h{}", rank))
        .with_attr("id", id)
        .with_text(id.to_uppercase())
        .into()
}

fn p(text: &str) -> Node {
    Element::new("p").with_text(text).into()
}

fn page(slug: &str, words: u64, children: Vec<Node>) -> PageData {
    PageData {
        file_path: Some(format!("content/{}.md", slug)),
        reading_time: Some(ReadingTime {
            minutes: words as f64 / 200.0,
            words,
        }),
        ..PageData::new(slug, Root::new(children))
    }
}

fn flat() -> TranscludeOptions {
    TranscludeOptions {
        dynalist: false,
        title: false,
    }
}

fn run(host: &PageData, pages: &[PageData], options: TranscludeOptions) -> TranscludeOutput {
    transclude_page(host, pages, options, &Labels::default())
}

fn placeholders(tree: &Root) -> Vec<&Element> {
    visit::find_outermost(&tree.children, &is_placeholder)
}

fn ref_fn(target: &str) -> Node {
    Element::new("sup")
        .with_child(
            Element::new("a")
                .with_attr("href", format!("#{}", target))
                .with_attr("id", format!("ref-{}", target))
                .with_attr("data-footnote-ref", "")
                .with_text("?"),
        )
        .into()
}

fn footnotes(ids: &[&str]) -> Node {
    Element::new("section")
        .with_attr("data-footnotes", "")
        .with_child(Element::new("h2").with_text("Footnotes"))
        .with_child(Element::new("ol").with_children(
            ids.iter().map(|id| Node::from(Element::new("li").with_attr("id", *id).with_text(*id))),
        ))
        .into()
}

#[test]
fn test_missing_target_left_as_placeholder() {
    let host = page("host", 10, vec![p("intro"), placeholder("missing", None)]);

    let out = run(&host, &[host.clone()], flat());

    assert_eq!(out.resolved, 0);
    assert_eq!(Some(&out.tree), host.tree.as_ref());
    assert_eq!(out.reading_time.words, 10);
}

#[test]
fn test_heading_range_boundaries() {
    let target = page(
        "notes/t",
        40,
        vec![
            h(1, "a"),
            p("a text"),
            h(2, "b"),
            p("b text"),
            h(2, "c"),
            p("c text"),
            h(1, "d"),
            p("d text"),
        ],
    );
    let tree = target.tree.as_ref().unwrap();
    assert_eq!(heading_range(tree, "b").map(<[Node]>::len), Some(2));
    assert_eq!(heading_range(tree, "a").map(<[Node]>::len), Some(6));
    assert_eq!(heading_range(tree, "d").map(<[Node]>::len), Some(2));
    assert_eq!(heading_range(tree, "nope"), None);

    let host = page(
        "host",
        10,
        vec![placeholder("notes/t", Some("#b")), placeholder("notes/t", Some("#a"))],
    );
    let out = run(&host, &[host.clone(), target], flat());

    assert_eq!(out.resolved, 2);
    let found = placeholders(&out.tree);
    let b = found[0].text_content();
    assert!(b.contains("b text"));
    assert!(!b.contains("c text"));
    let a = found[1].text_content();
    assert!(a.contains("a text") && a.contains("b text") && a.contains("c text"));
    assert!(!a.contains("d text"));

    let heading = found[0].element_children().next().unwrap();
    assert_eq!(heading.id(), Some("host_notes-t_b"));
}

#[test]
fn test_transcluded_footnotes_renumbered() {
    let target = page(
        "notes/t",
        20,
        vec![
            h(2, "sec"),
            Element::new("p").with_text("claim").with_child(ref_fn("fn-1")).into(),
            footnotes(&["fn-1"]),
        ],
    );
    let host = page(
        "host",
        30,
        vec![
            Element::new("p")
                .with_child(ref_fn("fn-1"))
                .with_child(ref_fn("fn-2"))
                .into(),
            placeholder("notes/t", Some("#sec")),
            footnotes(&["fn-1", "fn-2"]),
        ],
    );

    let out = run(&host, &[host.clone(), target], flat());

    let sections = visit::find_all(&out.tree.children, &merge::is_footnote_section);
    assert_eq!(sections.len(), 1);
    let entries: Vec<&str> = sections[0]
        .element_children()
        .find(|c| c.is("ol"))
        .unwrap()
        .element_children()
        .filter_map(Element::id)
        .collect();
    assert_eq!(entries, vec!["fn-1", "fn-2", "host_notes-t_fn-1"]);

    let refs = visit::find_all(&out.tree.children, &merge::is_footnote_ref);
    let labels: Vec<String> = refs.iter().map(|a| a.text_content()).collect();
    assert_eq!(labels, vec!["1", "2", "3"]);
    for a in refs {
        let target = a.attr("href").unwrap().trim_start_matches('#');
        assert!(entries.contains(&target), "dangling {}", target);
    }
}

#[test]
fn test_block_reference_wraps_list_item() {
    let mut target = page("notes/t", 20, vec![p("body")]);
    target.blocks.insert(
        "item".to_string(),
        Element::new("li").with_text("block text"),
    );
    let host = page("host", 10, vec![placeholder("notes/t", Some("#^item"))]);

    let out = run(&host, &[host.clone(), target], flat());

    let quote = placeholders(&out.tree)[0];
    let list = quote.element_children().next().unwrap();
    assert!(list.is("ul"));
    assert_eq!(list.text_content(), "block text");
    assert!(!quote.text_content().contains("body"));
}

#[test]
fn test_cycle_left_as_placeholder() {
    let a = page("a", 10, vec![p("from a"), placeholder("b", None)]);
    let b = page("b", 10, vec![p("from b"), placeholder("a", None)]);

    let out = run(&a, &[a.clone(), b], flat());

    assert_eq!(out.resolved, 1);
    let outer = placeholders(&out.tree)[0];
    assert!(outer.text_content().contains("from b"));
    let inner = visit::find(&outer.children, &is_placeholder).unwrap();
    assert_eq!(inner.attr("data-url"), Some("a"));
    assert_eq!(inner.element_children().count(), 1);
    assert!(!inner.text_content().contains("from a"));
}

#[test]
fn test_reading_time_counts_each_source_once() {
    let b = page("b", 50, vec![h(2, "part"), p("b body")]);
    let host = page(
        "host",
        100,
        vec![placeholder("b", None), placeholder("b", Some("#part"))],
    );

    let out = run(&host, &[host.clone(), b], flat());

    assert_eq!(out.resolved, 2);
    assert_eq!(out.reading_time.words, 150);
    assert_eq!(out.reading_time.minutes, 0.75);
}

#[test]
fn test_poem_pages_untouched() {
    let b = page("b", 50, vec![p("b body")]);
    let mut host = page("host", 10, vec![h(1, "top"), placeholder("b", None)]);
    host.poem = true;

    let out = run(&host, &[host.clone(), b], TranscludeOptions::default());

    assert_eq!(out.resolved, 0);
    assert_eq!(Some(&out.tree), host.tree.as_ref());
}

#[test]
fn test_title_and_source_link() {
    let mut b = page("notes/deep/b", 50, vec![p("b body")]);
    b.title = Some("Bee".to_string());
    b.description = Some("about bees".to_string());
    let host = page("host", 10, vec![placeholder("notes/deep/b", None)]);
    let options = TranscludeOptions {
        dynalist: false,
        title: true,
    };

    let out = run(&host, &[host.clone(), b.clone()], options);
    let quote = placeholders(&out.tree)[0];
    let children: Vec<&Element> = quote.element_children().collect();
    assert!(children[0].has_class("transclude-ref"));
    assert_eq!(children[0].attr("data-href"), Some("/notes/deep/b"));
    let metadata = children[0].text_content();
    assert!(metadata.contains("url: notes/deep/b"));
    assert!(metadata.contains("description: about bees"));
    assert!(children[1].is("h1"));
    assert_eq!(children[1].text_content(), "Bee");
    let last = children.last().unwrap();
    assert!(last.has_class("transclude-src"));
    assert_eq!(last.text_content(), "Link to original");

    let mut reflection = host.clone();
    reflection.page_layout = ContentLayout::Reflection;
    reflection.transclude = TranscludeOverrides {
        title: Some(false),
        dynalist: None,
    };
    let out = run(&reflection, &[reflection.clone(), b], options);
    let quote = placeholders(&out.tree)[0];
    assert!(visit::find(&quote.children, &|el| el.has_class("transclude-src")).is_none());
    assert!(visit::find(&quote.children, &|el| el.has_class("transclude-ref")).is_none());
    assert!(visit::find(&quote.children, &|el| el.is("h1")).is_none());
}

#[test]
fn test_untitled_page_gets_synthesized_title() {
    let b = page("b", 5, vec![p("b body")]);
    let host = page("host", 10, vec![placeholder("b", None)]);

    let out = run(&host, &[host.clone(), b], TranscludeOptions::default());

    let title = visit::find(&out.tree.children, &|el| el.is("h1")).unwrap();
    assert_eq!(title.text_content(), "Transclude of b");
}

#[test]
fn test_collapsible_headers_skip_posts() {
    let children = vec![h(2, "one"), p("text")];

    let out = run(&page("notes/x", 5, children.clone()), &[], TranscludeOptions::default());
    assert!(out.tree.children[0].as_element().unwrap().has_class("collapsible-header"));

    let out = run(&page("posts/x", 5, children.clone()), &[], TranscludeOptions::default());
    assert_eq!(out.tree.children, children);
}

#[test]
fn test_url_truncation() {
    assert_eq!(truncate_url("a/b"), "a/b");
    assert_eq!(truncate_url("a/b/c"), "a/b/c");
    assert_eq!(truncate_url("a/b/c/d"), "a/.../d");
}

#[test]
fn test_reference_kinds() {
    assert_eq!(Reference::parse(None), Reference::Page);
    assert_eq!(Reference::parse(Some("#")), Reference::Page);
    assert_eq!(Reference::parse(Some("#intro")), Reference::Heading("intro".into()));
    assert_eq!(Reference::parse(Some("#^b1")), Reference::Block("b1".into()));
}
