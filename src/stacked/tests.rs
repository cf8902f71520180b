use super::*;
use crate::testing::{page_document, BrowserCall, Harness};
use futures::executor::block_on;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn slugs(names: &[&str]) -> Vec<Slug> {
    names.iter().map(|s| Slug::new(s)).collect()
}

fn garden(location: &str) -> Harness {
    garden_with_viewport(location, 1600.0)
}

fn garden_with_viewport(location: &str, viewport: f64) -> Harness {
    let h = Harness::with_viewport(location, page_document("Home", "welcome"), viewport);
    for (name, title) in [("b", "Beta"), ("c", "Gamma"), ("d", "Delta"), ("e", "Epsilon")] {
        h.page(&format!("https://g.test/{}", name), title, &format!("{} body", name));
    }
    h
}

fn stack_params(location: &Url) -> Vec<String> {
    location
        .query_pairs()
        .filter(|(k, _)| k == "stackedNotes")
        .map(|(_, v)| v.into_owned())
        .collect()
}

#[test]
fn test_open_roots_stack_at_current_page() {
    let h = garden("https://g.test/");

    assert!(block_on(h.stacked.open()));

    assert!(h.stacked.is_active());
    assert!(h.column.active.get());
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index"]));
    assert_eq!(h.column.mounted(), slugs(&["index"]));
    assert_eq!(stack_params(&h.browser.location()), vec!["aW5kZXg"]);
    assert_eq!(h.log().last().map(String::as_str), Some("nav:index"));
    // root content came from the page on screen, not the network
    assert!(!h.fetcher.log().contains(&"https://g.test/".to_string()));
}

#[test]
fn test_open_restores_params_in_order() {
    let h = garden("https://g.test/?stackedNotes=Yg&stackedNotes=%21%21&stackedNotes=Yw");
    // b resolves last; order still follows the parameters
    let gate = h.fetcher.gate("https://g.test/b");

    let opened = block_on(async {
        let (opened, _) = futures::join!(h.stacked.open(), async { gate.send(()).unwrap() });
        opened
    });

    assert!(opened);
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b", "c"]));
    assert_eq!(
        stack_params(&h.browser.location()),
        vec!["aW5kZXg", "Yg", "Yw"]
    );
}

#[test]
fn test_params_skip_pages_without_content() {
    // "bWlzc2luZw" is "missing", which 404s
    let h = garden("https://g.test/?stackedNotes=bWlzc2luZw&stackedNotes=Yg");

    block_on(h.stacked.open());

    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b"]));
}

#[test]
fn test_append_and_branch() {
    let h = garden("https://g.test/");
    block_on(h.stacked.open());

    let index = Some(Slug::new("index"));
    let b = Some(Slug::new("b"));

    block_on(h.stacked.add(url("https://g.test/b"), index.clone(), AddMode::Branch));
    block_on(h.stacked.add(url("https://g.test/c"), b.clone(), AddMode::Append));
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b", "c"]));

    // branching from b drops everything after it
    block_on(h.stacked.add(url("https://g.test/d"), b, AddMode::Branch));
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b", "d"]));
    assert_eq!(h.column.mounted(), slugs(&["index", "b", "d"]));

    // appending never truncates, whatever the origin
    block_on(h.stacked.add(url("https://g.test/e"), index, AddMode::Append));
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b", "d", "e"]));
}

#[test]
fn test_open_note_is_focused_not_duplicated() {
    let h = garden("https://g.test/");
    block_on(h.stacked.open());
    block_on(h.stacked.add(url("https://g.test/b"), None, AddMode::Branch));
    block_on(h.stacked.add(url("https://g.test/c"), None, AddMode::Branch));
    h.clear_log();

    let outcome = block_on(h.stacked.add(
        url("https://g.test/b"),
        Some(Slug::new("c")),
        AddMode::Branch,
    ));

    assert_eq!(outcome, AddOutcome::Focused);
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b", "c"]));
    assert_eq!(h.column.focused(), slugs(&["b"]));
    assert_eq!(h.log(), vec!["nav:b"]);
}

#[test]
fn test_failed_fetch_keeps_truncated_stack() {
    let h = garden("https://g.test/");
    block_on(h.stacked.open());
    block_on(h.stacked.add(url("https://g.test/b"), None, AddMode::Branch));
    block_on(h.stacked.add(url("https://g.test/c"), None, AddMode::Branch));

    let outcome = block_on(h.stacked.add(
        url("https://g.test/missing"),
        Some(Slug::new("b")),
        AddMode::Branch,
    ));

    assert_eq!(outcome, AddOutcome::Failed);
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b"]));
}

#[test]
fn test_chain_lists_open_notes() {
    let h = garden("https://g.test/");
    block_on(h.stacked.open());
    block_on(h.stacked.add(url("https://g.test/b"), None, AddMode::Branch));

    assert_eq!(h.stacked.chain(), "stackedNotes=aW5kZXg&stackedNotes=Yg");
}

#[test]
fn test_fragment_scrolls_inside_new_panel() {
    let h = garden("https://g.test/");
    block_on(h.stacked.open());

    block_on(h.stacked.navigate(url("https://g.test/b#usage"), None, AddMode::Branch));

    assert_eq!(
        h.column.fragment_scrolls(),
        vec![(Slug::new("b"), "usage".to_string())]
    );
    assert_eq!(h.log().last().map(String::as_str), Some("nav:b"));
}

#[test]
fn test_navigate_while_inactive_opens_first() {
    let h = garden("https://g.test/");

    let outcome = block_on(h.stacked.navigate(url("https://g.test/b"), None, AddMode::Branch));
    assert_eq!(outcome, AddOutcome::Added);
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b"]));

    let h = garden("https://g.test/");
    let outcome = block_on(h.stacked.navigate(url("https://g.test/"), None, AddMode::Branch));
    assert_eq!(outcome, AddOutcome::Opened);
    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index"]));
}

#[test]
fn test_destroy_strips_param_and_runs_cleanups() {
    let h = garden("https://g.test/?theme=dark");
    block_on(h.stacked.open());
    block_on(h.stacked.add(url("https://g.test/b"), None, AddMode::Branch));
    h.add_cleanup("panel-listeners");

    h.stacked.destroy();

    assert!(!h.stacked.is_active());
    assert!(!h.column.active.get());
    assert!(h.column.mounted().is_empty());
    assert!(h.stacked.ordered_slugs().is_empty());
    assert_eq!(
        h.browser.calls().last(),
        Some(&BrowserCall::Replace("https://g.test/?theme=dark".into()))
    );
    assert!(h.log().contains(&"cleanup:panel-listeners".to_string()));
    assert!(h.cleanup.is_empty());
}

#[test]
fn test_toggle_round_trip() {
    let h = garden("https://g.test/");
    assert!(block_on(h.stacked.toggle()));
    assert!(!block_on(h.stacked.toggle()));
    assert!(!h.stacked.is_active());
}

#[test]
fn test_mobile_shows_only_tail() {
    let h = garden_with_viewport("https://g.test/", 600.0);
    block_on(h.stacked.open());

    block_on(h.stacked.navigate(url("https://g.test/b"), None, AddMode::Branch));

    assert_eq!(h.stacked.ordered_slugs(), slugs(&["index", "b"]));
    assert_eq!(h.column.mounted(), slugs(&["b"]));
}

#[test]
fn test_layout_updates_coalesce_per_frame() {
    let h = garden("https://g.test/");
    block_on(h.stacked.open());

    // render already queued one layout pass
    assert!(!h.stacked.schedule_layout());
    assert!(!h.stacked.schedule_layout());

    h.column.run_frames();
    assert_eq!(h.column.states().len(), 1);
    assert_eq!(h.column.scrolled_to_end.get(), 1);

    assert!(h.stacked.schedule_layout());
    assert_eq!(h.column.pending_frames(), 1);
}

#[test]
fn test_panels_pinned_and_links_marked() {
    let h = garden("https://g.test/");
    block_on(h.stacked.open());
    block_on(h.stacked.navigate(url("https://g.test/b"), None, AddMode::Branch));

    assert_eq!(h.column.right_of("index"), Some(-540.0));
    assert_eq!(h.column.right_of("b"), Some(-580.0));
    assert_eq!(h.column.width.get(), 1240.0);
    assert_eq!(h.column.marked(), slugs(&["index", "b"]));
}

#[test]
fn test_strip_param_keeps_other_pairs() {
    let mut u = url("https://g.test/x?a=1&stackedNotes=Yg&b=2&stackedNotes=Yw");
    strip_param(&mut u, "stackedNotes");
    assert_eq!(u.as_str(), "https://g.test/x?a=1&b=2");

    let mut u = url("https://g.test/x?stackedNotes=Yg");
    strip_param(&mut u, "stackedNotes");
    assert_eq!(u.as_str(), "https://g.test/x");
}
