use super::*;
use crate::store::PageFragmentSet;

fn node(slug: &str) -> DagNode {
    DagNode::new(Slug::new(slug), PageFragmentSet::titled(slug))
}

fn dag_of(slugs: &[&str]) -> HistoryDag {
    let mut dag = HistoryDag::new();
    for slug in slugs {
        dag.add_node(node(slug));
    }
    dag
}

fn order(dag: &HistoryDag) -> Vec<String> {
    dag.ordered_slugs().into_iter().map(String::from).collect()
}

#[test]
fn test_add_is_idempotent() {
    // a slug appears at most once
    let mut dag = dag_of(&["a", "b", "a", "c", "b"]);
    assert_eq!(order(&dag), vec!["a", "b", "c"]);
    assert_eq!(dag.len(), 3);

    let canonical = dag.add_node(node("a").with_anchor("/ignored"));
    assert_eq!(canonical.anchor, None, "existing node is returned unchanged");
}

#[test]
fn test_truncate_after_middle() {
    let mut dag = dag_of(&["a", "b", "c", "d"]);
    dag.truncate_after(&Slug::new("b"));
    assert_eq!(order(&dag), vec!["a", "b"]);
    assert!(!dag.has(&Slug::new("c")));
    assert!(dag.get(&Slug::new("d")).is_none());
    assert_eq!(dag.tail().map(|n| n.slug.as_str()), Some("b"));
}

#[test]
fn test_truncate_after_absent_is_noop() {
    let mut dag = dag_of(&["a", "b", "c", "d"]);
    dag.truncate_after(&Slug::new("z"));
    assert_eq!(order(&dag), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_truncate_after_tail_is_noop() {
    let mut dag = dag_of(&["a", "b"]);
    dag.truncate_after(&Slug::new("b"));
    assert_eq!(order(&dag), vec!["a", "b"]);
}

#[test]
fn test_readding_after_truncate() {
    let mut dag = dag_of(&["a", "b", "c"]);
    dag.truncate_after(&Slug::new("a"));
    dag.add_node(node("c"));
    assert_eq!(order(&dag), vec!["a", "c"]);
    assert_eq!(dag.parent(&Slug::new("c")).map(|n| n.slug.as_str()), Some("a"));
}

#[test]
fn test_parent_edges_follow_order() {
    let dag = dag_of(&["root", "x", "y"]);
    assert!(dag.parent(&Slug::new("root")).is_none());
    assert_eq!(dag.parent(&Slug::new("y")).map(|n| n.slug.as_str()), Some("x"));
    assert_eq!(dag.position(&Slug::new("y")), Some(2));
}

#[test]
fn test_clear() {
    let mut dag = dag_of(&["a", "b"]);
    dag.clear();
    assert!(dag.is_empty());
    assert!(dag.tail().is_none());
    dag.add_node(node("b"));
    assert_eq!(order(&dag), vec!["b"]);
}

#[test]
fn test_length_matches_distinct_inserts() {
    // one entry per distinct slug
    let inputs = ["q", "w", "q", "e", "r", "w", "t", "e"];
    let dag = dag_of(&inputs);
    let mut distinct: Vec<&str> = Vec::new();
    for s in inputs {
        if !distinct.contains(&s) {
            distinct.push(s);
        }
    }
    assert_eq!(dag.ordered_nodes().len(), distinct.len());
    assert_eq!(order(&dag), distinct);
}
