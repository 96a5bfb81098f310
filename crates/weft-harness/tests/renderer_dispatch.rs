//! Mount, patch and unmount dispatch of the reconciler.

use weft_harness::{HostOp, MemoryHost};
use weft_render::{NodeId, RenderError, Renderer, VNode};

fn setup() -> (Renderer<MemoryHost>, NodeId) {
    let renderer = Renderer::new(MemoryHost::new());
    let root = renderer.host().root();
    (renderer, root)
}

#[test]
fn mount_creates_children_props_then_inserts() {
    let (mut r, root) = setup();
    let tree = VNode::element("div")
        .prop("id", "app")
        .child(VNode::element("p").text_child("hello"))
        .child(VNode::text("tail"));
    let stats = r.render(Some(tree), root).unwrap();

    assert_eq!(stats.created, 3);
    assert_eq!(stats.props, 1);
    let div = r.host().children(root)[0];
    assert_eq!(r.host().tag(div), Some("div"));
    assert_eq!(r.host().attr(div, "id"), Some("app"));
    assert_eq!(r.host().serialize(div), "<p>hello</p>tail");
    // The element reaches its parent only after its subtree is built.
    assert!(matches!(
        r.host().ops().last(),
        Some(HostOp::Insert { parent, .. }) if *parent == root.raw()
    ));
}

#[test]
fn prop_diff_sets_changed_and_clears_removed() {
    let (mut r, root) = setup();
    r.render(
        Some(VNode::element("a").prop("href", "/x").prop("title", "t")),
        root,
    )
    .unwrap();
    let stats = r
        .render(
            Some(VNode::element("a").prop("href", "/y").prop("title", "t")),
            root,
        )
        .unwrap();
    assert_eq!(stats.props, 1);

    let stats = r
        .render(Some(VNode::element("a").prop("href", "/y")), root)
        .unwrap();
    assert_eq!(stats.props, 1);
    assert_eq!(stats.created, 0);
    let a = r.host().children(root)[0];
    assert_eq!(r.host().attr(a, "title"), None);
    assert_eq!(r.host().attr(a, "href"), Some("/y"));
}

#[test]
fn unchanged_text_is_not_rewritten() {
    let (mut r, root) = setup();
    r.render(Some(VNode::fragment([VNode::text("a")])), root)
        .unwrap();
    let stats = r
        .render(Some(VNode::fragment([VNode::text("a")])), root)
        .unwrap();
    assert!(stats.is_noop());
    let stats = r
        .render(Some(VNode::fragment([VNode::text("b")])), root)
        .unwrap();
    assert_eq!(stats.text_updates, 1);
    assert_eq!(r.host().serialize(root), "b");
}

#[test]
fn kind_change_replaces_in_place() {
    let (mut r, root) = setup();
    let list = |middle: VNode| {
        VNode::element("ul").children([
            VNode::element("li").key(1).text_child("a"),
            middle.key(2),
            VNode::element("li").key(3).text_child("c"),
        ])
    };
    r.render(Some(list(VNode::element("li").text_child("b"))), root)
        .unwrap();
    let stats = r
        .render(Some(list(VNode::element("p").text_child("B"))), root)
        .unwrap();
    assert_eq!((stats.created, stats.removed, stats.moved), (1, 1, 0));
    let ul = r.host().children(root)[0];
    assert_eq!(r.host().serialize(ul), "<li>a</li><p>B</p><li>c</li>");
}

#[test]
fn children_switch_between_text_and_nodes() {
    let (mut r, root) = setup();
    r.render(Some(VNode::element("div").text_child("plain")), root)
        .unwrap();
    r.render(
        Some(VNode::element("div").children([VNode::element("b").text_child("x")])),
        root,
    )
    .unwrap();
    let div = r.host().children(root)[0];
    assert_eq!(r.host().serialize(div), "<b>x</b>");

    let stats = r
        .render(Some(VNode::element("div").text_child("again")), root)
        .unwrap();
    assert_eq!(stats.removed, 1);
    assert_eq!(r.host().serialize(div), "again");

    r.render(Some(VNode::element("div")), root).unwrap();
    assert_eq!(r.host().serialize(div), "");
}

#[test]
fn fragment_children_live_in_the_container() {
    let (mut r, root) = setup();
    let tree = |items: &[&str]| {
        VNode::element("div").children([
            VNode::text("[").key("open"),
            VNode::fragment(items.iter().map(|s| VNode::text(*s).key(*s))).key("body"),
            VNode::text("]").key("close"),
        ])
    };
    r.render(Some(tree(&["a", "b"])), root).unwrap();
    let div = r.host().children(root)[0];
    assert_eq!(r.host().serialize(div), "[ab]");

    r.render(Some(tree(&["b", "a", "c"])), root).unwrap();
    assert_eq!(r.host().serialize(div), "[bac]");

    r.render(Some(tree(&[])), root).unwrap();
    assert_eq!(r.host().serialize(div), "[]");
}

#[test]
fn render_none_unmounts() {
    let (mut r, root) = setup();
    r.render(
        Some(VNode::fragment([VNode::text("a"), VNode::comment("c")])),
        root,
    )
    .unwrap();
    let stats = r.render(None, root).unwrap();
    assert_eq!(stats.removed, 2);
    assert!(r.host().children(root).is_empty());
    assert!(r.mounted(root).is_none());
}

#[test]
fn component_nodes_are_rejected() {
    let (mut r, root) = setup();
    let err = r
        .render(Some(VNode::element("div").child(VNode::component("App"))), root)
        .unwrap_err();
    assert_eq!(
        err,
        RenderError::UnsupportedNode {
            kind: "component `App`".to_owned()
        }
    );
    assert!(r.host().ops().is_empty());
    assert!(r.mounted(root).is_none());
}

#[test]
fn rejected_tree_leaves_the_previous_render_in_place() {
    let (mut r, root) = setup();
    let tree = |extra: Option<VNode>| {
        let div = VNode::element("div").child(VNode::element("p").text_child("a"));
        match extra {
            Some(node) => div.child(node),
            None => div,
        }
    };
    r.render(Some(tree(None)), root).unwrap();
    let div = r.host().children(root)[0];
    let ops = r.host().ops().len();

    let err = r
        .render(Some(tree(Some(VNode::component("X")))), root)
        .unwrap_err();
    assert!(matches!(err, RenderError::UnsupportedNode { .. }));
    assert_eq!(r.host().ops().len(), ops);
    assert!(r.mounted(root).is_some());

    let stats = r.render(Some(tree(None)), root).unwrap();
    assert!(stats.is_noop(), "unexpected host work: {stats:?}");
    assert_eq!(r.host().children(root).to_vec(), vec![div]);
    assert_eq!(r.host().serialize(root), "<div><p>a</p></div>");
}

#[test]
fn fragment_with_text_children_is_rejected_before_mounting() {
    let (mut r, root) = setup();
    let bad = VNode::fragment([]).text_child("loose");
    let err = r
        .render(Some(VNode::element("div").child(VNode::text("x")).child(bad)), root)
        .unwrap_err();
    assert!(matches!(err, RenderError::UnsupportedNode { .. }));
    assert!(r.host().children(root).is_empty());
}

#[test]
fn patching_an_unmounted_node_fails() {
    let (mut r, root) = setup();
    let never_mounted = VNode::element("div");
    let err = r
        .patch(Some(&never_mounted), &VNode::element("div"), root, None)
        .unwrap_err();
    assert_eq!(err, RenderError::NotMounted { kind: "element" });
}
