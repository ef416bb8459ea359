//! Fragment listing, branch filtering and their interplay with hiding.

use lanes_core::fixture::{parse_commits, render_graph, render_layout};
use lanes_core::{GraphConfig, GraphElement, GraphModel, Hash, UpdateRequest};

const TWO_HEADS: &str = "\
c0|-c2
d0|-d1
d1|-c3
c2|-c3
c3|-
";

const LINEAR: &str = "\
a0|-a1
a1|-a2
a2|-a3
a3|-
";

fn model(text: &str) -> GraphModel {
    GraphModel::build(parse_commits(text).expect("parse"), &GraphConfig::default())
        .expect("build")
}

fn request(from: usize, to: usize, added: isize) -> UpdateRequest {
    UpdateRequest::new(from, to, added).expect("request")
}

fn hash(text: &str) -> Hash {
    text.parse().expect("hash")
}

fn keep(heads: &[&str]) -> lanes_core::NodePredicate {
    let heads: Vec<Hash> = heads.iter().map(|h| hash(h)).collect();
    Box::new(move |candidate: &Hash| heads.contains(candidate))
}

#[test]
fn two_heads_layout() {
    let mut model = model(TWO_HEADS);
    assert_eq!(
        render_layout(&mut model).expect("render"),
        "c0\nc0:c2 d0\nc0:c2 d1\nc2 d1:c3\nc3"
    );
}

#[test]
fn filter_keeps_selected_ancestry() {
    let mut model = model(TWO_HEADS);
    let request_c0 = model.set_visible_branches_nodes(keep(&["c0"])).expect("filter");
    assert_eq!(request_c0, request(0, 5, -2));
    assert_eq!(render_layout(&mut model).expect("render"), "c0\nc2\nc3");

    let request_d0 = model.set_visible_branches_nodes(keep(&["d0"])).expect("filter");
    assert_eq!(request_d0, request(0, 3, 0));
    assert_eq!(render_layout(&mut model).expect("render"), "d0\nd1\nc3");

    let cleared = model.clear_visible_branches().expect("clear");
    assert_eq!(cleared, request(0, 3, 2));
    assert_eq!(model.row_count(), 5);
}

#[test]
fn filter_with_no_match_hides_everything() {
    let mut model = model(TWO_HEADS);
    let request = model.set_visible_branches_nodes(keep(&[])).expect("filter");
    assert_eq!(request, UpdateRequest::new(0, 5, -5).expect("request"));
    assert_eq!(model.row_count(), 0);
    assert!(model.cell_row(0).is_err());
}

#[test]
fn filter_expands_collapsed_fragments_first() {
    let mut model = model(LINEAR);
    assert_eq!(model.hide_all().expect("hide all"), vec![request(0, 4, -2)]);
    assert_eq!(model.row_count(), 2);

    let request = model.set_visible_branches_nodes(keep(&["a0"])).expect("filter");
    assert_eq!(request, UpdateRequest::new(0, 2, 2).expect("request"));
    assert_eq!(model.fragments().collapsed_fragments().count(), 0);
    assert_eq!(render_layout(&mut model).expect("render"), "a0\na1\na2\na3");
}

#[test]
fn filtered_side_branch_makes_merge_parent_foldable() {
    // b1 joins the a-line at a2; with b0 filtered out, a2 has one child.
    let mut model = model("a0|-a1\nb0|-b1\na1|-a2\nb1|-a2\na2|-a3\na3|-\n");
    let a2 = model
        .graph_mut()
        .commit_node(&hash("a2"))
        .expect("lookup")
        .expect("present");
    assert_eq!(model.relate_fragment(GraphElement::Node(a2)).expect("relate"), None);

    model.set_visible_branches_nodes(keep(&["a0"])).expect("filter");
    let fragment = model
        .relate_fragment(GraphElement::Node(a2))
        .expect("relate")
        .expect("a2 is interior now");
    assert_eq!(fragment.interior().len(), 2);
}

#[test]
fn fragment_listing_covers_expanded_and_collapsed() {
    let mut model = model(
        "\
a0|-a3 a1
a1|-a2 a4
a2|-a3 a5 a8
a3|-a6
a4|-a7
a5|-a7
a6|-a7
a7|-
a8|-
",
    );
    let listed = model.all_fragments().expect("fragments");
    let interiors: Vec<String> = listed
        .iter()
        .map(|fragment| {
            let id = fragment.interior()[0];
            model.graph_mut().node(id).expect("node").hash.to_string()
        })
        .collect();
    assert_eq!(interiors, vec!["a4", "a5", "a6"]);

    model.hide(&listed[0]).expect("hide");
    let listed = model.all_fragments().expect("fragments");
    assert_eq!(listed.len(), 3);
    assert_eq!(listed.iter().filter(|f| f.is_collapsed()).count(), 1);
}

#[test]
fn linear_history_collapses_to_endpoints() {
    let mut model = model(LINEAR);
    let a1 = model.element_at(1, 0).expect("row").expect("column");
    let fragment = model.relate_fragment(a1).expect("relate").expect("fragment");
    assert_eq!(fragment.interior().len(), 2);

    assert_eq!(model.hide(&fragment).expect("hide"), request(0, 4, -2));
    assert_eq!(render_graph(model.graph_mut()).expect("render"), "a0>=a3\na3");
    assert_eq!(render_layout(&mut model).expect("render"), "a0\na3");

    let edge = hide_edge(&mut model);
    let collapsed = model
        .relate_fragment(edge)
        .expect("relate")
        .expect("collapsed");
    assert_eq!(collapsed.interior(), fragment.interior());
    assert_eq!(model.show(&collapsed).expect("show"), request(0, 2, 2));
    assert_eq!(render_layout(&mut model).expect("render"), "a0\na1\na2\na3");
}

/// The only edge drawn below a0.
fn hide_edge(model: &mut GraphModel) -> GraphElement {
    let a0 = model.node_row(0).expect("row").nodes[0];
    let edges = model.graph_mut().down_edges(a0).expect("edges");
    GraphElement::Edge(edges[0])
}

#[test]
fn hidden_usual_edge_does_not_relate() {
    let mut model = model(LINEAR);
    let a0 = model.node_row(0).expect("row").nodes[0];
    let first_edge = model.graph_mut().down_edges(a0).expect("edges")[0];
    model.hide_all().expect("hide all");
    assert_eq!(
        model.relate_fragment(GraphElement::Edge(first_edge)).expect("relate"),
        None
    );
}

#[test]
fn truncated_history_fragment_ends_at_unresolved_node() {
    let mut model = model("a0|-a1\na1|-a2\na2|-a3\n");
    let listed = model.all_fragments().expect("fragments");
    assert_eq!(listed.len(), 1);
    let down = model.graph_mut().node(listed[0].down_node()).expect("node");
    assert_eq!(down.hash.to_string(), "a3");
    assert_eq!(down.kind, lanes_core::NodeKind::Unresolved);

    // Appending the missing parent keeps the hidden fragment intact.
    model.hide(&listed[0]).expect("hide");
    model
        .append_commits_to_graph(parse_commits("a3|-\n").expect("parse"))
        .expect("append");
    assert_eq!(render_graph(model.graph_mut()).expect("render"), "a0>=a3\na3");
}

#[test]
fn foldability_follows_visibility() {
    let mut model = model(LINEAR);
    let nodes: Vec<_> = (0..4)
        .map(|row| model.node_row(row).expect("row").nodes[0])
        .collect();
    let manager = lanes_core::FragmentManager::new();
    let foldable: Vec<bool> = nodes
        .iter()
        .map(|&id| manager.is_foldable(model.graph_mut(), id).expect("lookup"))
        .collect();
    assert_eq!(foldable, vec![false, true, true, false]);

    model.hide_all().expect("hide all");
    assert!(!manager.is_foldable(model.graph_mut(), nodes[1]).expect("lookup"));
}

#[test]
fn batch_operations_with_nothing_to_do() {
    let mut model = model("a0|-a1 a2\na1|-\na2|-\n");
    assert!(model.all_fragments().expect("fragments").is_empty());
    assert!(model.hide_all().expect("hide all").is_empty());
    assert!(model.show_all().expect("show all").is_empty());
    assert_eq!(model.row_count(), 3);
}

/// Two side branches from 00 that both end at the missing parent f5.
const PARALLEL: &str = "\
00|-03 01
01|-f5
02|-
03|-f5
";

#[test]
fn parallel_fragments_hide_and_show_independently() {
    let mut model = model(PARALLEL);
    let graph = render_graph(model.graph_mut()).expect("render");
    let layout = render_layout(&mut model).expect("render");
    assert_eq!(graph, "00>03,01\n01>f5\n02\n03>f5\nf5?");

    let listed = model.all_fragments().expect("fragments");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].up_node(), listed[1].up_node());
    assert_eq!(listed[0].down_node(), listed[1].down_node());

    assert_eq!(model.hide(&listed[0]).expect("hide"), request(0, 5, -1));
    assert_eq!(model.hide(&listed[1]).expect("hide"), request(0, 4, -1));
    assert_eq!(model.fragments().collapsed_fragments().count(), 2);
    assert_eq!(
        render_graph(model.graph_mut()).expect("render"),
        "00>=f5,=f5\n02\nf5?"
    );

    // Each hide edge stands for its own fragment.
    let top = model.node_row(0).expect("row").nodes[0];
    let edges = model.graph_mut().down_edges(top).expect("edges");
    assert_eq!(edges.len(), 2);
    for (edge, fragment) in edges.into_iter().zip(&listed) {
        let related = model
            .relate_fragment(GraphElement::Edge(edge))
            .expect("relate")
            .expect("collapsed");
        assert_eq!(related.interior(), fragment.interior());
    }

    let collapsed: Vec<_> = model.fragments().collapsed_fragments().cloned().collect();
    assert_eq!(model.show(&collapsed[0]).expect("show"), request(0, 3, 1));
    assert_eq!(model.show(&collapsed[1]).expect("show"), request(0, 4, 1));
    assert_eq!(render_graph(model.graph_mut()).expect("render"), graph);
    assert_eq!(render_layout(&mut model).expect("render"), layout);
}

#[test]
fn parallel_fragments_survive_hide_all_and_show_all() {
    let mut model = model(PARALLEL);
    let graph = render_graph(model.graph_mut()).expect("render");
    let layout = render_layout(&mut model).expect("render");

    assert_eq!(model.hide_all().expect("hide all"), vec![request(0, 5, -2)]);
    assert_eq!(model.row_count(), 3);
    assert_eq!(model.show_all().expect("show all"), vec![request(0, 3, 2)]);
    assert_eq!(model.row_count(), 5);
    assert_eq!(render_graph(model.graph_mut()).expect("render"), graph);
    assert_eq!(render_layout(&mut model).expect("render"), layout);

    // Hide edges are reused once their fragments are shown again.
    assert_eq!(model.hide_all().expect("hide all"), vec![request(0, 5, -2)]);
    assert_eq!(model.show_all().expect("show all"), vec![request(0, 3, 2)]);
    assert_eq!(render_graph(model.graph_mut()).expect("render"), graph);
}
