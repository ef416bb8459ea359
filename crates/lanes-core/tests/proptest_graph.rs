use std::collections::HashSet;

use lanes_core::fixture::{render_graph, render_layout};
use lanes_core::{FragmentManager, GraphConfig, GraphModel, UpdateRequest};
use proptest::prelude::*;

use generators::*;

fn small_cache() -> GraphConfig {
    GraphConfig {
        layout: lanes_core::config::RowCacheConfig {
            checkpoint_interval: 3,
            window_capacity: 2,
        },
        ..GraphConfig::default()
    }
}

fn graph_lines(model: &mut GraphModel) -> Vec<String> {
    render_graph(model.graph_mut())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn layout_lines(model: &mut GraphModel) -> Vec<String> {
    render_layout(model).unwrap().lines().map(str::to_string).collect()
}

/// Replay `requests` over a copy of `before`, blanking every replaced row.
/// Rows that survive must match `after` exactly.
fn check_requests(before: &[String], requests: &[UpdateRequest], after: &[String]) {
    let mut mirror: Vec<Option<String>> = before.iter().cloned().map(Some).collect();
    for request in requests {
        assert!(request.to() <= mirror.len(), "{request:?} past {}", mirror.len());
        let fresh = request.new_to() - request.from();
        mirror.splice(
            request.from()..request.to(),
            std::iter::repeat_n(None, fresh),
        );
    }
    assert_eq!(mirror.len(), after.len(), "requests {requests:?}");
    for (index, (kept, now)) in mirror.iter().zip(after).enumerate() {
        if let Some(kept) = kept {
            assert_eq!(kept, now, "row {index} changed outside {requests:?}");
        }
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn build_is_deterministic(commits in arb_history()) {
        let mut first = GraphModel::build(commits.clone(), &GraphConfig::default()).unwrap();
        let mut second = GraphModel::build(commits, &small_cache()).unwrap();
        prop_assert_eq!(graph_lines(&mut first), graph_lines(&mut second));
        prop_assert_eq!(layout_lines(&mut first), layout_lines(&mut second));
    }

    #[test]
    fn append_matches_full_build((commits, split) in arb_split_history()) {
        let mut full = GraphModel::build(commits.clone(), &GraphConfig::default()).unwrap();
        let expected_graph = graph_lines(&mut full);
        let expected_layout = layout_lines(&mut full);

        let (head, rest) = commits.split_at(split);
        let mut model = GraphModel::build(head.to_vec(), &small_cache()).unwrap();
        let graph_before = graph_lines(&mut model);
        let layout_before = layout_lines(&mut model);

        let requests = model.append_commits_to_graph(rest.to_vec()).unwrap();
        prop_assert_eq!(requests.len(), 1);
        let request = requests[0];

        prop_assert_eq!(graph_lines(&mut model), expected_graph.clone());
        prop_assert_eq!(layout_lines(&mut model), expected_layout.clone());
        check_requests(&graph_before, &requests, &expected_graph);
        prop_assert_eq!(
            &layout_before[..request.from()],
            &expected_layout[..request.from()]
        );
    }

    #[test]
    fn hide_all_then_show_all_restores_everything(commits in arb_history()) {
        let mut model = GraphModel::build(commits, &small_cache()).unwrap();
        let graph = graph_lines(&mut model);
        let layout = layout_lines(&mut model);

        let hidden = model.hide_all().unwrap();
        let graph_hidden = graph_lines(&mut model);
        check_requests(&graph, &hidden, &graph_hidden);
        prop_assert_eq!(model.all_fragments().unwrap().iter().filter(|f| !f.is_collapsed()).count(), 0);

        let shown = model.show_all().unwrap();
        check_requests(&graph_hidden, &shown, &graph);
        prop_assert_eq!(graph_lines(&mut model), graph);
        prop_assert_eq!(layout_lines(&mut model), layout);
    }

    #[test]
    fn each_fragment_hides_and_shows_alone(commits in arb_history()) {
        let mut model = GraphModel::build(commits, &GraphConfig::default()).unwrap();
        let graph = graph_lines(&mut model);
        let layout = layout_lines(&mut model);

        for fragment in model.all_fragments().unwrap() {
            let hide = model.hide(&fragment).unwrap();
            prop_assert!(hide.added_element_count() <= 0);
            let graph_hidden = graph_lines(&mut model);
            check_requests(&graph, &[hide], &graph_hidden);
            prop_assert_eq!(
                &layout_lines(&mut model)[..hide.from()],
                &layout[..hide.from()]
            );

            let collapsed = model.fragments().collapsed_fragments().next().cloned().unwrap();
            prop_assert_eq!(collapsed.interior(), fragment.interior());
            let show = model.show(&collapsed).unwrap();
            prop_assert_eq!(show.added_element_count(), -hide.added_element_count());
            check_requests(&graph_hidden, &[show], &graph);
            prop_assert_eq!(graph_lines(&mut model), graph.clone());
            prop_assert_eq!(layout_lines(&mut model), layout.clone());
        }
    }

    #[test]
    fn fragments_are_maximal_and_disjoint(commits in arb_history()) {
        let mut model = GraphModel::build(commits, &GraphConfig::default()).unwrap();
        let fragments = model.all_fragments().unwrap();
        let manager = FragmentManager::new();
        let graph = model.graph_mut();

        let mut covered = HashSet::new();
        for fragment in &fragments {
            prop_assert!(!fragment.interior().is_empty());
            let branch = graph.node(fragment.interior()[0]).unwrap().branch;
            for &id in fragment.interior() {
                prop_assert!(covered.insert(id), "{:?} in two fragments", id);
                prop_assert!(manager.is_foldable(graph, id).unwrap());
                prop_assert_eq!(graph.node(id).unwrap().branch, branch);
            }
            for end in [fragment.up_node(), fragment.down_node()] {
                let same_branch = graph.node(end).unwrap().branch == branch;
                prop_assert!(!(same_branch && manager.is_foldable(graph, end).unwrap()));
            }
        }

        for row in 0..graph.row_count() {
            for id in graph.node_row(row).unwrap().nodes {
                if manager.is_foldable(graph, id).unwrap() {
                    prop_assert!(covered.contains(&id), "{:?} in no fragment", id);
                }
            }
        }
    }

    #[test]
    fn branch_filter_round_trips(commits in arb_history(), pick in any::<prop::sample::Index>()) {
        let mut model = GraphModel::build(commits.clone(), &small_cache()).unwrap();
        let graph = graph_lines(&mut model);
        let layout = layout_lines(&mut model);

        let head = commits[pick.index(commits.len())].hash;
        let request = model
            .set_visible_branches_nodes(Box::new(move |hash: &lanes_core::Hash| *hash == head))
            .unwrap();
        prop_assert_eq!(request.from(), 0);
        prop_assert_eq!(request.to(), graph.len());
        prop_assert_eq!(graph_lines(&mut model).len(), model.row_count());

        model.clear_visible_branches().unwrap();
        prop_assert_eq!(graph_lines(&mut model), graph);
        prop_assert_eq!(layout_lines(&mut model), layout);
    }
}
