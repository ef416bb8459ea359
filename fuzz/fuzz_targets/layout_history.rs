#![no_main]

use lanes_core::fixture::{parse_commits, render_graph, render_layout};
use lanes_core::{GraphConfig, GraphModel};
use libfuzzer_sys::fuzz_target;

// Any history that parses and builds must lay out, collapse and expand
// without errors, and expanding must restore the original rows.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(commits) = parse_commits(text) else {
        return;
    };
    let Ok(mut model) = GraphModel::build(commits, &GraphConfig::default()) else {
        return;
    };

    let layout = render_layout(&mut model).unwrap();
    let graph = render_graph(model.graph_mut()).unwrap();
    model.hide_all().unwrap();
    render_layout(&mut model).unwrap();
    model.show_all().unwrap();
    assert_eq!(render_layout(&mut model).unwrap(), layout);
    assert_eq!(render_graph(model.graph_mut()).unwrap(), graph);
});
