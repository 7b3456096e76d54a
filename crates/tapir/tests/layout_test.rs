use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tapir::{
    CancellationToken, CompoundFdpLayout, CompoundFdpOptions, CompoundGraph, Error,
    InnerLayoutType, IterationReport, LayoutResult, Phase, Point, Size, Thickness, Vector,
    VertexAttributes, VertexSnapshot,
};

fn sized(graph: &CompoundGraph, w: f64, h: f64) -> VertexAttributes {
    graph
        .nodes()
        .fold(VertexAttributes::new(), |attrs, id| attrs.size(id, w, h))
}

fn nested() -> CompoundGraph {
    // outer
    // ├── inner
    // │   ├── a
    // │   └── b
    // └── c
    // d, e (e hangs off d)
    let mut g: CompoundGraph = CompoundGraph::new();
    g.ensure_node("outer");
    g.add_child_vertex("outer", "inner").unwrap();
    g.add_child_vertex_range("inner", ["a", "b"]).unwrap();
    g.add_child_vertex("outer", "c").unwrap();
    g.set_edge("a", "c");
    g.set_edge("b", "d");
    g.set_edge("c", "d");
    g.set_edge("d", "e");
    g
}

fn nested_attrs(g: &CompoundGraph) -> VertexAttributes {
    sized(g, 20.0, 10.0)
        .border("outer", Thickness::new(4.0, 12.0, 4.0, 4.0))
        .border("inner", Thickness::uniform(2.0))
}

fn run_with_reports(layout: &mut CompoundFdpLayout) -> (LayoutResult, Vec<IterationReport>) {
    let mut reports: Vec<IterationReport> = Vec::new();
    let mut observer = |r: &IterationReport| reports.push(r.clone());
    let result = layout.run(Some(&mut observer)).unwrap();
    (result, reports)
}

#[test]
fn same_seed_gives_bit_identical_positions() {
    let g = nested();
    let attrs = nested_attrs(&g);
    let opts = CompoundFdpOptions {
        random_seed: 42,
        ..Default::default()
    };

    let a = tapir::layout(&g, &attrs, &opts).unwrap();
    let b = tapir::layout(&g, &attrs, &opts).unwrap();
    assert_eq!(a, b);
    assert!(!a.cancelled);
    assert_eq!(a.positions.len(), 7);

    let other = CompoundFdpOptions {
        random_seed: 43,
        ..opts
    };
    let c = tapir::layout(&g, &attrs, &other).unwrap();
    assert_ne!(a.positions, c.positions);
}

#[test]
fn lone_vertex_does_not_move() {
    let mut g: CompoundGraph = CompoundGraph::new();
    g.ensure_node("a");
    let attrs = VertexAttributes::new()
        .size("a", 10.0, 10.0)
        .position("a", 10.0, 20.0);
    let result = tapir::layout(&g, &attrs, &CompoundFdpOptions::default()).unwrap();
    assert_eq!(result.positions["a"], Point::new(10.0, 20.0));

    // Same without an initial position: wherever it lands, it stays.
    let attrs = VertexAttributes::new().size("a", 10.0, 10.0);
    let mut layout = CompoundFdpLayout::new(&g, &attrs, &CompoundFdpOptions::default()).unwrap();
    let start = layout.position_of("a").unwrap();
    let result = layout.run(None).unwrap();
    assert_eq!(result.positions["a"], start);
}

#[test]
fn two_connected_vertices_settle_near_the_ideal_length() {
    let mut g: CompoundGraph = CompoundGraph::new();
    g.set_edge("a", "b");
    let attrs = sized(&g, 10.0, 10.0)
        .position("a", 0.0, 0.0)
        .position("b", 100.0, 0.0);
    let opts = CompoundFdpOptions::default();
    let result = tapir::layout(&g, &attrs, &opts).unwrap();

    let (a, b) = (result.positions["a"], result.positions["b"]);
    // Outline-to-outline gap.
    let gap = (b.x - a.x).abs() - 10.0;
    // Spring and repulsion balance at roughly 1.75 ideal lengths for this pair.
    assert!(gap > 40.0 && gap < 48.0, "gap {gap}");
    assert!(a.y.abs() < 1e-9 && b.y.abs() < 1e-9);
}

#[test]
fn line_is_pruned_and_fully_regrown() {
    let mut g: CompoundGraph = CompoundGraph::new();
    g.set_path(&["v0", "v1", "v2", "v3", "v4", "v5"]);
    let attrs = sized(&g, 10.0, 10.0);

    let mut layout = CompoundFdpLayout::new(&g, &attrs, &CompoundFdpOptions::default()).unwrap();
    assert_eq!(layout.pruned_vertex_count(), 4);
    assert_eq!(layout.graph().node_count(), 2);
    assert_eq!(layout.graph().edge_count(), 1);
    assert!(!layout.all_trees_grown());

    let (result, reports) = run_with_reports(&mut layout);
    assert!(layout.all_trees_grown());
    assert_eq!(layout.graph().node_count(), 6);
    assert_eq!(layout.graph().edge_count(), 5);
    assert!(layout.graph().has_edge("v0", "v1", None));
    assert!(result.levels.values().all(|&l| l == 0));

    let first = reports.iter().find(|r| r.phase == Phase::First).unwrap();
    assert_eq!(first.positions.len(), 2);
    let last_second = reports.iter().rfind(|r| r.phase == Phase::Second).unwrap();
    assert_eq!(last_second.step, 70);
    assert!(
        reports
            .iter()
            .filter(|r| r.phase == Phase::Third)
            .all(|r| r.positions.len() == 6)
    );
}

#[test]
fn compound_sizes_match_their_children() {
    let g = nested();
    let attrs = nested_attrs(&g);
    let result = tapir::layout(&g, &attrs, &CompoundFdpOptions::default()).unwrap();

    for (compound, border) in [
        ("outer", Thickness::new(4.0, 12.0, 4.0, 4.0)),
        ("inner", Thickness::uniform(2.0)),
    ] {
        let children = g.children_vertices(compound).unwrap();
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for child in children {
            let p = result.positions[child];
            let s = result.sizes[child];
            min_x = min_x.min(p.x - s.width / 2.0);
            max_x = max_x.max(p.x + s.width / 2.0);
            min_y = min_y.min(p.y - s.height / 2.0);
            max_y = max_y.max(p.y + s.height / 2.0);
        }

        let inner = result.inner_canvas_sizes[compound];
        assert!((inner.width - (max_x - min_x)).abs() < 1e-6, "{compound}");
        assert!((inner.height - (max_y - min_y)).abs() < 1e-6, "{compound}");

        let outer = result.sizes[compound];
        assert!((outer.width - inner.width - border.left - border.right).abs() < 1e-9);
        assert!((outer.height - inner.height - border.top - border.bottom).abs() < 1e-9);

        let p = result.positions[compound];
        let cx = (min_x + max_x) / 2.0 + (border.right - border.left) / 2.0;
        let cy = (min_y + max_y) / 2.0 + (border.bottom - border.top) / 2.0;
        assert!((p.x - cx).abs() < 1e-6 && (p.y - cy).abs() < 1e-6, "{compound}");
    }

    assert!(!result.inner_canvas_sizes.contains_key("a"));
    assert_eq!(result.level_of("outer").unwrap(), 0);
    assert_eq!(result.level_of("c").unwrap(), 1);
    assert_eq!(result.level_of("a").unwrap(), 2);
}

#[test]
fn empty_compound_is_sized_by_its_border() {
    let mut g: CompoundGraph = CompoundGraph::new();
    g.add_compound_vertex("box");
    g.set_edge("box", "x");
    let attrs = VertexAttributes::new()
        .size("x", 10.0, 10.0)
        .border("box", Thickness::uniform(5.0));
    let result = tapir::layout(&g, &attrs, &CompoundFdpOptions::default()).unwrap();
    assert_eq!(result.inner_canvas_sizes["box"], Size::new(0.0, 0.0));
    assert_eq!(result.sizes["box"], Size::new(10.0, 10.0));
}

#[test]
fn temperature_cools_within_each_phase() {
    let g = nested();
    let attrs = nested_attrs(&g);
    let opts = CompoundFdpOptions::default();
    let mut layout = CompoundFdpLayout::new(&g, &attrs, &opts).unwrap();
    let (_, reports) = run_with_reports(&mut layout);

    let start = |phase: Phase| {
        reports
            .iter()
            .find(|r| r.phase == phase)
            .map(|r| r.temperature)
            .unwrap()
    };
    let t1 = start(Phase::First);
    assert!((t1 - 7f64.sqrt() * opts.ideal_edge_length).abs() < 1e-9);
    assert!((start(Phase::Second) - t1 * 0.5 * 0.5).abs() < 1e-9);
    assert!((start(Phase::Third) - t1 * 0.2 * 0.25).abs() < 1e-9);

    for phase in Phase::ALL {
        let temps: Vec<f64> = reports
            .iter()
            .filter(|r| r.phase == phase)
            .map(|r| r.temperature)
            .collect();
        let floor = temps[0] * 0.1;
        for pair in temps.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(temps.iter().all(|&t| t >= floor - 1e-12));
        assert!(reports.iter().all(|r| r.displacement_limit >= 0.0));
    }

    // 0.95^49 < 0.1, so the first phase ends on its floor.
    let last_first = reports
        .iter()
        .rfind(|r| r.phase == Phase::First)
        .unwrap();
    assert!((last_first.temperature - t1 * 0.1).abs() < 1e-9);
    assert_eq!(last_first.message, "phase 1, step 50");
}

#[test]
fn fixed_layouts_move_as_one_block() {
    // a (automatic)
    // └── b (fixed)
    //     ├── c (fixed)
    //     │   ├── d1
    //     │   └── d2
    //     └── f
    // e, with an edge d1 - e
    let mut g: CompoundGraph = CompoundGraph::new();
    g.ensure_node("a");
    g.add_child_vertex("a", "b").unwrap();
    g.add_child_vertex_range("b", ["c", "f"]).unwrap();
    g.add_child_vertex_range("c", ["d1", "d2"]).unwrap();
    g.set_edge("d1", "e");

    let attrs = VertexAttributes::new()
        .size("d1", 10.0, 10.0)
        .size("d2", 10.0, 10.0)
        .size("f", 10.0, 10.0)
        .size("e", 10.0, 10.0)
        .position("d1", 0.0, 0.0)
        .position("d2", 30.0, 0.0)
        .position("f", 0.0, 40.0)
        .position("e", 300.0, 0.0)
        .layout_type("b", InnerLayoutType::Fixed)
        .layout_type("c", InnerLayoutType::Fixed);

    let mut layout = CompoundFdpLayout::new(&g, &attrs, &CompoundFdpOptions::default()).unwrap();
    let a_start = layout.position_of("a").unwrap();
    let result = layout.run(None).unwrap();

    let p = &result.positions;
    let d2 = (p["d2"].x - p["d1"].x, p["d2"].y - p["d1"].y);
    let f = (p["f"].x - p["d1"].x, p["f"].y - p["d1"].y);
    assert!((d2.0 - 30.0).abs() < 1e-6 && d2.1.abs() < 1e-6, "{d2:?}");
    assert!(f.0.abs() < 1e-6 && (f.1 - 40.0).abs() < 1e-6, "{f:?}");
    assert!(p["a"].distance(a_start) > 1.0);
}

#[test]
fn cancelling_before_the_first_step_keeps_initial_positions() {
    let mut g: CompoundGraph = CompoundGraph::new();
    g.set_path(&["a", "b", "c", "a"]);
    let attrs = sized(&g, 10.0, 10.0);
    let token = CancellationToken::new();
    token.cancel();

    let mut layout = CompoundFdpLayout::new(&g, &attrs, &CompoundFdpOptions::default())
        .unwrap()
        .with_cancellation(token);
    let start: Vec<Point> = ["a", "b", "c"]
        .iter()
        .map(|v| layout.position_of(v).unwrap())
        .collect();
    let (result, reports) = run_with_reports(&mut layout);

    assert!(result.cancelled);
    assert!(reports.is_empty());
    assert_eq!(result.positions["a"], start[0]);
    assert_eq!(result.positions["b"], start[1]);
    assert_eq!(result.positions["c"], start[2]);
}

#[test]
fn cancelling_mid_run_stops_at_the_next_step_and_regrows_leaves() {
    let mut g: CompoundGraph = CompoundGraph::new();
    g.set_path(&["a", "b", "c", "a"]);
    g.set_edge("a", "d");
    let attrs = sized(&g, 10.0, 10.0);
    let token = CancellationToken::new();

    let mut layout = CompoundFdpLayout::new(&g, &attrs, &CompoundFdpOptions::default())
        .unwrap()
        .with_cancellation(token.clone());
    assert_eq!(layout.pruned_vertex_count(), 1);

    let mut steps = 0usize;
    let mut observer = |r: &IterationReport| {
        steps += 1;
        if r.phase == Phase::Second && r.step == 3 {
            token.cancel();
        }
    };
    let result = layout.run(Some(&mut observer)).unwrap();

    assert!(result.cancelled);
    assert_eq!(steps, 50 + 3);
    assert!(layout.all_trees_grown());
    assert_eq!(result.positions["d"], result.positions["a"]);
}

#[test]
fn application_forces_run_after_the_first_phase() {
    let g = nested();
    let attrs = nested_attrs(&g);
    let seen: Arc<Mutex<Vec<(Phase, String, Option<String>)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let hook = move |v: &VertexSnapshot<'_>, phase: Phase, _step: usize| {
        sink.lock()
            .unwrap()
            .push((phase, v.id.to_string(), v.parent.map(str::to_string)));
        (v.id == "d").then_some(Vector::new(5.0, 0.0))
    };

    let mut layout = CompoundFdpLayout::new(&g, &attrs, &CompoundFdpOptions::default())
        .unwrap()
        .with_application_forces(hook);
    let (_, reports) = run_with_reports(&mut layout);

    let seen = seen.lock().unwrap();
    assert!(seen.iter().all(|(phase, _, _)| *phase != Phase::First));
    assert!(seen.iter().any(|(phase, _, _)| *phase == Phase::Third));
    assert!(
        seen.iter()
            .any(|(_, id, parent)| id == "a" && parent.as_deref() == Some("inner"))
    );
    assert!(
        seen.iter()
            .any(|(_, id, parent)| id == "outer" && parent.is_none())
    );

    for r in &reports {
        let expected = if r.phase == Phase::First {
            Vector::default()
        } else {
            Vector::new(5.0, 0.0)
        };
        assert_eq!(r.forces["d"].application, expected, "{}", r.message);
    }
}

#[test]
fn invalid_inputs_are_rejected() {
    let g = nested();
    let opts = CompoundFdpOptions::default();

    let err = tapir::layout(&g, &VertexAttributes::new(), &opts).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    let attrs = nested_attrs(&g).size("ghost", 1.0, 1.0);
    let err = tapir::layout(&g, &attrs, &opts).unwrap_err();
    assert_eq!(
        err,
        Error::VertexNotFound {
            vertex: "ghost".to_string()
        }
    );

    let attrs = nested_attrs(&g).size("a", -1.0, 1.0);
    let err = tapir::layout(&g, &attrs, &opts).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    let bad = CompoundFdpOptions {
        repulsion_constant: -1.0,
        ..opts
    };
    let err = tapir::layout(&g, &nested_attrs(&g), &bad).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidParameter {
            name: "repulsionConstant",
            ..
        }
    ));

    let empty: CompoundGraph = CompoundGraph::new();
    let err = tapir::layout(&empty, &VertexAttributes::new(), &opts).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert!(CompoundFdpLayout::new(&empty, &VertexAttributes::new(), &opts).is_err());
}

#[test]
fn levels_are_queryable_and_positions_copy_out() {
    let g = nested();
    let attrs = nested_attrs(&g);
    let mut layout = CompoundFdpLayout::new(&g, &attrs, &CompoundFdpOptions::default()).unwrap();
    assert_eq!(layout.level_of("b").unwrap(), 2);
    assert_eq!(layout.level_of("e").unwrap(), 0);
    assert!(matches!(
        layout.level_of("nope"),
        Err(Error::VertexNotFound { .. })
    ));

    let result = layout.run(None).unwrap();
    assert!(result.level_of("nope").is_err());

    let mut target: HashMap<String, Point> = HashMap::new();
    target.insert("a".to_string(), Point::new(-1.0, -1.0));
    target.insert("unrelated".to_string(), Point::new(7.0, 7.0));
    result.apply_positions(&mut target);
    assert_eq!(target.len(), 8);
    assert_eq!(target["a"], result.positions["a"]);
    assert_eq!(target["unrelated"], Point::new(7.0, 7.0));
}
