//! Tests for JIT-compiled forest programs.

use forestjit_ir::{Node, OptimizedIr, Segment, Tree};

use super::engine::JitEngine;
use super::entry::{EntryPoint, ENTRY_SYMBOL};

fn program(num_features: u32, base_score: f64, segments: Vec<Segment>) -> OptimizedIr {
    OptimizedIr {
        target: "test".to_string(),
        objective: "regression".to_string(),
        num_features,
        base_score,
        segments,
    }
}

fn inline(tree: Tree) -> Segment {
    Segment { tree, inline: true }
}

fn out_of_line(tree: Tree) -> Segment {
    Segment { tree, inline: false }
}

fn stump(feature: u32, threshold: f64, default_left: bool, left: f64, right: f64) -> Tree {
    Tree {
        nodes: vec![
            Node::Branch {
                feature,
                threshold,
                default_left,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: left },
            Node::Leaf { value: right },
        ],
    }
}

fn jit(program: &OptimizedIr) -> (JitEngine, EntryPoint) {
    let mut engine = JitEngine::new().unwrap();
    engine.link_and_finalize(program).unwrap();
    let addr = engine.resolve_symbol(ENTRY_SYMBOL).unwrap();
    let entry = EntryPoint::new(addr, program.num_features as usize);
    (engine, entry)
}

fn run(entry: &EntryPoint, num_features: usize, rows: &[&[f64]]) -> Vec<f64> {
    let mut input = Vec::with_capacity(rows.len() * num_features);
    for row in rows {
        assert_eq!(row.len(), num_features);
        input.extend_from_slice(row);
    }
    let mut output = vec![0.0; rows.len()];
    entry.invoke(&input, &mut output);
    output
}

#[test]
fn test_leaf_only_program() {
    let p = program(1, 0.5, vec![inline(Tree::leaf(1.25))]);
    let (_engine, entry) = jit(&p);
    assert_eq!(run(&entry, 1, &[&[0.0], &[42.0]]), vec![1.75, 1.75]);
}

#[test]
fn test_single_branch_routing() {
    let p = program(1, 0.0, vec![inline(stump(0, 0.5, true, 1.0, 2.0))]);
    let (_engine, entry) = jit(&p);
    // Boundary value goes left (split condition is <=).
    assert_eq!(
        run(&entry, 1, &[&[0.25], &[0.5], &[0.75]]),
        vec![1.0, 1.0, 2.0]
    );
}

#[test]
fn test_nan_routes_to_default_direction() {
    let left_default = program(1, 0.0, vec![inline(stump(0, 0.5, true, 1.0, 2.0))]);
    let (_e1, entry) = jit(&left_default);
    assert_eq!(run(&entry, 1, &[&[f64::NAN]]), vec![1.0]);

    let right_default = program(1, 0.0, vec![inline(stump(0, 0.5, false, 1.0, 2.0))]);
    let (_e2, entry) = jit(&right_default);
    assert_eq!(run(&entry, 1, &[&[f64::NAN]]), vec![2.0]);
}

#[test]
fn test_trees_sum_with_base_score() {
    let p = program(
        2,
        0.25,
        vec![
            inline(stump(0, 0.0, true, -1.0, 1.0)),
            inline(stump(1, 0.0, true, -10.0, 10.0)),
            inline(Tree::leaf(100.0)),
        ],
    );
    let (_engine, entry) = jit(&p);
    assert_eq!(
        run(&entry, 2, &[&[1.0, -1.0], &[-1.0, 1.0]]),
        vec![0.25 + 1.0 - 10.0 + 100.0, 0.25 - 1.0 + 10.0 + 100.0]
    );
}

#[test]
fn test_out_of_line_tree_matches_inline() {
    let tree = stump(0, 1.5, true, 3.0, 7.0);
    let p_inline = program(1, 0.0, vec![inline(tree.clone())]);
    let p_called = program(1, 0.0, vec![out_of_line(tree)]);
    let (_e1, inline_entry) = jit(&p_inline);
    let (_e2, called_entry) = jit(&p_called);
    let rows: &[&[f64]] = &[&[1.0], &[2.0], &[f64::NAN]];
    assert_eq!(run(&inline_entry, 1, rows), run(&called_entry, 1, rows));
}

#[test]
fn test_out_of_line_symbol_is_resolvable() {
    let p = program(1, 0.0, vec![out_of_line(Tree::leaf(1.0))]);
    let mut engine = JitEngine::new().unwrap();
    engine.link_and_finalize(&p).unwrap();
    assert!(engine.resolve_symbol("tree_0").is_some());
}

#[test]
fn test_rows_are_independent() {
    let p = program(2, 0.0, vec![inline(stump(1, 5.0, true, -1.0, 1.0))]);
    let (_engine, entry) = jit(&p);
    let a = run(&entry, 2, &[&[0.0, 1.0]]);
    let b = run(&entry, 2, &[&[0.0, 9.0]]);
    let both = run(&entry, 2, &[&[0.0, 1.0], &[0.0, 9.0]]);
    assert_eq!(both, vec![a[0], b[0]]);
}

#[test]
fn test_empty_batch_writes_nothing() {
    let p = program(1, 0.0, vec![inline(Tree::leaf(1.0))]);
    let (_engine, entry) = jit(&p);
    let mut output: Vec<f64> = vec![];
    entry.invoke(&[], &mut output);
    assert!(output.is_empty());
}

#[test]
fn test_matches_reference_interpreter() {
    let p = program(
        3,
        0.1,
        vec![
            inline(Tree {
                nodes: vec![
                    Node::Branch {
                        feature: 0,
                        threshold: 2.0,
                        default_left: true,
                        left: 1,
                        right: 2,
                    },
                    Node::Branch {
                        feature: 2,
                        threshold: -1.0,
                        default_left: false,
                        left: 3,
                        right: 4,
                    },
                    Node::Leaf { value: 5.0 },
                    Node::Leaf { value: -2.5 },
                    Node::Leaf { value: 0.5 },
                ],
            }),
            out_of_line(stump(1, 0.0, false, 2.0, 4.0)),
        ],
    );
    let (_engine, entry) = jit(&p);
    let values = [-3.0, -1.0, 0.0, 1.5, 2.0, 7.0, f64::NAN];
    for &a in &values {
        for &b in &values {
            let row = [a, b, a - b];
            let got = run(&entry, 3, &[&row]);
            assert_eq!(got[0], p.evaluate(&row), "row {row:?}");
        }
    }
}

#[test]
fn test_resolve_before_link_is_none() {
    let engine = JitEngine::new().unwrap();
    assert!(engine.resolve_symbol(ENTRY_SYMBOL).is_none());
}

#[test]
fn test_unknown_symbol_is_none() {
    let p = program(1, 0.0, vec![inline(Tree::leaf(1.0))]);
    let mut engine = JitEngine::new().unwrap();
    engine.link_and_finalize(&p).unwrap();
    assert!(engine.resolve_symbol("no_such_symbol").is_none());
}

#[test]
fn test_engine_is_reusable_across_links() {
    let mut engine = JitEngine::new().unwrap();

    let first = program(1, 0.0, vec![inline(Tree::leaf(1.0))]);
    engine.link_and_finalize(&first).unwrap();
    let first_entry = EntryPoint::new(engine.resolve_symbol(ENTRY_SYMBOL).unwrap(), 1);
    assert_eq!(run(&first_entry, 1, &[&[0.0]]), vec![1.0]);

    let second = program(1, 0.0, vec![inline(Tree::leaf(2.0))]);
    engine.link_and_finalize(&second).unwrap();
    let second_entry = EntryPoint::new(engine.resolve_symbol(ENTRY_SYMBOL).unwrap(), 1);
    assert_eq!(run(&second_entry, 1, &[&[0.0]]), vec![2.0]);

    // The first program's code memory is still owned by the engine.
    assert_eq!(run(&first_entry, 1, &[&[0.0]]), vec![1.0]);
}
