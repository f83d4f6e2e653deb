//! Range edits checked against a plain `Vec` model.

use proptest::prelude::*;
use sprig_ir::{BlockRef, MethodIr, NodeRef, VarType, check_range, parse_method, print_lir};

#[derive(Clone, Debug)]
enum Edit {
    PushBack,
    InsertBefore(usize, usize),
    InsertAfter(usize, usize),
    Remove(usize),
    RemoveRun(usize, usize),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        Just(Edit::PushBack),
        (any::<usize>(), 1..4usize).prop_map(|(at, n)| Edit::InsertBefore(at, n)),
        (any::<usize>(), 1..4usize).prop_map(|(at, n)| Edit::InsertAfter(at, n)),
        any::<usize>().prop_map(Edit::Remove),
        (any::<usize>(), 0..4usize).prop_map(|(at, n)| Edit::RemoveRun(at, n)),
    ]
}

fn fresh(ir: &mut MethodIr, count: usize) -> Vec<NodeRef> {
    (0..count)
        .map(|_| ir.cns_int(VarType::Int, ir.node_count() as i64))
        .collect()
}

fn apply(ir: &mut MethodIr, block: BlockRef, model: &mut Vec<NodeRef>, edit: Edit) {
    match edit {
        Edit::PushBack => {
            let node = fresh(ir, 1)[0];
            ir.push_back(block, node);
            model.push(node);
        }
        Edit::InsertBefore(at, n) if !model.is_empty() => {
            let at = at % model.len();
            let nodes = fresh(ir, n);
            ir.insert_before(block, model[at], &nodes);
            model.splice(at..at, nodes);
        }
        Edit::InsertAfter(at, n) if !model.is_empty() => {
            let at = at % model.len();
            let nodes = fresh(ir, n);
            ir.insert_after(block, model[at], &nodes);
            model.splice(at + 1..at + 1, nodes);
        }
        Edit::Remove(at) if !model.is_empty() => {
            let at = at % model.len();
            ir.remove(block, model[at]);
            model.remove(at);
        }
        Edit::RemoveRun(at, n) if !model.is_empty() => {
            let first = at % model.len();
            let last = (first + n).min(model.len() - 1);
            let removed = ir.remove_range(block, model[first], model[last]);
            let expected: Vec<_> = model.drain(first..=last).collect();
            assert_eq!(removed, expected);
        }
        _ => {}
    }
}

proptest! {
    #[test]
    fn prop_range_matches_model(edits in prop::collection::vec(arb_edit(), 0..40)) {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let mut model = Vec::new();
        for edit in edits {
            apply(&mut ir, block, &mut model, edit);
        }

        let forward: Vec<_> = ir.range_nodes(block).collect();
        let mut backward: Vec<_> = ir.range_nodes_rev(block).collect();
        backward.reverse();
        prop_assert_eq!(&forward, &model);
        prop_assert_eq!(&backward, &model);
        prop_assert_eq!(ir.range_is_empty(block), model.is_empty());

        let result = check_range(&ir, block);
        prop_assert!(result.is_ok(), "{}", result);
    }
}

#[test]
fn spliced_statements_follow_each_other() {
    let mut ir = parse_method(
        r#"(method
          (local V0 int)
          (block BB0
            (stmt (call:int "A" (cns_int:int 1)))
            (stmt (return (lcl_var V0)))))"#,
    )
    .expect("valid method");
    let block = ir.blocks().next().expect("one block");
    for stmt in ir.block(block).stmts.clone() {
        ir.splice_statement(block, stmt);
    }

    // Before rationalization the call still references its argument list.
    insta::assert_snapshot!(print_lir(&ir), @r#"
    BB0:
      t0 = cns_int.int 1
      list.void t0
      t1 = call.int "A" n1?
      t2 = lcl_var.int V0
      return.void t2
    "#);
    assert!(check_range(&ir, block).is_ok());
}
