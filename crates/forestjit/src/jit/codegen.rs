//! Lowering of optimized forest programs to Cranelift IR.
//!
//! Each link produces one exported routine per program:
//!
//! ```text
//! forest_root(input: *const f64, count: i32, output: *mut f64)
//! ```
//!
//! The routine loops over `count` rows. For each row it accumulates the base
//! score plus every tree's contribution: inline trees are flattened into the
//! loop body as compare-and-branch chains, out-of-line trees become local
//! `tree_N(row_ptr) -> f64` functions called from the loop. A branch node
//! compares the feature value against its threshold with a condition code
//! that routes NaN to the node's default direction.
//!
//! The input program has passed structural verification, so child indices
//! are in range and strictly forward; emission recurses at most tree-depth
//! deep and cannot cycle.

use std::collections::HashMap;

use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::types::{F64, I64};
use cranelift_codegen::ir::{AbiParam, Function, InstBuilder, MemFlags, UserFuncName, Value};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::JITModule;
use cranelift_module::{FuncId, Linkage, Module};
use forestjit_ir::{Node, OptimizedIr, Tree};

use crate::error::Result;
use crate::jit::entry::ENTRY_SYMBOL;

/// Declare and define all functions for one program. Returns the public
/// symbol table for this link; `generation` keeps symbol names unique when
/// one engine links several programs.
pub(crate) fn define_program(
    module: &mut JITModule,
    program: &OptimizedIr,
    generation: u32,
) -> Result<HashMap<String, FuncId>> {
    let ptr_type = module.target_config().pointer_type();
    let mut symbols = HashMap::new();

    // Out-of-line tree routines: fn(row_ptr) -> f64, declared first so the
    // entry routine can call them.
    let mut tree_ids: Vec<Option<FuncId>> = Vec::with_capacity(program.segments.len());
    for (i, segment) in program.segments.iter().enumerate() {
        if segment.inline {
            tree_ids.push(None);
            continue;
        }
        let public = format!("tree_{i}");
        let mut sig = module.make_signature();
        sig.params.push(AbiParam::new(ptr_type));
        sig.returns.push(AbiParam::new(F64));
        let id = module.declare_function(&mangled(&public, generation), Linkage::Local, &sig)?;
        symbols.insert(public, id);
        tree_ids.push(Some(id));
    }

    for (i, segment) in program.segments.iter().enumerate() {
        let Some(id) = tree_ids[i] else { continue };
        let mut sig = module.make_signature();
        sig.params.push(AbiParam::new(ptr_type));
        sig.returns.push(AbiParam::new(F64));
        let mut func = Function::with_name_signature(UserFuncName::user(0, id.as_u32()), sig);
        let mut fb_ctx = FunctionBuilderContext::new();
        {
            let mut builder = FunctionBuilder::new(&mut func, &mut fb_ctx);
            let block = builder.create_block();
            builder.append_block_params_for_function_params(block);
            builder.switch_to_block(block);
            let row_ptr = builder.block_params(block)[0];
            let value = emit_tree(&mut builder, &segment.tree, row_ptr);
            builder.ins().return_(&[value]);
            builder.seal_all_blocks();
            builder.finalize();
        }
        define(module, id, func)?;
    }

    // The entry routine: fn(input, count, output).
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(ptr_type)); // input
    sig.params.push(AbiParam::new(cranelift_codegen::ir::types::I32)); // count
    sig.params.push(AbiParam::new(ptr_type)); // output
    let root_id =
        module.declare_function(&mangled(ENTRY_SYMBOL, generation), Linkage::Export, &sig)?;
    symbols.insert(ENTRY_SYMBOL.to_string(), root_id);

    let mut func = Function::with_name_signature(UserFuncName::user(0, root_id.as_u32()), sig);
    let mut fb_ctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut func, &mut fb_ctx);

        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        let header = builder.create_block();
        builder.append_block_param(header, I64);
        let body = builder.create_block();
        let exit = builder.create_block();

        builder.switch_to_block(entry);
        let input = builder.block_params(entry)[0];
        let count = builder.block_params(entry)[1];
        let output = builder.block_params(entry)[2];
        let n = builder.ins().sextend(I64, count);
        let zero = builder.ins().iconst(I64, 0);
        builder.ins().jump(header, &[zero]);

        builder.switch_to_block(header);
        let i = builder.block_params(header)[0];
        let more = builder.ins().icmp(IntCC::SignedLessThan, i, n);
        builder.ins().brif(more, body, &[], exit, &[]);

        builder.switch_to_block(body);
        let row_bytes = i64::from(program.num_features) * 8;
        let row_off = builder.ins().imul_imm(i, row_bytes);
        let row_ptr = builder.ins().iadd(input, row_off);

        let mut acc = builder.ins().f64const(program.base_score);
        for (seg, segment) in program.segments.iter().enumerate() {
            let value = match tree_ids[seg] {
                Some(id) => {
                    let callee = module.declare_func_in_func(id, builder.func);
                    let call = builder.ins().call(callee, &[row_ptr]);
                    builder.inst_results(call)[0]
                }
                None => emit_tree(&mut builder, &segment.tree, row_ptr),
            };
            acc = builder.ins().fadd(acc, value);
        }

        let out_off = builder.ins().imul_imm(i, 8);
        let out_addr = builder.ins().iadd(output, out_off);
        builder.ins().store(MemFlags::trusted(), acc, out_addr, 0);
        let next = builder.ins().iadd_imm(i, 1);
        builder.ins().jump(header, &[next]);

        builder.switch_to_block(exit);
        builder.ins().return_(&[]);

        builder.seal_all_blocks();
        builder.finalize();
    }
    define(module, root_id, func)?;

    Ok(symbols)
}

/// Emit one tree's evaluation over `row_ptr`, leaving the builder positioned
/// at the tree's merge block. Returns the leaf value reaching that block.
fn emit_tree(builder: &mut FunctionBuilder, tree: &Tree, row_ptr: Value) -> Value {
    let merge = builder.create_block();
    builder.append_block_param(merge, F64);
    emit_node(builder, tree, 0, row_ptr, merge);
    builder.switch_to_block(merge);
    builder.block_params(merge)[0]
}

fn emit_node(
    builder: &mut FunctionBuilder,
    tree: &Tree,
    idx: usize,
    row_ptr: Value,
    merge: cranelift_codegen::ir::Block,
) {
    match tree.nodes[idx] {
        Node::Leaf { value } => {
            let v = builder.ins().f64const(value);
            builder.ins().jump(merge, &[v]);
        }
        Node::Branch {
            feature,
            threshold,
            default_left,
            left,
            right,
        } => {
            let offset = feature as i32 * 8;
            let x = builder
                .ins()
                .load(F64, MemFlags::trusted(), row_ptr, offset);
            let t = builder.ins().f64const(threshold);
            // NaN compares unordered; picking the condition code by default
            // direction routes missing values without a separate check.
            let cc = if default_left {
                FloatCC::UnorderedOrLessThanOrEqual
            } else {
                FloatCC::LessThanOrEqual
            };
            let go_left = builder.ins().fcmp(cc, x, t);

            let left_block = builder.create_block();
            let right_block = builder.create_block();
            builder.ins().brif(go_left, left_block, &[], right_block, &[]);

            builder.switch_to_block(left_block);
            emit_node(builder, tree, left as usize, row_ptr, merge);
            builder.switch_to_block(right_block);
            emit_node(builder, tree, right as usize, row_ptr, merge);
        }
    }
}

fn define(module: &mut JITModule, id: FuncId, func: Function) -> Result<()> {
    let mut ctx = Context::for_function(func);
    module.define_function(id, &mut ctx)?;
    module.clear_context(&mut ctx);
    Ok(())
}

fn mangled(base: &str, generation: u32) -> String {
    if generation == 0 {
        base.to_string()
    } else {
        format!("{base}.{generation}")
    }
}
