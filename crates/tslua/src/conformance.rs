// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Round-trip conformance tests.
//!
//! Each test builds a typed source tree, transforms it, prepends the used
//! lualib snippets, and executes the printed chunk on a real Lua 5.4 VM,
//! asserting the observable result. A second group asserts the emitted
//! source shape where the exact spelling is the contract (labels, mangled
//! names, 1-based indices).

use crate::ast::*;
use crate::lualib;
use crate::options::CompilerOptions;
use crate::oracle::{Type, TypeOracle};
use crate::printer::print_block;
use crate::testing::{AstBuilder, TestOracle};
use crate::transformer::transform_source_file;

fn transpile(file: &SourceFile, oracle: &dyn TypeOracle) -> String {
    let options = CompilerOptions::default();
    let (block, features) =
        transform_source_file(file, oracle, &options).expect("transformation failed");
    let mut chunk = lualib::bundle_features(&features);
    chunk.push_str(&print_block(&block));
    chunk
}

fn execute<T: mlua::FromLuaMulti>(file: &SourceFile, oracle: &dyn TypeOracle) -> T {
    let chunk = transpile(file, oracle);
    let lua = mlua::Lua::new();
    match lua.load(&chunk).eval::<T>() {
        Ok(value) => value,
        Err(error) => panic!("lua execution failed: {error}\n--- chunk ---\n{chunk}"),
    }
}

fn number_array() -> Type {
    Type::array(Type::number())
}

// ---- end-to-end scenarios -------------------------------------------------

#[test]
fn array_push_and_length() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    let one = b.num(1.0);
    let two = b.num(2.0);
    let list = b.array(vec![one, two]);
    let decl = b.var("a", Some(list));

    let a = b.ident_expr("a");
    oracle.type_expression(&a, number_array());
    let push = b.prop(a, "push");
    let three = b.num(3.0);
    let call = b.call(push, vec![three]);
    let push_stmt = b.expr_stmt(call);

    let a = b.ident_expr("a");
    oracle.type_expression(&a, number_array());
    let length = b.prop(a, "length");
    let ret = b.ret(Some(length));

    let file = b.file(vec![decl, push_stmt, ret]);
    let result: i64 = execute(&file, &oracle);
    assert_eq!(result, 3);
}

#[test]
fn class_with_accessors() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    // class C { private _x = 0; get x() …; set x(v) … }
    let zero = b.num(0.0);
    let field = b.class_member(ClassMemberKind::Property {
        name: PropertyName::Identifier("_x".to_string()),
        initializer: Some(zero),
        is_static: false,
    });

    let this = b.this();
    let read = b.prop(this, "_x");
    let getter_ret = b.ret(Some(read));
    let getter_body = b.block(vec![getter_ret]);
    let getter = b.class_member(ClassMemberKind::Getter {
        name: PropertyName::Identifier("x".to_string()),
        body: getter_body,
        is_static: false,
    });

    let this = b.this();
    let target = b.prop(this, "_x");
    let value = b.ident_expr("v");
    let write = b.assign(target, value);
    let write_stmt = b.expr_stmt(write);
    let setter_body = b.block(vec![write_stmt]);
    let parameter = b.parameter("v");
    let setter = b.class_member(ClassMemberKind::Setter {
        name: PropertyName::Identifier("x".to_string()),
        parameter,
        body: setter_body,
        is_static: false,
    });

    let class_name = b.ident("C");
    let class_stmt = b.stmt(StatementKind::Class(ClassDeclaration {
        doc: None,
        exported: false,
        ambient: false,
        name: Some(class_name),
        extends: None,
        decorators: Vec::new(),
        members: vec![field, getter, setter],
    }));

    // const c = new C(); c.x = 5; return c.x;
    let class_ref = b.ident_expr("C");
    let construct = b.new_expr(class_ref, Vec::new());
    let c_decl = b.var("c", Some(construct));

    let c = b.ident_expr("c");
    let target = b.prop(c, "x");
    let five = b.num(5.0);
    let set = b.assign(target, five);
    let set_stmt = b.expr_stmt(set);

    let c = b.ident_expr("c");
    let read = b.prop(c, "x");
    let ret = b.ret(Some(read));

    let file = b.file(vec![class_stmt, c_decl, set_stmt, ret]);
    let result: i64 = execute(&file, &oracle);
    assert_eq!(result, 5);
}

#[test]
fn for_of_over_user_iterable() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    // const r: number[] = [];
    let empty = b.array(Vec::new());
    let r_decl = b.var("r", Some(empty));

    // const it = { i: 0, next() { this.i++; if (this.i <= 2) { return
    // {done: false, value: this.i}; } return {done: true}; } };
    let zero = b.num(0.0);
    let this = b.this();
    let counter = b.prop(this, "i");
    let bump = b.expr(ExpressionKind::Update {
        op: UpdateOperator::Increment,
        prefix: false,
        target: Box::new(counter),
    });
    let bump_stmt = b.expr_stmt(bump);

    let this = b.this();
    let counter = b.prop(this, "i");
    let two = b.num(2.0);
    let condition = b.binary(BinaryOperator::LessEqual, counter, two);
    let done_false = b.boolean(false);
    let this = b.this();
    let counter = b.prop(this, "i");
    let some_result = b.expr(ExpressionKind::Object(vec![
        ObjectLiteralMember::Property {
            name: PropertyName::Identifier("done".to_string()),
            value: done_false,
        },
        ObjectLiteralMember::Property {
            name: PropertyName::Identifier("value".to_string()),
            value: counter,
        },
    ]));
    let yield_some = b.ret(Some(some_result));
    let then_branch = b.block(vec![yield_some]);
    let if_stmt = b.stmt(StatementKind::If(IfStatement {
        condition,
        then_branch,
        else_branch: None,
    }));

    let done_true = b.boolean(true);
    let end_result = b.expr(ExpressionKind::Object(vec![ObjectLiteralMember::Property {
        name: PropertyName::Identifier("done".to_string()),
        value: done_true,
    }]));
    let yield_end = b.ret(Some(end_result));

    let next_body = b.block(vec![bump_stmt, if_stmt, yield_end]);
    let next_fn = b.raw_function(Vec::new(), next_body, false);
    let zero_member = ObjectLiteralMember::Property {
        name: PropertyName::Identifier("i".to_string()),
        value: zero,
    };
    let next_member = ObjectLiteralMember::Method {
        name: PropertyName::Identifier("next".to_string()),
        function: next_fn,
    };
    let it_literal = b.expr(ExpressionKind::Object(vec![zero_member, next_member]));
    let it_decl = b.var("it", Some(it_literal));

    // const obj = { [Symbol.iterator]() { return it; } };
    let it_ref = b.ident_expr("it");
    let iterator_ret = b.ret(Some(it_ref));
    let iterator_body = b.block(vec![iterator_ret]);
    let iterator_fn = b.raw_function(Vec::new(), iterator_body, false);
    let symbol = b.ident_expr("Symbol");
    let iterator_key = b.prop(symbol, "iterator");
    let obj_literal = b.expr(ExpressionKind::Object(vec![ObjectLiteralMember::Method {
        name: PropertyName::Computed(Box::new(iterator_key)),
        function: iterator_fn,
    }]));
    let obj_decl = b.var("obj", Some(obj_literal));

    // for (const v of obj) { r.push(v); }
    let r = b.ident_expr("r");
    oracle.type_expression(&r, number_array());
    let push = b.prop(r, "push");
    let v = b.ident_expr("v");
    let push_call = b.call(push, vec![v]);
    let push_stmt = b.expr_stmt(push_call);
    let loop_body = b.block(vec![push_stmt]);
    let loop_variable = b.ident("v");
    let iterated = b.ident_expr("obj");
    let for_of = b.stmt(StatementKind::ForOf(ForOfStatement {
        variable: Some(BindingName::Identifier(loop_variable)),
        expression: iterated,
        body: loop_body,
    }));

    // return r[0] + r[1];
    let r = b.ident_expr("r");
    oracle.type_expression(&r, number_array());
    let zero = b.num(0.0);
    oracle.set_type(zero.id, Type::number());
    let first = b.elem(r, zero);
    let r = b.ident_expr("r");
    oracle.type_expression(&r, number_array());
    let one = b.num(1.0);
    oracle.set_type(one.id, Type::number());
    let second = b.elem(r, one);
    let sum = b.binary(BinaryOperator::Add, first, second);
    let ret = b.ret(Some(sum));

    let file = b.file(vec![r_decl, it_decl, obj_decl, for_of, ret]);
    let result: i64 = execute(&file, &oracle);
    assert_eq!(result, 3);
}

#[test]
fn try_catch_finally_with_return() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    // const log: string[] = [];
    let empty = b.array(Vec::new());
    let log_decl = b.var("log", Some(empty));

    // function f() {
    //   try { throw "oops"; } catch (e) { return "b"; }
    //   finally { log.push("f"); }
    //   return "c";
    // }
    let oops = b.str("oops");
    let throw_stmt = b.stmt(StatementKind::Throw(oops));
    let try_block = b.block(vec![throw_stmt]);

    let b_value = b.str("b");
    let catch_ret = b.ret(Some(b_value));
    let catch_block = b.block(vec![catch_ret]);
    let catch_variable = b.ident("e");
    let catch = b.catch(Some(catch_variable), catch_block);

    let log = b.ident_expr("log");
    oracle.type_expression(&log, Type::array(Type::string()));
    let push = b.prop(log, "push");
    let marker = b.str("f");
    let push_call = b.call(push, vec![marker]);
    let push_stmt = b.expr_stmt(push_call);
    let finally_block = b.block(vec![push_stmt]);

    let try_stmt = b.stmt(StatementKind::Try(TryStatement {
        try_block,
        catch: Some(catch),
        finally: Some(finally_block),
    }));
    let c_value = b.str("c");
    let tail_ret = b.ret(Some(c_value));
    let f_body = b.block(vec![try_stmt, tail_ret]);
    let f_decl = b.function_decl("f", Vec::new(), f_body, false);

    // return f() + log.length; → "b1" proves both the catch return and the
    // finally side effect.
    let f = b.ident_expr("f");
    let f_call = b.call(f, Vec::new());
    oracle.set_type(f_call.id, Type::string());
    let log = b.ident_expr("log");
    oracle.type_expression(&log, Type::array(Type::string()));
    let length = b.prop(log, "length");
    let concat = b.binary(BinaryOperator::Add, f_call, length);
    let ret = b.ret(Some(concat));

    let file = b.file(vec![log_decl, f_decl, ret]);
    let result: String = execute(&file, &oracle);
    assert_eq!(result, "b1");
}

#[test]
fn switch_with_fall_through() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    let empty = b.array(Vec::new());
    let r_decl = b.var("r", Some(empty));

    let push_clause = |b: &mut AstBuilder, oracle: &mut TestOracle, value: f64| {
        let r = b.ident_expr("r");
        oracle.type_expression(&r, number_array());
        let push = b.prop(r, "push");
        let argument = b.num(value);
        let call = b.call(push, vec![argument]);
        b.expr_stmt(call)
    };

    let case1_push = push_clause(&mut b, &mut oracle, 1.0);
    let case1_test = b.num(1.0);
    let case1 = b.switch_clause(Some(case1_test), vec![case1_push]);

    let case2_push = push_clause(&mut b, &mut oracle, 2.0);
    let case2_test = b.num(2.0);
    let case2 = b.switch_clause(Some(case2_test), vec![case2_push]);

    let case3_push = push_clause(&mut b, &mut oracle, 3.0);
    let break_stmt = b.stmt(StatementKind::Break);
    let case3_test = b.num(3.0);
    let case3 = b.switch_clause(Some(case3_test), vec![case3_push, break_stmt]);

    let default_push = push_clause(&mut b, &mut oracle, 0.0);
    let default = b.switch_clause(None, vec![default_push]);

    let scrutinee = b.num(2.0);
    let switch = b.stmt(StatementKind::Switch(SwitchStatement {
        expression: scrutinee,
        clauses: vec![case1, case2, case3, default],
    }));

    let r = b.ident_expr("r");
    oracle.type_expression(&r, number_array());
    let join = b.prop(r, "join");
    let separator = b.str(",");
    let join_call = b.call(join, vec![separator]);
    let ret = b.ret(Some(join_call));

    let file = b.file(vec![r_decl, switch, ret]);
    let result: String = execute(&file, &oracle);
    assert_eq!(result, "2,3");
}

#[test]
fn destructuring_with_defaults_and_nesting() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    // const { a: { b = 5 } = {} } = { a: undefined };
    let b_name = b.ident("b");
    let five = b.num(5.0);
    let inner_element =
        b.binding_element(None, BindingName::Identifier(b_name), Some(five));
    let inner_pattern = b.object_pattern(vec![inner_element]);
    let empty_object = b.expr(ExpressionKind::Object(Vec::new()));
    let outer_element = b.binding_element(Some("a"), inner_pattern, Some(empty_object));
    let pattern = b.object_pattern(vec![outer_element]);

    let undefined = b.ident_expr("undefined");
    let source = b.expr(ExpressionKind::Object(vec![ObjectLiteralMember::Property {
        name: PropertyName::Identifier("a".to_string()),
        value: undefined,
    }]));
    let decl = b.stmt(StatementKind::Variable(VariableDeclaration {
        doc: None,
        exported: false,
        ambient: false,
        name: pattern,
        initializer: Some(source),
    }));

    let b_ref = b.ident_expr("b");
    let ret = b.ret(Some(b_ref));

    let file = b.file(vec![decl, ret]);
    let result: i64 = execute(&file, &oracle);
    assert_eq!(result, 5);
}

// ---- further round-trip properties ---------------------------------------

#[test]
fn forward_function_reference_is_hoisted() {
    use crate::oracle::SymbolHandle;

    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();
    let f_symbol = SymbolHandle(1);

    // const r = f(); function f() { return 7; } return r;
    let f_ref = b.ident_expr("f");
    oracle.set_symbol(f_ref.as_identifier().unwrap().id, f_symbol);
    let call = b.call(f_ref, Vec::new());
    let r_decl = b.var("r", Some(call));

    let seven = b.num(7.0);
    let f_ret = b.ret(Some(seven));
    let f_body = b.block(vec![f_ret]);
    let f_decl = b.function_decl("f", Vec::new(), f_body, false);
    if let StatementKind::Function(decl) = &f_decl.kind {
        oracle.set_symbol(decl.name.as_ref().unwrap().id, f_symbol);
    }

    let r_ref = b.ident_expr("r");
    let ret = b.ret(Some(r_ref));

    let file = b.file(vec![r_decl, f_decl, ret]);
    let result: i64 = execute(&file, &oracle);
    assert_eq!(result, 7);
}

#[test]
fn ternary_with_falsy_branch_preserves_value() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    // true ? false : true — a naive and/or chain would yield true.
    let condition = b.boolean(true);
    let when_true = b.boolean(false);
    oracle.set_type(when_true.id, Type::new(crate::oracle::TypeKind::Boolean));
    let when_false = b.boolean(true);
    let conditional = b.expr(ExpressionKind::Conditional {
        condition: Box::new(condition),
        when_true: Box::new(when_true),
        when_false: Box::new(when_false),
    });
    let ret = b.ret(Some(conditional));

    let file = b.file(vec![ret]);
    let result: bool = execute(&file, &oracle);
    assert!(!result);
}

#[test]
fn compound_assignment_evaluates_index_once() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    // const a = [10]; let calls = 0;
    // function idx() { calls++; return 0; }
    // a[idx()] += 5;
    // return a[0] * 100 + calls;
    let ten = b.num(10.0);
    let list = b.array(vec![ten]);
    let a_decl = b.var("a", Some(list));
    let zero = b.num(0.0);
    let calls_decl = b.var("calls", Some(zero));

    let calls_ref = b.ident_expr("calls");
    let bump = b.expr(ExpressionKind::Update {
        op: UpdateOperator::Increment,
        prefix: false,
        target: Box::new(calls_ref),
    });
    let bump_stmt = b.expr_stmt(bump);
    let zero = b.num(0.0);
    let idx_ret = b.ret(Some(zero));
    let idx_body = b.block(vec![bump_stmt, idx_ret]);
    let idx_decl = b.function_decl("idx", Vec::new(), idx_body, false);

    let a = b.ident_expr("a");
    oracle.type_expression(&a, number_array());
    let idx = b.ident_expr("idx");
    let idx_call = b.call(idx, Vec::new());
    oracle.set_type(idx_call.id, Type::number());
    let target = b.elem(a, idx_call);
    let five = b.num(5.0);
    let add_assign = b.expr(ExpressionKind::Assignment {
        op: Some(BinaryOperator::Add),
        target: Box::new(target),
        value: Box::new(five),
    });
    let add_stmt = b.expr_stmt(add_assign);

    let a = b.ident_expr("a");
    oracle.type_expression(&a, number_array());
    let zero = b.num(0.0);
    oracle.set_type(zero.id, Type::number());
    let first = b.elem(a, zero);
    let hundred = b.num(100.0);
    let scaled = b.binary(BinaryOperator::Multiply, first, hundred);
    let calls_ref = b.ident_expr("calls");
    let total = b.binary(BinaryOperator::Add, scaled, calls_ref);
    let ret = b.ret(Some(total));

    let file = b.file(vec![a_decl, calls_decl, idx_decl, add_stmt, ret]);
    let result: i64 = execute(&file, &oracle);
    assert_eq!(result, 1501);
}

#[test]
fn generator_lowers_to_coroutine_iterator() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    // function* g() { yield 1; yield 2; }
    let one = b.num(1.0);
    let yield_one = b.expr(ExpressionKind::Yield(Some(Box::new(one))));
    let first = b.expr_stmt(yield_one);
    let two = b.num(2.0);
    let yield_two = b.expr(ExpressionKind::Yield(Some(Box::new(two))));
    let second = b.expr_stmt(yield_two);
    let g_body = b.block(vec![first, second]);
    let g_decl = b.function_decl("g", Vec::new(), g_body, true);

    // const r: number[] = []; for (const v of g()) r.push(v);
    let empty = b.array(Vec::new());
    let r_decl = b.var("r", Some(empty));
    let g_ref = b.ident_expr("g");
    let g_call = b.call(g_ref, Vec::new());
    let r = b.ident_expr("r");
    oracle.type_expression(&r, number_array());
    let push = b.prop(r, "push");
    let v = b.ident_expr("v");
    let push_call = b.call(push, vec![v]);
    let push_stmt = b.expr_stmt(push_call);
    let loop_body = b.block(vec![push_stmt]);
    let loop_variable = b.ident("v");
    let for_of = b.stmt(StatementKind::ForOf(ForOfStatement {
        variable: Some(BindingName::Identifier(loop_variable)),
        expression: g_call,
        body: loop_body,
    }));

    let r = b.ident_expr("r");
    oracle.type_expression(&r, number_array());
    let zero = b.num(0.0);
    oracle.set_type(zero.id, Type::number());
    let first = b.elem(r, zero);
    let r = b.ident_expr("r");
    oracle.type_expression(&r, number_array());
    let one = b.num(1.0);
    oracle.set_type(one.id, Type::number());
    let second = b.elem(r, one);
    let sum = b.binary(BinaryOperator::Add, first, second);
    let ret = b.ret(Some(sum));

    let file = b.file(vec![g_decl, r_decl, for_of, ret]);
    let result: i64 = execute(&file, &oracle);
    assert_eq!(result, 3);
}

#[test]
fn exported_symbols_land_in_exports_table() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let value = b.num(42.0);
    let exported = b.exported_var("answer", value);
    let hidden_value = b.num(7.0);
    let hidden = b.var("hidden", Some(hidden_value));

    let file = b.file(vec![exported, hidden]);
    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("local ____exports = {}"), "chunk:\n{chunk}");
    assert!(chunk.contains("return ____exports"), "chunk:\n{chunk}");

    let lua = mlua::Lua::new();
    let table: mlua::Table = lua.load(&chunk).eval().expect("module chunk");
    assert_eq!(table.get::<i64>("answer").unwrap(), 42);
    assert!(table.get::<Option<i64>>("hidden").unwrap().is_none());
}

#[test]
fn tuple_return_functions_destructure_without_boxing() {
    use crate::ast::{DocComment, DocTag};
    use crate::oracle::Signature;

    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    // /** @tupleReturn */ function pair() { return [1, 2]; }
    let one = b.num(1.0);
    let two = b.num(2.0);
    let values = b.array(vec![one, two]);
    let pair_ret = b.ret(Some(values));
    let pair_body = b.block(vec![pair_ret]);
    let mut pair_decl = b.function_decl("pair", Vec::new(), pair_body, false);
    if let StatementKind::Function(decl) = &mut pair_decl.kind {
        decl.doc = Some(DocComment {
            text: Vec::new(),
            tags: vec![DocTag { name: "tupleReturn".to_string(), arguments: Vec::new() }],
        });
    }
    let pair_statement_id = pair_decl.id;

    // const [x, y] = pair();
    let pair_ref = b.ident_expr("pair");
    let call = b.call(pair_ref, Vec::new());
    oracle.set_signature(
        call.id,
        Signature {
            declaration: Some(pair_statement_id),
            ..Signature::method()
        },
    );
    let x = b.ident("x");
    let y = b.ident("y");
    let x_element = b.binding_element(None, BindingName::Identifier(x), None);
    let y_element = b.binding_element(None, BindingName::Identifier(y), None);
    let pattern = BindingName::ArrayPattern {
        id: b.ident("_pattern").id,
        elements: vec![Some(x_element), Some(y_element)],
    };
    let decl = b.stmt(StatementKind::Variable(VariableDeclaration {
        doc: None,
        exported: false,
        ambient: false,
        name: pattern,
        initializer: Some(call),
    }));

    let x_ref = b.ident_expr("x");
    let y_ref = b.ident_expr("y");
    let sum = b.binary(BinaryOperator::Add, x_ref, y_ref);
    let ret = b.ret(Some(sum));

    let file = b.file(vec![pair_decl, decl, ret]);
    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("return 1, 2"), "chunk:\n{chunk}");

    let lua = mlua::Lua::new();
    let result: i64 = lua.load(&chunk).eval().expect("tuple chunk");
    assert_eq!(result, 3);
}

#[test]
fn exported_references_rewrite_through_the_exports_table() {
    use crate::oracle::SymbolHandle;

    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();
    let file_symbol = SymbolHandle(100);
    let base_symbol = SymbolHandle(1);

    // export const base = 10;
    let ten = b.num(10.0);
    let base_decl = b.exported_var("base", ten);

    // export function read() { return base; }
    let base_ref = b.ident_expr("base");
    oracle.set_symbol(base_ref.as_identifier().unwrap().id, base_symbol);
    let read_ret = b.ret(Some(base_ref));
    let read_body = b.block(vec![read_ret]);
    let mut read_decl = b.function_decl("read", Vec::new(), read_body, false);
    if let StatementKind::Function(decl) = &mut read_decl.kind {
        decl.exported = true;
    }

    let file = b.file(vec![base_decl, read_decl]);
    oracle.set_symbol(file.id, file_symbol);
    oracle.set_exports(file_symbol, vec![base_symbol]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("return ____exports.base"), "chunk:\n{chunk}");

    let lua = mlua::Lua::new();
    let module: mlua::Table = lua.load(&chunk).eval().expect("module chunk");
    let read: mlua::Function = module.get("read").expect("read export");
    let value: i64 = read.call(mlua::Value::Nil).expect("read call");
    assert_eq!(value, 10);
}

#[test]
fn function_valued_locals_take_the_implicit_context() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    // const double = function(x) { return x * 2; }; return double(5);
    let parameter = b.parameter("x");
    let x_ref = b.ident_expr("x");
    let two = b.num(2.0);
    let product = b.binary(BinaryOperator::Multiply, x_ref, two);
    let body_ret = b.ret(Some(product));
    let body = b.block(vec![body_ret]);
    let function = b.function_expr(vec![parameter], body, false);
    let decl = b.var("double", Some(function));

    let double_ref = b.ident_expr("double");
    let five = b.num(5.0);
    let call = b.call(double_ref, vec![five]);
    let ret = b.ret(Some(call));

    let file = b.file(vec![decl, ret]);
    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("double(_G, 5)"), "chunk:\n{chunk}");

    let lua = mlua::Lua::new();
    let result: i64 = lua.load(&chunk).eval().expect("function chunk");
    assert_eq!(result, 10);
}

// ---- emitted-shape checks -------------------------------------------------

#[test]
fn emitted_output_is_deterministic() {
    let build = || {
        let mut b = AstBuilder::new();
        let one = b.num(1.0);
        let decl = b.var("x", Some(one));
        let x = b.ident_expr("x");
        let ret = b.ret(Some(x));
        b.file(vec![decl, ret])
    };
    let oracle = TestOracle::new();
    let first = transpile(&build(), &oracle);
    let second = transpile(&build(), &oracle);
    assert_eq!(first, second);
}

#[test]
fn numeric_array_index_reads_one_based() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    let a = b.ident_expr("a");
    oracle.type_expression(&a, number_array());
    let i = b.ident_expr("i");
    oracle.type_expression(&i, Type::number());
    let access = b.elem(a, i);
    let ret = b.ret(Some(access));
    let file = b.file(vec![ret]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("a[i + 1]"), "chunk:\n{chunk}");
}

#[test]
fn constant_folded_index_cancels_adjustment() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    // a[i - 1] reads a[i].
    let a = b.ident_expr("a");
    oracle.type_expression(&a, number_array());
    let i = b.ident_expr("i");
    let one = b.num(1.0);
    let index = b.binary(BinaryOperator::Subtract, i, one);
    oracle.set_type(index.id, Type::number());
    let access = b.elem(a, index);
    let ret = b.ret(Some(access));
    let file = b.file(vec![ret]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("return a[i]"), "chunk:\n{chunk}");
}

#[test]
fn block_statements_emit_do_end() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let one = b.num(1.0);
    let inner = b.var("x", Some(one));
    let block = b.block(vec![inner]);
    let stmt = b.stmt(StatementKind::Block(block));
    let file = b.file(vec![stmt]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("do\n    local x = 1\nend"), "chunk:\n{chunk}");
}

#[test]
fn reserved_names_are_mangled() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let one = b.num(1.0);
    let decl = b.var("end", Some(one));
    let reference = b.ident_expr("end");
    let ret = b.ret(Some(reference));
    let file = b.file(vec![decl, ret]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("local ____end = 1"), "chunk:\n{chunk}");
    assert!(chunk.contains("return ____end"), "chunk:\n{chunk}");

    let lua = mlua::Lua::new();
    let value: i64 = lua.load(&chunk).eval().expect("mangled chunk");
    assert_eq!(value, 1);
}

#[test]
fn continue_labels_follow_scope_ids() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let condition = b.boolean(false);
    let continue_stmt = b.stmt(StatementKind::Continue);
    let body = b.block(vec![continue_stmt]);
    let while_stmt = b.stmt(StatementKind::While { condition, body });
    let file = b.file(vec![while_stmt]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("goto __continue2"), "chunk:\n{chunk}");
    assert!(chunk.contains("::__continue2::"), "chunk:\n{chunk}");

    // And the emitted loop still parses.
    let lua = mlua::Lua::new();
    lua.load(&chunk).exec().expect("continue chunk");
}

#[test]
fn switch_labels_follow_scope_ids() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let break_stmt = b.stmt(StatementKind::Break);
    let one = b.num(1.0);
    let clause = b.switch_clause(Some(one), vec![break_stmt]);
    let scrutinee = b.num(1.0);
    let switch = b.stmt(StatementKind::Switch(SwitchStatement {
        expression: scrutinee,
        clauses: vec![clause],
    }));
    let file = b.file(vec![switch]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("____TS_switch2"), "chunk:\n{chunk}");
    assert!(chunk.contains("::____TS_switch2_end::"), "chunk:\n{chunk}");
    let lua = mlua::Lua::new();
    lua.load(&chunk).exec().expect("switch chunk");
}

#[test]
fn signed_right_shift_is_rejected() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let left = b.num(8.0);
    let right = b.num(1.0);
    let shift = b.binary(BinaryOperator::ShiftRight, left, right);
    let ret = b.ret(Some(shift));
    let file = b.file(vec![ret]);

    let options = CompilerOptions::default();
    let error = transform_source_file(&file, &oracle, &options).unwrap_err();
    assert!(matches!(error, crate::error::TranspileError::UnsupportedKind { .. }));
}

#[test]
fn throwing_non_strings_is_rejected() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let value = b.num(3.0);
    let throw = b.stmt(StatementKind::Throw(value));
    let file = b.file(vec![throw]);

    let options = CompilerOptions::default();
    let error = transform_source_file(&file, &oracle, &options).unwrap_err();
    assert!(matches!(error, crate::error::TranspileError::InvalidThrowExpression { .. }));
}

#[test]
fn string_concatenation_wraps_non_literals() {
    let mut b = AstBuilder::new();
    let mut oracle = TestOracle::new();

    let greeting = b.str("n = ");
    let n = b.ident_expr("n");
    oracle.type_expression(&n, Type::number());
    let concat = b.binary(BinaryOperator::Add, greeting, n);
    let ret = b.ret(Some(concat));
    let file = b.file(vec![ret]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("\"n = \" .. tostring(n)"), "chunk:\n{chunk}");
}

#[test]
fn typeof_comparison_fuses_to_type_call() {
    let mut b = AstBuilder::new();
    let oracle = TestOracle::new();

    let x = b.ident_expr("x");
    let type_of = b.expr(ExpressionKind::TypeOf(Box::new(x)));
    let literal = b.str("object");
    let comparison = b.binary(BinaryOperator::Equal, type_of, literal);
    let ret = b.ret(Some(comparison));
    let file = b.file(vec![ret]);

    let chunk = transpile(&file, &oracle);
    assert!(chunk.contains("type(x) == \"table\""), "chunk:\n{chunk}");
    // No helper needed once fused.
    assert!(!chunk.contains("__TS__TypeOf"), "chunk:\n{chunk}");
}
