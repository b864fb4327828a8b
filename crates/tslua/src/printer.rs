// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Lua source rendering of the emitted AST.
//!
//! A compact, precedence-aware printer. It performs no optimisation: the
//! transformer decides shape, the printer decides spelling. Parentheses are
//! inserted conservatively wherever precedence or the prefix-expression
//! grammar demands them.

use crate::lua_ast::{
    LuaBinaryOp, LuaBlock, LuaExpression, LuaExpressionKind, LuaStatement, LuaStatementKind,
    LuaTableField, LuaUnaryOp,
};
use crate::mangle;

/// Renders a block as a complete chunk.
pub fn print_block(block: &LuaBlock) -> String {
    let mut printer = LuaPrinter::new();
    printer.print_statements(&block.statements);
    printer.output
}

/// Renders a single expression (used by tests and diagnostics).
pub fn print_expression(expression: &LuaExpression) -> String {
    let mut printer = LuaPrinter::new();
    printer.expression(expression, 0)
}

/// Escapes a string for use in a Lua string literal.
pub fn escape_lua_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

struct LuaPrinter {
    output: String,
    indent_level: usize,
}

impl LuaPrinter {
    fn new() -> Self {
        Self { output: String::new(), indent_level: 0 }
    }

    fn write_line(&mut self, line: &str) {
        if !line.is_empty() {
            self.output.push_str(&"    ".repeat(self.indent_level));
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    fn print_statements(&mut self, statements: &[LuaStatement]) {
        let last = statements.len().saturating_sub(1);
        for (i, statement) in statements.iter().enumerate() {
            // `return` and `break` must close their block; wrap early exits
            // that have trailing (dead) statements.
            let needs_wrap = i != last
                && matches!(
                    statement.kind,
                    LuaStatementKind::Return(_) | LuaStatementKind::Break
                );
            if needs_wrap {
                self.write_line("do");
                self.indent();
                self.print_statement(statement);
                self.dedent();
                self.write_line("end");
            } else {
                self.print_statement(statement);
            }
        }
    }

    fn print_statement(&mut self, statement: &LuaStatement) {
        match &statement.kind {
            LuaStatementKind::Do(block) => {
                self.write_line("do");
                self.indent();
                self.print_statements(&block.statements);
                self.dedent();
                self.write_line("end");
            }
            LuaStatementKind::LocalDeclaration { names, expressions } => {
                let names: Vec<&str> = names.iter().map(|n| n.text.as_str()).collect();
                if expressions.is_empty() {
                    self.write_line(&format!("local {}", names.join(", ")));
                } else {
                    let values: Vec<String> =
                        expressions.iter().map(|e| self.expression(e, 0)).collect();
                    self.write_line(&format!(
                        "local {} = {}",
                        names.join(", "),
                        values.join(", ")
                    ));
                }
            }
            LuaStatementKind::Assignment { targets, expressions } => {
                let targets: Vec<String> = targets.iter().map(|t| self.expression(t, 0)).collect();
                let values: Vec<String> =
                    expressions.iter().map(|e| self.expression(e, 0)).collect();
                self.write_line(&format!("{} = {}", targets.join(", "), values.join(", ")));
            }
            LuaStatementKind::If { condition, then_block, else_block } => {
                self.print_if(condition, then_block, else_block.as_ref(), false);
            }
            LuaStatementKind::While { condition, body } => {
                let condition = self.expression(condition, 0);
                self.write_line(&format!("while {condition} do"));
                self.indent();
                self.print_statements(&body.statements);
                self.dedent();
                self.write_line("end");
            }
            LuaStatementKind::Repeat { body, until } => {
                self.write_line("repeat");
                self.indent();
                self.print_statements(&body.statements);
                self.dedent();
                let until = self.expression(until, 0);
                self.write_line(&format!("until {until}"));
            }
            LuaStatementKind::NumericFor { control, start, limit, step, body } => {
                let start = self.expression(start, 0);
                let limit = self.expression(limit, 0);
                let head = match step {
                    Some(step) => {
                        let step = self.expression(step, 0);
                        format!("for {} = {start}, {limit}, {step} do", control.text)
                    }
                    None => format!("for {} = {start}, {limit} do", control.text),
                };
                self.write_line(&head);
                self.indent();
                self.print_statements(&body.statements);
                self.dedent();
                self.write_line("end");
            }
            LuaStatementKind::GenericFor { names, expressions, body } => {
                let names: Vec<&str> = names.iter().map(|n| n.text.as_str()).collect();
                let values: Vec<String> =
                    expressions.iter().map(|e| self.expression(e, 0)).collect();
                self.write_line(&format!(
                    "for {} in {} do",
                    names.join(", "),
                    values.join(", ")
                ));
                self.indent();
                self.print_statements(&body.statements);
                self.dedent();
                self.write_line("end");
            }
            LuaStatementKind::Return(expressions) => {
                if expressions.is_empty() {
                    self.write_line("return");
                } else {
                    let values: Vec<String> =
                        expressions.iter().map(|e| self.expression(e, 0)).collect();
                    self.write_line(&format!("return {}", values.join(", ")));
                }
            }
            LuaStatementKind::Break => self.write_line("break"),
            LuaStatementKind::Goto(label) => self.write_line(&format!("goto {label}")),
            LuaStatementKind::Label(label) => self.write_line(&format!("::{label}::")),
            LuaStatementKind::Expression(expression) => {
                let text = self.expression(expression, 0);
                if text.starts_with('(') {
                    // A statement starting with `(` would glue onto the
                    // previous line; bind the result to a throwaway local.
                    self.write_line(&format!("local ____ = {text}"));
                } else {
                    self.write_line(&text);
                }
            }
        }
    }

    fn print_if(
        &mut self,
        condition: &LuaExpression,
        then_block: &LuaBlock,
        else_block: Option<&LuaBlock>,
        as_elseif: bool,
    ) {
        let keyword = if as_elseif { "elseif" } else { "if" };
        let condition = self.expression(condition, 0);
        self.write_line(&format!("{keyword} {condition} then"));
        self.indent();
        self.print_statements(&then_block.statements);
        self.dedent();
        match else_block {
            None => self.write_line("end"),
            Some(block) => {
                if block.statements.len() == 1 {
                    if let LuaStatementKind::If {
                        condition,
                        then_block,
                        else_block,
                    } = &block.statements[0].kind
                    {
                        self.print_if(condition, then_block, else_block.as_ref(), true);
                        return;
                    }
                }
                self.write_line("else");
                self.indent();
                self.print_statements(&block.statements);
                self.dedent();
                self.write_line("end");
            }
        }
    }

    // ---- expressions -----------------------------------------------------

    /// Renders an expression, parenthesising when its precedence is below
    /// the surrounding minimum.
    fn expression(&mut self, expression: &LuaExpression, minimum: u8) -> String {
        match &expression.kind {
            LuaExpressionKind::Nil => "nil".to_string(),
            LuaExpressionKind::True => "true".to_string(),
            LuaExpressionKind::False => "false".to_string(),
            LuaExpressionKind::Dots => "...".to_string(),
            LuaExpressionKind::Number(value) => format_number(*value),
            LuaExpressionKind::String(value) => format!("\"{}\"", escape_lua_string(value)),
            LuaExpressionKind::Identifier(identifier) => identifier.text.clone(),
            LuaExpressionKind::Function { parameters, vararg, body } => {
                let mut params: Vec<&str> = parameters.iter().map(|p| p.text.as_str()).collect();
                if *vararg {
                    params.push("...");
                }
                let mut inner = LuaPrinter::new();
                inner.indent_level = self.indent_level + 1;
                inner.print_statements(&body.statements);
                let body_text = inner.output;
                let closing = "    ".repeat(self.indent_level);
                format!("function({})\n{}{closing}end", params.join(", "), body_text)
            }
            LuaExpressionKind::Table(fields) => {
                if fields.is_empty() {
                    return "{}".to_string();
                }
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|field| match field {
                        LuaTableField::Positional(value) => self.expression(value, 0),
                        LuaTableField::Named { key, value } => {
                            format!("{key} = {}", self.expression(value, 0))
                        }
                        LuaTableField::Computed { key, value } => {
                            format!("[{}] = {}", self.expression(key, 0), self.expression(value, 0))
                        }
                    })
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            LuaExpressionKind::Binary { op, left, right } => {
                let precedence = binary_precedence(*op);
                let (left_min, right_min) = if right_associative(*op) {
                    (precedence + 1, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                let text = format!(
                    "{} {} {}",
                    self.expression(left, left_min),
                    binary_symbol(*op),
                    self.expression(right, right_min)
                );
                if precedence < minimum {
                    format!("({text})")
                } else {
                    text
                }
            }
            LuaExpressionKind::Unary { op, operand } => {
                let precedence = UNARY_PRECEDENCE;
                let operand_text = self.expression(operand, precedence + 1);
                let symbol = unary_symbol(*op);
                let space = if symbol == "not" { " " } else { "" };
                // `- -x` needs the space to avoid a comment token.
                let space = if symbol == "-" && operand_text.starts_with('-') { " " } else { space };
                let text = format!("{symbol}{space}{operand_text}");
                if precedence < minimum {
                    format!("({text})")
                } else {
                    text
                }
            }
            LuaExpressionKind::Index { object, key } => {
                let object_text = self.prefix_expression(object);
                if let LuaExpressionKind::String(name) = &key.kind {
                    if mangle::is_valid_lua_identifier(name) && !mangle::is_lua_keyword(name) {
                        return format!("{object_text}.{name}");
                    }
                }
                let key_text = self.expression(key, 0);
                format!("{object_text}[{key_text}]")
            }
            LuaExpressionKind::Call { function, arguments } => {
                let callee = self.prefix_expression(function);
                let args: Vec<String> =
                    arguments.iter().map(|a| self.expression(a, 0)).collect();
                format!("{callee}({})", args.join(", "))
            }
            LuaExpressionKind::MethodCall { object, method, arguments } => {
                let receiver = self.prefix_expression(object);
                let args: Vec<String> =
                    arguments.iter().map(|a| self.expression(a, 0)).collect();
                format!("{receiver}:{method}({})", args.join(", "))
            }
        }
    }

    /// Renders an expression in prefix position (callee, receiver, indexed
    /// table), parenthesising anything that is not already a prefix
    /// expression in the Lua grammar.
    fn prefix_expression(&mut self, expression: &LuaExpression) -> String {
        let text = self.expression(expression, 0);
        match expression.kind {
            LuaExpressionKind::Identifier(_)
            | LuaExpressionKind::Index { .. }
            | LuaExpressionKind::Call { .. }
            | LuaExpressionKind::MethodCall { .. } => text,
            _ => format!("({text})"),
        }
    }
}

const UNARY_PRECEDENCE: u8 = 11;

fn binary_precedence(op: LuaBinaryOp) -> u8 {
    match op {
        LuaBinaryOp::Or => 1,
        LuaBinaryOp::And => 2,
        LuaBinaryOp::Lt
        | LuaBinaryOp::Gt
        | LuaBinaryOp::Le
        | LuaBinaryOp::Ge
        | LuaBinaryOp::Ne
        | LuaBinaryOp::Eq => 3,
        LuaBinaryOp::BitOr => 4,
        LuaBinaryOp::BitXor => 5,
        LuaBinaryOp::BitAnd => 6,
        LuaBinaryOp::ShiftLeft | LuaBinaryOp::ShiftRight => 7,
        LuaBinaryOp::Concat => 8,
        LuaBinaryOp::Add | LuaBinaryOp::Sub => 9,
        LuaBinaryOp::Mul | LuaBinaryOp::Div | LuaBinaryOp::Mod => 10,
        LuaBinaryOp::Pow => 12,
    }
}

fn right_associative(op: LuaBinaryOp) -> bool {
    matches!(op, LuaBinaryOp::Concat | LuaBinaryOp::Pow)
}

fn binary_symbol(op: LuaBinaryOp) -> &'static str {
    match op {
        LuaBinaryOp::Add => "+",
        LuaBinaryOp::Sub => "-",
        LuaBinaryOp::Mul => "*",
        LuaBinaryOp::Div => "/",
        LuaBinaryOp::Mod => "%",
        LuaBinaryOp::Pow => "^",
        LuaBinaryOp::Concat => "..",
        LuaBinaryOp::Eq => "==",
        LuaBinaryOp::Ne => "~=",
        LuaBinaryOp::Lt => "<",
        LuaBinaryOp::Le => "<=",
        LuaBinaryOp::Gt => ">",
        LuaBinaryOp::Ge => ">=",
        LuaBinaryOp::And => "and",
        LuaBinaryOp::Or => "or",
        LuaBinaryOp::BitAnd => "&",
        LuaBinaryOp::BitOr => "|",
        LuaBinaryOp::BitXor => "~",
        LuaBinaryOp::ShiftLeft => "<<",
        LuaBinaryOp::ShiftRight => ">>",
    }
}

fn unary_symbol(op: LuaUnaryOp) -> &'static str {
    match op {
        LuaUnaryOp::Neg => "-",
        LuaUnaryOp::Not => "not",
        LuaUnaryOp::Len => "#",
        LuaUnaryOp::BitNot => "~",
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua_ast::{LuaIdentifier, LuaStatement};

    fn name(text: &str) -> LuaExpression {
        LuaExpression::name(text, None)
    }

    #[test]
    fn binary_precedence_inserts_parentheses() {
        // (a + b) * c
        let product = LuaExpression::binary(
            LuaBinaryOp::Mul,
            LuaExpression::binary(LuaBinaryOp::Add, name("a"), name("b"), None),
            name("c"),
            None,
        );
        assert_eq!(print_expression(&product), "(a + b) * c");

        // a + b * c needs none
        let sum = LuaExpression::binary(
            LuaBinaryOp::Add,
            name("a"),
            LuaExpression::binary(LuaBinaryOp::Mul, name("b"), name("c"), None),
            None,
        );
        assert_eq!(print_expression(&sum), "a + b * c");
    }

    #[test]
    fn and_or_chain_prints_flat() {
        let ternary = LuaExpression::binary(
            LuaBinaryOp::Or,
            LuaExpression::binary(LuaBinaryOp::And, name("cond"), name("a"), None),
            name("b"),
            None,
        );
        assert_eq!(print_expression(&ternary), "cond and a or b");
    }

    #[test]
    fn safe_string_keys_print_as_dots() {
        let safe = LuaExpression::dot(name("t"), "field", None);
        assert_eq!(print_expression(&safe), "t.field");
        let keyword = LuaExpression::dot(name("t"), "end", None);
        assert_eq!(print_expression(&keyword), "t[\"end\"]");
        let spaced = LuaExpression::dot(name("t"), "two words", None);
        assert_eq!(print_expression(&spaced), "t[\"two words\"]");
    }

    #[test]
    fn non_prefix_receivers_are_parenthesised() {
        let call_on_table = LuaExpression::method_call(
            LuaExpression::table(Vec::new(), None),
            "m",
            Vec::new(),
            None,
        );
        assert_eq!(print_expression(&call_on_table), "({}):m()");
    }

    #[test]
    fn numbers_print_without_trailing_zeroes() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-2.0), "-2");
    }

    #[test]
    fn trailing_statements_after_return_are_wrapped() {
        let block = LuaBlock::new(vec![
            LuaStatement::return_statement(vec![name("x")], None),
            LuaStatement::expression(
                LuaExpression::call(name("f"), Vec::new(), None),
                None,
            ),
        ]);
        let printed = print_block(&block);
        assert!(printed.contains("do\n    return x\nend\nf()\n"), "got: {printed}");
    }

    #[test]
    fn double_negation_keeps_a_space() {
        let double = LuaExpression::unary(
            crate::lua_ast::LuaUnaryOp::Neg,
            LuaExpression::unary(crate::lua_ast::LuaUnaryOp::Neg, name("x"), None),
            None,
        );
        let text = print_expression(&double);
        assert!(!text.contains("--"), "got: {text}");
    }

    #[test]
    fn local_function_bodies_indent() {
        let function = LuaExpression::function(
            vec![LuaIdentifier::named("a")],
            false,
            LuaBlock::new(vec![LuaStatement::return_statement(vec![name("a")], None)]),
            None,
        );
        let statement = LuaStatement::local_single(
            LuaIdentifier::named("id"),
            Some(function),
            None,
        );
        let printed = print_block(&LuaBlock::new(vec![statement]));
        assert_eq!(printed, "local id = function(a)\n    return a\nend\n");
    }
}
