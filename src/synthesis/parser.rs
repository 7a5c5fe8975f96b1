//! 组件源码解析：顶层声明、函数体绑定、表达式与 JSX 标记

use crate::synthesis::ast::{
    ArrowBody, Attr, AttrValue, BinaryOp, Binding, Block, Element, Expr, FunctionDef, Hook, Item,
    Literal, Node, ObjectEntry, Pattern, PatternField, Program, TemplatePart, UnaryOp,
};
use crate::synthesis::error::SynthesisError;

/// 表达式与标记的最大嵌套层数
const MAX_NESTING: usize = 100;

const RESERVED: [&str; 18] = [
    "return", "if", "else", "for", "while", "do", "switch", "case", "break", "continue", "const",
    "let", "var", "class", "throw", "try", "catch", "delete",
];

#[derive(Debug, Clone)]
struct ParseError {
    message: String,
    /// 致命错误不会被语句体回退吞掉（未知 Hook、嵌套过深）
    fatal: bool,
}

type ParseResult<T> = Result<T, ParseError>;

/// 解析整段源码
pub fn parse_program(source: &str) -> Result<Program, SynthesisError> {
    Parser::new(source)
        .parse()
        .map_err(|e| SynthesisError::transpile(e.message))
}

struct Parser {
    input: String,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser {
            input: input.to_string(),
            pos: 0,
            depth: 0,
        }
    }

    /// Convert byte position to (line, column) for error messages
    fn pos_to_line_col(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;

        for (i, ch) in self.input.char_indices() {
            if i >= pos {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }

        (line, col)
    }

    fn error_at(&self, pos: usize, message: &str) -> ParseError {
        let (line, col) = self.pos_to_line_col(pos);
        ParseError {
            message: format!("[Line {}:{}] {}", line, col, message),
            fatal: false,
        }
    }

    /// Create an error message with position information
    fn error_at_pos(&self, message: &str) -> ParseError {
        self.error_at(self.pos, message)
    }

    fn fatal_at(&self, pos: usize, message: &str) -> ParseError {
        ParseError {
            fatal: true,
            ..self.error_at(pos, message)
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.fatal_at(self.pos, "Nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse(&mut self) -> ParseResult<Program> {
        let mut items: Vec<Item> = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek_char() else { break };
            let start = self.pos;

            if ch == ';' {
                self.advance_char();
                continue;
            }

            // 清洗后通常已经没有模块语法，这里再容忍一次
            if self.consume_keyword("export") {
                self.skip_whitespace();
                self.consume_keyword("default");
                continue;
            }
            if self.peek_keyword("import") {
                self.skip_past_line();
                continue;
            }
            if self.consume_keyword("interface") {
                self.skip_whitespace();
                self.parse_identifier()?;
                self.skip_whitespace();
                if self.peek_char() == Some('<') {
                    self.skip_angle_brackets()?;
                    self.skip_whitespace();
                }
                if self.consume_keyword("extends") {
                    while !matches!(self.peek_char(), Some('{') | None) {
                        self.advance_char();
                    }
                }
                self.skip_balanced()?;
                continue;
            }
            if self.peek_keyword("type") && self.is_type_alias() {
                self.skip_type_alias();
                continue;
            }
            if self.peek_keyword("class") {
                return Err(self.error_at_pos("Class components are not supported"));
            }
            if self.peek_keyword("enum") {
                return Err(self.error_at_pos("Enums are not supported"));
            }

            let new_items = if self.peek_keyword("function") || self.peek_keyword("async") {
                self.consume_keyword("async");
                self.skip_whitespace();
                let (name, params, body, source) = self.parse_function_declaration()?;
                vec![match body {
                    ArrowBody::Expr(_) | ArrowBody::Block(_) => Item::Function(FunctionDef {
                        name,
                        params,
                        block: into_block(body),
                    }),
                    ArrowBody::Opaque { reason } => Item::Opaque {
                        name,
                        source,
                        reason,
                    },
                }]
            } else if self.peek_declaration_keyword() {
                self.parse_top_level_declaration()?
            } else {
                return Err(self.error_at_pos("Unexpected top-level statement"));
            };

            for item in new_items {
                let duplicate = item_names(&item)
                    .into_iter()
                    .find(|name| items.iter().any(|prev| item_names(prev).contains(name)));
                if let Some(name) = duplicate {
                    return Err(self.error_at(start, &format!("Duplicate declaration '{}'", name)));
                }
                items.push(item);
            }
        }

        Ok(Program { items })
    }

    fn parse_top_level_declaration(&mut self) -> ParseResult<Vec<Item>> {
        self.consume_declaration_keyword();
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            let pattern = self.parse_pattern()?;
            self.skip_whitespace();
            if self.peek_char() == Some(':') {
                self.skip_type_annotation(false);
                self.skip_whitespace();
            }
            if self.peek_char() != Some('=') {
                return Err(self.error_at_pos("Declaration without initializer"));
            }
            self.advance_char();
            self.skip_whitespace();
            let value = self.parse_expression()?;

            items.push(match (pattern, value) {
                (Pattern::Ident(name), Expr::Arrow { params, body, source }) => match body {
                    ArrowBody::Opaque { reason } => Item::Opaque {
                        name,
                        source,
                        reason,
                    },
                    body => Item::Function(FunctionDef {
                        name,
                        params,
                        block: into_block(body),
                    }),
                },
                (pattern, value) => Item::Const { pattern, value },
            });

            self.skip_whitespace();
            if self.peek_char() == Some(',') {
                self.advance_char();
                continue;
            }
            break;
        }

        self.consume_char(';');
        Ok(items)
    }

    /// `function name(params) { ... }`，返回 (名字, 参数, 函数体, 源码)
    fn parse_function_declaration(
        &mut self,
    ) -> ParseResult<(String, Vec<Pattern>, ArrowBody, String)> {
        let start = self.pos;
        self.expect_keyword("function")?;
        self.skip_whitespace();
        let name = self.parse_identifier()?;
        self.skip_whitespace();
        if self.peek_char() == Some('<') {
            self.skip_angle_brackets()?;
            self.skip_whitespace();
        }
        let params = self.parse_params()?;
        self.skip_whitespace();
        if self.peek_char() == Some(':') {
            self.skip_type_annotation(false);
            self.skip_whitespace();
        }
        if self.peek_char() != Some('{') {
            return Err(self.error_at_pos("Expected function body"));
        }
        let body = self.parse_function_body()?;
        let source = self.input[start..self.pos].to_string();
        Ok((name, params, body, source))
    }

    /// 尝试把 `{ ... }` 解析为可求值的语句体；不支持的语句整体退化为不透明源码
    fn parse_function_body(&mut self) -> ParseResult<ArrowBody> {
        let start = self.pos;
        let depth = self.depth;
        match self.parse_block() {
            Ok(block) => Ok(ArrowBody::Block(Box::new(block))),
            Err(e) if e.fatal => Err(e),
            Err(e) => {
                self.pos = start;
                self.depth = depth;
                self.skip_balanced()?;
                Ok(ArrowBody::Opaque { reason: e.message })
            }
        }
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.expect_char('{')?;
        let mut bindings = Vec::new();
        let mut guards: Vec<(Expr, Expr)> = Vec::new();
        let mut result: Option<Expr> = None;

        loop {
            self.skip_whitespace();
            match self.peek_char() {
                None => return Err(self.error_at_pos("Unexpected end of input in function body")),
                Some('}') => {
                    self.advance_char();
                    break;
                }
                Some(';') => {
                    self.advance_char();
                    continue;
                }
                _ => {}
            }

            if result.is_some() {
                return Err(self.error_at_pos("Unreachable code after return"));
            }

            if self.consume_keyword("return") {
                self.skip_whitespace();
                let value = if matches!(self.peek_char(), Some(';') | Some('}')) {
                    Expr::undefined()
                } else {
                    self.parse_expression()?
                };
                self.consume_char(';');
                result = Some(value);
            } else if self.peek_keyword("if") {
                guards.push(self.parse_guard()?);
            } else if self.peek_declaration_keyword() {
                bindings.extend(self.parse_binding_declaration()?);
            } else if self.peek_keyword("function") {
                let (name, params, body, source) = self.parse_function_declaration()?;
                bindings.push(match body {
                    ArrowBody::Opaque { .. } => Binding::Handler { name, source },
                    body => Binding::Const {
                        pattern: Pattern::Ident(name),
                        value: Expr::Arrow {
                            params,
                            body,
                            source,
                        },
                    },
                });
            } else {
                let start = self.pos;
                let expr = self.parse_expression()?;
                let source = self.input[start..self.pos].trim().to_string();
                self.skip_whitespace();
                if !matches!(self.peek_char(), Some(';') | Some('}') | None)
                    && !self.at_line_break_since(start)
                {
                    return Err(self.error_at_pos("Unsupported statement"));
                }
                match hook_of_call(&expr) {
                    Some(hook @ (Hook::Effect | Hook::LayoutEffect)) => {
                        bindings.push(Binding::Effect { hook, source });
                    }
                    _ => return Err(self.error_at(start, "Unsupported statement")),
                }
                self.consume_char(';');
            }
        }

        let Some(mut result) = result else {
            return Err(self.error_at_pos("Function has no return statement"));
        };
        for (test, value) in guards.into_iter().rev() {
            result = Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(value),
                alternate: Box::new(result),
            };
        }

        Ok(Block { bindings, result })
    }

    /// `if (test) return value;`，其余 if 形式不支持
    fn parse_guard(&mut self) -> ParseResult<(Expr, Expr)> {
        self.expect_keyword("if")?;
        self.skip_whitespace();
        self.expect_char('(')?;
        self.skip_whitespace();
        let test = self.parse_expression()?;
        self.skip_whitespace();
        self.expect_char(')')?;
        self.skip_whitespace();

        let braced = self.consume_char('{');
        self.skip_whitespace();
        if !self.consume_keyword("return") {
            return Err(self.error_at_pos("Only early returns are supported in if statements"));
        }
        self.skip_whitespace();
        let value = if matches!(self.peek_char(), Some(';') | Some('}')) {
            Expr::undefined()
        } else {
            self.parse_expression()?
        };
        self.skip_whitespace();
        self.consume_char(';');
        if braced {
            self.skip_whitespace();
            self.expect_char('}')?;
        }
        self.skip_whitespace();
        if self.peek_keyword("else") {
            return Err(self.error_at_pos("else branches are not supported"));
        }

        Ok((test, value))
    }

    fn parse_binding_declaration(&mut self) -> ParseResult<Vec<Binding>> {
        self.consume_declaration_keyword();
        let mut bindings = Vec::new();

        loop {
            self.skip_whitespace();
            let pattern = self.parse_pattern()?;
            self.skip_whitespace();
            if self.peek_char() == Some(':') {
                self.skip_type_annotation(false);
                self.skip_whitespace();
            }
            if self.peek_char() != Some('=') {
                return Err(self.error_at_pos("Declaration without initializer"));
            }
            self.advance_char();
            self.skip_whitespace();

            let value_start = self.pos;
            let value = self.parse_expression()?;
            let source = self.input[value_start..self.pos].trim().to_string();
            bindings.push(self.classify_binding(value_start, pattern, value, source)?);

            self.skip_whitespace();
            if self.peek_char() == Some(',') {
                self.advance_char();
                continue;
            }
            break;
        }

        self.consume_char(';');
        Ok(bindings)
    }

    fn classify_binding(
        &self,
        pos: usize,
        pattern: Pattern,
        value: Expr,
        source: String,
    ) -> ParseResult<Binding> {
        let Some(hook) = hook_of_call(&value) else {
            return Ok(Binding::Const { pattern, value });
        };
        let args = match value {
            Expr::Call { args, .. } => args,
            _ => Vec::new(),
        };
        let arg = |i: usize| args.get(i).cloned().unwrap_or_else(Expr::undefined);

        match hook {
            Hook::State | Hook::Reducer => {
                let (value, setter) = match &pattern {
                    Pattern::Array(fields) => (
                        fields.first().cloned().flatten().map(|f| f.binding),
                        fields.get(1).cloned().flatten().map(|f| f.binding),
                    ),
                    _ => (None, None),
                };
                let Some(value) = value else {
                    return Err(self.error_at(
                        pos,
                        &format!("{} must be destructured as [value, setter]", hook.name()),
                    ));
                };
                let initial = if hook == Hook::Reducer { arg(1) } else { arg(0) };
                Ok(Binding::State {
                    hook,
                    value,
                    setter,
                    initial,
                })
            }
            Hook::Ref => match pattern {
                Pattern::Ident(name) => Ok(Binding::Ref {
                    name,
                    initial: arg(0),
                }),
                _ => Err(self.error_at(pos, "useRef result must be bound to a name")),
            },
            Hook::Memo => Ok(Binding::Memo {
                pattern,
                factory: arg(0),
            }),
            Hook::Callback => match pattern {
                Pattern::Ident(name) => Ok(Binding::Handler { name, source }),
                _ => Err(self.error_at(pos, "useCallback result must be bound to a name")),
            },
            Hook::Context => {
                let context = match args.first() {
                    Some(Expr::Ident(name)) => name.clone(),
                    _ => "context".to_string(),
                };
                Ok(Binding::Context { pattern, context })
            }
            Hook::Effect | Hook::LayoutEffect => Err(self.error_at(
                pos,
                &format!("{} does not return a value", hook.name()),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Patterns and parameters
    // ------------------------------------------------------------------

    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        match self.peek_char() {
            Some('[') => {
                self.advance_char();
                let mut fields = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.peek_char() {
                        Some(']') => {
                            self.advance_char();
                            break;
                        }
                        Some(',') => {
                            self.advance_char();
                            fields.push(None);
                            continue;
                        }
                        _ => {}
                    }
                    if self.starts_with("...") {
                        return Err(self.error_at_pos("Rest patterns are not supported"));
                    }
                    let name = self.parse_identifier()?;
                    self.skip_whitespace();
                    let default = self.parse_pattern_default()?;
                    fields.push(Some(PatternField {
                        key: name.clone(),
                        binding: name,
                        default,
                    }));
                    self.skip_whitespace();
                    if !self.consume_char(',') {
                        self.expect_char(']')?;
                        break;
                    }
                }
                Ok(Pattern::Array(fields))
            }
            Some('{') => {
                self.advance_char();
                let mut fields = Vec::new();
                loop {
                    self.skip_whitespace();
                    if self.consume_char('}') {
                        break;
                    }
                    if self.starts_with("...") {
                        return Err(self.error_at_pos("Rest patterns are not supported"));
                    }
                    let key = self.parse_identifier()?;
                    self.skip_whitespace();
                    let binding = if self.consume_char(':') {
                        self.skip_whitespace();
                        self.parse_identifier()?
                    } else {
                        key.clone()
                    };
                    self.skip_whitespace();
                    let default = self.parse_pattern_default()?;
                    fields.push(PatternField {
                        key,
                        binding,
                        default,
                    });
                    self.skip_whitespace();
                    if !self.consume_char(',') {
                        self.expect_char('}')?;
                        break;
                    }
                }
                Ok(Pattern::Object(fields))
            }
            _ => Ok(Pattern::Ident(self.parse_identifier()?)),
        }
    }

    fn parse_pattern_default(&mut self) -> ParseResult<Option<Expr>> {
        if self.peek_char() == Some('=') && self.peek_ahead(1) != Some('>') {
            self.advance_char();
            self.skip_whitespace();
            return Ok(Some(self.parse_expression()?));
        }
        Ok(None)
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Pattern>> {
        self.expect_char('(')?;
        let mut params = Vec::new();
        loop {
            self.skip_whitespace();
            if self.consume_char(')') {
                break;
            }
            let param = self.parse_pattern()?;
            self.skip_whitespace();
            self.consume_char('?');
            if self.peek_char() == Some(':') {
                self.skip_type_annotation(false);
                self.skip_whitespace();
            }
            // 顶层参数的默认值不参与求值，缺省参数为 undefined
            self.parse_pattern_default()?;
            params.push(param);
            self.skip_whitespace();
            if !self.consume_char(',') {
                self.expect_char(')')?;
                break;
            }
        }
        Ok(params)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.nested(|p| p.parse_conditional())
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_binary(1)?;
        self.skip_whitespace();
        if self.peek_char() == Some('?') && !matches!(self.peek_ahead(1), Some('.') | Some('?')) {
            self.advance_char();
            self.skip_whitespace();
            let consequent = self.parse_expression()?;
            self.skip_whitespace();
            self.expect_char(':')?;
            self.skip_whitespace();
            let alternate = self.parse_expression()?;
            return Ok(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }
        Ok(test)
    }

    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let Some((op, len, prec)) = self.peek_binary_op() else { break };
            if prec < min_prec {
                break;
            }
            self.pos += len;
            self.skip_whitespace();
            let right = self.nested(|p| p.parse_binary(prec + 1))?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// 当前位置的二元运算符：(运算符, 字节长度, 优先级)
    fn peek_binary_op(&self) -> Option<(BinaryOp, usize, u8)> {
        const MULTI: [(&str, BinaryOp, u8); 9] = [
            ("===", BinaryOp::Eq, 4),
            ("!==", BinaryOp::NotEq, 4),
            ("==", BinaryOp::LooseEq, 4),
            ("!=", BinaryOp::LooseNotEq, 4),
            ("<=", BinaryOp::LtEq, 5),
            (">=", BinaryOp::GtEq, 5),
            ("&&", BinaryOp::And, 3),
            ("||", BinaryOp::Or, 2),
            ("??", BinaryOp::Nullish, 1),
        ];
        const SINGLE: [(char, BinaryOp, u8); 7] = [
            ('<', BinaryOp::Lt, 5),
            ('>', BinaryOp::Gt, 5),
            ('+', BinaryOp::Add, 6),
            ('-', BinaryOp::Sub, 6),
            ('*', BinaryOp::Mul, 7),
            ('/', BinaryOp::Div, 7),
            ('%', BinaryOp::Rem, 7),
        ];

        let rest = &self.input[self.pos..];
        for (token, op, prec) in MULTI {
            if rest.starts_with(token) {
                // `&&=` / `||=` / `??=` 是赋值
                if matches!(op, BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish)
                    && rest[token.len()..].starts_with('=')
                {
                    return None;
                }
                return Some((op, token.len(), prec));
            }
        }
        let mut chars = rest.chars();
        let first = chars.next()?;
        let second = chars.next();
        for (token, op, prec) in SINGLE {
            if first == token {
                // `+=`、`++`、`=>` 之类不是二元运算
                if second == Some('=') || second == Some(token) && matches!(token, '+' | '-') {
                    return None;
                }
                return Some((op, 1, prec));
            }
        }
        None
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('!') if self.peek_ahead(1) != Some('=') => {
                self.advance_char();
                let operand = self.nested(|p| p.parse_unary())?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            Some('-') if !matches!(self.peek_ahead(1), Some('-') | Some('=')) => {
                self.advance_char();
                let operand = self.nested(|p| p.parse_unary())?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Some('+') if !matches!(self.peek_ahead(1), Some('+') | Some('=')) => {
                self.advance_char();
                let operand = self.nested(|p| p.parse_unary())?;
                Ok(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::Literal(Literal::Number(1.0))),
                    right: Box::new(operand),
                })
            }
            _ => {
                if self.peek_keyword("typeof") || self.peek_keyword("await") || self.peek_keyword("void") {
                    return Err(self.error_at_pos("Unsupported unary operator"));
                }
                self.parse_postfix()
            }
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        let mut expr = self.parse_primary()?;

        loop {
            // 换行后的 `(` / `[` 视为新语句
            let before = self.pos;
            self.skip_whitespace();
            let crossed_line = self.input[before..self.pos].contains('\n');

            if self.starts_with("?.") {
                self.pos += 2;
                self.skip_whitespace();
                match self.peek_char() {
                    Some('(') => {
                        let args = self.parse_arguments()?;
                        expr = self.make_call(start, expr, args)?;
                    }
                    Some('[') => {
                        let index = self.parse_index()?;
                        expr = Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        };
                    }
                    _ => {
                        let property = self.parse_identifier()?;
                        expr = Expr::Member {
                            object: Box::new(expr),
                            property,
                            optional: true,
                        };
                    }
                }
                continue;
            }

            match self.peek_char() {
                Some('.') if !self.starts_with("...") => {
                    self.advance_char();
                    self.skip_whitespace();
                    let property = self.parse_identifier()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: false,
                    };
                }
                Some('[') if !crossed_line => {
                    let index = self.parse_index()?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some('(') if !crossed_line => {
                    let args = self.parse_arguments()?;
                    expr = self.make_call(start, expr, args)?;
                }
                Some('<') if !crossed_line && callee_is_hook(&expr) => {
                    // useState<Task[]>(...)
                    self.skip_angle_brackets()?;
                }
                Some('!') if !crossed_line && self.peek_ahead(1) != Some('=') => {
                    // TS 非空断言
                    self.advance_char();
                }
                _ if !crossed_line && self.peek_keyword("as") => {
                    self.expect_keyword("as")?;
                    self.skip_whitespace();
                    self.skip_simple_type()?;
                }
                _ => {
                    self.pos = before;
                    break;
                }
            }
        }

        Ok(expr)
    }

    fn make_call(&self, start: usize, callee: Expr, args: Vec<Expr>) -> ParseResult<Expr> {
        if let Some(name) = callee_name(&callee) {
            if Hook::looks_like_hook(&name) && Hook::from_name(&name).is_none() {
                return Err(self.fatal_at(start, &format!("Unknown hook '{}'", name)));
            }
        }
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_index(&mut self) -> ParseResult<Expr> {
        self.expect_char('[')?;
        self.skip_whitespace();
        let index = self.parse_expression()?;
        self.skip_whitespace();
        self.expect_char(']')?;
        Ok(index)
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect_char('(')?;
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            if self.consume_char(')') {
                break;
            }
            args.push(self.parse_element_or_spread()?);
            self.skip_whitespace();
            if !self.consume_char(',') {
                self.expect_char(')')?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_element_or_spread(&mut self) -> ParseResult<Expr> {
        if self.starts_with("...") {
            self.pos += 3;
            self.skip_whitespace();
            let inner = self.parse_expression()?;
            return Ok(Expr::Spread(Box::new(inner)));
        }
        self.parse_expression()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        self.skip_whitespace();
        let Some(ch) = self.peek_char() else {
            return Err(self.error_at_pos("Unexpected end of input"));
        };

        match ch {
            '0'..='9' => self.parse_number(),
            '.' if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => self.parse_number(),
            '"' | '\'' => Ok(Expr::str(self.parse_string_literal()?)),
            '`' => self.parse_template(),
            '(' => {
                if self.is_arrow_ahead() {
                    return self.parse_arrow();
                }
                self.advance_char();
                self.skip_whitespace();
                let inner = self.parse_expression()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(inner)
            }
            '[' => {
                self.advance_char();
                let mut elements = Vec::new();
                loop {
                    self.skip_whitespace();
                    if self.consume_char(']') {
                        break;
                    }
                    elements.push(self.parse_element_or_spread()?);
                    self.skip_whitespace();
                    if !self.consume_char(',') {
                        self.expect_char(']')?;
                        break;
                    }
                }
                Ok(Expr::Array(elements))
            }
            '{' => self.parse_object(),
            '<' => Ok(Expr::Markup(Box::new(self.parse_markup()?))),
            c if is_ident_start(c) => {
                if self.peek_keyword("async") && self.is_async_arrow() {
                    self.expect_keyword("async")?;
                    self.skip_whitespace();
                    if self.peek_char() == Some('(') {
                        return self.parse_arrow();
                    }
                    return self.parse_single_param_arrow();
                }
                if self.peek_keyword("function") {
                    return self.parse_function_expression();
                }
                if self.peek_keyword("new") || self.peek_keyword("this") {
                    return Err(self.error_at_pos("Unsupported expression"));
                }
                for word in RESERVED {
                    if self.peek_keyword(word) {
                        return Err(self.error_at_pos(&format!("Unexpected keyword '{}'", word)));
                    }
                }

                let save = self.pos;
                let name = self.parse_identifier()?;
                match name.as_str() {
                    "true" => return Ok(Expr::Literal(Literal::Bool(true))),
                    "false" => return Ok(Expr::Literal(Literal::Bool(false))),
                    "null" => return Ok(Expr::Literal(Literal::Null)),
                    "undefined" => return Ok(Expr::Literal(Literal::Undefined)),
                    _ => {}
                }
                let end = self.pos;
                self.skip_whitespace();
                if self.starts_with("=>") {
                    self.pos = save;
                    return self.parse_single_param_arrow();
                }
                self.pos = end;
                Ok(Expr::Ident(name))
            }
            other => Err(self.error_at_pos(&format!("Unexpected character '{}'", other))),
        }
    }

    fn parse_number(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || ch == '.' || ch == '_' {
                self.advance_char();
            } else if (ch == 'e' || ch == 'E') && self.pos > start {
                self.advance_char();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance_char();
                }
            } else {
                break;
            }
        }
        let text: String = self.input[start..self.pos].chars().filter(|c| *c != '_').collect();
        text.parse::<f64>()
            .map(|n| Expr::Literal(Literal::Number(n)))
            .map_err(|_| self.error_at(start, &format!("Invalid number '{}'", text)))
    }

    fn parse_string_literal(&mut self) -> ParseResult<String> {
        let quote = self.peek_char().unwrap_or('"');
        let start = self.pos;
        self.advance_char();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(self.error_at(start, "Unterminated string")),
                Some(c) if c == quote => {
                    self.advance_char();
                    break;
                }
                Some('\\') => {
                    self.advance_char();
                    value.push_str(&self.parse_escape()?);
                }
                Some(c) => {
                    value.push(c);
                    self.advance_char();
                }
            }
        }
        Ok(value)
    }

    /// 反斜杠之后的转义序列
    fn parse_escape(&mut self) -> ParseResult<String> {
        let Some(ch) = self.peek_char() else {
            return Err(self.error_at_pos("Unterminated escape sequence"));
        };
        self.advance_char();
        let decoded = match ch {
            'n' => "\n".to_string(),
            't' => "\t".to_string(),
            'r' => "\r".to_string(),
            'b' => "\u{8}".to_string(),
            'f' => "\u{c}".to_string(),
            'v' => "\u{b}".to_string(),
            '0' => "\0".to_string(),
            '\n' => String::new(),
            'x' => {
                let hex: String = self.input[self.pos..].chars().take(2).collect();
                self.pos += hex.len();
                code_point(&hex).ok_or_else(|| self.error_at_pos("Invalid \\x escape"))?
            }
            'u' => {
                let hex = if self.consume_char('{') {
                    let hex: String = self.input[self.pos..]
                        .chars()
                        .take_while(|c| *c != '}')
                        .collect();
                    self.pos += hex.len();
                    self.expect_char('}')?;
                    hex
                } else {
                    let hex: String = self.input[self.pos..].chars().take(4).collect();
                    self.pos += hex.len();
                    hex
                };
                code_point(&hex).ok_or_else(|| self.error_at_pos("Invalid \\u escape"))?
            }
            other => other.to_string(),
        };
        Ok(decoded)
    }

    fn parse_template(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        self.expect_char('`')?;
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.error_at(start, "Unterminated template literal")),
                Some('`') => {
                    self.advance_char();
                    break;
                }
                Some('\\') => {
                    self.advance_char();
                    text.push_str(&self.parse_escape()?);
                }
                Some('$') if self.peek_ahead(1) == Some('{') => {
                    self.pos += 2;
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    self.skip_whitespace();
                    let expr = self.parse_expression()?;
                    self.skip_whitespace();
                    self.expect_char('}')?;
                    parts.push(TemplatePart::Expr(expr));
                }
                Some(c) => {
                    text.push(c);
                    self.advance_char();
                }
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(Expr::Template(parts))
    }

    fn parse_object(&mut self) -> ParseResult<Expr> {
        self.expect_char('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.consume_char('}') {
                break;
            }
            if self.starts_with("...") {
                self.pos += 3;
                self.skip_whitespace();
                entries.push(ObjectEntry::Spread(self.parse_expression()?));
            } else {
                let key = match self.peek_char() {
                    Some('"') | Some('\'') => self.parse_string_literal()?,
                    Some(c) if c.is_ascii_digit() => match self.parse_number()? {
                        Expr::Literal(Literal::Number(n)) => format_number_key(n),
                        _ => return Err(self.error_at_pos("Invalid object key")),
                    },
                    Some('[') => return Err(self.error_at_pos("Computed keys are not supported")),
                    _ => self.parse_identifier()?,
                };
                self.skip_whitespace();
                let value = match self.peek_char() {
                    Some(':') => {
                        self.advance_char();
                        self.skip_whitespace();
                        self.parse_expression()?
                    }
                    Some('(') => {
                        // 方法简写 `name() { ... }`
                        let start = self.pos;
                        let params = self.parse_params()?;
                        self.skip_whitespace();
                        let body = self.parse_function_body()?;
                        Expr::Arrow {
                            params,
                            body,
                            source: self.input[start..self.pos].to_string(),
                        }
                    }
                    _ => Expr::Ident(key.clone()),
                };
                entries.push(ObjectEntry::Prop(key, value));
            }
            self.skip_whitespace();
            if !self.consume_char(',') {
                self.expect_char('}')?;
                break;
            }
        }
        Ok(Expr::Object(entries))
    }

    /// `(` 开头：向前扫描配对括号后是否跟着 `=>`
    fn is_arrow_ahead(&mut self) -> bool {
        let save = self.pos;
        let is_arrow = self.skip_balanced().is_ok() && {
            self.skip_whitespace();
            if self.peek_char() == Some(':') {
                self.skip_type_annotation(true);
                self.skip_whitespace();
            }
            self.starts_with("=>")
        };
        self.pos = save;
        is_arrow
    }

    fn is_async_arrow(&mut self) -> bool {
        let save = self.pos;
        self.pos += "async".len();
        self.skip_whitespace();
        let result = match self.peek_char() {
            Some('(') => self.is_arrow_ahead(),
            Some(c) if is_ident_start(c) => {
                let ok = self.parse_identifier().is_ok();
                self.skip_whitespace();
                ok && self.starts_with("=>")
            }
            _ => false,
        };
        self.pos = save;
        result
    }

    fn parse_arrow(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        let params = self.parse_params()?;
        self.skip_whitespace();
        if self.peek_char() == Some(':') {
            self.skip_type_annotation(true);
            self.skip_whitespace();
        }
        self.parse_arrow_tail(start, params)
    }

    fn parse_single_param_arrow(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        let name = self.parse_identifier()?;
        self.skip_whitespace();
        self.parse_arrow_tail(start, vec![Pattern::Ident(name)])
    }

    fn parse_arrow_tail(&mut self, start: usize, params: Vec<Pattern>) -> ParseResult<Expr> {
        if !self.starts_with("=>") {
            return Err(self.error_at_pos("Expected '=>'"));
        }
        self.pos += 2;
        self.skip_whitespace();
        let body = if self.peek_char() == Some('{') {
            self.parse_function_body()?
        } else {
            ArrowBody::Expr(Box::new(self.parse_expression()?))
        };
        Ok(Expr::Arrow {
            params,
            body,
            source: self.input[start..self.pos].to_string(),
        })
    }

    fn parse_function_expression(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        self.expect_keyword("function")?;
        self.skip_whitespace();
        if self.peek_char().is_some_and(is_ident_start) {
            self.parse_identifier()?;
            self.skip_whitespace();
        }
        let params = self.parse_params()?;
        self.skip_whitespace();
        if self.peek_char() == Some(':') {
            self.skip_type_annotation(false);
            self.skip_whitespace();
        }
        let body = self.parse_function_body()?;
        Ok(Expr::Arrow {
            params,
            body,
            source: self.input[start..self.pos].to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Markup
    // ------------------------------------------------------------------

    fn parse_markup(&mut self) -> ParseResult<Node> {
        self.nested(|p| p.parse_element())
    }

    fn parse_element(&mut self) -> ParseResult<Node> {
        let open_pos = self.pos;
        self.expect_char('<')?;

        // Fragment: <>...</>
        if self.consume_char('>') {
            let children = self.parse_children("", open_pos)?;
            return Ok(Node::Fragment(children));
        }

        let tag = self.parse_tag_name()?;
        let mut attrs = Vec::new();

        let self_closing = loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some('/') => {
                    self.advance_char();
                    self.expect_char('>')?;
                    break true;
                }
                Some('>') => {
                    self.advance_char();
                    break false;
                }
                Some('{') => {
                    self.advance_char();
                    self.skip_whitespace();
                    if !self.starts_with("...") {
                        return Err(self.error_at_pos("Expected spread attribute"));
                    }
                    self.pos += 3;
                    let value = self.parse_expression()?;
                    self.skip_whitespace();
                    self.expect_char('}')?;
                    attrs.push(Attr {
                        name: "...".to_string(),
                        value: AttrValue::Spread(value),
                    });
                }
                None => {
                    return Err(self.error_at(open_pos, &format!("Unclosed tag <{}>", tag)));
                }
                Some(_) => attrs.push(self.parse_attribute()?),
            }
        };

        let children = if self_closing {
            Vec::new()
        } else {
            self.parse_children(&tag, open_pos)?
        };

        if tag == "Fragment" || tag == "React.Fragment" {
            return Ok(Node::Fragment(children));
        }

        Ok(Node::Element(Element {
            tag,
            attrs,
            children,
        }))
    }

    fn parse_attribute(&mut self) -> ParseResult<Attr> {
        let name = self.parse_attr_name()?;
        self.skip_whitespace();
        if !self.consume_char('=') {
            return Ok(Attr {
                name,
                value: AttrValue::Flag,
            });
        }
        self.skip_whitespace();

        let value = match self.peek_char() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos;
                self.advance_char();
                let body_start = self.pos;
                while self.peek_char().is_some_and(|c| c != quote) {
                    self.advance_char();
                }
                if self.peek_char().is_none() {
                    return Err(self.error_at(start, "Unterminated attribute value"));
                }
                let raw = decode_entities(&self.input[body_start..self.pos]);
                self.advance_char();
                if Attr::is_event(&name) {
                    AttrValue::Handler(raw)
                } else {
                    AttrValue::Literal(raw)
                }
            }
            Some('{') if Attr::is_event(&name) => {
                // 处理器只保留源码，从不求值
                let raw = self.skip_balanced()?;
                let inner = raw[1..raw.len() - 1].trim().to_string();
                AttrValue::Handler(inner)
            }
            Some('{') => {
                self.advance_char();
                self.skip_whitespace();
                if self.peek_char() == Some('}') {
                    return Err(self.error_at_pos("Empty attribute expression"));
                }
                let expr = self.parse_expression()?;
                self.skip_whitespace();
                self.expect_char('}')?;
                AttrValue::Expr(expr)
            }
            Some('<') => AttrValue::Expr(Expr::Markup(Box::new(self.parse_markup()?))),
            _ => return Err(self.error_at_pos("Expected attribute value")),
        };

        Ok(Attr { name, value })
    }

    fn parse_children(&mut self, parent: &str, open_pos: usize) -> ParseResult<Vec<Node>> {
        let mut children = Vec::new();

        loop {
            match self.peek_char() {
                None => {
                    return Err(self.error_at(open_pos, &format!("Unclosed tag <{}>", parent)));
                }
                Some('<') if self.peek_ahead(1) == Some('/') => {
                    self.pos += 2;
                    self.skip_whitespace();
                    let closing = if self.peek_char() == Some('>') {
                        String::new()
                    } else {
                        self.parse_tag_name()?
                    };
                    self.skip_whitespace();
                    if closing != parent {
                        return Err(self.error_at_pos(&format!(
                            "Mismatched tags: opening <{}> vs closing </{}>",
                            parent, closing
                        )));
                    }
                    self.expect_char('>')?;
                    break;
                }
                Some('<') => children.push(self.parse_markup()?),
                Some('{') => {
                    self.advance_char();
                    self.skip_whitespace();
                    // `{/* comment */}` 与空表达式
                    if self.consume_char('}') {
                        continue;
                    }
                    let expr = self.parse_expression()?;
                    self.skip_whitespace();
                    self.expect_char('}')?;
                    children.push(Node::Expr(expr));
                }
                Some('}') => return Err(self.error_at_pos("Unexpected '}' in markup")),
                Some(_) => {
                    let start = self.pos;
                    while self.peek_char().is_some_and(|c| c != '<' && c != '{' && c != '}') {
                        self.advance_char();
                    }
                    let text = clean_jsx_text(&self.input[start..self.pos]);
                    if !text.is_empty() {
                        children.push(Node::Text(decode_entities(&text)));
                    }
                }
            }
        }

        Ok(children)
    }

    fn parse_tag_name(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| is_ident_char(c) || c == '.' || c == '-' || c == ':')
        {
            self.advance_char();
        }
        if start == self.pos {
            return Err(self.error_at_pos("Expected tag name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_attr_name(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| is_ident_char(c) || c == '-' || c == ':')
        {
            self.advance_char();
        }
        if start == self.pos {
            let found = self.peek_char().unwrap_or(' ');
            return Err(self.error_at_pos(&format!("Unexpected '{}' in tag", found)));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    // ------------------------------------------------------------------
    // Skipping (types, balanced source)
    // ------------------------------------------------------------------

    /// 跳过 `: Type`；stop_at_arrow 用于箭头函数的返回类型
    fn skip_type_annotation(&mut self, stop_at_arrow: bool) {
        self.advance_char();
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(ch) = self.peek_char() {
            match ch {
                '(' | '[' | '<' => depth += 1,
                '{' => {
                    if depth == 0 && !self.input[start..self.pos].trim().is_empty() {
                        break;
                    }
                    depth += 1;
                }
                ')' | ']' | '>' | '}' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                '=' if depth == 0 => {
                    if self.peek_ahead(1) == Some('>') && !stop_at_arrow {
                        self.advance_char();
                    } else {
                        break;
                    }
                }
                ',' | ';' if depth == 0 => break,
                '"' | '\'' => {
                    if self.skip_string(ch).is_err() {
                        break;
                    }
                    continue;
                }
                _ => {}
            }
            self.advance_char();
        }
    }

    /// `as Type` 中的类型：标识符路径 + 可选泛型 + 数组后缀
    fn skip_simple_type(&mut self) -> ParseResult<()> {
        if self.consume_keyword("const") {
            return Ok(());
        }
        self.parse_identifier()?;
        while self.peek_char() == Some('.') {
            self.advance_char();
            self.parse_identifier()?;
        }
        if self.peek_char() == Some('<') {
            self.skip_angle_brackets()?;
        }
        while self.starts_with("[]") {
            self.pos += 2;
        }
        Ok(())
    }

    fn skip_angle_brackets(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(ch) = self.peek_char() {
            match ch {
                '<' => depth += 1,
                '>' if self.input[..self.pos].ends_with('=') => {}
                '>' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance_char();
                        return Ok(());
                    }
                }
                ';' => break,
                _ => {}
            }
            self.advance_char();
        }
        Err(self.error_at(start, "Unclosed type arguments"))
    }

    fn is_type_alias(&self) -> bool {
        let rest = &self.input[self.pos + "type".len()..];
        let rest = rest.trim_start();
        let ident_len = rest
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        ident_len > 0 && {
            let after = rest[ident_len..].trim_start();
            after.starts_with('=') || after.starts_with('<')
        }
    }

    /// `type X = ...`：到深度 0 的分号，或下一行不再延续类型为止
    fn skip_type_alias(&mut self) {
        let mut depth = 0usize;
        let mut seen_eq = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '(' | '[' | '{' | '<' => depth += 1,
                ')' | ']' | '}' | '>' if depth > 0 => depth -= 1,
                '=' if depth == 0 && self.peek_ahead(1) != Some('>') => seen_eq = true,
                ';' if depth == 0 => {
                    self.advance_char();
                    return;
                }
                '\n' if depth == 0 && seen_eq => {
                    let rest = self.input[self.pos..].trim_start();
                    let before = self.input[..self.pos].trim_end();
                    let continues = rest.starts_with('|')
                        || rest.starts_with('&')
                        || before.ends_with('=')
                        || before.ends_with('|')
                        || before.ends_with('&');
                    if !continues {
                        return;
                    }
                }
                _ => {}
            }
            self.advance_char();
        }
    }

    /// 跳过以 ( [ { 开头的配对片段，返回其源码
    fn skip_balanced(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut prev: Option<char> = None;

        while let Some(ch) = self.peek_char() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance_char();
                        return Ok(self.input[start..self.pos].to_string());
                    }
                }
                // 紧跟在单词后的引号是标记文本里的撇号
                '"' | '\'' | '`' if !prev.is_some_and(|c| c.is_alphanumeric()) => {
                    self.skip_string(ch)?;
                    prev = Some(ch);
                    continue;
                }
                '/' if matches!(self.peek_ahead(1), Some('/') | Some('*')) => {
                    self.skip_whitespace();
                    continue;
                }
                _ => {}
            }
            if !ch.is_whitespace() {
                prev = Some(ch);
            }
            self.advance_char();
        }

        Err(self.error_at(start, "Unbalanced brackets"))
    }

    fn skip_string(&mut self, quote: char) -> ParseResult<()> {
        let start = self.pos;
        self.advance_char();
        while let Some(ch) = self.peek_char() {
            match ch {
                '\\' => {
                    self.advance_char();
                    self.advance_char();
                    continue;
                }
                '\n' if quote != '`' => break,
                '$' if quote == '`' && self.peek_ahead(1) == Some('{') => {
                    self.advance_char();
                    self.skip_balanced()?;
                    continue;
                }
                c if c == quote => {
                    self.advance_char();
                    return Ok(());
                }
                _ => {}
            }
            self.advance_char();
        }
        Err(self.error_at(start, "Unterminated string"))
    }

    fn skip_past_line(&mut self) {
        while let Some(ch) = self.peek_char() {
            self.advance_char();
            if ch == '\n' {
                break;
            }
        }
    }

    /// 从 start 到当前位置之间是否跨过换行（无分号语句）
    fn at_line_break_since(&self, start: usize) -> bool {
        let mut cursor = self.pos;
        while cursor > start {
            let ch = self.input[..cursor].chars().next_back().unwrap_or(' ');
            if ch == '\n' {
                return true;
            }
            if !ch.is_whitespace() {
                return false;
            }
            cursor -= ch.len_utf8();
        }
        false
    }

    // ------------------------------------------------------------------
    // Low-level helpers
    // ------------------------------------------------------------------

    fn parse_identifier(&mut self) -> ParseResult<String> {
        let start = self.pos;
        if !self.peek_char().is_some_and(is_ident_start) {
            return Err(self.error_at_pos("Expected identifier"));
        }
        while self.peek_char().is_some_and(is_ident_char) {
            self.advance_char();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn peek_declaration_keyword(&self) -> bool {
        self.peek_keyword("const") || self.peek_keyword("let") || self.peek_keyword("var")
    }

    fn consume_declaration_keyword(&mut self) {
        let _ = self.consume_keyword("const")
            || self.consume_keyword("let")
            || self.consume_keyword("var");
    }

    fn peek_keyword(&self, word: &str) -> bool {
        let rest = &self.input[self.pos..];
        rest.starts_with(word)
            && !rest[word.len()..]
                .chars()
                .next()
                .is_some_and(is_ident_char)
    }

    fn consume_keyword(&mut self, word: &str) -> bool {
        if self.peek_keyword(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, word: &str) -> ParseResult<()> {
        if self.consume_keyword(word) {
            Ok(())
        } else {
            Err(self.error_at_pos(&format!("Expected '{}'", word)))
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance_char();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> ParseResult<()> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.pos += ch.len_utf8();
                Ok(())
            }
            Some(ch) => Err(self.error_at_pos(&format!("Expected '{}', found '{}'", expected, ch))),
            None => Err(self.error_at_pos(&format!("Expected '{}', found EOF", expected))),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    /// 跳过空白与 `//`、`/* */` 注释
    fn skip_whitespace(&mut self) {
        loop {
            let start_pos = self.pos;

            while self.peek_char().is_some_and(char::is_whitespace) {
                self.advance_char();
            }

            if self.starts_with("//") {
                self.skip_past_line();
            } else if self.starts_with("/*") {
                self.pos += 2;
                match self.input[self.pos..].find("*/") {
                    Some(end) => self.pos += end + 2,
                    None => self.pos = self.input.len(),
                }
            }

            if self.pos == start_pos {
                break;
            }
        }
    }
}

fn item_names(item: &Item) -> Vec<String> {
    match item {
        Item::Function(f) => vec![f.name.clone()],
        Item::Opaque { name, .. } => vec![name.clone()],
        Item::Const { pattern, .. } => pattern.names().into_iter().map(String::from).collect(),
    }
}

fn into_block(body: ArrowBody) -> Block {
    match body {
        ArrowBody::Expr(expr) => Block {
            bindings: Vec::new(),
            result: *expr,
        },
        ArrowBody::Block(block) => *block,
        ArrowBody::Opaque { .. } => Block {
            bindings: Vec::new(),
            result: Expr::undefined(),
        },
    }
}

fn callee_name(callee: &Expr) -> Option<String> {
    match callee {
        Expr::Ident(name) => Some(name.clone()),
        Expr::Member {
            object, property, ..
        } => match object.as_ref() {
            Expr::Ident(obj) if obj == "React" => Some(format!("React.{}", property)),
            _ => None,
        },
        _ => None,
    }
}

fn callee_is_hook(callee: &Expr) -> bool {
    callee_name(callee).is_some_and(|n| Hook::looks_like_hook(&n))
}

/// 表达式若是白名单 Hook 调用，返回对应 Hook
pub fn hook_of_call(expr: &Expr) -> Option<Hook> {
    match expr {
        Expr::Call { callee, .. } => callee_name(callee).and_then(|n| Hook::from_name(&n)),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn code_point(hex: &str) -> Option<String> {
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
}

fn format_number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// JSX 文本的空白折叠：跨行的首尾空白去掉，行与行之间以单个空格连接
fn clean_jsx_text(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last_non_empty = lines.iter().rposition(|l| !l.trim().is_empty());
    let mut out = String::new();

    for (i, line) in lines.iter().enumerate() {
        let mut trimmed = line.replace(|c| c == '\t' || c == '\r', " ");
        if i != 0 {
            trimmed = trimmed.trim_start().to_string();
        }
        if i != lines.len() - 1 {
            trimmed = trimmed.trim_end().to_string();
        }
        if trimmed.is_empty() {
            continue;
        }
        out.push_str(&trimmed);
        if Some(i) != last_non_empty {
            out.push(' ');
        }
    }

    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                "copy" => Some('©'),
                "middot" => Some('·'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        parse_program(src).expect("parse")
    }

    fn parse_err(src: &str) -> String {
        match parse_program(src) {
            Err(SynthesisError::TranspileError { message }) => message,
            other => panic!("expected transpile error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_arrow_component_with_hooks() {
        let program = parse(
            r#"const GeneratedApp = () => {
  const [count, setCount] = useState<number>(0);
  const ref = React.useRef(null);
  useEffect(() => { document.title = "x"; }, []);
  const handleClick = () => setCount(count + 1);
  return <button onClick={handleClick}>Clicked {count}</button>;
};"#,
        );
        let app = program.function("GeneratedApp").expect("entry");
        assert_eq!(app.block.bindings.len(), 4);
        assert!(matches!(
            &app.block.bindings[0],
            Binding::State { hook: Hook::State, value, setter: Some(s), .. } if value == "count" && s == "setCount"
        ));
        assert!(matches!(&app.block.bindings[1], Binding::Ref { name, .. } if name == "ref"));
        assert!(matches!(&app.block.bindings[2], Binding::Effect { hook: Hook::Effect, .. }));
    }

    #[test]
    fn test_parse_function_declaration_and_helpers() {
        let program = parse(
            r#"const items = [{ id: 1, label: "A" }, { id: 2, label: "B" }];
function Row({ label }: { label: string }) {
  return <li>{label}</li>;
}
function GeneratedApp(): JSX.Element {
  return (
    <ul>
      {items.map((item) => <Row key={item.id} label={item.label} />)}
    </ul>
  );
}"#,
        );
        assert!(program.function("Row").is_some());
        assert!(program.function("GeneratedApp").is_some());
        assert!(program.declares("items"));
    }

    #[test]
    fn test_statement_body_handler_is_opaque() {
        let program = parse(
            r#"const GeneratedApp = () => {
  const [tasks, setTasks] = useState([]);
  const add = () => {
    const next = [...tasks, { id: Date.now() }];
    setTasks(next);
  };
  return <div onClick={() => { add(); }}>{tasks.length}</div>;
};"#,
        );
        let app = program.function("GeneratedApp").expect("entry");
        match &app.block.bindings[1] {
            Binding::Const {
                value: Expr::Arrow { body, .. },
                ..
            } => assert!(matches!(body, ArrowBody::Opaque { .. })),
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_tags_report_position() {
        let message = parse_err("const GeneratedApp = () => (\n  <div><span>x</div>\n);");
        assert!(message.contains("Mismatched tags: opening <span> vs closing </div>"));
        assert!(message.starts_with("[Line 2:"));
    }

    #[test]
    fn test_unclosed_tag() {
        let message = parse_err("const GeneratedApp = () => <div><p>hello</p>;");
        assert!(message.contains("Unclosed tag <div>"), "{message}");
    }

    #[test]
    fn test_unknown_hook_rejected() {
        let message = parse_err(
            "const GeneratedApp = () => {\n  const nav = useNavigate();\n  return <div />;\n};",
        );
        assert!(message.contains("Unknown hook 'useNavigate'"));
    }

    #[test]
    fn test_jsx_text_whitespace_collapsed() {
        let program = parse("const GeneratedApp = () => (\n  <p>\n    Hello\n    world &amp; more\n  </p>\n);");
        let app = program.function("GeneratedApp").expect("entry");
        let Expr::Markup(node) = &app.block.result else {
            panic!("expected markup");
        };
        let Node::Element(el) = node.as_ref() else {
            panic!("expected element");
        };
        assert_eq!(el.children, vec![Node::Text("Hello world & more".to_string())]);
    }

    #[test]
    fn test_early_return_becomes_conditional() {
        let program = parse(
            "function GeneratedApp() {\n  const items = [];\n  if (items.length === 0) return <p>Empty</p>;\n  return <ul />;\n}",
        );
        let app = program.function("GeneratedApp").expect("entry");
        assert!(matches!(app.block.result, Expr::Conditional { .. }));
    }

    #[test]
    fn test_types_and_interfaces_skipped() {
        let program = parse(
            r#"interface Task {
  id: number;
  title: string;
}
type Filter = "all" | "done"
const GeneratedApp: React.FC = () => {
  const [filter, setFilter] = useState<Filter>("all");
  const label = (filter as string).toUpperCase();
  return <span>{label}</span>;
};"#,
        );
        assert!(program.function("GeneratedApp").is_some());
        assert!(!program.declares("Task"));
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let message = parse_err("const GeneratedApp = () => <p/>;\nconst GeneratedApp = () => <p/>;");
        assert!(message.contains("Duplicate declaration 'GeneratedApp'"));
    }

    #[test]
    fn test_class_component_rejected() {
        let message = parse_err("class GeneratedApp extends React.Component {}");
        assert!(message.contains("Class components are not supported"));
    }

    #[test]
    fn test_deep_nesting_is_an_error_not_a_crash() {
        let src = format!("const GeneratedApp = () => {}1{};", "(".repeat(500), ")".repeat(500));
        let message = parse_err(&src);
        assert!(message.contains("Nesting too deep"));
    }

    #[test]
    fn test_non_ascii_type_alias_is_skipped() {
        let program = parse(
            "const title = \"Menu\";\ntype Café = { id: number };\nconst GeneratedApp = () => <p>{title}</p>;",
        );
        assert!(program.function("GeneratedApp").is_some());
        assert!(!program.declares("Café"));

        let program = parse("type Ünïcode<T> = T[];\nconst GeneratedApp = () => <p/>;");
        assert!(program.function("GeneratedApp").is_some());
        assert!(!program.declares("Ünïcode"));
    }
}
