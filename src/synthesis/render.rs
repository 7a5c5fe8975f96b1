//! 受限解释器：把语法树求值为视图树
//!
//! 只有纯表达式会被求值。事件处理器、setter 与语句体函数在渲染期不可调用，
//! effect 只计数不执行；调用深度与求值步数都有上限。

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::synthesis::ast::{
    ArrowBody, Attr, AttrValue, BinaryOp, Binding, Block, Element, Expr, FunctionDef, Hook, Item,
    Literal, Node, ObjectEntry, Pattern, PatternField, Program, TemplatePart, UnaryOp,
};
use crate::synthesis::error::RenderError;
use crate::synthesis::value::{format_locale, format_number, Callable, Scope, Value};
use crate::synthesis::view::{RenderedView, ViewNode};

/// 函数 / 组件调用的最大嵌套深度
const MAX_CALL_DEPTH: usize = 32;

/// 单次渲染的最大求值步数
const MAX_STEPS: usize = 200_000;

/// 单个字符串 / 数组构造的最大长度
const MAX_COLLECTION: usize = 10_000;

const GLOBALS: [&str; 10] = [
    "Math", "Object", "Array", "JSON", "String", "Number", "Boolean", "parseInt", "parseFloat",
    "isNaN",
];

type EvalResult<T> = Result<T, RenderError>;

fn err<T>(message: impl Into<String>) -> EvalResult<T> {
    Err(RenderError(message.into()))
}

/// 以 entry 为入口渲染整个程序
pub fn render_program(program: &Program, entry: &str) -> Result<RenderedView, RenderError> {
    let mut interpreter = Interpreter::new(program);
    let result = interpreter.render_entry(entry);
    let effects_scheduled = interpreter.effects;
    interpreter.release();
    result.map(|nodes| RenderedView {
        nodes,
        effects_scheduled,
    })
}

struct Interpreter<'p> {
    program: &'p Program,
    globals: Rc<Scope<'p>>,
    scopes: Vec<Rc<Scope<'p>>>,
    depth: usize,
    steps: usize,
    effects: usize,
}

impl<'p> Interpreter<'p> {
    fn new(program: &'p Program) -> Self {
        let globals = Scope::child(None);
        Interpreter {
            program,
            scopes: vec![globals.clone()],
            globals,
            depth: 0,
            steps: 0,
            effects: 0,
        }
    }

    fn release(&mut self) {
        for scope in self.scopes.drain(..) {
            scope.clear();
        }
    }

    fn new_scope(&mut self, parent: Option<Rc<Scope<'p>>>) -> Rc<Scope<'p>> {
        let scope = Scope::child(parent);
        self.scopes.push(scope.clone());
        scope
    }

    fn render_entry(&mut self, entry: &str) -> EvalResult<Vec<ViewNode>> {
        let program = self.program;
        for item in &program.items {
            match item {
                Item::Function(def) => self
                    .globals
                    .set(&def.name, Value::callable(Callable::Function(def))),
                Item::Opaque { name, reason, .. } => self.globals.set(
                    name,
                    Value::callable(Callable::Opaque {
                        name: name.clone(),
                        reason: reason.clone(),
                    }),
                ),
                Item::Const { .. } => {}
            }
        }
        // 顶层常量按声明顺序求值
        for item in &program.items {
            if let Item::Const { pattern, value } = item {
                let globals = self.globals.clone();
                let v = self.eval(value, &globals)?;
                self.bind_pattern(pattern, v, &globals)?;
            }
        }

        let Some(def) = program.function(entry) else {
            return err(format!("{} is not a function component", entry));
        };
        let props = Value::object(BTreeMap::new());
        let value = self.invoke(&def.params, &def.block, vec![props], None)?;
        let nodes = self.to_nodes(value)?;
        Ok(merge_text(nodes))
    }

    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > MAX_STEPS {
            return err("Render budget exceeded");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn invoke(
        &mut self,
        params: &'p [Pattern],
        block: &'p Block,
        args: Vec<Value<'p>>,
        parent: Option<Rc<Scope<'p>>>,
    ) -> EvalResult<Value<'p>> {
        if self.depth >= MAX_CALL_DEPTH {
            return err("Maximum call depth exceeded");
        }
        self.depth += 1;
        let result = self.invoke_inner(params, block, args, parent);
        self.depth -= 1;
        result
    }

    fn invoke_inner(
        &mut self,
        params: &'p [Pattern],
        block: &'p Block,
        args: Vec<Value<'p>>,
        parent: Option<Rc<Scope<'p>>>,
    ) -> EvalResult<Value<'p>> {
        let parent = parent.unwrap_or_else(|| self.globals.clone());
        let scope = self.new_scope(Some(parent));
        self.bind_params(params, args, &scope)?;
        for binding in &block.bindings {
            self.run_binding(binding, &scope)?;
        }
        self.eval(&block.result, &scope)
    }

    fn bind_params(
        &mut self,
        params: &'p [Pattern],
        args: Vec<Value<'p>>,
        scope: &Rc<Scope<'p>>,
    ) -> EvalResult<()> {
        let mut args = args.into_iter();
        for param in params {
            let arg = args.next().unwrap_or(Value::Undefined);
            self.bind_pattern(param, arg, scope)?;
        }
        Ok(())
    }

    fn run_binding(&mut self, binding: &'p Binding, scope: &Rc<Scope<'p>>) -> EvalResult<()> {
        match binding {
            Binding::State {
                hook,
                value,
                setter,
                initial,
            } => {
                let mut v = self.eval(initial, scope)?;
                // useState(() => init) 惰性初始化
                if *hook == Hook::State {
                    if let Value::Function(f) = &v {
                        let f = f.clone();
                        v = self.call(&f, Vec::new())?;
                    }
                }
                scope.set(value, v);
                if let Some(setter) = setter {
                    scope.set(setter, Value::callable(Callable::Setter(setter.clone())));
                }
            }
            Binding::Ref { name, initial } => {
                let v = self.eval(initial, scope)?;
                let mut map = BTreeMap::new();
                map.insert("current".to_string(), v);
                scope.set(name, Value::object(map));
            }
            Binding::Memo { pattern, factory } => {
                let f = self.eval(factory, scope)?;
                let v = match f {
                    Value::Function(f) => self.call(&f, Vec::new())?,
                    other => other,
                };
                self.bind_pattern(pattern, v, scope)?;
            }
            Binding::Context { pattern, .. } => {
                // 没有 Provider：每个解构字段取默认值或 undefined
                match pattern {
                    Pattern::Ident(name) => scope.set(name, Value::Undefined),
                    Pattern::Object(fields) => {
                        for field in fields {
                            let v = self.field_default(field, scope)?;
                            scope.set(&field.binding, v);
                        }
                    }
                    Pattern::Array(fields) => {
                        for field in fields.iter().flatten() {
                            let v = self.field_default(field, scope)?;
                            scope.set(&field.binding, v);
                        }
                    }
                }
            }
            Binding::Effect { .. } => self.effects += 1,
            Binding::Handler { name, .. } => scope.set(
                name,
                Value::callable(Callable::Opaque {
                    name: name.clone(),
                    reason: "event handler".to_string(),
                }),
            ),
            Binding::Const { pattern, value } => {
                let v = self.eval(value, scope)?;
                self.bind_pattern(pattern, v, scope)?;
            }
        }
        Ok(())
    }

    fn field_default(&mut self, field: &'p PatternField, scope: &Rc<Scope<'p>>) -> EvalResult<Value<'p>> {
        match &field.default {
            Some(d) => self.eval(d, scope),
            None => Ok(Value::Undefined),
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &'p Pattern,
        value: Value<'p>,
        scope: &Rc<Scope<'p>>,
    ) -> EvalResult<()> {
        match pattern {
            Pattern::Ident(name) => scope.set(name, value),
            Pattern::Array(fields) => {
                let items = match &value {
                    Value::Array(items) => items.clone(),
                    other => return err(format!("{} is not iterable", other.type_name())),
                };
                for (i, field) in fields.iter().enumerate() {
                    let Some(field) = field else { continue };
                    let mut v = items.get(i).cloned().unwrap_or(Value::Undefined);
                    if matches!(v, Value::Undefined) {
                        v = self.field_default(field, scope)?;
                    }
                    scope.set(&field.binding, v);
                }
            }
            Pattern::Object(fields) => {
                if value.is_nullish() {
                    return err(format!(
                        "Cannot destructure properties of {}",
                        value.type_name()
                    ));
                }
                for field in fields {
                    let mut v = self.get_property(&value, &field.key)?;
                    if matches!(v, Value::Undefined) {
                        v = self.field_default(field, scope)?;
                    }
                    scope.set(&field.binding, v);
                }
            }
        }
        Ok(())
    }

    fn call(&mut self, callable: &Rc<Callable<'p>>, args: Vec<Value<'p>>) -> EvalResult<Value<'p>> {
        match callable.as_ref() {
            Callable::Function(def) => {
                let def: &'p FunctionDef = *def;
                self.invoke(&def.params, &def.block, args, None)
            }
            Callable::Arrow {
                params,
                body,
                scope,
            } => {
                let params: &'p [Pattern] = *params;
                let body: &'p ArrowBody = *body;
                match body {
                    ArrowBody::Expr(expr) => {
                        if self.depth >= MAX_CALL_DEPTH {
                            return err("Maximum call depth exceeded");
                        }
                        self.depth += 1;
                        let local = self.new_scope(Some(scope.clone()));
                        let result = self
                            .bind_params(params, args, &local)
                            .and_then(|_| self.eval(expr, &local));
                        self.depth -= 1;
                        result
                    }
                    ArrowBody::Block(block) => self.invoke(params, block, args, Some(scope.clone())),
                    ArrowBody::Opaque { reason } => err(format!(
                        "Function cannot run during render: {}",
                        reason
                    )),
                }
            }
            Callable::Opaque { name, reason } => err(format!(
                "'{}' cannot be called during render ({})",
                name, reason
            )),
            Callable::Setter(name) => err(format!(
                "State setter '{}' cannot be called during render",
                name
            )),
            Callable::Builtin(name) => self.call_builtin(name, args),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval(&mut self, expr: &'p Expr, scope: &Rc<Scope<'p>>) -> EvalResult<Value<'p>> {
        self.tick()?;
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::str(s),
            }),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(t) => out.push_str(t),
                        TemplatePart::Expr(e) => out.push_str(&self.eval(e, scope)?.to_js_string()),
                    }
                }
                Ok(Value::str(&out))
            }
            Expr::Array(elements) => Ok(Value::array(self.eval_list(elements, scope)?)),
            Expr::Object(entries) => {
                let mut map = BTreeMap::new();
                for entry in entries {
                    match entry {
                        ObjectEntry::Prop(key, value) => {
                            let v = self.eval(value, scope)?;
                            map.insert(key.clone(), v);
                        }
                        ObjectEntry::Spread(e) => {
                            let v = self.eval(e, scope)?;
                            spread_into(&mut map, v);
                        }
                    }
                }
                Ok(Value::object(map))
            }
            Expr::Spread(_) => err("Unexpected spread"),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let obj = self.eval(object, scope)?;
                if *optional && obj.is_nullish() {
                    return Ok(Value::Undefined);
                }
                self.get_property(&obj, property)
            }
            Expr::Index { object, index } => {
                let obj = self.eval(object, scope)?;
                let key = self.eval(index, scope)?;
                let key = match key {
                    Value::Number(n) => format_number(n),
                    other => other.to_js_string(),
                };
                self.get_property(&obj, &key)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, scope),
            Expr::Arrow { params, body, .. } => Ok(Value::callable(Callable::Arrow {
                params,
                body,
                scope: scope.clone(),
            })),
            Expr::Unary { op, operand } => {
                let v = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!v.truthy()),
                    UnaryOp::Neg => Value::Number(-v.to_number()),
                })
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, scope),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Markup(node) => {
                let nodes = self.render_node(node, scope)?;
                Ok(Value::Node(Rc::new(nodes)))
            }
        }
    }

    fn eval_list(&mut self, exprs: &'p [Expr], scope: &Rc<Scope<'p>>) -> EvalResult<Vec<Value<'p>>> {
        let mut out = Vec::with_capacity(exprs.len());
        for e in exprs {
            match e {
                Expr::Spread(inner) => match self.eval(inner, scope)? {
                    Value::Array(items) => out.extend(items.iter().cloned()),
                    Value::Str(s) => out.extend(s.chars().map(|c| Value::str(&c.to_string()))),
                    other => return err(format!("{} is not iterable", other.type_name())),
                },
                other => out.push(self.eval(other, scope)?),
            }
            if out.len() > MAX_COLLECTION {
                return err("Array too large");
            }
        }
        Ok(out)
    }

    fn lookup(&mut self, name: &str, scope: &Rc<Scope<'p>>) -> EvalResult<Value<'p>> {
        if let Some(v) = scope.get(name) {
            return Ok(v);
        }
        if let Some(v) = global_object(name) {
            return Ok(v);
        }
        err(format!("{} is not defined", name))
    }

    fn eval_call(
        &mut self,
        callee: &'p Expr,
        args: &'p [Expr],
        scope: &Rc<Scope<'p>>,
    ) -> EvalResult<Value<'p>> {
        if let Expr::Member {
            object,
            property,
            optional,
        } = callee
        {
            let receiver = self.eval(object, scope)?;
            if *optional && receiver.is_nullish() {
                return Ok(Value::Undefined);
            }
            // 对象上的函数属性（含 Math.round 之类的内建）
            if let Value::Object(map) = &receiver {
                if let Some(Value::Function(f)) = map.get(property.as_str()) {
                    let f = f.clone();
                    let args = self.eval_list(args, scope)?;
                    return self.call(&f, args);
                }
            }
            let args = self.eval_list(args, scope)?;
            return self.call_method(receiver, property, args);
        }

        let f = self.eval(callee, scope)?;
        let args = self.eval_list(args, scope)?;
        match f {
            Value::Function(f) => self.call(&f, args),
            other => err(format!("{} is not a function", describe_callee(callee, &other))),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &'p Expr,
        right: &'p Expr,
        scope: &Rc<Scope<'p>>,
    ) -> EvalResult<Value<'p>> {
        let l = self.eval(left, scope)?;
        match op {
            BinaryOp::And => return if l.truthy() { self.eval(right, scope) } else { Ok(l) },
            BinaryOp::Or => return if l.truthy() { Ok(l) } else { self.eval(right, scope) },
            BinaryOp::Nullish => {
                return if l.is_nullish() { self.eval(right, scope) } else { Ok(l) }
            }
            _ => {}
        }
        let r = self.eval(right, scope)?;

        Ok(match op {
            BinaryOp::Add => {
                let stringy = |v: &Value| {
                    matches!(v, Value::Str(_) | Value::Array(_) | Value::Object(_) | Value::Node(_))
                };
                if stringy(&l) || stringy(&r) {
                    let s = format!("{}{}", l.to_js_string(), r.to_js_string());
                    if s.len() > MAX_COLLECTION * 10 {
                        return err("String too large");
                    }
                    Value::str(&s)
                } else {
                    Value::Number(l.to_number() + r.to_number())
                }
            }
            BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
            BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
            BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
            BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
            BinaryOp::Eq => Value::Bool(l.strict_equals(&r)),
            BinaryOp::NotEq => Value::Bool(!l.strict_equals(&r)),
            BinaryOp::LooseEq => Value::Bool(l.loose_equals(&r)),
            BinaryOp::LooseNotEq => Value::Bool(!l.loose_equals(&r)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
                let ordering = match (&l, &r) {
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => l.to_number().partial_cmp(&r.to_number()),
                };
                Value::Bool(match (op, ordering) {
                    (_, None) => false,
                    (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                    (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                    (BinaryOp::LtEq, Some(o)) => o != Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                })
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => unreachable!("short-circuited above"),
        })
    }

    fn get_property(&self, obj: &Value<'p>, key: &str) -> EvalResult<Value<'p>> {
        Ok(match obj {
            Value::Undefined | Value::Null => {
                return err(format!(
                    "Cannot read properties of {} (reading '{}')",
                    obj.type_name(),
                    key
                ))
            }
            Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Undefined),
            Value::Array(items) => match key {
                "length" => Value::Number(items.len() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Undefined),
            },
            Value::Str(s) => match key {
                "length" => Value::Number(s.chars().count() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::str(&c.to_string()))
                    .unwrap_or(Value::Undefined),
            },
            _ => Value::Undefined,
        })
    }

    // ------------------------------------------------------------------
    // Methods and builtins
    // ------------------------------------------------------------------

    fn call_method(
        &mut self,
        receiver: Value<'p>,
        method: &str,
        args: Vec<Value<'p>>,
    ) -> EvalResult<Value<'p>> {
        match &receiver {
            Value::Array(items) => self.array_method(items.clone(), method, args),
            Value::Str(s) => string_method(s, method, &args),
            Value::Number(n) => number_method(*n, method, &args),
            Value::Undefined | Value::Null => err(format!(
                "Cannot read properties of {} (reading '{}')",
                receiver.type_name(),
                method
            )),
            other => match method {
                "toString" => Ok(Value::str(&other.to_js_string())),
                _ => err(format!("{}.{} is not a function", other.type_name(), method)),
            },
        }
    }

    fn callback(&self, args: &[Value<'p>], method: &str) -> EvalResult<Rc<Callable<'p>>> {
        match args.first() {
            Some(Value::Function(f)) => Ok(f.clone()),
            _ => err(format!("Array.{} expects a function", method)),
        }
    }

    fn array_method(
        &mut self,
        items: Rc<Vec<Value<'p>>>,
        method: &str,
        args: Vec<Value<'p>>,
    ) -> EvalResult<Value<'p>> {
        let with_index = |item: &Value<'p>, i: usize| vec![item.clone(), Value::Number(i as f64)];

        match method {
            "map" | "forEach" => {
                let f = self.callback(&args, method)?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.call(&f, with_index(item, i))?);
                }
                if method == "forEach" {
                    return Ok(Value::Undefined);
                }
                Ok(Value::array(out))
            }
            "filter" => {
                let f = self.callback(&args, method)?;
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if self.call(&f, with_index(item, i))?.truthy() {
                        out.push(item.clone());
                    }
                }
                Ok(Value::array(out))
            }
            "find" | "findIndex" | "some" | "every" => {
                let f = self.callback(&args, method)?;
                for (i, item) in items.iter().enumerate() {
                    let hit = self.call(&f, with_index(item, i))?.truthy();
                    match (method, hit) {
                        ("find", true) => return Ok(item.clone()),
                        ("findIndex", true) => return Ok(Value::Number(i as f64)),
                        ("some", true) => return Ok(Value::Bool(true)),
                        ("every", false) => return Ok(Value::Bool(false)),
                        _ => {}
                    }
                }
                Ok(match method {
                    "find" => Value::Undefined,
                    "findIndex" => Value::Number(-1.0),
                    "some" => Value::Bool(false),
                    _ => Value::Bool(true),
                })
            }
            "reduce" => {
                let f = self.callback(&args, method)?;
                let mut iter = items.iter().enumerate();
                let mut acc = match args.get(1) {
                    Some(init) => init.clone(),
                    None => match iter.next() {
                        Some((_, first)) => first.clone(),
                        None => return err("Reduce of empty array with no initial value"),
                    },
                };
                for (i, item) in iter {
                    acc = self.call(&f, vec![acc, item.clone(), Value::Number(i as f64)])?;
                }
                Ok(acc)
            }
            "sort" => {
                let mut sorted: Vec<Value<'p>> = items.as_ref().clone();
                match args.first() {
                    Some(Value::Function(f)) => {
                        let f = f.clone();
                        let mut failure: Option<RenderError> = None;
                        sorted.sort_by(|a, b| {
                            if failure.is_some() {
                                return Ordering::Equal;
                            }
                            match self.call(&f, vec![a.clone(), b.clone()]) {
                                Ok(v) => v.to_number().partial_cmp(&0.0).unwrap_or(Ordering::Equal),
                                Err(e) => {
                                    failure = Some(e);
                                    Ordering::Equal
                                }
                            }
                        });
                        if let Some(e) = failure {
                            return Err(e);
                        }
                    }
                    _ => sorted.sort_by_key(|v| v.to_js_string()),
                }
                Ok(Value::array(sorted))
            }
            "reverse" => {
                let mut reversed: Vec<Value<'p>> = items.as_ref().clone();
                reversed.reverse();
                Ok(Value::array(reversed))
            }
            "slice" => {
                let (start, end) = slice_bounds(items.len(), &args);
                Ok(Value::array(items[start..end].to_vec()))
            }
            "concat" => {
                let mut out: Vec<Value<'p>> = items.as_ref().clone();
                for arg in args {
                    match arg {
                        Value::Array(more) => out.extend(more.iter().cloned()),
                        other => out.push(other),
                    }
                }
                Ok(Value::array(out))
            }
            "includes" | "indexOf" => {
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                let pos = items.iter().position(|v| v.strict_equals(&needle));
                Ok(if method == "includes" {
                    Value::Bool(pos.is_some())
                } else {
                    Value::Number(pos.map_or(-1.0, |p| p as f64))
                })
            }
            "join" => {
                let sep = match args.first() {
                    Some(Value::Undefined) | None => ",".to_string(),
                    Some(v) => v.to_js_string(),
                };
                Ok(Value::str(
                    &items
                        .iter()
                        .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                        .collect::<Vec<_>>()
                        .join(&sep),
                ))
            }
            "flat" => {
                let mut out = Vec::new();
                for item in items.iter() {
                    match item {
                        Value::Array(inner) => out.extend(inner.iter().cloned()),
                        other => out.push(other.clone()),
                    }
                }
                Ok(Value::array(out))
            }
            "toString" => Ok(Value::str(&Value::Array(items).to_js_string())),
            _ => err(format!("array.{} is not a function", method)),
        }
    }

    fn call_builtin(&mut self, name: &str, args: Vec<Value<'p>>) -> EvalResult<Value<'p>> {
        let num = |i: usize| args.get(i).map_or(f64::NAN, Value::to_number);
        Ok(match name {
            "Math.round" => Value::Number((num(0) + 0.5).floor()),
            "Math.floor" => Value::Number(num(0).floor()),
            "Math.ceil" => Value::Number(num(0).ceil()),
            "Math.abs" => Value::Number(num(0).abs()),
            "Math.trunc" => Value::Number(num(0).trunc()),
            "Math.sqrt" => Value::Number(num(0).sqrt()),
            "Math.sign" => Value::Number(if num(0) == 0.0 { 0.0 } else { num(0).signum() }),
            "Math.pow" => Value::Number(num(0).powf(num(1))),
            "Math.min" => Value::Number(args.iter().map(Value::to_number).fold(f64::INFINITY, f64::min)),
            "Math.max" => Value::Number(
                args.iter()
                    .map(Value::to_number)
                    .fold(f64::NEG_INFINITY, f64::max),
            ),
            "Math.random" => return err("Math.random is not available during render"),
            "String" => Value::str(&args.first().map_or(String::new(), Value::to_js_string)),
            "Number" => Value::Number(args.first().map_or(0.0, Value::to_number)),
            "Boolean" => Value::Bool(args.first().is_some_and(Value::truthy)),
            "isNaN" => Value::Bool(num(0).is_nan()),
            "parseFloat" | "parseInt" => {
                let text = args.first().map_or(String::new(), Value::to_js_string);
                let prefix: String = text
                    .trim_start()
                    .chars()
                    .enumerate()
                    .take_while(|(i, c)| {
                        c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')) || (*c == '.' && name == "parseFloat")
                    })
                    .map(|(_, c)| c)
                    .collect();
                let n = prefix.parse::<f64>().unwrap_or(f64::NAN);
                Value::Number(if name == "parseInt" { n.trunc() } else { n })
            }
            "Object.keys" | "Object.values" | "Object.entries" => {
                let Some(Value::Object(map)) = args.first() else {
                    return Ok(Value::array(Vec::new()));
                };
                let out = map
                    .iter()
                    .map(|(k, v)| match name {
                        "Object.keys" => Value::str(k),
                        "Object.values" => v.clone(),
                        _ => Value::array(vec![Value::str(k), v.clone()]),
                    })
                    .collect();
                Value::array(out)
            }
            "Array.isArray" => Value::Bool(matches!(args.first(), Some(Value::Array(_)))),
            "Array.from" => {
                let base: Vec<Value<'p>> = match args.first() {
                    Some(Value::Array(items)) => items.as_ref().clone(),
                    Some(Value::Str(s)) => s.chars().map(|c| Value::str(&c.to_string())).collect(),
                    Some(Value::Object(map)) => {
                        let len = map.get("length").map_or(0.0, Value::to_number);
                        if !(0.0..=MAX_COLLECTION as f64).contains(&len) {
                            return err("Array too large");
                        }
                        vec![Value::Undefined; len as usize]
                    }
                    _ => Vec::new(),
                };
                match args.get(1) {
                    Some(Value::Function(f)) => {
                        let f = f.clone();
                        let mut out = Vec::with_capacity(base.len());
                        for (i, item) in base.into_iter().enumerate() {
                            out.push(self.call(&f, vec![item, Value::Number(i as f64)])?);
                        }
                        Value::array(out)
                    }
                    _ => Value::array(base),
                }
            }
            "JSON.stringify" => {
                let json = args.first().map_or(serde_json::Value::Null, Value::to_json);
                let pretty = args.get(2).is_some_and(|v| !v.is_nullish());
                let text = if pretty {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                }
                .map_err(|e| RenderError(e.to_string()))?;
                Value::str(&text)
            }
            other => return err(format!("{} is not a function", other)),
        })
    }

    // ------------------------------------------------------------------
    // Markup
    // ------------------------------------------------------------------

    fn render_node(&mut self, node: &'p Node, scope: &Rc<Scope<'p>>) -> EvalResult<Vec<ViewNode>> {
        self.tick()?;
        match node {
            Node::Text(t) => Ok(vec![ViewNode::Text(t.clone())]),
            Node::Expr(e) => {
                let v = self.eval(e, scope)?;
                self.to_nodes(v)
            }
            Node::Fragment(children) => self.render_children(children, scope),
            Node::Element(el) if el.is_component() || el.tag.contains('.') => {
                self.render_component(el, scope)
            }
            Node::Element(el) => self.render_host(el, scope),
        }
    }

    fn render_children(&mut self, children: &'p [Node], scope: &Rc<Scope<'p>>) -> EvalResult<Vec<ViewNode>> {
        let mut out = Vec::new();
        for child in children {
            out.extend(self.render_node(child, scope)?);
        }
        Ok(merge_text(out))
    }

    fn render_component(&mut self, el: &'p Element, scope: &Rc<Scope<'p>>) -> EvalResult<Vec<ViewNode>> {
        let component = if el.tag.contains('.') {
            None
        } else {
            scope.get(&el.tag)
        };
        let Some(Value::Function(f)) = component else {
            return err(format!("Unknown component <{}>", el.tag));
        };

        let mut props = BTreeMap::new();
        for attr in &el.attrs {
            match &attr.value {
                AttrValue::Literal(s) => {
                    props.insert(attr.name.clone(), Value::str(s));
                }
                AttrValue::Expr(e) => {
                    let v = self.eval(e, scope)?;
                    props.insert(attr.name.clone(), v);
                }
                AttrValue::Handler(_) => {
                    props.insert(
                        attr.name.clone(),
                        Value::callable(Callable::Opaque {
                            name: attr.name.clone(),
                            reason: "event handler".to_string(),
                        }),
                    );
                }
                AttrValue::Flag => {
                    props.insert(attr.name.clone(), Value::Bool(true));
                }
                AttrValue::Spread(e) => {
                    let v = self.eval(e, scope)?;
                    spread_into(&mut props, v);
                }
            }
        }
        if !el.children.is_empty() {
            let children = self.render_children(&el.children, scope)?;
            props.insert("children".to_string(), Value::Node(Rc::new(children)));
        }

        let value = self.call(&f, vec![Value::object(props)])?;
        self.to_nodes(value)
    }

    fn render_host(&mut self, el: &'p Element, scope: &Rc<Scope<'p>>) -> EvalResult<Vec<ViewNode>> {
        let mut attrs = BTreeMap::new();
        let mut handlers = Vec::new();

        for attr in &el.attrs {
            match &attr.value {
                AttrValue::Handler(_) => handlers.push(attr.name.clone()),
                AttrValue::Literal(s) => set_host_attr(&mut attrs, &mut handlers, &attr.name, Value::str(s)),
                AttrValue::Flag => set_host_attr(&mut attrs, &mut handlers, &attr.name, Value::Bool(true)),
                AttrValue::Expr(e) => {
                    let v = self.eval(e, scope)?;
                    set_host_attr(&mut attrs, &mut handlers, &attr.name, v);
                }
                AttrValue::Spread(e) => {
                    if let Value::Object(map) = self.eval(e, scope)? {
                        for (k, v) in map.iter() {
                            set_host_attr(&mut attrs, &mut handlers, k, v.clone());
                        }
                    }
                }
            }
        }

        let children = self.render_children(&el.children, scope)?;
        Ok(vec![ViewNode::Element {
            tag: el.tag.clone(),
            attrs,
            handlers,
            children,
        }])
    }

    fn to_nodes(&mut self, value: Value<'p>) -> EvalResult<Vec<ViewNode>> {
        match value {
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Function(_) => Ok(Vec::new()),
            Value::Number(_) | Value::Str(_) => {
                let text = value.to_js_string();
                Ok(if text.is_empty() {
                    Vec::new()
                } else {
                    vec![ViewNode::Text(text)]
                })
            }
            Value::Node(nodes) => Ok(nodes.as_ref().clone()),
            Value::Array(items) => {
                let mut out = Vec::new();
                for item in items.iter() {
                    out.extend(self.to_nodes(item.clone())?);
                }
                Ok(out)
            }
            Value::Object(map) => err(format!(
                "Objects are not valid as a child (found object with keys {{{}}})",
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

fn namespace<'p>(entries: &[(&str, &'static str)]) -> BTreeMap<String, Value<'p>> {
    entries
        .iter()
        .map(|&(key, builtin)| (key.to_string(), Value::callable(Callable::Builtin(builtin))))
        .collect()
}

fn global_object<'p>(name: &str) -> Option<Value<'p>> {
    if !GLOBALS.contains(&name) {
        return None;
    }
    Some(match name {
        "Math" => {
            let mut map = namespace(&[
                ("round", "Math.round"),
                ("floor", "Math.floor"),
                ("ceil", "Math.ceil"),
                ("abs", "Math.abs"),
                ("trunc", "Math.trunc"),
                ("sqrt", "Math.sqrt"),
                ("sign", "Math.sign"),
                ("pow", "Math.pow"),
                ("min", "Math.min"),
                ("max", "Math.max"),
                ("random", "Math.random"),
            ]);
            map.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
            map.insert("E".to_string(), Value::Number(std::f64::consts::E));
            Value::object(map)
        }
        "Object" => Value::object(namespace(&[
            ("keys", "Object.keys"),
            ("values", "Object.values"),
            ("entries", "Object.entries"),
        ])),
        "Array" => Value::object(namespace(&[("isArray", "Array.isArray"), ("from", "Array.from")])),
        "JSON" => Value::object(namespace(&[("stringify", "JSON.stringify")])),
        "String" => Value::callable(Callable::Builtin("String")),
        "Number" => Value::callable(Callable::Builtin("Number")),
        "Boolean" => Value::callable(Callable::Builtin("Boolean")),
        "parseInt" => Value::callable(Callable::Builtin("parseInt")),
        "parseFloat" => Value::callable(Callable::Builtin("parseFloat")),
        _ => Value::callable(Callable::Builtin("isNaN")),
    })
}

fn spread_into<'p>(map: &mut BTreeMap<String, Value<'p>>, value: Value<'p>) {
    match value {
        Value::Object(other) => {
            for (k, v) in other.iter() {
                map.insert(k.clone(), v.clone());
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                map.insert(i.to_string(), v.clone());
            }
        }
        _ => {}
    }
}

fn set_host_attr(
    attrs: &mut BTreeMap<String, String>,
    handlers: &mut Vec<String>,
    name: &str,
    value: Value<'_>,
) {
    if Attr::is_event(name) {
        handlers.push(name.to_string());
        return;
    }
    // 不向视图注入原始 HTML
    if matches!(name, "key" | "ref" | "children" | "dangerouslySetInnerHTML") {
        return;
    }
    let text = match value {
        Value::Undefined | Value::Null | Value::Bool(false) | Value::Function(_) | Value::Node(_) => {
            return
        }
        Value::Bool(true) => String::new(),
        Value::Object(map) if name == "style" => map
            .iter()
            .filter(|(_, v)| !v.is_nullish())
            .map(|(k, v)| format!("{}: {}", kebab_case(k), v.to_js_string()))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_js_string(),
    };
    attrs.insert(name.to_string(), text);
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// 相邻文本节点合并
fn merge_text(nodes: Vec<ViewNode>) -> Vec<ViewNode> {
    let mut out: Vec<ViewNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match (out.last_mut(), node) {
            (Some(ViewNode::Text(prev)), ViewNode::Text(next)) => prev.push_str(&next),
            (_, node) => out.push(node),
        }
    }
    out
}

fn describe_callee(callee: &Expr, value: &Value<'_>) -> String {
    match callee {
        Expr::Ident(name) => name.clone(),
        _ => value.type_name().to_string(),
    }
}

fn slice_bounds(len: usize, args: &[Value<'_>]) -> (usize, usize) {
    let resolve = |v: Option<&Value<'_>>, default: usize| -> usize {
        match v {
            None | Some(Value::Undefined) => default,
            Some(v) => {
                let n = v.to_number();
                if n.is_nan() {
                    0
                } else if n < 0.0 {
                    (len as f64 + n.trunc()).max(0.0) as usize
                } else {
                    (n.trunc() as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

fn string_method<'p>(s: &str, method: &str, args: &[Value<'p>]) -> EvalResult<Value<'p>> {
    let arg_str = |i: usize| args.get(i).map_or(String::new(), Value::to_js_string);
    Ok(match method {
        "toUpperCase" => Value::str(&s.to_uppercase()),
        "toLowerCase" => Value::str(&s.to_lowercase()),
        "trim" => Value::str(s.trim()),
        "toString" => Value::str(s),
        "includes" => Value::Bool(s.contains(arg_str(0).as_str())),
        "startsWith" => Value::Bool(s.starts_with(arg_str(0).as_str())),
        "endsWith" => Value::Bool(s.ends_with(arg_str(0).as_str())),
        "indexOf" => Value::Number(
            s.find(arg_str(0).as_str())
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
        ),
        "charAt" => {
            let i = args.first().map_or(0.0, Value::to_number);
            let c = if i >= 0.0 { s.chars().nth(i as usize) } else { None };
            Value::str(&c.map(String::from).unwrap_or_default())
        }
        "slice" | "substring" => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), args);
            Value::str(&chars[start..end].iter().collect::<String>())
        }
        "split" => {
            let parts: Vec<Value<'p>> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::str(s)],
                Some(sep) => {
                    let sep = sep.to_js_string();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::str(&c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::str).collect()
                    }
                }
            };
            Value::array(parts)
        }
        "replace" => Value::str(&s.replacen(arg_str(0).as_str(), &arg_str(1), 1)),
        "replaceAll" => Value::str(&s.replace(arg_str(0).as_str(), &arg_str(1))),
        "repeat" => {
            let n = args.first().map_or(0.0, Value::to_number);
            if !(0.0..=1000.0).contains(&n) || s.len() * (n as usize) > MAX_COLLECTION * 10 {
                return err("Invalid count value for repeat");
            }
            Value::str(&s.repeat(n as usize))
        }
        "padStart" | "padEnd" => {
            let width = args.first().map_or(0.0, Value::to_number).clamp(0.0, MAX_COLLECTION as f64) as usize;
            let fill = match args.get(1) {
                Some(v) if !v.is_nullish() => v.to_js_string(),
                _ => " ".to_string(),
            };
            let len = s.chars().count();
            if width <= len || fill.is_empty() {
                Value::str(s)
            } else {
                let pad: String = fill.chars().cycle().take(width - len).collect();
                if method == "padStart" {
                    Value::str(&format!("{}{}", pad, s))
                } else {
                    Value::str(&format!("{}{}", s, pad))
                }
            }
        }
        "localeCompare" => Value::Number(match s.cmp(arg_str(0).as_str()) {
            Ordering::Less => -1.0,
            Ordering::Equal => 0.0,
            Ordering::Greater => 1.0,
        }),
        _ => return err(format!("string.{} is not a function", method)),
    })
}

fn number_method<'p>(n: f64, method: &str, args: &[Value<'p>]) -> EvalResult<Value<'p>> {
    Ok(match method {
        "toFixed" => {
            let digits = args.first().map_or(0.0, Value::to_number);
            if !(0.0..=20.0).contains(&digits) {
                return err("toFixed() digits argument must be between 0 and 20");
            }
            Value::str(&format!("{:.*}", digits as usize, n))
        }
        "toString" => Value::str(&format_number(n)),
        "toLocaleString" => Value::str(&format_locale(n)),
        _ => return err(format!("number.{} is not a function", method)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::parser::parse_program;

    fn render(src: &str) -> Result<RenderedView, RenderError> {
        let program = parse_program(src).expect("parse");
        render_program(&program, "GeneratedApp")
    }

    #[test]
    fn test_state_and_list_rendering() {
        let view = render(
            r#"const GeneratedApp = () => {
  const [tasks, setTasks] = useState([
    { id: 1, title: "Write docs", done: true },
    { id: 2, title: "Ship", done: false },
  ]);
  const remaining = tasks.filter((t) => !t.done).length;
  return (
    <div className="p-4">
      <h1>Tasks ({remaining} left)</h1>
      <ul>
        {tasks.map((t) => (
          <li key={t.id} className={t.done ? "line-through" : ""}>
            <input type="checkbox" checked={t.done} onChange={() => setTasks([])} />
            {t.title}
          </li>
        ))}
      </ul>
    </div>
  );
};"#,
        )
        .expect("render");
        let markup = view.to_markup();
        assert!(markup.contains("<h1>Tasks (1 left)</h1>"), "{markup}");
        assert!(markup.contains("<input checked type=\"checkbox\" />Write docs"));
        assert_eq!(view.find_by_tag("li").len(), 2);
        let ViewNode::Element { handlers, .. } = view.find_by_tag("input")[0] else {
            panic!("expected element");
        };
        assert_eq!(handlers, &vec!["onChange".to_string()]);
    }

    #[test]
    fn test_nested_components_and_children() {
        let view = render(
            r#"const Card = ({ title, children }) => <section><h2>{title}</h2>{children}</section>;
const GeneratedApp = () => (
  <main>
    <Card title="Revenue"><p>{(1234.5).toFixed(2)}</p></Card>
  </main>
);"#,
        )
        .expect("render");
        assert_eq!(
            view.to_markup(),
            "<main><section><h2>Revenue</h2><p>1234.50</p></section></main>"
        );
    }

    #[test]
    fn test_effects_counted_not_run() {
        let view = render(
            "const GeneratedApp = () => {\n  useEffect(() => { throw new Error('boom'); }, []);\n  React.useLayoutEffect(() => {});\n  return <p>ok</p>;\n};",
        )
        .expect("render");
        assert_eq!(view.effects_scheduled, 2);
    }

    #[test]
    fn test_unknown_identifier_is_an_error() {
        let e = render("const GeneratedApp = () => <p>{missing.value}</p>;").unwrap_err();
        assert!(e.0.contains("missing is not defined"));
    }

    #[test]
    fn test_object_child_is_an_error() {
        let e = render("const GeneratedApp = () => <p>{{ a: 1 }}</p>;").unwrap_err();
        assert!(e.0.contains("Objects are not valid as a child"));
    }

    #[test]
    fn test_setter_call_during_render_is_an_error() {
        let e = render(
            "const GeneratedApp = () => {\n  const [n, setN] = useState(0);\n  return <p>{setN(1)}</p>;\n};",
        )
        .unwrap_err();
        assert!(e.0.contains("State setter 'setN' cannot be called during render"));
    }

    #[test]
    fn test_lazy_state_and_reducer_initial_values() {
        let view = render(
            r#"const reducer = (state, action) => state;
const GeneratedApp = () => {
  const [items] = useState(() => ["a", "b"]);
  const [state, dispatch] = useReducer(reducer, { count: 3 });
  return <p>{items.length}:{state.count}</p>;
};"#,
        )
        .expect("render");
        assert_eq!(view.text_content(), "2:3");
    }

    #[test]
    fn test_unknown_component_is_an_error() {
        let e = render("const GeneratedApp = () => <Chart data={[]} />;").unwrap_err();
        assert!(e.0.contains("Unknown component <Chart>"));
    }

    #[test]
    fn test_recursion_limit() {
        let e = render("const Loop = () => <Loop />;\nconst GeneratedApp = () => <Loop />;").unwrap_err();
        assert!(e.0.contains("Maximum call depth exceeded"));
    }

    #[test]
    fn test_reduce_sort_and_locale() {
        let view = render(
            r#"const rows = [{ n: "b", v: 1200 }, { n: "a", v: 300.5 }];
const GeneratedApp = () => {
  const total = rows.reduce((sum, r) => sum + r.v, 0);
  const sorted = [...rows].sort((x, y) => x.v - y.v);
  return <p>{sorted.map((r) => r.n).join("|")} = {total.toLocaleString()}</p>;
};"#,
        )
        .expect("render");
        assert_eq!(view.text_content(), "a|b = 1,500.5");
    }

    #[test]
    fn test_style_object_and_flags() {
        let view = render(
            "const GeneratedApp = () => <button style={{ backgroundColor: 'red', fontSize: 12 }} disabled>Go</button>;",
        )
        .expect("render");
        assert_eq!(
            view.to_markup(),
            "<button disabled style=\"background-color: red; font-size: 12\">Go</button>"
        );
    }
}
