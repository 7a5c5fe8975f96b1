//! 解释器运行时值与 JS 风格的转换规则

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::synthesis::ast::{ArrowBody, FunctionDef, Pattern};
use crate::synthesis::view::ViewNode;

/// 运行时值；生命周期 'p 绑定到被解释的程序
#[derive(Debug, Clone)]
pub enum Value<'p> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Value<'p>>>),
    Object(Rc<BTreeMap<String, Value<'p>>>),
    /// 已求值的标记片段
    Node(Rc<Vec<ViewNode>>),
    Function(Rc<Callable<'p>>),
}

#[derive(Debug)]
pub enum Callable<'p> {
    /// 顶层函数组件 / 辅助函数
    Function(&'p FunctionDef),
    Arrow {
        params: &'p [Pattern],
        body: &'p ArrowBody,
        scope: Rc<Scope<'p>>,
    },
    /// 事件处理器与无法求值的函数：渲染期调用即报错
    Opaque { name: String, reason: String },
    /// useState / useReducer 的 setter
    Setter(String),
    Builtin(&'static str),
}

/// 词法作用域：每次函数调用一帧，闭包共享所在帧
#[derive(Default)]
pub struct Scope<'p> {
    vars: RefCell<HashMap<String, Value<'p>>>,
    parent: Option<Rc<Scope<'p>>>,
}

impl std::fmt::Debug for Scope<'_> {
    // 作用域与闭包互相引用，不递归打印
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("vars", &self.vars.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<'p> Scope<'p> {
    pub fn child(parent: Option<Rc<Scope<'p>>>) -> Rc<Self> {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent,
        })
    }

    pub fn set(&self, name: &str, value: Value<'p>) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value<'p>> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// 断开闭包与作用域之间的引用环
    pub fn clear(&self) {
        self.vars.borrow_mut().clear();
    }
}

impl<'p> Value<'p> {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn array(items: Vec<Value<'p>>) -> Self {
        Value::Array(Rc::new(items))
    }

    pub fn object(map: BTreeMap<String, Value<'p>>) -> Self {
        Value::Object(Rc::new(map))
    }

    pub fn callable(c: Callable<'p>) -> Self {
        Value::Function(Rc::new(c))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Node(_) => "element",
            Value::Function(_) => "function",
        }
    }

    /// JS ToString
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) | Value::Node(_) => "[object Object]".to_string(),
            Value::Function(_) => "function".to_string(),
        }
    }

    /// JS ToNumber
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => {
                let t = s.trim();
                if t.is_empty() {
                    0.0
                } else {
                    t.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Array(items) => match items.len() {
                0 => 0.0,
                1 => items[0].to_number(),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    pub fn strict_equals(&self, other: &Value<'p>) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn loose_equals(&self, other: &Value<'p>) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }

    /// 转为 JSON（函数与标记片段丢弃）
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Function(_) | Value::Node(_) => serde_json::Value::Null,
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined | Value::Function(_)))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// JS 风格的数字格式：整数不带小数点，NaN / Infinity 原样
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// `toLocaleString()` 的 en-US 近似：千分位，最多三位小数
pub fn format_locale(n: f64) -> String {
    if !n.is_finite() {
        return format_number(n);
    }
    let rounded = format!("{:.3}", n.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if n < 0.0 && (int_part != "0" || !frac_part.is_empty()) { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_locale(1234567.891), "1,234,567.891");
        assert_eq!(format_locale(-1200.0), "-1,200");
        assert_eq!(format_locale(999.5), "999.5");
    }

    #[test]
    fn test_truthiness_and_equality() {
        assert!(!Value::str("").truthy());
        assert!(Value::array(vec![]).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(Value::Number(1.0).loose_equals(&Value::str("1")));
        assert_eq!(Value::array(vec![Value::Number(1.0), Value::Null]).to_js_string(), "1,");
    }
}
