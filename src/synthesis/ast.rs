//! 生成源码的语法树
//!
//! 程序由顶层条目组成，入口是名为 `GeneratedApp` 的组件。
//! 事件处理器与语句体函数只保留原始源码，渲染期间从不执行。

/// 作用域白名单中的 Hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    State,
    Reducer,
    Effect,
    LayoutEffect,
    Memo,
    Callback,
    Ref,
    Context,
}

impl Hook {
    /// `useState` / `React.useState` 之类的名字，未知 Hook 返回 None
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("React.").unwrap_or(name);
        match name {
            "useState" => Some(Hook::State),
            "useReducer" => Some(Hook::Reducer),
            "useEffect" => Some(Hook::Effect),
            "useLayoutEffect" => Some(Hook::LayoutEffect),
            "useMemo" => Some(Hook::Memo),
            "useCallback" => Some(Hook::Callback),
            "useRef" => Some(Hook::Ref),
            "useContext" => Some(Hook::Context),
            _ => None,
        }
    }

    /// 形如 `useXxx` 的标识符
    pub fn looks_like_hook(name: &str) -> bool {
        let name = name.strip_prefix("React.").unwrap_or(name);
        name.strip_prefix("use")
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Hook::State => "useState",
            Hook::Reducer => "useReducer",
            Hook::Effect => "useEffect",
            Hook::LayoutEffect => "useLayoutEffect",
            Hook::Memo => "useMemo",
            Hook::Callback => "useCallback",
            Hook::Ref => "useRef",
            Hook::Context => "useContext",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// 函数组件或可在渲染期调用的辅助函数
    Function(FunctionDef),
    /// 函数体无法静态求值，只保留源码与原因
    Opaque {
        name: String,
        source: String,
        reason: String,
    },
    Const { pattern: Pattern, value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Pattern>,
    pub block: Block,
}

/// 语句体：按序绑定，最后求值 `result`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub bindings: Vec<Binding>,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// `const [value, setter] = useState(initial)`，也用于 `useReducer(reducer, initial)`
    State {
        hook: Hook,
        value: String,
        setter: Option<String>,
        initial: Expr,
    },
    /// `const name = useRef(initial)`
    Ref { name: String, initial: Expr },
    /// `const name = useMemo(factory, deps)`
    Memo { pattern: Pattern, factory: Expr },
    /// `const name = useContext(Ctx)`；没有 Provider，值恒为 undefined
    Context { pattern: Pattern, context: String },
    /// `useEffect(...)`：只登记，不执行
    Effect { hook: Hook, source: String },
    /// 事件处理器、`useCallback` 与无法求值的函数声明
    Handler { name: String, source: String },
    Const { pattern: Pattern, value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    /// `[a, , b]`，空位为 None
    Array(Vec<Option<PatternField>>),
    /// `{ a, b: c, d = 1 }`
    Object(Vec<PatternField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternField {
    /// 对象解构时的属性名；数组解构时与 binding 相同
    pub key: String,
    pub binding: String,
    pub default: Option<Expr>,
}

impl PatternField {
    pub fn simple(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            binding: name,
            default: None,
        }
    }
}

impl Pattern {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Pattern::Ident(n) => vec![n.as_str()],
            Pattern::Array(fields) => fields
                .iter()
                .flatten()
                .map(|f| f.binding.as_str())
                .collect(),
            Pattern::Object(fields) => fields.iter().map(|f| f.binding.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    LooseEq,
    LooseNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    Nullish,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "===",
            BinaryOp::NotEq => "!==",
            BinaryOp::LooseEq => "==",
            BinaryOp::LooseNotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Nullish => "??",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEntry {
    Prop(String, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Box<Block>),
    /// 含赋值、循环等语句的函数体，渲染期不可调用
    Opaque { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Template(Vec<TemplatePart>),
    /// 元素可以是 `Expr::Spread`
    Array(Vec<Expr>),
    Object(Vec<ObjectEntry>),
    /// `...expr`，只出现在数组、对象与调用参数中
    Spread(Box<Expr>),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Arrow {
        params: Vec<Pattern>,
        body: ArrowBody,
        source: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Markup(Box<Node>),
}

impl Expr {
    pub fn undefined() -> Self {
        Expr::Literal(Literal::Undefined)
    }

    pub fn str(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(s.into()))
    }

    pub fn ident(s: impl Into<String>) -> Self {
        Expr::Ident(s.into())
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: property.into(),
            optional: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Fragment(Vec<Node>),
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

impl Element {
    /// 首字母大写的标签是组件引用
    pub fn is_component(&self) -> bool {
        self.tag.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Literal(String),
    Expr(Expr),
    /// `onClick={...}` 的原始源码
    Handler(String),
    /// `<input disabled />`
    Flag,
    /// `{...props}`
    Spread(Expr),
}

impl Attr {
    pub fn is_event(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next() == Some('o')
            && chars.next() == Some('n')
            && chars.next().is_some_and(|c| c.is_ascii_uppercase())
    }
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.items.iter().find_map(|item| match item {
            Item::Function(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    pub fn declares(&self, name: &str) -> bool {
        self.items.iter().any(|item| match item {
            Item::Function(f) => f.name == name,
            Item::Opaque { name: n, .. } => n == name,
            Item::Const { pattern, .. } => pattern.names().contains(&name),
        })
    }
}
