//! The input contract this engine consumes.
//!
//! Lexing, parsing, control-flow-graph construction and upvalue
//! classification are an external collaborator's job. This module only
//! defines the shape of what that collaborator hands to the engine: an
//! ordered linear item sequence (already scope- and binding-annotated) plus
//! the expression tree each item references.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A source range, carrying both byte offsets and line/column for
/// diagnostics. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
    pub end_offset: u32,
    pub end_column: u32,
}

impl Range {
    pub const fn dummy() -> Self {
        Self {
            line: 0,
            column: 0,
            offset: 0,
            end_offset: 0,
            end_column: 0,
        }
    }

    pub const fn at_line(line: u32) -> Self {
        Self {
            line,
            column: 1,
            offset: 0,
            end_offset: 0,
            end_column: 1,
        }
    }
}

/// A resolved local-variable binding. `name` is the surface identifier;
/// `id` distinguishes bindings that share a name because one shadows
/// another in a nested scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct VarBinding {
    pub name: String,
    pub id: u32,
}

impl VarBinding {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Range,
}

impl Expr {
    pub fn new(kind: ExprKind, range: Range) -> Self {
        Self { kind, range }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Nil,
    Id(VarBinding),
    Index {
        base: Box<Expr>,
        key: Box<Expr>,
    },
    Table(Vec<TableField>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Method call `recv:method(args)`.
    Invoke {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// A nested function literal. Its body is analyzed as its own
    /// top-level scope elsewhere; here it is only ever visited to be
    /// recorded as a closure.
    Function,
    /// `...`, a multi-return expansion site.
    Dots,
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum TableField {
    Positional(Expr),
    Pair(Expr, Expr),
}

/// The syntactic construct a `Noop` item wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ControlBlockType {
    Do,
    If,
    While,
    Fornum,
    Forin,
    Repeat,
    Label,
    Goto,
    Return,
}

impl ControlBlockType {
    pub const fn is_loop(self) -> bool {
        matches!(
            self,
            Self::While | Self::Fornum | Self::Forin | Self::Repeat
        )
    }
}

/// Upvalue sets exposed by one nested closure defined inside a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NestedFunctionRefs {
    pub accessed_upvalues: Vec<String>,
    pub set_upvalues: Vec<String>,
    pub mutated_upvalues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum ItemKind {
    Local {
        lhs: Vec<VarBinding>,
        rhs: Vec<Expr>,
    },
    Set {
        lhs: Vec<Expr>,
        rhs: Vec<Expr>,
    },
    Eval {
        expr: Expr,
    },
    Noop {
        control_block_type: ControlBlockType,
        scope_end: bool,
        is_else: bool,
    },
    Jump {
        to: usize,
    },
    /// A conditional jump; the condition itself is evaluated by a
    /// preceding `Eval` item, mirroring how linear IRs separate
    /// expression evaluation from branching.
    Cjump {
        to: usize,
    },
}

/// One item in the linear, 1-indexed-in-spirit (stored 0-indexed here)
/// sequence a function lowers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Item {
    pub range: Range,
    pub kind: ItemKind,
    /// Nested closures introduced by this statement, in source order.
    #[serde(default)]
    pub nested_functions: Vec<NestedFunctionRefs>,
}

impl Item {
    pub fn new(kind: ItemKind, range: Range) -> Self {
        Self {
            kind,
            range,
            nested_functions: Vec::new(),
        }
    }

    pub fn with_nested(mut self, nested: Vec<NestedFunctionRefs>) -> Self {
        self.nested_functions = nested;
        self
    }
}

/// The per-function (or per-file-level-chunk) input to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionScope {
    pub items: Vec<Item>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub set_upvalues: Vec<String>,
    #[serde(default)]
    pub accessed_upvalues: Vec<String>,
    #[serde(default)]
    pub mutated_upvalues: Vec<String>,
    pub range: Range,
}

impl FunctionScope {
    pub fn new(items: Vec<Item>, range: Range) -> Self {
        Self {
            items,
            parameters: Vec::new(),
            set_upvalues: Vec::new(),
            accessed_upvalues: Vec::new(),
            mutated_upvalues: Vec::new(),
            range,
        }
    }
}
