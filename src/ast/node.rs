use crate::{
    ast::{ArithmeticOp, Comparator, UnaryOp},
    value::Value,
};

/// A node of a compiled expression.
///
/// Each variant fixes its own arity. `KeyValuePair` only has meaning as an
/// entry of `MultiSelectHash` or `LetBindings`; the evaluator rejects it
/// anywhere else.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    // References
    /// Current node (`@`)
    Identity,

    /// Root document (`$`), fixed for a whole evaluation
    Root,

    /// Variable introduced by a let expression (`$name`)
    VariableRef(String),

    // Access
    /// Field access
    ///
    /// # Example
    /// ```text
    /// metadata
    /// "app.kubernetes.io/name"
    /// ```
    Field(String),

    /// Array index, negative counts from the end
    Index(i64),

    /// Slice bounds `[start:stop:step]`
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },

    /// `lhs.rhs`
    Subexpression { lhs: Box<Ast>, rhs: Box<Ast> },

    /// `lhs[rhs]` where rhs is an `Index` or `Slice`
    IndexExpression { lhs: Box<Ast>, rhs: Box<Ast> },

    // Projections
    /// List projection, evaluates `rhs` for every element of `lhs`
    Projection { lhs: Box<Ast>, rhs: Box<Ast> },

    /// List projection gated by `predicate`
    FilterProjection {
        lhs: Box<Ast>,
        rhs: Box<Ast>,
        predicate: Box<Ast>,
    },

    /// Projection over the values of an object
    ValueProjection { lhs: Box<Ast>, rhs: Box<Ast> },

    /// Flattens one level of nested arrays
    Flatten(Box<Ast>),

    // Operations
    /// `lhs | rhs`
    Pipe { lhs: Box<Ast>, rhs: Box<Ast> },

    /// `lhs || rhs`
    Or { lhs: Box<Ast>, rhs: Box<Ast> },

    /// `lhs && rhs`
    And { lhs: Box<Ast>, rhs: Box<Ast> },

    /// `!expr`
    Not(Box<Ast>),

    Comparator {
        op: Comparator,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },

    Arithmetic {
        op: ArithmeticOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },

    Unary { op: UnaryOp, operand: Box<Ast> },

    /// Function call
    ///
    /// # Example
    /// ```text
    /// sum(items[].v)
    /// regex_match('12.*', name)
    /// ```
    FunctionCall { name: String, args: Vec<Ast> },

    /// `&expr`, a deferred expression handed to higher-order functions
    ExpressionRef(Box<Ast>),

    /// JSON literal or raw string
    Literal(Value),

    // Construction
    /// `[a, b, c]`
    MultiSelectList(Vec<Ast>),

    /// `{a: x, b: y}`, every entry is a `KeyValuePair`
    MultiSelectHash(Vec<Ast>),

    KeyValuePair { key: String, value: Box<Ast> },

    // Let
    /// Binding list of a let expression, every entry is a `KeyValuePair`
    LetBindings(Vec<Ast>),

    /// `let $a = x, $b = y in body`
    LetExpression { bindings: Box<Ast>, body: Box<Ast> },
}

impl Ast {
    /// Name of the node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Ast::Identity => "Identity",
            Ast::Root => "Root",
            Ast::VariableRef(_) => "VariableRef",
            Ast::Field(_) => "Field",
            Ast::Index(_) => "Index",
            Ast::Slice { .. } => "Slice",
            Ast::Subexpression { .. } => "Subexpression",
            Ast::IndexExpression { .. } => "IndexExpression",
            Ast::Projection { .. } => "Projection",
            Ast::FilterProjection { .. } => "FilterProjection",
            Ast::ValueProjection { .. } => "ValueProjection",
            Ast::Flatten(_) => "Flatten",
            Ast::Pipe { .. } => "Pipe",
            Ast::Or { .. } => "Or",
            Ast::And { .. } => "And",
            Ast::Not(_) => "Not",
            Ast::Comparator { .. } => "Comparator",
            Ast::Arithmetic { .. } => "Arithmetic",
            Ast::Unary { .. } => "Unary",
            Ast::FunctionCall { .. } => "FunctionCall",
            Ast::ExpressionRef(_) => "ExpressionRef",
            Ast::Literal(_) => "Literal",
            Ast::MultiSelectList(_) => "MultiSelectList",
            Ast::MultiSelectHash(_) => "MultiSelectHash",
            Ast::KeyValuePair { .. } => "KeyValuePair",
            Ast::LetBindings(_) => "LetBindings",
            Ast::LetExpression { .. } => "LetExpression",
        }
    }

    /// Depth of the tree rooted at this node; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let children: Vec<&Ast> = match self {
            Ast::Identity
            | Ast::Root
            | Ast::VariableRef(_)
            | Ast::Field(_)
            | Ast::Index(_)
            | Ast::Slice { .. }
            | Ast::Literal(_) => vec![],
            Ast::Subexpression { lhs, rhs }
            | Ast::IndexExpression { lhs, rhs }
            | Ast::Projection { lhs, rhs }
            | Ast::ValueProjection { lhs, rhs }
            | Ast::Pipe { lhs, rhs }
            | Ast::Or { lhs, rhs }
            | Ast::And { lhs, rhs }
            | Ast::Comparator { lhs, rhs, .. }
            | Ast::Arithmetic { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            Ast::FilterProjection {
                lhs,
                rhs,
                predicate,
            } => vec![&**lhs, &**rhs, &**predicate],
            Ast::Flatten(child)
            | Ast::Not(child)
            | Ast::ExpressionRef(child)
            | Ast::Unary { operand: child, .. }
            | Ast::KeyValuePair { value: child, .. } => vec![&**child],
            Ast::FunctionCall { args: items, .. }
            | Ast::MultiSelectList(items)
            | Ast::MultiSelectHash(items)
            | Ast::LetBindings(items) => items.iter().collect(),
            Ast::LetExpression { bindings, body } => vec![&**bindings, &**body],
        };
        1 + children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }
}
