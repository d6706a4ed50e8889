//! # Abstract Syntax Tree
//!
//! This module defines the tree a compiled expression is turned into. The tree
//! is immutable once built and every child is owned by exactly one parent, so a
//! compiled query can be shared between threads and evaluated concurrently.
//!
//! ## Submodules
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[node]** - The [`Ast`] node kinds
//! - **[operators]** - Comparison, arithmetic and unary operators
//!
//! ## Shapes
//!
//! ```text
//! foo.bar            Subexpression(Field(foo), Field(bar))
//! foo[0]             IndexExpression(Field(foo), Index(0))
//! foo[*].bar         Projection(Field(foo), Field(bar))
//! foo[?a > `1`].b    FilterProjection(Field(foo), Field(b), Comparator(..))
//! foo.*              Subexpression(Field(foo), ValueProjection(Identity, Identity))
//! foo[]              Projection(Flatten(Field(foo)), Identity)
//! foo[1:3]           Projection(IndexExpression(Field(foo), Slice(1, 3, _)), Identity)
//! let $x = a in $x   LetExpression(LetBindings([KeyValuePair(x, Field(a))]), VariableRef(x))
//! ```
pub mod node;
pub mod operators;
pub mod tokens;

pub use node::Ast;
pub use operators::{ArithmeticOp, Comparator, UnaryOp};
pub use tokens::Token;
