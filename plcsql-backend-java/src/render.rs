use plcsql_ast::{Block, Body, Expr, Routine, Stmt};

use crate::code::Code;
use crate::{decl, expr, stmt};

/// A node that renders itself as Java.
pub trait ToJava {
    fn to_java(&self) -> Code;
}

impl ToJava for Expr {
    fn to_java(&self) -> Code {
        expr::expr(self)
    }
}

impl ToJava for Stmt {
    fn to_java(&self) -> Code {
        stmt::stmt(self)
    }
}

impl ToJava for Block {
    fn to_java(&self) -> Code {
        stmt::block(self)
    }
}

impl ToJava for Body {
    fn to_java(&self) -> Code {
        stmt::body(self)
    }
}

impl ToJava for Routine {
    fn to_java(&self) -> Code {
        decl::routine(self)
    }
}

/// An ordered list of nodes, each rendered with `prefix` and all but the
/// last followed by `delimiter`.
pub struct JavaList<'a, T> {
    items: &'a [T],
    delimiter: &'a str,
    prefix: &'a str,
}

impl<'a, T: ToJava> JavaList<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self {
            items,
            delimiter: "",
            prefix: "",
        }
    }

    pub fn delimiter(mut self, delimiter: &'a str) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn items(&self) -> Vec<Code> {
        self.items
            .iter()
            .map(|i| match self.prefix {
                "" => i.to_java(),
                p => i.to_java().prefix(p),
            })
            .collect()
    }
}

impl<T: ToJava> ToJava for JavaList<'_, T> {
    fn to_java(&self) -> Code {
        Code::join(self.items(), self.delimiter)
    }
}
