//! How declarations are spelled at a reference site.
//!
//! Block members live in the block's declaration class `Decl_of_<block>`,
//! instantiated as a local named `<block>`. From the same routine they are
//! reached through that local, except inside the class itself (the block's
//! own declaration section). A different routine is a method of some
//! declaration class and sees the members as plain names.

use plcsql_ast::{Decl, DeclKind, IdRef, Section, Site};

pub fn decl_class(block: &str) -> String {
    format!("Decl_of_{block}")
}

pub fn needs_block_prefix(decl: &Decl, site: &Site) -> bool {
    decl.is_block_member()
        && decl.scope.same_routine(&site.scope)
        && !(site.section == Section::Declarations && site.scope.block == decl.scope.block)
}

/// Name of the declared entity itself, qualified for the site.
pub fn qualified(r: &IdRef) -> String {
    if needs_block_prefix(&r.decl, &r.site) {
        format!("{}.{}", r.decl.scope.block, r.decl.name)
    } else {
        r.decl.name.clone()
    }
}

/// The holder array of a variable or OUT parameter, as passed to OUT arguments.
pub fn holder(r: &IdRef) -> String {
    match r.decl.kind {
        DeclKind::ForIter => format!("{}_i{}", r.decl.name, r.decl.scope.level),
        _ => qualified(r),
    }
}

/// The value the identifier denotes.
pub fn value(r: &IdRef) -> String {
    match r.decl.kind {
        DeclKind::Var { .. } | DeclKind::ParamOut { .. } | DeclKind::ForIter => {
            format!("{}[0]", holder(r))
        }
        DeclKind::ForRecord => record_rows(&r.decl),
        _ => qualified(r),
    }
}

/// The `ResultSet` bound by a cursor or query for-loop.
pub fn record_rows(record: &Decl) -> String {
    format!("{}_r{}", record.name, record.scope.level)
}

pub fn label(label: &Decl) -> String {
    format!("{}_{}", label.name, label.scope.level)
}

/// Exception type as written in a catch clause.
pub fn exception_type(r: &IdRef) -> String {
    if needs_block_prefix(&r.decl, &r.site) {
        format!("{}.{}", decl_class(&r.decl.scope.block), r.decl.name)
    } else {
        r.decl.name.clone()
    }
}

/// Instance creation of a declared exception (an inner class of the
/// declaration class).
pub fn exception_new(r: &IdRef) -> String {
    if needs_block_prefix(&r.decl, &r.site) {
        format!("{}.new {}()", r.decl.scope.block, r.decl.name)
    } else {
        format!("new {}()", r.decl.name)
    }
}
