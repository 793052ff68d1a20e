use std::sync::Arc;

/// A lexical scope: enclosing routine, the block whose declaration class
/// owns the members declared here, and the nesting level.
///
/// Scopes are built top-down and handed to each declaration at construction,
/// so a `Decl` never exists without its owning scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Dotted path of the enclosing routine (`outer.inner`).
    pub routine: String,
    /// Block name; members of this scope render as `<block>.<name>`.
    pub block: String,
    pub level: u32,
}

impl Scope {
    pub fn unit(routine: &str) -> Arc<Scope> {
        Arc::new(Scope {
            routine: routine.to_string(),
            block: format!("{routine}_1"),
            level: 1,
        })
    }

    /// A scope nested in the same routine (block, loop, case statement, cursor).
    pub fn nested(&self, kind: &str) -> Arc<Scope> {
        let level = self.level + 1;
        Arc::new(Scope {
            routine: self.routine.clone(),
            block: format!("{kind}_{level}"),
            level,
        })
    }

    /// The scope of a routine declared inside this one.
    pub fn routine(&self, name: &str) -> Arc<Scope> {
        let level = self.level + 1;
        Arc::new(Scope {
            routine: format!("{}.{name}", self.routine),
            block: format!("{name}_{level}"),
            level,
        })
    }

    pub fn same_routine(&self, other: &Scope) -> bool {
        self.routine == other.routine
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Declarations,
    Body,
}

/// Where an identifier is referenced from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Site {
    pub scope: Arc<Scope>,
    pub section: Section,
}

impl Site {
    pub fn body(scope: &Arc<Scope>) -> Site {
        Site {
            scope: scope.clone(),
            section: Section::Body,
        }
    }

    pub fn declarations(scope: &Arc<Scope>) -> Site {
        Site {
            scope: scope.clone(),
            section: Section::Declarations,
        }
    }
}
