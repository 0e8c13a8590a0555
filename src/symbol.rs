//! Scoped symbol tables (spec §3.8). Three coexisting tables share the same scope-stack
//! shape; this module provides the shape generically and each of the parser's type-name
//! table and the analyzer's overload-capable symbol table specialize it.

use indexmap::IndexMap;
use smol_str::SmolStr;

/// A stack of scopes over `IndexMap<SmolStr, V>`, preserving declaration order within a
/// scope (spec §5 "ordering" — diagnostics should read in source order, and `IndexMap`
/// keeps iteration order matching insertion order, unlike `HashMap`).
pub struct ScopedTable<V> {
    scopes: Vec<IndexMap<SmolStr, V>>,
}

impl<V> ScopedTable<V> {
    pub fn new() -> ScopedTable<V> {
        ScopedTable {
            scopes: vec![IndexMap::new()],
        }
    }

    pub fn open_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    /// Closes the innermost scope and returns its entries in declaration order, so the
    /// caller (the analyzer) can run the "unused variable" check over them before they
    /// are dropped (spec §4.5 "Scoping").
    pub fn close_scope(&mut self) -> IndexMap<SmolStr, V> {
        self.scopes.pop().expect("unbalanced scopes")
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Looks up `name` from innermost to outermost scope.
    pub fn lookup(&self, name: &str) -> Option<&V> {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = scope.get(name) {
                return Some(v);
            }
        }
        None
    }

    /// True if `name` is declared in the *current* (innermost) scope only.
    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().unwrap().contains_key(name)
    }

    /// Looks up `name` in the current (innermost) scope only, e.g. to decide whether a
    /// new declaration collides with one already in this scope (spec §4.5 "Symbol
    /// registration").
    pub fn lookup_in_current_scope(&self, name: &str) -> Option<&V> {
        self.scopes.last().unwrap().get(name)
    }

    pub fn declare(&mut self, name: impl Into<SmolStr>, value: V) {
        self.scopes.last_mut().unwrap().insert(name.into(), value);
    }

    pub fn current_scope_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.scopes.last().unwrap().keys()
    }

    /// All names visible from every currently open scope, innermost and outer alike —
    /// used for similar-name suggestions on an undeclared identifier (spec §4.5 "Lookup
    /// order").
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().flat_map(|s| s.keys()).map(|s| s.as_str())
    }
}

/// Boolean type-name table used by the parser to disambiguate cast expressions (spec
/// §4.4): is `name` currently in scope as a type (struct/typedef/built-in alias)?
pub struct TypeNameTable {
    scopes: Vec<indexmap::IndexSet<SmolStr>>,
}

impl TypeNameTable {
    pub fn new() -> TypeNameTable {
        let mut table = TypeNameTable { scopes: vec![indexmap::IndexSet::new()] };
        for (name, _) in crate::keywords::BUILT_IN_TYPE_ALIASES {
            table.declare(*name);
        }
        table
    }

    pub fn open_scope(&mut self) {
        self.scopes.push(indexmap::IndexSet::new());
    }

    pub fn close_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn declare(&mut self, name: impl Into<SmolStr>) {
        self.scopes.last_mut().unwrap().insert(name.into());
    }

    pub fn is_type_name(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_lookup_favors_innermost_declaration() {
        let mut t: ScopedTable<i32> = ScopedTable::new();
        t.declare("x", 1);
        t.open_scope();
        t.declare("x", 2);
        assert_eq!(*t.lookup("x").unwrap(), 2);
        t.close_scope();
        assert_eq!(*t.lookup("x").unwrap(), 1);
    }

    #[test]
    fn type_name_table_seeds_built_in_aliases() {
        let t = TypeNameTable::new();
        assert!(t.is_type_name("DWORD"));
        assert!(!t.is_type_name("foo"));
    }

    #[test]
    fn type_name_table_tracks_typedef_scope() {
        let mut t = TypeNameTable::new();
        t.open_scope();
        t.declare("MyType");
        assert!(t.is_type_name("MyType"));
        t.close_scope();
        assert!(!t.is_type_name("MyType"));
    }
}
