use std::collections::HashMap;

use crate::parser::{ScopeId, TypeName};

/// Size in bytes of an `int` or `bool`, and of each `intarray` element.
pub const WORD_SIZE: usize = 4;

pub const GLOBAL_SCOPE: ScopeId = 0;

#[derive(Clone, Debug, PartialEq)]
pub enum SymbolKind {
    Int,
    Bool,
    IntArray,
    Function { params: usize, return_type: TypeName },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Bytes from the start of the scope's frame area.
    pub offset: usize,
    /// Element count for arrays, 1 for scalars, 0 for functions.
    pub length: usize,
}

impl Symbol {
    pub fn size(&self) -> usize {
        self.length * WORD_SIZE
    }

    pub fn is_array(&self) -> bool {
        self.kind == SymbolKind::IntArray
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, SymbolKind::Int | SymbolKind::Bool)
    }
}

#[derive(Clone, Debug)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
    size: usize,
}

impl Scope {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            symbols: HashMap::new(),
            size: 0,
        }
    }
}

/// Maps (scope, name) to the symbol declared there.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None)],
        }
    }

    pub fn open_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope::new(Some(parent)));
        self.scopes.len() - 1
    }

    /// Declares `name` in `scope`, placing it after everything declared there
    /// so far. Returns `None` if the name is already taken in that scope.
    pub fn declare(&mut self, scope: ScopeId, name: &str, ty: TypeName) -> Option<&Symbol> {
        let (kind, length) = match ty {
            TypeName::Int => (SymbolKind::Int, 1),
            TypeName::Bool => (SymbolKind::Bool, 1),
            TypeName::IntArray(len) => (SymbolKind::IntArray, len as usize),
        };
        self.insert(scope, name, kind, length)
    }

    pub fn declare_func(
        &mut self,
        name: &str,
        params: usize,
        return_type: TypeName,
    ) -> Option<&Symbol> {
        let kind = SymbolKind::Function {
            params,
            return_type,
        };
        self.insert(GLOBAL_SCOPE, name, kind, 0)
    }

    fn insert(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        length: usize,
    ) -> Option<&Symbol> {
        let scope = &mut self.scopes[scope];
        if scope.symbols.contains_key(name) {
            return None;
        }

        let symbol = Symbol {
            kind,
            offset: scope.size,
            length,
        };
        scope.size += symbol.size();
        Some(scope.symbols.entry(name.to_string()).or_insert(symbol))
    }

    /// Finds `name` in `scope` or the nearest enclosing scope.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scopes.get(id)?;
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            current = scope.parent;
        }
        None
    }

    /// Total bytes needed by everything declared directly in `scope`.
    pub fn scope_size(&self, scope: ScopeId) -> usize {
        self.scopes.get(scope).map_or(0, |s| s.size)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
