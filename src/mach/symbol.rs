use super::{SymbolId, Val};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Const,
    Global,
    Local,
    Arg,
    String,
}

impl SymbolKind {
    /// `$1`..`$9` are arguments, other `$` names are global, the rest local.
    pub fn classify(name: &str) -> SymbolKind {
        let bytes = name.as_bytes();
        match bytes.first() {
            Some(b'$') => {
                if bytes.len() == 2 && (b'1'..=b'9').contains(&bytes[1]) {
                    SymbolKind::Arg
                } else {
                    SymbolKind::Global
                }
            }
            _ => SymbolKind::Local,
        }
    }
}

/// Value of a constant or string literal, fixed at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Integer(i32),
    String(Arc<str>),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Literal::None => Ok(()),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&Literal> for Val {
    fn from(literal: &Literal) -> Val {
        match literal {
            Literal::None => Val::NoValue,
            Literal::Integer(n) => Val::Integer(*n),
            Literal::String(s) => Val::from(&**s),
        }
    }
}

/// A named binding resolved at compile time.
///
/// Constants and string literals carry their value. Locals carry the slot
/// they occupy in a call frame and arguments carry their position.
#[derive(Debug, Clone)]
pub struct Symbol {
    name: Arc<str>,
    kind: SymbolKind,
    value: Literal,
    slot: usize,
}

impl Symbol {
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
    pub fn value(&self) -> &Literal {
        &self.value
    }
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// ## Symbol table for one compile
///
/// Literals are interned so repeated constants share one entry. Names keep
/// the kind they were given on first reference.

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<(SymbolKind, Arc<str>), SymbolId>,
    locals: usize,
    hidden: usize,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of frame slots the locals of a program need.
    pub fn local_count(&self) -> usize {
        self.locals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn find(&self, kind: SymbolKind, name: &str) -> Option<SymbolId> {
        self.index.get(&(kind, Arc::from(name))).copied()
    }

    pub fn constant(&mut self, n: i32) -> SymbolId {
        let name = format!("const {}", n);
        self.install(SymbolKind::Const, &name, Literal::Integer(n))
    }

    pub fn string(&mut self, s: &str) -> SymbolId {
        self.install(SymbolKind::String, s, Literal::String(s.into()))
    }

    /// Resolve a name as written in source.
    pub fn name(&mut self, name: &str) -> SymbolId {
        self.install(SymbolKind::classify(name), name, Literal::None)
    }

    /// Resolve a callee, which always lives in the global namespace.
    pub fn global(&mut self, name: &str) -> SymbolId {
        self.install(SymbolKind::Global, name, Literal::None)
    }

    /// A local no source text can name, used for loop iterator state.
    pub fn hidden_local(&mut self) -> SymbolId {
        let name = format!("aryiter #{}", self.hidden);
        self.hidden += 1;
        self.install(SymbolKind::Local, &name, Literal::None)
    }

    fn install(&mut self, kind: SymbolKind, name: &str, value: Literal) -> SymbolId {
        let key = (kind, Arc::from(name));
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let slot = match kind {
            SymbolKind::Local => {
                self.locals += 1;
                self.locals - 1
            }
            SymbolKind::Arg => (name.as_bytes()[1] - b'1') as usize,
            _ => 0,
        };
        let id = self.symbols.len();
        self.symbols.push(Symbol {
            name: key.1.clone(),
            kind,
            value,
            slot,
        });
        self.index.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(SymbolKind::classify("$1"), SymbolKind::Arg);
        assert_eq!(SymbolKind::classify("$9"), SymbolKind::Arg);
        assert_eq!(SymbolKind::classify("$0"), SymbolKind::Global);
        assert_eq!(SymbolKind::classify("$10"), SymbolKind::Global);
        assert_eq!(SymbolKind::classify("$x"), SymbolKind::Global);
        assert_eq!(SymbolKind::classify("x"), SymbolKind::Local);
    }

    #[test]
    fn test_interning() {
        let mut t = SymbolTable::new();
        let a = t.constant(10);
        let b = t.string("10");
        assert_ne!(a, b);
        assert_eq!(t.constant(10), a);
        assert_eq!(t.string("10"), b);
        assert_eq!(t.get(a).map(|s| s.name().to_string()), Some("const 10".into()));
        assert_eq!(t.get(a).map(|s| s.value().to_string()), Some("10".into()));
        assert_eq!(
            t.get(b).map(|s| Val::from(s.value())),
            Some(Val::from("10"))
        );
    }

    #[test]
    fn test_slots() {
        let mut t = SymbolTable::new();
        let x = t.name("x");
        let y = t.name("y");
        let arg = t.name("$3");
        let it = t.hidden_local();
        assert_eq!(t.name("x"), x);
        assert_eq!(t.get(y).map(Symbol::slot), Some(1));
        assert_eq!(t.get(arg).map(Symbol::slot), Some(2));
        assert_eq!(t.get(it).map(Symbol::slot), Some(2));
        assert_eq!(t.local_count(), 3);
        assert_ne!(t.global("x"), x);
    }
}
