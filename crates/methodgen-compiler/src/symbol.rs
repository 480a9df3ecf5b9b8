//! Symbols: typed value producers handed out to body authors.
//!
//! A [`Symbol`] is a small copyable handle; what it stands for lives in the
//! generator's [`SymbolArena`]. Constants and storage-backed symbols
//! (arguments, locals, `this`) are durable and may be read any number of
//! times. Everything else is an intermediate: an instruction tree (or a
//! pending statement) that may be consumed exactly once.

use methodgen_core::{TypeHash, Value};

use crate::node::Node;
use crate::sequencer::StmtRef;

/// A typed value producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    id: u32,
    ty: TypeHash,
}

impl Symbol {
    /// Static type of the produced value. Never changes.
    pub fn ty(&self) -> TypeHash {
        self.ty
    }
}

/// Identity of one method body being authored (the top-level body or a lambda).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FrameId(pub u32);

/// Durable storage a symbol reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Storage {
    /// Raw argument slot (slot 0 is `this` in instance bodies).
    Argument(u16),
    Local(u16),
    This,
}

impl Storage {
    pub fn load(self) -> Node {
        match self {
            Storage::Argument(slot) => Node::LoadArg(slot),
            Storage::Local(slot) => Node::LoadLocal(slot),
            Storage::This => Node::LoadThis,
        }
    }

    pub fn store(self, value: Node) -> Option<Node> {
        match self {
            Storage::Argument(slot) => Some(Node::StoreArg(slot, Box::new(value))),
            Storage::Local(slot) => Some(Node::StoreLocal(slot, Box::new(value))),
            Storage::This => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Intermediate {
    /// Pure instruction tree, taken on consumption.
    pub node: Option<Node>,
    /// Statement already put into the sequencer, withdrawn on consumption.
    pub statement: Option<StmtRef>,
    pub frame: FrameId,
    pub consumed: bool,
    /// Kind of computation, for diagnostics.
    pub what: &'static str,
}

#[derive(Debug)]
pub(crate) enum SymbolKind {
    Constant(Value),
    Stored { storage: Storage, frame: FrameId },
    Intermediate(Intermediate),
}

#[derive(Debug, Default)]
pub(crate) struct SymbolArena {
    symbols: Vec<SymbolKind>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: SymbolKind, ty: TypeHash) -> Symbol {
        let id = self.symbols.len() as u32;
        self.symbols.push(kind);
        Symbol { id, ty }
    }

    pub fn constant(&mut self, value: Value, ty: TypeHash) -> Symbol {
        self.push(SymbolKind::Constant(value), ty)
    }

    pub fn stored(&mut self, storage: Storage, frame: FrameId, ty: TypeHash) -> Symbol {
        self.push(SymbolKind::Stored { storage, frame }, ty)
    }

    /// A pure expression consumed by value.
    pub fn expression(&mut self, node: Node, frame: FrameId, ty: TypeHash, what: &'static str) -> Symbol {
        self.push(
            SymbolKind::Intermediate(Intermediate {
                node: Some(node),
                statement: None,
                frame,
                consumed: false,
                what,
            }),
            ty,
        )
    }

    /// A computation already put as a statement.
    pub fn statement(&mut self, statement: StmtRef, frame: FrameId, ty: TypeHash, what: &'static str) -> Symbol {
        self.push(
            SymbolKind::Intermediate(Intermediate {
                node: None,
                statement: Some(statement),
                frame,
                consumed: false,
                what,
            }),
            ty,
        )
    }

    pub fn get(&self, symbol: Symbol) -> Option<&SymbolKind> {
        self.symbols.get(symbol.id as usize)
    }

    pub fn get_mut(&mut self, symbol: Symbol) -> Option<&mut SymbolKind> {
        self.symbols.get_mut(symbol.id as usize)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodgen_core::primitives;

    #[test]
    fn symbols_keep_their_type() {
        let mut arena = SymbolArena::new();
        let c = arena.constant(Value::Int32(3), primitives::INT32);
        let l = arena.stored(Storage::Local(0), FrameId(0), primitives::STRING);
        assert_eq!(c.ty(), primitives::INT32);
        assert_eq!(l.ty(), primitives::STRING);
        assert_ne!(c, l);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn storage_nodes() {
        assert_eq!(Storage::Argument(2).load(), Node::LoadArg(2));
        assert_eq!(Storage::This.load(), Node::LoadThis);
        assert!(Storage::This.store(Node::LoadThis).is_none());
        assert_eq!(
            Storage::Local(1).store(Node::Const(Value::Int32(0))),
            Some(Node::StoreLocal(1, Box::new(Node::Const(Value::Int32(0)))))
        );
    }
}
