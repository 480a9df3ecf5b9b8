//! Statement sequencer.
//!
//! Statements are collected into lists. One list is current at a time; block
//! builders switch lists while their body is authored and splice finished
//! lists back into their container. A statement can be withdrawn after it
//! was put, which is how a call first recorded as a plain statement becomes a
//! sub-expression instead.

use tracing::trace;

use methodgen_core::Result;

use crate::emit::Emitter;
use crate::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ListId(u32);

/// Handle to a put statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StmtRef {
    list: ListId,
    index: u32,
}

#[derive(Debug)]
enum Emittable {
    /// `None` once withdrawn.
    Statement(Option<Node>),
    Splice(ListId),
}

#[derive(Debug)]
pub(crate) struct Sequencer {
    lists: Vec<Vec<Emittable>>,
    current: ListId,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            lists: vec![Vec::new()],
            current: ListId(0),
        }
    }

    pub fn new_list(&mut self) -> ListId {
        self.lists.push(Vec::new());
        ListId(self.lists.len() as u32 - 1)
    }

    pub fn current(&self) -> ListId {
        self.current
    }

    /// Make `list` current, returning the previously current list.
    pub fn switch_to(&mut self, list: ListId) -> ListId {
        std::mem::replace(&mut self.current, list)
    }

    pub fn put(&mut self, node: Node) -> StmtRef {
        let list = &mut self.lists[self.current.0 as usize];
        list.push(Emittable::Statement(Some(node)));
        let stmt = StmtRef {
            list: self.current,
            index: list.len() as u32 - 1,
        };
        trace!(list = stmt.list.0, index = stmt.index, "put statement");
        stmt
    }

    /// Remove a put statement, returning its node.
    ///
    /// Returns `None` if it was already withdrawn or its list was written.
    pub fn withdraw(&mut self, stmt: StmtRef) -> Option<Node> {
        let entry = self.lists.get_mut(stmt.list.0 as usize)?.get_mut(stmt.index as usize)?;
        match entry {
            Emittable::Statement(node) => {
                trace!(list = stmt.list.0, index = stmt.index, "withdraw statement");
                node.take()
            }
            Emittable::Splice(_) => None,
        }
    }

    /// Append the statements of `list` to the current list.
    pub fn splice(&mut self, list: ListId) {
        self.lists[self.current.0 as usize].push(Emittable::Splice(list));
    }

    /// Statements still pending in `list`, spliced lists included.
    #[cfg(test)]
    pub fn pending(&self, list: ListId) -> usize {
        self.lists[list.0 as usize]
            .iter()
            .map(|entry| match entry {
                Emittable::Statement(Some(_)) => 1,
                Emittable::Statement(None) => 0,
                Emittable::Splice(inner) => self.pending(*inner),
            })
            .sum()
    }

    /// Write every statement of `list` (and the lists spliced into it), draining them.
    pub fn write(&mut self, list: ListId, e: &mut Emitter<'_>) -> Result<()> {
        let entries = std::mem::take(&mut self.lists[list.0 as usize]);
        for entry in entries {
            match entry {
                Emittable::Statement(Some(node)) => node.write_statement(e)?,
                Emittable::Statement(None) => {}
                Emittable::Splice(inner) => self.write(inner, e)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodgen_core::Value;
    use methodgen_core::bytecode::{BytecodeChunk, OpCode};

    fn write_root(seq: &mut Sequencer) -> BytecodeChunk {
        let mut chunk = BytecodeChunk::new();
        seq.write(ListId(0), &mut Emitter::new(&mut chunk, true)).unwrap();
        chunk
    }

    #[test]
    fn withdrawn_statement_is_not_written() {
        let mut seq = Sequencer::new();
        seq.put(Node::StoreLocal(0, Box::new(Node::Const(Value::Int32(1)))));
        let gone = seq.put(Node::StoreLocal(1, Box::new(Node::Const(Value::Int32(0)))));

        assert!(seq.withdraw(gone).is_some());
        assert!(seq.withdraw(gone).is_none());
        assert_eq!(seq.pending(ListId(0)), 1);

        write_root(&mut seq).assert_opcodes(&[OpCode::PushOne, OpCode::SetLocal]);
    }

    #[test]
    fn spliced_lists_are_written_in_place() {
        let mut seq = Sequencer::new();
        let inner = seq.new_list();
        seq.put(Node::LoadArg(0));
        seq.splice(inner);
        seq.put(Node::LoadArg(2));

        let outer = seq.switch_to(inner);
        seq.put(Node::LoadArg(1));
        seq.switch_to(outer);

        assert_eq!(seq.pending(ListId(0)), 3);
        let chunk = write_root(&mut seq);
        chunk.assert_opcodes(&[
            OpCode::GetArg,
            OpCode::Pop,
            OpCode::GetArg,
            OpCode::Pop,
            OpCode::GetArg,
            OpCode::Pop,
        ]);
        // GET_ARG 0, POP, GET_ARG 1: operand of the second load at offset 5
        assert_eq!(chunk.read_u16(5), Some(1));
    }
}
