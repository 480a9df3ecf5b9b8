//! Closure conversion.
//!
//! Every lambda gets a capture record backed by a generated shell. Reading
//! storage that belongs to an enclosing body adds a field to the innermost
//! record; when the storage lives more than one level out, each intermediate
//! record gets a relay field holding the parent's copy. The values are
//! copied into the shell instance when the lambda ends, so a lambda sees the
//! state of captured storage at that point.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use methodgen_core::{GenError, Result, TypeHash, TypeSystem};

use crate::generator::MethodGenerator;
use crate::node::Node;
use crate::symbol::{FrameId, Storage};

#[derive(Debug)]
pub(crate) struct ClosureRecord {
    /// Depth of the frame the lambda was opened in.
    pub level: usize,
    pub shell: TypeHash,
    /// Local slot holding the shell instance in the enclosing frame.
    pub instance: u16,
    pub parent: Option<usize>,
    /// Fields copying storage of the enclosing frame.
    pub direct: FxHashMap<(FrameId, Storage), TypeHash>,
    /// Fields copying a parent record's field, keyed by that field.
    pub relays: FxHashMap<TypeHash, TypeHash>,
    /// Field initializers, written after the instance is constructed.
    pub init: Vec<Node>,
    fields: usize,
}

impl ClosureRecord {
    pub fn new(level: usize, shell: TypeHash, instance: u16, parent: Option<usize>) -> Self {
        Self {
            level,
            shell,
            instance,
            parent,
            direct: FxHashMap::default(),
            relays: FxHashMap::default(),
            init: Vec::new(),
            fields: 0,
        }
    }
}

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    /// Field of the current lambda's record that mirrors `storage`, declared
    /// on first use.
    pub(crate) fn capture(&mut self, storage: Storage, frame: FrameId, origin: usize, ty: TypeHash) -> Result<TypeHash> {
        let closure = self.frame().closure.ok_or_else(|| GenError::OutOfScope {
            message: "value of an enclosing body used outside a lambda".to_string(),
        })?;
        self.capture_in(closure, storage, frame, origin, ty)
    }

    fn capture_in(
        &mut self,
        closure: usize,
        storage: Storage,
        frame: FrameId,
        origin: usize,
        ty: TypeHash,
    ) -> Result<TypeHash> {
        let record = &self.closures[closure];
        if origin > record.level {
            return Err(GenError::OutOfScope {
                message: "storage is not visible from this lambda".to_string(),
            });
        }

        if origin == record.level {
            if let Some(field) = record.direct.get(&(frame, storage)) {
                return Ok(*field);
            }
            let field = self.define_capture_field(closure, ty)?;
            let record = &mut self.closures[closure];
            record
                .init
                .push(Node::store_field(Node::LoadLocal(record.instance), field, storage.load()));
            record.direct.insert((frame, storage), field);
            trace!(level = record.level, "capture field");
            return Ok(field);
        }

        let parent = record.parent.ok_or_else(|| GenError::OutOfScope {
            message: "no enclosing lambda to relay through".to_string(),
        })?;
        let parent_field = self.capture_in(parent, storage, frame, origin, ty)?;
        if let Some(field) = self.closures[closure].relays.get(&parent_field) {
            return Ok(*field);
        }
        let field = self.define_capture_field(closure, ty)?;
        let record = &mut self.closures[closure];
        record.init.push(Node::store_field(
            Node::LoadLocal(record.instance),
            field,
            Node::load_field(Node::LoadThis, parent_field),
        ));
        record.relays.insert(parent_field, field);
        debug!(level = record.level, "relay field");
        Ok(field)
    }

    fn define_capture_field(&mut self, closure: usize, ty: TypeHash) -> Result<TypeHash> {
        let record = &mut self.closures[closure];
        let name = format!("capture_{}", record.fields);
        record.fields += 1;
        let shell = record.shell;
        Ok(self.registry.define_field(shell, &name, ty)?)
    }
}
