//! MethodGenerator - authoring surface for one method body.
//!
//! A generator is created for a method stub already declared in the catalog.
//! The caller obtains [`Symbol`]s (constants, arguments, locals, member
//! accesses, operator results), combines them, and records statements and
//! blocks. Nothing reaches the container until [`MethodGenerator::flush`]:
//! a body that fails part way is simply dropped.
//!
//! # Example
//!
//! ```
//! use methodgen_compiler::{BinaryOp, MethodGenerator};
//! use methodgen_core::primitives;
//! use methodgen_registry::{MethodDef, TypeRegistry};
//!
//! let mut registry = TypeRegistry::with_builtins();
//! let math = registry.define_class("Math", None).unwrap();
//! let add = registry
//!     .add_method(
//!         math,
//!         MethodDef::new("add")
//!             .param("a", primitives::INT32)
//!             .param("b", primitives::INT32)
//!             .returns(primitives::INT32)
//!             .static_method(),
//!     )
//!     .unwrap();
//!
//! let mut g = MethodGenerator::new(&mut registry, add).unwrap();
//! let a = g.argument(0).unwrap();
//! let b = g.argument(1).unwrap();
//! let sum = g.binary(BinaryOp::Add, a, b).unwrap();
//! g.ret_value(sum).unwrap();
//! g.flush().unwrap();
//! ```

use tracing::{debug, trace};

use methodgen_core::bytecode::BytecodeChunk;
use methodgen_core::{
    GenError, MethodImpl, PrimitiveKind, RegistrationError, Result, TypeHash, TypeSystem, Value, primitives,
};

use crate::closure::ClosureRecord;
use crate::config::GeneratorConfig;
use crate::emit::Emitter;
use crate::iterator::IteratorState;
use crate::node::Node;
use crate::sequencer::{ListId, Sequencer};
use crate::symbol::{FrameId, Storage, Symbol, SymbolArena, SymbolKind};

/// A body being authored: the method itself or an open lambda.
#[derive(Debug)]
pub(crate) struct Frame {
    pub id: FrameId,
    pub method: TypeHash,
    /// Receiver type; `None` for static bodies.
    pub this_type: Option<TypeHash>,
    pub params: Vec<TypeHash>,
    pub return_type: TypeHash,
    pub chunk: BytecodeChunk,
    pub root: ListId,
    /// Capture record of a lambda frame.
    pub closure: Option<usize>,
}

impl Frame {
    /// Raw argument slot of parameter `index`.
    fn arg_slot(&self, index: usize) -> u16 {
        (index + usize::from(self.this_type.is_some())) as u16
    }
}

/// Builder for one method body.
pub struct MethodGenerator<'r, R: TypeSystem> {
    pub(crate) registry: &'r mut R,
    pub(crate) config: GeneratorConfig,
    /// Method whose body the root frame authors.
    pub(crate) method: TypeHash,
    /// Method handed back by `flush` (differs from `method` for iterators).
    pub(crate) entry: TypeHash,
    pub(crate) owner: TypeHash,
    pub(crate) symbols: SymbolArena,
    pub(crate) sequencer: Sequencer,
    /// Active frames, innermost last. Never empty.
    pub(crate) frames: Vec<Frame>,
    next_frame: u32,
    pub(crate) closures: Vec<ClosureRecord>,
    pub(crate) closure_count: usize,
    pub(crate) open_blocks: usize,
    pub(crate) iterator: Option<IteratorState>,
    /// Bodies of generated methods, installed on flush.
    pub(crate) deferred: Vec<(TypeHash, BytecodeChunk)>,
    /// Generated shells, finished on flush.
    pub(crate) shells: Vec<TypeHash>,
}

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    /// Start authoring the body of `method`, a stub without implementation.
    pub fn new(registry: &'r mut R, method: TypeHash) -> Result<Self> {
        let entry = registry
            .method(method)
            .ok_or(RegistrationError::UnknownMethod(method))?;
        if !matches!(entry.implementation, MethodImpl::Pending) {
            return Err(RegistrationError::BodyAlreadyInstalled {
                name: entry.name.clone(),
            }
            .into());
        }
        let owner = entry.owner;
        let this_type = (!entry.is_static()).then_some(owner);
        let params = entry.param_types();
        let return_type = entry.return_type;

        let mut generator = Self::empty(registry, GeneratorConfig::default(), method, owner);
        let root = generator.sequencer.current();
        let frame = generator.new_frame(method, this_type, params, return_type, root, None);
        generator.frames.push(frame);
        Ok(generator)
    }

    pub(crate) fn empty(registry: &'r mut R, config: GeneratorConfig, method: TypeHash, owner: TypeHash) -> Self {
        Self {
            registry,
            config,
            method,
            entry: method,
            owner,
            symbols: SymbolArena::new(),
            sequencer: Sequencer::new(),
            frames: Vec::new(),
            next_frame: 0,
            closures: Vec::new(),
            closure_count: 0,
            open_blocks: 0,
            iterator: None,
            deferred: Vec::new(),
            shells: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The catalog this generator declares into.
    pub fn registry(&self) -> &R {
        &*self.registry
    }

    // ==========================================================================
    // Frames
    // ==========================================================================

    pub(crate) fn new_frame(
        &mut self,
        method: TypeHash,
        this_type: Option<TypeHash>,
        params: Vec<TypeHash>,
        return_type: TypeHash,
        root: ListId,
        closure: Option<usize>,
    ) -> Frame {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        Frame {
            id,
            method,
            this_type,
            params,
            return_type,
            chunk: BytecodeChunk::new(),
            root,
            closure,
        }
    }

    pub(crate) fn frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Nesting depth of the current frame (0 for the method body).
    pub(crate) fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Depth of an active frame.
    pub(crate) fn frame_depth(&self, frame: FrameId) -> Result<usize> {
        self.frames
            .iter()
            .position(|f| f.id == frame)
            .ok_or_else(|| GenError::OutOfScope {
                message: "the body owning this value is already closed".to_string(),
            })
    }

    pub(crate) fn in_iterator_root(&self) -> bool {
        self.iterator.is_some() && self.depth() == 0
    }

    // ==========================================================================
    // Values
    // ==========================================================================

    pub fn constant(&mut self, value: impl Into<Value>) -> Symbol {
        let value = value.into();
        let ty = value.type_hash();
        self.symbols.constant(value, ty)
    }

    pub fn null(&mut self) -> Symbol {
        self.symbols.constant(Value::Null, primitives::NULL)
    }

    /// Parameter `index` of the body currently being authored.
    pub fn argument(&mut self, index: usize) -> Result<Symbol> {
        if self.in_iterator_root() {
            let root = self.frames[0].id;
            let params = self.iterator.as_ref().map(|it| it.params.as_slice()).unwrap_or_default();
            let &(slot, ty) = params.get(index).ok_or(GenError::UnknownArgument {
                index,
                count: params.len(),
            })?;
            return Ok(self.symbols.stored(Storage::Local(slot), root, ty));
        }

        let frame = self.frame();
        let ty = *frame.params.get(index).ok_or(GenError::UnknownArgument {
            index,
            count: frame.params.len(),
        })?;
        let (slot, id) = (frame.arg_slot(index), frame.id);
        Ok(self.symbols.stored(Storage::Argument(slot), id, ty))
    }

    /// The receiver of the method being generated.
    ///
    /// Inside a lambda this still denotes the method's receiver, reached
    /// through the capture record.
    pub fn this(&mut self) -> Result<Symbol> {
        let root = &self.frames[0];
        let root_id = root.id;
        if let Some(iterator) = &self.iterator {
            let (slot, ty) = iterator.this_local.ok_or_else(|| GenError::StaticContext {
                name: "this".to_string(),
            })?;
            return Ok(self.symbols.stored(Storage::Local(slot), root_id, ty));
        }
        let ty = root.this_type.ok_or_else(|| GenError::StaticContext {
            name: "this".to_string(),
        })?;
        Ok(self.symbols.stored(Storage::This, root_id, ty))
    }

    /// Declare a local in the current body.
    ///
    /// Locals of an iterator body are persisted across suspension points.
    pub fn declare_local(&mut self, ty: TypeHash) -> Result<Symbol> {
        Ok(self.declare_local_slot(ty)?.1)
    }

    pub(crate) fn declare_local_slot(&mut self, ty: TypeHash) -> Result<(u16, Symbol)> {
        if ty == primitives::VOID || self.registry.type_entry(ty).is_none() {
            return Err(GenError::UnknownType(ty));
        }
        let slot = self.frame_mut().chunk.declare_local(ty)?;
        if self.in_iterator_root() {
            self.persist_local(slot, ty)?;
        }
        trace!(slot, depth = self.depth(), "declare local");
        let frame = self.frame().id;
        Ok((slot, self.symbols.stored(Storage::Local(slot), frame, ty)))
    }

    /// Store `value` into an argument or local.
    pub fn assign(&mut self, target: Symbol, value: Symbol) -> Result<()> {
        let (storage, frame) = match self.symbols.get(target) {
            Some(SymbolKind::Stored { storage, frame }) if *storage != Storage::This => (*storage, *frame),
            _ => return Err(GenError::type_mismatch("assignment target is not an argument or local")),
        };
        let node = self.take(value, target.ty())?;
        let store = self.store_storage(storage, frame, node)?;
        self.sequencer.put(store);
        Ok(())
    }

    // ==========================================================================
    // Consumption
    // ==========================================================================

    /// Consume `symbol` where a value of type `expected` is required.
    ///
    /// Checks assignability, adds an implicit numeric conversion when needed
    /// and marks intermediate symbols as consumed.
    pub(crate) fn take(&mut self, symbol: Symbol, expected: TypeHash) -> Result<Node> {
        let ty = symbol.ty();
        if ty == primitives::VOID {
            return Err(GenError::type_mismatch("expression has no value"));
        }
        if !self.registry.is_assignable(ty, expected) {
            return Err(GenError::type_mismatch(format!(
                "cannot convert '{}' to '{}'",
                self.registry.type_name(ty),
                self.registry.type_name(expected)
            )));
        }
        let node = self.load(symbol)?;
        Ok(convert(node, ty, expected))
    }

    /// Consume `symbol` as a value of its own type.
    pub(crate) fn load(&mut self, symbol: Symbol) -> Result<Node> {
        let current = self.frame().id;
        let kind = self.symbols.get_mut(symbol).ok_or_else(|| GenError::OutOfScope {
            message: "symbol does not belong to this generator".to_string(),
        })?;
        match kind {
            SymbolKind::Constant(value) => Ok(Node::Const(value.clone())),
            SymbolKind::Stored { storage, frame } => {
                let (storage, frame) = (*storage, *frame);
                self.load_storage(storage, frame, symbol.ty())
            }
            SymbolKind::Intermediate(inter) => {
                if inter.consumed {
                    let what = inter.what;
                    return Err(GenError::SymbolAlreadyConsumed {
                        what,
                        ty: self.registry.type_name(symbol.ty()),
                    });
                }
                if inter.frame != current {
                    return Err(GenError::OutOfScope {
                        message: format!("{} belongs to another body", inter.what),
                    });
                }
                inter.consumed = true;
                let node = inter.node.take();
                let statement = inter.statement;
                match (node, statement) {
                    (Some(node), _) => Ok(node),
                    (None, Some(stmt)) => self.sequencer.withdraw(stmt).ok_or_else(|| GenError::OutOfScope {
                        message: "statement was already written".to_string(),
                    }),
                    (None, None) => Err(GenError::OutOfScope {
                        message: "symbol has no value".to_string(),
                    }),
                }
            }
        }
    }

    fn load_storage(&mut self, storage: Storage, frame: FrameId, ty: TypeHash) -> Result<Node> {
        let origin = self.frame_depth(frame)?;
        if origin == self.depth() {
            return Ok(storage.load());
        }
        let field = self.capture(storage, frame, origin, ty)?;
        Ok(Node::load_field(Node::LoadThis, field))
    }

    fn store_storage(&mut self, storage: Storage, frame: FrameId, value: Node) -> Result<Node> {
        let origin = self.frame_depth(frame)?;
        if origin == self.depth() {
            return storage
                .store(value)
                .ok_or_else(|| GenError::type_mismatch("'this' cannot be assigned"));
        }
        let ty = self.storage_type(storage, origin);
        let field = self.capture(storage, frame, origin, ty)?;
        Ok(Node::store_field(Node::LoadThis, field, value))
    }

    fn storage_type(&self, storage: Storage, depth: usize) -> TypeHash {
        let frame = &self.frames[depth];
        match storage {
            Storage::Local(slot) => frame.chunk.locals().get(slot as usize).copied(),
            Storage::Argument(slot) => {
                let index = slot as usize - usize::from(frame.this_type.is_some());
                frame.params.get(index).copied()
            }
            Storage::This => frame.this_type,
        }
        .unwrap_or(primitives::OBJECT)
    }

    /// Record an intermediate that was put as a statement.
    pub(crate) fn put_intermediate(&mut self, node: Node, ty: TypeHash, what: &'static str) -> Symbol {
        let stmt = self.sequencer.put(node);
        let frame = self.frame().id;
        self.symbols.statement(stmt, frame, ty, what)
    }

    pub(crate) fn expression(&mut self, node: Node, ty: TypeHash, what: &'static str) -> Symbol {
        let frame = self.frame().id;
        self.symbols.expression(node, frame, ty, what)
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    /// Return from a void body (or end an iterator body).
    pub fn ret(&mut self) -> Result<()> {
        if self.in_iterator_root() {
            return self.yield_break();
        }
        if self.frame().return_type != primitives::VOID {
            return Err(GenError::type_mismatch("missing return value"));
        }
        self.sequencer.put(Node::Return(None));
        Ok(())
    }

    /// Return `value` (or yield it from an iterator body).
    pub fn ret_value(&mut self, value: Symbol) -> Result<()> {
        if self.in_iterator_root() {
            return self.yield_return(value);
        }
        let return_type = self.frame().return_type;
        if return_type == primitives::VOID {
            return Err(GenError::type_mismatch("void body cannot return a value"));
        }
        let node = self.take(value, return_type)?;
        self.sequencer.put(Node::Return(Some(Box::new(node))));
        Ok(())
    }

    /// Throw an exception object.
    pub fn throw(&mut self, exception: Symbol) -> Result<()> {
        let node = self.take(exception, primitives::EXCEPTION)?;
        self.sequencer.put(Node::Throw(Box::new(node)));
        Ok(())
    }

    /// Evaluate `symbol` for its side effects only.
    pub fn discard(&mut self, symbol: Symbol) -> Result<()> {
        if let Some(SymbolKind::Intermediate(inter)) = self.symbols.get(symbol)
            && inter.statement.is_some()
            && !inter.consumed
        {
            return Ok(());
        }
        let node = self.load(symbol)?;
        self.sequencer.put(node);
        Ok(())
    }

    // ==========================================================================
    // Flush
    // ==========================================================================

    /// Write the body, install it and every generated method, and finish the
    /// generated shells. Returns the method callers invoke.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn flush(mut self) -> Result<TypeHash> {
        if self.open_blocks > 0 || self.frames.len() != 1 {
            return Err(GenError::discipline(format!(
                "{} block(s) still open at flush",
                self.open_blocks
            )));
        }

        if self.iterator.is_some() {
            self.yield_break()?;
        } else if self.frame().return_type == primitives::VOID {
            self.sequencer.put(Node::Return(None));
        }

        let Some(mut frame) = self.frames.pop() else {
            return Err(GenError::discipline("no body to flush"));
        };
        let layout = self.iterator.as_ref().map(IteratorState::layout);
        {
            let mut emitter = Emitter::new(&mut frame.chunk, self.config.inline_small_constants);
            if let Some(layout) = &layout {
                emitter = emitter.with_layout(layout);
            }
            self.sequencer.write(frame.root, &mut emitter)?;
        }
        frame.chunk.finish()?;

        debug!(
            method = %self.registry.type_name(self.owner),
            bytes = frame.chunk.len(),
            generated = self.deferred.len(),
            "flush body"
        );

        self.registry.install_body(self.method, frame.chunk)?;
        for (method, chunk) in self.deferred.drain(..) {
            self.registry.install_body(method, chunk)?;
        }
        for shell in self.shells.drain(..) {
            self.registry.finish_shell(shell)?;
        }
        Ok(self.entry)
    }
}

/// Implicit numeric conversion from `from` to `to`, if both are primitives.
pub(crate) fn convert(node: Node, from: TypeHash, to: TypeHash) -> Node {
    match (PrimitiveKind::from_hash(from), PrimitiveKind::from_hash(to)) {
        (Some(a), Some(b)) if a != b => Node::Convert {
            value: Box::new(node),
            to: b,
        },
        _ => node,
    }
}
