//! Interpreter for generated method bodies.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use methodgen_core::bytecode::{BytecodeChunk, Constant, OpCode};
use methodgen_core::{MethodEntry, MethodFlags, MethodImpl, PrimitiveKind, TypeCatalog, TypeHash, Value, primitives};

use super::arith;
use super::memory::{Object, Slot};
use super::RuntimeError;

type Result<T> = std::result::Result<T, RuntimeError>;

/// Nested call limit.
const MAX_CALL_DEPTH: usize = 256;

/// Executes method bodies against a type catalog.
///
/// Every call runs to completion on the Rust stack; there is no suspension
/// and no exception handling inside generated code. A `Throw` unwinds all the
/// way out as [`RuntimeError::Thrown`].
pub struct Vm<'c, C: TypeCatalog + ?Sized> {
    catalog: &'c C,
    statics: FxHashMap<TypeHash, Slot>,
    depth: usize,
}

struct StackFrame {
    /// Receiver (if any) followed by the arguments.
    args: Vec<Slot>,
    locals: Vec<Slot>,
    stack: Vec<Slot>,
}

impl StackFrame {
    fn pop(&mut self) -> Result<Slot> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Slot>> {
        if self.stack.len() < n {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn pop_value(&mut self) -> Result<Value> {
        match self.pop()? {
            Slot::Value(v) => Ok(v),
            other => Err(RuntimeError::malformed(format!("expected a value, found {other:?}"))),
        }
    }

    fn pop_bool(&mut self) -> Result<bool> {
        let value = self.pop_value()?;
        value
            .as_bool()
            .ok_or_else(|| RuntimeError::malformed(format!("expected a bool, found {value}")))
    }

    fn pop_index(&mut self) -> Result<usize> {
        let value = self.pop_value()?;
        value
            .as_i64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or(RuntimeError::IndexOutOfRange {
                index: value.as_i64().unwrap_or(-1),
                len: 0,
            })
    }
}

impl<'c, C: TypeCatalog + ?Sized> Vm<'c, C> {
    pub fn new(catalog: &'c C) -> Self {
        Self {
            catalog,
            statics: FxHashMap::default(),
            depth: 0,
        }
    }

    /// Call a static method.
    pub fn call_static(&mut self, method: TypeHash, args: Vec<Slot>) -> Result<Option<Slot>> {
        self.dispatch(method, None, args, false)
    }

    /// Call an instance method through the receiver's runtime type.
    pub fn call_method(&mut self, receiver: &Slot, method: TypeHash, args: Vec<Slot>) -> Result<Option<Slot>> {
        self.dispatch(method, Some(receiver.clone()), args, true)
    }

    /// Call the instance method `name` found on the receiver's runtime type.
    pub fn call_named(&mut self, receiver: &Slot, name: &str, args: Vec<Slot>) -> Result<Option<Slot>> {
        let ty = receiver.runtime_type().ok_or(RuntimeError::NullReference)?;
        let method = self
            .catalog
            .methods_named(ty, name)
            .into_iter()
            .find(|m| !m.is_static() && m.params.len() == args.len())
            .map(|m| m.id)
            .ok_or_else(|| RuntimeError::MissingMember {
                ty: self.catalog.type_name(ty),
                name: name.to_string(),
            })?;
        self.call_method(receiver, method, args)
    }

    /// Allocate an instance of the constructor's owner and run it.
    pub fn construct(&mut self, ctor: TypeHash, args: Vec<Slot>) -> Result<Slot> {
        let entry = self.method_entry(ctor)?;
        let instance = self.allocate(entry.owner);
        self.run(entry, Some(instance.clone()), args)?;
        Ok(instance)
    }

    /// Invoke a delegate object.
    pub fn invoke_delegate(&mut self, delegate: &Slot, args: Vec<Slot>) -> Result<Option<Slot>> {
        let (target, method) = match delegate.as_object().map(|o| o.borrow()) {
            Some(object) => match &*object {
                Object::Delegate { target, method, .. } => (target.clone(), *method),
                _ => return Err(RuntimeError::malformed("invoke on a non-delegate object")),
            },
            None => return Err(RuntimeError::NullReference),
        };
        let entry = self.method_entry(method)?;
        if entry.is_static() {
            self.dispatch(method, None, args, false)
        } else {
            self.dispatch(method, Some(target), args, false)
        }
    }

    /// Drain an enumerable through `get_enumerator` / `move_next` / `get_current`.
    pub fn collect_sequence(&mut self, enumerable: &Slot) -> Result<Vec<Slot>> {
        let enumerator = self
            .call_named(enumerable, "get_enumerator", Vec::new())?
            .ok_or_else(|| RuntimeError::malformed("get_enumerator returned nothing"))?;
        let mut items = Vec::new();
        while self.move_next(&enumerator)? {
            items.push(self.current(&enumerator)?);
        }
        Ok(items)
    }

    pub fn move_next(&mut self, enumerator: &Slot) -> Result<bool> {
        self.call_named(enumerator, "move_next", Vec::new())?
            .and_then(|more| more.as_bool())
            .ok_or_else(|| RuntimeError::malformed("move_next did not return a bool"))
    }

    pub fn current(&mut self, enumerator: &Slot) -> Result<Slot> {
        self.call_named(enumerator, "get_current", Vec::new())?
            .ok_or_else(|| RuntimeError::malformed("get_current returned nothing"))
    }

    /// Current value of a static field.
    pub fn static_field(&self, field: TypeHash) -> Option<&Slot> {
        self.statics.get(&field)
    }

    // ==========================================================================
    // Dispatch
    // ==========================================================================

    fn method_entry(&self, method: TypeHash) -> Result<&'c MethodEntry> {
        self.catalog.method(method).ok_or(RuntimeError::UnknownMethod(method))
    }

    fn dispatch(&mut self, method: TypeHash, this: Option<Slot>, args: Vec<Slot>, virtual_call: bool) -> Result<Option<Slot>> {
        let entry = self.method_entry(method)?;
        if entry.flags.contains(MethodFlags::DELEGATE_INVOKE) {
            let delegate = this.ok_or(RuntimeError::NullReference)?;
            return self.invoke_delegate(&delegate, args);
        }
        let needs_receiver = !entry.is_static() && !entry.is_constructor();
        let entry = match &this {
            Some(receiver) if needs_receiver => {
                let runtime = receiver.runtime_type().ok_or(RuntimeError::NullReference)?;
                if virtual_call || matches!(entry.implementation, MethodImpl::Abstract) {
                    self.method_entry(self.catalog.resolve_override(runtime, method))?
                } else {
                    entry
                }
            }
            None if needs_receiver => return Err(RuntimeError::NullReference),
            _ => entry,
        };
        self.run(entry, this.filter(|_| needs_receiver), args)
    }

    fn run(&mut self, entry: &'c MethodEntry, this: Option<Slot>, args: Vec<Slot>) -> Result<Option<Slot>> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded(MAX_CALL_DEPTH));
        }
        trace!(method = %entry.name, args = args.len(), "call");

        let returns_value = entry.return_type != primitives::VOID;
        match &entry.implementation {
            MethodImpl::Native(f) => {
                let values = this
                    .into_iter()
                    .chain(args)
                    .map(|slot| match slot {
                        Slot::Value(v) => Ok(v),
                        other => Err(RuntimeError::NativeArgument {
                            method: entry.name.clone(),
                            found: format!("{other:?}"),
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                let result = f.call(&values);
                Ok(returns_value.then_some(Slot::Value(result)))
            }
            MethodImpl::Bytecode(chunk) => {
                let chunk = Arc::clone(chunk);
                let mut frame_args = Vec::with_capacity(args.len() + 1);
                frame_args.extend(this);
                frame_args.extend(args);
                self.depth += 1;
                let result = self.execute(&chunk, frame_args);
                self.depth -= 1;
                result
            }
            MethodImpl::DefaultConstructor => Ok(None),
            MethodImpl::Abstract => Err(RuntimeError::AbstractCall(entry.name.clone())),
            MethodImpl::Pending => Err(RuntimeError::MissingBody(entry.name.clone())),
        }
    }

    /// New instance with every instance field at its default.
    fn allocate(&self, ty: TypeHash) -> Slot {
        let mut fields = FxHashMap::default();
        for owner in self.catalog.ancestors(ty) {
            let Some(entry) = self.catalog.type_entry(owner) else {
                continue;
            };
            for field in entry.fields.iter().filter_map(|id| self.catalog.field(*id)) {
                if !field.is_static {
                    fields.insert(field.id, Slot::default_for(field.ty));
                }
            }
        }
        Slot::alloc(Object::Instance { ty, fields })
    }

    // ==========================================================================
    // Execution
    // ==========================================================================

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn execute(&mut self, chunk: &BytecodeChunk, args: Vec<Slot>) -> Result<Option<Slot>> {
        let mut frame = StackFrame {
            args,
            locals: chunk.locals().iter().map(|ty| Slot::default_for(*ty)).collect(),
            stack: Vec::new(),
        };
        let mut pc = 0usize;

        loop {
            let Some(op) = chunk.read_op(pc) else {
                warn!(offset = pc, "execution ran off the end of the body");
                return Err(RuntimeError::malformed(format!("no instruction at offset {pc}")));
            };
            let at = pc;
            pc += 1 + op.operand_size();

            match op {
                // === Constants ===
                OpCode::Constant => {
                    let index = operand_u16(chunk, at)?;
                    match chunk.constant(index) {
                        Some(Constant::Value(v)) => frame.stack.push(Slot::Value(v.clone())),
                        _ => return Err(RuntimeError::malformed(format!("constant {index} is not a value"))),
                    }
                }
                OpCode::PushNull => frame.stack.push(Slot::null()),
                OpCode::PushTrue => frame.stack.push(Slot::value(true)),
                OpCode::PushFalse => frame.stack.push(Slot::value(false)),
                OpCode::PushZero => frame.stack.push(Slot::value(0i32)),
                OpCode::PushOne => frame.stack.push(Slot::value(1i32)),

                // === Stack ===
                OpCode::Pop => {
                    frame.pop()?;
                }
                OpCode::Dup => {
                    let top = frame.stack.last().cloned().ok_or(RuntimeError::StackUnderflow)?;
                    frame.stack.push(top);
                }

                // === Storage ===
                OpCode::GetLocal => {
                    let slot = usize::from(operand_u16(chunk, at)?);
                    let value = frame.locals.get(slot).cloned().ok_or(RuntimeError::BadSlot(slot))?;
                    frame.stack.push(value);
                }
                OpCode::SetLocal => {
                    let slot = usize::from(operand_u16(chunk, at)?);
                    let value = frame.pop()?;
                    *frame.locals.get_mut(slot).ok_or(RuntimeError::BadSlot(slot))? = value;
                }
                OpCode::GetArg => {
                    let slot = usize::from(operand_u16(chunk, at)?);
                    let value = frame.args.get(slot).cloned().ok_or(RuntimeError::BadSlot(slot))?;
                    frame.stack.push(value);
                }
                OpCode::SetArg => {
                    let slot = usize::from(operand_u16(chunk, at)?);
                    let value = frame.pop()?;
                    *frame.args.get_mut(slot).ok_or(RuntimeError::BadSlot(slot))? = value;
                }
                OpCode::GetThis => {
                    let this = frame.args.first().cloned().ok_or(RuntimeError::BadSlot(0))?;
                    frame.stack.push(this);
                }
                OpCode::GetField => {
                    let field = operand_hash(chunk, at)?;
                    let target = frame.pop()?;
                    let value = self.read_field(&target, field)?;
                    frame.stack.push(value);
                }
                OpCode::SetField => {
                    let field = operand_hash(chunk, at)?;
                    let value = frame.pop()?;
                    let target = frame.pop()?;
                    write_field(&target, field, value)?;
                }
                OpCode::GetStatic => {
                    let field = operand_hash(chunk, at)?;
                    let value = match self.statics.get(&field) {
                        Some(value) => value.clone(),
                        None => self
                            .catalog
                            .field(field)
                            .map(|f| Slot::default_for(f.ty))
                            .ok_or(RuntimeError::UnknownField(field))?,
                    };
                    frame.stack.push(value);
                }
                OpCode::SetStatic => {
                    let field = operand_hash(chunk, at)?;
                    let value = frame.pop()?;
                    self.statics.insert(field, value);
                }

                // === Arithmetic and logic ===
                OpCode::Add
                | OpCode::AddOvf
                | OpCode::AddOvfUn
                | OpCode::Sub
                | OpCode::SubOvf
                | OpCode::SubOvfUn
                | OpCode::Mul
                | OpCode::MulOvf
                | OpCode::MulOvfUn
                | OpCode::Div
                | OpCode::DivUn
                | OpCode::Rem
                | OpCode::RemUn
                | OpCode::And
                | OpCode::Or
                | OpCode::Xor => {
                    let b = frame.pop_value()?;
                    let a = frame.pop_value()?;
                    frame.stack.push(Slot::Value(arith::binary(op, &a, &b)?));
                }
                OpCode::Neg => {
                    let a = frame.pop_value()?;
                    frame.stack.push(Slot::Value(arith::negate(&a)?));
                }
                OpCode::Not => {
                    let a = frame.pop_value()?;
                    frame.stack.push(Slot::Value(arith::complement(&a)?));
                }
                OpCode::Ceq => {
                    let b = frame.pop()?;
                    let a = frame.pop()?;
                    frame.stack.push(Slot::value(a == b));
                }
                OpCode::Cgt | OpCode::CgtUn | OpCode::Clt | OpCode::CltUn => {
                    let b = frame.pop_value()?;
                    let a = frame.pop_value()?;
                    frame.stack.push(Slot::value(arith::compare(op, &a, &b)?));
                }

                // === Conversion ===
                OpCode::Convert => {
                    let byte = chunk
                        .read_byte(at + 1)
                        .ok_or_else(|| RuntimeError::malformed("missing conversion operand"))?;
                    let kind = PrimitiveKind::try_from(byte)
                        .map_err(|_| RuntimeError::malformed(format!("bad primitive kind {byte}")))?;
                    let value = frame.pop_value()?;
                    frame.stack.push(Slot::Value(arith::convert(&value, kind)?));
                }
                OpCode::CastClass => {
                    let to = operand_hash(chunk, at)?;
                    let value = frame.pop()?;
                    if let Some(from) = value.runtime_type() {
                        if !self.catalog.is_assignable(from, to) {
                            return Err(RuntimeError::InvalidCast {
                                from: self.catalog.type_name(from),
                                to: self.catalog.type_name(to),
                            });
                        }
                    }
                    frame.stack.push(value);
                }

                // === Control flow ===
                OpCode::Jump => pc = operand_target(chunk, at)?,
                OpCode::JumpIfTrue => {
                    let target = operand_target(chunk, at)?;
                    if frame.pop_bool()? {
                        pc = target;
                    }
                }
                OpCode::JumpIfFalse => {
                    let target = operand_target(chunk, at)?;
                    if !frame.pop_bool()? {
                        pc = target;
                    }
                }

                // === Calls ===
                OpCode::Call | OpCode::CallVirtual => {
                    let method = operand_hash(chunk, at)?;
                    let entry = self.method_entry(method)?;
                    let args = frame.pop_n(entry.params.len())?;
                    let this = if entry.is_static() { None } else { Some(frame.pop()?) };
                    let result = self.dispatch(method, this, args, op == OpCode::CallVirtual)?;
                    if entry.return_type != primitives::VOID {
                        frame.stack.push(result.unwrap_or_else(Slot::null));
                    }
                }
                OpCode::Return => return Ok(Some(frame.pop()?)),
                OpCode::ReturnVoid => return Ok(None),

                // === Objects ===
                OpCode::New => {
                    let ctor = operand_hash(chunk, at)?;
                    let entry = self.method_entry(ctor)?;
                    let args = frame.pop_n(entry.params.len())?;
                    let instance = self.construct(ctor, args)?;
                    frame.stack.push(instance);
                }
                OpCode::NewArray => {
                    let element = operand_hash(chunk, at)?;
                    let len = frame.pop_index()?;
                    let items = vec![Slot::default_for(element); len];
                    frame.stack.push(Slot::alloc(Object::Array { element, items }));
                }
                OpCode::GetElement => {
                    let index = frame.pop_index()?;
                    let array = frame.pop()?;
                    let value = with_items(&array, |items| {
                        items.get(index).cloned().ok_or(RuntimeError::IndexOutOfRange {
                            index: index as i64,
                            len: items.len(),
                        })
                    })?;
                    frame.stack.push(value);
                }
                OpCode::SetElement => {
                    let value = frame.pop()?;
                    let index = frame.pop_index()?;
                    let array = frame.pop()?;
                    with_items(&array, |items| {
                        let len = items.len();
                        let slot = items.get_mut(index).ok_or(RuntimeError::IndexOutOfRange {
                            index: index as i64,
                            len,
                        })?;
                        *slot = value;
                        Ok(())
                    })?;
                }
                OpCode::LoadType => {
                    let ty = operand_hash(chunk, at)?;
                    frame.stack.push(Slot::alloc(Object::Type(ty)));
                }
                OpCode::LoadFunction => {
                    let method = operand_hash(chunk, at)?;
                    frame.stack.push(Slot::Function(method));
                }
                OpCode::NewDelegate => {
                    let ty = operand_hash(chunk, at)?;
                    let method = match frame.pop()? {
                        Slot::Function(method) => method,
                        other => return Err(RuntimeError::malformed(format!("expected a function, found {other:?}"))),
                    };
                    let target = frame.pop()?;
                    frame.stack.push(Slot::alloc(Object::Delegate { ty, target, method }));
                }
                OpCode::Throw => {
                    let exception = frame.pop()?;
                    let ty = exception.runtime_type().ok_or(RuntimeError::NullReference)?;
                    debug!(exception = %self.catalog.type_name(ty), "throw");
                    return Err(RuntimeError::Thrown {
                        ty,
                        type_name: self.catalog.type_name(ty),
                    });
                }
            }
        }
    }

    fn read_field(&self, target: &Slot, field: TypeHash) -> Result<Slot> {
        if target.is_null() {
            return Err(RuntimeError::NullReference);
        }
        target.field(field).ok_or(RuntimeError::UnknownField(field))
    }
}

fn write_field(target: &Slot, field: TypeHash, value: Slot) -> Result<()> {
    let object = target.as_object().ok_or(RuntimeError::NullReference)?;
    match &mut *object.borrow_mut() {
        Object::Instance { fields, .. } => {
            let slot = fields.get_mut(&field).ok_or(RuntimeError::UnknownField(field))?;
            *slot = value;
            Ok(())
        }
        _ => Err(RuntimeError::UnknownField(field)),
    }
}

fn with_items<T>(array: &Slot, f: impl FnOnce(&mut Vec<Slot>) -> Result<T>) -> Result<T> {
    let object = array.as_object().ok_or(RuntimeError::NullReference)?;
    match &mut *object.borrow_mut() {
        Object::Array { items, .. } => f(items),
        _ => Err(RuntimeError::malformed("element access on a non-array object")),
    }
}

fn operand_u16(chunk: &BytecodeChunk, at: usize) -> Result<u16> {
    chunk
        .read_u16(at + 1)
        .ok_or_else(|| RuntimeError::malformed(format!("truncated operand at {at}")))
}

fn operand_target(chunk: &BytecodeChunk, at: usize) -> Result<usize> {
    chunk
        .read_u32(at + 1)
        .map(|target| target as usize)
        .ok_or_else(|| RuntimeError::malformed(format!("truncated jump at {at}")))
}

fn operand_hash(chunk: &BytecodeChunk, at: usize) -> Result<TypeHash> {
    chunk
        .hash_operand(at)
        .ok_or_else(|| RuntimeError::malformed(format!("operand at {at} is not a member reference")))
}
