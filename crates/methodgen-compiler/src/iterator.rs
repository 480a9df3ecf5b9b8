//! Iterator lowering.
//!
//! An iterator method `m(args) -> Enumerable<T>` is lowered into two
//! generated shells:
//!
//! - the enumerable, which stores the arguments (and receiver) and hands out
//!   fresh enumerators from `get_enumerator`;
//! - the enumerator, whose `move_next` holds the authored body rewritten as
//!   a state machine.
//!
//! Every local of the body is mirrored by an enumerator field. Each yield
//! saves the locals and its resume index into the enumerator before
//! returning; the next `move_next` restores them and jumps back to the
//! matching resume label.

use tracing::{debug, trace};

use methodgen_core::bytecode::{BytecodeChunk, Label, OpCode};
use methodgen_core::{
    GenError, MethodFlags, ParamEntry, Result, TypeHash, TypeSystem, Value, primitives,
};

use crate::config::GeneratorConfig;
use crate::emit::{Emitter, IteratorLayout};
use crate::generator::MethodGenerator;
use crate::node::Node;
use crate::symbol::Symbol;

/// State of the `move_next` body being authored.
#[derive(Debug)]
pub(crate) struct IteratorState {
    pub element: TypeHash,
    pub enumerator: TypeHash,
    pub state_field: TypeHash,
    pub current_field: TypeHash,
    pub persisted: Vec<(u16, TypeHash)>,
    pub resume: Vec<Label>,
    pub begin: Label,
    pub exhausted: Label,
    /// Locals standing in for the iterator method's parameters.
    pub params: Vec<(u16, TypeHash)>,
    /// Local standing in for the iterator method's receiver.
    pub this_local: Option<(u16, TypeHash)>,
}

impl IteratorState {
    pub fn layout(&self) -> IteratorLayout {
        IteratorLayout {
            state_field: self.state_field,
            persisted: self.persisted.clone(),
            resume: self.resume.clone(),
            begin: self.begin,
            exhausted: self.exhausted,
        }
    }
}

/// Shells and members declared for one iterator method.
struct Lowering {
    outer: TypeHash,
    enumerable: TypeHash,
    enumerable_ctor: TypeHash,
    arg_fields: Vec<TypeHash>,
    this_field: Option<TypeHash>,
    enumerator: TypeHash,
    enumerator_ctor: TypeHash,
    enumerable_field: TypeHash,
    state_field: TypeHash,
    current_field: TypeHash,
    move_next: TypeHash,
    get_enumerator: TypeHash,
    get_current: TypeHash,
}

fn interface_method<R: TypeSystem>(registry: &R, iface: TypeHash, name: &str) -> Result<TypeHash> {
    registry
        .methods_named(iface, name)
        .first()
        .map(|m| m.id)
        .ok_or_else(|| GenError::MemberNotFound {
            owner: registry.type_name(iface),
            name: name.to_string(),
            arguments: String::new(),
        })
}

/// Write `nodes` as statements into `chunk` and patch its jumps.
fn compile(chunk: &mut BytecodeChunk, nodes: &[Node], inline: bool) -> Result<()> {
    let mut emitter = Emitter::new(chunk, inline);
    for node in nodes {
        node.write_statement(&mut emitter)?;
    }
    chunk.finish()
}

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    /// Declare iterator method `name` on `owner` yielding `element`, and
    /// start authoring its body.
    ///
    /// Inside the body, arguments and `this` refer to the iterator method's
    /// own; [`ret_value`](Self::ret_value) yields and [`ret`](Self::ret)
    /// ends the sequence.
    pub fn iterator(
        registry: &'r mut R,
        owner: TypeHash,
        name: &str,
        element: TypeHash,
        params: Vec<ParamEntry>,
        flags: MethodFlags,
    ) -> Result<Self> {
        Self::iterator_with_config(registry, GeneratorConfig::default(), owner, name, element, params, flags)
    }

    pub fn iterator_with_config(
        registry: &'r mut R,
        config: GeneratorConfig,
        owner: TypeHash,
        name: &str,
        element: TypeHash,
        params: Vec<ParamEntry>,
        flags: MethodFlags,
    ) -> Result<Self> {
        if element == primitives::VOID || registry.type_entry(element).is_none() {
            return Err(GenError::UnknownType(element));
        }
        let lowering = declare_shells(registry, &config, owner, name, element, &params, flags)?;
        let is_static = flags.contains(MethodFlags::STATIC);
        let inline = config.inline_small_constants;

        let mut generator = Self::empty(registry, config, lowering.move_next, owner);
        generator.entry = lowering.outer;
        generator.shells = vec![lowering.enumerable, lowering.enumerator];
        generator.deferred = vec![
            (lowering.outer, outer_body(&lowering, params.len(), is_static, inline)?),
            (lowering.get_enumerator, get_enumerator_body(&lowering, inline)?),
            (
                lowering.get_current,
                get_current_body(&*generator.registry, &lowering, inline)?,
            ),
        ];

        let root = generator.sequencer.current();
        let mut frame = generator.new_frame(
            lowering.move_next,
            Some(lowering.enumerator),
            Vec::new(),
            primitives::BOOL,
            root,
            None,
        );
        let begin = frame.chunk.define_label();
        let exhausted = frame.chunk.define_label();
        generator.frames.push(frame);
        generator.iterator = Some(IteratorState {
            element,
            enumerator: lowering.enumerator,
            state_field: lowering.state_field,
            current_field: lowering.current_field,
            persisted: Vec::new(),
            resume: Vec::new(),
            begin,
            exhausted,
            params: Vec::new(),
            this_local: None,
        });

        // Prologue: reload arguments and receiver from the enumerable.
        let (source, _) = generator.declare_local_slot(lowering.enumerable)?;
        generator.sequencer.put(Node::StoreLocal(
            source,
            Box::new(Node::load_field(Node::LoadThis, lowering.enumerable_field)),
        ));
        let mut param_locals = Vec::with_capacity(params.len());
        for (param, field) in params.iter().zip(&lowering.arg_fields) {
            let (slot, _) = generator.declare_local_slot(param.ty)?;
            generator.sequencer.put(Node::StoreLocal(
                slot,
                Box::new(Node::load_field(Node::LoadLocal(source), *field)),
            ));
            param_locals.push((slot, param.ty));
        }
        let mut this_local = None;
        if let Some(field) = lowering.this_field {
            let (slot, _) = generator.declare_local_slot(owner)?;
            generator.sequencer.put(Node::StoreLocal(
                slot,
                Box::new(Node::load_field(Node::LoadLocal(source), field)),
            ));
            this_local = Some((slot, owner));
        }
        generator.sequencer.put(Node::RestoreState);

        if let Some(state) = generator.iterator.as_mut() {
            state.params = param_locals;
            state.this_local = this_local;
        }
        debug!(method = name, "begin iterator");
        Ok(generator)
    }

    pub(crate) fn persist_local(&mut self, slot: u16, ty: TypeHash) -> Result<()> {
        let Some(enumerator) = self.iterator.as_ref().map(|it| it.enumerator) else {
            return Err(GenError::NotAnIterator);
        };
        let field = self.registry.define_field(enumerator, &format!("local_{slot}"), ty)?;
        if let Some(state) = self.iterator.as_mut() {
            state.persisted.push((slot, field));
        }
        Ok(())
    }

    fn require_iterator_root(&self) -> Result<()> {
        if self.in_iterator_root() {
            Ok(())
        } else {
            Err(GenError::NotAnIterator)
        }
    }

    /// Yield `value` as the next element.
    pub fn yield_return(&mut self, value: Symbol) -> Result<()> {
        self.require_iterator_root()?;
        let Some((element, current_field)) = self.iterator.as_ref().map(|it| (it.element, it.current_field)) else {
            return Err(GenError::NotAnIterator);
        };
        let value = self.take(value, element)?;
        let label = self.frame_mut().chunk.define_label();
        let k = match self.iterator.as_mut() {
            Some(state) => {
                state.resume.push(label);
                state.resume.len() as u32
            }
            None => return Err(GenError::NotAnIterator),
        };
        trace!(k, "resume point");
        self.sequencer.put(Node::Sequence(vec![
            Node::SaveState(k),
            Node::store_field(Node::LoadThis, current_field, value),
            Node::Return(Some(Box::new(Node::Const(Value::Bool(true))))),
            Node::Mark(label),
        ]));
        Ok(())
    }

    /// End the sequence.
    pub fn yield_break(&mut self) -> Result<()> {
        self.require_iterator_root()?;
        let Some(state_field) = self.iterator.as_ref().map(|it| it.state_field) else {
            return Err(GenError::NotAnIterator);
        };
        self.sequencer.put(Node::Sequence(vec![
            Node::store_field(Node::LoadThis, state_field, Node::Const(Value::Int32(-1))),
            Node::Return(Some(Box::new(Node::Const(Value::Bool(false))))),
        ]));
        Ok(())
    }
}

fn declare_shells<R: TypeSystem>(
    registry: &mut R,
    config: &GeneratorConfig,
    owner: TypeHash,
    name: &str,
    element: TypeHash,
    params: &[ParamEntry],
    flags: MethodFlags,
) -> Result<Lowering> {
    let (enumerable_iface, enumerator_iface) = registry.sequence_types(element);
    let owner_name = registry.type_name(owner);
    let outer = registry.define_method(owner, name, params.to_vec(), enumerable_iface, flags)?;

    let enumerable = registry.define_shell(
        &config.iterator_shell_name(&owner_name, name, "Enumerable"),
        None,
        &[enumerable_iface],
    )?;
    let enumerable_ctor = registry.define_default_constructor(enumerable)?;
    let mut arg_fields = Vec::with_capacity(params.len());
    for param in params {
        arg_fields.push(registry.define_field(enumerable, &format!("arg_{}", param.name), param.ty)?);
    }
    let this_field = if flags.contains(MethodFlags::STATIC) {
        None
    } else {
        Some(registry.define_field(enumerable, "this", owner)?)
    };

    let enumerator = registry.define_shell(
        &config.iterator_shell_name(&owner_name, name, "Enumerator"),
        None,
        &[enumerator_iface],
    )?;
    let enumerator_ctor = registry.define_default_constructor(enumerator)?;
    let state_field = registry.define_field(enumerator, "state", primitives::INT32)?;
    let current_field = registry.define_field(enumerator, "current", element)?;
    let enumerable_field = registry.define_field(enumerator, "enumerable", enumerable)?;

    let get_enumerator = registry.define_method(
        enumerable,
        "get_enumerator",
        Vec::new(),
        enumerator_iface,
        MethodFlags::VIRTUAL,
    )?;
    let iface = interface_method(registry, enumerable_iface, "get_enumerator")?;
    registry.implement(enumerable, iface, get_enumerator)?;

    let move_next = registry.define_method(enumerator, "move_next", Vec::new(), primitives::BOOL, MethodFlags::VIRTUAL)?;
    let iface = interface_method(registry, enumerator_iface, "move_next")?;
    registry.implement(enumerator, iface, move_next)?;

    let get_current = registry.define_method(enumerator, "get_current", Vec::new(), element, MethodFlags::VIRTUAL)?;
    let iface = interface_method(registry, enumerator_iface, "get_current")?;
    registry.implement(enumerator, iface, get_current)?;

    Ok(Lowering {
        outer,
        enumerable,
        enumerable_ctor,
        arg_fields,
        this_field,
        enumerator,
        enumerator_ctor,
        enumerable_field,
        state_field,
        current_field,
        move_next,
        get_enumerator,
        get_current,
    })
}

/// `m(args)`: build the enumerable and store the arguments into it.
fn outer_body(lowering: &Lowering, arg_count: usize, is_static: bool, inline: bool) -> Result<BytecodeChunk> {
    let mut chunk = BytecodeChunk::new();
    let local = chunk.declare_local(lowering.enumerable)?;
    let first_arg = usize::from(!is_static);

    let mut nodes = vec![Node::StoreLocal(
        local,
        Box::new(Node::New {
            ctor: lowering.enumerable_ctor,
            args: Vec::new(),
        }),
    )];
    for (i, field) in lowering.arg_fields.iter().enumerate().take(arg_count) {
        nodes.push(Node::store_field(
            Node::LoadLocal(local),
            *field,
            Node::LoadArg((first_arg + i) as u16),
        ));
    }
    if let Some(field) = lowering.this_field {
        nodes.push(Node::store_field(Node::LoadLocal(local), field, Node::LoadThis));
    }
    nodes.push(Node::Return(Some(Box::new(Node::LoadLocal(local)))));

    compile(&mut chunk, &nodes, inline)?;
    Ok(chunk)
}

/// `get_enumerator()`: a fresh enumerator bound to this enumerable.
fn get_enumerator_body(lowering: &Lowering, inline: bool) -> Result<BytecodeChunk> {
    let mut chunk = BytecodeChunk::new();
    let local = chunk.declare_local(lowering.enumerator)?;
    let nodes = [
        Node::StoreLocal(
            local,
            Box::new(Node::New {
                ctor: lowering.enumerator_ctor,
                args: Vec::new(),
            }),
        ),
        Node::store_field(Node::LoadLocal(local), lowering.enumerable_field, Node::LoadThis),
        Node::Return(Some(Box::new(Node::LoadLocal(local)))),
    ];
    compile(&mut chunk, &nodes, inline)?;
    Ok(chunk)
}

/// `get_current()`: the last yielded element; invalid before the first
/// successful `move_next`.
fn get_current_body<R: TypeSystem>(registry: &R, lowering: &Lowering, inline: bool) -> Result<BytecodeChunk> {
    let invalid_state = registry
        .constructors(primitives::INVALID_STATE)
        .into_iter()
        .find(|c| c.params.is_empty())
        .map(|c| c.id)
        .ok_or(GenError::UnknownType(primitives::INVALID_STATE))?;

    let mut chunk = BytecodeChunk::new();
    let started = chunk.define_label();
    let not_started = Node::Apply {
        operands: vec![
            Node::load_field(Node::LoadThis, lowering.state_field),
            Node::Const(Value::Int32(0)),
        ],
        ops: &[OpCode::Ceq],
    };
    let nodes = [
        Node::BranchIf {
            cond: Box::new(not_started),
            label: started,
            when: false,
        },
        Node::Throw(Box::new(Node::New {
            ctor: invalid_state,
            args: Vec::new(),
        })),
        Node::Mark(started),
        Node::Return(Some(Box::new(Node::load_field(Node::LoadThis, lowering.current_field)))),
    ];
    compile(&mut chunk, &nodes, inline)?;
    Ok(chunk)
}
