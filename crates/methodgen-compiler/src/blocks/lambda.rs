//! Lambda bodies.
//!
//! A lambda is authored inline, in its own frame, and becomes the `invoke`
//! method of a generated closure shell. The shell instance lives in a local
//! of the enclosing body; capture fields are filled right after it is
//! constructed, at the point the lambda ends.

use tracing::debug;

use methodgen_core::{GenError, MethodFlags, ParamEntry, Result, TypeHash, TypeSystem, primitives};

use crate::closure::ClosureRecord;
use crate::emit::Emitter;
use crate::generator::MethodGenerator;
use crate::node::Node;
use crate::sequencer::ListId;
use crate::symbol::{FrameId, Symbol};

/// An open (or ended) lambda.
///
/// Arguments of the lambda are read with
/// [`MethodGenerator::argument`] while it is open. Once ended it can be
/// converted to any delegate type with a matching signature.
#[derive(Debug)]
pub struct LambdaBlock {
    level: usize,
    frame: FrameId,
    outer: ListId,
    closure: usize,
    shell: TypeHash,
    instance: Symbol,
    invoke: TypeHash,
    params: Vec<TypeHash>,
    return_type: TypeHash,
    ended: bool,
}

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    /// Open a lambda taking `params` and returning `return_type`.
    pub fn begin_lambda(&mut self, return_type: TypeHash, params: &[TypeHash]) -> Result<LambdaBlock> {
        let level = self.enter_block()?;

        let owner_name = self.registry.type_name(self.owner);
        let name = self.config.closure_name(&owner_name, self.closure_count);
        self.closure_count += 1;
        let shell = self.registry.define_shell(&name, None, &[])?;
        self.registry.define_default_constructor(shell)?;
        let param_entries = params
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamEntry::new(format!("arg{i}"), *ty))
            .collect();
        let invoke_name = self.config.invoke_method_name.clone();
        let invoke = self
            .registry
            .define_method(shell, &invoke_name, param_entries, return_type, MethodFlags::empty())?;
        let (slot, instance) = self.declare_local_slot(shell)?;

        let depth = self.depth();
        let parent = self.frame().closure;
        self.closures.push(ClosureRecord::new(depth, shell, slot, parent));
        let closure = self.closures.len() - 1;
        self.shells.push(shell);

        let body = self.sequencer.new_list();
        let outer = self.sequencer.switch_to(body);
        let frame = self.new_frame(invoke, Some(shell), params.to_vec(), return_type, body, Some(closure));
        let frame_id = frame.id;
        self.frames.push(frame);

        debug!(shell = %name, depth, "begin lambda");
        Ok(LambdaBlock {
            level,
            frame: frame_id,
            outer,
            closure,
            shell,
            instance,
            invoke,
            params: params.to_vec(),
            return_type,
            ended: false,
        })
    }
}

impl LambdaBlock {
    /// The generated closure shell.
    pub fn shell(&self) -> TypeHash {
        self.shell
    }

    /// The generated `invoke` method.
    pub fn invoke_method(&self) -> TypeHash {
        self.invoke
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Close the lambda body.
    ///
    /// Writes the `invoke` body and, in the enclosing body, constructs the
    /// closure instance and copies every captured value into it.
    pub fn end<R: TypeSystem>(&mut self, g: &mut MethodGenerator<'_, R>) -> Result<()> {
        if self.ended {
            return Err(GenError::discipline("lambda already ended"));
        }
        g.check_innermost(self.level, self.frame, "lambda")?;

        if self.return_type == primitives::VOID {
            g.sequencer.put(Node::Return(None));
        }
        let Some(mut frame) = g.frames.pop() else {
            return Err(GenError::discipline("lambda frame missing"));
        };
        g.sequencer.switch_to(self.outer);
        {
            let mut emitter = Emitter::new(&mut frame.chunk, g.config.inline_small_constants);
            g.sequencer.write(frame.root, &mut emitter)?;
        }
        frame.chunk.finish()?;
        g.deferred.push((frame.method, frame.chunk));

        let ctor = g
            .registry
            .constructors(self.shell)
            .first()
            .map(|m| m.id)
            .ok_or(GenError::UnknownType(self.shell))?;
        let record = &mut g.closures[self.closure];
        let mut nodes = vec![Node::StoreLocal(
            record.instance,
            Box::new(Node::New {
                ctor,
                args: Vec::new(),
            }),
        )];
        nodes.append(&mut record.init);
        g.sequencer.put(Node::Sequence(nodes));

        g.exit_block();
        self.ended = true;
        debug!(level = self.level, "end lambda");
        Ok(())
    }

    /// Convert the ended lambda to a delegate of type `ty`.
    ///
    /// May be called any number of times; each call binds the same closure
    /// instance.
    pub fn to_delegate<R: TypeSystem>(&self, g: &mut MethodGenerator<'_, R>, ty: TypeHash) -> Result<Symbol> {
        if !self.ended {
            return Err(GenError::LambdaStillOpen);
        }
        let invoke = g.registry.delegate_invoke(ty).ok_or_else(|| GenError::NotADelegate {
            ty: g.registry.type_name(ty),
        })?;
        if invoke.param_types() != self.params || invoke.return_type != self.return_type {
            return Err(GenError::type_mismatch(format!(
                "lambda signature does not match delegate '{}'",
                g.registry.type_name(ty)
            )));
        }
        let target = g.load(self.instance)?;
        Ok(g.expression(
            Node::NewDelegate {
                ty,
                target: Box::new(target),
                method: self.invoke,
            },
            ty,
            "delegate",
        ))
    }
}
