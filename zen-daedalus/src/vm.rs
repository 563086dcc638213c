//! The stack-based bytecode interpreter.

use std::collections::HashMap;

use crate::error::{ExternalError, ExternalResult, VmException, VmResult};
use crate::instance::{Instance, InstanceRef};
use crate::opcode::{DataType, Opcode};
use crate::script::Script;

/// Maximum depth of the value stack, matching the original engine's fixed
/// allocation (`DaedalusVm::stack_size`).
pub const STACK_SIZE: usize = 2048;

/// Compatibility toggles for badly-behaved scripts, corresponding to
/// `DaedalusVmExecutionFlag`. Not global state: each [`Vm`] owns its
/// own copy, set at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmConfig {
    /// Tolerate member access with no instance bound rather than raising.
    pub allow_null_instance_access: bool,
    /// Allow writes to `const`-flagged symbols rather than raising.
    pub ignore_const_specifier: bool,
}

/// What a registered exception handler decides to do after a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionStrategy {
    /// Resume execution at the next instruction.
    Continue,
    /// Unwind the current function as if it had hit `RSR`.
    Return,
    /// Propagate the exception to the caller of `exec`/`call_function`.
    Fail,
}

/// One entry of the value stack. Tagged rather than a raw 4-byte union, so a
/// type-mismatched pop raises [`VmException::StackTypeMismatch`] instead of
/// silently reinterpreting bits (the original reinterprets an int's bit
/// pattern as a float in `pop_float`; see the "VM float/int stack
/// reinterpret" design note).
#[derive(Debug, Clone)]
enum StackValue {
    Int(i32),
    Float(f32),
    Reference {
        symbol: u32,
        index: u8,
        context: Option<InstanceRef>,
    },
    Instance(Option<InstanceRef>),
}

/// What happened to the program counter after executing one instruction.
enum Flow {
    /// Advance by the instruction's size.
    Advance,
    /// The instruction already repositioned the counter (`B`, `BZ` taken).
    Jumped,
    /// `RSR` — stop executing the current function.
    Halt,
}

struct CallFrame {
    function: u32,
    program_counter: u32,
    context: Option<InstanceRef>,
}

type ExternalFn = Box<dyn FnMut(&mut Vm) -> VmResult<()>>;
type DefaultExternalFn = Box<dyn FnMut(&mut Vm, u32) -> VmResult<()>>;
type AccessTrapFn = Box<dyn FnMut(&mut Vm, u32)>;
type ExceptionHandlerFn = Box<dyn FnMut(&mut Vm, &VmException, &crate::opcode::Instruction) -> ExceptionStrategy>;

/// Owns a [`Script`] plus all mutable execution state: the value stack, the
/// call stack, the current `self`-like instance, and every registered
/// callback. `Vm` is `!Sync` — it is meant to be driven exclusively by one
/// caller during execution.
pub struct Vm {
    script: Script,
    config: VmConfig,
    stack: Vec<StackValue>,
    call_stack: Vec<CallFrame>,
    pc: u32,
    current_instance: Option<InstanceRef>,
    temporary_strings: u32,
    externals: HashMap<u32, ExternalFn>,
    function_overrides: HashMap<u32, ExternalFn>,
    default_external: Option<DefaultExternalFn>,
    access_trap: Option<AccessTrapFn>,
    exception_handler: Option<ExceptionHandlerFn>,
}

impl Vm {
    /// Wraps `script` in a running VM, per `DaedalusVm`'s constructor: a
    /// synthetic string-literal symbol is appended immediately.
    pub fn new(mut script: Script, config: VmConfig) -> Self {
        let temporary_strings = script.add_temporary_strings_symbol();
        Self {
            script,
            config,
            stack: Vec::with_capacity(STACK_SIZE),
            call_stack: Vec::new(),
            pc: 0,
            current_instance: None,
            temporary_strings,
            externals: HashMap::new(),
            function_overrides: HashMap::new(),
            default_external: None,
            access_trap: None,
            exception_handler: None,
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn current_instance(&self) -> Option<&InstanceRef> {
        self.current_instance.as_ref()
    }

    pub fn set_current_instance(&mut self, instance: Option<InstanceRef>) {
        self.current_instance = instance;
    }

    fn push_value(&mut self, value: StackValue) -> VmResult<()> {
        if self.stack.len() == STACK_SIZE {
            return Err(VmException::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn push_int(&mut self, value: i32) -> VmResult<()> {
        self.push_value(StackValue::Int(value))
    }

    pub fn push_float(&mut self, value: f32) -> VmResult<()> {
        self.push_value(StackValue::Float(value))
    }

    pub fn push_instance(&mut self, value: Option<InstanceRef>) -> VmResult<()> {
        self.push_value(StackValue::Instance(value))
    }

    pub fn push_reference(&mut self, symbol: u32, index: u8) -> VmResult<()> {
        let context = self.current_instance.clone();
        self.push_value(StackValue::Reference { symbol, index, context })
    }

    pub fn push_string(&mut self, value: &str) -> VmResult<()> {
        // The temporary-strings symbol is never a member, so the bindings
        // table is never actually consulted here; an empty one sidesteps
        // borrowing `self.script` both mutably (for the symbol) and
        // immutably (for `self.script.bindings`) at once.
        let no_bindings = crate::symbol::MemberBindings::default();
        self.script
            .find_symbol_by_index_mut(self.temporary_strings)
            .expect("temporary strings symbol always exists")
            .set_string(0, value, None, &no_bindings)?;
        self.push_reference(self.temporary_strings, 0)
    }

    /// Tolerates an empty stack by returning `0`, matching the original's
    /// compatibility behavior for badly-compiled scripts that over-pop.
    pub fn pop_int(&mut self) -> VmResult<i32> {
        let Some(value) = self.stack.pop() else {
            return Ok(0);
        };
        match value {
            StackValue::Int(v) => Ok(v),
            StackValue::Reference { symbol, index, context } => self.get_int(symbol, index, context.as_ref()),
            other => Err(VmException::StackTypeMismatch {
                wanted: "int",
                found: stack_value_kind(&other),
            }),
        }
    }

    /// Tolerates an empty stack by returning `0.0`, matching `pop_int`.
    pub fn pop_float(&mut self) -> VmResult<f32> {
        let Some(value) = self.stack.pop() else {
            return Ok(0.0);
        };
        match value {
            StackValue::Float(v) => Ok(v),
            StackValue::Reference { symbol, index, context } => self.get_float(symbol, index, context.as_ref()),
            other => Err(VmException::StackTypeMismatch {
                wanted: "float",
                found: stack_value_kind(&other),
            }),
        }
    }

    pub fn pop_reference(&mut self) -> VmResult<(u32, u8, Option<InstanceRef>)> {
        match self.stack.pop() {
            None => Err(VmException::StackUnderflow),
            Some(StackValue::Reference { symbol, index, context }) => Ok((symbol, index, context)),
            Some(other) => Err(VmException::StackTypeMismatch {
                wanted: "reference",
                found: stack_value_kind(&other),
            }),
        }
    }

    pub fn pop_instance(&mut self) -> VmResult<Option<InstanceRef>> {
        match self.stack.pop() {
            None => Err(VmException::StackUnderflow),
            Some(StackValue::Instance(v)) => Ok(v),
            Some(StackValue::Reference { symbol, .. }) => Ok(self
                .script
                .find_symbol_by_index(symbol)
                .ok_or(VmException::NoSymbolForIndex(symbol))?
                .get_instance()?),
            Some(other) => Err(VmException::StackTypeMismatch {
                wanted: "instance",
                found: stack_value_kind(&other),
            }),
        }
    }

    /// A member access with no bound instance either raises or, under
    /// `allow_null_instance_access`, logs and returns a tolerant default.
    pub fn pop_string(&mut self) -> VmResult<String> {
        let (symbol, index, context) = self.pop_reference()?;
        let sym = self
            .script
            .find_symbol_by_index(symbol)
            .ok_or(VmException::NoSymbolForIndex(symbol))?;

        if sym.is_member() && context.is_none() {
            if !self.config.allow_null_instance_access {
                return Err(VmException::CannotInitInstance {
                    name: sym.name.clone(),
                    reason: "no context instance set".to_string(),
                });
            }
            tracing::warn!(member = %sym.name, "accessing member without an instance set");
            return Ok(String::new());
        }

        let bound = context.map(|c| c.borrow());
        Ok(sym.get_string(u16::from(index), bound.as_deref(), &self.script.bindings)?)
    }

    fn get_int(&self, symbol: u32, index: u8, context: Option<&InstanceRef>) -> VmResult<i32> {
        let sym = self
            .script
            .find_symbol_by_index(symbol)
            .ok_or(VmException::NoSymbolForIndex(symbol))?;
        if sym.is_member() && context.is_none() {
            if !self.config.allow_null_instance_access {
                return Err(VmException::Symbol(crate::error::SymbolError::NoContext(sym.name.clone())));
            }
            tracing::warn!(member = %sym.name, "accessing member without an instance set");
            return Ok(0);
        }
        let bound = context.map(|c| c.borrow());
        Ok(sym.get_int(u16::from(index), bound.as_deref(), &self.script.bindings)?)
    }

    fn get_float(&self, symbol: u32, index: u8, context: Option<&InstanceRef>) -> VmResult<f32> {
        let sym = self
            .script
            .find_symbol_by_index(symbol)
            .ok_or(VmException::NoSymbolForIndex(symbol))?;
        if sym.is_member() && context.is_none() {
            if !self.config.allow_null_instance_access {
                return Err(VmException::Symbol(crate::error::SymbolError::NoContext(sym.name.clone())));
            }
            tracing::warn!(member = %sym.name, "accessing member without an instance set");
            return Ok(0.0);
        }
        let bound = context.map(|c| c.borrow());
        Ok(sym.get_float(u16::from(index), bound.as_deref(), &self.script.bindings)?)
    }

    /// Writes through a popped reference, honoring `ignore_const_specifier`
    /// and `allow_null_instance_access` exactly as the opcode handlers for
    /// `MOVI`/`MOVF`/`MOVS`/`ADDMOVI`&co. do.
    fn set_int(&mut self, symbol: u32, index: u8, context: Option<InstanceRef>, value: i32) -> VmResult<()> {
        let name = {
            let sym = self
                .script
                .find_symbol_by_index(symbol)
                .ok_or(VmException::NoSymbolForIndex(symbol))?;
            if sym.is_const() && !self.config.ignore_const_specifier {
                return Err(VmException::Symbol(crate::error::SymbolError::IllegalConstAccess(sym.name.clone())));
            }
            sym.name.clone()
        };

        if context.is_none() && self.script.find_symbol_by_index(symbol).is_some_and(|s| s.is_member()) {
            if !self.config.allow_null_instance_access {
                return Err(VmException::Symbol(crate::error::SymbolError::NoContext(name)));
            }
            tracing::warn!(member = %name, "accessing member without an instance set");
            return Ok(());
        }

        let mut bound = context.as_ref().map(|c| c.borrow_mut());
        let sym = self
            .script
            .symbols
            .get_mut(symbol as usize)
            .ok_or(VmException::NoSymbolForIndex(symbol))?;
        sym.set_int(u16::from(index), value, bound.as_deref_mut(), &self.script.bindings)?;
        Ok(())
    }

    fn set_float(&mut self, symbol: u32, index: u8, context: Option<InstanceRef>, value: f32) -> VmResult<()> {
        let name = {
            let sym = self
                .script
                .find_symbol_by_index(symbol)
                .ok_or(VmException::NoSymbolForIndex(symbol))?;
            if sym.is_const() && !self.config.ignore_const_specifier {
                return Err(VmException::Symbol(crate::error::SymbolError::IllegalConstAccess(sym.name.clone())));
            }
            sym.name.clone()
        };

        if context.is_none() && self.script.find_symbol_by_index(symbol).is_some_and(|s| s.is_member()) {
            if !self.config.allow_null_instance_access {
                return Err(VmException::Symbol(crate::error::SymbolError::NoContext(name)));
            }
            tracing::warn!(member = %name, "accessing member without an instance set");
            return Ok(());
        }

        let mut bound = context.as_ref().map(|c| c.borrow_mut());
        let sym = self
            .script
            .symbols
            .get_mut(symbol as usize)
            .ok_or(VmException::NoSymbolForIndex(symbol))?;
        sym.set_float(u16::from(index), value, bound.as_deref_mut(), &self.script.bindings)?;
        Ok(())
    }

    fn set_string(&mut self, symbol: u32, index: u8, context: Option<InstanceRef>, value: &str) -> VmResult<()> {
        let name = {
            let sym = self
                .script
                .find_symbol_by_index(symbol)
                .ok_or(VmException::NoSymbolForIndex(symbol))?;
            if sym.is_const() && !self.config.ignore_const_specifier {
                return Err(VmException::Symbol(crate::error::SymbolError::IllegalConstAccess(sym.name.clone())));
            }
            sym.name.clone()
        };

        if context.is_none() && self.script.find_symbol_by_index(symbol).is_some_and(|s| s.is_member()) {
            if !self.config.allow_null_instance_access {
                return Err(VmException::Symbol(crate::error::SymbolError::NoContext(name)));
            }
            tracing::warn!(member = %name, "accessing member without an instance set");
            return Ok(());
        }

        let mut bound = context.as_ref().map(|c| c.borrow_mut());
        let sym = self
            .script
            .symbols
            .get_mut(symbol as usize)
            .ok_or(VmException::NoSymbolForIndex(symbol))?;
        sym.set_string(u16::from(index), value, bound.as_deref_mut(), &self.script.bindings)?;
        Ok(())
    }

    /// Compound-assign helper shared by `ADDMOVI`/`SUBMOVI`/`MULMOVI`/`DIVMOVI`:
    /// reads through the reference with `get_int`, combines with `op`, writes
    /// back with `set_int` — both steps honoring the const/null-instance
    /// compatibility flags exactly once each.
    fn compound_assign_int(&mut self, op: impl FnOnce(i32, i32) -> VmResult<i32>) -> VmResult<()> {
        let (symbol, index, context) = self.pop_reference()?;
        let value = self.pop_int()?;

        let sym = self
            .script
            .find_symbol_by_index(symbol)
            .ok_or(VmException::NoSymbolForIndex(symbol))?;
        if sym.is_const() && !self.config.ignore_const_specifier {
            return Err(VmException::Symbol(crate::error::SymbolError::IllegalConstAccess(sym.name.clone())));
        }
        let is_member = sym.is_member();

        if is_member && context.is_none() && !self.config.allow_null_instance_access {
            return Err(VmException::Symbol(crate::error::SymbolError::NoContext(sym.name.clone())));
        }
        if is_member && context.is_none() {
            tracing::warn!(member = %sym.name, "accessing member without an instance set");
            return Ok(());
        }

        let current = self.get_int(symbol, index, context.as_ref())?;
        let result = op(current, value)?;
        self.set_int(symbol, index, context, result)
    }

    pub fn jump(&mut self, address: u32) -> VmResult<()> {
        if address > self.script.size() {
            return Err(VmException::IllegalJump(address));
        }
        self.pc = address;
        Ok(())
    }

    fn push_call(&mut self, function: u32) {
        self.call_stack.push(CallFrame {
            function,
            program_counter: self.pc,
            context: self.current_instance.clone(),
        });
    }

    fn pop_call(&mut self) -> VmResult<()> {
        let frame = self.call_stack.pop().ok_or(VmException::StackUnderflow)?;
        self.pc = frame.program_counter;
        self.current_instance = frame.context;
        Ok(())
    }

    /// Calls `sym` (a `FUNCTION` symbol) and runs until it returns.
    pub fn call(&mut self, symbol: u32) -> VmResult<()> {
        self.push_call(symbol);
        let address = self
            .script
            .find_symbol_by_index(symbol)
            .ok_or(VmException::NoSymbolForIndex(symbol))?
            .address as u32;
        self.jump(address)?;
        while self.step()? {}
        self.pop_call()
    }

    /// Runs `instance`'s class initializer (the script function at the
    /// instance symbol's address), with `self`/`SELF` bound to it for the
    /// duration of the call, then restores the previous binding.
    pub fn init_instance(&mut self, instance: InstanceRef, symbol: u32) -> VmResult<()> {
        let old_instance = self.current_instance.take();
        self.current_instance = Some(instance);

        let self_sym_index = self.script.find_symbol_by_name("SELF").map(|s| s.index);
        let old_self = self_sym_index.and_then(|i| self.script.find_symbol_by_index(i).and_then(|s| s.get_instance().ok().flatten()));
        if let Some(i) = self_sym_index {
            if let Some(sym) = self.script.find_symbol_by_index_mut(i) {
                sym.set_instance(self.current_instance.clone())?;
            }
        }

        let result = self.call(symbol);

        self.current_instance = old_instance;
        if let Some(i) = self_sym_index {
            if let Some(sym) = self.script.find_symbol_by_index_mut(i) {
                sym.set_instance(old_self)?;
            }
        }
        result
    }

    /// Registers a native callback for an `EXTERN`-declared function,
    /// checking its declared parameter/return types against the symbol
    /// table.
    pub fn register_external(
        &mut self,
        name: &str,
        params: &[DataType],
        return_type: DataType,
        callback: impl FnMut(&mut Vm) -> VmResult<()> + 'static,
    ) -> ExternalResult<()> {
        let sym = self
            .script
            .find_symbol_by_name(name)
            .ok_or_else(|| ExternalError::NotExternal(name.to_string()))?;
        if !sym.is_external() {
            return Err(ExternalError::NotExternal(name.to_string()));
        }
        let index = sym.index;
        let declared_params = self.script.find_parameters_for_function(sym);
        if declared_params.len() != params.len() {
            return Err(ExternalError::ArityMismatch {
                name: name.to_string(),
                declared: params.len(),
                expected: declared_params.len(),
            });
        }
        for (i, (declared, given)) in declared_params.iter().zip(params.iter()).enumerate() {
            if declared.ty != *given {
                return Err(ExternalError::IllegalParameter {
                    name: name.to_string(),
                    given: given.name(),
                    index: i,
                    expected: declared.ty,
                });
            }
        }
        if sym.has_return() && sym.return_type != return_type {
            return Err(ExternalError::IllegalReturnType {
                name: name.to_string(),
                given: return_type.name(),
                expected: sym.return_type,
            });
        }

        self.externals.insert(index, Box::new(callback));
        Ok(())
    }

    /// Overrides an already-compiled function: every `BL` call to its
    /// address invokes `callback` instead of executing the function body.
    pub fn override_function(
        &mut self,
        name: &str,
        callback: impl FnMut(&mut Vm) -> VmResult<()> + 'static,
    ) -> ExternalResult<()> {
        let sym = self
            .script
            .find_symbol_by_name(name)
            .ok_or_else(|| ExternalError::NotExternal(name.to_string()))?;
        if sym.is_external() {
            return Err(ExternalError::AlreadyExternal(name.to_string()));
        }
        self.function_overrides.insert(sym.address as u32, Box::new(callback));
        Ok(())
    }

    pub fn register_default_external(&mut self, callback: impl FnMut(&mut Vm, u32) -> VmResult<()> + 'static) {
        self.default_external = Some(Box::new(callback));
    }

    pub fn register_access_trap(&mut self, callback: impl FnMut(&mut Vm, u32) + 'static) {
        self.access_trap = Some(Box::new(callback));
    }

    pub fn register_exception_handler(
        &mut self,
        callback: impl FnMut(&mut Vm, &VmException, &crate::opcode::Instruction) -> ExceptionStrategy + 'static,
    ) {
        self.exception_handler = Some(Box::new(callback));
    }

    /// Executes one instruction. Returns `Ok(false)` once an `RSR` (or a
    /// handled exception with [`ExceptionStrategy::Return`]) is reached.
    fn step(&mut self) -> VmResult<bool> {
        let instr = self.script.instruction_at(self.pc)?;
        tracing::trace!(pc = self.pc, op = ?instr.op, "executing instruction");

        let result = self.exec_one(&instr);

        match result {
            Ok(Flow::Advance) => {
                self.pc += instr.size;
                Ok(true)
            }
            Ok(Flow::Jumped) => Ok(true),
            Ok(Flow::Halt) => Ok(false),
            Err(err) => self.handle_exception(err, &instr),
        }
    }

    fn handle_exception(&mut self, err: VmException, instr: &crate::opcode::Instruction) -> VmResult<bool> {
        let Some(mut handler) = self.exception_handler.take() else {
            tracing::error!(error = %err, "error while executing script");
            return Err(err);
        };
        let strategy = handler(self, &err, instr);
        self.exception_handler = Some(handler);

        match strategy {
            ExceptionStrategy::Fail => {
                tracing::error!(error = %err, "error while executing script");
                Err(err)
            }
            ExceptionStrategy::Return => Ok(false),
            ExceptionStrategy::Continue => {
                self.pc += instr.size;
                Ok(true)
            }
        }
    }

    /// Executes one already-decoded instruction, leaving the program
    /// counter untouched (the caller advances it) except when it jumps,
    /// in which case the counter is already at its final position.
    fn exec_one(&mut self, instr: &crate::opcode::Instruction) -> VmResult<Flow> {
        match instr.op {
            Opcode::Add => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(a.wrapping_add(b))?;
            }
            Opcode::Sub => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(a.wrapping_sub(b))?;
            }
            Opcode::Mul => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(a.wrapping_mul(b))?;
            }
            Opcode::Div => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                if b == 0 {
                    return Err(VmException::DivisionByZero);
                }
                self.push_int(a / b)?;
            }
            Opcode::Mod => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                if b == 0 {
                    return Err(VmException::DivisionByZero);
                }
                self.push_int(a % b)?;
            }
            Opcode::Or => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(a | b)?;
            }
            Opcode::Andb => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(a & b)?;
            }
            Opcode::Lt => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a < b))?;
            }
            Opcode::Gt => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a > b))?;
            }
            Opcode::Lsl => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(((a as u32) << (b as u32 & 0x1F)) as i32)?;
            }
            Opcode::Lsr => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(((a as u32) >> (b as u32 & 0x1F)) as i32)?;
            }
            Opcode::Lte => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a <= b))?;
            }
            Opcode::Eq => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a == b))?;
            }
            Opcode::Neq => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a != b))?;
            }
            Opcode::Gte => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a >= b))?;
            }
            Opcode::Plus => {
                let a = self.pop_int()?;
                self.push_int(a)?;
            }
            Opcode::Negate => {
                let a = self.pop_int()?;
                self.push_int(-a)?;
            }
            Opcode::Not => {
                let a = self.pop_int()?;
                self.push_int(i32::from(a == 0))?;
            }
            Opcode::Cmpl => {
                let a = self.pop_int()?;
                self.push_int(!a)?;
            }
            Opcode::Orr => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a != 0 || b != 0))?;
            }
            Opcode::And => {
                let (a, b) = (self.pop_int()?, self.pop_int()?);
                self.push_int(i32::from(a != 0 && b != 0))?;
            }
            Opcode::Nop => {}
            Opcode::Rsr => return Ok(Flow::Halt),
            Opcode::Bl => {
                if let Some(mut cb) = self.function_overrides.remove(&instr.address) {
                    let sym = self.script.find_symbol_by_address(instr.address).cloned();
                    let result = cb(self);
                    self.function_overrides.insert(instr.address, cb);
                    // On failure, push a safe default so the value stack
                    // stays balanced for whatever resumes after the fault
                    // (mirrors `StackGuard`, which only fires on unwind).
                    if result.is_err() {
                        if let Some(sym) = &sym {
                            self.guard_return(sym)?;
                        }
                    }
                    result?;
                } else {
                    let symbol = self
                        .script
                        .find_symbol_by_address(instr.address)
                        .ok_or(VmException::NoSymbolForAddress(instr.address))?
                        .index;
                    self.call(symbol)?;
                }
            }
            Opcode::Be => {
                let sym = self
                    .script
                    .find_symbol_by_index(instr.symbol)
                    .ok_or(VmException::NoSymbolForIndex(instr.symbol))?
                    .clone();

                if let Some(mut cb) = self.externals.remove(&sym.index) {
                    self.push_call(sym.index);
                    let result = cb(self);
                    self.externals.insert(sym.index, cb);
                    self.pop_call()?;
                    if result.is_err() {
                        self.guard_return(&sym)?;
                    }
                    result?;
                } else if let Some(mut cb) = self.default_external.take() {
                    let result = cb(self, sym.index);
                    self.default_external = Some(cb);
                    if result.is_err() {
                        self.guard_return(&sym)?;
                    }
                    result?;
                } else {
                    return Err(VmException::UnregisteredExternal(sym.name.clone()));
                }
            }
            Opcode::Pushi => self.push_int(instr.immediate)?,
            Opcode::Pushv | Opcode::Pushvi => {
                let sym = self
                    .script
                    .find_symbol_by_index(instr.symbol)
                    .ok_or(VmException::NoSymbolForIndex(instr.symbol))?;
                if sym.has_access_trap() {
                    if let Some(mut trap) = self.access_trap.take() {
                        let index = sym.index;
                        trap(self, index);
                        self.access_trap = Some(trap);
                    } else {
                        self.push_reference(instr.symbol, 0)?;
                    }
                } else {
                    self.push_reference(instr.symbol, 0)?;
                }
            }
            Opcode::Movi => {
                let (symbol, index, context) = self.pop_reference()?;
                let value = self.pop_int()?;
                self.set_int(symbol, index, context, value)?;
            }
            Opcode::Movf => {
                let (symbol, index, context) = self.pop_reference()?;
                let value = self.pop_float()?;
                self.set_float(symbol, index, context, value)?;
            }
            Opcode::Movvf => {
                let (symbol, index, context) = self.pop_reference()?;
                let value = self.pop_int()?;
                self.set_int(symbol, index, context, value)?;
            }
            Opcode::Movs => {
                let (symbol, index, context) = self.pop_reference()?;
                let value = self.pop_string()?;
                self.set_string(symbol, index, context, &value)?;
            }
            Opcode::Movss => return Err(VmException::NotImplemented("movss")),
            Opcode::Addmovi => self.compound_assign_int(|a, b| Ok(a.wrapping_add(b)))?,
            Opcode::Submovi => self.compound_assign_int(|a, b| Ok(a.wrapping_sub(b)))?,
            Opcode::Mulmovi => self.compound_assign_int(|a, b| Ok(a.wrapping_mul(b)))?,
            Opcode::Divmovi => self.compound_assign_int(|a, b| {
                if b == 0 {
                    Err(VmException::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            })?,
            Opcode::Movvi => {
                let (symbol, _, _) = self.pop_reference()?;
                let value = self.pop_instance()?;
                self.script
                    .find_symbol_by_index_mut(symbol)
                    .ok_or(VmException::NoSymbolForIndex(symbol))?
                    .set_instance(value)?;
            }
            Opcode::B => {
                self.jump(instr.address)?;
                return Ok(Flow::Jumped);
            }
            Opcode::Bz => {
                if self.pop_int()? == 0 {
                    self.jump(instr.address)?;
                    return Ok(Flow::Jumped);
                }
            }
            Opcode::Gmovi => {
                let sym = self
                    .script
                    .find_symbol_by_index(instr.symbol)
                    .ok_or(VmException::NoSymbolForIndex(instr.symbol))?;
                self.current_instance = sym.get_instance()?;
            }
            Opcode::Pushvv => {
                self.script
                    .find_symbol_by_index(instr.symbol)
                    .ok_or(VmException::NoSymbolForIndex(instr.symbol))?;
                self.push_reference(instr.symbol, instr.index)?;
            }
            Opcode::Unknown(b) => {
                tracing::warn!(opcode = b, "skipping unknown opcode");
            }
        }
        Ok(Flow::Advance)
    }

    /// Pushes a safe default return value for `sym` if the preceding
    /// external-override callback left the stack short, mirroring
    /// `StackGuard`'s role for `BL`-overridden calls.
    fn guard_return(&mut self, sym: &crate::symbol::Symbol) -> VmResult<()> {
        if !sym.has_return() {
            return Ok(());
        }
        match sym.return_type {
            DataType::Float => self.push_float(0.0),
            DataType::Int | DataType::Function => self.push_int(0),
            DataType::String => self.push_string(""),
            DataType::Instance => self.push_instance(None),
            _ => Ok(()),
        }
    }
}

fn stack_value_kind(value: &StackValue) -> &'static str {
    match value {
        StackValue::Int(_) => "int",
        StackValue::Float(_) => "float",
        StackValue::Reference { .. } => "reference",
        StackValue::Instance(_) => "instance",
    }
}
