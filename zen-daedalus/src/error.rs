//! Error taxonomy for the Daedalus loader, symbol table and VM.
//!
//! Split into three enums rather than one, mirroring how the three kinds of
//! failure are actually handled by callers: a [`SymbolError`] is a value-
//! access mistake the caller can often recover from (wrong type, stale
//! index), a [`VmException`] is a runtime fault that is routed through the
//! VM's registered exception handler, and an [`ExternalError`] only ever
//! happens once, at `register_external` time, while wiring up native
//! callbacks.

use thiserror::Error;

use crate::opcode::DataType;

/// Failure accessing a [`crate::symbol::Symbol`]'s value.
#[derive(Error, Debug, Clone)]
pub enum SymbolError {
    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("cannot register member {name}: {reason}")]
    MemberRegistration { name: String, reason: String },

    #[error("cannot register member {name}: wrong datatype: provided '{given}' expected {expected:?}")]
    InvalidRegistrationDataType {
        name: String,
        given: &'static str,
        expected: DataType,
    },

    #[error("illegal access of type {expected:?} on symbol {name} which is of type {found:?}")]
    IllegalTypeAccess {
        name: String,
        expected: DataType,
        found: DataType,
    },

    #[error("illegal access of out-of-bounds index {index} while reading {name} (count {count})")]
    IllegalIndexAccess {
        name: String,
        index: u16,
        count: u32,
    },

    #[error("illegal mutable access of const symbol {0}")]
    IllegalConstAccess(String),

    #[error("illegal access of member {name} which does not belong to the context's class ({parent} != {expected_parent})")]
    IllegalInstanceAccess {
        name: String,
        parent: u32,
        expected_parent: u32,
    },

    #[error("illegal access of unbound member {0}")]
    UnboundMemberAccess(String),

    #[error("illegal access of member {0} without a context set")]
    NoContext(String),

    #[error("cannot access member {name} on a context instance of a different type than it is registered to")]
    IllegalContextType { name: String },

    #[error("I/O error loading script: {0}")]
    Io(#[from] zen_stream::Error),
}

/// Runtime fault raised while executing bytecode.
#[derive(Error, Debug, Clone)]
pub enum VmException {
    #[error("symbol error: {0}")]
    Symbol(#[from] SymbolError),

    #[error("vm: division by zero")]
    DivisionByZero,

    #[error("vm: stack overflow")]
    StackOverflow,

    #[error("vm: popping from empty stack")]
    StackUnderflow,

    #[error("vm: tried to pop a {wanted} but the top of the stack holds a {found}")]
    StackTypeMismatch {
        wanted: &'static str,
        found: &'static str,
    },

    #[error("vm: cannot jump to {0:#x}: address out of range")]
    IllegalJump(u32),

    #[error("vm: no symbol found for address {0:#x}")]
    NoSymbolForAddress(u32),

    #[error("vm: no symbol found for index {0}")]
    NoSymbolForIndex(u32),

    #[error("vm: no external registered for {0}")]
    UnregisteredExternal(String),

    #[error("vm: cannot initialize {name}: {reason}")]
    CannotInitInstance { name: String, reason: String },

    #[error("vm: movss is not implemented")]
    NotImplemented(&'static str),
}

/// Failure registering a native callback as a Daedalus external.
#[derive(Error, Debug, Clone)]
pub enum ExternalError {
    #[error("external {name} has illegal return type '{given}', expected '{expected:?}'")]
    IllegalReturnType {
        name: String,
        given: &'static str,
        expected: DataType,
    },

    #[error("external {name} has illegal parameter type '{given}' (no. {index}), expected '{expected:?}'")]
    IllegalParameter {
        name: String,
        given: &'static str,
        index: usize,
        expected: DataType,
    },

    #[error("external {name} declares {declared} parameter(s), script expects {expected}")]
    ArityMismatch {
        name: String,
        declared: usize,
        expected: usize,
    },

    #[error("symbol {0} is not declared external")]
    NotExternal(String),

    #[error("symbol {0} is already external and cannot be overridden")]
    AlreadyExternal(String),
}

pub type SymbolResult<T> = std::result::Result<T, SymbolError>;
pub type VmResult<T> = std::result::Result<T, VmException>;
pub type ExternalResult<T> = std::result::Result<T, ExternalError>;
