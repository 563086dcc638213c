//! Compiled Daedalus script module loader, symbol table and stack VM.
//!
//! A Daedalus module (`.DAT`) is a flat symbol table plus a bytecode blob.
//! [`Script::load`] parses both; [`Vm`] then executes the bytecode against
//! that symbol table, resolving member accesses through whichever of
//! [`InstanceData`]'s three flavors the target class was registered as.
//!
//! ```no_run
//! use zen_daedalus::{Script, Vm, VmConfig};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("GOTHIC.DAT")?;
//! let script = Script::load(&bytes)?;
//! let mut vm = Vm::new(script, VmConfig::default());
//! # let _ = &mut vm;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod instance;
pub mod opcode;
pub mod script;
pub mod symbol;
pub mod vm;

pub use error::{ExternalError, ExternalResult, SymbolError, SymbolResult, VmException, VmResult};
pub use instance::{
    bind_array, opaque_arena, Instance, InstanceData, InstanceRef, MemberBinding, OpaqueMarker,
    OpaqueValue, TransientInstance,
};
pub use opcode::{DataType, Instruction, Opcode};
pub use script::Script;
pub use symbol::{MemberBindings, Symbol, SymbolStorage};
pub use vm::{ExceptionStrategy, Vm, VmConfig, STACK_SIZE};
