/*!
## Rust Machine Module

This Rust module is the instruction set, program container and stack
virtual machine that runs compiled macros.

*/

pub type Address = usize;
pub type SymbolId = usize;
pub type BranchOffset = isize;

mod array;
mod frame;
mod function;
mod opcode;
mod operation;
mod program;
mod runtime;
mod stack;
mod symbol;
mod val;

pub use array::{Array, KEY_SEPARATOR};
pub use frame::Frame;
pub use function::{Builtin, Function};
pub use opcode::{Named, Opcode};
pub use operation::Operation;
pub use program::{Program, PROGRAM_SIZE};
pub use runtime::{Event, Limits, Runtime};
pub use stack::Stack;
pub use symbol::{Literal, Symbol, SymbolKind, SymbolTable};
pub use val::{string_to_num, Val};

#[cfg(test)]
mod tests;
