use super::{opcode::Named, Address, BranchOffset, Opcode, SymbolTable};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Largest program the compiler will emit, in instructions.
pub const PROGRAM_SIZE: usize = 4096;

/// ## Compiled program
///
/// A flat, append-only instruction sequence together with the symbols it
/// refers to. Once compiled it is never modified and may be run any
/// number of times.

#[derive(Debug, Clone, Default)]
pub struct Program {
    code: Vec<Opcode>,
    symbols: SymbolTable,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    pub fn with_symbols(symbols: SymbolTable) -> Program {
        Program {
            code: vec![],
            symbols,
        }
    }

    pub fn push(&mut self, op: Opcode) -> Address {
        self.code.push(op);
        self.code.len() - 1
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Address the next instruction will occupy.
    pub fn pc(&self) -> Address {
        self.code.len()
    }

    pub fn code(&self) -> &[Opcode] {
        &self.code
    }

    pub fn get(&self, addr: Address) -> Option<&Opcode> {
        self.code.get(addr)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Point the branch at `site` to `target`.
    pub fn patch(&mut self, site: Address, target: Address) -> Result<()> {
        let offset = target as BranchOffset - site as BranchOffset;
        match self.code.get_mut(site).map(|op| op.set_branch_offset(offset)) {
            Some(true) => Ok(()),
            _ => Err(error!(InternalError; "branch patch on non-branch")),
        }
    }

    /// Detach everything emitted from `start` on into a side buffer.
    /// Branches inside are relative so the buffer can be spliced back
    /// at any address.
    pub fn split_off(&mut self, start: Address) -> Vec<Opcode> {
        self.code.split_off(start)
    }

    pub fn splice(&mut self, mut code: Vec<Opcode>) {
        self.code.append(&mut code)
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (addr, op) in self.code.iter().enumerate() {
            writeln!(f, "{:4} {}", addr, Named(op, &self.symbols))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_forward_and_back() {
        let mut p = Program::new();
        let fwd = p.push(Opcode::BranchFalse(0));
        p.push(Opcode::Dup);
        p.push(Opcode::Dup);
        let back = p.push(Opcode::Branch(0));
        p.patch(fwd, p.pc()).unwrap();
        p.patch(back, fwd).unwrap();
        assert_eq!(p.code()[0], Opcode::BranchFalse(4));
        assert_eq!(p.code()[3], Opcode::Branch(-3));
        assert!(p.patch(1, 0).is_err());
        assert!(p.patch(99, 0).is_err());
    }

    #[test]
    fn test_side_buffer() {
        let mut p = Program::new();
        p.push(Opcode::Add);
        p.push(Opcode::Incr);
        let side = p.split_off(1);
        p.push(Opcode::Sub);
        p.splice(side);
        assert_eq!(p.code(), &[Opcode::Add, Opcode::Sub, Opcode::Incr]);
    }
}
