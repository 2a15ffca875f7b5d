use super::{BranchOffset, SymbolId, SymbolKind, SymbolTable};

/// ## Virtual machine instruction set
///
/// The macro virtual machine has no registers.
/// Every operation is performed on the stack.
///
/// For example: `x = 3 * y` compiles to
/// `[PUSH_SYM(3), PUSH_SYM(y), MUL, ASSIGN(x)]`
///
/// Branch offsets are relative to the branch instruction itself.

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // *** Stack manipulation
    /// Push the value of a symbol. Errors if a variable is unset.
    PushSym(SymbolId),
    /// Duplicate the top of the stack.
    Dup,
    /// Pop the stack into a variable. Arrays are copied.
    Assign(SymbolId),

    // *** Expression operations
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Power,
    BitAnd,
    BitOr,
    Negate,
    Incr,
    Decr,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
    /// Combining step after a short-circuit guard.
    And,
    Or,
    Not,
    /// Pop an array then a key (or array of keys); push membership.
    InArray,
    Concat,

    // *** Arrays
    /// Push an array variable. With `true`, an unset variable becomes an
    /// empty array first.
    PushArraySym(SymbolId, bool),
    /// Pop N keys and an array, push the element. N=0 pushes the size.
    ArrayRef(usize),
    /// Pop a value, N keys and an array; store the element.
    ArrayAssign(usize),
    /// Pop N keys and an array; remove the element. N=0 empties the array.
    ArrayDelete(usize),
    /// Leave the array and N keys in place and push the current element.
    /// With `true`, the value on top is kept above the element.
    ArrayRefAssignSetup(bool, usize),
    /// Pop an array and start iterating it into the hidden symbol.
    BeginArrayIter(SymbolId),
    /// Bind the next key to the first symbol using the iterator in the
    /// second, or branch out when exhausted.
    ArrayIter(SymbolId, SymbolId, BranchOffset),

    // *** Branch control
    Branch(BranchOffset),
    /// Pop and branch if true.
    BranchTrue(BranchOffset),
    /// Pop and branch if false.
    BranchFalse(BranchOffset),
    /// Never branches. Stands in for an empty loop condition.
    BranchNever(BranchOffset),

    // *** Calls
    /// Call a subroutine by name with N arguments from the stack.
    SubrCall(SymbolId, usize),
    /// Follows a call whose value is used. Consumed by the call itself.
    FetchRetVal,
    Return,
    ReturnNoVal,
    /// Pop N and push argument N (1-based).
    PushArg,
    PushArgCount,
    PushArgArray,
}

impl Opcode {
    pub fn branch_offset(&self) -> Option<BranchOffset> {
        use Opcode::*;
        match self {
            Branch(o) | BranchTrue(o) | BranchFalse(o) | BranchNever(o) | ArrayIter(_, _, o) => {
                Some(*o)
            }
            _ => None,
        }
    }

    /// Resolve a branch placeholder. Returns false for non-branches.
    pub fn set_branch_offset(&mut self, offset: BranchOffset) -> bool {
        use Opcode::*;
        match self {
            Branch(o) | BranchTrue(o) | BranchFalse(o) | BranchNever(o) | ArrayIter(_, _, o) => {
                *o = offset;
                true
            }
            _ => false,
        }
    }

    fn write(
        &self,
        f: &mut std::fmt::Formatter,
        symbols: Option<&SymbolTable>,
    ) -> std::fmt::Result {
        use Opcode::*;
        let sym = |id: &SymbolId| -> String {
            match symbols.and_then(|t| t.get(*id)) {
                None => format!("#{}", id),
                Some(s) => match s.kind() {
                    SymbolKind::Const => s.value().to_string(),
                    SymbolKind::String => format!("{:?}", s.name()),
                    _ => s.name().to_string(),
                },
            }
        };
        match self {
            PushSym(s) => write!(f, "PUSH_SYM({})", sym(s)),
            Dup => write!(f, "DUP"),
            Assign(s) => write!(f, "ASSIGN({})", sym(s)),

            Add => write!(f, "ADD"),
            Sub => write!(f, "SUB"),
            Mul => write!(f, "MUL"),
            Div => write!(f, "DIV"),
            Mod => write!(f, "MOD"),
            Power => write!(f, "POWER"),
            BitAnd => write!(f, "BIT_AND"),
            BitOr => write!(f, "BIT_OR"),
            Negate => write!(f, "NEGATE"),
            Incr => write!(f, "INCR"),
            Decr => write!(f, "DECR"),
            Gt => write!(f, "GT"),
            Ge => write!(f, "GE"),
            Lt => write!(f, "LT"),
            Le => write!(f, "LE"),
            Eq => write!(f, "EQ"),
            Ne => write!(f, "NE"),
            And => write!(f, "AND"),
            Or => write!(f, "OR"),
            Not => write!(f, "NOT"),
            InArray => write!(f, "IN_ARRAY"),
            Concat => write!(f, "CONCAT"),

            PushArraySym(s, init) => write!(f, "PUSH_ARRAY_SYM({}, {})", sym(s), *init as u8),
            ArrayRef(n) => write!(f, "ARRAY_REF({})", n),
            ArrayAssign(n) => write!(f, "ARRAY_ASSIGN({})", n),
            ArrayDelete(n) => write!(f, "ARRAY_DELETE({})", n),
            ArrayRefAssignSetup(b, n) => {
                write!(f, "ARRAY_REF_ASSIGN_SETUP({}, {})", *b as u8, n)
            }
            BeginArrayIter(i) => write!(f, "BEGIN_ARRAY_ITER({})", sym(i)),
            ArrayIter(s, i, o) => write!(f, "ARRAY_ITER({}, {}, {:+})", sym(s), sym(i), o),

            Branch(o) => write!(f, "BRANCH({:+})", o),
            BranchTrue(o) => write!(f, "BRANCH_TRUE({:+})", o),
            BranchFalse(o) => write!(f, "BRANCH_FALSE({:+})", o),
            BranchNever(o) => write!(f, "BRANCH_NEVER({:+})", o),

            SubrCall(s, n) => write!(f, "SUBR_CALL({}, {})", sym(s), n),
            FetchRetVal => write!(f, "FETCH_RET_VAL"),
            Return => write!(f, "RETURN"),
            ReturnNoVal => write!(f, "RETURN_NO_VAL"),
            PushArg => write!(f, "PUSH_ARG"),
            PushArgCount => write!(f, "PUSH_ARG_COUNT"),
            PushArgArray => write!(f, "PUSH_ARG_ARRAY"),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.write(f, None)
    }
}

/// An instruction rendered with the names from its symbol table.
pub struct Named<'a>(pub &'a Opcode, pub &'a SymbolTable);

impl<'a> std::fmt::Display for Named<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.write(f, Some(self.1))
    }
}
