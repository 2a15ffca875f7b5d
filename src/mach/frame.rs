use super::{Address, Array, Program, SymbolId, Val};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// ## Subroutine activation
///
/// Holds everything one running program needs besides the shared operand
/// stack: its own program counter, fresh local slots and its arguments.

#[derive(Debug)]
pub struct Frame {
    pub program: Arc<Program>,
    pub name: Rc<str>,
    pub pc: Address,
    pub locals: Vec<Val>,
    pub args: Vec<Val>,
    pub stack_base: usize,
    iters: HashMap<SymbolId, ArrayIter>,
}

impl Frame {
    pub fn new(name: Rc<str>, program: Arc<Program>, args: Vec<Val>, stack_base: usize) -> Frame {
        let locals = vec![Val::NoValue; program.symbols().local_count()];
        Frame {
            program,
            name,
            pc: 0,
            locals,
            args,
            stack_base,
            iters: HashMap::new(),
        }
    }

    pub fn args_array(&self) -> Val {
        let mut array = Array::new();
        for (index, arg) in self.args.iter().enumerate() {
            array.insert(index.to_string().into(), arg.clone());
        }
        Val::from(array)
    }

    pub fn begin_iter(&mut self, iter: SymbolId, array: Rc<RefCell<Array>>) {
        let keys = array.borrow().keys();
        self.iters.insert(iter, ArrayIter {
            array,
            keys,
            next: 0,
        });
    }

    /// Next key for the loop driven by `iter`, or None when exhausted.
    pub fn next_key(&mut self, iter: SymbolId) -> Option<Rc<str>> {
        let found = self.iters.get_mut(&iter).and_then(ArrayIter::next_key);
        if found.is_none() {
            self.iters.remove(&iter);
        }
        found
    }
}

/// Key snapshot taken when a `for (k in a)` loop starts. Keys added later
/// are not visited; keys removed before their turn are skipped.
#[derive(Debug)]
struct ArrayIter {
    array: Rc<RefCell<Array>>,
    keys: Vec<Rc<str>>,
    next: usize,
}

impl ArrayIter {
    fn next_key(&mut self) -> Option<Rc<str>> {
        while let Some(key) = self.keys.get(self.next) {
            self.next += 1;
            if self.array.borrow().contains_key(key) {
                return Some(key.clone());
            }
        }
        None
    }
}
