use super::{
    Address, Array, BranchOffset, Frame, Function, Opcode, Operation, Program, Stack, Symbol,
    SymbolId, SymbolKind, Val, PROGRAM_SIZE,
};
use crate::error;
use crate::lang::{Driver, Error, ErrorCode, Item};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

type Result<T> = std::result::Result<T, Error>;

/// Resource limits of one runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Operand stack entries.
    pub stack: usize,
    /// Instructions in one compiled program.
    pub program: usize,
    /// Nested subroutine calls.
    pub frames: usize,
    /// Instructions per `execute` slice in the interactive loop.
    pub cycles: usize,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            stack: 1024,
            program: PROGRAM_SIZE,
            frames: 256,
            cycles: 5000,
        }
    }
}

/// Event for the user interface. Call `execute` again after handling.
#[derive(Debug)]
pub enum Event {
    /// Nothing left to run.
    Stopped,
    /// The cycle budget ran out.
    Running,
    Print(String),
    /// A top-level program returned. `Val::NoValue` if it gave no value.
    Done(Val),
    Errors(Vec<Error>),
}

enum Task {
    Define(Rc<str>, Arc<Program>),
    Run(Arc<Program>, Vec<Val>),
    Errors(Vec<Error>),
}

/// ## Virtual machine
///
/// Programs run on one shared operand stack. Each subroutine call gets
/// its own frame; a program counter and locals survive between slices,
/// so a long macro can be run a few thousand instructions at a time.

pub struct Runtime {
    limits: Limits,
    globals: HashMap<Rc<str>, Val>,
    functions: HashMap<Rc<str>, Function>,
    stack: Stack<Val>,
    frames: Stack<Frame>,
    tasks: VecDeque<Task>,
    output: String,
    deferred: Option<Event>,
    interrupted: bool,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::with_limits(Limits::default())
    }
}

impl Runtime {
    pub fn with_limits(limits: Limits) -> Runtime {
        let mut runtime = Runtime {
            limits,
            globals: HashMap::new(),
            functions: HashMap::new(),
            stack: Stack::new(limits.stack, ErrorCode::StackOverflow),
            frames: Stack::new(limits.frames, ErrorCode::ExcessiveRecursion),
            tasks: VecDeque::new(),
            output: String::new(),
            deferred: None,
            interrupted: false,
        };
        for (name, function) in Function::standard() {
            runtime.register(name, function);
        }
        runtime
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Compile macro text and queue it. Subroutines are defined and
    /// immediate code runs in the order they appear. A compile error is
    /// reported by the next `execute`. Returns false on a compile error.
    pub fn enter(&mut self, s: &str) -> bool {
        for item in Driver::with_limit(s, self.limits.program) {
            match item {
                Ok(Item::Define(name, program)) => self
                    .tasks
                    .push_back(Task::Define(name.into(), Arc::new(program))),
                Ok(Item::Immediate(program)) => {
                    self.tasks.push_back(Task::Run(Arc::new(program), vec![]))
                }
                Err(error) => {
                    self.tasks.push_back(Task::Errors(vec![error]));
                    return false;
                }
            }
        }
        true
    }

    /// Queue a program for `execute`.
    pub fn run(&mut self, program: Arc<Program>, args: Vec<Val>) {
        self.tasks.push_back(Task::Run(program, args));
    }

    pub fn register(&mut self, name: &str, function: Function) {
        self.functions.insert(name.into(), function);
    }

    pub fn define(&mut self, name: &str, program: Program) {
        debug!(name, instructions = program.len(), "defined subroutine");
        self.register(name, Function::Macro(Arc::new(program)));
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn global(&self, name: &str) -> Option<&Val> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: &str, val: Val) {
        self.globals.insert(name.into(), val);
    }

    /// Output from built-ins, delivered as `Event::Print`.
    pub fn print(&mut self, s: &str) {
        self.output.push_str(s);
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Abort whatever is running or queued.
    pub fn interrupt(&mut self) {
        if !self.frames.is_empty() || !self.tasks.is_empty() {
            self.interrupted = true;
        }
    }

    /// Run a program to completion and return its value. Must not be used
    /// while another program is mid-execution.
    pub fn call(&mut self, program: Arc<Program>, args: Vec<Val>) -> Result<Val> {
        if !self.frames.is_empty() {
            return Err(error!(InternalError; "runtime is busy"));
        }
        let result = self.finish(program, args);
        if result.is_err() {
            self.unwind();
        }
        result
    }

    fn finish(&mut self, program: Arc<Program>, args: Vec<Val>) -> Result<Val> {
        self.start(program, args)?;
        loop {
            if let Some(val) = self.step()? {
                return Ok(val);
            }
        }
    }

    pub fn execute(&mut self, cycles: usize) -> Event {
        if self.interrupted {
            self.interrupted = false;
            self.unwind();
            self.tasks.clear();
            self.deferred = None;
            return Event::Errors(vec![error!(Interrupted)]);
        }
        if !self.output.is_empty() {
            return Event::Print(self.take_output());
        }
        if let Some(event) = self.deferred.take() {
            return event;
        }
        while self.frames.is_empty() {
            match self.tasks.pop_front() {
                None => return Event::Stopped,
                Some(Task::Define(name, program)) => {
                    debug!(name = &*name, "defined subroutine");
                    self.functions.insert(name, Function::Macro(program));
                }
                Some(Task::Errors(errors)) => return Event::Errors(errors),
                Some(Task::Run(program, args)) => {
                    if let Err(error) = self.start(program, args) {
                        return Event::Errors(vec![error]);
                    }
                }
            }
        }
        for _ in 0..cycles {
            let event = match self.step() {
                Ok(None) => None,
                Ok(Some(val)) => Some(Event::Done(val)),
                Err(error) => {
                    debug!(%error, "runtime error");
                    self.unwind();
                    Some(Event::Errors(vec![error]))
                }
            };
            if !self.output.is_empty() {
                // Output comes before the result of the same instruction.
                self.deferred = event;
                return Event::Print(self.take_output());
            }
            if let Some(event) = event {
                return event;
            }
        }
        Event::Running
    }

    fn start(&mut self, program: Arc<Program>, args: Vec<Val>) -> Result<()> {
        self.stack.clear();
        self.frames.push(Frame::new("main".into(), program, args, 0))
    }

    /// Drop every frame and operand. Globals keep their values.
    fn unwind(&mut self) {
        self.frames.clear();
        self.stack.clear();
    }

    fn frame(&mut self) -> Result<&mut Frame> {
        match self.frames.last_mut() {
            Some(frame) => Ok(frame),
            None => Err(error!(InternalError; "no active frame")),
        }
    }

    fn current(&self) -> Result<&Frame> {
        match self.frames.last() {
            Some(frame) => Ok(frame),
            None => Err(error!(InternalError; "no active frame")),
        }
    }

    fn symbol(&self, id: SymbolId) -> Result<Symbol> {
        match self.current()?.program.symbols().get(id) {
            Some(sym) => Ok(sym.clone()),
            None => Err(error!(InternalError; "bad symbol reference")),
        }
    }

    fn load(&self, sym: &Symbol) -> Result<Val> {
        let val = match sym.kind() {
            SymbolKind::Const | SymbolKind::String => return Ok(Val::from(sym.value())),
            SymbolKind::Global => self.globals.get(&**sym.name()).cloned(),
            SymbolKind::Local => self.current()?.locals.get(sym.slot()).cloned(),
            SymbolKind::Arg => {
                return match self.current()?.args.get(sym.slot()) {
                    Some(val) => Ok(val.clone()),
                    None => Err(error!(UndefinedArgument; sym.name())),
                }
            }
        };
        match val {
            Some(val) if val.is_set() => Ok(val),
            _ => Err(error!(VariableNotSet; sym.name())),
        }
    }

    fn store(&mut self, sym: &Symbol, val: Val) -> Result<()> {
        match sym.kind() {
            SymbolKind::Global => {
                self.globals.insert(Rc::from(&**sym.name()), val);
                Ok(())
            }
            SymbolKind::Local => match self.frame()?.locals.get_mut(sym.slot()) {
                Some(local) => {
                    *local = val;
                    Ok(())
                }
                None => Err(error!(InternalError; "bad local slot")),
            },
            SymbolKind::Arg => Err(error!(AssignToArgument; sym.name())),
            _ => Err(error!(NotAnLvalue; sym.name())),
        }
    }

    fn jump(&mut self, site: Address, offset: BranchOffset) -> Result<()> {
        let frame = self.frame()?;
        frame.pc = (site as BranchOffset + offset) as Address;
        Ok(())
    }

    /// Does the instruction after a call want its value?
    fn fetch_follows(&mut self) -> Result<bool> {
        let frame = self.frame()?;
        if frame.program.get(frame.pc) == Some(&Opcode::FetchRetVal) {
            frame.pc += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn hand_back(&mut self, name: &str, val: Val) -> Result<()> {
        if self.fetch_follows()? {
            if !val.is_set() {
                return Err(error!(NoReturnValue; name));
            }
            self.stack.push(val)?;
        }
        Ok(())
    }

    fn binary(&mut self, op: fn(Val, Val) -> Result<Val>) -> Result<()> {
        let (lhs, rhs) = self.stack.pop_2()?;
        self.stack.push(op(lhs, rhs)?)
    }

    fn unary(&mut self, op: fn(Val) -> Result<Val>) -> Result<()> {
        let val = self.stack.pop()?;
        self.stack.push(op(val)?)
    }

    fn compare(&mut self, op: fn(&i32, &i32) -> bool) -> Result<()> {
        let (lhs, rhs) = self.stack.pop_2()?;
        self.stack.push(Operation::compare(lhs, rhs, op)?)
    }

    fn branch_if(&mut self, site: Address, offset: BranchOffset, when: bool) -> Result<()> {
        if self.stack.pop()?.to_bool()? == when {
            self.jump(site, offset)?;
        }
        Ok(())
    }

    fn element(array: &Val, keys: &[Val]) -> Result<Val> {
        match array {
            Val::Array(a) => {
                let key = Array::key(keys)?;
                let found = a.borrow().get(&key).cloned();
                match found {
                    Some(val) => Ok(val),
                    None => Err(error!(KeyNotFound; &key)),
                }
            }
            _ => Err(error!(NotAnArray)),
        }
    }

    /// Execute one instruction. Returns a value when the top-level
    /// program finishes.
    fn step(&mut self) -> Result<Option<Val>> {
        let (site, op) = {
            let frame = self.frame()?;
            let site = frame.pc;
            let op = match frame.program.get(site) {
                Some(op) => op.clone(),
                None => return Err(error!(InternalError; "ran past end of program")),
            };
            frame.pc += 1;
            (site, op)
        };
        match op {
            Opcode::PushSym(id) => {
                let sym = self.symbol(id)?;
                let val = self.load(&sym)?;
                self.stack.push(val)?;
            }
            Opcode::Dup => {
                let val = self.stack.peek(0)?.clone();
                self.stack.push(val)?;
            }
            Opcode::Assign(id) => {
                let val = self.stack.pop()?;
                let sym = self.symbol(id)?;
                self.store(&sym, val.deep_copy())?;
            }

            Opcode::Add => self.binary(Operation::add)?,
            Opcode::Sub => self.binary(Operation::subtract)?,
            Opcode::Mul => self.binary(Operation::multiply)?,
            Opcode::Div => self.binary(Operation::divide)?,
            Opcode::Mod => self.binary(Operation::modulo)?,
            Opcode::Power => self.binary(Operation::power)?,
            Opcode::BitAnd => self.binary(Operation::bit_and)?,
            Opcode::BitOr => self.binary(Operation::bit_or)?,
            Opcode::And => self.binary(Operation::and)?,
            Opcode::Or => self.binary(Operation::or)?,
            Opcode::Eq => self.binary(Operation::equal)?,
            Opcode::Ne => self.binary(Operation::not_equal)?,
            Opcode::InArray => self.binary(Operation::in_array)?,
            Opcode::Concat => self.binary(Operation::concat)?,
            Opcode::Gt => self.compare(i32::gt)?,
            Opcode::Ge => self.compare(i32::ge)?,
            Opcode::Lt => self.compare(i32::lt)?,
            Opcode::Le => self.compare(i32::le)?,
            Opcode::Negate => self.unary(Operation::negate)?,
            Opcode::Not => self.unary(Operation::not)?,
            Opcode::Incr => {
                let n = self.stack.pop()?.to_int()?;
                self.stack.push(Val::Integer(n.wrapping_add(1)))?;
            }
            Opcode::Decr => {
                let n = self.stack.pop()?.to_int()?;
                self.stack.push(Val::Integer(n.wrapping_sub(1)))?;
            }

            Opcode::PushArraySym(id, init) => {
                let sym = self.symbol(id)?;
                match sym.kind() {
                    SymbolKind::Local | SymbolKind::Global => {}
                    _ => {
                        let msg = format!("assigning to non-lvalue array or non-array: {}", sym.name());
                        return Err(error!(NotAnLvalue; &msg));
                    }
                }
                let val = match self.load(&sym) {
                    Ok(val) => val,
                    Err(error) if init && error.code() == ErrorCode::VariableNotSet => {
                        let array = Val::new_array();
                        self.store(&sym, array.clone())?;
                        array
                    }
                    Err(error) => return Err(error),
                };
                self.stack.push(val)?;
            }
            Opcode::ArrayRef(0) => match self.stack.pop()? {
                Val::Array(a) => {
                    let len = a.borrow().len();
                    self.stack.push(Val::Integer(len as i32))?;
                }
                _ => return Err(error!(NotAnArray)),
            },
            Opcode::ArrayRef(n) => {
                let keys = self.stack.pop_n(n)?;
                let array = self.stack.pop()?;
                let val = Runtime::element(&array, &keys)?;
                self.stack.push(val)?;
            }
            Opcode::ArrayAssign(n) => {
                if n == 0 {
                    return Err(error!(TypeMismatch; "empty operator []"));
                }
                let val = self.stack.pop()?;
                let keys = self.stack.pop_n(n)?;
                match self.stack.pop()? {
                    Val::Array(a) => {
                        let key = Array::key(&keys)?;
                        let val = val.deep_copy();
                        a.borrow_mut().insert(key, val);
                    }
                    _ => {
                        return Err(error!(NotAnArray; "cannot assign array element of non-array"))
                    }
                }
            }
            Opcode::ArrayDelete(n) => {
                let keys = self.stack.pop_n(n)?;
                match self.stack.pop()? {
                    Val::Array(a) if n == 0 => a.borrow_mut().clear(),
                    Val::Array(a) => {
                        let key = Array::key(&keys)?;
                        a.borrow_mut().remove(&key);
                    }
                    _ => return Err(error!(NotAnArray; "attempt to delete from non-array")),
                }
            }
            Opcode::ArrayRefAssignSetup(binop, n) => {
                if n == 0 {
                    return Err(error!(TypeMismatch; "empty operator []"));
                }
                let rhs = if binop {
                    Some(self.stack.pop()?)
                } else {
                    None
                };
                let keys = self.stack.peek_n(n)?;
                let current = Runtime::element(self.stack.peek(n)?, &keys)?;
                self.stack.push(current)?;
                if let Some(rhs) = rhs {
                    self.stack.push(rhs)?;
                }
            }
            Opcode::BeginArrayIter(iter) => match self.stack.pop()? {
                Val::Array(a) => self.frame()?.begin_iter(iter, a),
                _ => return Err(error!(NotAnArray; "can't iterate non-array")),
            },
            Opcode::ArrayIter(item, iter, offset) => {
                let key = self.frame()?.next_key(iter);
                match key {
                    Some(key) => {
                        let sym = self.symbol(item)?;
                        self.store(&sym, Val::String(key))?;
                    }
                    None => self.jump(site, offset)?,
                }
            }

            Opcode::Branch(offset) => self.jump(site, offset)?,
            Opcode::BranchTrue(offset) => self.branch_if(site, offset, true)?,
            Opcode::BranchFalse(offset) => self.branch_if(site, offset, false)?,
            Opcode::BranchNever(_) => {}

            Opcode::SubrCall(id, argc) => {
                let name: Rc<str> = Rc::from(&**self.symbol(id)?.name());
                let args = self.stack.pop_n(argc)?;
                trace!(name = &*name, argc, "call");
                match self.functions.get(&name).cloned() {
                    Some(Function::Builtin(f)) => {
                        let val = f(self, &args)?;
                        self.hand_back(&name, val)?;
                    }
                    Some(Function::Macro(program)) => {
                        let base = self.stack.len();
                        self.frames.push(Frame::new(name, program, args, base))?;
                    }
                    None => return Err(error!(UndefinedSubroutine; &name)),
                }
            }
            Opcode::FetchRetVal => {
                return Err(error!(InternalError; "FETCH_RET_VAL without a call"));
            }
            Opcode::Return | Opcode::ReturnNoVal => {
                let val = if op == Opcode::Return {
                    self.stack.pop()?
                } else {
                    Val::NoValue
                };
                let frame = self.frames.pop()?;
                self.stack.truncate(frame.stack_base);
                trace!(name = &*frame.name, "return");
                if self.frames.is_empty() {
                    return Ok(Some(val));
                }
                self.hand_back(&frame.name, val)?;
            }
            Opcode::PushArg => {
                let n = self.stack.pop()?.to_int()?;
                let frame = self.current()?;
                let val = if n >= 1 {
                    frame.args.get(n as usize - 1).cloned()
                } else {
                    None
                };
                match val {
                    Some(val) => self.stack.push(val)?,
                    None => return Err(error!(UndefinedArgument; &format!("$args[{}]", n))),
                }
            }
            Opcode::PushArgCount => {
                let count = self.current()?.args.len();
                self.stack.push(Val::Integer(count as i32))?;
            }
            Opcode::PushArgArray => {
                let args = self.current()?.args_array();
                self.stack.push(args)?;
            }
        }
        Ok(None)
    }
}
