use super::{lex::Lexer, token::*, Error, ErrorCode, Offset};
use crate::mach::{Address, Opcode, Program, SymbolId, SymbolTable, PROGRAM_SIZE};
use tracing::debug;

type Result<T> = std::result::Result<T, Error>;

/// A successful compile and how far into the source it read.
#[derive(Debug)]
pub struct Compilation {
    pub program: Program,
    pub stopped_at: Offset,
}

/// Compile macro source into a program.
///
/// On success `stopped_at` tells where compilation ended: the end of the
/// text, the closing brace of a braced body, or the start of a `define`.
/// On failure the error carries the offset the scanner had reached.
pub fn compile(source: &str) -> Result<Compilation> {
    compile_with(source, SymbolTable::new(), PROGRAM_SIZE)
}

pub fn compile_with(source: &str, symbols: SymbolTable, limit: usize) -> Result<Compilation> {
    let compilation = Parser::new(source, symbols, limit).program()?;
    debug!(
        instructions = compilation.program.len(),
        stopped_at = compilation.stopped_at,
        "compiled macro"
    );
    Ok(compilation)
}

/// Validate without keeping the program.
pub fn check(source: &str) -> Result<Offset> {
    compile(source).map(|c| c.stopped_at)
}

pub fn is_valid(source: &str) -> bool {
    check(source).is_ok()
}

// Binding strength of prefix `-` and `!`. Only `**` binds tighter.
const UNARY: u8 = 8;

fn binary_precedence(token: &Token) -> Option<(u8, bool)> {
    use Operator::*;
    Some(match token {
        Token::Operator(Or) => (1, false),
        Token::Operator(And) => (2, false),
        Token::Operator(BitOr) => (3, false),
        Token::Operator(BitAnd) => (4, false),
        Token::Operator(Greater)
        | Token::Operator(GreaterEqual)
        | Token::Operator(Less)
        | Token::Operator(LessEqual)
        | Token::Operator(Equal)
        | Token::Operator(NotEqual)
        | Token::Word(Word::In) => (5, false),
        Token::Operator(Plus) | Token::Operator(Minus) => (6, false),
        Token::Operator(Multiply) | Token::Operator(Divide) | Token::Operator(Modulo) => {
            (7, false)
        }
        Token::Operator(Power) => (9, true),
        _ => return None,
    })
}

fn binary_opcode(token: &Token) -> Option<Opcode> {
    use Operator::*;
    Some(match token {
        Token::Operator(Plus) | Token::Operator(AddAssign) => Opcode::Add,
        Token::Operator(Minus) | Token::Operator(SubAssign) => Opcode::Sub,
        Token::Operator(Multiply) | Token::Operator(MulAssign) => Opcode::Mul,
        Token::Operator(Divide) | Token::Operator(DivAssign) => Opcode::Div,
        Token::Operator(Modulo) | Token::Operator(ModAssign) => Opcode::Mod,
        Token::Operator(BitAnd) | Token::Operator(AndAssign) => Opcode::BitAnd,
        Token::Operator(BitOr) | Token::Operator(OrAssign) => Opcode::BitOr,
        Token::Operator(Power) => Opcode::Power,
        Token::Operator(Greater) => Opcode::Gt,
        Token::Operator(GreaterEqual) => Opcode::Ge,
        Token::Operator(Less) => Opcode::Lt,
        Token::Operator(LessEqual) => Opcode::Le,
        Token::Operator(Equal) => Opcode::Eq,
        Token::Operator(NotEqual) => Opcode::Ne,
        Token::Word(Word::In) => Opcode::InArray,
        _ => return None,
    })
}

fn is_compound_assign(op: Operator) -> bool {
    use Operator::*;
    matches!(
        op,
        AddAssign | SubAssign | MulAssign | DivAssign | ModAssign | AndAssign | OrAssign
    )
}

fn step_opcode(op: Operator) -> Opcode {
    if op == Operator::Incr {
        Opcode::Incr
    } else {
        Opcode::Decr
    }
}

/// Pending `break` and `continue` branches of one loop.
#[derive(Default)]
struct LoopContext {
    breaks: Vec<Address>,
    continues: Vec<Address>,
}

/// ## Compiler context
///
/// Everything one compile mutates: the cursor, the program under
/// construction and the loop patch lists. Code is emitted as each
/// construct is recognized; there is no syntax tree.

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    program: Program,
    loops: Vec<LoopContext>,
    limit: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, symbols: SymbolTable, limit: usize) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(source),
            peeked: None,
            program: Program::with_symbols(symbols),
            loops: vec![],
            limit,
        }
    }

    fn program(mut self) -> Result<Compilation> {
        self.blank()?;
        if *self.peek()? == Token::LBrace {
            self.next()?;
            self.blank()?;
            self.statements(&Token::RBrace)?;
            self.expect(Token::RBrace)?;
        } else {
            self.statements(&Token::End)?;
        }
        self.emit(Opcode::ReturnNoVal)?;
        Ok(Compilation {
            program: self.program,
            stopped_at: self.lexer.offset(),
        })
    }

    // *** Token stream

    fn peek(&mut self) -> Result<&Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        match &self.peeked {
            Some(t) => Ok(t),
            None => Err(self.error(ErrorCode::InternalError, "lost lookahead")),
        }
    }

    fn next(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.lexer.next_token(),
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        let t = self.next()?;
        if t == token {
            Ok(())
        } else {
            Err(self.syntax(&format!("expected '{}'", token)))
        }
    }

    fn expect_symbol(&mut self) -> Result<String> {
        match self.next()? {
            Token::Symbol(name) => Ok(name),
            t => Err(self.syntax(&format!("expected identifier, found {}", t))),
        }
    }

    fn blank(&mut self) -> Result<()> {
        while *self.peek()? == Token::Newline {
            self.next()?;
        }
        Ok(())
    }

    fn error(&self, code: ErrorCode, message: &str) -> Error {
        Error::new(code).at(self.lexer.offset()).message(message)
    }

    fn syntax(&self, message: &str) -> Error {
        self.error(ErrorCode::SyntaxError, message)
    }

    // *** Emission

    fn emit(&mut self, op: Opcode) -> Result<Address> {
        if self.program.len() >= self.limit {
            return Err(error!(MacroTooLarge, ..self.lexer.offset()));
        }
        Ok(self.program.push(op))
    }

    fn patch(&mut self, site: Address, target: Address) -> Result<()> {
        self.program.patch(site, target)
    }

    fn branch_to(&mut self, target: Address) -> Result<()> {
        let site = self.emit(Opcode::Branch(0))?;
        self.patch(site, target)
    }

    fn symbol(&mut self, name: &str) -> SymbolId {
        self.program.symbols_mut().name(name)
    }

    fn end_loop(&mut self, exit: Address, resume: Address) -> Result<()> {
        let context = self.loops.pop().unwrap_or_default();
        for site in context.breaks {
            self.patch(site, exit)?;
        }
        for site in context.continues {
            self.patch(site, resume)?;
        }
        Ok(())
    }

    // *** Statements

    fn statements(&mut self, end: &Token) -> Result<()> {
        while self.peek()? != end {
            self.statement()?;
        }
        Ok(())
    }

    fn block(&mut self) -> Result<()> {
        if *self.peek()? == Token::LBrace {
            self.next()?;
            self.blank()?;
            self.statements(&Token::RBrace)?;
            self.expect(Token::RBrace)?;
            self.blank()
        } else {
            self.statement()
        }
    }

    fn end_of_statement(&mut self) -> Result<()> {
        match self.peek()? {
            Token::Newline => self.blank(),
            // `{ x = 1 }` on one line; the brace is left for the block.
            Token::End | Token::RBrace => Ok(()),
            t => {
                let msg = format!("unexpected {}", t);
                Err(self.syntax(&msg))
            }
        }
    }

    fn statement(&mut self) -> Result<()> {
        match self.peek()? {
            Token::Word(Word::If) => self.if_statement(),
            Token::Word(Word::While) => self.while_statement(),
            Token::Word(Word::For) => self.for_statement(),
            Token::Word(Word::Break) => {
                self.next()?;
                let site = self.emit(Opcode::Branch(0))?;
                match self.loops.last_mut() {
                    Some(context) => context.breaks.push(site),
                    None => return Err(error!(BreakOutsideLoop, ..self.lexer.offset())),
                }
                self.end_of_statement()
            }
            Token::Word(Word::Continue) => {
                self.next()?;
                let site = self.emit(Opcode::Branch(0))?;
                match self.loops.last_mut() {
                    Some(context) => context.continues.push(site),
                    None => return Err(error!(ContinueOutsideLoop, ..self.lexer.offset())),
                }
                self.end_of_statement()
            }
            Token::Word(Word::Return) => {
                self.next()?;
                match self.peek()? {
                    Token::Newline | Token::End | Token::RBrace => {
                        self.emit(Opcode::ReturnNoVal)?;
                    }
                    _ => {
                        self.expr()?;
                        self.emit(Opcode::Return)?;
                    }
                }
                self.end_of_statement()
            }
            _ => {
                self.simple_statement(None)?;
                self.end_of_statement()
            }
        }
    }

    /// Emits the test and returns the address of its false branch.
    fn condition(&mut self) -> Result<Address> {
        match self.peek()? {
            Token::RParen | Token::Semicolon => self.emit(Opcode::BranchNever(0)),
            _ => {
                self.numexpr(0)?;
                self.emit(Opcode::BranchFalse(0))
            }
        }
    }

    fn if_statement(&mut self) -> Result<()> {
        self.next()?;
        self.expect(Token::LParen)?;
        let test = self.condition()?;
        self.expect(Token::RParen)?;
        self.blank()?;
        self.block()?;
        if *self.peek()? == Token::Word(Word::Else) {
            self.next()?;
            self.blank()?;
            let skip = self.emit(Opcode::Branch(0))?;
            let pc = self.program.pc();
            self.patch(test, pc)?;
            self.block()?;
            let pc = self.program.pc();
            self.patch(skip, pc)
        } else {
            let pc = self.program.pc();
            self.patch(test, pc)
        }
    }

    fn while_statement(&mut self) -> Result<()> {
        self.next()?;
        let top = self.program.pc();
        self.expect(Token::LParen)?;
        let test = self.condition()?;
        self.expect(Token::RParen)?;
        self.blank()?;
        self.loops.push(LoopContext::default());
        self.block()?;
        self.branch_to(top)?;
        let exit = self.program.pc();
        self.patch(test, exit)?;
        self.end_loop(exit, top)
    }

    fn for_statement(&mut self) -> Result<()> {
        self.next()?;
        self.expect(Token::LParen)?;
        let mut first = None;
        if let Token::Symbol(_) = self.peek()? {
            if let Token::Symbol(name) = self.next()? {
                if *self.peek()? == Token::Word(Word::In) {
                    return self.for_in_statement(&name);
                }
                first = Some(name);
            }
        }
        self.comma_statements(first, &Token::Semicolon)?;
        self.expect(Token::Semicolon)?;
        let top = self.program.pc();
        let test = self.condition()?;
        self.expect(Token::Semicolon)?;

        // The increment is read before the body but runs after it, so it
        // is held aside and appended once the body is emitted.
        let incr_start = self.program.pc();
        self.comma_statements(None, &Token::RParen)?;
        let increment = self.program.split_off(incr_start);
        self.expect(Token::RParen)?;
        self.blank()?;

        self.loops.push(LoopContext::default());
        self.block()?;
        let resume = self.program.pc();
        if self.program.len() + increment.len() >= self.limit {
            return Err(error!(MacroTooLarge, ..self.lexer.offset()));
        }
        self.program.splice(increment);
        self.branch_to(top)?;
        let exit = self.program.pc();
        self.patch(test, exit)?;
        self.end_loop(exit, resume)
    }

    fn for_in_statement(&mut self, name: &str) -> Result<()> {
        self.next()?;
        self.numexpr(0)?;
        self.expect(Token::RParen)?;
        let item = self.symbol(name);
        let iter = self.program.symbols_mut().hidden_local();
        self.emit(Opcode::BeginArrayIter(iter))?;
        let top = self.emit(Opcode::ArrayIter(item, iter, 0))?;
        self.blank()?;
        self.loops.push(LoopContext::default());
        self.block()?;
        self.branch_to(top)?;
        let exit = self.program.pc();
        self.patch(top, exit)?;
        self.end_loop(exit, top)
    }

    fn comma_statements(&mut self, mut first: Option<String>, end: &Token) -> Result<()> {
        if first.is_none() && self.peek()? == end {
            return Ok(());
        }
        loop {
            self.simple_statement(first.take())?;
            if *self.peek()? != Token::Comma {
                return Ok(());
            }
            self.next()?;
        }
    }

    /// Assignment, call, increment or delete. `first` is an identifier
    /// already taken from the stream.
    fn simple_statement(&mut self, first: Option<String>) -> Result<()> {
        let name = match first {
            Some(name) => name,
            None => match self.next()? {
                Token::Symbol(name) => name,
                Token::Operator(op @ Operator::Incr) | Token::Operator(op @ Operator::Decr) => {
                    return self.pre_step_statement(op)
                }
                Token::Word(Word::Delete) => return self.delete_statement(),
                t => return Err(self.syntax(&format!("unexpected {}", t))),
            },
        };
        match self.next()? {
            Token::Operator(Operator::Assign) => {
                let sym = self.symbol(&name);
                self.expr()?;
                self.emit(Opcode::Assign(sym))?;
            }
            Token::Operator(op) if is_compound_assign(op) => {
                let sym = self.symbol(&name);
                self.emit(Opcode::PushSym(sym))?;
                self.expr()?;
                self.emit_binary(&Token::Operator(op))?;
                self.emit(Opcode::Assign(sym))?;
            }
            Token::Operator(op @ Operator::Incr) | Token::Operator(op @ Operator::Decr) => {
                let sym = self.symbol(&name);
                self.emit(Opcode::PushSym(sym))?;
                self.emit(step_opcode(op))?;
                self.emit(Opcode::Assign(sym))?;
            }
            Token::LParen => {
                let callee = self.program.symbols_mut().global(&name);
                let argc = self.arglist(Token::RParen)?;
                self.emit(Opcode::SubrCall(callee, argc))?;
            }
            Token::LBracket => {
                let keys = self.array_lvalue(&name)?;
                match self.next()? {
                    Token::Operator(Operator::Assign) => {
                        self.expr()?;
                        self.emit(Opcode::ArrayAssign(keys))?;
                    }
                    Token::Operator(op) if is_compound_assign(op) => {
                        self.expr()?;
                        self.emit(Opcode::ArrayRefAssignSetup(true, keys))?;
                        self.emit_binary(&Token::Operator(op))?;
                        self.emit(Opcode::ArrayAssign(keys))?;
                    }
                    Token::Operator(op @ Operator::Incr) | Token::Operator(op @ Operator::Decr) => {
                        self.array_step(op, keys)?;
                    }
                    t => return Err(self.syntax(&format!("unexpected {}", t))),
                }
            }
            t => return Err(self.syntax(&format!("unexpected {}", t))),
        }
        Ok(())
    }

    /// Emit an assignable array reference whose first `[` has been read.
    /// Returns the key count of the last subscript.
    fn array_lvalue(&mut self, name: &str) -> Result<usize> {
        let sym = self.symbol(name);
        self.emit(Opcode::PushArraySym(sym, true))?;
        let mut keys = self.arglist(Token::RBracket)?;
        while *self.peek()? == Token::LBracket {
            self.next()?;
            self.emit(Opcode::ArrayRef(keys))?;
            keys = self.arglist(Token::RBracket)?;
        }
        Ok(keys)
    }

    fn array_step(&mut self, op: Operator, keys: usize) -> Result<()> {
        self.emit(Opcode::ArrayRefAssignSetup(false, keys))?;
        self.emit(step_opcode(op))?;
        self.emit(Opcode::ArrayAssign(keys))?;
        Ok(())
    }

    fn pre_step_statement(&mut self, op: Operator) -> Result<()> {
        let name = self.expect_symbol()?;
        if *self.peek()? == Token::LBracket {
            self.next()?;
            let keys = self.array_lvalue(&name)?;
            self.array_step(op, keys)
        } else {
            let sym = self.symbol(&name);
            self.emit(Opcode::PushSym(sym))?;
            self.emit(step_opcode(op))?;
            self.emit(Opcode::Assign(sym))?;
            Ok(())
        }
    }

    /// `delete(a[k])` removes one element, `delete(a)` or `delete(a[])`
    /// removes them all.
    fn delete_statement(&mut self) -> Result<()> {
        self.expect(Token::LParen)?;
        let name = self.expect_symbol()?;
        let sym = self.symbol(&name);
        self.emit(Opcode::PushArraySym(sym, false))?;
        let mut keys = 0;
        while *self.peek()? == Token::LBracket {
            if keys > 0 {
                self.emit(Opcode::ArrayRef(keys))?;
            }
            self.next()?;
            keys = self.arglist(Token::RBracket)?;
        }
        self.expect(Token::RParen)?;
        self.emit(Opcode::ArrayDelete(keys))?;
        Ok(())
    }

    /// Comma separated expressions up to `close`. Returns the count.
    fn arglist(&mut self, close: Token) -> Result<usize> {
        if *self.peek()? == close {
            self.next()?;
            return Ok(0);
        }
        let mut count = 0;
        loop {
            self.expr()?;
            count += 1;
            match self.next()? {
                Token::Comma => continue,
                t if t == close => return Ok(count),
                t => return Err(self.syntax(&format!("unexpected {}", t))),
            }
        }
    }

    // *** Expressions

    /// Adjacent operands are joined as strings.
    fn expr(&mut self) -> Result<()> {
        self.numexpr(0)?;
        while self.starts_operand()? {
            self.numexpr(0)?;
            self.emit(Opcode::Concat)?;
        }
        Ok(())
    }

    fn starts_operand(&mut self) -> Result<bool> {
        Ok(matches!(
            self.peek()?,
            Token::Number(_)
                | Token::String(_)
                | Token::Symbol(_)
                | Token::LParen
                | Token::Word(Word::Args)
                | Token::Operator(Operator::Not)
                | Token::Operator(Operator::Incr)
                | Token::Operator(Operator::Decr)
        ))
    }

    fn emit_binary(&mut self, token: &Token) -> Result<Address> {
        match binary_opcode(token) {
            Some(op) => self.emit(op),
            None => Err(self.error(ErrorCode::InternalError, "no opcode for operator")),
        }
    }

    fn numexpr(&mut self, min_precedence: u8) -> Result<()> {
        self.unary()?;
        loop {
            let token = self.peek()?.clone();
            let (precedence, right_assoc) = match binary_precedence(&token) {
                Some(p) if p.0 >= min_precedence => p,
                _ => return Ok(()),
            };
            self.next()?;
            match token {
                Token::Operator(Operator::And) | Token::Operator(Operator::Or) => {
                    let and = token == Token::Operator(Operator::And);
                    self.emit(Opcode::Dup)?;
                    let guard = self.emit(if and {
                        Opcode::BranchFalse(0)
                    } else {
                        Opcode::BranchTrue(0)
                    })?;
                    self.numexpr(precedence + 1)?;
                    self.emit(if and { Opcode::And } else { Opcode::Or })?;
                    let merge = self.program.pc();
                    self.patch(guard, merge)?;
                }
                _ => {
                    let next = if right_assoc { precedence } else { precedence + 1 };
                    self.numexpr(next)?;
                    self.emit_binary(&token)?;
                }
            }
        }
    }

    fn unary(&mut self) -> Result<()> {
        match self.peek()? {
            Token::Operator(Operator::Minus) => {
                self.next()?;
                self.numexpr(UNARY)?;
                self.emit(Opcode::Negate)?;
            }
            Token::Operator(Operator::Not) => {
                self.next()?;
                self.numexpr(UNARY)?;
                self.emit(Opcode::Not)?;
            }
            Token::Operator(Operator::Incr) | Token::Operator(Operator::Decr) => {
                let op = match self.next()? {
                    Token::Operator(op) => op,
                    _ => Operator::Incr,
                };
                let name = self.expect_symbol()?;
                let sym = self.symbol(&name);
                self.emit(Opcode::PushSym(sym))?;
                self.emit(step_opcode(op))?;
                self.emit(Opcode::Dup)?;
                self.emit(Opcode::Assign(sym))?;
                self.subscripts()?;
            }
            _ => self.primary()?,
        }
        Ok(())
    }

    fn primary(&mut self) -> Result<()> {
        match self.next()? {
            Token::Number(n) => {
                let sym = self.program.symbols_mut().constant(n);
                self.emit(Opcode::PushSym(sym))?;
            }
            Token::String(s) => {
                let sym = self.program.symbols_mut().string(&s);
                self.emit(Opcode::PushSym(sym))?;
            }
            Token::Symbol(name) => match self.peek()? {
                Token::LParen => {
                    self.next()?;
                    let callee = self.program.symbols_mut().global(&name);
                    let argc = self.arglist(Token::RParen)?;
                    self.emit(Opcode::SubrCall(callee, argc))?;
                    self.emit(Opcode::FetchRetVal)?;
                }
                Token::Operator(Operator::Incr) | Token::Operator(Operator::Decr) => {
                    let op = match self.next()? {
                        Token::Operator(op) => op,
                        _ => Operator::Incr,
                    };
                    let sym = self.symbol(&name);
                    self.emit(Opcode::PushSym(sym))?;
                    self.emit(Opcode::Dup)?;
                    self.emit(step_opcode(op))?;
                    self.emit(Opcode::Assign(sym))?;
                }
                _ => {
                    let sym = self.symbol(&name);
                    self.emit(Opcode::PushSym(sym))?;
                }
            },
            Token::LParen => {
                self.expr()?;
                self.expect(Token::RParen)?;
            }
            Token::Word(Word::Args) => {
                if *self.peek()? == Token::LBracket {
                    self.next()?;
                    if *self.peek()? == Token::RBracket {
                        self.next()?;
                        self.emit(Opcode::PushArgCount)?;
                    } else {
                        self.numexpr(0)?;
                        self.expect(Token::RBracket)?;
                        self.emit(Opcode::PushArg)?;
                    }
                } else {
                    self.emit(Opcode::PushArgArray)?;
                }
            }
            t => return Err(self.syntax(&format!("unexpected {}", t))),
        }
        self.subscripts()
    }

    /// Postfix `[keys]` on any operand.
    fn subscripts(&mut self) -> Result<()> {
        while *self.peek()? == Token::LBracket {
            self.next()?;
            let keys = self.arglist(Token::RBracket)?;
            self.emit(Opcode::ArrayRef(keys))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(source: &str) -> Vec<String> {
        let c = compile(source).unwrap();
        c.program
            .to_string()
            .lines()
            .map(|l| l[5..].to_string())
            .collect()
    }

    #[test]
    fn test_assignment() {
        assert_eq!(
            listing("x = 3 * y\n"),
            ["PUSH_SYM(3)", "PUSH_SYM(y)", "MUL", "ASSIGN(x)", "RETURN_NO_VAL"]
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            listing("x = -a ^ 2 + b * c\n"),
            [
                "PUSH_SYM(a)",
                "PUSH_SYM(2)",
                "POWER",
                "NEGATE",
                "PUSH_SYM(b)",
                "PUSH_SYM(c)",
                "MUL",
                "ADD",
                "ASSIGN(x)",
                "RETURN_NO_VAL"
            ]
        );
        assert_eq!(
            listing("x = 2 ^ 3 ^ 2\n")[..5],
            ["PUSH_SYM(2)", "PUSH_SYM(3)", "PUSH_SYM(2)", "POWER", "POWER"]
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            listing("x = a | b & c\n")[..5],
            ["PUSH_SYM(a)", "PUSH_SYM(b)", "PUSH_SYM(c)", "BIT_AND", "BIT_OR"]
        );
        assert_eq!(
            listing("x = a || b && c\n")[..9],
            [
                "PUSH_SYM(a)",
                "DUP",
                "BRANCH_TRUE(+7)",
                "PUSH_SYM(b)",
                "DUP",
                "BRANCH_FALSE(+3)",
                "PUSH_SYM(c)",
                "AND",
                "OR"
            ]
        );
    }

    #[test]
    fn test_juxtaposition() {
        assert_eq!(
            listing("x = \"a\" 1 + 2\n"),
            [
                "PUSH_SYM(\"a\")",
                "PUSH_SYM(1)",
                "PUSH_SYM(2)",
                "ADD",
                "CONCAT",
                "ASSIGN(x)",
                "RETURN_NO_VAL"
            ]
        );
    }

    #[test]
    fn test_short_circuit_layout() {
        assert_eq!(
            listing("x = a && b\n"),
            [
                "PUSH_SYM(a)",
                "DUP",
                "BRANCH_FALSE(+3)",
                "PUSH_SYM(b)",
                "AND",
                "ASSIGN(x)",
                "RETURN_NO_VAL"
            ]
        );
    }

    #[test]
    fn test_if_else_layout() {
        assert_eq!(
            listing("if (a) x = 1\nelse x = 2\n"),
            [
                "PUSH_SYM(a)",
                "BRANCH_FALSE(+4)",
                "PUSH_SYM(1)",
                "ASSIGN(x)",
                "BRANCH(+3)",
                "PUSH_SYM(2)",
                "ASSIGN(x)",
                "RETURN_NO_VAL"
            ]
        );
    }

    #[test]
    fn test_for_reorders_increment() {
        assert_eq!(
            listing("for (i = 0; i < 5; i++) s = s i\n"),
            [
                "PUSH_SYM(0)",
                "ASSIGN(i)",
                "PUSH_SYM(i)",
                "PUSH_SYM(5)",
                "LT",
                "BRANCH_FALSE(+9)",
                "PUSH_SYM(s)",
                "PUSH_SYM(i)",
                "CONCAT",
                "ASSIGN(s)",
                "PUSH_SYM(i)",
                "INCR",
                "ASSIGN(i)",
                "BRANCH(-11)",
                "RETURN_NO_VAL"
            ]
        );
    }

    #[test]
    fn test_for_in_layout() {
        let l = listing("for (k in a) n++\n");
        assert_eq!(l[0], "PUSH_SYM(a)");
        assert_eq!(l[1], "BEGIN_ARRAY_ITER(aryiter #0)");
        assert_eq!(l[2], "ARRAY_ITER(k, aryiter #0, +5)");
        assert_eq!(l[6], "BRANCH(-4)");
        assert_eq!(l[7], "RETURN_NO_VAL");
    }

    #[test]
    fn test_while_break_continue() {
        let c = compile("while (1) {\nif (a) break\ncontinue\n}\n").unwrap();
        let code = c.program.code();
        assert!(matches!(code[1], Opcode::BranchFalse(6)));
        assert!(matches!(code[3], Opcode::BranchFalse(2)));
        assert!(matches!(code[4], Opcode::Branch(3)));
        assert!(matches!(code[5], Opcode::Branch(-5)));
        assert!(matches!(code[6], Opcode::Branch(-6)));
    }

    #[test]
    fn test_array_statements() {
        assert_eq!(
            listing("a[1, 2] += 3\n"),
            [
                "PUSH_ARRAY_SYM(a, 1)",
                "PUSH_SYM(1)",
                "PUSH_SYM(2)",
                "PUSH_SYM(3)",
                "ARRAY_REF_ASSIGN_SETUP(1, 2)",
                "ADD",
                "ARRAY_ASSIGN(2)",
                "RETURN_NO_VAL"
            ]
        );
        assert_eq!(
            listing("++a[k]\n")[2..5],
            ["ARRAY_REF_ASSIGN_SETUP(0, 1)", "INCR", "ARRAY_ASSIGN(1)"]
        );
        assert_eq!(
            listing("delete(a[k])\ndelete(a)\n"),
            [
                "PUSH_ARRAY_SYM(a, 0)",
                "PUSH_SYM(k)",
                "ARRAY_DELETE(1)",
                "PUSH_ARRAY_SYM(a, 0)",
                "ARRAY_DELETE(0)",
                "RETURN_NO_VAL"
            ]
        );
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            listing("f(1)\nx = g()\n"),
            [
                "PUSH_SYM(1)",
                "SUBR_CALL(f, 1)",
                "SUBR_CALL(g, 0)",
                "FETCH_RET_VAL",
                "ASSIGN(x)",
                "RETURN_NO_VAL"
            ]
        );
    }

    #[test]
    fn test_increments_in_expressions() {
        assert_eq!(
            listing("x = ++i\ny = i--\n"),
            [
                "PUSH_SYM(i)",
                "INCR",
                "DUP",
                "ASSIGN(i)",
                "ASSIGN(x)",
                "PUSH_SYM(i)",
                "DUP",
                "DECR",
                "ASSIGN(i)",
                "ASSIGN(y)",
                "RETURN_NO_VAL"
            ]
        );
    }

    #[test]
    fn test_args_forms() {
        assert_eq!(
            listing("x = $args[1] $args[] $args\n")[..6],
            ["PUSH_SYM(1)", "PUSH_ARG", "PUSH_ARG_COUNT", "CONCAT", "PUSH_ARG_ARRAY", "CONCAT"]
        );
    }

    #[test]
    fn test_errors() {
        let e = compile("break\n").unwrap_err();
        assert_eq!(e.code(), ErrorCode::BreakOutsideLoop);
        assert!(e.to_string().contains("break outside loop"));
        let e = compile("x = 1\ncontinue\n").unwrap_err();
        assert!(e.to_string().contains("continue outside loop"));
        let e = compile("x = (1\n").unwrap_err();
        assert_eq!(e.code(), ErrorCode::SyntaxError);
        assert_eq!(e.offset(), Some(7));
        assert!(compile("x\n").is_err());
        assert!(!is_valid("if x\n"));
    }

    #[test]
    fn test_stopped_at() {
        let src = "{\nx = 1\n}\ny = 2\n";
        assert_eq!(check(src), Ok(9));
        let src = "x = 1\ndefine f {\n}\n";
        assert_eq!(check(src), Ok(6));
        assert_eq!(check("x = 1"), Ok(5));
    }

    #[test]
    fn test_program_limit() {
        let e = compile_with("x = 1 + 2 + 3\n", SymbolTable::new(), 4).unwrap_err();
        assert_eq!(e.code(), ErrorCode::MacroTooLarge);
    }

    #[test]
    fn test_deterministic() {
        let src = "for (k in a) {\nif (k == 1 || b) t[k]++\n}\nreturn f(1, \"x\") y\n";
        assert_eq!(listing(src), listing(src));
    }
}
