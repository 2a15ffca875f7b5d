use super::parse::{compile_with, Compilation};
use super::{Error, Offset};
use crate::mach::{Program, SymbolTable, PROGRAM_SIZE};
use tracing::debug;

type Result<T> = std::result::Result<T, Error>;

/// One unit of macro text, in source order.
#[derive(Debug)]
pub enum Item {
    Define(String, Program),
    Immediate(Program),
}

/// ## Macro file driver
///
/// Splits text into `define name { ... }` subroutines and the immediate
/// code between them. Each piece is compiled on its own and the driver
/// resumes where the compiler stopped. Error offsets are relative to the
/// whole text.

pub struct Driver<'a> {
    src: &'a str,
    pos: usize,
    limit: usize,
    failed: bool,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Driver<'a> {
    pub fn new(src: &'a str) -> Driver<'a> {
        Driver::with_limit(src, PROGRAM_SIZE)
    }

    pub fn with_limit(src: &'a str, limit: usize) -> Driver<'a> {
        Driver {
            src,
            pos: 0,
            limit,
            failed: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn offset(&self) -> Offset {
        self.src[..self.pos].chars().count()
    }

    /// Advance a byte position by a count of characters.
    fn advance(&mut self, chars: Offset) {
        let rest = self.rest();
        self.pos += rest
            .char_indices()
            .nth(chars)
            .map_or(rest.len(), |(i, _)| i);
    }

    fn skip_space(&mut self) {
        loop {
            let rest = self.rest();
            match rest.chars().next() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => self.pos += 1,
                Some('#') => self.pos += rest.find('\n').unwrap_or(rest.len()),
                _ => return,
            }
        }
    }

    fn skip_blank(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start_matches(|c: char| c == ' ' || c == '\t').len();
    }

    fn compile(&mut self) -> Result<Compilation> {
        let base = self.offset();
        let compilation = compile_with(self.rest(), SymbolTable::new(), self.limit)
            .map_err(|e| e.rebase(base))?;
        self.advance(compilation.stopped_at);
        Ok(compilation)
    }

    /// At `define`? Returns None for a longer word such as `defined`.
    fn at_define(&self) -> Option<bool> {
        let after = self.rest().strip_prefix("define")?;
        match after.chars().next() {
            Some(' ') | Some('\t') => Some(true),
            Some(c) if is_name_char(c) => None,
            _ => Some(false),
        }
    }

    fn define(&mut self) -> Result<Item> {
        self.pos += "define".len();
        self.skip_blank();
        let rest = self.rest();
        let len = rest.len() - rest.trim_start_matches(is_name_char).len();
        if len == 0 {
            return Err(error!(ExpectedIdentifier, ..self.offset()));
        }
        let name = rest[..len].to_string();
        self.pos += len;
        self.skip_space();
        if !self.rest().starts_with('{') {
            return Err(error!(ExpectedBrace, ..self.offset()));
        }
        let compilation = self.compile()?;
        debug!(name = name.as_str(), "compiled subroutine");
        Ok(Item::Define(name, compilation.program))
    }

    fn next_item(&mut self) -> Option<Result<Item>> {
        self.skip_space();
        if self.rest().is_empty() {
            return None;
        }
        Some(match self.at_define() {
            Some(true) => self.define(),
            Some(false) => Err(error!(ExpectedIdentifier, ..self.offset() + "define".len())),
            None => self.compile().map(|c| Item::Immediate(c.program)),
        })
    }
}

impl<'a> Iterator for Driver<'a> {
    type Item = Result<Item>;

    /// Stops after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_item();
        if let Some(Err(_)) = item {
            self.failed = true;
        }
        item
    }
}
