use super::{token::*, Error, Offset};

type Result<T> = std::result::Result<T, Error>;

/// Tokenize a whole text, stopping at the end or at a `define`.
pub fn lex(s: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(s);
    let mut tokens = vec![];
    loop {
        match lexer.next_token()? {
            Token::End => return Ok(tokens),
            t => tokens.push(t),
        }
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r'
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '$'
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `delete` is a keyword only when the next thing after blanks and
/// line continuations is an opening parenthesis.
pub fn delete_is_keyword(rest: &str) -> bool {
    let mut rest = rest;
    loop {
        if let Some(r) = rest.strip_prefix("\\\n") {
            rest = r;
        } else if let Some(c) = rest.chars().next().filter(|c| *c == ' ' || *c == '\t') {
            rest = &rest[c.len_utf8()..];
        } else {
            return rest.starts_with('(');
        }
    }
}

fn named_escape(c: char) -> Option<char> {
    Some(match c {
        '\\' => '\\',
        '"' => '"',
        'n' => '\n',
        't' => '\t',
        'b' => '\x08',
        'r' => '\r',
        'f' => '\x0c',
        'a' => '\x07',
        'v' => '\x0b',
        'e' => '\x1b',
        _ => return None,
    })
}

/// ## Macro lexer
///
/// A cursor over the source. All lookahead is done on the remaining
/// slice without moving the cursor.

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Lexer<'a> {
        Lexer { src, pos: 0 }
    }

    /// Characters consumed so far.
    pub fn offset(&self) -> Offset {
        self.src[..self.pos].chars().count()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn follow(&mut self, expect: char, yes: Operator, no: Operator) -> Token {
        if self.peek() == Some(expect) {
            self.bump();
            Token::Operator(yes)
        } else {
            Token::Operator(no)
        }
    }

    fn follow2(
        &mut self,
        (expect1, yes1): (char, Operator),
        (expect2, yes2): (char, Operator),
        no: Operator,
    ) -> Token {
        match self.peek() {
            Some(c) if c == expect1 => {
                self.bump();
                Token::Operator(yes1)
            }
            Some(c) if c == expect2 => {
                self.bump();
                Token::Operator(yes2)
            }
            _ => Token::Operator(no),
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_blank();
        let c = match self.peek() {
            None => return Ok(Token::End),
            Some(c) => c,
        };
        if c.is_ascii_digit() {
            return self.number();
        }
        if is_ident_start(c) {
            return Ok(self.word());
        }
        if c == '"' {
            return Ok(self.string());
        }
        Ok(self.operator())
    }

    fn skip_blank(&mut self) {
        loop {
            let rest = self.rest();
            if rest.starts_with("\\\n") {
                self.pos += 2;
            } else if rest.starts_with(is_blank) {
                self.pos += 1;
            } else if rest.starts_with('#') {
                // A comment ends at a newline, which is kept, or at a line
                // continuation, which is not.
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    if self.rest().starts_with("\\\n") {
                        self.pos += 2;
                        break;
                    }
                    self.bump();
                }
            } else {
                return;
            }
        }
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        match self.src[start..self.pos].parse::<i32>() {
            Ok(n) => Ok(Token::Number(n)),
            Err(_) => Err(error!(SyntaxError, ..self.offset(); "number too large")),
        }
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        self.bump();
        while self.peek().map_or(false, is_ident) {
            self.pos += 1;
        }
        let word = &self.src[start..self.pos];
        if word == "define" {
            self.pos = start;
            return Token::End;
        }
        match Word::from_str(word) {
            Some(Word::Delete) if !delete_is_keyword(self.rest()) => Token::Symbol(word.into()),
            Some(w) => Token::Word(w),
            None => Token::Symbol(word.into()),
        }
    }

    /// Quoted string with C style escapes. A hex or octal escape that comes
    /// to zero is not an escape: the backslash is dropped and the rest is
    /// read again as plain text.
    fn string(&mut self) -> Token {
        let mut s = String::new();
        self.bump();
        while let Some(c) = self.peek() {
            if c == '"' || c == '\n' {
                break;
            }
            if c != '\\' {
                s.push(c);
                self.bump();
                continue;
            }
            let backslash = self.pos;
            self.bump();
            match self.peek() {
                Some('\n') => {
                    self.bump();
                }
                Some('x') => {
                    self.bump();
                    match self.hex_value() {
                        None => s.push('x'),
                        Some(0) => self.pos = backslash + 1,
                        Some(n) => s.push(char::from(n)),
                    }
                }
                Some(d) if d.is_digit(8) => match self.octal_value() {
                    Some(n) if n != 0 => s.push(char::from(n)),
                    _ => self.pos = backslash + 1,
                },
                Some(e) => {
                    if let Some(r) = named_escape(e) {
                        s.push(r);
                        self.bump();
                    }
                }
                None => {}
            }
        }
        // An unterminated string takes the newline with it.
        if let Some('"') | Some('\n') = self.peek() {
            self.bump();
        }
        Token::String(s)
    }

    /// Up to two hex digits.
    fn hex_value(&mut self) -> Option<u8> {
        let mut value = self.peek()?.to_digit(16)?;
        self.bump();
        if let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
            value = value * 16 + d;
            self.bump();
        }
        Some(value as u8)
    }

    /// An optional leading zero then up to three octal digits, taking the
    /// third only while the value still fits in a byte.
    fn octal_value(&mut self) -> Option<u8> {
        if self.peek() == Some('0') {
            self.bump();
        }
        let mut value = self.peek()?.to_digit(8)?;
        self.bump();
        if let Some(d) = self.peek().and_then(|c| c.to_digit(8)) {
            value = value * 8 + d;
            self.bump();
            if value <= 0o37 {
                if let Some(d) = self.peek().and_then(|c| c.to_digit(8)) {
                    value = value * 8 + d;
                    self.bump();
                }
            }
        }
        Some(value as u8)
    }

    fn operator(&mut self) -> Token {
        use Operator::*;
        let c = match self.bump() {
            Some(c) => c,
            None => return Token::End,
        };
        match c {
            '\n' => Token::Newline,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '>' => self.follow('=', GreaterEqual, Greater),
            '<' => self.follow('=', LessEqual, Less),
            '=' => self.follow('=', Equal, Assign),
            '!' => self.follow('=', NotEqual, Not),
            '+' => self.follow2(('+', Incr), ('=', AddAssign), Plus),
            '-' => self.follow2(('-', Decr), ('=', SubAssign), Minus),
            '|' => self.follow2(('|', Or), ('=', OrAssign), BitOr),
            '&' => self.follow2(('&', And), ('=', AndAssign), BitAnd),
            '*' => self.follow2(('*', Power), ('=', MulAssign), Multiply),
            '/' => self.follow('=', DivAssign, Divide),
            '%' => self.follow('=', ModAssign, Modulo),
            '^' => Token::Operator(Power),
            c => Token::Unknown(c),
        }
    }
}
