/// ## Lexical tokens
///
/// Identifiers keep their spelling; the parser interns them into the
/// symbol table, which decides their kind from the spelling alone.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(i32),
    String(String),
    Symbol(String),
    Word(Word),
    Operator(Operator),
    Newline,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Unknown(char),
    /// End of input, or the start of a `define`.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Word {
    While,
    If,
    Else,
    For,
    Break,
    Continue,
    Return,
    In,
    Delete,
    Args,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operator {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    Incr,
    Decr,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Power,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    Not,
    And,
    Or,
    BitAnd,
    BitOr,
}

impl Word {
    pub fn from_str(s: &str) -> Option<Word> {
        use Word::*;
        Some(match s {
            "while" => While,
            "if" => If,
            "else" => Else,
            "for" => For,
            "break" => Break,
            "continue" => Continue,
            "return" => Return,
            "in" => In,
            "delete" => Delete,
            "$args" => Args,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Token::*;
        match self {
            Number(n) => write!(f, "{}", n),
            String(s) => write!(f, "{:?}", s),
            Symbol(s) => write!(f, "{}", s),
            Word(w) => write!(f, "{}", w),
            Operator(o) => write!(f, "{}", o),
            Newline => write!(f, "newline"),
            LParen => write!(f, "("),
            RParen => write!(f, ")"),
            LBracket => write!(f, "["),
            RBracket => write!(f, "]"),
            LBrace => write!(f, "{{"),
            RBrace => write!(f, "}}"),
            Comma => write!(f, ","),
            Semicolon => write!(f, ";"),
            Unknown(c) => write!(f, "{:?}", c),
            End => write!(f, "end of input"),
        }
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Word::*;
        match self {
            While => write!(f, "while"),
            If => write!(f, "if"),
            Else => write!(f, "else"),
            For => write!(f, "for"),
            Break => write!(f, "break"),
            Continue => write!(f, "continue"),
            Return => write!(f, "return"),
            In => write!(f, "in"),
            Delete => write!(f, "delete"),
            Args => write!(f, "$args"),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Operator::*;
        match self {
            Assign => write!(f, "="),
            AddAssign => write!(f, "+="),
            SubAssign => write!(f, "-="),
            MulAssign => write!(f, "*="),
            DivAssign => write!(f, "/="),
            ModAssign => write!(f, "%="),
            AndAssign => write!(f, "&="),
            OrAssign => write!(f, "|="),
            Incr => write!(f, "++"),
            Decr => write!(f, "--"),
            Plus => write!(f, "+"),
            Minus => write!(f, "-"),
            Multiply => write!(f, "*"),
            Divide => write!(f, "/"),
            Modulo => write!(f, "%"),
            Power => write!(f, "**"),
            Greater => write!(f, ">"),
            GreaterEqual => write!(f, ">="),
            Less => write!(f, "<"),
            LessEqual => write!(f, "<="),
            Equal => write!(f, "=="),
            NotEqual => write!(f, "!="),
            Not => write!(f, "!"),
            And => write!(f, "&&"),
            Or => write!(f, "||"),
            BitAnd => write!(f, "&"),
            BitOr => write!(f, "|"),
        }
    }
}
