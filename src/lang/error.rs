use super::Offset;

/// A compile-time or runtime diagnostic.
///
/// Compile errors carry the character offset where the scanner stopped.
/// Runtime errors have no position since bytecode keeps no source mapping.
#[derive(Clone, PartialEq)]
pub struct Error {
    code: ErrorCode,
    offset: Option<Offset>,
    message: String,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident, ..$offset:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).at($offset)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
    ($err:ident, ..$offset:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .at($offset)
            .message($msg)
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code,
            offset: None,
            message: String::new(),
        }
    }

    pub fn at(self, offset: Offset) -> Error {
        Error {
            offset: Some(offset),
            ..self
        }
    }

    pub fn message(self, message: &str) -> Error {
        debug_assert!(self.message.is_empty());
        Error {
            message: message.to_string(),
            ..self
        }
    }

    /// Shift the offset of an error found in a slice of a larger text.
    pub fn rebase(self, base: Offset) -> Error {
        Error {
            offset: self.offset.map(|o| o + base),
            ..self
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn offset(&self) -> Option<Offset> {
        self.offset
    }

    pub fn detail(&self) -> &str {
        &self.message
    }

    pub fn is_compile(&self) -> bool {
        (self.code as u16) < 20
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    SyntaxError = 1,
    BreakOutsideLoop = 2,
    ContinueOutsideLoop = 3,
    MacroTooLarge = 4,
    ExpectedIdentifier = 5,
    ExpectedBrace = 6,

    TypeMismatch = 20,
    NotANumber = 21,
    DivisionByZero = 22,
    ModuloByZero = 23,
    VariableNotSet = 24,
    UndefinedArgument = 25,
    UndefinedSubroutine = 26,
    NotAnArray = 27,
    KeyNotFound = 28,
    WrongArgumentCount = 29,
    NoReturnValue = 30,
    AssignToArgument = 31,
    NotAnLvalue = 32,
    StackOverflow = 33,
    StackUnderflow = 34,
    ExcessiveRecursion = 35,
    Interrupted = 36,
    OutOfRange = 37,
    InternalError = 51,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ErrorCode::*;
        let s = match self {
            SyntaxError => "syntax error",
            BreakOutsideLoop => "break outside loop",
            ContinueOutsideLoop => "continue outside loop",
            MacroTooLarge => "macro too large",
            ExpectedIdentifier => "expected identifier",
            ExpectedBrace => "expected '{'",
            TypeMismatch => "type mismatch",
            NotANumber => "string could not be converted to number",
            DivisionByZero => "division by zero",
            ModuloByZero => "modulo by zero",
            VariableNotSet => "variable not set",
            UndefinedArgument => "referenced undefined argument",
            UndefinedSubroutine => "not a function or subroutine",
            NotAnArray => "operator [] on non-array",
            KeyNotFound => "referenced array value not in array",
            WrongArgumentCount => "wrong number of arguments to function",
            NoReturnValue => "subroutine does not return a value",
            AssignToArgument => "assignment to function argument",
            NotAnLvalue => "assignment to non-variable",
            StackOverflow => "macro stack overflow",
            StackUnderflow => "macro stack underflow",
            ExcessiveRecursion => "excessive recursion",
            Interrupted => "interrupted",
            OutOfRange => "result out of range",
            InternalError => "internal error",
        };
        write!(f, "{}", s)
    }
}

impl std::error::Error for Error {}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(offset) = self.offset {
            write!(f, " at {}", offset)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}
