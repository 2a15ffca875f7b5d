use super::Array;
use crate::error;
use crate::lang::Error;
use std::cell::RefCell;
use std::convert::TryFrom;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Runtime values
///
/// Strings share their storage. Arrays are shared while on the stack and
/// copied when assigned to a variable.

#[derive(Debug, Clone)]
pub enum Val {
    NoValue,
    Integer(i32),
    String(Rc<str>),
    Array(Rc<RefCell<Array>>),
}

impl Default for Val {
    fn default() -> Val {
        Val::NoValue
    }
}

impl Val {
    pub fn is_set(&self) -> bool {
        !matches!(self, Val::NoValue)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Val::Array(_))
    }

    pub fn new_array() -> Val {
        Val::Array(Rc::new(RefCell::new(Array::default())))
    }

    pub fn to_int(&self) -> Result<i32> {
        match self {
            Val::Integer(n) => Ok(*n),
            Val::String(s) => match string_to_num(s) {
                Some(n) => Ok(n),
                None => Err(error!(NotANumber; &format!("\"{}\"", s))),
            },
            Val::Array(_) => Err(error!(TypeMismatch; "can't convert array to integer")),
            Val::NoValue => Err(error!(TypeMismatch; "can't convert unset value to integer")),
        }
    }

    pub fn to_str(&self) -> Result<Rc<str>> {
        match self {
            Val::Integer(n) => Ok(n.to_string().into()),
            Val::String(s) => Ok(s.clone()),
            Val::Array(_) => Err(error!(TypeMismatch; "can't convert array to string")),
            Val::NoValue => Err(error!(TypeMismatch; "can't convert unset value to string")),
        }
    }

    pub fn to_bool(&self) -> Result<bool> {
        Ok(self.to_int()? != 0)
    }

    /// Value semantics for assignment: arrays are copied all the way down.
    pub fn deep_copy(&self) -> Val {
        match self {
            Val::Array(a) => Val::Array(Rc::new(RefCell::new(a.borrow().deep_copy()))),
            _ => self.clone(),
        }
    }
}

/// Parse an integer the way the macro language reads numeric strings:
/// optional blanks, an optional sign, at least one digit, optional blanks.
pub fn string_to_num(s: &str) -> Option<i32> {
    let trimmed = s.trim_matches(|c: char| c == ' ' || c == '\t');
    let digits = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n = i64::from_str_radix(digits, 10).ok()?;
    let n = if trimmed.starts_with('-') { -n } else { n };
    i32::try_from(n).ok()
}

impl PartialEq for Val {
    fn eq(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::NoValue, Val::NoValue) => true,
            (Val::Integer(l), Val::Integer(r)) => l == r,
            (Val::String(l), Val::String(r)) => l == r,
            (Val::Array(l), Val::Array(r)) => Rc::ptr_eq(l, r) || *l.borrow() == *r.borrow(),
            _ => false,
        }
    }
}

impl From<i32> for Val {
    fn from(n: i32) -> Val {
        Val::Integer(n)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Val {
        Val::Integer(b as i32)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Val {
        Val::String(s.into())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Val {
        Val::String(s.into())
    }
}

impl From<Array> for Val {
    fn from(a: Array) -> Val {
        Val::Array(Rc::new(RefCell::new(a)))
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Val::NoValue => Ok(()),
            Val::Integer(n) => write!(f, "{}", n),
            Val::String(s) => write!(f, "{}", s),
            Val::Array(a) => write!(f, "{}", a.borrow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_num() {
        assert_eq!(string_to_num("42"), Some(42));
        assert_eq!(string_to_num(" \t-7 "), Some(-7));
        assert_eq!(string_to_num("+3"), Some(3));
        assert_eq!(string_to_num("3x"), None);
        assert_eq!(string_to_num("-"), None);
        assert_eq!(string_to_num(""), None);
        assert_eq!(string_to_num("99999999999"), None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Val::from("12").to_int(), Ok(12));
        assert_eq!(Val::from(5).to_str().unwrap().as_ref(), "5");
        assert!(Val::from("abc").to_int().is_err());
        assert!(Val::new_array().to_str().is_err());
        assert!(Val::NoValue.to_int().is_err());
    }

    #[test]
    fn test_deep_copy_detaches() {
        let a = Val::new_array();
        if let Val::Array(arr) = &a {
            arr.borrow_mut().insert("k".into(), Val::from(1));
        }
        let b = a.deep_copy();
        if let Val::Array(arr) = &a {
            arr.borrow_mut().insert("k".into(), Val::from(2));
        }
        if let Val::Array(arr) = &b {
            assert_eq!(arr.borrow().get("k"), Some(&Val::from(1)));
        }
    }
}
