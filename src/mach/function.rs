use super::{Array, Program, Runtime, Val};
use crate::error;
use crate::lang::Error;
use std::ops::RangeInclusive;
use std::rc::Rc;
use std::sync::Arc;

type Result<T> = std::result::Result<T, Error>;

/// A host subroutine. Returning `Val::NoValue` means no return value.
pub type Builtin = Rc<dyn Fn(&mut Runtime, &[Val]) -> Result<Val>>;

/// ## Callable subroutines
///
/// Calls resolve by name at run time against this registry, which holds
/// both host built-ins and subroutines compiled from `define` blocks.

#[derive(Clone)]
pub enum Function {
    Builtin(Builtin),
    Macro(Arc<Program>),
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Function::Builtin(_) => write!(f, "Builtin"),
            Function::Macro(p) => write!(f, "Macro({} ops)", p.len()),
        }
    }
}

impl Function {
    pub fn builtin<F>(f: F) -> Function
    where
        F: Fn(&mut Runtime, &[Val]) -> Result<Val> + 'static,
    {
        Function::Builtin(Rc::new(f))
    }

    /// The built-ins every runtime starts with.
    pub fn standard() -> Vec<(&'static str, Function)> {
        vec![
            ("length", Function::builtin(length)),
            ("min", Function::builtin(min)),
            ("max", Function::builtin(max)),
            ("substring", Function::builtin(substring)),
            ("replace_substring", Function::builtin(replace_substring)),
            ("toupper", Function::builtin(toupper)),
            ("tolower", Function::builtin(tolower)),
            ("valid_number", Function::builtin(valid_number)),
            ("string_compare", Function::builtin(string_compare)),
            ("split", Function::builtin(split)),
            ("search_string", Function::builtin(search_string)),
            ("t_print", Function::builtin(t_print)),
            ("getenv", Function::builtin(getenv)),
        ]
    }
}

fn arity(name: &str, args: &[Val], range: RangeInclusive<usize>) -> Result<()> {
    if range.contains(&args.len()) {
        Ok(())
    } else {
        Err(error!(WrongArgumentCount; name))
    }
}

fn chars(val: &Val) -> Result<Vec<char>> {
    Ok(val.to_str()?.chars().collect())
}

/// Clamp a position that may count back from the end.
fn position(pos: i32, len: usize) -> usize {
    let len = len as i64;
    let mut pos = pos as i64;
    if pos < 0 {
        pos += len;
    }
    pos.max(0).min(len) as usize
}

fn length(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("length", args, 1..=1)?;
    Ok(Val::Integer(args[0].to_str()?.chars().count() as i32))
}

fn min(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("min", args, 2..=usize::MAX)?;
    let mut n = args[0].to_int()?;
    for arg in &args[1..] {
        n = n.min(arg.to_int()?);
    }
    Ok(Val::Integer(n))
}

fn max(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("max", args, 2..=usize::MAX)?;
    let mut n = args[0].to_int()?;
    for arg in &args[1..] {
        n = n.max(arg.to_int()?);
    }
    Ok(Val::Integer(n))
}

fn substring(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("substring", args, 2..=3)?;
    let s = chars(&args[0])?;
    let from = position(args[1].to_int()?, s.len());
    let to = match args.get(2) {
        Some(to) => position(to.to_int()?, s.len()),
        None => s.len(),
    };
    let to = to.max(from);
    Ok(Val::from(s[from..to].iter().collect::<String>()))
}

fn replace_substring(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("replace_substring", args, 4..=4)?;
    let s = chars(&args[0])?;
    let clamp = |v: &Val| -> Result<usize> {
        Ok(v.to_int()?.max(0).min(s.len() as i32) as usize)
    };
    let (mut from, mut to) = (clamp(&args[1])?, clamp(&args[2])?);
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }
    let mut out: String = s[..from].iter().collect();
    out.push_str(&args[3].to_str()?);
    out.extend(&s[to..]);
    Ok(Val::from(out))
}

fn toupper(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("toupper", args, 1..=1)?;
    Ok(Val::from(args[0].to_str()?.to_ascii_uppercase()))
}

fn tolower(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("tolower", args, 1..=1)?;
    Ok(Val::from(args[0].to_str()?.to_ascii_lowercase()))
}

fn valid_number(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("valid_number", args, 1..=1)?;
    Ok(Val::from(args[0].to_int().is_ok()))
}

fn string_compare(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("string_compare", args, 2..=3)?;
    let (mut l, mut r) = (args[0].to_str()?.to_string(), args[1].to_str()?.to_string());
    if let Some(option) = args.get(2) {
        match option.to_str()?.as_ref() {
            "case" => {}
            "nocase" => {
                l = l.to_lowercase();
                r = r.to_lowercase();
            }
            other => {
                let msg = format!("unrecognized argument to string_compare: {}", other);
                return Err(error!(TypeMismatch; &msg));
            }
        }
    }
    Ok(Val::Integer(l.cmp(&r) as i32))
}

/// Always yields at least one element, so `split("", ",")` is `{"0": ""}`.
fn split(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("split", args, 2..=2)?;
    let s = args[0].to_str()?;
    let sep = args[1].to_str()?;
    if sep.is_empty() {
        return Err(error!(TypeMismatch; "second argument to split cannot be an empty string"));
    }
    let mut array = Array::new();
    for (index, part) in s.split(sep.as_ref()).enumerate() {
        array.insert(index.to_string().into(), Val::from(part));
    }
    Ok(Val::from(array))
}

/// Literal search from a start position. Options may be "case", "nocase",
/// "forward" or "backward". Returns the match position or -1.
fn search_string(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("search_string", args, 3..=5)?;
    let mut fold = false;
    let mut backward = false;
    for option in &args[3..] {
        match option.to_str()?.as_ref() {
            "case" | "literal" => fold = false,
            "nocase" => fold = true,
            "forward" => backward = false,
            "backward" => backward = true,
            other => {
                let msg = format!("unrecognized argument to search_string: {}", other);
                return Err(error!(TypeMismatch; &msg));
            }
        }
    }
    let normalize = |v: &Val| -> Result<Vec<char>> {
        let c = chars(v)?;
        if fold {
            Ok(c.iter().map(|c| c.to_ascii_lowercase()).collect())
        } else {
            Ok(c)
        }
    };
    let hay = normalize(&args[0])?;
    let needle = normalize(&args[1])?;
    let start = position(args[2].to_int()?, hay.len());
    let matches_at =
        |i: usize| hay.len() >= i + needle.len() && hay[i..i + needle.len()] == needle[..];
    let found = if backward {
        (0..=start).rev().find(|&i| matches_at(i))
    } else {
        (start..=hay.len()).find(|&i| matches_at(i))
    };
    Ok(Val::Integer(found.map(|i| i as i32).unwrap_or(-1)))
}

fn t_print(rt: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("t_print", args, 1..=usize::MAX)?;
    let mut parts = vec![];
    for arg in args {
        parts.push(arg.to_str()?.to_string());
    }
    rt.print(&parts.join(" "));
    Ok(Val::NoValue)
}

fn getenv(_: &mut Runtime, args: &[Val]) -> Result<Val> {
    arity("getenv", args, 1..=1)?;
    let name = args[0].to_str()?;
    Ok(Val::from(std::env::var(name.as_ref()).unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    fn call(f: fn(&mut Runtime, &[Val]) -> Result<Val>, args: &[Val]) -> Result<Val> {
        let mut rt = Runtime::default();
        f(&mut rt, args)
    }

    #[test]
    fn test_substring() {
        let s = Val::from("abcdef");
        assert_eq!(call(substring, &[s.clone(), Val::from(2)]), Ok(Val::from("cdef")));
        assert_eq!(call(substring, &[s.clone(), Val::from(1), Val::from(3)]), Ok(Val::from("bc")));
        assert_eq!(call(substring, &[s.clone(), Val::from(-2)]), Ok(Val::from("ef")));
        assert_eq!(call(substring, &[s.clone(), Val::from(4), Val::from(2)]), Ok(Val::from("")));
        assert_eq!(call(substring, &[s, Val::from(0), Val::from(99)]), Ok(Val::from("abcdef")));
    }

    #[test]
    fn test_min_max_arity() {
        assert_eq!(call(min, &[Val::from(3), Val::from(-1), Val::from(2)]), Ok(Val::from(-1)));
        assert_eq!(call(max, &[Val::from(3), Val::from("7")]), Ok(Val::from(7)));
        assert_eq!(
            call(min, &[Val::from(3)]).unwrap_err().code(),
            ErrorCode::WrongArgumentCount
        );
    }

    #[test]
    fn test_split() {
        let parts = call(split, &[Val::from("1,2,"), Val::from(",")]).unwrap();
        assert_eq!(parts.to_string(), r#"{"0": "1", "1": "2", "2": ""}"#);
        let parts = call(split, &[Val::from(""), Val::from(",")]).unwrap();
        assert_eq!(parts.to_string(), r#"{"0": ""}"#);
        assert!(call(split, &[Val::from("a"), Val::from("")]).is_err());
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call(length, &[Val::from("héllo")]), Ok(Val::from(5)));
        assert_eq!(call(toupper, &[Val::from("abC")]), Ok(Val::from("ABC")));
        assert_eq!(call(valid_number, &[Val::from(" 12 ")]), Ok(Val::from(1)));
        assert_eq!(call(valid_number, &[Val::from("1x")]), Ok(Val::from(0)));
        assert_eq!(
            call(string_compare, &[Val::from("a"), Val::from("B"), Val::from("nocase")]),
            Ok(Val::from(-1))
        );
        assert_eq!(
            call(
                replace_substring,
                &[Val::from("hello"), Val::from(1), Val::from(3), Val::from("EY")]
            ),
            Ok(Val::from("hEYlo"))
        );
        assert_eq!(
            call(search_string, &[Val::from("abcabc"), Val::from("c"), Val::from(3)]),
            Ok(Val::from(5))
        );
        assert_eq!(
            call(
                search_string,
                &[
                    Val::from("abcabc"),
                    Val::from("C"),
                    Val::from(4),
                    Val::from("nocase"),
                    Val::from("backward"),
                ]
            ),
            Ok(Val::from(2))
        );
        assert_eq!(
            call(search_string, &[Val::from("abc"), Val::from("z"), Val::from(0)]),
            Ok(Val::from(-1))
        );
    }

    #[test]
    fn test_t_print() {
        let mut rt = Runtime::default();
        assert_eq!(t_print(&mut rt, &[Val::from("a"), Val::from(1)]), Ok(Val::NoValue));
        assert_eq!(rt.take_output(), "a 1");
    }
}
