mod common;
use common::*;
use nmacro::lang::Error;
use nmacro::mach::{Function, Runtime, Val};

#[test]
fn test_string_builtins() {
    let mut r = Runtime::default();
    r.enter("return length(\"abc\") substring(\"hello\", 1, 3)\n");
    assert_eq!(exec(&mut r), "3el\n");
    r.enter("return toupper(\"ab\") tolower(\"CD\") min(4, 2, 9) max(-1, -5)\n");
    assert_eq!(exec(&mut r), "ABcd2-1\n");
    r.enter("return replace_substring(\"hello\", 0, 1, \"J\")\n");
    assert_eq!(exec(&mut r), "Jello\n");
    r.enter("return search_string(\"a.b.c\", \".\", 2)\n");
    assert_eq!(exec(&mut r), "3\n");
}

#[test]
fn test_split_iterates_in_order() {
    let mut r = Runtime::default();
    r.enter(
        r#"a = split("x,y,z", ",")
for (k in a)
    t_print(k "=" a[k] ";")
return a[1]
"#,
    );
    assert_eq!(exec(&mut r), "0=x;1=y;2=z;y\n");
}

#[test]
fn test_t_print_joins_arguments() {
    let mut r = Runtime::default();
    r.enter("t_print(\"a\", 1, 2 + 3)\nt_print(\"\\n\")\n");
    assert_eq!(exec(&mut r), "a 1 5\n");
}

#[test]
fn test_builtin_errors() {
    let mut r = Runtime::default();
    r.enter("x = length()\n");
    assert_eq!(exec(&mut r), "wrong number of arguments to function: length\n");
    r.enter("x = split(\"a\", \"\")\n");
    assert_eq!(
        exec(&mut r),
        "type mismatch: second argument to split cannot be an empty string\n"
    );
}

#[test]
fn test_builtin_without_value() {
    let mut r = Runtime::default();
    r.enter("x = t_print(\"a\")\n");
    assert_eq!(exec(&mut r), "asubroutine does not return a value: t_print\n");
}

#[test]
fn test_register_builtin() {
    let mut r = Runtime::default();
    r.register(
        "twice",
        Function::builtin(|_, args| -> Result<Val, Error> {
            Ok(Val::from(args[0].to_int()? * 2))
        }),
    );
    r.enter("return twice(21)\n");
    assert_eq!(exec(&mut r), "42\n");
}

#[test]
fn test_subroutine_arguments() {
    let mut r = Runtime::default();
    r.enter("define add {\nreturn $1 + $2\n}\nreturn add(2, 3)\n");
    assert_eq!(exec(&mut r), "5\n");
}

#[test]
fn test_redefinition_replaces() {
    let mut r = Runtime::default();
    r.enter("define f {\nreturn 1\n}\ndefine f {\nreturn 2\n}\nreturn f()\n");
    assert_eq!(exec(&mut r), "2\n");
    r.enter("define f {\nreturn 3\n}\n");
    assert_eq!(exec(&mut r), "");
    r.enter("return f()\n");
    assert_eq!(exec(&mut r), "3\n");
}

#[test]
fn test_define_shadows_builtin() {
    let mut r = Runtime::default();
    r.enter("define length {\nreturn -1\n}\nreturn length(\"abc\")\n");
    assert_eq!(exec(&mut r), "-1\n");
}

#[test]
fn test_define_takes_effect_in_order() {
    let mut r = Runtime::default();
    r.enter("x = g()\ndefine g {\nreturn 1\n}\n");
    assert_eq!(exec(&mut r), "not a function or subroutine: g\n");
    r.enter("return g()\n");
    assert_eq!(exec(&mut r), "1\n");
}

#[test]
fn test_earlier_items_survive_compile_error() {
    let mut r = Runtime::default();
    assert!(!r.enter("$a = 1\ndefine f {\nreturn (\n}\n"));
    let out = exec(&mut r);
    assert!(out.starts_with("syntax error at"), "{}", out);
    r.enter("return $a\n");
    assert_eq!(exec(&mut r), "1\n");
    r.enter("x = f()\n");
    assert_eq!(exec(&mut r), "not a function or subroutine: f\n");
}
