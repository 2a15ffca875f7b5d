use super::*;
use crate::lang::{compile, ErrorCode};
use crate::mach::{Limits, Val};
use std::sync::Arc;

#[test]
fn test_recursive_subroutine() {
    let mut r = Runtime::default();
    r.enter("define fact {\nif ($1 <= 1)\nreturn 1\nreturn $1 * fact($1 - 1)\n}\nreturn fact(5)\n");
    assert_eq!(run(&mut r), "120\n");
}

#[test]
fn test_excessive_recursion() {
    let mut r = Runtime::default();
    r.enter("define f {\nreturn f()\n}\nf()\n");
    assert_eq!(run(&mut r), "excessive recursion\n");
}

#[test]
fn test_missing_return_value() {
    let mut r = Runtime::default();
    r.enter("define g {\nx = 1\n}\ny = g()\n");
    assert_eq!(run(&mut r), "subroutine does not return a value: g\n");
}

#[test]
fn test_statement_call_discards_value() {
    let mut r = Runtime::default();
    r.enter("define h {\nreturn 3\n}\nh()\nreturn 4\n");
    assert_eq!(run(&mut r), "4\n");
}

#[test]
fn test_undefined_subroutine() {
    let mut r = Runtime::default();
    r.enter("nope(1)\n");
    assert_eq!(run(&mut r), "not a function or subroutine: nope\n");
}

#[test]
fn test_arguments() {
    let mut r = Runtime::default();
    r.enter("define f {\nreturn $args[] \" \" $1 \" \" $args[2]\n}\nreturn f(\"a\", 7)\n");
    assert_eq!(run(&mut r), "2 a 7\n");
    r.enter("define f {\nreturn $3\n}\nreturn f(1)\n");
    assert_eq!(run(&mut r), "referenced undefined argument: $3\n");
    r.enter("define f {\n$1 = 2\n}\nf(1)\n");
    assert_eq!(run(&mut r), "assignment to function argument: $1\n");
}

#[test]
fn test_locals_are_per_frame() {
    let mut r = Runtime::default();
    r.enter("define f {\nx = 5\nreturn x\n}\nx = 1\ny = f()\nreturn x y\n");
    assert_eq!(run(&mut r), "15\n");
}

#[test]
fn test_globals_are_shared() {
    let mut r = Runtime::default();
    r.enter("$g = 1\ndefine f {\nreturn $g + 1\n}\nreturn f()\n");
    assert_eq!(run(&mut r), "2\n");
    assert_eq!(r.global("$g"), Some(&Val::from(1)));
}

#[test]
fn test_unset_variable() {
    let mut r = Runtime::default();
    r.enter("return z\n");
    assert_eq!(run(&mut r), "variable not set: z\n");
}

#[test]
fn test_output_precedes_result() {
    let mut r = Runtime::default();
    r.enter("t_print(\"a\")\nreturn 1\n");
    assert_eq!(run(&mut r), "a1\n");
    r.enter("return t_print(\"x\")\n");
    assert_eq!(run(&mut r), "xsubroutine does not return a value: t_print\n");
}

#[test]
fn test_error_keeps_globals() {
    let mut r = Runtime::default();
    r.enter("$a = 1\n$b = 1 / 0\n");
    assert_eq!(run(&mut r), "division by zero\n");
    r.enter("return $a\n");
    assert_eq!(run(&mut r), "1\n");
}

#[test]
fn test_call() {
    let program = Arc::new(compile("return $1 + $2\n").unwrap().program);
    let mut r = Runtime::default();
    assert_eq!(
        r.call(program.clone(), vec![Val::from(2), Val::from(3)]),
        Ok(Val::from(5))
    );
    assert_eq!(
        r.call(program, vec![Val::from(2), Val::from("x")])
            .unwrap_err()
            .code(),
        ErrorCode::NotANumber
    );
}

#[test]
fn test_interrupt() {
    let mut r = Runtime::default();
    r.enter("while (1) {\n}\n");
    assert!(matches!(r.execute(100), Event::Running));
    r.interrupt();
    match r.execute(100) {
        Event::Errors(errors) => assert_eq!(errors[0].code(), ErrorCode::Interrupted),
        event => panic!("{:?}", event),
    }
    assert!(matches!(r.execute(100), Event::Stopped));
}

#[test]
fn test_stack_limit() {
    let mut r = Runtime::with_limits(Limits {
        stack: 4,
        ..Limits::default()
    });
    r.enter("return 1 + (2 + (3 + (4 + 5)))\n");
    assert_eq!(run(&mut r), "macro stack overflow\n");
}
