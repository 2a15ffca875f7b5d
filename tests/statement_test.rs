mod common;
use common::*;
use nmacro::mach::Runtime;

#[test]
fn test_if_else() {
    let mut r = Runtime::default();
    r.enter("x = 2\nif (x > 1)\n  s = \"big\"\nelse\n  s = \"small\"\nreturn s\n");
    assert_eq!(exec(&mut r), "big\n");
    r.enter("x = 0\nif (x > 1) {\n  s = \"big\"\n}\nelse {\n  s = \"small\"\n}\nreturn s\n");
    assert_eq!(exec(&mut r), "small\n");
}

#[test]
fn test_while() {
    let mut r = Runtime::default();
    r.enter("n = 0\nwhile (n < 10)\n  n += 3\nreturn n\n");
    assert_eq!(exec(&mut r), "12\n");
}

#[test]
fn test_for_runs_increment_after_body() {
    let mut r = Runtime::default();
    r.enter("s = \"\"\nfor (i = 0; i < 5; i++) { s = s i }\nreturn s\n");
    assert_eq!(exec(&mut r), "01234\n");
}

#[test]
fn test_for_matches_unrolled() {
    let mut r = Runtime::default();
    r.enter("s = \"\"\ns = s 0\ns = s 1\ns = s 2\ns = s 3\ns = s 4\nreturn s\n");
    let unrolled = exec(&mut r);
    r.enter("s = \"\"\nfor (i = 0; i < 5; i++) {\n  s = s i\n}\nreturn s\n");
    assert_eq!(exec(&mut r), unrolled);
}

#[test]
fn test_for_with_comma_clauses() {
    let mut r = Runtime::default();
    r.enter("for (i = 0, j = 10; i < j; i++, j--) {\n}\nreturn i \" \" j\n");
    assert_eq!(exec(&mut r), "5 5\n");
}

#[test]
fn test_for_with_empty_clauses() {
    let mut r = Runtime::default();
    r.enter("i = 0\nfor (;;) {\n  if (++i == 4)\n    break\n}\nreturn i\n");
    assert_eq!(exec(&mut r), "4\n");
}

#[test]
fn test_continue_runs_increment() {
    let mut r = Runtime::default();
    r.enter("s = \"\"\nfor (i = 0; i < 6; i++) {\n  if (i % 2)\n    continue\n  s = s i\n}\nreturn s\n");
    assert_eq!(exec(&mut r), "024\n");
}

#[test]
fn test_nested_break() {
    let mut r = Runtime::default();
    r.enter(
        "n = 0\nfor (i = 0; i < 3; i++) {\n  while (1) {\n    n++\n    break\n  }\n}\nreturn n\n",
    );
    assert_eq!(exec(&mut r), "3\n");
}

#[test]
fn test_break_outside_loop() {
    let mut r = Runtime::default();
    assert!(!r.enter("x = 1\nbreak\n"));
    assert_eq!(exec(&mut r), "break outside loop at 11\n");
    assert!(!r.enter("continue\n"));
    assert_eq!(exec(&mut r), "continue outside loop at 8\n");
}

#[test]
fn test_syntax_error_runs_nothing() {
    let mut r = Runtime::default();
    assert!(!r.enter("$x = 1\n$y = (2\n"));
    assert_eq!(exec(&mut r), "syntax error at 15: expected ')'\n");
    assert_eq!(r.global("$x"), None);
}

#[test]
fn test_braced_body() {
    let mut r = Runtime::default();
    r.enter("{\n  return 7\n}\n");
    assert_eq!(exec(&mut r), "7\n");
}

#[test]
fn test_delete_keeps_identifier_meaning() {
    let mut r = Runtime::default();
    r.enter("delete = 5\nreturn delete + 1\n");
    assert_eq!(exec(&mut r), "6\n");
}

#[test]
fn test_long_loop_yields() {
    let mut r = Runtime::default();
    r.enter("n = 0\nwhile (n < 3000)\n  n++\nreturn n\n");
    assert_eq!(exec_n(&mut r, 100000), "3000\n");
    r.enter("n = 0\nwhile (n < 3000)\n  n++\nreturn n\n");
    assert_eq!(exec_n(&mut r, 1000), "\n1000 Execution cycles exceeded.\n");
}
