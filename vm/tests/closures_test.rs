//! Closure capture semantics.
//!
//! Upvalues are value snapshots taken at closure-creation time: writes
//! through `SET_UPVALUE` land in the executing closure's own upvalue array
//! and are visible to later reads through that closure, but never to the
//! enclosing function's locals.

use compiler::Compiler;
use stilt_parser::parse_program;
use vm::{RuntimeError, Vm};

fn exec(source: &str) -> Result<String, RuntimeError> {
    let program = parse_program(source).expect("source parses");
    let script = Compiler::new().compile(&program).expect("source compiles");
    let mut out = Vec::new();
    {
        let mut vm = Vm::new(script.code, script.constants, script.global_count, &mut out);
        vm.run()?;
    }
    Ok(String::from_utf8(out).expect("output is UTF-8"))
}

fn output(source: &str) -> String {
    exec(source).expect("program runs")
}

#[test]
fn closure_reads_enclosing_local() {
    assert_eq!(
        output(
            "fun outer() { var x = \"outside\"; fun inner() { print x; } inner(); } outer();"
        ),
        "outside\n"
    );
}

#[test]
fn closure_prefers_enclosing_local_over_global() {
    assert_eq!(
        output(
            "var x = \"global\"; \
             fun outer() { var x = \"outer\"; fun inner() { print x; } inner(); } \
             outer();"
        ),
        "outer\n"
    );
}

#[test]
fn capture_through_intermediate_function() {
    assert_eq!(
        output(
            "fun outer() { var x = 1; \
               fun middle() { fun inner() { print x; } inner(); } \
               middle(); } \
             outer();"
        ),
        "1\n"
    );
}

#[test]
fn closure_survives_its_defining_frame() {
    assert_eq!(
        output(
            "fun makeClosure() { var local = \"local\"; \
               fun closure() { print local; } \
               return closure; } \
             var closure = makeClosure(); \
             closure();"
        ),
        "local\n"
    );
}

#[test]
fn closure_factory_chain() {
    assert_eq!(
        output(
            "fun outer() { var x = \"value\"; \
               fun middle() { fun inner() { print x; } \
                 print \"create inner closure\"; \
                 return inner; } \
               print \"return from outer\"; \
               return middle; } \
             var mid = outer(); \
             var in_ = mid(); \
             in_();"
        ),
        "return from outer\ncreate inner closure\nvalue\n"
    );
}

#[test]
fn upvalue_writes_stay_within_the_closure() {
    // Snapshot policy: the inner assignment updates inner's own upvalue
    // slot; outer's local is untouched.
    assert_eq!(
        output(
            "fun outer() { var x = \"before\"; \
               fun inner() { x = \"assigned\"; } \
               inner(); \
               print x; } \
             outer();"
        ),
        "before\n"
    );
}

#[test]
fn upvalue_write_is_visible_to_later_reads_in_the_same_closure() {
    assert_eq!(
        output(
            "fun outer() { var x = 1; \
               fun inner() { x = 2; print x; } \
               inner(); \
               print x; } \
             outer();"
        ),
        "2\n1\n"
    );
}

#[test]
fn each_closure_gets_its_own_snapshot() {
    assert_eq!(
        output(
            "fun make(tag) { fun show() { print tag; } return show; } \
             var a = make(\"first\"); \
             var b = make(\"second\"); \
             a(); b(); a();"
        ),
        "first\nsecond\nfirst\n"
    );
}

#[test]
fn captured_value_is_frozen_at_creation_time() {
    // The closure is created while x is 1; the later write to the local
    // does not reach the snapshot.
    assert_eq!(
        output(
            "fun outer() { var x = 1; \
               fun show() { print x; } \
               x = 2; \
               show(); } \
             outer();"
        ),
        "1\n"
    );
}

#[test]
fn globals_are_not_captured() {
    // Globals resolve through the globals array, so updates are seen.
    assert_eq!(
        output(
            "var g = 1; \
             fun show() { print g; } \
             g = 2; \
             show();"
        ),
        "2\n"
    );
}

#[test]
fn parameters_can_be_captured() {
    assert_eq!(
        output(
            "fun adder(n) { fun add(m) { return n + m; } return add; } \
             var add2 = adder(2); \
             print add2(40);"
        ),
        "42\n"
    );
}
