use pretty_assertions::assert_eq;
use quince::environment::Environment;
use quince::evaluator::Error;
use quince::printer::{pr_str, PrintMode};
use quince::types::TypeMismatch;
use quince::{core, evaluator, interpreter, reader, Value};
use std::rc::Rc;

/// A root environment with builtins and the prelude loaded.
fn fresh_env() -> Rc<Environment> {
    let env = core::base_environment();
    interpreter::read_prelude(&env).expect("prelude must load");
    env
}

fn eval_str(input: &str, env: &Rc<Environment>) -> Result<Value, Error> {
    let expr = reader::parse(input).expect("test input must parse");
    evaluator::eval(&expr, env)
}

/// Evaluate a multi-form program in a fresh environment, returning the last
/// form's value.
fn run_fresh(input: &str) -> Result<Value, Error> {
    let env = fresh_env();
    let mut last = Value::Nil;
    for form in reader::split_top_level_forms(input) {
        last = eval_str(&form, &env)?;
    }
    Ok(last)
}

fn eval_fresh(input: &str) -> Result<Value, Error> {
    eval_str(input, &fresh_env())
}

fn int(n: i64) -> Value {
    Value::Integer(n)
}

#[test]
fn print_parse_round_trip() {
    for src in &[
        "42",
        "-7",
        "foo",
        "\"a b\"",
        "\"line\\nbreak\"",
        "(1 2 3)",
        "(a (b \"c d\") () -5)",
    ] {
        let value = reader::parse(src).unwrap();
        let printed = pr_str(&value, PrintMode::ReadableRepresentation);
        assert_eq!(reader::parse(&printed).unwrap(), value, "src = {}", src);
    }
}

#[test]
fn constants_survive_an_eval_round_trip() {
    // nil/true/false print as the symbols they are bound to, so they
    // round-trip through parse + evaluate rather than parse alone.
    for (src, expected) in &[
        ("nil", Value::Nil),
        ("true", Value::Bool(true)),
        ("false", Value::Bool(false)),
    ] {
        let value = eval_fresh(src).unwrap();
        assert_eq!(&value, expected);
        let printed = pr_str(&value, PrintMode::ReadableRepresentation);
        assert_eq!(&eval_fresh(&printed).unwrap(), expected);
    }
}

#[test]
fn arithmetic_matches_host_semantics() {
    assert_eq!(eval_fresh("(+ 2 3)").unwrap(), int(5));
    assert_eq!(eval_fresh("(- 2 3)").unwrap(), int(-1));
    assert_eq!(eval_fresh("(* -4 3)").unwrap(), int(-12));
    assert_eq!(eval_fresh("(/ 7 2)").unwrap(), int(7 / 2));
    assert_eq!(eval_fresh("(% 7 2)").unwrap(), int(7 % 2));
    assert_eq!(eval_fresh("(% -7 2)").unwrap(), int(-7 % 2));
    assert_eq!(eval_fresh("(< 1 2)").unwrap(), Value::Bool(true));
    assert_eq!(eval_fresh("(< 2 1)").unwrap(), Value::Bool(false));
}

#[test]
fn division_by_zero_is_an_error() {
    assert!(matches!(eval_fresh("(/ 1 0)"), Err(Error::DivideByZero)));
    assert!(matches!(eval_fresh("(% 1 0)"), Err(Error::DivideByZero)));
}

#[test]
fn arithmetic_requires_integers() {
    assert!(matches!(
        eval_fresh("(+ 1 \"two\")"),
        Err(Error::Type(TypeMismatch::NotAnInt))
    ));
    assert!(matches!(
        eval_fresh("(< nil 1)"),
        Err(Error::Type(TypeMismatch::NotAnInt))
    ));
}

#[test]
fn builtin_partial_application() {
    assert_eq!(eval_fresh("((+ 3) 4)").unwrap(), int(7));
    assert_eq!(
        run_fresh("(define add3 (+ 3)) (add3 4)").unwrap(),
        int(7)
    );
    assert_eq!(run_fresh("((cons 0) (quote (1 2)))").unwrap(),
        reader::parse("(0 1 2)").unwrap()
    );
}

#[test]
fn lambda_partial_application() {
    assert_eq!(
        run_fresh("(define (add a b) (+ a b)) ((add 1) 2)").unwrap(),
        int(3)
    );
    // The partial sees the bound prefix through its creation environment.
    assert_eq!(
        run_fresh("(define (pair a b) (list a b)) (define one (pair 1)) (one 2)").unwrap(),
        reader::parse("(1 2)").unwrap()
    );
}

#[test]
fn lexical_scoping() {
    let env = fresh_env();
    eval_str("(define make-adder (lambda (x) (lambda (y) (+ x y))))", &env).unwrap();
    eval_str("(define add3 (make-adder 3))", &env).unwrap();
    assert_eq!(eval_str("(add3 4)", &env).unwrap(), int(7));
    // Rebinding x elsewhere does not disturb the closure.
    eval_str("(define x 100)", &env).unwrap();
    assert_eq!(eval_str("(add3 4)", &env).unwrap(), int(7));
    assert_eq!(eval_str("((make-adder 3) 4)", &env).unwrap(), int(7));
}

#[test]
fn redefinition_in_the_same_frame_is_an_error() {
    assert!(matches!(
        run_fresh("(define x 1) (define x 2)"),
        Err(Error::Redefinition(_))
    ));
}

#[test]
fn shadowing_in_an_inner_frame_is_allowed() {
    let env = fresh_env();
    eval_str("(define x 1)", &env).unwrap();
    eval_str("(define f (lambda () (begin (define x 2) x)))", &env).unwrap();
    assert_eq!(eval_str("(f)", &env).unwrap(), int(2));
    assert_eq!(eval_str("x", &env).unwrap(), int(1));
}

#[test]
fn begin_sequences_in_the_current_scope() {
    let env = fresh_env();
    assert_eq!(eval_str("(begin (define g 1) g)", &env).unwrap(), int(1));
    // begin does not open a scope, so g is visible afterwards.
    assert_eq!(eval_str("g", &env).unwrap(), int(1));
    assert_eq!(eval_str("(begin)", &env).unwrap(), Value::Nil);
}

#[test]
fn local_opens_a_child_scope() {
    let env = fresh_env();
    assert_eq!(eval_str("(local (define t 5) t)", &env).unwrap(), int(5));
    assert!(matches!(
        eval_str("t", &env),
        Err(Error::UnknownSymbol(_))
    ));
}

#[test]
fn macro_expansion_is_unhygienic() {
    let env = fresh_env();
    eval_str("(define x 0)", &env).unwrap();
    eval_str("(defmacro (twice e) (begin e e))", &env).unwrap();
    eval_str("(twice (set! x (+ x 1)))", &env).unwrap();
    assert_eq!(eval_str("x", &env).unwrap(), int(2));
}

#[test]
fn macros_require_exact_arity() {
    let env = fresh_env();
    eval_str("(defmacro (twice e) (begin e e))", &env).unwrap();
    assert!(matches!(
        eval_str("(twice 1 2)", &env),
        Err(Error::BadArgCount(_))
    ));
}

#[test]
fn delayed_values_memoize() {
    let env = fresh_env();
    eval_str("(define counter 0)", &env).unwrap();
    eval_str(
        "(define d (delay (begin (set! counter (+ counter 1)) counter)))",
        &env,
    )
    .unwrap();
    // Not forced yet.
    assert_eq!(eval_str("counter", &env).unwrap(), int(0));
    assert_eq!(eval_str("(force d)", &env).unwrap(), int(1));
    assert_eq!(eval_str("(force d)", &env).unwrap(), int(1));
    // The underlying expression ran exactly once.
    assert_eq!(eval_str("counter", &env).unwrap(), int(1));
}

#[test]
fn delayed_parameters_are_not_evaluated_until_forced() {
    let env = fresh_env();
    eval_str("(define (choose c $a $b) (if c (force a) (force b)))", &env).unwrap();
    // The untaken branch would error if evaluated.
    assert_eq!(
        eval_str("(choose true 10 (head (quote ())))", &env).unwrap(),
        int(10)
    );
}

#[test]
fn force_requires_a_delayed_value() {
    assert!(matches!(
        eval_fresh("(force 3)"),
        Err(Error::Type(TypeMismatch::NotADelayed))
    ));
}

#[test]
fn list_equality_is_structural() {
    assert_eq!(
        eval_fresh("(= (quote (1 2 3)) (quote (1 2 3)))").unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval_fresh("(= (quote ()) (quote ()))").unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval_fresh("(= (quote (1)) (quote ()))").unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn cross_type_equality_is_false() {
    assert_eq!(eval_fresh("(= 1 \"1\")").unwrap(), Value::Bool(false));
    assert_eq!(eval_fresh("(= nil (quote ()))").unwrap(), Value::Bool(false));
    assert_eq!(eval_fresh("(= true 1)").unwrap(), Value::Bool(false));
}

#[test]
fn arity_enforcement() {
    let env = fresh_env();
    eval_str("(define (two a b) (+ a b))", &env).unwrap();
    assert!(matches!(
        eval_str("(two 1 2 3)", &env),
        Err(Error::BadArgCount(_))
    ));
    // A parameterised lambda cannot be invoked with zero arguments.
    assert!(matches!(eval_str("(two)", &env), Err(Error::BadArgCount(_))));
    // A zero-parameter lambda can.
    eval_str("(define (five) 5)", &env).unwrap();
    assert_eq!(eval_str("(five)", &env).unwrap(), int(5));
}

#[test]
fn special_form_arity_is_exact() {
    assert!(matches!(
        eval_fresh("(if true 1)"),
        Err(Error::BadArgCount(_))
    ));
    assert!(matches!(
        eval_fresh("(quote a b)"),
        Err(Error::BadArgCount(_))
    ));
}

#[test]
fn if_condition_must_be_boolean() {
    assert!(matches!(
        eval_fresh("(if 1 2 3)"),
        Err(Error::Type(TypeMismatch::NotABool))
    ));
    // The untaken branch is never evaluated.
    assert_eq!(
        eval_fresh("(if true 1 (head (quote ())))").unwrap(),
        int(1)
    );
}

#[test]
fn calling_a_non_callable_is_an_error() {
    assert!(matches!(
        eval_fresh("(1 2)"),
        Err(Error::Type(TypeMismatch::NotCallable))
    ));
    assert!(matches!(eval_fresh("()"), Err(Error::EmptyForm)));
}

#[test]
fn unknown_symbols_are_reported() {
    assert!(matches!(
        eval_fresh("no-such-binding"),
        Err(Error::UnknownSymbol(_))
    ));
}

#[test]
fn special_forms_cannot_be_shadowed() {
    let env = fresh_env();
    // The binding is permitted but the special-form check wins at call sites.
    eval_str("(define quote 99)", &env).unwrap();
    assert_eq!(
        eval_str("(quote marker)", &env).unwrap(),
        reader::parse("marker").unwrap()
    );
}

#[test]
fn reference_parameters_mutate_the_caller_binding() {
    let env = fresh_env();
    eval_str("(define (inc! &x) (set! x (+ x 1)))", &env).unwrap();
    eval_str("(define n 5)", &env).unwrap();
    eval_str("(inc! n)", &env).unwrap();
    assert_eq!(eval_str("n", &env).unwrap(), int(6));
    // Reading a reference parameter yields the target value.
    eval_str("(define (peek &x) x)", &env).unwrap();
    assert_eq!(eval_str("(peek n)", &env).unwrap(), int(6));
}

#[test]
fn reference_parameters_forward_through_nested_calls() {
    let env = fresh_env();
    eval_str("(define (inc! &x) (set! x (+ x 1)))", &env).unwrap();
    eval_str("(define (inc-twice! &y) (begin (inc! y) (inc! y)))", &env).unwrap();
    eval_str("(define n 0)", &env).unwrap();
    eval_str("(inc-twice! n)", &env).unwrap();
    assert_eq!(eval_str("n", &env).unwrap(), int(2));
}

#[test]
fn reference_arguments_must_be_symbols() {
    let env = fresh_env();
    eval_str("(define (inc! &x) (set! x (+ x 1)))", &env).unwrap();
    assert!(matches!(
        eval_str("(inc! 5)", &env),
        Err(Error::Type(TypeMismatch::NotASymbol))
    ));
}

#[test]
fn callables_can_be_passed_by_reference() {
    let env = fresh_env();
    eval_str("(define (call-with-1 &f) (f 1))", &env).unwrap();
    eval_str("(define (double n) (* n 2))", &env).unwrap();
    assert_eq!(eval_str("(call-with-1 double)", &env).unwrap(), int(2));
}

#[test]
fn in_place_list_mutation() {
    let env = fresh_env();
    eval_str("(define l (quote (1 2 3)))", &env).unwrap();
    eval_str("(set-elem! l 2 9)", &env).unwrap();
    assert_eq!(
        eval_str("l", &env).unwrap(),
        reader::parse("(1 9 3)").unwrap()
    );
    eval_str("(push-front! l 0)", &env).unwrap();
    eval_str("(push-back! l 4)", &env).unwrap();
    assert_eq!(
        eval_str("l", &env).unwrap(),
        reader::parse("(0 1 9 3 4)").unwrap()
    );
    eval_str("(pop-front! l)", &env).unwrap();
    eval_str("(pop-back! l)", &env).unwrap();
    assert_eq!(
        eval_str("l", &env).unwrap(),
        reader::parse("(1 9 3)").unwrap()
    );
}

#[test]
fn mutation_through_a_reference_parameter() {
    let env = fresh_env();
    eval_str("(define (zero-first! &lst) (set-elem! lst 1 0))", &env).unwrap();
    eval_str("(define ll (quote (5 6)))", &env).unwrap();
    eval_str("(zero-first! ll)", &env).unwrap();
    assert_eq!(
        eval_str("ll", &env).unwrap(),
        reader::parse("(0 6)").unwrap()
    );
}

#[test]
fn list_indexing_is_one_based() {
    let env = fresh_env();
    eval_str("(define l (quote (10 20 30)))", &env).unwrap();
    assert_eq!(eval_str("(elem 1 l)", &env).unwrap(), int(10));
    assert_eq!(eval_str("(elem 3 l)", &env).unwrap(), int(30));
    assert!(matches!(
        eval_str("(elem 0 l)", &env),
        Err(Error::BadIndex(0, 3))
    ));
    assert!(matches!(
        eval_str("(elem 4 l)", &env),
        Err(Error::BadIndex(4, 3))
    ));
}

#[test]
fn head_and_tail_require_non_empty_lists() {
    assert_eq!(eval_fresh("(head (quote (1 2)))").unwrap(), int(1));
    assert_eq!(
        eval_fresh("(tail (quote (1 2)))").unwrap(),
        reader::parse("(2)").unwrap()
    );
    assert!(matches!(
        eval_fresh("(head (quote ()))"),
        Err(Error::Type(TypeMismatch::EmptyList))
    ));
    assert!(matches!(
        eval_fresh("(tail (quote ()))"),
        Err(Error::Type(TypeMismatch::EmptyList))
    ));
}

#[test]
fn cons_and_len_and_list() {
    assert_eq!(
        eval_fresh("(cons 1 (quote (2 3)))").unwrap(),
        reader::parse("(1 2 3)").unwrap()
    );
    assert_eq!(eval_fresh("(len (quote (1 2 3)))").unwrap(), int(3));
    assert_eq!(
        eval_fresh("(list 1 (+ 1 1) 3)").unwrap(),
        reader::parse("(1 2 3)").unwrap()
    );
    assert_eq!(eval_fresh("(list)").unwrap(), reader::parse("()").unwrap());
    assert!(matches!(
        eval_fresh("(cons 1 2)"),
        Err(Error::Type(TypeMismatch::NotAList))
    ));
}

#[test]
fn atom_test() {
    assert_eq!(eval_fresh("(atom? 1)").unwrap(), Value::Bool(true));
    assert_eq!(eval_fresh("(atom? \"s\")").unwrap(), Value::Bool(true));
    assert_eq!(
        eval_fresh("(atom? (quote (1)))").unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn eval_and_read_from_string() {
    assert_eq!(eval_fresh("(eval (quote (+ 1 2)))").unwrap(), int(3));
    assert_eq!(
        eval_fresh("(read-from-string \"(+ 1 2)\")").unwrap(),
        int(3)
    );
}

#[test]
fn print_to_string_is_readable() {
    assert_eq!(
        eval_fresh("(print-to-string (quote (1 \"a b\")))").unwrap(),
        Value::String("(1 \"a b\")".into())
    );
    assert_eq!(
        eval_fresh("(print-to-string nil)").unwrap(),
        Value::String("nil".into())
    );
}

#[test]
fn curried_mutators_resolve_references_at_bind_time() {
    let env = fresh_env();
    eval_str("(define l2 (quote (1)))", &env).unwrap();
    eval_str("(define pusher (push-front! l2))", &env).unwrap();
    eval_str("(pusher 9)", &env).unwrap();
    assert_eq!(
        eval_str("l2", &env).unwrap(),
        reader::parse("(9 1)").unwrap()
    );
}

#[test]
fn prelude_list_helpers() {
    assert_eq!(
        eval_fresh("(map (+ 1) (range 1 4))").unwrap(),
        reader::parse("(2 3 4)").unwrap()
    );
    assert_eq!(
        eval_fresh("(filter (< 2) (quote (1 2 3 4)))").unwrap(),
        reader::parse("(3 4)").unwrap()
    );
    assert_eq!(eval_fresh("(foldl + 0 (quote (1 2 3)))").unwrap(), int(6));
    assert_eq!(eval_fresh("(empty? (quote ()))").unwrap(), Value::Bool(true));
}

#[test]
fn prelude_logic_and_comparisons() {
    assert_eq!(eval_fresh("(not false)").unwrap(), Value::Bool(true));
    assert_eq!(eval_fresh("(and true false)").unwrap(), Value::Bool(false));
    assert_eq!(eval_fresh("(or false true)").unwrap(), Value::Bool(true));
    assert_eq!(eval_fresh("(> 3 2)").unwrap(), Value::Bool(true));
    assert_eq!(eval_fresh("(<= 2 2)").unwrap(), Value::Bool(true));
    assert_eq!(eval_fresh("(>= 1 2)").unwrap(), Value::Bool(false));
    assert_eq!(eval_fresh("(!= 1 2)").unwrap(), Value::Bool(true));
    assert_eq!(eval_fresh("(abs -4)").unwrap(), int(4));
    assert_eq!(eval_fresh("(min 2 9)").unwrap(), int(2));
    assert_eq!(eval_fresh("(max 2 9)").unwrap(), int(9));
    // Macro short-circuit: the second operand never runs.
    assert_eq!(
        run_fresh("(define z 0) (and false (set! z 1)) z").unwrap(),
        int(0)
    );
}

#[test]
fn set_bang_requires_an_existing_binding() {
    assert!(matches!(
        eval_fresh("(set! ghost 1)"),
        Err(Error::Set(_))
    ));
}

#[test]
fn set_bang_writes_the_innermost_binding_frame() {
    let env = fresh_env();
    eval_str("(define counter 0)", &env).unwrap();
    eval_str("(define (bump) (set! counter (+ counter 1)))", &env).unwrap();
    eval_str("(bump)", &env).unwrap();
    eval_str("(bump)", &env).unwrap();
    assert_eq!(eval_str("counter", &env).unwrap(), int(2));
}

#[test]
fn recursion_works_through_the_creation_environment() {
    assert_eq!(
        run_fresh(
            "(define (fact n) (if (< n 2) 1 (* n (fact (- n 1))))) (fact 10)"
        )
        .unwrap(),
        int(3628800)
    );
}

#[test]
fn conflicting_sigils_are_rejected_at_construction() {
    assert!(matches!(
        eval_fresh("(lambda (&$x) x)"),
        Err(Error::Fn(_))
    ));
}
