use crate::environment::Environment;
use crate::types::Value;
use crate::{evaluator, reader};
use std::fmt;
use std::fs::read_to_string;
use std::rc::Rc;

pub type Result = std::result::Result<Value, Error>;

#[derive(Debug)]
pub enum Error {
    Read(reader::ParseError),
    Eval(evaluator::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "read error: {}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

pub fn read(text: &str) -> Result {
    reader::parse(text).map_err(Error::Read)
}

pub fn eval(expr: &Value, env: &Rc<Environment>) -> Result {
    evaluator::eval(expr, env).map_err(Error::Eval)
}

/// Evaluate every top-level form in `text`, returning the value of the last
/// one (`Nil` for an empty buffer).
pub fn run(text: &str, env: &Rc<Environment>) -> Result {
    let mut last = Value::Nil;
    for form in reader::split_top_level_forms(text) {
        last = eval(&read(&form)?, env)?;
    }
    Ok(last)
}

/// `load` semantics: every top-level form of the file, evaluated into `env`.
pub fn load_file(path: &str, env: &Rc<Environment>) -> evaluator::Result<()> {
    let code = read_to_string(path)?;
    for form in reader::split_top_level_forms(&code) {
        let expr = reader::parse(&form).map_err(evaluator::Error::Read)?;
        evaluator::eval(&expr, env)?;
    }
    Ok(())
}

// The original interpreter shipped these as standard-library source files;
// here they ride along in the binary.
pub const PRELUDE: &str = r#"
(define (not b) (if b false true))
(defmacro (and a b) (if a b false))
(defmacro (or a b) (if a true b))
(define (> a b) (< b a))
(define (<= a b) (not (< b a)))
(define (>= a b) (not (< a b)))
(define (!= a b) (not (= a b)))
(define (abs n) (if (< n 0) (- 0 n) n))
(define (min a b) (if (< a b) a b))
(define (max a b) (if (< a b) b a))
(define (empty? l) (= (len l) 0))
(define (map f l)
  (if (empty? l)
      (quote ())
      (cons (f (head l)) (map f (tail l)))))
(define (filter p l)
  (if (empty? l)
      (quote ())
      (if (p (head l))
          (cons (head l) (filter p (tail l)))
          (filter p (tail l)))))
(define (foldl f acc l)
  (if (empty? l)
      acc
      (foldl f (f acc (head l)) (tail l))))
(define (range a b)
  (if (< a b)
      (cons a (range (+ a 1) b))
      (quote ())))
"#;

pub fn read_prelude(env: &Rc<Environment>) -> Result {
    run(PRELUDE, env)
}
