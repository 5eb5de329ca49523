use crate::environment::Environment;
use crate::evaluator::{self, Error};
use crate::printer::{pr_str, PrintMode};
use crate::types::{
    BuiltinFn, BuiltinParams, Int, List, ParamMode, Reference, TypeMismatch, Value,
};
use crate::{interpreter, reader};
use linefeed::{DefaultTerminal, Interface, ReadResult};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

fn grab_ints(args: &[Value]) -> evaluator::Result<Vec<Int>> {
    let type_check: Result<Vec<_>, _> = args.iter().map(|o| o.as_int()).collect();
    type_check.map_err(Error::Type)
}

macro_rules! arithmetic_primitive {
    ($SYMBOL:tt, $NAME:ident) => {
        paste::item! {
            static $NAME: BuiltinFn = BuiltinFn {
                name: stringify!($SYMBOL),
                params: BuiltinParams::Fixed(&[ParamMode::ByValue, ParamMode::ByValue]),
                fn_ptr: |args: &[Value], _env: &Rc<Environment>| {
                    match grab_ints(args)?.as_slice() {
                        [x, y] => Ok(Value::Integer(Int::[<wrapping_ $NAME:lower>](*x, *y))),
                        _ => unreachable!(),
                    }
                },
            };
        }
    };
}

arithmetic_primitive!(+, ADD);
arithmetic_primitive!(-, SUB);
arithmetic_primitive!(*, MUL);

static DIV: BuiltinFn = BuiltinFn {
    name: "/",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue, ParamMode::ByValue]),
    fn_ptr: div_,
};

fn div_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    match grab_ints(args)?.as_slice() {
        [_, 0] => Err(Error::DivideByZero),
        [x, y] => Ok(Value::Integer(x.wrapping_div(*y))),
        _ => unreachable!(),
    }
}

static MOD: BuiltinFn = BuiltinFn {
    name: "%",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue, ParamMode::ByValue]),
    fn_ptr: mod_,
};

fn mod_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    match grab_ints(args)?.as_slice() {
        [_, 0] => Err(Error::DivideByZero),
        [x, y] => Ok(Value::Integer(x.wrapping_rem(*y))),
        _ => unreachable!(),
    }
}

static LESS_THAN: BuiltinFn = BuiltinFn {
    name: "<",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue, ParamMode::ByValue]),
    fn_ptr: less_than_,
};

fn less_than_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    match grab_ints(args)?.as_slice() {
        [x, y] => Ok(Value::Bool(x < y)),
        _ => unreachable!(),
    }
}

static EQUAL: BuiltinFn = BuiltinFn {
    name: "=",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue, ParamMode::ByValue]),
    fn_ptr: equal_,
};

fn equal_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    // Structural for data, identity for callables, false across variants.
    Ok(Value::Bool(args[0] == args[1]))
}

static LIST: BuiltinFn = BuiltinFn {
    name: "list",
    params: BuiltinParams::Variadic,
    fn_ptr: list_,
};

fn list_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    Ok(Value::wrap_list(args.iter().cloned().collect()))
}

static LEN: BuiltinFn = BuiltinFn {
    name: "len",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: len_,
};

fn len_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    Ok(Value::Integer(args[0].as_list()?.len() as Int))
}

static ATOM_TEST: BuiltinFn = BuiltinFn {
    name: "atom?",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: atom_test_,
};

fn atom_test_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    Ok(Value::Bool(!args[0].is_list()))
}

static CONS: BuiltinFn = BuiltinFn {
    name: "cons",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue, ParamMode::ByValue]),
    fn_ptr: cons_,
};

fn cons_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    let mut elements = args[1].as_list()?.clone();
    elements.push_front(args[0].clone());
    Ok(Value::wrap_list(elements))
}

static HEAD: BuiltinFn = BuiltinFn {
    name: "head",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: head_,
};

fn head_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    args[0]
        .as_list()?
        .head()
        .cloned()
        .ok_or(Error::Type(TypeMismatch::EmptyList))
}

static TAIL: BuiltinFn = BuiltinFn {
    name: "tail",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: tail_,
};

fn tail_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    args[0]
        .as_list()?
        .tail()
        .map(Value::wrap_list)
        .ok_or(Error::Type(TypeMismatch::EmptyList))
}

static ELEM: BuiltinFn = BuiltinFn {
    name: "elem",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue, ParamMode::ByValue]),
    fn_ptr: elem_,
};

// Indexing is 1-based throughout.
fn elem_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    let index = args[0].as_int()?;
    let list = args[1].as_list()?;
    if index < 1 || index as usize > list.len() {
        return Err(Error::BadIndex(index, list.len()));
    }
    Ok(list[(index - 1) as usize].clone())
}

/// Chase a reference argument down to the list it ultimately names, along
/// with the innermost reference, which is the slot mutators write back to.
fn grab_list_ref(arg: &Value) -> evaluator::Result<(Rc<Reference>, List)> {
    let mut r = match arg {
        Value::Reference(r) => r.clone(),
        _ => return Err(Error::Type(TypeMismatch::NotAList)),
    };
    let mut target = r.get()?;
    while let Value::Reference(inner) = &target {
        r = inner.clone();
        target = r.get()?;
    }
    let list = target.as_list()?.clone();
    Ok((r, list))
}

static SET_ELEM: BuiltinFn = BuiltinFn {
    name: "set-elem!",
    params: BuiltinParams::Fixed(&[
        ParamMode::ByReference,
        ParamMode::ByValue,
        ParamMode::ByValue,
    ]),
    fn_ptr: set_elem_,
};

fn set_elem_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    let (r, mut list) = grab_list_ref(&args[0])?;
    let index = args[1].as_int()?;
    if index < 1 || index as usize > list.len() {
        return Err(Error::BadIndex(index, list.len()));
    }
    list[(index - 1) as usize] = args[2].clone();
    r.set(Value::wrap_list(list))?;
    Ok(Value::Nil)
}

static PUSH_FRONT: BuiltinFn = BuiltinFn {
    name: "push-front!",
    params: BuiltinParams::Fixed(&[ParamMode::ByReference, ParamMode::ByValue]),
    fn_ptr: push_front_,
};

fn push_front_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    let (r, mut list) = grab_list_ref(&args[0])?;
    list.push_front(args[1].clone());
    r.set(Value::wrap_list(list))?;
    Ok(Value::Nil)
}

static PUSH_BACK: BuiltinFn = BuiltinFn {
    name: "push-back!",
    params: BuiltinParams::Fixed(&[ParamMode::ByReference, ParamMode::ByValue]),
    fn_ptr: push_back_,
};

fn push_back_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    let (r, mut list) = grab_list_ref(&args[0])?;
    list.push_back(args[1].clone());
    r.set(Value::wrap_list(list))?;
    Ok(Value::Nil)
}

static POP_FRONT: BuiltinFn = BuiltinFn {
    name: "pop-front!",
    params: BuiltinParams::Fixed(&[ParamMode::ByReference]),
    fn_ptr: pop_front_,
};

fn pop_front_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    let (r, mut list) = grab_list_ref(&args[0])?;
    if list.pop_front().is_none() {
        return Err(Error::Type(TypeMismatch::EmptyList));
    }
    r.set(Value::wrap_list(list))?;
    Ok(Value::Nil)
}

static POP_BACK: BuiltinFn = BuiltinFn {
    name: "pop-back!",
    params: BuiltinParams::Fixed(&[ParamMode::ByReference]),
    fn_ptr: pop_back_,
};

fn pop_back_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    let (r, mut list) = grab_list_ref(&args[0])?;
    if list.pop_back().is_none() {
        return Err(Error::Type(TypeMismatch::EmptyList));
    }
    r.set(Value::wrap_list(list))?;
    Ok(Value::Nil)
}

static DELAY: BuiltinFn = BuiltinFn {
    name: "delay",
    // The one parameter is delayed-mode, so the call protocol has already
    // wrapped the unevaluated expression by the time we run.
    params: BuiltinParams::Fixed(&[ParamMode::Delayed]),
    fn_ptr: delay_,
};

fn delay_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    Ok(args[0].clone())
}

static FORCE: BuiltinFn = BuiltinFn {
    name: "force",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: force_,
};

fn force_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    args[0].as_delayed()?.force()
}

static EVAL: BuiltinFn = BuiltinFn {
    name: "eval",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: eval_,
};

// The argument was already evaluated by the call protocol; evaluating the
// result again gives `eval` its eval-twice semantics.
fn eval_(args: &[Value], env: &Rc<Environment>) -> evaluator::Result {
    evaluator::eval(&args[0], env)
}

static READ_FROM_STRING: BuiltinFn = BuiltinFn {
    name: "read-from-string",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: read_from_string_,
};

fn read_from_string_(args: &[Value], env: &Rc<Environment>) -> evaluator::Result {
    let text = args[0].as_string()?;
    let expr = reader::parse(text).map_err(Error::Read)?;
    evaluator::eval(&expr, env)
}

static LOAD: BuiltinFn = BuiltinFn {
    name: "load",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: load_,
};

fn load_(args: &[Value], env: &Rc<Environment>) -> evaluator::Result {
    let path = args[0].as_string()?;
    interpreter::load_file(path, env)?;
    Ok(Value::Nil)
}

static PRINT: BuiltinFn = BuiltinFn {
    name: "print",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: print_,
};

fn print_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    print!("{}", pr_str(&args[0], PrintMode::ReadableRepresentation));
    std::io::stdout().flush()?;
    Ok(Value::Nil)
}

static PRINT_STRING: BuiltinFn = BuiltinFn {
    name: "print-string",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: print_string_,
};

fn print_string_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    print!("{}", args[0].as_string()?);
    std::io::stdout().flush()?;
    Ok(Value::Nil)
}

static PRINT_TO_STRING: BuiltinFn = BuiltinFn {
    name: "print-to-string",
    params: BuiltinParams::Fixed(&[ParamMode::ByValue]),
    fn_ptr: print_to_string_,
};

fn print_to_string_(args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    Ok(Value::String(pr_str(
        &args[0],
        PrintMode::ReadableRepresentation,
    )))
}

fn read_terminal_line() -> evaluator::Result<Option<String>> {
    lazy_static! {
        static ref INTERFACE: Interface<DefaultTerminal> =
            linefeed::Interface::new("quince_user").unwrap();
    }
    INTERFACE.set_prompt("")?;
    match INTERFACE.read_line() {
        Ok(ReadResult::Eof) => Ok(None),
        Ok(ReadResult::Signal(_)) => Ok(None),
        Ok(ReadResult::Input(i)) => Ok(Some(i)),
        Err(e) => Err(e.into()),
    }
}

static READ: BuiltinFn = BuiltinFn {
    name: "read",
    params: BuiltinParams::Fixed(&[]),
    fn_ptr: read_,
};

fn read_(_args: &[Value], env: &Rc<Environment>) -> evaluator::Result {
    match read_terminal_line()? {
        None => Ok(Value::Nil),
        Some(line) => {
            let expr = reader::parse(&line).map_err(Error::Read)?;
            evaluator::eval(&expr, env)
        }
    }
}

static READ_STRING: BuiltinFn = BuiltinFn {
    name: "read-string",
    params: BuiltinParams::Fixed(&[]),
    fn_ptr: read_string_,
};

fn read_string_(_args: &[Value], _env: &Rc<Environment>) -> evaluator::Result {
    match read_terminal_line()? {
        None => Ok(Value::Nil),
        Some(line) => Ok(Value::String(line)),
    }
}

type Namespace = HashMap<&'static str, &'static BuiltinFn>;
lazy_static! {
    pub static ref CORE: Namespace = {
        let mut map = Namespace::new();
        for func in &[
            // Arithmetic and comparison
            &ADD,
            &SUB,
            &MUL,
            &DIV,
            &MOD,
            &LESS_THAN,
            &EQUAL,
            // Working with lists
            &LIST,
            &LEN,
            &CONS,
            &HEAD,
            &TAIL,
            &ELEM,
            &ATOM_TEST,
            // In-place mutation through references
            &SET_ELEM,
            &PUSH_FRONT,
            &PUSH_BACK,
            &POP_FRONT,
            &POP_BACK,
            // Lazy values
            &DELAY,
            &FORCE,
            // Evaluation
            &EVAL,
            &READ_FROM_STRING,
            &LOAD,
            // Terminal I/O
            &PRINT,
            &PRINT_STRING,
            &PRINT_TO_STRING,
            &READ,
            &READ_STRING,
        ] {
            map.insert(func.name, *func);
        }
        map
    };
}

pub fn add_builtins(env: &Rc<Environment>) {
    for func in CORE.values() {
        env.bind_builtin(*func);
    }
    env.set("nil".into(), Value::Nil);
    env.set("true".into(), Value::Bool(true));
    env.set("false".into(), Value::Bool(false));
}

/// A root environment with every builtin and constant bound. The prelude is
/// separate; see `interpreter::read_prelude`.
pub fn base_environment() -> Rc<Environment> {
    let env = Environment::empty();
    add_builtins(&env);
    env
}
