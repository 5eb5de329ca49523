use quince::{cmdline, core, interpreter};

fn main() -> Result<(), cmdline::Error> {
    pretty_env_logger::init();
    let env = core::base_environment();
    interpreter::read_prelude(&env).expect("error reading prelude");
    let args = std::env::args().collect();
    cmdline::launch(args, &env)
}
