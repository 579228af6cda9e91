use clap::Parser;

/// Parses command line arguments, exiting with status 1 (after printing usage)
/// when they are missing or malformed. `--help` and `--version` still exit 0.
pub fn parse_args_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}
