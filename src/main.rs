// Purpose: Provide default binary entry for the depsync CLI.
// Inputs/Outputs: Reads process args and returns process exit code from CLI dispatcher.
// Invariants: Main must not bypass centralized CLI argument handling.
// Gotchas: Logger init happens here once; cli/mod.rs assumes it is already set up.

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();
    let code = depsync::cli::run_cli(std::env::args().skip(1));
    std::process::exit(code);
}
