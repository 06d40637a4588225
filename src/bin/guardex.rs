// guardex command-line entry point
// Usage: guardex [--config FILE] <expand|check|gen|ast|build|...> [args]

fn main() {
    guardex::cli::run();
}
