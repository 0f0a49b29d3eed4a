use envrun::cli;

fn main() {
    std::process::exit(cli::run());
}
