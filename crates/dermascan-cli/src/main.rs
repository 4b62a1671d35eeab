mod cli;
mod view;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
