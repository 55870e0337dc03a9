use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    ngd_flatfile::cli::run_inspect_cli(std::env::args().skip(1))
}
