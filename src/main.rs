use bundlepush::cli;
use bundlepush::ui::output;

fn main() {
    if let Err(err) = cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(cli::exit_code(&err));
    }
}
