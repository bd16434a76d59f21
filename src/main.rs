use cdetect::{clean_logger, cli};
use console::style;
use log::log_enabled;

fn main() {
    let code = match cli::run() {
        Ok(code) => code,
        Err(err) => {
            let mut chain = err.chain();
            if let Some(primary) = chain.next() {
                if log_enabled!(log::Level::Error) {
                    log::error!("{}", style(primary).red());
                } else {
                    eprintln!("{} {}", style("Error:").bold().red(), style(primary).red());
                }
            }
            // Causes only show up in verbose runs
            if log_enabled!(log::Level::Debug) {
                for cause in chain {
                    log::debug!("Caused by: {cause}");
                }
            }
            1
        }
    };
    clean_logger();
    std::process::exit(code);
}
