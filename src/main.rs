#[macro_use]
extern crate log;

use gumdrop::Options;
use std::process;

use loadsuite::{build_client, suite, SuiteConfiguration};

#[tokio::main]
async fn main() {
    let configuration = SuiteConfiguration::parse_args_default_or_exit();
    if configuration.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return;
    }

    configuration.initialize_logger();

    let run_mode = match configuration.validate() {
        Ok(run_mode) => run_mode,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", SuiteConfiguration::usage());
            process::exit(1);
        }
    };
    debug!("run mode: {:?}", run_mode);

    let client = match build_client(configuration.accept_invalid_certs) {
        Ok(client) => client,
        Err(e) => {
            error!("failed to build http client: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = suite::run(&configuration, run_mode, client).await {
        error!("{}", e);
        process::exit(1);
    }
}
