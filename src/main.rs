use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gamal::config::Config;
use gamal::pipeline::Pipeline;
use gamal::testrunner::TestRunner;

#[derive(Parser)]
#[command(name = "gamal")]
#[command(author, version, about = "A citation-grounded question-answering assistant", long_about = None)]
struct Cli {
    /// Run a file-based test suite instead of serving a front-end.
    #[arg(long)]
    test: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(255u8);
        }
    };

    if let Some(path) = cli.test {
        let pipeline = Pipeline::new(&config);
        let runner = TestRunner::new(pipeline, config.debug_fail_exit);
        return match runner.run_file(&path).await {
            Ok(0) => ExitCode::SUCCESS,
            Ok(_) => ExitCode::from(255u8),
            Err(err) => {
                eprintln!("{err}");
                ExitCode::from(255u8)
            }
        };
    }

    let result = if let Some(port) = config.http_port {
        let pipeline = Pipeline::new(&config);
        gamal::http::run(pipeline, port).await
    } else if let Some(token) = config.telegram_token.clone() {
        let pipeline = Pipeline::new(&config);
        let frontend = gamal::telegram::TelegramFrontend::new(&token);
        frontend.run(pipeline).await
    } else {
        let pipeline = Pipeline::new(&config);
        gamal::terminal::run(pipeline).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(255u8)
        }
    }
}
