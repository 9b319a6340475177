use clap::Parser;
use pysharp::Cli;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if cli.schema {
        match serde_json::to_string_pretty(&pysharp::schema()) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let Some(source) = cli.source.as_deref() else {
        eprintln!("a source path is required");
        std::process::exit(2);
    };

    match pysharp::run(source, cli.output.as_deref(), cli.watch) {
        Ok(report) if report.is_success() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
