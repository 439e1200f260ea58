use config_chain::{
    Configurable, Configurator, DefaultProvider, EnvProvider, FlagProvider, docs,
};
use std::ffi::OsString;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Configurable)]
pub struct DatabaseConfig {
    #[config(flag = "db-url", env = "DB_URL", default = "postgres://localhost/demo")]
    pub url: String,

    #[config(env = "DB_POOL_SIZE", default = 4)]
    pub pool_size: u32,
}

#[derive(Debug, Default, Configurable)]
pub struct DemoConfig {
    #[config(flag = "host", env = "HOST", default = "localhost")]
    pub host: String,

    #[config(flag = "port", env = "PORT", default = 8080)]
    pub port: u16,

    #[config(flag = "verbose", env = "VERBOSE", default = false)]
    pub verbose: bool,

    #[config(env = "API_TOKEN")]
    pub api_token: Option<String>,

    #[config(nested)]
    pub database: Option<DatabaseConfig>,

    started_at: u64,
}

#[allow(dead_code)]
#[derive(Debug, Default, Configurable)]
pub struct BrokenConfig {
    #[config(default = "notanumber")]
    pub port: u16,

    #[config(env = "DEMO_NEVER_SET")]
    pub name: String,

    #[config(default = "a.example.com,b.example.com")]
    pub hosts: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args_os().skip(1);
    match args.next() {
        Some(arg) => match arg.to_str() {
            Some("show") => show(args.collect()),
            Some("docs") => generate_docs(),
            Some("errors") => show_errors(),
            _ => println!(
                "unknown arg: {}. Available: show, docs, errors",
                arg.to_string_lossy()
            ),
        },
        None => {
            println!("Usage: chain-demo [command] [flags]");
            println!("Commands:");
            println!("  show   - Resolve DemoConfig from flags, environment and defaults");
            println!("  docs   - Generate CONFIG.md documentation");
            println!("  errors - Resolve a broken config and list every error");
        }
    };
}

fn show(flags: Vec<OsString>) {
    let mut config = DemoConfig::default();
    let result = Configurator::new(&mut config, Vec::new())
        .with_provider(FlagProvider::with_args(flags))
        .with_provider(EnvProvider::new().with_dotenv(".env"))
        .with_provider(DefaultProvider::new())
        .on_error(|err| {
            // api_token is allowed to stay unset
            if err.field() != Some("api_token") {
                eprintln!("{}", err);
                std::process::exit(1);
            }
        })
        .logging(true)
        .run();

    match result {
        Ok(()) => {
            println!("Config loaded successfully!");
            println!("  host: {}", config.host);
            println!("  port: {}", config.port);
            println!("  verbose: {}", config.verbose);
            println!("  api_token set: {}", config.api_token.is_some());
            if let Some(database) = &config.database {
                println!("  database.url: {}", database.url);
                println!("  database.pool_size: {}", database.pool_size);
            }
            println!("  started_at: {}", config.started_at);
        }
        Err(err) => {
            eprintln!("Failed to load config:\n{}", err);
            std::process::exit(1);
        }
    }
}

fn show_errors() {
    let mut config = BrokenConfig::default();
    let result = Configurator::new(&mut config, Vec::new())
        .with_provider(EnvProvider::new())
        .with_provider(DefaultProvider::new())
        .run_collecting();

    match result {
        Ok(()) => println!("you should not see this"),
        Err(errors) => {
            eprintln!("Failed to load config:");
            for error in errors {
                eprintln!("\t- {}", error);
            }
        }
    }
    println!("all done");
}

fn generate_docs() {
    println!("Generating documentation for DemoConfig...");
    match docs::write_docs::<DemoConfig>("CONFIG.md") {
        Ok(_) => println!("✓ Documentation written to CONFIG.md"),
        Err(e) => eprintln!("✗ Failed to write documentation: {}", e),
    }
}
