use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "Satchel CLI — skill registry and execution broker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default files (config plus the bundled sample skills).
    Init {
        /// Config file path (default: SATCHEL_CONFIG_PATH or ~/.satchel/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the gateway (HTTP + WebSocket control plane) over the skills root.
    Gateway {
        /// Config file path (default: SATCHEL_CONFIG_PATH or ~/.satchel/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// WebSocket and HTTP port (default from config or 15252)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// List discovered skills (name and one-line description).
    List {
        /// Config file path (default: SATCHEL_CONFIG_PATH or ~/.satchel/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Show one skill's full document, including per-script argument schemas.
    Show {
        /// Config file path (default: SATCHEL_CONFIG_PATH or ~/.satchel/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Skill name (directory basename under the skills root)
        skill: String,
    },

    /// Run a script inside a skill. Everything after the script name is passed
    /// to it verbatim; exits with the script's own exit code.
    Run {
        /// Config file path (default: SATCHEL_CONFIG_PATH or ~/.satchel/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Text piped to the script's stdin (stdin is closed when omitted)
        #[arg(long, value_name = "TEXT")]
        stdin: Option<String>,

        /// Print the full result (command, exit code, stdout, stderr) as JSON
        #[arg(long)]
        json: bool,

        /// Skill name
        skill: String,

        /// Script name (the .py extension may be omitted)
        script: String,

        /// Arguments passed to the script verbatim
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("satchel {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::List { config }) => {
            if let Err(e) = run_list(config) {
                log::error!("list failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Show { config, skill }) => {
            if let Err(e) = run_show(config, &skill).await {
                log::error!("show failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run {
            config,
            stdin,
            json,
            skill,
            script,
            argv,
        }) => match run_script(config, &skill, &script, argv, stdin, json).await {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                log::error!("run failed: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    lib::gateway::run_gateway(config, path).await
}

/// Build a broker from config the same way the gateway does.
fn make_broker(config_path: Option<std::path::PathBuf>) -> anyhow::Result<lib::broker::SkillBroker> {
    let (config, path) = lib::config::load_config(config_path)?;
    let root = lib::config::resolve_skills_dir(&config, &path);
    let runner = Arc::new(lib::exec::UvScriptRunner::new(
        config.runner.uv_bin.clone(),
        config.runner.timeout(),
    ));
    Ok(lib::broker::SkillBroker::new(root, runner))
}

fn run_list(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let broker = make_broker(config_path)?;
    println!("{}", broker.skills_index()?);
    Ok(())
}

async fn run_show(config_path: Option<std::path::PathBuf>, skill: &str) -> anyhow::Result<()> {
    let broker = make_broker(config_path)?;
    println!("{}", broker.render_skill_for_client(skill).await?);
    Ok(())
}

/// Run the script and mirror its stdio; returns the child's exit code.
async fn run_script(
    config_path: Option<std::path::PathBuf>,
    skill: &str,
    script: &str,
    argv: Vec<String>,
    stdin: Option<String>,
    json: bool,
) -> anyhow::Result<i32> {
    let broker = make_broker(config_path)?;
    let result = broker.run_skill_script(skill, script, argv, stdin).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if !result.stdout.is_empty() {
            print!("{}", result.stdout);
        }
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
    }
    Ok(result.returncode)
}
