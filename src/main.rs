use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use voice_assistant_lib::config::{self, AppConfig};
use voice_assistant_lib::engine::{unrecognized_message, Dispatch};
use voice_assistant_lib::rule_store::TableId;
use voice_assistant_lib::session::GOODBYE;

#[derive(Parser)]
#[command(name = "voice-assistant")]
#[command(about = "Spoken command interpreter", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Greet, then listen and dispatch until a termination word is heard
    Run {
        /// Read utterances from the keyboard instead of the microphone
        #[arg(long)]
        typed: bool,
    },
    /// Dispatch a single utterance and exit
    Dispatch {
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,
    },
    /// Add or replace an application launch rule
    AddApp { trigger: String, path: PathBuf },
    /// Add or replace a spoken response rule
    AddResponse { trigger: String, response: String },
    /// List both rule tables
    List,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::config_path);
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("加载配置失败 {}: {e}", config_path.display());
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match execute(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands, config: &AppConfig) -> Result<(), String> {
    match command {
        Commands::Run { typed } => voice_assistant_lib::run(config, typed),
        Commands::Dispatch { utterance } => {
            let text = utterance.join(" ");
            let engine = voice_assistant_lib::build_engine(config);
            let mut services = voice_assistant_lib::build_services(config, true)?;
            match engine.dispatch(Some(&text), &mut services) {
                Dispatch::Terminate => services.output.say(GOODBYE),
                Dispatch::Done(result) => match result.spoken {
                    Some(message) => services.output.say(&message),
                    None if !result.handled => services.output.say(&unrecognized_message(&text)),
                    None => {}
                },
            }
            Ok(())
        }
        Commands::AddApp { trigger, path } => {
            if !path.exists() {
                log::warn!("{} 当前不存在，仍然写入", path.display());
            }
            let mut store = voice_assistant_lib::open_store(config);
            store
                .upsert(TableId::Applications, &trigger, &path.display().to_string())
                .map_err(|e| e.to_string())?;
            println!("Added application {trigger}");
            Ok(())
        }
        Commands::AddResponse { trigger, response } => {
            let mut store = voice_assistant_lib::open_store(config);
            store
                .upsert(TableId::Responses, &trigger, &response)
                .map_err(|e| e.to_string())?;
            println!("Added response for {trigger}");
            Ok(())
        }
        Commands::List => {
            let store = voice_assistant_lib::open_store(config);
            for table in [TableId::Applications, TableId::Responses] {
                println!("[{}] {}", table.name(), store.path(table).display());
                for (trigger, value) in store.entries(table) {
                    println!("  {trigger} = {value}");
                }
            }
            Ok(())
        }
    }
}
