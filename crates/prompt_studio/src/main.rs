use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use prompt_studio::cli::{Cli, Command};
use prompt_studio::commands::{self, ChatOptions};
use prompt_studio::config::StudioConfig;
use prompt_studio::{logging, provider};
use promptsmith::to_text;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Compile {
            input,
            format,
            out_dir,
            all,
        } => commands::compile(&input, format, out_dir.as_deref(), all, &mut stdout),
        Command::Chat {
            document,
            system,
            html,
            save,
            messages,
        } => {
            let config = StudioConfig::from_env()?;
            let system_prompt = match (document, system) {
                (Some(path), _) => to_text(&commands::read_document(&path)?),
                (None, Some(system)) => system,
                (None, None) => String::new(),
            };
            let transport = provider::transport_from_config(&config)?;
            let options = ChatOptions {
                system_prompt,
                html,
                save,
            };
            let cancel = commands::ctrl_c_signal();
            commands::chat(transport, options, &messages, cancel, &mut stdout).await?;
            Ok(())
        }
        Command::Improve { input, format } => {
            let config = StudioConfig::from_env()?;
            let client = provider::completions_client(&config)?;
            let document = commands::read_document(&input)?;
            let cancel = commands::ctrl_c_signal();
            let improved = commands::improve(&client, &document, &cancel).await?;
            writeln!(stdout, "{}", format.serialize(&improved))?;
            Ok(())
        }
    }
}
