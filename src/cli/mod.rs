use std::path::PathBuf;

#[derive(clap::Parser)]
#[command(name = "pikabug", version, about = "word games and kind words for discord")]
pub struct Cli {
    /// Path to the config file. Falls back to `PIKABUG_TOML`, then
    /// `./pikabug.toml`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the parsed configuration and exit.
    Config,

    /// Connect to discord.
    #[default]
    Start,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starts_by_default() {
        let cli = Cli::try_parse_from(["pikabug"]).expect("valid args");

        assert_eq!(cli.command.unwrap_or_default(), Command::Start);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn config_subcommand_with_path() {
        let cli = Cli::try_parse_from(["pikabug", "--config", "bot.toml", "config"])
            .expect("valid args");

        assert_eq!(cli.command, Some(Command::Config));
        assert_eq!(cli.config, Some(PathBuf::from("bot.toml")));
    }
}
