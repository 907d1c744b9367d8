use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};

use poise::serenity_prelude::{ActivityData, ChannelId};
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::games::GameKind;

const DEFAULT_PATH: &str = "./pikabug.toml";

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Pikabug, a down-to-earth, laid-back best friend.
- Keep responses human-like.
- Never use outdated phrases or humor.
- For emotional support or advice, respond as a down-to-earth best friend.
- Use laid-back tones in general discussion and keep answers short and blunt.
- Never act overly excited or dramatic.
- In mental health topics, answer thoughtfully, introspectively and vulnerably.
- When asked to choose between options, respond only with the chosen option.
- Keep a strong, confirmed opinion.";

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    pub words: WordsConfig,
    #[serde(default)]
    pub games: GamesConfig,
    #[serde(default)]
    pub points: PointsConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

impl Config {
    /// `--config`, then `PIKABUG_TOML`, then the working directory.
    pub fn path(cli: Option<PathBuf>) -> PathBuf {
        if let Some(path) = cli {
            info!(path = %path.display(), "using config file from command line");
            return path;
        }

        if let Ok(path) = std::env::var("PIKABUG_TOML") {
            info!(path, "looking for config file with PIKABUG_TOML...");
            return path.into();
        }

        warn!(path = DEFAULT_PATH, "PIKABUG_TOML env unset, using default path");
        DEFAULT_PATH.into()
    }

    pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
        let config = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        info!("config loaded");
        Ok(config)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BotConfig {
    #[serde(default = "BotConfig::default_prefix")]
    prefix: String,
    activity: Option<String>,
    status_channel: Option<ChannelId>,
}

impl BotConfig {
    fn default_prefix() -> String {
        "!".to_owned()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn status_channel(&self) -> Option<ChannelId> {
        self.status_channel
    }

    pub fn activity(&self) -> Option<ActivityData> {
        let Some(activity) = self.activity.as_deref().filter(|a| !a.is_empty()) else {
            warn!("no bot.activity provided in config, defaulting to none");
            return None;
        };

        let parsed = if let Some(name) = activity.strip_prefix("playing ") {
            ActivityData::playing(name)
        } else if let Some(name) = activity.strip_prefix("listening to ") {
            ActivityData::listening(name)
        } else if let Some(name) = activity.strip_prefix("watching ") {
            ActivityData::watching(name)
        } else if let Some(name) = activity.strip_prefix("competing in ") {
            ActivityData::competing(name)
        } else {
            error!("bot.activity in config could not be parsed - must start with `playing`, `listening to`, `watching` or `competing in`");
            warn!("disabling bot activity");
            return None;
        };

        debug!(kind = ?parsed.kind, name = %parsed.name, "parsed bot activity");
        Some(parsed)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct LogsConfig {
    #[serde(default)]
    flavor_texts: Vec<String>,
}

impl LogsConfig {
    pub fn flavor_text(&self) -> Option<&str> {
        let flavor_text = self
            .flavor_texts
            .iter()
            .choose(&mut rand::thread_rng())
            .map(String::as_str);

        if flavor_text.is_none() {
            warn!("no flavor texts provided in config :(");
        }

        flavor_text
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WordsConfig {
    pub dictionary: PathBuf,
    /// Words for unscramble and word search. Derived from the dictionary when
    /// unset.
    #[serde(default)]
    pub puzzle: Option<PathBuf>,
    #[serde(default = "WordsConfig::default_min")]
    pub min_puzzle_len: usize,
    #[serde(default = "WordsConfig::default_max")]
    pub max_puzzle_len: usize,
}

impl WordsConfig {
    fn default_min() -> usize {
        4
    }

    fn default_max() -> usize {
        8
    }

    pub fn puzzle_lengths(&self) -> RangeInclusive<usize> {
        self.min_puzzle_len..=self.max_puzzle_len
    }
}

impl Default for WordsConfig {
    fn default() -> Self {
        Self {
            dictionary: PathBuf::from("static/words.txt"),
            puzzle: None,
            min_puzzle_len: Self::default_min(),
            max_puzzle_len: Self::default_max(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GamesConfig {
    /// Seconds a prefix or rhyme race collects answers for.
    pub race_secs: u64,
    pub word_search_secs: u64,
    /// Seconds an unscramble round may sit idle before it expires.
    pub unscramble_idle_secs: u64,
    pub grid_size: usize,
    pub grid_rebuilds: usize,
    /// Fewest rhymes a rhyme race target needs.
    pub min_rhymes: usize,
}

impl GamesConfig {
    pub fn race_window(&self) -> Duration {
        Duration::from_secs(self.race_secs)
    }

    pub fn word_search_window(&self) -> Duration {
        Duration::from_secs(self.word_search_secs)
    }

    pub fn unscramble_idle(&self) -> Duration {
        Duration::from_secs(self.unscramble_idle_secs)
    }
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            race_secs: 12,
            word_search_secs: 300,
            unscramble_idle_secs: 600,
            grid_size: 10,
            grid_rebuilds: 5,
            min_rhymes: 3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PointsConfig {
    pub prefix_race: u64,
    pub rhyme_race: u64,
    /// Per word found.
    pub word_search: u64,
    pub unscramble: u64,
}

impl PointsConfig {
    pub fn for_win(&self, kind: GameKind) -> u64 {
        match kind {
            GameKind::PrefixRace => self.prefix_race,
            GameKind::RhymeRace => self.rhyme_race,
            GameKind::WordSearch => self.word_search,
            GameKind::Unscramble => self.unscramble,
        }
    }
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            prefix_race: 10,
            rhyme_race: 10,
            word_search: 5,
            unscramble: 10,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
    /// How long a failed write keeps being retried.
    pub retry_secs: u64,
}

impl LedgerConfig {
    pub fn retry(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/points.json"),
            retry_secs: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    pub system_prompt: String,
    pub history: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_owned(),
            model: "gpt-4o".to_owned(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            history: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn minimal_config_fills_in_defaults() {
        let file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        std::fs::write(
            file.path(),
            "[bot]\nactivity = \"playing word games\"\n\n[words]\ndictionary = \"words.txt\"\n",
        )
        .expect("write config");

        let config = Config::load(file.path()).expect("valid config");

        assert_eq!(config.bot.prefix(), "!");
        assert_eq!(config.words.puzzle_lengths(), 4..=8);
        assert_eq!(config.games.race_window(), Duration::from_secs(12));
        assert_eq!(config.ai.history, 30);
        assert_eq!(config.points.for_win(GameKind::PrefixRace), 10);
        assert_eq!(
            config.bot.activity().map(|a| a.name),
            Some("word games".to_owned())
        );
    }

    #[test]
    fn unknown_activity_is_disabled() {
        let bot = BotConfig {
            prefix: "!".to_owned(),
            activity: Some("dancing".to_owned()),
            status_channel: None,
        };

        assert!(bot.activity().is_none());
    }
}
