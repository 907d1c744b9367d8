use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    fmt,
    str::FromStr,
    sync::Arc,
};

use rand::{seq::IteratorRandom, Rng};
use tokio::sync::Mutex;
use tracing::trace;

const RESPONSES: &str = include_str!("../../../static/responses.toml");

/// Most recent picks a category won't repeat.
const HISTORY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Lonely,
    Dysmorphia,
    Comfort,
    Suicidal,
    Anxious,
    Addiction,
    Attention,
}

impl Category {
    pub const ALL: [Self; 7] = [
        Self::Lonely,
        Self::Dysmorphia,
        Self::Comfort,
        Self::Suicidal,
        Self::Anxious,
        Self::Addiction,
        Self::Attention,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Lonely => "lonely",
            Self::Dysmorphia => "dysmorphia",
            Self::Comfort => "comfort",
            Self::Suicidal => "suicidal",
            Self::Anxious => "anxious",
            Self::Addiction => "addiction",
            Self::Attention => "attention",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no responses for `{0}`")]
pub struct UnknownTopic(String);

impl FromStr for Category {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let topic = s.trim();

        Self::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(topic))
            .ok_or_else(|| UnknownTopic(topic.to_owned()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResponsesError {
    #[error("couldn't parse responses: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no responses for category `{0}`")]
    Missing(Category),
}

/// One category's replies, and which of them went out most recently.
#[derive(Debug, Clone)]
struct Pool {
    responses: Vec<String>,
    recent: VecDeque<usize>,
    window: usize,
}

impl Pool {
    fn new(responses: Vec<String>) -> Self {
        let window = HISTORY.min(responses.len().saturating_sub(1));

        Self {
            responses,
            recent: VecDeque::with_capacity(window),
            window,
        }
    }

    fn pick(&mut self, rng: &mut impl Rng) -> &str {
        let index = (0..self.responses.len())
            .filter(|i| !self.recent.contains(i))
            .choose(rng)
            .unwrap_or(0);

        if self.window > 0 {
            if self.recent.len() == self.window {
                self.recent.pop_front();
            }
            self.recent.push_back(index);
        }

        trace!(index, recent = ?self.recent, "picked response");

        &self.responses[index]
    }
}

#[derive(Debug, Clone)]
pub struct Responses {
    pools: HashMap<Category, Pool>,
}

impl Responses {
    /// The replies compiled into the binary.
    pub fn embedded() -> Result<Self, ResponsesError> {
        Self::parse(RESPONSES)
    }

    pub fn parse(text: &str) -> Result<Self, ResponsesError> {
        let mut table: BTreeMap<String, Vec<String>> = toml::from_str(text)?;

        let pools = Category::ALL
            .into_iter()
            .map(|category| {
                table
                    .remove(category.name())
                    .filter(|responses| !responses.is_empty())
                    .map(|responses| (category, Pool::new(responses)))
                    .ok_or(ResponsesError::Missing(category))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { pools })
    }

    pub fn pick(&mut self, category: Category, rng: &mut impl Rng) -> &str {
        self.pools
            .get_mut(&category)
            .map_or("", |pool| pool.pick(rng))
    }
}

/// Shared by every comfort command.
#[derive(Debug, Clone)]
pub struct ComfortData {
    responses: Arc<Mutex<Responses>>,
}

impl ComfortData {
    pub fn new(responses: Responses) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }

    pub async fn pick(&self, category: Category) -> String {
        let mut responses = self.responses.lock().await;
        responses
            .pick(category, &mut rand::thread_rng())
            .to_owned()
    }
}
