//! Intent routing: which product chain should answer a standalone question.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

pub mod semantic;

pub use semantic::SemanticRouteLayer;

/// A named intent plus the example utterances that define it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub utterances: Vec<String>,
}

impl Route {
    pub fn new(name: impl Into<String>, utterances: &[&str]) -> Self {
        Self {
            name: name.into(),
            utterances: utterances.iter().map(|u| u.to_string()).collect(),
        }
    }
}

/// Outcome of classifying one query. `name` is `None` when nothing cleared
/// the classifier's threshold.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteMatch {
    pub name: Option<String>,
    pub score: Option<f32>,
}

impl RouteMatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            score: None,
        }
    }

    pub fn intent(&self) -> Option<Intent> {
        self.name.as_deref().and_then(Intent::from_route_name)
    }
}

/// The shop's intents, one per answer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SmallTalk,
    Headphones,
    Laptop,
    Smartphone,
    Smartwatch,
    HomeTheater,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::SmallTalk,
        Intent::Headphones,
        Intent::Laptop,
        Intent::Smartphone,
        Intent::Smartwatch,
        Intent::HomeTheater,
    ];

    pub fn route_name(self) -> &'static str {
        match self {
            Self::SmallTalk => "small_talk",
            Self::Headphones => "headphones_questions",
            Self::Laptop => "laptop_questions",
            Self::Smartphone => "smartphone_questions",
            Self::Smartwatch => "smartwatch_questions",
            Self::HomeTheater => "home_theater_questions",
        }
    }

    pub fn from_route_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.route_name() == name)
    }

    pub fn utterances(self) -> &'static [&'static str] {
        match self {
            Self::SmallTalk => &["Hey, how are you?", "How's it going?", "Nice weather today"],
            Self::Headphones => &[
                "How much do the ClearSound X7 headphones cost?",
                "What headphones do you offer?",
                "What features does the SoundWave Elite 900 have?",
            ],
            Self::Laptop => &[
                "How much do the TechMax UltraBook 14 laptop cost?",
                "What laptops do you offer?",
                "What features does the SwiftBook Pro 13 have?",
            ],
            Self::Smartphone => &[
                "How much do the TechMax NexTech Pro X smartphone cost?",
                "What smartphones do you offer?",
                "What features does the Galaxy Star G5 have?",
            ],
            Self::Smartwatch => &[
                "How much do the FitGear 6X smartwatch cost?",
                "What smartwatchs do you offer?",
                "What features does the ChronoTrack A1 have?",
            ],
            Self::HomeTheater => &[
                "How much does the Ultimate Home Theater System cost?",
                "What home theater packages do you offer?",
                "What features does the Ultimate Home Theater System have?",
            ],
        }
    }

    pub fn route(self) -> Route {
        Route::new(self.route_name(), self.utterances())
    }
}

/// The configured route set, in classification order.
pub fn default_routes() -> Vec<Route> {
    Intent::ALL.into_iter().map(Intent::route).collect()
}

/// Similarity-based classifier over a fixed route set.
#[async_trait]
pub trait RouteClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<RouteMatch>;

    fn routes(&self) -> &[Route];
}

/// Front door for classification. Guarantees a returned name belongs to the
/// classifier's configured routes.
#[derive(Clone)]
pub struct IntentRouter {
    classifier: Arc<dyn RouteClassifier>,
}

impl IntentRouter {
    pub fn new(classifier: Arc<dyn RouteClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn route(&self, query: &str) -> Result<RouteMatch> {
        let matched = self.classifier.classify(query).await?;
        let known = matched
            .name
            .as_deref()
            .map(|name| self.classifier.routes().iter().any(|r| r.name == name));

        let matched = match known {
            Some(false) => {
                tracing::warn!(route = ?matched.name, "Classifier returned an unconfigured route");
                RouteMatch::none()
            }
            _ => matched,
        };

        tracing::info!(
            query = %query,
            route = matched.name.as_deref().unwrap_or("<none>"),
            score = ?matched.score,
            "Route decision"
        );
        Ok(matched)
    }
}
