use serde::{Deserialize, Serialize};

/// A topic and its short description, as found in analysed material
/// or listed in a generated syllabus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicEntry {
    #[serde(alias = "topic")]
    pub topic: String,
    #[serde(alias = "description", default)]
    pub description: String,
}

impl TopicEntry {
    pub fn new(topic: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            description: description.into(),
        }
    }
}

/// Result of analysing the source material.
///
/// `prompt` is the backend's internal instruction text. It is kept so the
/// artifact round-trips, but it is never forwarded to later requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Analysis {
    #[serde(alias = "language", default)]
    pub language: String,
    #[serde(alias = "mainTopics", alias = "main_topics", default)]
    pub main_topics: Vec<TopicEntry>,
    #[serde(alias = "prompt", default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl Analysis {
    pub fn new(language: impl Into<String>, main_topics: Vec<TopicEntry>) -> Self {
        Self {
            language: language.into(),
            main_topics,
            prompt: None,
        }
    }

    pub fn topic_names(&self) -> Vec<&str> {
        self.main_topics.iter().map(|t| t.topic.as_str()).collect()
    }
}
