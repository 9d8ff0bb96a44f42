use serde::{Deserialize, Serialize};

/// Community post categories, as used by the feed tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PostCategory {
    #[default]
    General,
    Question,
    LanguageTip,
    CulturalExchange,
    Event,
}

impl PostCategory {
    pub const ALL: [PostCategory; 5] = [
        PostCategory::General,
        PostCategory::Question,
        PostCategory::LanguageTip,
        PostCategory::CulturalExchange,
        PostCategory::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::General => "general",
            PostCategory::Question => "question",
            PostCategory::LanguageTip => "language-tip",
            PostCategory::CulturalExchange => "cultural-exchange",
            PostCategory::Event => "event",
        }
    }

    /// Lenient parse: the API has used snake_case, kebab-case and
    /// display labels for the same category over time.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match key.as_str() {
            "general" => Some(PostCategory::General),
            "question" | "questions" => Some(PostCategory::Question),
            "language-tip" | "language-tips" | "tip" | "tips" => Some(PostCategory::LanguageTip),
            "cultural-exchange" | "culture" => Some(PostCategory::CulturalExchange),
            "event" | "events" => Some(PostCategory::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Proficiency {
    Beginner,
    Elementary,
    Intermediate,
    UpperIntermediate,
    Advanced,
    Native,
}

impl Proficiency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proficiency::Beginner => "beginner",
            Proficiency::Elementary => "elementary",
            Proficiency::Intermediate => "intermediate",
            Proficiency::UpperIntermediate => "upper-intermediate",
            Proficiency::Advanced => "advanced",
            Proficiency::Native => "native",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "beginner" | "a1" => Some(Proficiency::Beginner),
            "elementary" | "a2" => Some(Proficiency::Elementary),
            "intermediate" | "b1" => Some(Proficiency::Intermediate),
            "upper-intermediate" | "b2" => Some(Proficiency::UpperIntermediate),
            "advanced" | "c1" | "c2" | "fluent" => Some(Proficiency::Advanced),
            "native" => Some(Proficiency::Native),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(MatchStatus::Pending),
            "accepted" => Some(MatchStatus::Accepted),
            "rejected" | "declined" => Some(MatchStatus::Rejected),
            _ => None,
        }
    }
}

/// How a learner prefers to meet exchange partners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingPreference {
    Online,
    InPerson,
    #[default]
    Both,
}

impl MeetingPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingPreference::Online => "online",
            MeetingPreference::InPerson => "in-person",
            MeetingPreference::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "online" => Some(MeetingPreference::Online),
            "in-person" | "inperson" | "offline" => Some(MeetingPreference::InPerson),
            "both" | "any" => Some(MeetingPreference::Both),
            _ => None,
        }
    }
}
