use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::compiler::parse_stored_value;
use super::error::{CoreError, Result};
use super::store::{StoreKey, ValueStore};
use super::template::{self, Params, Placeholder};

/// Fixed table of relationship kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    Enemies,
    Friends,
    Stranger,
    Ally,
    Rival,
    RomanticInterest,
    Mentor,
    Student,
    Family,
    Neutral,
    Betrayed,
    SecretAdmirer,
}

/// Affinity shifts reserved for automatic relationship updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinityModifiers {
    pub negative: i32,
    pub positive: i32,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 12] = [
        RelationshipKind::Enemies,
        RelationshipKind::Friends,
        RelationshipKind::Stranger,
        RelationshipKind::Ally,
        RelationshipKind::Rival,
        RelationshipKind::RomanticInterest,
        RelationshipKind::Mentor,
        RelationshipKind::Student,
        RelationshipKind::Family,
        RelationshipKind::Neutral,
        RelationshipKind::Betrayed,
        RelationshipKind::SecretAdmirer,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RelationshipKind::Enemies => "enemies",
            RelationshipKind::Friends => "friends",
            RelationshipKind::Stranger => "stranger",
            RelationshipKind::Ally => "ally",
            RelationshipKind::Rival => "rival",
            RelationshipKind::RomanticInterest => "romantic-interest",
            RelationshipKind::Mentor => "mentor",
            RelationshipKind::Student => "student",
            RelationshipKind::Family => "family",
            RelationshipKind::Neutral => "neutral",
            RelationshipKind::Betrayed => "betrayed",
            RelationshipKind::SecretAdmirer => "secret-admirer",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelationshipKind::Enemies => "Enemies",
            RelationshipKind::Friends => "Friends",
            RelationshipKind::Stranger => "Stranger",
            RelationshipKind::Ally => "Ally",
            RelationshipKind::Rival => "Rival",
            RelationshipKind::RomanticInterest => "Romantic interest",
            RelationshipKind::Mentor => "Mentor",
            RelationshipKind::Student => "Student",
            RelationshipKind::Family => "Family",
            RelationshipKind::Neutral => "Neutral",
            RelationshipKind::Betrayed => "Betrayed",
            RelationshipKind::SecretAdmirer => "Secret admirer",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            RelationshipKind::Enemies => "⚔️",
            RelationshipKind::Friends => "👫",
            RelationshipKind::Stranger => "🚶",
            RelationshipKind::Ally => "🤝",
            RelationshipKind::Rival => "🏆",
            RelationshipKind::RomanticInterest => "💕",
            RelationshipKind::Mentor => "👨‍🏫",
            RelationshipKind::Student => "👨‍🎓",
            RelationshipKind::Family => "👨‍👩‍👧",
            RelationshipKind::Neutral => "😐",
            RelationshipKind::Betrayed => "💔",
            RelationshipKind::SecretAdmirer => "😳",
        }
    }

    pub fn modifiers(&self) -> AffinityModifiers {
        let (negative, positive) = match self {
            RelationshipKind::Enemies => (-10, -5),
            RelationshipKind::Friends => (-3, 8),
            RelationshipKind::Stranger => (2, 2),
            RelationshipKind::Ally => (-2, 5),
            RelationshipKind::Rival => (3, 3),
            RelationshipKind::RomanticInterest => (-5, 10),
            RelationshipKind::Mentor => (-4, 6),
            RelationshipKind::Student => (-2, 5),
            RelationshipKind::Family => (-6, 7),
            RelationshipKind::Neutral => (1, 1),
            RelationshipKind::Betrayed => (-15, 2),
            RelationshipKind::SecretAdmirer => (0, 3),
        };
        AffinityModifiers { negative, positive }
    }

    fn fragment_template(&self) -> &'static str {
        match self {
            RelationshipKind::Enemies => "These characters are mortal enemies. Their interactions should reflect deep hostility, conflict, and potential danger.",
            RelationshipKind::Friends => "These characters are close friends. They support each other, show care, and have comfortable rapport.",
            RelationshipKind::Stranger => "These characters are strangers to each other. Interactions should be formal, cautious, and neutral.",
            RelationshipKind::Ally => "These characters are allies with shared goals. They cooperate strategically while maintaining some distance.",
            RelationshipKind::Rival => "These characters are rivals competing for similar goals. Their interactions are competitive but not necessarily hostile.",
            RelationshipKind::RomanticInterest => "These characters have romantic feelings for each other. Their interactions should reflect attraction, affection, and emotional connection.",
            RelationshipKind::Mentor => "One character is a mentor to the other. Interactions should show guidance, knowledge transfer, and growth.",
            RelationshipKind::Student => "One character looks up to the other as a teacher/mentor. Show respect, learning, and admiration.",
            RelationshipKind::Family => "These characters are family members. Family bonds should influence their interactions with {{percentage}}% impact, even in conflict.",
            RelationshipKind::Neutral => "These characters have no strong feelings toward each other. Interactions are cordial but distant.",
            RelationshipKind::Betrayed => "One character has betrayed the other. This trauma should deeply affect their relationship and trust.",
            RelationshipKind::SecretAdmirer => "One character secretly admires/loves the other but hides it. Show hidden feelings and occasional slips.",
        }
    }

    /// Descriptive sentence for this kind at the given strength
    pub fn prompt_fragment(&self, percentage: u8) -> String {
        let mut params = Params::new();
        params.set(Placeholder::Percentage, percentage);
        template::render(self.fragment_template(), &params)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for RelationshipKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim();
        if id == "love-interest" {
            return Ok(RelationshipKind::RomanticInterest);
        }
        RelationshipKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| CoreError::NotFound(format!("relationship kind {}", id)))
    }
}

/// One character's stance toward a peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRecord {
    pub name: String,
    /// Relationship kind id
    pub kind: String,
    #[serde(default = "default_percentage", deserialize_with = "lenient_percentage")]
    pub percentage: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub custom_prompt: String,
}

fn default_percentage() -> u8 {
    50
}

/// Any number is truncated and clamped to 0-100; anything unreadable becomes 50
fn lenient_percentage<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(parse_stored_value(&raw)
        .map(|v| v.clamp(0, 100) as u8)
        .unwrap_or_else(default_percentage))
}

impl RelationshipRecord {
    pub fn new(name: impl Into<String>, kind: RelationshipKind) -> Self {
        RelationshipRecord {
            name: name.into(),
            kind: kind.id().to_string(),
            percentage: default_percentage(),
            notes: String::new(),
            custom_prompt: String::new(),
        }
    }

    pub fn resolved_kind(&self) -> Option<RelationshipKind> {
        self.kind.parse().ok()
    }

    pub fn kind_label(&self) -> &'static str {
        self.resolved_kind().map(|k| k.label()).unwrap_or("Unknown")
    }
}

/// Collection key for a peer display name
pub fn peer_key(name: &str) -> Option<String> {
    let mut key = String::new();
    let mut pending_dash = false;

    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !key.is_empty() {
                key.push('-');
            }
            pending_dash = false;
            key.push(c);
        } else {
            pending_dash = true;
        }
    }

    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Relationship collection of a single character, in insertion order
#[derive(Debug, Clone)]
pub struct RelationshipBook {
    character_id: String,
    records: IndexMap<String, RelationshipRecord>,
}

impl RelationshipBook {
    pub fn new(character_id: impl Into<String>) -> Self {
        RelationshipBook {
            character_id: character_id.into(),
            records: IndexMap::new(),
        }
    }

    /// Load the stored collection. A corrupt collection yields an empty book,
    /// a corrupt record is skipped on its own.
    pub fn load<S: ValueStore>(store: &S, character_id: &str) -> Self {
        let raw = store
            .load::<IndexMap<String, Value>>(&StoreKey::Relationships(character_id.to_string()))
            .unwrap_or_default();

        let mut records = IndexMap::with_capacity(raw.len());
        for (key, value) in raw {
            match serde_json::from_value::<RelationshipRecord>(value) {
                Ok(record) => {
                    records.insert(key, record);
                }
                Err(e) => {
                    log::warn!("Skipping relationship {} of {}: {}", key, character_id, e);
                }
            }
        }

        RelationshipBook {
            character_id: character_id.to_string(),
            records,
        }
    }

    pub fn save<S: ValueStore>(&self, store: &mut S) -> Result<()> {
        store.set(
            &StoreKey::Relationships(self.character_id.clone()),
            &self.records,
        )
    }

    pub fn character_id(&self) -> &str {
        &self.character_id
    }

    /// Insert or replace by peer key; a replaced peer keeps its position
    pub fn upsert(&mut self, mut record: RelationshipRecord) -> Result<String> {
        let key = peer_key(&record.name).ok_or_else(|| {
            CoreError::InvalidValue(format!("invalid peer name {:?}", record.name))
        })?;
        record.name = record.name.trim().to_string();
        record.percentage = record.percentage.min(100);
        self.records.insert(key.clone(), record);
        Ok(key)
    }

    pub fn remove(&mut self, name: &str) -> Option<RelationshipRecord> {
        let key = peer_key(name)?;
        self.records.shift_remove(&key)
    }

    pub fn get(&self, name: &str) -> Option<&RelationshipRecord> {
        let key = peer_key(name)?;
        self.records.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RelationshipRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
