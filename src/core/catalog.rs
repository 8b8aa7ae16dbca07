use serde::{Deserialize, Serialize};

use super::error::{CoreError, Result};
use super::store::{StoreKey, ValueStore};

/// A titled set of traits that is compiled only while enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitGroup {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub traits: Vec<Trait>,
}

fn default_enabled() -> bool {
    true
}

/// A slider-controlled dimension with the template it feeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TraitRecord", into = "TraitRecord")]
pub struct Trait {
    pub id: String,
    pub label: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub kind: TraitKind,
    pub prompt_template: String,
    /// Original template, restored by `reset_trait_prompt`
    pub default_prompt_template: String,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraitKind {
    Intensity,
    AuthorStyle(AuthorStyle),
    Banlist(Banlist),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthorStyle {
    pub author: String,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Banlist {
    pub words: Vec<String>,
    /// 0-100, how strictly the list is enforced
    pub strength: Option<u8>,
}

impl TraitKind {
    pub fn name(&self) -> &'static str {
        match self {
            TraitKind::Intensity => "intensity",
            TraitKind::AuthorStyle(_) => "author-based",
            TraitKind::Banlist(_) => "banlist",
        }
    }
}

// Persisted shape of a trait: `type` tag plus a loose `settings` object.

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
enum KindTag {
    #[default]
    #[serde(rename = "intensity")]
    Intensity,
    #[serde(rename = "author-based")]
    AuthorBased,
    #[serde(rename = "banlist")]
    Banlist,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    banlist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strength: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraitRecord {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(rename = "type", default)]
    kind: KindTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<SettingsRecord>,
    #[serde(default)]
    prompt_template: String,
    #[serde(default)]
    default_prompt_template: String,
    #[serde(default)]
    min: i64,
    #[serde(default = "default_max")]
    max: i64,
    #[serde(default)]
    default: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

fn default_max() -> i64 {
    100
}

impl TryFrom<TraitRecord> for Trait {
    type Error = String;

    fn try_from(record: TraitRecord) -> std::result::Result<Self, Self::Error> {
        if record.min > record.max {
            return Err(format!(
                "trait {}: min {} exceeds max {}",
                record.id, record.min, record.max
            ));
        }
        if record.default < record.min || record.default > record.max {
            return Err(format!(
                "trait {}: default {} outside [{}, {}]",
                record.id, record.default, record.min, record.max
            ));
        }

        let settings = record.settings.unwrap_or_default();
        let kind = match record.kind {
            KindTag::Intensity => TraitKind::Intensity,
            KindTag::AuthorBased => TraitKind::AuthorStyle(AuthorStyle {
                author: settings.author.unwrap_or_default(),
                style: settings.style.unwrap_or_default(),
            }),
            KindTag::Banlist => TraitKind::Banlist(Banlist {
                words: settings.banlist.unwrap_or_default(),
                strength: settings.strength.map(|s| s.clamp(0, 100) as u8),
            }),
        };

        let default_prompt_template = if record.default_prompt_template.is_empty() {
            record.prompt_template.clone()
        } else {
            record.default_prompt_template
        };

        Ok(Trait {
            id: record.id,
            label: record.label,
            icon: record.icon,
            description: record.description,
            kind,
            prompt_template: record.prompt_template,
            default_prompt_template,
            min: record.min,
            max: record.max,
            default: record.default,
        })
    }
}

impl From<Trait> for TraitRecord {
    fn from(t: Trait) -> Self {
        let (kind, settings) = match t.kind {
            TraitKind::Intensity => (KindTag::Intensity, None),
            TraitKind::AuthorStyle(a) => (
                KindTag::AuthorBased,
                Some(SettingsRecord {
                    author: Some(a.author),
                    style: Some(a.style),
                    ..Default::default()
                }),
            ),
            TraitKind::Banlist(b) => (
                KindTag::Banlist,
                Some(SettingsRecord {
                    banlist: Some(b.words),
                    strength: b.strength.map(i64::from),
                    ..Default::default()
                }),
            ),
        };

        TraitRecord {
            id: t.id,
            label: t.label,
            icon: t.icon,
            kind,
            settings,
            prompt_template: t.prompt_template,
            default_prompt_template: t.default_prompt_template,
            min: t.min,
            max: t.max,
            default: t.default,
            description: t.description,
        }
    }
}

/// Partial edit applied by `update_trait`
#[derive(Debug, Clone, Default)]
pub struct TraitEdit {
    pub template: Option<String>,
    pub author: Option<String>,
    pub style: Option<String>,
    /// Comma separated words
    pub banlist: Option<String>,
    pub strength: Option<i64>,
}

impl Trait {
    /// A 0-100 trait whose current template is also its reset template
    pub fn new(
        id: &str,
        label: &str,
        icon: &str,
        kind: TraitKind,
        template: &str,
        default: i64,
    ) -> Self {
        Trait {
            id: id.to_string(),
            label: label.to_string(),
            icon: Some(icon.to_string()),
            description: None,
            kind,
            prompt_template: template.to_string(),
            default_prompt_template: template.to_string(),
            min: 0,
            max: 100,
            default,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_bounds(mut self, min: i64, max: i64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn apply(&mut self, edit: &TraitEdit) -> Result<()> {
        let wants_author_style = edit.author.is_some() || edit.style.is_some();
        let wants_banlist = edit.banlist.is_some() || edit.strength.is_some();

        let mismatch = match &self.kind {
            TraitKind::AuthorStyle(_) if wants_banlist => Some("banlist/strength"),
            TraitKind::Banlist(_) if wants_author_style => Some("author/style"),
            TraitKind::Intensity if wants_author_style || wants_banlist => {
                Some("author/style/banlist/strength")
            }
            _ => None,
        };
        if let Some(fields) = mismatch {
            return Err(self.kind_mismatch(fields));
        }

        if let Some(template) = &edit.template {
            if !template.trim().is_empty() {
                self.prompt_template = template.clone();
            }
        }

        match &mut self.kind {
            TraitKind::AuthorStyle(settings) => {
                if let Some(author) = &edit.author {
                    settings.author = author.trim().to_string();
                }
                if let Some(style) = &edit.style {
                    settings.style = style.trim().to_string();
                }
            }
            TraitKind::Banlist(settings) => {
                if let Some(words) = &edit.banlist {
                    settings.words = split_banlist(words);
                }
                if let Some(strength) = edit.strength {
                    settings.strength = Some(strength.clamp(0, 100) as u8);
                }
            }
            TraitKind::Intensity => {}
        }

        Ok(())
    }

    fn kind_mismatch(&self, fields: &str) -> CoreError {
        CoreError::InvalidValue(format!(
            "trait {} is {}; {} cannot be set",
            self.id,
            self.kind.name(),
            fields
        ))
    }
}

/// Split comma separated words, dropping blanks
pub fn split_banlist(text: &str) -> Vec<String> {
    text.split(',')
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// Built-in catalog. Every call builds a fresh copy.
pub fn default_trait_groups() -> Vec<TraitGroup> {
    vec![
        TraitGroup {
            id: "world-settings".to_string(),
            label: "World and style".to_string(),
            icon: Some("🌍".to_string()),
            enabled: true,
            traits: vec![
                Trait::new(
                    "narrative-style",
                    "Narration in the style of an author",
                    "📖",
                    TraitKind::AuthorStyle(AuthorStyle {
                        author: "Lee Child".to_string(),
                        style: "thriller".to_string(),
                    }),
                    "Write narrative passages in the style of {{author}} ({{style}} writer). Apply this style with {{percentage}}% intensity in descriptions.",
                    40,
                )
                .with_description("Narrative style intensity"),
                Trait::new(
                    "plot-development",
                    "Plot development in the style of an author",
                    "📚",
                    TraitKind::AuthorStyle(AuthorStyle {
                        author: "Robert Ludlum".to_string(),
                        style: "espionage-thriller".to_string(),
                    }),
                    "Develop plot points in the style of {{author}}, maintaining {{style}} atmosphere. Use {{percentage}}% of their characteristic plot techniques.",
                    60,
                ),
                Trait::new(
                    "dialogue-style",
                    "Dialogue in the style of an author",
                    "💬",
                    TraitKind::AuthorStyle(AuthorStyle {
                        author: "Elmore Leonard".to_string(),
                        style: "minimalist".to_string(),
                    }),
                    "Write dialogue in the style of {{author}} with {{percentage}}% adherence to their {{style}} approach. Keep conversations natural and {{percentage}}% authentic.",
                    25,
                ),
                Trait::new(
                    "action-realism",
                    "Realism of actions and consequences",
                    "⚔️",
                    TraitKind::Intensity,
                    "Maintain {{percentage}}% realism in character actions and their consequences. Show realistic physical and emotional impacts.",
                    70,
                ),
                Trait::new(
                    "tension-suspense",
                    "Tension and suspense",
                    "😰",
                    TraitKind::Intensity,
                    "Build {{percentage}}% tension and suspense in scenes. Create pacing and atmosphere that keeps readers engaged.",
                    56,
                ),
                Trait::new(
                    "gore-level",
                    "Naturalism of violence",
                    "🔴",
                    TraitKind::Intensity,
                    "Depict violence and gore with {{percentage}}% naturalism. Describe physical impacts with appropriate detail level.",
                    30,
                ),
                Trait::new(
                    "event-pacing",
                    "Pacing of events",
                    "⏱️",
                    TraitKind::Intensity,
                    "Set event pacing to {{percentage}}% speed. {{percentage}}% slower = contemplative, {{percentage}}% faster = action-packed.",
                    18,
                ),
            ],
        },
        TraitGroup {
            id: "sensations-language".to_string(),
            label: "Sensations and language".to_string(),
            icon: Some("🎭".to_string()),
            enabled: true,
            traits: vec![
                Trait::new(
                    "detailed-sensations",
                    "Detailed physical sensations",
                    "👁️",
                    TraitKind::Intensity,
                    "Include detailed descriptions of physical sensations (touch, temperature, texture, pain, pleasure, taste, smell). Use {{percentage}}% sensory depth.",
                    76,
                ),
                Trait::new(
                    "word-banlist",
                    "Banned words",
                    "🚫",
                    TraitKind::Banlist(Banlist {
                        words: Vec::new(),
                        strength: Some(80),
                    }),
                    "Avoid using these words: {{banlist}}. Enforce this restriction with {{strength}}% strictness.",
                    0,
                )
                .with_description(
                    "Banlist strength (0% = gentle suggestion, 100% = strict prohibition)",
                ),
                Trait::new(
                    "profanity-level",
                    "Profanity in dialogue",
                    "🗣️",
                    TraitKind::Intensity,
                    "Include profanity in dialogue at {{percentage}}% frequency. (0% = none, 100% = frequent)",
                    43,
                ),
            ],
        },
    ]
}

/// Persisted override if readable, built-in defaults otherwise
pub fn load_trait_groups<S: ValueStore>(store: &S) -> Vec<TraitGroup> {
    match store.get::<Vec<TraitGroup>>(&StoreKey::TraitsOverride) {
        Ok(Some(groups)) => groups,
        Ok(None) => default_trait_groups(),
        Err(e) => {
            log::warn!("Failed to load trait catalog override, using defaults: {}", e);
            default_trait_groups()
        }
    }
}

pub fn save_trait_groups<S: ValueStore>(store: &mut S, groups: &[TraitGroup]) -> Result<()> {
    store.set(&StoreKey::TraitsOverride, groups)?;
    log::debug!("Saved trait catalog override ({} groups)", groups.len());
    Ok(())
}

pub fn reset_trait_groups_to_defaults<S: ValueStore>(store: &mut S) -> Result<Vec<TraitGroup>> {
    store.remove(&StoreKey::TraitsOverride)?;
    log::info!("Trait catalog reset to defaults");
    Ok(default_trait_groups())
}

pub fn find_trait<'a>(groups: &'a [TraitGroup], trait_id: &str) -> Option<&'a Trait> {
    groups
        .iter()
        .flat_map(|g| g.traits.iter())
        .find(|t| t.id == trait_id)
}

fn find_trait_mut<'a>(groups: &'a mut [TraitGroup], trait_id: &str) -> Result<&'a mut Trait> {
    groups
        .iter_mut()
        .flat_map(|g| g.traits.iter_mut())
        .find(|t| t.id == trait_id)
        .ok_or_else(|| CoreError::NotFound(format!("trait {}", trait_id)))
}

/// Apply an edit to one trait and persist the whole catalog
pub fn update_trait<S: ValueStore>(
    store: &mut S,
    trait_id: &str,
    edit: &TraitEdit,
) -> Result<Trait> {
    let mut groups = load_trait_groups(store);
    let updated = {
        let t = find_trait_mut(&mut groups, trait_id)?;
        t.apply(edit)?;
        t.clone()
    };
    save_trait_groups(store, &groups)?;
    Ok(updated)
}

pub fn reset_trait_prompt<S: ValueStore>(store: &mut S, trait_id: &str) -> Result<Trait> {
    let mut groups = load_trait_groups(store);
    let updated = {
        let t = find_trait_mut(&mut groups, trait_id)?;
        t.prompt_template = t.default_prompt_template.clone();
        t.clone()
    };
    save_trait_groups(store, &groups)?;
    Ok(updated)
}

pub fn set_group_enabled<S: ValueStore>(
    store: &mut S,
    group_id: &str,
    enabled: bool,
) -> Result<()> {
    let mut groups = load_trait_groups(store);
    let group = groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| CoreError::NotFound(format!("group {}", group_id)))?;
    group.enabled = enabled;
    save_trait_groups(store, &groups)
}

/// Store a slider value; reads fall back to the default when it is out of range
pub fn set_trait_value<S: ValueStore>(store: &mut S, trait_id: &str, value: i64) -> Result<()> {
    let groups = load_trait_groups(store);
    if find_trait(&groups, trait_id).is_none() {
        return Err(CoreError::NotFound(format!("trait {}", trait_id)));
    }
    store.set(&StoreKey::TraitValue(trait_id.to_string()), &value)
}
