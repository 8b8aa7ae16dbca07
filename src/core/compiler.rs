//! Turns the catalog, stored slider values, notes and the active
//! character's relationships into one prompt block.
//!
//! Nothing here fails on bad persisted data: corrupt entries are logged and
//! replaced by defaults, so `compile` always yields a string.

use serde_json::Value;

use super::catalog::{self, Trait, TraitKind};
use super::context::AppContext;
use super::relationship::RelationshipBook;
use super::store::{StoreKey, ValueStore};
use super::template::{self, Params, Placeholder};

pub const NOTES_HEADER: &str = "[CUSTOM NOTES]";
pub const RELATIONSHIPS_HEADER: &str = "[CHARACTER RELATIONSHIPS]";

const BLOCK_SEPARATOR: &str = "\n\n";

pub fn compile<S: ValueStore>(store: &S, ctx: &AppContext) -> String {
    let mut blocks: Vec<String> = Vec::new();

    for group in catalog::load_trait_groups(store).iter().filter(|g| g.enabled) {
        for t in &group.traits {
            let value = resolve_trait_value(store, t);
            if let Some(text) = compile_trait(t, value) {
                blocks.push(text);
            }
        }
    }

    if let Some(notes) = compile_notes(store) {
        blocks.push(notes);
    }

    if let Some(relationships) = compile_relationships(store, ctx.character()) {
        blocks.push(relationships);
    }

    let prompt = blocks.join(BLOCK_SEPARATOR);
    log::debug!("Compiled {} prompt blocks ({} bytes)", blocks.len(), prompt.len());

    if ctx.settings.show_prompt_in_chat && !prompt.is_empty() {
        log::info!("Compiled prompt:\n{}", prompt);
    }

    prompt
}

/// Render one trait at `value`. `None` when it contributes nothing.
pub fn compile_trait(t: &Trait, value: i64) -> Option<String> {
    let mut params = Params::new();
    params.set(Placeholder::Percentage, value);

    match &t.kind {
        TraitKind::Intensity => {}
        TraitKind::AuthorStyle(settings) => {
            if !settings.author.is_empty() {
                params.set(Placeholder::Author, settings.author.as_str());
            }
            if !settings.style.is_empty() {
                params.set(Placeholder::Style, settings.style.as_str());
            }
        }
        TraitKind::Banlist(settings) => {
            if settings.words.is_empty() {
                // a list placeholder with nothing to list would leave a broken sentence
                if template::has_placeholder(&t.prompt_template, Placeholder::Banlist.as_str()) {
                    log::debug!("Suppressing trait {}: empty banlist", t.id);
                    return None;
                }
            } else {
                params.set(Placeholder::Banlist, settings.words.join(", "));
            }
            if let Some(strength) = settings.strength {
                params.set(Placeholder::Strength, strength);
            }
        }
    }

    let rendered = template::render(&t.prompt_template, &params);
    if rendered.trim().is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// Stored slider value if it is numeric and inside `[min, max]`, else the default
pub fn resolve_trait_value<S: ValueStore>(store: &S, t: &Trait) -> i64 {
    let fallback = t.default.max(t.min).min(t.max);

    let raw = match store.get::<Value>(&StoreKey::TraitValue(t.id.clone())) {
        Ok(Some(raw)) => raw,
        Ok(None) => return fallback,
        Err(e) => {
            log::warn!("Ignoring stored value for trait {}: {}", t.id, e);
            return fallback;
        }
    };

    match parse_stored_value(&raw) {
        Some(v) if v >= t.min && v <= t.max => v,
        _ => fallback,
    }
}

/// Integer reading of a stored slider value
pub fn parse_stored_value(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

/// Leading whitespace, optional sign, then digits; the rest is ignored
fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits_len = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

pub fn compile_notes<S: ValueStore>(store: &S) -> Option<String> {
    let notes: String = store.load(&StoreKey::Notes)?;
    let notes = notes.trim();
    if notes.is_empty() {
        return None;
    }
    Some(format!("{}\n{}", NOTES_HEADER, notes))
}

pub fn compile_relationships<S: ValueStore>(
    store: &S,
    character_id: Option<&str>,
) -> Option<String> {
    let character_id = character_id?;
    let book = RelationshipBook::load(store, character_id);
    if book.is_empty() {
        return None;
    }

    let mut lines = vec![RELATIONSHIPS_HEADER.to_string()];
    for (_, record) in book.iter() {
        lines.push(format!(
            "- With \"{}\": {} ({}%)",
            record.name,
            record.kind_label(),
            record.percentage
        ));
        if !record.notes.is_empty() {
            lines.push(format!("  Notes: {}", record.notes));
        }
        if !record.custom_prompt.is_empty() {
            lines.push(format!("  Instructions: {}", record.custom_prompt));
        }
    }

    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{save_trait_groups, AuthorStyle, Banlist, TraitGroup};
    use crate::core::relationship::{RelationshipKind, RelationshipRecord};
    use crate::core::store::MemoryStore;
    use serde_json::json;

    fn intensity(id: &str, template: &str, default: i64) -> Trait {
        Trait::new(id, id, "•", TraitKind::Intensity, template, default)
    }

    fn banlist(words: &[&str], template: &str) -> Trait {
        Trait::new(
            "bans",
            "Bans",
            "🚫",
            TraitKind::Banlist(Banlist {
                words: words.iter().map(|w| w.to_string()).collect(),
                strength: Some(80),
            }),
            template,
            0,
        )
    }

    fn group(id: &str, traits: Vec<Trait>) -> TraitGroup {
        TraitGroup {
            id: id.to_string(),
            label: id.to_string(),
            icon: None,
            enabled: true,
            traits,
        }
    }

    fn store_with(groups: Vec<TraitGroup>) -> MemoryStore {
        let mut store = MemoryStore::new();
        save_trait_groups(&mut store, &groups).unwrap();
        store
    }

    #[test]
    fn test_intensity_substitutes_every_percentage() {
        let t = intensity("pace", "{{percentage}}% slower, {{percentage}}% faster", 18);
        for v in [0, 1, 42, 100] {
            let text = compile_trait(&t, v).unwrap();
            assert_eq!(text, format!("{v}% slower, {v}% faster"));
        }
    }

    #[test]
    fn test_author_style_params() {
        let t = Trait::new(
            "voice",
            "Voice",
            "📖",
            TraitKind::AuthorStyle(AuthorStyle {
                author: "Elmore Leonard".to_string(),
                style: String::new(),
            }),
            "Like {{author}} ({{style}}) at {{percentage}}%",
            25,
        );
        assert_eq!(
            compile_trait(&t, 25).unwrap(),
            "Like Elmore Leonard ({{style}}) at 25%"
        );
    }

    #[test]
    fn test_empty_banlist_suppressed() {
        for template in ["Avoid {{banlist}}.", "{{banlist}}", "Strict {{strength}}%: {{banlist}}"] {
            assert_eq!(compile_trait(&banlist(&[], template), 50), None);
        }
    }

    #[test]
    fn test_empty_banlist_without_placeholder_still_renders() {
        let t = banlist(&[], "Be strict at {{strength}}%.");
        assert_eq!(compile_trait(&t, 0).unwrap(), "Be strict at 80%.");
    }

    #[test]
    fn test_banlist_joined_in_order() {
        let t = banlist(&["suddenly", "shivers", "orbs"], "Avoid: {{banlist}} ({{strength}}%)");
        assert_eq!(
            compile_trait(&t, 0).unwrap(),
            "Avoid: suddenly, shivers, orbs (80%)"
        );
    }

    #[test]
    fn test_whitespace_output_dropped() {
        let t = intensity("blank", "   \n ", 10);
        assert_eq!(compile_trait(&t, 10), None);
    }

    #[test]
    fn test_resolve_value() {
        let mut store = MemoryStore::new();
        let t = intensity("tension", "{{percentage}}", 56);
        let key = StoreKey::TraitValue("tension".to_string());

        assert_eq!(resolve_trait_value(&store, &t), 56);

        store.set(&key, &70).unwrap();
        assert_eq!(resolve_trait_value(&store, &t), 70);

        store.set(&key, "33").unwrap();
        assert_eq!(resolve_trait_value(&store, &t), 33);

        store.set(&key, " 12px").unwrap();
        assert_eq!(resolve_trait_value(&store, &t), 12);

        store.set(&key, &64.9).unwrap();
        assert_eq!(resolve_trait_value(&store, &t), 64);

        for invalid in [json!("abc"), json!(101), json!(-1), json!(null), json!([5])] {
            store.set(&key, &invalid).unwrap();
            assert_eq!(resolve_trait_value(&store, &t), 56, "{}", invalid);
        }

        store.write("trait-value:tension", json!(70)).unwrap();
        assert_eq!(resolve_trait_value(&store, &t), 56);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  -7 apples"), Some(-7));
        assert_eq!(parse_int_prefix("+3"), Some(3));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("99999999999999999999999"), None);
    }

    #[test]
    fn test_disabled_group_removes_only_its_traits() {
        let mut groups = vec![
            group("a", vec![intensity("a1", "A1={{percentage}}", 1)]),
            group(
                "b",
                vec![
                    intensity("b1", "B1={{percentage}}", 2),
                    intensity("b2", "B2={{percentage}}", 3),
                ],
            ),
            group("c", vec![intensity("c1", "C1={{percentage}}", 4)]),
        ];
        let mut store = store_with(groups.clone());
        store.set(&StoreKey::Notes, "note").unwrap();
        let ctx = AppContext::default();

        assert_eq!(
            compile(&store, &ctx),
            "A1=1\n\nB1=2\n\nB2=3\n\nC1=4\n\n[CUSTOM NOTES]\nnote"
        );

        groups[1].enabled = false;
        save_trait_groups(&mut store, &groups).unwrap();
        assert_eq!(compile(&store, &ctx), "A1=1\n\nC1=4\n\n[CUSTOM NOTES]\nnote");
    }

    #[test]
    fn test_stale_values_ignored() {
        let mut store = store_with(vec![group(
            "g",
            vec![intensity("kept", "K={{percentage}}", 5)],
        )]);
        store.set(&StoreKey::TraitValue("removed".to_string()), &99).unwrap();
        assert_eq!(compile(&store, &AppContext::default()), "K=5");
    }

    #[test]
    fn test_notes_trimmed_and_blank_skipped() {
        let mut store = store_with(vec![]);
        store.set(&StoreKey::Notes, "   \n").unwrap();
        assert_eq!(compile_notes(&store), None);

        store.set(&StoreKey::Notes, "\n  keep it tense  \n").unwrap();
        assert_eq!(
            compile_notes(&store).unwrap(),
            "[CUSTOM NOTES]\nkeep it tense"
        );
    }

    #[test]
    fn test_relationship_block() {
        let mut store = MemoryStore::new();
        let mut book = RelationshipBook::new("hero");

        let mut zed = RelationshipRecord::new("Zed", RelationshipKind::Rival);
        zed.percentage = 10;
        zed.notes = "Lost the duel".to_string();
        book.upsert(zed).unwrap();

        let mut anna = RelationshipRecord::new("Anna", RelationshipKind::Mentor);
        anna.percentage = 90;
        anna.custom_prompt = "Anna speaks in riddles".to_string();
        book.upsert(anna).unwrap();
        book.save(&mut store).unwrap();

        assert_eq!(
            compile_relationships(&store, Some("hero")).unwrap(),
            "[CHARACTER RELATIONSHIPS]\n\
             - With \"Zed\": Rival (10%)\n  Notes: Lost the duel\n\
             - With \"Anna\": Mentor (90%)\n  Instructions: Anna speaks in riddles"
        );
        assert_eq!(compile_relationships(&store, None), None);
        assert_eq!(compile_relationships(&store, Some("villain")), None);
    }

    #[test]
    fn test_compile_is_idempotent_with_defaults() {
        let mut store = MemoryStore::new();
        store.set(&StoreKey::Notes, "sky is always green").unwrap();
        let mut book = RelationshipBook::new("c");
        book.upsert(RelationshipRecord::new("Mara", RelationshipKind::Friends)).unwrap();
        book.save(&mut store).unwrap();

        let ctx = AppContext::default().with_character("c");
        let first = compile(&store, &ctx);
        let second = compile(&store, &ctx);
        assert_eq!(first, second);

        // default catalog: word banlist is empty and must not appear
        assert!(!first.contains("Avoid using these words"));
        assert!(first.starts_with("Write narrative passages in the style of Lee Child (thriller writer). Apply this style with 40% intensity"));
        assert!(first.ends_with("- With \"Mara\": Friends (50%)"));
    }

    #[test]
    fn test_show_prompt_does_not_change_output() {
        let mut store = MemoryStore::new();
        store.set(&StoreKey::Notes, "n").unwrap();
        let mut ctx = AppContext::default();
        let quiet = compile(&store, &ctx);
        ctx.settings.show_prompt_in_chat = true;
        assert_eq!(compile(&store, &ctx), quiet);
    }
}
