use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::core::catalog::{self, TraitEdit, TraitKind};
use crate::core::compiler;
use crate::core::relationship::{peer_key, AffinityModifiers};
use crate::core::{
    on_message_sent, AppContext, InjectionRegistry, PanelPosition, RelationshipBook,
    RelationshipKind, RelationshipRecord, Settings, StoreKey, ValueStore,
};

pub use commands::{
    Args, Commands, NoteCommands, RelationshipCommands, SettingsCommands, TraitCommands,
};

mod commands;

pub fn handle_compile(character: Option<String>, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let store = config.open_store()?;
    let ctx = AppContext::load(&store, character);

    let prompt = compiler::compile(&store, &ctx);
    if prompt.is_empty() {
        eprintln!("(empty prompt)");
    } else {
        println!("{}", prompt);
    }
    Ok(())
}

pub fn handle_send(character: Option<String>, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let store = config.open_store()?;
    let ctx = AppContext::load(&store, character);
    let mut registry = InjectionRegistry::new();

    let Some(injection) = on_message_sent(&store, &ctx, &mut registry) else {
        println!("⏸️  Injection disabled; nothing sent");
        return Ok(());
    };

    if ctx.settings.show_prompt_in_chat {
        println!("{}", serde_json::to_string_pretty(&injection)?);
    } else {
        println!(
            "📤 Injected {} ({} chars, depth {})",
            injection.id,
            injection.text.chars().count(),
            injection.depth
        );
    }
    Ok(())
}

pub fn handle_traits(command: TraitCommands, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let mut store = config.open_store()?;

    match command {
        TraitCommands::List => {
            let groups = catalog::load_trait_groups(&store);
            for group in &groups {
                let state = if group.enabled { "on" } else { "off" };
                println!(
                    "{} {} [{}] ({})",
                    group.icon.as_deref().unwrap_or("•"),
                    group.label,
                    group.id,
                    state
                );
                for t in &group.traits {
                    let value = compiler::resolve_trait_value(&store, t);
                    println!(
                        "  {:<24} {:>4}  ({}..{}, {})",
                        t.id,
                        value,
                        t.min,
                        t.max,
                        t.kind.name()
                    );
                    match &t.kind {
                        TraitKind::AuthorStyle(a) => {
                            println!("      author: {:?}, style: {:?}", a.author, a.style)
                        }
                        TraitKind::Banlist(b) => println!(
                            "      banlist: {}, strength: {}",
                            b.words.join(", "),
                            b.strength.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
                        ),
                        TraitKind::Intensity => {}
                    }
                }
            }
        }
        TraitCommands::Set { id, value } => {
            catalog::set_trait_value(&mut store, &id, value)?;
            let groups = catalog::load_trait_groups(&store);
            if let Some(t) = catalog::find_trait(&groups, &id) {
                let effective = compiler::resolve_trait_value(&store, t);
                if effective != value {
                    println!(
                        "⚠️  {} is outside {}..{}; {} will be used",
                        value, t.min, t.max, effective
                    );
                }
            }
            println!("✅ {} = {}", id, value);
        }
        TraitCommands::Edit {
            id,
            template,
            author,
            style,
            banlist,
            strength,
        } => {
            let edit = TraitEdit {
                template,
                author,
                style,
                banlist,
                strength,
            };
            let updated = catalog::update_trait(&mut store, &id, &edit)?;
            println!("✏️  Updated {}", updated.id);
            println!("   template: {}", updated.prompt_template);
        }
        TraitCommands::ResetPrompt { id } => {
            let updated = catalog::reset_trait_prompt(&mut store, &id)?;
            println!("↩️  {} template restored", updated.id);
        }
        TraitCommands::EnableGroup { id } => {
            catalog::set_group_enabled(&mut store, &id, true)?;
            println!("✅ Group {} enabled", id);
        }
        TraitCommands::DisableGroup { id } => {
            catalog::set_group_enabled(&mut store, &id, false)?;
            println!("⏸️  Group {} disabled", id);
        }
        TraitCommands::Reset => {
            let groups = catalog::reset_trait_groups_to_defaults(&mut store)?;
            println!("↩️  Catalog reset ({} groups)", groups.len());
        }
    }
    Ok(())
}

pub fn handle_notes(command: NoteCommands, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let mut store = config.open_store()?;

    match command {
        NoteCommands::Show => {
            let notes: String = store.load(&StoreKey::Notes).unwrap_or_default();
            if notes.trim().is_empty() {
                println!("No notes.");
            } else {
                println!("{}", notes);
            }
        }
        NoteCommands::Set { text } => {
            store.set(&StoreKey::Notes, &text)?;
            println!("📝 Notes saved");
        }
        NoteCommands::Clear => {
            store.remove(&StoreKey::Notes)?;
            println!("🗑️  Notes cleared");
        }
    }
    Ok(())
}

pub fn handle_relationships(
    command: RelationshipCommands,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let config = Config::new(data_dir)?;
    let mut store = config.open_store()?;

    match command {
        RelationshipCommands::List { character } => {
            let book = RelationshipBook::load(&store, &character);
            if book.is_empty() {
                println!("No relationships found.");
                return Ok(());
            }

            println!("📊 Relationships of {} ({}):", book.character_id(), book.len());
            for (key, record) in book.iter() {
                println!(
                    "  {} [{}] - {} ({}%)",
                    record.name,
                    key,
                    record.kind_label(),
                    record.percentage
                );
                if !record.notes.trim().is_empty() {
                    println!("      notes: {}", record.notes.trim());
                }
                if !record.custom_prompt.trim().is_empty() {
                    println!("      prompt: {}", record.custom_prompt.trim());
                }
            }
        }
        RelationshipCommands::Set {
            character,
            name,
            kind,
            percentage,
            notes,
            prompt,
        } => {
            if character.trim().is_empty() {
                bail!("Character id must not be empty");
            }
            let kind = kind
                .map(|k| k.parse::<RelationshipKind>())
                .transpose()?;

            let mut book = RelationshipBook::load(&store, &character);
            let mut record = match book.get(&name) {
                Some(existing) => existing.clone(),
                None => RelationshipRecord::new(
                    name.as_str(),
                    kind.unwrap_or(RelationshipKind::Neutral),
                ),
            };
            record.name = name;
            if let Some(kind) = kind {
                record.kind = kind.id().to_string();
            }
            if let Some(percentage) = percentage {
                record.percentage = percentage;
            }
            if let Some(notes) = notes {
                record.notes = notes;
            }
            if let Some(prompt) = prompt {
                record.custom_prompt = prompt;
            }

            let key = book.upsert(record)?;
            book.save(&mut store)?;
            println!("💞 Saved {} for {}", key, character);
        }
        RelationshipCommands::Remove { character, name } => {
            let key = peer_key(&name).with_context(|| format!("Invalid peer name {:?}", name))?;
            let mut book = RelationshipBook::load(&store, &character);
            match book.remove(&name) {
                Some(_) => {
                    book.save(&mut store)?;
                    println!("🗑️  Removed {} from {}", key, character);
                }
                None => println!("No relationship {} for {}", key, character),
            }
        }
        RelationshipCommands::Kinds => {
            for kind in RelationshipKind::ALL {
                println!(
                    "  {:<18} {:<6} {:<18} {}",
                    kind.id(),
                    kind.tag(),
                    kind.label(),
                    format_modifiers(kind.modifiers())
                );
                println!("      {}", kind.prompt_fragment(50));
            }
        }
    }
    Ok(())
}

fn format_modifiers(m: AffinityModifiers) -> String {
    format!("{:+}/{:+}", m.negative, m.positive)
}

pub fn handle_settings(command: SettingsCommands, data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let mut store = config.open_store()?;
    let mut settings = Settings::load(&store);

    match command {
        SettingsCommands::Show => {
            println!("⚙️  Settings ({})", store.path().display());
            println!("  enabled: {}", settings.enabled);
            println!("  panel position: {}", settings.panel_position);
            println!("  auto-update relationships: {}", settings.auto_update_relationships);
            println!(
                "  relationship update strength: {}",
                settings.relationship_update_strength
            );
            println!("  show prompt in chat: {}", settings.show_prompt_in_chat);
        }
        SettingsCommands::Set {
            enabled,
            panel_position,
            auto_relationships,
            relationship_strength,
            show_prompt,
        } => {
            if let Some(enabled) = enabled {
                settings.enabled = enabled;
            }
            if let Some(position) = panel_position {
                settings.panel_position = position.parse::<PanelPosition>()?;
            }
            if let Some(auto) = auto_relationships {
                settings.auto_update_relationships = auto;
            }
            if let Some(strength) = relationship_strength {
                settings.set_relationship_update_strength(strength);
            }
            if let Some(show) = show_prompt {
                settings.show_prompt_in_chat = show;
            }
            settings.save(&mut store)?;
            println!("✅ Settings saved");
        }
    }
    Ok(())
}

pub fn handle_reset(data_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::new(data_dir)?;
    let mut store = config.open_store()?;
    let count = store.keys().len();
    store.clear()?;
    println!("🧹 Removed {} stored values", count);
    Ok(())
}
