use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aitrait")]
#[command(about = "Trait sliders and character relationships compiled into one prompt block")]
#[command(version)]
pub struct Args {
    /// Data directory (defaults to <config dir>/aitrait)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the compiled prompt
    Compile {
        /// Active character whose relationships are included
        #[arg(long)]
        character: Option<String>,
    },
    /// Run the outbound-message hook and show what would be injected
    Send {
        /// Active character whose relationships are included
        #[arg(long)]
        character: Option<String>,
    },
    /// Trait catalog and slider values
    Traits {
        #[command(subcommand)]
        command: TraitCommands,
    },
    /// Free-form notes appended to the prompt
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Per-character relationships
    Relationships {
        #[command(subcommand)]
        command: RelationshipCommands,
    },
    /// Global toggles
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Remove every stored value (sliders, notes, relationships, overrides)
    Reset,
}

#[derive(Subcommand)]
pub enum TraitCommands {
    /// List groups and traits with their current values
    List,
    /// Set a slider value
    Set {
        id: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Edit a trait's template or parameters
    Edit {
        id: String,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        style: Option<String>,
        /// Comma separated words
        #[arg(long)]
        banlist: Option<String>,
        #[arg(long)]
        strength: Option<i64>,
    },
    /// Restore a trait's original template
    ResetPrompt { id: String },
    EnableGroup { id: String },
    DisableGroup { id: String },
    /// Drop the edited catalog and go back to the built-in one
    Reset,
}

#[derive(Subcommand)]
pub enum NoteCommands {
    Show,
    Set { text: String },
    Clear,
}

#[derive(Subcommand)]
pub enum RelationshipCommands {
    /// List a character's relationships in stored order
    List {
        #[arg(long)]
        character: String,
    },
    /// Create or edit a relationship; omitted fields keep their value
    Set {
        #[arg(long)]
        character: String,
        /// Peer display name
        #[arg(long)]
        name: String,
        /// Relationship kind id (see `relationships kinds`)
        #[arg(long)]
        kind: Option<String>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        percentage: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
        /// Extra instructions for this pair
        #[arg(long)]
        prompt: Option<String>,
    },
    Remove {
        #[arg(long)]
        character: String,
        #[arg(long)]
        name: String,
    },
    /// Show the relationship kind table
    Kinds,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    Show,
    Set {
        #[arg(long)]
        enabled: Option<bool>,
        /// left or right
        #[arg(long)]
        panel_position: Option<String>,
        #[arg(long)]
        auto_relationships: Option<bool>,
        /// 0-100
        #[arg(long)]
        relationship_strength: Option<i64>,
        #[arg(long)]
        show_prompt: Option<bool>,
    },
}
