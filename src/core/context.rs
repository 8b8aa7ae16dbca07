use super::error::Result;
use super::settings::Settings;
use super::store::ValueStore;

/// Everything a compile needs besides the store itself
#[derive(Debug, Clone, Default)]
pub struct AppContext {
    pub settings: Settings,
    /// Character whose relationships are compiled, if one is selected
    pub active_character: Option<String>,
}

impl AppContext {
    pub fn load<S: ValueStore>(store: &S, active_character: Option<String>) -> Self {
        AppContext {
            settings: Settings::load(store),
            active_character: active_character.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn save<S: ValueStore>(&self, store: &mut S) -> Result<()> {
        self.settings.save(store)
    }

    pub fn with_character(mut self, character_id: impl Into<String>) -> Self {
        let id = character_id.into();
        self.active_character = if id.trim().is_empty() { None } else { Some(id) };
        self
    }

    pub fn character(&self) -> Option<&str> {
        self.active_character.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    #[test]
    fn test_blank_character_is_absent() {
        let store = MemoryStore::new();
        let ctx = AppContext::load(&store, Some("  ".to_string()));
        assert!(ctx.character().is_none());

        let ctx = ctx.with_character("42");
        assert_eq!(ctx.character(), Some("42"));
    }

    #[test]
    fn test_save_persists_settings() {
        let mut store = MemoryStore::new();
        let mut ctx = AppContext::load(&store, None);
        ctx.settings.show_prompt_in_chat = true;
        ctx.save(&mut store).unwrap();

        assert!(AppContext::load(&store, None).settings.show_prompt_in_chat);
    }
}
