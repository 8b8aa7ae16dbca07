use indexmap::IndexMap;
use serde::Serialize;

use super::compiler;
use super::context::AppContext;
use super::store::ValueStore;

/// Identifier the compiled prompt is registered under with the host
pub const INJECTION_ID: &str = "aitrait-traits";
pub const INJECTION_DEPTH: u32 = 1;

/// Where the host places the text; the compiled prompt always goes in-chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionPosition {
    InChat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Injection {
    pub id: String,
    pub text: String,
    pub position: InjectionPosition,
    pub depth: u32,
    /// Whether the host may expand macros inside `text`
    pub scan: bool,
}

impl Injection {
    pub fn compiled(text: String) -> Self {
        Injection {
            id: INJECTION_ID.to_string(),
            text,
            position: InjectionPosition::InChat,
            depth: INJECTION_DEPTH,
            scan: false,
        }
    }
}

/// Host side of prompt injection. Setting an id replaces whatever it held.
pub trait PromptSink {
    fn set_extension_prompt(&mut self, injection: Injection);
}

/// In-process sink keyed by injection id
#[derive(Debug, Default)]
pub struct InjectionRegistry {
    slots: IndexMap<String, Injection>,
}

impl InjectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Injection> {
        self.slots.get(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PromptSink for InjectionRegistry {
    fn set_extension_prompt(&mut self, injection: Injection) {
        self.slots.insert(injection.id.clone(), injection);
    }
}

/// Outbound message hook: compile and hand the result to the host.
///
/// An empty compile is injected too, so stale text never lingers.
pub fn on_message_sent<S: ValueStore, P: PromptSink>(
    store: &S,
    ctx: &AppContext,
    sink: &mut P,
) -> Option<Injection> {
    if !ctx.settings.enabled {
        log::debug!("Prompt injection skipped: disabled");
        return None;
    }

    let injection = Injection::compiled(compiler::compile(store, ctx));
    sink.set_extension_prompt(injection.clone());
    Some(injection)
}
