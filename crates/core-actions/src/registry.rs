//! Explicit registration table compiled into one matching trie per mode.

use crate::action::Action;
use core_events::KeyToken;
use core_keymap::{MappingSpec, MappingTrie, PatternError, Resolution, parse_pattern};
use core_state::Mode;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Index of an action inside its registry.
pub type ActionId = usize;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("action {action} has invalid key pattern {pattern:?}")]
    InvalidPattern {
        action: &'static str,
        pattern: &'static str,
        #[source]
        source: PatternError,
    },
    #[error("action {action} declares no key patterns")]
    NoKeys { action: &'static str },
    #[error("action {action} is not enabled in any mode")]
    NoModes { action: &'static str },
}

pub struct ActionRegistry {
    actions: Vec<Box<dyn Action>>,
    tries: HashMap<Mode, MappingTrie<ActionId>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions.len())
            .field("modes", &self.tries.len())
            .finish()
    }
}

impl ActionRegistry {
    /// Registry holding the built-in catalog only.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_actions(crate::actions::builtin_actions())
    }

    /// Compile `actions` in order. When two actions register the identical
    /// pattern in the same mode the later one wins.
    pub fn from_actions(actions: Vec<Box<dyn Action>>) -> Result<Self, RegistryError> {
        let mut specs: HashMap<Mode, Vec<MappingSpec<ActionId>>> = HashMap::new();
        for (id, action) in actions.iter().enumerate() {
            let name = action.name();
            if action.keys().is_empty() {
                return Err(RegistryError::NoKeys { action: name });
            }
            if action.modes().is_empty() {
                return Err(RegistryError::NoModes { action: name });
            }
            for &pattern in action.keys() {
                let sequence =
                    parse_pattern(pattern).map_err(|source| RegistryError::InvalidPattern {
                        action: name,
                        pattern,
                        source,
                    })?;
                for &mode in action.modes() {
                    specs.entry(mode).or_default().push(MappingSpec {
                        sequence: sequence.clone(),
                        output: id,
                    });
                }
            }
        }
        let tries: HashMap<_, _> = specs
            .into_iter()
            .map(|(mode, specs)| (mode, MappingTrie::build(specs)))
            .collect();
        debug!(
            target: "actions.registry",
            actions = actions.len(),
            modes = tries.len(),
            "registry_built"
        );
        Ok(Self { actions, tries })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn action(&self, id: ActionId) -> Option<&dyn Action> {
        self.actions.get(id).map(|a| a.as_ref())
    }

    /// Resolve `keys` against the actions enabled in `mode`.
    pub fn resolve(&self, mode: Mode, keys: &[KeyToken]) -> Resolution<ActionId> {
        match self.tries.get(&mode) {
            Some(trie) => trie.resolve(keys),
            None => Resolution::NoMatch,
        }
    }

    /// Resolve `keys` knowing no further key will extend them.
    pub fn resolve_final(&self, mode: Mode, keys: &[KeyToken]) -> Resolution<ActionId> {
        match self.tries.get(&mode) {
            Some(trie) => trie.resolve_final(keys),
            None => Resolution::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionContext, ActionError};
    use core_events::parse_key_sequence;

    struct Named(&'static str, &'static [&'static str]);

    impl Action for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn keys(&self) -> &[&'static str] {
            self.1
        }
        fn modes(&self) -> &[Mode] {
            &[Mode::Normal]
        }
        fn exec(&self, _ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
            Ok(())
        }
    }

    fn name_of(reg: &ActionRegistry, res: Resolution<ActionId>) -> Option<&'static str> {
        match res {
            Resolution::Matched { output, .. } => reg.action(output).map(|a| a.name()),
            _ => None,
        }
    }

    #[test]
    fn builtin_catalog_compiles() {
        let reg = ActionRegistry::builtin().unwrap();
        assert!(!reg.is_empty());
        let keys = parse_key_sequence("<Esc>").unwrap();
        assert_eq!(
            name_of(&reg, reg.resolve(Mode::Replace, &keys)),
            Some("exit_replace_mode")
        );
        assert_eq!(
            name_of(&reg, reg.resolve(Mode::Insert, &keys)),
            Some("exit_insert_mode")
        );
    }

    #[test]
    fn modes_are_isolated() {
        let reg = ActionRegistry::from_actions(vec![Box::new(Named("quit", &["q"]))]).unwrap();
        let keys = parse_key_sequence("q").unwrap();
        assert!(name_of(&reg, reg.resolve(Mode::Normal, &keys)).is_some());
        assert_eq!(reg.resolve(Mode::Insert, &keys), Resolution::NoMatch);
    }

    #[test]
    fn later_registration_overrides_identical_pattern() {
        let reg = ActionRegistry::from_actions(vec![
            Box::new(Named("first", &["x"])),
            Box::new(Named("second", &["x"])),
        ])
        .unwrap();
        let keys = parse_key_sequence("x").unwrap();
        assert_eq!(name_of(&reg, reg.resolve(Mode::Normal, &keys)), Some("second"));
    }

    #[test]
    fn bad_patterns_are_rejected() {
        let err = ActionRegistry::from_actions(vec![Box::new(Named("bad", &["<Nope>"]))])
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidPattern {
                action: "bad",
                ..
            }
        ));
        let err = ActionRegistry::from_actions(vec![Box::new(Named("none", &[]))]).unwrap_err();
        assert!(matches!(err, RegistryError::NoKeys { action: "none" }));
    }
}
