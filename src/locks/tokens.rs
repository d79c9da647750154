//! Lock token generation and lookup.

use super::namespace::NodeId;
use std::collections::HashMap;

/// Maps opaque lock tokens to the nodes they lock.
///
/// Tokens are decimal strings from a counter seeded at construction. They are
/// unique within one process but are not unguessable.
#[derive(Debug)]
pub(super) struct TokenRegistry {
    counter: u64,
    by_token: HashMap<String, NodeId>,
}

impl TokenRegistry {
    pub fn new(seed: u64) -> Self {
        Self {
            counter: seed,
            by_token: HashMap::new(),
        }
    }

    pub fn next_token(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        self.counter.to_string()
    }

    pub fn register(&mut self, token: String, id: NodeId) {
        self.by_token.insert(token, id);
    }

    pub fn get(&self, token: &str) -> Option<NodeId> {
        self.by_token.get(token).copied()
    }

    pub fn remove(&mut self, token: &str) {
        self.by_token.remove(token);
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase_from_seed() {
        let mut tokens = TokenRegistry::new(41);
        assert_eq!(tokens.next_token(), "42");
        assert_eq!(tokens.next_token(), "43");
    }
}
