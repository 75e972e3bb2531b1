use serde::{Deserialize, Serialize};

use crate::decl::{CommandDecl, PatternDecl};

/// One token of a command syntax pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatToken {
    /// A literal word the input must contain.
    Lit(String),
    /// A single-word slot bound to an event role.
    Slot(String),
    /// A slot swallowing the rest of the input. Only valid last.
    Rest(String),
}

/// A compiled input pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Tokens in match order.
    pub tokens: Vec<PatToken>,
    /// Text shown when the pattern binds but no rule fires.
    pub no_match: Option<String>,
    /// Help text.
    pub help: Option<String>,
}

/// A compiled command surface, consumed by the input matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Lowercased command name.
    pub name: String,
    /// Alternative spellings.
    pub aliases: Vec<String>,
    /// Patterns in match order.
    pub patterns: Vec<Pattern>,
}

impl CommandSpec {
    /// Compile a command declaration.
    pub fn from_decl(decl: &CommandDecl) -> Self {
        Self {
            name: decl.name.to_lowercase(),
            aliases: decl.aliases.clone(),
            patterns: decl.patterns.iter().map(Pattern::from_decl).collect(),
        }
    }
}

impl Pattern {
    fn from_decl(decl: &PatternDecl) -> Self {
        Self {
            tokens: tokenize_syntax(&decl.syntax),
            no_match: decl.no_match.clone(),
            help: decl.help.clone(),
        }
    }
}

/// Split a syntax template into pattern tokens.
///
/// Words are literals, `{x}` is a slot, and a trailing `{x...}` swallows
/// the rest of the input.
pub fn tokenize_syntax(syntax: &str) -> Vec<PatToken> {
    let parts: Vec<&str> = syntax.split_whitespace().collect();
    let mut tokens = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some(slot) => {
                if last && slot.ends_with("...") {
                    tokens.push(PatToken::Rest(slot.trim_end_matches("...").to_string()));
                } else {
                    tokens.push(PatToken::Slot(slot.to_string()));
                }
            }
            None => tokens.push(PatToken::Lit((*part).to_string())),
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_literals_and_slots() {
        assert_eq!(
            tokenize_syntax("give {target} to {instrument}"),
            vec![
                PatToken::Lit("give".into()),
                PatToken::Slot("target".into()),
                PatToken::Lit("to".into()),
                PatToken::Slot("instrument".into()),
            ]
        );
    }

    #[test]
    fn trailing_rest_slot_swallows_the_tail() {
        assert_eq!(
            tokenize_syntax("say {message...}"),
            vec![
                PatToken::Lit("say".into()),
                PatToken::Rest("message".into()),
            ]
        );
        // Rest markers only count in last position.
        assert_eq!(
            tokenize_syntax("{message...} loudly"),
            vec![
                PatToken::Slot("message...".into()),
                PatToken::Lit("loudly".into()),
            ]
        );
    }

    #[test]
    fn command_names_are_lowercased() {
        let spec = CommandSpec::from_decl(&CommandDecl {
            name: "Give".into(),
            aliases: vec!["hand".into()],
            patterns: vec![PatternDecl {
                syntax: "give {target}".into(),
                no_match: Some("You can't give that.".into()),
                help: None,
            }],
        });
        assert_eq!(spec.name, "give");
        assert_eq!(spec.patterns[0].tokens.len(), 2);
        assert_eq!(
            spec.patterns[0].no_match.as_deref(),
            Some("You can't give that.")
        );
    }
}
