//! Declarative rule tables
//!
//! Each table is a list of `{ match: <selector>, action: <action> }` entries that are
//! registered on a [`RuleBook`] in file order. Entries go through the same validation as
//! rules registered in code.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use tunemirror_rules::{Category, ClobberAction, EncodeAction, PathAction, RuleBook, Selector};

/// Which files a declared rule applies to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSpec {
    /// Category keyword or codec name; the table's default when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// File extension, with or without the leading dot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Files must exceed this bitrate (kbps)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_bitrate: Option<f64>,
    /// Regular expression matched against the full source path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl SelectorSpec {
    /// Build the selector, using `default_category` when none is given
    pub fn to_selector(&self, default_category: Category) -> tunemirror_types::Result<Selector> {
        let category = match &self.category {
            Some(name) => name.parse::<Category>()?,
            None => default_category,
        };

        let mut selector = Selector::category(category);
        if let Some(extension) = &self.extension {
            selector = selector.with_extension(extension);
        }
        if let Some(kbps) = self.min_bitrate {
            selector = selector.with_min_bitrate(kbps);
        }
        if let Some(pattern) = &self.pattern {
            selector = selector.with_pattern(pattern)?;
        }
        Ok(selector)
    }
}

/// One declared rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec<A> {
    /// Selector; matches the table's default category when omitted
    #[serde(rename = "match", default)]
    pub selector: SelectorSpec,
    /// What the rule yields
    pub action: A,
}

/// Encode action: `skip`, `copy`, `reencode`, a target extension, or a map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodeSpec {
    /// Keyword or bare target extension
    Keyword(String),
    /// Conversion with optional extension and quality
    Convert {
        /// Target extension
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
        /// Encoder quality
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quality: Option<f64>,
    },
}

impl EncodeSpec {
    fn to_action(&self) -> EncodeAction {
        match self {
            Self::Keyword(word) => match word.trim().to_ascii_lowercase().as_str() {
                "skip" => EncodeAction::Skip,
                "copy" => EncodeAction::Copy,
                "reencode" => EncodeAction::Reencode,
                extension => EncodeAction::convert_to(extension),
            },
            Self::Convert {
                extension,
                quality: Some(quality),
            } => EncodeAction::convert_with_quality(extension.as_deref(), *quality),
            Self::Convert {
                extension: Some(extension),
                quality: None,
            } => EncodeAction::convert_to(extension),
            Self::Convert {
                extension: None,
                quality: None,
            } => EncodeAction::Convert {
                extension: None,
                quality: None,
            },
        }
    }
}

/// Clobber action: `overwrite`, `keep`, `rename`, a boolean, or `{ suffix: ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClobberSpec {
    /// `true` overwrites, `false` keeps
    Flag(bool),
    /// Keyword
    Keyword(String),
    /// Insert a suffix before the extension
    Suffix {
        /// Text inserted before the extension
        suffix: String,
    },
}

impl ClobberSpec {
    fn to_action(&self, key: &str) -> ConfigResult<ClobberAction> {
        Ok(match self {
            Self::Flag(overwrite) => ClobberAction::from(*overwrite),
            Self::Keyword(word) => match word.trim().to_ascii_lowercase().as_str() {
                "overwrite" => ClobberAction::Overwrite,
                "keep" => ClobberAction::Keep,
                "rename" => ClobberAction::Rename,
                other => {
                    return Err(ConfigError::rule(
                        key,
                        format!(
                            "unknown clobber action '{}' (expected overwrite, keep, rename or {{ suffix }})",
                            other
                        ),
                    ))
                }
            },
            Self::Suffix { suffix } => ClobberAction::Suffix(suffix.clone()),
        })
    }
}

/// All declared rule tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Encode decisions
    pub encode: Vec<RuleSpec<EncodeSpec>>,
    /// Target path derivation (`preserve`)
    pub path: Vec<RuleSpec<String>>,
    /// Encoder options
    pub options: Vec<RuleSpec<String>>,
    /// Encoder effect options
    pub effect_options: Vec<RuleSpec<String>>,
    /// Existing-target policy
    pub clobber: Vec<RuleSpec<ClobberSpec>>,
    /// Whether stale target files are deleted
    pub remove_missing: Vec<RuleSpec<bool>>,
}

impl RulesConfig {
    /// Whether no rules are declared
    pub fn is_empty(&self) -> bool {
        self.encode.is_empty()
            && self.path.is_empty()
            && self.options.is_empty()
            && self.effect_options.is_empty()
            && self.clobber.is_empty()
            && self.remove_missing.is_empty()
    }

    /// Register every declared rule on `book`
    ///
    /// The first invalid entry aborts with an error naming its table and index.
    pub fn build(&self, book: &mut RuleBook) -> ConfigResult<()> {
        for (i, rule) in self.encode.iter().enumerate() {
            let key = format!("rules.encode[{}]", i);
            let selector = selector(&key, &rule.selector, Category::Audio)?;
            book.encode(selector, rule.action.to_action())
                .map_err(|e| invalid(&key, &e))?;
        }

        for (i, rule) in self.path.iter().enumerate() {
            let key = format!("rules.path[{}]", i);
            let selector = selector(&key, &rule.selector, Category::Audio)?;
            let action = match rule.action.trim().to_ascii_lowercase().as_str() {
                "preserve" | "preserve_relative" => PathAction::PreserveRelative,
                other => {
                    return Err(ConfigError::rule(
                        key,
                        format!("unknown path action '{}'", other),
                    ))
                }
            };
            book.path(selector, action).map_err(|e| invalid(&key, &e))?;
        }

        for (i, rule) in self.options.iter().enumerate() {
            let key = format!("rules.options[{}]", i);
            let selector = selector(&key, &rule.selector, Category::Audio)?;
            book.options(selector, rule.action.clone())
                .map_err(|e| invalid(&key, &e))?;
        }

        for (i, rule) in self.effect_options.iter().enumerate() {
            let key = format!("rules.effect_options[{}]", i);
            let selector = selector(&key, &rule.selector, Category::Audio)?;
            book.effect_options(selector, rule.action.clone())
                .map_err(|e| invalid(&key, &e))?;
        }

        for (i, rule) in self.clobber.iter().enumerate() {
            let key = format!("rules.clobber[{}]", i);
            let selector = selector(&key, &rule.selector, Category::Everything)?;
            let action = rule.action.to_action(&key)?;
            book.clobber(selector, action).map_err(|e| invalid(&key, &e))?;
        }

        for (i, rule) in self.remove_missing.iter().enumerate() {
            let key = format!("rules.remove_missing[{}]", i);
            let selector = selector(&key, &rule.selector, Category::Everything)?;
            book.remove_missing(selector, rule.action)
                .map_err(|e| invalid(&key, &e))?;
        }

        Ok(())
    }

    /// Default rule book with the declared rules applied on top
    pub fn rule_book(&self) -> ConfigResult<RuleBook> {
        let mut book = RuleBook::new();
        self.build(&mut book)?;
        Ok(book)
    }
}

fn selector(key: &str, spec: &SelectorSpec, default_category: Category) -> ConfigResult<Selector> {
    spec.to_selector(default_category)
        .map_err(|e| invalid(key, &e))
}

fn invalid(key: &str, error: &tunemirror_types::Error) -> ConfigError {
    ConfigError::rule(key, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const RULES: &str = r#"
encode:
  - { match: { category: lossy, min_bitrate: 96 }, action: skip }
  - { match: { category: lossless }, action: { extension: ogg, quality: 6 } }
  - { match: { extension: wav }, action: mp3 }
clobber:
  - { action: rename }
  - { match: { extension: jpg }, action: { suffix: "-cover" } }
remove_missing:
  - { match: { pattern: "\\.keep$" }, action: false }
options:
  - { match: { category: vorbis }, action: "-r 44100" }
"#;

    #[test]
    fn test_parses_and_builds() {
        let rules: RulesConfig = serde_yaml::from_str(RULES).unwrap();

        assert_eq!(rules.encode[0].action, EncodeSpec::Keyword("skip".into()));
        assert_eq!(
            rules.encode[1].action,
            EncodeSpec::Convert {
                extension: Some("ogg".into()),
                quality: Some(6.0)
            }
        );
        assert_eq!(
            rules.clobber[1].action,
            ClobberSpec::Suffix {
                suffix: "-cover".into()
            }
        );
        assert_eq!(rules.clobber[0].selector, SelectorSpec::default());

        let book = rules.rule_book().unwrap();
        assert_eq!(book.encode_rules().len(), 4);
        assert_eq!(book.clobber_rules().len(), 2);
        assert_eq!(book.remove_missing_rules().len(), 2);
    }

    #[rstest]
    #[case(EncodeSpec::Keyword("copy".into()), EncodeAction::Copy)]
    #[case(EncodeSpec::Keyword("Skip".into()), EncodeAction::Skip)]
    #[case(EncodeSpec::Keyword("reencode".into()), EncodeAction::Reencode)]
    #[case(EncodeSpec::Keyword("ogg".into()), EncodeAction::convert_to("ogg"))]
    #[case(
        EncodeSpec::Convert { extension: None, quality: Some(3.0) },
        EncodeAction::convert_with_quality(None, 3.0)
    )]
    fn test_encode_actions(#[case] spec: EncodeSpec, #[case] expected: EncodeAction) {
        assert_eq!(spec.to_action(), expected);
    }

    #[rstest]
    #[case("encode:\n  - { match: { category: everything }, action: ogg }\n", "rules.encode[0]")]
    #[case("encode:\n  - { action: lossy }\n", "rules.encode[0]")]
    #[case("encode:\n  - { action: { } }\n", "rules.encode[0]")]
    #[case("options:\n  - { match: { category: nonaudio }, action: x }\n", "rules.options[0]")]
    #[case("clobber:\n  - { action: smash }\n", "rules.clobber[0]")]
    #[case("clobber:\n  - { action: { suffix: \"\" } }\n", "rules.clobber[0]")]
    #[case("path:\n  - { action: flatten }\n", "rules.path[0]")]
    #[case("remove_missing:\n  - { match: { pattern: \"(\" }, action: true }\n", "rules.remove_missing[0]")]
    fn test_invalid_rules_name_their_entry(#[case] yaml: &str, #[case] key: &str) {
        let rules: RulesConfig = serde_yaml::from_str(yaml).unwrap();
        let error = rules.rule_book().unwrap_err();
        assert!(matches!(&error, ConfigError::Rule { key: k, .. } if k == key), "{}", error);
    }

    #[test]
    fn test_default_categories() {
        let spec = SelectorSpec::default();
        assert_eq!(
            spec.to_selector(Category::Audio).unwrap(),
            Selector::audio()
        );
        assert_eq!(
            spec.to_selector(Category::Everything).unwrap(),
            Selector::everything()
        );
    }
}
