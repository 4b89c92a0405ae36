//! Turn processing configuration

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};

/// How tool results are turned into the assistant's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisPolicy {
    /// Render each result through its operation's fixed template
    Direct,
    /// Ask the model to phrase all results in a second, tool-less completion
    #[default]
    Narrated,
    /// Narrate when every call succeeded, fall back to templates otherwise
    NarratedUnlessFailed,
}

impl std::str::FromStr for SynthesisPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "direct" | "template" => Ok(Self::Direct),
            "narrated" | "narrate" => Ok(Self::Narrated),
            "narrated-unless-failed" => Ok(Self::NarratedUnlessFailed),
            other => Err(ConfigError::InvalidValue(
                "CHAT_SYNTHESIS_POLICY".to_string(),
                format!(
                    "unknown policy '{}' (expected direct, narrated or narrated-unless-failed)",
                    other
                ),
            )),
        }
    }
}

impl std::fmt::Display for SynthesisPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Narrated => write!(f, "narrated"),
            Self::NarratedUnlessFailed => write!(f, "narrated-unless-failed"),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Strategy for phrasing tool results
    pub synthesis_policy: SynthesisPolicy,

    /// Maximum user message length in characters
    pub max_message_length: usize,
}

impl ChatConfig {
    /// Load chat configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            synthesis_policy: get_env_or_default("CHAT_SYNTHESIS_POLICY", "narrated").parse()?,
            max_message_length: parse_env("CHAT_MAX_MESSAGE_LENGTH", 10_000)?,
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            synthesis_policy: SynthesisPolicy::default(),
            max_message_length: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("direct", SynthesisPolicy::Direct)]
    #[case("Template", SynthesisPolicy::Direct)]
    #[case("narrated", SynthesisPolicy::Narrated)]
    #[case("narrated-unless-failed", SynthesisPolicy::NarratedUnlessFailed)]
    #[case("NARRATED_UNLESS_FAILED", SynthesisPolicy::NarratedUnlessFailed)]
    fn test_policy_parsing(#[case] input: &str, #[case] expected: SynthesisPolicy) {
        assert_eq!(input.parse::<SynthesisPolicy>().unwrap(), expected);
    }

    #[test]
    fn test_policy_parsing_rejects_unknown() {
        let result = "sometimes".parse::<SynthesisPolicy>();
        assert!(matches!(result, Err(ConfigError::InvalidValue(_, _))));
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [
            SynthesisPolicy::Direct,
            SynthesisPolicy::Narrated,
            SynthesisPolicy::NarratedUnlessFailed,
        ] {
            assert_eq!(policy.to_string().parse::<SynthesisPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_chat_config_defaults() {
        temp_env::with_vars(
            [
                ("CHAT_SYNTHESIS_POLICY", None::<&str>),
                ("CHAT_MAX_MESSAGE_LENGTH", None),
            ],
            || {
                let config = ChatConfig::from_env().unwrap();
                assert_eq!(config.synthesis_policy, SynthesisPolicy::Narrated);
                assert_eq!(config.max_message_length, 10_000);
            },
        );
    }
}
