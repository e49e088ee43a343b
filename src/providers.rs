//! Upstream provider detection and per-provider formatting policy.
//!
//! A provider is recognised from fragments of its base URL. Each entry in the
//! table also records which tool-calling convention the provider expects and a
//! default base URL, so supporting a new provider means adding a row here.

use std::fmt;

/// Closed set of upstream providers the bridge knows how to format for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Groq,
    Openrouter,
    Openai,
    Fireworks,
    Huggingface,
    Anthropic,
    OpenaiCompatible,
}

/// How tool declarations and tool-choice directives are placed in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolConvention {
    /// `functions` + `function_call`, one function per call.
    Legacy,
    /// `tools` + `tool_choice`, `tool_calls` arrays in responses.
    Modern,
}

#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: Provider,
    pub domain: &'static str,
    pub base_url: &'static str,
    pub convention: ToolConvention,
}

// Order matters: the first matching fragment wins.
const PROFILES: &[ProviderProfile] = &[
    ProviderProfile {
        provider: Provider::Groq,
        domain: "groq.com",
        base_url: "https://api.groq.com/openai/v1",
        convention: ToolConvention::Legacy,
    },
    ProviderProfile {
        provider: Provider::Openrouter,
        domain: "openrouter.ai",
        base_url: "https://openrouter.ai/api/v1",
        convention: ToolConvention::Modern,
    },
    ProviderProfile {
        provider: Provider::Openai,
        domain: "openai.com",
        base_url: "https://api.openai.com/v1",
        convention: ToolConvention::Modern,
    },
    ProviderProfile {
        provider: Provider::Fireworks,
        domain: "fireworks.ai",
        base_url: "https://api.fireworks.ai/inference/v1",
        convention: ToolConvention::Modern,
    },
    ProviderProfile {
        provider: Provider::Huggingface,
        domain: "huggingface.co",
        base_url: "https://router.huggingface.co/v1",
        convention: ToolConvention::Modern,
    },
    ProviderProfile {
        provider: Provider::Anthropic,
        domain: "anthropic.com",
        base_url: "https://api.anthropic.com/v1",
        convention: ToolConvention::Modern,
    },
];

impl Provider {
    /// Classify an upstream base URL. Unknown hosts are treated as generic
    /// OpenAI-compatible servers.
    #[must_use]
    pub fn classify(base_url: &str) -> Provider {
        let url = base_url.to_lowercase();
        PROFILES
            .iter()
            .find(|p| url.contains(p.domain))
            .map_or(Provider::OpenaiCompatible, |p| p.provider)
    }

    /// Look up a provider by its tag, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Provider> {
        let name = name.to_lowercase();
        PROFILES
            .iter()
            .map(|p| p.provider)
            .chain(std::iter::once(Provider::OpenaiCompatible))
            .find(|p| p.as_str() == name)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::Openrouter => "openrouter",
            Provider::Openai => "openai",
            Provider::Fireworks => "fireworks",
            Provider::Huggingface => "huggingface",
            Provider::Anthropic => "anthropic",
            Provider::OpenaiCompatible => "openai-compatible",
        }
    }

    #[must_use]
    pub fn profile(self) -> Option<&'static ProviderProfile> {
        PROFILES.iter().find(|p| p.provider == self)
    }

    #[must_use]
    pub fn tool_convention(self) -> ToolConvention {
        self.profile()
            .map_or(ToolConvention::Modern, |p| p.convention)
    }

    /// Well-known base URL, if the provider has one.
    #[must_use]
    pub fn default_base_url(self) -> Option<&'static str> {
        self.profile().map(|p| p.base_url)
    }

    #[must_use]
    pub fn all() -> &'static [ProviderProfile] {
        PROFILES
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_hosts() {
        assert_eq!(
            Provider::classify("https://api.groq.com/openai/v1"),
            Provider::Groq
        );
        assert_eq!(
            Provider::classify("https://openrouter.ai/api/v1"),
            Provider::Openrouter
        );
        assert_eq!(
            Provider::classify("https://api.openai.com/v1"),
            Provider::Openai
        );
        assert_eq!(
            Provider::classify("https://api.fireworks.ai/inference/v1"),
            Provider::Fireworks
        );
        assert_eq!(
            Provider::classify("https://router.huggingface.co/v1"),
            Provider::Huggingface
        );
        assert_eq!(
            Provider::classify("https://api.anthropic.com/v1"),
            Provider::Anthropic
        );
    }

    #[test]
    fn test_first_matching_fragment_wins() {
        // Both fragments present: groq.com sits above openrouter.ai.
        assert_eq!(
            Provider::classify("https://proxy.openrouter.ai/groq.com/v1"),
            Provider::Groq
        );
        // Position in the URL is irrelevant; table order decides.
        assert_eq!(
            Provider::classify("https://api.openai.com.openrouter.ai/v1"),
            Provider::Openrouter
        );
        assert_eq!(
            Provider::classify("https://gateway.anthropic.com/huggingface.co/v1"),
            Provider::Huggingface
        );
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(
            Provider::classify("HTTPS://API.GROQ.COM/OPENAI/V1"),
            Provider::Groq
        );
    }

    #[test]
    fn test_unknown_host_defaults_to_modern_compatible() {
        let provider = Provider::classify("http://localhost:11434/v1");
        assert_eq!(provider, Provider::OpenaiCompatible);
        assert_eq!(provider.tool_convention(), ToolConvention::Modern);
        assert!(provider.default_base_url().is_none());
    }

    #[test]
    fn test_only_groq_uses_legacy_functions() {
        for profile in Provider::all() {
            let expected = if profile.provider == Provider::Groq {
                ToolConvention::Legacy
            } else {
                ToolConvention::Modern
            };
            assert_eq!(
                profile.provider.tool_convention(),
                expected,
                "Provider {} has the wrong tool convention",
                profile.provider
            );
        }
    }

    #[test]
    fn test_every_default_base_url_classifies_back() {
        for profile in Provider::all() {
            assert_eq!(Provider::classify(profile.base_url), profile.provider);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Provider::from_name("OpenRouter"), Some(Provider::Openrouter));
        assert_eq!(
            Provider::from_name("openai-compatible"),
            Some(Provider::OpenaiCompatible)
        );
        assert_eq!(Provider::from_name("unknown_provider"), None);
    }

    #[test]
    fn test_display_round_trips_through_from_name() {
        for profile in Provider::all() {
            let name = profile.provider.to_string();
            assert_eq!(Provider::from_name(&name), Some(profile.provider));
        }
        assert_eq!(Provider::OpenaiCompatible.to_string(), "openai-compatible");
    }
}
