//! Wordlist-driven name permutations.

use crate::discovery::PermutationGenerator;
use crate::surface::hierarchy::registrable_domain;
use crate::types::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

/// Labels commonly found in front of, or joined to, real host names.
const DEFAULT_WORDS: &[&str] = &[
    "www", "api", "admin", "dev", "staging", "stage", "test", "qa", "uat",
    "prod", "beta", "demo", "internal", "corp", "vpn", "mail", "portal",
    "app", "auth", "login", "sso", "cdn", "static", "assets", "media",
    "docs", "status", "monitor", "grafana", "jenkins", "ci", "git", "gitlab",
    "jira", "wiki", "db", "backup", "old", "new", "legacy", "v1", "v2",
];

/// Default cap on the number of generated candidates.
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Generates candidate names by combining seeds with a wordlist.
///
/// For `api.example.com` and the word `dev` this yields
/// `dev.api.example.com`, `dev-api.example.com` and `api-dev.example.com`,
/// plus `api1.example.com`/`api3.example.com` style neighbours for labels
/// ending in a number. Joined variants are only built for names below
/// their registrable domain, so `example.com` never turns into a
/// different registrable domain.
#[derive(Debug, Clone)]
pub struct WordlistPermuter {
    words: Vec<String>,
    max_size: usize,
}

impl Default for WordlistPermuter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl WordlistPermuter {
    /// Create a permuter using the built-in wordlist.
    pub fn new(max_size: usize) -> Self {
        Self {
            words: DEFAULT_WORDS.iter().map(|w| w.to_string()).collect(),
            max_size,
        }
    }

    /// Replace the wordlist.
    pub fn with_words(mut self, words: Vec<String>) -> Self {
        self.words = words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    /// All candidates for one seed and one word.
    fn word_variants(seed: &str, word: &str, joinable: bool) -> Vec<String> {
        let mut variants = vec![format!("{}.{}", word, seed)];

        if joinable {
            if let Some((first, rest)) = seed.split_once('.') {
                if first != word {
                    variants.push(format!("{}-{}.{}", word, first, rest));
                    variants.push(format!("{}-{}.{}", first, word, rest));
                }
            }
        }

        variants
    }

    /// Neighbouring numbers for a first label ending in digits.
    fn number_variants(seed: &str) -> Vec<String> {
        let Some((first, rest)) = seed.split_once('.') else {
            return Vec::new();
        };

        let prefix = first.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &first[prefix.len()..];
        let Ok(n) = digits.parse::<u32>() else {
            return Vec::new();
        };

        let mut variants = Vec::new();
        if n > 0 {
            variants.push(format!("{}{}.{}", prefix, n - 1, rest));
        }
        variants.push(format!("{}{}.{}", prefix, n + 1, rest));
        variants
    }

    fn permute(&self, seeds: &[String]) -> Vec<String> {
        let seeds: Vec<String> = seeds.iter().map(|s| s.to_lowercase()).collect();
        let mut seen: HashSet<String> = seeds.iter().cloned().collect();
        let mut candidates = Vec::new();

        // Names at their registrable domain only get the `<word>.` form.
        let joinable: Vec<bool> = seeds
            .iter()
            .map(|seed| registrable_domain(seed).map(|base| &base != seed).unwrap_or(false))
            .collect();

        let mut push = |candidate: String, candidates: &mut Vec<String>| -> bool {
            if candidates.len() >= self.max_size {
                return false;
            }
            if seen.insert(candidate.clone()) {
                candidates.push(candidate);
            }
            true
        };

        for (seed, &can_join) in seeds.iter().zip(&joinable) {
            if !can_join {
                continue;
            }
            for candidate in Self::number_variants(seed) {
                if !push(candidate, &mut candidates) {
                    return candidates;
                }
            }
        }

        // Word-major order spreads a capped budget across every seed.
        for word in &self.words {
            for (seed, &can_join) in seeds.iter().zip(&joinable) {
                for candidate in Self::word_variants(seed, word, can_join) {
                    if !push(candidate, &mut candidates) {
                        return candidates;
                    }
                }
            }
        }

        candidates
    }
}

#[async_trait]
impl PermutationGenerator for WordlistPermuter {
    async fn generate(&self, seeds: &[String]) -> Result<Vec<String>> {
        let candidates = self.permute(seeds);
        debug!("Generated {} permutations from {} seeds", candidates.len(), seeds.len());
        Ok(candidates)
    }
}
