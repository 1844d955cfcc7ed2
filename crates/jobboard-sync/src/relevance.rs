//! Title-first relevance rules for feed items.

use jobboard_core::FeedItem;

use crate::keywords::KeywordMatcher;

/// Distinct body keywords needed when the title matched nothing.
pub const MIN_DESCRIPTION_MATCHES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relevance {
    /// At least one keyword in the title.
    Title(Vec<String>),
    /// No title hit, but enough distinct keywords in the body.
    Description(Vec<String>),
    Irrelevant,
}

impl Relevance {
    pub fn is_relevant(&self) -> bool {
        !matches!(self, Relevance::Irrelevant)
    }

    pub fn matched_keywords(&self) -> &[String] {
        match self {
            Relevance::Title(k) | Relevance::Description(k) => k,
            Relevance::Irrelevant => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelevanceClassifier {
    matcher: KeywordMatcher,
}

impl RelevanceClassifier {
    pub fn new(matcher: KeywordMatcher) -> Self {
        Self { matcher }
    }

    pub fn classify(&self, item: &FeedItem) -> Relevance {
        let title = item.title_or_empty().to_lowercase();
        let title_hits = self.matcher.matches(&title);
        if !title_hits.is_empty() {
            return Relevance::Title(to_owned(title_hits));
        }

        let body = item.content_or_empty().to_lowercase();
        let body_hits = self.matcher.matches(&body);
        if body_hits.len() >= MIN_DESCRIPTION_MATCHES {
            return Relevance::Description(to_owned(body_hits));
        }

        Relevance::Irrelevant
    }
}

fn to_owned(hits: Vec<&str>) -> Vec<String> {
    hits.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RelevanceClassifier {
        RelevanceClassifier::new(KeywordMatcher::with_default_vocabulary().unwrap())
    }

    fn item(title: Option<&str>, content: Option<&str>) -> FeedItem {
        FeedItem {
            title: title.map(str::to_string),
            content: content.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn title_hit_is_trusted_regardless_of_body() {
        let relevance = classifier().classify(&item(Some("Senior Python Developer"), None));
        assert_eq!(relevance, Relevance::Title(vec!["python".into()]));

        let noisy = classifier().classify(&item(
            Some("Data Scientist"),
            Some("<p>nothing relevant here at all</p>"),
        ));
        assert!(noisy.is_relevant());
    }

    #[test]
    fn single_body_hit_is_not_enough() {
        let relevance = classifier().classify(&item(
            Some("Office Manager"),
            Some("<p>Occasional sql reporting.</p>"),
        ));
        assert_eq!(relevance, Relevance::Irrelevant);
    }

    #[test]
    fn two_distinct_body_hits_are_relevant() {
        let relevance = classifier().classify(&item(
            Some("Backend Developer"),
            Some("<p>Pandas, NumPy and a little SQL.</p>"),
        ));
        assert_eq!(
            relevance,
            Relevance::Description(vec!["sql".into(), "pandas".into(), "numpy".into()])
        );
    }

    #[test]
    fn repeated_single_keyword_counts_once() {
        let relevance = classifier().classify(&item(
            Some("Writer"),
            Some("python python python"),
        ));
        assert_eq!(relevance, Relevance::Irrelevant);
    }

    #[test]
    fn missing_title_and_content_match_nothing() {
        let relevance = classifier().classify(&item(None, None));
        assert!(!relevance.is_relevant());
        assert!(relevance.matched_keywords().is_empty());
    }
}
