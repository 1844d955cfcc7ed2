//! Whole-word keyword vocabulary matching.

use regex::{Regex, RegexBuilder};

/// Vocabulary of the reference deployment: full-stack roles, AI/ML, data
/// science roles and common data tooling.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    // full stack
    "full-stack",
    "fullstack",
    "full stack",
    // ai / ml / deep learning
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural network",
    "computer vision",
    "natural language processing",
    "nlp",
    "ai",
    "ml",
    "deeplearning",
    "tensorflow",
    "pytorch",
    "keras",
    "scikit-learn",
    "opencv",
    "transformers",
    "llm",
    "large language model",
    "generative ai",
    "genai",
    // data science
    "data scientist",
    "data science",
    "data analysis",
    "data analytics",
    "data engineer",
    "data engineering",
    "machine learning engineer",
    "ml engineer",
    "ai engineer",
    "research scientist",
    "applied scientist",
    "quantitative analyst",
    "statistician",
    "business intelligence",
    "predictive analytics",
    "big data",
    // tools and frameworks
    "python",
    "r programming",
    "sql",
    "pandas",
    "numpy",
    "jupyter",
    "databricks",
    "spark",
    "hadoop",
    "tableau",
    "power bi",
    "statistical modeling",
    "predictive modeling",
];

#[derive(Debug, Clone)]
struct CompiledKeyword {
    keyword: String,
    pattern: Regex,
}

/// Case-insensitive, word-boundary matcher over a fixed ordered vocabulary.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<CompiledKeyword>,
}

impl KeywordMatcher {
    pub fn new<I, S>(keywords: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|keyword| {
                let keyword = keyword.as_ref().trim().to_lowercase();
                let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&keyword)))
                    .case_insensitive(true)
                    .build()?;
                Ok(CompiledKeyword { keyword, pattern })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { keywords })
    }

    pub fn with_default_vocabulary() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_KEYWORDS)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keywords present in `text`, in vocabulary order.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        if text.is_empty() {
            return Vec::new();
        }
        self.keywords
            .iter()
            .filter(|k| k.pattern.is_match(text))
            .map(|k| k.keyword.as_str())
            .collect()
    }
}
