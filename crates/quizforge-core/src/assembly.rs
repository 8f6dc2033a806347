//! Random session assembly and catalog loading.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{LoadError, QuizError};
use crate::model::Question;
use crate::traits::{QuestionCategory, QuestionProvider};

/// Uniformly shuffled copy of `items`. The input is left untouched.
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with(items, &mut rand::thread_rng())
}

/// [`shuffle`] with a caller-supplied RNG, for reproducible draws.
pub fn shuffle_with<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// A randomly drawn question set, ready for `TestSession::initialize_test`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledSession {
    pub category_id: String,
    pub category_name: String,
    pub test_type: String,
    pub questions: Vec<Question>,
    pub total_in_pool: usize,
}

/// Draw `count` distinct questions at random from a category.
///
/// The whole pool is shuffled before truncating, so every subset is equally
/// likely.
pub async fn assemble_session(
    provider: &dyn QuestionProvider,
    category_id: &str,
    count: usize,
) -> Result<AssembledSession, QuizError> {
    let category = match provider.load_category(category_id).await {
        Ok(c) => c,
        Err(LoadError::NotFound(_)) => {
            return Err(QuizError::CategoryNotFound {
                id: category_id.to_string(),
                cause: None,
            })
        }
        Err(e) => {
            tracing::error!(category = category_id, "category could not be loaded: {e}");
            return Err(QuizError::CategoryNotFound {
                id: category_id.to_string(),
                cause: Some(e.to_string()),
            });
        }
    };
    assemble_from(&category, count, &mut rand::thread_rng())
}

/// [`assemble_session`] over an already loaded category.
pub fn assemble_from<R: Rng + ?Sized>(
    category: &QuestionCategory,
    count: usize,
    rng: &mut R,
) -> Result<AssembledSession, QuizError> {
    let available = category.pool_size();
    if count > available {
        return Err(QuizError::InsufficientQuestions {
            category: category.id.clone(),
            requested: count,
            available,
        });
    }

    let mut questions = shuffle_with(&category.questions, rng);
    questions.truncate(count);

    tracing::debug!(
        category = %category.id,
        drawn = count,
        pool = available,
        "session assembled"
    );

    Ok(AssembledSession {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        test_type: category.test_type.clone(),
        questions,
        total_in_pool: available,
    })
}

/// Every category a provider could load, plus the ones it could not.
#[derive(Debug, Default)]
pub struct Catalog {
    pub categories: Vec<QuestionCategory>,
    pub failures: Vec<(String, LoadError)>,
}

impl Catalog {
    pub fn get(&self, category_id: &str) -> Option<&QuestionCategory> {
        self.categories.iter().find(|c| c.id == category_id)
    }
}

/// Load all categories concurrently. A failing category is logged and
/// skipped; the rest still load.
pub async fn load_catalog(provider: Arc<dyn QuestionProvider>) -> Catalog {
    let mut pending = FuturesUnordered::new();
    for id in provider.category_ids() {
        let provider = Arc::clone(&provider);
        pending.push(async move {
            let result = provider.load_category(&id).await;
            (id, result)
        });
    }

    let mut catalog = Catalog::default();
    while let Some((id, result)) = pending.next().await {
        match result {
            Ok(category) => catalog.categories.push(category),
            Err(e) => {
                tracing::error!(category = %id, provider = provider.name(), "category could not be loaded: {e}");
                catalog.failures.push((id, e));
            }
        }
    }
    catalog.categories.sort_by(|a, b| a.id.cmp(&b.id));
    catalog.failures.sort_by(|a, b| a.0.cmp(&b.0));
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::StaticProvider;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn category(id: &str, n: usize) -> QuestionCategory {
        QuestionCategory {
            id: id.into(),
            name: format!("{id} questions"),
            description: String::new(),
            test_type: id.into(),
            questions: (0..n)
                .map(|i| Question::numeric(format!("{id}-{i}"), "?", i as f64))
                .collect(),
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let input: Vec<u32> = (0..50).collect();
        let mut out = shuffle(&input);
        assert_eq!(input, (0..50).collect::<Vec<_>>());
        assert_eq!(out.len(), input.len());
        out.sort();
        assert_eq!(out, input);
    }

    #[test]
    fn shuffle_trivial_inputs() {
        assert!(shuffle::<u8>(&[]).is_empty());
        assert_eq!(shuffle(&["only"]), vec!["only"]);
    }

    #[test]
    fn shuffle_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut first = [0u32; 3];
        for _ in 0..3_000 {
            let out = shuffle_with(&[0usize, 1, 2], &mut rng);
            first[out[0]] += 1;
        }
        for count in first {
            assert!((800..1_200).contains(&count), "skewed: {first:?}");
        }
    }

    #[test]
    fn draws_distinct_questions() {
        let mut rng = StdRng::seed_from_u64(1);
        let session = assemble_from(&category("math", 10), 4, &mut rng).unwrap();
        assert_eq!(session.questions.len(), 4);
        assert_eq!(session.total_in_pool, 10);
        let mut ids: Vec<_> = session.questions.iter().map(|q| q.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn whole_pool_and_empty_draws() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(assemble_from(&category("m", 3), 3, &mut rng).unwrap().questions.len(), 3);
        assert!(assemble_from(&category("m", 3), 0, &mut rng).unwrap().questions.is_empty());
    }

    #[tokio::test]
    async fn assembly_errors() {
        let provider = StaticProvider::new(vec![category("math", 3)]);

        let err = assemble_session(&provider, "history", 1).await.unwrap_err();
        assert!(matches!(
            err,
            QuizError::CategoryNotFound { ref id, cause: None } if id == "history"
        ));

        let err = assemble_session(&provider, "math", 4).await.unwrap_err();
        assert!(matches!(
            err,
            QuizError::InsufficientQuestions { requested: 4, available: 3, .. }
        ));

        let ok = assemble_session(&provider, "math", 2).await.unwrap();
        assert_eq!(ok.category_name, "math questions");
    }

    struct BrokenProvider;

    #[async_trait::async_trait]
    impl QuestionProvider for BrokenProvider {
        fn name(&self) -> &str {
            "broken"
        }

        fn category_ids(&self) -> Vec<String> {
            vec!["geo".into()]
        }

        async fn load_category(&self, _: &str) -> Result<QuestionCategory, LoadError> {
            Err(LoadError::Invalid {
                source_name: "geo.toml".into(),
                message: "correct_answer out of range".into(),
            })
        }
    }

    #[tokio::test]
    async fn unloadable_category_keeps_its_cause() {
        let err = assemble_session(&BrokenProvider, "geo", 1).await.unwrap_err();
        assert_eq!(err.code(), "CATEGORY_NOT_FOUND");
        match err {
            QuizError::CategoryNotFound { id, cause } => {
                assert_eq!(id, "geo");
                assert!(cause.unwrap().contains("correct_answer out of range"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn catalog_loads_every_category() {
        let provider: Arc<dyn QuestionProvider> =
            Arc::new(StaticProvider::new(vec![category("b", 1), category("a", 2)]));
        let catalog = load_catalog(provider).await;
        assert!(catalog.failures.is_empty());
        assert_eq!(catalog.categories[0].id, "a");
        assert_eq!(catalog.get("b").unwrap().pool_size(), 1);
    }
}
