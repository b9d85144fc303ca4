use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::naics::{AnalysisQuery, RelevantSectorSet, SectorGroups};
use crate::infrastructure::classification::ClassificationGateway;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::{clean_llm_response, retain_two_digit_codes, split_code_list};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const SYSTEM_PROMPT: &str = "You classify businesses into NAICS sectors. Answer with 2-digit NAICS codes only.";

/// Asks an LLM which 2-digit NAICS sectors a description addresses.
pub struct RelevantNaicsUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
    groups: SectorGroups,
}

impl RelevantNaicsUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        config: LLMConfig,
        groups: SectorGroups,
    ) -> Self {
        Self {
            llm_client,
            config,
            groups,
        }
    }

    /// Two-digit codes in the order the model listed them, without repeats.
    pub async fn execute(&self, description: &str, size_threshold: Option<u64>) -> Result<Vec<String>> {
        if description.trim().is_empty() {
            return Err(AppError::InputValidation(
                "Missing userDescription".to_string(),
            ));
        }

        let prompt = build_prompt(description, size_threshold);
        let raw = self
            .llm_client
            .generate(&self.config, SYSTEM_PROMPT, &prompt)
            .await?;

        let cleaned = clean_llm_response(&raw);
        info!(reply = %cleaned, "LLM relevant codes");

        Ok(retain_two_digit_codes(split_code_list(&cleaned)))
    }
}

#[async_trait]
impl ClassificationGateway for RelevantNaicsUseCase {
    async fn classify(&self, query: &AnalysisQuery) -> Result<RelevantSectorSet> {
        let codes = self
            .execute(&query.description, Some(query.size_threshold))
            .await
            .map_err(|e| match e {
                AppError::InputValidation(msg) => AppError::InputValidation(msg),
                other => AppError::Classification(other.to_string()),
            })?;
        Ok(RelevantSectorSet::from_codes(codes, &self.groups))
    }
}

fn build_prompt(description: &str, size_threshold: Option<u64>) -> String {
    let mut prompt = format!(
        "User request: \"{}\"\n\
         I need the relevant 2-digit NAICS codes that are most addressable. \
         Return them as comma-separated list (e.g., \"54, 62\").\n",
        description.trim()
    );
    if let Some(threshold) = size_threshold.filter(|t| *t > 0) {
        prompt.push_str(&format!(
            "Only firms with at least {} employees are of interest.\n",
            threshold
        ));
    }
    prompt.push_str("No extra text.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedLlm {
        reply: Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedLlm {
        async fn generate(&self, _config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            self.reply.clone()
        }
    }

    fn use_case(llm: Arc<ScriptedLlm>) -> RelevantNaicsUseCase {
        RelevantNaicsUseCase::new(llm, LLMConfig::default(), SectorGroups::naics())
    }

    #[tokio::test]
    async fn test_execute_parses_reply() {
        let llm = ScriptedLlm::new(Ok("<think>hmm</think>54, XX, 6, 62, 54".to_string()));
        let codes = use_case(llm.clone()).execute("payroll software", None).await.unwrap();

        assert_eq!(codes, vec!["54", "62"]);
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"payroll software\""));
        assert!(!prompts[0].contains("employees"));
    }

    #[tokio::test]
    async fn test_execute_mentions_threshold() {
        let llm = ScriptedLlm::new(Ok("54".to_string()));
        use_case(llm.clone()).execute("payroll software", Some(50)).await.unwrap();
        assert!(llm.prompts.lock().unwrap()[0].contains("at least 50 employees"));
    }

    #[tokio::test]
    async fn test_empty_description_skips_llm() {
        let llm = ScriptedLlm::new(Ok("54".to_string()));
        let err = use_case(llm.clone()).execute("  ", None).await.unwrap_err();

        assert_eq!(err, AppError::InputValidation("Missing userDescription".to_string()));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classify_maps_llm_failure() {
        let llm = ScriptedLlm::new(Err(AppError::LLMError("API error (500)".to_string())));
        let query = AnalysisQuery::new("bakeries", 0).unwrap();
        assert!(matches!(
            use_case(llm).classify(&query).await,
            Err(AppError::Classification(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_folds_groups() {
        let llm = ScriptedLlm::new(Ok("31, 44".to_string()));
        let query = AnalysisQuery::new("packaging supplier", 0).unwrap();
        let set = use_case(llm).classify(&query).await.unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["31-33", "44-45"]);
    }
}
