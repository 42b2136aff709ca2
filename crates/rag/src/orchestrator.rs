//! The query pipeline.
//!
//! `process_query` walks retrieve, format, prompt, generate and analyze in
//! order. Retrieval trouble degrades to an answer without context;
//! generation trouble becomes an error result. Nothing is propagated raw.

use crate::analysis::{
    answer_confidence, local_analysis, parse_analysis, reasoning_chain, CitationExtractor,
    ConfidenceEstimator, HeuristicConfidence, MarkerCitationExtractor,
};
use crate::config::OrchestratorConfig;
use crate::context::{ChunkClassifier, ContextFormatter};
use crate::history::ConversationLog;
use crate::retrieval::{Retriever, SearchService};
use crate::system_context::SystemContextCache;
use crate::types::{
    average_similarity, Complexity, ProcessingMode, QueryAnalysis, QueryMetadata, QueryRequest,
    QueryResult,
};
use ragstack_core::{AppError, AppResult, ConversationTurn, QueryMode};
use ragstack_llm::{LlmClient, LlmRequest};
use ragstack_prompt::PromptBuilder;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Answers questions against the document index.
///
/// One instance serves every query; the only state shared across queries is
/// the system context cache.
pub struct QueryOrchestrator {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    formatter: ContextFormatter,
    system_context: SystemContextCache,
    citations: Box<dyn CitationExtractor>,
    confidence: Box<dyn ConfidenceEstimator>,
    config: OrchestratorConfig,
}

impl QueryOrchestrator {
    /// Create an orchestrator with the built-in prompts and heuristics.
    pub fn new(
        search: Arc<dyn SearchService>,
        llm: Arc<dyn LlmClient>,
        config: OrchestratorConfig,
    ) -> AppResult<Self> {
        config.validate()?;

        let classifier = ChunkClassifier::new(&config.system_keywords);

        Ok(Self {
            retriever: Retriever::new(search, classifier.clone()),
            llm,
            prompts: PromptBuilder::new(config.prompt)?,
            formatter: ContextFormatter::new(classifier.clone(), config.min_similarity),
            system_context: SystemContextCache::new(
                config.system_context_ttl(),
                config.system_context_query.clone(),
                config.system_context_top_k,
                config.min_similarity,
            ),
            citations: Box::new(MarkerCitationExtractor::new(classifier)),
            confidence: Box::new(HeuristicConfidence::new(config.min_similarity)),
            config,
        })
    }

    /// Replace the prompt builder, e.g. one carrying workspace overrides.
    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_citation_extractor(mut self, extractor: Box<dyn CitationExtractor>) -> Self {
        self.citations = extractor;
        self
    }

    pub fn with_confidence_estimator(mut self, estimator: Box<dyn ConfidenceEstimator>) -> Self {
        self.confidence = estimator;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Current system context, refreshed when stale.
    pub async fn get_system_context(&self) -> String {
        self.system_context.get_context(&self.retriever).await
    }

    /// Summarize a question's intent with a low-temperature generation call.
    ///
    /// Falls back to a locally derived analysis when the call fails or the
    /// reply is unusable.
    pub async fn analyze_query(&self, model: &str, query: &str) -> QueryAnalysis {
        let prompt = match self.prompts.build_analysis(query) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "Analysis prompt failed, using local analysis");
                return local_analysis(query);
            }
        };

        let request = LlmRequest::new(prompt, model)
            .with_temperature(self.config.analysis_temperature)
            .with_max_tokens(self.config.analysis_max_tokens);

        match self.llm.complete(&request).await {
            Ok(response) => parse_analysis(&response.content, query).unwrap_or_else(|| {
                tracing::debug!("Analysis reply unusable, using local analysis");
                local_analysis(query)
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Query analysis failed, using local analysis");
                local_analysis(query)
            }
        }
    }

    /// Answer one query.
    ///
    /// Always returns a result; failures are reported as
    /// `processing_mode = error` with confidence 1.
    pub async fn process_query(&self, request: &QueryRequest) -> QueryResult {
        let mode = request.mode();
        let span = tracing::info_span!(
            "query",
            mode = mode.as_str(),
            model = %request.model,
            conversation_id = request.conversation_id.as_deref().unwrap_or("-"),
        );

        self.run(request, mode).instrument(span).await
    }

    async fn run(&self, request: &QueryRequest, mode: QueryMode) -> QueryResult {
        let started = Instant::now();
        let query = request.user_message.trim();

        let mut metadata = QueryMetadata {
            model: request.model.clone(),
            ..QueryMetadata::default()
        };

        if query.is_empty() {
            return QueryResult::error("The question is empty.", metadata);
        }

        tracing::info!("Processing query ({} chars)", query.chars().count());

        // Detailed mode settles retrieval depth after analysis
        let analysis = match mode {
            QueryMode::Fast => None,
            QueryMode::Detailed => Some(self.analyze_query(&request.model, query).await),
        };

        let top_k = match &analysis {
            Some(a) if a.complexity == Complexity::Complex => self.config.complex_top_k,
            _ => self.config.top_k(mode),
        };
        metadata.top_k = top_k;

        let search_started = Instant::now();
        let chunks = self
            .retriever
            .search(query, top_k, self.config.min_similarity, None)
            .await;
        metadata.search_time_ms = elapsed_ms(search_started);
        metadata.avg_similarity = average_similarity(&chunks);

        let system_context = self.get_system_context().await;
        metadata.system_context_included = !system_context.trim().is_empty();

        let formatted = self.formatter.format(&chunks, mode);

        let prompt = match self
            .prompts
            .build(query, &formatted, &request.history, &system_context, mode)
        {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!(error = %e, "Prompt construction failed");
                metadata.processing_time_ms = elapsed_ms(started);
                return QueryResult::error(failure_message(&e), metadata);
            }
        };

        let generated = match self
            .llm
            .generate(&request.model, &prompt.text, &request.sampling)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Generation failed");
                metadata.analysis = analysis;
                metadata.processing_time_ms = elapsed_ms(started);
                return QueryResult::error(failure_message(&e), metadata);
            }
        };

        let citations = self.citations.extract(&generated, &chunks);
        let confidence =
            answer_confidence(self.confidence.as_ref(), &chunks, query, mode, &generated);

        let reasoning = analysis
            .as_ref()
            .map(|a| reasoning_chain(&chunks, a, self.config.min_similarity));

        metadata.analysis = analysis;
        metadata.processing_time_ms = elapsed_ms(started);

        tracing::info!(
            chunks = chunks.len(),
            citations = citations.len(),
            confidence,
            "Query answered in {}ms",
            metadata.processing_time_ms
        );

        QueryResult {
            response_text: generated,
            citations,
            confidence,
            chunks_used: chunks.len(),
            processing_mode: ProcessingMode::from(mode),
            reasoning_chain: reasoning,
            metadata,
        }
    }

    /// Answer a query within a stored conversation.
    ///
    /// The conversation's most recent turns, as many as the prompt keeps for
    /// the request's mode, replace `request.history`. A turn is appended only
    /// when the answer is not an error result.
    pub async fn process_conversation_query(
        &self,
        log: &dyn ConversationLog,
        conversation_id: &str,
        request: QueryRequest,
    ) -> AppResult<QueryResult> {
        let window = self.config.prompt.history_turns(request.mode());
        let history = log.recent(conversation_id, window).await?;
        let request = request
            .with_history(history)
            .with_conversation_id(conversation_id);

        let result = self.process_query(&request).await;

        if result.is_error() {
            tracing::debug!("Not recording failed turn in {}", conversation_id);
        } else {
            log.append(
                conversation_id,
                ConversationTurn::new(request.user_message.clone(), result.response_text.clone()),
            )
            .await?;
        }

        Ok(result)
    }
}

fn failure_message(error: &AppError) -> String {
    match error {
        AppError::Generation(_) | AppError::MalformedPayload { .. } => format!(
            "The language model could not produce an answer: {}",
            error
        ),
        _ => format!("The query could not be processed: {}", error),
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
