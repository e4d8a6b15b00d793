use std::sync::Arc;

use boxer_core::config::LlmProvider;
use boxer_core::domain::mention::{InboundMention, Reply};
use boxer_core::errors::{ApplicationError, Service};
use boxer_core::text::{
    extract_barcode, extract_db_query, extract_question, format_reply_text, should_lookup_barcode,
};
use boxer_db::{GatewayError, ReadOnlyQueryGateway};
use tracing::{error, info};

use crate::conversation::{build_model_input, ThreadContextLoader};
use crate::guardrails::{AccessDecision, AccessPolicy, GuardedAction};
use crate::llm::{LlmClient, SYSTEM_PROMPT};
use crate::tools::{format_lookup_report, AppUserDirectory};

pub const PING_REPLY: &str = "pong-ec2";
pub const DB_DISABLED_REPLY: &str = "DB 조회 기능이 꺼져 있어. .env에서 DB_QUERY_ENABLED=true로 설정해줘";
pub const EMPTY_QUESTION_REPLY: &str = "질문 내용을 같이 보내줘";
pub const EMPTY_ANSWER_REPLY: &str = "답변을 생성하지 못했어. 다시 질문해줘";
pub const FALLBACK_REPLY: &str = "현재는 ping 또는 LLM 질문에 응답해";

/// The configured answer model and which provider it speaks for.
#[derive(Clone)]
pub struct LlmRoute {
    pub provider: LlmProvider,
    pub client: Arc<dyn LlmClient>,
}

impl LlmRoute {
    fn service(&self) -> Service {
        match self.provider {
            LlmProvider::Claude => Service::Claude,
            LlmProvider::Ollama => Service::Ollama,
        }
    }
}

/// Turns every mention into exactly one reply in its thread.
#[derive(Clone)]
pub struct MentionRouter {
    policy: AccessPolicy,
    llm: Option<LlmRoute>,
    context: ThreadContextLoader,
    db: Option<ReadOnlyQueryGateway>,
    directory: Arc<dyn AppUserDirectory>,
}

impl MentionRouter {
    pub fn new(
        policy: AccessPolicy,
        llm: Option<LlmRoute>,
        context: ThreadContextLoader,
        db: Option<ReadOnlyQueryGateway>,
        directory: Arc<dyn AppUserDirectory>,
    ) -> Self {
        Self { policy, llm, context, db, directory }
    }

    pub async fn route(&self, mention: &InboundMention) -> Reply {
        let text = self.reply_text(mention).await;
        mention.reply(text)
    }

    async fn reply_text(&self, mention: &InboundMention) -> String {
        let author = mention.author();
        let lowered = mention.raw_text.to_lowercase();
        let question = extract_question(&mention.raw_text);

        info!(
            event_name = "router.mention.received",
            channel_id = %mention.channel_id,
            thread_ts = %mention.thread_ts,
            user = author.unwrap_or("unknown"),
            "received app mention"
        );

        if let Some(canned) = self.policy.canned_reply(author) {
            info!(event_name = "router.reply.canned", thread_ts = %mention.thread_ts, "responded with canned reply");
            return format_reply_text(author, canned);
        }

        if lowered.contains("ping") {
            info!(event_name = "router.reply.ping", thread_ts = %mention.thread_ts, "responded with pong");
            return format_reply_text(author, PING_REPLY);
        }

        let db_query = extract_db_query(&question);

        if let Some(barcode) = extract_barcode(&question) {
            if should_lookup_barcode(&question, barcode) {
                match self.policy.evaluate(GuardedAction::BarcodeLookup, author) {
                    AccessDecision::Allow => {
                        let report = self.lookup_barcode(barcode, &mention.thread_ts).await;
                        return format_reply_text(author, &report);
                    }
                    AccessDecision::Deny { reason_code, error } if db_query.is_none() => {
                        info!(
                            event_name = "router.reply.lookup_denied",
                            action = GuardedAction::BarcodeLookup.action_key(),
                            reason_code,
                            user = author.unwrap_or("unknown"),
                            barcode,
                            "rejected app-user barcode lookup"
                        );
                        return error.user_message();
                    }
                    AccessDecision::Deny { reason_code, .. } => {
                        info!(
                            event_name = "router.lookup.skipped",
                            action = GuardedAction::BarcodeLookup.action_key(),
                            reason_code,
                            user = author.unwrap_or("unknown"),
                            barcode,
                            "skipped barcode lookup in favour of db query"
                        );
                    }
                }
            }
        }

        if let Some(sql) = db_query {
            let reply = self.run_db_query(&sql, &mention.thread_ts).await;
            return format_reply_text(author, &reply);
        }

        match &self.llm {
            Some(llm) => self.answer(llm, mention, &question).await,
            None => format_reply_text(author, FALLBACK_REPLY),
        }
    }

    async fn lookup_barcode(&self, barcode: &str, thread_ts: &str) -> String {
        match self.directory.find_by_barcode(barcode).await {
            Ok(users) => {
                info!(event_name = "router.reply.barcode_lookup", thread_ts, barcode, users = users.len(), "responded with barcode lookup");
                format_lookup_report(barcode, &users)
            }
            Err(err) => {
                error!(event_name = "router.lookup.failed", thread_ts, barcode, error = %err, "barcode lookup failed");
                ApplicationError::integration(Service::AppUserApi, err.to_string()).user_message()
            }
        }
    }

    async fn run_db_query(&self, sql: &str, thread_ts: &str) -> String {
        let Some(gateway) = &self.db else {
            info!(event_name = "router.reply.db_disabled", thread_ts, "db query requested while disabled");
            return DB_DISABLED_REPLY.to_string();
        };

        match gateway.run(sql).await {
            Ok(report) => {
                info!(event_name = "router.reply.db_query", thread_ts, "responded with db query result");
                report
            }
            Err(GatewayError::Rejected(reason)) => {
                info!(event_name = "router.reply.db_rejected", thread_ts, reason = %reason, "rejected db query");
                ApplicationError::Validation(reason.to_string()).user_message()
            }
            Err(GatewayError::Execution(err)) => {
                error!(event_name = "router.db.failed", thread_ts, error = %err, "db query failed");
                ApplicationError::integration(Service::Database, err.to_string()).user_message()
            }
        }
    }

    async fn answer(&self, llm: &LlmRoute, mention: &InboundMention, question: &str) -> String {
        let author = mention.author();

        if question.is_empty() {
            return format_reply_text(author, EMPTY_QUESTION_REPLY);
        }

        if llm.provider == LlmProvider::Claude {
            if let AccessDecision::Deny { reason_code, error } =
                self.policy.evaluate(GuardedAction::ClaudeQuestion, author)
            {
                info!(
                    event_name = "router.reply.llm_denied",
                    action = GuardedAction::ClaudeQuestion.action_key(),
                    reason_code,
                    user = author.unwrap_or("unknown"),
                    "rejected claude call"
                );
                return format_reply_text(author, &error.user_message());
            }
        }

        let context =
            self.context.load(&mention.channel_id, &mention.thread_ts, &mention.current_ts).await;
        let model_input = build_model_input(question, &context);

        match llm.client.complete(SYSTEM_PROMPT, &model_input).await {
            Ok(answer) => {
                info!(
                    event_name = "router.reply.llm_answer",
                    provider = llm.provider.as_str(),
                    thread_ts = %mention.thread_ts,
                    context_chars = context.chars().count(),
                    "responded with llm answer"
                );
                let answer = if answer.trim().is_empty() { EMPTY_ANSWER_REPLY } else { answer.as_str() };
                format_reply_text(author, answer)
            }
            Err(err) => {
                error!(
                    event_name = "router.llm.failed",
                    provider = llm.provider.as_str(),
                    thread_ts = %mention.thread_ts,
                    error = %err,
                    "llm call failed"
                );
                let apology =
                    ApplicationError::integration(llm.service(), err.to_string()).user_message();
                format_reply_text(author, &apology)
            }
        }
    }
}
