use boxer_core::config::AccessConfig;
use boxer_core::errors::ApplicationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardedAction {
    ClaudeQuestion,
    BarcodeLookup,
}

impl GuardedAction {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::ClaudeQuestion => "llm.claude_question",
            Self::BarcodeLookup => "lookup.app_user_barcode",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny { reason_code: &'static str, error: ApplicationError },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Per-user gate over the restricted router paths.
#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    access: AccessConfig,
}

impl AccessPolicy {
    pub fn new(access: AccessConfig) -> Self {
        Self { access }
    }

    pub fn canned_reply(&self, author_id: Option<&str>) -> Option<&str> {
        self.access.canned_reply(author_id)
    }

    pub fn evaluate(&self, action: GuardedAction, author_id: Option<&str>) -> AccessDecision {
        match action {
            GuardedAction::ClaudeQuestion if self.access.is_model_owner(author_id) => {
                AccessDecision::Allow
            }
            GuardedAction::ClaudeQuestion => AccessDecision::Deny {
                reason_code: "not_model_owner",
                error: ApplicationError::Unauthorized(
                    "Claude 질문은 현재 지정된 사용자만 사용할 수 있어".to_string(),
                ),
            },
            GuardedAction::BarcodeLookup if self.access.may_lookup_app_user(author_id) => {
                AccessDecision::Allow
            }
            GuardedAction::BarcodeLookup => AccessDecision::Deny {
                reason_code: "lookup_not_allowed",
                error: ApplicationError::Unauthorized(self.escalation_message()),
            },
        }
    }

    pub fn escalation_message(&self) -> String {
        match self.access.security_approver_user_id.as_deref().filter(|id| !id.is_empty()) {
            Some(approver) => format!("보안 책임자 <@{approver}> 의 승인이 필요합니다."),
            None => "보안 책임자의 승인이 필요합니다.".to_string(),
        }
    }
}
