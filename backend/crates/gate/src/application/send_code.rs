//! Send Verification Code Use Case
//!
//! `POST /_send_verify_code`. The identifier must resolve to an active
//! directory user; the destination handed to the broker is the
//! directory's own phone or mail, never the caller-supplied value.

use std::net::IpAddr;
use std::sync::Arc;

use crate::application::audit::{AuditEvent, AuditResult, AuditSink, EventType};
use crate::domain::upstream::{Channel, ChallengeRequest, CodeBroker, Directory};
use crate::error::{GateError, GateResult};
use crate::i18n::Lang;

const PURPOSE_LOGIN: &str = "login";

#[derive(Debug, Clone, Default)]
pub struct SendCodeInput {
    pub phone: String,
    pub mail: String,
    /// Raw `Accept-Language` header, if any.
    pub accept_language: Option<String>,
    /// `Idempotency-Key` header, forwarded verbatim.
    pub idempotency_key: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct SendCodeOutput {
    pub challenge_id: String,
    pub expires_in: u64,
    pub next_resend_in: u64,
}

pub struct SendCodeUseCase<D, B>
where
    D: Directory,
    B: CodeBroker,
{
    directory: Option<Arc<D>>,
    broker: Option<Arc<B>>,
    audit: AuditSink,
    default_lang: Lang,
}

impl<D, B> SendCodeUseCase<D, B>
where
    D: Directory + Sync,
    B: CodeBroker + Sync,
{
    pub fn new(
        directory: Option<Arc<D>>,
        broker: Option<Arc<B>>,
        audit: AuditSink,
        default_lang: Lang,
    ) -> Self {
        Self {
            directory,
            broker,
            audit,
            default_lang,
        }
    }

    pub async fn execute(&self, input: SendCodeInput) -> GateResult<SendCodeOutput> {
        if input.phone.is_empty() && input.mail.is_empty() {
            return Err(GateError::BadInput("phone or mail is required".to_string()));
        }
        let Some(directory) = &self.directory else {
            return Err(GateError::BadInput("directory login is not enabled".to_string()));
        };
        let Some(broker) = &self.broker else {
            return Err(GateError::upstream("herald", "broker is not configured"));
        };

        let user = directory
            .get_user("", &input.phone, &input.mail)
            .await?
            .ok_or_else(|| GateError::denied("user is not in the allowlist"))?;

        let (channel, destination) = if !input.phone.is_empty() {
            (Channel::Sms, user.phone.clone())
        } else {
            (Channel::Email, user.mail.clone())
        };

        let lang = match input.accept_language.as_deref() {
            Some(header) => Lang::from_accept_language(header, self.default_lang),
            None => self.default_lang,
        };

        let request = ChallengeRequest {
            user_id: user.user_id.clone(),
            channel,
            destination: destination.clone(),
            purpose: PURPOSE_LOGIN.to_string(),
            locale: lang.code().to_string(),
            client_ip: input.client_ip.map(|ip| ip.to_string()).unwrap_or_default(),
            user_agent: input.user_agent.clone(),
            idempotency_key: input.idempotency_key.clone(),
        };

        let created = match broker.create_challenge(&request).await {
            Ok(created) => created,
            Err(e) => {
                self.audit.emit(
                    AuditEvent::new(EventType::VerifyCodeSend, AuditResult::Failure, input.client_ip)
                        .user(user.user_id.clone())
                        .channel(channel.as_str())
                        .destination(destination.clone())
                        .reason(e.to_string()),
                );
                return Err(e);
            }
        };

        self.audit.emit(
            AuditEvent::new(EventType::VerifyCodeSend, AuditResult::Success, input.client_ip)
                .user(user.user_id.clone())
                .channel(channel.as_str())
                .destination(destination),
        );
        tracing::info!(
            challenge_id = %created.challenge_id,
            channel = channel.as_str(),
            "Verification code dispatched"
        );

        Ok(SendCodeOutput {
            challenge_id: created.challenge_id,
            expires_in: created.expires_in,
            next_resend_in: created.next_resend_in,
        })
    }
}
