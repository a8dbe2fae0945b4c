//! Application layer - use cases and configuration

pub mod audit;
pub mod authorize;
pub mod config;
pub mod exchange;
pub mod login;
pub mod logout;
pub mod oidc;
pub mod send_code;
pub mod step_up;
pub mod totp_enroll;

pub use audit::{AuditEvent, AuditResult, AuditSink, EventType};
pub use authorize::{AuthorizeInput, AuthorizeUseCase, AuthorizeVerdict};
pub use exchange::{validate_callback, validate_exchange_id};
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use oidc::{OidcCallbackOutput, OidcCallbackUseCase, OidcLoginOutput, OidcLoginUseCase};
pub use send_code::{SendCodeInput, SendCodeOutput, SendCodeUseCase};
pub use step_up::StepUpUseCase;
pub use totp_enroll::TotpEnrollUseCase;
