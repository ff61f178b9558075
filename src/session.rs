//! Synthetic user sessions.

use crate::config::SwarmConfig;
use crate::context::{SessionContext, SessionId};
use crate::probe::EndpointProber;
use crate::profile::BehaviorProfile;
use crate::report::Reporter;
use crate::sample::{is_success_status, HttpMethod, Sample, NO_RESPONSE};
use crate::token::{PatternTokenExtractor, TokenExtractor};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Why a session stopped before running its script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    /// The login form request failed; `status` is 0 without a response.
    FormUnavailable { status: u16 },
    /// The login page had no anti-forgery token.
    MissingToken,
    /// The credential submission did not answer with 2xx/3xx.
    Rejected { status: u16 },
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginFailure::FormUnavailable { status: 0 } => f.write_str("login form unreachable"),
            LoginFailure::FormUnavailable { status } => {
                write!(f, "login form returned {}", status)
            }
            LoginFailure::MissingToken => f.write_str("no anti-forgery token on login page"),
            LoginFailure::Rejected { status: 0 } => f.write_str("login submission got no response"),
            LoginFailure::Rejected { status } => write!(f, "login rejected with {}", status),
        }
    }
}

/// How a session ended. Purely informational: failures are already in the samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Logged in and ran every step; `failed_steps` of them did not succeed.
    Completed { steps: usize, failed_steps: usize },
    LoginFailed(LoginFailure),
    /// The session's HTTP client could not be built.
    ContextUnavailable,
}

impl SessionOutcome {
    pub fn logged_in(&self) -> bool {
        matches!(self, SessionOutcome::Completed { .. })
    }
}

/// Something the scheduler can run as one session.
///
/// Implementations must not panic on network failures and must finish on
/// their own; the scheduler waits for every session of a wave.
pub trait SessionRunner: Send + Sync + 'static {
    fn run(
        &self,
        id: SessionId,
        profile: BehaviorProfile,
    ) -> impl Future<Output = SessionOutcome> + Send;
}

/// Logs in through the login form and walks a profile script.
pub struct SessionSimulator {
    config: Arc<SwarmConfig>,
    prober: EndpointProber,
    extractor: Arc<dyn TokenExtractor>,
    reporter: Arc<dyn Reporter>,
}

impl SessionSimulator {
    pub fn new(
        config: Arc<SwarmConfig>,
        prober: EndpointProber,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            prober,
            extractor: Arc::new(PatternTokenExtractor::default()),
            reporter,
        }
    }

    /// Replace the token extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TokenExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    async fn simulate(&self, id: SessionId, profile: BehaviorProfile) -> SessionOutcome {
        let ctx = match SessionContext::new(id, self.config.request_timeout) {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(session = %id, error = %e, "could not create session context");
                return SessionOutcome::ContextUnavailable;
            }
        };

        if let Err(failure) = self.login(&ctx).await {
            tracing::warn!(session = %id, %profile, reason = %failure, "login failed");
            return SessionOutcome::LoginFailed(failure);
        }
        tracing::debug!(session = %id, %profile, "logged in");

        let script = profile.script(&self.config.routes, &mut rand::thread_rng());
        let mut failed_steps = 0;
        for step in &script.steps {
            let description = format!("{} - {} User {}", step.label, profile.title(), id);
            let sample = self
                .prober
                .probe(&ctx, step.method, &step.endpoint, None, &description)
                .await;
            if !sample.success {
                failed_steps += 1;
            }
            tokio::time::sleep(script.think_time).await;
        }

        SessionOutcome::Completed {
            steps: script.steps.len(),
            failed_steps,
        }
    }

    /// Fetch the form, extract the token and submit credentials.
    ///
    /// Records exactly one sample: the submission, or a failed stand-in for
    /// it when the form or token was unavailable and nothing was submitted.
    async fn login(&self, ctx: &SessionContext) -> Result<(), LoginFailure> {
        let login = &self.config.routes.login;
        let description = format!("Login - Session {}", ctx.id());

        let form = self.prober.fetch_text(ctx, login).await;
        let failure = match form.status {
            Some(status) if is_success_status(status) => {
                let token = form
                    .body
                    .as_deref()
                    .and_then(|b| self.extractor.extract(b))
                    .filter(|t| !t.is_empty());
                match token {
                    Some(token) => return self.submit(ctx, token, &description).await,
                    None => LoginFailure::MissingToken,
                }
            }
            status => LoginFailure::FormUnavailable {
                status: status.unwrap_or(NO_RESPONSE),
            },
        };

        // A form that loaded but had no token still means nothing was submitted.
        let status = form.status.filter(|&s| !is_success_status(s));
        self.prober.record(Sample::new(
            form.timestamp,
            HttpMethod::Post,
            login.as_str(),
            description,
            form.elapsed,
            status,
        ));
        Err(failure)
    }

    async fn submit(
        &self,
        ctx: &SessionContext,
        token: String,
        description: &str,
    ) -> Result<(), LoginFailure> {
        let creds = &self.config.credentials;
        let fields = [
            ("email".to_string(), creds.email.clone()),
            ("password".to_string(), creds.password.clone()),
            (self.extractor.field().to_string(), token),
            ("remember_me".to_string(), creds.remember_me.to_string()),
        ];

        let sample = self
            .prober
            .probe(
                ctx,
                HttpMethod::Post,
                &self.config.routes.login,
                Some(&fields[..]),
                description,
            )
            .await;
        if sample.success {
            Ok(())
        } else {
            Err(LoginFailure::Rejected {
                status: sample.status_code,
            })
        }
    }
}

impl SessionRunner for SessionSimulator {
    async fn run(&self, id: SessionId, profile: BehaviorProfile) -> SessionOutcome {
        let outcome = self.simulate(id, profile).await;
        self.reporter.session_end(id, profile, &outcome);
        outcome
    }
}
