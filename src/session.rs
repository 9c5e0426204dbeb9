//! Live TOTP session: countdown ticking, code rollover and verification.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::clock::Clock;
use crate::error::Result;
use crate::provisioning;
use crate::secret::TotpSecret;
use crate::totp::{self, TotpCode, TotpConfig};

/// How long a verification outcome stays displayed before resetting.
const RESULT_DISPLAY_SECONDS: u64 = 3;

/// Outcome of comparing a submitted code to the live one.
///
/// A mismatch is an expected, user-facing outcome. It is not an error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationResult {
    #[default]
    Unverified,
    Success,
    Failure,
}

/// Result of advancing the session by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Seconds left in the current step, in `1..=step_seconds`.
    pub seconds_remaining: u64,
    /// Whether a step boundary was crossed and the code recomputed.
    pub code_changed: bool,
}

/// Session state exposed to the hosting UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub secret: String,
    pub code: String,
    pub seconds_remaining: u64,
    pub verification: VerificationResult,
}

/// Single in-memory TOTP session owning the shared secret and live code.
///
/// All methods are pure given `now`, so the whole state machine is
/// testable without a timer; [`SessionHandle`] supplies the wall-clock
/// drive.
pub struct TotpSession {
    secret: TotpSecret,
    config: TotpConfig,
    code: TotpCode,
    step: u64,
    verification: VerificationResult,
    verification_expires_at: Option<u64>,
}

impl TotpSession {
    /// Create a session with a freshly generated secret.
    pub fn new(config: TotpConfig, now: u64) -> Result<Self> {
        Self::with_secret(TotpSecret::generate()?, config, now)
    }

    /// Create a session from an existing secret.
    pub fn with_secret(
        secret: TotpSecret,
        config: TotpConfig,
        now: u64,
    ) -> Result<Self> {
        let code = totp::code_at(&secret, &config, now)?;

        Ok(Self {
            step: totp::time_step(now, config.step_seconds()),
            secret,
            config,
            code,
            verification: VerificationResult::Unverified,
            verification_expires_at: None,
        })
    }

    /// Replace the secret with a new, unrelated one.
    ///
    /// Any authenticator paired against the previous secret is
    /// invalidated. The code is recomputed and a pending verification
    /// result is cleared.
    pub fn regenerate(&mut self, now: u64) -> Result<()> {
        self.secret = TotpSecret::generate()?;
        self.code = totp::code_at(&self.secret, &self.config, now)?;
        self.step = totp::time_step(now, self.config.step_seconds());
        self.verification = VerificationResult::Unverified;
        self.verification_expires_at = None;

        tracing::debug!("session secret regenerated");
        Ok(())
    }

    /// Advance the session to `now`.
    ///
    /// Recomputes the code when a step boundary was crossed, and resets
    /// a displayed verification outcome once its display window is over.
    pub fn tick(&mut self, now: u64) -> Result<Tick> {
        let step = totp::time_step(now, self.config.step_seconds());
        let code_changed = step != self.step;

        if code_changed {
            self.code = totp::code_at(&self.secret, &self.config, now)?;
            self.step = step;
            tracing::debug!(step, "one-time code rolled over");
        }

        if let Some(expires_at) = self.verification_expires_at {
            if now >= expires_at {
                self.verification = VerificationResult::Unverified;
                self.verification_expires_at = None;
            }
        }

        Ok(Tick {
            seconds_remaining: self.seconds_remaining(now),
            code_changed,
        })
    }

    /// Compare a submitted code to the live one.
    ///
    /// Exact character equality against the current step's code only;
    /// adjacent steps are not consulted. The outcome stays readable via
    /// [`TotpSession::verification`] for a few seconds of display time.
    pub fn verify(&mut self, candidate: &str, now: u64) -> VerificationResult {
        self.verification = if candidate == self.code.value() {
            VerificationResult::Success
        } else {
            VerificationResult::Failure
        };
        self.verification_expires_at = Some(now + RESULT_DISPLAY_SECONDS);

        tracing::debug!(outcome = ?self.verification, "code verification");
        self.verification
    }

    pub fn secret(&self) -> &TotpSecret {
        &self.secret
    }

    pub fn code(&self) -> &TotpCode {
        &self.code
    }

    pub fn config(&self) -> &TotpConfig {
        &self.config
    }

    pub fn verification(&self) -> VerificationResult {
        self.verification
    }

    /// Seconds left in the current step.
    pub fn seconds_remaining(&self, now: u64) -> u64 {
        totp::seconds_remaining(now, self.config.step_seconds())
    }

    /// Package the UI-facing outputs into one serializable value.
    pub fn snapshot(&self, now: u64) -> SessionSnapshot {
        SessionSnapshot {
            secret: self.secret.as_str().to_owned(),
            code: self.code.value().to_owned(),
            seconds_remaining: self.seconds_remaining(now),
            verification: self.verification,
        }
    }

    /// `otpauth://` URI for pairing an external authenticator app.
    pub fn provisioning_uri(&self, label: &str, issuer: &str) -> String {
        provisioning::uri(&self.secret, label, issuer)
    }
}

/// Owns a [`TotpSession`] and its 1-second ticker task.
pub struct SessionHandle {
    shared: Arc<Mutex<TotpSession>>,
    ticker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Wrap a session. The ticker is not started yet.
    pub fn new(session: TotpSession) -> Self {
        Self {
            shared: Arc::new(Mutex::new(session)),
            ticker: None,
        }
    }

    /// Spawn the 1-second tick loop on the current Tokio runtime.
    ///
    /// Starting again replaces the previous ticker.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self, clock: Arc<dyn Clock>) {
        self.stop();

        let shared = Arc::clone(&self.shared);
        self.ticker = Some(tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(1)).await;

                let now = clock.now();
                let mut session =
                    shared.lock().unwrap_or_else(PoisonError::into_inner);

                match session.tick(now) {
                    Ok(tick) => tracing::trace!(
                        seconds_remaining = tick.seconds_remaining,
                        code_changed = tick.code_changed,
                        "session tick"
                    ),
                    Err(err) => {
                        tracing::error!(%err, "session tick failed")
                    },
                }
            }
        }));
    }

    /// Cancel the ticker task, if any.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut TotpSession) -> R) -> R {
        let mut session =
            self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        // No dangling timers after teardown.
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn fixed_session(now: u64) -> TotpSession {
        let secret = TotpSecret::new("JBSWY3DPEHPK3PXP").unwrap();
        TotpSession::with_secret(secret, TotpConfig::default(), now).unwrap()
    }

    #[test]
    fn test_new_session_is_active() {
        let session = TotpSession::new(TotpConfig::default(), 0).unwrap();

        assert_eq!(session.code().value().len(), 6);
        assert_eq!(session.seconds_remaining(0), 30);
        assert_eq!(session.verification(), VerificationResult::Unverified);
    }

    #[test]
    fn test_tick_within_step_keeps_code() {
        let mut session = fixed_session(0);
        let code = session.code().clone();

        for now in 1..30 {
            let tick = session.tick(now).unwrap();

            assert!(!tick.code_changed);
            assert_eq!(tick.seconds_remaining, 30 - now);
            assert_eq!(session.code(), &code);
        }
    }

    #[test]
    fn test_tick_across_boundary_rolls_code() {
        let mut session = fixed_session(15);
        let tick = session.tick(30).unwrap();

        assert!(tick.code_changed);
        assert_eq!(tick.seconds_remaining, 30);

        // The rolled code is the engine's code for the new step.
        let expected = totp::code_at(
            session.secret(),
            &TotpConfig::default(),
            35,
        )
        .unwrap();
        assert_eq!(session.code(), &expected);
    }

    #[test]
    fn test_verify_success_and_failure() {
        let mut session = fixed_session(100);
        let code = session.code().value().to_owned();

        assert_eq!(
            session.verify(&code, 100),
            VerificationResult::Success
        );
        assert_eq!(
            session.verify("000001", 100),
            VerificationResult::Failure
        );
    }

    #[test]
    fn test_verification_result_expires() {
        let mut session = fixed_session(100);
        session.verify("000001", 100);

        session.tick(102).unwrap();
        assert_eq!(session.verification(), VerificationResult::Failure);

        session.tick(103).unwrap();
        assert_eq!(session.verification(), VerificationResult::Unverified);
    }

    #[test]
    fn test_regenerate_resets_session() {
        let mut session = TotpSession::new(TotpConfig::default(), 50).unwrap();
        let old_secret = session.secret().clone();
        let old_code = session.code().value().to_owned();
        session.verify(&old_code, 50);

        session.regenerate(50).unwrap();

        assert_ne!(session.secret().as_str(), old_secret.as_str());
        assert_eq!(session.verification(), VerificationResult::Unverified);

        // The old code no longer validates, short of a one-in-a-million
        // collision between the two secrets' codes.
        if session.code().value() != old_code {
            assert_eq!(
                session.verify(&old_code, 50),
                VerificationResult::Failure
            );
        }
    }

    #[test]
    fn test_snapshot_serializes() {
        let session = fixed_session(10);
        let value =
            serde_json::to_value(session.snapshot(10)).unwrap();

        assert_eq!(value["secret"], "JBSWY3DPEHPK3PXP");
        assert_eq!(value["secondsRemaining"], 20);
        assert_eq!(value["verification"], "unverified");
        assert_eq!(value["code"], session.code().value());
    }

    #[test]
    fn test_provisioning_uri() {
        let session = fixed_session(0);

        assert_eq!(
            session.provisioning_uri("alice", "keystep"),
            "otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP&issuer=keystep"
        );
    }

    #[tokio::test]
    async fn test_handle_lifecycle() {
        let mut handle = SessionHandle::new(fixed_session(1_000));
        assert!(!handle.is_running());

        handle.start(Arc::new(FixedClock::new(1_000)));
        assert!(handle.is_running());

        // A frozen clock keeps the session in the same step.
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let code = handle.with_session(|session| session.code().clone());
        assert_eq!(code, fixed_session(1_000).code().clone());

        handle.stop();
        assert!(!handle.is_running());
    }
}
