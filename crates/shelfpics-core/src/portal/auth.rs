use super::{LOGGED_IN_MARKER, LOGIN_FORM_MARKER, PortalDriver, fields};
use crate::poll::{PollPolicy, pause, poll_until};
use crate::{Error, Result, Settings};
use std::fmt;
use std::time::Duration;

/// Where the login flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    AwaitingLoginForm,
    Submitting,
    Authenticated,
    Failed,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::AwaitingLoginForm => "awaiting login form",
            AuthState::Submitting => "submitting credentials",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Signs into the portal with the configured credentials
pub struct Authenticator<'a> {
    settings: &'a Settings,
    policy: PollPolicy,
    field_pause: Duration,
    state: AuthState,
    failure: Option<String>,
}

impl<'a> Authenticator<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            policy: PollPolicy::default(),
            field_pause: Duration::from_secs(1),
            state: AuthState::Unauthenticated,
            failure: None,
        }
    }

    /// Override the page-state polling policy
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the pause between filling the two credential fields
    pub fn with_field_pause(mut self, pause: Duration) -> Self {
        self.field_pause = pause;
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Drive the login flow to `Authenticated` or fail.
    ///
    /// A session that is already signed in (persistent browser profile) skips
    /// the form entirely. `Failed` is terminal.
    pub async fn login<D>(&mut self, driver: &mut D) -> Result<()>
    where
        D: PortalDriver + ?Sized,
    {
        loop {
            let next = match self.state {
                AuthState::Unauthenticated => {
                    tracing::info!("Opening login page {}", self.settings.auth_url);
                    driver.navigate(self.settings.auth_url.as_str()).await?;
                    AuthState::AwaitingLoginForm
                }
                AuthState::AwaitingLoginForm => {
                    let markers = [LOGGED_IN_MARKER, LOGIN_FORM_MARKER];
                    match wait_for_marker(driver, &markers, &self.policy).await? {
                        Some(LOGGED_IN_MARKER) => {
                            tracing::info!("Already signed in, reusing session");
                            AuthState::Authenticated
                        }
                        Some(_) => {
                            tracing::info!("Login page opened");
                            AuthState::Submitting
                        }
                        None => self.fail("login form did not appear"),
                    }
                }
                AuthState::Submitting => {
                    if let Err(e) = self.submit_credentials(driver).await {
                        self.state = self.fail(&format!("could not submit credentials: {}", e));
                        return Err(e);
                    }
                    match wait_for_marker(driver, &[LOGGED_IN_MARKER], &self.policy).await? {
                        Some(_) => AuthState::Authenticated,
                        None => self.fail("portal did not confirm the login"),
                    }
                }
                AuthState::Authenticated => {
                    tracing::info!("Signed in as {}", self.settings.login);
                    return Ok(());
                }
                AuthState::Failed => {
                    let reason = self.failure.clone().unwrap_or_default();
                    return Err(Error::Authentication(reason));
                }
            };

            tracing::debug!("Login: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    async fn submit_credentials<D>(&mut self, driver: &mut D) -> Result<()>
    where
        D: PortalDriver + ?Sized,
    {
        clear_softly(driver, fields::EMAIL).await;
        driver
            .type_into(fields::EMAIL, &self.settings.login, false)
            .await?;

        pause(self.field_pause).await;

        clear_softly(driver, fields::PASSWORD).await;
        driver
            .type_into(fields::PASSWORD, &self.settings.password, true)
            .await
    }

    fn fail(&mut self, reason: &str) -> AuthState {
        tracing::error!("Login failed: {}", reason);
        self.failure = Some(reason.to_string());
        AuthState::Failed
    }
}

/// Clear a field, logging instead of failing when that is not possible
pub(crate) async fn clear_softly<D>(driver: &mut D, name: &str)
where
    D: PortalDriver + ?Sized,
{
    if let Err(e) = driver.clear_field(name).await {
        tracing::warn!("Could not clear field '{}': {}", name, e);
    }
}

/// Poll the page until one of `markers` shows up; earlier markers win
async fn wait_for_marker<D>(
    driver: &mut D,
    markers: &[&'static str],
    policy: &PollPolicy,
) -> Result<Option<&'static str>>
where
    D: PortalDriver + ?Sized,
{
    poll_until(policy, async |attempt| match driver.page_text().await {
        Ok(text) => Ok(markers.iter().copied().find(|marker| text.contains(marker))),
        Err(e) => {
            tracing::debug!("Page not readable yet (check {}): {}", attempt, e);
            Ok(None)
        }
    })
    .await
}
