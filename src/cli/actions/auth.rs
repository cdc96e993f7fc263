use crate::{
    api::{self, types::GoogleAuthUrlRequest},
    cli::{
        actions::prompt::Prompt,
        globals::{Client, GlobalArgs},
    },
    errors::AuthError,
    flow::{
        oauth::{Completion, OAuthCallback},
        password::{PasswordResetFlow, ResetForm},
        signin::{SignInFlow, SignInForm},
        signup::{SignUpFlow, SignUpForm},
        validate, FlowState, Purpose,
    },
    identity::Identity,
    routes::View,
};
use anyhow::{bail, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

/// How often a mistyped code may be re-entered interactively.
const MAX_CODE_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub struct SignUpArgs {
    pub globals: GlobalArgs,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: Option<SecretString>,
    pub confirm_password: Option<SecretString>,
    pub code: Option<SecretString>,
}

#[derive(Debug)]
pub struct SignInArgs {
    pub globals: GlobalArgs,
    pub email: String,
    pub password: Option<SecretString>,
    pub code: Option<SecretString>,
}

#[derive(Debug)]
pub struct ForgotPasswordArgs {
    pub globals: GlobalArgs,
    pub email: String,
    pub new_password: Option<SecretString>,
    pub confirm_password: Option<SecretString>,
    pub code: Option<SecretString>,
}

#[derive(Debug)]
pub struct OAuthCallbackArgs {
    pub globals: GlobalArgs,
    pub redirect: String,
}

#[derive(Debug)]
pub struct GoogleUrlArgs {
    pub globals: GlobalArgs,
    pub request: GoogleAuthUrlRequest,
}

/// A step that accepts a verification code.
trait CodeStep {
    async fn submit(&mut self, code: &SecretString) -> Result<Identity, AuthError>;
}

impl CodeStep for SignInFlow {
    async fn submit(&mut self, code: &SecretString) -> Result<Identity, AuthError> {
        self.submit_code(code).await
    }
}

impl CodeStep for SignUpFlow {
    async fn submit(&mut self, code: &SecretString) -> Result<Identity, AuthError> {
        self.submit_code(code).await
    }
}

struct ResetStep<'a> {
    flow: &'a mut PasswordResetFlow,
    new_password: SecretString,
    confirm_password: SecretString,
}

impl CodeStep for ResetStep<'_> {
    async fn submit(&mut self, code: &SecretString) -> Result<Identity, AuthError> {
        let form = ResetForm {
            code: copy(code),
            new_password: copy(&self.new_password),
            confirm_password: copy(&self.confirm_password),
        };
        self.flow.submit_reset(&form).await
    }
}

fn copy(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

/// Submits the preset code, or prompts until a code is accepted. Mistyped
/// and rejected codes may be retried; anything else ends the command.
async fn answer_challenge<S: CodeStep>(
    step: &mut S,
    preset: Option<SecretString>,
    prompt: &mut Prompt,
    label: &str,
) -> Result<Identity> {
    if let Some(code) = preset {
        return Ok(step.submit(&code).await?);
    }

    let mut attempt = 1;
    loop {
        let code = prompt.secret(label).await?;
        match step.submit(&code).await {
            Ok(identity) => return Ok(identity),
            Err(err @ (AuthError::Validation(_) | AuthError::InvalidCredentials(_)))
                if attempt < MAX_CODE_ATTEMPTS =>
            {
                eprintln!("{err}");
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn signed_in(client: &Client, identity: &Identity) {
    info!("authenticated, now at {}", client.navigator.current());
    println!("Signed in as {}", identity.display_name());
}

/// # Errors
///
/// Returns an error if validation, the service or a code step fails.
pub async fn signup(args: SignUpArgs) -> Result<()> {
    let client = args.globals.connect(View::SignUp)?;
    let mut prompt = Prompt::new();

    let password = prompt.secret_or_ask(args.password, "Password").await?;
    let confirm_password = prompt
        .secret_or_ask(args.confirm_password, "Confirm password")
        .await?;

    let form = SignUpForm {
        first_name: args.first_name,
        last_name: args.last_name,
        username: args.username,
        email: args.email,
        password,
        confirm_password,
    };

    let mut flow = SignUpFlow::new(client.gateway.clone());
    let identity = match flow.submit(&form).await? {
        FlowState::Authenticated(identity) => identity,
        FlowState::AwaitingEmailCode(ctx) => {
            client.navigator.navigate(View::Verify);
            println!("A verification code was sent to {}", ctx.email);
            answer_challenge(&mut flow, args.code, &mut prompt, "Verification code").await?
        }
        state => bail!("unexpected sign-up state: {state}"),
    };

    signed_in(&client, &identity);
    Ok(())
}

/// # Errors
///
/// Returns an error if validation, the service or a code step fails.
pub async fn signin(args: SignInArgs) -> Result<()> {
    let client = args.globals.connect(View::SignIn)?;
    let mut prompt = Prompt::new();

    let password = prompt.secret_or_ask(args.password, "Password").await?;
    let form = SignInForm {
        email: args.email,
        password,
    };

    let mut flow = SignInFlow::new(client.gateway.clone());
    let identity = match flow.submit(&form).await? {
        FlowState::Authenticated(identity) => identity,
        state => {
            let Some(ctx) = state.context() else {
                bail!("unexpected sign-in state: {state}");
            };
            let (view, label) = if ctx.purpose == Purpose::SecondFactor {
                (View::VerifyTwoFactor, "Second factor code")
            } else {
                (View::Verify, "Verification code")
            };
            client.navigator.navigate(view);
            println!("A code was sent to {}", ctx.email);
            answer_challenge(&mut flow, args.code, &mut prompt, label).await?
        }
    };

    signed_in(&client, &identity);
    Ok(())
}

/// # Errors
///
/// Returns an error if validation, the service or the reset step fails.
pub async fn forgot_password(args: ForgotPasswordArgs) -> Result<()> {
    let client = args.globals.connect(View::ForgotPassword)?;
    let mut prompt = Prompt::new();

    let mut flow = PasswordResetFlow::new(client.gateway.clone());
    let message = flow.submit(&args.email).await?;
    if !message.is_empty() {
        println!("{message}");
    }
    client.navigator.navigate(View::ForgotPasswordConfirm);

    let new_password = prompt
        .secret_or_ask(args.new_password, "New password")
        .await?;
    let confirm_password = prompt
        .secret_or_ask(args.confirm_password, "Confirm new password")
        .await?;
    validate::new_password(&new_password, &confirm_password)?;

    let mut step = ResetStep {
        flow: &mut flow,
        new_password,
        confirm_password,
    };
    let identity = answer_challenge(&mut step, args.code, &mut prompt, "Reset code").await?;

    println!("Password updated");
    signed_in(&client, &identity);
    Ok(())
}

/// # Errors
///
/// Returns an error carrying the failure message once the user has been sent
/// back to the entry view.
pub async fn oauth_callback(args: OAuthCallbackArgs) -> Result<()> {
    let client = args.globals.connect(View::GoogleCallback)?;
    let mut callback = OAuthCallback::new(
        client.session.clone(),
        client.navigator.clone(),
        client.config.oauth_failure_delay,
    );

    match callback.complete(&args.redirect).await {
        Completion::Authenticated(identity) => {
            signed_in(&client, &identity);
            Ok(())
        }
        Completion::Failed {
            message,
            return_to_entry,
        } => {
            eprintln!("Google sign-in failed: {message}");
            return_to_entry.await?;
            debug!("returned to {}", client.navigator.current());
            bail!(message)
        }
    }
}

/// # Errors
///
/// Returns an error if the service does not hand out a URL.
pub async fn google_url(args: GoogleUrlArgs) -> Result<()> {
    let client = args.globals.connect(View::Auth)?;
    let response = api::google_auth_url(&client.gateway, &args.request)
        .await
        .into_result()?;
    println!("{}", response.url);
    Ok(())
}
