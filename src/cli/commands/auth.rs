use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::door::auth::{DoorAuthClient, LoginFailure, LoginOutcome};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Check DOOR credentials and show the user's roles")]
    Login {
        #[arg(help = "DOOR username")]
        username: String,
        #[arg(long, help = "Password")]
        password: String,
    },
}

pub async fn handle(
    cmd: AuthCommands,
    auth: &DoorAuthClient,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { username, password } => {
            match auth.login(&username, &password).await {
                LoginOutcome::Authenticated { user_id } => {
                    let roles: Vec<String> = auth
                        .get_user_roles(&user_id)
                        .await
                        .unwrap_or_default()
                        .into_iter()
                        .map(|role| role.name)
                        .collect();

                    output_success(
                        &output_format,
                        &format!("{} authenticated as DOOR user {}", username, user_id),
                        Some(json!({ "user_id": user_id, "roles": roles })),
                    )?;
                    if matches!(output_format, OutputFormat::Text) {
                        for role in &roles {
                            println!("  {}", role);
                        }
                    }
                    Ok(())
                }
                LoginOutcome::Rejected(failure) => {
                    let (message, code) = describe(&failure);
                    output_error(&output_format, &message, Some(code))?;
                    anyhow::bail!("Login failed for {}", username)
                }
            }
        }
    }
}

fn describe(failure: &LoginFailure) -> (String, &'static str) {
    match failure {
        LoginFailure::Unauthorized { message } => (
            message
                .clone()
                .unwrap_or_else(|| "Wrong password or token".to_string()),
            "UNAUTHORIZED",
        ),
        LoginFailure::UnknownUser => ("Username does not exist".to_string(), "UNKNOWN_USER"),
        LoginFailure::BadRequest => ("DOOR rejected the login call".to_string(), "BAD_REQUEST"),
        LoginFailure::MalformedResponse => (
            "DOOR sent an unreadable login response".to_string(),
            "MALFORMED_RESPONSE",
        ),
        LoginFailure::UnexpectedStatus(status) => {
            (format!("Unexpected DOOR status {}", status), "UNEXPECTED_STATUS")
        }
        LoginFailure::Transport(e) => (format!("DOOR unreachable: {}", e), "TRANSPORT"),
    }
}
