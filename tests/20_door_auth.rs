mod common;

use anyhow::Result;
use ispyb_door::door::{DoorAuthClient, LoginFailure, LoginOutcome};

use common::MockServer;

#[tokio::test]
async fn login_outcomes() -> Result<()> {
    let server = MockServer::start().await?;
    let auth = DoorAuthClient::from_config(&server.door_config())?;

    let ok = auth.login("ada", "lovelace").await;
    assert_eq!(ok.as_pair(), (true, Some("1")));

    let wrong = auth.login("ada", "babbage").await;
    assert_eq!(
        wrong,
        LoginOutcome::Rejected(LoginFailure::Unauthorized {
            message: Some("Wrong credentials".to_string())
        })
    );

    let unknown = auth.login("nobody", "x").await;
    assert_eq!(unknown, LoginOutcome::Rejected(LoginFailure::UnknownUser));
    assert_eq!(unknown.as_pair(), (false, None));
    Ok(())
}

#[tokio::test]
async fn roles_and_institutes_with_token_only() -> Result<()> {
    let server = MockServer::start().await?;
    let auth = DoorAuthClient::from_config(&server.door_config())?;

    let roles = auth.get_user_roles("1").await.expect("roles");
    let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["proposer", "beamline-staff"]);

    assert!(auth.get_user_roles("2").await.is_none());

    let institute = auth.get_institute("10").await.expect("institute");
    assert_eq!(institute.name, "Deutsches Elektronen-Synchrotron DESY");
    Ok(())
}
