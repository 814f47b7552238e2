#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

use ispyb_door::config::DoorConfig;

pub const DOOR_TOKEN: &str = "door-token";
pub const SERVICE_ACCOUNT: &str = "ispyb";
pub const SERVICE_PASSWORD: &str = "secret";
pub const PYISPYB_TOKEN: &str = "py-token";
/// Issued for the `reject` auth plugin; pushes made with it answer 422.
pub const PYISPYB_REJECT_TOKEN: &str = "py-reject-token";
pub const PYISPYB_PASSWORD: &str = "sync-secret";

pub const PROPOSAL_ID: &str = "20210009";
pub const COMMISSIONING_ID: &str = "20010001";

/// Shared state of the mock DOOR + py-ISPyB server.
#[derive(Default)]
pub struct Recorded {
    pub synced: Vec<String>,
    pub sync_auth: Vec<String>,
    pub door_hits: usize,
}

#[derive(Clone)]
struct AppState {
    world: Arc<HashMap<String, Value>>,
    recorded: Arc<Mutex<Recorded>>,
}

pub struct MockServer {
    pub port: u16,
    pub base_url: String,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockServer {
    /// Bind a fresh port and serve on the current runtime.
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let state = AppState {
            world: Arc::new(world()),
            recorded: recorded.clone(),
        };
        let app = router(state);

        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            recorded,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("mock server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn door_root(&self) -> String {
        format!("{}/doorapi", self.base_url)
    }

    pub fn door_config(&self) -> DoorConfig {
        let root = self.door_root();
        DoorConfig::from_lookup(|key| match key {
            "DOOR_REST_ROOT" => Some(root.clone()),
            "DOOR_REST_TOKEN" => Some(DOOR_TOKEN.to_string()),
            "DOOR_SERVICE_ACCOUNT" => Some(SERVICE_ACCOUNT.to_string()),
            "DOOR_SERVICE_PASSWORD" => Some(SERVICE_PASSWORD.to_string()),
            _ => None,
        })
        .expect("valid test config")
    }

    /// Environment for the binaries, pointing both services at this server.
    pub fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("DOOR_REST_ROOT", self.door_root()),
            ("DOOR_REST_TOKEN", DOOR_TOKEN.to_string()),
            ("DOOR_SERVICE_ACCOUNT", SERVICE_ACCOUNT.to_string()),
            ("DOOR_SERVICE_PASSWORD", SERVICE_PASSWORD.to_string()),
            ("PYISPYB_API_ROOT", self.base_url.clone()),
            ("PYISPYB_AUTH_PLUGIN", "dummy".to_string()),
            ("PYISPYB_SERVICE_ACCOUNT", "sync".to_string()),
            ("PYISPYB_SERVICE_PASSWORD", PYISPYB_PASSWORD.to_string()),
            ("RUST_LOG", "warn".to_string()),
        ]
    }

    pub fn recorded<R>(&self, f: impl FnOnce(&Recorded) -> R) -> R {
        f(&self.recorded.lock().expect("recorded lock"))
    }

    /// Run one of the crate's binaries against this server.
    pub async fn run_bin(
        &self,
        bin: &str,
        args: &[&str],
        overrides: &[(&str, &str)],
    ) -> Result<Output> {
        let mut cmd = tokio::process::Command::new(bin);
        cmd.args(args);
        for (key, value) in self.env() {
            cmd.env(key, value);
        }
        for (key, value) in overrides {
            cmd.env(key, value);
        }
        cmd.output().await.context("failed to run binary")
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/doorapi/proposals/propid/:id", get(proposal))
        .route("/doorapi/experiments/propid/:id", get(proposal_sessions))
        .route("/doorapi/users/id/:id", get(user))
        .route("/doorapi/institutes/id/:id", get(institute))
        .route("/doorapi/institutes/list/", get(institute_list))
        .route("/doorapi/roles/userid/:id", get(roles))
        .route("/doorapi/doorauth/auth", post(door_login))
        .route("/ispyb/api/v1/auth/login", post(pyispyb_login))
        .route("/ispyb/api/v1/userportalsync/sync_proposal", post(sync_proposal))
        .with_state(state)
}

type Reply = (StatusCode, Json<Value>);

fn not_found(what: &str) -> Reply {
    (StatusCode::NOT_FOUND, Json(json!({"message": format!("No {} found", what)})))
}

fn check_service(headers: &HeaderMap, state: &AppState) -> Result<(), Reply> {
    state.recorded.lock().expect("recorded lock").door_hits += 1;
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if header("x-door-token") != Some(DOOR_TOKEN) {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"}))));
    }
    if header("x-door-service-account") != Some(SERVICE_ACCOUNT)
        || header("x-door-service-auth") != Some(SERVICE_PASSWORD)
    {
        return Err((StatusCode::FORBIDDEN, Json(json!({"message": "Service account rejected"}))));
    }
    Ok(())
}

fn lookup(state: &AppState, key: &str, what: &str, wrap: &str, id: &str) -> Reply {
    match state.world.get(key) {
        Some(record) => (StatusCode::OK, Json(json!({ wrap: { id: record } }))),
        None => not_found(what),
    }
}

async fn proposal(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if let Err(reply) = check_service(&headers, &state) {
        return reply;
    }
    lookup(&state, &format!("proposal/{id}"), "proposal", "proposals", &id)
}

async fn proposal_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    if let Err(reply) = check_service(&headers, &state) {
        return reply;
    }
    match state.world.get(&format!("sessions/{id}")) {
        Some(sessions) => (StatusCode::OK, Json(json!({"experiment metadata": sessions}))),
        None => not_found("sessions"),
    }
}

async fn user(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if let Err(reply) = check_service(&headers, &state) {
        return reply;
    }
    lookup(&state, &format!("user/{id}"), "user", "user metadata", &id)
}

async fn institute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    // institutes are reachable with the plain token as well
    if headers.get("x-door-token").and_then(|v| v.to_str().ok()) != Some(DOOR_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"})));
    }
    lookup(&state, &format!("institute/{id}"), "institute", "institute metadata", &id)
}

async fn institute_list(State(state): State<AppState>) -> Reply {
    let institutes: serde_json::Map<String, Value> = ["10", "11"]
        .iter()
        .filter_map(|id| {
            state
                .world
                .get(&format!("institute/{id}"))
                .map(|record| (id.to_string(), record.clone()))
        })
        .collect();
    (StatusCode::OK, Json(json!({"institute metadata": institutes})))
}

async fn roles(Path(id): Path<String>) -> Reply {
    match id.as_str() {
        "1" => (
            StatusCode::OK,
            Json(json!({"roles": [{"name": "proposer"}, {"name": "beamline-staff"}]})),
        ),
        _ => (StatusCode::OK, Json(json!({}))),
    }
}

async fn door_login(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> Reply {
    if headers.get("x-door-token").and_then(|v| v.to_str().ok()) != Some(DOOR_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token"})));
    }
    let user = form.get("user").map(String::as_str);
    let pass = form.get("pass").map(String::as_str);
    match (user, pass) {
        // "lovelace" base64-encoded
        (Some("ada"), Some("bG92ZWxhY2U=")) => {
            (StatusCode::OK, Json(json!({"userdata": {"userid": 1}})))
        }
        (Some("ada"), Some(_)) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Wrong credentials"})),
        ),
        (Some(_), Some(_)) => (StatusCode::NOT_FOUND, Json(json!({"message": "Unknown user"}))),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"message": "Missing parameters"}))),
    }
}

async fn pyispyb_login(Json(body): Json<Value>) -> Reply {
    if body["username"] != "sync" || body["password"] != PYISPYB_PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"})));
    }
    if body["plugin"] == "dummy" {
        (StatusCode::CREATED, Json(json!({"token": PYISPYB_TOKEN})))
    } else if body["plugin"] == "reject" {
        (StatusCode::CREATED, Json(json!({"token": PYISPYB_REJECT_TOKEN})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"})))
    }
}

async fn sync_proposal(State(state): State<AppState>, headers: HeaderMap, body: String) -> Reply {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut recorded = state.recorded.lock().expect("recorded lock");
    recorded.sync_auth.push(auth.clone());
    if auth == format!("Bearer {}", PYISPYB_REJECT_TOKEN) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "proposal"], "msg": "field required"}]})),
        );
    }
    if auth != format!("Bearer {}", PYISPYB_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
    }

    let document: Value = match serde_json::from_str(&body) {
        Ok(document) => document,
        Err(_) => return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": "Invalid JSON"}))),
    };
    recorded.synced.push(body);
    let number = document["proposal"]["proposalNumber"].clone();
    (StatusCode::OK, Json(json!({"synced": number})))
}

fn user_json(given: &str, family: &str, login: &str, laboratory: &str) -> Value {
    json!({
        "givenName": given,
        "familyName": family,
        "emailAddress": format!("{login}@example.org"),
        "login": login,
        "phoneNumber": "4940899",
        "laboratoryId": laboratory,
    })
}

fn session_json(id: &str, proposal: &str, beamline: &str, start: &str, end: &str) -> Value {
    json!({
        "expSessionPk": id,
        "proposalId": proposal,
        "beamlineName": beamline,
        "startDate": start,
        "endDate": end,
        "nbShifts": 3,
        "scheduled": 1,
        "beamlineOperator": 5,
        "participants": {"remote": 6, "on-site": "7, 1", "data-only": ""},
    })
}

/// Records served by the mock DOOR, keyed `kind/id`.
pub fn world() -> HashMap<String, Value> {
    let mut world = HashMap::new();

    world.insert(
        format!("proposal/{PROPOSAL_ID}"),
        json!({
            "title": "Lysozyme soaking series",
            "proposalNumber": 20210009,
            "proposalCode": "I",
            "proposalPI": 1,
            "proposalLeader": 2,
            "proposalCowriters": "3, 4",
        }),
    );
    world.insert(
        format!("proposal/{COMMISSIONING_ID}"),
        json!({
            "title": "P11 commissioning",
            "proposalNumber": "20010001",
            "proposalCode": "C",
            "proposalPI": null,
            "proposalLeader": 0,
            "proposalCowriters": "",
        }),
    );

    world.insert(
        format!("sessions/{PROPOSAL_ID}"),
        json!({
            "11000938": session_json("11000938", PROPOSAL_ID, "P11", "2021-05-03 08:00:00", "2021-05-04 08:00:00"),
        }),
    );
    world.insert(
        format!("sessions/{COMMISSIONING_ID}"),
        json!({
            "12000001": session_json("12000001", COMMISSIONING_ID, "P11", "2022-01-10 08:00:00", "2022-01-11 08:00:00"),
            "12000002": session_json("12000002", COMMISSIONING_ID, "P11", "2022-12-30 08:00:00", "2023-01-02 08:00:00"),
            "12000003": session_json("12000003", COMMISSIONING_ID, "P14", "2022-03-01 08:00:00", "2022-03-02 08:00:00"),
        }),
    );

    for (id, given, family, login, lab) in [
        ("1", "Ada", "Lovelace", "ada", "10"),
        ("2", "Grace", "Hopper", "grace", "10"),
        ("3", "Alan", "Turing", "alan", "11"),
        ("4", "Rosalind", "Franklin", "rosalind", "11"),
        ("5", "Max", "Perutz", "perutz", "10"),
        ("6", "Dorothy", "Hodgkin", "dorothy", "11"),
        ("7", "Linus", "Pauling", "linus", "10"),
        ("5714", "Door", "Admin", "dooradmin", "10"),
    ] {
        world.insert(format!("user/{id}"), user_json(given, family, login, lab));
    }

    world.insert(
        "institute/10".to_string(),
        json!({"name": "Deutsches Elektronen-Synchrotron DESY", "city": "Hamburg", "country": "DE"}),
    );
    world.insert(
        "institute/11".to_string(),
        json!({"name": "European Molecular Biology Laboratory Hamburg Outstation", "city": "Hamburg", "country": "DE"}),
    );

    world
}
