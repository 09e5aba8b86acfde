//! In-memory stand-in for a transactional Cypher server.
//!
//! Understands just enough Cypher for the scenarios:
//! - `CREATE (n:Person {name: $name})`
//! - `MATCH (n:Person {name: $name}) RETURN n.name`
//!
//! Anything else is a syntax error. Writes made inside a transaction are
//! visible to that transaction only until it commits. Every statement gets
//! a result entry; a failing statement's entry carries its errors.
//!
//! The batch endpoint answers every job, in reverse order, with a location
//! derived from the job ID and the job's `to` echoed back as `from`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cypherlink::transport::{HttpRequest, HttpResponse, Method, TransportResult};
use cypherlink::{Database, ScriptedTransport, ServiceRoot};
use serde_json::{json, Value};

pub const ROOT: &str = "http://fake:7474/db/data/";

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

#[derive(Default)]
struct State {
    next_tx: u64,
    committed: Vec<String>,
    open: HashMap<u64, Vec<String>>,
}

/// Shared handle on the fake server's state
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database handle talking to this server, plus its transport for
    /// request inspection
    pub fn connect(&self) -> (Database, Arc<ScriptedTransport>) {
        init_logging();
        let server = self.clone();
        let transport = Arc::new(ScriptedTransport::with_handler(move |request| {
            server.handle(request)
        }));
        let db = Database::with_transport(transport.clone(), ServiceRoot::at(ROOT));
        (db, transport)
    }

    /// Forget every open transaction, as if they all timed out
    pub fn expire_all(&self) {
        self.state.lock().unwrap().open.clear();
    }

    pub fn committed_names(&self) -> Vec<String> {
        self.state.lock().unwrap().committed.clone()
    }

    fn handle(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        let path = request.url.strip_prefix(ROOT).unwrap_or(&request.url).to_string();
        let segments: Vec<&str> = path.split('/').collect();
        let mut state = self.state.lock().unwrap();

        let response = match (request.method, segments.as_slice()) {
            (Method::Post, ["transaction"]) => {
                state.next_tx += 1;
                let id = state.next_tx;
                let mut pending = Vec::new();
                let (results, _) = run_statements(&state.committed, &mut pending, request);
                state.open.insert(id, pending);
                let location = format!("{}transaction/{}", ROOT, id);
                HttpResponse::json(201, tx_body(&location, results)).with_location(location)
            }
            (Method::Post, ["transaction", "commit"]) => {
                let mut pending = Vec::new();
                let (results, failed) = run_statements(&state.committed, &mut pending, request);
                if !failed {
                    state.committed.extend(pending);
                }
                HttpResponse::json(200, json!({"results": results, "errors": []}))
            }
            (Method::Post, ["transaction", id]) => {
                let id: u64 = id.parse().unwrap();
                let committed = state.committed.clone();
                match state.open.get_mut(&id) {
                    None => not_found(),
                    Some(pending) => {
                        let (results, _) = run_statements(&committed, pending, request);
                        let location = format!("{}transaction/{}", ROOT, id);
                        HttpResponse::json(200, tx_body(&location, results))
                    }
                }
            }
            (Method::Post, ["transaction", id, "commit"]) => {
                let id: u64 = id.parse().unwrap();
                match state.open.remove(&id) {
                    None => not_found(),
                    Some(mut pending) => {
                        let committed = state.committed.clone();
                        let (results, failed) = run_statements(&committed, &mut pending, request);
                        if !failed {
                            state.committed.extend(pending);
                        }
                        HttpResponse::json(200, json!({"results": results, "errors": []}))
                    }
                }
            }
            (Method::Delete, ["transaction", id]) => {
                let id: u64 = id.parse().unwrap();
                match state.open.remove(&id) {
                    None => not_found(),
                    Some(_) => HttpResponse::json(200, json!({"results": [], "errors": []})),
                }
            }
            (Method::Post, ["batch"]) => batch_response(request),
            _ => HttpResponse::json(404, json!({"message": format!("no route for {}", path)})),
        };
        Ok(response)
    }
}

fn tx_body(location: &str, results: Vec<Value>) -> Value {
    json!({
        "commit": format!("{}/commit", location),
        "results": results,
        "transaction": {"expires": "Tue, 12 Nov 2013 10:31:44 +0000"},
        "errors": []
    })
}

fn not_found() -> HttpResponse {
    HttpResponse::json(
        404,
        json!({"errors": [{
            "code": 40010,
            "status": "Neo.ClientError.Transaction.UnknownId",
            "message": "Unrecognized transaction id"
        }]}),
    )
}

/// Runs every statement of a request. Returns the result entries and
/// whether any statement failed.
fn run_statements(
    committed: &[String],
    pending: &mut Vec<String>,
    request: &HttpRequest,
) -> (Vec<Value>, bool) {
    let statements = request
        .body
        .as_ref()
        .and_then(|b| b["statements"].as_array().cloned())
        .unwrap_or_default();

    let mut failed = false;
    let results = statements
        .iter()
        .map(|statement| {
            let text = statement["statement"].as_str().unwrap_or_default();
            let name = statement["parameters"]["name"].as_str().unwrap_or_default();
            if text.starts_with("CREATE (n:Person") {
                pending.push(name.to_string());
                json!({"columns": [], "data": []})
            } else if text.starts_with("MATCH (n:Person") {
                let data: Vec<Value> = committed
                    .iter()
                    .chain(pending.iter())
                    .filter(|n| n.as_str() == name)
                    .map(|n| json!({"row": [n]}))
                    .collect();
                json!({"columns": ["n.name"], "data": data})
            } else {
                failed = true;
                json!({
                    "columns": [],
                    "data": [],
                    "errors": [{
                        "code": 42000,
                        "status": "Neo.ClientError.Statement.InvalidSyntax",
                        "message": format!("Invalid input '{}'", text)
                    }]
                })
            }
        })
        .collect();
    (results, failed)
}

fn batch_response(request: &HttpRequest) -> HttpResponse {
    let jobs = request
        .body
        .as_ref()
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let entries: Vec<Value> = jobs
        .iter()
        .rev()
        .map(|job| {
            let id = job["id"].as_u64().unwrap();
            json!({
                "id": id,
                "location": format!("{}node/{}", ROOT, 100 + id),
                "body": {"self": format!("{}node/{}", ROOT, 100 + id)},
                "from": job["to"]
            })
        })
        .collect();
    HttpResponse::json(200, Value::Array(entries))
}
