//! Transaction coordinator

use chrono::{DateTime, FixedOffset};

use super::errors::TxStateError;
use super::state::TxState;
use crate::cypher::wire::{attach_results, StatementsRequest, StatementsResponse};
use crate::cypher::{Statement, StatementError};
use crate::database::Database;
use crate::errors::{Error, Result};
use crate::observability::{log_event_with_fields, Event};
use crate::transport::{join_url, HttpRequest, HttpResponse, Method};

/// A server-side transaction spanning several requests.
///
/// Created by [`Database::transaction`] in [`TxState::NotStarted`]. Each
/// call is one round trip and reports exactly one of: a transport error or
/// a malformed response (the handle becomes [`TxState::Broken`]), a
/// protocol error (the state is kept, except that a 404 on an open
/// transaction marks it [`TxState::Expired`]), or success with zero or more
/// statement errors.
///
/// Statement errors accumulate on the handle. While any are pending,
/// [`commit`](Self::commit) is refused without contacting the server;
/// [`rollback`](Self::rollback) is still allowed.
///
/// Dropping an open transaction sends nothing; the server expires it.
pub struct Transaction<'db> {
    db: &'db Database,
    state: TxState,
    location: Option<String>,
    commit_url: Option<String>,
    expires: Option<String>,
    errors: Vec<StatementError>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            state: TxState::NotStarted,
            location: None,
            commit_url: None,
            expires: None,
            errors: Vec::new(),
        }
    }

    /// Opens the transaction, running `statements` inside it.
    ///
    /// Statement errors in this first batch leave the transaction open; the
    /// call still reports them as [`Error::Statement`].
    pub fn begin(&mut self, statements: &mut [Statement<'_>]) -> Result<()> {
        match self.state {
            TxState::NotStarted => {}
            TxState::Open => return Err(TxStateError::AlreadyStarted.into()),
            terminal => return Err(TxStateError::Terminated(terminal).into()),
        }

        let body = StatementsRequest::encode(statements)?.to_value()?;
        let count = statements.len().to_string();
        log_event_with_fields(Event::TxBegin, &[("statements", count.as_str())]);

        let url = self.db.service_root().transaction.clone();
        let exchanged = self
            .db
            .exchange("begin", HttpRequest::with_body(Method::Post, url, body), &[201]);
        let response = self.track(exchanged)?;
        let parsed = self.track(StatementsResponse::from_body("begin", response.body.clone()))?;

        let location = match opened_location(&response, &parsed) {
            Some(location) => location,
            None => {
                self.state = TxState::Broken;
                return Err(Error::BadResponse {
                    operation: "begin",
                    reason: "server opened a transaction without reporting its location"
                        .to_string(),
                });
            }
        };

        self.state = TxState::Open;
        self.db.metrics().increment_transactions_opened();
        self.commit_url = Some(
            parsed
                .commit
                .clone()
                .unwrap_or_else(|| join_url(&[&location, "commit"])),
        );
        self.location = Some(location);
        self.refresh_expiry(&parsed);
        log_event_with_fields(Event::TxOpen, &[("location", self.location_str())]);

        self.attach("begin", statements, parsed)
    }

    /// Runs more statements in the open transaction and refreshes its
    /// expiry. Allowed after earlier statement errors.
    pub fn query(&mut self, statements: &mut [Statement<'_>]) -> Result<()> {
        let location = self.ensure_open()?.to_string();
        let body = StatementsRequest::encode(statements)?.to_value()?;

        let exchanged = self.db.exchange(
            "query",
            HttpRequest::with_body(Method::Post, location, body),
            &[200],
        );
        let response = self.track(exchanged)?;
        let parsed = self.track(StatementsResponse::from_body("query", response.body))?;
        self.refresh_expiry(&parsed);

        let count = statements.len().to_string();
        log_event_with_fields(
            Event::TxQuery,
            &[("location", self.location_str()), ("statements", count.as_str())],
        );
        self.attach("query", statements, parsed)
    }

    /// Commits the transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.commit_with(&mut [])
    }

    /// Commits the transaction, running `statements` as part of the commit
    /// request.
    ///
    /// Refused locally with [`TxStateError::PendingStatementErrors`] while
    /// statement errors are pending. If the server reports statement errors
    /// for the final batch it rolls the transaction back.
    pub fn commit_with(&mut self, statements: &mut [Statement<'_>]) -> Result<()> {
        self.ensure_open()?;
        if !self.errors.is_empty() {
            let pending = self.errors.len().to_string();
            log_event_with_fields(
                Event::TxCommitRefused,
                &[("location", self.location_str()), ("pending", pending.as_str())],
            );
            return Err(TxStateError::PendingStatementErrors(self.errors.len()).into());
        }

        let body = StatementsRequest::encode(statements)?.to_value()?;
        let url = self.commit_url.clone().unwrap_or_default();
        let exchanged = self
            .db
            .exchange("commit", HttpRequest::with_body(Method::Post, url, body), &[200]);
        let response = self.track(exchanged)?;
        let parsed = self.track(StatementsResponse::from_body("commit", response.body))?;

        let sent = statements.len();
        let attached = self.track(attach_results(
            "commit",
            statements,
            parsed.results,
            parsed.errors,
        ))?;
        self.db.metrics().add_statements_sent(sent as u64);

        if attached.errors.is_empty() {
            self.state = TxState::Committed;
            self.db.metrics().increment_transactions_committed();
            log_event_with_fields(Event::TxCommit, &[("location", self.location_str())]);
        } else {
            self.state = TxState::RolledBack;
            self.db.metrics().increment_transactions_rolled_back();
            self.errors.extend(attached.errors.iter().cloned());
            log_event_with_fields(Event::TxRollback, &[("location", self.location_str())]);
        }
        self.db.settle(attached)
    }

    /// Rolls the transaction back. Allowed with pending statement errors.
    pub fn rollback(&mut self) -> Result<()> {
        let location = self.ensure_open()?.to_string();
        let exchanged = self
            .db
            .exchange("rollback", HttpRequest::new(Method::Delete, location), &[200]);
        self.track(exchanged)?;

        self.state = TxState::RolledBack;
        self.db.metrics().increment_transactions_rolled_back();
        log_event_with_fields(Event::TxRollback, &[("location", self.location_str())]);
        Ok(())
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// URL of the open transaction
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn commit_url(&self) -> Option<&str> {
        self.commit_url.as_deref()
    }

    /// Expiry as the server last reported it, verbatim
    pub fn expires(&self) -> Option<&str> {
        self.expires.as_deref()
    }

    /// Expiry parsed as an RFC 2822 date; `None` if absent or in another
    /// format. Advisory only: nothing is enforced locally.
    pub fn expires_at(&self) -> Option<DateTime<FixedOffset>> {
        self.expires
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
    }

    /// Every statement error reported over the life of the transaction
    pub fn errors(&self) -> &[StatementError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn ensure_open(&self) -> Result<&str> {
        match self.state {
            TxState::Open => Ok(self.location_str()),
            TxState::NotStarted => Err(TxStateError::NotStarted.into()),
            terminal => Err(TxStateError::Terminated(terminal).into()),
        }
    }

    fn location_str(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }

    /// Applies the state change a failed exchange or unreadable response
    /// implies. After either, the server-side outcome is unknown.
    fn track<T>(&mut self, outcome: Result<T>) -> Result<T> {
        match &outcome {
            Err(Error::Transport(_)) | Err(Error::BadResponse { .. }) => {
                self.state = TxState::Broken
            }
            Err(Error::Protocol { status: 404, .. }) if self.state == TxState::Open => {
                self.state = TxState::Expired;
                self.db.metrics().increment_transactions_expired();
                log_event_with_fields(Event::TxExpired, &[("location", self.location_str())]);
            }
            _ => {}
        }
        outcome
    }

    fn refresh_expiry(&mut self, parsed: &StatementsResponse) {
        if let Some(expires) = parsed.transaction.as_ref().and_then(|t| t.expires.clone()) {
            self.expires = Some(expires);
        }
        if let Some(commit) = &parsed.commit {
            self.commit_url = Some(commit.clone());
        }
    }

    fn attach(
        &mut self,
        operation: &'static str,
        statements: &mut [Statement<'_>],
        parsed: StatementsResponse,
    ) -> Result<()> {
        self.db.metrics().add_statements_sent(statements.len() as u64);
        let attached = self.track(attach_results(
            operation,
            statements,
            parsed.results,
            parsed.errors,
        ))?;
        self.errors.extend(attached.errors.iter().cloned());
        self.db.settle(attached)
    }
}

/// `Location` header, or the commit URL without its `/commit` suffix
fn opened_location(response: &HttpResponse, parsed: &StatementsResponse) -> Option<String> {
    if let Some(location) = &response.location {
        return Some(location.clone());
    }
    parsed
        .commit
        .as_deref()
        .and_then(|commit| commit.strip_suffix("/commit"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ServiceRoot;
    use crate::errors::ErrorTier;
    use crate::transport::{ScriptedTransport, TransportError};
    use serde_json::json;
    use std::sync::Arc;

    const TX: &str = "http://db:7474/db/data/transaction/7";

    fn setup() -> (Arc<ScriptedTransport>, Database) {
        let transport = Arc::new(ScriptedTransport::new());
        let db = Database::with_transport(
            transport.clone(),
            ServiceRoot::at("http://db:7474/db/data/"),
        );
        (transport, db)
    }

    fn opened(transport: &ScriptedTransport) {
        transport.push_response(
            HttpResponse::json(
                201,
                json!({
                    "commit": format!("{}/commit", TX),
                    "results": [],
                    "transaction": {"expires": "Tue, 12 Nov 2013 10:31:44 +0000"},
                    "errors": []
                }),
            )
            .with_location(TX),
        );
    }

    #[test]
    fn test_begin_opens() {
        let (transport, db) = setup();
        opened(&transport);

        let mut tx = db.transaction();
        assert_eq!(tx.state(), TxState::NotStarted);
        tx.begin(&mut []).unwrap();

        assert_eq!(tx.state(), TxState::Open);
        assert_eq!(tx.location(), Some(TX));
        assert_eq!(tx.commit_url(), Some("http://db:7474/db/data/transaction/7/commit"));
        assert_eq!(tx.expires(), Some("Tue, 12 Nov 2013 10:31:44 +0000"));
        assert_eq!(tx.expires_at().unwrap().timestamp(), 1384252304);

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "http://db:7474/db/data/transaction");
        assert_eq!(sent.body, Some(json!({"statements": []})));
        assert_eq!(db.metrics().snapshot().transactions_opened, 1);
    }

    #[test]
    fn test_begin_location_from_commit_url() {
        let (transport, db) = setup();
        transport.push_response(HttpResponse::json(
            201,
            json!({"commit": format!("{}/commit", TX), "results": []}),
        ));
        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        assert_eq!(tx.location(), Some(TX));
    }

    #[test]
    fn test_begin_twice() {
        let (transport, db) = setup();
        opened(&transport);
        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx.begin(&mut []).unwrap_err();
        assert!(matches!(err, Error::Transaction(TxStateError::AlreadyStarted)));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_operations_before_begin() {
        let (transport, db) = setup();
        let mut tx = db.transaction();
        assert!(matches!(
            tx.query(&mut []).unwrap_err(),
            Error::Transaction(TxStateError::NotStarted)
        ));
        assert!(matches!(
            tx.commit().unwrap_err(),
            Error::Transaction(TxStateError::NotStarted)
        ));
        assert!(matches!(
            tx.rollback().unwrap_err(),
            Error::Transaction(TxStateError::NotStarted)
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_begin_with_statement_error_stays_open() {
        let (transport, db) = setup();
        transport.push_response(
            HttpResponse::json(
                201,
                json!({
                    "commit": format!("{}/commit", TX),
                    "results": [{"columns": ["x"], "data": [{"row": [1]}]}],
                    "errors": [{"code": 42000, "status": "Neo.ClientError.Statement.InvalidSyntax", "message": "bad"}]
                }),
            )
            .with_location(TX),
        );

        let mut stmts = vec![Statement::new("RETURN 1 AS x"), Statement::new("RETRUN 2")];
        let mut tx = db.transaction();
        let err = tx.begin(&mut stmts).unwrap_err();

        assert_eq!(err.tier(), ErrorTier::Statement);
        assert_eq!(tx.state(), TxState::Open);
        assert!(tx.has_errors());
        assert_eq!(tx.errors()[0].statement, Some(1));
        assert_eq!(stmts[0].column::<i64>().unwrap(), vec![1]);
        assert!(stmts[1].error().is_some());
    }

    #[test]
    fn test_commit_refused_with_pending_errors() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(
            200,
            json!({"results": [], "errors": [{"code": 1, "status": "S", "message": "m"}]}),
        ));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        assert!(tx.query(&mut [Statement::new("BAD")]).is_err());

        let before = transport.request_count();
        let err = tx.commit().unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TxStateError::PendingStatementErrors(1))
        ));
        assert_eq!(transport.request_count(), before);
        assert_eq!(tx.state(), TxState::Open);
    }

    #[test]
    fn test_commit() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(200, json!({"results": [], "errors": []})));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        tx.commit().unwrap();

        assert_eq!(tx.state(), TxState::Committed);
        let sent = &transport.requests()[1];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "http://db:7474/db/data/transaction/7/commit");
        assert_eq!(db.metrics().snapshot().transactions_committed, 1);

        let err = tx.commit().unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TxStateError::Terminated(TxState::Committed))
        ));
    }

    #[test]
    fn test_commit_with_failing_final_statement_rolls_back() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(
            200,
            json!({"results": [], "errors": [{"code": 1, "status": "S", "message": "m"}]}),
        ));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx.commit_with(&mut [Statement::new("BAD")]).unwrap_err();
        assert_eq!(err.tier(), ErrorTier::Statement);
        assert_eq!(tx.state(), TxState::RolledBack);
    }

    #[test]
    fn test_rollback() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(200, json!({"results": [], "errors": []})));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        tx.rollback().unwrap();

        assert_eq!(tx.state(), TxState::RolledBack);
        let sent = &transport.requests()[1];
        assert_eq!(sent.method, Method::Delete);
        assert_eq!(sent.url, TX);
        assert!(tx.query(&mut []).is_err());
    }

    #[test]
    fn test_expired_on_not_found() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(
            404,
            json!({"errors": [{"code": 0, "status": "Neo.ClientError.Transaction.UnknownId", "message": "gone"}]}),
        ));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx.query(&mut [Statement::new("RETURN 1")]).unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(tx.state(), TxState::Expired);
        assert_eq!(db.metrics().snapshot().transactions_expired, 1);
        assert!(matches!(
            tx.rollback().unwrap_err(),
            Error::Transaction(TxStateError::Terminated(TxState::Expired))
        ));
    }

    #[test]
    fn test_other_protocol_error_keeps_open() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::empty(500));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx.query(&mut [Statement::new("RETURN 1")]).unwrap_err();
        assert_eq!(err.tier(), ErrorTier::Protocol);
        assert_eq!(tx.state(), TxState::Open);
    }

    #[test]
    fn test_transport_error_breaks() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_error(TransportError::Timeout("slow".into()));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx.commit().unwrap_err();
        assert_eq!(err.tier(), ErrorTier::Transport);
        assert_eq!(tx.state(), TxState::Broken);
    }

    #[test]
    fn test_malformed_commit_body_breaks() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(200, json!({"results": "oops"})));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx.commit().unwrap_err();
        assert_eq!(err.tier(), ErrorTier::Transport);
        assert_eq!(err.code(), "LINK_TRANSPORT_BAD_RESPONSE");
        assert_eq!(tx.state(), TxState::Broken);
        assert!(matches!(
            tx.rollback().unwrap_err(),
            Error::Transaction(TxStateError::Terminated(TxState::Broken))
        ));
        assert_eq!(db.metrics().snapshot().transactions_committed, 0);
    }

    #[test]
    fn test_commit_missing_results_breaks() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(200, json!({"results": [], "errors": []})));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx
            .commit_with(&mut [Statement::new("RETURN 1")])
            .unwrap_err();
        assert!(matches!(err, Error::BadResponse { .. }));
        assert_eq!(tx.state(), TxState::Broken);
    }

    #[test]
    fn test_malformed_query_body_breaks() {
        let (transport, db) = setup();
        opened(&transport);
        transport.push_response(HttpResponse::json(200, json!({"results": 5})));

        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        let err = tx.query(&mut [Statement::new("RETURN 1")]).unwrap_err();
        assert_eq!(err.tier(), ErrorTier::Transport);
        assert_eq!(tx.state(), TxState::Broken);
        assert!(tx.commit().is_err());
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_begin_protocol_error_stays_not_started() {
        let (transport, db) = setup();
        transport.push_response(HttpResponse::empty(503));
        let mut tx = db.transaction();
        assert!(tx.begin(&mut []).is_err());
        assert_eq!(tx.state(), TxState::NotStarted);
    }

    #[test]
    fn test_expires_at_tolerates_other_formats() {
        let (transport, db) = setup();
        transport.push_response(
            HttpResponse::json(201, json!({"transaction": {"expires": "soon"}})).with_location(TX),
        );
        let mut tx = db.transaction();
        tx.begin(&mut []).unwrap();
        assert_eq!(tx.expires(), Some("soon"));
        assert!(tx.expires_at().is_none());
    }
}
