//! Database handle
//!
//! A [`Database`] is an explicitly constructed handle: a transport, the
//! server's service root and a metrics registry. It runs autocommit
//! statements and hands out [`Transaction`]s and [`Batch`]es that borrow it.
//! There is no process-wide handle.

mod service_root;

pub use service_root::ServiceRoot;

use std::sync::Arc;

use crate::batch::Batch;
use crate::config::ClientConfig;
use crate::cypher::wire::{attach_results, Attached, StatementsRequest, StatementsResponse};
use crate::cypher::{Statement, StatementErrors};
use crate::errors::{Error, Result};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};
use crate::tx::Transaction;

/// Handle to one graph database server
#[derive(Clone)]
pub struct Database {
    transport: Arc<dyn Transport>,
    root: ServiceRoot,
    metrics: Arc<MetricsRegistry>,
}

impl Database {
    /// Connects using `config`: builds the HTTP transport and reads the
    /// service root.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(config)?;
        Self::discover(Arc::new(transport), &config.service_root_url()?)
    }

    /// Reads the service root at `url` through `transport`.
    ///
    /// A 404 means `url` is not a database root. A root without a version
    /// is rejected.
    pub fn discover(transport: Arc<dyn Transport>, url: &str) -> Result<Self> {
        let metrics = Arc::new(MetricsRegistry::new());
        let db = Self {
            transport,
            root: ServiceRoot::default(),
            metrics,
        };

        let response = db.exchange("service_root", HttpRequest::new(Method::Get, url), &[200])?;
        let mut root: ServiceRoot = match response.body {
            Some(body) => serde_json::from_value(body).map_err(|e| Error::BadResponse {
                operation: "service_root",
                reason: e.to_string(),
            })?,
            None => ServiceRoot::default(),
        };
        if root.neo4j_version.is_empty() {
            return Err(Error::BadResponse {
                operation: "service_root",
                reason: "service root does not report a server version".to_string(),
            });
        }
        root.fill_missing(url);

        log_event_with_fields(
            Event::ServiceRootLoaded,
            &[("url", url), ("version", root.neo4j_version.as_str())],
        );
        Ok(Self { root, ..db })
    }

    /// Handle over an already-known service root; performs no request
    pub fn with_transport<T>(transport: T, root: ServiceRoot) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            transport: Arc::new(transport),
            root,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Endpoints advertised by the server
    pub fn service_root(&self) -> &ServiceRoot {
        &self.root
    }

    /// Counters for everything run through this handle and its clones
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Runs one statement in its own transaction (begin and commit in a
    /// single request).
    ///
    /// The statement's target is filled on success. A server-side failure of
    /// the statement is returned as [`Error::Statement`].
    pub fn cypher(&self, statement: &mut Statement<'_>) -> Result<()> {
        self.cypher_batch(std::slice::from_mut(statement))
    }

    /// Runs several statements in one autocommit request.
    ///
    /// Results are attached to each statement in order; statements that
    /// succeeded keep their results even when a sibling failed.
    pub fn cypher_batch(&self, statements: &mut [Statement<'_>]) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }
        let request = StatementsRequest::encode(statements)?;
        let count = statements.len().to_string();
        log_event_with_fields(Event::CypherBegin, &[("statements", count.as_str())]);

        let url = self.root.autocommit_url();
        let response = self.exchange(
            "cypher",
            HttpRequest::with_body(Method::Post, url, request.to_value()?),
            &[200],
        )?;
        self.metrics.add_statements_sent(statements.len() as u64);

        let body = StatementsResponse::from_body("cypher", response.body)?;
        let attached = attach_results("cypher", statements, body.results, body.errors)?;
        log_event_with_fields(Event::CypherComplete, &[("statements", count.as_str())]);
        self.settle(attached)
    }

    /// New transaction, not yet started
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// New, empty batch
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self)
    }

    /// One round trip. Transport failures and statuses outside `expected`
    /// are logged, counted and returned as errors.
    pub(crate) fn exchange(
        &self,
        operation: &'static str,
        request: HttpRequest,
        expected: &[u16],
    ) -> Result<HttpResponse> {
        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(e) => {
                self.metrics.increment_transport_failures();
                let reason = e.to_string();
                log_event_with_fields(
                    Event::TransportFailed,
                    &[("operation", operation), ("reason", reason.as_str())],
                );
                return Err(Error::Transport(e));
            }
        };

        if !expected.contains(&response.status) {
            self.metrics.increment_protocol_failures();
            let status = response.status.to_string();
            log_event_with_fields(
                Event::ProtocolFailed,
                &[("operation", operation), ("status", status.as_str())],
            );
            return Err(Error::protocol(operation, response.status, response.body.as_ref()));
        }

        Ok(response)
    }

    /// Turns the outcome of attaching results into the call's result.
    ///
    /// Statement errors take precedence over a decode failure; the decode
    /// failure is still logged.
    pub(crate) fn settle(&self, attached: Attached) -> Result<()> {
        if let Some((index, ref e)) = attached.decode_error {
            let index = index.to_string();
            let reason = e.to_string();
            log_event_with_fields(
                Event::DecodeFailed,
                &[("statement", index.as_str()), ("reason", reason.as_str())],
            );
        }

        if !attached.errors.is_empty() {
            self.metrics.add_statement_errors(attached.errors.len() as u64);
            for error in &attached.errors {
                let index = error
                    .statement
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| "-".to_string());
                log_event_with_fields(
                    Event::TxStatementErrors,
                    &[
                        ("statement", index.as_str()),
                        ("status", error.status.as_str()),
                        ("message", error.message.as_str()),
                    ],
                );
            }
            return Err(Error::Statement(StatementErrors::new(attached.errors)));
        }

        match attached.decode_error {
            Some((_, e)) => Err(Error::Decode(e)),
            None => Ok(()),
        }
    }
}
