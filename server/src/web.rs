use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tiny_http::{Header, Method, Request, Response, Server};

use common::wire::{
    StatusBody, INVALID_JSON, INVALID_SENSOR_DATA, JSON_CONTENT_TYPE, METHOD_NOT_ALLOWED,
    NOT_FOUND, PAYLOAD_TOO_LARGE, SENSOR_DATA_PATH,
};

use crate::data_handler::{decode_submission, IngestMode, Submission};
use crate::error::{Error, IngestError, Result};

/// Everything a request handler needs. Shared by all handler threads.
pub struct Ingest {
    pub mode: IngestMode,
    pub observer: Sender<Submission>,
    pub max_body_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Submit,
    WrongMethod,
    NotFound,
}

pub fn route(method: &Method, url: &str) -> Route {
    let path = url.split('?').next().unwrap_or(url);
    if path != SENSOR_DATA_PATH {
        Route::NotFound
    } else if *method != Method::Post {
        Route::WrongMethod
    } else {
        Route::Submit
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: StatusBody,
}

impl Reply {
    fn error(status: u16, message: &str) -> Self {
        Reply {
            status,
            body: StatusBody::error(message),
        }
    }
}

/// Decodes a complete submission body and hands it to the observer.
pub fn ingest_body(body: &[u8], ingest: &Ingest) -> Reply {
    match decode_submission(body, ingest.mode) {
        Ok(submission) => {
            if ingest.observer.send(submission).is_err() {
                warn!("Observer is gone, accepted batch will not be shown");
            }
            Reply {
                status: 200,
                body: StatusBody::ok(),
            }
        }
        Err(e) => {
            debug!("Rejected submission: {}", e);
            let message = match e {
                IngestError::InvalidJson(_) => INVALID_JSON,
                IngestError::InvalidReadings(_) => INVALID_SENSOR_DATA,
            };
            Reply::error(400, message)
        }
    }
}

/// Reads the body up to its declared length, refusing anything over the limit.
fn read_body(request: &mut Request, limit: u64) -> std::result::Result<Vec<u8>, Reply> {
    let mut body = Vec::new();
    match request.as_reader().take(limit + 1).read_to_end(&mut body) {
        Ok(_) if body.len() as u64 > limit => Err(Reply::error(413, PAYLOAD_TOO_LARGE)),
        Ok(_) => Ok(body),
        Err(e) => {
            debug!("Failed to read submission body: {}", e);
            Err(Reply::error(400, INVALID_JSON))
        }
    }
}

fn with_header<R: Read>(response: Response<R>, name: &str, value: &str) -> Response<R> {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

pub fn serve_request(mut request: Request, ingest: &Ingest) {
    let route = route(request.method(), request.url());
    let reply = match route {
        Route::NotFound => Reply::error(404, NOT_FOUND),
        Route::WrongMethod => Reply::error(405, METHOD_NOT_ALLOWED),
        Route::Submit => match read_body(&mut request, ingest.max_body_bytes) {
            Ok(body) => ingest_body(&body, ingest),
            Err(reply) => reply,
        },
    };

    let mut response = Response::from_data(reply.body.to_bytes()).with_status_code(reply.status);
    response = with_header(response, "Content-Type", JSON_CONTENT_TYPE);
    if route == Route::WrongMethod {
        response = with_header(response, "Allow", "POST");
    }

    if let Err(e) = request.respond(response) {
        debug!("Client left before the reply was sent: {}", e);
    }
}

/// Accepts submissions and answers each request on its own thread.
pub struct Endpoint {
    server: Arc<Server>,
    stopped: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl Endpoint {
    pub fn start(listen_address: &str, port: u16, ingest: Ingest) -> Result<Endpoint> {
        let address = format!("{}:{}", listen_address, port);
        let server = Server::http(address.as_str()).map_err(|e| Error::Bind {
            address: address.clone(),
            reason: e.to_string(),
        })?;
        let server = Arc::new(server);

        let (done_tx, stopped) = bounded(1);
        let handle = {
            let server = Arc::clone(&server);
            let ingest = Arc::new(ingest);
            thread::spawn(move || {
                accept_requests(&server, ingest);
                let _ = done_tx.send(());
            })
        };

        Ok(Endpoint {
            server,
            stopped,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Fires once the accept loop has ended.
    pub fn stopped(&self) -> Receiver<()> {
        self.stopped.clone()
    }

    pub fn shutdown(mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Accept loop panicked");
            }
        }
    }
}

fn accept_requests(server: &Server, ingest: Arc<Ingest>) {
    for request in server.incoming_requests() {
        let ingest = Arc::clone(&ingest);
        let spawned = thread::Builder::new()
            .name("ingest".into())
            .spawn(move || serve_request(request, &ingest));
        if let Err(e) = spawned {
            error!("Could not spawn request handler: {}", e);
        }
    }
    info!("Listener stopped");
}
