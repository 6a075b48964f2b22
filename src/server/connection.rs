//! Per-connection HTTP handshake
//!
//! One request, one response. A connection either ends here (error or
//! challenge) or is promoted into the client registry with its socket still
//! open.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::auth::{AuthOutcome, AuthScheme};
use crate::http::{read_request, HttpError, Response, StatusCode};
use crate::registry::{Client, ClientId, RegistryError};

use super::Shared;

/// How a handshake ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Viewer registered for streaming
    Streaming,
    /// Connection answered with an error or challenge and closed
    Rejected(StatusCode),
    /// Connection dropped without a response
    Abandoned,
}

/// An accepted TCP connection that has not been admitted yet
pub(crate) struct Connection {
    id: ClientId,
    socket: TcpStream,
    peer_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl Connection {
    pub fn new(id: ClientId, socket: TcpStream, peer_addr: SocketAddr, shared: Arc<Shared>) -> Self {
        Self {
            id,
            socket,
            peer_addr,
            shared,
        }
    }

    /// Run the handshake to completion
    pub async fn run(mut self) -> HandshakeOutcome {
        let id = self.id;
        let peer = self.peer_addr;

        let config = &self.shared.config;
        let request =
            match read_request(&mut self.socket, config.max_request_size, config.handshake_timeout)
                .await
            {
                Ok(request) => request,
                Err(e @ (HttpError::EmptyRequest | HttpError::Timeout | HttpError::Disconnected(_))) => {
                    tracing::debug!(client_id = id, peer = %peer, error = %e, "Connection abandoned");
                    return HandshakeOutcome::Abandoned;
                }
                Err(e) => {
                    self.shared.metrics.add_bad_requests(1);
                    tracing::warn!(client_id = id, peer = %peer, error = %e, "Bad request");
                    return self.reject(Response::error(StatusCode::BadRequest)).await;
                }
            };

        tracing::debug!(
            client_id = id,
            peer = %peer,
            method = %request.method,
            url = %request.url,
            "Request received"
        );

        let auth = Arc::clone(&self.shared.auth);
        if auth.scheme() != AuthScheme::None {
            let Some(authorization) = request.authorization() else {
                tracing::debug!(client_id = id, peer = %peer, "Sending authentication challenge");
                return self.reject(Response::unauthorized(auth.challenge())).await;
            };

            match auth.verify(&request.method, authorization) {
                AuthOutcome::Granted => {}
                AuthOutcome::Denied => {
                    self.shared.metrics.add_auth_failures(1);
                    tracing::warn!(client_id = id, peer = %peer, "Authentication failed");
                    return self.reject(Response::unauthorized(auth.challenge())).await;
                }
                AuthOutcome::Malformed => {
                    self.shared.metrics.add_bad_requests(1);
                    tracing::warn!(
                        client_id = id,
                        peer = %peer,
                        scheme = %auth.scheme(),
                        "Malformed or unsupported authorization"
                    );
                    return self.reject(Response::error(StatusCode::BadRequest)).await;
                }
            }
        }

        // Only authenticated viewers learn that the server is full
        if self.shared.registry.is_full().await {
            self.shared.metrics.add_busy_rejections(1);
            tracing::warn!(
                client_id = id,
                peer = %peer,
                max_clients = self.shared.registry.max_clients(),
                "Connection rejected: viewer limit reached"
            );
            return self.reject(Response::error(StatusCode::ServiceUnavailable)).await;
        }

        if let Err(e) = Response::stream().write_to(&mut self.socket).await {
            tracing::warn!(client_id = id, peer = %peer, error = %e, "Failed to send stream response");
            return HandshakeOutcome::Abandoned;
        }

        let client = Client::new(id, peer, self.socket);
        match self.shared.registry.register(client).await {
            Ok(_) => {
                self.shared.metrics.add_viewers_admitted(1);
                HandshakeOutcome::Streaming
            }
            Err(e) => {
                if let RegistryError::Full(_) = e {
                    self.shared.metrics.add_busy_rejections(1);
                }
                tracing::warn!(client_id = id, peer = %peer, error = %e, "Viewer not registered");
                HandshakeOutcome::Abandoned
            }
        }
    }

    async fn reject(mut self, response: Response) -> HandshakeOutcome {
        let status = response.status();

        if let Err(e) = response.write_to(&mut self.socket).await {
            tracing::debug!(
                client_id = self.id,
                peer = %self.peer_addr,
                error = %e,
                "Failed to send response"
            );
            return HandshakeOutcome::Abandoned;
        }

        tracing::debug!(client_id = self.id, peer = %self.peer_addr, status = %status, "Connection closed");
        HandshakeOutcome::Rejected(status)
    }
}
