//! Backend HTTP transport — implements [`CloudPort`].
//!
//! One short-lived TLS connection per request: the ESP32 cannot afford an
//! idle keep-alive socket plus its TLS session for the minutes between
//! telemetry pushes.  Every request (including the command poll, whose body
//! is empty) carries the four signed headers from [`crate::cloud::auth`].
//!
//! On non-ESP targets the transport is a loopback simulator: sends are
//! counted, acks recorded, and the command feed is whatever the test
//! injected.  No sockets are opened.

use log::{debug, warn};

use crate::app::ports::CloudPort;
use crate::cloud::auth::{self, RequestSigner};
use crate::cloud::messages::{self, AckStatus, CloudCommand, CommandAck, MessageKind};
use crate::config::SystemConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use crate::adapters::time::SystemClock;
#[cfg(target_os = "espidf")]
use crate::app::ports::ClockPort;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::Method;

/// Per-request socket + TLS timeout.
#[cfg(target_os = "espidf")]
const HTTP_TIMEOUT: core::time::Duration = core::time::Duration::from_secs(10);

/// Largest response body we will buffer (the command feed).
#[cfg(target_os = "espidf")]
const MAX_RESPONSE_BYTES: usize = 4096;

/// Largest request body we will put on the wire.
const MAX_BODY_BYTES: usize = 2048;

pub struct HttpCloud {
    base_url: String,
    signer: RequestSigner,
    #[cfg(target_os = "espidf")]
    use_tls: bool,
    #[cfg(target_os = "espidf")]
    clock: SystemClock,
    #[cfg(not(target_os = "espidf"))]
    sim_feed: std::collections::VecDeque<CloudCommand>,
    #[cfg(not(target_os = "espidf"))]
    sim_fail_sends: u8,
    #[cfg(not(target_os = "espidf"))]
    sim_sent: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_acks: Vec<(String, &'static str)>,
}

impl HttpCloud {
    /// `device_id` is passed separately from `cfg` because an empty
    /// configured id is resolved from the MAC at boot.
    pub fn new(cfg: &SystemConfig, device_id: &str) -> Self {
        let scheme = if cfg.backend_use_tls { "https" } else { "http" };
        let base_url = format!("{}://{}:{}", scheme, cfg.backend_host, cfg.backend_port);
        Self {
            base_url,
            signer: RequestSigner::new(device_id, &cfg.api_key, &cfg.hmac_secret),
            #[cfg(target_os = "espidf")]
            use_tls: cfg.backend_use_tls,
            #[cfg(target_os = "espidf")]
            clock: SystemClock::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_feed: std::collections::VecDeque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_fail_sends: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_sent: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_acks: Vec::new(),
        }
    }

    pub fn device_id(&self) -> &str {
        self.signer.device_id()
    }

    /// Issue one signed request and buffer the response body.
    #[cfg(target_os = "espidf")]
    fn request(
        &self,
        method: Method,
        path: &str,
        body: &[u8],
    ) -> Result<(u16, Vec<u8>), CommsError> {
        let config = HttpConfiguration {
            timeout: Some(HTTP_TIMEOUT),
            crt_bundle_attach: self
                .use_tls
                .then_some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut conn = EspHttpConnection::new(&config).map_err(|e| {
            warn!("http connection setup failed: {e}");
            CommsError::RequestFailed
        })?;

        // Unsynced clock signs with ts=0; the backend flags it instead of
        // dropping the reading.
        let signed = self
            .signer
            .sign(body, self.clock.epoch_secs().unwrap_or(0));
        let url = format!("{}{}", self.base_url, path);
        let content_length = body.len().to_string();

        let mut headers: Vec<(&str, &str)> = Vec::with_capacity(6);
        headers.push(("content-type", "application/json"));
        if !body.is_empty() {
            headers.push(("content-length", content_length.as_str()));
        }
        headers.push((auth::HEADER_DEVICE_ID, self.signer.device_id()));
        headers.push((auth::HEADER_API_KEY, self.signer.api_key()));
        headers.push((auth::HEADER_TIMESTAMP, signed.timestamp.as_str()));
        headers.push((auth::HEADER_SIGNATURE, signed.signature.as_str()));

        conn.initiate_request(method, &url, &headers).map_err(|e| {
            warn!("http request to {path} failed: {e}");
            CommsError::RequestFailed
        })?;

        let mut written = 0;
        while written < body.len() {
            let n = conn.write(&body[written..]).map_err(|e| {
                warn!("http body write failed: {e}");
                CommsError::RequestFailed
            })?;
            if n == 0 {
                return Err(CommsError::RequestFailed);
            }
            written += n;
        }

        conn.initiate_response().map_err(|e| {
            warn!("no http response from {path}: {e}");
            CommsError::RequestFailed
        })?;
        let status = conn.status();

        let mut out = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let n = conn
                .read(&mut chunk)
                .map_err(|_| CommsError::MalformedResponse)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
            if out.len() > MAX_RESPONSE_BYTES {
                warn!("response from {path} exceeds {MAX_RESPONSE_BYTES} B, dropping");
                return Err(CommsError::MalformedResponse);
            }
        }
        Ok((status, out))
    }
}

// ── ESP-IDF transport ────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl CloudPort for HttpCloud {
    fn send(&mut self, kind: MessageKind, body: &[u8]) -> Result<(), CommsError> {
        if body.len() > MAX_BODY_BYTES {
            return Err(CommsError::PayloadTooLarge);
        }
        let (status, _) = self.request(Method::Post, kind.path(), body)?;
        if !(200..300).contains(&status) {
            warn!("{} rejected with http {}", kind.as_str(), status);
            return Err(CommsError::BadStatus(status));
        }
        debug!("cloud tx {} ({} B)", kind.as_str(), body.len());
        Ok(())
    }

    fn fetch_commands(&mut self) -> Result<Vec<CloudCommand>, CommsError> {
        let (status, body) = self.request(Method::Get, messages::COMMANDS_PATH, &[])?;
        if !(200..300).contains(&status) {
            return Err(CommsError::BadStatus(status));
        }
        messages::parse_command_feed(&body).map_err(|e| {
            warn!("command feed rejected: {}", e.as_str());
            CommsError::MalformedResponse
        })
    }

    fn ack(&mut self, id: &str, status: AckStatus, detail: &str) -> Result<(), CommsError> {
        let record = CommandAck {
            device_id: self.signer.device_id(),
            command_id: id,
            status: status.as_str(),
            detail,
            protocol_version: messages::PROTOCOL_VERSION,
        };
        let body = serde_json::to_vec(&record).map_err(|_| CommsError::RequestFailed)?;
        let (code, _) = self.request(Method::Post, messages::COMMAND_ACK_PATH, &body)?;
        if !(200..300).contains(&code) {
            return Err(CommsError::BadStatus(code));
        }
        debug!("acked command {id} as {}", status.as_str());
        Ok(())
    }
}

// ── Host-side loopback ───────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl HttpCloud {
    /// Queue a command for the next poll.
    pub fn sim_push_command(&mut self, command: CloudCommand) {
        self.sim_feed.push_back(command);
    }

    /// Fail the next `n` sends with `RequestFailed`.
    pub fn sim_fail_next_sends(&mut self, n: u8) {
        self.sim_fail_sends = n;
    }

    pub fn sim_sent_count(&self) -> u32 {
        self.sim_sent
    }

    pub fn sim_acks(&self) -> &[(String, &'static str)] {
        &self.sim_acks
    }
}

#[cfg(not(target_os = "espidf"))]
impl CloudPort for HttpCloud {
    fn send(&mut self, kind: MessageKind, body: &[u8]) -> Result<(), CommsError> {
        if body.len() > MAX_BODY_BYTES {
            return Err(CommsError::PayloadTooLarge);
        }
        if self.sim_fail_sends > 0 {
            self.sim_fail_sends -= 1;
            return Err(CommsError::RequestFailed);
        }
        self.sim_sent += 1;
        debug!(
            "cloud tx(sim) {} -> {}{} ({} B)",
            kind.as_str(),
            self.base_url,
            kind.path(),
            body.len()
        );
        Ok(())
    }

    fn fetch_commands(&mut self) -> Result<Vec<CloudCommand>, CommsError> {
        Ok(self.sim_feed.drain(..).collect())
    }

    fn ack(&mut self, id: &str, status: AckStatus, detail: &str) -> Result<(), CommsError> {
        let _ = detail;
        self.sim_acks.push((id.to_owned(), status.as_str()));
        Ok(())
    }
}
