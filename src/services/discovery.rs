//! Discovery-engine adapter: invokes nmap with a profile-mapped argument
//! set and parses its XML report into host records.

use std::process::Stdio;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::process::Command;

use crate::error::{ApiError, ApiResult};
use crate::models::{HostRecord, HostState, OsMatch, PortRecord, PortState, ScanProfile, Transport};

/// Seam for the external discovery engine so the orchestrator can be
/// exercised against stubs.
#[async_trait]
pub trait DiscoveryEngine: Send + Sync {
    async fn discover(&self, target: &str, profile: ScanProfile) -> ApiResult<Vec<HostRecord>>;
}

pub struct NmapEngine {
    path: String,
}

impl NmapEngine {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DiscoveryEngine for NmapEngine {
    async fn discover(&self, target: &str, profile: ScanProfile) -> ApiResult<Vec<HostRecord>> {
        let timeout = profile.timeout();

        let mut cmd = Command::new(&self.path);
        cmd.args(profile.engine_args())
            .args(["-oX", "-"])
            .arg(target)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            scan_target = target,
            profile = profile.name(),
            timeout_secs = timeout.as_secs(),
            "starting discovery scan"
        );

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ApiError::engine_error(format!(
                    "failed to execute discovery engine: {e}"
                )))
            }
            Err(_) => {
                return Err(ApiError::scan_timeout(format!(
                    "discovery scan timed out after {} seconds",
                    timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApiError::engine_error(format!(
                "discovery engine exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let report = String::from_utf8_lossy(&output.stdout);
        parse_report(&report)
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn parse_transport(raw: &str) -> Transport {
    match raw {
        "udp" => Transport::Udp,
        _ => Transport::Tcp,
    }
}

fn parse_port_state(raw: &str) -> PortState {
    match raw {
        "open" => PortState::Open,
        "closed" => PortState::Closed,
        _ => PortState::Filtered,
    }
}

fn parse_host_state(raw: &str) -> HostState {
    match raw {
        "up" => HostState::Up,
        "down" => HostState::Down,
        _ => HostState::Unknown,
    }
}

/// Parse an nmap XML report into host records. Probe outputs are copied
/// verbatim whether or not they look like findings; classification happens
/// in the risk scorer. OS candidates parse best-effort with missing fields
/// defaulting to empty.
pub(crate) fn parse_report(xml: &str) -> ApiResult<Vec<HostRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut hosts = Vec::new();
    let mut host: Option<HostRecord> = None;
    let mut port: Option<PortRecord> = None;
    let mut in_hostscript = false;
    let mut hostname_set = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ApiError::engine_error(format!("malformed discovery report: {e}")))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"host" => {
                    host = Some(HostRecord::new(String::new()));
                    hostname_set = false;
                }
                b"status" => {
                    if let (Some(h), Some(state)) = (host.as_mut(), attr(e, b"state")) {
                        h.state = parse_host_state(&state);
                    }
                }
                b"address" => {
                    if let Some(h) = host.as_mut() {
                        let addrtype = attr(e, b"addrtype").unwrap_or_default();
                        if h.ip.is_empty() && (addrtype == "ipv4" || addrtype == "ipv6") {
                            h.ip = attr(e, b"addr").unwrap_or_default();
                        }
                    }
                }
                b"hostname" => {
                    if let Some(h) = host.as_mut() {
                        if !hostname_set {
                            if let Some(name) = attr(e, b"name").filter(|n| !n.is_empty()) {
                                h.hostname = Some(name);
                                hostname_set = true;
                            }
                        }
                    }
                }
                b"port" => {
                    let number = attr(e, b"portid")
                        .and_then(|p| p.parse::<u16>().ok())
                        .unwrap_or(0);
                    let protocol =
                        parse_transport(&attr(e, b"protocol").unwrap_or_default());
                    port = Some(PortRecord::new(number, protocol, PortState::Filtered));
                }
                b"state" => {
                    if let (Some(p), Some(state)) = (port.as_mut(), attr(e, b"state")) {
                        p.state = parse_port_state(&state);
                    }
                }
                b"service" => {
                    if let Some(p) = port.as_mut() {
                        if let Some(name) = attr(e, b"name").filter(|n| !n.is_empty()) {
                            p.service = name;
                        }
                        p.product = attr(e, b"product").unwrap_or_default();
                        p.version = attr(e, b"version").unwrap_or_default();
                        p.extra_info = attr(e, b"extrainfo").unwrap_or_default();
                    }
                }
                b"hostscript" => {
                    in_hostscript = true;
                }
                b"script" => {
                    let id = attr(e, b"id").unwrap_or_default();
                    let output = attr(e, b"output").unwrap_or_default();
                    if let Some(p) = port.as_mut() {
                        p.scripts.insert(id, output);
                    } else if in_hostscript {
                        if let Some(h) = host.as_mut() {
                            h.scripts.insert(id, output);
                        }
                    }
                }
                b"osmatch" => {
                    if let Some(h) = host.as_mut() {
                        h.os_matches.push(OsMatch {
                            name: attr(e, b"name").unwrap_or_default(),
                            accuracy: attr(e, b"accuracy")
                                .and_then(|a| a.parse::<u8>().ok())
                                .unwrap_or(0),
                            platform: None,
                        });
                    }
                }
                b"osclass" => {
                    if let Some(last) = host.as_mut().and_then(|h| h.os_matches.last_mut()) {
                        if last.platform.is_none() {
                            last.platform = attr(e, b"osfamily").filter(|f| !f.is_empty());
                        }
                    }
                }
                _ => {}
            },
            Event::End(ref e) => match e.name().as_ref() {
                b"port" => {
                    if let (Some(h), Some(p)) = (host.as_mut(), port.take()) {
                        let duplicate = h
                            .ports
                            .iter()
                            .any(|existing| {
                                existing.port == p.port && existing.protocol == p.protocol
                            });
                        if !duplicate {
                            h.ports.push(p);
                        }
                    }
                }
                b"hostscript" => {
                    in_hostscript = false;
                }
                b"host" => {
                    if let Some(h) = host.take() {
                        hosts.push(h);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(hosts)
}
