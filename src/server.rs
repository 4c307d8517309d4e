//! LSRM TCP command server.
//!
//! Exposes an [`McaRegistry`] over the line-oriented JSON protocol described
//! in [`crate::protocol`]. Each accepted connection is served by its own
//! task, so a silent peer cannot starve other clients; per-engine locking
//! inside the devices remains the only serialization point.
//!
//! Error policy: every syntactically readable line gets a well-formed
//! response. Unknown devices and unknown commands answer `result:false`
//! echoing the command; a line that does not parse as a request answers
//! `result:false` with an empty command. Engine-internal faults never cross
//! into this layer.

use crate::error::AppResult;
use crate::protocol::{parse_request, Response};
use crate::registry::McaRegistry;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

/// Manufacturer string reported by `getmcacommonparams`.
const MANUFACTURER: &str = "Lsrm";

/// TCP front-end for a registry of MCA devices.
pub struct LsrmServer {
    registry: Arc<McaRegistry>,
}

impl LsrmServer {
    /// Wrap a registry. The registry is shared with connection tasks and
    /// must not change afterwards.
    pub fn new(registry: Arc<McaRegistry>) -> Self {
        Self { registry }
    }

    /// Accept connections forever, one task per connection.
    pub async fn serve(&self, listener: TcpListener) -> AppResult<()> {
        info!("ready to accept connections");
        loop {
            let (stream, addr) = listener.accept().await?;
            info!(%addr, "input connection");
            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                handle_connection(registry, stream).await;
                info!(%addr, "disconnected");
            });
        }
    }
}

/// Read newline-terminated requests until the peer closes the connection.
async fn handle_connection(registry: Arc<McaRegistry>, stream: TcpStream) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = dispatch(&registry, line).await;
        if writer
            .write_all(response.encode_line().as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}

/// Parse one request line and execute it against the registry.
pub async fn dispatch(registry: &McaRegistry, line: &str) -> Response {
    let request = match parse_request(line) {
        Ok(request) => request,
        Err(err) => {
            warn!("{err}");
            return Response::error("");
        }
    };

    match request.command.as_str() {
        "getmcalist" => Response::ok(
            "getmcalist",
            json!({ "McaList": registry.names() }),
        ),
        cmd @ ("getmcacommonparams" | "getmcastatus" | "getmcaspectrum" | "setmcastart"
        | "setmcastop" | "setmcaclear") => {
            let Some(mca) = request.mca_id().and_then(|id| registry.get(id)) else {
                return Response::error(cmd);
            };
            match cmd {
                "getmcacommonparams" => {
                    let channels = mca.channels();
                    Response::ok(
                        cmd,
                        json!({
                            "Manufacturer": MANUFACTURER,
                            "Channels": channels,
                            "Lld": 0,
                            "Uld": channels - 1,
                        }),
                    )
                }
                "getmcastatus" => Response::ok(cmd, json!({ "InRun": mca.is_running() })),
                "getmcaspectrum" => {
                    let snapshot = mca.snapshot().await;
                    Response::ok(
                        cmd,
                        json!({
                            "LiveTime": snapshot.live_time,
                            "RealTime": snapshot.real_time,
                            "DataSize": snapshot.counts.len(),
                            "Data": snapshot.counts,
                        }),
                    )
                }
                "setmcastart" => {
                    mca.start();
                    Response::ok(cmd, json!({}))
                }
                "setmcastop" => {
                    mca.stop();
                    Response::ok(cmd, json!({}))
                }
                _ => {
                    mca.clear().await;
                    Response::ok(cmd, json!({}))
                }
            }
        }
        other => {
            warn!(command = other, "unknown command");
            Response::error(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Mca, Snapshot};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Minimal in-memory device for dispatch tests.
    struct StubMca {
        running: AtomicBool,
        channels: usize,
    }

    impl StubMca {
        fn new(channels: usize) -> Self {
            Self {
                running: AtomicBool::new(false),
                channels,
            }
        }
    }

    #[async_trait]
    impl Mca for StubMca {
        fn start(&self) {
            self.running.store(true, Ordering::SeqCst);
        }
        fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }
        async fn clear(&self) {}
        async fn snapshot(&self) -> Snapshot {
            Snapshot {
                live_time: 1.5,
                real_time: 2.0,
                counts: vec![0; self.channels],
            }
        }
        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
        fn channels(&self) -> usize {
            self.channels
        }
        fn shutdown(&self) {}
    }

    fn registry() -> McaRegistry {
        McaRegistry::new().with_device("effcalc_mca", Arc::new(StubMca::new(1024)))
    }

    async fn roundtrip(line: &str) -> Value {
        let response = dispatch(&registry(), line).await;
        serde_json::from_str(response.encode_line().trim()).expect("valid response JSON")
    }

    #[tokio::test]
    async fn test_common_params_literal_case() {
        let got =
            roundtrip(r#"{"command":"getmcacommonparams","arguments":{"McaId":"effcalc_mca"}}"#)
                .await;
        let want: Value = serde_json::json!({
            "command": "getmcacommonparams",
            "result": true,
            "data": { "Manufacturer": "Lsrm", "Channels": 1024, "Lld": 0, "Uld": 1023 },
        });
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn test_unknown_device_literal_case() {
        let response = dispatch(
            &registry(),
            r#"{"command":"getmcastatus","arguments":{"McaId":"missing"}}"#,
        )
        .await;
        assert_eq!(
            response.encode_line(),
            "{\"command\":\"getmcastatus\",\"result\":false}\r\n"
        );
    }

    #[tokio::test]
    async fn test_device_listing_literal_case() {
        let got = roundtrip(r#"{"command":"getmcalist"}"#).await;
        let want: Value = serde_json::json!({
            "command": "getmcalist",
            "result": true,
            "data": { "McaList": ["effcalc_mca"] },
        });
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn test_unknown_command_is_error() {
        let got = roundtrip(r#"{"command":"selfdestruct","arguments":{}}"#).await;
        assert_eq!(got["command"], "selfdestruct");
        assert_eq!(got["result"], false);
        assert!(got.get("data").is_none());
    }

    #[tokio::test]
    async fn test_missing_mca_id_is_error() {
        let got = roundtrip(r#"{"command":"getmcastatus","arguments":{}}"#).await;
        assert_eq!(got["command"], "getmcastatus");
        assert_eq!(got["result"], false);
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_response() {
        let got = roundtrip("{{{ not json").await;
        assert_eq!(got["command"], "");
        assert_eq!(got["result"], false);
    }

    #[tokio::test]
    async fn test_start_status_stop_cycle() {
        let registry = registry();

        let got = dispatch(
            &registry,
            r#"{"command":"setmcastart","arguments":{"McaId":"effcalc_mca"}}"#,
        )
        .await;
        assert!(got.result);

        let status = dispatch(
            &registry,
            r#"{"command":"getmcastatus","arguments":{"McaId":"effcalc_mca"}}"#,
        )
        .await;
        assert_eq!(status.data, Some(serde_json::json!({ "InRun": true })));

        dispatch(
            &registry,
            r#"{"command":"setmcastop","arguments":{"McaId":"effcalc_mca"}}"#,
        )
        .await;
        let status = dispatch(
            &registry,
            r#"{"command":"getmcastatus","arguments":{"McaId":"effcalc_mca"}}"#,
        )
        .await;
        assert_eq!(status.data, Some(serde_json::json!({ "InRun": false })));
    }

    #[tokio::test]
    async fn test_spectrum_schema() {
        let got =
            roundtrip(r#"{"command":"getmcaspectrum","arguments":{"McaId":"effcalc_mca"}}"#).await;
        assert_eq!(got["result"], true);
        assert_eq!(got["data"]["DataSize"], 1024);
        assert_eq!(got["data"]["LiveTime"], 1.5);
        assert_eq!(got["data"]["RealTime"], 2.0);
        assert_eq!(got["data"]["Data"].as_array().map(Vec::len), Some(1024));
    }
}
