use std::time::Duration;

use anyhow::{bail, Result};
use rmcp::{
    model::{ClientInfo, ReadResourceRequestParam},
    serve_client,
    transport::StreamableHttpClientTransport,
};
use tempfile::tempdir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{sleep, timeout},
};

use crate::common::{free_port, spawn_http_server, write_config};

const STARTUP_ATTEMPTS: usize = 100;
const STARTUP_DELAY: Duration = Duration::from_millis(100);

#[tokio::test]
async fn streamable_http_child_serves_a_full_session() -> Result<()> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path())?;
    let port = free_port()?;
    let mut child = spawn_http_server(&config_path, "streamable-http", port)?;
    let uri = format!("http://127.0.0.1:{port}/mcp");

    let mut attempt = 0;
    let client = loop {
        attempt += 1;
        let transport = StreamableHttpClientTransport::from_uri(uri.clone());
        match serve_client(ClientInfo::default(), transport).await {
            Ok(client) => break client,
            Err(_) if attempt < STARTUP_ATTEMPTS => sleep(STARTUP_DELAY).await,
            Err(err) => bail!("server at {uri} never accepted a session: {err}"),
        }
    };

    let tools = client.list_tools(None).await?;
    assert_eq!(tools.tools.len(), 17);

    let listing = client
        .read_resource(ReadResourceRequestParam {
            uri: "models://list".into(),
        })
        .await?;
    assert_eq!(listing.contents.len(), 1);

    client.cancel().await?;
    child.kill().await?;
    Ok(())
}

#[tokio::test]
async fn sse_child_announces_the_message_endpoint() -> Result<()> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path())?;
    let port = free_port()?;
    let mut child = spawn_http_server(&config_path, "sse", port)?;

    let mut attempt = 0;
    let mut stream = loop {
        attempt += 1;
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => break stream,
            Err(_) if attempt < STARTUP_ATTEMPTS => sleep(STARTUP_DELAY).await,
            Err(err) => bail!("SSE server on port {port} never came up: {err}"),
        }
    };
    stream
        .write_all(
            b"GET /mcp HTTP/1.1\r\nHost: 127.0.0.1\r\nAccept: text/event-stream\r\n\r\n",
        )
        .await?;

    let mut received = String::new();
    let mut chunk = [0u8; 1024];
    timeout(Duration::from_secs(10), async {
        while !received.contains("sessionId=") {
            let read = stream.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            received.push_str(&String::from_utf8_lossy(&chunk[..read]));
        }
        anyhow::Ok(())
    })
    .await??;

    assert!(received.starts_with("HTTP/1.1 200"), "{received}");
    assert!(received.contains("text/event-stream"), "{received}");
    assert!(received.contains("event: endpoint"), "{received}");
    assert!(received.contains("/mcp/messages?sessionId="), "{received}");

    child.kill().await?;
    Ok(())
}
