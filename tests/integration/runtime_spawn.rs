use std::time::Duration;

use anyhow::Result;
use rmcp::{model::ClientInfo, serve_client};
use tempfile::tempdir;
use tokio::time::timeout;

use crate::common::{spawn_server_process, write_config};

#[tokio::test]
async fn stdio_child_lists_every_capability() -> Result<()> {
    let temp = tempdir()?;
    let config_path = write_config(temp.path())?;
    let (mut child, transport, stderr_task) = spawn_server_process(&config_path).await?;

    let client = serve_client(ClientInfo::default(), transport).await?;

    let tools = client.list_tools(None).await?;
    let names: Vec<_> = tools.tools.iter().map(|tool| tool.name.as_ref()).collect();
    assert_eq!(names.len(), 17, "tools: {names:?}");
    for expected in ["blur", "crop", "detect", "fill", "find", "get_metainfo", "ocr"] {
        assert!(names.contains(&expected), "missing {expected}: {names:?}");
    }

    let resources = client.list_resources(None).await?;
    assert!(resources
        .resources
        .iter()
        .any(|resource| resource.uri == "models://list"));

    let prompts = client.list_prompts(None).await?;
    assert!(prompts
        .prompts
        .iter()
        .any(|prompt| prompt.name == "remove-background"));

    client.cancel().await?;
    let status = timeout(Duration::from_secs(5), child.wait()).await??;
    assert!(
        status.success(),
        "server should exit cleanly but exit status was {status:?}"
    );
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(())
}
