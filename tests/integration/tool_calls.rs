use std::{fs, sync::Arc, time::Duration};

use anyhow::Result;
use imagesorcery_mcp::{
    lib::backend::CommandBackend,
    server::{
        config::ServerConfig,
        runtime::{compose_server_with_backend, ImageSorceryServer},
    },
};
use rmcp::{
    model::{
        CallToolRequestParam, ClientInfo, ErrorCode, GetPromptRequestParam, JsonObject,
        PromptMessageContent, ReadResourceRequestParam, ResourceContents,
    },
    serve_client,
    service::{RunningService, ServiceError},
    RoleClient, ServiceExt,
};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

use crate::common::fixture;

fn mock_server(temp: &TempDir) -> ImageSorceryServer {
    let config = ServerConfig::defaults_at(temp.path().join("config.toml"));
    let backend = CommandBackend::new(
        Some("/bin/sh".into()),
        vec![fixture("tests/fixtures/mock-backend.sh")
            .to_string_lossy()
            .into_owned()],
        Duration::from_secs(30),
    );
    compose_server_with_backend(&config, Arc::new(backend)).expect("server composes")
}

async fn connect(
    server: ImageSorceryServer,
) -> Result<RunningService<RoleClient, ClientInfo>> {
    let (server_transport, client_transport) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        server.serve(server_transport).await?.waiting().await?;
        Result::<_, anyhow::Error>::Ok(())
    });
    Ok(serve_client(ClientInfo::default(), client_transport).await?)
}

fn arguments(value: Value) -> Option<JsonObject> {
    value.as_object().cloned()
}

#[tokio::test]
async fn crop_reaches_the_backend_with_normalised_request() -> Result<()> {
    let temp = tempdir()?;
    let input = temp.path().join("photo.jpg");
    fs::write(&input, b"jpeg")?;
    let client = connect(mock_server(&temp)).await?;

    let response = client
        .call_tool(CallToolRequestParam {
            name: "crop".into(),
            arguments: arguments(json!({
                "input_path": input,
                "x1": 10, "y1": 10, "x2": 110, "y2": 60
            })),
        })
        .await?;
    let _ = client.cancel().await;

    let payload = response.structured_content.expect("structured_content");
    assert_eq!(payload["tool"], "crop");
    assert_eq!(payload["request"]["x2"], 110);
    assert_eq!(
        payload["output_path"],
        json!(temp.path().join("photo_cropped.jpg"))
    );
    Ok(())
}

#[tokio::test]
async fn schema_violation_never_reaches_the_tool() -> Result<()> {
    let temp = tempdir()?;
    let client = connect(mock_server(&temp)).await?;

    let result = client
        .call_tool(CallToolRequestParam {
            name: "crop".into(),
            arguments: arguments(json!({ "x1": "left" })),
        })
        .await;
    let _ = client.cancel().await;

    match result {
        Err(ServiceError::McpError(error)) => {
            assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
            let data = error.data.expect("structured error data");
            assert_eq!(data["code"], "invalid_arguments");
        }
        other => panic!("expected invalid params, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn backend_failure_is_reported_with_remediation() -> Result<()> {
    let temp = tempdir()?;
    let input = temp.path().join("photo.png");
    fs::write(&input, b"png")?;
    let client = connect(mock_server(&temp)).await?;

    let result = client
        .call_tool(CallToolRequestParam {
            name: "rotate".into(),
            arguments: arguments(json!({ "input_path": input, "angle": 90 })),
        })
        .await;
    let _ = client.cancel().await;

    match result {
        Err(ServiceError::McpError(error)) => {
            assert_eq!(error.code, ErrorCode::INTERNAL_ERROR);
            let data = error.data.expect("structured error data");
            assert_eq!(data["code"], "backend_failed");
            assert!(data["remediation"].is_string());
        }
        other => panic!("expected backend failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn config_tool_changes_defaults_for_later_calls() -> Result<()> {
    let temp = tempdir()?;
    let input = temp.path().join("photo.png");
    fs::write(&input, b"png")?;
    let client = connect(mock_server(&temp)).await?;

    client
        .call_tool(CallToolRequestParam {
            name: "config".into(),
            arguments: arguments(json!({
                "action": "set", "key": "ocr.language", "value": "de"
            })),
        })
        .await?;
    let response = client
        .call_tool(CallToolRequestParam {
            name: "ocr".into(),
            arguments: arguments(json!({ "input_path": input })),
        })
        .await?;
    let _ = client.cancel().await;

    let payload = response.structured_content.expect("structured_content");
    assert_eq!(payload["request"]["language"], "de");
    Ok(())
}

#[tokio::test]
async fn models_resource_and_prompt_are_served() -> Result<()> {
    let temp = tempdir()?;
    fs::create_dir_all(temp.path().join("models"))?;
    fs::write(temp.path().join("models/yoloe-11l-seg.pt"), b"weights")?;
    let client = connect(mock_server(&temp)).await?;

    let resource = client
        .read_resource(ReadResourceRequestParam {
            uri: "models://list".into(),
        })
        .await?;
    let ResourceContents::TextResourceContents { text, .. } = &resource.contents[0] else {
        panic!("expected text contents");
    };
    let listing: Value = serde_json::from_str(text)?;
    assert_eq!(listing["models"][0]["name"], "yoloe-11l-seg.pt");

    let prompt = client
        .get_prompt(GetPromptRequestParam {
            name: "remove-background".into(),
            arguments: arguments(json!({ "image_path": "/photos/cat.png" })),
        })
        .await?;
    let _ = client.cancel().await;

    assert_eq!(prompt.messages.len(), 1);
    let PromptMessageContent::Text { text } = &prompt.messages[0].content else {
        panic!("expected text prompt");
    };
    assert!(text.contains("/photos/cat.png"));
    Ok(())
}
