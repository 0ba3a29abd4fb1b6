use crate::error::SandboxError;
use crate::paths::resolve_under_root;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn ok(success: bool, value: Value) -> Value {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            let mut m = serde_json::Map::new();
            m.insert("value".to_string(), other);
            m
        }
    };
    map.insert("ok".to_string(), Value::Bool(success));
    Value::Object(map)
}

fn fail(error: impl std::fmt::Display) -> Value {
    json!({ "ok": false, "error": error.to_string() })
}

/// `shell.run{cmd, args[], cwd?, env?}`. `cmd` must be in the configured
/// allow-list; `cwd` resolves under the sandbox root with a path-traversal
/// guard (spec §4.6).
pub async fn shell_run(root: &Path, allowed_commands: &[String], args: &Value) -> Value {
    let cmd = match args.get("cmd").and_then(Value::as_str) {
        Some(cmd) => cmd,
        None => return fail("shell.run requires a \"cmd\" argument"),
    };
    if !allowed_commands.iter().any(|allowed| allowed == cmd) {
        return fail(SandboxError::CommandNotAllowed(cmd.to_string()));
    }

    let cmd_args: Vec<String> = args
        .get("args")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let cwd_arg = args.get("cwd").and_then(Value::as_str);

    let resolved_cwd = match resolve_under_root(root, cwd_arg) {
        Ok(path) => path,
        Err(err) => return fail(err),
    };

    let mut command = Command::new(cmd);
    command.args(&cmd_args).current_dir(&resolved_cwd).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(env) = args.get("env").and_then(Value::as_object) {
        for (key, value) in env {
            if let Some(value) = value.as_str() {
                command.env(key, value);
            }
        }
    }

    match command.output().await {
        Ok(output) => ok(
            output.status.success(),
            json!({
                "stdout": String::from_utf8_lossy(&output.stdout),
                "stderr": String::from_utf8_lossy(&output.stderr),
                "code": output.status.code().unwrap_or(-1),
                "cwd": resolved_cwd.display().to_string(),
            }),
        ),
        Err(err) => fail(SandboxError::Io(err)),
    }
}

/// `http.request{method, url, json?, headers?}`, 10 s timeout. Never
/// inherits `cwd` (spec §4.6).
pub async fn http_request(client: &reqwest::Client, args: &Value) -> Value {
    let method = args.get("method").and_then(Value::as_str).unwrap_or("GET");
    let url = match args.get("url").and_then(Value::as_str) {
        Some(url) => url,
        None => return fail("http.request requires a \"url\" argument"),
    };

    let method = match reqwest::Method::from_bytes(method.as_bytes()) {
        Ok(method) => method,
        Err(_) => return fail(format!("invalid HTTP method: {method}")),
    };

    let mut request = client.request(method, url);
    if let Some(headers) = args.get("headers").and_then(Value::as_object) {
        for (key, value) in headers {
            if let Some(value) = value.as_str() {
                request = request.header(key, value);
            }
        }
    }
    if let Some(body) = args.get("json") {
        request = request.json(body);
    }

    match timeout(HTTP_TIMEOUT, request.send()).await {
        Ok(Ok(response)) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            ok(
                status.is_success(),
                json!({
                    "status": status.as_u16(),
                    "body": body,
                }),
            )
        }
        Ok(Err(err)) => fail(SandboxError::Request(err)),
        Err(_) => fail("http.request timed out after 10s"),
    }
}

/// `fs.write{path, content, cwd?}`. Relative to the resolved sandbox root;
/// creates parent directories.
pub async fn fs_write(root: &Path, args: &Value) -> Value {
    let path = match args.get("path").and_then(Value::as_str) {
        Some(path) => path,
        None => return fail("fs.write requires a \"path\" argument"),
    };
    let content = args.get("content").and_then(Value::as_str).unwrap_or("");
    let cwd_arg = args.get("cwd").and_then(Value::as_str);

    let base = match resolve_under_root(root, cwd_arg) {
        Ok(base) => base,
        Err(err) => return fail(err),
    };

    let resolved = base.join(path);
    let canonical_base = match base.canonicalize() {
        Ok(base) => base,
        Err(err) => return fail(SandboxError::Io(err)),
    };
    if let Some(parent) = resolved.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            return fail(SandboxError::Io(err));
        }
    }
    let canonical_parent = match resolved.parent().unwrap_or(&canonical_base).canonicalize() {
        Ok(parent) => parent,
        Err(err) => return fail(SandboxError::Io(err)),
    };
    if !canonical_parent.starts_with(&canonical_base) {
        return fail(SandboxError::PathEscape(format!(
            "{} escapes sandbox root {}",
            resolved.display(),
            canonical_base.display()
        )));
    }

    match tokio::fs::write(&resolved, content).await {
        Ok(()) => ok(true, json!({ "path": resolved.display().to_string(), "bytes_written": content.len() })),
        Err(err) => fail(SandboxError::Io(err)),
    }
}

/// `compose.run{args[], cwd?, env?}`. Tries modern `docker compose` first,
/// then falls back to legacy `docker-compose`.
pub async fn compose_run(root: &Path, args: &Value) -> Value {
    let compose_args: Vec<String> = args
        .get("args")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let cwd_arg = args.get("cwd").and_then(Value::as_str);

    let resolved_cwd = match resolve_under_root(root, cwd_arg) {
        Ok(path) => path,
        Err(err) => return fail(err),
    };

    let modern = Command::new("docker")
        .arg("compose")
        .args(&compose_args)
        .current_dir(&resolved_cwd)
        .output()
        .await;

    let output = match modern {
        Ok(output) if output.status.success() || !compose_args.is_empty() => output,
        _ => match Command::new("docker-compose").args(&compose_args).current_dir(&resolved_cwd).output().await {
            Ok(output) => output,
            Err(err) => return fail(SandboxError::Io(err)),
        },
    };

    ok(
        output.status.success(),
        json!({
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
            "code": output.status.code().unwrap_or(-1),
        }),
    )
}

/// `kubectl.run{args[], cwd?, env?}`. Forbids `cwd` outright — it operates
/// on the cluster, not the local filesystem.
pub async fn kubectl_run(args: &Value) -> Value {
    let kubectl_args: Vec<String> = args
        .get("args")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    match Command::new("kubectl").args(&kubectl_args).output().await {
        Ok(output) => ok(
            output.status.success(),
            json!({
                "stdout": String::from_utf8_lossy(&output.stdout),
                "stderr": String::from_utf8_lossy(&output.stderr),
                "code": output.status.code().unwrap_or(-1),
            }),
        ),
        Err(err) => fail(SandboxError::Io(err)),
    }
}
