//! Tool Sandbox: the Actor's only way to touch the outside world, exposing
//! a fixed, allow-listed tool set (spec §4.6).

pub mod compiler;
mod error;
mod paths;
mod tools;

pub use error::SandboxError;

use serde_json::{json, Value};
use shared_types::{Step, ToolName};
use std::path::PathBuf;

pub struct Sandbox {
    root: PathBuf,
    allowed_commands: Vec<String>,
    http_client: reqwest::Client,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>, allowed_commands: Vec<String>) -> Self {
        Self {
            root: root.into(),
            allowed_commands,
            http_client: reqwest::Client::new(),
        }
    }

    /// Dispatch one step to its matching tool. Always returns a JSON value
    /// carrying `ok`; an unrecognized tool name never reaches a tool
    /// implementation (spec §4.6: "Any other `tool` value returns
    /// `{ok:false, error:\"Unknown tool\"}` synchronously").
    pub async fn execute(&self, step: &Step) -> Value {
        let Some(tool) = ToolName::from_wire_name(&step.tool) else {
            return json!({ "ok": false, "error": "Unknown tool" });
        };

        let args = if tool.rejects_cwd() {
            strip_cwd(&step.args)
        } else {
            step.args.clone()
        };

        match tool {
            ToolName::ShellRun => tools::shell_run(&self.root, &self.allowed_commands, &args).await,
            ToolName::HttpRequest => tools::http_request(&self.http_client, &args).await,
            ToolName::FsWrite => tools::fs_write(&self.root, &args).await,
            ToolName::ComposeRun => tools::compose_run(&self.root, &args).await,
            ToolName::KubectlRun => tools::kubectl_run(&args).await,
        }
    }
}

fn strip_cwd(args: &Value) -> Value {
    let mut args = args.clone();
    if let Some(obj) = args.as_object_mut() {
        obj.remove("cwd");
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_tool_fails_without_dispatch() {
        let sandbox = Sandbox::new("/tmp", vec!["sh".to_string()]);
        let step = Step { tool: "rm.rf".to_string(), args: json!({}) };
        let result = sandbox.execute(&step).await;
        assert_eq!(result["ok"], false);
        assert_eq!(result["error"], "Unknown tool");
    }

    #[tokio::test]
    async fn fs_write_rejects_traversal_outside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(tmp.path(), vec!["sh".to_string()]);
        let step = Step {
            tool: "fs.write".to_string(),
            args: json!({ "path": "../../../../etc/passwd", "content": "x" }),
        };
        let result = sandbox.execute(&step).await;
        assert_eq!(result["ok"], false);
        assert!(result["error"].as_str().unwrap().contains("escapes sandbox"));
    }

    #[tokio::test]
    async fn fs_write_succeeds_inside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(tmp.path(), vec!["sh".to_string()]);
        let step = Step {
            tool: "fs.write".to_string(),
            args: json!({ "path": "notes/report.txt", "content": "done" }),
        };
        let result = sandbox.execute(&step).await;
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn shell_run_rejects_disallowed_command() {
        let sandbox = Sandbox::new("/tmp", vec!["sh".to_string()]);
        let step = Step {
            tool: "shell.run".to_string(),
            args: json!({ "cmd": "curl", "args": ["http://example.com"] }),
        };
        let result = sandbox.execute(&step).await;
        assert_eq!(result["ok"], false);
    }

    #[tokio::test]
    async fn shell_run_reports_nonzero_exit_code_as_not_ok() {
        let sandbox = Sandbox::new("/tmp", vec!["sh".to_string()]);
        let step = Step {
            tool: "shell.run".to_string(),
            args: json!({ "cmd": "sh", "args": ["-c", "exit 7"] }),
        };
        let result = sandbox.execute(&step).await;
        assert_eq!(result["ok"], false);
        assert_eq!(result["code"], 7);
    }

    #[tokio::test]
    async fn kubectl_run_reports_nonzero_exit_code_as_not_ok() {
        let sandbox = Sandbox::new("/tmp", vec!["kubectl".to_string()]);
        let step = Step {
            tool: "kubectl.run".to_string(),
            args: json!({ "args": ["get", "pods", "--this-flag-does-not-exist"] }),
        };
        let result = sandbox.execute(&step).await;
        assert_eq!(result["ok"], false);
    }

    #[tokio::test]
    async fn http_request_reports_non_2xx_status_as_not_ok() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        });

        let sandbox = Sandbox::new("/tmp", vec!["sh".to_string()]);
        let step = Step {
            tool: "http.request".to_string(),
            args: json!({ "method": "GET", "url": format!("http://{addr}/missing") }),
        };
        let result = sandbox.execute(&step).await;
        assert_eq!(result["ok"], false);
        assert_eq!(result["status"], 404);
    }
}
