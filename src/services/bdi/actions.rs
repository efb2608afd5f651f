//! Built-in BDI action handlers.
//!
//! Handlers are async closures keyed by action name. File and process
//! actions are sandboxed to the executor's workspace; every handler returns
//! `(ok, data | failure)` as a `Result`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::models::Action;
use crate::domain::ports::{GenerationOptions, TextGenerator};
use crate::services::BeliefSystem;
use crate::domain::models::BeliefSource;

/// Failure payload carried back into beliefs and replanning decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    pub kind: String,
    pub message: String,
}

impl ActionFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Result of one action execution.
pub type ActionResult = Result<Value, ActionFailure>;

/// An async handler resolved by action name.
pub type ActionHandler = Arc<dyn Fn(Action) -> BoxFuture<'static, ActionResult> + Send + Sync>;

fn param_str(action: &Action, key: &str) -> Result<String, ActionFailure> {
    action
        .params
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| {
            ActionFailure::new("INVALID_PARAMS", format!("missing string param '{key}'"))
        })
}

/// Resolve `relative` inside `workspace`, rejecting absolute paths and
/// parent-directory escapes.
pub fn sandboxed_path(workspace: &Path, relative: &str) -> Result<PathBuf, ActionFailure> {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return Err(ActionFailure::new(
            "SANDBOX_VIOLATION",
            format!("absolute path not allowed: {relative}"),
        ));
    }
    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ActionFailure::new(
            "SANDBOX_VIOLATION",
            format!("path escapes workspace: {relative}"),
        ));
    }
    Ok(workspace.join(candidate))
}

/// `READ_FILE {path}` -> `{content}`
pub fn read_file_handler(workspace: PathBuf) -> ActionHandler {
    Arc::new(move |action: Action| {
        let workspace = workspace.clone();
        Box::pin(async move {
            let rel = param_str(&action, "path")?;
            let path = sandboxed_path(&workspace, &rel)?;
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ActionFailure::new("IO_ERROR", format!("read {rel}: {e}")))?;
            Ok(json!({"path": rel, "content": content}))
        })
    })
}

/// `WRITE_FILE {path, content}` -> `{bytes_written}`
pub fn write_file_handler(workspace: PathBuf) -> ActionHandler {
    Arc::new(move |action: Action| {
        let workspace = workspace.clone();
        Box::pin(async move {
            let rel = param_str(&action, "path")?;
            let content = param_str(&action, "content")?;
            let path = sandboxed_path(&workspace, &rel)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ActionFailure::new("IO_ERROR", format!("mkdir: {e}")))?;
            }
            tokio::fs::write(&path, content.as_bytes())
                .await
                .map_err(|e| ActionFailure::new("IO_ERROR", format!("write {rel}: {e}")))?;
            Ok(json!({"path": rel, "bytes_written": content.len()}))
        })
    })
}

/// `EXECUTE_COMMAND {command, args?}` -> `{exit_code, stdout, stderr}`
///
/// Runs with the workspace as working directory; a non-zero exit is a
/// failure.
pub fn execute_command_handler(workspace: PathBuf) -> ActionHandler {
    Arc::new(move |action: Action| {
        let workspace = workspace.clone();
        Box::pin(async move {
            let command = param_str(&action, "command")?;
            let args: Vec<String> = action
                .params
                .get("args")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            let output = tokio::process::Command::new(&command)
                .args(&args)
                .current_dir(&workspace)
                .output()
                .await
                .map_err(|e| {
                    ActionFailure::new("SUBPROCESS_FAILED", format!("spawn {command}: {e}"))
                })?;

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let exit_code = output.status.code().unwrap_or(-1);
            if output.status.success() {
                Ok(json!({"exit_code": exit_code, "stdout": stdout, "stderr": stderr}))
            } else {
                Err(ActionFailure::new(
                    "SUBPROCESS_FAILED",
                    format!("{command} exited {exit_code}: {stderr}"),
                ))
            }
        })
    })
}

/// `GENERATE_TEXT {prompt}` -> `{text}`
pub fn generate_text_handler(generator: Option<Arc<dyn TextGenerator>>) -> ActionHandler {
    Arc::new(move |action: Action| {
        let generator = generator.clone();
        Box::pin(async move {
            let prompt = param_str(&action, "prompt")?;
            let generator = generator
                .ok_or_else(|| ActionFailure::new("TOOL_NOT_FOUND", "text generator not configured"))?;
            let text = generator
                .generate(&prompt, GenerationOptions::default())
                .await
                .map_err(|e| ActionFailure::new("GENERATION_FAILED", e.to_string()))?;
            Ok(json!({"text": text}))
        })
    })
}

/// `GENERATE_CODE {specification, language?}` -> `{code}`
pub fn generate_code_handler(generator: Option<Arc<dyn TextGenerator>>) -> ActionHandler {
    Arc::new(move |action: Action| {
        let generator = generator.clone();
        Box::pin(async move {
            let specification = param_str(&action, "specification")?;
            let language = action
                .params
                .get("language")
                .and_then(Value::as_str)
                .unwrap_or("rust")
                .to_string();
            let generator = generator
                .ok_or_else(|| ActionFailure::new("TOOL_NOT_FOUND", "text generator not configured"))?;
            let prompt = format!(
                "Write {language} code implementing the following specification. \
                 Respond with code only.\n{specification}"
            );
            let code = generator
                .generate(&prompt, GenerationOptions::default())
                .await
                .map_err(|e| ActionFailure::new("GENERATION_FAILED", e.to_string()))?;
            Ok(json!({"language": language, "code": code}))
        })
    })
}

/// `UPDATE_BELIEF {key, value, confidence?}` -> `{key}`
///
/// Keys are namespaced under the executor's belief domain.
pub fn update_belief_handler(beliefs: Arc<BeliefSystem>, domain: String) -> ActionHandler {
    Arc::new(move |action: Action| {
        let beliefs = beliefs.clone();
        let domain = domain.clone();
        Box::pin(async move {
            let key = param_str(&action, "key")?;
            let value = action.params.get("value").cloned().unwrap_or(Value::Null);
            let confidence = action
                .params
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(1.0);
            let namespaced = format!("{domain}.{key}");
            beliefs
                .add_belief(&namespaced, value, confidence, BeliefSource::Inference)
                .await;
            Ok(json!({"key": namespaced}))
        })
    })
}

/// `QUERY_BELIEF {key}` -> `{key, value, confidence} | {key, value: null}`
pub fn query_belief_handler(beliefs: Arc<BeliefSystem>, domain: String) -> ActionHandler {
    Arc::new(move |action: Action| {
        let beliefs = beliefs.clone();
        let domain = domain.clone();
        Box::pin(async move {
            let key = param_str(&action, "key")?;
            let namespaced = format!("{domain}.{key}");
            match beliefs.get_belief(&namespaced).await {
                Some(belief) => Ok(json!({
                    "key": namespaced,
                    "value": belief.value,
                    "confidence": belief.confidence,
                })),
                None => Ok(json!({"key": namespaced, "value": null})),
            }
        })
    })
}

/// `INVOKE_AUDIT {scope, components?}` -> `{requested}`
///
/// Records the audit request as a belief for the audit coordinator to pick
/// up on its next tick.
pub fn invoke_audit_handler(beliefs: Arc<BeliefSystem>, domain: String) -> ActionHandler {
    Arc::new(move |action: Action| {
        let beliefs = beliefs.clone();
        let domain = domain.clone();
        Box::pin(async move {
            let scope = param_str(&action, "scope")?;
            let components = action
                .params
                .get("components")
                .cloned()
                .unwrap_or_else(|| json!([]));
            let request = json!({"scope": scope, "components": components});
            beliefs
                .add_belief(
                    &format!("{domain}.audit.requested.{scope}"),
                    request.clone(),
                    1.0,
                    BeliefSource::SelfAnalysis,
                )
                .await;
            Ok(json!({"requested": request}))
        })
    })
}

/// `PLAN_ROLLBACK {reason?}` -> `{rollback_point}`
///
/// Marks a rollback point; its presence ahead of a critical action is what
/// plan validation checks for.
pub fn plan_rollback_handler(beliefs: Arc<BeliefSystem>, domain: String) -> ActionHandler {
    Arc::new(move |action: Action| {
        let beliefs = beliefs.clone();
        let domain = domain.clone();
        Box::pin(async move {
            let reason = action
                .params
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("pre-critical checkpoint")
                .to_string();
            let point = json!({"reason": reason, "action_id": action.meta.id});
            beliefs
                .add_belief(
                    &format!("{domain}.rollback_point"),
                    point.clone(),
                    1.0,
                    BeliefSource::SelfAnalysis,
                )
                .await;
            Ok(json!({"rollback_point": point}))
        })
    })
}

/// `NO_OP` -> `{}`
pub fn no_op_handler() -> ActionHandler {
    Arc::new(move |_action: Action| Box::pin(async move { Ok(json!({})) }))
}
