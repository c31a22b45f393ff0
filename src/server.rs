//! # Tool Adapter
//!
//! The MCP-facing boundary. `applescript_execute` is the primary tool; the
//! rest are canned-script conveniences routed through the same dispatcher.
//! Every domain failure comes back as a well-formed text response, never as
//! a protocol-level error.

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars::JsonSchema;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::exec::{self, DEFAULT_TIMEOUT_SECS, Outcome};
use crate::scripts;

/// Reserved placeholder tokens, replaced verbatim in script text before
/// dispatch. Plain find/replace; callers own any quoting around them.
pub const HOST_TOKEN: &str = "{{REMOTE_HOST}}";
pub const USER_TOKEN: &str = "{{REMOTE_USER}}";
pub const PASSWORD_TOKEN: &str = "{{REMOTE_PASSWORD}}";

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct ApplescriptExecuteArgs {
    /// Multi-line AppleScript code to execute
    // Optional in the schema on purpose: a request without a script must get
    // a text result back, not a parameter-extraction fault from the SDK.
    pub script: Option<String>,
    /// Command execution timeout in seconds (default: 60)
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct ForegroundWindowArgs {
    /// Name of the application to bring to the foreground
    pub app_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct DockWindowArgs {
    /// Application name to dock
    pub app_name: String,
    /// Left edge as percentage of screen width (0-100)
    pub left_percent: f64,
    /// Right edge as percentage of screen width (0-100)
    pub right_percent: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct WindowInfoArgs {
    /// Optional: specific application name to get info for
    pub app_name: Option<String>,
}

#[derive(Clone)]
pub struct AppleScriptServer {
    config: RemoteConfig,
    tool_router: ToolRouter<Self>,
}

impl AppleScriptServer {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }

    fn substitute(&self, script: &str) -> String {
        script
            .replace(HOST_TOKEN, &self.config.host)
            .replace(USER_TOKEN, &self.config.user)
            .replace(PASSWORD_TOKEN, &self.config.password)
    }

    async fn execute(&self, script: &str, timeout: Option<u64>) -> Outcome {
        exec::run_script(script, effective_timeout(timeout), &self.config).await
    }

    /// The `applescript_execute` path: reject blank scripts, substitute the
    /// placeholder tokens, dispatch, flatten.
    async fn run_snippet(&self, script: &str, timeout: Option<u64>) -> String {
        if script.trim().is_empty() {
            return "Error: missing script text".to_string();
        }
        let script = self.substitute(script);
        self.execute(&script, timeout).await.into_text()
    }

    async fn foreground_window_text(&self, app_name: &str) -> String {
        if app_name.trim().is_empty() {
            return "Error: app_name is required".to_string();
        }
        match self.execute(&scripts::activate_app(app_name), None).await {
            Outcome::Success(_) => foreground_success(app_name),
            other => other.into_text(),
        }
    }

    async fn dock_window_text(&self, args: &DockWindowArgs) -> String {
        if let Some(error) = percent_bounds_error(args.left_percent, args.right_percent) {
            return error;
        }

        let resolution = match self.execute(scripts::SCREEN_RESOLUTION, None).await {
            Outcome::Success(text) => text,
            other => return other.into_text(),
        };
        let Some((screen_width, screen_height)) = scripts::parse_resolution(&resolution) else {
            return format!("Error: could not determine screen dimensions from {resolution:?}");
        };

        let x_pos = (screen_width as f64 * args.left_percent / 100.0) as i64;
        let window_width =
            (screen_width as f64 * (args.right_percent - args.left_percent) / 100.0) as i64;

        // System Events wants the process name, which can differ from the
        // application name; fall back to the supplied name if the lookup fails.
        let process_name = match self
            .execute(&scripts::frontmost_process(&args.app_name), None)
            .await
        {
            Outcome::Success(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => args.app_name.clone(),
        };

        let script = scripts::dock_front_window(&process_name, x_pos, window_width, screen_height);
        match self.execute(&script, None).await {
            Outcome::Success(_) => format!(
                "Window docked horizontally: {}%-{}% ({x_pos},{window_width}x{screen_height}) Process: {process_name}",
                args.left_percent, args.right_percent
            ),
            other => other.into_text(),
        }
    }
}

#[tool_router]
impl AppleScriptServer {
    #[tool(
        description = "Run AppleScript code to interact with Mac applications and system features. \
        This tool can access and manipulate data in Notes, Calendar, Contacts, Messages, Mail, \
        Finder, Safari, and other Apple applications. Common use cases include retrieving or \
        creating notes, accessing calendar events, listing contacts, searching files with \
        Spotlight or Finder, reading system information, and executing shell commands. When \
        remote execution is configured, the placeholder tokens {{REMOTE_HOST}}, {{REMOTE_USER}} \
        and {{REMOTE_PASSWORD}} inside the script are replaced with the configured values."
    )]
    async fn applescript_execute(
        &self,
        Parameters(args): Parameters<ApplescriptExecuteArgs>,
    ) -> Result<CallToolResult, McpError> {
        let script = args.script.as_deref().unwrap_or_default();
        Ok(text_result(self.run_snippet(script, args.timeout).await))
    }

    #[tool(description = "Get the current screen resolution and display information")]
    async fn get_screen_resolution(&self) -> Result<CallToolResult, McpError> {
        let text = self.execute(scripts::SCREEN_RESOLUTION, None).await.into_text();
        Ok(text_result(text))
    }

    #[tool(description = "Bring a window of the specified application to the foreground")]
    async fn foreground_window(
        &self,
        Parameters(args): Parameters<ForegroundWindowArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(text_result(self.foreground_window_text(&args.app_name).await))
    }

    #[tool(
        description = "Dock a window horizontally using percentage bounds \
        (e.g. 0,50 for the left half, 50,100 for the right half)"
    )]
    async fn dock_window_horizontal(
        &self,
        Parameters(args): Parameters<DockWindowArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(text_result(self.dock_window_text(&args).await))
    }

    #[tool(
        description = "Get information about the frontmost window, or a named application's \
        window, including position and size"
    )]
    async fn get_window_info(
        &self,
        Parameters(args): Parameters<WindowInfoArgs>,
    ) -> Result<CallToolResult, McpError> {
        let script = scripts::window_info(args.app_name.as_deref());
        let text = self.execute(&script, None).await.into_text();
        Ok(text_result(text))
    }

    #[tool(
        description = "Get basic system information including macOS version, computer name, \
        and memory"
    )]
    async fn get_system_info(&self) -> Result<CallToolResult, McpError> {
        let text = self.execute(scripts::SYSTEM_INFO, None).await.into_text();
        Ok(text_result(text))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for AppleScriptServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Run AppleScript on this Mac, or on a remote Mac over SSH when remote \
                connection flags are configured. Scripts may use the placeholder tokens \
                {{REMOTE_HOST}}, {{REMOTE_USER}} and {{REMOTE_PASSWORD}}."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

/// Wording matches the original server; callers match on it.
fn foreground_success(app_name: &str) -> String {
    format!("Successfully brought {app_name} to foreground")
}

/// Zero is not a usable timeout; treat it like an absent value.
fn effective_timeout(timeout: Option<u64>) -> u64 {
    timeout.filter(|t| *t > 0).unwrap_or(DEFAULT_TIMEOUT_SECS)
}

fn percent_bounds_error(left: f64, right: f64) -> Option<String> {
    if !(0.0..=100.0).contains(&left) || !(0.0..=100.0).contains(&right) {
        return Some("Error: percentages must be between 0 and 100".to_string());
    }
    if left >= right {
        return Some("Error: left_percent must be less than right_percent".to_string());
    }
    None
}
