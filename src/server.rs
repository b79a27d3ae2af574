use std::sync::Arc;

use chrono::NaiveDate;
use rmcp::{
    ErrorData, RoleServer, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::calendar::parse_date;
use crate::error::{ServiceError, ServiceResult};
use crate::sprint::SprintConfigUpdate;
use crate::store::SprintStore;
use crate::types::TaskStatus;
use crate::view::DayView;

const SNAPSHOT_URI: &str = "sprint://snapshot";

// Tool argument types. Dates are `YYYY-MM-DD` and default to today.

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct DashboardArgs {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct DayTextArgs {
    #[serde(default)]
    pub date: Option<String>,
    pub text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct TaskStatusArgs {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub status: TaskStatus,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct TaskRefArgs {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "taskId")]
    pub task_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SaveTimeArgs {
    #[serde(default)]
    pub date: Option<String>,
    pub hours: i64,
    pub minutes: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct NotesArgs {
    #[serde(default)]
    pub date: Option<String>,
    pub notes: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct TextArgs {
    pub text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct SprintConfigArgs {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ImportArgs {
    /// The JSON document produced by `export_snapshot`.
    pub snapshot: String,
}

fn date_arg(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, ErrorData> {
    match raw {
        None => Ok(today),
        Some(raw) => parse_date(raw).map_err(|e| {
            ErrorData::invalid_params(
                format!("Invalid date '{raw}': {e}"),
                Some(json!({ "expected": "YYYY-MM-DD" })),
            )
        }),
    }
}

fn day_result(store: &SprintStore, date: NaiveDate, changed: bool) -> CallToolResult {
    let day = DayView::build(store.data(), store.today(), date);
    CallToolResult::structured(json!({ "changed": changed, "day": day }))
}

/// MCP tool surface over one [`SprintStore`]. Calls are applied one at a
/// time under the store lock.
#[derive(Clone)]
pub struct SprintDashboardServer {
    store: Arc<Mutex<SprintStore>>,
    tool_router: ToolRouter<SprintDashboardServer>,
}

#[tool_router]
impl SprintDashboardServer {
    pub fn new(store: SprintStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Sprint progress, this week's time, milestones and the selected day (default today)")]
    async fn get_dashboard(
        &self,
        Parameters(args): Parameters<DashboardArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let store = self.store.lock().await;
        let date = date_arg(args.date.as_deref(), store.today())?;
        Ok(CallToolResult::structured(json!(store.dashboard(Some(date)))))
    }

    #[tool(description = "Add a task to today's list; other days are read-only")]
    async fn add_task(
        &self,
        Parameters(args): Parameters<DayTextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let date = date_arg(args.date.as_deref(), store.today())?;
        let changed = store
            .apply_async("add_task", |doc, today| doc.add_task(today, date, &args.text))
            .await?;
        Ok(day_result(&store, date, changed))
    }

    #[tool(description = "Set a task's status (not_started, in_progress, finished)")]
    async fn set_task_status(
        &self,
        Parameters(args): Parameters<TaskStatusArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let date = date_arg(args.date.as_deref(), store.today())?;
        let changed = store
            .apply_async("set_task_status", |doc, today| {
                doc.set_task_status(today, date, &args.task_id, args.status)
            })
            .await?;
        Ok(day_result(&store, date, changed))
    }

    #[tool(description = "Remove a task from today's list")]
    async fn remove_task(
        &self,
        Parameters(args): Parameters<TaskRefArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let date = date_arg(args.date.as_deref(), store.today())?;
        let changed = store
            .apply_async("remove_task", |doc, today| doc.remove_task(today, date, &args.task_id))
            .await?;
        Ok(day_result(&store, date, changed))
    }

    #[tool(description = "Record the hours and minutes worked today")]
    async fn save_time(
        &self,
        Parameters(args): Parameters<SaveTimeArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let date = date_arg(args.date.as_deref(), store.today())?;
        let changed = store
            .apply_async("save_time", |doc, today| {
                doc.save_time(today, date, args.hours, args.minutes)
            })
            .await?;
        Ok(day_result(&store, date, changed))
    }

    #[tool(description = "Replace today's notes")]
    async fn save_notes(
        &self,
        Parameters(args): Parameters<NotesArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let date = date_arg(args.date.as_deref(), store.today())?;
        let changed = store
            .apply_async("save_notes", |doc, today| doc.save_notes(today, date, &args.notes))
            .await?;
        Ok(day_result(&store, date, changed))
    }

    #[tool(description = "Log a win for today")]
    async fn add_win(
        &self,
        Parameters(args): Parameters<DayTextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let date = date_arg(args.date.as_deref(), store.today())?;
        let changed = store
            .apply_async("add_win", |doc, today| doc.add_win(today, date, &args.text))
            .await?;
        Ok(day_result(&store, date, changed))
    }

    #[tool(description = "Add a milestone to the current ISO week")]
    async fn add_weekly_milestone(
        &self,
        Parameters(args): Parameters<TextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let changed = store
            .apply_async("add_weekly_milestone", |doc, today| {
                doc.add_weekly_milestone(today, &args.text)
            })
            .await?;
        let dashboard = store.dashboard(None);
        Ok(CallToolResult::structured(json!({
            "changed": changed,
            "week": dashboard.current_week,
            "weeklyMilestones": dashboard.weekly_milestones,
        })))
    }

    #[tool(description = "Flip a weekly milestone between done and open")]
    async fn toggle_weekly_milestone(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let changed = store
            .apply_async("toggle_weekly_milestone", |doc, _| {
                doc.toggle_weekly_milestone(&args.id)
            })
            .await?;
        let milestone = store
            .data()
            .weekly_milestones
            .iter()
            .find(|m| m.id == args.id)
            .cloned();
        Ok(CallToolResult::structured(json!({
            "changed": changed,
            "milestone": milestone,
        })))
    }

    #[tool(description = "Add a sprint-wide milestone")]
    async fn add_sprint_milestone(
        &self,
        Parameters(args): Parameters<TextArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let changed = store
            .apply_async("add_sprint_milestone", |doc, _| doc.add_sprint_milestone(&args.text))
            .await?;
        Ok(CallToolResult::structured(json!({
            "changed": changed,
            "sprintMilestones": store.data().sprint_milestones,
        })))
    }

    #[tool(description = "Flip a sprint milestone between done and open")]
    async fn toggle_sprint_milestone(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let changed = store
            .apply_async("toggle_sprint_milestone", |doc, _| {
                doc.toggle_sprint_milestone(&args.id)
            })
            .await?;
        let milestone = store
            .data()
            .sprint_milestones
            .iter()
            .find(|m| m.id == args.id)
            .cloned();
        Ok(CallToolResult::structured(json!({
            "changed": changed,
            "milestone": milestone,
        })))
    }

    #[tool(description = "Edit the sprint name, start date or end date")]
    async fn update_sprint_config(
        &self,
        Parameters(args): Parameters<SprintConfigArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        let today = store.today();
        let update = SprintConfigUpdate {
            name: args.name,
            start_date: args
                .start_date
                .as_deref()
                .map(|raw| date_arg(Some(raw), today))
                .transpose()?,
            end_date: args
                .end_date
                .as_deref()
                .map(|raw| date_arg(Some(raw), today))
                .transpose()?,
        };
        let changed = store
            .apply_async("update_sprint_config", |doc, _| doc.update_sprint_config(&update))
            .await?;
        let dashboard = store.dashboard(None);
        Ok(CallToolResult::structured(json!({
            "changed": changed,
            "sprint": dashboard.sprint,
            "progress": dashboard.progress,
        })))
    }

    #[tool(description = "Export the whole sprint document as JSON")]
    async fn export_snapshot(&self) -> Result<CallToolResult, ErrorData> {
        let store = self.store.lock().await;
        let bytes = store.export_snapshot()?;
        Ok(CallToolResult::success(vec![Content::text(
            String::from_utf8_lossy(&bytes).into_owned(),
        )]))
    }

    #[tool(description = "Replace the whole sprint document with an exported snapshot")]
    async fn import_snapshot(
        &self,
        Parameters(args): Parameters<ImportArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut store = self.store.lock().await;
        store
            .import_snapshot_async(args.snapshot.as_bytes())
            .await?;
        Ok(CallToolResult::structured(json!(store.dashboard(None))))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for SprintDashboardServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "{} v{}: track a sprint's daily tasks, time, wins and milestones. \
                 Only today's entries can be changed; earlier days are read-only.",
                crate::metadata::PKG_NAME,
                crate::metadata::PKG_VERSION
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            meta: None,
            resources: vec![RawResource::new(SNAPSHOT_URI, "Sprint snapshot").no_annotation()],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        if request.uri != SNAPSHOT_URI {
            return Err(ErrorData::resource_not_found(
                "Unknown resource URI",
                Some(json!({ "uri": request.uri })),
            ));
        }
        let store = self.store.lock().await;
        let bytes = store.export_snapshot()?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(
                String::from_utf8_lossy(&bytes).into_owned(),
                request.uri,
            )],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult {
            meta: None,
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }
}

/// Serve the tools over stdio until the client disconnects.
pub async fn serve_stdio(store: SprintStore) -> ServiceResult<()> {
    tracing::info!(path = %store.path().display(), "starting sprint dashboard MCP server on stdio");
    let service = SprintDashboardServer::new(store)
        .serve(stdio())
        .await
        .map_err(|e| ServiceError::FromString(format!("Stdio server error: {e}")))?;
    service
        .waiting()
        .await
        .map_err(|e| ServiceError::FromString(format!("Task join error: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn server(dir: &tempfile::TempDir) -> SprintDashboardServer {
        let store = SprintStore::open(
            dir.path().join("data.json"),
            Box::new(FixedClock(day(2024, 2, 14))),
        )
        .unwrap();
        SprintDashboardServer::new(store)
    }

    fn structured(result: CallToolResult) -> serde_json::Value {
        result.structured_content.expect("structured content")
    }

    #[tokio::test]
    async fn test_add_task_defaults_to_today() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let value = structured(
            server
                .add_task(Parameters(DayTextArgs {
                    date: None,
                    text: "wire up tools".into(),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(value["changed"], true);
        assert_eq!(value["day"]["date"], "2024-02-14");
        assert_eq!(value["day"]["tasks"][0]["task"], "wire up tools");
        assert_eq!(value["day"]["tasks"][0]["status"], "not_started");
    }

    #[tokio::test]
    async fn test_past_day_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let value = structured(
            server
                .save_time(Parameters(SaveTimeArgs {
                    date: Some("2024-02-13".into()),
                    hours: 3,
                    minutes: 0,
                }))
                .await
                .unwrap(),
        );
        assert_eq!(value["changed"], false);
        assert_eq!(value["day"]["isPast"], true);
        assert_eq!(value["day"]["timeSpent"]["hours"], 0);
    }

    #[tokio::test]
    async fn test_bad_date_is_invalid_params() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let err = server
            .get_dashboard(Parameters(DashboardArgs {
                date: Some("14/02/2024".into()),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_import_failure_is_reported_and_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        server
            .add_sprint_milestone(Parameters(TextArgs { text: "GA".into() }))
            .await
            .unwrap();
        let err = server
            .import_snapshot(Parameters(ImportArgs {
                snapshot: "not json".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let dash = structured(
            server
                .get_dashboard(Parameters(DashboardArgs::default()))
                .await
                .unwrap(),
        );
        assert_eq!(dash["sprintMilestones"][0]["task"], "GA");
    }

    #[tokio::test]
    async fn test_update_sprint_config_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let value = structured(
            server
                .update_sprint_config(Parameters(SprintConfigArgs {
                    name: Some("Q1".into()),
                    start_date: Some("2024-01-01".into()),
                    end_date: Some("2024-04-01".into()),
                }))
                .await
                .unwrap(),
        );
        assert_eq!(value["sprint"]["name"], "Q1");
        assert_eq!(value["progress"]["totalDays"], 91);
        assert_eq!(value["progress"]["elapsedDays"], 45);
    }
}
