//! Subcommand definitions and dispatch
//!
//! Each resource maps onto one manager; every command prints the server's
//! answer as JSON or YAML.

use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use mistralclient::resource::cron_triggers::CronTriggerCreate;
use mistralclient::resource::environments::EnvironmentSpec;
use mistralclient::resource::event_triggers::EventTriggerCreate;
use mistralclient::resource::executions::{ExecutionCreate, ExecutionUpdate};
use mistralclient::{ListParams, MistralClient};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => Err(anyhow!("unknown output format '{}'", other)),
        }
    }

    pub fn render<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
        })
    }
}

/// Pagination, sorting and filtering flags shared by list commands
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub marker: Option<String>,
    #[arg(long)]
    pub limit: Option<i64>,
    /// Comma-separated sort keys
    #[arg(long, value_delimiter = ',')]
    pub sort_keys: Vec<String>,
    /// Comma-separated sort directions (asc/desc)
    #[arg(long, value_delimiter = ',')]
    pub sort_dirs: Vec<String>,
    /// Comma-separated field names to return
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,
    /// Server-side filter, NAME=VALUE (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,
}

impl ListArgs {
    pub fn params(&self) -> Result<ListParams> {
        let mut params = ListParams::new()
            .sort_keys(self.sort_keys.iter().cloned())
            .sort_dirs(self.sort_dirs.iter().cloned())
            .fields(self.fields.iter().cloned());
        if let Some(marker) = &self.marker {
            params = params.marker(marker.clone());
        }
        if let Some(limit) = self.limit {
            params = params.limit(limit);
        }
        for filter in &self.filters {
            let (name, value) = filter
                .split_once('=')
                .ok_or_else(|| anyhow!("filter '{}' must look like NAME=VALUE", filter))?;
            params = params.filter(name, value);
        }
        Ok(params)
    }
}

/// Workbook, workflow and ad-hoc action definitions
#[derive(Subcommand, Debug)]
pub enum DefinitionCommand {
    List {
        #[arg(long, default_value = "")]
        namespace: String,
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        identifier: String,
        #[arg(long, default_value = "")]
        namespace: String,
    },
    /// Upload a YAML definition file
    Create {
        definition: PathBuf,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(long, default_value = "private")]
        scope: String,
    },
    Update {
        definition: PathBuf,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(long, default_value = "private")]
        scope: String,
        /// Update one definition by id (workflows and actions)
        #[arg(long)]
        id: Option<String>,
    },
    Delete {
        #[arg(required = true)]
        identifiers: Vec<String>,
        #[arg(long, default_value = "")]
        namespace: String,
    },
    Validate {
        definition: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExecutionCommand {
    List {
        /// Only executions started by this task execution
        #[arg(long)]
        task: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        id: String,
    },
    Create {
        /// Workflow name or id
        #[arg(default_value = "")]
        workflow_identifier: String,
        /// Workflow input as JSON/YAML text or a file path
        input: Option<String>,
        /// Start parameters as JSON/YAML text or a file path
        #[arg(long)]
        params: Option<String>,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Re-run the workflow of an earlier execution
        #[arg(long = "source-execution-id")]
        source_execution_id: Option<String>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        state: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Environment as JSON/YAML text or a file path
        #[arg(long)]
        env: Option<String>,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Also delete running executions
        #[arg(long)]
        force: bool,
    },
    SubExecutions {
        id: String,
        #[arg(long)]
        errors_only: bool,
        #[arg(long, default_value_t = -1)]
        max_depth: i64,
    },
    Report {
        id: String,
        #[arg(long)]
        errors_only: bool,
        #[arg(long)]
        max_depth: Option<i64>,
        #[arg(long)]
        statistics_only: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    List {
        /// Workflow execution id
        #[arg(long)]
        execution: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        id: String,
    },
    Rerun {
        id: String,
        /// Re-run only failed action executions instead of all of them
        #[arg(long)]
        resume: bool,
        #[arg(long)]
        env: Option<String>,
    },
    SubExecutions {
        id: String,
        #[arg(long)]
        errors_only: bool,
        #[arg(long, default_value_t = -1)]
        max_depth: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ActionExecutionCommand {
    List {
        /// Task execution id
        #[arg(long)]
        task: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        id: String,
    },
    /// Run a single action
    Create {
        name: String,
        input: Option<String>,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(long)]
        save_result: bool,
        #[arg(long)]
        run_sync: bool,
    },
    Update {
        id: String,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        output: Option<String>,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CronTriggerCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        identifier: String,
    },
    Create {
        name: String,
        workflow_identifier: String,
        input: Option<String>,
        #[arg(long)]
        params: Option<String>,
        #[arg(long)]
        pattern: Option<String>,
        /// First run, "YYYY-MM-DD HH:MM" in UTC
        #[arg(long)]
        first_time: Option<String>,
        #[arg(long)]
        count: Option<i64>,
        #[arg(long, default_value = "")]
        namespace: String,
    },
    Delete {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EventTriggerCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        id: String,
    },
    Create {
        name: String,
        workflow_id: String,
        exchange: String,
        topic: String,
        event: String,
        input: Option<String>,
        #[arg(long)]
        params: Option<String>,
        #[arg(long, default_value = "")]
        scope: String,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        scope: Option<String>,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvironmentCommand {
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        name: String,
    },
    /// Create from a JSON or YAML file with name, description, variables, scope
    Create {
        file: PathBuf,
    },
    Update {
        file: PathBuf,
    },
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    List {
        resource_id: String,
        resource_type: String,
    },
    Get {
        resource_id: String,
        resource_type: String,
        #[arg(long)]
        member_id: Option<String>,
    },
    Create {
        resource_id: String,
        resource_type: String,
        member_id: String,
    },
    Update {
        resource_id: String,
        resource_type: String,
        #[arg(long)]
        member_id: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        resource_id: String,
        resource_type: String,
        member_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CodeSourceCommand {
    List {
        #[arg(long, default_value = "")]
        namespace: String,
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        identifier: String,
        #[arg(long, default_value = "")]
        namespace: String,
    },
    Create {
        name: String,
        content: PathBuf,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(long, default_value = "private")]
        scope: String,
    },
    Update {
        identifier: String,
        content: PathBuf,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(long, default_value = "private")]
        scope: String,
    },
    Delete {
        #[arg(required = true)]
        identifiers: Vec<String>,
        #[arg(long, default_value = "")]
        namespace: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DynamicActionCommand {
    List {
        #[arg(long, default_value = "")]
        namespace: String,
        #[command(flatten)]
        list: ListArgs,
    },
    Get {
        identifier: String,
        #[arg(long, default_value = "")]
        namespace: String,
    },
    Create {
        name: String,
        class_name: String,
        code_source: String,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(long, default_value = "private")]
        scope: String,
    },
    Update {
        identifier: String,
        #[arg(long)]
        class_name: Option<String>,
        #[arg(long)]
        code_source: Option<String>,
        #[arg(long, default_value = "")]
        namespace: String,
        #[arg(long, default_value = "private")]
        scope: String,
    },
    Delete {
        #[arg(required = true)]
        identifiers: Vec<String>,
        #[arg(long, default_value = "")]
        namespace: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the stored configuration
    Show,
    /// Store one value; an empty value clears it
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Workbook(DefinitionCommand),
    #[command(subcommand)]
    Workflow(DefinitionCommand),
    #[command(subcommand)]
    Action(DefinitionCommand),
    #[command(subcommand)]
    Execution(ExecutionCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    ActionExecution(ActionExecutionCommand),
    #[command(subcommand)]
    CronTrigger(CronTriggerCommand),
    #[command(subcommand)]
    EventTrigger(EventTriggerCommand),
    #[command(subcommand)]
    Environment(EnvironmentCommand),
    /// List engine services
    ServiceList,
    #[command(subcommand)]
    Member(MemberCommand),
    #[command(subcommand)]
    CodeSource(CodeSourceCommand),
    #[command(subcommand)]
    DynamicAction(DynamicActionCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))
}

/// Parse a JSON or YAML argument, reading it from a file when the text names one.
pub fn parse_structured(arg: &str) -> Result<Value> {
    let path = Path::new(arg);
    let text = if path.is_file() {
        read_file(path)?
    } else {
        arg.to_string()
    };

    serde_json::from_str(&text)
        .or_else(|_| serde_yaml::from_str(&text))
        .with_context(|| format!("'{}' is neither JSON nor YAML", arg))
}

fn parse_optional(arg: Option<&str>) -> Result<Option<Value>> {
    arg.map(parse_structured).transpose()
}

fn parse_map(arg: Option<&str>) -> Result<Map<String, Value>> {
    match parse_optional(arg)? {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(anyhow!("expected a mapping, got {}", other)),
    }
}

fn deleted(kind: &str, ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("Request to delete {} {} has been accepted.", kind, id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Handle `config` without contacting the service.
pub fn run_config(
    command: &ConfigCommand,
    config: &mut Config,
    format: OutputFormat,
) -> Result<String> {
    match command {
        ConfigCommand::Show => {
            let mut shown = serde_json::to_value(&*config)?;
            if let Value::Object(map) = &mut shown {
                map.insert("mistral_url".into(), Value::String(config.display_mistral_url()));
            }
            format.render(&shown)
        }
        ConfigCommand::Set { key, value } => {
            config.set_value(key, value)?;
            config.save()?;
            Ok(format!("{} updated", key))
        }
    }
}

/// Run one resource command and render its result.
pub async fn execute(
    client: &MistralClient,
    command: Command,
    format: OutputFormat,
) -> Result<String> {
    match command {
        Command::Workbook(cmd) => workbook(client, cmd, format).await,
        Command::Workflow(cmd) => workflow(client, cmd, format).await,
        Command::Action(cmd) => action(client, cmd, format).await,
        Command::Execution(cmd) => execution(client, cmd, format).await,
        Command::Task(cmd) => task(client, cmd, format).await,
        Command::ActionExecution(cmd) => action_execution(client, cmd, format).await,
        Command::CronTrigger(cmd) => cron_trigger(client, cmd, format).await,
        Command::EventTrigger(cmd) => event_trigger(client, cmd, format).await,
        Command::Environment(cmd) => environment(client, cmd, format).await,
        Command::ServiceList => format.render(&client.services().list().await?),
        Command::Member(cmd) => member(client, cmd, format).await,
        Command::CodeSource(cmd) => code_source(client, cmd, format).await,
        Command::DynamicAction(cmd) => dynamic_action(client, cmd, format).await,
        Command::Config(_) => Err(anyhow!("config commands run without a client")),
    }
}

async fn workbook(
    client: &MistralClient,
    cmd: DefinitionCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.workbooks();
    match cmd {
        DefinitionCommand::List { namespace, list } => {
            format.render(&manager.list(&namespace, &list.params()?).await?)
        }
        DefinitionCommand::Get { identifier, namespace } => {
            format.render(&manager.get(&identifier, &namespace).await?)
        }
        DefinitionCommand::Create { definition, namespace, scope } => format.render(
            &manager
                .create(&read_file(&definition)?, &namespace, &scope)
                .await?,
        ),
        DefinitionCommand::Update { definition, namespace, scope, .. } => format.render(
            &manager
                .update(&read_file(&definition)?, &namespace, &scope)
                .await?,
        ),
        DefinitionCommand::Delete { identifiers, namespace } => {
            for name in &identifiers {
                manager.delete(name, &namespace).await?;
            }
            Ok(deleted("workbook", &identifiers))
        }
        DefinitionCommand::Validate { definition } => {
            format.render(&manager.validate(&read_file(&definition)?).await?)
        }
    }
}

async fn workflow(
    client: &MistralClient,
    cmd: DefinitionCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.workflows();
    match cmd {
        DefinitionCommand::List { namespace, list } => {
            format.render(&manager.list(&namespace, &list.params()?).await?)
        }
        DefinitionCommand::Get { identifier, namespace } => {
            format.render(&manager.get(&identifier, &namespace).await?)
        }
        DefinitionCommand::Create { definition, namespace, scope } => format.render(
            &manager
                .create(&read_file(&definition)?, &namespace, &scope)
                .await?,
        ),
        DefinitionCommand::Update { definition, namespace, scope, id } => format.render(
            &manager
                .update(&read_file(&definition)?, &namespace, &scope, id.as_deref())
                .await?,
        ),
        DefinitionCommand::Delete { identifiers, namespace } => {
            for identifier in &identifiers {
                manager.delete(identifier, &namespace).await?;
            }
            Ok(deleted("workflow", &identifiers))
        }
        DefinitionCommand::Validate { definition } => {
            format.render(&manager.validate(&read_file(&definition)?).await?)
        }
    }
}

async fn action(
    client: &MistralClient,
    cmd: DefinitionCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.actions();
    match cmd {
        DefinitionCommand::List { namespace, list } => {
            format.render(&manager.list(&namespace, &list.params()?).await?)
        }
        DefinitionCommand::Get { identifier, namespace } => {
            format.render(&manager.get(&identifier, &namespace).await?)
        }
        DefinitionCommand::Create { definition, namespace, scope } => format.render(
            &manager
                .create(&read_file(&definition)?, &scope, &namespace)
                .await?,
        ),
        DefinitionCommand::Update { definition, namespace, scope, id } => format.render(
            &manager
                .update(&read_file(&definition)?, &scope, &namespace, id.as_deref())
                .await?,
        ),
        DefinitionCommand::Delete { identifiers, namespace } => {
            for identifier in &identifiers {
                manager.delete(identifier, &namespace).await?;
            }
            Ok(deleted("action", &identifiers))
        }
        DefinitionCommand::Validate { definition } => {
            format.render(&manager.validate(&read_file(&definition)?).await?)
        }
    }
}

async fn execution(
    client: &MistralClient,
    cmd: ExecutionCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.executions();
    match cmd {
        ExecutionCommand::List { task, list } => {
            format.render(&manager.list(task.as_deref(), &list.params()?).await?)
        }
        ExecutionCommand::Get { id } => format.render(&manager.get(&id).await?),
        ExecutionCommand::Create {
            workflow_identifier,
            input,
            params,
            namespace,
            description,
            source_execution_id,
        } => {
            let request = ExecutionCreate {
                workflow_identifier,
                namespace,
                input: parse_optional(input.as_deref())?,
                description,
                source_execution_id,
                params: parse_map(params.as_deref())?,
            };
            format.render(&manager.create(request).await?)
        }
        ExecutionCommand::Update { id, state, description, env } => {
            let update = ExecutionUpdate {
                state,
                description,
                env: parse_optional(env.as_deref())?,
            };
            format.render(&manager.update(&id, update).await?)
        }
        ExecutionCommand::Delete { ids, force } => {
            for id in &ids {
                manager.delete(id, force).await?;
            }
            Ok(deleted("execution", &ids))
        }
        ExecutionCommand::SubExecutions { id, errors_only, max_depth } => {
            format.render(&manager.get_sub_executions(&id, errors_only, max_depth).await?)
        }
        ExecutionCommand::Report { id, errors_only, max_depth, statistics_only } => format.render(
            &manager
                .get_report(&id, errors_only, max_depth, statistics_only)
                .await?,
        ),
    }
}

async fn task(client: &MistralClient, cmd: TaskCommand, format: OutputFormat) -> Result<String> {
    let manager = client.tasks();
    match cmd {
        TaskCommand::List { execution, list } => {
            format.render(&manager.list(execution.as_deref(), &list.params()?).await?)
        }
        TaskCommand::Get { id } => format.render(&manager.get(&id).await?),
        TaskCommand::Rerun { id, resume, env } => {
            let env = parse_optional(env.as_deref())?;
            format.render(&manager.rerun(&id, !resume, env.as_ref()).await?)
        }
        TaskCommand::SubExecutions { id, errors_only, max_depth } => {
            format.render(&manager.get_sub_executions(&id, errors_only, max_depth).await?)
        }
    }
}

async fn action_execution(
    client: &MistralClient,
    cmd: ActionExecutionCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.action_executions();
    match cmd {
        ActionExecutionCommand::List { task, list } => {
            format.render(&manager.list(task.as_deref(), &list.params()?).await?)
        }
        ActionExecutionCommand::Get { id } => format.render(&manager.get(&id).await?),
        ActionExecutionCommand::Create { name, input, namespace, save_result, run_sync } => {
            let input = parse_optional(input.as_deref())?;
            let mut params = Map::new();
            if save_result {
                params.insert("save_result".into(), Value::Bool(true));
            }
            if run_sync {
                params.insert("run_sync".into(), Value::Bool(true));
            }
            format.render(
                &manager
                    .create(&name, input.as_ref(), &namespace, &params)
                    .await?,
            )
        }
        ActionExecutionCommand::Update { id, state, output } => {
            let output = parse_optional(output.as_deref())?;
            format.render(
                &manager
                    .update(&id, state.as_deref(), output.as_ref())
                    .await?,
            )
        }
        ActionExecutionCommand::Delete { ids } => {
            for id in &ids {
                manager.delete(id).await?;
            }
            Ok(deleted("action execution", &ids))
        }
    }
}

async fn cron_trigger(
    client: &MistralClient,
    cmd: CronTriggerCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.cron_triggers();
    match cmd {
        CronTriggerCommand::List { list } => format.render(&manager.list(&list.params()?).await?),
        CronTriggerCommand::Get { identifier } => format.render(&manager.get(&identifier).await?),
        CronTriggerCommand::Create {
            name,
            workflow_identifier,
            input,
            params,
            pattern,
            first_time,
            count,
            namespace,
        } => {
            let request = CronTriggerCreate {
                name,
                workflow_identifier,
                namespace,
                workflow_input: parse_optional(input.as_deref())?,
                workflow_params: parse_optional(params.as_deref())?,
                pattern,
                first_time,
                count,
            };
            format.render(&manager.create(request).await?)
        }
        CronTriggerCommand::Delete { identifiers } => {
            for identifier in &identifiers {
                manager.delete(identifier).await?;
            }
            Ok(deleted("cron trigger", &identifiers))
        }
    }
}

async fn event_trigger(
    client: &MistralClient,
    cmd: EventTriggerCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.event_triggers();
    match cmd {
        EventTriggerCommand::List { list } => format.render(&manager.list(&list.params()?).await?),
        EventTriggerCommand::Get { id } => format.render(&manager.get(&id).await?),
        EventTriggerCommand::Create {
            name,
            workflow_id,
            exchange,
            topic,
            event,
            input,
            params,
            scope,
        } => {
            let request = EventTriggerCreate {
                name,
                workflow_id,
                exchange,
                topic,
                event,
                workflow_input: parse_optional(input.as_deref())?,
                workflow_params: parse_optional(params.as_deref())?,
                scope,
            };
            format.render(&manager.create(request).await?)
        }
        EventTriggerCommand::Update { id, name, scope } => format.render(
            &manager
                .update(&id, name.as_deref(), scope.as_deref())
                .await?,
        ),
        EventTriggerCommand::Delete { ids } => {
            for id in &ids {
                manager.delete(id).await?;
            }
            Ok(deleted("event trigger", &ids))
        }
    }
}

fn read_environment(path: &Path) -> Result<EnvironmentSpec> {
    let text = read_file(path)?;
    serde_json::from_str(&text)
        .or_else(|_| serde_yaml::from_str(&text))
        .with_context(|| format!("{:?} is not a valid environment file", path))
}

async fn environment(
    client: &MistralClient,
    cmd: EnvironmentCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.environments();
    match cmd {
        EnvironmentCommand::List { list } => format.render(&manager.list(&list.params()?).await?),
        EnvironmentCommand::Get { name } => format.render(&manager.get(&name).await?),
        EnvironmentCommand::Create { file } => {
            format.render(&manager.create(&read_environment(&file)?).await?)
        }
        EnvironmentCommand::Update { file } => {
            format.render(&manager.update(&read_environment(&file)?).await?)
        }
        EnvironmentCommand::Delete { names } => {
            for name in &names {
                manager.delete(name).await?;
            }
            Ok(deleted("environment", &names))
        }
    }
}

async fn member(
    client: &MistralClient,
    cmd: MemberCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.members();
    match cmd {
        MemberCommand::List { resource_id, resource_type } => {
            format.render(&manager.list(&resource_id, &resource_type).await?)
        }
        MemberCommand::Get { resource_id, resource_type, member_id } => format.render(
            &manager
                .get(&resource_id, &resource_type, member_id.as_deref())
                .await?,
        ),
        MemberCommand::Create { resource_id, resource_type, member_id } => format.render(
            &manager
                .create(&resource_id, &resource_type, &member_id)
                .await?,
        ),
        MemberCommand::Update { resource_id, resource_type, member_id, status } => format.render(
            &manager
                .update(
                    &resource_id,
                    &resource_type,
                    member_id.as_deref(),
                    status.as_deref(),
                )
                .await?,
        ),
        MemberCommand::Delete { resource_id, resource_type, member_id } => {
            manager
                .delete(&resource_id, &resource_type, &member_id)
                .await?;
            Ok(deleted("member", &[member_id]))
        }
    }
}

async fn code_source(
    client: &MistralClient,
    cmd: CodeSourceCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.code_sources();
    match cmd {
        CodeSourceCommand::List { namespace, list } => {
            format.render(&manager.list(&namespace, &list.params()?).await?)
        }
        CodeSourceCommand::Get { identifier, namespace } => {
            format.render(&manager.get(&identifier, &namespace).await?)
        }
        CodeSourceCommand::Create { name, content, namespace, scope } => format.render(
            &manager
                .create(&name, &read_file(&content)?, &namespace, &scope)
                .await?,
        ),
        CodeSourceCommand::Update { identifier, content, namespace, scope } => format.render(
            &manager
                .update(&identifier, &read_file(&content)?, &namespace, &scope)
                .await?,
        ),
        CodeSourceCommand::Delete { identifiers, namespace } => {
            for identifier in &identifiers {
                manager.delete(identifier, &namespace).await?;
            }
            Ok(deleted("code source", &identifiers))
        }
    }
}

async fn dynamic_action(
    client: &MistralClient,
    cmd: DynamicActionCommand,
    format: OutputFormat,
) -> Result<String> {
    let manager = client.dynamic_actions();
    match cmd {
        DynamicActionCommand::List { namespace, list } => {
            format.render(&manager.list(&namespace, &list.params()?).await?)
        }
        DynamicActionCommand::Get { identifier, namespace } => {
            format.render(&manager.get(&identifier, &namespace).await?)
        }
        DynamicActionCommand::Create {
            name,
            class_name,
            code_source,
            namespace,
            scope,
        } => format.render(
            &manager
                .create(&name, &class_name, &code_source, &scope, &namespace)
                .await?,
        ),
        DynamicActionCommand::Update {
            identifier,
            class_name,
            code_source,
            namespace,
            scope,
        } => format.render(
            &manager
                .update(
                    &identifier,
                    class_name.as_deref(),
                    code_source.as_deref(),
                    &scope,
                    &namespace,
                )
                .await?,
        ),
        DynamicActionCommand::Delete { identifiers, namespace } => {
            for identifier in &identifiers {
                manager.delete(identifier, &namespace).await?;
            }
            Ok(deleted("dynamic action", &identifiers))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_args_to_params() {
        let args = ListArgs {
            limit: Some(5),
            sort_keys: vec!["name".into()],
            filters: vec!["state=ERROR".into()],
            ..Default::default()
        };
        assert_eq!(
            args.params().unwrap().query_string(&[]),
            "?limit=5&sort_keys=name&state=ERROR"
        );

        let bad = ListArgs {
            filters: vec!["state".into()],
            ..Default::default()
        };
        assert!(bad.params().is_err());
    }

    #[test]
    fn test_parse_structured_accepts_json_and_yaml() {
        assert_eq!(parse_structured(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(parse_structured("a: 1\nb: [x]").unwrap(), json!({"a": 1, "b": ["x"]}));
    }

    #[test]
    fn test_parse_map_rejects_scalars() {
        assert!(parse_map(Some("[1, 2]")).is_err());
        assert!(parse_map(None).unwrap().is_empty());
    }

    #[test]
    fn test_render_formats() {
        let value = json!({"name": "wf1"});
        assert_eq!(
            OutputFormat::Json.render(&value).unwrap(),
            "{\n  \"name\": \"wf1\"\n}"
        );
        assert_eq!(OutputFormat::Yaml.render(&value).unwrap(), "name: wf1\n");
        assert!(OutputFormat::parse("xml").is_err());
    }

    #[test]
    fn test_config_show_does_not_need_a_client() {
        let mut config = Config::default();
        let shown = run_config(&ConfigCommand::Show, &mut config, OutputFormat::Json).unwrap();
        let shown: Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(shown["mistral_url"], "http://localhost:8989/v2");
    }

    #[test]
    fn test_deleted_message() {
        assert_eq!(
            deleted("workflow", &["a".into(), "b".into()]),
            "Request to delete workflow a has been accepted.\n\
             Request to delete workflow b has been accepted."
        );
    }
}
