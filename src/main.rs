use std::sync::Arc;

use caredesk::{
    authz::{
        Action, AuthzResult, Dashboard, PolicyFor, PolicyRegistry, Resource, ResourceKind, Target,
    },
    config::{AppConfig, AuthzAuditConfig, AuthzConfig},
    db::{DbPool, PatientSort, TaskFilter, TaskSort, seed::SeedData},
    models::{
        Actor, Message, MessageDirection, Patient, PatientStatus, Role, Task, TaskStatus,
    },
    observability::init_tracing,
    services::{PatientListParams, ServiceError, Services, TaskListParams},
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(version, about = "Caredesk clinical CRM policy tool", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a TOML config file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one authorization decision against a seed dataset
    Check {
        /// Seed dataset (TOML)
        #[arg(long)]
        seed: String,
        /// E-mail of the acting account
        #[arg(long)]
        actor: String,
        /// patient, task, message or dashboard
        #[arg(long)]
        resource: String,
        /// list, view, create, update, destroy, complete or reopen
        #[arg(long)]
        action: String,
        /// Record the action applies to
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Print the page of records an actor's listing would contain
    List {
        /// Seed dataset (TOML)
        #[arg(long)]
        seed: String,
        /// E-mail of the acting account
        #[arg(long)]
        actor: String,
        /// patient, task or message
        #[arg(long)]
        resource: String,
        /// Status filter (patients: active|inactive, tasks: pending|completed|overdue|due_today)
        #[arg(long)]
        status: Option<String>,
        /// Sort key (patients: name|recent, tasks: due_date|recent)
        #[arg(long)]
        sort: Option<String>,
        /// 1-based page number
        #[arg(long)]
        page: Option<usize>,
        /// Restrict to one patient (required for messages)
        #[arg(long)]
        patient: Option<Uuid>,
    },
    /// Print the action by role decision table of every policy
    Matrix,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = load_config(args.config.as_deref());

    if let Err(e) = init_tracing(&config.observability) {
        eprintln!("Warning: {e}");
    }

    match args.command {
        Command::Check {
            seed,
            actor,
            resource,
            action,
            id,
        } => run_check(&config, &seed, &actor, &resource, &action, id).await,
        Command::List {
            seed,
            actor,
            resource,
            status,
            sort,
            page,
            patient,
        } => {
            let filters = ListArgs {
                status,
                sort,
                page,
                patient,
            };
            run_list(&config, &seed, &actor, &resource, filters).await
        }
        Command::Matrix => run_matrix(),
    }
}

fn load_config(path: Option<&str>) -> AppConfig {
    let Some(path) = path else {
        return AppConfig::default();
    };
    match AppConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => fail(format!("Failed to load config from {path}: {e}")),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(format!("Failed to serialize output: {e}")),
    }
}

fn open_seed(path: &str) -> Arc<DbPool> {
    let seed = SeedData::from_file(path).unwrap_or_else(|e| fail(e));
    match DbPool::from_seed(seed) {
        Ok(db) => Arc::new(db),
        Err(e) => fail(format!("Invalid seed data in {path}: {e}")),
    }
}

async fn find_actor(db: &DbPool, email: &str) -> Actor {
    match db.actors().get_by_email(email).await {
        Ok(Some(actor)) => actor,
        Ok(None) => fail(format!("No actor with email '{email}'")),
        Err(e) => fail(e),
    }
}

fn parse_kind(resource: &str) -> ResourceKind {
    ResourceKind::from_str(resource)
        .unwrap_or_else(|| fail(format!("Unknown resource '{resource}'")))
}

/// Check `action` on a loaded record, or on the resource type when no id was given.
fn check_loaded<R: Resource>(
    authz: &PolicyRegistry,
    actor: &Actor,
    action: Action,
    record: Option<&R>,
) -> AuthzResult
where
    PolicyRegistry: PolicyFor<R>,
{
    match record {
        Some(record) => authz.check(actor, action, Target::Record(record)),
        None => authz.check::<R>(actor, action, Target::Kind),
    }
}

async fn run_check(
    config: &AppConfig,
    seed: &str,
    email: &str,
    resource: &str,
    action: &str,
    id: Option<Uuid>,
) {
    let db = open_seed(seed);
    let actor = find_actor(&db, email).await;
    let kind = parse_kind(resource);
    let action =
        Action::from_str(action).unwrap_or_else(|| fail(format!("Unknown action '{action}'")));
    let authz = PolicyRegistry::new(&config.authz);

    let result = match (kind, id) {
        (ResourceKind::Dashboard, Some(_)) => fail("The dashboard has no records"),
        (ResourceKind::Dashboard, None) => authz.check::<Dashboard>(&actor, action, Target::Kind),
        (ResourceKind::Patient, id) => {
            let record = load(id, |id| async move { db.patients().get_by_id(id).await }).await;
            check_loaded(&authz, &actor, action, record.as_ref())
        }
        (ResourceKind::Task, id) => {
            let record = load(id, |id| async move { db.tasks().get_by_id(id).await }).await;
            check_loaded(&authz, &actor, action, record.as_ref())
        }
        (ResourceKind::Message, id) => {
            let record = load(id, |id| async move { db.messages().get_by_id(id).await }).await;
            check_loaded(&authz, &actor, action, record.as_ref())
        }
    };
    print_json(&result);
}

async fn load<T, F, Fut>(id: Option<Uuid>, get: F) -> Option<T>
where
    F: FnOnce(Uuid) -> Fut,
    Fut: Future<Output = caredesk::db::DbResult<Option<T>>>,
{
    let id = id?;
    match get(id).await {
        Ok(Some(record)) => Some(record),
        Ok(None) => fail(format!("No record with id {id}")),
        Err(e) => fail(e),
    }
}

struct ListArgs {
    status: Option<String>,
    sort: Option<String>,
    page: Option<usize>,
    patient: Option<Uuid>,
}

fn parse_opt<T>(value: Option<&str>, what: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    value.map(|v| parse(v).unwrap_or_else(|| fail(format!("Unknown {what} '{v}'"))))
}

fn report(err: ServiceError) -> ! {
    print_json(&err.to_json());
    std::process::exit(1);
}

async fn run_list(config: &AppConfig, seed: &str, email: &str, resource: &str, args: ListArgs) {
    let db = open_seed(seed);
    let actor = find_actor(&db, email).await;
    let authz = Arc::new(PolicyRegistry::new(&config.authz));
    let services = Services::new(db, authz, config);

    match parse_kind(resource) {
        ResourceKind::Patient => {
            let params = PatientListParams {
                status: parse_opt(args.status.as_deref(), "status", PatientStatus::from_str),
                sort: parse_opt(args.sort.as_deref(), "sort", PatientSort::from_str),
                page: args.page,
            };
            match services.patients.list(&actor, params).await {
                Ok(page) => print_json(&page),
                Err(e) => report(e),
            }
        }
        ResourceKind::Task => {
            let params = TaskListParams {
                filter: parse_opt(args.status.as_deref(), "status", TaskFilter::from_status_param),
                sort: parse_opt(args.sort.as_deref(), "sort", TaskSort::from_str),
                page: args.page,
                patient_id: args.patient,
            };
            match services.tasks.list(&actor, params).await {
                Ok(listing) => print_json(&listing),
                Err(e) => report(e),
            }
        }
        ResourceKind::Message => {
            let Some(patient_id) = args.patient else {
                fail("Listing messages requires --patient");
            };
            match services
                .messages
                .list_for_patient(&actor, patient_id, args.page)
                .await
            {
                Ok(page) => print_json(&page),
                Err(e) => report(e),
            }
        }
        ResourceKind::Dashboard => match services.dashboard.summary(&actor).await {
            Ok(summary) => print_json(&summary),
            Err(e) => report(e),
        },
    }
}

/// Sample records for the decision table. Policies only look at roles and
/// authorship, so the field values do not matter.
struct Samples {
    admin: Actor,
    patient: Actor,
    unresolved: Actor,
    record: Patient,
    task: Task,
    own_message: Message,
    other_message: Message,
}

impl Samples {
    fn new() -> Self {
        let now = Utc::now();
        let admin = Actor::new("admin@sample.test", Role::Admin);
        let record = Patient {
            id: Uuid::new_v4(),
            first_name: "Sample".to_string(),
            last_name: "Patient".to_string(),
            email: "patient@sample.test".to_string(),
            phone: "0000000000".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            medical_record_number: "MR00000".to_string(),
            status: PatientStatus::Active,
            user_id: None,
            health_question_one: None,
            health_question_two: None,
            health_question_three: None,
            created_at: now,
            updated_at: now,
        };
        let patient = Actor::new("patient@sample.test", Role::Patient).with_patient(record.id);
        let unresolved = Actor::from_stored(Uuid::new_v4(), "unknown@sample.test", "");
        let task = Task {
            id: Uuid::new_v4(),
            patient_id: record.id,
            user_id: admin.id,
            title: "Sample task".to_string(),
            description: None,
            status: TaskStatus::Pending,
            due_date: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let message = |author: Uuid| Message {
            id: Uuid::new_v4(),
            patient_id: record.id,
            user_id: author,
            content: "Sample message".to_string(),
            direction: MessageDirection::Incoming,
            created_at: now,
            updated_at: now,
        };
        Self {
            own_message: message(patient.id),
            other_message: message(admin.id),
            admin,
            patient,
            unresolved,
            record,
            task,
        }
    }
}

fn decide<R: Resource>(authz: &PolicyRegistry, actor: &Actor, action: Action, record: &R) -> bool
where
    PolicyRegistry: PolicyFor<R>,
{
    let target = if action.is_record_level() {
        Target::Record(record)
    } else {
        Target::Kind
    };
    authz.check(actor, action, target).allowed
}

fn mark(allowed: bool) -> &'static str {
    if allowed { "allow" } else { "deny" }
}

fn cell(
    authz: &PolicyRegistry,
    samples: &Samples,
    kind: ResourceKind,
    actor: &Actor,
    action: Action,
) -> &'static str {
    match kind {
        ResourceKind::Patient => mark(decide(authz, actor, action, &samples.record)),
        ResourceKind::Task => mark(decide(authz, actor, action, &samples.task)),
        ResourceKind::Dashboard => mark(decide(authz, actor, action, &Dashboard)),
        ResourceKind::Message => {
            let own = decide(authz, actor, action, &samples.own_message);
            let other = decide(authz, actor, action, &samples.other_message);
            match (own, other) {
                (true, false) => "own",
                (allowed, _) => mark(allowed),
            }
        }
    }
}

fn run_matrix() {
    // Decisions here are hypothetical, keep them out of the audit log.
    let authz = PolicyRegistry::new(&AuthzConfig {
        audit: AuthzAuditConfig {
            log_allowed: false,
            log_denied: false,
        },
    });
    let samples = Samples::new();
    let actors = [
        ("admin", &samples.admin),
        ("patient", &samples.patient),
        ("(none)", &samples.unresolved),
    ];

    for kind in ResourceKind::ALL {
        println!("{kind}");
        print!("  {:<10}", "");
        for (label, _) in &actors {
            print!("{label:<10}");
        }
        println!();
        for action in Action::ALL {
            print!("  {:<10}", action.as_str());
            for (_, actor) in &actors {
                print!("{:<10}", cell(&authz, &samples, kind, actor, action));
            }
            println!();
        }
        println!();
    }
}
