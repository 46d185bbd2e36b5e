use std::fmt::Debug;
use std::sync::Arc;

use catalog::config::{CatalogConfig, RemoteBackend};
use catalog::error::AppError;
use catalog::remote::{MemoryTables, PostgrestClient, RemoteTables};
use catalog::services::{Dashboard, Modal};
use catalog::session::{AdminSession, MemorySessionStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  login <password> | logout
  reload | courses | categories | show
  add-course | edit-course <id> | add-category | edit-category <id>
  set <field> <value>   (name, description, price, originalPrice, imageUrl, categoryId, checkoutUrl, benefits)
  submit | cancel
  delete-course <id> | delete-category <id>
  help | quit";

#[derive(Debug, PartialEq)]
enum Command {
    Login(String),
    Logout,
    Reload,
    Courses,
    Categories,
    Show,
    AddCourse,
    EditCourse(String),
    AddCategory,
    EditCategory(String),
    Set { field: String, value: String },
    Submit,
    Cancel,
    DeleteCourse(String),
    DeleteCategory(String),
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let arg = |usage: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("usage: {}", usage))
            } else {
                Ok(rest.to_string())
            }
        };

        match name {
            "login" => Ok(Command::Login(arg("login <password>")?)),
            "logout" => Ok(Command::Logout),
            "reload" => Ok(Command::Reload),
            "courses" => Ok(Command::Courses),
            "categories" => Ok(Command::Categories),
            "show" => Ok(Command::Show),
            "add-course" => Ok(Command::AddCourse),
            "edit-course" => Ok(Command::EditCourse(arg("edit-course <id>")?)),
            "add-category" => Ok(Command::AddCategory),
            "edit-category" => Ok(Command::EditCategory(arg("edit-category <id>")?)),
            "set" => {
                let (field, value) = rest.split_once(' ').unwrap_or((rest, ""));
                if field.is_empty() {
                    return Err("usage: set <field> <value>".to_string());
                }
                Ok(Command::Set {
                    field: field.to_string(),
                    value: value.trim().to_string(),
                })
            }
            "submit" => Ok(Command::Submit),
            "cancel" => Ok(Command::Cancel),
            "delete-course" => Ok(Command::DeleteCourse(arg("delete-course <id>")?)),
            "delete-category" => Ok(Command::DeleteCategory(arg("delete-category <id>")?)),
            "help" | "" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command: {}", other)),
        }
    }

    fn needs_admin(&self) -> bool {
        !matches!(self, Command::Login(_) | Command::Logout | Command::Help | Command::Quit)
    }
}

fn print_modal(dashboard: &Dashboard) {
    let form: &dyn Debug = match dashboard.modal() {
        Modal::Closed => {
            println!("no form open");
            return;
        }
        Modal::AddCourse(form) | Modal::EditCourse { form, .. } => form,
        Modal::AddCategory(form) | Modal::EditCategory { form, .. } => form,
    };
    println!("{}\n{:#?}", dashboard.title(), form);
}

async fn run(
    command: Command,
    session: &mut AdminSession,
    dashboard: &mut Dashboard,
) -> Result<(), AppError> {
    if command.needs_admin() {
        session.require_admin()?;
    }

    match command {
        Command::Login(password) => {
            if session.login(&password).await? {
                dashboard.load().await?;
                println!("logged in");
            } else {
                println!("wrong password");
            }
        }
        Command::Logout => {
            session.logout().await?;
            dashboard.cancel();
            println!("logged out");
        }
        Command::Reload => dashboard.refresh().await?,
        Command::Courses => {
            for joined in dashboard.courses() {
                let course = &joined.course;
                println!(
                    "{:>4}  {:<40} R$ {:>8.2}  {:>3}% off  [{}]",
                    course.id,
                    course.name,
                    course.price,
                    course.discount_percent(),
                    joined.category.name
                );
            }
        }
        Command::Categories => {
            for category in dashboard.categories() {
                println!("{:>4}  {}", category.id, category.name);
            }
        }
        Command::Show => print_modal(dashboard),
        Command::AddCourse => {
            dashboard.open_add_course();
            print_modal(dashboard);
        }
        Command::EditCourse(id) => {
            dashboard.open_edit_course(&id)?;
            print_modal(dashboard);
        }
        Command::AddCategory => {
            dashboard.open_add_category();
            print_modal(dashboard);
        }
        Command::EditCategory(id) => {
            dashboard.open_edit_category(&id)?;
            print_modal(dashboard);
        }
        Command::Set { field, value } => dashboard.set_field(&field, &value)?,
        Command::Submit => {
            dashboard.submit().await?;
            println!("saved");
        }
        Command::Cancel => dashboard.cancel(),
        Command::DeleteCourse(id) => {
            dashboard.delete_course(&id).await?;
            println!("course {} deleted", id);
        }
        Command::DeleteCategory(id) => {
            if dashboard.delete_category(&id).await? {
                println!("category {} deleted", id);
            } else {
                println!("category {} is used by a course and was not deleted", id);
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "catalog=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CatalogConfig::new_from_env()?;
    let remote: Arc<dyn RemoteTables> = match (config.backend, config.remote) {
        (RemoteBackend::Postgrest, Some(remote_config)) => {
            Arc::new(PostgrestClient::new(remote_config)?)
        }
        _ => Arc::new(MemoryTables::new()),
    };

    let mut session = AdminSession::restore(
        "console",
        Arc::new(MemorySessionStore::new()),
        Arc::from(config.admin_password.as_str()),
    )
    .await?;
    let mut dashboard = Dashboard::new(remote);

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        if let Err(e) = run(command, &mut session, &mut dashboard).await {
            tracing::error!("{}", e);
            println!("error: {}", e);
        }
    }

    Ok(())
}
