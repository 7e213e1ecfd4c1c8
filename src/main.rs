use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use prompt_news::access::PromptPage;
use prompt_news::api::{ApiClient, Navigator};
use prompt_news::config::Config;
use prompt_news::error::{ApiError, AppError, Result};
use prompt_news::models::{
    Frequency, LoginRequest, News, NewsCreate, NewsFilter, Prompt, PromptCreate,
    PromptListParams, PromptTemplate, PromptUpdate, TemplateType, UserCreate, UserSettings,
    Visibility,
};
use prompt_news::routes::{guard, PromptPath, RouteDecision, LOGIN_PATH};
use prompt_news::services::Services;
use prompt_news::session::{CookieFileSession, TokenStore};

#[derive(Parser)]
#[command(name = "prompt-news", version, about = "Browse and manage prompt-generated news")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session token. Prompts for the password.
    Login { username: String },
    /// Create the first account on a fresh backend
    Signup {
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Change timezone and daily generation hours
    Settings {
        #[arg(long)]
        timezone: Option<String>,
        /// First daily generation hour (0-23)
        #[arg(long)]
        hour1: Option<u8>,
        /// Second daily generation hour (0-23)
        #[arg(long)]
        hour2: Option<u8>,
    },
    /// Manage your prompts
    #[command(subcommand)]
    Prompts(PromptsCommand),
    /// Browse and generate news
    #[command(subcommand)]
    News(NewsCommand),
    /// Open a shared prompt page, e.g. `ana/daily-tech`
    View { path: String },
    /// Latest news item for each of your prompts
    Overview {
        #[arg(long, default_value = "daily")]
        frequency: Frequency,
    },
    /// Show how a page path is gated for the current session
    Route { path: String },
}

#[derive(Subcommand)]
enum PromptsCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "summary")]
        template: TemplateType,
        /// Required for the narrative template
        #[arg(long)]
        custom_template: Option<String>,
        #[arg(long, default_value = "private")]
        visibility: Visibility,
    },
    /// Change fields of an existing prompt
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        template: Option<TemplateType>,
        #[arg(long)]
        custom_template: Option<String>,
        #[arg(long)]
        visibility: Option<Visibility>,
    },
    Delete {
        id: i64,
    },
    /// Ask the backend whether a template is usable
    ValidateTemplate {
        template: TemplateType,
        #[arg(long)]
        custom_template: Option<String>,
    },
    /// Prompts anyone can read
    Public {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Template types the backend supports
    Templates,
}

#[derive(Subcommand)]
enum NewsCommand {
    List {
        #[arg(long)]
        prompt_id: Option<i64>,
        #[arg(long)]
        frequency: Option<Frequency>,
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Latest {
        prompt_id: i64,
        #[arg(long, default_value = "daily")]
        frequency: Frequency,
    },
    Generate {
        prompt_id: i64,
        #[arg(long, default_value = "daily")]
        frequency: Frequency,
    },
    Delete {
        id: i64,
    },
    /// Latest public news
    Public {
        #[arg(long)]
        frequency: Option<Frequency>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Tells the user how to recover after the backend rejected the session.
///
/// Concurrent requests can all be rejected at once; the notice is printed once.
#[derive(Default)]
struct CliNavigator {
    notified: AtomicBool,
}

impl CliNavigator {
    /// Returns `true` only for the first call.
    fn first_notice(&self) -> bool {
        !self.notified.swap(true, Ordering::SeqCst)
    }
}

impl Navigator for CliNavigator {
    fn navigate(&self, path: &str) {
        if !self.first_notice() {
            return;
        }
        if path == LOGIN_PATH {
            eprintln!("Your session has expired. Run `prompt-news login <username>` to sign in again.");
        } else {
            eprintln!("Continue at {}", path);
        }
    }
}

impl Command {
    /// Page the command stands for, checked against the route guard.
    fn page_path(&self) -> Option<&'static str> {
        match self {
            Command::Login { .. } => Some("/login"),
            Command::Signup { .. } => Some("/signup"),
            Command::Whoami | Command::Settings { .. } => Some("/settings"),
            Command::Prompts(PromptsCommand::Public { .. }) => Some("/public"),
            Command::Prompts(_) | Command::Overview { .. } => Some("/prompts"),
            Command::News(NewsCommand::Public { .. }) => Some("/public"),
            Command::News(_) => Some("/news"),
            Command::Logout | Command::View { .. } | Command::Route { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = start(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn start(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    let session: Arc<dyn TokenStore> = Arc::new(CookieFileSession::new(&config.session_path));
    let api = ApiClient::new(
        &config.api_base_url,
        session.clone(),
        config.request_timeout(),
    )?
    .with_navigator(Arc::new(CliNavigator::default()));
    let services = Services::new(api);

    check_page(&cli.command, session.is_authenticated())?;
    run(cli.command, &services, &config).await
}

/// Applies the route guard to the page a command stands for.
fn check_page(command: &Command, has_token: bool) -> Result<()> {
    let Some(page) = command.page_path() else {
        return Ok(());
    };
    match guard(page, has_token) {
        RouteDecision::Allow => Ok(()),
        RouteDecision::Redirect(LOGIN_PATH) => Err(AppError::NotSignedIn),
        RouteDecision::Redirect(_) => Err(AppError::AlreadySignedIn),
    }
}

async fn run(command: Command, services: &Services, config: &Config) -> Result<()> {
    match command {
        Command::Login { username } => {
            let password = rpassword::prompt_password("Password: ")?;
            services
                .auth
                .login(&LoginRequest {
                    username: username.clone(),
                    password,
                })
                .await?;
            println!("Signed in as {}", username);
        }

        Command::Signup { username, email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                return Err(ApiError::validation("Passwords do not match").into());
            }
            let user = services
                .users
                .create_initial_superuser(&UserCreate::new(email, username.clone(), password.clone()))
                .await?;
            services
                .auth
                .login(&LoginRequest { username, password })
                .await?;
            println!("Created account {} and signed in", user.username);
        }

        Command::Logout => {
            services.auth.logout().await;
            println!("Signed out");
        }

        Command::Whoami => {
            let user = services.auth.current_user().await?;
            println!("{} <{}>", user.username, user.email);
            println!("Timezone: {}", user.timezone);
            let hours: Vec<String> = [user.news_generation_hour_1, user.news_generation_hour_2]
                .into_iter()
                .flatten()
                .map(|h| format!("{:02}:00", h))
                .collect();
            if !hours.is_empty() {
                println!("Daily generation at: {}", hours.join(", "));
            }
        }

        Command::Settings {
            timezone,
            hour1,
            hour2,
        } => {
            let settings = UserSettings {
                timezone,
                news_generation_hour_1: hour1,
                news_generation_hour_2: hour2,
            };
            if settings.timezone.is_none()
                && settings.news_generation_hour_1.is_none()
                && settings.news_generation_hour_2.is_none()
            {
                let zones = services.users.timezones().await?;
                println!("Nothing to change. Available timezones:");
                for zone in zones {
                    println!("  {}", zone);
                }
                return Ok(());
            }
            let user = services.users.update_settings(&settings).await?;
            println!("Saved settings for {} (timezone {})", user.username, user.timezone);
        }

        Command::Prompts(cmd) => run_prompts(cmd, services).await?,

        Command::News(cmd) => run_news(cmd, services, config).await?,

        Command::View { path } => {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            let target = PromptPath::parse(&normalized)
                .ok_or_else(|| AppError::InvalidPromptPath(path.clone()))?;
            let view = services.prompt_page(&target.username, &target.slug).await?;

            match view.page {
                PromptPage::Visible { prompt, can_manage } => {
                    print_prompt_header(&prompt.prompt);
                    println!("by @{}", target.username);
                    println!();
                    println!("{}", prompt.prompt.content);
                    println!();
                    if view.news.is_empty() {
                        println!("No news items have been generated for this prompt yet.");
                    } else {
                        for news in &view.news {
                            print_news(news);
                        }
                    }
                    if can_manage {
                        println!("Manage with `prompt-news prompts show {}`", prompt.prompt.id);
                    }
                }
                PromptPage::Locked(notice) => {
                    println!("{}", notice.title);
                    println!("{}", notice.message);
                    println!(
                        "Log in: prompt-news login <username>   Create account: {}",
                        notice.signup_path
                    );
                }
            }
        }

        Command::Overview { frequency } => {
            let prompts = services.prompts.list(&PromptListParams::default()).await?;
            let ids: Vec<i64> = prompts.iter().map(|p| p.id).collect();
            let latest = services.news.latest_for_prompts(&ids, frequency).await;

            for (prompt, (_, news)) in prompts.iter().zip(latest.iter()) {
                match news {
                    Some(n) => println!("{:<32} {}  {}", prompt.name, n.created_at.format("%Y-%m-%d %H:%M"), n.title),
                    None => println!("{:<32} (no {} news yet)", prompt.name, frequency.label().to_lowercase()),
                }
            }
        }

        Command::Route { path } => {
            let has_token = services.auth.is_authenticated();
            match guard(&path, has_token) {
                RouteDecision::Allow => println!("{} -> allowed", path),
                RouteDecision::Redirect(target) => println!("{} -> redirect to {}", path, target),
            }
        }
    }

    Ok(())
}

async fn run_prompts(cmd: PromptsCommand, services: &Services) -> Result<()> {
    match cmd {
        PromptsCommand::List { search, skip, limit } => {
            let prompts = services
                .prompts
                .list(&PromptListParams { skip, limit, search })
                .await?;
            if prompts.is_empty() {
                println!("No prompts yet. Create one with `prompt-news prompts create`.");
            }
            for prompt in &prompts {
                print_prompt_row(prompt);
            }
        }

        PromptsCommand::Show { id } => {
            let (prompt, news) = services.prompt_detail(id).await?;
            print_prompt_header(&prompt.prompt);
            println!();
            println!("{}", prompt.prompt.content);
            if let Some(custom) = &prompt.prompt.custom_template {
                println!();
                println!("Custom template: {}", custom);
            }
            println!();
            let stats = &prompt.news_count;
            println!(
                "News: {} total ({} hourly, {} daily)",
                stats.total, stats.hourly, stats.daily
            );
            if let Some(last) = stats.last_update {
                println!("Last update: {}", last.format("%Y-%m-%d %H:%M UTC"));
            }
            for item in &news {
                print_news(item);
            }
        }

        PromptsCommand::Create {
            name,
            content,
            template,
            custom_template,
            visibility,
        } => {
            let template = PromptTemplate::from_parts(template, custom_template.as_deref())?;
            let request = PromptCreate::new(name, content, template, visibility)?;
            let prompt = services.prompts.create(&request).await?;
            println!("Created prompt {} ({})", prompt.id, prompt.slug);
        }

        PromptsCommand::Update {
            id,
            name,
            content,
            template,
            custom_template,
            visibility,
        } => {
            let mut update = PromptUpdate {
                name,
                content,
                visibility,
                ..Default::default()
            };
            if let Some(template) = template {
                let template = PromptTemplate::from_parts(template, custom_template.as_deref())?;
                update = update.with_template(template);
            } else {
                update.custom_template = custom_template;
            }
            let prompt = services.prompts.update(id, &update).await?;
            println!("Updated prompt {} ({})", prompt.id, prompt.slug);
        }

        PromptsCommand::Delete { id } => {
            services.prompts.delete(id).await?;
            println!("Deleted prompt {}", id);
        }

        PromptsCommand::ValidateTemplate {
            template,
            custom_template,
        } => {
            let template = PromptTemplate::from_parts(template, custom_template.as_deref())?;
            let response = services.prompts.validate_template(&template).await?;
            if response.valid {
                println!("Template is valid");
            } else {
                println!("Template is invalid");
                if let Some(errors) = response.errors {
                    println!("{}", errors);
                }
            }
        }

        PromptsCommand::Public { limit } => {
            let prompts = services
                .prompts
                .public(&PromptListParams {
                    limit,
                    ..Default::default()
                })
                .await?;
            for prompt in &prompts {
                print_prompt_row(prompt);
            }
        }

        PromptsCommand::Templates => {
            for template in services.prompts.templates().await? {
                println!("{:<14} {}", template.as_str(), template.label());
            }
        }
    }
    Ok(())
}

async fn run_news(cmd: NewsCommand, services: &Services, config: &Config) -> Result<()> {
    match cmd {
        NewsCommand::List {
            prompt_id,
            frequency,
            skip,
            limit,
        } => {
            let news = services
                .news
                .list(&NewsFilter {
                    prompt_id,
                    frequency,
                    skip,
                    limit,
                })
                .await?;
            if news.is_empty() {
                println!("No news found");
            }
            for item in &news {
                print_news(item);
            }
        }

        NewsCommand::Latest {
            prompt_id,
            frequency,
        } => match services.news.latest(prompt_id, frequency).await? {
            Some(news) => print_news(&news),
            None => println!("No {} news for prompt {} yet", frequency, prompt_id),
        },

        NewsCommand::Generate {
            prompt_id,
            frequency,
        } => {
            let request = NewsCreate::new(prompt_id, frequency)?;
            let news = services.news.generate(&request).await?;
            print_news(&news);
        }

        NewsCommand::Delete { id } => {
            services.news.delete(id).await?;
            println!("Deleted news item {}", id);
        }

        NewsCommand::Public { frequency, limit } => {
            let limit = limit.unwrap_or(config.latest_news_limit);
            let news = services.news.public_latest(limit, frequency).await?;
            for item in &news {
                print_news(item);
            }
        }
    }
    Ok(())
}

fn print_prompt_row(prompt: &Prompt) {
    println!(
        "{:>5}  {:<32} {:<14} {:<8} {}",
        prompt.id,
        prompt.name,
        prompt.template_type.label(),
        prompt.visibility.label(),
        prompt.slug
    );
}

fn print_prompt_header(prompt: &Prompt) {
    println!(
        "{}  [{} · {}]",
        prompt.name,
        prompt.template_type.label(),
        prompt.visibility.label()
    );
    println!("{}", prompt.visibility.description());
}

fn print_news(news: &News) {
    println!(
        "#{} {} ({}, {})",
        news.id,
        news.title,
        news.frequency.label(),
        news.created_at.format("%Y-%m-%d %H:%M")
    );
    println!("{}", news.content);
    println!();
}
