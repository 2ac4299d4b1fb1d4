//! gitforge CLI - repositories, pull requests and issues on any git host.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use gitforge::{pick_new_repository, NewRepositoryOptions, Prompter, Resolver, TerminalPrompter};
use gitforge_auth::{AuthConfigService, FileConfigSaver};
use gitforge_core::{GitProvider, Kind, Repository, UserAuth};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gitforge")]
#[command(author, version, about = "gitforge - one CLI for every git hosting service", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Credential store to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Which server to talk to, and as whom.
#[derive(Args, Clone, Debug)]
struct HostArgs {
    /// Server URL
    #[arg(long, default_value = "https://github.com")]
    host: String,

    /// Server kind: github, gitlab, gitea, bitbucketcloud, bitbucketserver, gerrit
    #[arg(long)]
    kind: Option<Kind>,

    /// User to act as
    #[arg(long)]
    username: Option<String>,

    /// Never prompt; fail when no stored or environment credential exists
    #[arg(long)]
    batch: bool,
}

impl HostArgs {
    fn kind(&self) -> Kind {
        self.kind.unwrap_or_default()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage stored servers and credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Work with repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Inspect pull requests
    Pr {
        #[command(subcommand)]
        command: PrCommands,
    },

    /// Query issues
    Issue {
        #[command(subcommand)]
        command: IssueCommands,
    },

    /// Query releases
    Release {
        #[command(subcommand)]
        command: ReleaseCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Show stored servers and users
    List,

    /// Store a credential for a server
    Login {
        #[command(flatten)]
        host: HostArgs,

        /// API token; prompted for when omitted
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget a server and all of its users
    DeleteServer {
        /// Server URL
        #[arg(long)]
        host: String,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// List repositories of an owner
    List {
        #[command(flatten)]
        host: HostArgs,

        /// Organisation; the current user when omitted
        #[arg(long, default_value = "")]
        owner: String,

        /// Only names containing this text
        #[arg(long, default_value = "")]
        filter: String,
    },

    /// Create a repository, asking for owner and name as needed
    Create {
        #[command(flatten)]
        host: HostArgs,

        /// Repository name
        #[arg(long, default_value = "")]
        name: String,

        /// Create a private repository
        #[arg(long)]
        private: bool,
    },

    /// Check that a repository name is still free
    Validate {
        #[command(flatten)]
        host: HostArgs,

        #[arg(long, default_value = "")]
        owner: String,

        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum PrCommands {
    /// Show a pull request
    Get {
        #[command(flatten)]
        host: HostArgs,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,

        #[arg(long)]
        number: u64,
    },

    /// Show the commit status of a pull request's last commit
    Status {
        #[command(flatten)]
        host: HostArgs,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,

        #[arg(long)]
        number: u64,
    },
}

#[derive(Subcommand)]
enum IssueCommands {
    /// Search issues of a repository
    Search {
        #[command(flatten)]
        host: HostArgs,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,

        /// Text to match
        #[arg(long, default_value = "")]
        query: String,

        /// Only issues closed at or after this RFC 3339 time
        #[arg(long)]
        closed_since: Option<DateTime<Utc>>,
    },
}

#[derive(Subcommand)]
enum ReleaseCommands {
    /// List releases of a repository
    List {
        #[command(flatten)]
        host: HostArgs,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(command) = cli.command else {
        println!("gitforge - one CLI for every git hosting service");
        println!("Run with --help for usage information");
        return Ok(());
    };

    let mut service = load_service(cli.config.as_deref())?;
    let prompter = TerminalPrompter::new();
    run(command, &mut service, &prompter, &mut std::io::stdout()).await
}

fn load_service(path: Option<&Path>) -> anyhow::Result<AuthConfigService> {
    let saver = match path {
        Some(path) => FileConfigSaver::new(path),
        None => FileConfigSaver::default_location()?,
    };
    tracing::debug!(path = %saver.path().display(), "Loading credential store");
    Ok(AuthConfigService::load(saver)?)
}

fn provider(
    service: &mut AuthConfigService,
    prompter: &dyn Prompter,
    args: &HostArgs,
) -> anyhow::Result<Box<dyn GitProvider>> {
    let mut resolver = Resolver::new(service, prompter);
    let provider = match &args.username {
        Some(username) => {
            resolver.resolve_with_username(&args.host, args.kind(), username, args.batch)?
        }
        None => resolver.resolve(&args.host, args.kind(), args.batch)?,
    };
    Ok(provider)
}

fn repository(owner: &str, name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        organisation: owner.to_string(),
        ..Default::default()
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

async fn run(
    command: Commands,
    service: &mut AuthConfigService,
    prompter: &dyn Prompter,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Auth { command } => match command {
            AuthCommands::List => {
                let config = service.config();
                if config.servers.is_empty() {
                    writeln!(out, "No servers configured")?;
                }
                for server in &config.servers {
                    let marker = if server.url == config.current_server { "*" } else { " " };
                    writeln!(
                        out,
                        "{} {} [{}]",
                        marker,
                        server.description(),
                        or_dash(server.kind.as_str())
                    )?;
                    for user in &server.users {
                        let current = if user.username == server.current_user {
                            " (current)"
                        } else {
                            ""
                        };
                        writeln!(out, "    {}{}", or_dash(&user.username), current)?;
                    }
                }
            }
            AuthCommands::Login { host, token } => match token {
                Some(token) => {
                    let username = host.username.clone().unwrap_or_default();
                    let mut resolver = Resolver::new(service, prompter);
                    let server =
                        resolver.save_user_auth(&host.host, host.kind(), &UserAuth::new(username, token))?;
                    writeln!(out, "Stored credential for {}", server.description())?;
                }
                None => {
                    let provider = provider(service, prompter, &host)?;
                    writeln!(
                        out,
                        "Logged in to {} as {}",
                        provider.server_url(),
                        provider.current_username()
                    )?;
                }
            },
            AuthCommands::DeleteServer { host } => {
                let url = gitforge::normalize_host_url(&host)?;
                if service.config().server(&url).is_none() {
                    anyhow::bail!("No server stored for {}", url);
                }
                service.delete_server(&url)?;
                writeln!(out, "Deleted server {}", url)?;
            }
        },

        Commands::Repo { command } => match command {
            RepoCommands::List {
                host,
                owner,
                filter,
            } => {
                let provider = provider(service, prompter, &host)?;
                let mut repos = provider.list_repositories(&owner).await?;
                repos.retain(|r| filter.is_empty() || r.name.contains(&filter));
                repos.sort_by(|a, b| a.full_name().cmp(&b.full_name()));
                for repo in repos {
                    writeln!(out, "{}\t{}", repo.full_name(), repo.html_url)?;
                }
            }
            RepoCommands::Create {
                host,
                name,
                private,
            } => {
                let options = NewRepositoryOptions {
                    server_url: host.host.clone(),
                    kind: host.kind(),
                    username: host.username.clone().unwrap_or_default(),
                    default_name: name,
                    private,
                    batch_mode: host.batch,
                    ..Default::default()
                };
                let mut resolver = Resolver::new(service, prompter);
                let new_repo = pick_new_repository(&mut resolver, &options).await?;
                let repo = new_repo.create().await?;
                writeln!(out, "Created {}\t{}", repo.full_name(), repo.clone_url)?;
            }
            RepoCommands::Validate { host, owner, name } => {
                let provider = provider(service, prompter, &host)?;
                provider.validate_repository_name(&owner, &name).await?;
                writeln!(out, "{} is available", repository(&owner, &name).full_name())?;
            }
        },

        Commands::Pr { command } => match command {
            PrCommands::Get {
                host,
                owner,
                repo,
                number,
            } => {
                let provider = provider(service, prompter, &host)?;
                let pr = provider
                    .get_pull_request(&owner, &repository(&owner, &repo), number)
                    .await?;
                writeln!(out, "{} {}", pr.number_string(), pr.title)?;
                writeln!(out, "state:  {}", or_dash(pr.state.as_deref().unwrap_or_default()))?;
                writeln!(out, "merged: {}", pr.is_merged())?;
                writeln!(out, "head:   {}", or_dash(pr.head_ref.as_deref().unwrap_or_default()))?;
                writeln!(out, "url:    {}", pr.url)?;
            }
            PrCommands::Status {
                host,
                owner,
                repo,
                number,
            } => {
                let provider = provider(service, prompter, &host)?;
                let pr = provider
                    .get_pull_request(&owner, &repository(&owner, &repo), number)
                    .await?;
                let state = provider.pull_request_last_commit_status(&pr).await?;
                writeln!(out, "{} {}", pr.number_string(), state)?;
            }
        },

        Commands::Issue { command } => match command {
            IssueCommands::Search {
                host,
                owner,
                repo,
                query,
                closed_since,
            } => {
                let provider = provider(service, prompter, &host)?;
                let issues = match closed_since {
                    Some(since) => {
                        provider
                            .search_issues_closed_since(&owner, &repo, since)
                            .await?
                    }
                    None => provider.search_issues(&owner, &repo, &query).await?,
                };
                for issue in issues {
                    writeln!(
                        out,
                        "#{}\t{}\t{}",
                        issue.key,
                        or_dash(issue.state.as_deref().unwrap_or_default()),
                        issue.title
                    )?;
                }
            }
        },

        Commands::Release { command } => match command {
            ReleaseCommands::List { host, owner, repo } => {
                let provider = provider(service, prompter, &host)?;
                let releases = provider.list_releases(&owner, &repo).await?;
                for release in &releases {
                    writeln!(
                        out,
                        "{}\t{}\t{}",
                        release.tag_name,
                        or_dash(&release.name),
                        release.download_count
                    )?;
                }
                writeln!(
                    out,
                    "total downloads: {}",
                    gitforge_core::release_download_count(&releases)
                )?;
            }
        },
    }

    Ok(())
}
